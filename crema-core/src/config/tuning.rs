//! Control loop constants
//!
//! Values that are fixed per machine build rather than edited by the
//! operator. Defaults match the stock single-boiler hardware.

/// Boiler controller limits and timeouts
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoilerConfig {
    /// Band around the setpoint counted as "at temperature" (°C)
    pub temp_window: f32,
    /// Readings above this are an over-temperature fault (°C)
    pub high_limit: f32,
    /// Readings below this are implausible (°C)
    pub low_limit: f32,
    /// Symmetric integral clamp (% output)
    pub windup_limit: f32,
    /// Longest allowed stay in HEATING (ms)
    pub heating_timeout_ms: u32,
    /// Longest allowed stay in READY before heating is abandoned (ms)
    pub ready_timeout_ms: u32,
    /// Longest allowed stay in BREW (ms)
    pub brew_timeout_ms: u32,
    /// Longest allowed gap between two control ticks (ms)
    pub control_timeout_ms: u32,
    /// PID minimum sample period (ms)
    pub pid_sample_ms: u32,
}

impl Default for BoilerConfig {
    fn default() -> Self {
        Self {
            temp_window: 10.0,
            high_limit: 108.0,
            low_limit: 1.0,
            windup_limit: 7.0,
            heating_timeout_ms: 600_000,
            ready_timeout_ms: 7_200_000,
            brew_timeout_ms: 180_000,
            control_timeout_ms: 10_000,
            pid_sample_ms: 100,
        }
    }
}

/// Brew sequencing timeouts and weight thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BrewConfig {
    /// Pump run time to fill the boiler during commissioning (ms)
    pub fill_time_ms: u32,
    /// Time the operator has to open the valve for purging (ms)
    pub purge_timeout_ms: u32,
    /// Time the operator has for each remaining commissioning step (ms)
    pub commissioning_timeout_ms: u32,
    /// Minimum reservoir drop proving water reached the boiler (g)
    pub min_weight_drop: f32,
    /// When set, FILL also requires at least this reservoir drop (g)
    pub fill_min_drop: Option<f32>,
    /// Idle time before the machine goes to sleep (ms)
    pub idle_timeout_ms: u32,
    /// Time to wait for an extend-shot press after a shot (ms)
    pub finished_timeout_ms: u32,
}

impl Default for BrewConfig {
    fn default() -> Self {
        Self {
            fill_time_ms: 15_000,
            purge_timeout_ms: 60_000,
            commissioning_timeout_ms: 120_000,
            min_weight_drop: 100.0,
            fill_min_drop: None,
            idle_timeout_ms: 3_600_000,
            finished_timeout_ms: 60_000,
        }
    }
}

/// Reservoir load cell calibration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReservoirConfig {
    /// Raw reading of the unloaded cell
    pub offset: f32,
    /// Raw counts per gram before trim
    pub scale: f32,
    /// Usable water capacity (g)
    pub capacity: f32,
    /// Level below which the reservoir counts as empty (%)
    pub empty_level: f32,
    /// Level below which the reservoir counts as almost empty (%)
    pub almost_empty_level: f32,
    /// Consecutive reads without a sample before flagging the cell
    pub max_missed_reads: u8,
    /// Tolerance outside 0..=capacity before a reading is rejected (g)
    pub range_margin: f32,
}

impl Default for ReservoirConfig {
    fn default() -> Self {
        Self {
            offset: 240_000.0,
            scale: 427.4,
            capacity: 1500.0,
            empty_level: 3.34,
            almost_empty_level: 12.0,
            max_missed_reads: 10,
            range_margin: 100.0,
        }
    }
}
