//! Water reservoir model
//!
//! Converts raw load cell counts into a net water weight and fill
//! level. Every weight query pulls a fresh sample from the cell, so the
//! value is always as recent as the amplifier allows.

use crate::config::ReservoirConfig;
use crate::traits::LoadCell;

/// Reservoir error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReservoirError {
    #[default]
    None,
    /// The amplifier stopped producing samples
    NoReadings,
    /// Net weight outside the physically possible range
    OutOfRange,
}

impl ReservoirError {
    pub fn as_str(self) -> &'static str {
        match self {
            ReservoirError::None => "OK",
            ReservoirError::NoReadings => "NO_READINGS",
            ReservoirError::OutOfRange => "OUT_OF_RANGE",
        }
    }
}

/// What the brew process needs to know about the water supply
pub trait WaterReservoir {
    /// Net water weight (g), sampling the cell
    fn weight(&mut self) -> f32;

    /// Whether the level is below the empty threshold
    fn is_empty(&mut self) -> bool;

    /// Zero the scale with a full reservoir; returns the new tare (g)
    fn tare(&mut self) -> f32;
}

/// Load-cell backed reservoir
pub struct Reservoir<L> {
    cell: L,
    config: ReservoirConfig,
    /// Tare weight (g)
    tare: f32,
    /// Scale trim (%)
    trim: f32,
    /// Last gross weight (g)
    gross: f32,
    missed_reads: u8,
    error: ReservoirError,
}

impl<L: LoadCell> Reservoir<L> {
    pub fn new(cell: L, config: ReservoirConfig) -> Self {
        Self {
            cell,
            config,
            tare: 0.0,
            trim: 0.0,
            gross: 0.0,
            missed_reads: 0,
            error: ReservoirError::None,
        }
    }

    /// Pull a sample from the cell if one is ready
    fn read(&mut self) {
        let Some(raw) = self.cell.read_raw() else {
            self.missed_reads = self.missed_reads.saturating_add(1);
            if self.missed_reads > self.config.max_missed_reads
                && self.error != ReservoirError::NoReadings
            {
                warn!("Reservoir: load cell stopped responding");
                self.error = ReservoirError::NoReadings;
            }
            return;
        };

        self.missed_reads = 0;
        let scale = (1.0 + self.trim / 100.0) * self.config.scale;
        self.gross = (raw as f32 - self.config.offset) / scale;

        let net = self.gross - self.tare;
        let margin = self.config.range_margin;
        if (net < -margin || net > self.config.capacity + margin)
            && self.error != ReservoirError::OutOfRange
        {
            warn!("Reservoir: weight {} g out of range", net);
            self.error = ReservoirError::OutOfRange;
        }
    }

    /// Net weight (g)
    pub fn weight(&mut self) -> f32 {
        self.read();
        self.gross - self.tare
    }

    /// Fill level (0..=100 %)
    pub fn level(&mut self) -> f32 {
        let weight = self.weight();
        (100.0 * weight / self.config.capacity).clamp(0.0, 100.0)
    }

    pub fn is_empty(&mut self) -> bool {
        self.level() < self.config.empty_level
    }

    pub fn is_almost_empty(&mut self) -> bool {
        self.level() < self.config.almost_empty_level
    }

    /// Tare with a full reservoir
    ///
    /// The tare is chosen so the current weight reads as full capacity.
    pub fn tare(&mut self) -> f32 {
        self.read();
        self.tare = self.gross - self.config.capacity;
        self.clear_error();
        info!("Reservoir tared at {} g", self.tare);
        self.tare
    }

    pub fn tare_weight(&self) -> f32 {
        self.tare
    }

    pub fn set_tare(&mut self, grams: f32) {
        self.tare = grams;
        self.clear_error();
    }

    pub fn trim(&self) -> f32 {
        self.trim
    }

    pub fn set_trim(&mut self, percent: f32) {
        self.trim = percent;
    }

    pub fn error(&self) -> ReservoirError {
        self.error
    }

    pub fn is_error(&self) -> bool {
        self.error != ReservoirError::None
    }

    pub fn error_text(&self) -> &'static str {
        self.error.as_str()
    }

    pub fn clear_error(&mut self) {
        self.error = ReservoirError::None;
        self.missed_reads = 0;
    }

    pub fn cell_mut(&mut self) -> &mut L {
        &mut self.cell
    }
}

impl<L: LoadCell> WaterReservoir for Reservoir<L> {
    fn weight(&mut self) -> f32 {
        Reservoir::weight(self)
    }

    fn is_empty(&mut self) -> bool {
        Reservoir::is_empty(self)
    }

    fn tare(&mut self) -> f32 {
        Reservoir::tare(self)
    }
}
