//! User settings
//!
//! Every tunable the operator can change. Setters clamp to the allowed
//! range so a bad value from the serial channel or a stale record can
//! never drive the machine outside its envelope.
//!
//! The textual form is a comma-separated `key=value` list:
//!
//! ```text
//! temperature=98.00,P=7.00,I=0.30,D=80.00,ff_heat=3.00,...,wifiMode=0
//! ```

use core::fmt::{self, Write};

use heapless::String;
use serde::{Deserialize, Serialize};

use crema_protocol::MAX_LINE_LEN;

use crate::boiler::{BoilerCommands, BoilerController};
use crate::control::PidGains;
use crate::reservoir::Reservoir;
use crate::traits::{HeaterOutput, LoadCell, TemperatureSensor};

/// Rendered settings list
pub type SettingsLine = String<MAX_LINE_LEN>;

/// Errors from [`Settings::deserialize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    /// Empty input or a pair without `=`
    InvalidFormat,
    /// Key is not a setting
    UnknownKey,
    /// Value could not be parsed for its key
    InvalidValue,
}

impl SettingsError {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsError::InvalidFormat => "invalid input string format: settings not saved",
            SettingsError::UnknownKey => "unknown key: settings not saved",
            SettingsError::InvalidValue => "invalid value: settings not saved",
        }
    }
}

/// WiFi operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WifiMode {
    #[default]
    Off,
    On,
    /// Provisioning access point
    Ap,
}

impl WifiMode {
    /// Map a wire index, clamping out-of-range values
    pub fn from_index(index: u32) -> Self {
        match index {
            0 => WifiMode::Off,
            1 => WifiMode::On,
            _ => WifiMode::Ap,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            WifiMode::Off => 0,
            WifiMode::On => 1,
            WifiMode::Ap => 2,
        }
    }
}

/// Persisted user settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    temperature: f32,
    pre_infusion_time: f32,
    infusion_time: f32,
    extraction_time: f32,
    extraction_weight: f32,
    kp: f32,
    ki: f32,
    kd: f32,
    ff_heat: f32,
    ff_ready: f32,
    ff_brew: f32,
    tare_weight: f32,
    trim_weight: f32,
    shot_counter: u32,
    commissioning_done: bool,
    wifi_mode: WifiMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    /// Factory defaults
    pub const fn new() -> Self {
        Self {
            temperature: 98.0,
            pre_infusion_time: 3.0,
            infusion_time: 3.0,
            extraction_time: 25.0,
            extraction_weight: 40.0,
            kp: 7.0,
            ki: 0.3,
            kd: 80.0,
            ff_heat: 3.0,
            ff_ready: 10.0,
            ff_brew: 80.0,
            tare_weight: 0.0,
            trim_weight: 0.0,
            shot_counter: 0,
            commissioning_done: false,
            wifi_mode: WifiMode::Off,
        }
    }

    /// Brew temperature setpoint (°C)
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn set_temperature(&mut self, celsius: f32) {
        self.temperature = celsius.clamp(0.0, 110.0);
    }

    /// Pre-infusion duration (s)
    pub fn pre_infusion_time(&self) -> f32 {
        self.pre_infusion_time
    }

    pub fn set_pre_infusion_time(&mut self, secs: f32) {
        self.pre_infusion_time = secs.clamp(0.0, 60.0);
    }

    /// Infusion (soak) duration (s)
    pub fn infusion_time(&self) -> f32 {
        self.infusion_time
    }

    pub fn set_infusion_time(&mut self, secs: f32) {
        self.infusion_time = secs.clamp(0.0, 60.0);
    }

    /// Extraction duration (s)
    pub fn extraction_time(&self) -> f32 {
        self.extraction_time
    }

    pub fn set_extraction_time(&mut self, secs: f32) {
        self.extraction_time = secs.clamp(0.0, 60.0);
    }

    /// Target shot weight (g)
    pub fn extraction_weight(&self) -> f32 {
        self.extraction_weight
    }

    pub fn set_extraction_weight(&mut self, grams: f32) {
        self.extraction_weight = grams.clamp(1.0, 500.0);
    }

    pub fn kp(&self) -> f32 {
        self.kp
    }

    pub fn ki(&self) -> f32 {
        self.ki
    }

    pub fn kd(&self) -> f32 {
        self.kd
    }

    pub fn set_kp(&mut self, kp: f32) {
        self.kp = kp.clamp(0.0, 100.0);
    }

    pub fn set_ki(&mut self, ki: f32) {
        self.ki = ki.clamp(0.0, 100.0);
    }

    pub fn set_kd(&mut self, kd: f32) {
        self.kd = kd.clamp(0.0, 100.0);
    }

    /// Feed-forward while heating up (%)
    pub fn ff_heat(&self) -> f32 {
        self.ff_heat
    }

    /// Feed-forward while holding temperature (%)
    pub fn ff_ready(&self) -> f32 {
        self.ff_ready
    }

    /// Feed-forward while brewing (%)
    pub fn ff_brew(&self) -> f32 {
        self.ff_brew
    }

    pub fn set_ff_heat(&mut self, percent: f32) {
        self.ff_heat = percent.clamp(0.0, 100.0);
    }

    pub fn set_ff_ready(&mut self, percent: f32) {
        self.ff_ready = percent.clamp(0.0, 100.0);
    }

    pub fn set_ff_brew(&mut self, percent: f32) {
        self.ff_brew = percent.clamp(0.0, 100.0);
    }

    /// Reservoir tare (g)
    pub fn tare_weight(&self) -> f32 {
        self.tare_weight
    }

    pub fn set_tare_weight(&mut self, grams: f32) {
        self.tare_weight = grams.clamp(-5000.0, 5000.0);
    }

    /// Load cell scale correction (%)
    pub fn trim_weight(&self) -> f32 {
        self.trim_weight
    }

    pub fn set_trim_weight(&mut self, percent: f32) {
        self.trim_weight = percent.clamp(-10.0, 10.0);
    }

    pub fn shot_counter(&self) -> u32 {
        self.shot_counter
    }

    pub fn increment_shot_counter(&mut self) -> u32 {
        self.shot_counter = self.shot_counter.saturating_add(1);
        self.shot_counter
    }

    pub fn reset_shot_counter(&mut self) {
        self.shot_counter = 0;
    }

    /// Whether first-run commissioning has completed
    pub fn commissioning_done(&self) -> bool {
        self.commissioning_done
    }

    pub fn set_commissioning_done(&mut self, done: bool) {
        self.commissioning_done = done;
    }

    pub fn wifi_mode(&self) -> WifiMode {
        self.wifi_mode
    }

    pub fn set_wifi_mode(&mut self, mode: WifiMode) {
        self.wifi_mode = mode;
    }

    /// PID gains as a set
    pub fn gains(&self) -> PidGains {
        PidGains::new(self.kp, self.ki, self.kd)
    }

    /// Push the control-relevant settings into the running controllers
    pub fn apply_to<S, H, L>(&self, boiler: &mut BoilerController<S, H>, reservoir: &mut Reservoir<L>)
    where
        S: TemperatureSensor,
        H: HeaterOutput,
        L: LoadCell,
    {
        boiler.set_temperature(self.temperature);
        boiler.set_gains(self.gains());
        boiler.set_ff_heat(self.ff_heat);
        boiler.set_ff_ready(self.ff_ready);
        boiler.set_ff_brew(self.ff_brew);
        reservoir.set_tare(self.tare_weight);
        reservoir.set_trim(self.trim_weight);
    }

    /// Render as a `key=value,...` list
    pub fn serialize(&self) -> Result<SettingsLine, fmt::Error> {
        let mut line = SettingsLine::new();
        write!(line, "{}", self)?;
        Ok(line)
    }

    /// Apply a (possibly partial) `key=value,...` list
    ///
    /// Either every pair is applied or, on the first bad pair, none is.
    pub fn deserialize(&mut self, input: &str) -> Result<(), SettingsError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SettingsError::InvalidFormat);
        }

        let mut staged = *self;
        for pair in input.split(',') {
            let (key, value) = pair.split_once('=').ok_or(SettingsError::InvalidFormat)?;
            staged.set_field(key.trim(), value.trim())?;
        }

        *self = staged;
        Ok(())
    }

    fn set_field(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        match key {
            "temperature" => self.set_temperature(parse_float(value)?),
            "P" => self.set_kp(parse_float(value)?),
            "I" => self.set_ki(parse_float(value)?),
            "D" => self.set_kd(parse_float(value)?),
            "ff_heat" => self.set_ff_heat(parse_float(value)?),
            "ff_ready" => self.set_ff_ready(parse_float(value)?),
            "ff_brew" => self.set_ff_brew(parse_float(value)?),
            "tareWeight" => self.set_tare_weight(parse_float(value)?),
            "trimWeight" => self.set_trim_weight(parse_float(value)?),
            "preInfusionTime" => self.set_pre_infusion_time(parse_float(value)?),
            "infuseTime" => self.set_infusion_time(parse_float(value)?),
            "extractTime" => self.set_extraction_time(parse_float(value)?),
            "extractionWeight" => self.set_extraction_weight(parse_float(value)?),
            "commissioningDone" => self.commissioning_done = parse_int(value)? != 0,
            "shotCounter" => self.shot_counter = parse_int(value)?,
            "wifiMode" => self.wifi_mode = WifiMode::from_index(parse_int(value)?),
            _ => return Err(SettingsError::UnknownKey),
        }
        Ok(())
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "temperature={:.2},P={:.2},I={:.2},D={:.2},ff_heat={:.2},ff_ready={:.2},ff_brew={:.2},",
            self.temperature, self.kp, self.ki, self.kd, self.ff_heat, self.ff_ready, self.ff_brew
        )?;
        write!(
            f,
            "tareWeight={:.2},trimWeight={:.2},preInfusionTime={:.2},infuseTime={:.2},extractTime={:.2},",
            self.tare_weight,
            self.trim_weight,
            self.pre_infusion_time,
            self.infusion_time,
            self.extraction_time
        )?;
        write!(
            f,
            "extractionWeight={:.2},commissioningDone={},shotCounter={},wifiMode={}",
            self.extraction_weight,
            u8::from(self.commissioning_done),
            self.shot_counter,
            self.wifi_mode.index()
        )
    }
}

fn parse_float(value: &str) -> Result<f32, SettingsError> {
    value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(SettingsError::InvalidValue)
}

fn parse_int(value: &str) -> Result<u32, SettingsError> {
    value.parse().map_err(|_| SettingsError::InvalidValue)
}
