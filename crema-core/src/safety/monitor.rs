//! Safety monitor implementation
//!
//! Watches the boiler temperature sensor, the temperature envelope and
//! the liveness of the control loop itself.

use crate::boiler::BoilerError;
use crate::config::BoilerConfig;
use crate::time::time_diff;
use crate::traits::SensorError;

/// Safety condition status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafetyStatus {
    /// All conditions normal
    Ok,
    /// Safety condition violated
    Fault(BoilerError),
}

/// Safety thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SafetyLimits {
    /// Over-temperature threshold (°C)
    pub high: f32,
    /// Implausibly low reading threshold (°C)
    pub low: f32,
    /// Longest allowed gap between control ticks (ms)
    pub control_timeout_ms: u32,
}

impl From<&BoilerConfig> for SafetyLimits {
    fn from(config: &BoilerConfig) -> Self {
        Self {
            high: config.high_limit,
            low: config.low_limit,
            control_timeout_ms: config.control_timeout_ms,
        }
    }
}

/// Safety monitor for fault detection
#[derive(Debug, Clone)]
pub struct SafetyMonitor {
    limits: SafetyLimits,
    /// Last good temperature reading
    last_temp: Option<f32>,
    /// Fault register of the last failed read
    sensor_fault: Option<u8>,
    /// Timestamp of the previous control tick
    last_tick_ms: Option<u32>,
    /// Gap between the two most recent control ticks
    tick_gap_ms: u32,
}

impl SafetyMonitor {
    /// Create a new safety monitor
    pub fn new(limits: SafetyLimits) -> Self {
        Self {
            limits,
            last_temp: None,
            sensor_fault: None,
            last_tick_ms: None,
            tick_gap_ms: 0,
        }
    }

    /// Record the result of this tick's sensor read
    ///
    /// A non-finite reading is kept as the last reading so that
    /// [`SafetyMonitor::check`] reports it as implausible.
    pub fn update_temperature(&mut self, reading: Result<f32, SensorError>) {
        match reading {
            Ok(celsius) => {
                self.last_temp = Some(celsius);
                self.sensor_fault = None;
            }
            Err(SensorError::Fault(code)) => self.sensor_fault = Some(code),
        }
    }

    /// Record that a control tick is running at `now_ms`
    ///
    /// The first tick only establishes the baseline.
    pub fn control_tick(&mut self, now_ms: u32) {
        if let Some(last) = self.last_tick_ms {
            self.tick_gap_ms = time_diff(now_ms, last);
        }
        self.last_tick_ms = Some(now_ms);
    }

    /// Check all safety conditions
    ///
    /// Returns the first fault detected, or Ok if all conditions are normal.
    pub fn check(&self) -> SafetyStatus {
        if self.sensor_fault.is_some() {
            return SafetyStatus::Fault(BoilerError::Rtd);
        }

        if let Some(temp) = self.last_temp {
            if !temp.is_finite() {
                return SafetyStatus::Fault(BoilerError::Rtd);
            }
            if temp > self.limits.high {
                return SafetyStatus::Fault(BoilerError::OverTemperature);
            }
            if temp < self.limits.low {
                return SafetyStatus::Fault(BoilerError::UnderTemperature);
            }
        }

        if self.tick_gap_ms > self.limits.control_timeout_ms {
            return SafetyStatus::Fault(BoilerError::ControlTimeout);
        }

        SafetyStatus::Ok
    }

    /// Last good temperature reading
    pub fn temperature(&self) -> Option<f32> {
        self.last_temp
    }

    /// Fault register of the last failed read, if the last read failed
    pub fn sensor_fault(&self) -> Option<u8> {
        self.sensor_fault
    }
}
