//! Boiler states and error codes

/// Boiler controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BoilerState {
    /// Heater de-energised
    Off,
    /// Driving towards the setpoint
    Heating,
    /// Holding the setpoint
    Ready,
    /// Compensating for water drawn through the group
    Brew,
    /// Fault latched; heater de-energised until cleared
    Error,
}

impl BoilerState {
    pub fn name(self) -> &'static str {
        match self {
            BoilerState::Off => "OFF",
            BoilerState::Heating => "HEATING",
            BoilerState::Ready => "READY",
            BoilerState::Brew => "BREW",
            BoilerState::Error => "ERROR",
        }
    }
}

/// Boiler fault codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BoilerError {
    #[default]
    None,
    /// RTD converter reported a fault
    Rtd,
    /// Reading above the high limit
    OverTemperature,
    /// Reading below the low limit (broken or shorted sensor)
    UnderTemperature,
    /// Setpoint not reached in time
    HeatingTimeout,
    /// Held at temperature too long without use
    ReadyTimeout,
    /// Brew mode held too long
    BrewTimeout,
    /// Control loop stalled
    ControlTimeout,
}

impl BoilerError {
    pub fn as_str(self) -> &'static str {
        match self {
            BoilerError::None => "NONE",
            BoilerError::Rtd => "ERROR_RTD",
            BoilerError::OverTemperature => "OVER_TEMP",
            BoilerError::UnderTemperature => "UNDER_TEMP",
            BoilerError::HeatingTimeout => "TIMEOUT_HEATING",
            BoilerError::ReadyTimeout => "READY_TIMEOUT",
            BoilerError::BrewTimeout => "TIMEOUT_BREW",
            BoilerError::ControlTimeout => "CONTROL_TIMEOUT",
        }
    }
}
