//! Brew states, messages and error codes

use crate::traits::Color;

/// Brew process states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BrewState {
    /// Power-on; waits for commissioning to start unless already done
    Init,
    /// Commissioning: pump fills the boiler
    Fill,
    /// Commissioning: waiting for the valve to open
    Purge,
    /// Commissioning: waiting for the operator to confirm water flowed
    Check,
    /// Commissioning: waiting for the valve to close
    Done,
    /// Everything off until woken
    Sleep,
    /// Reservoir needs refilling
    Empty,
    /// Heated and waiting for a shot
    Idle,
    PreInfuse,
    Infuse,
    Extract,
    /// Shot done; a press extends it
    Finished,
    Error,
}

impl BrewState {
    pub fn name(self) -> &'static str {
        match self {
            BrewState::Init => "INIT",
            BrewState::Fill => "FILL",
            BrewState::Purge => "PURGE",
            BrewState::Check => "CHECK",
            BrewState::Done => "DONE",
            BrewState::Sleep => "SLEEP",
            BrewState::Empty => "EMPTY",
            BrewState::Idle => "IDLE",
            BrewState::PreInfuse => "PRE_INFUSE",
            BrewState::Infuse => "INFUSE",
            BrewState::Extract => "EXTRACT",
            BrewState::Finished => "FINISHED",
            BrewState::Error => "ERROR",
        }
    }

    /// Status LED colour shown while in this state
    pub fn color(self) -> Color {
        match self {
            BrewState::Init | BrewState::Sleep => Color::Black,
            BrewState::Fill | BrewState::Purge | BrewState::Check | BrewState::Done => {
                Color::White
            }
            BrewState::Idle => Color::Green,
            BrewState::PreInfuse => Color::Blue,
            BrewState::Infuse => Color::Yellow,
            BrewState::Extract => Color::Purple,
            BrewState::Finished => Color::Cyan,
            BrewState::Empty | BrewState::Error => Color::Red,
        }
    }
}

/// Messages posted to the brew process from outside the tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BrewMessage {
    /// Go to sleep now
    Sleep,
    /// Leave sleep
    Wakeup,
    /// Leave ERROR and start over
    Reset,
}

/// Brew fault codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BrewError {
    #[default]
    None,
    /// Fill did not draw water from the reservoir
    Fill,
    /// Commissioning step not completed in time
    Purge,
    /// No water reached the boiler during purge
    NoWater,
    /// Shot left unattended
    Timeout,
}

impl BrewError {
    pub fn as_str(self) -> &'static str {
        match self {
            BrewError::None => "NONE",
            BrewError::Fill => "FILL",
            BrewError::Purge => "PURGE",
            BrewError::NoWater => "NO_WATER",
            BrewError::Timeout => "TIMEOUT",
        }
    }
}
