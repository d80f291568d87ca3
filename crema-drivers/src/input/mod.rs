//! Operator inputs

pub mod button;
pub mod switch;

pub use button::{ButtonDebouncer, ConfirmInput, PressCounter};
pub use switch::GpioBrewSwitch;
