//! Hardware abstraction traits
//!
//! These traits define the interface between the control logic and the
//! board drivers. Every controller in this crate is generic over them so
//! it can be exercised on the host with mocks.

pub mod heater;
pub mod indicator;
pub mod input;
pub mod pump;
pub mod scale;

pub use heater::{HeaterOutput, SensorError, TemperatureSensor};
pub use indicator::{Color, StatusIndicator};
pub use input::{BrewSwitch, ConfirmButton};
pub use pump::PumpOutput;
pub use scale::LoadCell;
