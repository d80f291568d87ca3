//! Simulated devices
//!
//! Stand-ins for the RTD converter and the load cell amplifier, used to
//! run the complete machine on a bench board or on the host. The boiler
//! temperature is derived from the heater's average power through a
//! shared [`PowerLink`], so the closed loop behaves like a (very)
//! simplified boiler.
//!
//! ```ignore
//! let link = PowerLink::new();
//! let heater = LinkedHeater::new(HeaterDevice::new(ssr_pin), &link);
//! let rtd = SimulatedRtd::new(&link, 20.0);
//! ```

mod load_cell;
mod rtd;

pub use load_cell::SimulatedLoadCell;
pub use rtd::{LinkedHeater, PowerLink, SimulatedRtd, ThermalModel};
