//! Board-agnostic core logic for the espresso machine firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Hardware abstraction traits (temperature sensor, heater, pump,
//!   load cell, switches, status LED)
//! - Polled state machine framework
//! - PID controller with feed-forward
//! - Boiler temperature controller and its safety monitor
//! - Brew process, including first-run commissioning
//! - Water reservoir model
//! - Settings with CRC-protected persistence
//! - The [`machine::Machine`] context tying it together

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod boiler;
pub mod brew;
pub mod config;
pub mod control;
pub mod fsm;
pub mod machine;
pub mod reservoir;
pub mod safety;
pub mod time;
pub mod traits;
