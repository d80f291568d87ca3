//! Device implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in crema-core on top of `embedded-hal` digital pins:
//!
//! - Heater output (software PWM on a solid-state relay)
//! - Pump relay
//! - Brew lever switch and debounced confirm button
//! - RGB status LED
//! - Simulated sensors for running the machine without hardware

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod heater;
pub mod input;
pub mod led;
pub mod pump;
pub mod sim;
