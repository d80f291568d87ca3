//! Crema Hardware Abstraction Layer
//!
//! This crate defines the board services the controller core needs but
//! cannot implement itself. Chip-specific HALs provide the concrete
//! implementations; the core and its tests only see these traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  crema-core (Machine, state machines)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  crema-hal (this crate - traits)        │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  board flash  │       │ board watchdog│
//! │  (EEPROM emu) │       │    (WDT)      │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! Digital pins are not abstracted here: drivers use `embedded-hal`
//! directly.
//!
//! # Traits
//!
//! - [`flash::FlashStorage`] - Persistent settings storage
//! - [`watchdog::Watchdog`] - Hardware watchdog feeding

#![no_std]
#![deny(unsafe_code)]

pub mod flash;
pub mod watchdog;

// Re-export key traits at crate root for convenience
pub use flash::{FlashError, FlashStorage, StorageKey};
pub use watchdog::Watchdog;
