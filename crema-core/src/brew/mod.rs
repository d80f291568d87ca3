//! Brew sequencing
//!
//! First-run commissioning, the shot cycle and sleep handling:
//!
//! ```text
//!  INIT ─press─► FILL ─time─► PURGE ─up─► CHECK ─press─► DONE ─down─► IDLE
//!   │                                                                  ▲
//!   └───────────────────────── commissioned ───────────────────────────┤
//!                                                                      │
//!  IDLE ─up─► PRE_INFUSE ─time─► INFUSE ─time─► EXTRACT ─time─► FINISHED
//!                                                  ▲               │
//!                                                  └────press──────┘
//!
//!  SLEEP ◄─ idle timeout / sleep msg      EMPTY ◄─ reservoir empty
//!  ERROR ─reset msg─► INIT
//! ```

pub mod process;
pub mod state;

pub use process::{BrewInputs, BrewIo, BrewProcess};
pub use state::{BrewError, BrewMessage, BrewState};
