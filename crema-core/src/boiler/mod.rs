//! Boiler temperature control
//!
//! A five-state machine around the PID loop:
//!
//! ```text
//!          on            |Δ| < window
//!   OFF ───────► HEATING ◄──────────► READY
//!    ▲            │   ▲                 │
//!    │  !on       │   │ !brew           │ brew
//!    └────────────┘   └──── BREW ◄──────┘
//!
//!   any state ──fault/timeout──► ERROR ──cleared──► OFF
//! ```

pub mod controller;
pub mod state;

pub use controller::{BoilerCommands, BoilerController};
pub use state::{BoilerError, BoilerState};
