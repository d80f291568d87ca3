//! Hardware watchdog abstraction
//!
//! The watchdog is the last line of defence: the control loop feeds it
//! only after a complete tick, so a hang anywhere in the loop lets it
//! expire and hard-reset the board.

/// Hardware watchdog timer
pub trait Watchdog {
    /// Arm the watchdog with the given timeout
    fn start(&mut self, timeout_ms: u32);

    /// Reset the watchdog countdown
    fn feed(&mut self);
}
