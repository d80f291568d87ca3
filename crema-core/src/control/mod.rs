//! Closed-loop control primitives

pub mod pid;

pub use pid::{Pid, PidConfig, PidGains};

/// Absolute difference of two readings
#[inline]
pub fn abs_diff(a: f32, b: f32) -> f32 {
    if a > b {
        a - b
    } else {
        b - a
    }
}
