//! Confirm button
//!
//! The encoder push button is sampled from a periodic timer interrupt,
//! debounced there and counted in a [`PressCounter`] shared with the
//! control loop. The loop holds a [`ConfirmInput`] that turns the count
//! into one `take_press()` per press, so presses between two ticks are
//! never lost.
//!
//! ```ignore
//! static PRESSES: PressCounter = PressCounter::new();
//!
//! // Timer interrupt, every millisecond:
//! if debouncer.poll(now_ms) {
//!     PRESSES.record_press();
//! }
//!
//! // Control loop:
//! let button = ConfirmInput::new(&PRESSES);
//! ```

use embedded_hal::digital::InputPin;
use portable_atomic::{AtomicU16, Ordering};

use crema_core::time::time_diff;
use crema_core::traits::ConfirmButton;

/// Time the contact must stay stable before a level change counts (ms)
pub const DEFAULT_SETTLE_MS: u32 = 20;

/// Press count shared between interrupt and control loop
#[derive(Debug, Default)]
pub struct PressCounter {
    presses: AtomicU16,
}

impl PressCounter {
    pub const fn new() -> Self {
        Self {
            presses: AtomicU16::new(0),
        }
    }

    /// Count one press; callable from interrupt context
    pub fn record_press(&self) {
        self.presses.fetch_add(1, Ordering::Relaxed);
    }

    /// Total presses, wrapping
    pub fn count(&self) -> u16 {
        self.presses.load(Ordering::Relaxed)
    }
}

/// Control-loop side of a [`PressCounter`]
pub struct ConfirmInput<'a> {
    counter: &'a PressCounter,
    seen: u16,
}

impl<'a> ConfirmInput<'a> {
    /// Presses made before this call are ignored
    pub fn new(counter: &'a PressCounter) -> Self {
        Self {
            counter,
            seen: counter.count(),
        }
    }

    /// Presses recorded but not yet taken
    pub fn pending(&self) -> u16 {
        self.counter.count().wrapping_sub(self.seen)
    }
}

impl ConfirmButton for ConfirmInput<'_> {
    fn take_press(&mut self) -> bool {
        if self.pending() == 0 {
            return false;
        }
        self.seen = self.seen.wrapping_add(1);
        true
    }
}

/// Sample-based contact debouncer
pub struct ButtonDebouncer<P> {
    pin: P,
    /// Pressed = pin low
    active_low: bool,
    settle_ms: u32,
    /// Last raw sample
    raw: bool,
    raw_since_ms: u32,
    /// Debounced level
    pressed: bool,
}

impl<P: InputPin> ButtonDebouncer<P> {
    /// Debouncer for a button pulling the pin low when pressed
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            active_low: true,
            settle_ms: DEFAULT_SETTLE_MS,
            raw: false,
            raw_since_ms: 0,
            pressed: false,
        }
    }

    pub fn with_settle_ms(mut self, settle_ms: u32) -> Self {
        self.settle_ms = settle_ms;
        self
    }

    /// Debounced level
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Sample the pin
    ///
    /// Returns `true` exactly once per press, when the pressed level has
    /// been stable for the settle time.
    pub fn poll(&mut self, now_ms: u32) -> bool {
        let level = if self.active_low {
            self.pin.is_low()
        } else {
            self.pin.is_high()
        };
        let Ok(raw) = level else {
            return false;
        };

        if raw != self.raw {
            self.raw = raw;
            self.raw_since_ms = now_ms;
            return false;
        }

        if raw != self.pressed && time_diff(now_ms, self.raw_since_ms) >= self.settle_ms {
            self.pressed = raw;
            if raw {
                debug!("Confirm button pressed");
            }
            return raw;
        }
        false
    }
}
