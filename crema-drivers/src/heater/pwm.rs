//! Software-PWM heater output
//!
//! The boiler element is switched by a solid-state relay on a GPIO pin.
//! Power is turned into a time-proportioned on/off pattern: within each
//! PWM period the pin is high for `power / 100` of the period.
//!
//! [`HeaterDevice::update`] must be called at least once per period and
//! is driven by elapsed time, not by the number of calls, so a jittery
//! fast loop does not bias the duty cycle.
//!
//! ```ignore
//! let mut heater = HeaterDevice::new(ssr_pin);
//! heater.set_power(40.0);
//!
//! // Fast loop:
//! heater.update(timer.now_micros());
//! ```

use embedded_hal::digital::OutputPin;

use crema_core::traits::HeaterOutput;

/// Smoothing factor of the average-power filter (per update)
const AVERAGE_FACTOR: f32 = 0.01;

/// Default PWM period (1 s)
pub const DEFAULT_PERIOD_US: u32 = 1_000_000;
/// Shortest supported PWM period (1 ms)
pub const MIN_PERIOD_US: u32 = 1_000;
/// Longest supported PWM period (10 s)
pub const MAX_PERIOD_US: u32 = 10_000_000;

/// Heater driven by a solid-state relay
pub struct HeaterDevice<P> {
    pin: P,
    /// If true, heater ON = pin LOW
    inverted: bool,
    power: f32,
    period_us: u32,
    /// Position within the current period
    phase_us: u32,
    last_us: Option<u32>,
    average: f32,
    /// Logical output level (true = element energised)
    on: bool,
    pin_fault: bool,
}

impl<P: OutputPin> HeaterDevice<P> {
    /// Create a heater on an active-high pin, initially off
    pub fn new(pin: P) -> Self {
        Self::with_polarity(pin, false)
    }

    /// Create a heater with a selectable output polarity
    ///
    /// With `inverted` set the element is on while the pin is low.
    pub fn with_polarity(pin: P, inverted: bool) -> Self {
        let mut heater = Self {
            pin,
            inverted,
            power: 0.0,
            period_us: DEFAULT_PERIOD_US,
            phase_us: 0,
            last_us: None,
            average: 0.0,
            on: false,
            pin_fault: false,
        };
        heater.drive(false);
        heater
    }

    /// PWM period (µs)
    pub fn period_us(&self) -> u32 {
        self.period_us
    }

    /// Set the PWM period in seconds, clamped to 0.001..=10 s
    pub fn set_period_secs(&mut self, secs: f32) {
        let us = (secs * 1_000_000.0) as u32;
        self.period_us = us.clamp(MIN_PERIOD_US, MAX_PERIOD_US);
        self.phase_us %= self.period_us;
    }

    /// Full power
    pub fn on(&mut self) {
        self.set_power(100.0);
    }

    /// Zero power; the pin drops immediately
    pub fn off(&mut self) {
        self.set_power(0.0);
    }

    /// Whether the element is energised right now
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Whether a pin write has failed since creation
    pub fn pin_fault(&self) -> bool {
        self.pin_fault
    }

    /// Release the pin
    pub fn release(mut self) -> P {
        self.drive(false);
        self.pin
    }

    fn drive(&mut self, on: bool) {
        self.on = on;
        let result = if on != self.inverted {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if result.is_err() && !self.pin_fault {
            warn!("Heater: SSR pin write failed");
            self.pin_fault = true;
        }
    }
}

impl<P: OutputPin> HeaterOutput for HeaterDevice<P> {
    fn set_power(&mut self, percent: f32) {
        // NaN lands on 0 %
        self.power = if percent > 0.0 { percent.min(100.0) } else { 0.0 };
        if self.power == 0.0 && self.on {
            self.drive(false);
        }
    }

    fn power(&self) -> f32 {
        self.power
    }

    fn average_power(&self) -> f32 {
        self.average
    }

    fn update(&mut self, now_us: u32) {
        let delta = match self.last_us {
            Some(last) => now_us.wrapping_sub(last),
            None => 0,
        };
        self.last_us = Some(now_us);

        let phase = (self.phase_us as u64 + delta as u64) % self.period_us as u64;
        self.phase_us = phase as u32;

        let on_us = (self.power / 100.0 * self.period_us as f32) as u32;
        let on = self.phase_us < on_us;
        if on != self.on {
            self.drive(on);
        }

        self.average = AVERAGE_FACTOR * self.power + (1.0 - AVERAGE_FACTOR) * self.average;
    }
}
