//! Pump relay output

use embedded_hal::digital::OutputPin;

use crema_core::traits::PumpOutput;

/// Vibration pump switched by a relay or SSR on a GPIO pin
pub struct GpioPump<P> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> GpioPump<P> {
    /// Create a pump output, initially off
    pub fn new(pin: P) -> Self {
        let mut pump = Self { pin, on: true };
        pump.set_on(false);
        pump
    }
}

impl<P: OutputPin> PumpOutput for GpioPump<P> {
    fn set_on(&mut self, on: bool) {
        if on == self.on {
            return;
        }
        let result = if on { self.pin.set_high() } else { self.pin.set_low() };
        if result.is_err() {
            warn!("Pump: relay pin write failed");
        }
        self.on = on;
    }

    fn is_on(&self) -> bool {
        self.on
    }
}
