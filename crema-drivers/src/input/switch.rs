//! Brew lever switch

use embedded_hal::digital::InputPin;

use crema_core::traits::BrewSwitch;

/// Lever microswitch on a GPIO input
///
/// A failed pin read reports the lever as down, which keeps the pump
/// off.
pub struct GpioBrewSwitch<P> {
    pin: P,
    /// Lever up = pin low
    active_low: bool,
}

impl<P: InputPin> GpioBrewSwitch<P> {
    /// Switch that pulls the pin high when the lever is up
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            active_low: false,
        }
    }

    /// Switch that pulls the pin low when the lever is up
    pub fn new_active_low(pin: P) -> Self {
        Self {
            pin,
            active_low: true,
        }
    }
}

impl<P: InputPin> BrewSwitch for GpioBrewSwitch<P> {
    fn is_up(&mut self) -> bool {
        let level = if self.active_low {
            self.pin.is_low()
        } else {
            self.pin.is_high()
        };
        level.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    struct MockPin {
        high: bool,
    }

    impl ErrorType for MockPin {
        type Error = Infallible;
    }

    impl InputPin for MockPin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.high)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.high)
        }
    }

    #[test]
    fn test_active_high_switch() {
        let mut switch = GpioBrewSwitch::new(MockPin { high: true });
        assert!(switch.is_up());
        switch.pin.high = false;
        assert!(switch.is_down());
    }

    #[test]
    fn test_active_low_switch() {
        let mut switch = GpioBrewSwitch::new_active_low(MockPin { high: true });
        assert!(switch.is_down());
        switch.pin.high = false;
        assert!(switch.is_up());
    }
}
