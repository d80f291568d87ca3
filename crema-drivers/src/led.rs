//! RGB status LED

use embedded_hal::digital::OutputPin;

use crema_core::traits::{Color, StatusIndicator};

/// Common-cathode RGB LED on three GPIO pins
pub struct StatusLed<R, G, B> {
    red: R,
    green: G,
    blue: B,
    color: Color,
}

impl<R: OutputPin, G: OutputPin, B: OutputPin> StatusLed<R, G, B> {
    /// Create the LED, initially dark
    pub fn new(red: R, green: G, blue: B) -> Self {
        let mut led = Self {
            red,
            green,
            blue,
            color: Color::White,
        };
        led.set_color(Color::Black);
        led
    }

    /// Colour currently shown
    pub fn color(&self) -> Color {
        self.color
    }
}

fn write<P: OutputPin>(pin: &mut P, high: bool) -> bool {
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.is_ok()
}

impl<R: OutputPin, G: OutputPin, B: OutputPin> StatusIndicator for StatusLed<R, G, B> {
    fn set_color(&mut self, color: Color) {
        if color == self.color {
            return;
        }
        let (r, g, b) = color.rgb();
        let ok = write(&mut self.red, r) & write(&mut self.green, g) & write(&mut self.blue, b);
        if !ok {
            warn!("Status LED: pin write failed");
        }
        self.color = color;
    }
}
