//! Heater and temperature sensor traits

/// Errors that can occur with temperature sensing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// The converter flagged a fault; the raw fault register is attached
    ///
    /// For an RTD front end this covers open or shorted sensor leads and
    /// reference or supply problems.
    Fault(u8),
}

/// Trait for the boiler temperature sensor
pub trait TemperatureSensor {
    /// Read the current temperature in degrees Celsius
    ///
    /// Takes `&mut self` because reading requires bus access.
    fn read_celsius(&mut self) -> Result<f32, SensorError>;

    /// Clear a latched fault so the next read can succeed
    fn clear_fault(&mut self);
}

/// Trait for the boiler heating element
///
/// Power is a duty cycle in percent. Implementations turn it into an
/// on/off pattern (software PWM on a solid-state relay).
pub trait HeaterOutput {
    /// Set the requested power, clamped to 0..=100 %
    fn set_power(&mut self, percent: f32);

    /// Requested power in percent
    fn power(&self) -> f32;

    /// Low-pass filtered power in percent
    fn average_power(&self) -> f32;

    /// Advance the output pattern
    ///
    /// Called from the fast loop with the free-running microsecond
    /// counter. Implementations without a pattern ignore it.
    fn update(&mut self, _now_us: u32) {}
}
