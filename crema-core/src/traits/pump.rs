//! Water pump trait

/// On/off pump control
pub trait PumpOutput {
    /// Switch the pump
    fn set_on(&mut self, on: bool);

    /// Whether the pump is currently commanded on
    fn is_on(&self) -> bool;
}
