//! Reservoir load cell

/// Trait for the load cell amplifier under the water reservoir
pub trait LoadCell {
    /// Latest raw conversion, or `None` when no new sample is ready
    ///
    /// Must not block: the amplifier converts at its own pace and the
    /// control loop polls much faster.
    fn read_raw(&mut self) -> Option<i32>;
}
