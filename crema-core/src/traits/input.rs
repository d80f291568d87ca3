//! Operator inputs

/// Brew lever switch
///
/// "Up" means the lever is lifted and the group valve is open.
pub trait BrewSwitch {
    /// Whether the lever is up
    fn is_up(&mut self) -> bool;

    /// Whether the lever is down
    fn is_down(&mut self) -> bool {
        !self.is_up()
    }
}

/// Momentary confirm button (the encoder push button)
pub trait ConfirmButton {
    /// Return `true` once for each press made since the previous call
    fn take_press(&mut self) -> bool;
}
