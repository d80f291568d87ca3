//! Front panel status LED

/// Colours the status LED can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Color {
    Black,
    Red,
    Green,
    Blue,
    Yellow,
    Purple,
    Cyan,
    White,
}

impl Color {
    /// Red, green and blue channel states
    pub const fn rgb(self) -> (bool, bool, bool) {
        match self {
            Color::Black => (false, false, false),
            Color::Red => (true, false, false),
            Color::Green => (false, true, false),
            Color::Blue => (false, false, true),
            Color::Yellow => (true, true, false),
            Color::Purple => (true, false, true),
            Color::Cyan => (false, true, true),
            Color::White => (true, true, true),
        }
    }
}

/// Trait for the status LED
pub trait StatusIndicator {
    /// Show a colour
    fn set_color(&mut self, color: Color);
}
