//! Simulated reservoir load cell

use crema_core::config::ReservoirConfig;
use crema_core::traits::LoadCell;

/// Load cell producing raw counts for a settable gross weight
pub struct SimulatedLoadCell {
    offset: f32,
    scale: f32,
    grams: f32,
    ready: bool,
}

impl SimulatedLoadCell {
    /// Cell calibrated like `config`, loaded with `grams`
    pub fn new(config: &ReservoirConfig, grams: f32) -> Self {
        Self {
            offset: config.offset,
            scale: config.scale,
            grams,
            ready: true,
        }
    }

    pub fn grams(&self) -> f32 {
        self.grams
    }

    pub fn set_grams(&mut self, grams: f32) {
        self.grams = grams;
    }

    /// Remove water, e.g. pumped into the boiler
    pub fn draw(&mut self, grams: f32) {
        self.grams -= grams;
    }

    /// Stop or resume producing samples
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }
}

impl LoadCell for SimulatedLoadCell {
    fn read_raw(&mut self) -> Option<i32> {
        self.ready.then(|| (self.offset + self.grams * self.scale) as i32)
    }
}
