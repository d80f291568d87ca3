//! Simulated boiler temperature

use core::cell::Cell;

use crema_core::traits::{HeaterOutput, SensorError, TemperatureSensor};

/// Average heater power published by a [`LinkedHeater`]
#[derive(Debug, Default)]
pub struct PowerLink {
    average: Cell<f32>,
}

impl PowerLink {
    pub const fn new() -> Self {
        Self {
            average: Cell::new(0.0),
        }
    }

    /// Last published average power (%)
    pub fn average_power(&self) -> f32 {
        self.average.get()
    }

    fn publish(&self, percent: f32) {
        self.average.set(percent);
    }
}

/// Heater wrapper that publishes its average power to a [`PowerLink`]
pub struct LinkedHeater<'a, H> {
    heater: H,
    link: &'a PowerLink,
}

impl<'a, H: HeaterOutput> LinkedHeater<'a, H> {
    pub fn new(heater: H, link: &'a PowerLink) -> Self {
        Self { heater, link }
    }

    pub fn inner(&self) -> &H {
        &self.heater
    }
}

impl<H: HeaterOutput> HeaterOutput for LinkedHeater<'_, H> {
    fn set_power(&mut self, percent: f32) {
        self.heater.set_power(percent);
        self.link.publish(self.heater.average_power());
    }

    fn power(&self) -> f32 {
        self.heater.power()
    }

    fn average_power(&self) -> f32 {
        self.heater.average_power()
    }

    fn update(&mut self, now_us: u32) {
        self.heater.update(now_us);
        self.link.publish(self.heater.average_power());
    }
}

/// First-order boiler model
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThermalModel {
    /// Temperature with the element off (°C)
    pub ambient: f32,
    /// Steady-state rise per percent of average power (°C/%)
    pub gain: f32,
    /// Fraction of the remaining gap closed per reading (0..=1)
    pub lag: f32,
}

impl Default for ThermalModel {
    fn default() -> Self {
        Self {
            ambient: 20.0,
            gain: 1.5,
            lag: 0.05,
        }
    }
}

/// Temperature sensor following a [`ThermalModel`]
pub struct SimulatedRtd<'a> {
    link: &'a PowerLink,
    model: ThermalModel,
    temperature: f32,
    /// Injected converter fault, reported until repaired
    fault: Option<u8>,
    fault_clears: u32,
}

impl<'a> SimulatedRtd<'a> {
    /// Sensor starting at `ambient` with the default model
    pub fn new(link: &'a PowerLink, ambient: f32) -> Self {
        Self::with_model(
            link,
            ThermalModel {
                ambient,
                ..ThermalModel::default()
            },
        )
    }

    pub fn with_model(link: &'a PowerLink, model: ThermalModel) -> Self {
        Self {
            link,
            model,
            temperature: model.ambient,
            fault: None,
            fault_clears: 0,
        }
    }

    /// Current model temperature (°C)
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Force the model temperature
    pub fn set_temperature(&mut self, celsius: f32) {
        self.temperature = celsius;
    }

    /// Make every read fail with `code` until [`SimulatedRtd::repair`]
    pub fn inject_fault(&mut self, code: u8) {
        self.fault = Some(code);
    }

    pub fn repair(&mut self) {
        self.fault = None;
    }

    /// Number of `clear_fault` calls received
    pub fn fault_clears(&self) -> u32 {
        self.fault_clears
    }
}

impl TemperatureSensor for SimulatedRtd<'_> {
    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        if let Some(code) = self.fault {
            return Err(SensorError::Fault(code));
        }
        let target = self.model.ambient + self.model.gain * self.link.average_power();
        self.temperature += self.model.lag * (target - self.temperature);
        Ok(self.temperature)
    }

    fn clear_fault(&mut self) {
        self.fault_clears += 1;
    }
}
