//! Boiler controller
//!
//! Owns the temperature sensor, the heater and the PID loop. The main
//! loop calls [`BoilerController::control`] at least once per second;
//! each call reads the sensor, evaluates the safety limits, runs the
//! state machine and hands the resulting power to the heater.

use core::convert::Infallible;

use crate::config::BoilerConfig;
use crate::control::{abs_diff, Pid, PidConfig, PidGains};
use crate::fsm::{Fsm, StateMachine};
use crate::safety::{SafetyLimits, SafetyMonitor, SafetyStatus};
use crate::traits::{HeaterOutput, SensorError, TemperatureSensor};

use super::state::{BoilerError, BoilerState};

/// Requests the brew process makes of the boiler
pub trait BoilerCommands {
    /// Allow heating
    fn turn_on(&mut self);

    /// Stop heating immediately
    fn turn_off(&mut self);

    /// Change the setpoint (°C)
    fn set_temperature(&mut self, celsius: f32);

    /// Enter brew mode (extra feed-forward)
    fn start_brew(&mut self);

    /// Leave brew mode
    fn stop_brew(&mut self);
}

/// Boiler temperature controller
pub struct BoilerController<S, H> {
    fsm: Fsm<BoilerState, Infallible>,
    sensor: S,
    heater: H,
    pid: Pid,
    safety: SafetyMonitor,
    config: BoilerConfig,
    actual_temp: f32,
    set_temp: f32,
    ff_heat: f32,
    ff_ready: f32,
    ff_brew: f32,
    power: f32,
    on: bool,
    brew: bool,
    error: BoilerError,
    /// Raw fault register of the most recent RTD fault
    rtd_fault: u8,
    /// Fault detected this tick, applied after the state handler ran
    pending_fault: Option<BoilerError>,
}

impl<S: TemperatureSensor, H: HeaterOutput> BoilerController<S, H> {
    /// Create a controller resting in OFF
    ///
    /// Does not touch the hardware; call [`BoilerController::init`] once
    /// the board is up.
    pub fn new(sensor: S, heater: H, config: BoilerConfig) -> Self {
        let pid = Pid::new(PidConfig {
            gains: PidGains::new(0.0, 0.0, 0.0),
            output_min: 0.0,
            output_max: 100.0,
            windup_min: -config.windup_limit,
            windup_max: config.windup_limit,
            min_sample_ms: config.pid_sample_ms,
        });

        Self {
            fsm: Fsm::new(BoilerState::Off),
            sensor,
            heater,
            pid,
            safety: SafetyMonitor::new(SafetyLimits::from(&config)),
            config,
            actual_temp: 0.0,
            set_temp: 0.0,
            ff_heat: 0.0,
            ff_ready: 0.0,
            ff_brew: 0.0,
            power: 0.0,
            on: false,
            brew: false,
            error: BoilerError::None,
            rtd_fault: 0,
            pending_fault: None,
        }
    }

    /// Bring up the sensor and baseline the PID loop
    pub fn init(&mut self, now_ms: u32) {
        self.sensor.clear_fault();
        if let Ok(celsius) = self.sensor.read_celsius() {
            if celsius.is_finite() {
                self.actual_temp = celsius;
            }
        }
        self.pid.start(self.actual_temp, now_ms);
        self.heater.set_power(0.0);
        info!("Boiler ready, temperature {} C", self.actual_temp);
    }

    /// Run one control tick
    pub fn control(&mut self, now_ms: u32) {
        self.safety.control_tick(now_ms);

        let reading = self.sensor.read_celsius();
        match reading {
            Ok(celsius) if celsius.is_finite() => self.actual_temp = celsius,
            // Garbage reading: the safety check latches an RTD fault
            Ok(_) => {}
            Err(SensorError::Fault(code)) => {
                self.rtd_fault = code;
                self.sensor.clear_fault();
            }
        }
        self.safety.update_temperature(reading);

        self.pending_fault = match self.safety.check() {
            SafetyStatus::Ok => None,
            SafetyStatus::Fault(fault) => Some(fault),
        };

        self.run(&mut (), now_ms, None);

        let output = self.pid.compute(self.actual_temp, self.set_temp, now_ms);
        self.power = match self.fsm.state() {
            BoilerState::Off | BoilerState::Error => 0.0,
            _ if !self.on => 0.0,
            _ => output,
        };
        self.heater.set_power(self.power);
    }

    fn state_off(&mut self) {
        if self.fsm.on_entry() {
            self.pid.set_feed_forward(0.0);
        }

        if self.on {
            self.fsm.next(BoilerState::Heating);
        }

        if self.fsm.on_exit() {
            // Start regulating from the current temperature
            self.pid.start(self.actual_temp, self.fsm.now_ms());
        }
    }

    fn state_heating(&mut self) {
        if self.fsm.on_entry() {
            self.pid.set_feed_forward(self.ff_heat);
        }

        if self.in_window() {
            self.fsm.next(BoilerState::Ready);
        }
        if self.brew {
            self.fsm.next(BoilerState::Brew);
        }
        if !self.on {
            self.fsm.next(BoilerState::Off);
        }
        if self.fsm.on_timeout(self.config.heating_timeout_ms) {
            self.goto_error(BoilerError::HeatingTimeout);
        }

        if self.fsm.on_exit() {
            self.pid.set_feed_forward(0.0);
        }
    }

    fn state_ready(&mut self) {
        if self.fsm.on_entry() {
            self.pid.set_feed_forward(self.ff_ready);
        }

        if !self.in_window() {
            self.fsm.next(BoilerState::Heating);
        }
        if self.brew {
            self.fsm.next(BoilerState::Brew);
        }
        if !self.on {
            self.fsm.next(BoilerState::Off);
        }
        if self.fsm.on_timeout(self.config.ready_timeout_ms) {
            self.goto_error(BoilerError::ReadyTimeout);
        }

        if self.fsm.on_exit() {
            self.pid.set_feed_forward(0.0);
        }
    }

    fn state_brew(&mut self) {
        if self.fsm.on_entry() {
            self.pid.set_feed_forward(self.ff_brew);
        }

        if !self.brew {
            self.fsm.next(BoilerState::Heating);
        }
        if !self.on {
            self.fsm.next(BoilerState::Off);
        }
        if self.fsm.on_timeout(self.config.brew_timeout_ms) {
            self.goto_error(BoilerError::BrewTimeout);
        }

        if self.fsm.on_exit() {
            self.pid.set_feed_forward(0.0);
            self.brew = false;
        }
    }

    fn state_error(&mut self) {
        self.on = false;
        self.brew = false;
        self.set_temp = 0.0;
        self.pid.set_feed_forward(0.0);

        if self.error == BoilerError::None {
            self.fsm.next(BoilerState::Off);
        }
    }

    /// Enter ERROR; the first fault stays latched until cleared
    fn goto_error(&mut self, error: BoilerError) {
        // A safety fault in the same tick still replaces a state timeout
        if self.error == BoilerError::None || self.fsm.state() != BoilerState::Error {
            self.error = error;
        }
        self.on = false;
        self.brew = false;
        self.fsm.next(BoilerState::Error);
    }

    fn in_window(&self) -> bool {
        abs_diff(self.set_temp, self.actual_temp) < self.config.temp_window
    }

    /// Push the feed-forward of the active state into the PID loop
    fn refresh_feed_forward(&mut self) {
        let ff = match self.fsm.state() {
            BoilerState::Heating => self.ff_heat,
            BoilerState::Ready => self.ff_ready,
            BoilerState::Brew => self.ff_brew,
            BoilerState::Off | BoilerState::Error => 0.0,
        };
        self.pid.set_feed_forward(ff);
    }

    pub fn state(&self) -> BoilerState {
        self.fsm.state()
    }

    pub fn state_name(&self) -> &'static str {
        self.fsm.state().name()
    }

    pub fn error(&self) -> BoilerError {
        self.error
    }

    pub fn error_text(&self) -> &'static str {
        self.error.as_str()
    }

    /// Acknowledge the latched fault; ERROR falls back to OFF next tick
    pub fn clear_error(&mut self) {
        self.error = BoilerError::None;
        self.rtd_fault = 0;
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn is_ready(&self) -> bool {
        self.fsm.state() == BoilerState::Ready
    }

    pub fn is_error(&self) -> bool {
        self.fsm.state() == BoilerState::Error
    }

    /// Setpoint (°C)
    pub fn set_temp(&self) -> f32 {
        self.set_temp
    }

    /// Last good temperature reading (°C)
    pub fn actual_temp(&self) -> f32 {
        self.actual_temp
    }

    /// Power commanded this tick (%)
    pub fn power(&self) -> f32 {
        self.power
    }

    pub fn rtd_fault(&self) -> u8 {
        self.rtd_fault
    }

    pub fn set_gains(&mut self, gains: PidGains) {
        self.pid.set_gains(gains);
    }

    pub fn gains(&self) -> PidGains {
        self.pid.gains()
    }

    pub fn set_ff_heat(&mut self, percent: f32) {
        self.ff_heat = percent.clamp(0.0, 100.0);
        self.refresh_feed_forward();
    }

    pub fn set_ff_ready(&mut self, percent: f32) {
        self.ff_ready = percent.clamp(0.0, 100.0);
        self.refresh_feed_forward();
    }

    pub fn set_ff_brew(&mut self, percent: f32) {
        self.ff_brew = percent.clamp(0.0, 100.0);
        self.refresh_feed_forward();
    }

    pub fn ff_heat(&self) -> f32 {
        self.ff_heat
    }

    pub fn ff_ready(&self) -> f32 {
        self.ff_ready
    }

    pub fn ff_brew(&self) -> f32 {
        self.ff_brew
    }

    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn heater(&self) -> &H {
        &self.heater
    }

    pub fn heater_mut(&mut self) -> &mut H {
        &mut self.heater
    }
}

impl<S: TemperatureSensor, H: HeaterOutput> BoilerCommands for BoilerController<S, H> {
    fn turn_on(&mut self) {
        self.on = true;
    }

    fn turn_off(&mut self) {
        self.on = false;
        self.power = 0.0;
        self.heater.set_power(0.0);
    }

    fn set_temperature(&mut self, celsius: f32) {
        self.set_temp = celsius.clamp(0.0, self.config.high_limit);
    }

    fn start_brew(&mut self) {
        self.brew = true;
    }

    fn stop_brew(&mut self) {
        self.brew = false;
    }
}

impl<S: TemperatureSensor, H: HeaterOutput> StateMachine for BoilerController<S, H> {
    type State = BoilerState;
    type Message = Infallible;

    fn fsm(&mut self) -> &mut Fsm<BoilerState, Infallible> {
        &mut self.fsm
    }

    fn dispatch(&mut self, state: BoilerState, _ctx: &mut ()) {
        match state {
            BoilerState::Off => self.state_off(),
            BoilerState::Heating => self.state_heating(),
            BoilerState::Ready => self.state_ready(),
            BoilerState::Brew => self.state_brew(),
            BoilerState::Error => self.state_error(),
        }

        // Safety faults override whatever the state requested
        if let Some(fault) = self.pending_fault.take() {
            self.goto_error(fault);
        }
    }

    fn on_transition(&mut self, from: BoilerState, to: BoilerState) {
        info!("Boiler: {} -> {}", from.name(), to.name());
        if to == BoilerState::Error {
            warn!("Boiler fault: {}", self.error.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockSensor {
        reading: Result<f32, SensorError>,
        clears: u32,
    }

    impl TemperatureSensor for MockSensor {
        fn read_celsius(&mut self) -> Result<f32, SensorError> {
            self.reading
        }

        fn clear_fault(&mut self) {
            self.clears += 1;
        }
    }

    #[derive(Default)]
    struct MockHeater {
        power: f32,
    }

    impl HeaterOutput for MockHeater {
        fn set_power(&mut self, percent: f32) {
            self.power = percent.clamp(0.0, 100.0);
        }

        fn power(&self) -> f32 {
            self.power
        }

        fn average_power(&self) -> f32 {
            self.power
        }
    }

    type Boiler = BoilerController<MockSensor, MockHeater>;

    struct Rig {
        boiler: Boiler,
        now: u32,
    }

    impl Rig {
        fn new(temp: f32) -> Self {
            let sensor = MockSensor {
                reading: Ok(temp),
                clears: 0,
            };
            let mut boiler = BoilerController::new(sensor, MockHeater::default(), BoilerConfig::default());
            boiler.set_gains(PidGains::new(7.0, 0.3, 80.0));
            boiler.set_ff_heat(3.0);
            boiler.set_ff_ready(10.0);
            boiler.set_ff_brew(80.0);
            boiler.set_temperature(98.0);
            boiler.init(0);
            Self { boiler, now: 0 }
        }

        fn tick(&mut self) {
            self.now += 1000;
            self.boiler.control(self.now);
        }

        fn ticks(&mut self, n: u32) {
            for _ in 0..n {
                self.tick();
            }
        }

        fn set_temp_reading(&mut self, celsius: f32) {
            self.boiler.sensor_mut().reading = Ok(celsius);
        }

        fn heating() -> Self {
            let mut rig = Self::new(20.0);
            rig.boiler.turn_on();
            rig.ticks(2);
            assert_eq!(rig.boiler.state(), BoilerState::Heating);
            rig
        }

        fn ready() -> Self {
            let mut rig = Self::heating();
            rig.set_temp_reading(95.0);
            rig.ticks(2);
            assert_eq!(rig.boiler.state(), BoilerState::Ready);
            rig
        }

        fn brewing() -> Self {
            let mut rig = Self::ready();
            rig.boiler.start_brew();
            rig.ticks(2);
            assert_eq!(rig.boiler.state(), BoilerState::Brew);
            rig
        }

        fn faulted() -> Self {
            let mut rig = Self::heating();
            rig.boiler.sensor_mut().reading = Err(SensorError::Fault(0x40));
            rig.tick();
            assert_eq!(rig.boiler.state(), BoilerState::Error);
            rig
        }
    }

    #[test]
    fn test_off_until_turned_on() {
        let mut rig = Rig::new(20.0);
        rig.ticks(5);
        assert_eq!(rig.boiler.state(), BoilerState::Off);
        assert_eq!(rig.boiler.power(), 0.0);
        assert_eq!(rig.boiler.heater().power, 0.0);
    }

    #[test]
    fn test_heating_drives_heater() {
        let mut rig = Rig::heating();
        rig.tick();
        assert!(rig.boiler.power() > 0.0);
        assert_eq!(rig.boiler.heater().power, rig.boiler.power());
        assert_eq!(rig.boiler.pid().feed_forward(), 3.0);
    }

    #[test]
    fn test_ready_within_window_and_back() {
        let mut rig = Rig::ready();
        assert!(rig.boiler.is_ready());
        assert_eq!(rig.boiler.pid().feed_forward(), 10.0);

        rig.set_temp_reading(80.0);
        rig.ticks(2);
        assert_eq!(rig.boiler.state(), BoilerState::Heating);
    }

    #[test]
    fn test_brew_feed_forward_and_exit() {
        let mut rig = Rig::brewing();
        assert_eq!(rig.boiler.pid().feed_forward(), 80.0);

        rig.boiler.stop_brew();
        rig.tick();
        assert_eq!(rig.boiler.state(), BoilerState::Heating);
        assert_eq!(rig.boiler.pid().feed_forward(), 0.0);
    }

    #[test]
    fn test_turn_off_zeroes_power_in_same_tick_from_every_state() {
        for mut rig in [Rig::heating(), Rig::ready(), Rig::brewing(), Rig::faulted()] {
            rig.tick();
            rig.boiler.turn_off();
            rig.tick();
            assert_eq!(rig.boiler.power(), 0.0);
            assert_eq!(rig.boiler.heater().power, 0.0);
        }

        let mut rig = Rig::new(20.0);
        rig.boiler.turn_off();
        rig.tick();
        assert_eq!(rig.boiler.power(), 0.0);
    }

    #[test]
    fn test_rtd_fault_from_every_state() {
        for mut rig in [Rig::new(20.0), Rig::heating(), Rig::ready(), Rig::brewing()] {
            rig.boiler.sensor_mut().reading = Err(SensorError::Fault(0x84));
            rig.tick();
            assert_eq!(rig.boiler.state(), BoilerState::Error);
            assert_eq!(rig.boiler.error(), BoilerError::Rtd);
            assert_eq!(rig.boiler.rtd_fault(), 0x84);
            assert_eq!(rig.boiler.power(), 0.0);
            assert_eq!(rig.boiler.heater().power, 0.0);
            assert!(rig.boiler.sensor().clears >= 2);
        }
    }

    #[test]
    fn test_error_latched_until_cleared() {
        let mut rig = Rig::faulted();
        // Fault goes away on its own: still latched
        rig.set_temp_reading(90.0);
        rig.ticks(3);
        assert!(rig.boiler.is_error());
        assert!(!rig.boiler.is_on());
        assert_eq!(rig.boiler.set_temp(), 0.0);

        rig.boiler.clear_error();
        rig.tick();
        assert_eq!(rig.boiler.state(), BoilerState::Off);
        assert_eq!(rig.boiler.error_text(), "NONE");
    }

    #[test]
    fn test_clear_while_fault_persists_stays_in_error() {
        let mut rig = Rig::faulted();
        rig.boiler.clear_error();
        rig.tick();
        assert!(rig.boiler.is_error());
        assert_eq!(rig.boiler.error(), BoilerError::Rtd);
    }

    #[test]
    fn test_over_and_under_temperature() {
        let mut rig = Rig::heating();
        rig.set_temp_reading(110.0);
        rig.tick();
        assert_eq!(rig.boiler.error(), BoilerError::OverTemperature);
        assert_eq!(rig.boiler.error_text(), "OVER_TEMP");

        let mut rig = Rig::new(20.0);
        rig.set_temp_reading(-5.0);
        rig.tick();
        assert_eq!(rig.boiler.error(), BoilerError::UnderTemperature);
    }

    #[test]
    fn test_heating_timeout() {
        let mut rig = Rig::heating();
        // Stuck at 20 °C: never reaches the window
        rig.ticks(600);
        assert_eq!(rig.boiler.state(), BoilerState::Error);
        assert_eq!(rig.boiler.error(), BoilerError::HeatingTimeout);
    }

    #[test]
    fn test_ready_timeout() {
        let mut rig = Rig::ready();
        rig.ticks(7_201);
        assert_eq!(rig.boiler.state(), BoilerState::Error);
        assert_eq!(rig.boiler.error(), BoilerError::ReadyTimeout);
        assert!(!rig.boiler.is_on());
        assert_eq!(rig.boiler.power(), 0.0);
        assert_eq!(rig.boiler.heater().power, 0.0);
    }

    #[test]
    fn test_brew_timeout() {
        let mut rig = Rig::brewing();
        rig.ticks(181);
        assert_eq!(rig.boiler.state(), BoilerState::Error);
        assert_eq!(rig.boiler.error(), BoilerError::BrewTimeout);
        assert!(!rig.boiler.is_on());
        assert_eq!(rig.boiler.power(), 0.0);
        assert_eq!(rig.boiler.heater().power, 0.0);
    }

    #[test]
    fn test_nan_reading_while_heating() {
        let mut rig = Rig::heating();
        rig.set_temp_reading(f32::NAN);
        rig.tick();
        assert_eq!(rig.boiler.state(), BoilerState::Error);
        assert_eq!(rig.boiler.error(), BoilerError::Rtd);
        assert_eq!(rig.boiler.power(), 0.0);
        assert_eq!(rig.boiler.heater().power, 0.0);
        assert_eq!(rig.boiler.actual_temp(), 20.0);

        // Good readings again: the loop regulates with finite output
        rig.set_temp_reading(20.0);
        rig.ticks(16);
        assert!(rig.boiler.is_error());
        rig.boiler.clear_error();
        rig.tick();
        assert_eq!(rig.boiler.state(), BoilerState::Off);
        rig.boiler.set_temperature(98.0);
        rig.boiler.turn_on();
        rig.ticks(16);
        assert_eq!(rig.boiler.state(), BoilerState::Heating);
        assert_eq!(rig.boiler.error(), BoilerError::None);
        assert!(rig.boiler.power().is_finite());
        assert!(rig.boiler.power() > 0.0);
        assert_eq!(rig.boiler.heater().power, rig.boiler.power());
    }

    #[test]
    fn test_latched_error_not_overwritten() {
        let mut rig = Rig::faulted();
        assert_eq!(rig.boiler.error(), BoilerError::Rtd);

        rig.set_temp_reading(115.0);
        rig.ticks(3);
        assert_eq!(rig.boiler.state(), BoilerState::Error);
        assert_eq!(rig.boiler.error(), BoilerError::Rtd);

        // Once acknowledged, the fault still present is latched fresh
        rig.boiler.clear_error();
        rig.tick();
        assert_eq!(rig.boiler.error(), BoilerError::OverTemperature);
    }

    #[test]
    fn test_safety_fault_beats_timeout_in_same_tick() {
        let mut rig = Rig::heating();
        rig.ticks(598);
        assert_eq!(rig.boiler.state(), BoilerState::Heating);

        rig.set_temp_reading(115.0);
        rig.tick();
        assert_eq!(rig.boiler.state(), BoilerState::Error);
        assert_eq!(rig.boiler.error(), BoilerError::OverTemperature);
    }

    #[test]
    fn test_control_timeout() {
        let mut rig = Rig::heating();
        rig.now += 11_000;
        rig.boiler.control(rig.now);
        assert_eq!(rig.boiler.error(), BoilerError::ControlTimeout);
        assert_eq!(rig.boiler.power(), 0.0);
    }

    #[test]
    fn test_setpoint_and_feed_forward_clamped() {
        let mut rig = Rig::new(20.0);
        rig.boiler.set_temperature(130.0);
        assert_eq!(rig.boiler.set_temp(), 108.0);
        rig.boiler.set_temperature(-3.0);
        assert_eq!(rig.boiler.set_temp(), 0.0);
        rig.boiler.set_ff_brew(140.0);
        assert_eq!(rig.boiler.ff_brew(), 100.0);
    }

    #[test]
    fn test_state_names() {
        let rig = Rig::brewing();
        assert_eq!(rig.boiler.state_name(), "BREW");
    }
}
