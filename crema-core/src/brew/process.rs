//! Brew process state machine
//!
//! Drives the pump and the boiler's mode from the operator inputs, the
//! reservoir weight and the shot timings in [`Settings`]. Devices are
//! borrowed for the duration of a tick through [`BrewIo`].

use crate::boiler::BoilerCommands;
use crate::config::{BrewConfig, Settings};
use crate::control::abs_diff;
use crate::fsm::{Fsm, StateMachine};
use crate::reservoir::WaterReservoir;
use crate::time::{secs_to_ms, Stopwatch};
use crate::traits::{PumpOutput, StatusIndicator};

use super::state::{BrewError, BrewMessage, BrewState};

/// Operator inputs sampled once per tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BrewInputs {
    /// Brew lever lifted (valve open)
    pub switch_up: bool,
    /// Confirm button pressed since the previous tick
    pub confirm: bool,
}

/// Everything a brew tick may touch
pub struct BrewIo<'a> {
    pub inputs: BrewInputs,
    pub boiler: &'a mut dyn BoilerCommands,
    pub pump: &'a mut dyn PumpOutput,
    pub reservoir: &'a mut dyn WaterReservoir,
    pub led: &'a mut dyn StatusIndicator,
    pub settings: &'a mut Settings,
}

/// Brew process
pub struct BrewProcess {
    fsm: Fsm<BrewState, BrewMessage>,
    config: BrewConfig,
    /// Reservoir weight at the start of the current step sequence (g)
    start_weight: f32,
    /// Reservoir weight when the shot finished (g)
    end_weight: f32,
    /// Shot timer
    stopwatch: Stopwatch,
    error: BrewError,
}

impl BrewProcess {
    pub fn new(config: BrewConfig) -> Self {
        Self {
            fsm: Fsm::new(BrewState::Init),
            config,
            start_weight: 0.0,
            end_weight: 0.0,
            stopwatch: Stopwatch::new(),
            error: BrewError::None,
        }
    }

    /// Run one tick
    ///
    /// Returns `true` if `message` is not valid in the active state.
    pub fn tick(&mut self, io: &mut BrewIo<'_>, now_ms: u32, message: Option<BrewMessage>) -> bool {
        self.run(io, now_ms, message)
    }

    /// Transitions shared by the operational states
    fn common(&mut self, io: &mut BrewIo<'_>) {
        if !io.inputs.switch_up && io.settings.commissioning_done() {
            self.fsm.next(BrewState::Idle);
        }
        if io.reservoir.is_empty() {
            self.fsm.next(BrewState::Empty);
        }
        if self.fsm.on_message(BrewMessage::Sleep) {
            self.fsm.next(BrewState::Sleep);
        }
    }

    fn goto_error(&mut self, error: BrewError) {
        self.error = error;
        self.fsm.next(BrewState::Error);
    }

    fn all_off(io: &mut BrewIo<'_>) {
        io.pump.set_on(false);
        io.boiler.turn_off();
    }

    fn state_init(&mut self, io: &mut BrewIo<'_>) {
        if self.fsm.on_entry() {
            Self::all_off(io);
        }

        if io.settings.commissioning_done() {
            self.fsm.next(BrewState::Idle);
        } else if io.inputs.confirm {
            let tare = io.reservoir.tare();
            io.settings.set_tare_weight(tare);
            self.fsm.next(BrewState::Fill);
        }
    }

    fn state_fill(&mut self, io: &mut BrewIo<'_>) {
        if self.fsm.on_entry() {
            self.start_weight = io.reservoir.weight();
            io.pump.set_on(true);
        }

        if self.fsm.on_timeout(self.config.fill_time_ms) {
            let drop = abs_diff(self.start_weight, io.reservoir.weight());
            match self.config.fill_min_drop {
                Some(min_drop) if drop < min_drop => self.goto_error(BrewError::Fill),
                _ => self.fsm.next(BrewState::Purge),
            }
        }
    }

    fn state_purge(&mut self, io: &mut BrewIo<'_>) {
        if io.inputs.switch_up {
            self.fsm.next(BrewState::Check);
        }
        if self.fsm.on_timeout(self.config.purge_timeout_ms) {
            self.goto_error(BrewError::Purge);
        }
    }

    fn state_check(&mut self, io: &mut BrewIo<'_>) {
        if io.inputs.confirm {
            if abs_diff(self.start_weight, io.reservoir.weight()) < self.config.min_weight_drop {
                self.goto_error(BrewError::NoWater);
            } else {
                io.pump.set_on(false);
                self.fsm.next(BrewState::Done);
            }
        }
        if self.fsm.on_timeout(self.config.commissioning_timeout_ms) {
            self.goto_error(BrewError::Purge);
        }
    }

    fn state_done(&mut self, io: &mut BrewIo<'_>) {
        if !io.inputs.switch_up {
            io.settings.set_commissioning_done(true);
            info!("Commissioning complete");
            self.fsm.next(BrewState::Idle);
        }
        if self.fsm.on_timeout(self.config.commissioning_timeout_ms) {
            self.goto_error(BrewError::Purge);
        }
    }

    fn state_sleep(&mut self, io: &mut BrewIo<'_>) {
        if self.fsm.on_entry() {
            Self::all_off(io);
        }
        if self.fsm.on_message(BrewMessage::Wakeup) {
            self.fsm.next(BrewState::Idle);
        }
    }

    fn state_empty(&mut self, io: &mut BrewIo<'_>) {
        if self.fsm.on_entry() {
            Self::all_off(io);
        }
        if !io.reservoir.is_empty() && !io.inputs.switch_up {
            self.fsm.next(BrewState::Idle);
        }
    }

    fn state_idle(&mut self, io: &mut BrewIo<'_>) {
        if self.fsm.on_entry() {
            io.pump.set_on(false);
            io.boiler.set_temperature(io.settings.temperature());
            io.boiler.turn_on();
            io.boiler.stop_brew();
        }

        if io.inputs.switch_up {
            self.fsm.next(BrewState::PreInfuse);
        }
        self.common(io);
        if !io.settings.commissioning_done() {
            self.fsm.next(BrewState::Init);
        }
        if self.fsm.on_timeout(self.config.idle_timeout_ms) {
            self.fsm.next(BrewState::Sleep);
        }
    }

    fn state_pre_infuse(&mut self, io: &mut BrewIo<'_>) {
        if self.fsm.on_entry() {
            self.start_weight = io.reservoir.weight();
            self.stopwatch.reset();
            self.stopwatch.start(self.fsm.now_ms());
            io.pump.set_on(true);
            io.boiler.start_brew();
            let shots = io.settings.increment_shot_counter();
            info!("Shot {} started", shots);
        }

        if self.fsm.on_timeout(secs_to_ms(io.settings.pre_infusion_time())) {
            self.fsm.next(BrewState::Infuse);
        }
        self.common(io);
    }

    fn state_infuse(&mut self, io: &mut BrewIo<'_>) {
        if self.fsm.on_entry() {
            io.boiler.stop_brew();
            io.pump.set_on(false);
        }

        if self.fsm.on_timeout(secs_to_ms(io.settings.infusion_time())) {
            self.fsm.next(BrewState::Extract);
        }
        self.common(io);
    }

    fn state_extract(&mut self, io: &mut BrewIo<'_>) {
        if self.fsm.on_entry() {
            if self.fsm.previous() != Some(BrewState::Finished) {
                self.start_weight = io.reservoir.weight();
            }
            io.pump.set_on(true);
            io.boiler.start_brew();
        }

        if self.fsm.on_timeout(secs_to_ms(io.settings.extraction_time())) {
            self.fsm.next(BrewState::Finished);
        }
        self.common(io);
    }

    fn state_finished(&mut self, io: &mut BrewIo<'_>) {
        if self.fsm.on_entry() {
            self.end_weight = io.reservoir.weight();
            io.pump.set_on(false);
            io.boiler.stop_brew();
        }

        if io.inputs.confirm {
            self.stopwatch.start(self.fsm.now_ms());
            self.fsm.next(BrewState::Extract);
        }
        if self.fsm.on_timeout(self.config.finished_timeout_ms) {
            self.goto_error(BrewError::Timeout);
        }
        self.common(io);
    }

    fn state_error(&mut self, io: &mut BrewIo<'_>) {
        Self::all_off(io);

        if self.fsm.on_message(BrewMessage::Reset) {
            self.error = BrewError::None;
            self.fsm.next(BrewState::Init);
        }
    }

    pub fn state(&self) -> BrewState {
        self.fsm.state()
    }

    pub fn state_name(&self) -> &'static str {
        self.fsm.state().name()
    }

    pub fn error(&self) -> BrewError {
        self.error
    }

    pub fn error_text(&self) -> &'static str {
        self.error.as_str()
    }

    /// Shot time (ms) as of the last tick
    pub fn brew_time_ms(&self) -> u32 {
        self.stopwatch.elapsed_ms(self.fsm.now_ms())
    }

    /// Time spent in the current state (ms) as of the last tick
    pub fn step_time_ms(&self) -> u32 {
        self.fsm.time_in_state()
    }

    pub fn start_weight(&self) -> f32 {
        self.start_weight
    }

    pub fn end_weight(&self) -> f32 {
        self.end_weight
    }
}

impl<'a> StateMachine<BrewIo<'a>> for BrewProcess {
    type State = BrewState;
    type Message = BrewMessage;

    fn fsm(&mut self) -> &mut Fsm<BrewState, BrewMessage> {
        &mut self.fsm
    }

    fn dispatch(&mut self, state: BrewState, io: &mut BrewIo<'a>) {
        if self.fsm.on_entry() {
            io.led.set_color(state.color());
            if !matches!(
                state,
                BrewState::PreInfuse | BrewState::Infuse | BrewState::Extract
            ) {
                self.stopwatch.stop(self.fsm.now_ms());
            }
        }

        match state {
            BrewState::Init => self.state_init(io),
            BrewState::Fill => self.state_fill(io),
            BrewState::Purge => self.state_purge(io),
            BrewState::Check => self.state_check(io),
            BrewState::Done => self.state_done(io),
            BrewState::Sleep => self.state_sleep(io),
            BrewState::Empty => self.state_empty(io),
            BrewState::Idle => self.state_idle(io),
            BrewState::PreInfuse => self.state_pre_infuse(io),
            BrewState::Infuse => self.state_infuse(io),
            BrewState::Extract => self.state_extract(io),
            BrewState::Finished => self.state_finished(io),
            BrewState::Error => self.state_error(io),
        }
    }

    fn on_transition(&mut self, from: BrewState, to: BrewState) {
        info!("Brew: {} -> {}", from.name(), to.name());
        if to == BrewState::Error {
            warn!("Brew fault: {}", self.error.as_str());
        }
    }
}
