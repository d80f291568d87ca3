//! Application context
//!
//! [`Machine`] owns every controller and device and runs one cooperative
//! tick of the whole system:
//!
//! 1. boiler control (sensor read, safety checks, PID, heater power)
//! 2. brew process (inputs, pump, boiler mode)
//! 3. settings persistence when the brew process changed them
//! 4. watchdog feed
//!
//! The watchdog is fed last, so a tick that never completes lets it
//! expire and reset the board.

pub mod board;

use crema_hal::Watchdog;
use crema_protocol::{Command, ProtocolError, Response};

use crate::boiler::{BoilerCommands, BoilerController};
use crate::brew::{BrewInputs, BrewIo, BrewMessage, BrewProcess, BrewState};
use crate::config::{
    load_settings, save_settings, BoilerConfig, BrewConfig, ReservoirConfig, Settings,
};
use crate::reservoir::Reservoir;
use crate::traits::{BrewSwitch, ConfirmButton, HeaterOutput};

pub use board::{Board, Peripherals};

/// Firmware version reported by `GET info`
pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Static configuration of the whole machine
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MachineConfig {
    pub boiler: BoilerConfig,
    pub brew: BrewConfig,
    pub reservoir: ReservoirConfig,
    /// Hardware watchdog timeout (ms)
    pub watchdog_timeout_ms: u32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            boiler: BoilerConfig::default(),
            brew: BrewConfig::default(),
            reservoir: ReservoirConfig::default(),
            watchdog_timeout_ms: 8_000,
        }
    }
}

/// The espresso machine
pub struct Machine<B: Board> {
    boiler: BoilerController<B::Rtd, B::Heater>,
    brew: BrewProcess,
    reservoir: Reservoir<B::LoadCell>,
    settings: Settings,
    /// Copy of what is in flash
    stored: Settings,
    pump: B::Pump,
    switch: B::Switch,
    button: B::Button,
    led: B::Led,
    storage: B::Storage,
    watchdog: B::Watchdog,
    watchdog_timeout_ms: u32,
    pending_message: Option<BrewMessage>,
    /// Boiler fault acknowledged; restart heating once it leaves ERROR
    resume_boiler: bool,
}

impl<B: Board> Machine<B> {
    /// Assemble the machine; no device is touched until [`Machine::init`]
    pub fn new(parts: Peripherals<B>, config: MachineConfig) -> Self {
        Self {
            boiler: BoilerController::new(parts.rtd, parts.heater, config.boiler),
            brew: BrewProcess::new(config.brew),
            reservoir: Reservoir::new(parts.load_cell, config.reservoir),
            settings: Settings::new(),
            stored: Settings::new(),
            pump: parts.pump,
            switch: parts.switch,
            button: parts.button,
            led: parts.led,
            storage: parts.storage,
            watchdog: parts.watchdog,
            watchdog_timeout_ms: config.watchdog_timeout_ms,
            pending_message: None,
            resume_boiler: false,
        }
    }

    /// Load settings, bring up the boiler and arm the watchdog
    pub fn init(&mut self, now_ms: u32) {
        self.settings = load_settings(&mut self.storage);
        self.stored = self.settings;
        self.settings.apply_to(&mut self.boiler, &mut self.reservoir);
        self.boiler.init(now_ms);
        self.watchdog.start(self.watchdog_timeout_ms);
        info!(
            "Machine up, firmware {}, {} shots",
            FIRMWARE_VERSION,
            self.settings.shot_counter()
        );
    }

    /// Run one control tick (at least once per second)
    pub fn tick(&mut self, now_ms: u32) {
        self.boiler.control(now_ms);
        if self.resume_boiler && !self.boiler.is_error() {
            self.resume_boiler = false;
            // IDLE only commands the boiler on entry
            if self.brew.state() == BrewState::Idle {
                self.boiler.set_temperature(self.settings.temperature());
                self.boiler.turn_on();
            }
        }

        let inputs = BrewInputs {
            switch_up: self.switch.is_up(),
            confirm: self.button.take_press(),
        };
        let message = self.pending_message.take();
        let mut io = BrewIo {
            inputs,
            boiler: &mut self.boiler,
            pump: &mut self.pump,
            reservoir: &mut self.reservoir,
            led: &mut self.led,
            settings: &mut self.settings,
        };
        if self.brew.tick(&mut io, now_ms, message) {
            debug!("Brew message ignored in {}", self.brew.state_name());
        }

        self.persist_settings();
        self.watchdog.feed();
    }

    /// Advance the heater's PWM pattern; call from the fast loop
    pub fn service_heater(&mut self, now_us: u32) {
        self.boiler.heater_mut().update(now_us);
    }

    /// Queue a message for the brew process's next tick
    pub fn post(&mut self, message: BrewMessage) {
        self.pending_message = Some(message);
    }

    /// Acknowledge a boiler fault
    ///
    /// When the brew process sits in IDLE, heating resumes at the stored
    /// setpoint as soon as the boiler is back in OFF.
    pub fn clear_boiler_error(&mut self) {
        self.boiler.clear_error();
        self.resume_boiler = true;
    }

    /// Write settings changed during the tick (tare, shot counter,
    /// commissioning flag)
    fn persist_settings(&mut self) {
        if self.settings == self.stored {
            return;
        }
        if let Err(e) = save_settings(&mut self.storage, &self.settings) {
            warn!("Settings not persisted: {:?}", e);
        }
        // Retried on the next change rather than every tick
        self.stored = self.settings;
    }

    /// Answer one line received on the serial channel
    ///
    /// Reply lines (without terminator) are passed to `reply`. Lines that
    /// are not a command produce no reply and return the parse error.
    pub fn handle_line<F: FnMut(&str)>(
        &mut self,
        line: &str,
        mut reply: F,
    ) -> Result<(), ProtocolError> {
        let command = Command::parse(line)?;
        debug!("Serial command: {}", command.name());

        match command {
            Command::GetInfo => self.send_info(&mut reply),
            Command::GetSettings => {
                let line = self
                    .settings
                    .serialize()
                    .map_err(|_| ProtocolError::ResponseTooLong)?;
                send(&mut reply, Response::Raw(&line))?;
                send(&mut reply, Response::Done(command.name()))
            }
            Command::PutSettings(pairs) => self.put_settings(pairs, &mut reply),
        }
    }

    fn send_info<F: FnMut(&str)>(&mut self, reply: &mut F) -> Result<(), ProtocolError> {
        let weight = self.reservoir.weight();
        send(reply, field("firmwareVersion", format_args!("{}", FIRMWARE_VERSION)))?;
        send(reply, field("brewProcessState", format_args!("{}", self.brew.state_name())))?;
        send(reply, field("brewProcessError", format_args!("{}", self.brew.error_text())))?;
        send(
            reply,
            field("boilerControllerState", format_args!("{}", self.boiler.state_name())),
        )?;
        send(
            reply,
            field("boilerControllerError", format_args!("{}", self.boiler.error_text())),
        )?;
        send(reply, field("reservoirError", format_args!("{}", self.reservoir.error_text())))?;
        send(
            reply,
            field("boilerTemperature", format_args!("{:.2}", self.boiler.actual_temp())),
        )?;
        send(reply, field("reservoirWeight", format_args!("{:.2}", weight)))?;
        send(reply, field("shotCounter", format_args!("{}", self.settings.shot_counter())))?;
        send(reply, Response::Done("GET info"))
    }

    fn put_settings<F: FnMut(&str)>(
        &mut self,
        pairs: &str,
        reply: &mut F,
    ) -> Result<(), ProtocolError> {
        const PUT_SETTINGS: &str = "PUT settings";

        let previous = self.settings;
        if let Err(e) = self.settings.deserialize(pairs) {
            warn!("Rejected settings update: {:?}", e);
            return send(
                reply,
                Response::Rejected {
                    command: PUT_SETTINGS,
                    reason: e.as_str(),
                },
            );
        }

        match save_settings(&mut self.storage, &self.settings) {
            Ok(outcome) => {
                self.stored = self.settings;
                self.settings.apply_to(&mut self.boiler, &mut self.reservoir);
                send(reply, Response::Saved(outcome))
            }
            Err(e) => {
                warn!("Settings not persisted: {:?}", e);
                self.settings = previous;
                send(
                    reply,
                    Response::Rejected {
                        command: PUT_SETTINGS,
                        reason: "flash write failed",
                    },
                )
            }
        }
    }

    pub fn boiler(&self) -> &BoilerController<B::Rtd, B::Heater> {
        &self.boiler
    }

    pub fn boiler_mut(&mut self) -> &mut BoilerController<B::Rtd, B::Heater> {
        &mut self.boiler
    }

    pub fn brew(&self) -> &BrewProcess {
        &self.brew
    }

    pub fn reservoir_mut(&mut self) -> &mut Reservoir<B::LoadCell> {
        &mut self.reservoir
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pump(&self) -> &B::Pump {
        &self.pump
    }

    pub fn switch_mut(&mut self) -> &mut B::Switch {
        &mut self.switch
    }

    pub fn button_mut(&mut self) -> &mut B::Button {
        &mut self.button
    }

    pub fn led(&self) -> &B::Led {
        &self.led
    }

    pub fn storage_mut(&mut self) -> &mut B::Storage {
        &mut self.storage
    }

    pub fn watchdog(&self) -> &B::Watchdog {
        &self.watchdog
    }

    /// Whether the boiler is holding temperature
    pub fn is_ready(&self) -> bool {
        self.boiler.is_ready()
    }
}

fn field<'a>(key: &'a str, value: core::fmt::Arguments<'a>) -> Response<'a> {
    Response::Field { key, value }
}

fn send<F: FnMut(&str)>(reply: &mut F, response: Response<'_>) -> Result<(), ProtocolError> {
    let line = response.render()?;
    reply(&line);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boiler::{BoilerError, BoilerState};
    use crate::brew::BrewState;
    use crate::config::read_record;
    use crate::traits::{
        Color, LoadCell, PumpOutput, SensorError, StatusIndicator, TemperatureSensor,
    };
    use crema_hal::{FlashError, FlashStorage, StorageKey};
    use std::string::{String, ToString};
    use std::vec::Vec;

    struct MockRtd {
        reading: Result<f32, SensorError>,
    }

    impl TemperatureSensor for MockRtd {
        fn read_celsius(&mut self) -> Result<f32, SensorError> {
            self.reading
        }

        fn clear_fault(&mut self) {}
    }

    #[derive(Default)]
    struct MockHeater {
        power: f32,
        updates: u32,
    }

    impl HeaterOutput for MockHeater {
        fn set_power(&mut self, percent: f32) {
            self.power = percent;
        }

        fn power(&self) -> f32 {
            self.power
        }

        fn average_power(&self) -> f32 {
            self.power
        }

        fn update(&mut self, _now_us: u32) {
            self.updates += 1;
        }
    }

    #[derive(Default)]
    struct MockPump {
        on: bool,
    }

    impl PumpOutput for MockPump {
        fn set_on(&mut self, on: bool) {
            self.on = on;
        }

        fn is_on(&self) -> bool {
            self.on
        }
    }

    /// Raw count for 1000 g with the default calibration
    const RAW_1000_G: i32 = 667_400;
    const RAW_800_G: i32 = 581_920;

    struct MockCell {
        raw: i32,
    }

    impl LoadCell for MockCell {
        fn read_raw(&mut self) -> Option<i32> {
            Some(self.raw)
        }
    }

    #[derive(Default)]
    struct MockSwitch {
        up: bool,
    }

    impl BrewSwitch for MockSwitch {
        fn is_up(&mut self) -> bool {
            self.up
        }
    }

    #[derive(Default)]
    struct MockButton {
        pressed: bool,
    }

    impl ConfirmButton for MockButton {
        fn take_press(&mut self) -> bool {
            core::mem::take(&mut self.pressed)
        }
    }

    struct MockLed {
        color: Color,
    }

    impl StatusIndicator for MockLed {
        fn set_color(&mut self, color: Color) {
            self.color = color;
        }
    }

    #[derive(Default)]
    struct MockFlash {
        data: Option<Vec<u8>>,
        writes: u32,
        fail_writes: bool,
    }

    impl FlashStorage for MockFlash {
        fn read(&mut self, _key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
            let data = self.data.as_ref().ok_or(FlashError::NotFound)?;
            let dest = buffer.get_mut(..data.len()).ok_or(FlashError::BufferTooSmall)?;
            dest.copy_from_slice(data);
            Ok(data.len())
        }

        fn write(&mut self, _key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
            if self.fail_writes {
                return Err(FlashError::Flash);
            }
            self.data = Some(data.to_vec());
            self.writes += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockWatchdog {
        timeout_ms: Option<u32>,
        feeds: u32,
    }

    impl Watchdog for MockWatchdog {
        fn start(&mut self, timeout_ms: u32) {
            self.timeout_ms = Some(timeout_ms);
        }

        fn feed(&mut self) {
            self.feeds += 1;
        }
    }

    struct TestBoard;

    impl Board for TestBoard {
        type Rtd = MockRtd;
        type Heater = MockHeater;
        type Pump = MockPump;
        type LoadCell = MockCell;
        type Switch = MockSwitch;
        type Button = MockButton;
        type Led = MockLed;
        type Storage = MockFlash;
        type Watchdog = MockWatchdog;
    }

    struct Rig {
        machine: Machine<TestBoard>,
        now: u32,
    }

    impl Rig {
        fn with_storage(storage: MockFlash) -> Self {
            let parts = Peripherals::<TestBoard> {
                rtd: MockRtd { reading: Ok(20.0) },
                heater: MockHeater::default(),
                pump: MockPump::default(),
                load_cell: MockCell { raw: RAW_1000_G },
                switch: MockSwitch::default(),
                button: MockButton::default(),
                led: MockLed { color: Color::Black },
                storage,
                watchdog: MockWatchdog::default(),
            };
            let mut machine = Machine::new(parts, MachineConfig::default());
            machine.init(0);
            Self { machine, now: 0 }
        }

        fn new() -> Self {
            Self::with_storage(MockFlash::default())
        }

        /// Fresh machine with commissioning already stored
        fn commissioned() -> Self {
            let mut settings = Settings::new();
            settings.set_commissioning_done(true);
            let mut flash = MockFlash::default();
            save_settings(&mut flash, &settings).unwrap();
            flash.writes = 0;
            Self::with_storage(flash)
        }

        fn tick(&mut self) {
            self.now += 1000;
            self.machine.tick(self.now);
        }

        fn ticks(&mut self, n: u32) {
            for _ in 0..n {
                self.tick();
            }
        }

        fn press(&mut self) {
            self.machine.button_mut().pressed = true;
            self.tick();
        }

        fn request(&mut self, line: &str) -> Vec<String> {
            let mut lines = Vec::new();
            self.machine
                .handle_line(line, |l| lines.push(l.to_string()))
                .unwrap();
            lines
        }
    }

    #[test]
    fn test_init_arms_watchdog_and_loads_defaults() {
        let mut rig = Rig::new();
        assert_eq!(rig.machine.watchdog().timeout_ms, Some(8_000));
        assert_eq!(*rig.machine.settings(), Settings::new());

        rig.ticks(3);
        assert_eq!(rig.machine.watchdog().feeds, 3);
        assert_eq!(rig.machine.brew().state(), BrewState::Init);
        assert!(!rig.machine.boiler().is_on());
    }

    #[test]
    fn test_commissioning_persists_tare_and_flag() {
        let mut rig = Rig::new();
        rig.tick();
        rig.press();
        assert_eq!(rig.machine.brew().state(), BrewState::Fill);
        // Tare was stored right away
        assert_eq!(rig.machine.storage_mut().writes, 1);
        rig.tick();
        assert!(rig.machine.pump().on);
        assert_eq!(rig.machine.led().color, Color::White);

        // Fill, then water arrives at the group
        rig.ticks(15);
        assert_eq!(rig.machine.brew().state(), BrewState::Purge);
        rig.machine.switch_mut().up = true;
        rig.tick();
        rig.tick();
        assert_eq!(rig.machine.brew().state(), BrewState::Check);

        // Tared full at 1500 g, 200 g pumped out since
        rig.machine.reservoir_mut().cell_mut().raw = RAW_800_G;
        rig.press();
        rig.tick();
        assert_eq!(rig.machine.brew().state(), BrewState::Done);
        assert!(!rig.machine.pump().on);

        rig.machine.switch_mut().up = false;
        rig.tick();
        rig.tick();
        assert_eq!(rig.machine.brew().state(), BrewState::Idle);

        let record = read_record(rig.machine.storage_mut()).unwrap();
        assert!(record.settings.commissioning_done());
        assert_eq!(record.settings, *rig.machine.settings());
    }

    #[test]
    fn test_commissioned_machine_heats_on_startup() {
        let mut rig = Rig::commissioned();
        rig.ticks(4);
        assert_eq!(rig.machine.brew().state(), BrewState::Idle);
        assert!(rig.machine.boiler().is_on());
        assert_eq!(rig.machine.boiler().state(), BoilerState::Heating);
        assert!(rig.machine.boiler().power() > 0.0);
        // Nothing changed, nothing written
        assert_eq!(rig.machine.storage_mut().writes, 0);
    }

    #[test]
    fn test_shot_counter_is_persisted() {
        let mut rig = Rig::commissioned();
        rig.ticks(3);
        rig.machine.switch_mut().up = true;
        rig.ticks(2);
        assert_eq!(rig.machine.brew().state(), BrewState::PreInfuse);
        assert_eq!(rig.machine.settings().shot_counter(), 1);

        let record = read_record(rig.machine.storage_mut()).unwrap();
        assert_eq!(record.settings.shot_counter(), 1);
    }

    #[test]
    fn test_failed_flash_write_does_not_stop_the_loop() {
        let mut rig = Rig::new();
        rig.machine.storage_mut().fail_writes = true;
        rig.tick();
        rig.press();
        assert_eq!(rig.machine.brew().state(), BrewState::Fill);
        rig.tick();
        assert_eq!(rig.machine.watchdog().feeds, 3);
    }

    #[test]
    fn test_service_heater_forwards_time() {
        let mut rig = Rig::new();
        rig.machine.service_heater(10);
        rig.machine.service_heater(20);
        assert_eq!(rig.machine.boiler().heater().updates, 2);
    }

    #[test]
    fn test_sleep_and_wakeup_messages() {
        let mut rig = Rig::commissioned();
        rig.ticks(3);
        rig.machine.post(BrewMessage::Sleep);
        rig.ticks(2);
        assert_eq!(rig.machine.brew().state(), BrewState::Sleep);
        assert!(!rig.machine.boiler().is_on());

        rig.machine.post(BrewMessage::Wakeup);
        rig.ticks(2);
        assert_eq!(rig.machine.brew().state(), BrewState::Idle);
        assert!(rig.machine.boiler().is_on());
    }

    #[test]
    fn test_get_info() {
        let mut rig = Rig::commissioned();
        rig.ticks(3);
        let lines = rig.request("GET info");
        assert_eq!(
            lines,
            [
                format!("firmwareVersion={}", FIRMWARE_VERSION),
                "brewProcessState=IDLE".to_string(),
                "brewProcessError=NONE".to_string(),
                "boilerControllerState=HEATING".to_string(),
                "boilerControllerError=NONE".to_string(),
                "reservoirError=OK".to_string(),
                "boilerTemperature=20.00".to_string(),
                "reservoirWeight=1000.00".to_string(),
                "shotCounter=0".to_string(),
                "GET info OK".to_string(),
            ]
        );
    }

    #[test]
    fn test_get_settings() {
        let mut rig = Rig::new();
        let lines = rig.request("GET settings");
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("temperature=98.00,"));
        assert!(lines[0].contains("commissioningDone=0"));
        assert_eq!(lines[1], "GET settings OK");
    }

    #[test]
    fn test_put_settings_saves_and_applies() {
        let mut rig = Rig::new();
        let lines = rig.request("PUT settings temperature=93.50,P=5.00");
        assert_eq!(lines, ["PUT settings OK, settings saved."]);
        assert_eq!(rig.machine.boiler().set_temp(), 93.5);
        assert_eq!(rig.machine.boiler().gains().kp, 5.0);

        let record = read_record(rig.machine.storage_mut()).unwrap();
        assert_eq!(record.settings.temperature(), 93.5);

        let lines = rig.request("PUT settings temperature=93.50");
        assert_eq!(lines, ["PUT settings OK, no changes."]);
        assert_eq!(rig.machine.storage_mut().writes, 1);
    }

    #[test]
    fn test_put_settings_rejects_bad_input() {
        let mut rig = Rig::new();
        let lines = rig.request("PUT settings temperature=93.50,bogus=1");
        assert_eq!(lines, ["PUT settings NOK, unknown key: settings not saved"]);
        assert_eq!(rig.machine.settings().temperature(), 98.0);

        let lines = rig.request("PUT settings temperature");
        assert_eq!(
            lines,
            ["PUT settings NOK, invalid input string format: settings not saved"]
        );
        assert_eq!(rig.machine.storage_mut().writes, 0);
    }

    #[test]
    fn test_put_settings_rolls_back_on_flash_failure() {
        let mut rig = Rig::new();
        rig.machine.storage_mut().fail_writes = true;
        let lines = rig.request("PUT settings temperature=93.50");
        assert_eq!(lines, ["PUT settings NOK, flash write failed"]);
        assert_eq!(rig.machine.settings().temperature(), 98.0);
        assert_eq!(rig.machine.boiler().set_temp(), 98.0);
    }

    #[test]
    fn test_unknown_command_gets_no_reply() {
        let mut rig = Rig::new();
        let mut replies = 0;
        let result = rig.machine.handle_line("HELLO", |_| replies += 1);
        assert_eq!(result, Err(ProtocolError::UnknownCommand));
        assert_eq!(replies, 0);
    }

    #[test]
    fn test_boiler_fault_is_reported_and_cleared() {
        let mut rig = Rig::commissioned();
        rig.ticks(3);
        rig.machine.boiler_mut().sensor_mut().reading = Err(SensorError::Fault(0x80));
        rig.tick();
        assert_eq!(rig.machine.boiler().error(), BoilerError::Rtd);
        assert_eq!(rig.machine.boiler().power(), 0.0);

        let lines = rig.request("GET info");
        assert!(lines.contains(&"boilerControllerError=ERROR_RTD".to_string()));

        rig.machine.boiler_mut().sensor_mut().reading = Ok(90.0);
        rig.machine.clear_boiler_error();
        rig.ticks(2);
        assert!(!rig.machine.boiler().is_error());
    }

    #[test]
    fn test_cleared_boiler_fault_resumes_heating_in_idle() {
        let mut rig = Rig::commissioned();
        rig.ticks(3);
        assert_eq!(rig.machine.brew().state(), BrewState::Idle);
        assert!(rig.machine.boiler().is_on());

        rig.machine.boiler_mut().sensor_mut().reading = Err(SensorError::Fault(0x80));
        rig.tick();
        assert!(rig.machine.boiler().is_error());
        assert!(!rig.machine.boiler().is_on());

        // Acknowledging while the fault persists changes nothing
        rig.machine.clear_boiler_error();
        rig.ticks(2);
        assert!(rig.machine.boiler().is_error());
        assert!(!rig.machine.boiler().is_on());

        rig.machine.boiler_mut().sensor_mut().reading = Ok(20.0);
        rig.machine.clear_boiler_error();
        rig.ticks(3);
        assert_eq!(rig.machine.brew().state(), BrewState::Idle);
        assert!(rig.machine.boiler().is_on());
        assert_eq!(rig.machine.boiler().set_temp(), 98.0);
        assert_eq!(rig.machine.boiler().state(), BoilerState::Heating);
        assert!(rig.machine.boiler().power() > 0.0);
    }
}
