//! Board description
//!
//! A board names the concrete device types it provides; the machine is
//! generic over one [`Board`] instead of a type parameter per device.

use crema_hal::{FlashStorage, Watchdog};

use crate::traits::{
    BrewSwitch, ConfirmButton, HeaterOutput, LoadCell, PumpOutput, StatusIndicator,
    TemperatureSensor,
};

/// Device types of one board
pub trait Board {
    type Rtd: TemperatureSensor;
    type Heater: HeaterOutput;
    type Pump: PumpOutput;
    type LoadCell: LoadCell;
    type Switch: BrewSwitch;
    type Button: ConfirmButton;
    type Led: StatusIndicator;
    type Storage: FlashStorage;
    type Watchdog: Watchdog;
}

/// Initialised devices handed to [`super::Machine::new`]
pub struct Peripherals<B: Board> {
    pub rtd: B::Rtd,
    pub heater: B::Heater,
    pub pump: B::Pump,
    pub load_cell: B::LoadCell,
    pub switch: B::Switch,
    pub button: B::Button,
    pub led: B::Led,
    pub storage: B::Storage,
    pub watchdog: B::Watchdog,
}
