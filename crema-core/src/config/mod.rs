//! Configuration types
//!
//! - [`settings`]: user tunables, edited over the serial channel
//! - [`record`]: the CRC-protected flash record holding them
//! - [`tuning`]: compile-time constants of the control loops

pub mod record;
pub mod settings;
pub mod tuning;

pub use record::{load_settings, read_record, save_settings, PersistError, SettingsRecord};
pub use settings::{Settings, SettingsError, SettingsLine, WifiMode};
pub use tuning::{BoilerConfig, BrewConfig, ReservoirConfig};
