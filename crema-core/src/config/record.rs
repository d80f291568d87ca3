//! Persisted settings record
//!
//! The settings are stored as one postcard-encoded record under
//! [`StorageKey::Settings`], framed by a magic number, a layout version
//! and a CRC32 over the settings fields. Anything that fails to decode
//! or validate is discarded in favour of factory defaults.

use serde::{Deserialize, Serialize};

use crema_hal::{FlashError, FlashStorage, StorageKey};
use crema_protocol::SaveOutcome;

use super::settings::Settings;

/// Magic number to identify a settings record
pub const SETTINGS_MAGIC: u32 = 0x4352_4D41; // "CRMA"

/// Current record layout version
///
/// Bump whenever a field is added to [`Settings`].
pub const SETTINGS_VERSION: u8 = 1;

/// Maximum serialized record size
const MAX_RECORD_SIZE: usize = 128;

/// Settings persistence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PersistError {
    /// Flash operation failed
    Flash(FlashError),
    /// Serialization failed
    Serialize,
    /// Deserialization failed
    Deserialize,
    /// CRC check failed
    CrcMismatch,
    /// Invalid magic or version
    InvalidFormat,
}

impl From<FlashError> for PersistError {
    fn from(e: FlashError) -> Self {
        PersistError::Flash(e)
    }
}

/// Settings as stored in flash
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SettingsRecord {
    /// Magic number for validation
    pub magic: u32,
    /// Layout version
    pub version: u8,
    pub settings: Settings,
    /// CRC32 over magic, version and every settings field
    pub crc: u32,
}

impl SettingsRecord {
    /// Wrap settings in a record with a valid CRC
    pub fn new(settings: Settings) -> Self {
        let mut record = Self {
            magic: SETTINGS_MAGIC,
            version: SETTINGS_VERSION,
            settings,
            crc: 0,
        };
        record.update_crc();
        record
    }

    /// Check magic and version
    pub fn is_valid(&self) -> bool {
        self.magic == SETTINGS_MAGIC && self.version == SETTINGS_VERSION
    }

    /// Calculate CRC32 for the record (excluding the crc field itself)
    pub fn calculate_crc(&self) -> u32 {
        let s = &self.settings;
        let mut crc: u32 = 0xFFFF_FFFF;

        crc = crc32_update(crc, &self.magic.to_le_bytes());
        crc = crc32_update(crc, &[self.version]);

        for value in [
            s.temperature(),
            s.pre_infusion_time(),
            s.infusion_time(),
            s.extraction_time(),
            s.extraction_weight(),
            s.kp(),
            s.ki(),
            s.kd(),
            s.ff_heat(),
            s.ff_ready(),
            s.ff_brew(),
            s.tare_weight(),
            s.trim_weight(),
        ] {
            crc = crc32_update(crc, &value.to_le_bytes());
        }
        crc = crc32_update(crc, &s.shot_counter().to_le_bytes());
        crc = crc32_update(crc, &[s.commissioning_done() as u8]);
        crc = crc32_update(crc, &[s.wifi_mode().index()]);

        !crc
    }

    /// Update the CRC field
    pub fn update_crc(&mut self) {
        self.crc = self.calculate_crc();
    }

    /// Verify the CRC is correct
    pub fn verify_crc(&self) -> bool {
        self.crc == self.calculate_crc()
    }
}

/// CRC32 update (IEEE 802.3 polynomial, reflected)
fn crc32_update(crc: u32, data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc = crc;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

/// Load settings from flash
///
/// Returns the stored settings, or factory defaults if nothing valid is
/// stored.
pub fn load_settings<F: FlashStorage>(storage: &mut F) -> Settings {
    match read_record(storage) {
        Ok(record) => {
            info!("Loaded settings from flash");
            record.settings
        }
        Err(PersistError::Flash(FlashError::NotFound)) => {
            debug!("No settings in flash, using defaults");
            Settings::new()
        }
        Err(e) => {
            warn!("Failed to load settings: {:?}, using defaults", e);
            Settings::new()
        }
    }
}

/// Read and validate the stored record
pub fn read_record<F: FlashStorage>(storage: &mut F) -> Result<SettingsRecord, PersistError> {
    let mut buffer = [0u8; MAX_RECORD_SIZE];
    let len = storage.read(StorageKey::Settings, &mut buffer)?;

    let record: SettingsRecord =
        postcard::from_bytes(&buffer[..len]).map_err(|_| PersistError::Deserialize)?;

    if !record.is_valid() {
        return Err(PersistError::InvalidFormat);
    }

    if !record.verify_crc() {
        warn!("Settings CRC mismatch");
        return Err(PersistError::CrcMismatch);
    }

    Ok(record)
}

/// Save settings to flash
///
/// The write is skipped when the stored record already holds identical
/// bytes, sparing the flash an erase cycle.
pub fn save_settings<F: FlashStorage>(
    storage: &mut F,
    settings: &Settings,
) -> Result<SaveOutcome, PersistError> {
    let record = SettingsRecord::new(*settings);

    let mut buffer = [0u8; MAX_RECORD_SIZE];
    let bytes = postcard::to_slice(&record, &mut buffer).map_err(|_| PersistError::Serialize)?;

    let mut stored = [0u8; MAX_RECORD_SIZE];
    match storage.read(StorageKey::Settings, &mut stored) {
        Ok(len) if stored[..len] == *bytes => {
            debug!("Settings unchanged, skipping write");
            return Ok(SaveOutcome::Unchanged);
        }
        // Missing, unreadable or different: rewrite
        _ => {}
    }

    debug!("Saving {} bytes of settings to flash", bytes.len());
    storage.write(StorageKey::Settings, bytes)?;
    info!("Saved settings to flash");

    Ok(SaveOutcome::Saved)
}
