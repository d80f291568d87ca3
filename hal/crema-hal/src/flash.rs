//! Flash storage abstractions
//!
//! Provides a blocking key-value storage trait implemented by board HALs
//! on top of their flash or EEPROM emulation. Access happens from the
//! single control loop, so no locking or async plumbing is involved.

/// Storage keys for persisted data
///
/// Each key identifies one independently versioned record. The storage
/// implementation is responsible for wear leveling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StorageKey {
    /// Persisted user settings and calibration (postcard + CRC32)
    Settings = 0,
    /// Reserved for future use
    Reserved1 = 1,
}

impl StorageKey {
    /// Get the key as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a key from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(StorageKey::Settings),
            1 => Some(StorageKey::Reserved1),
            _ => None,
        }
    }
}

/// Errors from flash storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Flash operation failed
    Flash,
    /// Key not found (never written, or storage erased)
    NotFound,
    /// Buffer too small for the data
    BufferTooSmall,
    /// Storage is full
    Full,
}

/// Flash storage trait
///
/// Blocking key-value storage for configuration records.
/// Implementations should handle:
/// - Wear leveling across flash sectors
/// - Atomic replacement of a record where possible
pub trait FlashStorage {
    /// Read a value by key into the provided buffer
    ///
    /// # Returns
    /// The number of bytes read, or an error.
    fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError>;

    /// Write (replace) a value by key
    fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError>;

    /// Check if a key exists in storage
    fn exists(&mut self, key: StorageKey) -> bool {
        let mut scratch = [0u8; 1];
        !matches!(self.read(key, &mut scratch), Err(FlashError::NotFound))
    }
}
