//! Error taxonomy for the device link.
//!
//! Only [`LinkError::NoAdapter`] is fatal: without Bluetooth hardware the
//! binaries exit.  Every other variant is reported to the user once and
//! leaves the link idle; nothing is retried.

use thiserror::Error;
use uuid::Uuid;

/// Convenience alias for results produced by [`crate::emg_client`].
pub type LinkResult<T> = std::result::Result<T, LinkError>;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("No Bluetooth adapter found")]
    NoAdapter,

    /// Adapter present but not usable: radio off or Bluetooth access not
    /// granted to this process.
    #[error("Bluetooth adapter unavailable (state: {0}); check that Bluetooth is on and access is granted")]
    AdapterUnavailable(String),

    #[error("BLE scan failed: {0}")]
    ScanFailed(String),

    #[error("Timed out scanning for '{name}' after {secs} s")]
    ScanTimeout { name: String, secs: u64 },

    #[error("BLE connect() timed out after {0} s")]
    ConnectTimeout(u64),

    #[error("GATT service {0} not found")]
    ServiceNotFound(Uuid),

    #[error("Characteristic {0} not found")]
    CharacteristicNotFound(Uuid),

    #[error("Bluetooth error: {0}")]
    Ble(#[from] btleplug::Error),
}

impl LinkError {
    /// `true` for errors the application cannot continue past.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LinkError::NoAdapter)
    }

    /// `true` for failures raised before a device was found.  The rest come
    /// from connecting to, discovering, or subscribing on the found device.
    pub fn is_scan_phase(&self) -> bool {
        matches!(
            self,
            LinkError::NoAdapter
                | LinkError::AdapterUnavailable(_)
                | LinkError::ScanFailed(_)
                | LinkError::ScanTimeout { .. }
        )
    }
}
