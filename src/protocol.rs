//! GATT UUIDs, the advertised device name, and the notification payload
//! decoder for the EMG sensor peripheral.
//!
//! Both UUIDs belong to the vendor namespace
//! `19b1XXXX-e8f2-537e-4f6c-d104768a1214` used by the Arduino BLE examples
//! the sensor firmware is built from.

use uuid::Uuid;

// ── Advertisement ────────────────────────────────────────────────────────────

/// Local name the sensor advertises.  Scans match it exactly (no prefix or
/// case folding).
pub const DEVICE_NAME: &str = "Aadit";

// ── Service ──────────────────────────────────────────────────────────────────

/// Primary GATT service carrying the EMG characteristic.
pub const EMG_SERVICE_UUID: Uuid = Uuid::from_u128(0x19b10000_e8f2_537e_4f6c_d104768a1214);

// ── Characteristics ───────────────────────────────────────────────────────────

/// Notify characteristic; each notification carries one EMG sample.
///
/// Subscribing writes `ENABLE_NOTIFICATION_VALUE` to its Client
/// Characteristic Configuration descriptor.
pub const EMG_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x19b10001_e8f2_537e_4f6c_d104768a1214);

// ── Payload ───────────────────────────────────────────────────────────────────

/// Decode one EMG notification.
///
/// The sensor sends a single unsigned byte per notification and the value is
/// used as-is: no scaling, no multi-byte framing.  Any trailing bytes are
/// ignored.  Returns `None` for an empty payload.
///
/// ```
/// # use emg_ble::protocol::decode_emg_sample;
/// assert_eq!(decode_emg_sample(&[0xC8]), Some(200));
/// assert_eq!(decode_emg_sample(&[]), None);
/// ```
pub fn decode_emg_sample(payload: &[u8]) -> Option<u8> {
    payload.first().copied()
}
