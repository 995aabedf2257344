//! # emg-ble
//!
//! Async Rust library and terminal UI for streaming electromyography samples
//! from a single named Bluetooth Low Energy sensor.
//!
//! The sensor (an Arduino-class board advertising as `"Aadit"`) exposes one
//! GATT service with one notify characteristic; every notification carries a
//! single unsigned byte that is the EMG sample value.
//!
//! ## Quick start
//!
//! ```no_run
//! use emg_ble::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = EmgClient::new(EmgClientConfig::default());
//!     let (mut rx, handle) = client.connect().await?;
//!
//!     let mut monitor = EmgMonitor::default();
//!     monitor
//!         .run(&mut rx, |_, update| {
//!             if let Update::Label(text) = update {
//!                 println!("{text}");
//!             }
//!         })
//!         .await;
//!
//!     handle.disconnect().await.ok();
//!     Ok(())
//! }
//! ```
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`prelude`] | One-line glob import of the most commonly needed types |
//! | [`emg_client`] | BLE scanning, connecting, and the [`emg_client::EmgHandle`] |
//! | [`monitor`] | Folds events into link state, latest value, and sample window |
//! | [`ring_buffer`] | Fixed-capacity overwrite-oldest [`ring_buffer::CircularBuffer`] |
//! | [`types`] | Event and sample types produced by the client |
//! | [`protocol`] | Device name, GATT UUIDs, and the payload decoder |
//! | [`error`] | [`error::LinkError`] taxonomy |

pub mod emg_client;
pub mod error;
pub mod monitor;
pub mod protocol;
pub mod ring_buffer;
pub mod types;

// ── Prelude ───────────────────────────────────────────────────────────────────

/// Convenience re-exports for downstream crates.
pub mod prelude {
    // ── Client ────────────────────────────────────────────────────────────────
    pub use crate::emg_client::{EmgClient, EmgClientConfig, EmgHandle};
    pub use crate::error::{LinkError, LinkResult};

    // ── Consumer side ─────────────────────────────────────────────────────────
    pub use crate::monitor::{EmgMonitor, Notice, NoticeKind, Update, DEFAULT_WINDOW};
    pub use crate::ring_buffer::{CircularBuffer, RingBufferError};
    pub use crate::types::{EmgEvent, EmgSample, LinkState};

    // ── Protocol constants ────────────────────────────────────────────────────
    pub use crate::protocol::{DEVICE_NAME, EMG_CHARACTERISTIC_UUID, EMG_SERVICE_UUID};
}
