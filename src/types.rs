use std::fmt;

/// One EMG sample received from the sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmgSample {
    /// Raw unsigned byte from the notification, used without scaling.
    pub value: u8,
    /// Wall-clock receive time in milliseconds since Unix epoch.
    ///
    /// The sensor does not stamp its packets, so this is the moment the
    /// notification reached the host.
    pub timestamp: f64,
}

/// Connection state of the device link as seen by the consumer.
///
/// ```text
/// Idle ──▶ Scanning ──▶ Connecting ──▶ Connected ──▶ Disconnected
///
/// Scanning   ── scan failure    ──▶ Idle
/// Connecting ── connect failure ──▶ Idle
/// any        ── new scan        ──▶ Idle ──▶ Scanning
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LinkState {
    /// No scan running.  Initial state, and the state after a failed attempt.
    #[default]
    Idle,
    Scanning,
    /// Target found; GATT connection and subscription in progress.
    Connecting(String),
    /// Subscribed and receiving notifications.
    Connected(String),
    /// Link dropped.  Reported once; no reconnection is attempted.
    Disconnected,
}

impl LinkState {
    /// `true` while a scan or connection attempt is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, LinkState::Scanning | LinkState::Connecting(_))
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Idle => f.write_str("idle"),
            LinkState::Scanning => f.write_str("scanning"),
            LinkState::Connecting(name) => write!(f, "connecting to {name}"),
            LinkState::Connected(name) => write!(f, "connected to {name}"),
            LinkState::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// Events emitted by [`crate::emg_client::EmgClient`].
///
/// Consumers receive these through the `mpsc::Receiver` returned by
/// [`crate::emg_client::EmgClient::connect`] or
/// [`crate::emg_client::EmgClient::start`], and normally hand them to
/// [`crate::monitor::EmgMonitor::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum EmgEvent {
    /// The RF scan has started.
    Scanning,
    /// A device with the configured name was found and a connection is
    /// being established.  Carries the advertised name.
    Connecting(String),
    /// GATT services discovered and the EMG characteristic subscribed.
    Connected(String),
    /// One EMG notification.
    Sample(EmgSample),
    /// No device could be found: adapter unusable, scan refused, or scan
    /// timed out.  No retry follows.
    ScanFailed(String),
    /// The device was found but connecting, service discovery, or
    /// subscription failed.  The link is released and no retry follows.
    ConnectFailed(String),
    /// The BLE link was lost.  Sent at most once per connection; samples
    /// already queued may still precede it.  The channel closes only after
    /// every link task has finished, which may be later.
    Disconnected,
}
