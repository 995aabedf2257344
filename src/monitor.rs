//! Single consumer of the device-link event stream.
//!
//! [`EmgMonitor`] folds [`EmgEvent`]s into the state a front-end displays:
//! the link state, the latest sample, and a rolling window of recent samples
//! held in a [`CircularBuffer`].  Every state change yields at most one
//! [`Update`] for the front-end to show: a transient [`Notice`] or a new
//! value label.
//!
//! ```
//! # use emg_ble::monitor::{EmgMonitor, Update};
//! # use emg_ble::types::{EmgEvent, EmgSample};
//! let mut monitor = EmgMonitor::new(4);
//! monitor.apply(EmgEvent::Connected("Aadit".into()));
//! let update = monitor.apply(EmgEvent::Sample(EmgSample { value: 42, timestamp: 0.0 }));
//! assert_eq!(update, Some(Update::Label("EMG Data: 42".into())));
//! ```

use log::{info, warn};
use tokio::sync::mpsc;

use crate::ring_buffer::{CircularBuffer, RingBufferError};
use crate::types::{EmgEvent, EmgSample, LinkState};

/// Default number of samples kept in the rolling window.
pub const DEFAULT_WINDOW: usize = 256;

/// Severity of a [`Notice`]; front-ends pick colours from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warning,
}

/// A short, transient, user-facing message (the equivalent of a toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            text: text.into(),
        }
    }
}

/// What a front-end should refresh after [`EmgMonitor::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    Notice(Notice),
    /// New value label, e.g. `"EMG Data: 42"`.
    Label(String),
}

/// Link state, latest value, and sample window for one sensor session.
#[derive(Debug, Clone)]
pub struct EmgMonitor {
    state: LinkState,
    last: Option<EmgSample>,
    window: CircularBuffer<u8>,
    samples_received: u64,
}

impl Default for EmgMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl EmgMonitor {
    /// # Panics
    /// Panics if `window` is zero.
    pub fn new(window: usize) -> Self {
        Self::from_buffer(CircularBuffer::new(window))
    }

    /// Fallible counterpart of [`EmgMonitor::new`] for user-supplied sizes.
    pub fn try_new(window: usize) -> Result<Self, RingBufferError> {
        CircularBuffer::try_new(window).map(Self::from_buffer)
    }

    fn from_buffer(window: CircularBuffer<u8>) -> Self {
        Self {
            state: LinkState::Idle,
            last: None,
            window,
            samples_received: 0,
        }
    }

    /// Fold one event into the monitor.
    pub fn apply(&mut self, event: EmgEvent) -> Option<Update> {
        match event {
            EmgEvent::Scanning => {
                self.state = LinkState::Scanning;
                Some(Update::Notice(Notice::info("Scanning for BLE Device...")))
            }
            EmgEvent::Connecting(name) => {
                let text = format!("Connecting to {name}");
                self.state = LinkState::Connecting(name);
                Some(Update::Notice(Notice::info(text)))
            }
            EmgEvent::Connected(name) => {
                self.state = LinkState::Connected(name);
                Some(Update::Notice(Notice::info("Connected!")))
            }
            EmgEvent::Sample(sample) => {
                self.last = Some(sample);
                self.window.push(sample.value);
                self.samples_received += 1;
                Some(Update::Label(self.label()))
            }
            EmgEvent::ScanFailed(reason) => {
                self.state = LinkState::Idle;
                Some(Update::Notice(Notice::warning(format!(
                    "Scan failed: {reason}"
                ))))
            }
            EmgEvent::ConnectFailed(reason) => {
                self.state = LinkState::Idle;
                Some(Update::Notice(Notice::warning(format!(
                    "Connection failed: {reason}"
                ))))
            }
            EmgEvent::Disconnected => {
                if self.state == LinkState::Disconnected {
                    return None;
                }
                self.state = LinkState::Disconnected;
                Some(Update::Notice(Notice::warning("Disconnected!")))
            }
        }
    }

    /// Drain `rx`, applying every event and passing each resulting update to
    /// `on_update`.  Returns after [`EmgEvent::Disconnected`] or when the
    /// sender side closes.
    pub async fn run<F>(&mut self, rx: &mut mpsc::Receiver<EmgEvent>, mut on_update: F)
    where
        F: FnMut(&EmgMonitor, Update),
    {
        while let Some(event) = rx.recv().await {
            let finished = matches!(event, EmgEvent::Disconnected);
            if let Some(update) = self.apply(event) {
                on_update(&*self, update);
            }
            if finished {
                info!("Monitor: link closed after {} samples", self.samples_received);
                return;
            }
        }
        if self.state.is_busy() {
            warn!("Monitor: event stream closed while {}", self.state);
        }
    }

    /// Text shown in the value label: `EMG Data: <n>`, or `EMG Data: --`
    /// before the first sample.
    pub fn label(&self) -> String {
        match self.last {
            Some(s) => format!("EMG Data: {}", s.value),
            None => "EMG Data: --".to_owned(),
        }
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn last_sample(&self) -> Option<EmgSample> {
        self.last
    }

    pub fn last_value(&self) -> Option<u8> {
        self.last.map(|s| s.value)
    }

    /// Rolling window of recent sample values, oldest first.
    pub fn window(&self) -> &CircularBuffer<u8> {
        &self.window
    }

    /// Total samples applied since construction (not bounded by the window).
    pub fn samples_received(&self) -> u64 {
        self.samples_received
    }

    /// Empty the window; the latest value and link state are kept.
    pub fn clear_window(&mut self) {
        self.window.clear();
    }

    /// Forget everything about the previous session before a new scan.
    pub fn reset(&mut self) {
        self.state = LinkState::Idle;
        self.last = None;
        self.window.clear();
        self.samples_received = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: u8) -> EmgEvent {
        EmgEvent::Sample(EmgSample {
            value,
            timestamp: 1_000.0,
        })
    }

    fn notice_text(update: Option<Update>) -> String {
        match update {
            Some(Update::Notice(n)) => n.text,
            other => panic!("expected notice, got {other:?}"),
        }
    }

    #[test]
    fn lifecycle_notices_follow_link_states() {
        let mut m = EmgMonitor::new(8);
        assert_eq!(m.state(), &LinkState::Idle);

        assert_eq!(
            notice_text(m.apply(EmgEvent::Scanning)),
            "Scanning for BLE Device..."
        );
        assert_eq!(m.state(), &LinkState::Scanning);

        assert_eq!(
            notice_text(m.apply(EmgEvent::Connecting("Aadit".into()))),
            "Connecting to Aadit"
        );
        assert_eq!(m.state(), &LinkState::Connecting("Aadit".into()));

        assert_eq!(
            notice_text(m.apply(EmgEvent::Connected("Aadit".into()))),
            "Connected!"
        );
        assert_eq!(m.state(), &LinkState::Connected("Aadit".into()));

        assert_eq!(notice_text(m.apply(EmgEvent::Disconnected)), "Disconnected!");
        assert_eq!(m.state(), &LinkState::Disconnected);
    }

    #[test]
    fn samples_update_label_and_window() {
        let mut m = EmgMonitor::new(3);
        assert_eq!(m.label(), "EMG Data: --");
        for v in [10, 20, 30, 40] {
            m.apply(sample(v));
        }
        assert_eq!(m.label(), "EMG Data: 40");
        assert_eq!(m.last_value(), Some(40));
        assert_eq!(m.window().to_vec(), vec![20, 30, 40]);
        assert_eq!(m.samples_received(), 4);
    }

    #[test]
    fn scan_failure_returns_to_idle_with_warning() {
        let mut m = EmgMonitor::default();
        m.apply(EmgEvent::Scanning);
        match m.apply(EmgEvent::ScanFailed("No Bluetooth adapter found".into())) {
            Some(Update::Notice(n)) => {
                assert_eq!(n.kind, NoticeKind::Warning);
                assert_eq!(n.text, "Scan failed: No Bluetooth adapter found");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(m.state(), &LinkState::Idle);
    }

    #[test]
    fn connect_failure_is_not_reported_as_scan_failure() {
        let mut m = EmgMonitor::default();
        m.apply(EmgEvent::Scanning);
        m.apply(EmgEvent::Connecting("Aadit".into()));
        let text = notice_text(m.apply(EmgEvent::ConnectFailed(
            "BLE connect() timed out after 10 s".into(),
        )));
        assert_eq!(text, "Connection failed: BLE connect() timed out after 10 s");
        assert_eq!(m.state(), &LinkState::Idle);
    }

    #[test]
    fn disconnect_keeps_last_value_and_reports_once() {
        let mut m = EmgMonitor::new(4);
        m.apply(EmgEvent::Connected("Aadit".into()));
        m.apply(sample(7));
        assert!(m.apply(EmgEvent::Disconnected).is_some());
        assert_eq!(m.apply(EmgEvent::Disconnected), None);
        assert_eq!(m.label(), "EMG Data: 7");
    }

    #[test]
    fn clear_and_reset() {
        let mut m = EmgMonitor::new(4);
        m.apply(EmgEvent::Connected("Aadit".into()));
        m.apply(sample(1));
        m.apply(sample(2));
        m.clear_window();
        assert!(m.window().is_empty());
        assert_eq!(m.last_value(), Some(2));

        m.reset();
        assert_eq!(m.state(), &LinkState::Idle);
        assert_eq!(m.last_value(), None);
        assert_eq!(m.samples_received(), 0);
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(EmgMonitor::try_new(0).is_err());
        assert_eq!(EmgMonitor::try_new(16).unwrap().window().capacity(), 16);
    }

    #[tokio::test]
    async fn run_stops_at_disconnect() {
        let (tx, mut rx) = mpsc::channel(16);
        for ev in [
            EmgEvent::Scanning,
            EmgEvent::Connecting("Aadit".into()),
            EmgEvent::Connected("Aadit".into()),
            sample(3),
            sample(4),
            EmgEvent::Disconnected,
            sample(99),
        ] {
            tx.send(ev).await.unwrap();
        }

        let mut m = EmgMonitor::new(8);
        let mut labels = Vec::new();
        let mut notices = Vec::new();
        m.run(&mut rx, |_, update| match update {
            Update::Label(l) => labels.push(l),
            Update::Notice(n) => notices.push(n.text),
        })
        .await;

        assert_eq!(labels, vec!["EMG Data: 3", "EMG Data: 4"]);
        assert_eq!(
            notices,
            vec![
                "Scanning for BLE Device...",
                "Connecting to Aadit",
                "Connected!",
                "Disconnected!"
            ]
        );
        // The sample queued after the disconnect is left unread.
        assert_eq!(rx.recv().await, Some(sample(99)));
    }

    #[tokio::test]
    async fn run_returns_when_sender_closes() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(EmgEvent::Scanning).await.unwrap();
        tx.send(EmgEvent::ScanFailed("timed out".into())).await.unwrap();
        drop(tx);

        let mut m = EmgMonitor::default();
        let mut count = 0;
        m.run(&mut rx, |_, _| count += 1).await;
        assert_eq!(count, 2);
        assert_eq!(m.state(), &LinkState::Idle);
    }
}
