use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, Service,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::error::{LinkError, LinkResult};
use crate::protocol::{decode_emg_sample, DEVICE_NAME, EMG_CHARACTERISTIC_UUID, EMG_SERVICE_UUID};
use crate::types::{EmgEvent, EmgSample};

/// Capacity of the event channel handed to consumers.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Interval between peripheral-list polls while scanning.
const SCAN_POLL_MS: u64 = 250;

// ── Timestamp helper ──────────────────────────────────────────────────────────

fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
        * 1000.0
}

// ── EmgClientConfig ───────────────────────────────────────────────────────────

/// Identity of the target sensor plus the few timing knobs the link has.
///
/// Built once and handed to [`EmgClient::new`]; the client never mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct EmgClientConfig {
    /// Advertised local name to connect to.  Matched exactly.
    /// Default: [`DEVICE_NAME`] (`"Aadit"`).
    pub device_name: String,
    /// GATT service holding the EMG characteristic.
    pub service_uuid: Uuid,
    /// Notify characteristic carrying one sample byte per notification.
    pub characteristic_uuid: Uuid,
    /// Give up scanning after this many seconds.  `None` scans until a
    /// matching device appears or the platform stops the scan.
    /// Default: `None`.
    pub scan_timeout_secs: Option<u64>,
    /// Upper bound on `connect()` and on service discovery, each.
    /// Default: `10`.
    pub connect_timeout_secs: u64,
}

impl Default for EmgClientConfig {
    fn default() -> Self {
        Self {
            device_name: DEVICE_NAME.into(),
            service_uuid: EMG_SERVICE_UUID,
            characteristic_uuid: EMG_CHARACTERISTIC_UUID,
            scan_timeout_secs: None,
            connect_timeout_secs: 10,
        }
    }
}

impl EmgClientConfig {
    /// Whether an advertised name identifies the target device.
    pub fn matches(&self, advertised: &str) -> bool {
        advertised == self.device_name
    }
}

// ── EmgClient ─────────────────────────────────────────────────────────────────

/// BLE client for the single-byte EMG sensor.
///
/// One connection attempt per call: scan for the configured name, connect,
/// subscribe to the EMG characteristic, then stream [`EmgEvent`]s until the
/// link drops.  Failures are reported, never retried.
#[derive(Debug, Clone)]
pub struct EmgClient {
    config: EmgClientConfig,
}

impl EmgClient {
    pub fn new(config: EmgClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EmgClientConfig {
        &self.config
    }

    // ── Public: connect ──────────────────────────────────────────────────────

    /// Scan for the configured device, connect, subscribe, and start the
    /// notification dispatch task.
    ///
    /// Returns once the characteristic is subscribed.  The receiver already
    /// holds the `Scanning`, `Connecting`, and `Connected` events.
    pub async fn connect(&self) -> LinkResult<(mpsc::Receiver<EmgEvent>, EmgHandle)> {
        let (tx, rx) = mpsc::channel::<EmgEvent>(EVENT_CHANNEL_CAPACITY);
        let handle = self.establish(&tx).await?;
        Ok((rx, handle))
    }

    // ── Public: start (background) ───────────────────────────────────────────

    /// Kick off a scan-and-connect attempt in the background and return
    /// immediately.
    ///
    /// Progress arrives on the event receiver.  A failed attempt is reported
    /// first as [`EmgEvent::ScanFailed`] or [`EmgEvent::ConnectFailed`] on the
    /// event channel, which then closes, and afterwards as `Err` on the
    /// oneshot, so callers can tell fatal errors such as
    /// [`LinkError::NoAdapter`] apart.
    pub fn start(
        &self,
    ) -> (
        mpsc::Receiver<EmgEvent>,
        oneshot::Receiver<LinkResult<EmgHandle>>,
    ) {
        let client = self.clone();
        spawn_attempt(move |tx| async move { client.establish(&tx).await })
    }

    // ── Private: establish ───────────────────────────────────────────────────

    async fn establish(&self, tx: &mpsc::Sender<EmgEvent>) -> LinkResult<EmgHandle> {
        let adapter = first_adapter().await?;
        wait_until_powered_on(&adapter).await?;

        match self.config.scan_timeout_secs {
            Some(secs) => info!(
                "Scanning for '{}' (timeout: {secs} s) …",
                self.config.device_name
            ),
            None => info!("Scanning for '{}' …", self.config.device_name),
        }
        adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| LinkError::ScanFailed(e.to_string()))?;
        let _ = tx.send(EmgEvent::Scanning).await;

        let found = self.find_device(&adapter).await;
        adapter.stop_scan().await.ok();
        let (peripheral, device_name) = found?;

        info!("Found device: {device_name}");
        let _ = tx.send(EmgEvent::Connecting(device_name.clone())).await;

        self.setup_peripheral(peripheral, device_name, adapter, tx.clone())
            .await
    }

    // ── Private: find_device ─────────────────────────────────────────────────

    async fn find_device(&self, adapter: &Adapter) -> LinkResult<(Peripheral, String)> {
        wait_for_device(&self.config, || named_peripherals(adapter)).await
    }

    // ── Private: setup_peripheral ────────────────────────────────────────────

    /// Connect a peripheral, subscribe to the EMG characteristic, and spawn
    /// the notification and disconnect-watcher tasks.
    async fn setup_peripheral(
        &self,
        peripheral: Peripheral,
        device_name: String,
        adapter: Adapter,
        tx: mpsc::Sender<EmgEvent>,
    ) -> LinkResult<EmgHandle> {
        let secs = self.config.connect_timeout_secs;

        // BlueZ's Device1.Connect can block forever when the device walks out
        // of range mid-connect.
        tokio::time::timeout(Duration::from_secs(secs), peripheral.connect())
            .await
            .map_err(|_| LinkError::ConnectTimeout(secs))??;

        // Once connected, any failure must drop the link again: the sensor
        // stops advertising while a connection is held.
        let release = async {
            if let Err(e) = peripheral.disconnect().await {
                debug!("disconnect after failed setup: {e}");
            }
        };
        let characteristic =
            release_on_error(self.subscribe_emg(&peripheral, &device_name), release).await?;

        let _ = tx.send(EmgEvent::Connected(device_name.clone())).await;

        // Both the watcher and the notification task may observe the drop;
        // only the first one reports it.
        let disconnect_reported = Arc::new(AtomicBool::new(false));

        // ── Disconnect watcher ───────────────────────────────────────────────
        let watcher_tx = tx.clone();
        let watcher_flag = Arc::clone(&disconnect_reported);
        let peripheral_id = peripheral.id();
        tokio::spawn(async move {
            match adapter.events().await {
                Ok(mut events) => {
                    while let Some(event) = events.next().await {
                        if let CentralEvent::DeviceDisconnected(id) = event {
                            if id == peripheral_id {
                                info!("Disconnected from GATT server.");
                                report_disconnect(&watcher_flag, &watcher_tx).await;
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("Disconnect watcher: could not subscribe to adapter events: {e}");
                }
            }
        });

        // ── Notification dispatch ────────────────────────────────────────────
        let peripheral_clone = peripheral.clone();
        let char_uuid = characteristic.uuid;
        tokio::spawn(async move {
            let mut notifications = match peripheral_clone.notifications().await {
                Ok(n) => n,
                Err(e) => {
                    warn!("Could not get notifications stream: {e}");
                    report_disconnect(&disconnect_reported, &tx).await;
                    return;
                }
            };
            info!("Notification stream subscribed, waiting for data…");
            let mut notif_count: u64 = 0;

            while let Some(notif) = notifications.next().await {
                if notif.uuid != char_uuid {
                    debug!("Unknown notification from {}", notif.uuid);
                    continue;
                }
                notif_count += 1;
                let Some(value) = decode_emg_sample(&notif.value) else {
                    warn!("Empty EMG notification #{notif_count} ignored");
                    continue;
                };
                if notif_count <= 5 || notif_count % 500 == 0 {
                    info!("EMG notif #{notif_count} value={value}");
                }
                let sample = EmgSample {
                    value,
                    timestamp: now_ms(),
                };
                if tx.send(EmgEvent::Sample(sample)).await.is_err() {
                    debug!("Event receiver dropped; stopping notification task");
                    return;
                }
            }

            info!("Notification stream ended – device disconnected.");
            report_disconnect(&disconnect_reported, &tx).await;
        });

        Ok(EmgHandle {
            peripheral,
            characteristic,
            device_name,
        })
    }

    // ── Private: subscribe_emg ───────────────────────────────────────────────

    /// Discover services on a connected peripheral and subscribe to the EMG
    /// characteristic.
    async fn subscribe_emg(
        &self,
        peripheral: &Peripheral,
        device_name: &str,
    ) -> LinkResult<Characteristic> {
        let secs = self.config.connect_timeout_secs;

        // BlueZ reports the connection before its GATT cache is populated;
        // discovering too early returns an empty service set.
        #[cfg(target_os = "linux")]
        tokio::time::sleep(Duration::from_millis(600)).await;

        tokio::time::timeout(Duration::from_secs(secs), peripheral.discover_services())
            .await
            .map_err(|_| LinkError::ConnectTimeout(secs))??;
        info!("Connected and services discovered: {device_name}");

        let characteristic = find_characteristic(
            &peripheral.services(),
            self.config.service_uuid,
            self.config.characteristic_uuid,
        )?;
        peripheral.subscribe(&characteristic).await?;
        info!("Subscribed to EMG characteristic {}", characteristic.uuid);
        Ok(characteristic)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

async fn first_adapter() -> LinkResult<Adapter> {
    let unavailable = |e: btleplug::Error| LinkError::AdapterUnavailable(e.to_string());
    let manager = Manager::new().await.map_err(unavailable)?;
    let adapters = manager.adapters().await.map_err(unavailable)?;
    adapters.into_iter().next().ok_or(LinkError::NoAdapter)
}

/// Run one connection attempt on a spawned task.
///
/// `attempt` gets its own sender for progress events.  On failure the
/// matching failure event is sent, the event channel is closed, and only
/// then is the error delivered on the oneshot.
fn spawn_attempt<T, F, Fut>(
    attempt: F,
) -> (mpsc::Receiver<EmgEvent>, oneshot::Receiver<LinkResult<T>>)
where
    T: Send + 'static,
    F: FnOnce(mpsc::Sender<EmgEvent>) -> Fut + Send + 'static,
    Fut: Future<Output = LinkResult<T>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<EmgEvent>(EVENT_CHANNEL_CAPACITY);
    let (done_tx, done_rx) = oneshot::channel();
    tokio::spawn(async move {
        let result = attempt(tx.clone()).await;
        if let Err(e) = &result {
            warn!("Connection attempt failed: {e}");
            let _ = tx.send(failure_event(e)).await;
        }
        drop(tx);
        let _ = done_tx.send(result);
    });
    (rx, done_rx)
}

/// Event announcing a failed attempt, split by the phase it failed in.
fn failure_event(e: &LinkError) -> EmgEvent {
    if e.is_scan_phase() {
        EmgEvent::ScanFailed(e.to_string())
    } else {
        EmgEvent::ConnectFailed(e.to_string())
    }
}

/// Poll `scan` until it lists a device advertising exactly the configured
/// name, bounded by `scan_timeout_secs` when set.
///
/// A poll error ends the scan; the caller reports it as a scan failure.
async fn wait_for_device<D, F, Fut>(
    config: &EmgClientConfig,
    mut scan: F,
) -> LinkResult<(D, String)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LinkResult<Vec<(D, String)>>>,
{
    let search = poll_until_named(config, &mut scan);
    match config.scan_timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), search)
            .await
            .map_err(|_| LinkError::ScanTimeout {
                name: config.device_name.clone(),
                secs,
            })?,
        None => search.await,
    }
}

async fn poll_until_named<D, F, Fut>(
    config: &EmgClientConfig,
    scan: &mut F,
) -> LinkResult<(D, String)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LinkResult<Vec<(D, String)>>>,
{
    let mut seen: HashSet<String> = HashSet::new();
    loop {
        for (device, name) in scan().await? {
            if seen.insert(name.clone()) {
                debug!("scan: result device name: {name}");
            }
            if config.matches(&name) {
                return Ok((device, name));
            }
        }
        tokio::time::sleep(Duration::from_millis(SCAN_POLL_MS)).await;
    }
}

/// Peripherals the adapter has seen so far, paired with their advertised
/// names.  Peripherals without a name, or whose properties cannot be read,
/// are skipped.
async fn named_peripherals(adapter: &Adapter) -> LinkResult<Vec<(Peripheral, String)>> {
    let peripherals = adapter
        .peripherals()
        .await
        .map_err(|e| LinkError::ScanFailed(e.to_string()))?;
    let mut named = Vec::with_capacity(peripherals.len());
    for p in peripherals {
        match p.properties().await {
            Ok(Some(props)) => {
                if let Some(name) = props.local_name {
                    named.push((p, name));
                }
            }
            Ok(None) => {}
            Err(e) => debug!("scan: skipping {}: {e}", p.id()),
        }
    }
    Ok(named)
}

/// Await `work`; if it fails, await `release` before handing the error back.
async fn release_on_error<T, W, R>(work: W, release: R) -> LinkResult<T>
where
    W: Future<Output = LinkResult<T>>,
    R: Future<Output = ()>,
{
    match work.await {
        Ok(v) => Ok(v),
        Err(e) => {
            release.await;
            Err(e)
        }
    }
}

/// On macOS, CBCentralManager starts in an "unknown" state and scanning
/// before it reaches *poweredOn* is a silent no-op.  Waits up to 3 s; a
/// powered-off radio (or denied Bluetooth access) is reported as
/// [`LinkError::AdapterUnavailable`].
#[cfg(target_os = "macos")]
async fn wait_until_powered_on(adapter: &Adapter) -> LinkResult<()> {
    use btleplug::api::CentralState;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        match adapter.adapter_state().await {
            Ok(CentralState::PoweredOn) => {
                info!("macOS: adapter is PoweredOn");
                break;
            }
            Ok(CentralState::PoweredOff) => {
                return Err(LinkError::AdapterUnavailable("PoweredOff".into()));
            }
            Ok(state) => {
                if tokio::time::Instant::now() >= deadline {
                    warn!("macOS: adapter still in state {state:?} after 3 s; proceeding anyway");
                    break;
                }
                debug!("macOS: adapter state = {state:?}, waiting…");
            }
            Err(e) => {
                warn!("macOS: adapter_state() error: {e}");
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    tokio::time::sleep(Duration::from_millis(300)).await;
    Ok(())
}

#[cfg(not(target_os = "macos"))]
async fn wait_until_powered_on(_adapter: &Adapter) -> LinkResult<()> {
    Ok(())
}

/// Locate `characteristic` inside `service` among the discovered services.
fn find_characteristic(
    services: &BTreeSet<Service>,
    service: Uuid,
    characteristic: Uuid,
) -> LinkResult<Characteristic> {
    let svc = services
        .iter()
        .find(|s| s.uuid == service)
        .ok_or(LinkError::ServiceNotFound(service))?;
    svc.characteristics
        .iter()
        .find(|c| c.uuid == characteristic)
        .cloned()
        .ok_or(LinkError::CharacteristicNotFound(characteristic))
}

async fn report_disconnect(flag: &AtomicBool, tx: &mpsc::Sender<EmgEvent>) {
    if !flag.swap(true, Ordering::SeqCst) {
        let _ = tx.send(EmgEvent::Disconnected).await;
    }
}

// ── EmgHandle ─────────────────────────────────────────────────────────────────

/// Handle to an active sensor connection.
///
/// Dropping it does not disconnect; call [`EmgHandle::disconnect`] on
/// shutdown so the peripheral is released.
pub struct EmgHandle {
    peripheral: Peripheral,
    characteristic: Characteristic,
    device_name: String,
}

impl EmgHandle {
    /// Advertised name of the connected device.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Check whether the peripheral is still connected at the adapter level.
    pub async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    /// Unsubscribe (best effort) and close the GATT connection.
    pub async fn disconnect(&self) -> LinkResult<()> {
        if let Err(e) = self.peripheral.unsubscribe(&self.characteristic).await {
            debug!("unsubscribe before disconnect failed: {e}");
        }
        self.peripheral.disconnect().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btleplug::api::CharPropFlags;

    fn service(uuid: Uuid, chars: &[Uuid]) -> Service {
        Service {
            uuid,
            primary: true,
            characteristics: chars
                .iter()
                .map(|&c| Characteristic {
                    uuid: c,
                    service_uuid: uuid,
                    properties: CharPropFlags::NOTIFY,
                    descriptors: BTreeSet::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn default_config_targets_sensor() {
        let cfg = EmgClientConfig::default();
        assert_eq!(cfg.device_name, "Aadit");
        assert_eq!(cfg.service_uuid, EMG_SERVICE_UUID);
        assert_eq!(cfg.characteristic_uuid, EMG_CHARACTERISTIC_UUID);
        assert_eq!(cfg.scan_timeout_secs, None);
    }

    #[test]
    fn name_match_is_exact() {
        let cfg = EmgClientConfig::default();
        assert!(cfg.matches("Aadit"));
        assert!(!cfg.matches("aadit"));
        assert!(!cfg.matches("Aadit-2"));
        assert!(!cfg.matches(""));
    }

    #[test]
    fn finds_characteristic_inside_service() {
        let services: BTreeSet<Service> = [
            service(Uuid::from_u128(0x1800), &[Uuid::from_u128(0x2a00)]),
            service(EMG_SERVICE_UUID, &[EMG_CHARACTERISTIC_UUID]),
        ]
        .into_iter()
        .collect();
        let c = find_characteristic(&services, EMG_SERVICE_UUID, EMG_CHARACTERISTIC_UUID)
            .unwrap();
        assert_eq!(c.uuid, EMG_CHARACTERISTIC_UUID);
        assert_eq!(c.service_uuid, EMG_SERVICE_UUID);
    }

    #[test]
    fn missing_service_and_characteristic_are_distinguished() {
        let services: BTreeSet<Service> =
            [service(EMG_SERVICE_UUID, &[])].into_iter().collect();
        assert!(matches!(
            find_characteristic(&services, EMG_SERVICE_UUID, EMG_CHARACTERISTIC_UUID),
            Err(LinkError::CharacteristicNotFound(u)) if u == EMG_CHARACTERISTIC_UUID
        ));
        assert!(matches!(
            find_characteristic(&BTreeSet::new(), EMG_SERVICE_UUID, EMG_CHARACTERISTIC_UUID),
            Err(LinkError::ServiceNotFound(u)) if u == EMG_SERVICE_UUID
        ));
    }

    #[tokio::test]
    async fn disconnect_is_reported_once() {
        let (tx, mut rx) = mpsc::channel(4);
        let flag = AtomicBool::new(false);
        report_disconnect(&flag, &tx).await;
        report_disconnect(&flag, &tx).await;
        drop(tx);
        assert_eq!(rx.recv().await, Some(EmgEvent::Disconnected));
        assert_eq!(rx.recv().await, None);
    }

    fn listing(names: &[&str]) -> LinkResult<Vec<(usize, String)>> {
        Ok(names
            .iter()
            .enumerate()
            .map(|(i, n)| (i, n.to_string()))
            .collect())
    }

    #[tokio::test(start_paused = true)]
    async fn scan_times_out_when_device_never_appears() {
        let cfg = EmgClientConfig {
            scan_timeout_secs: Some(5),
            ..Default::default()
        };
        let started = tokio::time::Instant::now();
        let result = wait_for_device(&cfg, || async { listing(&["aadit", "Other"]) }).await;
        assert!(matches!(
            result,
            Err(LinkError::ScanTimeout { ref name, secs: 5 }) if name == "Aadit"
        ));
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(5) && waited < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn scan_without_timeout_waits_until_found() {
        let cfg = EmgClientConfig::default();
        let mut polls = 0u32;
        // Nothing matching shows up for well over a minute of scanning.
        let (device, name) = wait_for_device(&cfg, || {
            polls += 1;
            let n = polls;
            async move {
                if n < 400 {
                    listing(&["Other"])
                } else {
                    listing(&["Other", "Aadit"])
                }
            }
        })
        .await
        .unwrap();
        assert_eq!((device, name.as_str()), (1, "Aadit"));
        assert_eq!(polls, 400);
    }

    #[tokio::test(start_paused = true)]
    async fn adapter_error_ends_scan() {
        let cfg = EmgClientConfig::default();
        let mut polls = 0u32;
        let result: LinkResult<(usize, String)> = wait_for_device(&cfg, || {
            polls += 1;
            let n = polls;
            async move {
                if n < 3 {
                    listing(&[])
                } else {
                    Err(LinkError::ScanFailed("adapter removed".into()))
                }
            }
        })
        .await;
        assert!(matches!(result, Err(LinkError::ScanFailed(ref m)) if m == "adapter removed"));
        assert_eq!(polls, 3);
    }

    #[tokio::test]
    async fn failed_setup_releases_link() {
        let released = AtomicBool::new(false);
        let result: LinkResult<()> = release_on_error(
            async { Err(LinkError::ServiceNotFound(EMG_SERVICE_UUID)) },
            async { released.store(true, Ordering::SeqCst) },
        )
        .await;
        assert!(matches!(result, Err(LinkError::ServiceNotFound(_))));
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn successful_setup_keeps_link() {
        let released = AtomicBool::new(false);
        let result = release_on_error(async { Ok(7u8) }, async {
            released.store(true, Ordering::SeqCst)
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert!(!released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn failed_attempt_reports_event_then_closes_then_errs() {
        let (mut rx, done) = spawn_attempt(|tx| async move {
            let _ = tx.send(EmgEvent::Scanning).await;
            let _ = tx.send(EmgEvent::Connecting("Aadit".into())).await;
            Err::<(), _>(LinkError::ConnectTimeout(10))
        });
        assert_eq!(rx.recv().await, Some(EmgEvent::Scanning));
        assert_eq!(rx.recv().await, Some(EmgEvent::Connecting("Aadit".into())));
        assert_eq!(
            rx.recv().await,
            Some(EmgEvent::ConnectFailed("BLE connect() timed out after 10 s".into()))
        );
        assert_eq!(rx.recv().await, None);
        assert!(matches!(done.await, Ok(Err(LinkError::ConnectTimeout(10)))));
    }

    #[tokio::test]
    async fn scan_phase_failure_is_reported_as_scan_failure() {
        let (mut rx, done) =
            spawn_attempt(|_tx| async { Err::<(), _>(LinkError::NoAdapter) });
        assert_eq!(
            rx.recv().await,
            Some(EmgEvent::ScanFailed("No Bluetooth adapter found".into()))
        );
        assert_eq!(rx.recv().await, None);
        let err = done.await.unwrap().unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn successful_attempt_sends_no_failure() {
        let (mut rx, done) = spawn_attempt(|tx| async move {
            let _ = tx.send(EmgEvent::Connected("Aadit".into())).await;
            Ok("handle")
        });
        assert_eq!(rx.recv().await, Some(EmgEvent::Connected("Aadit".into())));
        assert_eq!(rx.recv().await, None);
        assert_eq!(done.await.unwrap().unwrap(), "handle");
    }
}
