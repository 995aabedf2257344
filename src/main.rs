use std::io::{self, BufRead};

use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};

use emg_ble::emg_client::{EmgClient, EmgClientConfig, EmgHandle};
use emg_ble::monitor::{EmgMonitor, NoticeKind, Update, DEFAULT_WINDOW};
use emg_ble::protocol::DEVICE_NAME;
use emg_ble::types::EmgEvent;

/// Stream EMG samples from a BLE sensor and print each new value.
#[derive(Debug, Parser)]
#[command(name = "emg-ble", version, about)]
struct Args {
    /// Advertised name of the sensor (exact match).
    #[arg(short, long, default_value = DEVICE_NAME)]
    name: String,

    /// Stop scanning after this many seconds (default: scan until found).
    #[arg(short = 't', long)]
    scan_timeout: Option<u64>,

    /// Connect / service-discovery timeout in seconds.
    #[arg(long, default_value_t = 10)]
    connect_timeout: u64,

    /// Number of recent samples kept in the rolling window.
    #[arg(short, long, default_value_t = DEFAULT_WINDOW)]
    window: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── Logging ───────────────────────────────────────────────────────────────
    // Set RUST_LOG=debug for verbose output, e.g.:
    //   RUST_LOG=emg_ble=debug cargo run
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let args = Args::parse();
    let config = EmgClientConfig {
        device_name: args.name,
        scan_timeout_secs: args.scan_timeout,
        connect_timeout_secs: args.connect_timeout,
        ..Default::default()
    };
    let mut monitor = EmgMonitor::try_new(args.window)?;

    // ── Connect ───────────────────────────────────────────────────────────────
    let client = EmgClient::new(config);
    let (mut rx, mut done) = client.start();
    info!("Type 'q' + Enter to quit.");

    // ── Stdin command loop ────────────────────────────────────────────────────
    // Lines are read on a dedicated OS thread so the blocking StdinLock never
    // sits across an await point.
    let (line_tx, mut line_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(l) => {
                    if line_tx.send(l.trim().to_owned()).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    let mut handle: Option<EmgHandle> = None;
    let mut pending_connect = true;
    let mut stdin_open = true;
    let mut stream_closed = false;

    // ── Main event loop ───────────────────────────────────────────────────────
    loop {
        tokio::select! {
            result = &mut done, if pending_connect => {
                pending_connect = false;
                match result {
                    Ok(Ok(h)) => handle = Some(h),
                    Ok(Err(e)) if e.is_fatal() => {
                        error!("{e}");
                        return Err(e.into());
                    }
                    // Non-fatal failures already arrived as ScanFailed or ConnectFailed.
                    Ok(Err(_)) | Err(_) => {}
                }
            }

            event = rx.recv() => {
                let Some(event) = event else {
                    stream_closed = true;
                    break;
                };
                let finished = matches!(event, EmgEvent::Disconnected);
                if let Some(update) = monitor.apply(event) {
                    match update {
                        Update::Notice(n) if n.kind == NoticeKind::Warning => warn!("{}", n.text),
                        Update::Notice(n) => info!("{}", n.text),
                        Update::Label(text) => println!("{text}"),
                    }
                }
                if finished {
                    break;
                }
            }

            line = line_rx.recv(), if stdin_open => {
                match line.as_deref() {
                    None => stdin_open = false,
                    Some("q") => {
                        info!("Quit requested.");
                        break;
                    }
                    Some("") => {}
                    Some(other) => info!("Unknown command '{other}' (only 'q' is supported)"),
                }
            }
        }
    }

    // The event stream closes right after a failed attempt; surface a fatal
    // cause (no adapter) as a non-zero exit.
    if stream_closed && pending_connect {
        if let Ok(Err(e)) = done.await {
            if e.is_fatal() {
                error!("{e}");
                return Err(e.into());
            }
        }
    }

    if let Some(h) = handle {
        if let Err(e) = h.disconnect().await {
            warn!("Disconnect error: {e}");
        }
    }

    info!(
        "Event loop finished – {} sample(s) received, last window: {}",
        monitor.samples_received(),
        monitor.window()
    );
    Ok(())
}
