//! Live EMG viewer for the BLE sensor.
//!
//! Usage:
//!   cargo run --bin tui                    # press `s` to scan for the sensor
//!   cargo run --bin tui -- --name MyEmg -t 30
//!   cargo run --bin tui -- --simulate      # built-in synthetic EMG (no hardware needed)
//!
//! Keys
//! ----
//!   s        start scanning (one attempt, no automatic retry)
//!   c        clear the sample window
//!   d        disconnect the current device
//!   q / Esc  quit

use std::collections::VecDeque;
use std::f64::consts::PI;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Sparkline},
    Frame, Terminal,
};
use tokio::sync::{mpsc, oneshot};

use emg_ble::emg_client::{EmgClient, EmgClientConfig, EmgHandle};
use emg_ble::error::LinkResult;
use emg_ble::monitor::{EmgMonitor, Notice, NoticeKind, Update, DEFAULT_WINDOW};
use emg_ble::protocol::DEVICE_NAME;
use emg_ble::types::{EmgEvent, EmgSample, LinkState};

// ── Constants ─────────────────────────────────────────────────────────────────

/// How long a notice stays on screen.
const TOAST_DURATION: Duration = Duration::from_secs(2);

/// Notification rate produced by the `--simulate` generator (Hz).
const SIM_HZ: f64 = 50.0;

/// Braille spinner frames cycled at ~100 ms intervals while busy.
const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

// ── CLI ───────────────────────────────────────────────────────────────────────

/// Live terminal view of EMG samples streamed from a BLE sensor.
#[derive(Debug, Parser)]
#[command(name = "tui", version, about)]
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

    /// Feed synthetic EMG instead of scanning for hardware.
    #[arg(long)]
    simulate: bool,
}

// ── App state (shared with the event task via Arc<Mutex<_>>) ──────────────────

pub struct App {
    monitor: EmgMonitor,
    /// Scan session whose events the monitor currently shows.  Events from
    /// an older session's tasks are dropped.
    session: u64,
    /// Most recent notice and when it was raised.
    toast: Option<(Notice, Instant)>,
    /// Sample arrival times over the last 2 s, for the rate readout.
    pkt_times: VecDeque<Instant>,
    pub simulated: bool,
}

impl App {
    fn new(monitor: EmgMonitor) -> Self {
        Self {
            monitor,
            session: 0,
            toast: None,
            pkt_times: VecDeque::with_capacity(256),
            simulated: false,
        }
    }

    /// Forget the previous session and return the id of the new one.
    fn begin_session(&mut self) -> u64 {
        self.session += 1;
        self.monitor.reset();
        self.pkt_times.clear();
        self.session
    }

    /// Apply an event from `session`'s link tasks.  Returns `false` (and
    /// changes nothing) when that session has been superseded.
    fn handle_from(&mut self, session: u64, event: EmgEvent) -> bool {
        if session != self.session {
            log::debug!("dropping event from stale session {session}: {event:?}");
            return false;
        }
        self.handle(event);
        true
    }

    /// Apply one link event and remember any notice it raised.
    fn handle(&mut self, event: EmgEvent) {
        let is_sample = matches!(event, EmgEvent::Sample(_));
        if let Some(Update::Notice(n)) = self.monitor.apply(event) {
            self.toast = Some((n, Instant::now()));
        }
        if is_sample {
            let now = Instant::now();
            self.pkt_times.push_back(now);
            while self
                .pkt_times
                .front()
                .map(|t| now.duration_since(*t) > Duration::from_secs(2))
                .unwrap_or(false)
            {
                self.pkt_times.pop_front();
            }
        }
    }

    /// Raise a notice that did not come from the event stream.
    fn notify(&mut self, kind: NoticeKind, text: impl Into<String>) {
        self.toast = Some((
            Notice {
                kind,
                text: text.into(),
            },
            Instant::now(),
        ));
    }

    /// Notice still within its display window, if any.
    fn active_toast(&self) -> Option<&Notice> {
        self.toast
            .as_ref()
            .filter(|(_, at)| at.elapsed() < TOAST_DURATION)
            .map(|(n, _)| n)
    }

    /// Samples per second over the 2-second arrival window.
    fn pkt_rate(&self) -> f64 {
        match (self.pkt_times.front(), self.pkt_times.back()) {
            (Some(first), Some(last)) if self.pkt_times.len() >= 2 => {
                let span = last.duration_since(*first).as_secs_f64();
                if span < 1e-9 {
                    0.0
                } else {
                    (self.pkt_times.len() as f64 - 1.0) / span
                }
            }
            _ => 0.0,
        }
    }

    fn clear(&mut self) {
        self.monitor.clear_window();
        self.pkt_times.clear();
    }
}

// ── EMG simulator ─────────────────────────────────────────────────────────────

fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
        * 1000.0
}

/// Synthetic rectified-EMG byte at time `t` (seconds).
///
/// A resting floor of ~15 with a deterministic noise term, plus a one-second
/// contraction burst every three seconds peaking near 200.
fn sim_sample(t: f64) -> u8 {
    let nx = t * 1000.7;
    let noise = ((nx.sin() * 9973.1).fract().abs()) * 10.0;
    let phase = t % 3.0;
    let burst = if phase < 1.0 {
        185.0 * (PI * phase).sin()
    } else {
        0.0
    };
    (15.0 + noise + burst).clamp(0.0, 255.0) as u8
}

/// Feed synthetic events through the same channel path a real sensor uses.
fn spawn_simulator(app: Arc<Mutex<App>>) {
    let (tx, rx) = mpsc::channel(256);
    let session = app.lock().map(|mut s| s.begin_session()).unwrap_or_default();
    spawn_event_task(rx, session, app);
    tokio::spawn(async move {
        let _ = tx.send(EmgEvent::Connected("Simulator".into())).await;
        let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / SIM_HZ));
        let mut t = 0.0_f64;
        loop {
            ticker.tick().await;
            let sample = EmgSample {
                value: sim_sample(t),
                timestamp: now_ms(),
            };
            if tx.send(EmgEvent::Sample(sample)).await.is_err() {
                break;
            }
            t += 1.0 / SIM_HZ;
        }
    });
}

// ── BLE helpers ───────────────────────────────────────────────────────────────

/// Spawn a task that forwards `session`'s link events into `app` until the
/// stream ends or a newer session takes over.
fn spawn_event_task(mut rx: mpsc::Receiver<EmgEvent>, session: u64, app: Arc<Mutex<App>>) {
    tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            let finished = matches!(ev, EmgEvent::Disconnected);
            let current = match app.lock() {
                Ok(mut s) => s.handle_from(session, ev),
                Err(_) => false,
            };
            if finished || !current {
                break;
            }
        }
    });
}

/// Start one scan-and-connect attempt in the background.
///
/// Returns the session id alongside the attempt's outcome.
fn start_scan(
    config: EmgClientConfig,
    app: &Arc<Mutex<App>>,
) -> (u64, oneshot::Receiver<LinkResult<EmgHandle>>) {
    let session = app.lock().map(|mut s| s.begin_session()).unwrap_or_default();
    let (rx, done) = EmgClient::new(config).start();
    spawn_event_task(rx, session, Arc::clone(app));
    (session, done)
}

/// Close a handle on a spawned task so the render loop never waits on BLE.
fn release(handle: EmgHandle) {
    tokio::spawn(async move {
        if let Err(e) = handle.disconnect().await {
            log::warn!("disconnect failed: {e}");
        }
    });
}

// ── Rendering ─────────────────────────────────────────────────────────────────

fn draw(frame: &mut Frame, app: &App) {
    let root = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(5),
        Constraint::Min(0),
        Constraint::Length(4),
    ])
    .split(frame.area());

    draw_header(frame, root[0], app);
    draw_value(frame, root[1], app);
    draw_window(frame, root[2], app);
    draw_footer(frame, root[3], app);
}

fn spinner_str() -> &'static str {
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    SPINNER[(ms / 100) as usize % SPINNER.len()]
}

/// Status bar: title, link state, sample rate, window fill, total samples.
fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let (label, color) = match app.monitor.state() {
        LinkState::Idle => ("○ Idle — press [s] to scan".to_owned(), Color::DarkGray),
        LinkState::Scanning => (format!("{} Scanning…", spinner_str()), Color::Yellow),
        LinkState::Connecting(name) => (
            format!("{} Connecting to {name}…", spinner_str()),
            Color::Yellow,
        ),
        LinkState::Connected(name) if app.simulated => (format!("◆ {name}"), Color::Cyan),
        LinkState::Connected(name) => (format!("● {name}"), Color::Green),
        LinkState::Disconnected => ("✕ Disconnected".to_owned(), Color::Red),
    };

    let window = app.monitor.window();
    let line = Line::from(vec![
        Span::styled(
            " EMG BLE Monitor ",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        sep(),
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        sep(),
        Span::styled(
            format!("{:.1} smp/s", app.pkt_rate()),
            Style::default().fg(Color::White),
        ),
        sep(),
        Span::styled(
            format!("window {}/{}", window.len(), window.capacity()),
            Style::default().fg(Color::LightBlue),
        ),
        sep(),
        Span::styled(
            format!("{} smp", app.monitor.samples_received()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

#[inline]
fn sep<'a>() -> Span<'a> {
    Span::styled(" │ ", Style::default().fg(Color::DarkGray))
}

/// The value label: `EMG Data: <n>`.
fn draw_value(frame: &mut Frame, area: Rect, app: &App) {
    let text = Line::from(Span::styled(
        app.monitor.label(),
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(
        Paragraph::new(vec![Line::raw(""), text])
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL)),
        area,
    );
}

/// Sparkline of the most recent samples that fit the chart width.
fn draw_window(frame: &mut Frame, area: Rect, app: &App) {
    let window = app.monitor.window();
    let visible = area.width.saturating_sub(2) as usize;
    let skip = window.len().saturating_sub(visible);
    let data: Vec<u64> = window.iter().skip(skip).map(|&v| v as u64).collect();

    let (min_v, max_v) = window
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let title = if window.is_empty() {
        " Recent samples ".to_owned()
    } else {
        format!(" Recent samples  min:{min_v:3}  max:{max_v:3} ")
    };

    frame.render_widget(
        Sparkline::default()
            .block(
                Block::default()
                    .title(Span::styled(
                        title,
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL),
            )
            .data(&data)
            .max(u8::MAX as u64)
            .style(Style::default().fg(Color::Cyan)),
        area,
    );
}

/// Key hints, plus the active notice (or a hint when there is none).
fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let keys = Line::from(vec![
        Span::raw(" "),
        key("[s]"),
        Span::raw("Scan  "),
        key("[c]"),
        Span::raw("Clear  "),
        key("[d]"),
        Span::raw("Disconnect  "),
        key("[q]"),
        Span::raw("Quit"),
    ]);

    let second_line = match app.active_toast() {
        Some(n) => {
            let color = match n.kind {
                NoticeKind::Info => Color::White,
                NoticeKind::Warning => Color::Red,
            };
            Line::from(Span::styled(
                format!(" {}", n.text),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
        }
        None if matches!(app.monitor.state(), LinkState::Scanning) => {
            let hint = if cfg!(target_os = "macos") {
                " Looking for the sensor. On macOS grant Bluetooth access: System Settings → Privacy & Security → Bluetooth."
            } else {
                " Looking for the sensor. Make sure it is powered on and in range."
            };
            Line::from(Span::styled(hint, Style::default().fg(Color::Yellow)))
        }
        None => Line::raw(""),
    };

    frame.render_widget(
        Paragraph::new(vec![keys, second_line]).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

#[inline]
fn key(s: &str) -> Span<'_> {
    Span::styled(
        s,
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    use std::io::IsTerminal as _;
    if !io::stdout().is_terminal() {
        eprintln!("Error: emg-ble tui requires a real terminal (TTY).");
        eprintln!("Run it directly in a terminal emulator, not piped or redirected.");
        std::process::exit(1);
    }

    // ── Logging ─────────────────────────────────────────────────────────────
    // Logs go to emg-tui.log so they never interfere with the display.
    //   RUST_LOG=debug cargo run --bin tui
    {
        use std::fs::File;
        if let Ok(file) = File::create("emg-tui.log") {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
        }
    }

    let args = Args::parse();
    let simulate = args.simulate;
    let config = EmgClientConfig {
        device_name: args.name,
        scan_timeout_secs: args.scan_timeout,
        connect_timeout_secs: args.connect_timeout,
        ..Default::default()
    };

    let app = Arc::new(Mutex::new(App::new(EmgMonitor::try_new(args.window)?)));
    // Handles and pending attempts carry the session they belong to.
    let mut handle: Option<(u64, EmgHandle)> = None;
    let mut pending_connect: Option<(u64, oneshot::Receiver<LinkResult<EmgHandle>>)> = None;
    let mut fatal: Option<anyhow::Error> = None;

    if simulate {
        if let Ok(mut s) = app.lock() {
            s.simulated = true;
        }
        spawn_simulator(Arc::clone(&app));
    }

    // ── Terminal setup ────────────────────────────────────────────────────────
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    let tick = Duration::from_millis(33); // ~30 FPS

    // ── Main loop ─────────────────────────────────────────────────────────────
    'main: loop {
        // ── 1. Collect a finished connection attempt ─────────────────────────
        if let Some((session, rx)) = pending_connect.as_mut() {
            match rx.try_recv() {
                Ok(Ok(h)) => {
                    handle = Some((*session, h));
                    pending_connect = None;
                }
                Ok(Err(e)) => {
                    pending_connect = None;
                    if e.is_fatal() {
                        log::error!("{e}");
                        fatal = Some(e.into());
                        break 'main;
                    }
                    // The ScanFailed / ConnectFailed event already raised a notice.
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => pending_connect = None,
            }
        }

        // ── 1b. A dropped link leaves a dead handle behind; release it ──────
        // Only the current session's events reach the monitor, so its state
        // speaks for this handle alone.
        let current_dropped = app
            .lock()
            .map(|s| (s.session, matches!(s.monitor.state(), LinkState::Disconnected)))
            .ok();
        let owner = handle.as_ref().map(|(session, _)| *session);
        if matches!(current_dropped, Some((session, true)) if Some(session) == owner) {
            if let Some((_, h)) = handle.take() {
                release(h);
            }
        }

        // ── 2. Render ─────────────────────────────────────────────────────────
        if let Ok(s) = app.lock() {
            terminal.draw(|f| draw(f, &s))?;
        }

        // ── 3. Handle keyboard ────────────────────────────────────────────────
        if !event::poll(tick)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        // Raw mode delivers Ctrl+C as a key event rather than SIGINT.
        let ctrl_c =
            key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
        if ctrl_c {
            break 'main;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break 'main,

            KeyCode::Char('s') => {
                if simulate {
                    continue;
                }
                if pending_connect.is_some() || handle.is_some() {
                    if let Ok(mut s) = app.lock() {
                        s.notify(NoticeKind::Info, "Already scanning or connected");
                    }
                } else {
                    pending_connect = Some(start_scan(config.clone(), &app));
                }
            }

            KeyCode::Char('d') => {
                if let Some((_, h)) = handle.take() {
                    release(h);
                }
            }

            KeyCode::Char('c') => {
                if let Ok(mut s) = app.lock() {
                    s.clear();
                }
            }

            _ => {}
        }

    }

    // ── Teardown ──────────────────────────────────────────────────────────────
    if let Some((_, h)) = handle {
        let _ = h.disconnect().await;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    match fatal {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
