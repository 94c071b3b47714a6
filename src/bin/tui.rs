//! Conveyor TUI - interactive operator dashboard for the conveyor twin
//!
//! Runs the simulation in-process and displays:
//! - Status line (normal / bearing wear / jam) with alert color
//! - Belt lane with objects, the jam accumulation point and the sensor gate
//! - Telemetry gauges (belt speed, vibration, motor current)
//! - Sensor gate state and production count
//! - Recent events (regime changes, counts)
//!
//! Keyboard shortcuts:
//! - 1: Normal
//! - 2: Bearing wear
//! - 3: Jam
//! - q / Esc: Quit
//!
//! Usage:
//!   cargo run --bin conveyor-tui -- --config config/dev.toml --log-file logs/tui.log

use anyhow::Context;
use clap::Parser;
use conveyor_twin::domain::{AlertLevel, GateState, SimulationSnapshot};
use conveyor_twin::infra::{Config, Metrics};
use conveyor_twin::io::keymap::{command_for_key, HELP};
use conveyor_twin::services::{Simulation, TickEvents};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph},
    Frame, Terminal,
};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::info;

/// Maximum events to keep in history
const MAX_EVENTS: usize = 12;

/// Lateral bands drawn for the belt
const LANE_ROWS: usize = 3;

/// Gauge full-scale values
const SPEED_FULL_SCALE: f64 = 6.0;
const VIBRATION_FULL_SCALE: f64 = 6.0;
const CURRENT_FULL_SCALE: f64 = 10.0;

#[derive(Parser, Debug)]
#[command(name = "conveyor-tui", version, about = "Interactive conveyor twin dashboard")]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// RNG seed for a reproducible run (overrides [sim].seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Write logs to this file (the terminal is owned by the dashboard)
    #[arg(long)]
    log_file: Option<String>,
}

/// Fixed belt geometry used for drawing
struct BeltGeometry {
    entry_x: f64,
    exit_x: f64,
    lateral_jitter: f64,
    jam_x: f64,
    gate_from: f64,
    gate_to: f64,
    clear_from: f64,
    clear_to: f64,
}

/// Dashboard state owned by the UI loop
struct DashboardState {
    sim: Simulation,
    metrics: Arc<Metrics>,
    geometry: BeltGeometry,
    events: VecDeque<DashboardEvent>,
    started: Instant,
}

#[derive(Debug, Clone, Copy)]
enum EventKind {
    Regime,
    Count,
}

/// One line of the events panel
struct DashboardEvent {
    wall: String,
    sim_secs: f64,
    kind: EventKind,
    text: String,
}

/// Local wall-clock time, UTC when the local offset is unavailable
fn wall_clock() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!("[hour]:[minute]:[second]")).unwrap_or_default()
}

impl DashboardState {
    fn new(config: &Config) -> Self {
        let metrics = Arc::new(Metrics::new());
        let sim = Simulation::new(config, metrics.clone());
        let zone = sim.gate().detection_zone();
        let clear = sim.gate().clear_zone();
        let geometry = BeltGeometry {
            entry_x: config.entry_x(),
            exit_x: config.exit_x(),
            lateral_jitter: config.lateral_jitter(),
            jam_x: config.jam_accumulation_x(),
            gate_from: *zone.start(),
            gate_to: *zone.end(),
            clear_from: *clear.start(),
            clear_to: *clear.end(),
        };
        Self { sim, metrics, geometry, events: VecDeque::new(), started: Instant::now() }
    }

    fn push_event(&mut self, sim_secs: f64, kind: EventKind, text: String) {
        self.events.push_front(DashboardEvent { wall: wall_clock(), sim_secs, kind, text });
        self.events.truncate(MAX_EVENTS);
    }

    fn record(&mut self, events: TickEvents, snapshot_count: u64) {
        let at = self.sim.elapsed_secs();
        if let Some((from, to)) = events.regime_changed {
            self.push_event(at, EventKind::Regime, format!("{} -> {}", from.as_str(), to.as_str()));
        }
        let counted = events.counted.len() as u64;
        for (i, id) in events.counted.iter().enumerate() {
            let count = snapshot_count + 1 + i as u64 - counted;
            self.push_event(at, EventKind::Count, format!("object #{} counted ({})", id, count));
        }
    }

    fn step(&mut self, dt: f64) {
        let count = self.sim.tick(dt).count;
        let events = self.sim.last_events().clone();
        if !events.is_empty() {
            self.record(events, count);
        }
    }
}

fn init_logging(path: &str) -> anyhow::Result<()> {
    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Some(path) = args.log_file.as_deref() {
        init_logging(path)?;
    }

    let config_path = args.config.clone().unwrap_or_else(|| Config::resolve_config_path(&[]));
    let mut config = Config::load_from_path(&config_path);
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    info!(config_file = %config.config_file(), seed = ?config.seed(), "conveyor-tui starting");

    let mut state = DashboardState::new(&config);
    let tick_rate = Duration::from_secs_f64(config.tick_dt());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_ui(&mut terminal, &mut state, tick_rate);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let snapshot = state.sim.snapshot();
    info!(
        ticks = %snapshot.tick,
        count = %snapshot.count,
        regime = %snapshot.regime.as_str(),
        "conveyor-tui stopped"
    );
    state.metrics.report().log();

    result
}

fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut DashboardState,
    tick_rate: Duration,
) -> anyhow::Result<()> {
    let mut last_tick = Instant::now();

    while state.sim.is_running() {
        terminal.draw(|f| draw_ui(f, state))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if let Some(command) = command_for_key(key) {
                    info!(command = ?command, "operator_command");
                    state.sim.apply(command);
                }
            }
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= tick_rate {
            last_tick = Instant::now();
            state.step(elapsed.as_secs_f64());
        }
    }
    Ok(())
}

fn alert_color(alert: AlertLevel) -> Color {
    match alert {
        AlertLevel::Ok => Color::Green,
        AlertLevel::Warning => Color::Yellow,
        AlertLevel::Critical => Color::Red,
    }
}

fn draw_ui(f: &mut Frame, state: &DashboardState) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                       // Header
            Constraint::Length(LANE_ROWS as u16 + 4),    // Belt
            Constraint::Min(0),                          // Bottom panels
            Constraint::Length(1),                       // Help
        ])
        .split(f.area());

    let snapshot = state.sim.snapshot();
    draw_header(f, main_chunks[0], snapshot, state.started);
    draw_belt_panel(f, main_chunks[1], snapshot, &state.geometry);

    // Bottom: 3 columns - Telemetry, Sensor gate, Events
    let bottom_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35),  // Telemetry
            Constraint::Percentage(25),  // Sensor
            Constraint::Percentage(40),  // Events
        ])
        .split(main_chunks[2]);

    draw_telemetry_panel(f, bottom_chunks[0], snapshot);
    draw_sensor_panel(f, bottom_chunks[1], snapshot, state);
    draw_events_panel(f, bottom_chunks[2], state);

    let help = Paragraph::new(Span::styled(HELP, Style::default().fg(Color::DarkGray)));
    f.render_widget(help, main_chunks[3]);
}

fn draw_header(f: &mut Frame, area: Rect, snapshot: &SimulationSnapshot, started: Instant) {
    let color = alert_color(snapshot.alert);

    let header = Paragraph::new(Line::from(vec![
        Span::styled("Conveyor Twin ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("| "),
        Span::styled(snapshot.status, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::raw(" | Count: "),
        Span::styled(snapshot.count.to_string(), Style::default().fg(Color::Yellow)),
        Span::raw(format!(
            " | Sim {:.1}s | Wall {}s | Tick {}",
            snapshot.elapsed_secs,
            started.elapsed().as_secs(),
            snapshot.tick
        )),
    ]))
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(color)));

    f.render_widget(header, area);
}

/// Column for belt coordinate `x` in a lane `width` cells wide
fn lane_column(x: f64, entry_x: f64, exit_x: f64, width: usize) -> Option<usize> {
    if width == 0 || exit_x <= entry_x || x < entry_x || x > exit_x {
        return None;
    }
    let ratio = (x - entry_x) / (exit_x - entry_x);
    Some(((ratio * (width - 1) as f64).round() as usize).min(width - 1))
}

/// Row for lateral offset `z` within `[-jitter, jitter]`
fn lane_row(z: f64, jitter: f64, rows: usize) -> usize {
    if jitter <= 0.0 || rows <= 1 {
        return rows / 2;
    }
    let ratio = ((z + jitter) / (2.0 * jitter)).clamp(0.0, 1.0);
    ((ratio * (rows - 1) as f64).round() as usize).min(rows - 1)
}

fn draw_belt_panel(f: &mut Frame, area: Rect, snapshot: &SimulationSnapshot, geometry: &BeltGeometry) {
    let width = area.width.saturating_sub(2) as usize;
    let column = |x: f64| lane_column(x, geometry.entry_x, geometry.exit_x, width);

    let belt_style = Style::default().fg(Color::DarkGray);
    let gate_style = Style::default().fg(if snapshot.gate == GateState::Active { Color::Green } else { Color::Blue });
    let jam_style = Style::default().fg(Color::Red);

    let mut cells = vec![vec![('─', belt_style); width]; LANE_ROWS];
    let gate_cols = column(geometry.gate_from).zip(column(geometry.gate_to));
    let clear_cols = column(geometry.clear_from).zip(column(geometry.clear_to));
    for row in cells.iter_mut() {
        if let Some((from, to)) = clear_cols {
            for cell in &mut row[from..=to] {
                *cell = ('▒', belt_style);
            }
        }
        if let Some((from, to)) = gate_cols {
            for cell in &mut row[from..=to] {
                *cell = ('░', gate_style);
            }
        }
        if let Some(col) = column(geometry.jam_x) {
            row[col] = ('┊', jam_style);
        }
    }

    for obj in &snapshot.objects {
        let Some(col) = column(obj.position) else {
            continue;
        };
        let row = lane_row(obj.lateral, geometry.lateral_jitter, LANE_ROWS);
        let color = if obj.wobble != 0.0 {
            Color::Red
        } else if obj.counted {
            Color::Green
        } else {
            Color::White
        };
        cells[row][col] = ('■', Style::default().fg(color).add_modifier(Modifier::BOLD));
    }

    let mut lines: Vec<Line> = cells
        .into_iter()
        .map(|row| {
            Line::from(row.into_iter().map(|(c, style)| Span::styled(c.to_string(), style)).collect::<Vec<_>>())
        })
        .collect();

    let mut markers = vec![' '; width];
    if let Some(col) = column(geometry.jam_x) {
        markers[col] = 'J';
    }
    if let Some((from, _)) = gate_cols {
        markers[from] = 'G';
    }
    lines.push(Line::from(Span::styled(markers.into_iter().collect::<String>(), belt_style)));

    let belt = Paragraph::new(lines).block(
        Block::default()
            .title(format!(" Belt ({} objects) ", snapshot.live_objects()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(belt, area);
}

fn draw_telemetry_panel(f: &mut Frame, area: Rect, snapshot: &SimulationSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),   // Speed
            Constraint::Length(3),   // Vibration
            Constraint::Length(3),   // Current
            Constraint::Min(0),
        ])
        .split(area);

    let speed_gauge = Gauge::default()
        .block(Block::default().title(" Belt speed ").borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio((snapshot.belt_speed / SPEED_FULL_SCALE).clamp(0.0, 1.0))
        .label(format!("{:.1} u/s", snapshot.belt_speed));
    f.render_widget(speed_gauge, chunks[0]);

    let vibration_color = if snapshot.vibration < 1.0 {
        Color::Green
    } else if snapshot.vibration < 3.0 {
        Color::Yellow
    } else {
        Color::Red
    };
    let vibration_gauge = Gauge::default()
        .block(Block::default().title(" Vibration ").borders(Borders::ALL))
        .gauge_style(Style::default().fg(vibration_color))
        .ratio((snapshot.vibration / VIBRATION_FULL_SCALE).clamp(0.0, 1.0))
        .label(format!("{:.2} mm/s", snapshot.vibration));
    f.render_widget(vibration_gauge, chunks[1]);

    let current_color = if snapshot.current < 3.0 {
        Color::Green
    } else if snapshot.current < 5.0 {
        Color::Yellow
    } else {
        Color::Red
    };
    let current_gauge = Gauge::default()
        .block(Block::default().title(" Motor current ").borders(Borders::ALL))
        .gauge_style(Style::default().fg(current_color))
        .ratio((snapshot.current / CURRENT_FULL_SCALE).clamp(0.0, 1.0))
        .label(format!("{:.2} A", snapshot.current));
    f.render_widget(current_gauge, chunks[2]);
}

fn draw_sensor_panel(f: &mut Frame, area: Rect, snapshot: &SimulationSnapshot, state: &DashboardState) {
    let gate_color = match snapshot.gate {
        GateState::Active => Color::Green,
        GateState::Clear => Color::DarkGray,
    };
    let gate_text = snapshot.gate.as_str().to_ascii_uppercase();
    let stats = Paragraph::new(vec![
        Line::from(vec![
            Span::raw("Gate:      "),
            Span::styled(gate_text, Style::default().fg(gate_color).add_modifier(Modifier::BOLD)),
        ]),
        Line::from(format!("Count:     {}", snapshot.count)),
        Line::from(format!("On belt:   {}", snapshot.live_objects())),
        Line::from(format!("Spawned:   {}", state.metrics.objects_spawned())),
        Line::from(format!("Culled:    {}", state.metrics.objects_culled())),
        Line::from(format!("Peak:      {}", state.metrics.peak_live_objects())),
        Line::from(format!("Regime:    {}", snapshot.regime.as_str())),
    ])
    .block(
        Block::default()
            .title(" Sensor Gate ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)),
    );

    f.render_widget(stats, area);
}

fn draw_events_panel(f: &mut Frame, area: Rect, state: &DashboardState) {
    let items: Vec<ListItem> = state
        .events
        .iter()
        .map(|event| {
            let (icon, color) = match event.kind {
                EventKind::Regime => ("!", Color::Yellow),
                EventKind::Count => ("+", Color::Green),
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{} {:>7.1}s ", event.wall, event.sim_secs),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(icon, Style::default().fg(color)),
                Span::raw(format!(" {}", event.text)),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Events ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );

    f.render_widget(list, area);
}
