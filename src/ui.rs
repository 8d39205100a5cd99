use crate::backends::interface::InterfaceStatus;
use crate::config::DisplayUnit;
use crate::history::HistoryGraph;
use crate::keybindings;
use crate::monitor::{DrawScope, Frontend, FrontendEvent, MonitorView};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

/// Presentation options, fixed for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySettings {
    pub unit: DisplayUnit,
    /// Highlight the throughput at or above this many bytes/sec
    pub alarm_threshold: Option<u64>,
    pub show_interface_name: bool,
}

impl DisplaySettings {
    fn alarmed(&self, throughput: u64) -> bool {
        self.alarm_threshold.is_some_and(|limit| throughput >= limit)
    }
}

/// Format a bytes/sec rate in the display unit with SI prefixes
/// (e.g., "999 bit/s", "1.23 Mbit/s", "12.3 kB/s")
pub fn format_throughput(bytes_per_sec: u64, unit: DisplayUnit) -> String {
    const PREFIXES: [&str; 5] = ["", "k", "M", "G", "T"];

    let (value, suffix) = match unit {
        DisplayUnit::Bits => (bytes_per_sec.saturating_mul(8), "bit/s"),
        DisplayUnit::Bytes => (bytes_per_sec, "B/s"),
    };

    if value < 1000 {
        return format!("{} {}", value, suffix);
    }

    let mut scaled = value as f64;
    let mut prefix = 0;
    // Round-up to 1000 would print four digits; move to the next prefix
    while scaled >= 999.5 && prefix < PREFIXES.len() - 1 {
        scaled /= 1000.0;
        prefix += 1;
    }

    let number = if scaled < 9.995 {
        format!("{:.2}", scaled)
    } else if scaled < 99.95 {
        format!("{:.1}", scaled)
    } else {
        format!("{:.0}", scaled)
    };

    format!("{} {}{}", number, PREFIXES[prefix], suffix)
}

pub fn status_label(status: InterfaceStatus) -> &'static str {
    match status {
        InterfaceStatus::Up => "UP",
        InterfaceStatus::Down => "DOWN",
        InterfaceStatus::Unknown => "??",
    }
}

fn status_color(status: InterfaceStatus) -> Color {
    match status {
        InterfaceStatus::Up => Color::Green,
        InterfaceStatus::Down => Color::Red,
        InterfaceStatus::Unknown => Color::Yellow,
    }
}

/// Bars of the history graph: transmit grows up from the bottom, receive
/// hangs down from the top, newest on the right
struct HistoryBars<'a> {
    history: &'a HistoryGraph,
}

impl Widget for HistoryBars<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bars = self.history.render();
        if area.width == 0 || area.height == 0 || bars.is_empty() {
            return;
        }

        let rows = area.height as u64;
        let height = self.history.height();
        let area_width = area.width as usize;
        // More bars than columns: keep the newest ones
        let shown = &bars[bars.len().saturating_sub(area_width)..];
        let column = (area_width / shown.len()).max(1);
        // Right-align so the newest bar sits at the edge
        let used = (column * shown.len()).min(area_width);
        let left = area.x as usize + (area_width - used);

        for (i, &(rx, tx)) in shown.iter().enumerate() {
            let x = (left + i * column) as u16;
            if x >= area.right() {
                break;
            }
            let width = column.saturating_sub(1).max(1).min((area.right() - x) as usize);
            let bar = "█".repeat(width);

            let tx_rows = (tx * rows / height).min(rows) as u16;
            for dy in 0..tx_rows {
                buf.set_string(
                    x,
                    area.bottom() - 1 - dy,
                    &bar,
                    Style::default().fg(Color::Green),
                );
            }

            let rx_rows = (rx * rows / height).min(rows) as u16;
            for dy in 0..rx_rows {
                buf.set_string(x, area.y + dy, &bar, Style::default().fg(Color::Cyan));
            }
        }
    }
}

pub fn draw_ui(f: &mut Frame, view: &MonitorView<'_>, settings: &DisplaySettings) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Interface and throughput
            Constraint::Min(5),    // History graph
            Constraint::Length(3), // Status bar
        ])
        .split(f.area());

    draw_header(f, chunks[0], view, settings);
    draw_graph(f, chunks[1], view.history, settings);
    draw_status_bar(f, chunks[2]);
}

fn draw_header(f: &mut Frame, area: Rect, view: &MonitorView<'_>, settings: &DisplaySettings) {
    let mut status_line = Vec::new();
    if settings.show_interface_name {
        status_line.push(Span::styled(
            format!("{} ", view.interface),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    }
    status_line.push(Span::styled(
        status_label(view.status),
        Style::default().fg(status_color(view.status)),
    ));

    let throughput_style = if settings.alarmed(view.throughput) {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };

    let header = Paragraph::new(vec![
        Line::from(status_line),
        Line::from(Span::styled(
            format_throughput(view.throughput, settings.unit),
            throughput_style,
        )),
    ])
    .block(Block::default().borders(Borders::ALL).title("netload"));

    f.render_widget(header, area);
}

fn draw_graph(f: &mut Frame, area: Rect, history: &HistoryGraph, settings: &DisplaySettings) {
    let block = Block::default().borders(Borders::ALL).title(format!(
        "History (1 unit = {})",
        format_throughput(history.scale_unit(), settings.unit)
    ));
    let inner = block.inner(area);

    f.render_widget(block, area);
    f.render_widget(HistoryBars { history }, inner);
}

fn draw_status_bar(f: &mut Frame, area: Rect) {
    // Auto-generate status bar from centralized keybindings
    let mut spans = vec![];

    for (i, (key, description)) in keybindings::get_status_bar_keybindings()
        .iter()
        .enumerate()
    {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(
            format!("[{}]", key),
            Style::default().fg(Color::Yellow),
        ));
        spans.push(Span::raw(format!(" {}", description)));
    }

    let status =
        Paragraph::new(vec![Line::from(spans)]).block(Block::default().borders(Borders::ALL));

    f.render_widget(status, area);
}

/// Full-screen terminal frontend
pub struct TuiFrontend {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    settings: DisplaySettings,
}

impl TuiFrontend {
    pub fn new(settings: DisplaySettings) -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self { terminal, settings })
    }
}

impl Drop for TuiFrontend {
    fn drop(&mut self) {
        // Restore terminal
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

impl Frontend for TuiFrontend {
    fn wait(&mut self, timeout: Duration) -> Result<Option<FrontendEvent>> {
        let now = Instant::now();
        let deadline = now.checked_add(timeout).unwrap_or(now);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !event::poll(remaining)? {
                return Ok(None);
            }

            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    match keybindings::action_for(&key) {
                        Some(FrontendEvent::Redraw) => {
                            self.terminal.clear()?;
                            return Ok(Some(FrontendEvent::Redraw));
                        }
                        Some(action) => return Ok(Some(action)),
                        None => {}
                    }
                }
                Event::Resize(_, _) => return Ok(Some(FrontendEvent::Redraw)),
                _ => {}
            }
        }
    }

    fn draw(&mut self, view: &MonitorView<'_>, _scope: DrawScope) -> Result<()> {
        // ratatui diffs frames, so a throughput-only update costs the same
        let settings = self.settings;
        self.terminal.draw(|f| draw_ui(f, view, &settings))?;
        Ok(())
    }
}

/// Line-per-interval frontend for pipes and logs
pub struct PlainFrontend<W: Write> {
    out: W,
    settings: DisplaySettings,
    remaining: Option<u64>,
    printed: u64,
}

impl<W: Write> PlainFrontend<W> {
    /// Stop after `samples` lines, or never with `None`
    pub fn new(out: W, settings: DisplaySettings, samples: Option<u64>) -> Self {
        Self {
            out,
            settings,
            remaining: samples,
            printed: 0,
        }
    }

    fn line(&self, view: &MonitorView<'_>) -> String {
        let latest = view.history.latest();
        let mut line = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if self.settings.show_interface_name {
            line.push(' ');
            line.push_str(view.interface);
        }

        line.push_str(&format!(
            " {} {} (rx {}, tx {})",
            status_label(view.status),
            format_throughput(view.throughput, self.settings.unit),
            format_throughput(latest.rx, self.settings.unit),
            format_throughput(latest.tx, self.settings.unit),
        ));

        if self.settings.alarmed(view.throughput) {
            line.push_str(" ALARM");
        }
        line
    }
}

impl<W: Write> Frontend for PlainFrontend<W> {
    fn wait(&mut self, timeout: Duration) -> Result<Option<FrontendEvent>> {
        if self.remaining == Some(0) {
            return Ok(Some(FrontendEvent::Quit));
        }
        std::thread::sleep(timeout);
        Ok(None)
    }

    fn draw(&mut self, view: &MonitorView<'_>, scope: DrawScope) -> Result<()> {
        // One line per completed interval; sub-steps would flood the output
        if scope != DrawScope::All || view.intervals == self.printed {
            return Ok(());
        }
        self.printed = view.intervals;

        let line = self.line(view);
        writeln!(self.out, "{}", line)?;
        self.out.flush()?;

        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
        Ok(())
    }
}
