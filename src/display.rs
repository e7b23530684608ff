use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::{Constraint, Direction as Split, Layout};
use tui::style::{Color, Modifier, Style};
use tui::text::{Span, Spans};
use tui::widgets::{Block, Borders, Paragraph};
use tui::Terminal;

use crate::lines::{BoardState, Direction, Level, ResetLine};
use crate::settings::{Settings, VideoMode};
use crate::watchdog::Liveness;

/// everything the status panel shows, captured between ticks
#[derive(Debug, Clone)]
pub struct BenchStatus {
    pub board: BoardState,
    pub settings: Settings,
    pub liveness: Liveness,
    pub host_scanning: bool,
    pub ticks: u64,
    pub log: Vec<String>,
}

/// StatusView is used by the bench to show what the controller is doing. It
/// should abstract the implementation details, so tests can run without a
/// terminal.
pub trait StatusView {
    fn draw(&mut self, status: &BenchStatus) -> Result<(), io::Error>;
}

/// one row of the panel
#[derive(Debug, Clone, PartialEq, Eq)]
struct StatusRow {
    label: &'static str,
    value: String,
    /// shown highlighted
    alert: bool,
}

fn bit(level: Level) -> char {
    match level {
        Level::High => '1',
        Level::Low => '0',
    }
}

fn reset_value(board: &BoardState, line: ResetLine) -> String {
    let direction = match board.reset_direction(line) {
        Direction::Output => "out",
        Direction::Input => "in",
    };
    if board.reset_asserted(line) {
        format!("ASSERTED ({})", direction)
    } else {
        format!("released ({})", direction)
    }
}

fn liveness_value(liveness: Liveness) -> String {
    match liveness {
        Liveness::Watching { remaining } => format!("watching, {} ticks left", remaining),
        Liveness::Satisfied => "satisfied".to_string(),
    }
}

fn status_rows(status: &BenchStatus) -> Vec<StatusRow> {
    let b = &status.board;
    let s = &status.settings;
    vec![
        StatusRow {
            label: "selection",
            value: format!(
                "{} (A2..A0 = {}{}{})",
                s.selection,
                bit(b.address[2]),
                bit(b.address[1]),
                bit(b.address[0])
            ),
            alert: false,
        },
        StatusRow {
            label: "video",
            value: format!(
                "{} (mode lines {}{})",
                s.video,
                bit(b.mode_level(VideoMode::Primary)),
                bit(b.mode_level(VideoMode::Alternate))
            ),
            alert: false,
        },
        StatusRow {
            label: "host reset",
            value: reset_value(b, ResetLine::Host),
            alert: b.reset_asserted(ResetLine::Host),
        },
        StatusRow {
            label: "periph reset",
            value: reset_value(b, ResetLine::Peripheral),
            alert: b.reset_asserted(ResetLine::Peripheral),
        },
        StatusRow {
            label: "modifier",
            value: if b.modifier == Level::Low { "held" } else { "up" }.to_string(),
            alert: b.modifier == Level::Low,
        },
        StatusRow {
            label: "watchdog",
            value: if s.scan_active {
                liveness_value(status.liveness)
            } else {
                format!("off ({})", liveness_value(status.liveness))
            },
            alert: matches!(status.liveness, Liveness::Watching { .. }),
        },
        StatusRow {
            label: "host scan",
            value: if status.host_scanning { "running" } else { "stopped" }.to_string(),
            alert: false,
        },
        StatusRow {
            label: "ticks",
            value: status.ticks.to_string(),
            alert: false,
        },
    ]
}

const HELP: &str = "0-9 key   r modifier   k host scan   q quit";

/// status panel in a terminal, rendered using TUI and crossterm
pub struct TermStatusView {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TermStatusView {
    pub fn new() -> Result<TermStatusView, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(TermStatusView { terminal })
    }
}

impl StatusView for TermStatusView {
    fn draw(&mut self, status: &BenchStatus) -> Result<(), io::Error> {
        let rows: Vec<Spans> = status_rows(status)
            .into_iter()
            .map(|row| {
                let style = if row.alert {
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                Spans::from(vec![
                    Span::raw(format!("{:<13}", row.label)),
                    Span::styled(row.value, style),
                ])
            })
            .collect();
        let log: Vec<Spans> = status.log.iter().map(|l| Spans::from(l.as_str())).collect();
        let panel_height = rows.len() as u16 + 2;

        self.terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Split::Vertical)
                .constraints(
                    [
                        Constraint::Length(panel_height),
                        Constraint::Min(3),
                        Constraint::Length(1),
                    ]
                    .as_ref(),
                )
                .split(f.size());
            let panel = Paragraph::new(rows)
                .block(Block::default().title("romswitch").borders(Borders::ALL));
            let diag = Paragraph::new(log)
                .block(Block::default().title("diagnostics").borders(Borders::ALL));
            f.render_widget(panel, chunks[0]);
            f.render_widget(diag, chunks[1]);
            f.render_widget(Paragraph::new(HELP), chunks[2]);
        })?;
        Ok(())
    }
}

/// useful for testing non-display routines
pub struct DummyView {
    pub draws: usize,
}

impl DummyView {
    pub fn new() -> DummyView {
        DummyView { draws: 0 }
    }
}

impl Default for DummyView {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusView for DummyView {
    fn draw(&mut self, _status: &BenchStatus) -> Result<(), io::Error> {
        self.draws += 1;
        Ok(())
    }
}
