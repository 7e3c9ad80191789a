//! Ratatui-based terminal UI.
//!
//! Shows the rate chart for the trailing display window and the rate table
//! for the selected date. The date can be stepped through the indexed days or
//! typed in directly.

use std::io;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use plotters::style::RGBColor;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::app::pipeline::{self, Analysis, LoadedTable};
use crate::domain::{DEFAULT_Y_BOUNDS, InputSource, ReportConfig};
use crate::error::AppError;
use crate::report::format_metrics_table;
use crate::table::reference_date;

mod plotters_chart;

use plotters_chart::{RateLine, RatePlottersChart, axis_date};

const PALETTE: [(RGBColor, Color); 4] = [
    (RGBColor(255, 255, 255), Color::White),
    (RGBColor(0, 255, 255), Color::Cyan),
    (RGBColor(255, 200, 0), Color::Yellow),
    (RGBColor(0, 255, 0), Color::Green),
];

/// Start the TUI.
pub fn run(config: ReportConfig) -> Result<(), AppError> {
    // Load before touching the terminal so input errors print normally.
    let mut app = App::new(config)?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    config: ReportConfig,
    loaded: LoadedTable,
    /// Indexed dates, ascending.
    dates: Vec<NaiveDate>,
    analysis: Option<Analysis>,
    date_input: String,
    editing_date: bool,
    fixed_y: bool,
    status: String,
}

impl App {
    fn new(config: ReportConfig) -> Result<Self, AppError> {
        let now = Local::now().naive_local();
        let reference = reference_date(now, config.cutoff_hour);
        let loaded = pipeline::load(&config, reference)?;
        let target = pipeline::resolve_target(&loaded.table, config.target_date, reference)?;

        let mut app = Self {
            fixed_y: config.y_bounds.is_some(),
            config,
            dates: indexed_dates(&loaded),
            loaded,
            analysis: None,
            date_input: String::new(),
            editing_date: false,
            status: String::new(),
        };
        app.select(target);
        Ok(app)
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code)? {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => needs_redraw = true,
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool, AppError> {
        if self.editing_date {
            self.handle_date_edit(code);
            return Ok(false);
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Left => self.step(-1),
            KeyCode::Right => self.step(1),
            KeyCode::PageUp => self.step(-20),
            KeyCode::PageDown => self.step(20),
            KeyCode::Home => {
                if let Some(&first) = self.dates.first() {
                    self.select(first);
                }
            }
            KeyCode::End => {
                if let Some(&last) = self.dates.last() {
                    self.select(last);
                }
            }
            KeyCode::Enter => {
                self.editing_date = true;
                self.date_input.clear();
                self.status = "Editing date (YYYY-MM-DD). Enter to apply, Esc to cancel.".to_string();
            }
            KeyCode::Char('y') => {
                self.fixed_y = !self.fixed_y;
                self.status = if self.fixed_y { "y-axis: fixed" } else { "y-axis: auto" }.to_string();
            }
            KeyCode::Char('r') => self.reload()?,
            _ => {}
        }

        Ok(false)
    }

    fn handle_date_edit(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.editing_date = false;
                self.status = "Date edit canceled.".to_string();
            }
            KeyCode::Enter => {
                self.editing_date = false;
                self.apply_date_input();
            }
            KeyCode::Backspace => {
                self.date_input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '-' => self.date_input.push(c),
            _ => {}
        }
    }

    fn apply_date_input(&mut self) {
        let trimmed = self.date_input.trim();
        let date = match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            Ok(d) => d,
            Err(e) => {
                self.status = format!("Invalid date '{trimmed}': {e}");
                return;
            }
        };
        // Typed dates are explicit targets: exact match only.
        match self.loaded.table.resolve(date, true) {
            Ok((matched, _)) => self.select(matched),
            Err(err) => self.status = err.to_string(),
        }
    }

    /// Move `delta` indexed dates from the current target.
    fn step(&mut self, delta: isize) {
        let Some(current) = self.analysis.as_ref().map(|a| a.target_date) else {
            return;
        };
        if let Some(next) = step_date(&self.dates, current, delta) {
            self.select(next);
        }
    }

    fn select(&mut self, target: NaiveDate) {
        match pipeline::analyze(&self.loaded, target, &self.config.layout) {
            Ok(analysis) => {
                let failed = analysis.report.failures().count();
                self.status = if failed == 0 {
                    format!("date: {target}")
                } else {
                    format!("date: {target} ({failed} column(s) unavailable)")
                };
                self.analysis = Some(analysis);
            }
            Err(err) => self.status = err.to_string(),
        }
    }

    /// Re-read the input (new seed for demo data) and keep the current date if
    /// it is still indexed.
    fn reload(&mut self) -> Result<(), AppError> {
        if let InputSource::Demo { seed } = &mut self.config.input {
            *seed = seed.wrapping_add(1);
        }
        let now = Local::now().naive_local();
        let reference = reference_date(now, self.config.cutoff_hour);
        let current = self.analysis.as_ref().map(|a| a.target_date);

        let loaded = pipeline::load(&self.config, current.unwrap_or(reference))?;
        let target = match current.filter(|d| loaded.table.position_of(*d).is_some()) {
            Some(d) => d,
            None => pipeline::resolve_target(&loaded.table, None, reference)?,
        };

        self.dates = indexed_dates(&loaded);
        self.loaded = loaded;
        self.select(target);
        self.status = format!("Reloaded {} | {}", self.loaded.source, self.status);
        Ok(())
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("fundrate", Style::default().fg(Color::Cyan)),
            Span::raw(" - OMO / DR007 / R007 funding rates"),
        ]));

        let target = self
            .analysis
            .as_ref()
            .map(|a| a.target_date.to_string())
            .unwrap_or_else(|| "-".to_string());
        let latest = self
            .loaded
            .table
            .last_date()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());

        lines.push(Line::from(Span::styled(
            format!(
                "input: {} | dated rows: {} | latest: {latest} | target: {target}",
                self.loaded.source,
                self.loaded.table.index().len(),
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = self
            .analysis
            .as_ref()
            .map(|a| a.report.metrics.len())
            .unwrap_or(0);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(8 + rows as u16)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_table(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(analysis) = &self.analysis else {
            let block = Block::default().title("Rates").borders(Borders::ALL);
            let msg = Paragraph::new("No target date selected.")
                .style(Style::default().fg(Color::Yellow))
                .block(block);
            frame.render_widget(msg, area);
            return;
        };

        let window = &analysis.chart.window;
        let title = format!("Rates {} .. {} (rows before {})", window.start, window.end, window.target);
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let fixed = self
            .fixed_y
            .then(|| self.config.y_bounds.unwrap_or(DEFAULT_Y_BOUNDS));
        let (lines, x_bounds, y_bounds) = chart_lines(analysis, fixed);

        let (legend_rect, plot_area) = split_legend(inner);
        self.draw_legend(frame, legend_rect, analysis);

        let (chart_rect, insets) = chart_layout(plot_area);
        let widget = RatePlottersChart {
            lines: &lines,
            origin: window.start,
            x_bounds,
            y_bounds,
        };
        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, plot_area, chart_rect, insets, window.start, x_bounds, y_bounds);
        }
    }

    fn draw_legend(&self, frame: &mut ratatui::Frame<'_>, area: Rect, analysis: &Analysis) {
        let mut spans = Vec::new();
        for (i, series) in analysis.chart.series.iter().enumerate() {
            let (_, color) = PALETTE[i % PALETTE.len()];
            let mark = if series.spec.dashed { "- - " } else { "--- " };
            spans.push(Span::styled(mark, Style::default().fg(color)));
            spans.push(Span::raw(format!("{}   ", series.spec.label)));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_table(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let text = self
            .analysis
            .as_ref()
            .map(|a| format_metrics_table(&a.report))
            .unwrap_or_default();
        let title = self
            .analysis
            .as_ref()
            .map(|a| format!("Rate table {}", a.target_date))
            .unwrap_or_else(|| "Rate table".to_string());
        let p = Paragraph::new(text).block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = if self.editing_date {
            format!("date: {}_", self.date_input)
        } else {
            "←/→ day  PgUp/PgDn 20 days  Home/End  Enter date  y y-axis  r reload  q quit".to_string()
        };
        let line = Line::from(vec![
            Span::styled(
                help,
                if self.editing_date {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                },
            ),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn indexed_dates(loaded: &LoadedTable) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = loaded.table.labels().iter().filter_map(|l| l.date()).collect();
    dates.sort_unstable();
    dates.dedup();
    dates
}

/// The indexed date `delta` places from `current`, clamped to the ends.
/// `None` when that is `current` itself.
fn step_date(dates: &[NaiveDate], current: NaiveDate, delta: isize) -> Option<NaiveDate> {
    if dates.is_empty() {
        return None;
    }
    let pos = match dates.binary_search(&current) {
        Ok(i) => i as isize,
        // Not indexed: stepping forward lands on the next date, back on the previous.
        Err(i) if delta > 0 => i as isize - 1,
        Err(i) => i as isize,
    };
    let next = (pos + delta).clamp(0, dates.len() as isize - 1) as usize;
    let date = dates[next];
    (date != current).then_some(date)
}

/// Chart lines in day offsets from the window start, plus x and y bounds.
fn chart_lines(analysis: &Analysis, fixed_y: Option<[f64; 2]>) -> (Vec<RateLine>, [f64; 2], [f64; 2]) {
    let window = &analysis.chart.window;
    let span = (window.end - window.start).num_days().max(1) as f64;
    let x_bounds = [0.0, span];

    let lines: Vec<RateLine> = analysis
        .chart
        .visible()
        .into_iter()
        .zip(&analysis.chart.series)
        .enumerate()
        .map(|(i, (points, series))| RateLine {
            points: points
                .into_iter()
                .map(|(d, y)| ((d - window.start).num_days() as f64, y))
                .collect(),
            color: PALETTE[i % PALETTE.len()].0,
            dashed: series.spec.dashed,
        })
        .collect();

    let y_bounds = match fixed_y {
        Some(b) if b[1] > b[0] => b,
        _ => auto_y_bounds(&lines),
    };

    (lines, x_bounds, y_bounds)
}

fn auto_y_bounds(lines: &[RateLine]) -> [f64; 2] {
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(_, y) in lines.iter().flat_map(|l| l.points.iter()) {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !y_min.is_finite() || !y_max.is_finite() {
        return DEFAULT_Y_BOUNDS;
    }
    if y_max <= y_min {
        return [y_min - 0.5, y_max + 0.5];
    }
    let pad = ((y_max - y_min) * 0.05).max(1e-12);
    [y_min - pad, y_max + pad]
}

fn split_legend(inner: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);
    (chunks[0], chunks[1])
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 6,
        right: 4,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    origin: NaiveDate,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = axis_date(origin, x_val);
        let label_len = label.len() as u16;
        let start = x.saturating_sub(label_len / 2);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = format!("{y_val:.2}");
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label_len);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let y_label = Paragraph::new("%")
        .alignment(Alignment::Left)
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::dated::tests::ymd;

    fn dates() -> Vec<NaiveDate> {
        vec![ymd(2023, 4, 26), ymd(2023, 4, 27), ymd(2023, 4, 28), ymd(2023, 5, 4)]
    }

    #[test]
    fn stepping_moves_between_indexed_dates() {
        let d = dates();
        assert_eq!(step_date(&d, ymd(2023, 4, 28), 1), Some(ymd(2023, 5, 4)));
        assert_eq!(step_date(&d, ymd(2023, 4, 28), -1), Some(ymd(2023, 4, 27)));
        assert_eq!(step_date(&d, ymd(2023, 4, 28), -20), Some(ymd(2023, 4, 26)));
        assert_eq!(step_date(&d, ymd(2023, 5, 4), 1), None);
    }

    #[test]
    fn stepping_from_unindexed_date_lands_on_neighbours() {
        let d = dates();
        assert_eq!(step_date(&d, ymd(2023, 5, 1), 1), Some(ymd(2023, 5, 4)));
        assert_eq!(step_date(&d, ymd(2023, 5, 1), -1), Some(ymd(2023, 4, 28)));
    }

    #[test]
    fn flat_lines_get_nonzero_y_range() {
        let lines = vec![RateLine {
            points: vec![(0.0, 2.0), (1.0, 2.0)],
            color: PALETTE[0].0,
            dashed: false,
        }];
        assert_eq!(auto_y_bounds(&lines), [1.5, 2.5]);
        assert_eq!(auto_y_bounds(&[]), DEFAULT_Y_BOUNDS);
    }
}
