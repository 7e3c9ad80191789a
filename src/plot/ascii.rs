//! ASCII plotting for terminal output.
//!
//! Fixed-size grid, deterministic output (helpful for golden tests).
//!
//! Plot elements:
//! - each series is a connected line, one glyph per series (`*`, `+`, `o`, ...)
//! - dashed series are drawn with `.`
//! - x axis spans the display window (trailing months up to the target date)

use chrono::NaiveDate;

use crate::report::ChartData;

const GLYPHS: [char; 5] = ['*', '+', 'o', 'x', '#'];
const DASHED_GLYPH: char = '.';

/// Render the rate chart. `y_bounds` fixes the y range; `None` autoscales
/// to the visible points with 5% padding.
pub fn render_ascii_chart(chart: &ChartData, width: usize, height: usize, y_bounds: Option<[f64; 2]>) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let start = chart.window.start;
    let end = chart.window.end;
    let visible = chart.visible();

    let (y_min, y_max) = match y_bounds {
        Some([lo, hi]) if hi > lo => (lo, hi),
        _ => match y_range(&visible) {
            Some((lo, hi)) => pad_range(lo, hi, 0.05),
            None => (0.0, 1.0),
        },
    };

    let mut out = String::new();
    out.push_str(&format!("Plot: {start} .. {end} | y=[{y_min:.2}, {y_max:.2}]\n"));

    if visible.iter().all(Vec::is_empty) {
        out.push_str("(no data in display window)\n");
        return out;
    }

    let t_max = (end - start).num_days().max(1) as f64;
    let mut grid = vec![vec![' '; width]; height];

    for (i, points) in visible.iter().enumerate() {
        let ch = glyph(chart, i);
        let mut prev = None;
        for &(date, y) in points {
            let x = map_x(day_offset(start, date), t_max, width);
            let yy = map_y(y, y_min, y_max, height);
            match prev {
                Some((x0, y0)) => draw_line(&mut grid, x0, y0, x, yy, ch),
                None => draw_line(&mut grid, x, yy, x, yy, ch),
            }
            prev = Some((x, yy));
        }
    }

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    for (i, series) in chart.series.iter().enumerate() {
        out.push_str(&format!("  {} {}\n", glyph(chart, i), series.spec.label));
    }

    out
}

fn glyph(chart: &ChartData, idx: usize) -> char {
    match chart.series.get(idx) {
        Some(s) if s.spec.dashed => DASHED_GLYPH,
        _ => GLYPHS[idx % GLYPHS.len()],
    }
}

fn day_offset(start: NaiveDate, date: NaiveDate) -> f64 {
    (date - start).num_days() as f64
}

fn y_range(series: &[Vec<(NaiveDate, f64)>]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(_, y) in series.iter().flatten() {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if !(min_y.is_finite() && max_y.is_finite()) {
        return None;
    }
    if max_y > min_y {
        Some((min_y, max_y))
    } else {
        // Flat data: centre it.
        Some((min_y - 0.5, max_y + 0.5))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = (t / t_max).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish). Cells already drawn are kept.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
