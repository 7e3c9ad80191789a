//! Plotters-powered rate chart widget for Ratatui.
//!
//! Plotters gives us axes and line rendering without hand-placing cells; the
//! output lands in the Ratatui buffer through `plotters-ratatui-backend`.

use chrono::{Days, NaiveDate};
use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// Points per drawn segment of a dashed line (gaps are the same length).
const DASH_POINTS: usize = 4;

/// One line on the chart, x in days since the chart origin.
pub struct RateLine {
    pub points: Vec<(f64, f64)>,
    pub color: RGBColor,
    pub dashed: bool,
}

/// A render-only chart description; series and bounds are computed by the
/// caller so `render()` only draws.
pub struct RatePlottersChart<'a> {
    pub lines: &'a [RateLine],
    /// Date at x = 0.
    pub origin: NaiveDate,
    /// X bounds in days since `origin`.
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

impl<'a> Widget for RatePlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to lay out tiny areas.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let origin = self.origin;
        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| axis_date(origin, *v))
                .y_label_formatter(&|v| format!("{v:.1}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            for line in self.lines {
                if line.dashed {
                    for dash in line.points.chunks(DASH_POINTS).step_by(2) {
                        chart.draw_series(LineSeries::new(dash.iter().copied(), &line.color))?;
                    }
                } else {
                    chart.draw_series(LineSeries::new(line.points.iter().copied(), &line.color))?;
                }
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}

/// `YYYY-MM` of the day `offset` days after `origin`.
pub fn axis_date(origin: NaiveDate, offset: f64) -> String {
    let days = offset.max(0.0).round() as u64;
    origin
        .checked_add_days(Days::new(days))
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_labels_are_year_month() {
        let origin = NaiveDate::from_ymd_opt(2020, 4, 28).unwrap();
        assert_eq!(axis_date(origin, 0.0), "2020-04");
        assert_eq!(axis_date(origin, 1095.0), "2023-04");
        assert_eq!(axis_date(origin, -3.0), "2020-04");
    }
}
