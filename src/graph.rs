use crate::aggregator::{RadarSnapshot, SeriesPoint};
use crate::error::{AnalysisError, Result};
use crate::trend::TrendFit;
use plotters::prelude::*;
use std::f64::consts::PI;

/// Configuration options for chart generation
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the X-axis (line chart only)
    pub x_label: String,

    /// Label for the Y-axis (line chart only)
    pub y_label: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,

    /// Font family for captions and labels. Japanese category names need a
    /// family with CJK glyphs installed on the host.
    pub font: String,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            title: "Growth".to_string(),
            x_label: "Session".to_string(),
            y_label: "Average Score".to_string(),
            width: 800,
            height: 600,
            font: "sans-serif".to_string(),
        }
    }
}

/// Renders one column's series as a line chart, returning PNG bytes
///
/// X positions are session indices labelled with the session labels, in
/// ingestion order. When `trend` is given, the fitted line is drawn over the
/// data in a second color.
///
/// # Examples
/// ```no_run
/// use growth_sheet::aggregator::SeriesPoint;
/// use growth_sheet::graph::{GraphOptions, create_line_chart};
///
/// let series = vec![
///     SeriesPoint { label: "2015".to_string(), value: 4.0 },
///     SeriesPoint { label: "2016".to_string(), value: 7.0 },
/// ];
/// let png = create_line_chart(&series, None, &GraphOptions::default()).unwrap();
/// assert!(!png.is_empty());
/// ```
pub fn create_line_chart(
    series: &[SeriesPoint],
    trend: Option<&TrendFit>,
    options: &GraphOptions,
) -> Result<Vec<u8>> {
    if series.is_empty() {
        return Err(AnalysisError::EmptyInput("no points to plot".to_string()));
    }
    render_png(options, |root| draw_line_chart(root, series, trend, options))
}

/// Renders a radar snapshot as a closed polygon, returning PNG bytes
///
/// `max_value` fixes the outer ring; `None` scales to the largest value.
pub fn create_radar_chart(
    snapshot: &RadarSnapshot,
    max_value: Option<f64>,
    options: &GraphOptions,
) -> Result<Vec<u8>> {
    if snapshot.values.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            what: "numeric columns for a radar chart",
            needed: 2,
            found: snapshot.values.len(),
        });
    }
    render_png(options, |root| draw_radar_chart(root, snapshot, max_value, options))
}

/// Unit-circle position of every axis, starting at 12 o'clock and going
/// clockwise, with the first point repeated at the end to close the shape.
pub fn radar_points(values: &[f64], scale: f64) -> Vec<(f64, f64)> {
    let n = values.len();
    let mut points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let r = if scale > 0.0 { v / scale } else { 0.0 };
            let (x, y) = axis_direction(i, n);
            (x * r, y * r)
        })
        .collect();
    if let Some(first) = points.first().copied() {
        points.push(first);
    }
    points
}

fn axis_direction(i: usize, n: usize) -> (f64, f64) {
    let angle = PI / 2.0 - 2.0 * PI * i as f64 / n as f64;
    (angle.cos(), angle.sin())
}

// Drawing goes through a temporary PNG file; the bitmap backend encodes on
// `present()`.
fn render_png<F>(options: &GraphOptions, draw: F) -> Result<Vec<u8>>
where
    F: FnOnce(&DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>) -> Result<()>,
{
    let file = tempfile::Builder::new()
        .prefix("growth_chart")
        .suffix(".png")
        .tempfile()?;
    {
        let root = BitMapBackend::new(file.path(), (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;
        draw(&root)?;
        root.present().map_err(render_error)?;
    }
    Ok(std::fs::read(file.path())?)
}

fn render_error<E: std::fmt::Display>(e: E) -> AnalysisError {
    AnalysisError::Render(e.to_string())
}

fn draw_line_chart(
    root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
    series: &[SeriesPoint],
    trend: Option<&TrendFit>,
    options: &GraphOptions,
) -> Result<()> {
    let fitted = trend.map(|fit| fit.fitted(series.len())).unwrap_or_default();

    let values = series.iter().map(|p| p.value).chain(fitted.iter().copied());
    let (min_y, max_y) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let min_y = min_y.min(0.0);
    let max_y = if max_y > min_y { max_y * 1.1 } else { min_y + 1.0 };

    let x_range = -0.5..(series.len() as f64 - 0.5);
    let font = options.font.as_str();

    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, (font, 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, min_y..max_y)
        .map_err(render_error)?;

    let label_at = |x: &f64| {
        let index = x.round();
        if (x - index).abs() > 1e-6 || index < 0.0 {
            return String::new();
        }
        series
            .get(index as usize)
            .map(|p| p.label.clone())
            .unwrap_or_default()
    };

    chart
        .configure_mesh()
        .x_labels(series.len().max(2))
        .x_label_formatter(&label_at)
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .label_style((font, 14))
        .draw()
        .map_err(render_error)?;

    chart
        .draw_series(LineSeries::new(
            series.iter().enumerate().map(|(i, p)| (i as f64, p.value)),
            &BLUE,
        ))
        .map_err(render_error)?;
    chart
        .draw_series(
            series
                .iter()
                .enumerate()
                .map(|(i, p)| Circle::new((i as f64, p.value), 4, BLUE.filled())),
        )
        .map_err(render_error)?;

    if !fitted.is_empty() {
        chart
            .draw_series(LineSeries::new(
                fitted.iter().enumerate().map(|(i, v)| (i as f64, *v)),
                RED.stroke_width(2),
            ))
            .map_err(render_error)?;
    }

    Ok(())
}

fn draw_radar_chart(
    root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
    snapshot: &RadarSnapshot,
    max_value: Option<f64>,
    options: &GraphOptions,
) -> Result<()> {
    let n = snapshot.values.len();
    let scale = max_value
        .unwrap_or_else(|| snapshot.values.iter().copied().fold(0.0, f64::max))
        .max(f64::EPSILON);
    let font = options.font.as_str();

    let title = format!("{} ({})", options.title, snapshot.session_label);
    let mut chart = ChartBuilder::on(root)
        .caption(title, (font, 30).into_font())
        .margin(20)
        .build_cartesian_2d(-1.35..1.35, -1.25..1.25)
        .map_err(render_error)?;

    // Concentric guide rings at 25% steps plus one spoke per axis.
    for step in 1..=4 {
        let ring = radar_points(&vec![scale * step as f64 / 4.0; n], scale);
        chart
            .draw_series(std::iter::once(PathElement::new(ring, BLACK.mix(0.2))))
            .map_err(render_error)?;
    }
    chart
        .draw_series((0..n).map(|i| {
            let (x, y) = axis_direction(i, n);
            PathElement::new(vec![(0.0, 0.0), (x, y)], BLACK.mix(0.3))
        }))
        .map_err(render_error)?;
    chart
        .draw_series(snapshot.labels.iter().enumerate().map(|(i, label)| {
            let (x, y) = axis_direction(i, n);
            Text::new(
                format!("{} {:.1}", label, snapshot.values[i]),
                (x * 1.12 - 0.1, y * 1.12 + 0.03),
                (font, 15).into_font(),
            )
        }))
        .map_err(render_error)?;

    let outline = radar_points(&snapshot.values, scale);
    chart
        .draw_series(std::iter::once(Polygon::new(outline.clone(), BLUE.mix(0.25))))
        .map_err(render_error)?;
    chart
        .draw_series(std::iter::once(PathElement::new(outline, BLUE.stroke_width(2))))
        .map_err(render_error)?;

    Ok(())
}
