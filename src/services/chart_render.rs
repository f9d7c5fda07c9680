use chrono::{DateTime, Duration, Utc};
use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;

use crate::domain::chart::{BurnupChart, SCOPE_BAR_LABELS, ScopeStats, SeriesKind};
use crate::services::click_resolver::{PixelPosition, RenderedBar, RenderedPoint};

pub const SCOPE_CHART_SIZE: (u32, u32) = (450, 400);
pub const BURNUP_CHART_SIZE: (u32, u32) = (900, 400);

const TOTAL_COLOR: RGBColor = RGBColor(99, 99, 240);
const BURNED_COLOR: RGBColor = RGBColor(240, 99, 99);
const VELOCITY_COLOR: RGBColor = RGBColor(99, 240, 99);
const FALLBACK_COLOR: RGBColor = RGBColor(128, 128, 128);
const POINT_SIZE: i32 = 3;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to render chart: {0}")]
    Plot(String),
}

fn plot_error<E: std::fmt::Display>(error: E) -> RenderError {
    RenderError::Plot(error.to_string())
}

pub fn render_scope_stats_png(
    output_path: &str,
    stats: &ScopeStats,
) -> Result<Vec<RenderedBar>, RenderError> {
    let root = BitMapBackend::new(output_path, SCOPE_CHART_SIZE).into_drawing_area();
    let bars = draw_scope_stats(&root, stats)?;
    root.present().map_err(plot_error)?;
    Ok(bars)
}

pub fn render_burnup_png(
    output_path: &str,
    chart: &BurnupChart,
) -> Result<Vec<RenderedPoint>, RenderError> {
    let root = BitMapBackend::new(output_path, BURNUP_CHART_SIZE).into_drawing_area();
    let points = draw_burnup(&root, chart)?;
    root.present().map_err(plot_error)?;
    Ok(points)
}

/// Lays out the scope chart in memory; geometry matches the PNG output.
pub fn layout_scope_stats(stats: &ScopeStats) -> Result<Vec<RenderedBar>, RenderError> {
    let (width, height) = SCOPE_CHART_SIZE;
    let mut buffer = vec![0u8; (width * height * 3) as usize];
    let root = BitMapBackend::with_buffer(&mut buffer, SCOPE_CHART_SIZE).into_drawing_area();
    draw_scope_stats(&root, stats)
}

/// Lays out the burn-up chart in memory; geometry matches the PNG output.
pub fn layout_burnup(chart: &BurnupChart) -> Result<Vec<RenderedPoint>, RenderError> {
    let (width, height) = BURNUP_CHART_SIZE;
    let mut buffer = vec![0u8; (width * height * 3) as usize];
    let root = BitMapBackend::with_buffer(&mut buffer, BURNUP_CHART_SIZE).into_drawing_area();
    draw_burnup(&root, chart)
}

pub fn draw_scope_stats<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    stats: &ScopeStats,
) -> Result<Vec<RenderedBar>, RenderError> {
    root.fill(&WHITE).map_err(plot_error)?;

    let max_value = stats.values.iter().cloned().fold(0.0_f64, f64::max);
    let max_y = if max_value > 0.0 { max_value * 1.1 } else { 1.0 };

    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .caption(&stats.title, ("sans-serif", 24))
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d(-0.5_f64..2.5_f64, 0.0_f64..max_y)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(SCOPE_BAR_LABELS.len())
        .x_label_formatter(&|value| {
            let nearest = value.round();
            if (value - nearest).abs() > f64::EPSILON || nearest < 0.0 {
                return String::new();
            }
            SCOPE_BAR_LABELS
                .get(nearest as usize)
                .map(|label| label.to_string())
                .unwrap_or_default()
        })
        .label_style(("sans-serif", 14))
        .draw()
        .map_err(plot_error)?;

    let colors = [TOTAL_COLOR, BURNED_COLOR, VELOCITY_COLOR];
    let mut bars = Vec::with_capacity(stats.values.len());
    for (index, value) in stats.values.iter().enumerate() {
        let center = index as f64;
        let corners = [(center - 0.4, *value), (center + 0.4, 0.0)];
        chart
            .draw_series(std::iter::once(Rectangle::new(
                corners,
                colors[index].filled(),
            )))
            .map_err(plot_error)?;

        let (left, top) = chart.backend_coord(&corners[0]);
        let (right, bottom) = chart.backend_coord(&corners[1]);
        bars.push(RenderedBar {
            index,
            top_left: PixelPosition { x: left, y: top },
            bottom_right: PixelPosition {
                x: right,
                y: bottom,
            },
        });
    }

    Ok(bars)
}

pub fn draw_burnup<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    burnup: &BurnupChart,
) -> Result<Vec<RenderedPoint>, RenderError> {
    root.fill(&WHITE).map_err(plot_error)?;

    let (start, end) = axis_span(burnup);
    let max_value = burnup
        .series
        .iter()
        .flat_map(|series| series.points.iter().map(|point| point.y))
        .fold(1.0_f64, f64::max);
    let max_y = max_value * 1.1;

    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .caption(&burnup.title, ("sans-serif", 24))
        .x_label_area_size(45)
        .y_label_area_size(65)
        .build_cartesian_2d(seconds(start)..seconds(end), 0.0_f64..max_y)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc(&burnup.unit)
        .label_style(("sans-serif", 14))
        .axis_desc_style(("sans-serif", 16))
        .x_labels(8)
        .x_label_formatter(&|value| {
            DateTime::from_timestamp(*value as i64, 0)
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        })
        .draw()
        .map_err(plot_error)?;

    for annotation in &burnup.annotations {
        let color = parse_color(&annotation.color);
        let x = seconds(annotation.date);
        chart
            .draw_series(LineSeries::new(vec![(x, 0.0), (x, max_y)], color.stroke_width(1)))
            .map_err(plot_error)?;
    }

    let mut rendered = Vec::new();
    for (series_index, series) in burnup.series.iter().enumerate() {
        let color = match (series.kind, series.color.as_deref()) {
            (_, Some(color)) => parse_color(color),
            (SeriesKind::TotalScope, None) => TOTAL_COLOR,
            (SeriesKind::BurnedScope, None) => BURNED_COLOR,
            (SeriesKind::Milestone, None) => FALLBACK_COLOR,
        };
        let coordinates: Vec<(f64, f64)> = series
            .points
            .iter()
            .map(|point| (seconds(point.x), point.y))
            .collect();

        if series.kind != SeriesKind::Milestone {
            chart
                .draw_series(LineSeries::new(coordinates.clone(), color.stroke_width(2)))
                .map_err(plot_error)?;
        }
        chart
            .draw_series(
                coordinates
                    .iter()
                    .map(|coordinate| Circle::new(*coordinate, POINT_SIZE, color.filled())),
            )
            .map_err(plot_error)?
            .label(series.label.clone())
            .legend(move |(x, y)| Circle::new((x + 10, y), POINT_SIZE, color.filled()));

        for (point_index, coordinate) in coordinates.iter().enumerate() {
            let (x, y) = chart.backend_coord(coordinate);
            rendered.push(RenderedPoint {
                series_index,
                point_index,
                position: PixelPosition { x, y },
            });
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_error)?;

    Ok(rendered)
}

fn seconds(date: DateTime<Utc>) -> f64 {
    date.timestamp() as f64
}

/// Time axis range covering every observation and milestone, never empty.
fn axis_span(burnup: &BurnupChart) -> (DateTime<Utc>, DateTime<Utc>) {
    let milestone_dates = burnup.annotations.iter().map(|annotation| annotation.date);
    let span_dates = burnup
        .time_span
        .into_iter()
        .flat_map(|(first, last)| [first, last]);
    let dates: Vec<DateTime<Utc>> = span_dates.chain(milestone_dates).collect();

    match (dates.iter().min(), dates.iter().max()) {
        (Some(first), Some(last)) if first < last => (*first, *last),
        (Some(only), Some(_)) => (*only - Duration::days(1), *only + Duration::days(1)),
        _ => (DateTime::UNIX_EPOCH, DateTime::UNIX_EPOCH + Duration::days(1)),
    }
}

/// Reads `#rgb`, `#rrggbb`, `rgb(r, g, b)`, `rgba(r, g, b, a)` and a handful of
/// CSS colour names. Anything else is drawn grey.
pub fn parse_color(value: &str) -> RGBColor {
    let text = value.trim().to_ascii_lowercase();
    if let Some(hex) = text.strip_prefix('#') {
        return parse_hex_color(hex).unwrap_or(FALLBACK_COLOR);
    }
    if let Some(body) = text
        .strip_prefix("rgba(")
        .or_else(|| text.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let channels: Vec<u8> = body
            .split(',')
            .take(3)
            .filter_map(|channel| channel.trim().parse::<f64>().ok())
            .map(|channel| channel.clamp(0.0, 255.0) as u8)
            .collect();
        return match channels.as_slice() {
            [r, g, b] => RGBColor(*r, *g, *b),
            _ => FALLBACK_COLOR,
        };
    }
    match text.as_str() {
        "black" => RGBColor(0, 0, 0),
        "white" => RGBColor(255, 255, 255),
        "red" => RGBColor(255, 0, 0),
        "green" => RGBColor(0, 128, 0),
        "blue" => RGBColor(0, 0, 255),
        "orange" => RGBColor(255, 165, 0),
        "purple" => RGBColor(128, 0, 128),
        "yellow" => RGBColor(255, 255, 0),
        _ => FALLBACK_COLOR,
    }
}

fn parse_hex_color(hex: &str) -> Option<RGBColor> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&expanded[range], 16).ok();
    Some(RGBColor(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
