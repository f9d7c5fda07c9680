use chrono::{DateTime, Utc};

/// A single chart-ready observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: DateTime<Utc>,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    TotalScope,
    BurnedScope,
    Milestone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub kind: SeriesKind,
    pub label: String,
    /// `None` leaves the colour choice to the renderer.
    pub color: Option<String>,
    pub points: Vec<Point>,
}

/// Vertical marker on the time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct MilestoneAnnotation {
    pub date: DateTime<Utc>,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MilestoneMarker {
    pub annotation: MilestoneAnnotation,
    pub series: ChartSeries,
}

/// Burn-up view of one dataset.
///
/// `series[0]` is always total scope and `series[1]` burned scope; milestone
/// series follow in input order from index 2.
#[derive(Debug, Clone, PartialEq)]
pub struct BurnupChart {
    pub title: String,
    pub unit: String,
    pub series: Vec<ChartSeries>,
    pub annotations: Vec<MilestoneAnnotation>,
    pub time_span: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

pub const SCOPE_BAR_LABELS: [&str; 3] = ["Total Scope", "Burned Scope", "Avg. Sprint Velocity"];

/// Bar view of one dataset: total, burned and velocity, each with a link.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeStats {
    pub title: String,
    pub values: [f64; 3],
    pub urls: [String; 3],
}
