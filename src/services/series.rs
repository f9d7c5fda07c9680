use chrono::{DateTime, Utc};

use crate::domain::chart::{
    BurnupChart, ChartSeries, MilestoneAnnotation, MilestoneMarker, Point, ScopeStats, SeriesKind,
};
use crate::domain::document::{Dataset, Milestone, Project};

pub const TOTAL_SCOPE_LABEL: &str = "Total Scope";
pub const BURNED_SCOPE_LABEL: &str = "Burned Scope";

/// Index of the total scope series in a [`BurnupChart`].
pub const TOTAL_SERIES_INDEX: usize = 0;
/// Index of the burned scope series in a [`BurnupChart`].
pub const BURNED_SERIES_INDEX: usize = 1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedSeries {
    pub total: Vec<Point>,
    pub burned: Vec<Point>,
}

/// Pairs dates with values, leaving out observations after `reference_time`.
///
/// Feeds are date-ascending, so future observations form a trailing suffix:
/// as many entries are cut from the end as there are dates later than
/// `reference_time`. Inputs must be parallel slices of equal length.
pub fn prepare_series(
    dates: &[DateTime<Utc>],
    total_values: &[f64],
    burned_values: &[f64],
    reference_time: DateTime<Utc>,
) -> PreparedSeries {
    let len = dates.len().min(total_values.len()).min(burned_values.len());
    let future = dates[..len]
        .iter()
        .filter(|date| **date > reference_time)
        .count();
    let keep = len - future;

    let mut prepared = PreparedSeries {
        total: Vec::with_capacity(keep),
        burned: Vec::with_capacity(keep),
    };
    for index in 0..keep {
        prepared.total.push(Point {
            x: dates[index],
            y: total_values[index],
        });
        prepared.burned.push(Point {
            x: dates[index],
            y: burned_values[index],
        });
    }
    prepared
}

/// One annotation and one single-point series per milestone, in input order.
pub fn prepare_milestones(milestones: &[Milestone]) -> Vec<MilestoneMarker> {
    milestones
        .iter()
        .map(|milestone| MilestoneMarker {
            annotation: MilestoneAnnotation {
                date: milestone.date,
                color: milestone.color.clone(),
            },
            series: ChartSeries {
                kind: SeriesKind::Milestone,
                label: milestone.name.clone(),
                color: Some(milestone.color.clone()),
                points: vec![Point {
                    x: milestone.date,
                    y: 1.0,
                }],
            },
        })
        .collect()
}

/// Display unit for an estimate type: only the first underscore becomes a space.
pub fn unit_label(estimate_type: &str) -> String {
    estimate_type.replacen('_', " ", 1)
}

impl BurnupChart {
    pub fn from_dataset(
        project: &Project,
        dataset: &Dataset,
        reference_time: DateTime<Utc>,
    ) -> Self {
        let prepared = prepare_series(
            &dataset.dates,
            &dataset.total_estimates,
            &dataset.burned_estimates,
            reference_time,
        );
        let markers = prepare_milestones(&dataset.milestones);

        let mut series = Vec::with_capacity(2 + markers.len());
        series.push(ChartSeries {
            kind: SeriesKind::TotalScope,
            label: TOTAL_SCOPE_LABEL.to_string(),
            color: None,
            points: prepared.total,
        });
        series.push(ChartSeries {
            kind: SeriesKind::BurnedScope,
            label: BURNED_SCOPE_LABEL.to_string(),
            color: None,
            points: prepared.burned,
        });

        let mut annotations = Vec::with_capacity(markers.len());
        for marker in markers {
            annotations.push(marker.annotation);
            series.push(marker.series);
        }

        Self {
            title: dataset.name.clone(),
            unit: unit_label(&project.estimate_type),
            series,
            annotations,
            time_span: time_span(&dataset.dates),
        }
    }
}

/// Axis range over every date, future ones included.
fn time_span(dates: &[DateTime<Utc>]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = dates.iter().min()?;
    let last = dates.iter().max()?;
    Some((*first, *last))
}

impl ScopeStats {
    pub fn from_dataset(project: &Project, dataset: &Dataset) -> Self {
        Self {
            title: dataset.name.clone(),
            values: [
                dataset.total_scope_estimate,
                dataset.burned_scope_estimate,
                project.average_velocity,
            ],
            urls: [
                dataset.total_scope_url.clone(),
                dataset.burned_scope_url.clone(),
                project.velocity_url.clone(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{build_dataset, on_date};

    #[test]
    fn future_observations_are_trimmed_from_the_end() {
        let dates = vec![on_date(2020, 1, 1), on_date(2020, 1, 2), on_date(2099, 1, 1)];

        let prepared = prepare_series(&dates, &[10.0, 12.0, 15.0], &[1.0, 2.0, 3.0], on_date(2020, 6, 1));

        assert_eq!(
            prepared.total,
            vec![
                Point { x: on_date(2020, 1, 1), y: 10.0 },
                Point { x: on_date(2020, 1, 2), y: 12.0 },
            ]
        );
        assert_eq!(
            prepared.burned,
            vec![
                Point { x: on_date(2020, 1, 1), y: 1.0 },
                Point { x: on_date(2020, 1, 2), y: 2.0 },
            ]
        );
    }

    #[test]
    fn observation_at_reference_time_is_kept() {
        let dates = vec![on_date(2020, 1, 1), on_date(2020, 1, 2)];
        let prepared = prepare_series(&dates, &[1.0, 2.0], &[0.0, 1.0], on_date(2020, 1, 2));
        assert_eq!(prepared.total.len(), 2);
    }

    #[test]
    fn reference_before_all_dates_yields_empty_series() {
        let dates = vec![on_date(2020, 1, 1), on_date(2020, 1, 2)];
        let prepared = prepare_series(&dates, &[1.0, 2.0], &[0.0, 1.0], on_date(2019, 1, 1));
        assert!(prepared.total.is_empty());
        assert!(prepared.burned.is_empty());
    }

    #[test]
    fn reference_after_all_dates_keeps_everything_in_order() {
        let dates = vec![on_date(2020, 1, 1), on_date(2020, 1, 5), on_date(2020, 2, 1)];
        let prepared = prepare_series(&dates, &[1.0, 2.0, 3.0], &[0.0, 1.0, 2.0], on_date(2030, 1, 1));

        assert_eq!(prepared.total.len(), dates.len());
        assert_eq!(prepared.burned.len(), dates.len());
        assert!(prepared.total.windows(2).all(|pair| pair[0].x < pair[1].x));
    }

    #[test]
    fn empty_input_yields_empty_series() {
        let prepared = prepare_series(&[], &[], &[], on_date(2020, 1, 1));
        assert_eq!(prepared, PreparedSeries::default());
    }

    #[test]
    fn milestones_become_annotations_and_single_point_series_in_order() {
        let milestones = vec![
            Milestone {
                name: "Alpha".to_string(),
                date: on_date(2020, 3, 1),
                color: "red".to_string(),
            },
            Milestone {
                name: "Beta".to_string(),
                date: on_date(2020, 2, 1),
                color: "#00ff00".to_string(),
            },
        ];

        let markers = prepare_milestones(&milestones);

        assert_eq!(markers.len(), 2);
        for (marker, milestone) in markers.iter().zip(&milestones) {
            assert_eq!(marker.annotation.date, milestone.date);
            assert_eq!(marker.annotation.color, milestone.color);
            assert_eq!(marker.series.label, milestone.name);
            assert_eq!(marker.series.color.as_deref(), Some(milestone.color.as_str()));
            assert_eq!(marker.series.points, vec![Point { x: milestone.date, y: 1.0 }]);
        }
    }

    #[test]
    fn unit_label_replaces_only_the_first_underscore() {
        assert_eq!(unit_label("story_points"), "story points");
        assert_eq!(unit_label("time_estimate_hours"), "time estimate_hours");
        assert_eq!(unit_label("hours"), "hours");
    }

    #[test]
    fn burnup_chart_orders_total_burned_then_milestones() {
        let mut project = Project::new("ABC");
        project.estimate_type = "story_points".to_string();
        let mut dataset = build_dataset("Team", &[("2020-01-01", 5.0, 1.0), ("2099-01-01", 8.0, 2.0)]);
        dataset.milestones.push(Milestone {
            name: "Launch".to_string(),
            date: on_date(2020, 4, 1),
            color: "blue".to_string(),
        });

        let chart = BurnupChart::from_dataset(&project, &dataset, on_date(2020, 6, 1));

        assert_eq!(chart.unit, "story points");
        assert_eq!(chart.series.len(), 3);
        assert_eq!(chart.series[TOTAL_SERIES_INDEX].kind, SeriesKind::TotalScope);
        assert_eq!(chart.series[BURNED_SERIES_INDEX].kind, SeriesKind::BurnedScope);
        assert_eq!(chart.series[2].kind, SeriesKind::Milestone);
        assert_eq!(chart.series[2].label, "Launch");
        assert_eq!(chart.series[TOTAL_SERIES_INDEX].points.len(), 1);
        assert_eq!(chart.annotations.len(), 1);
        assert_eq!(chart.time_span, Some((on_date(2020, 1, 1), on_date(2099, 1, 1))));
    }

    #[test]
    fn scope_stats_pair_values_with_urls() {
        let mut project = Project::new("ABC");
        project.average_velocity = 13.0;
        project.velocity_url = "velocity".to_string();
        let mut dataset = build_dataset("Team", &[]);
        dataset.total_scope_estimate = 100.0;
        dataset.burned_scope_estimate = 25.0;
        dataset.total_scope_url = "total".to_string();
        dataset.burned_scope_url = "burned".to_string();

        let stats = ScopeStats::from_dataset(&project, &dataset);

        assert_eq!(stats.values, [100.0, 25.0, 13.0]);
        assert_eq!(stats.urls, ["total".to_string(), "burned".to_string(), "velocity".to_string()]);
    }
}
