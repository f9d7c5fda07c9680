use chrono::{DateTime, Utc};

use crate::domain::document::{Dataset, Document, Project};
use crate::services::document_json::parse_timestamp;

pub fn on_date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Dataset from `(date, total, burned)` observations, with one URL per
/// observation in each table.
pub fn build_dataset(name: &str, observations: &[(&str, f64, f64)]) -> Dataset {
    let mut dataset = Dataset::new(name);
    for (index, (date, total, burned)) in observations.iter().enumerate() {
        dataset.dates.push(parse_timestamp(date).unwrap());
        dataset.total_estimates.push(*total);
        dataset.burned_estimates.push(*burned);
        dataset.urls.total.push(format!("https://jira.example/total/{index}"));
        dataset.urls.burned.push(format!("https://jira.example/burned/{index}"));
    }
    dataset.total_scope_estimate = observations.last().map(|o| o.1).unwrap_or(0.0);
    dataset.burned_scope_estimate = observations.last().map(|o| o.2).unwrap_or(0.0);
    dataset
}

pub fn build_document(project_key: &str, datasets: Vec<Dataset>) -> Document {
    let mut project = Project::new(project_key);
    project.estimate_type = "story_points".to_string();
    project.average_velocity = 8.0;
    project.datasets = datasets;
    for (position, dataset) in project.datasets.iter_mut().enumerate() {
        dataset.id = position;
    }
    Document {
        generated_at: Some("2020-06-01".to_string()),
        projects: vec![project],
    }
}
