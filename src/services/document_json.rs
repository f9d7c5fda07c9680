use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::document::{Dataset, DatasetLayout, DatasetUrls, Document, Milestone, Project};

#[derive(Error, Debug)]
pub enum DocumentJsonError {
    #[error("failed to parse document json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("project {project}: dataset {dataset} has {dates} dates but {values} {field}")]
    MismatchedSeries {
        project: String,
        dataset: usize,
        field: &'static str,
        dates: usize,
        values: usize,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DocumentRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    pub projects: Vec<ProjectRecord>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ProjectRecord {
    pub project_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub average_velocity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasets: Option<Vec<DatasetRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_scope_estimate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burned_scope_estimate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_scope_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burned_scope_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_date: Option<ToDateRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestones: Option<Vec<MilestoneRecord>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatasetRecord {
    pub name: Option<String>,
    pub total_scope_estimate: Option<f64>,
    pub burned_scope_estimate: Option<f64>,
    pub total_scope_url: Option<String>,
    pub burned_scope_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_date: Option<ToDateRecord>,
    #[serde(flatten)]
    pub series: ToDateRecord,
    pub milestones: Option<Vec<MilestoneRecord>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ToDateRecord {
    pub dates: Vec<String>,
    pub total_estimates: Vec<f64>,
    pub burned_estimates: Vec<f64>,
    pub urls: UrlsRecord,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct UrlsRecord {
    pub total: Vec<String>,
    pub burned: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct MilestoneRecord {
    pub name: String,
    pub date: String,
    pub color: String,
}

pub fn deserialize_document_from_json_str(input: &str) -> Result<Document, DocumentJsonError> {
    let record: DocumentRecord = serde_json::from_str(input)?;
    document_from_record(record)
}

pub fn document_from_record(record: DocumentRecord) -> Result<Document, DocumentJsonError> {
    let mut projects = Vec::with_capacity(record.projects.len());
    for project_record in record.projects {
        projects.push(project_from_record(project_record)?);
    }

    Ok(Document {
        generated_at: record.generated_at,
        projects,
    })
}

fn project_from_record(record: ProjectRecord) -> Result<Project, DocumentJsonError> {
    let mut project = Project::new(&record.project_key);
    if let Some(title) = record.title {
        project.title = title;
    }
    project.average_velocity = record.average_velocity.unwrap_or(0.0);
    project.velocity_url = record.velocity_url.unwrap_or_default();
    project.estimate_type = record.estimate_type.unwrap_or_default();

    match record.datasets {
        Some(dataset_records) => {
            project.layout = DatasetLayout::Explicit;
            for (position, dataset_record) in dataset_records.into_iter().enumerate() {
                let mut dataset = dataset_from_record(&project.project_key, position, dataset_record)?;
                dataset.id = position;
                project.datasets.push(dataset);
            }
        }
        None => {
            project.layout = DatasetLayout::Legacy;
            let legacy = DatasetRecord {
                name: Some(project.title.clone()),
                total_scope_estimate: record.total_scope_estimate,
                burned_scope_estimate: record.burned_scope_estimate,
                total_scope_url: record.total_scope_url,
                burned_scope_url: record.burned_scope_url,
                to_date: record.to_date,
                series: ToDateRecord::default(),
                milestones: record.milestones,
            };
            project
                .datasets
                .push(dataset_from_record(&project.project_key, 0, legacy)?);
        }
    }

    Ok(project)
}

fn dataset_from_record(
    project_key: &str,
    position: usize,
    record: DatasetRecord,
) -> Result<Dataset, DocumentJsonError> {
    // Observations may sit directly on the dataset or under `to_date`.
    let series = match record.to_date {
        Some(to_date) if record.series.dates.is_empty() => to_date,
        _ => record.series,
    };

    check_series_length(project_key, position, "total_estimates", &series.dates, &series.total_estimates)?;
    check_series_length(project_key, position, "burned_estimates", &series.dates, &series.burned_estimates)?;

    let dates = series
        .dates
        .iter()
        .map(|date| parse_timestamp(date))
        .collect::<Result<Vec<_>, _>>()?;

    let milestones = record
        .milestones
        .unwrap_or_default()
        .into_iter()
        .map(|milestone| {
            Ok(Milestone {
                date: parse_timestamp(&milestone.date)?,
                name: milestone.name,
                color: milestone.color,
            })
        })
        .collect::<Result<Vec<_>, DocumentJsonError>>()?;

    let mut dataset = Dataset::new(record.name.as_deref().unwrap_or_default());
    dataset.id = position;
    dataset.total_scope_estimate = record.total_scope_estimate.unwrap_or(0.0);
    dataset.burned_scope_estimate = record.burned_scope_estimate.unwrap_or(0.0);
    dataset.total_scope_url = record.total_scope_url.unwrap_or_default();
    dataset.burned_scope_url = record.burned_scope_url.unwrap_or_default();
    dataset.dates = dates;
    dataset.total_estimates = series.total_estimates;
    dataset.burned_estimates = series.burned_estimates;
    dataset.urls = DatasetUrls {
        total: series.urls.total,
        burned: series.urls.burned,
    };
    dataset.milestones = milestones;
    Ok(dataset)
}

/// A missing estimates array reads as empty and is accepted; a present one
/// must match `dates`.
fn check_series_length(
    project_key: &str,
    dataset: usize,
    field: &'static str,
    dates: &[String],
    values: &[f64],
) -> Result<(), DocumentJsonError> {
    if !values.is_empty() && dates.len() != values.len() {
        return Err(DocumentJsonError::MismatchedSeries {
            project: project_key.to_string(),
            dataset,
            field,
            dates: dates.len(),
            values: values.len(),
        });
    }
    Ok(())
}

/// Parses RFC 3339, `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`. Values without an
/// offset are read as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DocumentJsonError> {
    let text = value.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Ok(timestamp.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(DocumentJsonError::InvalidDate(value.to_string()))
}

pub fn serialize_document_record_to_json(record: &DocumentRecord) -> Result<String, DocumentJsonError> {
    Ok(serde_json::to_string_pretty(record)?)
}
