use chrono::{DateTime, Utc};

/// Whether a project's datasets were listed explicitly or reconstructed from
/// the single-dataset fields older feeds carry at project level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatasetLayout {
    #[default]
    Explicit,
    Legacy,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub generated_at: Option<String>,
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Project {
    pub project_key: String,
    pub title: String,
    pub average_velocity: f64,
    pub velocity_url: String,
    pub estimate_type: String,
    pub datasets: Vec<Dataset>,
    pub layout: DatasetLayout,
}

impl Project {
    pub fn new(project_key: &str) -> Self {
        Self {
            project_key: project_key.to_string(),
            title: project_key.to_string(),
            ..Self::default()
        }
    }

    /// Number of datasets rendered for this project. Legacy projects always
    /// count as one.
    pub fn dataset_count(&self) -> usize {
        match self.layout {
            DatasetLayout::Legacy => 1,
            DatasetLayout::Explicit => self.datasets.len(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetUrls {
    pub total: Vec<String>,
    pub burned: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub id: usize,
    pub name: String,
    pub total_scope_estimate: f64,
    pub burned_scope_estimate: f64,
    pub total_scope_url: String,
    pub burned_scope_url: String,
    pub dates: Vec<DateTime<Utc>>,
    pub total_estimates: Vec<f64>,
    pub burned_estimates: Vec<f64>,
    pub urls: DatasetUrls,
    pub milestones: Vec<Milestone>,
}

impl Dataset {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Milestone {
    pub name: String,
    pub date: DateTime<Utc>,
    /// Opaque colour string, passed through to the renderer.
    pub color: String,
}
