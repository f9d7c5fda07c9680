use thiserror::Error;
use url::Url;

use crate::domain::document::{DatasetLayout, Document, Project};

pub const PROJECT_IDS_PARAM: &str = "project_ids";
pub const DATASET_IDS_PARAM: &str = "dataset_ids";

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("invalid page url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Allow-lists taken from the dashboard's page URL. An empty list means
/// "no filtering".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    pub project_ids: Vec<String>,
    pub dataset_ids: Vec<String>,
}

impl FilterQuery {
    pub fn new(project_ids: Vec<String>, dataset_ids: Vec<String>) -> Self {
        Self {
            project_ids: without_empty(project_ids),
            dataset_ids: without_empty(dataset_ids),
        }
    }

    pub fn from_page_url(page_url: &str) -> Result<Self, QueryError> {
        let url = Url::parse(page_url)?;
        let mut query = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                PROJECT_IDS_PARAM => query.project_ids.extend(split_ids(&value)),
                DATASET_IDS_PARAM => query.dataset_ids.extend(split_ids(&value)),
                _ => {}
            }
        }
        Ok(query)
    }

    pub fn merge(mut self, other: FilterQuery) -> Self {
        self.project_ids.extend(other.project_ids);
        self.dataset_ids.extend(other.dataset_ids);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.project_ids.is_empty() && self.dataset_ids.is_empty()
    }
}

fn split_ids(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn without_empty(ids: Vec<String>) -> Vec<String> {
    ids.into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}

/// Keeps only projects whose key is allowed, preserving order.
pub fn filter_projects(document: &mut Document, allowed_project_keys: &[String]) {
    if allowed_project_keys.is_empty() {
        return;
    }
    let projects = std::mem::take(&mut document.projects);
    document.projects = projects
        .into_iter()
        .filter(|project| allowed_project_keys.contains(&project.project_key))
        .collect();
}

/// Numbers a project's datasets by their current position.
pub fn assign_dataset_ids(project: &mut Project) {
    for (position, dataset) in project.datasets.iter_mut().enumerate() {
        dataset.id = position;
    }
}

/// Keeps, per project, only datasets whose id is in the allow-list. Ids are
/// assigned first, so they refer to each project's unfiltered order. Legacy
/// projects are never filtered.
pub fn filter_datasets(document: &mut Document, allowed_dataset_ids: &[String]) {
    if allowed_dataset_ids.is_empty() {
        return;
    }
    for project in document
        .projects
        .iter_mut()
        .filter(|project| project.layout == DatasetLayout::Explicit)
    {
        assign_dataset_ids(project);
        let datasets = std::mem::take(&mut project.datasets);
        project.datasets = datasets
            .into_iter()
            .filter(|dataset| allowed_dataset_ids.contains(&dataset.id.to_string()))
            .collect();
    }
}

pub fn apply_filters(document: &mut Document, query: &FilterQuery) {
    if query.is_empty() {
        return;
    }
    filter_projects(document, &query.project_ids);
    filter_datasets(document, &query.dataset_ids);
    tracing::debug!(
        projects = document.projects.len(),
        project_filter = ?query.project_ids,
        dataset_filter = ?query.dataset_ids,
        "applied id filters"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::Dataset;

    fn project_with_datasets(key: &str, names: &[&str]) -> Project {
        let mut project = Project::new(key);
        for (position, name) in names.iter().enumerate() {
            let mut dataset = Dataset::new(name);
            dataset.id = position;
            project.datasets.push(dataset);
        }
        project
    }

    fn document(projects: Vec<Project>) -> Document {
        Document {
            generated_at: None,
            projects,
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn keys(document: &Document) -> Vec<&str> {
        document
            .projects
            .iter()
            .map(|project| project.project_key.as_str())
            .collect()
    }

    #[test]
    fn empty_project_filter_leaves_document_unchanged() {
        let original = document(vec![Project::new("A"), Project::new("B")]);
        let mut filtered = original.clone();

        filter_projects(&mut filtered, &[]);

        assert_eq!(filtered, original);
    }

    #[test]
    fn project_filter_keeps_exactly_the_allowed_keys_in_order() {
        let mut doc = document(vec![
            Project::new("A"),
            Project::new("B"),
            Project::new("C"),
            Project::new("D"),
        ]);

        filter_projects(&mut doc, &ids(&["D", "B", "X"]));

        assert_eq!(keys(&doc), vec!["B", "D"]);
    }

    #[test]
    fn project_filter_may_remove_everything() {
        let mut doc = document(vec![Project::new("A")]);
        filter_projects(&mut doc, &ids(&["Z"]));
        assert!(doc.projects.is_empty());
    }

    #[test]
    fn dataset_filter_uses_original_positions() {
        let mut doc = document(vec![project_with_datasets("A", &["first", "second", "third"])]);

        filter_datasets(&mut doc, &ids(&["0", "2"]));

        let datasets = &doc.projects[0].datasets;
        assert_eq!(datasets.len(), 2);
        assert_eq!(datasets[0].name, "first");
        assert_eq!(datasets[0].id, 0);
        assert_eq!(datasets[1].name, "third");
        assert_eq!(datasets[1].id, 2);
    }

    #[test]
    fn dataset_filter_applies_to_each_project_independently() {
        let mut doc = document(vec![
            project_with_datasets("A", &["a0", "a1"]),
            project_with_datasets("B", &["b0", "b1", "b2"]),
        ]);

        filter_datasets(&mut doc, &ids(&["1"]));

        assert_eq!(doc.projects[0].datasets[0].name, "a1");
        assert_eq!(doc.projects[1].datasets[0].name, "b1");
        assert_eq!(doc.projects[1].datasets.len(), 1);
    }

    #[test]
    fn dataset_filter_skips_legacy_projects() {
        let mut legacy = project_with_datasets("OLD", &["OLD"]);
        legacy.layout = DatasetLayout::Legacy;
        let mut doc = document(vec![legacy.clone()]);

        filter_datasets(&mut doc, &ids(&["5"]));

        assert_eq!(doc.projects[0], legacy);
    }

    #[test]
    fn assigning_ids_twice_is_stable() {
        let mut project = project_with_datasets("A", &["x", "y", "z"]);
        project.datasets.iter_mut().for_each(|dataset| dataset.id = 99);

        assign_dataset_ids(&mut project);
        let once: Vec<usize> = project.datasets.iter().map(|d| d.id).collect();
        assign_dataset_ids(&mut project);
        let twice: Vec<usize> = project.datasets.iter().map(|d| d.id).collect();

        assert_eq!(once, vec![0, 1, 2]);
        assert_eq!(once, twice);
    }

    #[test]
    fn apply_filters_runs_project_filter_before_dataset_filter() {
        let mut doc = document(vec![
            project_with_datasets("A", &["a0", "a1", "a2"]),
            project_with_datasets("B", &["b0"]),
        ]);
        let query = FilterQuery::new(ids(&["A"]), ids(&["0", "2"]));

        apply_filters(&mut doc, &query);

        assert_eq!(keys(&doc), vec!["A"]);
        let names: Vec<&str> = doc.projects[0].datasets.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a0", "a2"]);
    }

    #[test]
    fn from_page_url_decodes_and_splits_ids() {
        let query = FilterQuery::from_page_url(
            "https://example.com/dash/index.html?project_ids=ABC%2CDEF,&dataset_ids=0,2&other=1",
        )
        .unwrap();

        assert_eq!(query.project_ids, ids(&["ABC", "DEF"]));
        assert_eq!(query.dataset_ids, ids(&["0", "2"]));
    }

    #[test]
    fn from_page_url_without_parameters_is_empty() {
        let query = FilterQuery::from_page_url("https://example.com/dash/").unwrap();
        assert!(query.is_empty());
    }

    #[test]
    fn from_page_url_rejects_relative_urls() {
        assert!(FilterQuery::from_page_url("index.html?project_ids=A").is_err());
    }
}
