use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::domain::document::{Dataset, Document, Project};
use crate::services::document_json::{DocumentJsonError, deserialize_document_from_json_str};
use crate::services::id_filter::{FilterQuery, apply_filters};

pub const DEFAULT_DATA_LOCATION: &str = "./data.json";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to fetch {location}: {message}")]
    Fetch { location: String, message: String },
    #[error("unexpected status {status} from {location}")]
    Status { location: String, status: StatusCode },
    #[error("failed to read {location}: {source}")]
    Read {
        location: String,
        source: std::io::Error,
    },
    #[error("malformed document: {0}")]
    Malformed(#[from] DocumentJsonError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LoaderError {
    #[error("no chart data for index {index} (count {count})")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("no dataset {index} in chart {chart} (count {count})")]
    DatasetIndexOutOfRange {
        chart: usize,
        index: usize,
        count: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

/// Reads the raw document text from an http(s) URL or a local path.
pub struct DocumentFetcher {
    client: Client,
}

impl DocumentFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub async fn fetch(&self, location: &str) -> Result<String, LoadError> {
        if location.starts_with("http://") || location.starts_with("https://") {
            self.fetch_http(location).await
        } else {
            tokio::fs::read_to_string(location)
                .await
                .map_err(|source| LoadError::Read {
                    location: location.to_string(),
                    source,
                })
        }
    }

    async fn fetch_http(&self, location: &str) -> Result<String, LoadError> {
        let fetch_error = |error: reqwest::Error| LoadError::Fetch {
            location: location.to_string(),
            message: error.to_string(),
        };
        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                location: location.to_string(),
                status,
            });
        }
        response.text().await.map_err(fetch_error)
    }
}

impl Default for DocumentFetcher {
    fn default() -> Self {
        Self::new()
    }
}

type LoadListener = Box<dyn FnMut(&Document)>;
type FailureListener = Box<dyn FnMut(&LoadError)>;

/// Owns the dashboard document: fetches it, filters it and tells listeners.
pub struct DataLoader {
    fetcher: DocumentFetcher,
    query: FilterQuery,
    state: LoadState,
    document: Option<Document>,
    load_listeners: Vec<LoadListener>,
    failure_listeners: Vec<FailureListener>,
}

impl DataLoader {
    pub fn new(fetcher: DocumentFetcher, query: FilterQuery) -> Self {
        Self {
            fetcher,
            query,
            state: LoadState::Unloaded,
            document: None,
            load_listeners: Vec::new(),
            failure_listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Registers a listener for future successful loads.
    pub fn on_load(&mut self, listener: impl FnMut(&Document) + 'static) {
        self.load_listeners.push(Box::new(listener));
    }

    /// Registers a listener for future failed loads.
    pub fn on_failure(&mut self, listener: impl FnMut(&LoadError) + 'static) {
        self.failure_listeners.push(Box::new(listener));
    }

    /// Fetches and filters the document, replacing any previous one.
    ///
    /// On failure the loader ends in [`LoadState::Failed`] without a document.
    pub async fn load(&mut self, location: &str) -> Result<(), LoadError> {
        self.state = LoadState::Loading;
        self.document = None;
        tracing::info!(location, "loading dashboard data");

        match self.fetch_document(location).await {
            Ok(document) => {
                tracing::info!(projects = document.projects.len(), "dashboard data loaded");
                self.state = LoadState::Loaded;
                let document: &Document = self.document.insert(document);
                for listener in self.load_listeners.iter_mut() {
                    listener(document);
                }
                Ok(())
            }
            Err(error) => {
                tracing::warn!(location, %error, "failed to load dashboard data");
                self.state = LoadState::Failed;
                for listener in self.failure_listeners.iter_mut() {
                    listener(&error);
                }
                Err(error)
            }
        }
    }

    async fn fetch_document(&self, location: &str) -> Result<Document, LoadError> {
        let text = self.fetcher.fetch(location).await?;
        let mut document = deserialize_document_from_json_str(&text)?;
        apply_filters(&mut document, &self.query);
        Ok(document)
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn chart_count(&self) -> usize {
        self.document
            .as_ref()
            .map(|document| document.projects.len())
            .unwrap_or(0)
    }

    pub fn chart_data(&self, index: usize) -> Result<&Project, LoaderError> {
        let count = self.chart_count();
        self.document
            .as_ref()
            .and_then(|document| document.projects.get(index))
            .ok_or(LoaderError::IndexOutOfRange { index, count })
    }

    /// Dataset count of the project at `index`; zero before anything loaded.
    pub fn dataset_count(&self, index: usize) -> Result<usize, LoaderError> {
        if self.document.is_none() {
            return Ok(0);
        }
        Ok(self.chart_data(index)?.dataset_count())
    }

    pub fn dataset_data(&self, chart: usize, index: usize) -> Result<&Dataset, LoaderError> {
        let project = self.chart_data(chart)?;
        project
            .datasets
            .get(index)
            .ok_or(LoaderError::DatasetIndexOutOfRange {
                chart,
                index,
                count: project.datasets.len(),
            })
    }
}
