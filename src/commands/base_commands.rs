use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::services::document_json::{DocumentJsonError, parse_timestamp};
use crate::services::id_filter::{FilterQuery, QueryError};
use crate::services::loader::DEFAULT_DATA_LOCATION;

#[derive(Parser)]
#[command(author, version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,
}

/// Which of the two charts of a dataset to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChartKind {
    /// Bar chart of total scope, burned scope and velocity
    Scope,
    /// Burn-up time series with milestones
    Burnup,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Comma-separated project keys to show (default: all)
    #[arg(short, long, value_delimiter = ',')]
    pub project_ids: Vec<String>,
    /// Comma-separated dataset ids to show per project (default: all)
    #[arg(short, long, value_delimiter = ',')]
    pub dataset_ids: Vec<String>,
    /// Dashboard page URL whose `project_ids`/`dataset_ids` query parameters are applied
    #[arg(long)]
    pub page_url: Option<String>,
}

impl FilterArgs {
    pub fn to_query(&self) -> Result<FilterQuery, QueryError> {
        let query = FilterQuery::new(self.project_ids.clone(), self.dataset_ids.clone());
        match &self.page_url {
            Some(page_url) => Ok(query.merge(FilterQuery::from_page_url(page_url)?)),
            None => Ok(query),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render burn-up dashboards from a JSON data feed into a directory
    Render {
        /// Data feed: local path or http(s) URL
        #[arg(short, long, default_value = DEFAULT_DATA_LOCATION)]
        source: String,
        /// Output directory for index.html and chart images
        #[arg(short, long)]
        output: String,
        #[command(flatten)]
        filters: FilterArgs,
        /// Reference time for trimming future data (RFC 3339 or YYYY-MM-DD, default now)
        #[arg(long)]
        now: Option<String>,
    },
    /// Print the URL(s) behind a click on a rendered chart
    ResolveClick {
        /// Data feed: local path or http(s) URL
        #[arg(short, long, default_value = DEFAULT_DATA_LOCATION)]
        source: String,
        #[command(flatten)]
        filters: FilterArgs,
        /// Position of the project among the displayed projects
        #[arg(long, default_value_t = 0)]
        chart: usize,
        /// Position of the dataset among the project's displayed datasets
        #[arg(long, default_value_t = 0)]
        dataset: usize,
        /// Chart that was clicked
        #[arg(long, value_enum)]
        kind: ChartKind,
        /// Click x coordinate in image pixels
        #[arg(short, long)]
        x: i32,
        /// Click y coordinate in image pixels
        #[arg(short, long)]
        y: i32,
        /// Reference time for trimming future data (RFC 3339 or YYYY-MM-DD, default now)
        #[arg(long)]
        now: Option<String>,
    },
    /// Collect project scope statistics from Jira into a JSON data feed
    GetStats {
        /// Path to Jira stats config YAML
        #[arg(short, long)]
        config: String,
        /// Output JSON file; an existing file is extended
        #[arg(short, long)]
        output: String,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn reference_time(now: Option<&str>) -> Result<DateTime<Utc>, DocumentJsonError> {
    match now {
        Some(value) => parse_timestamp(value),
        None => Ok(Utc::now()),
    }
}
