use std::env;

use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::services::document_json::{DocumentRecord, ProjectRecord, ToDateRecord};

pub const DEFAULT_STORY_POINTS_FIELD: &str = "customfield_10008";
const TIME_ESTIMATE_FIELD: &str = "aggregatetimeoriginalestimate";
const MAX_RESULTS: u32 = 999;

#[derive(Error, Debug)]
pub enum JiraStatsError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Config(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateType {
    #[default]
    StoryPoints,
    TimeEstimate,
}

impl EstimateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimateType::StoryPoints => "story_points",
            EstimateType::TimeEstimate => "time_estimate",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JiraStatsConfig {
    pub base_url: String,
    pub projects: Vec<String>,
    pub story_points_field: String,
    pub estimate_type: EstimateType,
}

impl Default for JiraStatsConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            projects: Vec::new(),
            story_points_field: DEFAULT_STORY_POINTS_FIELD.to_string(),
            estimate_type: EstimateType::default(),
        }
    }
}

impl JiraStatsConfig {
    pub fn from_yaml_file(filepath: &str) -> Result<Self, JiraStatsError> {
        let contents = std::fs::read_to_string(filepath)
            .map_err(|err| JiraStatsError::Config(format!("failed to read config: {err}")))?;
        let config: JiraStatsConfig = serde_yaml::from_str(&contents)
            .map_err(|err| JiraStatsError::Parse(format!("invalid config: {err}")))?;
        if config.base_url.is_empty() || config.projects.is_empty() {
            return Err(JiraStatsError::Config(
                "config is missing base_url or projects".to_string(),
            ));
        }
        Ok(config)
    }
}

#[derive(Debug, Clone)]
pub struct AuthData {
    pub username: String,
    pub api_token: String,
}

impl AuthData {
    pub fn from_env() -> Result<Self, JiraStatsError> {
        let username = env::var("JIRA_USERNAME").ok();
        let api_token = env::var("JIRA_API_TOKEN").ok();
        match (username, api_token) {
            (Some(username), Some(api_token)) => Ok(Self {
                username,
                api_token,
            }),
            _ => Err(JiraStatsError::Unauthorized),
        }
    }
}

/// Scope statistics of one project at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSnapshot {
    pub project_key: String,
    pub title: String,
    pub total_estimate: f64,
    pub burned_estimate: f64,
    pub average_velocity: Option<u64>,
    pub velocity_url: Option<String>,
    pub total_scope_url: String,
    pub burned_scope_url: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Board {
    id: u64,
}

pub struct JiraStatsClient {
    config: JiraStatsConfig,
    auth: AuthData,
    client: Client,
}

impl JiraStatsClient {
    pub fn new(config: JiraStatsConfig, auth: AuthData) -> Self {
        Self {
            config,
            auth,
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> Result<Value, JiraStatsError> {
        tracing::debug!(url, "jira GET");
        let request = self
            .client
            .get(url)
            .query(params)
            .basic_auth(&self.auth.username, Some(&self.auth.api_token));
        self.send(request, url).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, JiraStatsError> {
        tracing::debug!(url, "jira POST");
        let request = self
            .client
            .post(url)
            .json(body)
            .basic_auth(&self.auth.username, Some(&self.auth.api_token));
        self.send(request, url).await
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<Value, JiraStatsError> {
        let response = request
            .send()
            .await
            .map_err(|e| JiraStatsError::Connection(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(JiraStatsError::Unauthorized);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(JiraStatsError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(JiraStatsError::Connection(format!("{status} from {url}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| JiraStatsError::Parse(e.to_string()))
    }

    async fn search(&self, jql: &str) -> Result<Value, JiraStatsError> {
        let body = json!({
            "jql": jql,
            "maxResults": MAX_RESULTS,
            "fields": [self.config.story_points_field, TIME_ESTIMATE_FIELD],
        });
        self.post_json(&self.url("/rest/api/2/search"), &body).await
    }

    /// Sum of the configured estimate over every issue matching `jql`.
    pub async fn get_estimate(&self, jql: &str) -> Result<f64, JiraStatsError> {
        let payload = self.search(jql).await?;
        let field = match self.config.estimate_type {
            EstimateType::StoryPoints => self.config.story_points_field.as_str(),
            EstimateType::TimeEstimate => TIME_ESTIMATE_FIELD,
        };
        Ok(sum_issue_field(&payload, field))
    }

    pub async fn get_project_name(&self, project_key: &str) -> Result<Option<String>, JiraStatsError> {
        let url = self.url(&format!("/rest/api/2/project/{project_key}"));
        match self.get_json(&url, &[]).await {
            Ok(payload) => Ok(payload
                .get("name")
                .and_then(|value| value.as_str())
                .map(str::to_string)),
            Err(JiraStatsError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_board(&self, project_name: &str) -> Result<Option<Board>, JiraStatsError> {
        let payload = self
            .get_json(&self.url("/rest/greenhopper/1.0/rapidviews/list"), &[])
            .await?;
        Ok(find_board_id(&payload, project_name).map(|id| Board { id }))
    }

    /// Average completed estimate over the board's closed sprints, floored.
    /// Sprint reports that fail to load are skipped.
    async fn get_average_velocity(&self, board: &Board) -> Result<u64, JiraStatsError> {
        let sprints_url = self.url(&format!("/rest/greenhopper/1.0/sprintquery/{}", board.id));
        let params = [
            ("includeHistoricSprints", "true".to_string()),
            ("includeFutureSprints", "true".to_string()),
        ];
        let payload = self.get_json(&sprints_url, &params).await?;

        let report_url = self.url("/rest/greenhopper/1.0/rapid/charts/sprintreport");
        let mut completed = Vec::new();
        for sprint_id in closed_sprint_ids(&payload) {
            let params = [
                ("rapidViewId", board.id.to_string()),
                ("sprintId", sprint_id.to_string()),
            ];
            match self.get_json(&report_url, &params).await {
                Ok(report) => completed.extend(sprint_completed_estimate(&report)),
                Err(e) => tracing::warn!(sprint_id, error = %e, "skipping sprint report"),
            }
        }
        Ok(average_velocity(&completed))
    }

    pub async fn get_project_snapshot(&self, project_key: &str) -> Result<ProjectSnapshot, JiraStatsError> {
        let total_jql = format!("project={project_key}");
        let burned_jql = format!("project={project_key} AND resolution != Unresolved");
        let total_estimate = self.get_estimate(&total_jql).await?;
        let burned_estimate = self.get_estimate(&burned_jql).await?;

        let project_name = self.get_project_name(project_key).await?;
        let board = match &project_name {
            Some(name) => match self.find_board(name).await {
                Ok(board) => board,
                Err(e) => {
                    tracing::warn!(project_key, error = %e, "board lookup failed, no velocity");
                    None
                }
            },
            None => None,
        };
        let average_velocity = match &board {
            Some(board) => match self.get_average_velocity(board).await {
                Ok(velocity) => Some(velocity),
                Err(e) => {
                    tracing::warn!(project_key, error = %e, "sprint query failed, no velocity");
                    None
                }
            },
            None => None,
        };
        tracing::info!(project_key, total_estimate, burned_estimate, ?average_velocity, "project stats collected");

        Ok(ProjectSnapshot {
            project_key: project_key.to_string(),
            title: project_name.unwrap_or_else(|| project_key.to_string()),
            total_estimate,
            burned_estimate,
            average_velocity,
            velocity_url: board.map(|board| {
                self.url(&format!(
                    "/secure/RapidBoard.jspa?rapidView={}&view=reporting&chart=velocityChart",
                    board.id
                ))
            }),
            total_scope_url: self.issue_search_url(&total_jql),
            burned_scope_url: self.issue_search_url(&burned_jql),
        })
    }

    fn issue_search_url(&self, jql: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(jql.as_bytes()).collect();
        self.url(&format!("/issues/?jql={encoded}"))
    }
}

fn sum_issue_field(payload: &Value, field: &str) -> f64 {
    payload
        .get("issues")
        .and_then(|value| value.as_array())
        .map(|issues| {
            issues
                .iter()
                .filter_map(|issue| issue.get("fields")?.get(field)?.as_f64())
                .map(f64::trunc)
                .sum()
        })
        .unwrap_or(0.0)
}

fn find_board_id(payload: &Value, project_name: &str) -> Option<u64> {
    let wanted = project_name.trim().to_lowercase();
    payload
        .get("views")?
        .as_array()?
        .iter()
        .find(|view| {
            view.get("name")
                .and_then(|name| name.as_str())
                .map(|name| name.trim().to_lowercase() == wanted)
                .unwrap_or(false)
        })?
        .get("id")?
        .as_u64()
}

fn closed_sprint_ids(payload: &Value) -> Vec<u64> {
    payload
        .get("sprints")
        .and_then(|value| value.as_array())
        .map(|sprints| {
            sprints
                .iter()
                .filter(|sprint| {
                    sprint
                        .get("state")
                        .and_then(|state| state.as_str())
                        .map(|state| state.trim().eq_ignore_ascii_case("closed"))
                        .unwrap_or(false)
                })
                .filter_map(|sprint| sprint.get("id")?.as_u64())
                .collect()
        })
        .unwrap_or_default()
}

/// Completed estimate of a sprint; sprints with nothing estimated don't count.
fn sprint_completed_estimate(report: &Value) -> Option<u64> {
    let contents = report.get("contents")?;
    let all_issues = contents.get("allIssuesEstimateSum")?.get("value")?.as_f64()?;
    if all_issues.trunc() <= 0.0 {
        return None;
    }
    let completed = contents
        .get("completedIssuesEstimateSum")?
        .get("value")?
        .as_f64()?;
    Some(completed.trunc().max(0.0) as u64)
}

fn average_velocity(completed: &[u64]) -> u64 {
    completed.iter().sum::<u64>() / completed.len().max(1) as u64
}

/// Folds snapshots into a document, appending one burn-up observation per
/// project for `day`. An observation for the same day is replaced.
pub fn merge_snapshots(
    existing: Option<DocumentRecord>,
    snapshots: &[ProjectSnapshot],
    estimate_type: EstimateType,
    day: NaiveDate,
    generated_at: String,
) -> DocumentRecord {
    let mut document = existing.unwrap_or_default();
    document.generated_at = Some(generated_at);
    let day = day.format("%Y-%m-%d").to_string();

    for snapshot in snapshots {
        let position = document
            .projects
            .iter()
            .position(|project| project.project_key == snapshot.project_key);
        let project = match position {
            Some(index) => &mut document.projects[index],
            None => {
                document.projects.push(ProjectRecord {
                    project_key: snapshot.project_key.clone(),
                    ..ProjectRecord::default()
                });
                let last = document.projects.len() - 1;
                &mut document.projects[last]
            }
        };

        project.title = Some(snapshot.title.clone());
        project.average_velocity = snapshot.average_velocity.map(|velocity| velocity as f64);
        project.velocity_url = snapshot.velocity_url.clone();
        project.estimate_type = Some(estimate_type.as_str().to_string());

        if project.datasets.is_some() {
            tracing::warn!(
                project = %snapshot.project_key,
                "project lists explicit datasets, not appending an observation"
            );
            continue;
        }
        project.total_scope_estimate = Some(snapshot.total_estimate);
        project.burned_scope_estimate = Some(snapshot.burned_estimate);
        project.total_scope_url = Some(snapshot.total_scope_url.clone());
        project.burned_scope_url = Some(snapshot.burned_scope_url.clone());
        append_observation(project.to_date.get_or_insert_with(ToDateRecord::default), &day, snapshot);
    }

    document
}

fn append_observation(to_date: &mut ToDateRecord, day: &str, snapshot: &ProjectSnapshot) {
    if to_date.dates.last().map(String::as_str) == Some(day) {
        to_date.dates.pop();
        to_date.total_estimates.pop();
        to_date.burned_estimates.pop();
        if to_date.urls.total.len() > to_date.dates.len() {
            to_date.urls.total.pop();
        }
        if to_date.urls.burned.len() > to_date.dates.len() {
            to_date.urls.burned.pop();
        }
    }
    to_date.dates.push(day.to_string());
    to_date.total_estimates.push(snapshot.total_estimate);
    to_date.burned_estimates.push(snapshot.burned_estimate);
    to_date.urls.total.push(snapshot.total_scope_url.clone());
    to_date.urls.burned.push(snapshot.burned_scope_url.clone());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(key: &str, total: f64, burned: f64) -> ProjectSnapshot {
        ProjectSnapshot {
            project_key: key.to_string(),
            title: format!("{key} project"),
            total_estimate: total,
            burned_estimate: burned,
            average_velocity: Some(7),
            velocity_url: None,
            total_scope_url: "total".to_string(),
            burned_scope_url: "burned".to_string(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
    }

    #[test]
    fn sum_issue_field_truncates_and_skips_missing_values() {
        let payload = json!({
            "issues": [
                {"fields": {"customfield_10008": 3.7}},
                {"fields": {"customfield_10008": null}},
                {"fields": {}},
                {"fields": {"customfield_10008": 2}}
            ]
        });
        assert_eq!(sum_issue_field(&payload, "customfield_10008"), 5.0);
        assert_eq!(sum_issue_field(&json!({}), "customfield_10008"), 0.0);
    }

    #[test]
    fn find_board_id_matches_name_ignoring_case_and_whitespace() {
        let payload = json!({"views": [{"id": 1, "name": "Other"}, {"id": 42, "name": " My Project "}]});
        assert_eq!(find_board_id(&payload, "my project"), Some(42));
        assert_eq!(find_board_id(&payload, "missing"), None);
    }

    #[test]
    fn closed_sprint_ids_ignores_active_and_future_sprints() {
        let payload = json!({"sprints": [
            {"id": 1, "state": "CLOSED"},
            {"id": 2, "state": "ACTIVE"},
            {"id": 3, "state": "closed "},
            {"id": 4, "state": "FUTURE"}
        ]});
        assert_eq!(closed_sprint_ids(&payload), vec![1, 3]);
    }

    #[test]
    fn sprint_without_estimated_issues_does_not_count() {
        let empty = json!({"contents": {
            "allIssuesEstimateSum": {"value": 0},
            "completedIssuesEstimateSum": {"value": 0}
        }});
        let done = json!({"contents": {
            "allIssuesEstimateSum": {"value": 20.0},
            "completedIssuesEstimateSum": {"value": 13.5}
        }});
        assert_eq!(sprint_completed_estimate(&empty), None);
        assert_eq!(sprint_completed_estimate(&done), Some(13));
    }

    #[test]
    fn average_velocity_floors_and_handles_no_sprints() {
        assert_eq!(average_velocity(&[10, 11]), 10);
        assert_eq!(average_velocity(&[]), 0);
    }

    #[test]
    fn merge_appends_one_observation_per_run() {
        let first = merge_snapshots(None, &[snapshot("A", 10.0, 2.0)], EstimateType::StoryPoints, day(1), "t1".to_string());
        let second = merge_snapshots(Some(first), &[snapshot("A", 12.0, 5.0)], EstimateType::StoryPoints, day(2), "t2".to_string());

        assert_eq!(second.generated_at.as_deref(), Some("t2"));
        assert_eq!(second.projects.len(), 1);
        let project = &second.projects[0];
        assert_eq!(project.title.as_deref(), Some("A project"));
        assert_eq!(project.average_velocity, Some(7.0));
        assert_eq!(project.estimate_type.as_deref(), Some("story_points"));
        assert_eq!(project.total_scope_estimate, Some(12.0));
        let to_date = project.to_date.as_ref().unwrap();
        assert_eq!(to_date.dates, vec!["2020-01-01", "2020-01-02"]);
        assert_eq!(to_date.total_estimates, vec![10.0, 12.0]);
        assert_eq!(to_date.burned_estimates, vec![2.0, 5.0]);
        assert_eq!(to_date.urls.total.len(), 2);
    }

    #[test]
    fn merge_replaces_observation_of_the_same_day() {
        let first = merge_snapshots(None, &[snapshot("A", 10.0, 2.0)], EstimateType::TimeEstimate, day(1), "t1".to_string());
        let again = merge_snapshots(Some(first), &[snapshot("A", 11.0, 3.0)], EstimateType::TimeEstimate, day(1), "t2".to_string());

        let to_date = again.projects[0].to_date.as_ref().unwrap();
        assert_eq!(to_date.dates, vec!["2020-01-01"]);
        assert_eq!(to_date.total_estimates, vec![11.0]);
        assert_eq!(to_date.urls.burned, vec!["burned"]);
    }

    #[test]
    fn merge_leaves_explicit_datasets_alone() {
        let existing = DocumentRecord {
            generated_at: None,
            projects: vec![ProjectRecord {
                project_key: "A".to_string(),
                datasets: Some(vec![]),
                ..ProjectRecord::default()
            }],
        };

        let merged = merge_snapshots(Some(existing), &[snapshot("A", 1.0, 1.0), snapshot("B", 2.0, 0.0)], EstimateType::StoryPoints, day(3), "t".to_string());

        assert_eq!(merged.projects.len(), 2);
        assert!(merged.projects[0].to_date.is_none());
        assert_eq!(merged.projects[1].project_key, "B");
        assert!(merged.projects[1].to_date.is_some());
    }
}
