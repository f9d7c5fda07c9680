use chrono::Utc;

use crate::commands::base_commands::Commands;
use crate::services::document_json::{DocumentRecord, serialize_document_record_to_json};
use crate::services::jira_stats::{AuthData, JiraStatsClient, JiraStatsConfig, merge_snapshots};

pub async fn get_stats_command(cmd: Commands) {
    if let Commands::GetStats { config, output } = cmd {
        let stats_config = match JiraStatsConfig::from_yaml_file(&config) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Failed to parse Jira config: {e:?}");
                return;
            }
        };

        let auth = match AuthData::from_env() {
            Ok(auth) => auth,
            Err(e) => {
                eprintln!("Failed to load Jira auth: {e:?}");
                return;
            }
        };

        let existing = match read_existing_document(&output).await {
            Ok(existing) => existing,
            Err(e) => {
                eprintln!("Failed to read existing data feed: {e}");
                return;
            }
        };

        let estimate_type = stats_config.estimate_type;
        let projects = stats_config.projects.clone();
        let client = JiraStatsClient::new(stats_config, auth);
        let mut snapshots = Vec::with_capacity(projects.len());
        for project_key in &projects {
            match client.get_project_snapshot(project_key).await {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    eprintln!("Failed to get stats for {project_key}: {e:?}");
                    return;
                }
            }
        }

        let now = Utc::now();
        let document = merge_snapshots(
            existing,
            &snapshots,
            estimate_type,
            now.date_naive(),
            now.format("%Y-%m-%d %H:%M").to_string(),
        );
        let json = match serialize_document_record_to_json(&document) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Failed to serialize data feed: {e:?}");
                return;
            }
        };

        if let Err(e) = tokio::fs::write(&output, json).await {
            eprintln!("Failed to write output file: {e:?}");
        } else {
            println!("Stats for {} projects written to {output}", snapshots.len());
        }
    }
}

async fn read_existing_document(path: &str) -> Result<Option<DocumentRecord>, String> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| format!("{path} is not a data feed: {e}")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.to_string()),
    }
}
