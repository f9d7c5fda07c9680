use crate::commands::base_commands::{Commands, reference_time};
use crate::services::dashboard::write_dashboard;
use crate::services::loader::{DataLoader, DocumentFetcher};

pub async fn render_command(cmd: Commands) {
    if let Commands::Render {
        source,
        output,
        filters,
        now,
    } = cmd
    {
        let query = match filters.to_query() {
            Ok(query) => query,
            Err(e) => {
                eprintln!("Failed to read filters: {e:?}");
                return;
            }
        };
        let reference_time = match reference_time(now.as_deref()) {
            Ok(time) => time,
            Err(e) => {
                eprintln!("Failed to parse reference time: {e:?}");
                return;
            }
        };

        let mut loader = DataLoader::new(DocumentFetcher::new(), query);
        loader.on_load(|document| {
            for project in &document.projects {
                tracing::debug!(project = %project.project_key, title = %project.title, "project loaded");
            }
        });
        loader.on_failure(|e| eprintln!("Failed to load dashboard data: {e}"));

        if loader.load(&source).await.is_err() {
            return;
        }
        let datasets: usize = (0..loader.chart_count())
            .filter_map(|index| loader.dataset_count(index).ok())
            .sum();
        let Some(document) = loader.document() else {
            return;
        };

        match write_dashboard(document, &output, reference_time).await {
            Ok(summary) => println!(
                "Dashboard with {} projects, {} datasets and {} charts written to {}",
                summary.projects,
                datasets,
                summary.charts,
                summary.index_path.display()
            ),
            Err(e) => eprintln!("Failed to write dashboard: {e:?}"),
        }
    }
}
