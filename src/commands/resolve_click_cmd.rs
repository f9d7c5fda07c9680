use crate::commands::base_commands::{ChartKind, Commands, reference_time};
use crate::domain::chart::{BurnupChart, ScopeStats};
use crate::services::chart_render::{layout_burnup, layout_scope_stats};
use crate::services::click_resolver::{PixelPosition, hit_bar, resolve_bar_url, resolve_series_urls};
use crate::services::loader::{DataLoader, DocumentFetcher};

pub async fn resolve_click_command(cmd: Commands) {
    if let Commands::ResolveClick {
        source,
        filters,
        chart,
        dataset,
        kind,
        x,
        y,
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
        if let Err(e) = loader.load(&source).await {
            eprintln!("Failed to load dashboard data: {e}");
            return;
        }

        let (project, data) = match (loader.chart_data(chart), loader.dataset_data(chart, dataset)) {
            (Ok(project), Ok(data)) => (project, data),
            (Err(e), _) | (_, Err(e)) => {
                eprintln!("Failed to select chart: {e}");
                return;
            }
        };

        let click = PixelPosition { x, y };
        let urls: Vec<String> = match kind {
            ChartKind::Scope => {
                let stats = ScopeStats::from_dataset(project, data);
                match layout_scope_stats(&stats) {
                    Ok(bars) => hit_bar(click, &bars)
                        .and_then(|index| resolve_bar_url(index as isize, &stats.urls))
                        .map(str::to_string)
                        .into_iter()
                        .collect(),
                    Err(e) => {
                        eprintln!("Failed to lay out scope chart: {e:?}");
                        return;
                    }
                }
            }
            ChartKind::Burnup => {
                let burnup = BurnupChart::from_dataset(project, data, reference_time);
                match layout_burnup(&burnup) {
                    Ok(points) => resolve_series_urls(click, &points, &data.urls)
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    Err(e) => {
                        eprintln!("Failed to lay out burn-up chart: {e:?}");
                        return;
                    }
                }
            }
        };

        tracing::debug!(x, y, matches = urls.len(), "click resolved");
        for url in urls {
            println!("{url}");
        }
    }
}
