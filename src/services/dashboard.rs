use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::chart::{BurnupChart, ScopeStats};
use crate::domain::document::{DatasetUrls, Document};
use crate::services::chart_render::{
    BURNUP_CHART_SIZE, RenderError, SCOPE_CHART_SIZE, render_burnup_png, render_scope_stats_png,
};
use crate::services::click_resolver::{
    HIT_RADIUS, RenderedBar, RenderedPoint, point_url, resolve_bar_url,
};

pub const INDEX_FILE: &str = "index.html";

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("failed to write dashboard: {0}")]
    Write(#[from] std::io::Error),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("chart rendering task failed: {0}")]
    Task(String),
}

/// A clickable region of a chart image.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkArea {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub file_name: String,
    pub size: (u32, u32),
    pub links: Vec<LinkArea>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetBlock {
    pub name: String,
    pub scope: RenderedChart,
    pub burnup: RenderedChart,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectBlock {
    pub title: String,
    pub datasets: Vec<DatasetBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub index_path: PathBuf,
    pub projects: usize,
    pub charts: usize,
}

/// Renders every project of an already filtered document into `output_dir`.
pub async fn write_dashboard(
    document: &Document,
    output_dir: &str,
    reference_time: DateTime<Utc>,
) -> Result<DashboardSummary, DashboardError> {
    tokio::fs::create_dir_all(output_dir).await?;

    let document = document.clone();
    let directory = PathBuf::from(output_dir);
    let (blocks, generated_at) = tokio::task::spawn_blocking(move || {
        render_project_blocks(&document, &directory, reference_time)
            .map(|blocks| (blocks, document.generated_at))
    })
    .await
    .map_err(|e| DashboardError::Task(e.to_string()))??;

    let html = generate_dashboard_html(&blocks, generated_at.as_deref());
    let index_path = Path::new(output_dir).join(INDEX_FILE);
    tokio::fs::write(&index_path, html).await?;

    let charts = blocks.iter().map(|block| block.datasets.len() * 2).sum();
    tracing::info!(path = %index_path.display(), charts, "dashboard written");
    Ok(DashboardSummary {
        index_path,
        projects: blocks.len(),
        charts,
    })
}

fn render_project_blocks(
    document: &Document,
    directory: &Path,
    reference_time: DateTime<Utc>,
) -> Result<Vec<ProjectBlock>, DashboardError> {
    let mut blocks = Vec::with_capacity(document.projects.len());
    for (position, project) in document.projects.iter().enumerate() {
        let mut datasets = Vec::with_capacity(project.datasets.len());
        for dataset in &project.datasets {
            let stem = chart_stem(position, &project.project_key, dataset.id);

            let stats = ScopeStats::from_dataset(project, dataset);
            let scope_file = format!("{stem}-scope.png");
            let bars = render_scope_stats_png(&path_string(directory, &scope_file), &stats)?;

            let burnup = BurnupChart::from_dataset(project, dataset, reference_time);
            let burnup_file = format!("{stem}-burnup.png");
            let points = render_burnup_png(&path_string(directory, &burnup_file), &burnup)?;
            tracing::debug!(project = %project.project_key, dataset = dataset.id, "charts rendered");

            datasets.push(DatasetBlock {
                name: dataset.name.clone(),
                scope: RenderedChart {
                    file_name: scope_file,
                    size: SCOPE_CHART_SIZE,
                    links: bar_links(&bars, &stats.urls),
                },
                burnup: RenderedChart {
                    file_name: burnup_file,
                    size: BURNUP_CHART_SIZE,
                    links: point_links(&points, &dataset.urls),
                },
            });
        }
        blocks.push(ProjectBlock {
            title: project.title.clone(),
            datasets,
        });
    }
    Ok(blocks)
}

fn path_string(directory: &Path, file_name: &str) -> String {
    directory.join(file_name).to_string_lossy().into_owned()
}

/// File name prefix for a dataset's charts. The project's position keeps keys
/// that sanitise to the same text apart.
fn chart_stem(position: usize, project_key: &str, dataset_id: usize) -> String {
    let key: String = project_key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{position}-{key}-{dataset_id}")
}

pub fn bar_links(bars: &[RenderedBar], urls: &[String; 3]) -> Vec<LinkArea> {
    bars.iter()
        .filter_map(|bar| {
            let url = resolve_bar_url(bar.index as isize, urls)?;
            Some(LinkArea {
                left: bar.top_left.x,
                top: bar.top_left.y,
                right: bar.bottom_right.x,
                bottom: bar.bottom_right.y,
                url: url.to_string(),
            })
        })
        .collect()
}

pub fn point_links(points: &[RenderedPoint], urls: &DatasetUrls) -> Vec<LinkArea> {
    points
        .iter()
        .filter_map(|point| {
            let url = point_url(point, urls)?;
            Some(LinkArea {
                left: point.position.x - HIT_RADIUS,
                top: point.position.y - HIT_RADIUS,
                right: point.position.x + HIT_RADIUS,
                bottom: point.position.y + HIT_RADIUS,
                url: url.to_string(),
            })
        })
        .collect()
}

pub fn generate_dashboard_html(blocks: &[ProjectBlock], generated_at: Option<&str>) -> String {
    let mut lines = Vec::new();
    lines.push("<!DOCTYPE html>".to_string());
    lines.push("<html>".to_string());
    lines.push("<head><meta charset=\"utf-8\"><title>Burn-up Dashboard</title></head>".to_string());
    lines.push("<body>".to_string());
    lines.push("<div id=\"dashboard\">".to_string());

    for block in blocks {
        lines.push("<hr/>".to_string());
        lines.push(format!("<h1>{}</h1>", escape_html(&block.title)));
        for dataset in &block.datasets {
            lines.push(format!("<div class=\"row\" title=\"{}\">", escape_html(&dataset.name)));
            lines.extend(chart_markup(&dataset.scope));
            lines.extend(chart_markup(&dataset.burnup));
            lines.push("</div>".to_string());
        }
    }

    lines.push("</div>".to_string());
    lines.push(format!(
        "<footer>Generated at: {}</footer>",
        escape_html(generated_at.unwrap_or("unknown"))
    ));
    lines.push("</body>".to_string());
    lines.push("</html>".to_string());
    lines.join("\n")
}

fn chart_markup(chart: &RenderedChart) -> Vec<String> {
    let map_name = chart.file_name.trim_end_matches(".png");
    let (width, height) = chart.size;
    let mut lines = vec![format!(
        "<img src=\"{file}\" width=\"{width}\" height=\"{height}\" usemap=\"#{map_name}\"/>",
        file = escape_html(&chart.file_name),
    )];
    lines.push(format!("<map name=\"{map_name}\">"));
    for link in &chart.links {
        lines.push(format!(
            "  <area shape=\"rect\" coords=\"{},{},{},{}\" href=\"{}\" target=\"_blank\"/>",
            link.left,
            link.top,
            link.right,
            link.bottom,
            escape_html(&link.url)
        ));
    }
    lines.push("</map>".to_string());
    lines
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
