pub mod chart_render;
pub mod click_resolver;
pub mod dashboard;
pub mod document_json;
pub mod id_filter;
pub mod jira_stats;
pub mod loader;
pub mod series;
