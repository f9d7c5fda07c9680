pub mod base_commands;
pub mod completions_cmd;
pub mod get_stats_cmd;
pub mod render_cmd;
pub mod resolve_click_cmd;
