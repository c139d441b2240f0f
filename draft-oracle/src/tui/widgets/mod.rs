// TUI widget modules for each dashboard panel.

pub mod draft_log;
pub mod drafts;
pub mod quit_confirm;
pub mod status_bar;
