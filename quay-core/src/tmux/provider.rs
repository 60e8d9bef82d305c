use anyhow::Result;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuxWindow {
    pub index: u32,
    pub name: String,
    pub active: bool,
}

pub trait TmuxProvider: Send + Sync {
    fn session_exists(&self, name: &str) -> bool;
    fn list_windows(&self, session: &str) -> Vec<TmuxWindow>;
    /// Name of the window currently focused in `session`, or empty when unknown.
    fn current_window(&self, session: &str) -> String;
    fn pane_command(&self, session: &str) -> Option<String>;
    fn capture_pane(&self, session: &str, lines: usize) -> Option<String>;
    fn create_session(&self, name: &str, dir: &Path) -> Result<()>;
    fn kill_session(&self, name: &str) -> Result<()>;
    fn rename_session(&self, old: &str, new: &str) -> Result<()>;
    fn switch_to_session(&self, name: &str);
    fn is_inside_tmux(&self) -> bool;
}
