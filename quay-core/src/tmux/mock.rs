use super::provider::{TmuxProvider, TmuxWindow};
use anyhow::Result;
use std::{collections::HashMap, path::Path, sync::Mutex};

#[derive(Default)]
pub struct MockTmuxProvider {
    pub sessions: Vec<String>,
    pub windows: HashMap<String, Vec<TmuxWindow>>,
    pub pane_commands: HashMap<String, String>,
    pub pane_contents: HashMap<String, String>,
    pub inside_tmux: bool,
    pub killed_sessions: Mutex<Vec<String>>,
    pub renamed_sessions: Mutex<Vec<(String, String)>>,
    pub created_sessions: Mutex<Vec<String>>,
    /// Targets passed to `switch_to_session`
    pub switched: Mutex<Vec<String>>,
}

impl TmuxProvider for MockTmuxProvider {
    fn session_exists(&self, name: &str) -> bool {
        self.sessions.iter().any(|s| s == name)
    }

    fn list_windows(&self, session: &str) -> Vec<TmuxWindow> {
        self.windows.get(session).cloned().unwrap_or_default()
    }

    fn current_window(&self, session: &str) -> String {
        self.list_windows(session)
            .into_iter()
            .find(|w| w.active)
            .map(|w| w.name)
            .unwrap_or_default()
    }

    fn pane_command(&self, session: &str) -> Option<String> {
        self.pane_commands.get(session).cloned()
    }

    fn capture_pane(&self, session: &str, _lines: usize) -> Option<String> {
        self.pane_contents.get(session).cloned()
    }

    fn create_session(&self, name: &str, _dir: &Path) -> Result<()> {
        if let Ok(mut created) = self.created_sessions.lock() {
            created.push(name.to_string());
        }
        Ok(())
    }

    fn kill_session(&self, name: &str) -> Result<()> {
        if let Ok(mut killed) = self.killed_sessions.lock() {
            killed.push(name.to_string());
        }
        Ok(())
    }

    fn rename_session(&self, old: &str, new: &str) -> Result<()> {
        if let Ok(mut renamed) = self.renamed_sessions.lock() {
            renamed.push((old.to_string(), new.to_string()));
        }
        Ok(())
    }

    fn switch_to_session(&self, name: &str) {
        if let Ok(mut switched) = self.switched.lock() {
            switched.push(name.to_string());
        }
    }

    fn is_inside_tmux(&self) -> bool {
        self.inside_tmux
    }
}
