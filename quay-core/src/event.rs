use crate::{
    action::{Action, ActionResult},
    session::Session,
    tmux::{TmuxProvider, TmuxWindow},
    tool::{self, ToolStatus},
};
use std::collections::HashMap;

/// Everything a refresh learns about the sessions, replaced wholesale on each poll.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub sessions: Vec<Session>,
    /// Tmux windows by session id
    pub windows: HashMap<String, Vec<TmuxWindow>>,
    pub statuses: HashMap<String, ToolStatus>,
    /// Detected tool name by session id
    pub tools: HashMap<String, String>,
}

/// Pane lines inspected when detecting tool status.
const STATUS_CAPTURE_LINES: usize = 40;

impl SessionSnapshot {
    /// Query tmux for every live session. Recycled sessions and sessions without a tmux
    /// session get no windows and an unknown status.
    pub fn collect(sessions: Vec<Session>, tmux: &dyn TmuxProvider) -> Self {
        let mut snapshot = Self::default();
        for session in &sessions {
            if session.is_recycled() || !tmux.session_exists(&session.slug) {
                continue;
            }
            snapshot
                .windows
                .insert(session.id.clone(), tmux.list_windows(&session.slug));
            let command = tmux.pane_command(&session.slug).unwrap_or_default();
            let detected = tool::detect_tool(&command);
            let content = tmux
                .capture_pane(&session.slug, STATUS_CAPTURE_LINES)
                .unwrap_or_default();
            snapshot.statuses.insert(
                session.id.clone(),
                tool::detect_status(&content, detected.as_ref()),
            );
            if let Some(detected) = detected {
                snapshot
                    .tools
                    .insert(session.id.clone(), detected.name().to_string());
            }
        }
        snapshot.sessions = sessions;
        snapshot
    }

    /// Detected tool for a session, or empty when none was seen at the last poll.
    pub fn tool_for(&self, session_id: &str) -> String {
        self.tools.get(session_id).cloned().unwrap_or_default()
    }

    /// Name of the session's active tmux window at the last poll.
    pub fn current_window(&self, session_id: &str) -> String {
        self.windows
            .get(session_id)
            .and_then(|windows| windows.iter().find(|w| w.active))
            .map(|w| w.name.clone())
            .unwrap_or_default()
    }
}

/// Events that arrive asynchronously from background tasks.
/// These get merged into the main event loop alongside keyboard input.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A poll or post-action refresh completed
    SessionsLoaded(SessionSnapshot),

    /// Sessions could not be listed
    RefreshFailed(String),

    /// Periodic poll tick
    Tick,

    /// A background execution completed, successfully or not
    ActionFinished { action: Action, result: ActionResult },

    /// One line of output from stream `stream`
    StreamLine { stream: u64, line: String },

    /// Stream `stream` finished; sent exactly once per stream
    StreamDone { stream: u64, result: ActionResult },

    /// Content for the preview surface
    PreviewLoaded { title: String, lines: Vec<String> },
}
