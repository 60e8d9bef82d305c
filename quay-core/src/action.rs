use crate::{executor::ExecError, template::TemplateError};
use std::{fmt, path::PathBuf, str::FromStr};

/// What a resolved action does when executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActionKind {
    #[default]
    None,
    Recycle,
    Delete,
    Shell,
    FilterAll,
    FilterActive,
    FilterApproval,
    FilterReady,
    DocReview,
    NewSession,
    SetTheme,
    ShowMessages,
    RenameSession,
    NextActive,
    PrevActive,
    DeleteRecycledBatch,
}

impl ActionKind {
    /// Kinds a configured command may name as its built-in `action`.
    pub const BUILTINS: &'static [ActionKind] = &[
        ActionKind::Recycle,
        ActionKind::Delete,
        ActionKind::FilterAll,
        ActionKind::FilterActive,
        ActionKind::FilterApproval,
        ActionKind::FilterReady,
        ActionKind::DocReview,
        ActionKind::NewSession,
        ActionKind::SetTheme,
        ActionKind::ShowMessages,
        ActionKind::RenameSession,
        ActionKind::NextActive,
        ActionKind::PrevActive,
        ActionKind::DeleteRecycledBatch,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ActionKind::None => "none",
            ActionKind::Recycle => "recycle",
            ActionKind::Delete => "delete",
            ActionKind::Shell => "shell",
            ActionKind::FilterAll => "filter_all",
            ActionKind::FilterActive => "filter_active",
            ActionKind::FilterApproval => "filter_approval",
            ActionKind::FilterReady => "filter_ready",
            ActionKind::DocReview => "doc_review",
            ActionKind::NewSession => "new_session",
            ActionKind::SetTheme => "set_theme",
            ActionKind::ShowMessages => "show_messages",
            ActionKind::RenameSession => "rename_session",
            ActionKind::NextActive => "next_active",
            ActionKind::PrevActive => "prev_active",
            ActionKind::DeleteRecycledBatch => "delete_recycled_batch",
        }
    }

    /// Help text used when neither the keybinding nor the command provides one.
    pub const fn default_help(self) -> &'static str {
        match self {
            ActionKind::None => "",
            ActionKind::Recycle => "recycle",
            ActionKind::Delete => "delete",
            ActionKind::Shell => "run command",
            ActionKind::FilterAll => "show all sessions",
            ActionKind::FilterActive => "show active sessions",
            ActionKind::FilterApproval => "show sessions awaiting approval",
            ActionKind::FilterReady => "show ready sessions",
            ActionKind::DocReview => "review document",
            ActionKind::NewSession => "new session",
            ActionKind::SetTheme => "switch theme",
            ActionKind::ShowMessages => "show messages",
            ActionKind::RenameSession => "rename session",
            ActionKind::NextActive => "next active session",
            ActionKind::PrevActive => "previous active session",
            ActionKind::DeleteRecycledBatch => "delete recycled sessions",
        }
    }

    /// Whether executing needs a selected session.
    pub fn targets_session(self) -> bool {
        matches!(
            self,
            ActionKind::Recycle
                | ActionKind::Delete
                | ActionKind::Shell
                | ActionKind::DocReview
                | ActionKind::RenameSession
        )
    }

    pub fn is_filter(self) -> bool {
        matches!(
            self,
            ActionKind::FilterAll
                | ActionKind::FilterActive
                | ActionKind::FilterApproval
                | ActionKind::FilterReady
        )
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::BUILTINS
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("Unknown action: {s}"))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an otherwise valid binding produced an action that must not run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("failed to render command '{command}': {source}")]
    Template {
        command: String,
        #[source]
        source: TemplateError,
    },
    #[error("command '{0}' needs form input")]
    FormRequired(String),
}

/// A fully resolved, executable description of one operator-triggered effect.
///
/// An action with a `resolution_error` is inert: it came from a valid binding but must
/// be surfaced to the operator instead of executed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionKind,
    pub trigger_key: String,
    pub help: String,
    pub confirm: String,
    pub shell_cmd: String,
    pub session_id: String,
    pub session_path: PathBuf,
    pub silent: bool,
    pub exit_after: bool,
    pub resolution_error: Option<ResolutionError>,
    /// Sessions captured for a batch delete
    pub batch_ids: Vec<String>,
}

impl Action {
    pub fn needs_confirm(&self) -> bool {
        !self.confirm.is_empty()
    }

    pub fn is_inert(&self) -> bool {
        self.resolution_error.is_some()
    }

    /// Batch delete over a captured list of recycled sessions.
    pub fn delete_recycled_batch(session_ids: Vec<String>) -> Self {
        let count = session_ids.len();
        let noun = if count == 1 { "session" } else { "sessions" };
        Self {
            kind: ActionKind::DeleteRecycledBatch,
            help: ActionKind::DeleteRecycledBatch.default_help().to_string(),
            confirm: format!("Delete {count} recycled {noun}?"),
            batch_ids: session_ids,
            ..Self::default()
        }
    }

    /// Human-readable label for progress and notifications.
    pub fn label(&self) -> &str {
        if self.help.is_empty() {
            self.kind.default_help()
        } else {
            &self.help
        }
    }
}

/// Outcome of executing an action, as reported back to the event loop.
pub type ActionResult = Result<(), ExecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind_from_str() {
        assert_eq!(ActionKind::from_str("recycle").unwrap(), ActionKind::Recycle);
        assert_eq!(
            ActionKind::from_str("rename-session").unwrap(),
            ActionKind::RenameSession
        );
        assert_eq!(
            ActionKind::from_str("Filter_Ready").unwrap(),
            ActionKind::FilterReady
        );
        assert!(ActionKind::from_str("shell").is_err());
        assert!(ActionKind::from_str("none").is_err());
        assert!(ActionKind::from_str("explode").is_err());
    }

    #[test]
    fn test_builtins_round_trip_through_display() {
        for kind in ActionKind::BUILTINS {
            assert_eq!(ActionKind::from_str(&kind.to_string()).unwrap(), *kind);
        }
    }

    #[test]
    fn test_batch_action_carries_prompt_and_ids() {
        let action = Action::delete_recycled_batch(vec!["1".into(), "2".into()]);
        assert_eq!(action.kind, ActionKind::DeleteRecycledBatch);
        assert_eq!(action.confirm, "Delete 2 recycled sessions?");
        assert!(action.needs_confirm());
        assert_eq!(action.batch_ids.len(), 2);

        let single = Action::delete_recycled_batch(vec!["1".into()]);
        assert_eq!(single.confirm, "Delete 1 recycled session?");
    }

    #[test]
    fn test_label_falls_back_to_kind_help() {
        let action = Action {
            kind: ActionKind::Delete,
            ..Action::default()
        };
        assert_eq!(action.label(), "delete");
    }
}
