use crate::{
    config::ThemePreset,
    dispatch::{Dispatcher, NoticeLevel, UiState},
    event::SessionSnapshot,
    executor::OutputBuffer,
    form::FormState,
    input::TextInput,
    palette::CommandPalette,
    session::Session,
    tree::{self, SessionFilter, TreeRow},
};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NoticeLevel,
    pub message: String,
    /// Seconds since the unix epoch
    pub timestamp: u64,
}

#[derive(Debug, Clone)]
pub struct RenameState {
    pub session_id: String,
    pub input: TextInput,
}

/// Read-only content shown by the preview surface.
#[derive(Debug, Clone, Default)]
pub struct Preview {
    pub title: String,
    pub lines: Vec<String>,
    pub scroll: usize,
    /// Recycled sessions listed, when previewing a recycled group
    pub recycled_ids: Vec<String>,
}

/// State owned by the event loop. Background tasks never touch it directly.
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub snapshot: SessionSnapshot,
    pub filter: SessionFilter,
    rows: Vec<TreeRow>,
    selected: usize,
    /// False until the first refresh lands
    pub loaded: bool,
    pub notifications: Vec<Notification>,
    pub error: Option<String>,
    pub output: OutputBuffer,
    /// Id of the stream whose events are still wanted
    pub stream_id: u64,
    pub palette: Option<CommandPalette>,
    /// Palette arguments for the action being dispatched, kept for a form diversion
    pub pending_args: Vec<String>,
    pub form: Option<FormState>,
    pub rename: Option<RenameState>,
    pub preview: Option<Preview>,
    pub help_scroll: usize,
    pub notifications_scroll: usize,
    pub theme: ThemePreset,
    page_rows: usize,
}

impl AppState {
    pub fn new(output_max_lines: usize) -> Self {
        Self {
            dispatcher: Dispatcher::new(),
            snapshot: SessionSnapshot::default(),
            filter: SessionFilter::All,
            rows: Vec::new(),
            selected: 0,
            loaded: false,
            notifications: Vec::new(),
            error: None,
            output: OutputBuffer::new(output_max_lines),
            stream_id: 0,
            palette: None,
            pending_args: Vec::new(),
            form: None,
            rename: None,
            preview: None,
            help_scroll: 0,
            notifications_scroll: 0,
            theme: ThemePreset::default(),
            page_rows: 10,
        }
    }

    pub fn ui_state(&self) -> UiState {
        self.dispatcher.state()
    }

    /// Scope tag matched against a command's `scope` list.
    pub fn view_scope(&self) -> &'static str {
        match self.ui_state() {
            UiState::CommandPalette => "palette",
            UiState::PreviewingItem => "preview",
            UiState::FormInput => "form",
            _ => "sessions",
        }
    }

    pub fn rows(&self) -> &[TreeRow] {
        &self.rows
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_row(&self) -> Option<&TreeRow> {
        self.rows.get(self.selected)
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.snapshot.sessions.iter().find(|s| s.id == id)
    }

    /// Session the selected row acts on. A recycled group acts through its first session.
    pub fn selected_session(&self) -> Option<&Session> {
        match self.selected_row()? {
            TreeRow::SessionRow { session, .. } => Some(session),
            TreeRow::WindowRow {
                parent_session_id, ..
            } => self.session(parent_session_id),
            TreeRow::RecycledPlaceholder { sessions, .. } => sessions.first(),
            TreeRow::Header { .. } => None,
        }
    }

    /// Window name of the selected window row, if one is selected.
    pub fn selected_window(&self) -> Option<&str> {
        match self.selected_row()? {
            TreeRow::WindowRow { window_name, .. } => Some(window_name),
            _ => None,
        }
    }

    /// Ids captured from the selected recycled group.
    pub fn selected_recycled_ids(&self) -> Option<Vec<String>> {
        match self.selected_row()? {
            TreeRow::RecycledPlaceholder { sessions, .. } => {
                Some(sessions.iter().map(|s| s.id.clone()).collect())
            }
            _ => None,
        }
    }

    /// Rebuild rows from current data, keeping the cursor on the same logical row.
    fn rebuild(&mut self) {
        let descriptor = tree::save(self.selected_row(), self.selected);
        self.rows = tree::build_rows(
            &self.snapshot.sessions,
            &self.snapshot.windows,
            &self.snapshot.statuses,
            self.filter,
        );
        self.selected = tree::restore(&descriptor, &self.rows);
    }

    pub fn apply_snapshot(&mut self, snapshot: SessionSnapshot) {
        self.snapshot = snapshot;
        self.loaded = true;
        self.rebuild();
    }

    pub fn set_filter(&mut self, filter: SessionFilter) {
        self.filter = filter;
        self.rebuild();
    }

    pub fn move_selection(&mut self, delta: isize) {
        self.selected = tree::step_selection(&self.rows, self.selected, delta);
    }

    pub fn select_first(&mut self) {
        self.selected = tree::step_selection(&self.rows, 0, 0);
    }

    pub fn select_last(&mut self) {
        let last = self.rows.len().saturating_sub(1);
        self.selected = tree::step_selection(&self.rows, last, 0);
    }

    /// Jump to the next or previous running/waiting session. Returns false if none.
    pub fn move_to_active(&mut self, forward: bool) -> bool {
        match tree::find_active(&self.rows, self.selected, &self.snapshot.statuses, forward) {
            Some(index) => {
                self.selected = index;
                true
            }
            None => false,
        }
    }

    pub fn set_page_rows(&mut self, rows: usize) {
        self.page_rows = rows.max(1);
    }

    pub fn page_rows(&self) -> usize {
        self.page_rows
    }

    /// Record a message; errors also show in the error bar.
    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        if level == NoticeLevel::Error {
            self.error = Some(message.clone());
        }
        self.notifications.push(Notification {
            level,
            message,
            timestamp,
        });
    }

    pub fn notifications_newest_first(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter().rev()
    }

    /// Start tracking a new stream; events from earlier streams become stale.
    pub fn begin_stream(&mut self) -> u64 {
        self.stream_id += 1;
        self.output.clear();
        self.stream_id
    }

    pub fn is_current_stream(&self, stream: u64) -> bool {
        stream == self.stream_id
    }

    /// Drop surface-local state once no surface needs it.
    pub fn discard_closed_surfaces(&mut self) {
        let state = self.ui_state();
        if state != UiState::CommandPalette {
            self.palette = None;
        }
        if !matches!(state, UiState::FormInput | UiState::CreatingItem) {
            self.form = None;
        }
        if state != UiState::Renaming {
            self.rename = None;
        }
        if state != UiState::PreviewingItem {
            self.preview = None;
        }
        if state != UiState::ShowingHelp {
            self.help_scroll = 0;
        }
        if state != UiState::ShowingNotifications {
            self.notifications_scroll = 0;
        }
    }
}
