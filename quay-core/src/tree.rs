use crate::{
    action::ActionKind,
    session::Session,
    tmux::TmuxWindow,
    tool::ToolStatus,
};
use std::collections::{BTreeMap, HashMap};

/// Which active sessions the tree shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionFilter {
    #[default]
    All,
    /// Running or waiting for approval
    Active,
    Approval,
    Ready,
}

impl SessionFilter {
    pub fn from_action(kind: ActionKind) -> Option<Self> {
        match kind {
            ActionKind::FilterAll => Some(SessionFilter::All),
            ActionKind::FilterActive => Some(SessionFilter::Active),
            ActionKind::FilterApproval => Some(SessionFilter::Approval),
            ActionKind::FilterReady => Some(SessionFilter::Ready),
            _ => None,
        }
    }

    pub fn matches(self, status: ToolStatus) -> bool {
        match self {
            SessionFilter::All => true,
            SessionFilter::Active => status.is_active(),
            SessionFilter::Approval => status == ToolStatus::Waiting,
            SessionFilter::Ready => status == ToolStatus::Idle,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SessionFilter::All => "all",
            SessionFilter::Active => "active",
            SessionFilter::Approval => "approval",
            SessionFilter::Ready => "ready",
        }
    }
}

/// One line of the session tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeRow {
    Header {
        repo_name: String,
        repo_remote: String,
    },
    SessionRow {
        session: Session,
        is_last_in_group: bool,
    },
    WindowRow {
        parent_session_id: String,
        window_index: u32,
        window_name: String,
        is_last_in_group: bool,
    },
    RecycledPlaceholder {
        repo_key: String,
        count: usize,
        sessions: Vec<Session>,
    },
}

impl TreeRow {
    pub fn is_header(&self) -> bool {
        matches!(self, TreeRow::Header { .. })
    }

    /// Session the row acts on: the session itself, or a window's parent.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            TreeRow::SessionRow { session, .. } => Some(&session.id),
            TreeRow::WindowRow {
                parent_session_id, ..
            } => Some(parent_session_id),
            TreeRow::Header { .. } | TreeRow::RecycledPlaceholder { .. } => None,
        }
    }
}

/// Build the tree: one group per repository, sorted by repository name.
///
/// Within a group, sessions that pass `filter` are listed by name, each followed by its
/// windows when it has more than one. Recycled sessions collapse into a single trailing
/// placeholder, shown only when the filter is `All`. Groups with nothing to show are
/// omitted.
pub fn build_rows(
    sessions: &[Session],
    windows: &HashMap<String, Vec<TmuxWindow>>,
    statuses: &HashMap<String, ToolStatus>,
    filter: SessionFilter,
) -> Vec<TreeRow> {
    let mut groups: BTreeMap<(String, String), Vec<&Session>> = BTreeMap::new();
    for session in sessions {
        groups
            .entry((session.repo_name(), session.repo_key()))
            .or_default()
            .push(session);
    }

    let mut rows = Vec::new();
    for ((repo_name, repo_key), members) in groups {
        let mut active: Vec<&Session> = members
            .iter()
            .copied()
            .filter(|s| !s.is_recycled())
            .filter(|s| {
                let status = statuses.get(&s.id).copied().unwrap_or(ToolStatus::Unknown);
                filter.matches(status)
            })
            .collect();
        active.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        let recycled: Vec<Session> = if filter == SessionFilter::All {
            members
                .iter()
                .filter(|s| s.is_recycled())
                .map(|s| (*s).clone())
                .collect()
        } else {
            Vec::new()
        };

        if active.is_empty() && recycled.is_empty() {
            continue;
        }

        let repo_remote = members
            .iter()
            .find(|s| !s.remote.is_empty())
            .map(|s| s.remote.clone())
            .unwrap_or_default();
        rows.push(TreeRow::Header {
            repo_name,
            repo_remote,
        });

        let active_count = active.len();
        for (i, session) in active.into_iter().enumerate() {
            rows.push(TreeRow::SessionRow {
                session: session.clone(),
                is_last_in_group: i + 1 == active_count && recycled.is_empty(),
            });
            let session_windows = windows.get(&session.id).map_or(&[][..], Vec::as_slice);
            if session_windows.len() > 1 {
                let window_count = session_windows.len();
                for (j, window) in session_windows.iter().enumerate() {
                    rows.push(TreeRow::WindowRow {
                        parent_session_id: session.id.clone(),
                        window_index: window.index,
                        window_name: window.name.clone(),
                        is_last_in_group: j + 1 == window_count,
                    });
                }
            }
        }

        if !recycled.is_empty() {
            rows.push(TreeRow::RecycledPlaceholder {
                repo_key,
                count: recycled.len(),
                sessions: recycled,
            });
        }
    }
    rows
}

/// Identity of the selected row, captured before a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionDescriptor {
    pub session_id: Option<String>,
    pub window_name: Option<String>,
    pub window_index: Option<u32>,
    pub recycled_group_key: Option<String>,
    pub raw_index: usize,
}

pub fn save(row: Option<&TreeRow>, raw_index: usize) -> SelectionDescriptor {
    let mut descriptor = SelectionDescriptor {
        raw_index,
        ..SelectionDescriptor::default()
    };
    match row {
        Some(TreeRow::WindowRow {
            parent_session_id,
            window_index,
            window_name,
            ..
        }) => {
            descriptor.session_id = Some(parent_session_id.clone());
            descriptor.window_name = Some(window_name.clone());
            descriptor.window_index = Some(*window_index);
        }
        Some(TreeRow::RecycledPlaceholder { repo_key, .. }) => {
            descriptor.recycled_group_key = Some(repo_key.clone());
        }
        Some(TreeRow::SessionRow { session, .. }) => {
            descriptor.session_id = Some(session.id.clone());
        }
        Some(TreeRow::Header { .. }) | None => {}
    }
    descriptor
}

/// Index in `rows` that best matches the saved selection.
///
/// Precedence: window by parent and name, window by parent and index, recycled
/// placeholder by group, session by id, the old index (unless it is now a header), the
/// first non-header row, then 0.
pub fn restore(descriptor: &SelectionDescriptor, rows: &[TreeRow]) -> usize {
    let position = |pred: &dyn Fn(&TreeRow) -> bool| rows.iter().position(pred);

    if let (Some(id), Some(name)) = (&descriptor.session_id, &descriptor.window_name)
        && let Some(i) = position(&|row| {
            matches!(row, TreeRow::WindowRow { parent_session_id, window_name, .. }
                if parent_session_id == id && window_name == name)
        })
    {
        return i;
    }
    if let (Some(id), Some(index)) = (&descriptor.session_id, descriptor.window_index)
        && let Some(i) = position(&|row| {
            matches!(row, TreeRow::WindowRow { parent_session_id, window_index, .. }
                if parent_session_id == id && *window_index == index)
        })
    {
        return i;
    }
    if let Some(key) = &descriptor.recycled_group_key
        && let Some(i) = position(&|row| {
            matches!(row, TreeRow::RecycledPlaceholder { repo_key, .. } if repo_key == key)
        })
    {
        return i;
    }
    if let Some(id) = &descriptor.session_id
        && let Some(i) = position(&|row| {
            matches!(row, TreeRow::SessionRow { session, .. } if &session.id == id)
        })
    {
        return i;
    }
    if rows
        .get(descriptor.raw_index)
        .is_some_and(|row| !row.is_header())
    {
        return descriptor.raw_index;
    }
    position(&|row| !row.is_header()).unwrap_or(0)
}

/// Next (or previous) session row whose tool is running or waiting, wrapping around.
/// The current row is only returned when it is the sole active session.
pub fn find_active(
    rows: &[TreeRow],
    current: usize,
    statuses: &HashMap<String, ToolStatus>,
    forward: bool,
) -> Option<usize> {
    let len = rows.len();
    if len == 0 {
        return None;
    }
    let is_active = |row: &TreeRow| match row {
        TreeRow::SessionRow { session, .. } => statuses
            .get(&session.id)
            .is_some_and(|status| status.is_active()),
        _ => false,
    };
    let start = current.min(len - 1);
    (1..=len)
        .map(|step| {
            if forward {
                (start + step) % len
            } else {
                (start + len - step % len) % len
            }
        })
        .find(|&i| is_active(&rows[i]))
}

/// Nearest selectable (non-header) row moving by `delta`, clamped to the list bounds.
pub fn step_selection(rows: &[TreeRow], current: usize, delta: isize) -> usize {
    if rows.is_empty() {
        return 0;
    }
    let last = rows.len() - 1;
    let target = current.saturating_add_signed(delta).min(last);
    let forward = delta >= 0;
    let candidates: Box<dyn Iterator<Item = usize>> = if forward {
        Box::new((target..=last).chain((0..target).rev()))
    } else {
        Box::new((0..=target).rev().chain(target + 1..=last))
    };
    candidates
        .into_iter()
        .find(|&i| !rows[i].is_header())
        .unwrap_or(current.min(last))
}
