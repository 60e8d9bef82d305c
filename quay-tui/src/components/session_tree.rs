use crate::theme::Theme;
use quay_core::{
    config::{KeysConfig, UiCommand},
    dispatch::UiState,
    state::AppState,
    tool::ToolStatus,
    tree::TreeRow,
};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

fn status_glyph(status: Option<ToolStatus>) -> &'static str {
    match status {
        Some(ToolStatus::Running) => "●",
        Some(ToolStatus::Waiting) => "◆",
        Some(ToolStatus::Idle) => "○",
        Some(ToolStatus::Unknown) | None => "·",
    }
}

fn branch(is_last: bool) -> &'static str {
    if is_last { "└─ " } else { "├─ " }
}

fn row_item<'a>(row: &'a TreeRow, state: &'a AppState, theme: &Theme) -> ListItem<'a> {
    let muted = Style::default().fg(theme.muted);
    let line = match row {
        TreeRow::Header {
            repo_name,
            repo_remote,
        } => {
            let mut spans = vec![Span::styled(
                repo_name.as_str(),
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            )];
            if !repo_remote.is_empty() {
                spans.push(Span::styled(format!("  {repo_remote}"), muted));
            }
            Line::from(spans)
        }
        TreeRow::SessionRow {
            session,
            is_last_in_group,
        } => {
            let status = state.snapshot.statuses.get(&session.id).copied();
            let color = status.map_or(theme.muted, |s| theme.status(s));
            let mut spans = vec![
                Span::styled(branch(*is_last_in_group), muted),
                Span::styled(format!("{} ", status_glyph(status)), Style::default().fg(color)),
                Span::raw(session.name.as_str()),
            ];
            if let Some(tool) = state.snapshot.tools.get(&session.id) {
                spans.push(Span::styled(format!("  {tool}"), Style::default().fg(color)));
            }
            if let Some(status) = status.filter(|s| *s != ToolStatus::Unknown) {
                spans.push(Span::styled(format!(" ({status})"), muted));
            }
            Line::from(spans)
        }
        TreeRow::WindowRow {
            window_index,
            window_name,
            is_last_in_group,
            ..
        } => Line::from(vec![
            Span::styled(format!("│  {}", branch(*is_last_in_group)), muted),
            Span::styled(format!("{window_index}: {window_name}"), muted),
        ]),
        TreeRow::RecycledPlaceholder { count, .. } => {
            let noun = if *count == 1 { "session" } else { "sessions" };
            Line::from(vec![
                Span::styled(branch(true), muted),
                Span::styled(
                    format!("♻ {count} recycled {noun}"),
                    Style::default()
                        .fg(theme.recycled)
                        .add_modifier(Modifier::ITALIC),
                ),
            ])
        }
    };
    ListItem::new(line)
}

/// Key hints for the bottom border, using whatever keys are currently bound.
fn hints(keys: &KeysConfig) -> String {
    let keymap = keys.keymap_for_state(UiState::Normal);
    [
        (UiCommand::Attach, "attach"),
        (UiCommand::OpenPalette, "commands"),
        (UiCommand::ShowHelp, "help"),
        (UiCommand::Quit, "quit"),
    ]
    .iter()
    .filter_map(|(command, label)| {
        KeysConfig::find_key(&keymap, *command).map(|key| format!("{key} {label}"))
    })
    .collect::<Vec<_>>()
    .join("  ")
}

pub fn draw(f: &mut Frame, area: Rect, state: &AppState, theme: &Theme, keys: &KeysConfig) {
    let live = state
        .snapshot
        .sessions
        .iter()
        .filter(|s| !s.is_recycled())
        .count();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            " quay · {} · {live} sessions ",
            state.filter.label()
        ))
        .title_bottom(format!(" {} ", hints(keys)))
        .border_style(Style::default().fg(theme.border));

    if state.rows().is_empty() {
        let message = if !state.loaded {
            "Loading sessions…"
        } else if state.snapshot.sessions.is_empty() {
            "No sessions yet"
        } else {
            "No sessions match this filter"
        };
        let text = Line::from(Span::styled(
            message,
            Style::default()
                .fg(theme.muted)
                .add_modifier(Modifier::ITALIC),
        ));
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    }

    let items: Vec<ListItem> = state
        .rows()
        .iter()
        .map(|row| row_item(row, state, theme))
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(theme.accent)
                .fg(theme.highlight_fg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");

    let mut list_state = ListState::default();
    list_state.select(Some(state.selected()));
    f.render_stateful_widget(list, area, &mut list_state);
}
