use super::dialog::{Dialog, Tone};
use crate::theme::Theme;
use quay_core::{
    action::ActionKind,
    config::{KeysConfig, UiCommand},
    dispatch::{ConfirmChoice, UiState},
    state::AppState,
};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Padding,
};

/// Confirmation prompt for the pending action, with the current choice highlighted.
pub fn draw(f: &mut Frame, area: Rect, state: &AppState, theme: &Theme, keys: &KeysConfig) {
    let Some(action) = state.dispatcher.pending() else {
        return;
    };
    let keymap = keys.keymap_for_state(UiState::Confirming);
    let toggle_key = KeysConfig::find_key(&keymap, UiCommand::ToggleChoice)
        .map_or_else(|| "tab".to_string(), |k| k.to_string());
    let cancel_key = KeysConfig::find_key(&keymap, UiCommand::Cancel)
        .map_or_else(|| "esc".to_string(), |k| k.to_string());

    let selected = Style::default()
        .bg(theme.accent)
        .fg(theme.highlight_fg)
        .add_modifier(Modifier::BOLD);
    let unselected = Style::default().fg(theme.muted);
    let (confirm_style, cancel_style) = match state.dispatcher.choice() {
        ConfirmChoice::Confirm => (selected, unselected),
        ConfirmChoice::Cancel => (unselected, selected),
    };

    let mut lines = vec![Line::raw(action.confirm.as_str())];
    if let Some(session) = state.session(&action.session_id) {
        lines.push(Line::from(Span::styled(
            format!("{} · {}", session.name, session.path.display()),
            Style::default().fg(theme.muted),
        )));
    }
    lines.push(Line::raw(""));
    lines.push(Line::from(vec![
        Span::styled(" Confirm ", confirm_style),
        Span::raw("   "),
        Span::styled(" Cancel ", cancel_style),
    ]));

    let tone = match action.kind {
        ActionKind::Delete | ActionKind::Recycle => Tone::Error,
        _ => Tone::Accent,
    };
    Dialog::new(lines)
        .title(action.label())
        .hint(format!("{toggle_key} switch  {cancel_key} cancel"))
        .tone(tone)
        .padding(Padding::uniform(1))
        .centered()
        .render(f, area, theme);
}
