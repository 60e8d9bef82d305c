use super::{centered_rect, clamp_scroll};
use crate::theme::Theme;
use quay_core::{
    config::{Config, keys::KeyMap},
    keyboard::KeyEvent,
    state::AppState,
};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Paragraph},
};

const KEY_COLUMN: usize = 10;

/// Sorted `(key, description)` rows for one keymap layer.
fn layer_rows(layer: &KeyMap) -> Vec<(KeyEvent, String)> {
    let mut rows: Vec<(KeyEvent, String)> = layer
        .iter()
        .map(|(key, command)| (*key, command.description().to_string()))
        .collect();
    rows.sort();
    rows
}

/// Session keybindings, described by their own help text, then the command's, then its name.
fn binding_rows(config: &Config) -> Vec<(KeyEvent, String)> {
    config
        .keybindings
        .iter()
        .map(|(key, binding)| {
            let help = if binding.help.is_empty() {
                config
                    .commands
                    .get(&binding.cmd)
                    .map(|c| c.display_help())
                    .filter(|h| !h.is_empty())
                    .unwrap_or(&binding.cmd)
                    .to_string()
            } else {
                binding.help.clone()
            };
            (*key, help)
        })
        .collect()
}

pub(crate) fn help_lines<'a>(config: &Config, theme: &Theme) -> Vec<Line<'a>> {
    let keys = &config.keys;
    let sections = [
        ("Sessions", binding_rows(config)),
        ("Session list", layer_rows(&keys.session_list)),
        ("Movement", layer_rows(&keys.list_navigation)),
        ("General", layer_rows(&keys.general)),
        ("Dialogs", layer_rows(&keys.modal)),
        ("Confirmation", layer_rows(&keys.confirm)),
        ("Text input", layer_rows(&keys.text_edit)),
        ("Command palette", layer_rows(&keys.palette)),
        ("Forms", layer_rows(&keys.form)),
    ];

    let heading = Style::default()
        .fg(theme.accent)
        .add_modifier(Modifier::BOLD);
    let key_style = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();
    for (title, rows) in sections {
        if rows.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(Line::raw(""));
        }
        lines.push(Line::from(Span::styled(title, heading)));
        for (key, description) in rows {
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<KEY_COLUMN$}", key.to_string()), key_style),
                Span::raw(description),
            ]));
        }
    }
    lines
}

pub fn draw(f: &mut Frame, area: Rect, state: &AppState, theme: &Theme, config: &Config) {
    let popup = centered_rect(70, 85, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" help ")
        .title_bottom(" j/k scroll  esc close ")
        .border_style(Style::default().fg(theme.accent))
        .padding(Padding::horizontal(1));

    let lines = help_lines(config, theme);
    let visible = usize::from(popup.height.saturating_sub(2));
    let scroll = clamp_scroll(state.help_scroll, lines.len(), visible);
    let shown: Vec<Line> = lines.into_iter().skip(scroll).take(visible).collect();
    f.render_widget(Paragraph::new(shown).block(block), popup);
}
