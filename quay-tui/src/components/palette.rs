use super::{centered_fixed_rect, dialog_width, place_cursor};
use crate::theme::Theme;
use quay_core::state::AppState;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

const PROMPT: &str = ": ";

pub fn draw(f: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let Some(palette) = &state.palette else {
        return;
    };
    let shown = palette.visible().count().max(1);
    let height = u16::try_from(shown).unwrap_or(u16::MAX).saturating_add(4);
    let popup = centered_fixed_rect(dialog_width(area.width), height, area);
    // Anchor near the top so the list doesn't jump as it filters
    let popup = Rect {
        y: area.y + area.height.saturating_sub(height) / 4,
        ..popup
    };
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" commands ({}) ", palette.filtered_len()))
        .border_style(Style::default().fg(theme.accent));
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let [input_area, rule_area, list_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Fill(1),
    ])
    .areas(inner);

    let input = Line::from(vec![
        Span::styled(
            PROMPT,
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(palette.input().text()),
    ]);
    f.render_widget(Paragraph::new(input), input_area);
    place_cursor(f, input_area, 2, palette.input());
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "─".repeat(usize::from(rule_area.width)),
            Style::default().fg(theme.border),
        ))),
        rule_area,
    );

    if palette.filtered_len() == 0 {
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                "No matching commands",
                Style::default()
                    .fg(theme.muted)
                    .add_modifier(Modifier::ITALIC),
            ))),
            list_area,
        );
        return;
    }

    let name_width = palette
        .visible()
        .map(|(_, entry)| entry.name.chars().count())
        .max()
        .unwrap_or(0);
    let items: Vec<ListItem> = palette
        .visible()
        .map(|(pos, entry)| {
            let selected = pos == palette.selected();
            let (name_style, help_style) = if selected {
                let style = Style::default()
                    .bg(theme.accent)
                    .fg(theme.highlight_fg)
                    .add_modifier(Modifier::BOLD);
                (style, style)
            } else {
                (Style::default(), Style::default().fg(theme.muted))
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<name_width$}  ", entry.name), name_style),
                Span::styled(entry.help.as_str(), help_style),
            ]))
        })
        .collect();
    f.render_widget(List::new(items), list_area);
}
