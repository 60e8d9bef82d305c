use super::{centered_rect, clamp_scroll};
use crate::theme::Theme;
use quay_core::state::AppState;
use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::Line,
    widgets::{Block, Borders, Clear, Padding, Paragraph},
};

pub fn draw(f: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let Some(preview) = &state.preview else {
        return;
    };
    let popup = centered_rect(80, 80, area);
    f.render_widget(Clear, popup);

    let hint = if preview.recycled_ids.is_empty() {
        " esc close "
    } else {
        " delete: remove all  esc close "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", preview.title))
        .title_bottom(hint)
        .border_style(Style::default().fg(theme.accent))
        .padding(Padding::horizontal(1));

    let visible = usize::from(popup.height.saturating_sub(2));
    let scroll = clamp_scroll(preview.scroll, preview.lines.len(), visible);
    let lines: Vec<Line> = preview
        .lines
        .iter()
        .skip(scroll)
        .take(visible)
        .map(|l| Line::raw(l.as_str()))
        .collect();
    f.render_widget(Paragraph::new(lines).block(block), popup);
}
