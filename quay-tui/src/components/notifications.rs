use super::{centered_rect, clamp_scroll};
use crate::theme::Theme;
use quay_core::{
    dispatch::NoticeLevel,
    state::{AppState, Notification},
};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Paragraph},
};

/// `HH:MM:SS` (UTC) for a unix timestamp.
fn clock(timestamp: u64) -> String {
    let seconds = timestamp % 86_400;
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

fn notification_line<'a>(notification: &'a Notification, theme: &Theme) -> Line<'a> {
    let (marker, color) = match notification.level {
        NoticeLevel::Info => ("•", theme.idle),
        NoticeLevel::Error => ("✗", theme.error),
    };
    Line::from(vec![
        Span::styled(
            format!("{} ", clock(notification.timestamp)),
            Style::default().fg(theme.muted),
        ),
        Span::styled(format!("{marker} "), Style::default().fg(color)),
        Span::raw(notification.message.as_str()),
    ])
}

pub fn draw(f: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let popup = centered_rect(80, 70, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" messages ({}) ", state.notifications.len()))
        .title_bottom(" esc close ")
        .border_style(Style::default().fg(theme.accent))
        .padding(Padding::horizontal(1));

    if state.notifications.is_empty() {
        let empty = Line::from(Span::styled(
            "No messages",
            Style::default()
                .fg(theme.muted)
                .add_modifier(Modifier::ITALIC),
        ));
        f.render_widget(Paragraph::new(empty).block(block), popup);
        return;
    }

    let visible = usize::from(popup.height.saturating_sub(2));
    let scroll = clamp_scroll(state.notifications_scroll, state.notifications.len(), visible);
    let lines: Vec<Line> = state
        .notifications_newest_first()
        .skip(scroll)
        .take(visible)
        .map(|n| notification_line(n, theme))
        .collect();
    f.render_widget(Paragraph::new(lines).block(block), popup);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::tests::render_to_string;
    use quay_core::config::ThemeConfig;

    fn render(state: &AppState) -> String {
        let theme = Theme::from_config(&ThemeConfig::default());
        render_to_string(80, 20, |f| draw(f, f.area(), state, &theme))
    }

    #[test]
    fn test_clock() {
        assert_eq!(clock(0), "00:00:00");
        assert_eq!(clock(86_400 + 3_723), "01:02:03");
    }

    #[test]
    fn test_newest_first() {
        let mut state = AppState::new(10);
        state.notify(NoticeLevel::Info, "first message");
        state.notify(NoticeLevel::Error, "second message");
        let output = render(&state);
        let first = output.find("first message").unwrap();
        let second = output.find("second message").unwrap();
        assert!(second < first, "{output}");
        assert!(output.contains("messages (2)"));
    }

    #[test]
    fn test_empty() {
        let state = AppState::new(10);
        assert!(render(&state).contains("No messages"));
    }
}
