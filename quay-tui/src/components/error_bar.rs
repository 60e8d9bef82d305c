use crate::theme::Theme;
use quay_core::state::AppState;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

/// One-line error strip under the session list.
pub fn draw(f: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let Some(error) = &state.error else {
        return;
    };
    let line = Line::from(vec![
        Span::styled(
            " error ",
            Style::default()
                .bg(theme.error)
                .fg(theme.highlight_fg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {error}"), Style::default().fg(theme.error)),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::tests::render_to_string;
    use quay_core::config::ThemeConfig;

    #[test]
    fn test_renders_error() {
        let mut state = AppState::new(10);
        state.error = Some("tmux not found".to_string());
        let theme = Theme::from_config(&ThemeConfig::default());
        let output = render_to_string(60, 1, |f| draw(f, f.area(), &state, &theme));
        assert!(output.contains("error  tmux not found"), "{output}");
    }
}
