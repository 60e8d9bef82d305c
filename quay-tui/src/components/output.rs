use super::{centered_rect, spinner_frame};
use crate::theme::Theme;
use quay_core::state::AppState;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Paragraph},
};
use std::time::Instant;

/// Streamed output of the running action. Follows the tail while lines arrive.
pub fn draw(f: &mut Frame, area: Rect, state: &AppState, theme: &Theme, start: &Instant) {
    let popup = centered_rect(80, 70, area);
    f.render_widget(Clear, popup);

    let label = state
        .dispatcher
        .running()
        .map_or("output", |action| action.label());
    let done = state.dispatcher.stream_done();
    let title = if done {
        format!(" {label} ")
    } else {
        format!(" {} {label} ", spinner_frame(start))
    };
    let hint = if done {
        " enter/esc close "
    } else {
        " esc cancel "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_bottom(hint)
        .border_style(Style::default().fg(theme.accent))
        .padding(Padding::horizontal(1));
    let inner_height = usize::from(popup.height.saturating_sub(2));

    let muted = Style::default().fg(theme.muted);
    let mut lines: Vec<Line> = Vec::new();
    let dropped = state.output.dropped();
    if dropped > 0 {
        lines.push(Line::from(Span::styled(
            format!("… {dropped} earlier lines dropped"),
            muted.add_modifier(Modifier::ITALIC),
        )));
    }
    lines.extend(state.output.lines().map(|line| status_line(line, theme)));
    if lines.is_empty() {
        lines.push(Line::from(Span::styled("Waiting for output…", muted)));
    }

    let skip = lines.len().saturating_sub(inner_height);
    let visible: Vec<Line> = lines.into_iter().skip(skip).collect();
    f.render_widget(Paragraph::new(visible).block(block), popup);
}

fn status_line<'a>(line: &'a str, theme: &Theme) -> Line<'a> {
    if line.starts_with('✓') {
        Line::from(Span::styled(line, Style::default().fg(theme.idle)))
    } else if line.starts_with('✗') {
        Line::from(Span::styled(line, Style::default().fg(theme.error)))
    } else {
        Line::raw(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::tests::render_to_string;
    use quay_core::{
        action::{Action, ActionKind},
        config::ThemeConfig,
        dispatch::DispatchEvent,
    };

    fn streaming_state(max_lines: usize) -> AppState {
        let mut state = AppState::new(max_lines);
        state.dispatcher.handle(DispatchEvent::ActionResolved(Action {
            kind: ActionKind::Shell,
            help: "run tests".to_string(),
            ..Action::default()
        }));
        state
    }

    fn render(state: &AppState) -> String {
        let theme = Theme::from_config(&ThemeConfig::default());
        render_to_string(80, 20, |f| draw(f, f.area(), state, &theme, &Instant::now()))
    }

    #[test]
    fn test_follows_tail() {
        let mut state = streaming_state(100);
        for i in 0..40 {
            state.output.push(format!("line {i:02}"));
        }
        let output = render(&state);
        assert!(output.contains("run tests"), "{output}");
        assert!(output.contains("line 39"));
        assert!(!output.contains("line 00"));
        assert!(output.contains("esc cancel"));
    }

    #[test]
    fn test_reports_dropped_lines() {
        let mut state = streaming_state(3);
        for i in 0..5 {
            state.output.push(format!("line {i}"));
        }
        let output = render(&state);
        assert!(output.contains("2 earlier lines dropped"), "{output}");
        assert!(output.contains("line 4"));
    }

    #[test]
    fn test_waiting_placeholder() {
        let state = streaming_state(10);
        assert!(render(&state).contains("Waiting for output"));
    }
}
