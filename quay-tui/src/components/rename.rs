use super::{dialog::Dialog, place_cursor};
use crate::theme::Theme;
use quay_core::state::AppState;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
};

const PROMPT: &str = "New name: ";

pub fn draw(f: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let Some(rename) = &state.rename else {
        return;
    };
    let current = state
        .session(&rename.session_id)
        .map_or(rename.session_id.as_str(), |s| s.name.as_str());

    let dialog = Dialog::new(vec![Line::from(vec![
        Span::styled(
            PROMPT,
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(rename.input.text()),
    ])])
    .title(format!("rename {current}"))
    .hint("enter rename  esc cancel");
    let input_row = {
        let (width, height) = dialog.size(area.width);
        let mut row = dialog.content_area(super::centered_fixed_rect(width, height, area));
        row.height = 1;
        row
    };
    dialog.render(f, area, theme);

    let prefix = u16::try_from(PROMPT.len()).unwrap_or(0);
    place_cursor(f, input_row, prefix, &rename.input);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::tests::render_to_string;
    use quay_core::{
        config::ThemeConfig, event::SessionSnapshot, input::TextInput, session::Session,
        state::RenameState,
    };

    #[test]
    fn test_shows_current_name_and_input() {
        let mut state = AppState::new(10);
        state.apply_snapshot(SessionSnapshot {
            sessions: vec![Session::new("1", "fix-login", "/code/app/fix-login")],
            ..SessionSnapshot::default()
        });
        state.rename = Some(RenameState {
            session_id: "1".to_string(),
            input: TextInput::with_text("auth-fix"),
        });
        let theme = Theme::from_config(&ThemeConfig::default());
        let output = render_to_string(80, 12, |f| draw(f, f.area(), &state, &theme));
        assert!(output.contains("rename fix-login"), "{output}");
        assert!(output.contains("New name: auth-fix"));
        assert!(output.contains("enter rename  esc cancel"));
    }
}
