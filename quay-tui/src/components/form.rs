use super::{centered_fixed_rect, dialog_width, place_cursor};
use crate::theme::Theme;
use quay_core::{form::FormPurpose, state::AppState};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Paragraph},
};
use unicode_width::UnicodeWidthStr;

/// One labelled input per field; the focused field is highlighted and owns the cursor.
pub fn draw(f: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let Some(form) = &state.form else {
        return;
    };
    let title = match &form.purpose {
        FormPurpose::CreateSession => "New session".to_string(),
        FormPurpose::Command { name, .. } => name.clone(),
    };

    let field_count = form.fields().count();
    let height = u16::try_from(field_count).unwrap_or(u16::MAX).saturating_add(4);
    let popup = centered_fixed_rect(dialog_width(area.width), height, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {title} "))
        .title_bottom(" enter next/submit  tab switch  esc cancel ")
        .border_style(Style::default().fg(theme.accent))
        .padding(Padding::uniform(1));
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let label_width = form
        .fields()
        .map(|(field, _)| field.label().width())
        .max()
        .unwrap_or(0)
        + 2;
    let rows = Layout::vertical(vec![Constraint::Length(1); field_count]).split(inner);

    for (i, ((field, input), row)) in form.fields().zip(rows.iter()).enumerate() {
        let focused = i == form.focused();
        let label_style = if focused {
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.muted)
        };
        let label = format!("{:<label_width$}", format!("{}:", field.label()));
        let line = Line::from(vec![
            Span::styled(label, label_style),
            Span::raw(input.text()),
        ]);
        f.render_widget(Paragraph::new(line), *row);
        if focused {
            place_cursor(f, *row, u16::try_from(label_width).unwrap_or(0), input);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::tests::render_to_string;
    use quay_core::{
        config::{FormField, ThemeConfig, UserCommand},
        form::FormState,
    };

    fn render(state: &AppState) -> String {
        let theme = Theme::from_config(&ThemeConfig::default());
        render_to_string(80, 20, |f| draw(f, f.area(), state, &theme))
    }

    #[test]
    fn test_create_form_shows_fields_and_default_path() {
        let mut state = AppState::new(10);
        state.form = Some(FormState::for_create("/code/app"));
        let output = render(&state);
        assert!(output.contains("New session"), "{output}");
        assert!(output.contains("Name:"));
        assert!(output.contains("/code/app"));
        assert!(output.contains("Remote (optional):"));
    }

    #[test]
    fn test_command_form_uses_command_name() {
        let mut state = AppState::new(10);
        let command = UserCommand::shell("git commit -m {{ form.message }}")
            .with_form(vec![FormField::new("message", "")]);
        state.form = Some(FormState::for_command("commit", &command, "1", Vec::new()));
        let output = render(&state);
        assert!(output.contains("commit"), "{output}");
        assert!(output.contains("message:"));
    }
}
