use crate::theme::Theme;
use quay_core::{input::TextInput, state::AppState};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
};
use std::time::Instant;
use unicode_width::UnicodeWidthStr;

pub mod confirm;
pub mod dialog;
pub mod error_bar;
pub mod form;
pub mod help;
pub mod notifications;
pub mod output;
pub mod palette;
pub mod preview;
pub mod rename;
pub mod session_tree;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Helper function to center a rect within another rect
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Percentage(percent_y.min(100)),
        Constraint::Fill(1),
    ])
    .split(r);

    Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Percentage(percent_x.min(100)),
        Constraint::Fill(1),
    ])
    .split(popup_layout[1])[1]
}

/// Center a rect of fixed size, shrunk to fit inside `r`.
pub fn centered_fixed_rect(width: u16, height: u16, r: Rect) -> Rect {
    let width = width.min(r.width);
    let height = height.min(r.height);
    Rect {
        x: r.x + (r.width - width) / 2,
        y: r.y + (r.height - height) / 2,
        width,
        height,
    }
}

/// Dialogs take four fifths of the terminal width.
pub fn dialog_width(terminal_width: u16) -> u16 {
    (terminal_width / 5 * 4).max(terminal_width.min(10))
}

/// First visible line for `scroll`, so the last page never scrolls past the end.
pub fn clamp_scroll(scroll: usize, total: usize, visible: usize) -> usize {
    scroll.min(total.saturating_sub(visible))
}

pub fn spinner_frame(start: &Instant) -> &'static str {
    let elapsed = usize::try_from(start.elapsed().as_millis()).unwrap_or(0);
    SPINNER_FRAMES[(elapsed / 80) % SPINNER_FRAMES.len()]
}

/// Place the terminal cursor inside a single-line input drawn at `area`.
pub fn place_cursor(f: &mut Frame, area: Rect, prefix_width: u16, input: &TextInput) {
    let before = &input.text()[..input.cursor().min(input.text().len())];
    let column = u16::try_from(before.width()).unwrap_or(u16::MAX);
    let x = area
        .x
        .saturating_add(prefix_width)
        .saturating_add(column)
        .min(area.right().saturating_sub(1));
    f.set_cursor_position(Position::new(x, area.y));
}

pub fn draw_loading(f: &mut Frame, area: Rect, state: &AppState, theme: &Theme, start: &Instant) {
    let label = state
        .dispatcher
        .running()
        .map_or("working", |action| action.label());
    let text = Line::from(vec![
        Span::styled(
            format!("{} ", spinner_frame(start)),
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("{label}…")),
    ]);
    dialog::Dialog::new(vec![text]).render(f, area, theme);
}
