use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthStr;

use super::{centered_fixed_rect, dialog_width};
use crate::theme::Theme;

/// Border colour of a dialog, picked from the theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Accent,
    Error,
}

/// A centered popup sized to its wrapped content, with an optional key hint on the
/// bottom border.
pub struct Dialog<'a> {
    lines: Vec<Line<'a>>,
    tone: Tone,
    title: Option<String>,
    hint: Option<String>,
    padding: Padding,
    alignment: Alignment,
}

impl<'a> Dialog<'a> {
    #[must_use]
    pub fn new(lines: Vec<Line<'a>>) -> Self {
        Self {
            lines,
            tone: Tone::Accent,
            title: None,
            hint: None,
            padding: Padding::horizontal(1),
            alignment: Alignment::Left,
        }
    }

    #[must_use]
    pub fn tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    #[must_use]
    pub fn padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    #[must_use]
    pub fn centered(mut self) -> Self {
        self.alignment = Alignment::Center;
        self
    }

    /// `(width, height)` on a terminal `terminal_width` columns wide, borders included.
    pub fn size(&self, terminal_width: u16) -> (u16, u16) {
        let width = dialog_width(terminal_width);
        let inner = width
            .saturating_sub(2 + self.padding.left + self.padding.right)
            .max(1);
        let rows: u16 = self
            .lines
            .iter()
            .map(|line| wrapped_line_count(line, inner))
            .sum();
        (width, rows + 2 + self.padding.top + self.padding.bottom)
    }

    /// Area inside the border and padding where the first line is drawn.
    pub fn content_area(&self, popup: Rect) -> Rect {
        let x = popup.x + 1 + self.padding.left;
        let y = popup.y + 1 + self.padding.top;
        Rect {
            x,
            y,
            width: popup
                .width
                .saturating_sub(2 + self.padding.left + self.padding.right),
            height: popup
                .height
                .saturating_sub(2 + self.padding.top + self.padding.bottom),
        }
    }

    /// Render centered on `area` over a cleared background and return the popup rect.
    pub fn render(self, f: &mut Frame, area: Rect, theme: &Theme) -> Rect {
        let (width, height) = self.size(area.width);
        let popup = centered_fixed_rect(width, height, area);
        f.render_widget(Clear, popup);

        let border: Color = match self.tone {
            Tone::Accent => theme.accent,
            Tone::Error => theme.error,
        };
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .padding(self.padding);
        if let Some(title) = &self.title {
            block = block.title(format!(" {title} "));
        }
        if let Some(hint) = &self.hint {
            block = block.title_bottom(Line::styled(
                format!(" {hint} "),
                Style::default().fg(theme.muted),
            ));
        }

        f.render_widget(
            Paragraph::new(self.lines)
                .block(block)
                .wrap(Wrap { trim: false })
                .alignment(self.alignment),
            popup,
        );
        popup
    }
}

/// Rows a `Line` occupies when word-wrapped to `max_width` display columns.
pub fn wrapped_line_count(line: &Line, max_width: u16) -> u16 {
    let max_w = usize::from(max_width);
    if max_w == 0 {
        return 1;
    }
    let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();

    let mut rows: u16 = 1;
    let mut col: usize = 0;
    for word in text.split(' ') {
        let w = word.width();
        let needed = if col == 0 { w } else { w + 1 };
        if col + needed <= max_w {
            col += needed;
            continue;
        }
        if col > 0 {
            rows += 1;
        }
        // A word longer than the line breaks mid-word
        col = w;
        while col > max_w {
            rows += 1;
            col -= max_w;
        }
    }
    rows
}
