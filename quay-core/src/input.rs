use crate::config::UiCommand;
use unicode_segmentation::UnicodeSegmentation;

/// Single-line text editor with a grapheme-aligned byte cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    text: String,
    cursor: usize,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        let mut input = Self::new();
        input.set(text);
        input
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cursor position as a byte offset into `text`.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Replace the contents and place the cursor at the end.
    pub fn set(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.len();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    fn boundaries(&self) -> Vec<usize> {
        let mut boundaries: Vec<usize> = self.text.grapheme_indices(true).map(|(i, _)| i).collect();
        boundaries.push(self.text.len());
        boundaries
    }

    /// Snap the cursor onto a grapheme boundary and return that boundary's index.
    fn snap(&mut self, boundaries: &[usize]) -> usize {
        let cursor = self.cursor.min(self.text.len());
        let idx = match boundaries.binary_search(&cursor) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        self.cursor = boundaries.get(idx).copied().unwrap_or(0);
        idx
    }

    pub fn cursor_left(&mut self) {
        let boundaries = self.boundaries();
        let idx = self.snap(&boundaries);
        if idx > 0 {
            self.cursor = boundaries[idx - 1];
        }
    }

    pub fn cursor_right(&mut self) {
        let boundaries = self.boundaries();
        let idx = self.snap(&boundaries);
        if idx + 1 < boundaries.len() {
            self.cursor = boundaries[idx + 1];
        }
    }

    pub fn cursor_start(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.text.len();
    }

    pub fn insert_char(&mut self, c: char) {
        let boundaries = self.boundaries();
        self.snap(&boundaries);
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    /// Remove the grapheme before the cursor. Returns false at the start of the text.
    pub fn backspace(&mut self) -> bool {
        let boundaries = self.boundaries();
        let idx = self.snap(&boundaries);
        if idx == 0 {
            return false;
        }
        let prev = boundaries[idx - 1];
        self.text.drain(prev..self.cursor);
        self.cursor = prev;
        true
    }

    pub fn delete_forward_char(&mut self) -> bool {
        let boundaries = self.boundaries();
        let idx = self.snap(&boundaries);
        if idx + 1 >= boundaries.len() {
            return false;
        }
        self.text.drain(self.cursor..boundaries[idx + 1]);
        true
    }

    /// Delete back to the start of the previous word, skipping trailing whitespace.
    pub fn delete_word(&mut self) {
        let boundaries = self.boundaries();
        self.snap(&boundaries);
        let before = &self.text[..self.cursor];
        let graphemes: Vec<(usize, &str)> = before.grapheme_indices(true).collect();
        let mut start = self.cursor;
        let mut iter = graphemes.iter().rev().peekable();
        while let Some((i, _)) = iter.next_if(|(_, g)| g.chars().all(char::is_whitespace)) {
            start = *i;
        }
        while let Some((i, _)) = iter.next_if(|(_, g)| !g.chars().all(char::is_whitespace)) {
            start = *i;
        }
        self.text.drain(start..self.cursor);
        self.cursor = start;
    }

    /// Apply an editing command. Returns true when the command was an editing command.
    pub fn apply(&mut self, command: UiCommand) -> bool {
        match command {
            UiCommand::DeleteBackwardChar => {
                self.backspace();
            }
            UiCommand::DeleteForwardChar => {
                self.delete_forward_char();
            }
            UiCommand::DeleteBackwardWord => self.delete_word(),
            UiCommand::MoveCursorLeft => self.cursor_left(),
            UiCommand::MoveCursorRight => self.cursor_right(),
            UiCommand::MoveCursorStart => self.cursor_start(),
            UiCommand::MoveCursorEnd => self.cursor_end(),
            _ => return false,
        }
        true
    }
}
