use crate::{config::UiCommand, input::TextInput};
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};

const SIGIL: char = ':';

/// Typed palette input split into a command name and positional arguments.
///
/// `args` is `None` when no name was typed, and `Some(vec![])` when a name was typed
/// without arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Option<Vec<String>>,
}

pub fn parse(raw: &str) -> ParsedCommand {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix(SIGIL).unwrap_or(trimmed);
    let mut words = body.split_whitespace();
    let Some(name) = words.next() else {
        return ParsedCommand::default();
    };
    ParsedCommand {
        name: name.to_string(),
        args: Some(words.map(ToString::to_string).collect()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteEntry {
    pub name: String,
    pub help: String,
}

/// Fuzzy-filtered, scrollable command list driven by a text input.
pub struct CommandPalette {
    entries: Vec<PaletteEntry>,
    input: TextInput,
    /// Indices into `entries`, best match first
    filtered: Vec<usize>,
    selected: usize,
    scroll_offset: usize,
    max_visible: usize,
    matcher: SkimMatcherV2,
}

impl CommandPalette {
    pub fn new(mut entries: Vec<PaletteEntry>, max_visible: usize) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        let mut palette = Self {
            filtered: Vec::new(),
            entries,
            input: TextInput::new(),
            selected: 0,
            scroll_offset: 0,
            max_visible: max_visible.max(1),
            matcher: SkimMatcherV2::default(),
        };
        palette.refilter();
        palette
    }

    pub fn input(&self) -> &TextInput {
        &self.input
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn filtered(&self) -> impl Iterator<Item = &PaletteEntry> {
        self.filtered.iter().map(|&i| &self.entries[i])
    }

    /// Entries inside the scroll window, with their position in the filtered list.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &PaletteEntry)> {
        self.filtered
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(self.max_visible)
            .map(|(pos, &i)| (pos, &self.entries[i]))
    }

    pub fn highlighted(&self) -> Option<&PaletteEntry> {
        self.filtered.get(self.selected).map(|&i| &self.entries[i])
    }

    pub fn insert_char(&mut self, c: char) {
        self.input.insert_char(c);
        self.refilter();
    }

    /// Apply an editing command to the input. Cursor-only commands keep the selection.
    pub fn edit(&mut self, command: UiCommand) -> bool {
        let before = self.input.text().to_string();
        if !self.input.apply(command) {
            return false;
        }
        if self.input.text() != before {
            self.refilter();
        }
        true
    }

    pub fn set_input(&mut self, text: &str) {
        self.input.set(text);
        self.refilter();
    }

    fn refilter(&mut self) {
        let name = parse(self.input.text()).name;
        if name.is_empty() {
            self.filtered = (0..self.entries.len()).collect();
        } else {
            let mut scored: Vec<(usize, i64)> = self
                .entries
                .iter()
                .enumerate()
                .filter_map(|(i, entry)| {
                    self.matcher
                        .fuzzy_match(&entry.name, &name)
                        .map(|score| (i, score))
                })
                .collect();
            // Stable: equal scores keep alphabetical order
            scored.sort_by(|a, b| b.1.cmp(&a.1));
            self.filtered = scored.into_iter().map(|(i, _)| i).collect();
        }
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn move_up(&mut self) {
        self.move_by(-1);
    }

    pub fn move_down(&mut self) {
        self.move_by(1);
    }

    /// Move the highlight, clamped to the filtered list, scrolling only as far as needed.
    pub fn move_by(&mut self, delta: isize) {
        let len = self.filtered.len();
        if len == 0 {
            return;
        }
        self.selected = self.selected.saturating_add_signed(delta).min(len - 1);
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + self.max_visible {
            self.scroll_offset = self.selected + 1 - self.max_visible;
        }
    }

    /// Replace the typed command name with the highlighted entry, keeping any arguments.
    pub fn fill(&mut self) {
        let Some(entry) = self.highlighted() else {
            return;
        };
        let name = entry.name.clone();
        let raw = self.input.text();
        let leading = raw.trim_start();
        let (sigil, body) = match leading.strip_prefix(SIGIL) {
            Some(rest) => (SIGIL.to_string(), rest),
            None => (String::new(), leading),
        };
        let body = body.trim_start();
        let rest = body
            .find(char::is_whitespace)
            .map_or("", |end| &body[end..]);
        let filled = format!("{sigil}{name}{rest}");
        self.input.set(&filled);
        self.refilter();
        if let Some(pos) = self.filtered.iter().position(|&i| self.entries[i].name == name) {
            self.move_by(isize::try_from(pos).unwrap_or(isize::MAX));
        }
    }

    /// The highlighted entry and the typed arguments, if anything is highlighted.
    pub fn commit(&self) -> Option<(PaletteEntry, Vec<String>)> {
        let entry = self.highlighted()?.clone();
        let args = parse(self.input.text()).args.unwrap_or_default();
        Some((entry, args))
    }
}
