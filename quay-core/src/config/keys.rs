use crate::dispatch::UiState;
use crate::keyboard::{KeyCode, KeyEvent, KeyModifiers};
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

/// Interface commands that can be bound to keys. Session actions are bound separately
/// through `[keybindings]` and resolved against the selected session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiCommand {
    /// No-op: explicitly unbinds a key (removes inherited/default binding)
    Noop,

    // General
    Quit,
    ShowHelp,

    // Session list
    OpenPalette,
    Attach,
    Refresh,
    DismissError,

    // List movement
    MoveUp,
    MoveDown,
    HalfPageUp,
    HalfPageDown,
    PageUp,
    PageDown,
    MoveTop,
    MoveBottom,

    // Text editing
    DeleteBackwardChar,
    DeleteForwardChar,
    DeleteBackwardWord,
    MoveCursorLeft,
    MoveCursorRight,
    MoveCursorStart,
    MoveCursorEnd,

    // Modal surfaces
    Confirm,
    Cancel,
    ToggleChoice,
    Fill,
    NextField,
    PrevField,
}

const COMMAND_NAMES: &[(&str, UiCommand)] = &[
    ("noop", UiCommand::Noop),
    ("quit", UiCommand::Quit),
    ("show_help", UiCommand::ShowHelp),
    ("open_palette", UiCommand::OpenPalette),
    ("attach", UiCommand::Attach),
    ("refresh", UiCommand::Refresh),
    ("dismiss_error", UiCommand::DismissError),
    ("move_up", UiCommand::MoveUp),
    ("move_down", UiCommand::MoveDown),
    ("half_page_up", UiCommand::HalfPageUp),
    ("half_page_down", UiCommand::HalfPageDown),
    ("page_up", UiCommand::PageUp),
    ("page_down", UiCommand::PageDown),
    ("move_top", UiCommand::MoveTop),
    ("move_bottom", UiCommand::MoveBottom),
    ("delete_backward_char", UiCommand::DeleteBackwardChar),
    ("delete_forward_char", UiCommand::DeleteForwardChar),
    ("delete_backward_word", UiCommand::DeleteBackwardWord),
    ("move_cursor_left", UiCommand::MoveCursorLeft),
    ("move_cursor_right", UiCommand::MoveCursorRight),
    ("move_cursor_start", UiCommand::MoveCursorStart),
    ("move_cursor_end", UiCommand::MoveCursorEnd),
    ("confirm", UiCommand::Confirm),
    ("cancel", UiCommand::Cancel),
    ("toggle_choice", UiCommand::ToggleChoice),
    ("fill", UiCommand::Fill),
    ("next_field", UiCommand::NextField),
    ("prev_field", UiCommand::PrevField),
];

impl FromStr for UiCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if matches!(s, "none" | "unbound") {
            return Ok(UiCommand::Noop);
        }
        COMMAND_NAMES
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, cmd)| *cmd)
            .ok_or_else(|| format!("Unknown command: {s}"))
    }
}

impl std::fmt::Display for UiCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = COMMAND_NAMES
            .iter()
            .find(|(_, cmd)| cmd == self)
            .map_or("noop", |(name, _)| *name);
        f.write_str(name)
    }
}

impl UiCommand {
    pub fn description(self) -> &'static str {
        match self {
            UiCommand::Noop => "Unbound",
            UiCommand::Quit => "Quit",
            UiCommand::ShowHelp => "Show help",
            UiCommand::OpenPalette => "Open command palette",
            UiCommand::Attach => "Attach to session",
            UiCommand::Refresh => "Refresh sessions",
            UiCommand::DismissError => "Dismiss error",
            UiCommand::MoveUp => "Move up",
            UiCommand::MoveDown => "Move down",
            UiCommand::HalfPageUp => "Half page up",
            UiCommand::HalfPageDown => "Half page down",
            UiCommand::PageUp => "Page up",
            UiCommand::PageDown => "Page down",
            UiCommand::MoveTop => "Move to top",
            UiCommand::MoveBottom => "Move to bottom",
            UiCommand::DeleteBackwardChar => "Delete backward char",
            UiCommand::DeleteForwardChar => "Delete forward char",
            UiCommand::DeleteBackwardWord => "Delete backward word",
            UiCommand::MoveCursorLeft => "Move cursor left",
            UiCommand::MoveCursorRight => "Move cursor right",
            UiCommand::MoveCursorStart => "Move cursor to start",
            UiCommand::MoveCursorEnd => "Move cursor to end",
            UiCommand::Confirm => "Confirm",
            UiCommand::Cancel => "Cancel",
            UiCommand::ToggleChoice => "Toggle choice",
            UiCommand::Fill => "Complete command name",
            UiCommand::NextField => "Next field",
            UiCommand::PrevField => "Previous field",
        }
    }
}

pub type KeyMap = HashMap<KeyEvent, UiCommand>;

/// Layered interface keymaps. Each UI state combines a fixed stack of layers; later
/// layers override earlier ones.
#[derive(Debug, Clone)]
pub struct KeysConfig {
    pub general: KeyMap,
    pub list_navigation: KeyMap,
    pub text_edit: KeyMap,
    pub modal: KeyMap,
    pub session_list: KeyMap,
    pub confirm: KeyMap,
    pub palette: KeyMap,
    pub form: KeyMap,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KeysConfigRaw {
    #[serde(default)]
    general: HashMap<String, String>,
    #[serde(default)]
    list_navigation: HashMap<String, String>,
    #[serde(default)]
    text_edit: HashMap<String, String>,
    #[serde(default)]
    modal: HashMap<String, String>,
    #[serde(default)]
    session_list: HashMap<String, String>,
    #[serde(default)]
    confirm: HashMap<String, String>,
    #[serde(default)]
    palette: HashMap<String, String>,
    #[serde(default)]
    form: HashMap<String, String>,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            general: Self::default_general(),
            list_navigation: Self::default_list_navigation(),
            text_edit: Self::default_text_edit(),
            modal: Self::default_modal(),
            session_list: Self::default_session_list(),
            confirm: Self::default_confirm(),
            palette: Self::default_palette(),
            form: Self::default_form(),
        }
    }
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

impl KeysConfig {
    /// Effective keymap for a UI state: general < shared layers < state-specific.
    pub fn keymap_for_state(&self, state: UiState) -> KeyMap {
        let mut combined = KeyMap::new();
        Self::apply_layer(&mut combined, &self.general);

        match state {
            UiState::Normal => {
                Self::apply_layer(&mut combined, &self.list_navigation);
                Self::apply_layer(&mut combined, &self.session_list);
            }
            UiState::Confirming => {
                Self::apply_layer(&mut combined, &self.modal);
                Self::apply_layer(&mut combined, &self.confirm);
            }
            UiState::StreamingOutput
            | UiState::PreviewingItem
            | UiState::ShowingHelp
            | UiState::ShowingNotifications => {
                Self::apply_layer(&mut combined, &self.list_navigation);
                Self::apply_layer(&mut combined, &self.modal);
            }
            UiState::CommandPalette => {
                Self::apply_layer(&mut combined, &self.text_edit);
                Self::apply_layer(&mut combined, &self.list_navigation);
                Self::apply_layer(&mut combined, &self.modal);
                Self::apply_layer(&mut combined, &self.palette);
            }
            UiState::Renaming => {
                Self::apply_layer(&mut combined, &self.text_edit);
                Self::apply_layer(&mut combined, &self.modal);
            }
            UiState::CreatingItem | UiState::FormInput => {
                Self::apply_layer(&mut combined, &self.text_edit);
                Self::apply_layer(&mut combined, &self.modal);
                Self::apply_layer(&mut combined, &self.form);
            }
            UiState::Loading => {}
        }

        combined
    }

    /// First key bound to `command`, preferring the simplest representation.
    pub fn find_key(keymap: &KeyMap, command: UiCommand) -> Option<KeyEvent> {
        keymap
            .iter()
            .filter(|(_, cmd)| **cmd == command)
            .map(|(key, _)| *key)
            .min()
    }

    fn apply_layer(base: &mut KeyMap, layer: &KeyMap) {
        for (key, command) in layer {
            if *command == UiCommand::Noop {
                base.remove(key);
            } else {
                base.insert(*key, *command);
            }
        }
    }

    fn default_general() -> KeyMap {
        KeyMap::from([
            (ctrl('c'), UiCommand::Quit),
            (ctrl('h'), UiCommand::ShowHelp),
        ])
    }

    fn default_list_navigation() -> KeyMap {
        KeyMap::from([
            (key(KeyCode::Up), UiCommand::MoveUp),
            (key(KeyCode::Down), UiCommand::MoveDown),
            (ctrl('p'), UiCommand::MoveUp),
            (ctrl('n'), UiCommand::MoveDown),
            (ctrl('u'), UiCommand::HalfPageUp),
            (ctrl('d'), UiCommand::HalfPageDown),
            (key(KeyCode::PageUp), UiCommand::PageUp),
            (key(KeyCode::PageDown), UiCommand::PageDown),
            (
                KeyEvent::new(KeyCode::Char('g'), KeyModifiers::ALT),
                UiCommand::MoveTop,
            ),
            (
                KeyEvent::new(KeyCode::Char('G'), KeyModifiers::ALT),
                UiCommand::MoveBottom,
            ),
        ])
    }

    fn default_text_edit() -> KeyMap {
        KeyMap::from([
            (key(KeyCode::Backspace), UiCommand::DeleteBackwardChar),
            (key(KeyCode::Delete), UiCommand::DeleteForwardChar),
            (ctrl('w'), UiCommand::DeleteBackwardWord),
            (key(KeyCode::Left), UiCommand::MoveCursorLeft),
            (key(KeyCode::Right), UiCommand::MoveCursorRight),
            (key(KeyCode::Home), UiCommand::MoveCursorStart),
            (key(KeyCode::End), UiCommand::MoveCursorEnd),
            (ctrl('a'), UiCommand::MoveCursorStart),
            (ctrl('e'), UiCommand::MoveCursorEnd),
        ])
    }

    fn default_modal() -> KeyMap {
        KeyMap::from([
            (key(KeyCode::Enter), UiCommand::Confirm),
            (key(KeyCode::Esc), UiCommand::Cancel),
        ])
    }

    fn default_session_list() -> KeyMap {
        KeyMap::from([
            (KeyEvent::plain('q'), UiCommand::Quit),
            (KeyEvent::plain('?'), UiCommand::ShowHelp),
            (KeyEvent::plain(':'), UiCommand::OpenPalette),
            (key(KeyCode::Enter), UiCommand::Attach),
            (KeyEvent::plain('k'), UiCommand::MoveUp),
            (KeyEvent::plain('j'), UiCommand::MoveDown),
            (KeyEvent::plain('g'), UiCommand::MoveTop),
            (KeyEvent::plain('G'), UiCommand::MoveBottom),
            (key(KeyCode::Esc), UiCommand::DismissError),
            (ctrl('r'), UiCommand::Refresh),
        ])
    }

    fn default_confirm() -> KeyMap {
        KeyMap::from([
            (key(KeyCode::Left), UiCommand::ToggleChoice),
            (key(KeyCode::Right), UiCommand::ToggleChoice),
            (key(KeyCode::Tab), UiCommand::ToggleChoice),
            (KeyEvent::plain('h'), UiCommand::ToggleChoice),
            (KeyEvent::plain('l'), UiCommand::ToggleChoice),
            (KeyEvent::plain('q'), UiCommand::Cancel),
        ])
    }

    fn default_palette() -> KeyMap {
        KeyMap::from([(key(KeyCode::Tab), UiCommand::Fill)])
    }

    fn default_form() -> KeyMap {
        KeyMap::from([
            (key(KeyCode::Tab), UiCommand::NextField),
            (key(KeyCode::Down), UiCommand::NextField),
            (key(KeyCode::BackTab), UiCommand::PrevField),
            (key(KeyCode::Up), UiCommand::PrevField),
        ])
    }

    fn parse_keymap(raw_map: &HashMap<String, String>) -> Result<KeyMap, String> {
        let mut keymap = KeyMap::new();
        for (key_str, command_str) in raw_map {
            let key_event =
                KeyEvent::from_str(key_str).map_err(|e| format!("Invalid key '{key_str}': {e}"))?;
            let command = UiCommand::from_str(command_str)
                .map_err(|e| format!("Invalid command '{command_str}': {e}"))?;
            keymap.insert(key_event, command);
        }
        Ok(keymap)
    }

    /// Merge user layers over defaults, keeping `Noop` entries so the combined
    /// keymap can drop inherited bindings.
    fn from_raw(raw: &KeysConfigRaw) -> Result<Self, String> {
        let mut config = Self::default();
        config.general.extend(Self::parse_keymap(&raw.general)?);
        config
            .list_navigation
            .extend(Self::parse_keymap(&raw.list_navigation)?);
        config.text_edit.extend(Self::parse_keymap(&raw.text_edit)?);
        config.modal.extend(Self::parse_keymap(&raw.modal)?);
        config
            .session_list
            .extend(Self::parse_keymap(&raw.session_list)?);
        config.confirm.extend(Self::parse_keymap(&raw.confirm)?);
        config.palette.extend(Self::parse_keymap(&raw.palette)?);
        config.form.extend(Self::parse_keymap(&raw.form)?);
        Ok(config)
    }
}

impl<'de> Deserialize<'de> for KeysConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = KeysConfigRaw::deserialize(deserializer)?;
        KeysConfig::from_raw(&raw).map_err(serde::de::Error::custom)
    }
}
