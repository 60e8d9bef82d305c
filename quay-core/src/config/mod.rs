pub mod bindings;
pub mod commands;
pub mod keys;

use crate::paths::AppDir;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub use bindings::{Keybinding, KeybindingsConfig};
pub use commands::{CommandMap, ExitCondition, FormField, UserCommand, default_commands};
pub use keys::{KeysConfig, UiCommand};

pub const APP_NAME: &str = "quay";

pub fn config_file() -> PathBuf {
    AppDir::Config.path().join("config.toml")
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Named commands, merged over the built-in set. Each is either a built-in action
    /// or a shell template:
    /// ```toml
    /// [commands.push]
    /// sh = "git -C {{ path }} push {{ args }}"
    /// confirm = "Push this branch?"
    /// ```
    #[serde(default = "default_commands", deserialize_with = "deserialize_commands")]
    pub commands: CommandMap,

    /// Session keybindings, merged over the defaults.
    /// ```toml
    /// [keybindings]
    /// P = { cmd = "push", help = "push" }
    /// ```
    #[serde(default)]
    pub keybindings: KeybindingsConfig,

    /// Interface key binding layers.
    /// To unbind an inherited key mapping, assign it to `noop`.
    #[serde(default)]
    pub keys: KeysConfig,

    #[serde(default)]
    pub theme: ThemeConfig,

    #[serde(default)]
    pub tui: TuiConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            commands: default_commands(),
            keybindings: KeybindingsConfig::default(),
            keys: KeysConfig::default(),
            theme: ThemeConfig::default(),
            tui: TuiConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

fn deserialize_commands<'de, D>(deserializer: D) -> Result<CommandMap, D::Error>
where
    D: Deserializer<'de>,
{
    let user = CommandMap::deserialize(deserializer)?;
    let mut merged = default_commands();
    for (name, command) in user {
        command.validate(&name).map_err(serde::de::Error::custom)?;
        merged.insert(name, command);
    }
    Ok(merged)
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TuiConfig {
    /// How often sessions and tool status are re-polled.
    #[serde(default = "TuiConfig::default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Lines of streamed output kept for display; older lines are dropped.
    #[serde(default = "TuiConfig::default_output_max_lines")]
    pub output_max_lines: usize,
    #[serde(default = "TuiConfig::default_palette_max_visible")]
    pub palette_max_visible: usize,
}

impl TuiConfig {
    fn default_refresh_interval_ms() -> u64 {
        2000
    }
    fn default_output_max_lines() -> usize {
        500
    }
    fn default_palette_max_visible() -> usize {
        8
    }
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: Self::default_refresh_interval_ms(),
            output_max_lines: Self::default_output_max_lines(),
            palette_max_visible: Self::default_palette_max_visible(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Commands run in the session directory when it is recycled, with output streamed
    /// to the screen.
    #[serde(default = "SessionConfig::default_recycle_commands")]
    pub recycle_commands: Vec<String>,
}

impl SessionConfig {
    fn default_recycle_commands() -> Vec<String> {
        vec![
            "git fetch --prune".to_string(),
            "git status --short".to_string(),
        ]
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recycle_commands: Self::default_recycle_commands(),
        }
    }
}

/// Built-in palettes that the `theme` command cycles through.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThemePreset {
    #[default]
    Default,
    Light,
    Mono,
}

impl ThemePreset {
    pub const ALL: [ThemePreset; 3] = [ThemePreset::Default, ThemePreset::Light, ThemePreset::Mono];

    #[must_use]
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ThemePreset::Default => "default",
            ThemePreset::Light => "light",
            ThemePreset::Mono => "mono",
        }
    }
}

/// Theme selection plus per-colour overrides applied on top of whichever preset is active.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ThemeConfig {
    #[serde(default)]
    pub preset: ThemePreset,
    #[serde(default, deserialize_with = "deserialize_color")]
    pub accent: Option<ThemeColor>,
    #[serde(default, deserialize_with = "deserialize_color")]
    pub running: Option<ThemeColor>,
    #[serde(default, deserialize_with = "deserialize_color")]
    pub waiting: Option<ThemeColor>,
    #[serde(default, deserialize_with = "deserialize_color")]
    pub idle: Option<ThemeColor>,
    #[serde(default, deserialize_with = "deserialize_color")]
    pub recycled: Option<ThemeColor>,
    #[serde(default, deserialize_with = "deserialize_color")]
    pub error: Option<ThemeColor>,
    #[serde(default, deserialize_with = "deserialize_color")]
    pub muted: Option<ThemeColor>,
    #[serde(default, deserialize_with = "deserialize_color")]
    pub border: Option<ThemeColor>,
    #[serde(default, deserialize_with = "deserialize_color")]
    pub highlight_fg: Option<ThemeColor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeColor {
    Named(NamedColor),
    Rgb(u8, u8, u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    Gray,
    DarkGray,
}

const NAMED_COLORS: &[(&str, NamedColor)] = &[
    ("black", NamedColor::Black),
    ("blue", NamedColor::Blue),
    ("cyan", NamedColor::Cyan),
    ("dark_gray", NamedColor::DarkGray),
    ("gray", NamedColor::Gray),
    ("green", NamedColor::Green),
    ("magenta", NamedColor::Magenta),
    ("red", NamedColor::Red),
    ("white", NamedColor::White),
    ("yellow", NamedColor::Yellow),
];

impl ThemeColor {
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(hex) = s.strip_prefix('#')
            && hex.len() == 6
        {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            return Some(Self::Rgb(r, g, b));
        }
        let lower = s.to_lowercase().replace("grey", "gray").replace('-', "_");
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, color)| Self::Named(*color))
    }
}

impl std::fmt::Display for ThemeColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(named) => {
                let name = NAMED_COLORS
                    .iter()
                    .find(|(_, c)| c == named)
                    .map_or("?", |(name, _)| *name);
                f.write_str(name)
            }
            Self::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
        }
    }
}

fn deserialize_color<'de, D>(deserializer: D) -> Result<Option<ThemeColor>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ThemeColor::parse(&s).map(Some).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "invalid color '{s}': expected a named color (black, red, green, yellow, blue, magenta, cyan, white, gray/grey, dark_gray) or hex (#rrggbb)"
        ))
    })
}

impl Config {
    /// Keybindings whose command name is not defined.
    pub fn dangling_bindings(&self) -> Vec<(String, String)> {
        self.keybindings
            .iter()
            .filter(|(_, binding)| !self.commands.contains_key(&binding.cmd))
            .map(|(key, binding)| (key.to_string(), binding.cmd.clone()))
            .collect()
    }
}

pub fn load_config_from_str(s: &str) -> Result<Config> {
    let config: Config = toml::from_str(s)?;
    for (key, cmd) in config.dangling_bindings() {
        log::warn!("keybinding '{key}' references unknown command '{cmd}'");
    }
    Ok(config)
}

/// Load configuration. A missing default config file yields the built-in defaults;
/// an explicit path must exist.
pub fn load_config(config_override: Option<&Path>) -> Result<Config> {
    let config_file = match config_override {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found at {}", path.display());
            }
            path.to_path_buf()
        }
        None => config_file(),
    };
    if !config_file.exists() {
        log::info!(
            "no config at {}, using defaults",
            config_file.display()
        );
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(&config_file)
        .with_context(|| format!("Failed to read {}", config_file.display()))?;
    load_config_from_str(&contents)
        .with_context(|| format!("Invalid config at {}", config_file.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;
    use crate::keyboard::KeyEvent;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.commands, default_commands());
        assert_eq!(config.keybindings, KeybindingsConfig::default());
        assert_eq!(config.tui.refresh_interval_ms, 2000);
        assert_eq!(config.tui.output_max_lines, 500);
        assert_eq!(config.tui.palette_max_visible, 8);
        assert_eq!(
            config.session.recycle_commands,
            vec!["git fetch --prune", "git status --short"]
        );
        assert!(config.dangling_bindings().is_empty());
    }

    #[test]
    fn test_user_commands_merge_over_defaults() {
        let config = load_config_from_str(
            r#"
[commands.push]
sh = "git push {{ args }}"
help = "push"

[commands.delete]
action = "delete"
confirm = "Really delete?"
"#,
        )
        .unwrap();
        assert_eq!(config.commands["push"].sh.as_deref(), Some("git push {{ args }}"));
        assert_eq!(config.commands["delete"].confirm, "Really delete?");
        assert_eq!(
            config.commands["recycle"].action,
            Some(ActionKind::Recycle)
        );
    }

    #[test]
    fn test_conflicting_command_rejected() {
        let result = load_config_from_str(
            r#"
[commands.bad]
action = "delete"
sh = "rm -rf ."
"#,
        );
        let err = format!("{:#}", result.unwrap_err());
        assert!(err.contains("both"), "Error was: {err}");
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(load_config_from_str("unknown_field = true").is_err());
        assert!(load_config_from_str("[tui]\nrefresh = 5").is_err());
    }

    #[test]
    fn test_dangling_binding_is_not_fatal() {
        let config = load_config_from_str("[keybindings]\nx = { cmd = \"missing\" }").unwrap();
        assert_eq!(
            config.dangling_bindings(),
            vec![("x".to_string(), "missing".to_string())]
        );
        assert_eq!(
            config.keybindings.get(&KeyEvent::plain('x')).unwrap().cmd,
            "missing"
        );
    }

    #[test]
    fn test_tui_and_session_sections() {
        let config = load_config_from_str(
            r#"
[tui]
refresh_interval_ms = 500
output_max_lines = 20

[session]
recycle_commands = ["git pull"]
"#,
        )
        .unwrap();
        assert_eq!(config.tui.refresh_interval_ms, 500);
        assert_eq!(config.tui.output_max_lines, 20);
        assert_eq!(config.tui.palette_max_visible, 8);
        assert_eq!(config.session.recycle_commands, vec!["git pull"]);
    }

    #[test]
    fn test_theme_overrides() {
        let config = load_config_from_str(
            r##"
[theme]
preset = "light"
accent = "blue"
waiting = "#ff00ff"
"##,
        )
        .unwrap();
        assert_eq!(config.theme.preset, ThemePreset::Light);
        assert_eq!(config.theme.accent, Some(ThemeColor::Named(NamedColor::Blue)));
        assert_eq!(config.theme.waiting, Some(ThemeColor::Rgb(255, 0, 255)));
        assert_eq!(config.theme.running, None);
    }

    #[test]
    fn test_theme_invalid_color_rejected() {
        let result = load_config_from_str("[theme]\naccent = \"notacolor\"");
        let err = format!("{:#}", result.unwrap_err());
        assert!(err.contains("invalid color"), "Error was: {err}");
    }

    #[test]
    fn test_theme_color_parse() {
        assert_eq!(
            ThemeColor::parse("RED"),
            Some(ThemeColor::Named(NamedColor::Red))
        );
        assert_eq!(
            ThemeColor::parse("grey"),
            Some(ThemeColor::Named(NamedColor::Gray))
        );
        assert_eq!(
            ThemeColor::parse("dark-grey"),
            Some(ThemeColor::Named(NamedColor::DarkGray))
        );
        assert_eq!(ThemeColor::parse("#00ff00"), Some(ThemeColor::Rgb(0, 255, 0)));
        assert_eq!(ThemeColor::parse("#fff"), None);
        assert_eq!(ThemeColor::parse("#zzzzzz"), None);
        assert_eq!(ThemeColor::Rgb(1, 2, 255).to_string(), "#0102ff");
    }

    #[test]
    fn test_theme_preset_cycles() {
        assert_eq!(ThemePreset::Default.next(), ThemePreset::Light);
        assert_eq!(ThemePreset::Light.next(), ThemePreset::Mono);
        assert_eq!(ThemePreset::Mono.next(), ThemePreset::Default);
    }

    #[test]
    fn test_load_config_missing_override_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[tui]\npalette_max_visible = 3\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.tui.palette_max_visible, 3);

        fs::write(&path, "[tui\n").unwrap();
        let err = format!("{:#}", load_config(Some(&path)).unwrap_err());
        assert!(err.contains("Invalid config"), "Error was: {err}");
    }
}
