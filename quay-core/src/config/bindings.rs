use crate::keyboard::KeyEvent;
use serde::Deserialize;
use std::{collections::BTreeMap, str::FromStr};

/// A key's reference to a named command, with optional local overrides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Keybinding {
    pub cmd: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub confirm: String,
}

impl Keybinding {
    pub fn new(cmd: &str) -> Self {
        Self {
            cmd: cmd.to_string(),
            help: String::new(),
            confirm: String::new(),
        }
    }

    #[must_use]
    pub fn with_help(mut self, help: &str) -> Self {
        self.help = help.to_string();
        self
    }

    #[must_use]
    pub fn with_confirm(mut self, confirm: &str) -> Self {
        self.confirm = confirm.to_string();
        self
    }

    fn is_unbind(&self) -> bool {
        matches!(self.cmd.as_str(), "noop" | "none" | "unbound")
    }
}

/// Session keybindings, ordered by key for stable help listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeybindingsConfig(pub BTreeMap<KeyEvent, Keybinding>);

impl Default for KeybindingsConfig {
    fn default() -> Self {
        let entries = [
            ('r', "recycle"),
            ('d', "delete"),
            ('R', "rename"),
            ('v', "review"),
            ('m', "messages"),
            ('T', "theme"),
            ('n', "new"),
            ('1', "filter-all"),
            ('2', "filter-active"),
            ('3', "filter-approval"),
            ('4', "filter-ready"),
            (']', "next-active"),
            ('[', "prev-active"),
        ];
        Self(
            entries
                .into_iter()
                .map(|(c, cmd)| (KeyEvent::plain(c), Keybinding::new(cmd)))
                .collect(),
        )
    }
}

impl KeybindingsConfig {
    pub fn get(&self, key: &KeyEvent) -> Option<&Keybinding> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KeyEvent, &Keybinding)> {
        self.0.iter()
    }

    /// Keys bound to `cmd`, in key order.
    pub fn keys_for(&self, cmd: &str) -> Vec<KeyEvent> {
        self.0
            .iter()
            .filter(|(_, binding)| binding.cmd == cmd)
            .map(|(key, _)| *key)
            .collect()
    }

    /// Merge user bindings over the defaults; `cmd = "noop"` removes a default.
    fn from_raw(raw: BTreeMap<String, Keybinding>) -> Result<Self, String> {
        let mut config = Self::default();
        for (key_str, binding) in raw {
            let key =
                KeyEvent::from_str(&key_str).map_err(|e| format!("Invalid key '{key_str}': {e}"))?;
            if binding.is_unbind() {
                config.0.remove(&key);
            } else {
                config.0.insert(key, binding);
            }
        }
        Ok(config)
    }
}

impl<'de> Deserialize<'de> for KeybindingsConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Keybinding>::deserialize(deserializer)?;
        KeybindingsConfig::from_raw(raw).map_err(serde::de::Error::custom)
    }
}
