use crate::action::ActionKind;
use serde::{Deserialize, Deserializer};
use std::{collections::BTreeMap, fmt, str::FromStr};

/// When a resolved command should terminate the process after running.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExitCondition {
    #[default]
    Never,
    Always,
    /// Truthy environment variable, optionally negated with a leading `!`
    Env { var: String, negate: bool },
}

impl ExitCondition {
    /// Evaluate against the process environment.
    pub fn evaluate(&self) -> bool {
        self.evaluate_with(|var| std::env::var(var).ok())
    }

    pub fn evaluate_with(&self, lookup: impl Fn(&str) -> Option<String>) -> bool {
        match self {
            ExitCondition::Never => false,
            ExitCondition::Always => true,
            ExitCondition::Env { var, negate } => {
                let truthy = lookup(var).is_some_and(|value| {
                    let value = value.trim();
                    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
                });
                truthy != *negate
            }
        }
    }
}

impl FromStr for ExitCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed {
            "" | "false" => return Ok(ExitCondition::Never),
            "true" => return Ok(ExitCondition::Always),
            _ => {}
        }
        let (negate, expr) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        let var = expr
            .strip_prefix("${")
            .and_then(|v| v.strip_suffix('}'))
            .or_else(|| expr.strip_prefix('$'))
            .filter(|v| !v.is_empty() && v.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
            .ok_or_else(|| {
                format!("invalid exit condition '{s}': expected true, false, $VAR or ${{VAR}}")
            })?;
        Ok(ExitCondition::Env {
            var: var.to_string(),
            negate,
        })
    }
}

impl fmt::Display for ExitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCondition::Never => f.write_str("false"),
            ExitCondition::Always => f.write_str("true"),
            ExitCondition::Env { var, negate } => {
                write!(f, "{}${var}", if *negate { "!" } else { "" })
            }
        }
    }
}

impl<'de> Deserialize<'de> for ExitCondition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Expr(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Bool(true) => Ok(ExitCondition::Always),
            Raw::Bool(false) => Ok(ExitCondition::Never),
            Raw::Expr(s) => ExitCondition::from_str(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// A value collected interactively before a command's template is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormField {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub default: String,
}

impl FormField {
    pub fn new(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            default: String::new(),
        }
    }

    pub fn label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }
}

/// A named operation: either a built-in action or a shell template.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserCommand {
    #[serde(default, deserialize_with = "deserialize_action")]
    pub action: Option<ActionKind>,
    #[serde(default)]
    pub sh: Option<String>,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub confirm: String,
    #[serde(default)]
    pub silent: bool,
    #[serde(default)]
    pub exit: ExitCondition,
    /// Views the command is active in; empty means everywhere
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub form: Vec<FormField>,
}

fn deserialize_action<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ActionKind>, D::Error> {
    let s = String::deserialize(deserializer)?;
    ActionKind::from_str(&s)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

impl UserCommand {
    pub fn builtin(kind: ActionKind) -> Self {
        Self {
            action: Some(kind),
            ..Self::default()
        }
    }

    pub fn shell(template: &str) -> Self {
        Self {
            sh: Some(template.to_string()),
            ..Self::default()
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

    #[must_use]
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: &[&str]) -> Self {
        self.scope = scope.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn with_form(mut self, fields: Vec<FormField>) -> Self {
        self.form = fields;
        self
    }

    /// Empty scope and a scope naming `global` both match every view.
    pub fn in_scope(&self, view: &str) -> bool {
        self.scope.is_empty() || self.scope.iter().any(|s| s == "global" || s == view)
    }

    pub fn requires_form(&self) -> bool {
        !self.form.is_empty()
    }

    /// Help text for listings, falling back to the action's own description.
    pub fn display_help(&self) -> &str {
        if !self.help.is_empty() {
            return &self.help;
        }
        match (&self.action, &self.sh) {
            (Some(kind), _) => kind.default_help(),
            (None, Some(sh)) => sh,
            (None, None) => "",
        }
    }

    pub fn validate(&self, name: &str) -> Result<(), String> {
        if self.action.is_some() && self.sh.is_some() {
            return Err(format!(
                "command '{name}' sets both 'action' and 'sh'; use one or the other"
            ));
        }
        if let Some(sh) = &self.sh
            && sh.trim().is_empty()
        {
            return Err(format!("command '{name}' has an empty 'sh' template"));
        }
        let mut seen: Vec<&str> = Vec::new();
        for field in &self.form {
            if field.name.is_empty() {
                return Err(format!("command '{name}' has a form field without a name"));
            }
            if seen.contains(&field.name.as_str()) {
                return Err(format!(
                    "command '{name}' declares form field '{}' twice",
                    field.name
                ));
            }
            seen.push(field.name.as_str());
        }
        Ok(())
    }
}

pub type CommandMap = BTreeMap<String, UserCommand>;

/// Built-in command set; user commands with the same name replace these.
pub fn default_commands() -> CommandMap {
    let entries = [
        (
            "recycle",
            UserCommand::builtin(ActionKind::Recycle)
                .with_confirm("Recycle this session? Its tmux session will be closed."),
        ),
        (
            "delete",
            UserCommand::builtin(ActionKind::Delete).with_confirm("Delete this session?"),
        ),
        ("rename", UserCommand::builtin(ActionKind::RenameSession)),
        ("review", UserCommand::builtin(ActionKind::DocReview)),
        ("messages", UserCommand::builtin(ActionKind::ShowMessages)),
        ("theme", UserCommand::builtin(ActionKind::SetTheme).silent()),
        ("new", UserCommand::builtin(ActionKind::NewSession)),
        (
            "filter-all",
            UserCommand::builtin(ActionKind::FilterAll).silent(),
        ),
        (
            "filter-active",
            UserCommand::builtin(ActionKind::FilterActive).silent(),
        ),
        (
            "filter-approval",
            UserCommand::builtin(ActionKind::FilterApproval).silent(),
        ),
        (
            "filter-ready",
            UserCommand::builtin(ActionKind::FilterReady).silent(),
        ),
        (
            "next-active",
            UserCommand::builtin(ActionKind::NextActive).silent(),
        ),
        (
            "prev-active",
            UserCommand::builtin(ActionKind::PrevActive).silent(),
        ),
    ];
    entries
        .into_iter()
        .map(|(name, cmd)| (name.to_string(), cmd))
        .collect()
}
