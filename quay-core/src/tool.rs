use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::LazyLock};

/// Coding tool detected in a session's active pane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Claude,
    Codex,
    Aider,
    /// Any other foreground program, by its command name
    Other(String),
}

impl Tool {
    pub fn name(&self) -> &str {
        match self {
            Tool::Claude => "claude",
            Tool::Codex => "codex",
            Tool::Aider => "aider",
            Tool::Other(cmd) => cmd,
        }
    }

    pub fn is_agent(&self) -> bool {
        !matches!(self, Tool::Other(_))
    }
}

/// Activity of the tool running in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Actively working (spinner, processing)
    Running,
    /// Needs operator approval or input
    Waiting,
    /// Sitting at its prompt
    Idle,
    Unknown,
}

impl ToolStatus {
    /// Running or waiting for approval: the sessions the operator cares about right now.
    pub fn is_active(self) -> bool {
        matches!(self, ToolStatus::Running | ToolStatus::Waiting)
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolStatus::Running => write!(f, "running"),
            ToolStatus::Waiting => write!(f, "waiting"),
            ToolStatus::Idle => write!(f, "idle"),
            ToolStatus::Unknown => write!(f, "unknown"),
        }
    }
}

const BRAILLE_SPINNERS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

const RUNNING_PATTERNS: &[&str] = &["esc to interrupt", "ctrl+c to interrupt"];

const WAITING_PATTERNS: &[&str] = &[
    "yes, allow",
    "yes, and always allow",
    "yes, and don't ask again",
    "yes, proceed",
    "allow once",
    "allow always",
    "press enter to confirm",
    "(y/n)",
    "[y/n]",
    "enter to select",
    "esc to cancel",
    "❯ 1.",
    "do you trust the files",
];

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B\[[0-9;?]*[A-Za-z]").expect("ANSI escape pattern is valid")
});

/// Detect the tool from the pane's foreground command.
pub fn detect_tool(pane_command: &str) -> Option<Tool> {
    let command = pane_command.trim();
    if command.is_empty() {
        return None;
    }
    let lower = command.to_lowercase();
    let tool = if lower.contains("claude") {
        Tool::Claude
    } else if lower.contains("codex") {
        Tool::Codex
    } else if lower.contains("aider") {
        Tool::Aider
    } else {
        Tool::Other(command.to_string())
    };
    Some(tool)
}

/// Detect what the tool is doing from captured pane text.
///
/// Plain shells and editors report `Unknown`: their screen contents say nothing about
/// whether the operator is needed.
pub fn detect_status(content: &str, tool: Option<&Tool>) -> ToolStatus {
    if !tool.is_some_and(Tool::is_agent) {
        return ToolStatus::Unknown;
    }
    let clean = strip_ansi_codes(content);
    let tail = last_non_empty_lines(&clean, 30).to_lowercase();

    if RUNNING_PATTERNS.iter().any(|p| tail.contains(p))
        || tail.contains(BRAILLE_SPINNERS.as_slice())
    {
        return ToolStatus::Running;
    }
    if WAITING_PATTERNS.iter().any(|p| tail.contains(p)) {
        return ToolStatus::Waiting;
    }
    ToolStatus::Idle
}

fn strip_ansi_codes(content: &str) -> String {
    ANSI_ESCAPE.replace_all(content, "").into_owned()
}

fn last_non_empty_lines(content: &str, count: usize) -> String {
    let lines: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
