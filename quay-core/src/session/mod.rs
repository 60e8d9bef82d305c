pub mod mock;
pub mod store;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

pub use store::FileSessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Active,
    Recycled,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Active => write!(f, "active"),
            SessionState::Recycled => write!(f, "recycled"),
        }
    }
}

/// A long-lived unit of work bound to a directory and a tmux session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub remote: String,
    #[serde(default)]
    pub state: SessionState,
    /// Name used for the backing tmux session
    pub slug: String,
}

impl Session {
    pub fn new(id: impl Into<String>, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            slug: slugify(&name),
            name,
            path: path.into(),
            remote: String::new(),
            state: SessionState::Active,
        }
    }

    #[must_use]
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: SessionState) -> Self {
        self.state = state;
        self
    }

    pub fn is_recycled(&self) -> bool {
        self.state == SessionState::Recycled
    }

    /// Key used to group sessions under one repository header: the remote when known,
    /// otherwise the name of the directory containing the session's checkout.
    pub fn repo_key(&self) -> String {
        if !self.remote.is_empty() {
            return self.remote.clone();
        }
        self.path
            .parent()
            .and_then(|p| p.file_name())
            .or_else(|| self.path.file_name())
            .map_or_else(
                || self.path.to_string_lossy().into_owned(),
                |n| n.to_string_lossy().into_owned(),
            )
    }

    /// Short display name for the repository group.
    pub fn repo_name(&self) -> String {
        let key = self.repo_key();
        let trimmed = key.trim_end_matches('/').trim_end_matches(".git");
        trimmed
            .rsplit(['/', ':'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(trimmed)
            .to_string()
    }
}

/// Lowercase, with runs of non-alphanumeric characters collapsed to a single `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "session".to_string()
    } else {
        slug
    }
}

pub trait SessionProvider: Send + Sync {
    fn list_sessions(&self) -> Result<Vec<Session>>;
    fn get_session(&self, id: &str) -> Result<Session>;
    fn rename_session(&self, id: &str, new_name: &str) -> Result<()>;
    fn create_session(&self, name: &str, path: &std::path::Path, remote: &str) -> Result<Session>;
    fn delete_session(&self, id: &str) -> Result<()>;
    fn set_state(&self, id: &str, state: SessionState) -> Result<()>;
}
