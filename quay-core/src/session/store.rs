use super::{Session, SessionProvider, SessionState, slugify};
use crate::paths::AppDir;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

const SESSIONS_FILE_NAME: &str = "sessions.toml";
const SESSIONS_STATE_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionsFile {
    version: u32,
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    sessions: Vec<Session>,
}

/// Session registry persisted as a versioned TOML file.
///
/// Every operation re-reads the file so that several quay processes see each other's
/// changes; the mutex only serialises writers inside this process.
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn default_location() -> Self {
        Self::new(AppDir::State.path().join(SESSIONS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<SessionsFile> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionsFile {
                    version: SESSIONS_STATE_VERSION,
                    ..SessionsFile::default()
                });
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };
        let parsed: SessionsFile = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        if parsed.version != SESSIONS_STATE_VERSION {
            bail!(
                "Unsupported session file version {} (expected {SESSIONS_STATE_VERSION})",
                parsed.version
            );
        }
        Ok(parsed)
    }

    fn save(&self, file: &SessionsFile) -> Result<()> {
        if file.sessions.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = toml::to_string(file)?;
        fs::write(&self.path, serialized)?;
        Ok(())
    }

    fn update<T>(&self, f: impl FnOnce(&mut SessionsFile) -> Result<T>) -> Result<T> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        let mut file = self.load()?;
        let out = f(&mut file)?;
        self.save(&file)?;
        Ok(out)
    }
}

fn find_mut<'a>(file: &'a mut SessionsFile, id: &str) -> Result<&'a mut Session> {
    file.sessions
        .iter_mut()
        .find(|s| s.id == id)
        .with_context(|| format!("Session '{id}' not found"))
}

impl SessionProvider for FileSessionStore {
    fn list_sessions(&self) -> Result<Vec<Session>> {
        Ok(self.load()?.sessions)
    }

    fn get_session(&self, id: &str) -> Result<Session> {
        self.load()?
            .sessions
            .into_iter()
            .find(|s| s.id == id)
            .with_context(|| format!("Session '{id}' not found"))
    }

    fn rename_session(&self, id: &str, new_name: &str) -> Result<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            bail!("Session name cannot be empty");
        }
        self.update(|file| {
            let session = find_mut(file, id)?;
            session.name = new_name.to_string();
            Ok(())
        })
    }

    fn create_session(&self, name: &str, path: &Path, remote: &str) -> Result<Session> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Session name cannot be empty");
        }
        self.update(|file| {
            file.next_id += 1;
            let mut session = Session::new(file.next_id.to_string(), name, path);
            session.remote = remote.to_string();
            // Keep tmux names unique across live sessions
            let base = slugify(name);
            let mut slug = base.clone();
            let mut n = 2;
            while file.sessions.iter().any(|s| s.slug == slug) {
                slug = format!("{base}-{n}");
                n += 1;
            }
            session.slug = slug;
            file.sessions.push(session.clone());
            Ok(session)
        })
    }

    fn delete_session(&self, id: &str) -> Result<()> {
        self.update(|file| {
            let before = file.sessions.len();
            file.sessions.retain(|s| s.id != id);
            if before == file.sessions.len() {
                bail!("Session '{id}' not found");
            }
            Ok(())
        })
    }

    fn set_state(&self, id: &str, state: SessionState) -> Result<()> {
        self.update(|file| {
            find_mut(file, id)?.state = state;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> FileSessionStore {
        FileSessionStore::new(dir.join("quay").join(SESSIONS_FILE_NAME))
    }

    #[test]
    fn test_missing_file_lists_nothing() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        assert!(store.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_create_assigns_increasing_ids_and_unique_slugs() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        let a = store.create_session("Fix bug", tmp.path(), "").unwrap();
        let b = store.create_session("fix  bug", tmp.path(), "").unwrap();
        assert_eq!(a.id, "1");
        assert_eq!(b.id, "2");
        assert_eq!(a.slug, "fix-bug");
        assert_eq!(b.slug, "fix-bug-2");
        assert_eq!(store.list_sessions().unwrap().len(), 2);
    }

    #[test]
    fn test_rename_and_state_round_trip_through_file() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        let s = store
            .create_session("one", tmp.path(), "git@host:me/repo.git")
            .unwrap();
        store.rename_session(&s.id, "renamed").unwrap();
        store.set_state(&s.id, SessionState::Recycled).unwrap();

        let reopened = store_in(tmp.path());
        let loaded = reopened.get_session(&s.id).unwrap();
        assert_eq!(loaded.name, "renamed");
        assert_eq!(loaded.slug, "one");
        assert_eq!(loaded.state, SessionState::Recycled);
        assert_eq!(loaded.remote, "git@host:me/repo.git");
    }

    #[test]
    fn test_rename_rejects_empty_name() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        let s = store.create_session("one", tmp.path(), "").unwrap();
        assert!(store.rename_session(&s.id, "   ").is_err());
    }

    #[test]
    fn test_delete_last_session_removes_file() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        let s = store.create_session("one", tmp.path(), "").unwrap();
        assert!(store.path().exists());
        store.delete_session(&s.id).unwrap();
        assert!(!store.path().exists());
        assert!(store.delete_session(&s.id).is_err());
    }

    #[test]
    fn test_unknown_session_errors() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        assert!(store.get_session("42").is_err());
        assert!(store.set_state("42", SessionState::Active).is_err());
    }

    #[test]
    fn test_wrong_version_is_rejected() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "version = 99\n").unwrap();
        assert!(store.list_sessions().is_err());
    }
}
