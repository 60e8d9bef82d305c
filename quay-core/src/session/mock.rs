use super::{Session, SessionProvider, SessionState};
use anyhow::{Result, anyhow, bail};
use std::{path::Path, sync::Mutex};

#[derive(Default)]
pub struct MockSessionProvider {
    pub sessions: Mutex<Vec<Session>>,
    /// Session ids whose delete call fails
    pub fail_delete: Vec<String>,
    pub deleted: Mutex<Vec<String>>,
    pub delete_calls: Mutex<Vec<String>>,
    pub renamed: Mutex<Vec<(String, String)>>,
}

impl MockSessionProvider {
    pub fn with_sessions(sessions: Vec<Session>) -> Self {
        Self {
            sessions: Mutex::new(sessions),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing_delete(mut self, id: &str) -> Self {
        self.fail_delete.push(id.to_string());
        self
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, Vec<Session>>> {
        self.sessions
            .lock()
            .map_err(|_| anyhow!("mock session lock poisoned"))
    }
}

impl SessionProvider for MockSessionProvider {
    fn list_sessions(&self) -> Result<Vec<Session>> {
        Ok(self.locked()?.clone())
    }

    fn get_session(&self, id: &str) -> Result<Session> {
        self.locked()?
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("Session '{id}' not found"))
    }

    fn rename_session(&self, id: &str, new_name: &str) -> Result<()> {
        let mut sessions = self.locked()?;
        let Some(session) = sessions.iter_mut().find(|s| s.id == id) else {
            bail!("Session '{id}' not found");
        };
        session.name = new_name.to_string();
        if let Ok(mut renamed) = self.renamed.lock() {
            renamed.push((id.to_string(), new_name.to_string()));
        }
        Ok(())
    }

    fn create_session(&self, name: &str, path: &Path, remote: &str) -> Result<Session> {
        let mut sessions = self.locked()?;
        let id = (sessions.len() + 1).to_string();
        let session = Session::new(id, name, path).with_remote(remote);
        sessions.push(session.clone());
        Ok(session)
    }

    fn delete_session(&self, id: &str) -> Result<()> {
        if let Ok(mut calls) = self.delete_calls.lock() {
            calls.push(id.to_string());
        }
        if self.fail_delete.iter().any(|f| f == id) {
            bail!("delete failed for {id}");
        }
        self.locked()?.retain(|s| s.id != id);
        if let Ok(mut deleted) = self.deleted.lock() {
            deleted.push(id.to_string());
        }
        Ok(())
    }

    fn set_state(&self, id: &str, state: SessionState) -> Result<()> {
        let mut sessions = self.locked()?;
        let Some(session) = sessions.iter_mut().find(|s| s.id == id) else {
            bail!("Session '{id}' not found");
        };
        session.state = state;
        Ok(())
    }
}
