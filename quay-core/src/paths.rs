use crate::config::APP_NAME;
use std::path::PathBuf;

/// Per-user directories quay keeps its files in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppDir {
    /// `config.toml`
    Config,
    /// The session registry
    State,
    /// Log files
    Cache,
}

impl AppDir {
    #[cfg_attr(windows, allow(dead_code))]
    fn xdg_var(self) -> &'static str {
        match self {
            AppDir::Config => "XDG_CONFIG_HOME",
            AppDir::State => "XDG_STATE_HOME",
            AppDir::Cache => "XDG_CACHE_HOME",
        }
    }

    /// Location under the home directory when the XDG variable is unset or empty.
    #[cfg_attr(windows, allow(dead_code))]
    fn home_fallback(self) -> &'static [&'static str] {
        match self {
            AppDir::Config => &[".config"],
            AppDir::State => &[".local", "state"],
            AppDir::Cache => &[".cache"],
        }
    }

    pub fn path(self) -> PathBuf {
        self.path_with(|var| std::env::var(var).ok())
    }

    /// Resolve against `env` instead of the process environment.
    pub fn path_with(self, env: impl Fn(&str) -> Option<String>) -> PathBuf {
        // Use ~/.config and friends on macOS too, not ~/Library
        #[cfg(unix)]
        {
            if let Some(base) = env(self.xdg_var()).filter(|v| !v.is_empty()) {
                return PathBuf::from(base).join(APP_NAME);
            }
            let mut dir = dirs::home_dir().expect("Unable to find home directory");
            dir.extend(self.home_fallback());
            dir.join(APP_NAME)
        }
        #[cfg(windows)]
        {
            let _ = env;
            let base = match self {
                AppDir::Config => dirs::config_dir(),
                AppDir::State => dirs::data_local_dir(),
                AppDir::Cache => dirs::cache_dir(),
            };
            base.unwrap_or_else(std::env::temp_dir).join(APP_NAME)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_xdg_variable_wins() {
        let dir = AppDir::State.path_with(|var| {
            (var == "XDG_STATE_HOME").then(|| "/tmp/xdg-state".to_string())
        });
        assert_eq!(dir, PathBuf::from("/tmp/xdg-state/quay"));
    }

    #[test]
    fn test_empty_variable_falls_back_to_home() {
        let config = AppDir::Config.path_with(|_| Some(String::new()));
        let state = AppDir::State.path_with(|_| None);
        let cache = AppDir::Cache.path_with(|_| None);
        assert!(config.ends_with(".config/quay"), "{config:?}");
        assert!(state.ends_with(".local/state/quay"), "{state:?}");
        assert!(cache.ends_with(".cache/quay"), "{cache:?}");
    }
}
