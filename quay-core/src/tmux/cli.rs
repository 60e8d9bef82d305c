use super::provider::{TmuxProvider, TmuxWindow};
use anyhow::{Result, bail};
use std::{path::Path, process::Command};

pub struct CliTmuxProvider;

fn tmux_output(args: &[&str]) -> Option<String> {
    let output = Command::new("tmux").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn tmux_status(args: &[&str]) -> Result<()> {
    let output = Command::new("tmux").args(args).output()?;
    if !output.status.success() {
        bail!(
            "tmux {} failed: {}",
            args.first().copied().unwrap_or_default(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

/// Parse `#{window_index}\t#{window_name}\t#{window_active}` lines.
pub(crate) fn parse_windows(output: &str) -> Vec<TmuxWindow> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, '\t');
            let index = parts.next()?.trim().parse().ok()?;
            let name = parts.next()?.to_string();
            let active = parts.next().is_some_and(|a| a.trim() == "1");
            Some(TmuxWindow {
                index,
                name,
                active,
            })
        })
        .collect()
}

impl TmuxProvider for CliTmuxProvider {
    fn session_exists(&self, name: &str) -> bool {
        Command::new("tmux")
            .args(["has-session", "-t", &format!("={name}")])
            .output()
            .is_ok_and(|o| o.status.success())
    }

    fn list_windows(&self, session: &str) -> Vec<TmuxWindow> {
        tmux_output(&[
            "list-windows",
            "-t",
            &format!("={session}"),
            "-F",
            "#{window_index}\t#{window_name}\t#{window_active}",
        ])
        .map(|out| parse_windows(&out))
        .unwrap_or_default()
    }

    fn current_window(&self, session: &str) -> String {
        self.list_windows(session)
            .into_iter()
            .find(|w| w.active)
            .map(|w| w.name)
            .unwrap_or_default()
    }

    fn pane_command(&self, session: &str) -> Option<String> {
        tmux_output(&[
            "display-message",
            "-p",
            "-t",
            &format!("={session}"),
            "#{pane_current_command}",
        ])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    }

    fn capture_pane(&self, session: &str, lines: usize) -> Option<String> {
        let start = format!("-{lines}");
        tmux_output(&[
            "capture-pane",
            "-p",
            "-t",
            &format!("={session}"),
            "-S",
            &start,
        ])
    }

    fn create_session(&self, name: &str, dir: &Path) -> Result<()> {
        let dir_str = dir.to_string_lossy();
        tmux_status(&["new-session", "-ds", name, "-c", &dir_str])
    }

    fn kill_session(&self, name: &str) -> Result<()> {
        if !self.session_exists(name) {
            return Ok(());
        }
        tmux_status(&["kill-session", "-t", &format!("={name}")])
    }

    fn rename_session(&self, old: &str, new: &str) -> Result<()> {
        if !self.session_exists(old) {
            return Ok(());
        }
        tmux_status(&["rename-session", "-t", &format!("={old}"), new])
    }

    fn switch_to_session(&self, name: &str) {
        let verb = if self.is_inside_tmux() {
            "switch-client"
        } else {
            "attach-session"
        };
        let _ = Command::new("tmux").args([verb, "-t", name]).status();
    }

    fn is_inside_tmux(&self) -> bool {
        std::env::var("TMUX").is_ok()
    }
}
