use quay_core::{
    action::{Action, ActionKind},
    event::{AppEvent, SessionSnapshot},
    executor::{CancelHandle, ExecError, Executor},
    session::{SessionProvider, slugify},
    tmux::TmuxProvider,
};
use std::{
    path::PathBuf,
    sync::{Arc, atomic::Ordering},
    thread,
    time::Duration,
};

use super::EventSender;

/// Pane lines shown when previewing a session.
const PREVIEW_LINES: usize = 200;

pub(super) fn spawn_refresh(
    sessions: &Arc<dyn SessionProvider>,
    tmux: &Arc<dyn TmuxProvider>,
    sender: &EventSender,
) {
    let sessions = Arc::clone(sessions);
    let tmux = Arc::clone(tmux);
    let sender = sender.clone();
    thread::spawn(move || {
        if sender.cancel.load(Ordering::Relaxed) {
            return;
        }
        match sessions.list_sessions() {
            Ok(list) => sender.send(AppEvent::SessionsLoaded(SessionSnapshot::collect(
                list,
                tmux.as_ref(),
            ))),
            Err(e) => sender.send(AppEvent::RefreshFailed(format!("{e:#}"))),
        }
    });
}

/// Send a `Tick` every `interval` until the app shuts down.
pub(super) fn spawn_ticker(sender: &EventSender, interval: Duration) {
    let sender = sender.clone();
    thread::spawn(move || {
        loop {
            thread::sleep(interval);
            if sender.cancel.load(Ordering::Relaxed) {
                return;
            }
            sender.send(AppEvent::Tick);
        }
    });
}

/// Run an action to completion in the background and report `ActionFinished`.
pub(super) fn spawn_execution(executor: &Arc<dyn Executor>, sender: &EventSender, action: Action) {
    let executor = Arc::clone(executor);
    let sender = sender.clone();
    thread::spawn(move || {
        if sender.cancel.load(Ordering::Relaxed) {
            return;
        }
        let result = executor.execute_sync(&action);
        if let Err(e) = &result {
            log::error!("{} failed: {e}", action.label());
        }
        sender.send(AppEvent::ActionFinished { action, result });
    });
}

/// Start a stream and forward its lines tagged with `stream`. Returns the stream's
/// cancel handle.
pub(super) fn spawn_stream(
    executor: &Arc<dyn Executor>,
    sender: &EventSender,
    action: &Action,
    stream: u64,
) -> CancelHandle {
    let handle = executor.execute_streaming(action);
    let cancel = handle.cancel.clone();
    let sender = sender.clone();
    thread::spawn(move || {
        let line_sender = sender.clone();
        let result = handle.pump(|line| line_sender.send(AppEvent::StreamLine { stream, line }));
        sender.send(AppEvent::StreamDone { stream, result });
    });
    cancel
}

pub(super) fn spawn_rename(
    sessions: &Arc<dyn SessionProvider>,
    tmux: &Arc<dyn TmuxProvider>,
    sender: &EventSender,
    session_id: String,
    new_name: String,
) {
    let sessions = Arc::clone(sessions);
    let tmux = Arc::clone(tmux);
    let sender = sender.clone();
    thread::spawn(move || {
        let action = Action {
            kind: ActionKind::RenameSession,
            help: format!("rename to {new_name}"),
            session_id: session_id.clone(),
            ..Action::default()
        };
        let result = sessions
            .get_session(&session_id)
            .and_then(|old| {
                sessions.rename_session(&session_id, &new_name)?;
                let new_slug = slugify(&new_name);
                if old.slug != new_slug && tmux.session_exists(&old.slug) {
                    tmux.rename_session(&old.slug, &new_slug)?;
                }
                Ok(())
            })
            .map_err(|e| ExecError::Session(format!("{e:#}")));
        sender.send(AppEvent::ActionFinished { action, result });
    });
}

pub(super) fn spawn_create(
    sessions: &Arc<dyn SessionProvider>,
    sender: &EventSender,
    name: String,
    path: PathBuf,
    remote: String,
) {
    let sessions = Arc::clone(sessions);
    let sender = sender.clone();
    thread::spawn(move || {
        let mut action = Action {
            kind: ActionKind::NewSession,
            help: format!("create {name}"),
            ..Action::default()
        };
        let result = match sessions.create_session(&name, &path, &remote) {
            Ok(session) => {
                log::info!("created session {} ({})", session.name, session.id);
                action.session_id = session.id;
                Ok(())
            }
            Err(e) => Err(ExecError::Session(format!("{e:#}"))),
        };
        sender.send(AppEvent::ActionFinished { action, result });
    });
}

/// Capture the session's active pane for the preview surface.
pub(super) fn spawn_preview(
    tmux: &Arc<dyn TmuxProvider>,
    sender: &EventSender,
    title: String,
    slug: String,
) {
    let tmux = Arc::clone(tmux);
    let sender = sender.clone();
    thread::spawn(move || {
        let lines = tmux.capture_pane(&slug, PREVIEW_LINES).map_or_else(
            || vec![format!("No tmux session named {slug}")],
            |content| content.lines().map(str::to_string).collect(),
        );
        sender.send(AppEvent::PreviewLoaded { title, lines });
    });
}
