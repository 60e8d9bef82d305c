use crate::{
    action::{Action, ActionKind, ActionResult},
    session::{SessionProvider, SessionState},
    tmux::TmuxProvider,
};
use std::{
    collections::VecDeque,
    io::{BufRead, BufReader},
    path::Path,
    process::{Child, Command, Stdio},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread,
    time::Duration,
};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    #[error("failed to start {0}")]
    Spawn(String),
    #[error("`{command}` failed: {message}")]
    Failed { command: String, message: String },
    #[error("cancelled")]
    Cancelled,
    #[error("{0} cannot be executed directly")]
    Unsupported(ActionKind),
    #[error("{0}")]
    Session(String),
    #[error("not executed: {0}")]
    Inert(String),
}

impl ExecError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecError::Cancelled)
    }

    fn session(e: &anyhow::Error) -> Self {
        ExecError::Session(format!("{e:#}"))
    }
}

/// Idempotent cancellation for a running stream. Safe to call after completion.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true only for the call that actually requested cancellation.
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A running streaming execution.
///
/// `lines` delivers output in arrival order; `done` delivers exactly one result, after
/// every line of a naturally completed run has been queued.
pub struct StreamHandle {
    pub lines: mpsc::Receiver<String>,
    pub done: mpsc::Receiver<ActionResult>,
    pub cancel: CancelHandle,
}

impl StreamHandle {
    /// Forward lines to `on_line` until the stream completes, then return its result.
    pub fn pump(self, mut on_line: impl FnMut(String)) -> ActionResult {
        loop {
            match self.lines.recv_timeout(POLL_INTERVAL) {
                Ok(line) => on_line(line),
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if let Ok(result) = self.done.try_recv() {
                        self.lines.try_iter().for_each(&mut on_line);
                        return result;
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return self.done.recv().unwrap_or(Err(ExecError::Cancelled));
                }
            }
        }
    }
}

pub trait Executor: Send + Sync {
    fn execute_sync(&self, action: &Action) -> ActionResult;
    fn execute_streaming(&self, action: &Action) -> StreamHandle;

    /// Run on the caller's thread with the terminal handed over, for actions that exit
    /// the process afterwards.
    fn execute_inline(&self, action: &Action) -> ActionResult {
        self.execute_sync(action)
    }
}

/// Result of a best-effort batch delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub attempted: usize,
    pub errors: Vec<(String, ExecError)>,
}

impl BatchReport {
    pub fn last_error(&self) -> Option<&ExecError> {
        self.errors.last().map(|(_, e)| e)
    }

    pub fn into_result(self) -> ActionResult {
        match self.errors.into_iter().last() {
            Some((_, e)) => Err(e),
            None => Ok(()),
        }
    }
}

/// Delete every listed session in order. A failure does not stop the loop; every error
/// is logged and kept in the report.
pub fn delete_batch(executor: &dyn Executor, session_ids: &[String]) -> BatchReport {
    let mut report = BatchReport::default();
    for id in session_ids {
        report.attempted += 1;
        let action = Action {
            kind: ActionKind::Delete,
            session_id: id.clone(),
            ..Action::default()
        };
        if let Err(e) = executor.execute_sync(&action) {
            log::error!("batch delete of session {id} failed: {e}");
            report.errors.push((id.clone(), e));
        }
    }
    report
}

/// Most recent output lines, oldest dropped first.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    lines: VecDeque<String>,
    max_lines: usize,
    dropped: usize,
}

impl OutputBuffer {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines: max_lines.max(1),
            dropped: 0,
        }
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() == self.max_lines {
            self.lines.pop_front();
            self.dropped += 1;
        }
        self.lines.push_back(line);
    }

    pub fn lines(&self) -> impl ExactSizeIterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines discarded since the last clear.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.dropped = 0;
    }
}

/// Executes actions against stored sessions, tmux, and the shell.
pub struct SessionExecutor {
    sessions: Arc<dyn SessionProvider>,
    tmux: Arc<dyn TmuxProvider>,
    recycle_commands: Vec<String>,
}

impl SessionExecutor {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        tmux: Arc<dyn TmuxProvider>,
        recycle_commands: Vec<String>,
    ) -> Self {
        Self {
            sessions,
            tmux,
            recycle_commands,
        }
    }

    fn delete(&self, session_id: &str) -> ActionResult {
        let session = self
            .sessions
            .get_session(session_id)
            .map_err(|e| ExecError::session(&e))?;
        if let Err(e) = self.tmux.kill_session(&session.slug) {
            log::warn!("failed to kill tmux session {}: {e:#}", session.slug);
        }
        self.sessions
            .delete_session(session_id)
            .map_err(|e| ExecError::session(&e))?;
        log::info!("deleted session {} ({})", session.name, session.id);
        Ok(())
    }

    fn run_shell(command: &str, dir: &Path) -> ActionResult {
        let output = shell(command, dir)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ExecError::Spawn(format!("`{command}`: {e}")))?;
        if output.status.success() {
            return Ok(());
        }
        Err(failure(command, output.status.code(), &output.stderr))
    }
}

fn shell(command: &str, dir: &Path) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    if dir.is_dir() {
        cmd.current_dir(dir);
    }
    cmd
}

fn failure(command: &str, code: Option<i32>, stderr: &[u8]) -> ExecError {
    let stderr = String::from_utf8_lossy(stderr);
    let detail = stderr.lines().rev().find(|l| !l.trim().is_empty());
    let status = code.map_or_else(|| "killed by signal".to_string(), |c| format!("exit {c}"));
    ExecError::Failed {
        command: command.to_string(),
        message: match detail {
            Some(line) => format!("{status}: {}", line.trim()),
            None => status,
        },
    }
}

impl Executor for SessionExecutor {
    fn execute_sync(&self, action: &Action) -> ActionResult {
        if let Some(error) = &action.resolution_error {
            return Err(ExecError::Inert(error.to_string()));
        }
        match action.kind {
            ActionKind::Delete => self.delete(&action.session_id),
            ActionKind::Shell if !action.shell_cmd.is_empty() => {
                log::debug!("running `{}`", action.shell_cmd);
                Self::run_shell(&action.shell_cmd, &action.session_path)
            }
            ActionKind::Recycle => self.execute_streaming(action).pump(|line| {
                log::debug!("recycle: {line}");
            }),
            ActionKind::DeleteRecycledBatch => delete_batch(self, &action.batch_ids).into_result(),
            kind => Err(ExecError::Unsupported(kind)),
        }
    }

    fn execute_streaming(&self, action: &Action) -> StreamHandle {
        let (line_tx, lines) = mpsc::channel();
        let (done_tx, done) = mpsc::channel();
        let cancel = CancelHandle::new();

        let sessions = Arc::clone(&self.sessions);
        let tmux = Arc::clone(&self.tmux);
        let commands = if action.kind == ActionKind::Recycle {
            self.recycle_commands.clone()
        } else {
            vec![action.shell_cmd.clone()]
        };
        let action = action.clone();
        let flag = cancel.clone();
        thread::spawn(move || {
            let result = run_stream(&action, &commands, &line_tx, &flag).and_then(|()| {
                if action.kind == ActionKind::Recycle {
                    finish_recycle(&action, sessions.as_ref(), tmux.as_ref(), &line_tx, &flag)
                } else {
                    Ok(())
                }
            });
            drop(line_tx);
            let _ = done_tx.send(result);
        });

        StreamHandle {
            lines,
            done,
            cancel,
        }
    }

    fn execute_inline(&self, action: &Action) -> ActionResult {
        if action.kind != ActionKind::Shell || action.resolution_error.is_some() {
            return self.execute_sync(action);
        }
        let status = shell(&action.shell_cmd, &action.session_path)
            .status()
            .map_err(|e| ExecError::Spawn(format!("`{}`: {e}", action.shell_cmd)))?;
        if status.success() {
            Ok(())
        } else {
            Err(failure(&action.shell_cmd, status.code(), &[]))
        }
    }
}

/// Tear down the tmux session and mark the session recycled, unless cancelled first.
fn finish_recycle(
    action: &Action,
    sessions: &dyn SessionProvider,
    tmux: &dyn TmuxProvider,
    lines: &mpsc::Sender<String>,
    cancel: &CancelHandle,
) -> ActionResult {
    if cancel.is_cancelled() {
        return Err(ExecError::Cancelled);
    }
    let session = sessions
        .get_session(&action.session_id)
        .map_err(|e| ExecError::session(&e))?;
    if let Err(e) = tmux.kill_session(&session.slug) {
        log::warn!("failed to kill tmux session {}: {e:#}", session.slug);
    }
    sessions
        .set_state(&action.session_id, SessionState::Recycled)
        .map_err(|e| ExecError::session(&e))?;
    let _ = lines.send(format!("session {} recycled", session.name));
    Ok(())
}

/// Run each command in turn, forwarding merged stdout/stderr line by line.
fn run_stream(
    action: &Action,
    commands: &[String],
    lines: &mpsc::Sender<String>,
    cancel: &CancelHandle,
) -> ActionResult {
    for command in commands {
        if cancel.is_cancelled() {
            return Err(ExecError::Cancelled);
        }
        let _ = lines.send(format!("$ {command}"));
        let mut cmd = shell(&format!("exec 2>&1; {command}"), &action.session_path);
        // Lead a new process group so cancel reaches everything the command starts
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut cmd, 0);
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::Spawn(format!("`{command}`: {e}")))?;

        let reader = child.stdout.take().map(|stdout| {
            let lines = lines.clone();
            thread::spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if lines.send(line).is_err() {
                        break;
                    }
                }
            })
        });

        let status = wait_or_cancel(&mut child, cancel)?;
        if let Some(reader) = reader {
            let _ = reader.join();
        }
        if !status.success() {
            return Err(failure(command, status.code(), &[]));
        }
    }
    Ok(())
}

fn wait_or_cancel(
    child: &mut Child,
    cancel: &CancelHandle,
) -> Result<std::process::ExitStatus, ExecError> {
    loop {
        if cancel.is_cancelled() {
            kill_group(child);
            return Err(ExecError::Cancelled);
        }
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(ExecError::Spawn(e.to_string())),
        }
    }
}

/// Kill a stream command together with its process group, then reap it.
fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::{
            sys::signal::{Signal, killpg},
            unistd::Pid,
        };
        if let Ok(pid) = i32::try_from(child.id())
            && let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL)
        {
            log::debug!("killpg {pid}: {e}");
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

pub mod mock {
    use super::{
        Action, ActionKind, ActionResult, CancelHandle, ExecError, Executor, StreamHandle,
        delete_batch,
    };
    use std::{
        sync::{Mutex, mpsc},
        thread,
        time::Duration,
    };

    /// Records executed actions. Deletes of ids in `fail_ids` fail; streams emit
    /// `stream_lines` then finish, or wait for cancellation when `hold_stream` is set.
    #[derive(Default)]
    pub struct MockExecutor {
        pub fail_ids: Vec<String>,
        pub stream_lines: Vec<String>,
        pub hold_stream: bool,
        pub executed: Mutex<Vec<Action>>,
        pub inline: Mutex<Vec<Action>>,
    }

    impl MockExecutor {
        pub fn executed_kinds(&self) -> Vec<ActionKind> {
            self.executed
                .lock()
                .map(|calls| calls.iter().map(|a| a.kind).collect())
                .unwrap_or_default()
        }
    }

    impl Executor for MockExecutor {
        fn execute_sync(&self, action: &Action) -> ActionResult {
            if let Ok(mut calls) = self.executed.lock() {
                calls.push(action.clone());
            }
            if action.kind == ActionKind::DeleteRecycledBatch {
                return delete_batch(self, &action.batch_ids).into_result();
            }
            if self.fail_ids.contains(&action.session_id) {
                return Err(ExecError::Session(format!(
                    "cannot delete {}",
                    action.session_id
                )));
            }
            Ok(())
        }

        fn execute_streaming(&self, action: &Action) -> StreamHandle {
            if let Ok(mut calls) = self.executed.lock() {
                calls.push(action.clone());
            }
            let (line_tx, lines) = mpsc::channel();
            let (done_tx, done) = mpsc::channel();
            let cancel = CancelHandle::new();
            let flag = cancel.clone();
            let stream_lines = self.stream_lines.clone();
            let hold = self.hold_stream;
            thread::spawn(move || {
                for line in stream_lines {
                    let _ = line_tx.send(line);
                }
                while hold && !flag.is_cancelled() {
                    thread::sleep(Duration::from_millis(5));
                }
                drop(line_tx);
                let result = if flag.is_cancelled() {
                    Err(ExecError::Cancelled)
                } else {
                    Ok(())
                };
                let _ = done_tx.send(result);
            });
            StreamHandle {
                lines,
                done,
                cancel,
            }
        }

        fn execute_inline(&self, action: &Action) -> ActionResult {
            if let Ok(mut calls) = self.inline.lock() {
                calls.push(action.clone());
            }
            Ok(())
        }
    }
}
