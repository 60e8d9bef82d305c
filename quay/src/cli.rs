use quay_core::{
    action::{Action, ActionKind},
    config::Config,
    event::SessionSnapshot,
    executor::{ExecError, Executor},
    resolver::Resolver,
    session::{Session, SessionProvider, SessionState},
    tmux::TmuxProvider,
    tool::{self, ToolStatus},
};
use serde::Serialize;
use std::{collections::BTreeMap, fmt::Write, path::PathBuf};

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Clone)]
pub struct CliError {
    message: String,
    code: i32,
}

impl CliError {
    pub fn user(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 1,
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 2,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> i32 {
        self.code
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(value: anyhow::Error) -> Self {
        Self::system(format!("{value:#}"))
    }
}

impl From<ExecError> for CliError {
    fn from(value: ExecError) -> Self {
        match value {
            ExecError::Unsupported(_) | ExecError::Inert(_) => Self::user(value.to_string()),
            other => Self::system(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AddArgs {
    pub name: String,
    pub path: PathBuf,
    pub remote: Option<String>,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct RunArgs {
    pub command: String,
    pub session: String,
    pub args: Vec<String>,
    /// `key=value` pairs for the command's form fields
    pub form: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct SessionOutput {
    id: String,
    name: String,
    path: PathBuf,
    #[serde(skip_serializing_if = "String::is_empty")]
    remote: String,
    state: SessionState,
    tmux_session: String,
    running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<ToolStatus>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct CommandOutput {
    name: String,
    /// Built-in action tag, or `shell`
    action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sh: Option<String>,
    help: String,
    keys: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    confirm: String,
    silent: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    scope: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    form: Vec<String>,
}

fn session_rows(sessions: Vec<Session>, tmux: &dyn TmuxProvider) -> Vec<SessionOutput> {
    let snapshot = SessionSnapshot::collect(sessions, tmux);
    let mut rows: Vec<SessionOutput> = snapshot
        .sessions
        .iter()
        .map(|session| SessionOutput {
            id: session.id.clone(),
            name: session.name.clone(),
            path: session.path.clone(),
            remote: session.remote.clone(),
            state: session.state,
            tmux_session: session.slug.clone(),
            running: snapshot.windows.contains_key(&session.id),
            tool: snapshot.tools.get(&session.id).cloned(),
            status: snapshot.statuses.get(&session.id).copied(),
        })
        .collect();
    rows.sort_by(|left, right| left.name.cmp(&right.name).then(left.id.cmp(&right.id)));
    rows
}

pub fn cmd_sessions(
    sessions: &dyn SessionProvider,
    tmux: &dyn TmuxProvider,
    json: bool,
) -> CliResult<()> {
    let rows = session_rows(sessions.list_sessions()?, tmux);
    if json {
        print_json(&rows)?;
    } else {
        print!("{}", format_session_table(&rows));
    }
    Ok(())
}

fn command_rows(config: &Config) -> Vec<CommandOutput> {
    config
        .commands
        .iter()
        .map(|(name, command)| CommandOutput {
            name: name.clone(),
            action: command
                .action
                .map_or(ActionKind::Shell.as_str(), ActionKind::as_str)
                .to_string(),
            sh: command.sh.clone(),
            help: command.display_help().to_string(),
            keys: config
                .keybindings
                .keys_for(name)
                .iter()
                .map(ToString::to_string)
                .collect(),
            confirm: command.confirm.clone(),
            silent: command.silent,
            scope: command.scope.clone(),
            form: command.form.iter().map(|f| f.name.clone()).collect(),
        })
        .collect()
}

pub fn cmd_commands(config: &Config, json: bool) -> CliResult<()> {
    let rows = command_rows(config);
    if json {
        print_json(&rows)?;
    } else {
        print!("{}", format_command_table(&rows));
    }
    Ok(())
}

fn add_internal(sessions: &dyn SessionProvider, args: &AddArgs) -> CliResult<Session> {
    let name = args.name.trim();
    if name.is_empty() {
        return Err(CliError::user("session name must not be empty"));
    }
    if !args.path.is_dir() {
        return Err(CliError::user(format!(
            "{} is not a directory",
            args.path.display()
        )));
    }
    let path = dunce::canonicalize(&args.path).unwrap_or_else(|_| args.path.clone());
    let remote = args.remote.as_deref().unwrap_or_default().trim();
    let session = sessions.create_session(name, &path, remote)?;
    log::info!("registered session {} ({})", session.name, session.id);
    Ok(session)
}

pub fn cmd_add(sessions: &dyn SessionProvider, args: &AddArgs) -> CliResult<()> {
    let session = add_internal(sessions, args)?;
    if args.json {
        print_json(&session)?;
    } else {
        println!(
            "Added session {} ({}) at {}",
            session.name,
            session.id,
            session.path.display()
        );
    }
    Ok(())
}

/// Find a session by id, then by name, then by tmux session name.
pub fn find_session(sessions: &[Session], query: &str) -> CliResult<Session> {
    sessions
        .iter()
        .find(|s| s.id == query)
        .or_else(|| sessions.iter().find(|s| s.name == query))
        .or_else(|| sessions.iter().find(|s| s.slug == query))
        .cloned()
        .ok_or_else(|| CliError::user(format!("unknown session '{query}'")))
}

/// Parse `key=value` pairs; the first `=` splits.
fn parse_form_values(pairs: &[String]) -> CliResult<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .filter(|(key, _)| !key.trim().is_empty())
                .map(|(key, value)| (key.trim().to_string(), value.to_string()))
                .ok_or_else(|| {
                    CliError::user(format!("invalid form value '{pair}', expected key=value"))
                })
        })
        .collect()
}

/// Resolve `args.command` for the named session, the way the palette would.
fn resolve_internal(
    config: &Config,
    sessions: &dyn SessionProvider,
    tmux: &dyn TmuxProvider,
    args: &RunArgs,
) -> CliResult<Action> {
    let command = config
        .commands
        .get(&args.command)
        .cloned()
        .ok_or_else(|| CliError::user(format!("unknown command '{}'", args.command)))?;
    let session = find_session(&sessions.list_sessions()?, &args.session)?;

    let tool = tmux
        .pane_command(&session.slug)
        .and_then(|c| tool::detect_tool(&c))
        .map(|t| t.name().to_string())
        .unwrap_or_default();
    let window = tmux.current_window(&session.slug);
    let mut resolver = Resolver::from_config(config)
        .with_tool_lookup(move |_| tool.clone())
        .with_window_lookup(move |_| window.clone());

    let action = if command.requires_form() || !args.form.is_empty() {
        let mut values: BTreeMap<String, String> = command
            .form
            .iter()
            .map(|field| (field.name.clone(), field.default.clone()))
            .collect();
        values.extend(parse_form_values(&args.form)?);
        resolver.render_with_form_data(&args.command, &command, &session, &args.args, &values)
    } else {
        resolver.resolve_user_command(&args.command, &command, &session, &args.args)
    };
    let action = action.ok_or_else(|| {
        CliError::user(format!(
            "command '{}' does not apply to session '{}'",
            args.command, session.name
        ))
    })?;
    if let Some(error) = &action.resolution_error {
        return Err(CliError::user(error.to_string()));
    }
    Ok(action)
}

fn run_internal(
    executor: &dyn Executor,
    action: &Action,
    on_line: &mut dyn FnMut(String),
) -> CliResult<()> {
    match action.kind {
        ActionKind::Recycle => executor.execute_streaming(action).pump(on_line)?,
        ActionKind::Shell => executor.execute_inline(action)?,
        ActionKind::Delete => executor.execute_sync(action)?,
        kind => {
            return Err(CliError::user(format!(
                "{} is only available in the interactive view",
                kind.default_help()
            )));
        }
    }
    Ok(())
}

pub fn cmd_run(
    config: &Config,
    sessions: &dyn SessionProvider,
    tmux: &dyn TmuxProvider,
    executor: &dyn Executor,
    args: &RunArgs,
) -> CliResult<()> {
    let action = resolve_internal(config, sessions, tmux, args)?;
    log::info!("running '{}' for session {}", args.command, action.session_id);
    run_internal(executor, &action, &mut |line| println!("{line}"))?;
    if !action.silent && action.kind != ActionKind::Shell {
        println!("{}: done", action.label());
    }
    Ok(())
}

fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: Vec<&str>| {
        let last = cells.len().saturating_sub(1);
        let mut line = String::new();
        for (i, (cell, width)) in cells.iter().zip(&widths).enumerate() {
            if i == last {
                line.push_str(cell);
            } else {
                let _ = write!(line, "{cell:<width$}  ");
            }
        }
        let _ = writeln!(out, "{}", line.trim_end());
    };
    push_row(headers.to_vec());
    for row in rows {
        push_row(row.iter().map(String::as_str).collect());
    }
    out
}

fn format_session_table(rows: &[SessionOutput]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.id.clone(),
                row.name.clone(),
                row.state.to_string(),
                row.tool.clone().unwrap_or_else(|| "-".to_string()),
                row.status
                    .map_or_else(|| "-".to_string(), |s| s.to_string()),
                row.path.display().to_string(),
            ]
        })
        .collect();
    format_table(&["id", "name", "state", "tool", "status", "path"], &cells)
}

fn format_command_table(rows: &[CommandOutput]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let keys = if row.keys.is_empty() {
                "-".to_string()
            } else {
                row.keys.join(" ")
            };
            vec![row.name.clone(), keys, row.action.clone(), row.help.clone()]
        })
        .collect();
    format_table(&["command", "keys", "action", "help"], &cells)
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!(
        "{}",
        serde_json::to_string(value).map_err(|e| CliError::system(e.to_string()))?
    );
    Ok(())
}

pub fn print_error(error: &CliError, json: bool) {
    if json {
        let payload = serde_json::json!({ "error": error.message() });
        eprintln!("{payload}");
    } else {
        eprintln!("error: {}", error.message());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quay_core::{
        config::load_config_from_str,
        executor::mock::MockExecutor,
        session::mock::MockSessionProvider,
        tmux::{TmuxWindow, mock::MockTmuxProvider},
    };
    use std::collections::HashMap;

    fn sessions() -> MockSessionProvider {
        MockSessionProvider::with_sessions(vec![
            Session::new("1", "Fix Login", "/code/app/fix-login"),
            Session::new("2", "old", "/code/app/old").with_state(SessionState::Recycled),
        ])
    }

    fn run_args(command: &str, session: &str) -> RunArgs {
        RunArgs {
            command: command.to_string(),
            session: session.to_string(),
            args: Vec::new(),
            form: Vec::new(),
        }
    }

    #[test]
    fn find_session_prefers_id_then_name_then_slug() {
        let list = vec![
            Session::new("1", "two", "/a"),
            Session::new("2", "one", "/b"),
            Session::new("3", "Fix Login", "/c"),
        ];
        assert_eq!(find_session(&list, "2").unwrap().name, "one");
        assert_eq!(find_session(&list, "one").unwrap().id, "2");
        assert_eq!(find_session(&list, "fix-login").unwrap().id, "3");
        let error = find_session(&list, "missing").unwrap_err();
        assert_eq!(error.code(), 1);
    }

    #[test]
    fn parse_form_values_splits_on_first_equals() {
        let values =
            parse_form_values(&["env=prod".to_string(), "query=a=b".to_string()]).unwrap();
        assert_eq!(values["env"], "prod");
        assert_eq!(values["query"], "a=b");
        assert!(parse_form_values(&["novalue".to_string()]).is_err());
        assert!(parse_form_values(&["=x".to_string()]).is_err());
    }

    #[test]
    fn resolve_renders_shell_template_with_args() {
        let config = load_config_from_str(
            r#"
            [commands.push]
            sh = "git -C {{ path }} push {{ args }}"
            "#,
        )
        .unwrap();
        let mut args = run_args("push", "Fix Login");
        args.args = vec!["origin".to_string(), "main".to_string()];
        let action =
            resolve_internal(&config, &sessions(), &MockTmuxProvider::default(), &args).unwrap();
        assert_eq!(action.kind, ActionKind::Shell);
        assert_eq!(action.shell_cmd, "git -C /code/app/fix-login push origin main");
    }

    #[test]
    fn resolve_uses_form_defaults_and_overrides() {
        let config = load_config_from_str(
            r#"
            [commands.deploy]
            sh = "deploy --env {{ form.env }} --region {{ form.region }}"
            form = [
                { name = "env", default = "staging" },
                { name = "region" },
            ]
            "#,
        )
        .unwrap();
        let mut args = run_args("deploy", "1");
        args.form = vec!["region=eu".to_string()];
        let action =
            resolve_internal(&config, &sessions(), &MockTmuxProvider::default(), &args).unwrap();
        assert_eq!(action.shell_cmd, "deploy --env staging --region eu");
    }

    #[test]
    fn resolve_reports_template_errors_as_user_errors() {
        let config = load_config_from_str(
            r#"
            [commands.first]
            sh = "echo {{ args.0 }}"
            "#,
        )
        .unwrap();
        let error = resolve_internal(
            &config,
            &sessions(),
            &MockTmuxProvider::default(),
            &run_args("first", "1"),
        )
        .unwrap_err();
        assert_eq!(error.code(), 1);
        assert!(error.message().contains("first"), "{}", error.message());
    }

    #[test]
    fn resolve_rejects_unknown_command_and_recycled_session() {
        let config = Config::default();
        let tmux = MockTmuxProvider::default();
        let unknown = resolve_internal(&config, &sessions(), &tmux, &run_args("nope", "1"));
        assert_eq!(unknown.unwrap_err().code(), 1);

        let recycled = resolve_internal(&config, &sessions(), &tmux, &run_args("recycle", "old"));
        assert!(
            recycled
                .unwrap_err()
                .message()
                .contains("does not apply")
        );
    }

    #[test]
    fn resolve_injects_tool_and_window() {
        let config = load_config_from_str(
            r#"
            [commands.where]
            sh = "echo {{ tool }} {{ window }}"
            "#,
        )
        .unwrap();
        let tmux = MockTmuxProvider {
            sessions: vec!["fix-login".to_string()],
            pane_commands: HashMap::from([("fix-login".to_string(), "claude".to_string())]),
            windows: HashMap::from([(
                "fix-login".to_string(),
                vec![TmuxWindow {
                    index: 1,
                    name: "editor".to_string(),
                    active: true,
                }],
            )]),
            ..MockTmuxProvider::default()
        };
        let action =
            resolve_internal(&config, &sessions(), &tmux, &run_args("where", "1")).unwrap();
        assert_eq!(action.shell_cmd, "echo claude editor");
    }

    #[test]
    fn run_streams_recycle_lines() {
        let executor = MockExecutor {
            stream_lines: vec!["$ git fetch".to_string(), "done".to_string()],
            ..MockExecutor::default()
        };
        let action = Action {
            kind: ActionKind::Recycle,
            session_id: "1".to_string(),
            ..Action::default()
        };
        let mut lines = Vec::new();
        run_internal(&executor, &action, &mut |line| lines.push(line)).unwrap();
        assert_eq!(lines, vec!["$ git fetch", "done"]);
        assert_eq!(executor.executed_kinds(), vec![ActionKind::Recycle]);
    }

    #[test]
    fn run_hands_shell_to_the_terminal_and_rejects_view_actions() {
        let executor = MockExecutor::default();
        let shell = Action {
            kind: ActionKind::Shell,
            shell_cmd: "true".to_string(),
            ..Action::default()
        };
        run_internal(&executor, &shell, &mut |_| {}).unwrap();
        assert_eq!(executor.inline.lock().unwrap().len(), 1);

        let filter = Action {
            kind: ActionKind::FilterActive,
            ..Action::default()
        };
        let error = run_internal(&executor, &filter, &mut |_| {}).unwrap_err();
        assert_eq!(error.code(), 1);
    }

    #[test]
    fn add_rejects_missing_directory() {
        let store = MockSessionProvider::default();
        let error = add_internal(
            &store,
            &AddArgs {
                name: "api".to_string(),
                path: PathBuf::from("/definitely/not/here"),
                remote: None,
                json: false,
            },
        )
        .unwrap_err();
        assert_eq!(error.code(), 1);

        let dir = tempfile::tempdir().unwrap();
        let session = add_internal(
            &store,
            &AddArgs {
                name: " api ".to_string(),
                path: dir.path().to_path_buf(),
                remote: Some("git@example.com:org/api.git".to_string()),
                json: false,
            },
        )
        .unwrap();
        assert_eq!(session.name, "api");
        assert_eq!(session.remote, "git@example.com:org/api.git");
    }

    #[test]
    fn command_rows_include_bindings() {
        let rows = command_rows(&Config::default());
        let recycle = rows.iter().find(|r| r.name == "recycle").unwrap();
        assert_eq!(recycle.action, "recycle");
        assert_eq!(recycle.keys, vec!["r"]);
        assert!(!recycle.confirm.is_empty());
    }

    #[test]
    fn session_table_marks_unknowns() {
        let rows = session_rows(
            vec![Session::new("1", "api", "/code/api")],
            &MockTmuxProvider::default(),
        );
        let table = format_session_table(&rows);
        let mut lines = table.lines();
        assert_eq!(lines.next(), Some("id  name  state   tool  status  path"));
        assert_eq!(lines.next(), Some("1   api   active  -     -       /code/api"));
    }
}
