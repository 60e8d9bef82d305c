use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

fn quay_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_quay"))
}

/// Isolated home, config, state and cache directories for one test.
struct TestEnv {
    tmp: tempfile::TempDir,
    work_dir: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let work_dir = tmp.path().join("work").join("api");
        fs::create_dir_all(&work_dir).unwrap();
        fs::create_dir_all(tmp.path().join("config").join("quay")).unwrap();
        Self { tmp, work_dir }
    }

    fn with_config(config: &str) -> Self {
        let env = Self::new();
        fs::write(env.config_file(), config).unwrap();
        env
    }

    fn config_file(&self) -> PathBuf {
        self.tmp.path().join("config").join("quay").join("config.toml")
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(quay_binary())
            .args(args)
            .env("HOME", self.tmp.path())
            .env("XDG_CONFIG_HOME", self.tmp.path().join("config"))
            .env("XDG_STATE_HOME", self.tmp.path().join("state"))
            .env("XDG_CACHE_HOME", self.tmp.path().join("cache"))
            .env_remove("TMUX")
            .output()
            .unwrap()
    }

    fn add_session(&self, name: &str) {
        let path = self.work_dir.to_string_lossy().into_owned();
        let output = self.run(&["add", name, "--path", &path]);
        assert!(output.status.success(), "add failed: {}", stderr(&output));
    }

    fn sessions_json(&self) -> Vec<serde_json::Value> {
        let output = self.run(&["sessions", "--json"]);
        assert!(output.status.success(), "sessions failed: {}", stderr(&output));
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn exists_in(dir: &Path, file: &str) -> bool {
    dir.join(file).exists()
}

#[test]
fn test_cli_add_then_list_sessions() {
    let env = TestEnv::new();
    assert!(env.sessions_json().is_empty());

    env.add_session("quay-it-api");
    let sessions = env.sessions_json();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["name"], "quay-it-api");
    assert_eq!(sessions[0]["state"], "active");
    assert_eq!(sessions[0]["tmux_session"], "quay-it-api");

    let table = stdout(&env.run(&["sessions"]));
    assert!(table.starts_with("id"), "{table}");
    assert!(table.contains("quay-it-api"));
}

#[test]
fn test_cli_add_rejects_missing_directory() {
    let env = TestEnv::new();
    let output = env.run(&["add", "nowhere", "--path", "/definitely/not/a/dir"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("not a directory"));
}

#[test]
fn test_cli_commands_merge_user_config() {
    let env = TestEnv::with_config(
        r#"
        [commands.push]
        sh = "git push"
        help = "push the branch"

        [keybindings]
        P = { cmd = "push" }
        "#,
    );
    let output = env.run(&["commands", "--json"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let commands: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();

    let push = commands.iter().find(|c| c["name"] == "push").unwrap();
    assert_eq!(push["action"], "shell");
    assert_eq!(push["help"], "push the branch");
    assert_eq!(push["keys"], serde_json::json!(["P"]));

    let recycle = commands.iter().find(|c| c["name"] == "recycle").unwrap();
    assert_eq!(recycle["keys"], serde_json::json!(["r"]));
}

#[test]
fn test_cli_run_shell_command_with_args_and_form() {
    let env = TestEnv::with_config(
        r#"
        [commands.mark]
        sh = "touch {{ path | quote }}/marker-{{ args.0 }}-{{ form.suffix }}"
        form = [{ name = "suffix", default = "default" }]
        "#,
    );
    env.add_session("quay-it-mark");

    let output = env.run(&["run", "mark", "quay-it-mark", "one"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(exists_in(&env.work_dir, "marker-one-default"));

    let output = env.run(&["run", "mark", "quay-it-mark", "two", "--form", "suffix=x"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(exists_in(&env.work_dir, "marker-two-x"));
}

#[test]
fn test_cli_run_template_error_is_user_error() {
    let env = TestEnv::with_config(
        r#"
        [commands.first]
        sh = "echo {{ args.0 }}"
        "#,
    );
    env.add_session("quay-it-first");
    let output = env.run(&["run", "first", "quay-it-first"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("first"), "{}", stderr(&output));
}

#[test]
fn test_cli_run_recycle_streams_and_marks_recycled() {
    let env = TestEnv::with_config(
        r#"
        [session]
        recycle_commands = ["echo hello-from-recycle"]
        "#,
    );
    env.add_session("quay-it-recycle");

    let output = env.run(&["run", "recycle", "quay-it-recycle"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("$ echo hello-from-recycle"), "{out}");
    assert!(out.contains("hello-from-recycle"));

    let sessions = env.sessions_json();
    assert_eq!(sessions[0]["state"], "recycled");

    // Only delete applies to a recycled session
    let again = env.run(&["run", "recycle", "quay-it-recycle"]);
    assert_eq!(again.status.code(), Some(1));
    let delete = env.run(&["run", "delete", "quay-it-recycle"]);
    assert!(delete.status.success(), "{}", stderr(&delete));
    assert!(env.sessions_json().is_empty());
}

#[test]
fn test_cli_run_unknown_command_or_session() {
    let env = TestEnv::new();
    env.add_session("quay-it-known");

    let output = env.run(&["run", "nope", "quay-it-known"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("unknown command 'nope'"));

    let output = env.run(&["run", "delete", "missing-session"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("unknown session 'missing-session'"));
}

#[test]
fn test_cli_run_rejects_view_only_commands() {
    let env = TestEnv::new();
    env.add_session("quay-it-view");
    let output = env.run(&["run", "filter-active", "quay-it-view"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_cli_invalid_config_is_system_error() {
    let env = TestEnv::with_config(
        r#"
        [commands.both]
        action = "recycle"
        sh = "echo"
        "#,
    );
    let output = env.run(&["sessions", "--json"]);
    assert_eq!(output.status.code(), Some(2));
    let payload: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert!(
        payload["error"].as_str().unwrap().contains("both"),
        "{payload}"
    );
}

#[test]
fn test_cli_config_override_flag() {
    let env = TestEnv::new();
    let custom = env.tmp.path().join("custom.toml");
    fs::write(&custom, "[commands.hello]\nsh = \"echo hi\"\n").unwrap();
    let custom = custom.to_string_lossy().into_owned();
    let output = env.run(&["--config", &custom, "commands", "--json"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("\"hello\""));
}

#[test]
fn test_cli_writes_log_file() {
    let env = TestEnv::new();
    let output = env.run(&["--log-level", "info", "commands"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(env.tmp.path().join("cache").join("quay").join("quay.log").exists());
}
