mod cli;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use quay_core::{
    action::Action,
    config::{self, Config},
    executor::{Executor, SessionExecutor},
    session::{FileSessionStore, Session, SessionProvider},
    tmux::{CliTmuxProvider, TmuxProvider},
};
use quay_tui::{OpenAction, Services};
use std::{path::PathBuf, process::ExitCode, sync::Arc};

#[derive(Parser)]
#[command(
    version,
    about = "Terminal control surface for long-lived tmux work sessions"
)]
struct Cli {
    /// Override path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level written to the log file
    #[arg(long, global = true, default_value = logging::DEFAULT_LOG_LEVEL)]
    log_level: log::LevelFilter,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered sessions
    Sessions {
        #[arg(long)]
        json: bool,
    },
    /// List commands with their key bindings
    Commands {
        #[arg(long)]
        json: bool,
    },
    /// Register a new session
    Add {
        name: String,
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        remote: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Run a command against a session
    Run {
        command: String,
        /// Session id, name, or tmux session name
        session: String,
        /// Positional arguments exposed as `args` to the command template
        args: Vec<String>,
        /// Form value as `key=value`; repeatable
        #[arg(long = "form", value_name = "KEY=VALUE")]
        form: Vec<String>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Sessions { .. } => "sessions",
            Commands::Commands { .. } => "commands",
            Commands::Add { .. } => "add",
            Commands::Run { .. } => "run",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_errors = command_wants_json(cli.command.as_ref());

    let surface = cli.command.as_ref().map_or("tui", Commands::name);
    if let Err(error) = logging::setup_logging(cli.log_level, surface) {
        // Logging is best effort; the tool still works without a log file
        eprintln!("warning: logging disabled: {error:#}");
    }

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            log::error!("failed to load config: {error:#}");
            let cli_error = cli::CliError::system(format!("{error:#}"));
            cli::print_error(&cli_error, json_errors);
            return ExitCode::from(2);
        }
    };

    let sessions: Arc<dyn SessionProvider> = Arc::new(FileSessionStore::default_location());
    let tmux: Arc<dyn TmuxProvider> = Arc::new(CliTmuxProvider);
    let executor: Arc<dyn Executor> = Arc::new(SessionExecutor::new(
        Arc::clone(&sessions),
        Arc::clone(&tmux),
        config.session.recycle_commands.clone(),
    ));

    let result = match cli.command {
        Some(Commands::Sessions { json }) => {
            cli::cmd_sessions(sessions.as_ref(), tmux.as_ref(), json)
        }
        Some(Commands::Commands { json }) => cli::cmd_commands(&config, json),
        Some(Commands::Add {
            name,
            path,
            remote,
            json,
        }) => {
            let args = cli::AddArgs {
                name,
                path,
                remote,
                json,
            };
            cli::cmd_add(sessions.as_ref(), &args)
        }
        Some(Commands::Run {
            command,
            session,
            args,
            form,
        }) => {
            let args = cli::RunArgs {
                command,
                session,
                args,
                form,
            };
            cli::cmd_run(
                &config,
                sessions.as_ref(),
                tmux.as_ref(),
                executor.as_ref(),
                &args,
            )
        }
        None => run_tui(config, sessions, tmux, executor).map_err(cli::CliError::from),
    };

    match result {
        Ok(()) => ExitCode::from(0),
        Err(error) => {
            log::error!("{}", error.message());
            cli::print_error(&error, json_errors);
            let code: u8 = match error.code() {
                1 => 1,
                _ => 2,
            };
            ExitCode::from(code)
        }
    }
}

fn run_tui(
    config: Config,
    sessions: Arc<dyn SessionProvider>,
    tmux: Arc<dyn TmuxProvider>,
    executor: Arc<dyn Executor>,
) -> Result<()> {
    let services = Services {
        sessions,
        tmux: Arc::clone(&tmux),
        executor: Arc::clone(&executor),
    };

    let mut terminal = if should_disable_alt_screen() {
        // Inline viewport keeps drawing in the primary screen buffer, which makes
        // tmux capture-pane output usable for automation/debugging.
        ratatui::init_with_options(ratatui::TerminalOptions {
            viewport: ratatui::Viewport::Inline(30),
        })
    } else {
        ratatui::init()
    };
    let result = quay_tui::run(&mut terminal, services, config);
    ratatui::restore();

    match result? {
        OpenAction::Attach { session, window } => attach(tmux.as_ref(), &session, window)?,
        OpenAction::RunAndExit(action) => run_and_exit(executor.as_ref(), &action)?,
        OpenAction::Quit => {}
    }
    Ok(())
}

/// Hand the terminal over to the session's tmux session, creating it if needed.
fn attach(tmux: &dyn TmuxProvider, session: &Session, window: Option<String>) -> Result<()> {
    if !tmux.session_exists(&session.slug) {
        log::info!("creating tmux session {} in {}", session.slug, session.path.display());
        tmux.create_session(&session.slug, &session.path)?;
    }
    let target = match window {
        Some(window) => format!("{}:{window}", session.slug),
        None => session.slug.clone(),
    };
    tmux.switch_to_session(&target);
    Ok(())
}

/// Run an exit-after action with the terminal restored.
fn run_and_exit(executor: &dyn Executor, action: &Action) -> Result<()> {
    log::info!("running {} before exit", action.label());
    executor
        .execute_inline(action)
        .map_err(|e| anyhow::anyhow!("{}: {e}", action.label()))
}

fn command_wants_json(command: Option<&Commands>) -> bool {
    match command {
        Some(
            Commands::Sessions { json }
            | Commands::Commands { json }
            | Commands::Add { json, .. },
        ) => *json,
        Some(Commands::Run { .. }) | None => false,
    }
}

fn should_disable_alt_screen() -> bool {
    match std::env::var("QUAY_NO_ALT_SCREEN") {
        Ok(value) => {
            let value = value.trim().to_ascii_lowercase();
            !matches!(value.as_str(), "" | "0" | "false" | "no" | "off")
        }
        Err(_) => false,
    }
}
