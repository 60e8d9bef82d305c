mod actions;
mod spawn;

use crate::{components, theme::Theme};
use crossterm::event::{self, Event, KeyEventKind};
use quay_core::{
    action::Action,
    config::Config,
    dispatch::{DispatchEvent, UiState},
    event::{AppEvent, SessionSnapshot},
    executor::{CancelHandle, Executor},
    keyboard::KeyEvent,
    resolver::Resolver,
    session::{Session, SessionProvider},
    state::AppState,
    tmux::TmuxProvider,
};
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Layout, Rect},
};
use std::{
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    time::{Duration, Instant},
};

/// What to do after the TUI exits
#[derive(Debug)]
pub enum OpenAction {
    Attach {
        session: Session,
        window: Option<String>,
    },
    /// Run the action with the terminal restored, then exit
    RunAndExit(Action),
    Quit,
}

/// Handle for dispatching background work
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<AppEvent>,
    cancel: Arc<AtomicBool>,
}

impl EventSender {
    /// Send an event from a background thread to the main loop
    pub fn send(&self, event: AppEvent) {
        let _ = self.tx.send(event);
    }
}

/// Backends shared between the event loop and background threads.
#[derive(Clone)]
pub struct Services {
    pub sessions: Arc<dyn SessionProvider>,
    pub tmux: Arc<dyn TmuxProvider>,
    pub executor: Arc<dyn Executor>,
}

/// Floor for the poll interval so a zero in config cannot spin.
const MIN_REFRESH_MS: u64 = 200;

pub struct App {
    pub state: AppState,
    services: Services,
    resolver: Resolver,
    config: Config,
    sender: EventSender,
    /// Cancel handle of the stream currently shown, if any
    stream_cancel: Option<CancelHandle>,
    /// Latest poll result, read by the resolver's tool and window lookups
    live: Arc<RwLock<SessionSnapshot>>,
}

impl App {
    pub fn new(services: Services, config: Config, sender: EventSender) -> Self {
        let live = Arc::new(RwLock::new(SessionSnapshot::default()));
        let tools = Arc::clone(&live);
        let windows = Arc::clone(&live);
        let resolver = Resolver::from_config(&config)
            .with_tool_lookup(move |session| {
                tools
                    .read()
                    .map(|snapshot| snapshot.tool_for(&session.id))
                    .unwrap_or_default()
            })
            .with_window_lookup(move |session| {
                windows
                    .read()
                    .map(|snapshot| snapshot.current_window(&session.id))
                    .unwrap_or_default()
            });
        let mut state = AppState::new(config.tui.output_max_lines);
        state.theme = config.theme.preset;
        Self {
            state,
            services,
            resolver,
            config,
            sender,
            stream_cancel: None,
            live,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn start(&self) {
        self.refresh();
        let interval = self.config.tui.refresh_interval_ms.max(MIN_REFRESH_MS);
        spawn::spawn_ticker(&self.sender, Duration::from_millis(interval));
    }

    fn refresh(&self) {
        spawn::spawn_refresh(&self.services.sessions, &self.services.tmux, &self.sender);
    }

    /// Cancel any running stream before the loop exits.
    fn shutdown(&mut self) {
        if let Some(cancel) = self.stream_cancel.take() {
            cancel.cancel();
        }
    }

    /// Handle events from background tasks
    pub fn process_app_event(&mut self, event: AppEvent) -> Option<OpenAction> {
        match event {
            AppEvent::SessionsLoaded(snapshot) => {
                if let Ok(mut live) = self.live.write() {
                    live.clone_from(&snapshot);
                }
                self.state.apply_snapshot(snapshot);
            }
            AppEvent::RefreshFailed(error) => {
                log::warn!("refresh failed: {error}");
                self.state.error = Some(format!("Failed to list sessions: {error}"));
            }
            AppEvent::Tick => self.refresh(),
            AppEvent::ActionFinished { action, result } => {
                return self.dispatch(DispatchEvent::ActionFinished { action, result });
            }
            AppEvent::StreamLine { stream, line } => {
                if self.state.is_current_stream(stream) {
                    return self.dispatch(DispatchEvent::StreamLine(line));
                }
            }
            AppEvent::StreamDone { stream, result } => {
                if self.state.is_current_stream(stream) {
                    self.stream_cancel = None;
                    return self.dispatch(DispatchEvent::StreamDone(result));
                }
                log::debug!("dropping completion of stale stream {stream}");
            }
            AppEvent::PreviewLoaded { title, lines } => {
                if let Some(preview) = self.state.preview.as_mut()
                    && preview.title == title
                {
                    preview.lines = lines;
                    preview.scroll = 0;
                }
            }
        }
        None
    }
}

pub fn run(
    terminal: &mut DefaultTerminal,
    services: Services,
    config: Config,
) -> anyhow::Result<OpenAction> {
    let (tx, rx) = mpsc::channel::<AppEvent>();
    let cancel = Arc::new(AtomicBool::new(false));
    let sender = EventSender {
        tx,
        cancel: Arc::clone(&cancel),
    };
    let mut app = App::new(services, config, sender);
    app.start();
    let spinner_start = Instant::now();

    let outcome = loop {
        terminal.draw(|f| draw(f, &mut app, &spinner_start))?;

        // Check background channel (non-blocking)
        if let Ok(app_event) = rx.try_recv() {
            if let Some(outcome) = app.process_app_event(app_event) {
                break outcome;
            }
            continue;
        }

        // Poll terminal events with a timeout so we can update spinners + check channel
        if event::poll(Duration::from_millis(80))?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if let Some(outcome) = app.handle_key(&KeyEvent::from(key)) {
                break outcome;
            }
        }
    };

    // Signal cancellation to background threads
    cancel.store(true, Ordering::Relaxed);
    app.shutdown();
    Ok(outcome)
}

fn list_rows_from_list_area(list_area: Rect) -> usize {
    usize::from(list_area.height.saturating_sub(2)).max(1)
}

fn draw(f: &mut Frame, app: &mut App, spinner_start: &Instant) {
    let theme = Theme::new(app.state.theme, &app.config.theme);

    let (main_area, error_area) = if app.state.error.is_some() {
        let chunks = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(f.area());
        (chunks[0], Some(chunks[1]))
    } else {
        (f.area(), None)
    };
    app.state.set_page_rows(list_rows_from_list_area(main_area));

    let state = &app.state;
    let keys = &app.config.keys;
    // The session tree stays visible behind every overlay
    components::session_tree::draw(f, main_area, state, &theme, keys);

    match state.ui_state() {
        UiState::Normal => {}
        UiState::Confirming => components::confirm::draw(f, main_area, state, &theme, keys),
        UiState::Loading => components::draw_loading(f, main_area, state, &theme, spinner_start),
        UiState::StreamingOutput => {
            components::output::draw(f, main_area, state, &theme, spinner_start);
        }
        UiState::PreviewingItem => components::preview::draw(f, main_area, state, &theme),
        UiState::CreatingItem | UiState::FormInput => {
            components::form::draw(f, main_area, state, &theme);
        }
        UiState::CommandPalette => components::palette::draw(f, main_area, state, &theme),
        UiState::ShowingHelp => components::help::draw(f, main_area, state, &theme, &app.config),
        UiState::ShowingNotifications => {
            components::notifications::draw(f, main_area, state, &theme);
        }
        UiState::Renaming => components::rename::draw(f, main_area, state, &theme),
    }

    if let Some(area) = error_area {
        components::error_bar::draw(f, area, state, &theme);
    }
}
