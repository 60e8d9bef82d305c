use super::{App, OpenAction, spawn};
use crate::keymap;
use quay_core::{
    action::{Action, ActionKind},
    config::UiCommand,
    dispatch::{DispatchEvent, Effect, NoticeLevel, Surface, UiState},
    form::{FormPurpose, FormState, FormStep},
    input::TextInput,
    keyboard::KeyEvent,
    palette::{CommandPalette, PaletteEntry},
    session::Session,
    state::{Preview, RenameState},
    tree::TreeRow,
};
use std::path::PathBuf;

const PALETTE_SCOPE: &str = "palette";

/// Stand-in for commands that run without a selected session.
fn no_session() -> Session {
    let cwd = std::env::current_dir().unwrap_or_default();
    Session::new("", "", cwd)
}

impl App {
    /// Route one key press to the active surface. Returns an outcome when the loop
    /// should end.
    pub fn handle_key(&mut self, key: &KeyEvent) -> Option<OpenAction> {
        let ui = self.state.ui_state();
        let command = keymap::ui_command(key, ui, &self.config.keys);
        if command == Some(UiCommand::Quit) {
            return Some(OpenAction::Quit);
        }
        // Any handled key press in the list clears a stale error
        if ui == UiState::Normal && command != Some(UiCommand::DismissError) {
            self.state.error = None;
        }

        match ui {
            UiState::Normal => self.handle_normal(key, command),
            UiState::Confirming => match command {
                Some(UiCommand::Confirm) => self.dispatch(DispatchEvent::ConfirmCommit),
                Some(UiCommand::Cancel) => self.dispatch(DispatchEvent::Cancel),
                Some(UiCommand::ToggleChoice) => self.dispatch(DispatchEvent::ConfirmToggle),
                _ => None,
            },
            UiState::Loading => None,
            UiState::StreamingOutput => match command {
                Some(UiCommand::Cancel) => self.dispatch(DispatchEvent::Cancel),
                Some(UiCommand::Confirm) => self.dispatch(DispatchEvent::ConfirmCommit),
                _ => None,
            },
            UiState::CommandPalette => self.handle_palette(key, command),
            UiState::Renaming => self.handle_rename(key, command),
            UiState::CreatingItem | UiState::FormInput => self.handle_form(key, command),
            UiState::ShowingHelp => {
                let scroll = &mut self.state.help_scroll;
                if scroll_by(scroll, command) {
                    return None;
                }
                self.close_on(command)
            }
            UiState::ShowingNotifications => {
                let scroll = &mut self.state.notifications_scroll;
                if scroll_by(scroll, command) {
                    return None;
                }
                self.close_on(command)
            }
            UiState::PreviewingItem => {
                if let Some(preview) = self.state.preview.as_mut()
                    && scroll_by(&mut preview.scroll, command)
                {
                    return None;
                }
                if command.is_some() {
                    return self.close_on(command);
                }
                self.resolve_key(key)
            }
        }
    }

    fn close_on(&mut self, command: Option<UiCommand>) -> Option<OpenAction> {
        match command {
            Some(UiCommand::Cancel) => self.dispatch(DispatchEvent::Cancel),
            Some(UiCommand::Confirm) => self.dispatch(DispatchEvent::Close),
            _ => None,
        }
    }

    fn handle_normal(&mut self, key: &KeyEvent, command: Option<UiCommand>) -> Option<OpenAction> {
        let half_page = isize::try_from(self.state.page_rows() / 2).unwrap_or(1).max(1);
        let page = isize::try_from(self.state.page_rows()).unwrap_or(1);
        match command {
            None => return self.resolve_key(key),
            Some(UiCommand::OpenPalette) => return self.open_palette(),
            Some(UiCommand::ShowHelp) => {
                return self.dispatch(DispatchEvent::Open(Surface::ShowingHelp));
            }
            Some(UiCommand::Attach) => return self.attach_selected(),
            Some(UiCommand::Refresh) => self.refresh(),
            Some(UiCommand::DismissError) => self.state.error = None,
            Some(UiCommand::MoveUp) => self.state.move_selection(-1),
            Some(UiCommand::MoveDown) => self.state.move_selection(1),
            Some(UiCommand::HalfPageUp) => self.state.move_selection(-half_page),
            Some(UiCommand::HalfPageDown) => self.state.move_selection(half_page),
            Some(UiCommand::PageUp) => self.state.move_selection(-page),
            Some(UiCommand::PageDown) => self.state.move_selection(page),
            Some(UiCommand::MoveTop) => self.state.select_first(),
            Some(UiCommand::MoveBottom) => self.state.select_last(),
            Some(_) => {}
        }
        None
    }

    /// Resolve a session keybinding against the current selection.
    fn resolve_key(&mut self, key: &KeyEvent) -> Option<OpenAction> {
        let scope = self.state.view_scope();
        let Some(session) = self.state.selected_session().cloned() else {
            let action = self.resolver.resolve(key, &no_session(), scope)?;
            if action.kind.targets_session() {
                return None;
            }
            return self.dispatch(DispatchEvent::ActionResolved(action));
        };
        if let Some(window) = self.state.selected_window() {
            self.resolver.set_window_override(window);
        }
        let action = self.resolver.resolve(key, &session, scope)?;
        let action = self.capture_recycled_group(action);
        self.dispatch(DispatchEvent::ActionResolved(action))
    }

    /// A delete aimed at a recycled group deletes every session the group showed.
    fn capture_recycled_group(&self, action: Action) -> Action {
        if action.kind != ActionKind::Delete {
            return action;
        }
        let ids = self
            .state
            .preview
            .as_ref()
            .map(|p| p.recycled_ids.clone())
            .filter(|ids| !ids.is_empty())
            .or_else(|| self.state.selected_recycled_ids());
        match ids {
            Some(ids) => Action {
                trigger_key: action.trigger_key,
                ..Action::delete_recycled_batch(ids)
            },
            None => action,
        }
    }

    fn attach_selected(&mut self) -> Option<OpenAction> {
        match self.state.selected_row()? {
            TreeRow::Header { .. } => None,
            TreeRow::RecycledPlaceholder {
                repo_key,
                count,
                sessions,
            } => {
                let noun = if *count == 1 { "session" } else { "sessions" };
                let preview = Preview {
                    title: format!("{count} recycled {noun} in {repo_key}"),
                    lines: sessions
                        .iter()
                        .map(|s| format!("{}  {}", s.name, s.path.display()))
                        .collect(),
                    scroll: 0,
                    recycled_ids: sessions.iter().map(|s| s.id.clone()).collect(),
                };
                let outcome = self.dispatch(DispatchEvent::Open(Surface::PreviewingItem));
                self.state.preview = Some(preview);
                outcome
            }
            TreeRow::SessionRow { .. } | TreeRow::WindowRow { .. } => {
                let session = self.state.selected_session()?.clone();
                let window = self.state.selected_window().map(str::to_string);
                Some(OpenAction::Attach { session, window })
            }
        }
    }

    fn open_palette(&mut self) -> Option<OpenAction> {
        let entries = self
            .resolver
            .commands()
            .iter()
            .filter(|(_, command)| command.in_scope(PALETTE_SCOPE))
            .map(|(name, command)| PaletteEntry {
                name: name.clone(),
                help: command.display_help().to_string(),
            })
            .collect();
        let outcome = self.dispatch(DispatchEvent::Open(Surface::CommandPalette));
        if self.state.ui_state() == UiState::CommandPalette {
            self.state.palette = Some(CommandPalette::new(
                entries,
                self.config.tui.palette_max_visible,
            ));
        }
        outcome
    }

    fn handle_palette(&mut self, key: &KeyEvent, command: Option<UiCommand>) -> Option<OpenAction> {
        match command {
            Some(UiCommand::Cancel) => return self.dispatch(DispatchEvent::Cancel),
            Some(UiCommand::Confirm) => return self.commit_palette(),
            _ => {}
        }
        let Some(palette) = self.state.palette.as_mut() else {
            return self.dispatch(DispatchEvent::Close);
        };
        match command {
            Some(UiCommand::Fill) => palette.fill(),
            Some(UiCommand::MoveUp) => palette.move_up(),
            Some(UiCommand::MoveDown) => palette.move_down(),
            Some(UiCommand::HalfPageUp | UiCommand::PageUp) => palette.move_by(-5),
            Some(UiCommand::HalfPageDown | UiCommand::PageDown) => palette.move_by(5),
            Some(UiCommand::MoveTop) => palette.move_by(isize::MIN / 2),
            Some(UiCommand::MoveBottom) => palette.move_by(isize::MAX / 2),
            Some(other) => {
                palette.edit(other);
            }
            None => {
                if let Some(c) = key.text_char() {
                    palette.insert_char(c);
                }
            }
        }
        None
    }

    fn commit_palette(&mut self) -> Option<OpenAction> {
        let Some((entry, args)) = self.state.palette.as_ref().and_then(CommandPalette::commit)
        else {
            return None;
        };
        let Some(command) = self.resolver.commands().get(&entry.name).cloned() else {
            return self.dispatch(DispatchEvent::Cancel);
        };
        let session = match self.state.selected_session().cloned() {
            Some(session) => session,
            None if command.sh.is_some()
                || command.action.is_some_and(ActionKind::targets_session) =>
            {
                self.state.notify(
                    NoticeLevel::Error,
                    format!("{}: no session selected", entry.name),
                );
                return self.dispatch(DispatchEvent::Cancel);
            }
            None => no_session(),
        };
        if let Some(window) = self.state.selected_window() {
            self.resolver.set_window_override(window);
        }
        let Some(action) = self
            .resolver
            .resolve_user_command(&entry.name, &command, &session, &args)
        else {
            self.state.notify(
                NoticeLevel::Info,
                format!("{} is not available for {}", entry.name, session.name),
            );
            return self.dispatch(DispatchEvent::Cancel);
        };
        let action = self.capture_recycled_group(action);
        self.state.pending_args = args;
        let outcome = self.dispatch(DispatchEvent::ActionResolved(action));
        self.state.pending_args.clear();
        outcome
    }

    fn handle_rename(&mut self, key: &KeyEvent, command: Option<UiCommand>) -> Option<OpenAction> {
        match command {
            Some(UiCommand::Cancel) => return self.dispatch(DispatchEvent::Cancel),
            Some(UiCommand::Confirm) => return self.submit_rename(),
            _ => {}
        }
        let rename = self.state.rename.as_mut()?;
        match command {
            Some(other) => {
                rename.input.apply(other);
            }
            None => {
                if let Some(c) = key.text_char() {
                    rename.input.insert_char(c);
                }
            }
        }
        None
    }

    fn submit_rename(&mut self) -> Option<OpenAction> {
        let rename = self.state.rename.as_ref()?;
        let new_name = rename.input.text().trim().to_string();
        if new_name.is_empty() {
            self.state
                .notify(NoticeLevel::Error, "Session name cannot be empty");
            return None;
        }
        let session_id = rename.session_id.clone();
        let outcome = self.dispatch(DispatchEvent::Close);
        spawn::spawn_rename(
            &self.services.sessions,
            &self.services.tmux,
            &self.sender,
            session_id,
            new_name,
        );
        outcome
    }

    fn handle_form(&mut self, key: &KeyEvent, command: Option<UiCommand>) -> Option<OpenAction> {
        if command == Some(UiCommand::Cancel) {
            return self.dispatch(DispatchEvent::Cancel);
        }
        let form = self.state.form.as_mut()?;
        match command {
            Some(command) => {
                if form.apply(command) == FormStep::Submit {
                    return self.submit_form();
                }
            }
            None => {
                if let Some(c) = key.text_char() {
                    form.insert_char(c);
                }
            }
        }
        None
    }

    fn submit_form(&mut self) -> Option<OpenAction> {
        let form = self.state.form.as_ref()?;
        let values = form.values();
        match form.purpose.clone() {
            FormPurpose::CreateSession => {
                let field = |name: &str| values.get(name).cloned().unwrap_or_default();
                let (name, path, remote) = (field("name"), field("path"), field("remote"));
                if name.is_empty() || path.is_empty() {
                    self.state
                        .notify(NoticeLevel::Error, "Name and path are required");
                    return None;
                }
                let outcome = self.dispatch(DispatchEvent::Close);
                spawn::spawn_create(
                    &self.services.sessions,
                    &self.sender,
                    name,
                    PathBuf::from(path),
                    remote,
                );
                outcome
            }
            FormPurpose::Command {
                name,
                session_id,
                args,
            } => {
                let Some(command) = self.resolver.commands().get(&name).cloned() else {
                    return self.dispatch(DispatchEvent::Close);
                };
                let session = self
                    .state
                    .session(&session_id)
                    .cloned()
                    .unwrap_or_else(no_session);
                match self
                    .resolver
                    .render_with_form_data(&name, &command, &session, &args, &values)
                {
                    Some(action) => self.dispatch(DispatchEvent::ActionResolved(action)),
                    None => self.dispatch(DispatchEvent::Close),
                }
            }
        }
    }

    /// Feed one event to the dispatcher and carry out the effects it returns.
    pub(super) fn dispatch(&mut self, event: DispatchEvent) -> Option<OpenAction> {
        let effects = self.state.dispatcher.handle(event);
        let mut outcome = None;
        for effect in effects {
            if let Some(result) = self.apply_effect(effect) {
                outcome = Some(result);
            }
        }
        self.state.discard_closed_surfaces();
        outcome
    }

    #[allow(clippy::too_many_lines)]
    fn apply_effect(&mut self, effect: Effect) -> Option<OpenAction> {
        match effect {
            Effect::ExecuteSync(action)
            | Effect::ExecuteSilent(action)
            | Effect::RunBatchDelete(action) => {
                spawn::spawn_execution(&self.services.executor, &self.sender, action);
            }
            Effect::ExecuteInlineAndExit(action) => return Some(OpenAction::RunAndExit(action)),
            Effect::StartStream(action) => {
                let stream = self.state.begin_stream();
                self.stream_cancel = Some(spawn::spawn_stream(
                    &self.services.executor,
                    &self.sender,
                    &action,
                    stream,
                ));
            }
            Effect::CancelStream => {
                if let Some(cancel) = self.stream_cancel.take() {
                    cancel.cancel();
                }
            }
            Effect::AppendLine(line) => self.state.output.push(line),
            Effect::StreamCompleted(result) => {
                self.stream_cancel = None;
                let status = match result {
                    Ok(()) => "✓ done".to_string(),
                    Err(e) if e.is_cancelled() => "cancelled".to_string(),
                    Err(e) => format!("✗ {e}"),
                };
                self.state.output.push(status);
            }
            Effect::ClearOutput => self.state.output.clear(),
            Effect::ApplyFilter(filter) => self.state.set_filter(filter),
            Effect::MoveToActive { forward } => {
                if !self.state.move_to_active(forward) {
                    self.state.notify(NoticeLevel::Info, "No active sessions");
                }
            }
            Effect::CycleTheme => {
                self.state.theme = self.state.theme.next();
                log::debug!("theme set to {:?}", self.state.theme);
            }
            Effect::BeginRename(action) => {
                let current = self
                    .state
                    .session(&action.session_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_default();
                self.state.rename = Some(RenameState {
                    session_id: action.session_id,
                    input: TextInput::with_text(&current),
                });
            }
            Effect::BeginCreate => {
                let default_path = self
                    .state
                    .selected_session()
                    .and_then(|s| s.path.parent().map(|p| p.display().to_string()))
                    .or_else(|| {
                        std::env::current_dir()
                            .ok()
                            .map(|p| p.display().to_string())
                    })
                    .unwrap_or_default();
                self.state.form = Some(FormState::for_create(&default_path));
            }
            Effect::BeginPreview(action) => {
                let Some(session) = self.state.session(&action.session_id).cloned() else {
                    return None;
                };
                self.state.preview = Some(Preview {
                    title: session.name.clone(),
                    lines: vec!["Loading…".to_string()],
                    ..Preview::default()
                });
                spawn::spawn_preview(&self.services.tmux, &self.sender, session.name, session.slug);
            }
            Effect::BeginForm { command, action } => {
                let args = std::mem::take(&mut self.state.pending_args);
                match self.resolver.commands().get(&command) {
                    Some(user_command) => {
                        self.state.form = Some(FormState::for_command(
                            &command,
                            user_command,
                            &action.session_id,
                            args,
                        ));
                    }
                    None => log::warn!("form requested for unknown command '{command}'"),
                }
            }
            Effect::Notify { level, message } => {
                match level {
                    NoticeLevel::Info => log::info!("{message}"),
                    NoticeLevel::Error => log::error!("{message}"),
                }
                self.state.notify(level, message);
            }
            Effect::Refresh => self.refresh(),
        }
        None
    }
}

/// Scroll an overlay for list movement commands. Returns true if the command was one.
fn scroll_by(scroll: &mut usize, command: Option<UiCommand>) -> bool {
    match command {
        Some(UiCommand::MoveUp) => *scroll = scroll.saturating_sub(1),
        Some(UiCommand::MoveDown) => *scroll = scroll.saturating_add(1),
        Some(UiCommand::HalfPageUp | UiCommand::PageUp) => *scroll = scroll.saturating_sub(10),
        Some(UiCommand::HalfPageDown | UiCommand::PageDown) => *scroll = scroll.saturating_add(10),
        Some(UiCommand::MoveTop) => *scroll = 0,
        Some(UiCommand::MoveBottom) => *scroll = usize::MAX / 2,
        _ => return false,
    }
    true
}
