//! The UI state machine that sequences resolved actions through confirmation,
//! execution, streaming and completion.
//!
//! All transitions live in [`Dispatcher::handle`]: callers deliver a [`DispatchEvent`]
//! and get back the effects to schedule. The dispatcher never performs work itself.

use crate::{
    action::{Action, ActionKind, ActionResult, ResolutionError},
    tree::SessionFilter,
};

/// Which interactive surface is active. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UiState {
    #[default]
    Normal,
    Confirming,
    Loading,
    StreamingOutput,
    PreviewingItem,
    CreatingItem,
    CommandPalette,
    ShowingHelp,
    ShowingNotifications,
    Renaming,
    FormInput,
}

impl UiState {
    pub const ALL: [UiState; 11] = [
        UiState::Normal,
        UiState::Confirming,
        UiState::Loading,
        UiState::StreamingOutput,
        UiState::PreviewingItem,
        UiState::CreatingItem,
        UiState::CommandPalette,
        UiState::ShowingHelp,
        UiState::ShowingNotifications,
        UiState::Renaming,
        UiState::FormInput,
    ];

    /// While blocking, keys go only to the active surface.
    pub fn is_blocking(self) -> bool {
        self != UiState::Normal
    }

    /// Surfaces a resolved action may be submitted from. Submitting closes the surface.
    fn accepts_actions(self) -> bool {
        matches!(
            self,
            UiState::Normal
                | UiState::CommandPalette
                | UiState::FormInput
                | UiState::PreviewingItem
        )
    }

    /// Surfaces opened directly by the operator and closed by cancel or close.
    fn is_surface(self) -> bool {
        matches!(
            self,
            UiState::PreviewingItem
                | UiState::CreatingItem
                | UiState::CommandPalette
                | UiState::ShowingHelp
                | UiState::ShowingNotifications
                | UiState::Renaming
                | UiState::FormInput
        )
    }
}

/// Surfaces that can be opened without resolving an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    PreviewingItem,
    CreatingItem,
    CommandPalette,
    ShowingHelp,
    ShowingNotifications,
    Renaming,
    FormInput,
}

impl From<Surface> for UiState {
    fn from(surface: Surface) -> Self {
        match surface {
            Surface::PreviewingItem => UiState::PreviewingItem,
            Surface::CreatingItem => UiState::CreatingItem,
            Surface::CommandPalette => UiState::CommandPalette,
            Surface::ShowingHelp => UiState::ShowingHelp,
            Surface::ShowingNotifications => UiState::ShowingNotifications,
            Surface::Renaming => UiState::Renaming,
            Surface::FormInput => UiState::FormInput,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmChoice {
    #[default]
    Confirm,
    Cancel,
}

impl ConfirmChoice {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            ConfirmChoice::Confirm => ConfirmChoice::Cancel,
            ConfirmChoice::Cancel => ConfirmChoice::Confirm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    ActionResolved(Action),
    ConfirmToggle,
    ConfirmCommit,
    Cancel,
    /// A synchronous or silent execution finished
    ActionFinished {
        action: Action,
        result: ActionResult,
    },
    StreamLine(String),
    StreamDone(ActionResult),
    Open(Surface),
    /// The active surface finished its own work (rename saved, help dismissed, ...)
    Close,
}

impl DispatchEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchEvent::ActionResolved(_) => "action_resolved",
            DispatchEvent::ConfirmToggle => "confirm_toggle",
            DispatchEvent::ConfirmCommit => "confirm_commit",
            DispatchEvent::Cancel => "cancel",
            DispatchEvent::ActionFinished { .. } => "action_finished",
            DispatchEvent::StreamLine(_) => "stream_line",
            DispatchEvent::StreamDone(_) => "stream_done",
            DispatchEvent::Open(_) => "open",
            DispatchEvent::Close => "close",
        }
    }
}

/// Follow-up work for the caller to schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run in the background with the Loading indicator; report `ActionFinished`
    ExecuteSync(Action),
    /// Run in the background with no visible state; report `ActionFinished`
    ExecuteSilent(Action),
    /// Run on the caller's thread, then terminate the process
    ExecuteInlineAndExit(Action),
    /// Start a streaming execution; report `StreamLine`s then one `StreamDone`
    StartStream(Action),
    CancelStream,
    AppendLine(String),
    StreamCompleted(ActionResult),
    ClearOutput,
    RunBatchDelete(Action),
    ApplyFilter(SessionFilter),
    MoveToActive { forward: bool },
    CycleTheme,
    BeginRename(Action),
    BeginCreate,
    BeginPreview(Action),
    /// Collect form values for the named command before it can be rendered
    BeginForm { command: String, action: Action },
    Notify { level: NoticeLevel, message: String },
    Refresh,
}

/// Owns the current [`UiState`] and the action that state is about.
#[derive(Debug, Default)]
pub struct Dispatcher {
    state: UiState,
    /// Action awaiting confirmation
    pending: Option<Action>,
    choice: ConfirmChoice,
    /// Action shown by Loading or StreamingOutput
    running: Option<Action>,
    stream_done: bool,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> UiState {
        self.state
    }

    pub fn pending(&self) -> Option<&Action> {
        self.pending.as_ref()
    }

    pub fn choice(&self) -> ConfirmChoice {
        self.choice
    }

    pub fn running(&self) -> Option<&Action> {
        self.running.as_ref()
    }

    pub fn stream_done(&self) -> bool {
        self.stream_done
    }

    fn reset(&mut self) {
        self.state = UiState::Normal;
        self.pending = None;
        self.running = None;
        self.choice = ConfirmChoice::default();
        self.stream_done = false;
    }

    /// Apply one event and return the effects it requires.
    pub fn handle(&mut self, event: DispatchEvent) -> Vec<Effect> {
        let from = self.state;
        let kind = event.kind();
        let effects = match (self.state, event) {
            (state, DispatchEvent::ActionResolved(action)) if state.accepts_actions() => {
                self.reset();
                self.on_resolved(action)
            }

            (UiState::Confirming, DispatchEvent::ConfirmToggle) => {
                self.choice = self.choice.toggled();
                Vec::new()
            }
            (UiState::Confirming, DispatchEvent::ConfirmCommit) => {
                let choice = self.choice;
                let pending = self.pending.take();
                self.reset();
                match (choice, pending) {
                    (ConfirmChoice::Confirm, Some(action)) => self.execute(action),
                    _ => Vec::new(),
                }
            }
            (UiState::Confirming, DispatchEvent::Cancel) => {
                self.reset();
                Vec::new()
            }

            (_, DispatchEvent::ActionFinished { action, result }) => {
                // Only the action shown by Loading ends it; silent runs finish on their own
                let finishes_loading =
                    self.state == UiState::Loading && self.running.as_ref() == Some(&action);
                if finishes_loading {
                    self.reset();
                }
                let mut effects = Vec::new();
                match &result {
                    Err(e) => effects.push(Effect::Notify {
                        level: NoticeLevel::Error,
                        message: format!("{}: {e}", action.label()),
                    }),
                    Ok(()) if !action.silent => effects.push(Effect::Notify {
                        level: NoticeLevel::Info,
                        message: format!("{}: done", action.label()),
                    }),
                    Ok(()) => {}
                }
                effects.push(Effect::Refresh);
                effects
            }

            (UiState::StreamingOutput, DispatchEvent::StreamLine(line)) if !self.stream_done => {
                vec![Effect::AppendLine(line)]
            }
            (UiState::StreamingOutput, DispatchEvent::StreamDone(result)) if !self.stream_done => {
                self.stream_done = true;
                let label = self
                    .running
                    .as_ref()
                    .map_or_else(|| "recycle".to_string(), |a| a.label().to_string());
                let mut effects = vec![Effect::StreamCompleted(result.clone())];
                match result {
                    Err(e) if !e.is_cancelled() => effects.push(Effect::Notify {
                        level: NoticeLevel::Error,
                        message: format!("{label}: {e}"),
                    }),
                    Err(_) => {}
                    Ok(()) => effects.push(Effect::Notify {
                        level: NoticeLevel::Info,
                        message: format!("{label}: done"),
                    }),
                }
                effects.push(Effect::Refresh);
                effects
            }
            (UiState::StreamingOutput, DispatchEvent::Cancel) => {
                let still_running = !self.stream_done;
                self.reset();
                if still_running {
                    vec![Effect::CancelStream, Effect::ClearOutput, Effect::Refresh]
                } else {
                    vec![Effect::ClearOutput]
                }
            }
            (UiState::StreamingOutput, DispatchEvent::ConfirmCommit | DispatchEvent::Close)
                if self.stream_done =>
            {
                self.reset();
                vec![Effect::ClearOutput]
            }
            // Lines or completion from a stream that was already cancelled
            (_, DispatchEvent::StreamLine(_) | DispatchEvent::StreamDone(_)) => Vec::new(),

            (UiState::Normal, DispatchEvent::Open(surface)) => {
                self.state = surface.into();
                Vec::new()
            }
            (state, DispatchEvent::Cancel | DispatchEvent::Close) if state.is_surface() => {
                self.reset();
                Vec::new()
            }

            (_, _) => Vec::new(),
        };
        if from != self.state {
            log::debug!("dispatch: {from:?} --{kind}--> {:?}", self.state);
        }
        effects
    }

    fn on_resolved(&mut self, action: Action) -> Vec<Effect> {
        if let Some(error) = &action.resolution_error {
            return match error {
                ResolutionError::FormRequired(command) => {
                    self.state = UiState::FormInput;
                    vec![Effect::BeginForm {
                        command: command.clone(),
                        action,
                    }]
                }
                ResolutionError::Template { .. } => vec![Effect::Notify {
                    level: NoticeLevel::Error,
                    message: error.to_string(),
                }],
            };
        }
        if action.kind == ActionKind::None {
            return Vec::new();
        }
        if action.needs_confirm() {
            self.state = UiState::Confirming;
            self.choice = ConfirmChoice::Confirm;
            self.pending = Some(action);
            return Vec::new();
        }
        self.execute(action)
    }

    /// Start a confirmed (or confirmation-free) action. Expects `Normal`.
    fn execute(&mut self, action: Action) -> Vec<Effect> {
        if action.exit_after {
            return vec![Effect::ExecuteInlineAndExit(action)];
        }
        if let Some(filter) = SessionFilter::from_action(action.kind) {
            return vec![Effect::ApplyFilter(filter)];
        }
        match action.kind {
            ActionKind::None => Vec::new(),
            ActionKind::Recycle => {
                self.state = UiState::StreamingOutput;
                self.stream_done = false;
                self.running = Some(action.clone());
                vec![Effect::ClearOutput, Effect::StartStream(action)]
            }
            ActionKind::DeleteRecycledBatch => {
                self.state = UiState::Loading;
                self.running = Some(action.clone());
                vec![Effect::RunBatchDelete(action)]
            }
            ActionKind::RenameSession => {
                self.state = UiState::Renaming;
                vec![Effect::BeginRename(action)]
            }
            ActionKind::NewSession => {
                self.state = UiState::CreatingItem;
                vec![Effect::BeginCreate]
            }
            ActionKind::ShowMessages => {
                self.state = UiState::ShowingNotifications;
                Vec::new()
            }
            ActionKind::DocReview => {
                self.state = UiState::PreviewingItem;
                vec![Effect::BeginPreview(action)]
            }
            ActionKind::SetTheme => vec![Effect::CycleTheme],
            ActionKind::NextActive => vec![Effect::MoveToActive { forward: true }],
            ActionKind::PrevActive => vec![Effect::MoveToActive { forward: false }],
            ActionKind::Delete | ActionKind::Shell => {
                if action.silent {
                    vec![Effect::ExecuteSilent(action)]
                } else {
                    self.state = UiState::Loading;
                    self.running = Some(action.clone());
                    vec![Effect::ExecuteSync(action)]
                }
            }
            ActionKind::FilterAll
            | ActionKind::FilterActive
            | ActionKind::FilterApproval
            | ActionKind::FilterReady => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{executor::ExecError, template::TemplateError};

    fn action(kind: ActionKind) -> Action {
        Action {
            kind,
            session_id: "1".to_string(),
            ..Action::default()
        }
    }

    fn confirmed(kind: ActionKind) -> Action {
        Action {
            confirm: "Sure?".to_string(),
            ..action(kind)
        }
    }

    fn in_state(state: UiState) -> Dispatcher {
        let mut d = Dispatcher::new();
        match state {
            UiState::Normal => {}
            UiState::Confirming => {
                d.handle(DispatchEvent::ActionResolved(confirmed(ActionKind::Delete)));
            }
            UiState::Loading => {
                d.handle(DispatchEvent::ActionResolved(action(ActionKind::Delete)));
            }
            UiState::StreamingOutput => {
                d.handle(DispatchEvent::ActionResolved(action(ActionKind::Recycle)));
            }
            UiState::PreviewingItem => {
                d.handle(DispatchEvent::Open(Surface::PreviewingItem));
            }
            UiState::CreatingItem => {
                d.handle(DispatchEvent::Open(Surface::CreatingItem));
            }
            UiState::CommandPalette => {
                d.handle(DispatchEvent::Open(Surface::CommandPalette));
            }
            UiState::ShowingHelp => {
                d.handle(DispatchEvent::Open(Surface::ShowingHelp));
            }
            UiState::ShowingNotifications => {
                d.handle(DispatchEvent::Open(Surface::ShowingNotifications));
            }
            UiState::Renaming => {
                d.handle(DispatchEvent::Open(Surface::Renaming));
            }
            UiState::FormInput => {
                d.handle(DispatchEvent::Open(Surface::FormInput));
            }
        }
        assert_eq!(d.state(), state);
        d
    }

    fn sample_events() -> Vec<DispatchEvent> {
        vec![
            DispatchEvent::ActionResolved(action(ActionKind::Shell)),
            DispatchEvent::ConfirmToggle,
            DispatchEvent::ConfirmCommit,
            DispatchEvent::Cancel,
            DispatchEvent::ActionFinished {
                action: action(ActionKind::Delete),
                result: Ok(()),
            },
            DispatchEvent::StreamLine("line".to_string()),
            DispatchEvent::StreamDone(Ok(())),
            DispatchEvent::Open(Surface::ShowingHelp),
            DispatchEvent::Close,
        ]
    }

    /// Expected next state for every (state, event) pair in `sample_events`.
    fn expected(state: UiState, event: &DispatchEvent) -> UiState {
        use DispatchEvent as E;
        use UiState as S;
        match (state, event) {
            (
                S::Normal | S::CommandPalette | S::FormInput | S::PreviewingItem,
                E::ActionResolved(_),
            ) => S::Loading,
            (S::Normal, E::Open(_)) => S::ShowingHelp,
            // The pending action is a non-silent delete
            (S::Confirming, E::ConfirmCommit) => S::Loading,
            (S::Confirming, E::Cancel) => S::Normal,
            (S::Loading, E::ActionFinished { .. }) => S::Normal,
            (S::StreamingOutput, E::Cancel) => S::Normal,
            (
                S::PreviewingItem
                | S::CreatingItem
                | S::CommandPalette
                | S::ShowingHelp
                | S::ShowingNotifications
                | S::Renaming
                | S::FormInput,
                E::Cancel | E::Close,
            ) => S::Normal,
            (state, _) => state,
        }
    }

    #[test]
    fn test_transition_table_is_exhaustive() {
        for state in UiState::ALL {
            for event in sample_events() {
                let mut d = in_state(state);
                let want = expected(state, &event);
                let kind = event.kind();
                d.handle(event);
                assert_eq!(d.state(), want, "{state:?} --{kind}-->");
            }
        }
    }

    #[test]
    fn test_confirm_flow_executes_on_commit() {
        let mut d = Dispatcher::new();
        assert!(d.handle(DispatchEvent::ActionResolved(confirmed(ActionKind::Delete))).is_empty());
        assert_eq!(d.state(), UiState::Confirming);
        assert_eq!(d.choice(), ConfirmChoice::Confirm);
        assert_eq!(d.pending().unwrap().confirm, "Sure?");

        let effects = d.handle(DispatchEvent::ConfirmCommit);
        assert_eq!(d.state(), UiState::Loading);
        assert!(matches!(&effects[..], [Effect::ExecuteSync(a)] if a.kind == ActionKind::Delete));
        assert!(d.pending().is_none());
    }

    #[test]
    fn test_confirm_toggle_then_commit_cancels() {
        let mut d = in_state(UiState::Confirming);
        d.handle(DispatchEvent::ConfirmToggle);
        assert_eq!(d.choice(), ConfirmChoice::Cancel);
        assert!(d.handle(DispatchEvent::ConfirmCommit).is_empty());
        assert_eq!(d.state(), UiState::Normal);
    }

    #[test]
    fn test_cancel_key_cancels_regardless_of_choice() {
        for toggles in 0..2 {
            let mut d = in_state(UiState::Confirming);
            for _ in 0..toggles {
                d.handle(DispatchEvent::ConfirmToggle);
            }
            assert!(d.handle(DispatchEvent::Cancel).is_empty());
            assert_eq!(d.state(), UiState::Normal);
        }
    }

    #[test]
    fn test_confirmed_recycle_streams() {
        let mut d = Dispatcher::new();
        d.handle(DispatchEvent::ActionResolved(confirmed(ActionKind::Recycle)));
        let effects = d.handle(DispatchEvent::ConfirmCommit);
        assert_eq!(d.state(), UiState::StreamingOutput);
        assert!(matches!(effects.last(), Some(Effect::StartStream(_))));
    }

    #[test]
    fn test_stream_lifecycle() {
        let mut d = in_state(UiState::StreamingOutput);
        assert_eq!(
            d.handle(DispatchEvent::StreamLine("fetching".to_string())),
            vec![Effect::AppendLine("fetching".to_string())]
        );
        let effects = d.handle(DispatchEvent::StreamDone(Ok(())));
        assert!(d.stream_done());
        assert_eq!(d.state(), UiState::StreamingOutput);
        assert!(effects.contains(&Effect::StreamCompleted(Ok(()))));
        assert!(effects.contains(&Effect::Refresh));

        // Late lines after completion are dropped
        assert!(d.handle(DispatchEvent::StreamLine("late".to_string())).is_empty());

        assert_eq!(d.handle(DispatchEvent::ConfirmCommit), vec![Effect::ClearOutput]);
        assert_eq!(d.state(), UiState::Normal);
    }

    #[test]
    fn test_stream_cancel_while_running() {
        let mut d = in_state(UiState::StreamingOutput);
        let effects = d.handle(DispatchEvent::Cancel);
        assert_eq!(d.state(), UiState::Normal);
        assert!(effects.contains(&Effect::CancelStream));
        assert!(effects.contains(&Effect::ClearOutput));

        // The cancelled stream's completion arrives later and is ignored
        assert!(d.handle(DispatchEvent::StreamDone(Err(ExecError::Cancelled))).is_empty());
        assert_eq!(d.state(), UiState::Normal);
    }

    #[test]
    fn test_stream_cancelled_result_is_not_an_error_notice() {
        let mut d = in_state(UiState::StreamingOutput);
        let effects = d.handle(DispatchEvent::StreamDone(Err(ExecError::Cancelled)));
        assert!(!effects.iter().any(|e| matches!(e, Effect::Notify { .. })));
    }

    #[test]
    fn test_stream_failure_notifies() {
        let mut d = in_state(UiState::StreamingOutput);
        let effects = d.handle(DispatchEvent::StreamDone(Err(ExecError::Spawn(
            "no git".to_string(),
        ))));
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Notify {
                level: NoticeLevel::Error,
                ..
            }
        )));
    }

    #[test]
    fn test_silent_action_has_no_state_change() {
        let mut d = Dispatcher::new();
        let silent = Action {
            silent: true,
            ..action(ActionKind::Shell)
        };
        let effects = d.handle(DispatchEvent::ActionResolved(silent.clone()));
        assert_eq!(d.state(), UiState::Normal);
        assert_eq!(effects, vec![Effect::ExecuteSilent(silent.clone())]);

        let effects = d.handle(DispatchEvent::ActionFinished {
            action: silent,
            result: Ok(()),
        });
        assert_eq!(effects, vec![Effect::Refresh]);
    }

    #[test]
    fn test_loading_finishes_with_notice() {
        let mut d = in_state(UiState::Loading);
        let effects = d.handle(DispatchEvent::ActionFinished {
            action: action(ActionKind::Delete),
            result: Err(ExecError::Session("gone".to_string())),
        });
        assert_eq!(d.state(), UiState::Normal);
        assert!(matches!(
            &effects[0],
            Effect::Notify { level: NoticeLevel::Error, message } if message.contains("gone")
        ));
        assert_eq!(effects[1], Effect::Refresh);
    }

    #[test]
    fn test_silent_finish_does_not_end_loading() {
        let mut d = in_state(UiState::Loading);
        d.handle(DispatchEvent::ActionFinished {
            action: Action {
                silent: true,
                ..action(ActionKind::Shell)
            },
            result: Ok(()),
        });
        assert_eq!(d.state(), UiState::Loading);
    }

    #[test]
    fn test_silent_finish_of_same_kind_keeps_loading() {
        let mut d = Dispatcher::new();
        let background = Action {
            silent: true,
            shell_cmd: "sleep 5".to_string(),
            ..action(ActionKind::Shell)
        };
        let build = Action {
            shell_cmd: "make build".to_string(),
            ..action(ActionKind::Shell)
        };
        d.handle(DispatchEvent::ActionResolved(background.clone()));
        d.handle(DispatchEvent::ActionResolved(build.clone()));
        assert_eq!(d.state(), UiState::Loading);

        d.handle(DispatchEvent::ActionFinished {
            action: background,
            result: Ok(()),
        });
        assert_eq!(d.state(), UiState::Loading);
        assert_eq!(d.running(), Some(&build));

        d.handle(DispatchEvent::ActionFinished {
            action: build,
            result: Ok(()),
        });
        assert_eq!(d.state(), UiState::Normal);
    }

    #[test]
    fn test_exit_after_short_circuits() {
        let mut d = Dispatcher::new();
        let exiting = Action {
            exit_after: true,
            ..action(ActionKind::Recycle)
        };
        let effects = d.handle(DispatchEvent::ActionResolved(exiting.clone()));
        assert_eq!(effects, vec![Effect::ExecuteInlineAndExit(exiting)]);
        assert_eq!(d.state(), UiState::Normal);
    }

    #[test]
    fn test_exit_after_with_confirm_confirms_first() {
        let mut d = Dispatcher::new();
        let exiting = Action {
            exit_after: true,
            ..confirmed(ActionKind::Shell)
        };
        d.handle(DispatchEvent::ActionResolved(exiting));
        assert_eq!(d.state(), UiState::Confirming);
        let effects = d.handle(DispatchEvent::ConfirmCommit);
        assert!(matches!(&effects[..], [Effect::ExecuteInlineAndExit(_)]));
    }

    #[test]
    fn test_builtin_surfaces() {
        let cases = [
            (ActionKind::RenameSession, UiState::Renaming),
            (ActionKind::NewSession, UiState::CreatingItem),
            (ActionKind::ShowMessages, UiState::ShowingNotifications),
            (ActionKind::DocReview, UiState::PreviewingItem),
            (ActionKind::FilterReady, UiState::Normal),
            (ActionKind::NextActive, UiState::Normal),
            (ActionKind::SetTheme, UiState::Normal),
        ];
        for (kind, state) in cases {
            let mut d = Dispatcher::new();
            d.handle(DispatchEvent::ActionResolved(action(kind)));
            assert_eq!(d.state(), state, "{kind:?}");
        }
    }

    #[test]
    fn test_silent_builtin_effects() {
        let mut d = Dispatcher::new();
        assert_eq!(
            d.handle(DispatchEvent::ActionResolved(action(ActionKind::FilterApproval))),
            vec![Effect::ApplyFilter(SessionFilter::Approval)]
        );
        assert_eq!(
            d.handle(DispatchEvent::ActionResolved(action(ActionKind::PrevActive))),
            vec![Effect::MoveToActive { forward: false }]
        );
        assert_eq!(
            d.handle(DispatchEvent::ActionResolved(action(ActionKind::SetTheme))),
            vec![Effect::CycleTheme]
        );
    }

    #[test]
    fn test_batch_delete_goes_through_confirm_and_loading() {
        let mut d = in_state(UiState::PreviewingItem);
        let batch = Action::delete_recycled_batch(vec!["1".to_string(), "2".to_string()]);
        d.handle(DispatchEvent::ActionResolved(batch));
        assert_eq!(d.state(), UiState::Confirming);
        let effects = d.handle(DispatchEvent::ConfirmCommit);
        assert_eq!(d.state(), UiState::Loading);
        assert!(matches!(&effects[..], [Effect::RunBatchDelete(a)] if a.batch_ids.len() == 2));
        d.handle(DispatchEvent::ActionFinished {
            action: Action::delete_recycled_batch(vec![]),
            result: Ok(()),
        });
        assert_eq!(d.state(), UiState::Normal);
    }

    #[test]
    fn test_inert_action_is_surfaced_not_executed() {
        let mut d = Dispatcher::new();
        let inert = Action {
            resolution_error: Some(ResolutionError::Template {
                command: "push".to_string(),
                source: TemplateError::UnknownField("branch".to_string()),
            }),
            ..action(ActionKind::Shell)
        };
        let effects = d.handle(DispatchEvent::ActionResolved(inert));
        assert_eq!(d.state(), UiState::Normal);
        assert!(matches!(
            &effects[..],
            [Effect::Notify { level: NoticeLevel::Error, message }] if message.contains("branch")
        ));
    }

    #[test]
    fn test_form_required_diverts_to_form_input() {
        let mut d = in_state(UiState::CommandPalette);
        let needs_form = Action {
            resolution_error: Some(ResolutionError::FormRequired("deploy".to_string())),
            ..action(ActionKind::Shell)
        };
        let effects = d.handle(DispatchEvent::ActionResolved(needs_form));
        assert_eq!(d.state(), UiState::FormInput);
        assert!(matches!(&effects[..], [Effect::BeginForm { command, .. }] if command == "deploy"));
    }

    #[test]
    fn test_surfaces_are_mutually_exclusive() {
        let mut d = in_state(UiState::ShowingHelp);
        d.handle(DispatchEvent::Open(Surface::CommandPalette));
        assert_eq!(d.state(), UiState::ShowingHelp);
        d.handle(DispatchEvent::ActionResolved(action(ActionKind::Delete)));
        assert_eq!(d.state(), UiState::ShowingHelp);
    }

    #[test]
    fn test_blocking_states() {
        assert!(!UiState::Normal.is_blocking());
        for state in UiState::ALL.into_iter().skip(1) {
            assert!(state.is_blocking(), "{state:?}");
        }
    }
}
