use crate::{
    action::{Action, ActionKind, ResolutionError},
    config::{CommandMap, Config, KeybindingsConfig, UserCommand},
    keyboard::KeyEvent,
    session::Session,
    template::{BraceRenderer, TemplateData, TemplateRenderer},
};
use std::collections::BTreeMap;

/// Live per-session value injected into template data.
pub type SessionLookup = Box<dyn Fn(&Session) -> String + Send + Sync>;

/// Where a resolution started from, with any keybinding-local overrides.
struct Trigger<'a> {
    key: String,
    help: &'a str,
    confirm: &'a str,
    /// `None` skips the scope check
    view_scope: Option<&'a str>,
}

/// Turns key presses and command names into executable [`Action`]s.
///
/// Resolution never fails loudly: anything that cannot apply yields `None`, and a
/// binding that applies but cannot render yields an inert action carrying the error.
pub struct Resolver {
    commands: CommandMap,
    keybindings: KeybindingsConfig,
    renderer: Box<dyn TemplateRenderer>,
    tool_lookup: SessionLookup,
    window_lookup: SessionLookup,
    window_override: Option<String>,
}

impl Resolver {
    pub fn new(commands: CommandMap, keybindings: KeybindingsConfig) -> Self {
        Self {
            commands,
            keybindings,
            renderer: Box::new(BraceRenderer),
            tool_lookup: Box::new(|_| String::new()),
            window_lookup: Box::new(|_| String::new()),
            window_override: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.commands.clone(), config.keybindings.clone())
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Box<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    #[must_use]
    pub fn with_tool_lookup(
        mut self,
        lookup: impl Fn(&Session) -> String + Send + Sync + 'static,
    ) -> Self {
        self.tool_lookup = Box::new(lookup);
        self
    }

    #[must_use]
    pub fn with_window_lookup(
        mut self,
        lookup: impl Fn(&Session) -> String + Send + Sync + 'static,
    ) -> Self {
        self.window_lookup = Box::new(lookup);
        self
    }

    pub fn commands(&self) -> &CommandMap {
        &self.commands
    }

    pub fn keybindings(&self) -> &KeybindingsConfig {
        &self.keybindings
    }

    /// Window name used by the next resolve call only, in place of the lookup.
    pub fn set_window_override(&mut self, window: impl Into<String>) {
        self.window_override = Some(window.into());
    }

    /// Take the pending window override, leaving none behind.
    pub fn consume_window_override(&mut self) -> Option<String> {
        self.window_override.take()
    }

    /// Resolve a key press against the keybindings for `session` in `view_scope`.
    pub fn resolve(
        &mut self,
        key: &KeyEvent,
        session: &Session,
        view_scope: &str,
    ) -> Option<Action> {
        let window_override = self.consume_window_override();
        let binding = self.keybindings.get(key)?;
        let Some(command) = self.commands.get(&binding.cmd) else {
            log::warn!(
                "key {key} is bound to unknown command '{}'; ignoring",
                binding.cmd
            );
            return None;
        };
        let trigger = Trigger {
            key: key.to_string(),
            help: &binding.help,
            confirm: &binding.confirm,
            view_scope: Some(view_scope),
        };
        self.build(
            &binding.cmd,
            command,
            &trigger,
            session,
            &[],
            None,
            window_override,
        )
    }

    /// Resolve an explicitly chosen command with positional arguments, as typed in the
    /// palette or on the command line.
    pub fn resolve_user_command(
        &mut self,
        name: &str,
        command: &UserCommand,
        session: &Session,
        args: &[String],
    ) -> Option<Action> {
        let window_override = self.consume_window_override();
        let trigger = Trigger {
            key: format!(":{name}"),
            help: "",
            confirm: "",
            view_scope: None,
        };
        self.build(name, command, &trigger, session, args, None, window_override)
    }

    /// Like [`Resolver::resolve_user_command`], with collected form values exposed
    /// under `form.*`.
    pub fn render_with_form_data(
        &mut self,
        name: &str,
        command: &UserCommand,
        session: &Session,
        args: &[String],
        form: &BTreeMap<String, String>,
    ) -> Option<Action> {
        let window_override = self.consume_window_override();
        let trigger = Trigger {
            key: format!(":{name}"),
            help: "",
            confirm: "",
            view_scope: None,
        };
        self.build(
            name,
            command,
            &trigger,
            session,
            args,
            Some(form),
            window_override,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &self,
        name: &str,
        command: &UserCommand,
        trigger: &Trigger<'_>,
        session: &Session,
        args: &[String],
        form: Option<&BTreeMap<String, String>>,
        window_override: Option<String>,
    ) -> Option<Action> {
        if let Some(view) = trigger.view_scope
            && !command.in_scope(view)
        {
            log::debug!("command '{name}' is not in scope for view '{view}'");
            return None;
        }
        if session.is_recycled() && command.action != Some(ActionKind::Delete) {
            log::debug!("command '{name}' ignored for recycled session {}", session.id);
            return None;
        }

        let pick = |local: &str, own: &str| {
            if local.is_empty() { own } else { local }.to_string()
        };
        let mut action = Action {
            trigger_key: trigger.key.clone(),
            help: pick(trigger.help, &command.help),
            confirm: pick(trigger.confirm, &command.confirm),
            session_id: session.id.clone(),
            session_path: session.path.clone(),
            silent: command.silent,
            exit_after: command.exit.evaluate(),
            ..Action::default()
        };

        if let Some(kind) = command.action {
            action.kind = kind;
            if action.help.is_empty() {
                action.help = kind.default_help().to_string();
            }
            log::debug!("resolved '{name}' to {kind}");
            return Some(action);
        }

        let template = command.sh.as_deref()?;
        action.kind = ActionKind::Shell;
        if action.help.is_empty() {
            action.help = name.to_string();
        }
        if command.requires_form() && form.is_none() {
            action.resolution_error = Some(ResolutionError::FormRequired(name.to_string()));
            return Some(action);
        }

        let data = TemplateData {
            path: session.path.to_string_lossy().into_owned(),
            remote: session.remote.clone(),
            id: session.id.clone(),
            name: session.name.clone(),
            tool: (self.tool_lookup)(session),
            window: window_override.unwrap_or_else(|| (self.window_lookup)(session)),
            args: args.to_vec(),
            form: form.cloned().unwrap_or_default(),
        };
        match self.renderer.render(template, &data) {
            Ok(rendered) => {
                log::debug!("resolved '{name}' to `{rendered}`");
                action.shell_cmd = rendered;
            }
            Err(source) => {
                log::debug!("failed to render '{name}': {source}");
                action.resolution_error = Some(ResolutionError::Template {
                    command: name.to_string(),
                    source,
                });
            }
        }
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{ExitCondition, FormField, Keybinding, default_commands},
        session::SessionState,
        template::TemplateError,
    };

    fn key(token: &str) -> KeyEvent {
        token.parse().unwrap()
    }

    fn session() -> Session {
        Session::new("42", "Fix Login", "/code/app/fix-login").with_remote("git@host:me/app.git")
    }

    fn resolver_with(
        commands: &[(&str, UserCommand)],
        bindings: &[(&str, Keybinding)],
    ) -> Resolver {
        let mut map = default_commands();
        for (name, cmd) in commands {
            map.insert((*name).to_string(), cmd.clone());
        }
        let mut keybindings = KeybindingsConfig::default();
        for (token, binding) in bindings {
            keybindings.0.insert(key(token), binding.clone());
        }
        Resolver::new(map, keybindings)
            .with_tool_lookup(|_| "claude".to_string())
            .with_window_lookup(|s| format!("{}:main", s.slug))
    }

    #[test]
    fn test_unbound_key_is_not_applicable() {
        let mut r = resolver_with(&[], &[]);
        assert!(r.resolve(&key("z"), &session(), "sessions").is_none());
    }

    #[test]
    fn test_dangling_reference_is_not_applicable() {
        let mut r = resolver_with(&[], &[("x", Keybinding::new("missing"))]);
        assert!(r.resolve(&key("x"), &session(), "sessions").is_none());
    }

    #[test]
    fn test_builtin_with_default_help_and_confirm() {
        let mut r = resolver_with(&[], &[]);
        let action = r.resolve(&key("d"), &session(), "sessions").unwrap();
        assert_eq!(action.kind, ActionKind::Delete);
        assert_eq!(action.help, "delete");
        assert_eq!(action.confirm, "Delete this session?");
        assert_eq!(action.trigger_key, "d");
        assert_eq!(action.session_id, "42");
        assert!(action.needs_confirm());
        assert!(action.shell_cmd.is_empty());
    }

    #[test]
    fn test_keybinding_overrides_win() {
        let mut r = resolver_with(
            &[(
                "push",
                UserCommand::shell("git push").with_help("push it").with_confirm("Push?"),
            )],
            &[
                ("p", Keybinding::new("push").with_help("ship").with_confirm("Ship?")),
                ("P", Keybinding::new("push")),
                ("D", Keybinding::new("delete").with_help("remove")),
            ],
        );
        let local = r.resolve(&key("p"), &session(), "sessions").unwrap();
        assert_eq!(local.help, "ship");
        assert_eq!(local.confirm, "Ship?");

        let inherited = r.resolve(&key("P"), &session(), "sessions").unwrap();
        assert_eq!(inherited.help, "push it");
        assert_eq!(inherited.confirm, "Push?");

        let builtin = r.resolve(&key("D"), &session(), "sessions").unwrap();
        assert_eq!(builtin.help, "remove");
    }

    #[test]
    fn test_scope_matching() {
        let mut r = resolver_with(
            &[
                ("only-review", UserCommand::shell("true").with_scope(&["review"])),
                (
                    "review-or-global",
                    UserCommand::shell("true").with_scope(&["review", "global"]),
                ),
            ],
            &[
                ("a", Keybinding::new("only-review")),
                ("b", Keybinding::new("review-or-global")),
            ],
        );
        assert!(r.resolve(&key("a"), &session(), "review").is_some());
        for view in ["sessions", "palette", ""] {
            assert!(r.resolve(&key("a"), &session(), view).is_none(), "{view}");
            assert!(r.resolve(&key("b"), &session(), view).is_some(), "{view}");
        }
    }

    #[test]
    fn test_recycled_session_only_accepts_delete() {
        let mut r = resolver_with(
            &[("echo", UserCommand::shell("echo {{ id }}"))],
            &[("e", Keybinding::new("echo"))],
        );
        let recycled = session().with_state(SessionState::Recycled);
        let keys: Vec<KeyEvent> = r.keybindings().iter().map(|(k, _)| *k).collect();
        for k in keys {
            let resolved = r.resolve(&k, &recycled, "sessions");
            let is_delete = r
                .keybindings()
                .get(&k)
                .and_then(|b| r.commands().get(&b.cmd))
                .is_some_and(|c| c.action == Some(ActionKind::Delete));
            assert_eq!(resolved.is_some(), is_delete, "key {k}");
        }
    }

    #[test]
    fn test_shell_template_renders_session_context() {
        let mut r = resolver_with(
            &[(
                "open",
                UserCommand::shell(
                    "cd {{ path | quote }} && echo {{ name }} {{ tool }} {{ window }}",
                ),
            )],
            &[("o", Keybinding::new("open"))],
        );
        let action = r.resolve(&key("o"), &session(), "sessions").unwrap();
        assert_eq!(action.kind, ActionKind::Shell);
        assert_eq!(
            action.shell_cmd,
            "cd /code/app/fix-login && echo Fix Login claude fix-login:main"
        );
        assert_eq!(action.help, "open");
        assert!(action.resolution_error.is_none());
    }

    #[test]
    fn test_template_failure_is_carried_not_raised() {
        let mut r = resolver_with(
            &[("bad", UserCommand::shell("echo {{ nope }}"))],
            &[("b", Keybinding::new("bad"))],
        );
        let action = r.resolve(&key("b"), &session(), "sessions").unwrap();
        assert_eq!(action.kind, ActionKind::Shell);
        assert!(action.shell_cmd.is_empty());
        assert!(action.is_inert());
        assert_eq!(
            action.resolution_error,
            Some(ResolutionError::Template {
                command: "bad".to_string(),
                source: TemplateError::UnknownField("nope".to_string()),
            })
        );
    }

    #[test]
    fn test_window_override_is_consumed_once() {
        let mut r = resolver_with(
            &[("win", UserCommand::shell("echo {{ window }}"))],
            &[("w", Keybinding::new("win"))],
        );
        r.set_window_override("editor");
        let first = r.resolve(&key("w"), &session(), "sessions").unwrap();
        let second = r.resolve(&key("w"), &session(), "sessions").unwrap();
        assert_eq!(first.shell_cmd, "echo editor");
        assert_eq!(second.shell_cmd, "echo fix-login:main");
    }

    #[test]
    fn test_window_override_cleared_even_when_not_applicable() {
        let mut r = resolver_with(
            &[("win", UserCommand::shell("echo {{ window }} {{ missing }}"))],
            &[("w", Keybinding::new("win"))],
        );
        r.set_window_override("editor");
        assert!(r.resolve(&key("z"), &session(), "sessions").is_none());
        assert_eq!(r.consume_window_override(), None);

        r.set_window_override("editor");
        let failed = r.resolve(&key("w"), &session(), "sessions").unwrap();
        assert!(failed.is_inert());
        assert_eq!(r.consume_window_override(), None);
    }

    #[test]
    fn test_user_command_exposes_args() {
        let mut r = resolver_with(&[], &[]);
        let cmd = UserCommand::shell("git push {{ args.0 }} {{ args | quote }}");
        let args = vec!["origin".to_string(), "main branch".to_string()];
        let action = r.resolve_user_command("push", &cmd, &session(), &args).unwrap();
        assert_eq!(action.shell_cmd, "git push origin origin 'main branch'");
        assert_eq!(action.trigger_key, ":push");

        let missing = r.resolve_user_command("push", &cmd, &session(), &[]).unwrap();
        assert_eq!(
            missing.resolution_error,
            Some(ResolutionError::Template {
                command: "push".to_string(),
                source: TemplateError::ArgOutOfRange { index: 0, count: 0 },
            })
        );
    }

    #[test]
    fn test_form_command_diverts_without_form_data() {
        let mut r = resolver_with(&[], &[]);
        let cmd = UserCommand::shell("deploy --env {{ form.env }}")
            .with_form(vec![FormField::new("env", "Environment")]);
        let diverted = r.resolve_user_command("deploy", &cmd, &session(), &[]).unwrap();
        assert_eq!(
            diverted.resolution_error,
            Some(ResolutionError::FormRequired("deploy".to_string()))
        );
        assert!(diverted.shell_cmd.is_empty());

        let form = BTreeMap::from([("env".to_string(), "staging".to_string())]);
        let rendered = r
            .render_with_form_data("deploy", &cmd, &session(), &[], &form)
            .unwrap();
        assert_eq!(rendered.shell_cmd, "deploy --env staging");
        assert!(!rendered.is_inert());
    }

    #[test]
    fn test_exit_condition_and_silent_are_seeded() {
        let mut cmd = UserCommand::shell("tmux attach").silent();
        cmd.exit = ExitCondition::Always;
        let mut r = resolver_with(&[("go", cmd)], &[("g", Keybinding::new("go"))]);
        let action = r.resolve(&key("g"), &session(), "sessions").unwrap();
        assert!(action.exit_after);
        assert!(action.silent);
    }

    #[test]
    fn test_command_without_action_or_template_is_not_applicable() {
        let mut r = resolver_with(
            &[("empty", UserCommand::default())],
            &[("e", Keybinding::new("empty"))],
        );
        assert!(r.resolve(&key("e"), &session(), "sessions").is_none());
    }
}
