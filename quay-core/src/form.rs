use crate::{
    config::{FormField, UiCommand, UserCommand},
    input::TextInput,
};
use std::collections::BTreeMap;

/// What a submitted form is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPurpose {
    /// Render the named command once its values are collected
    Command {
        name: String,
        session_id: String,
        args: Vec<String>,
    },
    /// Register a new session from `name`, `path` and `remote`
    CreateSession,
}

/// Outcome of feeding a command to a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStep {
    Handled,
    Submit,
    Ignored,
}

/// Values being collected for a list of fields, one focused at a time.
#[derive(Debug, Clone)]
pub struct FormState {
    pub purpose: FormPurpose,
    fields: Vec<FormField>,
    inputs: Vec<TextInput>,
    focused: usize,
}

impl FormState {
    pub fn new(purpose: FormPurpose, fields: Vec<FormField>) -> Self {
        let inputs = fields
            .iter()
            .map(|f| TextInput::with_text(&f.default))
            .collect();
        Self {
            purpose,
            fields,
            inputs,
            focused: 0,
        }
    }

    pub fn for_command(
        name: &str,
        command: &UserCommand,
        session_id: &str,
        args: Vec<String>,
    ) -> Self {
        Self::new(
            FormPurpose::Command {
                name: name.to_string(),
                session_id: session_id.to_string(),
                args,
            },
            command.form.clone(),
        )
    }

    /// Fields for a new session, with the path prefilled.
    pub fn for_create(default_path: &str) -> Self {
        let mut path = FormField::new("path", "Path");
        path.default = default_path.to_string();
        Self::new(
            FormPurpose::CreateSession,
            vec![
                FormField::new("name", "Name"),
                path,
                FormField::new("remote", "Remote (optional)"),
            ],
        )
    }

    pub fn fields(&self) -> impl Iterator<Item = (&FormField, &TextInput)> {
        self.fields.iter().zip(&self.inputs)
    }

    pub fn focused(&self) -> usize {
        self.focused
    }

    pub fn is_last(&self) -> bool {
        self.focused + 1 >= self.fields.len()
    }

    pub fn focused_input_mut(&mut self) -> Option<&mut TextInput> {
        self.inputs.get_mut(self.focused)
    }

    pub fn next_field(&mut self) {
        if !self.is_last() {
            self.focused += 1;
        }
    }

    pub fn prev_field(&mut self) {
        self.focused = self.focused.saturating_sub(1);
    }

    pub fn insert_char(&mut self, c: char) {
        if let Some(input) = self.focused_input_mut() {
            input.insert_char(c);
        }
    }

    /// Confirm advances to the next field, and submits from the last one.
    pub fn apply(&mut self, command: UiCommand) -> FormStep {
        match command {
            UiCommand::NextField => self.next_field(),
            UiCommand::PrevField => self.prev_field(),
            UiCommand::Confirm if self.is_last() => return FormStep::Submit,
            UiCommand::Confirm => self.next_field(),
            other => {
                let applied = self.focused_input_mut().is_some_and(|i| i.apply(other));
                if !applied {
                    return FormStep::Ignored;
                }
            }
        }
        FormStep::Handled
    }

    /// Field values keyed by field name, trimmed.
    pub fn values(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .zip(&self.inputs)
            .map(|(f, i)| (f.name.clone(), i.text().trim().to_string()))
            .collect()
    }
}
