use regex::Regex;
use std::{collections::BTreeMap, sync::LazyLock};

/// The data exposed to shell command templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateData {
    pub path: String,
    pub remote: String,
    pub id: String,
    pub name: String,
    pub tool: String,
    pub window: String,
    pub args: Vec<String>,
    pub form: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("unknown filter '{0}'")]
    UnknownFilter(String),
    #[error("argument {index} out of range ({count} given)")]
    ArgOutOfRange { index: usize, count: usize },
    #[error("missing form value '{0}'")]
    MissingFormValue(String),
    #[error("unterminated tag at byte {0}")]
    Unterminated(usize),
}

pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, data: &TemplateData) -> Result<String, TemplateError>;
}

/// `{{ field }}` or `{{ field | filter }}`; the field may carry one `.key` suffix.
const TAG_PATTERN: &str =
    r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_-]+)?)\s*(?:\|\s*([A-Za-z_]+)\s*)?\}\}";

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TAG_PATTERN).expect("template tag pattern is valid"));

/// Renders `{{ field }}` and `{{ field | quote }}` tags.
///
/// Fields: `path`, `remote`, `id`, `name`, `tool`, `window`, `args`, `args.N`, `form.KEY`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BraceRenderer;

impl BraceRenderer {
    fn lookup(field: &str, data: &TemplateData) -> Result<String, TemplateError> {
        if let Some((namespace, key)) = field.split_once('.') {
            return match namespace {
                "args" => {
                    let index: usize = key
                        .parse()
                        .map_err(|_| TemplateError::UnknownField(field.to_string()))?;
                    data.args
                        .get(index)
                        .cloned()
                        .ok_or(TemplateError::ArgOutOfRange {
                            index,
                            count: data.args.len(),
                        })
                }
                "form" => data
                    .form
                    .get(key)
                    .cloned()
                    .ok_or_else(|| TemplateError::MissingFormValue(key.to_string())),
                _ => Err(TemplateError::UnknownField(field.to_string())),
            };
        }
        let value = match field {
            "path" => data.path.clone(),
            "remote" => data.remote.clone(),
            "id" => data.id.clone(),
            "name" => data.name.clone(),
            "tool" => data.tool.clone(),
            "window" => data.window.clone(),
            "args" => data.args.join(" "),
            _ => return Err(TemplateError::UnknownField(field.to_string())),
        };
        Ok(value)
    }

    fn apply_filter(
        value: String,
        filter: Option<&str>,
        field: &str,
        data: &TemplateData,
    ) -> Result<String, TemplateError> {
        match filter {
            None => Ok(value),
            // Quote each positional argument separately so they stay distinct words
            Some("quote") if field == "args" => Ok(data
                .args
                .iter()
                .map(|a| shell_quote(a))
                .collect::<Vec<_>>()
                .join(" ")),
            Some("quote") => Ok(shell_quote(&value)),
            Some(other) => Err(TemplateError::UnknownFilter(other.to_string())),
        }
    }
}

impl TemplateRenderer for BraceRenderer {
    fn render(&self, template: &str, data: &TemplateData) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;
        for caps in TAG.captures_iter(template) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let literal = &template[last..whole.start()];
            if let Some(pos) = literal.find("{{") {
                return Err(TemplateError::Unterminated(last + pos));
            }
            out.push_str(literal);
            let field = caps.get(1).map_or("", |m| m.as_str());
            let filter = caps.get(2).map(|m| m.as_str());
            let value = Self::lookup(field, data)?;
            out.push_str(&Self::apply_filter(value, filter, field, data)?);
            last = whole.end();
        }
        let rest = &template[last..];
        if let Some(pos) = rest.find("{{") {
            return Err(TemplateError::Unterminated(last + pos));
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// POSIX single-quote a value unless it is made only of shell-safe characters.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> TemplateData {
        TemplateData {
            path: "/code/app".to_string(),
            remote: "git@host:me/app.git".to_string(),
            id: "3".to_string(),
            name: "fix login".to_string(),
            tool: "claude".to_string(),
            window: "editor".to_string(),
            args: vec!["origin".to_string(), "main branch".to_string()],
            form: BTreeMap::from([("env".to_string(), "staging".to_string())]),
        }
    }

    fn render(t: &str) -> Result<String, TemplateError> {
        BraceRenderer.render(t, &data())
    }

    #[test]
    fn test_plain_fields() {
        assert_eq!(
            render("cd {{ path }} && echo {{id}}-{{ tool }}@{{window}}").unwrap(),
            "cd /code/app && echo 3-claude@editor"
        );
        assert_eq!(render("{{ remote }}").unwrap(), "git@host:me/app.git");
    }

    #[test]
    fn test_args_and_indices() {
        assert_eq!(render("git push {{ args }}").unwrap(), "git push origin main branch");
        assert_eq!(render("{{ args.0 }}").unwrap(), "origin");
        assert_eq!(
            render("{{ args.5 }}"),
            Err(TemplateError::ArgOutOfRange { index: 5, count: 2 })
        );
    }

    #[test]
    fn test_quote_filter() {
        assert_eq!(render("echo {{ name | quote }}").unwrap(), "echo 'fix login'");
        assert_eq!(
            render("run {{ args | quote }}").unwrap(),
            "run origin 'main branch'"
        );
        assert_eq!(render("{{ path|quote }}").unwrap(), "/code/app");
        assert_eq!(
            render("{{ name | upper }}"),
            Err(TemplateError::UnknownFilter("upper".to_string()))
        );
    }

    #[test]
    fn test_form_values() {
        assert_eq!(render("deploy --env {{ form.env }}").unwrap(), "deploy --env staging");
        assert_eq!(
            render("{{ form.region }}"),
            Err(TemplateError::MissingFormValue("region".to_string()))
        );
    }

    #[test]
    fn test_unknown_field() {
        assert_eq!(
            render("{{ branch }}"),
            Err(TemplateError::UnknownField("branch".to_string()))
        );
        assert_eq!(
            render("{{ env.HOME }}"),
            Err(TemplateError::UnknownField("env.HOME".to_string()))
        );
    }

    #[test]
    fn test_unterminated_tag() {
        assert_eq!(render("echo {{ path"), Err(TemplateError::Unterminated(5)));
        assert!(matches!(
            render("{{ bad tag }} {{ path }}"),
            Err(TemplateError::Unterminated(0))
        ));
    }

    #[test]
    fn test_no_tags_is_identity() {
        assert_eq!(render("make test").unwrap(), "make test");
        assert_eq!(render("").unwrap(), "");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("simple"), "simple");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("a b"), "'a b'");
    }
}
