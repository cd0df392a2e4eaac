use tera::{Context, Tera};

use crate::error::{AppError, AppResult};

/// Placeholder operators put in the message template
pub const CHANNELS_PLACEHOLDER: &str = "{{.Channels}}";

const TEMPLATE_NAME: &str = "recommendation";
const CHANNELS_VAR: &str = "channels";

/// A validated, compiled recommendation message template
///
/// Operators write templates in the chat server's plugin syntax. The only
/// action is `{{.Channels}}`; any other `{{` is rejected. Everything else is
/// literal text, including `{%` and `{#`. Literal braces are emitted as Tera
/// string expressions and the placeholder as a Tera variable, so the compiled
/// template can only ever print the channel list.
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    tera: Tera,
}

impl MessageTemplate {
    /// Validates and compiles a template
    pub fn parse(source: &str) -> AppResult<Self> {
        if source.is_empty() {
            return Err(AppError::Config(
                "Empty message template not allowed".to_string(),
            ));
        }

        if !source.contains(CHANNELS_PLACEHOLDER) {
            return Err(AppError::Config(format!(
                "Message template must contain `{}`",
                CHANNELS_PLACEHOLDER
            )));
        }

        let literals: Vec<&str> = source.split(CHANNELS_PLACEHOLDER).collect();
        if literals.iter().any(|text| text.contains("{{")) {
            return Err(AppError::Config(format!(
                "Message template only supports the `{}` action",
                CHANNELS_PLACEHOLDER
            )));
        }

        let translated = literals
            .iter()
            .map(|text| escape_literal(text))
            .collect::<Vec<_>>()
            .join(&format!("{{{{ {} }}}}", CHANNELS_VAR));

        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_template(TEMPLATE_NAME, &translated)
            .map_err(|e| AppError::Config(format!("Invalid message template: {}", e)))?;

        Ok(Self { tera })
    }

    /// Renders the channel handles joined by `", "`
    pub fn render(&self, handles: &[String]) -> AppResult<String> {
        let mut context = Context::new();
        context.insert(CHANNELS_VAR, &handles.join(", "));

        self.tera
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| AppError::Render(e.to_string()))
    }
}

/// Emits every `{` as a Tera string so literal text never opens a tag
fn escape_literal(text: &str) -> String {
    text.replace('{', r#"{{ "{" }}"#)
}
