//! Message template rendering.
//!
//! Placeholders use `{name}` syntax and are resolved by literal name lookup
//! in the recipient's context. `{{` and `}}` produce literal braces. Nothing
//! inside the braces is evaluated.

use crate::error::RenderError;
use crate::types::{number_text, Context};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateMode {
    /// Sent as-is to every recipient.
    Literal,
    /// Placeholders are filled from each recipient's context.
    Substituted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    text: String,
    mode: TemplateMode,
}

impl MessageTemplate {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: TemplateMode::Literal,
        }
    }

    pub fn substituted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: TemplateMode::Substituted,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mode(&self) -> TemplateMode {
        self.mode
    }

    /// Distinct placeholder names in order of first appearance.
    /// Literal templates have none.
    pub fn placeholders(&self) -> Result<Vec<String>, RenderError> {
        if self.mode == TemplateMode::Literal {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = Vec::new();
        for segment in parse(&self.text)? {
            if let Segment::Placeholder(name) = segment {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    pub fn render(&self, context: &Context) -> Result<String, RenderError> {
        render(self, context)
    }
}

/// Produce the message body for one recipient.
pub fn render(template: &MessageTemplate, context: &Context) -> Result<String, RenderError> {
    if template.mode == TemplateMode::Literal {
        return Ok(template.text.clone());
    }

    let segments = parse(&template.text)?;
    let mut body = String::with_capacity(template.text.len());
    for segment in segments {
        match segment {
            Segment::Text(text) => body.push_str(text),
            Segment::Placeholder(name) => {
                let value = context
                    .get(name)
                    .ok_or_else(|| RenderError::MissingPlaceholder(name.to_string()))?;
                push_value(&mut body, value);
            }
        }
    }
    Ok(body)
}

fn push_value(body: &mut String, value: &Value) {
    match value {
        Value::String(s) => body.push_str(s),
        Value::Number(n) => body.push_str(&number_text(n)),
        Value::Null => {}
        Value::Bool(b) => body.push_str(if *b { "true" } else { "false" }),
        other => body.push_str(&other.to_string()),
    }
}

enum Segment<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

// Braces are ASCII, so scanning bytes never splits a multi-byte character.
fn parse(text: &str) -> Result<Vec<Segment<'_>>, RenderError> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut run_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                if run_start < i {
                    segments.push(Segment::Text(&text[run_start..i]));
                }
                if bytes.get(i + 1) == Some(&b'{') {
                    segments.push(Segment::Text("{"));
                    i += 2;
                    run_start = i;
                    continue;
                }
                let rest = &text[i + 1..];
                let offset = rest.find(['{', '}']).ok_or(RenderError::Malformed {
                    position: i,
                    reason: "unclosed '{'",
                })?;
                if rest.as_bytes()[offset] == b'{' {
                    return Err(RenderError::Malformed {
                        position: i + 1 + offset,
                        reason: "nested '{' inside placeholder",
                    });
                }
                let name = rest[..offset].trim();
                if name.is_empty() {
                    return Err(RenderError::Malformed {
                        position: i,
                        reason: "empty placeholder name",
                    });
                }
                segments.push(Segment::Placeholder(name));
                i += offset + 2;
                run_start = i;
            }
            b'}' => {
                if bytes.get(i + 1) != Some(&b'}') {
                    return Err(RenderError::Malformed {
                        position: i,
                        reason: "unmatched '}'",
                    });
                }
                if run_start < i {
                    segments.push(Segment::Text(&text[run_start..i]));
                }
                segments.push(Segment::Text("}"));
                i += 2;
                run_start = i;
            }
            _ => i += 1,
        }
    }

    if run_start < bytes.len() {
        segments.push(Segment::Text(&text[run_start..]));
    }
    Ok(segments)
}
