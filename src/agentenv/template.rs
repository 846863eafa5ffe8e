//! Minimal text templater for provider templates.
//!
//! Supports `{{ .path.to.field }}` dereference over a string-keyed value
//! map, the helpers `lower`, `upper`, `trim`, and `join`, and three
//! single-shot fragment injection points. Missing keys render as the
//! empty string; malformed expressions are an error.
//!
//! ```text
//! {{ .project.name }}          dotted dereference
//! {{lower .project.name}}     helper application
//! {{join .project.tags ", "}} list join with separator
//! ```

use anyhow::{bail, Result};
use serde_json::{Map, Value};

const CHUNKS_PLACEHOLDER: &str = "{{ .chunks }}";
const MODES_PLACEHOLDER: &str = "{{ .modes }}";
const WORKFLOWS_PLACEHOLDER: &str = "{{ .workflows }}";

#[derive(Debug, Default)]
pub struct TemplateEngine;

impl TemplateEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate every `{{ … }}` expression in `content` against `ctx`.
    pub fn process(&self, content: &str, ctx: &Map<String, Value>) -> Result<String> {
        let mut output = String::with_capacity(content.len());
        let mut rest = content;

        while let Some(start) = rest.find("{{") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                bail!("failed to parse template: unclosed '{{{{'");
            };
            let expr = after[..end].trim();
            output.push_str(&self.eval(expr, ctx)?);
            rest = &after[end + 2..];
        }
        output.push_str(rest);
        Ok(output)
    }

    fn eval(&self, expr: &str, ctx: &Map<String, Value>) -> Result<String> {
        if expr.is_empty() {
            bail!("failed to parse template: empty expression");
        }

        if let Some(path) = expr.strip_prefix('.') {
            if expr.split_whitespace().count() > 1 {
                bail!("failed to parse template: malformed expression '{}'", expr);
            }
            return Ok(render_value(lookup(ctx, path)));
        }

        let mut parts = expr.splitn(2, char::is_whitespace);
        let helper = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default().trim();

        match helper {
            "lower" => Ok(self.eval(rest, ctx)?.to_lowercase()),
            "upper" => Ok(self.eval(rest, ctx)?.to_uppercase()),
            "trim" => Ok(self.eval(rest, ctx)?.trim().to_string()),
            "join" => {
                let (path, sep) = split_join_args(rest)?;
                let Some(path) = path.strip_prefix('.') else {
                    bail!("failed to parse template: join expects a field, got '{}'", path);
                };
                match lookup(ctx, path) {
                    Some(Value::Array(items)) => Ok(items
                        .iter()
                        .map(render_scalar)
                        .collect::<Vec<_>>()
                        .join(&sep)),
                    Some(other) => Ok(render_scalar(other)),
                    None => Ok(String::new()),
                }
            }
            other => bail!("failed to parse template: unknown helper '{}'", other),
        }
    }

    pub fn inject_chunks(&self, content: &str, chunks: &str) -> String {
        inject(content, chunks, CHUNKS_PLACEHOLDER)
    }

    pub fn inject_modes(&self, content: &str, modes: &str) -> String {
        inject(content, modes, MODES_PLACEHOLDER)
    }

    pub fn inject_workflows(&self, content: &str, workflows: &str) -> String {
        inject(content, workflows, WORKFLOWS_PLACEHOLDER)
    }
}

/// Replace exactly one occurrence of the placeholder.
fn inject(content: &str, payload: &str, placeholder: &str) -> String {
    content.replacen(placeholder, payload, 1)
}

fn lookup<'a>(ctx: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut current: Option<&Value> = None;
    for (i, segment) in path.split('.').enumerate() {
        current = match (i, current) {
            (0, _) => ctx.get(segment),
            (_, Some(Value::Object(map))) => map.get(segment),
            _ => return None,
        };
        current?;
    }
    current
}

fn render_value(value: Option<&Value>) -> String {
    match value {
        Some(v) => render_scalar(v),
        None => String::new(),
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Split `join` arguments: a field path followed by a quoted separator.
fn split_join_args(rest: &str) -> Result<(String, String)> {
    let mut parts = rest.splitn(2, char::is_whitespace);
    let path = parts.next().unwrap_or_default().to_string();
    if path.is_empty() {
        bail!("failed to parse template: join expects a field and a separator");
    }
    let sep = parts.next().unwrap_or("").trim();
    let sep = sep.trim_matches('"').to_string();
    Ok((path, sep))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn dotted_dereference() {
        let engine = TemplateEngine::new();
        let ctx = ctx(json!({"project": {"name": "demo"}}));
        assert_eq!(
            engine.process("name: {{ .project.name }}", &ctx).unwrap(),
            "name: demo"
        );
    }

    #[test]
    fn lower_helper() {
        let engine = TemplateEngine::new();
        let ctx = ctx(json!({"x": "AB"}));
        assert_eq!(engine.process("{{lower .x}}", &ctx).unwrap(), "ab");
    }

    #[test]
    fn upper_and_trim_helpers() {
        let engine = TemplateEngine::new();
        let ctx = ctx(json!({"x": "  ab  "}));
        assert_eq!(engine.process("{{trim .x}}", &ctx).unwrap(), "ab");
        assert_eq!(engine.process("{{upper .x}}", &ctx).unwrap(), "  AB  ");
    }

    #[test]
    fn join_helper() {
        let engine = TemplateEngine::new();
        let ctx = ctx(json!({"tags": ["a", "b", "c"]}));
        assert_eq!(
            engine.process("{{join .tags \", \"}}", &ctx).unwrap(),
            "a, b, c"
        );
    }

    #[test]
    fn missing_key_renders_empty() {
        let engine = TemplateEngine::new();
        let ctx = ctx(json!({}));
        assert_eq!(engine.process("[{{ .nope.deep }}]", &ctx).unwrap(), "[]");
    }

    #[test]
    fn numbers_and_bools_render() {
        let engine = TemplateEngine::new();
        let ctx = ctx(json!({"n": 4, "b": true}));
        assert_eq!(engine.process("{{ .n }}/{{ .b }}", &ctx).unwrap(), "4/true");
    }

    #[test]
    fn unclosed_expression_errors() {
        let engine = TemplateEngine::new();
        assert!(engine.process("{{ .x", &ctx(json!({}))).is_err());
    }

    #[test]
    fn unknown_helper_errors() {
        let engine = TemplateEngine::new();
        assert!(engine.process("{{shout .x}}", &ctx(json!({}))).is_err());
    }

    #[test]
    fn inject_replaces_exactly_once() {
        let engine = TemplateEngine::new();
        assert_eq!(engine.inject_chunks("A {{ .chunks }} B", "X"), "A X B");
        assert_eq!(
            engine.inject_chunks("{{ .chunks }} {{ .chunks }}", "X"),
            "X {{ .chunks }}"
        );
        assert_eq!(engine.inject_modes("A {{ .modes }}", "M"), "A M");
        assert_eq!(engine.inject_workflows("A {{ .workflows }}", "W"), "A W");
    }
}
