//! Expression and parameter resolution.
//!
//! A string parameter of the exact form `={{ expr }}` is replaced by the
//! value of `expr`, evaluated with `$json` and `$data` bound to the node's
//! data context. Anything else passes through untouched. Evaluation failures
//! are logged and the original string is kept, so a bad expression never
//! aborts a run.
//!
//! An expression starting with `$json.` or `$data.` is a property path: the
//! rest of the text is read as a key of the context, falling back to a
//! lodash-style path walk. Every other expression goes to the interpreter.

use wfcore::{Map, Value};
use wfexpr::value::truthy;
use wfexpr::{ExprError, Expression, Limits};

const TEMPLATE_OPEN: &str = "={{";
const TEMPLATE_CLOSE: &str = "}}";

/// Evaluates `={{ ... }}` templates against a data context
#[derive(Debug, Clone, Default)]
pub struct ExpressionResolver {
    limits: Limits,
}

impl ExpressionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self { limits }
    }

    /// Resolve a single value; non-strings and non-templates are returned as is
    pub fn resolve(&self, value: &Value, context: &Value) -> Value {
        let Value::String(text) = value else {
            return value.clone();
        };
        let Some(expr) = template_body(text) else {
            return value.clone();
        };
        // `={{ }}` evaluates an empty function body
        if expr.is_empty() {
            return Value::Null;
        }

        let result = match context_path(expr) {
            Some(path) => lookup_path(context, path),
            None => self.evaluate(expr, context),
        };
        match result {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::warn!(
                    expression = %expr,
                    error = %err,
                    "Expression evaluation failed, keeping the literal value"
                );
                value.clone()
            }
        }
    }

    /// Resolve every string leaf of a parameter tree. Keys are never templated.
    pub fn resolve_parameters(&self, parameters: &Map<String, Value>, context: &Value) -> Map<String, Value> {
        parameters
            .iter()
            .map(|(key, value)| (key.clone(), self.resolve_tree(value, context)))
            .collect()
    }

    fn resolve_tree(&self, value: &Value, context: &Value) -> Value {
        match value {
            Value::String(_) => self.resolve(value, context),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.resolve_tree(item, context))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(self.resolve_parameters(map, context)),
            other => other.clone(),
        }
    }

    fn evaluate(&self, expr: &str, context: &Value) -> Result<Value, ExprError> {
        Expression::parse(expr)?.evaluate_with_limits(
            [("$json", context.clone()), ("$data", context.clone())],
            self.limits,
        )
    }
}

/// Inner text of a single-line `={{ ... }}` template, trimmed
fn template_body(text: &str) -> Option<&str> {
    let inner = text
        .strip_prefix(TEMPLATE_OPEN)?
        .strip_suffix(TEMPLATE_CLOSE)?;
    if inner.is_empty() || inner.contains(['\n', '\r', '\u{2028}', '\u{2029}']) {
        return None;
    }
    Some(inner.trim())
}

/// Text after `$json.` / `$data.`, if the expression is a property path
fn context_path(expr: &str) -> Option<&str> {
    expr.strip_prefix("$json.")
        .or_else(|| expr.strip_prefix("$data."))
}

/// Read `path` from the context: a key spelled exactly like the path wins when
/// its value is truthy, otherwise the path is walked segment by segment and
/// anything unreachable is null. A null context cannot be read at all.
fn lookup_path(context: &Value, path: &str) -> Result<Value, ExprError> {
    if context.is_null() {
        return Err(ExprError::Runtime(format!(
            "Cannot read properties of null (reading '{}')",
            path
        )));
    }
    if let Some(value) = property(context, path).filter(truthy) {
        return Ok(value);
    }

    let mut current = context.clone();
    for segment in path_segments(path) {
        match property(&current, &segment) {
            Some(next) => current = next,
            None => return Ok(Value::Null),
        }
    }
    Ok(current)
}

/// One property read: object keys, array indices, string characters and
/// `length` on arrays and strings
fn property(value: &Value, key: &str) -> Option<Value> {
    match value {
        Value::Object(map) => map.get(key).cloned(),
        Value::Array(items) if key == "length" => Some(Value::from(items.len())),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i).cloned()),
        Value::String(s) if key == "length" => Some(Value::from(s.chars().count())),
        Value::String(s) => key
            .parse::<usize>()
            .ok()
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string())),
        _ => None,
    }
}

/// Split `a.b[0]["c.d"]` into `a`, `b`, `0`, `c.d`
fn path_segments(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut after_bracket = false;
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '.' if after_bracket => after_bracket = false,
            '.' => segments.push(std::mem::take(&mut current)),
            '[' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                let mut key = String::new();
                for k in chars.by_ref() {
                    if k == ']' {
                        break;
                    }
                    key.push(k);
                }
                let unquoted = ['"', '\'']
                    .iter()
                    .find_map(|q| key.strip_prefix(*q).and_then(|k| k.strip_suffix(*q)))
                    .map(str::to_string);
                segments.push(unquoted.unwrap_or(key));
                after_bracket = true;
            }
            other => {
                after_bracket = false;
                current.push(other);
            }
        }
    }
    if !after_bracket {
        segments.push(current);
    }
    segments
}
