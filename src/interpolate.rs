//! `{token}` interpolation against local variables and the store.

use crate::store::ResourceStore;
use serde_json::Value;
use std::collections::HashMap;

/// Resolves `{token}` placeholders in configuration strings.
///
/// Tokens resolve in a fixed order that node authors rely on: a local
/// variable first, then a store query. Locals always shadow the store.
/// Unresolvable tokens become the empty string with a logged warning;
/// interpolation never fails a run over a typo.
#[derive(Debug, Clone, Default)]
pub struct StringInterpolator {
    variables: HashMap<String, Value>,
}

impl StringInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a local variable. Locals shadow store queries of the same name.
    pub fn add_variable(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    /// Add several local variables at once.
    pub fn add_variables<I>(&mut self, variables: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.variables.extend(variables);
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Expand every `{...}` token in `template`.
    ///
    /// Tokens are non-nested, shortest match: the scanner pairs a `{`
    /// with the next `}`. An unclosed `{` is literal text.
    pub fn interpolate(&self, template: &str, store: &ResourceStore) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            let (literal, tail) = rest.split_at(open);
            out.push_str(literal);
            match tail[1..].find('}') {
                Some(close) => {
                    let token = &tail[1..1 + close];
                    out.push_str(&self.resolve(token, store));
                    rest = &tail[1 + close + 1..];
                }
                None => {
                    // no closing brace; emit the remainder verbatim
                    out.push_str(tail);
                    return out;
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Resolve one token: local variable, then store query, then empty.
    fn resolve(&self, token: &str, store: &ResourceStore) -> String {
        if let Some(value) = self.variables.get(token) {
            return value_text(value);
        }
        match store.query(token) {
            Ok(result) if !result.is_empty() => result.display_string(),
            Ok(_) => {
                tracing::warn!(token, "interpolation token did not resolve");
                String::new()
            }
            Err(error) => {
                tracing::warn!(token, %error, "interpolation token is not a valid query");
                String::new()
            }
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
