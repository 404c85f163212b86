//! Safe placeholder substitution for catalog templates.
//!
//! Rules:
//!
//! - `$name` and `${name}` are replaced when `name` is a known variable.
//!   A name is `[A-Za-z_][A-Za-z0-9_]*`.
//! - Unknown placeholders are left untouched, braces included. Templates are
//!   often filled in more than one pass, so a missing variable is never an
//!   error.
//! - `$$` is an escaped literal `$`.
//! - A `$` that does not start a placeholder is copied as-is.
//!
//! Substituted values are inserted verbatim; no JSON or shell escaping is
//! applied.

use std::collections::BTreeMap;

/// Variable name for the model identifier.
pub const MODEL_NAME: &str = "model_name";
/// Variable name for the query text.
pub const QUERY_TEXT: &str = "query_text";
/// Raw request input (file reference or payload), filled with the query text.
pub const QUERY_INPUT: &str = "query_input";

/// Named values available to [`safe_substitute`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    vars: BTreeMap<String, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// The variables every catalog template understands. `query_input` is
    /// an alias of `query_text`.
    pub fn for_query(model_name: &str, query_text: &str) -> Self {
        Self::new()
            .set(MODEL_NAME, model_name)
            .set(QUERY_TEXT, query_text)
            .set(QUERY_INPUT, query_text)
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

/// Substitute known placeholders in `template`, leaving the rest literal.
pub fn safe_substitute(template: &str, vars: &TemplateVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }

        if let Some(inner) = after.strip_prefix('{') {
            if let Some(close) = inner.find('}') {
                let name = &inner[..close];
                if is_identifier(name) {
                    if let Some(value) = vars.get(name) {
                        out.push_str(value);
                        rest = &inner[close + 1..];
                        continue;
                    }
                }
            }
            out.push('$');
            rest = after;
            continue;
        }

        let len = identifier_len(after);
        if len > 0 {
            if let Some(value) = vars.get(&after[..len]) {
                out.push_str(value);
                rest = &after[len..];
                continue;
            }
        }
        out.push('$');
        rest = after;
    }

    out.push_str(rest);
    out
}

/// Names of all placeholders in `template` that `vars` does not resolve.
pub fn unresolved_placeholders(template: &str, vars: &TemplateVars) -> Vec<String> {
    let mut missing = Vec::new();
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        let after = &rest[pos + 1..];
        if let Some(tail) = after.strip_prefix('$') {
            rest = tail;
            continue;
        }
        let name = match after.strip_prefix('{') {
            Some(inner) => inner
                .find('}')
                .map(|close| &inner[..close])
                .filter(|name| is_identifier(name)),
            None => Some(&after[..identifier_len(after)]).filter(|name| !name.is_empty()),
        };
        if let Some(name) = name {
            if vars.get(name).is_none() && !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
        }
        rest = after;
    }

    missing
}

fn identifier_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(*c == '_' || c.is_ascii_alphanumeric()))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && identifier_len(s) == s.len()
}
