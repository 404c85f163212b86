//! Response verification.
//!
//! Three outcomes are checked:
//!
//! - **structured text**: the catalog entry maps `response_text` to a key;
//!   the key is looked up in the parsed result and compared.
//! - **streaming text**: no structured key; every `generated_text` value in
//!   the raw output is concatenated and compared.
//! - **denied**: the call was made without valid credentials; the
//!   `x-ext-auth-reason` header must explain why.
//!
//! Every failure logs the full response before returning the error.

use std::collections::VecDeque;
use std::sync::{Arc, LazyLock};

use iqe_core::catalog::CatalogEntry;
use iqe_core::template::{safe_substitute, TemplateVars};
use iqe_core::{DefaultQuery, Error, Result};
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::{debug, error};

use crate::response::{InferenceResult, OUTPUT_KEY};

static STREAMING_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"generated_text":\s*"((?:[^"\\]|\\.)*)""#).expect("streaming text regex is valid")
});

static AUTH_REASON: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"x-ext-auth-reason:[ \t]*([^\r\n]*)")
        .case_insensitive(true)
        .build()
        .expect("auth reason regex is valid")
});

static NOT_AUTHORIZED: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"not (authenticated|authorized)")
        .case_insensitive(true)
        .build()
        .expect("auth denial regex is valid")
});

const CREDENTIAL_NOT_FOUND: &str = "credential not found";

/// What a call is expected to produce.
#[derive(Debug, Clone)]
pub enum Expectation {
    /// Exact response text.
    Text(String),
    /// Response text (or the raw output when the runtime has no text field)
    /// must match.
    Pattern(Regex),
    /// The call must be rejected by the auth proxy.
    Denied,
}

impl Expectation {
    pub fn text(expected: impl Into<String>) -> Self {
        Self::Text(expected.into())
    }

    /// Expectation of a runtime's default query. Regex expectations may
    /// reference `$model_name`.
    pub fn from_default_query(query: &DefaultQuery, model_name: &str) -> Result<Self> {
        if !query.use_regex {
            return Ok(Self::Text(query.query_output.clone()));
        }
        let vars = TemplateVars::for_query(model_name, &query.query_text);
        let pattern = safe_substitute(&query.query_output, &vars);
        Regex::new(&pattern)
            .map(Self::Pattern)
            .map_err(|e| Error::InvalidCatalog(format!("default query output is not a regex: {e}")))
    }
}

/// Checks results of one catalog entry.
#[derive(Debug, Clone)]
pub struct Verifier {
    entry: Arc<CatalogEntry>,
}

impl Verifier {
    pub fn new(entry: Arc<CatalogEntry>) -> Self {
        Self { entry }
    }

    /// Check `result` against `expected`. `token` is the bearer token the
    /// call was made with; it decides which denial reason is acceptable.
    pub fn verify(
        &self,
        result: &InferenceResult,
        expected: &Expectation,
        token: Option<&str>,
    ) -> Result<()> {
        match expected {
            Expectation::Denied => verify_denied(result, token),
            Expectation::Text(text) => {
                let actual = self.response_text(result)?;
                if actual == *text {
                    debug!(%actual, "response text matches");
                    Ok(())
                } else {
                    error!(response = %result.raw_output, "response text mismatch");
                    Err(Error::ResponseMismatch {
                        expected: text.clone(),
                        actual,
                    })
                }
            }
            Expectation::Pattern(pattern) => {
                let subject = match self.entry.response_text_field() {
                    Some(_) => self.response_text(result)?,
                    None => result.raw_output.clone(),
                };
                if pattern.is_match(&subject) {
                    Ok(())
                } else {
                    error!(response = %result.raw_output, "response does not match pattern");
                    Err(Error::ResponseMismatch {
                        expected: pattern.as_str().to_string(),
                        actual: subject,
                    })
                }
            }
        }
    }

    /// Text the model generated, from the mapped field when the runtime
    /// returns one, else from the streamed `generated_text` chunks.
    pub fn response_text(&self, result: &InferenceResult) -> Result<String> {
        match self.entry.response_text_field() {
            Some(field) => structured_text(result, self.entry.response_container(), field),
            None => streaming_text(&result.raw_output),
        }
    }
}

/// Verify `result` of a call made through `entry`.
///
/// `authorized_user` defaults to `true`; with `Some(false)` the response
/// text is ignored and only the denial reason is checked.
pub fn verify_inference_response(
    entry: Arc<CatalogEntry>,
    result: &InferenceResult,
    expected_response_text: &str,
    authorized_user: Option<bool>,
    token: Option<&str>,
) -> Result<()> {
    let expected = match authorized_user {
        Some(false) => Expectation::Denied,
        _ => Expectation::text(expected_response_text),
    };
    Verifier::new(entry).verify(result, &expected, token)
}

fn structured_text(
    result: &InferenceResult,
    container: Option<&str>,
    field: &str,
) -> Result<String> {
    let root = Value::Object(result.parsed.clone());
    let mut roots = vec![root];

    // Streaming and CLI output lands under `output` as a string; it may still
    // hold a sequence of JSON documents.
    if let Some(Value::String(output)) = result.parsed.get(OUTPUT_KEY) {
        roots.extend(
            serde_json::Deserializer::from_str(output)
                .into_iter::<Value>()
                .map_while(std::result::Result::ok),
        );
    }

    for root in &roots {
        let scope = match container {
            Some(key) => match find_key(root, key) {
                Some(inner) => inner,
                None => continue,
            },
            None => root,
        };
        if let Some(value) = find_key(scope, field) {
            return Ok(value_text(value));
        }
    }

    error!(field, response = %result.raw_output, "response text field not found");
    Err(Error::ResponseTextNotFound {
        field: Some(field.to_string()),
        response: result.raw_output.clone(),
    })
}

/// Breadth-first search for `key`, descending into the first element of
/// arrays and every nested object.
fn find_key<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    let mut queue = VecDeque::from([root]);
    while let Some(value) = queue.pop_front() {
        match value {
            Value::Object(map) => {
                if let Some(found) = map.get(key) {
                    return Some(found);
                }
                queue.extend(map.values());
            }
            Value::Array(items) => queue.extend(items.first()),
            _ => {}
        }
    }
    None
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn streaming_text(raw: &str) -> Result<String> {
    let chunks: Vec<String> = STREAMING_TEXT
        .captures_iter(raw)
        .map(|caps| unescape(&caps[1]))
        .collect();

    if chunks.is_empty() {
        error!(response = %raw, "no generated_text in response");
        return Err(Error::ResponseTextNotFound {
            field: None,
            response: raw.to_string(),
        });
    }
    Ok(chunks.concat())
}

fn unescape(chunk: &str) -> String {
    serde_json::from_str(&format!("\"{chunk}\"")).unwrap_or_else(|_| chunk.to_string())
}

fn verify_denied(result: &InferenceResult, token: Option<&str>) -> Result<()> {
    let Some(reason) = AUTH_REASON
        .captures(&result.raw_output)
        .map(|caps| caps[1].trim().to_string())
        .filter(|reason| !reason.is_empty())
    else {
        error!(response = %result.raw_output, "x-ext-auth-reason missing from denied response");
        return Err(Error::AuthReasonMissing {
            response: result.raw_output.clone(),
        });
    };

    let (accepted, expected) = match token.filter(|t| !t.is_empty()) {
        Some(_) => (NOT_AUTHORIZED.is_match(&reason), NOT_AUTHORIZED.as_str()),
        None => (
            reason.to_lowercase().contains(CREDENTIAL_NOT_FOUND),
            CREDENTIAL_NOT_FOUND,
        ),
    };

    if accepted {
        debug!(%reason, "request denied as expected");
        Ok(())
    } else {
        error!(response = %result.raw_output, %reason, "unexpected auth denial reason");
        Err(Error::AuthReasonMismatch {
            expected: expected.to_string(),
            actual: reason,
        })
    }
}
