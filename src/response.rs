//! Turning transport output into an [`InferenceResult`].
//!
//! HTTP transports print the response head ahead of the body, `curl -i`
//! style, possibly several heads in a row (`100 Continue`, proxies). Each
//! head is split off at the first blank line and its lines become
//! `header-name -> value` entries; the status line becomes
//! `HTTP/<version> -> "<code> <reason>"`. The remaining body is parsed as
//! JSON and, when it is an object, merged over the headers. Any other body
//! is kept verbatim under [`OUTPUT_KEY`].

use serde_json::{Map, Value};

/// Key holding the raw output when the body is not a JSON object.
pub const OUTPUT_KEY: &str = "output";

/// Raw transport output plus its parsed form.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResult {
    pub raw_output: String,
    pub parsed: Map<String, Value>,
}

impl InferenceResult {
    pub fn parse(raw_output: impl Into<String>) -> Self {
        let raw_output = raw_output.into();
        let parsed = parse_output(&raw_output);
        Self { raw_output, parsed }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.parsed.get(key)
    }

    /// Response header value, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parsed
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, value)| value.as_str())
    }

    /// Status code of the last response head, if the output had one.
    pub fn status_code(&self) -> Option<u16> {
        self.parsed
            .iter()
            .filter(|(key, _)| key.starts_with("HTTP/"))
            .filter_map(|(_, value)| value.as_str())
            .filter_map(|status| status.split_whitespace().next()?.parse().ok())
            .last()
    }
}

/// Parse raw transport output into a JSON object.
pub fn parse_output(raw: &str) -> Map<String, Value> {
    let mut parsed = Map::new();
    let mut rest = raw.trim_start();

    while rest.starts_with("HTTP/") {
        let (head, tail) = split_head(rest);
        parse_head(head, &mut parsed);
        rest = tail.trim_start();
    }

    match serde_json::from_str::<Value>(rest.trim()) {
        Ok(Value::Object(body)) => parsed.extend(body),
        _ => {
            parsed.insert(OUTPUT_KEY.to_string(), Value::String(raw.to_string()));
        }
    }
    parsed
}

/// Split at the first blank line; a head with no body consumes everything.
fn split_head(s: &str) -> (&str, &str) {
    let crlf = s.find("\r\n\r\n").map(|i| (i, 4));
    let lf = s.find("\n\n").map(|i| (i, 2));
    let cut = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };
    match cut {
        Some((at, len)) => (&s[..at], &s[at + len..]),
        None => (s, ""),
    }
}

fn parse_head(head: &str, parsed: &mut Map<String, Value>) {
    let mut lines = head.lines().map(str::trim_end);

    if let Some(status_line) = lines.next() {
        let (version, status) = status_line.split_once(' ').unwrap_or((status_line, ""));
        parsed.insert(version.to_string(), Value::String(status.trim().to_string()));
    }

    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            parsed.insert(
                name.trim().to_string(),
                Value::String(value.trim().to_string()),
            );
        }
    }
}
