//! Canned transport output used across harnesses.
//!
//! Shapes follow what `curl -i -s` and `grpcurl` print against the serving
//! platform: response heads ahead of JSON bodies, SSE streams, and the auth
//! proxy's denials.

pub const MODEL: &str = "caikit";
pub const QUERY: &str = "At what temperature does liquid Nitrogen boil?";
pub const ANSWER: &str = "74 degrees F";

/// The sole line of a plain JSON response.
pub const CAIKIT_JSON: &str = r#"{"generated_text": "74 degrees F"}"#;

/// `curl -i` against caikit's REST endpoint.
pub const CAIKIT_HTTP_RESPONSE: &str = "HTTP/1.1 200 OK\r\n\
content-type: application/json\r\n\
content-length: 86\r\n\
x-envoy-upstream-service-time: 412\r\n\
\r\n\
{\"generated_text\": \"74 degrees F\", \"generated_tokens\": 5, \"finish_reason\": \"EOS_TOKEN\"}";

/// `curl -i` against caikit's server-streaming endpoint.
pub const CAIKIT_STREAMING_RESPONSE: &str = "HTTP/1.1 200 OK\r\n\
content-type: text/event-stream; charset=utf-8\r\n\
\r\n\
data: {\"generated_text\": \"74\", \"tokens\": [], \"details\": null}\n\
\n\
data: {\"generated_text\": \" degrees\", \"tokens\": [], \"details\": null}\n\
\n\
data: {\"generated_text\": \" F\", \"tokens\": [], \"details\": {\"finish_reason\": \"EOS_TOKEN\"}}\n";

/// `grpcurl` against caikit's server-streaming method: one pretty-printed
/// message per chunk.
pub const CAIKIT_GRPC_STREAMING: &str = r#"{
  "generated_text": "74"
}
{
  "generated_text": " degrees"
}
{
  "generated_text": " F"
}
"#;

/// `grpcurl` against TGIS `Generate`.
pub const TGIS_GRPC_RESPONSE: &str = r#"{
  "responses": [
    {
      "generatedTokenCount": 5,
      "text": "74 degrees F",
      "inputTokenCount": 10,
      "stopReason": "EOS_TOKEN"
    }
  ]
}
"#;

/// vLLM chat completion.
pub const VLLM_CHAT_RESPONSE: &str = r#"{"id": "cmpl-1", "object": "chat.completion", "choices": [{"index": 0, "message": {"role": "assistant", "content": "Paris"}, "finish_reason": "stop"}], "usage": {"completion_tokens": 2}}"#;

/// Auth proxy answer to a request with an invalid token.
pub const DENIED_WITH_TOKEN: &str = "HTTP/1.1 403 Forbidden\r\n\
x-ext-auth-reason: not authenticated\r\n\
content-length: 0\r\n\
\r\n";

/// Auth proxy answer to a request without a token.
pub const DENIED_WITHOUT_TOKEN: &str = "HTTP/1.1 401 Unauthorized\r\n\
x-ext-auth-reason: credential not found\r\n\
content-length: 0\r\n\
\r\n";

/// Denial from a proxy that does not explain itself.
pub const DENIED_WITHOUT_REASON: &str = "HTTP/1.1 403 Forbidden\r\n\
content-length: 0\r\n\
\r\n";

/// Denial whose reason header is present but blank.
pub const DENIED_WITH_EMPTY_REASON: &str = "HTTP/1.1 401 Unauthorized\r\n\
x-ext-auth-reason:\r\n\
www-authenticate: credential not found\r\n\
\r\n";

pub const CURL_RESOLVE_ERROR: &str = "curl: (6) Could not resolve host: caikit.example.com\n";
