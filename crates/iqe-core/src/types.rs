//! Core vocabulary shared by the catalog, the transports and the client.

use std::fmt;
use std::str::FromStr;

/// Well-known inference type keys used by the built-in catalog.
pub mod inference_type {
    pub const ALL_TOKENS: &str = "all-tokens";
    pub const STREAMING: &str = "streaming";
    pub const TOKENIZE: &str = "tokenize";
    pub const MODEL_INFO: &str = "model-info";
    pub const CHAT_COMPLETIONS: &str = "chat-completions";
    pub const COMPLETIONS: &str = "completions";
    pub const EMBEDDINGS: &str = "embeddings";
    /// KServe v2 tensor inference.
    pub const INFER: &str = "infer";
}

/// Well-known runtime keys used by the built-in catalog.
pub mod runtime {
    pub const CAIKIT_TGIS: &str = "caikit-tgis-runtime";
    pub const TGIS: &str = "tgis-runtime";
    pub const CAIKIT_STANDALONE: &str = "caikit-standalone-runtime";
    pub const CAIKIT_STANDALONE_GRPC: &str = "caikit-standalone-runtime-grpc";
    pub const VLLM: &str = "vllm-runtime";
    /// OpenVINO model server running a TensorFlow model.
    pub const TENSORFLOW: &str = "tensorflow-runtime";
}

/// Wire protocol of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Protocol {
    Http,
    Grpc,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Grpc => "grpc",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a protocol string is neither `http`, `https` nor `grpc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProtocol(pub String);

impl fmt::Display for UnknownProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown protocol {:?} (expected http, https or grpc)", self.0)
    }
}

impl std::error::Error for UnknownProtocol {}

impl FromStr for Protocol {
    type Err = UnknownProtocol;

    /// `https` is the TLS flavour of `http` and maps to the same catalog key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" | "https" => Ok(Protocol::Http),
            "grpc" => Ok(Protocol::Grpc),
            _ => Err(UnknownProtocol(s.to_string())),
        }
    }
}

/// URL scheme used for HTTP targets. TLS unless the caller downgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Https,
    Http,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Https => "https",
            Scheme::Http => "http",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
