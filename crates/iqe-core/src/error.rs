//! Error taxonomy shared by every iqe layer.
//!
//! Catalog misses and malformed catalogs are configuration errors and fatal.
//! Transport and verification errors carry enough context (command, raw
//! output) to diagnose a failed test without re-running it.

use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("runtime {runtime:?} not supported; supported runtimes are {known:?}")]
    UnsupportedRuntime { runtime: String, known: Vec<String> },

    #[error(
        "inference type {inference_type:?} not supported by runtime {runtime:?}; \
         supported inference types are {known:?}"
    )]
    UnsupportedInferenceType {
        runtime: String,
        inference_type: String,
        known: Vec<String>,
    },

    #[error(
        "protocol {protocol:?} not supported for {runtime}/{inference_type}; \
         supported protocols are {known:?}"
    )]
    UnsupportedProtocol {
        runtime: String,
        inference_type: String,
        protocol: String,
        known: Vec<String>,
    },

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid serving status: {0}")]
    InvalidStatus(String),

    #[error("{resource}: no url found in serving status")]
    TargetUnavailable { resource: String },

    #[error("inference failed with error: {stderr}\noutput: {stdout}\ncommand: {command}")]
    InferenceExecution {
        command: String,
        stdout: String,
        stderr: String,
    },

    #[error("inference response text not found in response (field {field:?})")]
    ResponseTextNotFound { field: Option<String>, response: String },

    #[error("inference response mismatch:\n  expected: {expected:?}\n  actual:   {actual:?}")]
    ResponseMismatch { expected: String, actual: String },

    #[error("x-ext-auth-reason header not found in response")]
    AuthReasonMissing { response: String },

    #[error("x-ext-auth-reason {actual:?} does not match {expected}")]
    AuthReasonMismatch { expected: String, actual: String },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors caused by the catalog or a catalog lookup.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedRuntime { .. }
                | Error::UnsupportedInferenceType { .. }
                | Error::UnsupportedProtocol { .. }
                | Error::InvalidCatalog(_)
                | Error::Config(_)
        )
    }
}
