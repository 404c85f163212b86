//! Process-backed transport: `curl` for HTTP, `grpcurl` for gRPC.
//!
//! Arguments are passed to the child directly (no shell), so bodies and
//! headers need no quoting. Children are killed if the calling future is
//! dropped, which is how the client's timeout cancels a hung request.

use async_trait::async_trait;
use iqe_core::{Protocol, RenderedRequest};
use tokio::process::Command;
use tracing::debug;

use crate::{Transport, TransportError, TransportOutput};

/// Runs `curl`/`grpcurl` as child processes.
#[derive(Debug, Clone)]
pub struct CommandTransport {
    curl_bin: String,
    grpcurl_bin: String,
}

impl Default for CommandTransport {
    fn default() -> Self {
        Self::new("curl", "grpcurl")
    }
}

impl CommandTransport {
    pub fn new(curl_bin: impl Into<String>, grpcurl_bin: impl Into<String>) -> Self {
        Self {
            curl_bin: curl_bin.into(),
            grpcurl_bin: grpcurl_bin.into(),
        }
    }

    /// Program followed by its arguments.
    pub fn command_line(&self, request: &RenderedRequest) -> Vec<String> {
        let mut line = vec![self.program(request.protocol).to_string()];
        line.extend(self.args(request));
        line
    }

    fn program(&self, protocol: Protocol) -> &str {
        match protocol {
            Protocol::Http => &self.curl_bin,
            Protocol::Grpc => &self.grpcurl_bin,
        }
    }

    fn args(&self, request: &RenderedRequest) -> Vec<String> {
        match request.protocol {
            Protocol::Http => curl_args(request),
            Protocol::Grpc => grpcurl_args(request),
        }
    }
}

fn curl_args(request: &RenderedRequest) -> Vec<String> {
    let mut args = vec![
        "-i".to_string(),
        "-s".to_string(),
        "-d".to_string(),
        request.body.clone(),
    ];
    for header in request.header_lines() {
        args.push("-H".to_string());
        args.push(header);
    }
    if request.insecure {
        args.push("--insecure".to_string());
    }
    args.push(request.target.clone());
    args
}

fn grpcurl_args(request: &RenderedRequest) -> Vec<String> {
    let mut args = vec!["-d".to_string(), request.body.clone()];
    for header in request.header_lines() {
        args.push("-H".to_string());
        args.push(header);
    }
    if request.insecure {
        args.push("-insecure".to_string());
    }
    for (key, value) in &request.args {
        args.push(format!("-{key}"));
        if !value.is_empty() {
            args.push(value.clone());
        }
    }
    args.push(request.target.clone());
    args.push(request.endpoint.clone());
    args
}

#[async_trait]
impl Transport for CommandTransport {
    fn name(&self) -> &'static str {
        "command"
    }

    fn describe(&self, request: &RenderedRequest) -> String {
        request.redact(&shell_join(&self.command_line(request)))
    }

    async fn execute(&self, request: &RenderedRequest) -> Result<TransportOutput, TransportError> {
        let program = self.program(request.protocol);

        debug!(command = %self.describe(request), "spawning transport process");

        let output = Command::new(program)
            .args(self.args(request))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| TransportError::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(TransportOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Join arguments into a copy-pasteable shell command line.
pub fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|arg| shell_quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,~".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
