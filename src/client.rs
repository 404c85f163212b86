//! Inference client.
//!
//! An [`InferenceClient`] is bound to one `(runtime, inference type,
//! protocol)` triple and one serving [`Target`]. The catalog entry is
//! resolved once, at construction, and shared by every call. Each call
//! renders its own [`RenderedRequest`], runs it through the configured
//! [`Transport`] under a timeout and parses the output into an
//! [`InferenceResult`].

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use iqe_core::catalog::CatalogEntry;
use iqe_core::config::Config;
use iqe_core::template::{safe_substitute, unresolved_placeholders, TemplateVars};
use iqe_core::{
    resolve_target, Catalog, DefaultQuery, Error, Protocol, RenderedRequest, Result, Scheme,
    ServingStatus,
};
use iqe_transport::Transport;
use tracing::{debug, error, info, warn};

use crate::response::InferenceResult;
use crate::verify::{Expectation, Verifier};

/// Port used for gRPC when neither the host nor the caller names one.
pub const DEFAULT_GRPC_PORT: u16 = 443;

/// Default bound on a single transport call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// Where requests are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// `host` or `host:port`.
    pub host: String,
    /// Explicit port; replaces any port carried by `host`.
    pub port: Option<u16>,
    /// gRPC port when `host` carries none.
    pub default_port: u16,
    pub scheme: Scheme,
}

impl Target {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            default_port: DEFAULT_GRPC_PORT,
            scheme: Scheme::default(),
        }
    }

    /// Target advertised by the predictor of a serving status.
    pub fn from_status(status: &ServingStatus) -> Result<Self> {
        Ok(Self::new(resolve_target(status)?))
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// `scheme://host[:port]/endpoint`.
    pub fn http_url(&self, endpoint: &str) -> String {
        let authority = match self.port {
            Some(port) => format!("{}:{port}", self.bare_host()),
            None => self.host.clone(),
        };
        format!(
            "{}://{authority}/{}",
            self.scheme,
            endpoint.trim_start_matches('/')
        )
    }

    /// `host:port`, falling back to the default port.
    pub fn grpc_authority(&self) -> String {
        match (self.port, split_port(&self.host)) {
            (Some(port), _) => format!("{}:{port}", self.bare_host()),
            (None, Some(_)) => self.host.clone(),
            (None, None) => format!("{}:{}", self.host, self.default_port),
        }
    }

    fn bare_host(&self) -> &str {
        split_port(&self.host).map_or(self.host.as_str(), |(host, _)| host)
    }
}

fn split_port(host: &str) -> Option<(&str, u16)> {
    let (name, port) = host.rsplit_once(':')?;
    Some((name, port.parse().ok()?))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Fill `entry`'s templates for one call and address them at `target`.
///
/// An empty token is treated as no token. Placeholders the call cannot
/// fill are left in place and logged.
pub fn render_request(
    entry: &CatalogEntry,
    model_name: &str,
    query_text: &str,
    token: Option<&str>,
    insecure: bool,
    protocol: Protocol,
    target: &Target,
) -> RenderedRequest {
    let vars = TemplateVars::for_query(model_name, query_text);
    for template in [&entry.endpoint, &entry.header, &entry.body] {
        let missing = unresolved_placeholders(template, &vars);
        if !missing.is_empty() {
            warn!(?missing, %template, "template has placeholders without a value");
        }
    }
    let endpoint = safe_substitute(&entry.endpoint, &vars);

    RenderedRequest {
        protocol,
        header: safe_substitute(&entry.header, &vars),
        body: safe_substitute(&entry.body, &vars),
        target: match protocol {
            Protocol::Http => target.http_url(&endpoint),
            Protocol::Grpc => target.grpc_authority(),
        },
        endpoint,
        token: token.filter(|t| !t.is_empty()).map(str::to_string),
        insecure,
        args: entry.transport_args(),
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Queries one inference service with one catalog entry.
#[derive(Clone)]
pub struct InferenceClient {
    runtime: String,
    inference_type: String,
    protocol: Protocol,
    entry: Arc<CatalogEntry>,
    default_query: Option<DefaultQuery>,
    target: Target,
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl std::fmt::Debug for InferenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceClient")
            .field("runtime", &self.runtime)
            .field("inference_type", &self.inference_type)
            .field("protocol", &self.protocol)
            .field("target", &self.target)
            .field("transport", &self.transport.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl InferenceClient {
    /// Resolve the catalog entry and bind it to `target`. Fails with the
    /// catalog's lookup errors.
    pub fn new(
        catalog: &Catalog,
        runtime: &str,
        inference_type: &str,
        protocol: Protocol,
        target: Target,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let entry = catalog.resolve(runtime, inference_type, protocol)?;
        let default_query = catalog.default_query(runtime)?.cloned();

        debug!(runtime, inference_type, %protocol, host = %target.host, "inference client ready");

        Ok(Self {
            runtime: runtime.to_string(),
            inference_type: inference_type.to_string(),
            protocol,
            entry,
            default_query,
            target,
            transport,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Apply the `[transport]` timeout and `[grpc]` default port.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.timeout = config.transport.timeout();
        self.target.default_port = config.grpc.default_port;
        self
    }

    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    pub fn inference_type(&self) -> &str {
        &self.inference_type
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn entry(&self) -> &Arc<CatalogEntry> {
        &self.entry
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn default_query(&self) -> Option<&DefaultQuery> {
        self.default_query.as_ref()
    }

    pub fn render_request(
        &self,
        model_name: &str,
        query_text: &str,
        token: Option<&str>,
        insecure: bool,
    ) -> RenderedRequest {
        render_request(
            &self.entry,
            model_name,
            query_text,
            token,
            insecure,
            self.protocol,
            &self.target,
        )
    }

    /// Run `rendered` through the transport and parse its output.
    ///
    /// A transport that cannot start, reports failure or outlives the
    /// timeout yields [`Error::InferenceExecution`] with the redacted
    /// command line.
    pub async fn execute(&self, rendered: &RenderedRequest) -> Result<InferenceResult> {
        let command = self.transport.describe(rendered);
        debug!(transport = self.transport.name(), %command, "running inference");

        let execution = |stdout: String, stderr: String| Error::InferenceExecution {
            command: command.clone(),
            stdout: rendered.redact(&stdout),
            stderr: rendered.redact(&stderr),
        };

        let output = match tokio::time::timeout(self.timeout, self.transport.execute(rendered)).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                error!(%command, error = %err, "transport error");
                return Err(execution(String::new(), err.to_string()));
            }
            Err(_) => {
                error!(%command, timeout = ?self.timeout, "inference timed out");
                return Err(execution(
                    String::new(),
                    format!("timed out after {:?}", self.timeout),
                ));
            }
        };

        if !output.success {
            error!(%command, stderr = %output.stderr, "inference failed");
            return Err(execution(output.stdout, output.stderr));
        }

        let result = InferenceResult::parse(output.stdout);
        info!(
            runtime = %self.runtime,
            inference_type = %self.inference_type,
            status = ?result.status_code(),
            "inference response received"
        );
        Ok(result)
    }

    pub async fn run_inference(
        &self,
        model_name: &str,
        text: &str,
        token: Option<&str>,
        insecure: bool,
    ) -> Result<InferenceResult> {
        let rendered = self.render_request(model_name, text, token, insecure);
        self.execute(&rendered).await
    }

    /// Run the runtime's default query.
    pub async fn run_default_query(
        &self,
        model_name: &str,
        token: Option<&str>,
        insecure: bool,
    ) -> Result<InferenceResult> {
        let query = self.require_default_query()?;
        self.run_inference(model_name, &query.query_text, token, insecure)
            .await
    }

    /// Expected outcome of the runtime's default query.
    pub fn default_expectation(&self, model_name: &str) -> Result<Expectation> {
        Expectation::from_default_query(self.require_default_query()?, model_name)
    }

    pub fn verifier(&self) -> Verifier {
        Verifier::new(self.entry.clone())
    }

    pub fn verify(
        &self,
        result: &InferenceResult,
        expected: &Expectation,
        token: Option<&str>,
    ) -> Result<()> {
        self.verifier().verify(result, expected, token)
    }

    /// Run and verify the default query `iterations` times, one after
    /// another or all at once.
    pub async fn run_inference_multiple_times(
        &self,
        model_name: &str,
        token: Option<&str>,
        insecure: bool,
        iterations: usize,
        parallel: bool,
    ) -> Result<Vec<InferenceResult>> {
        let query = self.require_default_query()?;
        let expected = self.default_expectation(model_name)?;
        self.run_verified_multiple_times(
            model_name,
            &query.query_text,
            &expected,
            token,
            insecure,
            iterations,
            parallel,
        )
        .await
    }

    /// Run `text` `iterations` times and check every result against
    /// `expected`. Stops at the first failure when sequential; when parallel
    /// every call runs and the first failure is returned.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_verified_multiple_times(
        &self,
        model_name: &str,
        text: &str,
        expected: &Expectation,
        token: Option<&str>,
        insecure: bool,
        iterations: usize,
        parallel: bool,
    ) -> Result<Vec<InferenceResult>> {
        let verifier = &self.verifier();

        let run_once = move || async move {
            let result = self.run_inference(model_name, text, token, insecure).await?;
            verifier.verify(&result, expected, token)?;
            Ok::<_, Error>(result)
        };

        info!(iterations, parallel, runtime = %self.runtime, "running repeated inference");

        if parallel {
            join_all((0..iterations).map(|_| run_once()))
                .await
                .into_iter()
                .collect()
        } else {
            let mut results = Vec::with_capacity(iterations);
            for _ in 0..iterations {
                results.push(run_once().await?);
            }
            Ok(results)
        }
    }

    fn require_default_query(&self) -> Result<&DefaultQuery> {
        self.default_query.as_ref().ok_or_else(|| {
            Error::InvalidCatalog(format!("{}: no default query defined", self.runtime))
        })
    }
}
