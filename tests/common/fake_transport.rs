//! FakeTransport: canned transport output without spawning processes.
//!
//! Every executed [`RenderedRequest`] is recorded so harnesses can assert on
//! what the client rendered. Responses are served in order; the last one
//! repeats once the queue is drained. An optional delay works with
//! `tokio::time::pause()` for deterministic timeout tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use iqe_core::RenderedRequest;
use iqe_transport::{Transport, TransportError, TransportOutput};

#[derive(Default)]
struct Inner {
    responses: VecDeque<TransportOutput>,
    last: TransportOutput,
    requests: Vec<RenderedRequest>,
}

/// Cloneable handle; clones share the queue and the request log.
#[derive(Clone, Default)]
pub struct FakeTransport {
    inner: Arc<Mutex<Inner>>,
    delay: Option<Duration>,
}

impl FakeTransport {
    /// Successful call printing `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self::default().then_ok(stdout)
    }

    /// Failed call with `stderr`.
    pub fn failing(stderr: impl Into<String>) -> Self {
        Self::default().then(TransportOutput {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        })
    }

    pub fn then_ok(self, stdout: impl Into<String>) -> Self {
        self.then(TransportOutput {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        })
    }

    pub fn then(self, output: TransportOutput) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.last = output.clone();
            inner.responses.push_back(output);
        }
        self
    }

    /// Sleep before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<RenderedRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.inner.lock().unwrap().requests.len()
    }

    pub fn last_request(&self) -> RenderedRequest {
        self.requests()
            .pop()
            .expect("FakeTransport: no request was executed")
    }

    pub fn into_arc(self) -> Arc<dyn Transport> {
        Arc::new(self)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn describe(&self, request: &RenderedRequest) -> String {
        let line = format!(
            "fake {} {} -H {:?} -d {}",
            request.protocol,
            request.full_target(),
            request.header_lines(),
            request.body
        );
        request.redact(&line)
    }

    async fn execute(&self, request: &RenderedRequest) -> Result<TransportOutput, TransportError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(request.clone());
        let output = match inner.responses.pop_front() {
            Some(output) => output,
            None => inner.last.clone(),
        };
        Ok(output)
    }
}
