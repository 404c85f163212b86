//! Shared test utilities for iqe integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Nothing here talks to a real cluster: requests go to a
//! [`fake_transport::FakeTransport`] or to a local axum server.

#![allow(dead_code, unused_imports)]

pub mod assertions;
pub mod builders;
pub mod fake_inference_server;
pub mod fake_transport;
pub mod fixtures;

pub use builders::*;
pub use fake_inference_server::FakeInferenceServer;
pub use fake_transport::FakeTransport;
pub use fixtures::*;
