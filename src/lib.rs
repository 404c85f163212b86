//! iqe: Inference Query Engine
//!
//! Sends templated queries to model-serving inference services and checks
//! what comes back. The catalog and configuration live in [`iqe_core`], the
//! transports in [`iqe_transport`]; this crate ties them together.
//!
//! # Architecture
//!
//! ```text
//! Catalog ──► InferenceClient ──► Transport ──► InferenceResult ──► Verifier
//!               (render)          (curl, grpcurl,   (headers + JSON)
//!                                  reqwest)
//! ```
//!
//! A client is cheap to clone and safe to share between tasks; every call
//! renders and owns its own request and result.

pub mod client;
pub mod response;
pub mod verify;

pub use client::{render_request, InferenceClient, Target};
pub use response::InferenceResult;
pub use verify::{verify_inference_response, Expectation, Verifier};
