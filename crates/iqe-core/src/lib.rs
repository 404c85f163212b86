//! iqe-core: Inference Query Engine core library.
//!
//! This crate holds everything that does not touch the network: the
//! runtime/protocol catalog, template rendering, serving status parsing,
//! configuration, and the shared error type.
//!
//! # Architecture
//!
//! ```text
//! Catalog ──► Client (render) ──► Transport ──► Client (parse) ──► Verifier
//! ```
//!
//! The client, transports and verifier live in the `iqe-transport` and
//! `iqe` crates; this crate is their common vocabulary.

pub mod catalog;
pub mod config;
pub mod error;
pub mod request;
pub mod status;
pub mod template;
pub mod types;

pub use catalog::{Catalog, CatalogEntry, DefaultQuery};
pub use error::{Error, Result};
pub use request::RenderedRequest;
pub use status::{resolve_target, ServingStatus};
pub use types::{Protocol, Scheme};
