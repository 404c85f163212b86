//! Runtime/protocol catalog.
//!
//! A nested lookup table `runtime -> inference type -> protocol -> entry`.
//! The built-in catalog is embedded from `data/runtime_query_formats.toml`;
//! extra catalogs can be loaded from disk and layered on top with
//! [`Catalog::merge`]. Every entry is validated when the catalog is built, so
//! a missing `endpoint`, `header`, `body` or `response_fields_map` fails at
//! load time rather than on first use.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::Protocol;

// ---------------------------------------------------------------------------
// Embedded catalog
// ---------------------------------------------------------------------------

const BUILTIN_CATALOG: &str = include_str!("../data/runtime_query_formats.toml");

static BUILTIN: OnceLock<Arc<Catalog>> = OnceLock::new();

/// Keys of `response_fields_map` the engine understands.
pub mod field {
    /// Container of the payload (`choices`, `responses`, …); empty = top level.
    pub const RESPONSE: &str = "response";
    pub const RESPONSE_TEXT: &str = "response_text";
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Request template for one `(runtime, inference type, protocol)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// URL path (HTTP) or fully qualified method (gRPC).
    pub endpoint: String,
    /// A single `Name: value` header line.
    pub header: String,
    pub body: String,
    /// Logical response field → key in the raw response.
    pub response_fields_map: BTreeMap<String, String>,
    /// Extra transport arguments, `key=value` separated by whitespace.
    pub args: Option<String>,
}

impl CatalogEntry {
    /// Key holding the generated text, if the runtime returns it as a
    /// structured field.
    pub fn response_text_field(&self) -> Option<&str> {
        self.mapped(field::RESPONSE_TEXT)
    }

    /// Key of the container object/array holding the payload.
    pub fn response_container(&self) -> Option<&str> {
        self.mapped(field::RESPONSE)
    }

    /// `args` split into `(key, value)` pairs; bare words get an empty value.
    pub fn transport_args(&self) -> Vec<(String, String)> {
        self.args
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(|arg| match arg.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (arg.to_string(), String::new()),
            })
            .collect()
    }

    fn mapped(&self, key: &str) -> Option<&str> {
        self.response_fields_map
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Query used when a caller asks for "the default query" of a runtime.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DefaultQuery {
    /// Query text, or `query_input` for runtimes fed a raw payload
    /// (`@path` reads the payload from a file).
    #[serde(alias = "query_input")]
    pub query_text: String,
    /// Expected response text, or a regex when `use_regex` is set.
    pub query_output: String,
    #[serde(default)]
    pub use_regex: bool,
}

/// Everything the catalog knows about one runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeFormats {
    pub containers: Vec<String>,
    pub default_query: Option<DefaultQuery>,
    pub inference_types: BTreeMap<String, BTreeMap<Protocol, Arc<CatalogEntry>>>,
}

/// Validated, immutable catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    runtimes: BTreeMap<String, RuntimeFormats>,
}

// ---------------------------------------------------------------------------
// On-disk shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawRuntime {
    #[serde(default)]
    containers: Vec<String>,
    #[serde(default)]
    default_query_model: Option<DefaultQuery>,
    #[serde(flatten)]
    inference_types: BTreeMap<String, BTreeMap<String, RawEntry>>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    endpoint: Option<String>,
    header: Option<String>,
    body: Option<String>,
    response_fields_map: Option<BTreeMap<String, String>>,
    #[serde(default)]
    args: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Catalog {
    /// The embedded catalog, parsed once per process.
    pub fn builtin() -> Arc<Catalog> {
        BUILTIN
            .get_or_init(|| {
                Arc::new(
                    Catalog::from_toml_str(BUILTIN_CATALOG)
                        .expect("built-in runtime query catalog must be valid"),
                )
            })
            .clone()
    }

    /// Parse and validate a catalog from TOML text.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let raw: BTreeMap<String, RawRuntime> = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Self::validate(raw)
    }

    /// Parse and validate a catalog file. The format follows the extension
    /// (`.toml`, `.yaml`, `.json`).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::InvalidCatalog(format!(
                "catalog file {} does not exist",
                path.display()
            )));
        }
        let raw: BTreeMap<String, RawRuntime> = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;
        let catalog = Self::validate(raw)?;
        debug!(path = %path.display(), runtimes = catalog.runtimes.len(), "loaded catalog file");
        Ok(catalog)
    }

    /// Layer `other` on top of `self`. Entries of `other` replace entries
    /// with the same `(runtime, inference type, protocol)`; runtime-level
    /// `containers` and default queries are replaced when `other` sets them.
    pub fn merge(mut self, other: Catalog) -> Catalog {
        for (name, theirs) in other.runtimes {
            debug!(runtime = %name, "merging catalog overrides");
            let ours = self.runtimes.entry(name).or_default();
            if !theirs.containers.is_empty() {
                ours.containers = theirs.containers;
            }
            if theirs.default_query.is_some() {
                ours.default_query = theirs.default_query;
            }
            for (inference_type, protocols) in theirs.inference_types {
                ours.inference_types
                    .entry(inference_type)
                    .or_default()
                    .extend(protocols);
            }
        }
        self
    }

    fn validate(raw: BTreeMap<String, RawRuntime>) -> Result<Self> {
        let mut runtimes = BTreeMap::new();

        for (runtime, raw_runtime) in raw {
            let mut inference_types = BTreeMap::new();

            for (inference_type, raw_protocols) in raw_runtime.inference_types {
                if raw_protocols.is_empty() {
                    return Err(Error::InvalidCatalog(format!(
                        "{runtime}/{inference_type}: no protocols defined"
                    )));
                }

                let mut protocols = BTreeMap::new();
                for (protocol, entry) in raw_protocols {
                    let location = format!("{runtime}/{inference_type}/{protocol}");
                    let protocol: Protocol = protocol
                        .parse()
                        .map_err(|e| Error::InvalidCatalog(format!("{location}: {e}")))?;
                    if protocols.contains_key(&protocol) {
                        return Err(Error::InvalidCatalog(format!(
                            "{location}: {protocol} is defined more than once"
                        )));
                    }
                    protocols.insert(protocol, Arc::new(entry.into_entry(&location)?));
                }
                inference_types.insert(inference_type, protocols);
            }

            runtimes.insert(
                runtime,
                RuntimeFormats {
                    containers: raw_runtime.containers,
                    default_query: raw_runtime.default_query_model,
                    inference_types,
                },
            );
        }

        Ok(Self { runtimes })
    }
}

impl RawEntry {
    fn into_entry(self, location: &str) -> Result<CatalogEntry> {
        let missing = |field: &str| Error::InvalidCatalog(format!("{location}: missing `{field}`"));

        Ok(CatalogEntry {
            endpoint: self.endpoint.ok_or_else(|| missing("endpoint"))?,
            header: self.header.ok_or_else(|| missing("header"))?,
            body: self.body.ok_or_else(|| missing("body"))?,
            response_fields_map: self
                .response_fields_map
                .ok_or_else(|| missing("response_fields_map"))?,
            args: self.args.filter(|a| !a.trim().is_empty()),
        })
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

impl Catalog {
    /// Entry for `(runtime, inference_type, protocol)`.
    pub fn resolve(
        &self,
        runtime: &str,
        inference_type: &str,
        protocol: Protocol,
    ) -> Result<Arc<CatalogEntry>> {
        let formats = self.runtime(runtime)?;

        let protocols = formats.inference_types.get(inference_type).ok_or_else(|| {
            Error::UnsupportedInferenceType {
                runtime: runtime.to_string(),
                inference_type: inference_type.to_string(),
                known: formats.inference_types.keys().cloned().collect(),
            }
        })?;

        protocols
            .get(&protocol)
            .cloned()
            .ok_or_else(|| Error::UnsupportedProtocol {
                runtime: runtime.to_string(),
                inference_type: inference_type.to_string(),
                protocol: protocol.to_string(),
                known: protocols.keys().map(|p| p.to_string()).collect(),
            })
    }

    /// Everything known about `runtime`.
    pub fn runtime(&self, runtime: &str) -> Result<&RuntimeFormats> {
        self.runtimes
            .get(runtime)
            .ok_or_else(|| Error::UnsupportedRuntime {
                runtime: runtime.to_string(),
                known: self.runtimes.keys().cloned().collect(),
            })
    }

    pub fn runtimes(&self) -> impl Iterator<Item = (&str, &RuntimeFormats)> {
        self.runtimes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn inference_types(&self, runtime: &str) -> Result<Vec<&str>> {
        Ok(self
            .runtime(runtime)?
            .inference_types
            .keys()
            .map(String::as_str)
            .collect())
    }

    pub fn containers(&self, runtime: &str) -> Result<&[String]> {
        Ok(&self.runtime(runtime)?.containers)
    }

    pub fn default_query(&self, runtime: &str) -> Result<Option<&DefaultQuery>> {
        Ok(self.runtime(runtime)?.default_query.as_ref())
    }

    /// Every `(runtime, inference type, protocol, entry)` in the catalog.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, Protocol, &Arc<CatalogEntry>)> {
        self.runtimes.iter().flat_map(|(runtime, formats)| {
            formats
                .inference_types
                .iter()
                .flat_map(move |(inference_type, protocols)| {
                    protocols.iter().map(move |(protocol, entry)| {
                        (runtime.as_str(), inference_type.as_str(), *protocol, entry)
                    })
                })
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
