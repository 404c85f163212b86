//! Serving status as reported by an `InferenceService` resource.
//!
//! Only the fields the engine reads are modelled; everything else in the
//! resource status is ignored during deserialisation. A status is usually
//! obtained with `oc get isvc <name> -o json` and the `.status` object (or
//! the whole resource) handed to [`ServingStatus::from_json`].

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

/// `status` of an inference service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServingStatus {
    /// Name of the resource this status belongs to, used in error messages.
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub address: Option<Addressable>,
    #[serde(default)]
    pub components: Option<Components>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Addressable {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub predictor: Option<ComponentStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ComponentStatus {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Deserialize)]
struct Resource {
    #[serde(default)]
    metadata: Option<Metadata>,
    status: ServingStatus,
}

#[derive(Deserialize)]
struct Metadata {
    #[serde(default)]
    name: Option<String>,
}

impl ServingStatus {
    /// Status with only the predictor URL set.
    pub fn with_predictor_url(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Some(Components {
                predictor: Some(ComponentStatus {
                    url: Some(url.into()),
                }),
            }),
            ..Self::default()
        }
    }

    /// Parse either a full resource (`{"metadata": …, "status": …}`) or a
    /// bare status object.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| Error::InvalidStatus(format!("not JSON: {e}")))?;

        if value.get("status").is_some() {
            let resource: Resource = serde_json::from_value(value)
                .map_err(|e| Error::InvalidStatus(format!("malformed resource: {e}")))?;
            let mut status = resource.status;
            status.name = resource
                .metadata
                .and_then(|m| m.name)
                .unwrap_or_default();
            return Ok(status);
        }

        serde_json::from_value(value)
            .map_err(|e| Error::InvalidStatus(format!("malformed status: {e}")))
    }

    /// URL the predictor advertises, if the service is ready.
    pub fn predictor_url(&self) -> Option<&str> {
        self.components
            .as_ref()
            .and_then(|c| c.predictor.as_ref())
            .and_then(|p| p.url.as_deref())
            .filter(|u| !u.is_empty())
    }

    /// Cluster-internal address of the service.
    pub fn address_url(&self) -> Option<&str> {
        self.address
            .as_ref()
            .and_then(|a| a.url.as_deref())
            .filter(|u| !u.is_empty())
    }
}

/// Extract `host[:port]` from the predictor URL in `status`.
pub fn resolve_target(status: &ServingStatus) -> Result<String> {
    let unavailable = || Error::TargetUnavailable {
        resource: display_name(status),
    };

    let raw = status.predictor_url().ok_or_else(unavailable)?;
    netloc(raw).ok_or_else(unavailable)
}

/// `host[:port]` part of a URL, `None` when the string is not URL-shaped.
pub fn netloc(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn display_name(status: &ServingStatus) -> String {
    if status.name.is_empty() {
        "inference service".to_string()
    } else {
        status.name.clone()
    }
}
