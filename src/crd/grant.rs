//! Grant Custom Resource Definition
//!
//! A Grant is the resource backing a Claim. The controller creates Grants
//! and records them on their Claims; a separate issuer fulfills them and
//! reports progress through `status.state`.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Specification for a Grant
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "warden.dev",
    version = "v1alpha1",
    kind = "Grant",
    plural = "grants",
    status = "GrantStatus",
    namespaced,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GrantSpec {
    /// Profile this grant was created for, copied from the owning claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

/// Status for a Grant, written by the issuer that fulfills it
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrantStatus {
    /// Opaque state string reported by the issuer
    ///
    /// The controller copies this onto the owning claim without
    /// interpreting it.
    #[serde(default)]
    pub state: String,
}

impl GrantStatus {
    /// Create a status reporting the given state
    pub fn with_state(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
        }
    }
}

impl Grant {
    /// State reported for this grant, or "" when nothing has been reported
    ///
    /// A grant with no status subresource and a grant whose issuer wrote an
    /// empty state are indistinguishable to consumers, so both read as "".
    pub fn state(&self) -> &str {
        self.status
            .as_ref()
            .map(|status| status.state.as_str())
            .unwrap_or_default()
    }
}
