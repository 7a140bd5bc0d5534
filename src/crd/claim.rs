//! Claim Custom Resource Definition
//!
//! A Claim is a request for exactly one backing Grant. The controller
//! creates the Grant, records its name on the Claim, and mirrors the
//! Grant's reported state back onto the Claim.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Specification for a Claim
///
/// The spec is intentionally small: a Claim asks for one Grant, and the
/// controller owns the rest of the relationship through status.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "warden.dev",
    version = "v1alpha1",
    kind = "Claim",
    plural = "claims",
    shortname = "clm",
    status = "ClaimStatus",
    namespaced,
    printcolumn = r#"{"name":"Grant","type":"string","jsonPath":".status.grantName"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.grantState"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSpec {
    /// Profile requested for the backing grant, copied verbatim onto the
    /// Grant when the controller creates it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

/// Status for a Claim
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimStatus {
    /// Name of the Grant currently bound to this claim
    ///
    /// Present only while a Grant with this exact name exists. Cleared when
    /// the Grant disappears so the next pass can replace it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_name: Option<String>,

    /// Last state reported by the bound Grant, copied byte for byte
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_state: Option<String>,
}

impl ClaimStatus {
    /// Set the grant name and return self for chaining
    pub fn grant_name(mut self, name: impl Into<String>) -> Self {
        self.grant_name = Some(name.into());
        self
    }

    /// Set the mirrored grant state and return self for chaining
    pub fn grant_state(mut self, state: impl Into<String>) -> Self {
        self.grant_state = Some(state.into());
        self
    }
}

impl Claim {
    /// Name of the grant recorded on this claim, if any
    ///
    /// An absent status, an absent field, and an empty string all read as
    /// "no grant recorded". Empty strings appear when clients default the
    /// field, and treating them as a real name would send lookups for "".
    pub fn recorded_grant(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.grant_name.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// State currently mirrored onto this claim, if any
    pub fn mirrored_state(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.grant_state.as_deref())
    }
}
