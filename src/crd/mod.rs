//! Custom Resource Definitions for Warden
//!
//! This module contains all CRD definitions used by the Warden operator.

mod claim;
mod grant;

pub use claim::{Claim, ClaimSpec, ClaimStatus};
pub use grant::{Grant, GrantSpec, GrantStatus};

/// Label every grant carries naming the claim it was created for
///
/// Lookups for unbound claims go through this label, so it must be set at
/// creation time and never edited afterwards.
pub const CLAIM_LABEL: &str = "warden.dev/claim";
