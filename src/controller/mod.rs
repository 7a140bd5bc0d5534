//! Controller implementation for Warden CRDs
//!
//! This module wires the reconciliation engine into kube-runtime.
//! Controllers follow the Kubernetes controller pattern: level-triggered
//! passes that converge on desired state one idempotent step at a time.

mod claim;

pub use claim::{error_policy, reconcile, Context};
