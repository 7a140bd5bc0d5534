//! Warden - Kubernetes operator binding Claims to backing Grants
//!
//! Warden maintains a one-to-one relationship: every Claim gets exactly
//! one Grant created on its behalf, the Grant's name is recorded on the
//! Claim, and whatever state the Grant's issuer reports is mirrored back
//! onto the Claim.
//!
//! # Architecture
//!
//! The controller is level-triggered and single-step:
//! - Each reconciliation pass performs at most one write, then requeues
//! - All progress lives in the store; a crash loses at most one
//!   idempotent action
//! - Grants are found again by label, so a crashed pass never strands
//!   what it created
//!
//! # Modules
//!
//! - [`crd`] - Custom Resource Definitions (Claim, Grant)
//! - [`controller`] - Kubernetes controller reconciliation glue
//! - [`engine`] - Single-pass observe-decide-act engine
//! - [`resolver`] - Grant lookups by name and by claim label
//! - [`factory`] - Construction of grants for claims
//! - [`projector`] - Mirroring of grant state onto claims
//! - [`store`] - Object store trait and its Kubernetes implementation
//! - [`retry`] - Backoff helper for startup API calls
//! - [`error`] - Error types for the operator

#![deny(missing_docs)]

pub mod controller;
pub mod crd;
pub mod engine;
pub mod error;
pub mod factory;
pub mod projector;
pub mod resolver;
pub mod retry;
pub mod store;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
