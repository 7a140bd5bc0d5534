//! Claim controller implementation
//!
//! This module connects the engine to kube-runtime: it re-reads the claim,
//! runs one engine pass, and maps the outcome to a requeue action. All
//! forward progress between passes goes through the store, never through
//! state carried in memory.

use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
use tracing::{debug, error, instrument};

use crate::crd::Claim;
use crate::engine::{self, Outcome};
use crate::projector;
use crate::store::{ClaimStore, KubeStore};
use crate::Error;

/// Controller context containing shared state
///
/// The context is shared across all reconciliation calls and holds the
/// store handle, which wraps the Kubernetes client in production.
pub struct Context {
    /// Object store for claims and grants (trait object for testability)
    pub store: Arc<dyn ClaimStore>,
}

impl Context {
    /// Create a context backed by the Kubernetes API
    pub fn new(client: Client) -> Self {
        Self {
            store: Arc::new(KubeStore::new(client)),
        }
    }

    /// Create a context over any store implementation
    ///
    /// This is the injection point for tests and for embedding the
    /// controller against a non-Kubernetes store.
    pub fn with_store(store: Arc<dyn ClaimStore>) -> Self {
        Self { store }
    }
}

/// Reconcile a Claim resource
///
/// Runs a single engine pass against a fresh read of the claim and maps
/// the outcome to a requeue decision:
///
/// * progress was made: requeue immediately for the next pass
/// * converged: mirror the grant's state, then wait for a watch event
/// * conflict: log loudly and wait; retrying cannot fix duplicate grants
///
/// # Arguments
///
/// * `claim` - The Claim resource to reconcile
/// * `ctx` - Shared controller context
///
/// # Returns
///
/// Returns an `Action` indicating when to requeue the resource, or an
/// error if the pass failed partway.
#[instrument(skip(claim, ctx), fields(claim = %claim.name_any()))]
pub async fn reconcile(claim: Arc<Claim>, ctx: Arc<Context>) -> Result<Action, Error> {
    let namespace = claim
        .namespace()
        .ok_or_else(|| Error::invariant("claim has no namespace"))?;
    let name = claim.name_any();

    // The watched copy can lag our own status writes between immediate
    // requeues, so every pass starts from a fresh read.
    let Some(current) = ctx.store.get_claim(&namespace, &name).await? else {
        debug!("claim is gone; owner references handle grant cleanup");
        return Ok(Action::await_change());
    };

    match engine::run(ctx.store.as_ref(), &current).await? {
        Outcome::Retry => Ok(Action::requeue(Duration::ZERO)),
        Outcome::Converged(grant) => {
            projector::project(ctx.store.as_ref(), &current, &grant).await?;
            Ok(Action::await_change())
        }
        Outcome::Conflict { count } => {
            error!(count, "claim matches more than one grant, refusing to choose");
            Ok(Action::await_change())
        }
    }
}

/// Error policy for the controller
///
/// This function is called when reconciliation fails. Failed passes left
/// no partial writes worth undoing, so the policy is a plain delayed
/// retry of the whole pass.
///
/// # Arguments
///
/// * `claim` - The Claim that failed reconciliation
/// * `error` - The error that occurred
/// * `_ctx` - Shared controller context (unused but required by signature)
///
/// # Returns
///
/// Returns an `Action` to requeue the resource after a delay.
pub fn error_policy(claim: Arc<Claim>, error: &Error, _ctx: Arc<Context>) -> Action {
    error!(
        ?error,
        claim = %claim.name_any(),
        "reconciliation failed"
    );

    Action::requeue(Duration::from_secs(5))
}
