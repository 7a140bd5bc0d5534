//! Single-pass reconciliation engine for claims
//!
//! Each pass observes the world once, decides one step from that
//! observation, and performs at most one write. Multi-step convergence
//! comes from the controller requeueing, never from looping in here.
//! A crashed pass therefore loses at most one idempotent action.

use tracing::{debug, info, warn};

use crate::crd::{Claim, ClaimStatus, Grant};
use crate::resolver::{self, Matches};
use crate::store::ClaimStore;
use crate::{factory, Error};

/// What one observation of the store showed for a claim
#[derive(Debug)]
pub enum Observation {
    /// The claim records a grant name; this is what the lookup found
    Named(Option<Grant>),
    /// The claim records nothing; this is what the label scout found
    Labeled(Matches),
}

/// The single step a pass takes in response to an observation
#[derive(Debug)]
pub enum Step {
    /// Create a fresh grant for the claim
    Create,
    /// Record this grant's name on the claim
    Record(Grant),
    /// Clear the claim's stale grant reference
    Clear,
    /// The recorded grant exists; the binding is settled
    Confirm(Grant),
    /// Competing grants were found; do nothing
    Conflict {
        /// How many grants matched the claim
        count: usize,
    },
}

/// Result of one engine pass
#[derive(Debug)]
pub enum Outcome {
    /// Something changed; run another pass right away
    Retry,
    /// The claim is bound to this grant and nothing needed changing
    Converged(Grant),
    /// Competing grants exist; needs intervention, not retries
    Conflict {
        /// How many grants matched the claim
        count: usize,
    },
}

/// Decide the step for an observation
///
/// This is the whole policy of the controller in one total function. Every
/// observation maps to exactly one step, so there is no "unknown state"
/// path at runtime and no case the tests cannot reach.
pub fn transition(observation: Observation) -> Step {
    match observation {
        Observation::Named(Some(grant)) => Step::Confirm(grant),
        Observation::Named(None) => Step::Clear,
        Observation::Labeled(Matches::One(grant)) => Step::Record(grant),
        Observation::Labeled(Matches::None) => Step::Create,
        Observation::Labeled(Matches::Many(count)) => Step::Conflict { count },
    }
}

/// Run one observe-decide-act pass for a claim
///
/// Reads are answered by the store as it is now; the claim argument only
/// contributes its identity and recorded grant name. At most one write
/// happens per pass.
pub async fn run(store: &dyn ClaimStore, claim: &Claim) -> Result<Outcome, Error> {
    let namespace = claim
        .metadata
        .namespace
        .as_deref()
        .ok_or_else(|| Error::invariant("claim has no namespace"))?;
    let name = claim
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| Error::invariant("claim has no name"))?;

    let observation = match claim.recorded_grant() {
        Some(recorded) => {
            debug!(grant = %recorded, "checking the recorded grant");
            Observation::Named(resolver::by_name(store, namespace, recorded).await?)
        }
        None => {
            debug!("no grant recorded, scouting by label");
            Observation::Labeled(resolver::by_label(store, namespace, name).await?)
        }
    };

    match transition(observation) {
        Step::Create => {
            let grant = factory::grant_for(claim)?;
            let created = store.create_grant(&grant).await?;
            info!(
                grant = created.metadata.name.as_deref().unwrap_or_default(),
                "created grant"
            );
            Ok(Outcome::Retry)
        }
        Step::Record(grant) => {
            let grant_name = grant
                .metadata
                .name
                .ok_or_else(|| Error::invariant("listed grant has no name"))?;
            info!(grant = %grant_name, "recording grant on claim");
            let mut updated = claim.clone();
            let status = updated.status.get_or_insert_with(ClaimStatus::default);
            status.grant_name = Some(grant_name);
            store.update_claim_status(&updated).await?;
            Ok(Outcome::Retry)
        }
        Step::Clear => {
            warn!("recorded grant is gone, clearing the reference");
            let mut updated = claim.clone();
            if let Some(status) = updated.status.as_mut() {
                status.grant_name = None;
            }
            store.update_claim_status(&updated).await?;
            Ok(Outcome::Retry)
        }
        Step::Confirm(grant) => {
            debug!("recorded grant exists, binding is settled");
            Ok(Outcome::Converged(grant))
        }
        Step::Conflict { count } => Ok(Outcome::Conflict { count }),
    }
}
