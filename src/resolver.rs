//! Grant lookups on behalf of a claim
//!
//! A claim finds its grant two ways: by the exact name recorded in its
//! status, or by scouting the claim label when nothing is recorded yet.
//! Both lookups are read-only.

use crate::crd::Grant;
use crate::store::ClaimStore;
use crate::Error;

/// Result of a label scout for a claim's grants
///
/// The multiplicity matters more than the objects: zero means create one,
/// one means adopt it, more than one means stop and let a human look.
#[derive(Debug)]
pub enum Matches {
    /// No grant carries the claim's label
    None,
    /// Exactly one grant carries the claim's label
    One(Grant),
    /// More than one grant carries the claim's label
    Many(usize),
}

/// Look up a grant by its exact name
///
/// Returns `Ok(None)` when no grant with that name exists. Callers must
/// only pass names actually recorded on a claim; an empty name means the
/// caller skipped the recorded-name check, and gets an invariant error
/// rather than a lookup for "".
pub async fn by_name(
    store: &dyn ClaimStore,
    namespace: &str,
    name: &str,
) -> Result<Option<Grant>, Error> {
    if name.is_empty() {
        return Err(Error::invariant("grant lookup by empty name"));
    }
    store.get_grant(namespace, name).await
}

/// Scout for grants labeled with the given claim name
pub async fn by_label(
    store: &dyn ClaimStore,
    namespace: &str,
    claim_name: &str,
) -> Result<Matches, Error> {
    let mut grants = store.list_grants_for(namespace, claim_name).await?;
    Ok(if grants.len() > 1 {
        Matches::Many(grants.len())
    } else if let Some(grant) = grants.pop() {
        Matches::One(grant)
    } else {
        Matches::None
    })
}
