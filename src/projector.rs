//! Mirroring of grant state onto claims
//!
//! Once a claim is bound, whatever its grant reports becomes visible on
//! the claim itself. The copy is byte for byte; nothing is interpreted,
//! trimmed, or normalized along the way.

use tracing::{debug, info};

use crate::crd::{Claim, ClaimStatus, Grant};
use crate::store::ClaimStore;
use crate::Error;

/// Copy the grant's reported state onto the claim
///
/// Writes only when the mirrored value would actually change, so running
/// this against a settled claim is free. A grant that has reported
/// nothing mirrors as the empty string, which marks the binding as
/// confirmed even before the issuer shows up.
pub async fn project(store: &dyn ClaimStore, claim: &Claim, grant: &Grant) -> Result<(), Error> {
    let state = grant.state();
    if claim.mirrored_state() == Some(state) {
        debug!("grant state already mirrored");
        return Ok(());
    }

    info!(state = %state, "mirroring grant state onto claim");
    let mut updated = claim.clone();
    let status = updated.status.get_or_insert_with(ClaimStatus::default);
    status.grant_state = Some(state.to_string());
    store.update_claim_status(&updated).await?;
    Ok(())
}
