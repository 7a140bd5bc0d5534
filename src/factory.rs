//! Construction of grants for claims
//!
//! The factory builds the in-memory Grant a claim should own. It never
//! talks to the store; creating the object is the engine's job.

use std::collections::BTreeMap;

use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};

use crate::crd::{Claim, Grant, GrantSpec, CLAIM_LABEL};
use crate::Error;

/// Prefix handed to generateName so the server picks the final grant name
pub const GRANT_NAME_PREFIX: &str = "grant-";

/// Build the grant that should back the given claim
///
/// The grant is created in the claim's namespace with three pieces of
/// bookkeeping wired in:
///
/// * `generateName`, so the API server assigns a collision-free name
/// * the claim label, so unbound claims can find it again
/// * a controller owner reference, so deleting the claim deletes the grant
pub fn grant_for(claim: &Claim) -> Result<Grant, Error> {
    let namespace = claim
        .namespace()
        .ok_or_else(|| Error::invariant("claim has no namespace"))?;
    let owner = claim
        .controller_owner_ref(&())
        .ok_or_else(|| Error::invariant("claim has no name or uid"))?;

    Ok(Grant {
        metadata: ObjectMeta {
            namespace: Some(namespace),
            generate_name: Some(GRANT_NAME_PREFIX.to_string()),
            labels: Some(BTreeMap::from([(
                CLAIM_LABEL.to_string(),
                claim.name_any(),
            )])),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: GrantSpec {
            profile: claim.spec.profile.clone(),
        },
        status: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ClaimSpec;

    fn sample_claim(name: &str) -> Claim {
        let mut claim = Claim::new(
            name,
            ClaimSpec {
                profile: Some("standard".to_string()),
            },
        );
        claim.metadata.namespace = Some("team-a".to_string());
        claim.metadata.uid = Some("c0ffee00-2a75-4d1a-9c43-000000000001".to_string());
        claim
    }

    // =========================================================================
    // Grant Construction Stories
    // =========================================================================

    /// Story: The grant lands in the claim's namespace with a generated name
    ///
    /// The controller never picks grant names itself. It submits a prefix
    /// and reads the name the API server chose from the create response.
    #[test]
    fn story_grant_uses_generate_name_in_claim_namespace() {
        let claim = sample_claim("media-cache");

        let grant = grant_for(&claim).unwrap();

        assert_eq!(grant.metadata.namespace.as_deref(), Some("team-a"));
        assert_eq!(grant.metadata.name, None, "name is the server's call");
        assert_eq!(grant.metadata.generate_name.as_deref(), Some("grant-"));
    }

    /// Story: The grant is labeled for its claim
    ///
    /// The label is how an unbound claim finds a grant it created on an
    /// earlier pass, so it must point back at the claim by name.
    #[test]
    fn story_grant_carries_the_claim_label() {
        let claim = sample_claim("media-cache");

        let grant = grant_for(&claim).unwrap();

        let labels = grant.metadata.labels.expect("labels should be set");
        assert_eq!(labels.get(CLAIM_LABEL).map(String::as_str), Some("media-cache"));
    }

    /// Story: The claim owns the grant for garbage collection
    ///
    /// A controller owner reference makes the Kubernetes garbage collector
    /// delete the grant when its claim is deleted. No finalizer needed.
    #[test]
    fn story_grant_is_owned_by_its_claim() {
        let claim = sample_claim("media-cache");

        let grant = grant_for(&claim).unwrap();

        let owners = grant
            .metadata
            .owner_references
            .expect("owner references should be set");
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "Claim");
        assert_eq!(owners[0].name, "media-cache");
        assert_eq!(owners[0].controller, Some(true));
    }

    /// Story: The claim's profile rides along on the grant
    #[test]
    fn story_grant_copies_the_claim_profile() {
        let claim = sample_claim("media-cache");

        let grant = grant_for(&claim).unwrap();

        assert_eq!(grant.spec.profile.as_deref(), Some("standard"));
        assert!(grant.status.is_none(), "issuer owns the status");
    }

    /// Story: A claim the API server has not finished admitting is rejected
    ///
    /// Without a uid there is nothing to hang an owner reference on.
    /// Watchers only deliver admitted objects, so hitting this means a
    /// bug, and it fails loudly instead of creating an orphan.
    #[test]
    fn story_claim_without_uid_is_rejected() {
        let mut claim = sample_claim("media-cache");
        claim.metadata.uid = None;

        let result = grant_for(&claim);

        assert!(matches!(result, Err(Error::Invariant(_))));
    }

    /// Story: A claim with no namespace is rejected
    #[test]
    fn story_claim_without_namespace_is_rejected() {
        let mut claim = sample_claim("media-cache");
        claim.metadata.namespace = None;

        let result = grant_for(&claim);

        assert!(matches!(result, Err(Error::Invariant(_))));
    }
}
