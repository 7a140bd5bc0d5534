//! Object store access for claims and grants
//!
//! All reads and writes the controller performs go through the
//! [`ClaimStore`] trait. Production uses [`KubeStore`], which talks to the
//! Kubernetes API server; tests use mocks or the in-memory fake.

use async_trait::async_trait;
use kube::api::{Api, ListParams, PostParams};
use kube::{Client, ResourceExt};

#[cfg(test)]
use mockall::automock;

use crate::crd::{Claim, Grant, CLAIM_LABEL};
use crate::Error;

/// Trait abstracting claim and grant storage
///
/// This trait allows mocking storage in tests while using the real
/// Kubernetes API in production. Implementations must provide cascading
/// delete of a claim's grants; [`KubeStore`] gets this from owner
/// references and the Kubernetes garbage collector.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Fetch a claim by namespace and name
    ///
    /// Returns `Ok(None)` when the claim does not exist.
    async fn get_claim(&self, namespace: &str, name: &str) -> Result<Option<Claim>, Error>;

    /// Fetch a grant by namespace and name
    ///
    /// Returns `Ok(None)` when the grant does not exist.
    async fn get_grant(&self, namespace: &str, name: &str) -> Result<Option<Grant>, Error>;

    /// List all grants labeled for the given claim
    async fn list_grants_for(&self, namespace: &str, claim_name: &str)
        -> Result<Vec<Grant>, Error>;

    /// Create a grant, returning it with its server-assigned metadata
    ///
    /// The grant is submitted with `generateName`, so the caller must read
    /// the returned object to learn the actual name.
    async fn create_grant(&self, grant: &Grant) -> Result<Grant, Error>;

    /// Replace a claim's status subresource
    ///
    /// The write carries the claim's resourceVersion. A concurrent update
    /// surfaces as a 409 conflict instead of silently clobbering it.
    async fn update_claim_status(&self, claim: &Claim) -> Result<Claim, Error>;
}

/// Real store implementation backed by the Kubernetes API
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    /// Create a new KubeStore wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn claims(&self, namespace: &str) -> Api<Claim> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn grants(&self, namespace: &str) -> Api<Grant> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClaimStore for KubeStore {
    async fn get_claim(&self, namespace: &str, name: &str) -> Result<Option<Claim>, Error> {
        Ok(self.claims(namespace).get_opt(name).await?)
    }

    async fn get_grant(&self, namespace: &str, name: &str) -> Result<Option<Grant>, Error> {
        Ok(self.grants(namespace).get_opt(name).await?)
    }

    async fn list_grants_for(
        &self,
        namespace: &str,
        claim_name: &str,
    ) -> Result<Vec<Grant>, Error> {
        let selector = format!("{}={}", CLAIM_LABEL, claim_name);
        let params = ListParams::default().labels(&selector);
        let grants = self.grants(namespace).list(&params).await?;
        Ok(grants.items)
    }

    async fn create_grant(&self, grant: &Grant) -> Result<Grant, Error> {
        let namespace = grant
            .namespace()
            .ok_or_else(|| Error::invariant("grant has no namespace"))?;
        Ok(self
            .grants(&namespace)
            .create(&PostParams::default(), grant)
            .await?)
    }

    async fn update_claim_status(&self, claim: &Claim) -> Result<Claim, Error> {
        let namespace = claim
            .namespace()
            .ok_or_else(|| Error::invariant("claim has no namespace"))?;
        let name = claim
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| Error::invariant("claim has no name"))?;
        let data = serde_json::to_vec(claim).map_err(|e| Error::serialization(e.to_string()))?;
        Ok(self
            .claims(&namespace)
            .replace_status(name, &PostParams::default(), data)
            .await?)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory store for reconciliation tests
    //!
    //! Mocks are good for scripting single calls; multi-pass stories need a
    //! store that actually remembers what earlier passes wrote. FakeStore
    //! reproduces the observable behavior the controller relies on:
    //! generateName assignment on create and status-only claim updates.

    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use kube::core::ErrorResponse;

    use super::ClaimStore;
    use crate::crd::{Claim, Grant, GrantStatus, CLAIM_LABEL};
    use crate::Error;

    /// In-memory ClaimStore keyed by "namespace/name"
    ///
    /// Mutation counters let tests assert that converged claims are left
    /// alone, and the failure toggles inject API outages and write
    /// conflicts.
    #[derive(Default)]
    pub(crate) struct FakeStore {
        claims: Mutex<BTreeMap<String, Claim>>,
        grants: Mutex<BTreeMap<String, Grant>>,
        sequence: AtomicUsize,
        grants_created: AtomicUsize,
        status_updates: AtomicUsize,
        fail_next_status_update: AtomicBool,
        fail_reads: AtomicBool,
    }

    impl FakeStore {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        fn key(namespace: &str, name: &str) -> String {
            format!("{namespace}/{name}")
        }

        fn object_key(namespace: &Option<String>, name: &Option<String>) -> String {
            Self::key(
                namespace.as_deref().unwrap_or_default(),
                name.as_deref().unwrap_or_default(),
            )
        }

        pub(crate) fn seed_claim(&self, claim: Claim) {
            let key = Self::object_key(&claim.metadata.namespace, &claim.metadata.name);
            self.claims.lock().unwrap().insert(key, claim);
        }

        pub(crate) fn seed_grant(&self, grant: Grant) {
            let key = Self::object_key(&grant.metadata.namespace, &grant.metadata.name);
            self.grants.lock().unwrap().insert(key, grant);
        }

        pub(crate) fn claim(&self, namespace: &str, name: &str) -> Option<Claim> {
            self.claims
                .lock()
                .unwrap()
                .get(&Self::key(namespace, name))
                .cloned()
        }

        pub(crate) fn grant(&self, namespace: &str, name: &str) -> Option<Grant> {
            self.grants
                .lock()
                .unwrap()
                .get(&Self::key(namespace, name))
                .cloned()
        }

        /// Names of all grants labeled for the given claim, sorted
        pub(crate) fn grant_names_for(&self, namespace: &str, claim_name: &str) -> Vec<String> {
            self.grants
                .lock()
                .unwrap()
                .values()
                .filter(|grant| grant.metadata.namespace.as_deref() == Some(namespace))
                .filter(|grant| labeled_for(grant, claim_name))
                .filter_map(|grant| grant.metadata.name.clone())
                .collect()
        }

        /// Delete a grant out from under the controller
        pub(crate) fn remove_grant(&self, namespace: &str, name: &str) {
            self.grants.lock().unwrap().remove(&Self::key(namespace, name));
        }

        /// Simulate the issuer reporting a state on a grant
        pub(crate) fn report_grant_state(&self, namespace: &str, name: &str, state: &str) {
            if let Some(grant) = self
                .grants
                .lock()
                .unwrap()
                .get_mut(&Self::key(namespace, name))
            {
                grant.status = Some(GrantStatus::with_state(state));
            }
        }

        pub(crate) fn created(&self) -> usize {
            self.grants_created.load(Ordering::SeqCst)
        }

        pub(crate) fn updates(&self) -> usize {
            self.status_updates.load(Ordering::SeqCst)
        }

        /// Make the next status update fail with a 409 conflict
        pub(crate) fn fail_next_status_update(&self) {
            self.fail_next_status_update.store(true, Ordering::SeqCst);
        }

        /// Make every read fail until cleared
        pub(crate) fn set_fail_reads(&self, fail: bool) {
            self.fail_reads.store(fail, Ordering::SeqCst);
        }

        fn check_reads(&self) -> Result<(), Error> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(api_error(503, "ServiceUnavailable", "apiserver unavailable"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ClaimStore for FakeStore {
        async fn get_claim(&self, namespace: &str, name: &str) -> Result<Option<Claim>, Error> {
            self.check_reads()?;
            Ok(self.claim(namespace, name))
        }

        async fn get_grant(&self, namespace: &str, name: &str) -> Result<Option<Grant>, Error> {
            self.check_reads()?;
            Ok(self.grant(namespace, name))
        }

        async fn list_grants_for(
            &self,
            namespace: &str,
            claim_name: &str,
        ) -> Result<Vec<Grant>, Error> {
            self.check_reads()?;
            Ok(self
                .grants
                .lock()
                .unwrap()
                .values()
                .filter(|grant| grant.metadata.namespace.as_deref() == Some(namespace))
                .filter(|grant| labeled_for(grant, claim_name))
                .cloned()
                .collect())
        }

        async fn create_grant(&self, grant: &Grant) -> Result<Grant, Error> {
            let mut created = grant.clone();
            if created.metadata.name.is_none() {
                let prefix = created
                    .metadata
                    .generate_name
                    .clone()
                    .unwrap_or_else(|| "grant-".to_string());
                let n = self.sequence.fetch_add(1, Ordering::SeqCst);
                created.metadata.name = Some(format!("{prefix}{n:05}"));
            }
            let key = Self::object_key(&created.metadata.namespace, &created.metadata.name);
            self.grants.lock().unwrap().insert(key, created.clone());
            self.grants_created.fetch_add(1, Ordering::SeqCst);
            Ok(created)
        }

        async fn update_claim_status(&self, claim: &Claim) -> Result<Claim, Error> {
            if self.fail_next_status_update.swap(false, Ordering::SeqCst) {
                return Err(api_error(409, "Conflict", "the object has been modified"));
            }
            let key = Self::object_key(&claim.metadata.namespace, &claim.metadata.name);
            let mut claims = self.claims.lock().unwrap();
            let stored = claims
                .get_mut(&key)
                .ok_or_else(|| api_error(404, "NotFound", "claims.warden.dev not found"))?;
            // Status writes replace only the subresource, never spec or metadata.
            stored.status = claim.status.clone();
            self.status_updates.fetch_add(1, Ordering::SeqCst);
            Ok(stored.clone())
        }
    }

    fn labeled_for(grant: &Grant, claim_name: &str) -> bool {
        grant
            .metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(CLAIM_LABEL))
            .map(String::as_str)
            == Some(claim_name)
    }

    fn api_error(code: u16, reason: &str, message: &str) -> Error {
        Error::Kube(kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: message.to_string(),
            reason: reason.to_string(),
            code,
        }))
    }
}
