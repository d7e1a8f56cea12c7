//! Rating Domain Ports
//!
//! The catalogue port lives next to the snapshot it produces (see
//! [`crate::catalogue::CataloguePort`]). This module holds the ports for
//! persisting quotes and for asking whether a quote lineage is locked.
//!
//! Rating itself never calls these; [`crate::engine::RatingService`] does,
//! after the pure computation has finished.

use async_trait::async_trait;

use core_kernel::{DomainPort, PortError, QuoteRequestId, QuoteResultId};

use crate::quote::{QuoteRequest, QuoteResult};

/// Storage for quote requests and their results
#[async_trait]
pub trait QuoteStore: DomainPort {
    /// Stores the first version of a lineage with its results
    async fn insert_request(
        &self,
        request: &QuoteRequest,
        results: &[QuoteResult],
    ) -> Result<(), PortError>;

    /// Retires `previous` and stores `successor` with its results
    ///
    /// Fails with `PortError::Conflict` when `previous` is no longer the
    /// current version, so two concurrent revisions cannot both win.
    async fn insert_version(
        &self,
        previous: &QuoteRequest,
        successor: &QuoteRequest,
        results: &[QuoteResult],
    ) -> Result<(), PortError>;

    /// Overwrites a request's details and replaces its results
    ///
    /// Fails with `PortError::Conflict` when the stored request is no longer
    /// current or its lineage has become locked. The check and the write are
    /// one atomic step, so an approval that lands after the caller's own lock
    /// check still refuses the edit.
    async fn replace_request(
        &self,
        request: &QuoteRequest,
        results: &[QuoteResult],
    ) -> Result<(), PortError>;

    async fn get_request(&self, id: QuoteRequestId) -> Result<QuoteRequest, PortError>;

    /// Results in the order they were rated
    async fn results_for(&self, id: QuoteRequestId) -> Result<Vec<QuoteResult>, PortError>;

    async fn get_result(&self, id: QuoteResultId) -> Result<QuoteResult, PortError>;
}

/// Answers whether a lineage has a proposal in an approved state
#[async_trait]
pub trait LineageLock: DomainPort {
    async fn is_lineage_locked(&self, lineage_id: QuoteRequestId) -> Result<bool, PortError>;
}

/// Mock implementations for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory quote store
    ///
    /// With a lineage lock attached, in-place edits consult it while the
    /// request map is held for writing, mirroring the guarded `UPDATE` of the
    /// database store.
    #[derive(Default, Clone)]
    pub struct InMemoryQuoteStore {
        requests: Arc<RwLock<HashMap<QuoteRequestId, QuoteRequest>>>,
        results: Arc<RwLock<HashMap<QuoteRequestId, Vec<QuoteResult>>>>,
        lineage_lock: Option<Arc<dyn LineageLock>>,
    }

    impl std::fmt::Debug for InMemoryQuoteStore {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("InMemoryQuoteStore")
                .field("guarded", &self.lineage_lock.is_some())
                .finish_non_exhaustive()
        }
    }

    impl InMemoryQuoteStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_lineage_lock(mut self, lock: Arc<dyn LineageLock>) -> Self {
            self.lineage_lock = Some(lock);
            self
        }

        pub async fn request_count(&self) -> usize {
            self.requests.read().await.len()
        }
    }

    impl DomainPort for InMemoryQuoteStore {}

    #[async_trait]
    impl QuoteStore for InMemoryQuoteStore {
        async fn insert_request(
            &self,
            request: &QuoteRequest,
            results: &[QuoteResult],
        ) -> Result<(), PortError> {
            let mut requests = self.requests.write().await;
            if requests.contains_key(&request.id) {
                return Err(PortError::conflict(format!("{} already exists", request.id)));
            }
            requests.insert(request.id, request.clone());
            self.results.write().await.insert(request.id, results.to_vec());
            Ok(())
        }

        async fn insert_version(
            &self,
            previous: &QuoteRequest,
            successor: &QuoteRequest,
            results: &[QuoteResult],
        ) -> Result<(), PortError> {
            let mut requests = self.requests.write().await;
            let stored = requests
                .get_mut(&previous.id)
                .ok_or_else(|| PortError::not_found("QuoteRequest", previous.id))?;
            if !stored.is_current {
                return Err(PortError::conflict(format!(
                    "{} is no longer the current version",
                    previous.id
                )));
            }
            stored.is_current = false;
            requests.insert(successor.id, successor.clone());
            self.results.write().await.insert(successor.id, results.to_vec());
            Ok(())
        }

        async fn replace_request(
            &self,
            request: &QuoteRequest,
            results: &[QuoteResult],
        ) -> Result<(), PortError> {
            let mut requests = self.requests.write().await;
            let stored = requests
                .get(&request.id)
                .ok_or_else(|| PortError::not_found("QuoteRequest", request.id))?;
            if !stored.is_current {
                return Err(PortError::conflict(format!(
                    "{} is no longer the current version",
                    request.id
                )));
            }
            if let Some(lock) = &self.lineage_lock {
                if lock.is_lineage_locked(stored.lineage_id).await? {
                    return Err(PortError::conflict(format!(
                        "lineage {} is locked",
                        stored.lineage_id
                    )));
                }
            }
            requests.insert(request.id, request.clone());
            self.results.write().await.insert(request.id, results.to_vec());
            Ok(())
        }

        async fn get_request(&self, id: QuoteRequestId) -> Result<QuoteRequest, PortError> {
            self.requests
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("QuoteRequest", id))
        }

        async fn results_for(&self, id: QuoteRequestId) -> Result<Vec<QuoteResult>, PortError> {
            Ok(self
                .results
                .read()
                .await
                .get(&id)
                .cloned()
                .unwrap_or_default())
        }

        async fn get_result(&self, id: QuoteResultId) -> Result<QuoteResult, PortError> {
            self.results
                .read()
                .await
                .values()
                .flatten()
                .find(|result| result.id == id)
                .cloned()
                .ok_or_else(|| PortError::not_found("QuoteResult", id))
        }
    }

    /// Lineage lock with a settable set of locked lineages
    #[derive(Debug, Default, Clone)]
    pub struct StaticLineageLock {
        locked: Arc<RwLock<HashSet<QuoteRequestId>>>,
    }

    impl StaticLineageLock {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn lock(&self, lineage_id: QuoteRequestId) {
            self.locked.write().await.insert(lineage_id);
        }
    }

    impl DomainPort for StaticLineageLock {}

    #[async_trait]
    impl LineageLock for StaticLineageLock {
        async fn is_lineage_locked(&self, lineage_id: QuoteRequestId) -> Result<bool, PortError> {
            Ok(self.locked.read().await.contains(&lineage_id))
        }
    }
}
