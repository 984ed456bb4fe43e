use async_trait::async_trait;
use billing_service::{
    BillingResult, Claim, ClaimFilter, ClaimRepository, Denial, DenialFilter, DenialRepository,
    FailureHandler,
};
use document_store::Subscription;
use std::sync::Arc;
use uuid::Uuid;

/// One tenant-scoped, filtered collection the synchronization layer can keep
/// current. Scoping parameters are captured at construction; changing them
/// means building a new source and a new handle.
#[async_trait]
pub trait CollectionSource: Send + Sync {
    type Record: Clone + Send + Sync + 'static;

    /// One-shot fetch of the current collection
    async fn fetch(&self) -> BillingResult<Vec<Self::Record>>;

    /// Attach a push subscription delivering the full collection on every
    /// remote change
    async fn subscribe(
        &self,
        on_change: Arc<dyn Fn(Vec<Self::Record>) + Send + Sync>,
        on_error: FailureHandler,
    ) -> BillingResult<Subscription>;
}

/// Claims of one tenant under a fixed set of filters
#[derive(Clone)]
pub struct ClaimSource {
    repository: ClaimRepository,
    tenant_id: Uuid,
    filters: Vec<ClaimFilter>,
}

impl ClaimSource {
    pub fn new(repository: ClaimRepository, tenant_id: Uuid, filters: Vec<ClaimFilter>) -> Self {
        Self {
            repository,
            tenant_id,
            filters,
        }
    }
}

#[async_trait]
impl CollectionSource for ClaimSource {
    type Record = Claim;

    async fn fetch(&self) -> BillingResult<Vec<Claim>> {
        self.repository.list_claims(self.tenant_id, &self.filters).await
    }

    async fn subscribe(
        &self,
        on_change: Arc<dyn Fn(Vec<Claim>) + Send + Sync>,
        on_error: FailureHandler,
    ) -> BillingResult<Subscription> {
        self.repository
            .subscribe_claims(self.tenant_id, &self.filters, on_change, on_error)
            .await
    }
}

/// Denials of one tenant under a fixed set of filters
#[derive(Clone)]
pub struct DenialSource {
    repository: DenialRepository,
    tenant_id: Uuid,
    filters: Vec<DenialFilter>,
}

impl DenialSource {
    pub fn new(repository: DenialRepository, tenant_id: Uuid, filters: Vec<DenialFilter>) -> Self {
        Self {
            repository,
            tenant_id,
            filters,
        }
    }
}

#[async_trait]
impl CollectionSource for DenialSource {
    type Record = Denial;

    async fn fetch(&self) -> BillingResult<Vec<Denial>> {
        self.repository
            .list_denials(self.tenant_id, &self.filters)
            .await
    }

    async fn subscribe(
        &self,
        on_change: Arc<dyn Fn(Vec<Denial>) + Send + Sync>,
        on_error: FailureHandler,
    ) -> BillingResult<Subscription> {
        self.repository
            .subscribe_denials(self.tenant_id, self.filters.clone(), on_change, on_error)
            .await
    }
}
