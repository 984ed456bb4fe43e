use async_trait::async_trait;
use billing_service::{
    Actor, BillingError, BillingResult, Claim, ClaimRepository, ClaimStatus, ClaimType,
    DenialFilter, DenialInput, DenialReasonItem, FailureHandler, InsurerDirectory, NewClaim,
};
use billing_sync::{ClaimSource, CollectionSource, DenialSource, LiveSource, PolledSource};
use chrono::NaiveDate;
use document_store::{CollectionRef, MemoryStore, Subscription};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use uuid::Uuid;

fn setup() -> (Arc<MemoryStore>, ClaimRepository) {
    let store = Arc::new(MemoryStore::new());
    let repository = ClaimRepository::new(store.clone(), InsurerDirectory::new());
    (store, repository)
}

fn actor() -> Actor {
    Actor::new(Uuid::new_v4(), "Test Biller")
}

fn new_claim(insurer_id: Uuid) -> NewClaim {
    NewClaim {
        claim_type: ClaimType::Consultation,
        insurer_id,
        insurer_name: "Acme Health".to_string(),
        patient_id: Uuid::new_v4(),
        professional_id: Uuid::new_v4(),
        service_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        total_billed: Decimal::new(25000, 2),
    }
}

async fn deny_claim(
    repository: &ClaimRepository,
    tenant_id: Uuid,
    claim_id: Uuid,
    denied: Decimal,
) {
    let actor = actor();
    repository
        .update_status(tenant_id, claim_id, &actor, ClaimStatus::Submitted)
        .await
        .unwrap();
    repository
        .update_status(tenant_id, claim_id, &actor, ClaimStatus::UnderReview)
        .await
        .unwrap();
    repository
        .update_status_denied(
            tenant_id,
            claim_id,
            &actor,
            ClaimStatus::PartiallyDenied,
            DenialInput {
                denied_amount: denied,
                reason_items: vec![DenialReasonItem {
                    code: "1705".to_string(),
                    description: "Service not covered".to_string(),
                    denied_value: denied,
                }],
            },
        )
        .await
        .unwrap();
}

/// Fetch source whose calls block on a semaphore permit, so a test can hold a
/// fetch in flight while it races teardown
struct GatedSource {
    gate: Arc<Semaphore>,
    responses: Mutex<Vec<Vec<Claim>>>,
}

#[async_trait]
impl CollectionSource for GatedSource {
    type Record = Claim;

    async fn fetch(&self) -> BillingResult<Vec<Claim>> {
        self.gate.acquire().await.unwrap().forget();
        let mut responses = self.responses.lock().unwrap();
        Ok(responses.remove(0))
    }

    async fn subscribe(
        &self,
        _on_change: Arc<dyn Fn(Vec<Claim>) + Send + Sync>,
        _on_error: FailureHandler,
    ) -> BillingResult<Subscription> {
        Err(BillingError::Validation(
            "gated source has no push channel".to_string(),
        ))
    }
}

/// Source whose subscription flips a flag when detached
struct ProbeSource {
    detached: Arc<AtomicBool>,
}

#[async_trait]
impl CollectionSource for ProbeSource {
    type Record = Claim;

    async fn fetch(&self) -> BillingResult<Vec<Claim>> {
        Ok(Vec::new())
    }

    async fn subscribe(
        &self,
        on_change: Arc<dyn Fn(Vec<Claim>) + Send + Sync>,
        _on_error: FailureHandler,
    ) -> BillingResult<Subscription> {
        on_change(Vec::new());
        let detached = Arc::clone(&self.detached);
        Ok(Subscription::new(move || {
            detached.store(true, Ordering::SeqCst);
        }))
    }
}

#[tokio::test]
async fn polled_attach_performs_the_initial_fetch() {
    let (_store, repository) = setup();
    let tenant_id = Uuid::new_v4();
    let actor = actor();
    repository
        .create_claim(tenant_id, &actor, new_claim(Uuid::new_v4()))
        .await
        .unwrap();
    repository
        .create_claim(tenant_id, &actor, new_claim(Uuid::new_v4()))
        .await
        .unwrap();

    let polled =
        PolledSource::attach(ClaimSource::new(repository, tenant_id, Vec::new())).await;
    let snapshot = polled.snapshot();

    assert_eq!(snapshot.records.len(), 2);
    assert!(!snapshot.loading);
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn polled_refresh_picks_up_new_records() {
    let (_store, repository) = setup();
    let tenant_id = Uuid::new_v4();
    let actor = actor();

    let polled = PolledSource::attach(ClaimSource::new(
        repository.clone(),
        tenant_id,
        Vec::new(),
    ))
    .await;
    assert!(polled.snapshot().records.is_empty());

    repository
        .create_claim(tenant_id, &actor, new_claim(Uuid::new_v4()))
        .await
        .unwrap();
    // On-demand mode never sees the write until asked
    assert!(polled.snapshot().records.is_empty());

    polled.refresh().await;
    assert_eq!(polled.snapshot().records.len(), 1);
}

#[tokio::test]
async fn polled_fetch_failure_keeps_stale_records() {
    let (store, repository) = setup();
    let tenant_id = Uuid::new_v4();
    repository
        .create_claim(tenant_id, &actor(), new_claim(Uuid::new_v4()))
        .await
        .unwrap();

    let polled = PolledSource::attach(ClaimSource::new(
        repository.clone(),
        tenant_id,
        Vec::new(),
    ))
    .await;
    assert_eq!(polled.snapshot().records.len(), 1);

    store.inject_read_failures(1);
    polled.refresh().await;

    let snapshot = polled.snapshot();
    assert!(snapshot.error.is_some());
    assert!(!snapshot.loading);
    assert_eq!(snapshot.records.len(), 1, "stale records must survive a failed refresh");

    // The next successful refresh clears the error
    polled.refresh().await;
    assert!(polled.snapshot().error.is_none());
}

#[tokio::test]
async fn refresh_racing_teardown_is_discarded() {
    let tenant_id = Uuid::new_v4();
    let attached = Claim {
        id: Uuid::new_v4(),
        tenant_id,
        claim_type: ClaimType::Exam,
        sequence_number: 1,
        insurer_id: Uuid::new_v4(),
        insurer_name: "Acme Health".to_string(),
        patient_id: Uuid::new_v4(),
        professional_id: Uuid::new_v4(),
        service_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        total_billed: Decimal::new(25000, 2),
        amount_paid: Decimal::ZERO,
        amount_denied: Decimal::ZERO,
        status: ClaimStatus::Draft,
        authorized_at: None,
        paid_at: None,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
        created_by: Uuid::new_v4(),
        updated_by: Uuid::new_v4(),
    };
    let attached_id = attached.id;
    let late = Claim {
        id: Uuid::new_v4(),
        ..attached.clone()
    };

    let gate = Arc::new(Semaphore::new(1));
    let source = GatedSource {
        gate: Arc::clone(&gate),
        responses: Mutex::new(vec![vec![attached], vec![late]]),
    };

    // The single permit lets the attach fetch through; the refresh below
    // blocks until the test opens the gate again
    let polled = Arc::new(PolledSource::attach(source).await);
    assert_eq!(polled.snapshot().records.len(), 1);

    let racing = Arc::clone(&polled);
    let refresh = tokio::spawn(async move { racing.refresh().await });
    tokio::task::yield_now().await;

    polled.detach();
    gate.add_permits(1);
    refresh.await.unwrap();

    let snapshot = polled.snapshot();
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.records[0].id, attached_id);
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn live_attach_tracks_remote_writes() {
    let (_store, repository) = setup();
    let tenant_id = Uuid::new_v4();
    let actor = actor();
    repository
        .create_claim(tenant_id, &actor, new_claim(Uuid::new_v4()))
        .await
        .unwrap();

    let live = LiveSource::attach(ClaimSource::new(
        repository.clone(),
        tenant_id,
        Vec::new(),
    ))
    .await;

    let snapshot = live.snapshot();
    assert_eq!(snapshot.records.len(), 1);
    assert!(!snapshot.loading);

    repository
        .create_claim(tenant_id, &actor, new_claim(Uuid::new_v4()))
        .await
        .unwrap();

    let snapshot = live.snapshot();
    assert_eq!(snapshot.records.len(), 2);
    assert!(!snapshot.loading, "redeliveries never flip loading back");
}

#[tokio::test]
async fn live_detach_stops_deliveries() {
    let (_store, repository) = setup();
    let tenant_id = Uuid::new_v4();
    let actor = actor();

    let live = LiveSource::attach(ClaimSource::new(
        repository.clone(),
        tenant_id,
        Vec::new(),
    ))
    .await;
    assert!(live.snapshot().records.is_empty());

    live.detach();
    repository
        .create_claim(tenant_id, &actor, new_claim(Uuid::new_v4()))
        .await
        .unwrap();

    assert!(live.snapshot().records.is_empty());
}

#[tokio::test]
async fn dropping_a_live_source_detaches_exactly_once() {
    let detached = Arc::new(AtomicBool::new(false));

    let live = LiveSource::attach(ProbeSource {
        detached: Arc::clone(&detached),
    })
    .await;
    assert!(!detached.load(Ordering::SeqCst));

    // Explicit detach plus drop must not double-run the teardown closure
    live.detach();
    assert!(detached.load(Ordering::SeqCst));
    drop(live);
    assert!(detached.load(Ordering::SeqCst));
}

#[tokio::test]
async fn live_channel_failure_keeps_records_until_redelivery() {
    let (store, repository) = setup();
    let tenant_id = Uuid::new_v4();
    let actor = actor();
    repository
        .create_claim(tenant_id, &actor, new_claim(Uuid::new_v4()))
        .await
        .unwrap();

    let live = LiveSource::attach(ClaimSource::new(
        repository.clone(),
        tenant_id,
        Vec::new(),
    ))
    .await;
    assert_eq!(live.snapshot().records.len(), 1);

    store.inject_channel_failure(&CollectionRef::claims(tenant_id));
    let snapshot = live.snapshot();
    assert!(snapshot.error.is_some());
    assert_eq!(snapshot.records.len(), 1);

    // The next delivery recovers the view
    repository
        .create_claim(tenant_id, &actor, new_claim(Uuid::new_v4()))
        .await
        .unwrap();
    let snapshot = live.snapshot();
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.records.len(), 2);
}

#[tokio::test]
async fn live_subscribe_failure_surfaces_and_refresh_recovers() {
    let (store, repository) = setup();
    let tenant_id = Uuid::new_v4();
    repository
        .create_claim(tenant_id, &actor(), new_claim(Uuid::new_v4()))
        .await
        .unwrap();

    store.inject_read_failures(1);
    let live = LiveSource::attach(ClaimSource::new(
        repository.clone(),
        tenant_id,
        Vec::new(),
    ))
    .await;

    let snapshot = live.snapshot();
    assert!(snapshot.error.is_some());
    assert!(snapshot.records.is_empty());

    live.refresh().await;
    let snapshot = live.snapshot();
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.records.len(), 1);
}

#[tokio::test]
async fn denial_source_scopes_to_the_claim_filter() {
    let (_store, repository) = setup();
    let tenant_id = Uuid::new_v4();
    let actor = actor();

    let first = repository
        .create_claim(tenant_id, &actor, new_claim(Uuid::new_v4()))
        .await
        .unwrap();
    let second = repository
        .create_claim(tenant_id, &actor, new_claim(Uuid::new_v4()))
        .await
        .unwrap();
    deny_claim(&repository, tenant_id, first.id, Decimal::new(10000, 2)).await;
    deny_claim(&repository, tenant_id, second.id, Decimal::new(5000, 2)).await;

    let polled = PolledSource::attach(DenialSource::new(
        repository.denials().clone(),
        tenant_id,
        vec![DenialFilter::Claim(first.id)],
    ))
    .await;

    let snapshot = polled.snapshot();
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.records[0].claim_id, first.id);
    assert_eq!(snapshot.records[0].denied_amount, Decimal::new(10000, 2));
}
