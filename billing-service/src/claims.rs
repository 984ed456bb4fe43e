use crate::config::InsurerDirectory;
use crate::denials::DenialRepository;
use crate::error::{BillingError, BillingResult, FailureHandler};
use crate::lifecycle::validate_claim_transition;
use crate::models::{Actor, Claim, ClaimStatus, Denial, DenialInput, DenialStatus, NewClaim};
use chrono::Utc;
use document_store::{CollectionRef, DocumentStore, FilterSpec, StoreError, Subscription};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Delivery callback for claim subscriptions
pub type ClaimChangeHandler = Arc<dyn Fn(Vec<Claim>) + Send + Sync>;

/// Typed filters accepted at the repository boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimFilter {
    Status(ClaimStatus),
    Patient(Uuid),
    Professional(Uuid),
    Insurer(Uuid),
    Limit(usize),
}

/// CRUD and query access to claim ("guia") records, scoped to a tenant.
/// Owns status-transition writes, derived timestamp stamping and the
/// cross-repository invariant that a denied transition creates its denial
/// record.
#[derive(Clone)]
pub struct ClaimRepository {
    store: Arc<dyn DocumentStore>,
    denials: DenialRepository,
}

impl ClaimRepository {
    pub fn new(store: Arc<dyn DocumentStore>, insurers: InsurerDirectory) -> Self {
        let denials = DenialRepository::new(Arc::clone(&store), insurers);
        Self { store, denials }
    }

    /// List claims matching the filters, ordered by service date descending.
    /// No matches is an empty vec, never an error.
    pub async fn list_claims(
        &self,
        tenant_id: Uuid,
        filters: &[ClaimFilter],
    ) -> BillingResult<Vec<Claim>> {
        let docs = self
            .store
            .list_documents(CollectionRef::claims(tenant_id), &claim_filter_spec(filters))
            .await?;
        decode_claims(docs)
    }

    pub async fn get_claim(&self, tenant_id: Uuid, id: Uuid) -> BillingResult<Option<Claim>> {
        let doc = self
            .store
            .get_document(&CollectionRef::claims(tenant_id).doc(id))
            .await?;
        doc.map(decode_claim).transpose()
    }

    /// Create a claim in `Draft` with the next per-tenant sequence number
    pub async fn create_claim(
        &self,
        tenant_id: Uuid,
        actor: &Actor,
        input: NewClaim,
    ) -> BillingResult<Claim> {
        if input.total_billed < Decimal::ZERO {
            return Err(BillingError::Validation(
                "billed amount must not be negative".to_string(),
            ));
        }

        let sequence_number = self.next_sequence_number(tenant_id).await?;
        let now = Utc::now();
        let claim = Claim {
            id: Uuid::nil(),
            tenant_id,
            claim_type: input.claim_type,
            sequence_number,
            insurer_id: input.insurer_id,
            insurer_name: input.insurer_name,
            patient_id: input.patient_id,
            professional_id: input.professional_id,
            service_date: input.service_date,
            total_billed: input.total_billed,
            amount_paid: Decimal::ZERO,
            amount_denied: Decimal::ZERO,
            status: ClaimStatus::Draft,
            authorized_at: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
            created_by: actor.id,
            updated_by: actor.id,
        };

        let doc = serde_json::to_value(&claim).map_err(StoreError::from)?;
        let id = self
            .store
            .create_document(CollectionRef::claims(tenant_id), doc)
            .await?;

        info!(tenant = %tenant_id, claim = %id, sequence = sequence_number, "claim created");
        Ok(Claim { id, ..claim })
    }

    /// Move a claim to a new non-denied status. Denied targets carry denial
    /// details and go through `update_status_denied`.
    pub async fn update_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        actor: &Actor,
        new_status: ClaimStatus,
    ) -> BillingResult<Claim> {
        if new_status.is_denied() {
            return Err(BillingError::Validation(
                "denied transitions require denial details".to_string(),
            ));
        }

        let claim = self.require_claim(tenant_id, id).await?;
        validate_claim_transition(claim.status, new_status).map_err(|err| {
            warn!(claim = %id, from = %claim.status, to = %new_status, "transition rejected");
            err
        })?;

        // Payment out of a denied status is only reachable once every denial
        // on the claim has been resolved
        if new_status == ClaimStatus::Paid && claim.status.is_denied() {
            let denials = self
                .denials
                .list_denials(tenant_id, &[crate::denials::DenialFilter::Claim(id)])
                .await?;
            if denials
                .iter()
                .any(|denial| denial.status != DenialStatus::Resolved)
            {
                return Err(BillingError::Validation(
                    "claim has unresolved denials".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let mut patch = json!({
            "status": new_status,
            "updated_at": now,
            "updated_by": actor.id,
        });
        match new_status {
            ClaimStatus::Authorized => patch["authorized_at"] = json!(now),
            ClaimStatus::Paid => patch["paid_at"] = json!(now),
            _ => {}
        }

        self.store
            .update_document(&CollectionRef::claims(tenant_id).doc(id), patch)
            .await?;
        info!(tenant = %tenant_id, claim = %id, from = %claim.status, to = %new_status, "claim status updated");
        self.require_claim(tenant_id, id).await
    }

    /// Move a claim into a denied status and synchronously create the paired
    /// denial record. If the denial write fails the claim status is rolled
    /// back so a denied claim never exists without its denial.
    pub async fn update_status_denied(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        actor: &Actor,
        new_status: ClaimStatus,
        input: DenialInput,
    ) -> BillingResult<(Claim, Denial)> {
        if !new_status.is_denied() {
            return Err(BillingError::Validation(
                "expected a denied target status".to_string(),
            ));
        }

        let claim = self.require_claim(tenant_id, id).await?;
        validate_claim_transition(claim.status, new_status).map_err(|err| {
            warn!(claim = %id, from = %claim.status, to = %new_status, "transition rejected");
            err
        })?;
        if input.denied_amount > claim.total_billed {
            return Err(BillingError::Validation(format!(
                "denied amount {} exceeds billed amount {}",
                input.denied_amount, claim.total_billed
            )));
        }

        let doc_ref = CollectionRef::claims(tenant_id).doc(id);
        let now = Utc::now();
        self.store
            .update_document(
                &doc_ref,
                json!({
                    "status": new_status,
                    "amount_denied": input.denied_amount,
                    "updated_at": now,
                    "updated_by": actor.id,
                }),
            )
            .await?;

        let denied_claim = Claim {
            status: new_status,
            amount_denied: input.denied_amount,
            ..claim.clone()
        };

        match self
            .denials
            .create_for_claim(tenant_id, &denied_claim, input)
            .await
        {
            Ok(denial) => {
                info!(tenant = %tenant_id, claim = %id, denial = %denial.id, "claim denied");
                Ok((self.require_claim(tenant_id, id).await?, denial))
            }
            Err(err) => {
                // Compensating write: revert the claim so it does not sit in
                // a denied status with no denial record
                warn!(claim = %id, "denial creation failed, reverting claim status");
                let revert = json!({
                    "status": claim.status,
                    "amount_denied": claim.amount_denied,
                    "updated_at": Utc::now(),
                    "updated_by": actor.id,
                });
                if let Err(revert_err) = self.store.update_document(&doc_ref, revert).await {
                    error!(claim = %id, error = %revert_err, "failed to revert claim after denial failure");
                }
                Err(err)
            }
        }
    }

    /// Record an insurer payment amount against the claim
    pub async fn record_payment(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        actor: &Actor,
        amount: Decimal,
    ) -> BillingResult<Claim> {
        let claim = self.require_claim(tenant_id, id).await?;
        if amount < Decimal::ZERO {
            return Err(BillingError::Validation(
                "paid amount must not be negative".to_string(),
            ));
        }
        if amount > claim.total_billed {
            return Err(BillingError::Validation(format!(
                "paid amount {} exceeds billed amount {}",
                amount, claim.total_billed
            )));
        }

        self.store
            .update_document(
                &CollectionRef::claims(tenant_id).doc(id),
                json!({
                    "amount_paid": amount,
                    "updated_at": Utc::now(),
                    "updated_by": actor.id,
                }),
            )
            .await?;
        self.require_claim(tenant_id, id).await
    }

    /// Delete a claim. Permitted for drafts only; anything submitted is kept
    /// for regulatory retention.
    pub async fn delete_claim(&self, tenant_id: Uuid, id: Uuid) -> BillingResult<()> {
        let claim = self.require_claim(tenant_id, id).await?;
        if claim.status != ClaimStatus::Draft {
            return Err(BillingError::Validation(
                "only draft claims may be deleted".to_string(),
            ));
        }
        self.store
            .delete_document(&CollectionRef::claims(tenant_id).doc(id))
            .await?;
        info!(tenant = %tenant_id, claim = %id, "draft claim deleted");
        Ok(())
    }

    /// Attach a push subscription delivering the filtered claim collection
    pub async fn subscribe_claims(
        &self,
        tenant_id: Uuid,
        filters: &[ClaimFilter],
        on_change: ClaimChangeHandler,
        on_error: FailureHandler,
    ) -> BillingResult<Subscription> {
        let decode_error = on_error.clone();
        let subscription = self
            .store
            .subscribe(
                CollectionRef::claims(tenant_id),
                claim_filter_spec(filters),
                Arc::new(move |docs| match decode_claims(docs) {
                    Ok(claims) => on_change(claims),
                    Err(err) => decode_error(err),
                }),
                Arc::new(move |err| on_error(BillingError::Backend(err))),
            )
            .await?;
        Ok(subscription)
    }

    /// The denial repository sharing this repository's store and insurer
    /// configuration
    pub fn denials(&self) -> &DenialRepository {
        &self.denials
    }

    async fn require_claim(&self, tenant_id: Uuid, id: Uuid) -> BillingResult<Claim> {
        self.get_claim(tenant_id, id)
            .await?
            .ok_or(BillingError::NotFound {
                entity: "claim",
                id,
            })
    }

    /// Next provider sequence number: max existing + 1, monotonic per tenant
    /// under the single-writer usage pattern
    async fn next_sequence_number(&self, tenant_id: Uuid) -> BillingResult<u64> {
        let existing = self.list_claims(tenant_id, &[]).await?;
        let max = existing
            .iter()
            .map(|claim| claim.sequence_number)
            .max()
            .unwrap_or(0);
        debug!(tenant = %tenant_id, next = max + 1, "assigned sequence number");
        Ok(max + 1)
    }
}

fn claim_filter_spec(filters: &[ClaimFilter]) -> FilterSpec {
    let mut spec = FilterSpec::new().order_by("service_date", true);
    for filter in filters {
        spec = match filter {
            ClaimFilter::Status(status) => spec.field_equals("status", status.as_str()),
            ClaimFilter::Patient(id) => spec.field_equals("patient_id", id.to_string()),
            ClaimFilter::Professional(id) => spec.field_equals("professional_id", id.to_string()),
            ClaimFilter::Insurer(id) => spec.field_equals("insurer_id", id.to_string()),
            ClaimFilter::Limit(limit) => spec.limit(*limit),
        };
    }
    spec
}

fn decode_claim(doc: Value) -> BillingResult<Claim> {
    serde_json::from_value(doc)
        .map_err(|err| BillingError::Backend(StoreError::Serialization(err)))
}

fn decode_claims(docs: Vec<Value>) -> BillingResult<Vec<Claim>> {
    docs.into_iter().map(decode_claim).collect()
}
