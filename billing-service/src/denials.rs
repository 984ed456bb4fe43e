use crate::config::InsurerDirectory;
use crate::error::{BillingError, BillingResult, FailureHandler};
use crate::lifecycle::validate_denial_transition;
use crate::models::{Claim, Denial, DenialInput, DenialStatus};
use chrono::{Duration, NaiveDate, Utc};
use document_store::{CollectionRef, DocumentStore, FilterSpec, StoreError, Subscription};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Delivery callback for denial subscriptions
pub type DenialChangeHandler = Arc<dyn Fn(Vec<Denial>) + Send + Sync>;

/// Typed filters accepted at the repository boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialFilter {
    Status(DenialStatus),
    Insurer(Uuid),
    Claim(Uuid),
    /// Pending denials whose deadline falls inside the next N days
    /// (inclusive both ends); evaluated in memory against the current date,
    /// deadlines are static once written
    DeadlineWithin(i64),
    /// Pending denials already past their deadline
    Overdue,
    Limit(usize),
}

/// CRUD and query access to denial ("glosa") records, scoped to a tenant.
/// Owns status-transition writes and appeal-deadline filtering.
#[derive(Clone)]
pub struct DenialRepository {
    store: Arc<dyn DocumentStore>,
    insurers: InsurerDirectory,
}

impl DenialRepository {
    pub fn new(store: Arc<dyn DocumentStore>, insurers: InsurerDirectory) -> Self {
        Self { store, insurers }
    }

    /// List denials matching the filters, newest first
    pub async fn list_denials(
        &self,
        tenant_id: Uuid,
        filters: &[DenialFilter],
    ) -> BillingResult<Vec<Denial>> {
        self.list_denials_as_of(tenant_id, filters, Utc::now().date_naive())
            .await
    }

    /// Same as `list_denials` with an explicit evaluation date for the
    /// deadline filters
    pub async fn list_denials_as_of(
        &self,
        tenant_id: Uuid,
        filters: &[DenialFilter],
        today: NaiveDate,
    ) -> BillingResult<Vec<Denial>> {
        let spec = denial_filter_spec(filters);
        let docs = self
            .store
            .list_documents(CollectionRef::denials(tenant_id), &spec)
            .await?;
        let mut denials = decode_denials(docs)?;
        denials.retain(|denial| matches_deadline_filters(denial, filters, today));
        if let Some(limit) = limit_from(filters) {
            denials.truncate(limit);
        }
        Ok(denials)
    }

    pub async fn get_denial(&self, tenant_id: Uuid, id: Uuid) -> BillingResult<Option<Denial>> {
        let doc = self
            .store
            .get_document(&CollectionRef::denials(tenant_id).doc(id))
            .await?;
        doc.map(decode_denial).transpose()
    }

    /// Create the denial record paired with a claim's denied transition.
    /// The appeal deadline is computed here from the insurer's policy and is
    /// never mutated afterwards.
    pub async fn create_for_claim(
        &self,
        tenant_id: Uuid,
        claim: &Claim,
        input: DenialInput,
    ) -> BillingResult<Denial> {
        if input.denied_amount < Decimal::ZERO {
            return Err(BillingError::Validation(
                "denied amount must not be negative".to_string(),
            ));
        }
        if input.denied_amount > claim.total_billed {
            return Err(BillingError::Validation(format!(
                "denied amount {} exceeds billed amount {}",
                input.denied_amount, claim.total_billed
            )));
        }

        let policy = self.insurers.policy_for(claim.insurer_id);
        let now = Utc::now();
        let denial = Denial {
            id: Uuid::nil(),
            tenant_id,
            claim_id: claim.id,
            insurer_id: claim.insurer_id,
            denied_amount: input.denied_amount,
            reason_items: input.reason_items,
            appeal_deadline: now.date_naive() + Duration::days(policy.appeal_window_days),
            appeal_id: None,
            approved_amount: None,
            status: DenialStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let doc = serde_json::to_value(&denial).map_err(StoreError::from)?;
        let id = self
            .store
            .create_document(CollectionRef::denials(tenant_id), doc)
            .await?;

        info!(
            tenant = %tenant_id,
            denial = %id,
            claim = %claim.id,
            deadline = %denial.appeal_deadline,
            "denial created"
        );
        Ok(Denial { id, ..denial })
    }

    /// Move a denial to a new status. Writing the current status again is an
    /// idempotent no-op. `InAppeal` requires the appeal submission id;
    /// `Resolved` requires the approved amount to be recorded beforehand.
    pub async fn update_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        new_status: DenialStatus,
        appeal_id: Option<Uuid>,
    ) -> BillingResult<Denial> {
        let denial = self.require_denial(tenant_id, id).await?;
        if denial.status == new_status {
            debug!(denial = %id, status = %new_status, "status already current, no-op");
            return Ok(denial);
        }

        validate_denial_transition(denial.status, new_status).map_err(|err| {
            warn!(denial = %id, from = %denial.status, to = %new_status, "transition rejected");
            err
        })?;

        let mut patch = json!({
            "status": new_status,
            "updated_at": Utc::now(),
        });
        match new_status {
            DenialStatus::InAppeal => {
                let appeal = appeal_id.ok_or_else(|| {
                    BillingError::Validation(
                        "appeal submission id is required to enter appeal".to_string(),
                    )
                })?;
                patch["appeal_id"] = json!(appeal);
            }
            DenialStatus::Resolved => {
                if denial.approved_amount.is_none() {
                    return Err(BillingError::Validation(
                        "approved amount must be recorded before resolution".to_string(),
                    ));
                }
            }
            DenialStatus::Pending => {}
        }

        self.store
            .update_document(&CollectionRef::denials(tenant_id).doc(id), patch)
            .await?;
        info!(tenant = %tenant_id, denial = %id, from = %denial.status, to = %new_status, "denial status updated");
        self.require_denial(tenant_id, id).await
    }

    /// Record the insurer's approved amount ahead of resolution. The appeal
    /// deadline is deliberately not patchable.
    pub async fn record_approved_amount(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        amount: Decimal,
    ) -> BillingResult<Denial> {
        let denial = self.require_denial(tenant_id, id).await?;
        if denial.status == DenialStatus::Resolved {
            return Err(BillingError::Validation(
                "denial is already resolved".to_string(),
            ));
        }
        if amount < Decimal::ZERO {
            return Err(BillingError::Validation(
                "approved amount must not be negative".to_string(),
            ));
        }
        if amount > denial.denied_amount {
            return Err(BillingError::Validation(format!(
                "approved amount {} exceeds denied amount {}",
                amount, denial.denied_amount
            )));
        }

        let patch = json!({
            "approved_amount": amount,
            "updated_at": Utc::now(),
        });
        self.store
            .update_document(&CollectionRef::denials(tenant_id).doc(id), patch)
            .await?;
        self.require_denial(tenant_id, id).await
    }

    /// Attach a push subscription delivering the filtered denial collection.
    /// Deadline filters are re-evaluated against the delivery date.
    pub async fn subscribe_denials(
        &self,
        tenant_id: Uuid,
        filters: Vec<DenialFilter>,
        on_change: DenialChangeHandler,
        on_error: FailureHandler,
    ) -> BillingResult<Subscription> {
        let spec = denial_filter_spec(&filters);
        let decode_error = on_error.clone();
        let subscription = self
            .store
            .subscribe(
                CollectionRef::denials(tenant_id),
                spec,
                Arc::new(move |docs| match decode_denials(docs) {
                    Ok(mut denials) => {
                        let today = Utc::now().date_naive();
                        denials.retain(|denial| matches_deadline_filters(denial, &filters, today));
                        if let Some(limit) = limit_from(&filters) {
                            denials.truncate(limit);
                        }
                        on_change(denials);
                    }
                    Err(err) => decode_error(err),
                }),
                Arc::new(move |err| on_error(BillingError::Backend(err))),
            )
            .await?;
        Ok(subscription)
    }

    async fn require_denial(&self, tenant_id: Uuid, id: Uuid) -> BillingResult<Denial> {
        self.get_denial(tenant_id, id)
            .await?
            .ok_or(BillingError::NotFound {
                entity: "denial",
                id,
            })
    }
}

fn denial_filter_spec(filters: &[DenialFilter]) -> FilterSpec {
    let mut spec = FilterSpec::new().order_by("created_at", true);
    for filter in filters {
        spec = match filter {
            DenialFilter::Status(status) => spec.field_equals("status", status.as_str()),
            DenialFilter::Insurer(id) => spec.field_equals("insurer_id", id.to_string()),
            DenialFilter::Claim(id) => spec.field_equals("claim_id", id.to_string()),
            // Deadline filters and the cap are applied in memory after the
            // date predicates run
            DenialFilter::DeadlineWithin(_) | DenialFilter::Overdue | DenialFilter::Limit(_) => {
                spec
            }
        };
    }
    spec
}

fn limit_from(filters: &[DenialFilter]) -> Option<usize> {
    filters.iter().find_map(|filter| match filter {
        DenialFilter::Limit(limit) => Some(*limit),
        _ => None,
    })
}

fn matches_deadline_filters(denial: &Denial, filters: &[DenialFilter], today: NaiveDate) -> bool {
    filters.iter().all(|filter| match filter {
        DenialFilter::DeadlineWithin(days) => {
            denial.status == DenialStatus::Pending
                && today <= denial.appeal_deadline
                && denial.appeal_deadline <= today + Duration::days(*days)
        }
        DenialFilter::Overdue => {
            denial.status == DenialStatus::Pending && denial.appeal_deadline < today
        }
        _ => true,
    })
}

fn decode_denial(doc: Value) -> BillingResult<Denial> {
    serde_json::from_value(doc)
        .map_err(|err| BillingError::Backend(StoreError::Serialization(err)))
}

fn decode_denials(docs: Vec<Value>) -> Result<Vec<Denial>, BillingError> {
    docs.into_iter().map(decode_denial).collect()
}
