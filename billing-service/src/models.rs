use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Insurance claim ("guia") submitted to an insurer for a rendered service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub claim_type: ClaimType,
    /// Provider-generated number, monotonic per tenant
    pub sequence_number: u64,
    pub insurer_id: Uuid,
    pub insurer_name: String,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub service_date: NaiveDate,
    pub total_billed: Decimal,
    pub amount_paid: Decimal,
    pub amount_denied: Decimal,
    pub status: ClaimStatus,
    pub authorized_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_by: Uuid,
}

/// Claim type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Consultation,
    Procedure,
    Exam,
}

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Draft,
    Submitted,
    UnderReview,
    Authorized,
    PartiallyDenied,
    FullyDenied,
    Paid,
    Withdrawn,
}

impl ClaimStatus {
    pub const ALL: [ClaimStatus; 8] = [
        ClaimStatus::Draft,
        ClaimStatus::Submitted,
        ClaimStatus::UnderReview,
        ClaimStatus::Authorized,
        ClaimStatus::PartiallyDenied,
        ClaimStatus::FullyDenied,
        ClaimStatus::Paid,
        ClaimStatus::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Draft => "draft",
            ClaimStatus::Submitted => "submitted",
            ClaimStatus::UnderReview => "under_review",
            ClaimStatus::Authorized => "authorized",
            ClaimStatus::PartiallyDenied => "partially_denied",
            ClaimStatus::FullyDenied => "fully_denied",
            ClaimStatus::Paid => "paid",
            ClaimStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, ClaimStatus::PartiallyDenied | ClaimStatus::FullyDenied)
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload for creating a claim; everything else is stamped by the repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClaim {
    pub claim_type: ClaimType,
    pub insurer_id: Uuid,
    pub insurer_name: String,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub service_date: NaiveDate,
    pub total_billed: Decimal,
}

/// Insurer denial ("glosa") of billed value on a claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Denial {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Back-reference to the denied claim, not ownership
    pub claim_id: Uuid,
    pub insurer_id: Uuid,
    pub denied_amount: Decimal,
    pub reason_items: Vec<DenialReasonItem>,
    /// Computed once at creation from the insurer's appeal window; never mutated
    pub appeal_deadline: NaiveDate,
    pub appeal_id: Option<Uuid>,
    /// Recorded before resolution; > 0 on a resolved denial means partial recovery
    pub approved_amount: Option<Decimal>,
    pub status: DenialStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Denial status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialStatus {
    Pending,
    InAppeal,
    Resolved,
}

impl DenialStatus {
    pub const ALL: [DenialStatus; 3] = [
        DenialStatus::Pending,
        DenialStatus::InAppeal,
        DenialStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DenialStatus::Pending => "pending",
            DenialStatus::InAppeal => "in_appeal",
            DenialStatus::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for DenialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One denied line item with its reason code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenialReasonItem {
    pub code: String,
    pub description: String,
    pub denied_value: Decimal,
}

/// Details accompanying a claim's transition into a denied status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenialInput {
    pub denied_amount: Decimal,
    pub reason_items: Vec<DenialReasonItem>,
}

/// Authenticated actor stamped into created_by/updated_by; always passed
/// explicitly, never read from ambient session state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub display_name: String,
}

impl Actor {
    pub fn new(id: Uuid, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}
