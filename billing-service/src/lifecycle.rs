//! Single authority for legal status transitions.
//!
//! Both tables are pure and synchronous; repositories consult them before
//! every status write so no call site carries its own transition rules.

use crate::error::{BillingError, BillingResult};
use crate::models::{ClaimStatus, DenialStatus};

/// Legal claim transitions out of `from`
pub fn claim_transitions(from: ClaimStatus) -> &'static [ClaimStatus] {
    use ClaimStatus::*;
    match from {
        Draft => &[Submitted, Withdrawn],
        Submitted => &[UnderReview],
        UnderReview => &[Authorized, PartiallyDenied, FullyDenied],
        Authorized => &[Paid],
        // Paid after recovery, or back under review on re-submission
        PartiallyDenied | FullyDenied => &[Paid, UnderReview],
        Paid | Withdrawn => &[],
    }
}

/// Legal denial transitions out of `from`; `Resolved` is terminal
pub fn denial_transitions(from: DenialStatus) -> &'static [DenialStatus] {
    use DenialStatus::*;
    match from {
        Pending => &[InAppeal, Resolved],
        InAppeal => &[Resolved],
        Resolved => &[],
    }
}

pub fn validate_claim_transition(from: ClaimStatus, to: ClaimStatus) -> BillingResult<()> {
    if claim_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(BillingError::InvalidTransition {
            entity: "claim",
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}

pub fn validate_denial_transition(from: DenialStatus, to: DenialStatus) -> BillingResult<()> {
    if denial_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(BillingError::InvalidTransition {
            entity: "denial",
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}
