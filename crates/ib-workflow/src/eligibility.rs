//! Shared eligibility predicates.
//!
//! The same predicate gates a record whether it arrives through manual
//! lookup or through document-upload routing. Both entry paths must call
//! these functions; nothing else may re-implement the rules.

use ib_portal_types::{ClaimStatus, PolicyRecord};

use crate::error::Ineligibility;
use crate::kind::TransactionKind;

/// May this policy enter the given transaction?
///
/// A cancelled policy refuses any further policy transaction; a lapsed
/// policy additionally refuses new claims and cancellation.
pub fn check_policy_eligibility(
    kind: TransactionKind,
    policy: &PolicyRecord,
) -> Result<(), Ineligibility> {
    if policy.is_cancelled
        && matches!(
            kind,
            TransactionKind::MidTermAdjustment
                | TransactionKind::Renewal
                | TransactionKind::Cancellation
                | TransactionKind::NewClaim
        )
    {
        return Err(Ineligibility::PolicyCancelled {
            policy_no: policy.policy_no.clone(),
        });
    }

    if policy.is_lapsed
        && matches!(kind, TransactionKind::NewClaim | TransactionKind::Cancellation)
    {
        return Err(Ineligibility::PolicyLapsed {
            policy_no: policy.policy_no.clone(),
        });
    }

    Ok(())
}

/// May this claim enter the given transaction?
///
/// Closed claims accept only reopen; anything not closed refuses reopen.
pub fn check_claim_eligibility(
    kind: TransactionKind,
    claim_no: &str,
    status: ClaimStatus,
) -> Result<(), Ineligibility> {
    match kind {
        TransactionKind::ClaimUpdate | TransactionKind::ClaimClose if status.is_closed() => {
            Err(Ineligibility::ClaimClosed {
                claim_no: claim_no.to_string(),
            })
        }
        TransactionKind::ClaimReopen if !status.is_closed() => Err(Ineligibility::ClaimNotClosed {
            claim_no: claim_no.to_string(),
            status: status.to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn policy(cancelled: bool, lapsed: bool) -> PolicyRecord {
        PolicyRecord {
            policy_no: "POL123".into(),
            customer_name: None,
            customer_email: None,
            customer_phone: None,
            address: None,
            vehicle_make: None,
            vehicle_model: None,
            year_of_make: None,
            chassis_no: None,
            engine_no: None,
            reg_no: None,
            driver_name: None,
            driver_dob: None,
            license_no: None,
            sum_insured: None,
            premium: None,
            premium2: None,
            pol_eff_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            pol_expiry_date: NaiveDate::from_ymd_opt(2025, 12, 31),
            pol_issue_date: None,
            cancellation_date: None,
            cancellation_reason: None,
            transaction_type: None,
            broker_id: None,
            facility_id: None,
            is_cancelled: cancelled,
            is_lapsed: lapsed,
            update_date: None,
            created_at: None,
        }
    }

    #[test]
    fn cancelled_policy_refuses_reentry() {
        let p = policy(true, false);
        for kind in [
            TransactionKind::MidTermAdjustment,
            TransactionKind::Renewal,
            TransactionKind::Cancellation,
            TransactionKind::NewClaim,
        ] {
            assert!(matches!(
                check_policy_eligibility(kind, &p),
                Err(Ineligibility::PolicyCancelled { .. })
            ));
        }
    }

    #[test]
    fn lapsed_policy_blocks_claims_and_cancellation_only() {
        let p = policy(false, true);
        assert!(check_policy_eligibility(TransactionKind::NewClaim, &p).is_err());
        assert!(check_policy_eligibility(TransactionKind::Cancellation, &p).is_err());
        // A lapsed policy can still be renewed or adjusted.
        assert!(check_policy_eligibility(TransactionKind::Renewal, &p).is_ok());
        assert!(check_policy_eligibility(TransactionKind::MidTermAdjustment, &p).is_ok());
    }

    #[test]
    fn claim_gates_follow_closed_status() {
        assert!(check_claim_eligibility(
            TransactionKind::ClaimUpdate,
            "CLM1",
            ClaimStatus::Closed
        )
        .is_err());
        assert!(check_claim_eligibility(
            TransactionKind::ClaimReopen,
            "CLM1",
            ClaimStatus::UnderReview
        )
        .is_err());
        assert!(check_claim_eligibility(
            TransactionKind::ClaimReopen,
            "CLM1",
            ClaimStatus::Closed
        )
        .is_ok());
        assert!(check_claim_eligibility(
            TransactionKind::ClaimUpdate,
            "CLM1",
            ClaimStatus::UnderReview
        )
        .is_ok());
    }
}
