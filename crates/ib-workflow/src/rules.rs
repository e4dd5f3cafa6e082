//! Per-kind submission validation.
//!
//! Validation runs before any confirmation gate or diff: a submission that
//! fails here leaves the session untouched and nothing reaches the store.
//! The prepared output is the edit set with the kind's rewrites applied
//! (negated return premium, forced close status, appended reopen remark).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use ib_portal_types::{
    append_reopen_remark, format_portal_date, get_decimal, get_str, is_empty_value, keys,
    ClaimStatus, FieldMap,
};

use crate::error::WorkflowError;
use crate::kind::TransactionKind;
use crate::mapping::{editable_fields, field_kind, FieldKind};

/// Transient form field carrying the reopen justification; it is consumed
/// here and never stored under this name.
pub const REOPEN_REASON: &str = "REOPEN_REASON";

/// Flags accompanying a submission that are not record fields.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SubmitOptions {
    /// Explicit acknowledgement checkbox (claim closure).
    #[serde(default)]
    pub acknowledged: bool,
}

/// The validated, rewritten edit set ready for diffing/commit.
#[derive(Debug, Clone)]
pub struct PreparedSubmission {
    pub fields: FieldMap,
}

/// One insurer's share in a facility submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsurerShare {
    pub insurer_name: String,
    pub participation_pct: Decimal,
}

/// A validated participation line with the lead tagged.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedLine {
    pub insurer_name: String,
    pub participation_pct: Decimal,
    pub is_lead: bool,
}

pub fn validate_submission(
    kind: TransactionKind,
    snapshot: Option<&FieldMap>,
    edits: &FieldMap,
    opts: SubmitOptions,
    now: DateTime<Utc>,
) -> Result<PreparedSubmission, WorkflowError> {
    check_field_types(edits)?;

    match kind {
        TransactionKind::NewBusiness => {
            require(edits, keys::POLICY_NO, "a policy number is required")?;
            require(edits, keys::BROKER_ID, "a broker must be selected")?;
            require(edits, keys::FACILITY_ID, "a facility must be selected")?;
            Ok(PreparedSubmission {
                fields: restrict(kind, edits),
            })
        }

        TransactionKind::MidTermAdjustment | TransactionKind::Renewal => Ok(PreparedSubmission {
            fields: restrict(kind, edits),
        }),

        TransactionKind::Cancellation => {
            let snapshot = snapshot.ok_or(WorkflowError::MissingSnapshot)?;
            let entered = get_decimal(edits, keys::PREMIUM2)
                .ok_or_else(|| WorkflowError::validation("a return premium is required"))?;
            let original = get_decimal(snapshot, keys::PREMIUM).ok_or_else(|| {
                WorkflowError::validation("the policy has no recorded premium to cancel against")
            })?;
            if entered.abs() > original {
                return Err(WorkflowError::validation(
                    "the return premium cannot exceed the original premium",
                ));
            }

            let mut fields = restrict(kind, edits);
            fields.insert(
                keys::PREMIUM2.into(),
                json!((-entered.abs()).normalize().to_string()),
            );
            fields
                .entry(keys::CANCELLATION_DATE.to_string())
                .or_insert_with(|| json!(format_portal_date(now.date_naive())));
            Ok(PreparedSubmission { fields })
        }

        TransactionKind::NewClaim => {
            let snapshot = snapshot.ok_or(WorkflowError::MissingSnapshot)?;
            require(edits, keys::ACCIDENT_DATE, "an accident date is required")?;
            let mut fields = restrict(kind, edits);
            let policy_no = get_str(snapshot, keys::POLICY_NO)
                .ok_or_else(|| WorkflowError::validation("the fetched policy has no number"))?;
            fields.insert(keys::POLICY_NO.into(), json!(policy_no));
            fields.insert(keys::CLAIM_STATUS.into(), json!(ClaimStatus::New.as_str()));
            fields.insert(keys::CLAIM_STAGE.into(), json!("Open"));
            fields
                .entry(keys::INTIMATION_DATE.to_string())
                .or_insert_with(|| json!(format_portal_date(now.date_naive())));
            Ok(PreparedSubmission { fields })
        }

        TransactionKind::ClaimUpdate => {
            let mut fields = restrict(kind, edits);
            // Status text entered on the form is normalized to the closed
            // variant set here, at the boundary.
            if let Some(raw) = get_str(&fields, keys::CLAIM_STATUS) {
                let status: ClaimStatus = raw.parse()?;
                fields.insert(keys::CLAIM_STATUS.into(), json!(status.as_str()));
            }
            Ok(PreparedSubmission { fields })
        }

        TransactionKind::ClaimClose => {
            require(edits, keys::REMARKS, "closing remarks are required")?;
            if !opts.acknowledged {
                return Err(WorkflowError::validation(
                    "claim closure must be explicitly confirmed",
                ));
            }
            let mut fields = restrict(kind, edits);
            fields.insert(keys::CLAIM_STATUS.into(), json!(ClaimStatus::Closed.as_str()));
            fields.insert(keys::CLAIM_STAGE.into(), json!("Closed"));
            Ok(PreparedSubmission { fields })
        }

        TransactionKind::ClaimReopen => {
            let snapshot = snapshot.ok_or(WorkflowError::MissingSnapshot)?;
            let reason = get_str(edits, REOPEN_REASON)
                .ok_or_else(|| WorkflowError::validation("a reopen reason is required"))?;
            let existing = get_str(snapshot, keys::REMARKS);
            let mut fields = FieldMap::new();
            fields.insert(
                keys::REMARKS.into(),
                json!(append_reopen_remark(existing.as_deref(), &reason, now)),
            );
            fields.insert(
                keys::CLAIM_STATUS.into(),
                json!(ClaimStatus::UnderReview.as_str()),
            );
            fields.insert(keys::CLAIM_STAGE.into(), json!("Reopened"));
            Ok(PreparedSubmission { fields })
        }

        TransactionKind::BrokerOnboarding => {
            require(edits, keys::BROKER_NAME, "a broker name is required")?;
            require(edits, keys::FCA_NUMBER, "an FCA registration number is required")?;
            if let Some(pct) = get_decimal(edits, keys::COMMISSION_PCT) {
                if pct < Decimal::ZERO || pct > Decimal::from(100) {
                    return Err(WorkflowError::validation(
                        "commission must be between 0 and 100 percent",
                    ));
                }
            }
            Ok(PreparedSubmission {
                fields: restrict(kind, edits),
            })
        }

        TransactionKind::FacilityOnboarding => {
            require(edits, keys::FACILITY_NAME, "a facility name is required")?;
            Ok(PreparedSubmission {
                fields: restrict(kind, edits),
            })
        }
    }
}

/// Validate insurer participation lines for a facility submission.
///
/// With more than one insurer the shares must total 100%; a lone insurer
/// may hold any share. The largest share is tagged lead (first wins a tie).
pub fn validate_facility_lines(lines: &[InsurerShare]) -> Result<Vec<PreparedLine>, WorkflowError> {
    if lines.is_empty() {
        return Err(WorkflowError::validation(
            "a facility needs at least one insurer",
        ));
    }
    for line in lines {
        if line.insurer_name.trim().is_empty() {
            return Err(WorkflowError::validation("every insurer needs a name"));
        }
        if line.participation_pct <= Decimal::ZERO {
            return Err(WorkflowError::validation(format!(
                "participation for {} must be positive",
                line.insurer_name
            )));
        }
    }

    if lines.len() > 1 {
        let total: Decimal = lines.iter().map(|l| l.participation_pct).sum();
        let tolerance = Decimal::new(1, 2); // 0.01
        if (total - Decimal::from(100)).abs() > tolerance {
            return Err(WorkflowError::validation(format!(
                "participation across {} insurers totals {}%, must equal 100%",
                lines.len(),
                total.normalize()
            )));
        }
    }

    let lead_idx = lines
        .iter()
        .enumerate()
        .max_by_key(|(_, l)| l.participation_pct)
        .map(|(i, _)| i)
        .unwrap_or(0);

    Ok(lines
        .iter()
        .enumerate()
        .map(|(i, l)| PreparedLine {
            insurer_name: l.insurer_name.trim().to_string(),
            participation_pct: l.participation_pct,
            is_lead: i == lead_idx,
        })
        .collect())
}

/// Keep only this kind's editable fields, dropping blanks and strays.
fn restrict(kind: TransactionKind, edits: &FieldMap) -> FieldMap {
    let allowed = editable_fields(kind);
    edits
        .iter()
        .filter(|(k, v)| allowed.contains(&k.as_str()) && !is_empty_value(Some(v)))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn require(edits: &FieldMap, key: &str, message: &str) -> Result<(), WorkflowError> {
    if is_empty_value(edits.get(key)) {
        return Err(WorkflowError::validation(message));
    }
    Ok(())
}

/// Dates must parse and amounts must be numeric before anything is diffed
/// or bound to a column.
fn check_field_types(edits: &FieldMap) -> Result<(), WorkflowError> {
    for (key, value) in edits {
        if is_empty_value(Some(value)) {
            continue;
        }
        let text = ib_portal_types::value_to_string(value);
        match field_kind(key) {
            FieldKind::Date => {
                if ib_portal_types::parse_portal_date(&text).is_none() {
                    return Err(WorkflowError::validation(format!(
                        "{key} is not a recognizable date: {text}"
                    )));
                }
            }
            FieldKind::Numeric => {
                if text.trim().parse::<Decimal>().is_err() {
                    return Err(WorkflowError::validation(format!(
                        "{key} is not a number: {text}"
                    )));
                }
            }
            FieldKind::Text => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap()
    }

    fn map(pairs: &[(&str, serde_json::Value)]) -> FieldMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn new_business_requires_key_and_selections() {
        let edits = map(&[
            (keys::POLICY_NO, json!("POL900")),
            (keys::BROKER_ID, json!("Select a broker...")),
            (keys::FACILITY_ID, json!("FAC001")),
        ]);
        let err = validate_submission(
            TransactionKind::NewBusiness,
            None,
            &edits,
            SubmitOptions::default(),
            at(),
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[test]
    fn cancellation_negates_and_caps_return_premium() {
        let snapshot = map(&[(keys::PREMIUM, json!("300"))]);

        let over = map(&[(keys::PREMIUM2, json!("500"))]);
        let err = validate_submission(
            TransactionKind::Cancellation,
            Some(&snapshot),
            &over,
            SubmitOptions::default(),
            at(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot exceed"));

        let ok = map(&[(keys::PREMIUM2, json!("200"))]);
        let prepared = validate_submission(
            TransactionKind::Cancellation,
            Some(&snapshot),
            &ok,
            SubmitOptions::default(),
            at(),
        )
        .unwrap();
        assert_eq!(prepared.fields[keys::PREMIUM2], json!("-200"));
        assert_eq!(prepared.fields[keys::CANCELLATION_DATE], json!("2025-07-01"));
    }

    #[test]
    fn claim_close_needs_remarks_and_acknowledgement() {
        let edits = map(&[(keys::REMARKS, json!("Settled in full"))]);
        let err = validate_submission(
            TransactionKind::ClaimClose,
            None,
            &edits,
            SubmitOptions { acknowledged: false },
            at(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("confirmed"));

        let prepared = validate_submission(
            TransactionKind::ClaimClose,
            None,
            &edits,
            SubmitOptions { acknowledged: true },
            at(),
        )
        .unwrap();
        assert_eq!(prepared.fields[keys::CLAIM_STATUS], json!("Closed"));
        assert_eq!(prepared.fields[keys::CLAIM_STAGE], json!("Closed"));
    }

    #[test]
    fn claim_reopen_appends_to_remarks() {
        let snapshot = map(&[(keys::REMARKS, json!("Closed after settlement"))]);
        let edits = map(&[(REOPEN_REASON, json!("fresh evidence"))]);
        let prepared = validate_submission(
            TransactionKind::ClaimReopen,
            Some(&snapshot),
            &edits,
            SubmitOptions::default(),
            at(),
        )
        .unwrap();
        let remarks = prepared.fields[keys::REMARKS].as_str().unwrap();
        assert!(remarks.starts_with("Closed after settlement\n["));
        assert!(remarks.contains("Reopened: fresh evidence"));
        assert_eq!(prepared.fields[keys::CLAIM_STATUS], json!("Under Review"));
    }

    #[test]
    fn participation_must_total_100_for_groups() {
        let group = vec![
            InsurerShare { insurer_name: "Alpha Re".into(), participation_pct: "50".parse().unwrap() },
            InsurerShare { insurer_name: "Beta Syndicate".into(), participation_pct: "27.5".parse().unwrap() },
            InsurerShare { insurer_name: "Gamma Mutual".into(), participation_pct: "20".parse().unwrap() },
        ];
        let err = validate_facility_lines(&group).unwrap_err();
        assert!(err.to_string().contains("97.5"));

        let single = vec![InsurerShare {
            insurer_name: "Alpha Re".into(),
            participation_pct: "40".parse().unwrap(),
        }];
        let lines = validate_facility_lines(&single).unwrap();
        assert!(lines[0].is_lead);
    }

    #[test]
    fn lead_goes_to_largest_share() {
        let group = vec![
            InsurerShare { insurer_name: "Alpha Re".into(), participation_pct: "45".parse().unwrap() },
            InsurerShare { insurer_name: "Beta Syndicate".into(), participation_pct: "55".parse().unwrap() },
        ];
        let lines = validate_facility_lines(&group).unwrap();
        assert!(!lines[0].is_lead);
        assert!(lines[1].is_lead);
    }

    #[test]
    fn malformed_dates_and_amounts_are_rejected_upfront() {
        let edits = map(&[(keys::DRIVER_DOB, json!("31/31/1990"))]);
        let err = validate_submission(
            TransactionKind::MidTermAdjustment,
            None,
            &edits,
            SubmitOptions::default(),
            at(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("DRIVER_DOB"));
    }
}
