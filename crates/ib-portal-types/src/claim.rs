//! Claim records.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;

use crate::fields::{keys, FieldMap};
use crate::policy::{insert_date, insert_decimal, insert_opt};
use crate::status::{ClaimStatus, StatusParseError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClaimRecord {
    pub claim_no: String,
    pub policy_no: String,
    pub accident_date: Option<NaiveDate>,
    pub intimation_date: Option<NaiveDate>,
    pub claim_amount: Option<Decimal>,
    pub approved_amount: Option<Decimal>,
    pub claim_status: String,
    pub claim_stage: Option<String>,
    pub description: Option<String>,
    pub remarks: Option<String>,
    pub update_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ClaimRecord {
    /// Parse the stored status text into the closed variant set. The store
    /// only ever receives rendered variants, so a failure here means the
    /// row was edited out of band.
    pub fn status(&self) -> Result<ClaimStatus, StatusParseError> {
        self.claim_status.parse()
    }

    pub fn to_field_map(&self) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert(keys::CLAIM_NO.into(), json!(self.claim_no));
        map.insert(keys::POLICY_NO.into(), json!(self.policy_no));
        insert_date(&mut map, keys::ACCIDENT_DATE, self.accident_date);
        insert_date(&mut map, keys::INTIMATION_DATE, self.intimation_date);
        insert_decimal(&mut map, keys::CLAIM_AMOUNT, self.claim_amount);
        insert_decimal(&mut map, keys::APPROVED_AMOUNT, self.approved_amount);
        map.insert(keys::CLAIM_STATUS.into(), json!(self.claim_status));
        insert_opt(&mut map, keys::CLAIM_STAGE, self.claim_stage.as_deref());
        insert_opt(&mut map, keys::DESCRIPTION, self.description.as_deref());
        insert_opt(&mut map, keys::REMARKS, self.remarks.as_deref());
        map
    }
}

/// Append a reopen entry to an existing remarks log without disturbing
/// earlier entries.
pub fn append_reopen_remark(existing: Option<&str>, reason: &str, at: DateTime<Utc>) -> String {
    let entry = format!("[{}] Reopened: {}", at.format("%Y-%m-%d %H:%M:%S"), reason.trim());
    match existing {
        Some(prior) if !prior.trim().is_empty() => format!("{prior}\n{entry}"),
        _ => entry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reopen_remark_appends_not_overwrites() {
        let at = Utc.with_ymd_and_hms(2025, 7, 1, 9, 30, 0).unwrap();
        let out = append_reopen_remark(Some("Settled in full."), "new evidence", at);
        assert_eq!(out, "Settled in full.\n[2025-07-01 09:30:00] Reopened: new evidence");

        let fresh = append_reopen_remark(None, "late notification", at);
        assert!(fresh.starts_with("[2025-07-01"));
    }
}
