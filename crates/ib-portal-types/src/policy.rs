//! Policy records.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;

use crate::fields::{format_portal_date, keys, FieldMap};

/// A policy row as held in the store. Business fields are optional; the
/// identity, lifecycle flags and audit stamps are always present.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PolicyRecord {
    pub policy_no: String,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub address: Option<String>,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub year_of_make: Option<String>,
    pub chassis_no: Option<String>,
    pub engine_no: Option<String>,
    pub reg_no: Option<String>,
    pub driver_name: Option<String>,
    pub driver_dob: Option<NaiveDate>,
    pub license_no: Option<String>,
    pub sum_insured: Option<Decimal>,
    pub premium: Option<Decimal>,
    pub premium2: Option<Decimal>,
    pub pol_eff_date: Option<NaiveDate>,
    pub pol_expiry_date: Option<NaiveDate>,
    pub pol_issue_date: Option<NaiveDate>,
    pub cancellation_date: Option<NaiveDate>,
    pub cancellation_reason: Option<String>,
    pub transaction_type: Option<String>,
    pub broker_id: Option<String>,
    pub facility_id: Option<String>,
    pub is_cancelled: bool,
    pub is_lapsed: bool,
    pub update_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl PolicyRecord {
    /// Render the row into the canonical field map used as the workflow
    /// snapshot. Only business-editable fields plus lifecycle flags are
    /// included; audit stamps stay on the row.
    pub fn to_field_map(&self) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert(keys::POLICY_NO.into(), json!(self.policy_no));
        insert_opt(&mut map, keys::CUSTOMER_NAME, self.customer_name.as_deref());
        insert_opt(&mut map, keys::CUSTOMER_EMAIL, self.customer_email.as_deref());
        insert_opt(&mut map, keys::CUSTOMER_PHONE, self.customer_phone.as_deref());
        insert_opt(&mut map, keys::ADDRESS, self.address.as_deref());
        insert_opt(&mut map, keys::VEHICLE_MAKE, self.vehicle_make.as_deref());
        insert_opt(&mut map, keys::VEHICLE_MODEL, self.vehicle_model.as_deref());
        insert_opt(&mut map, keys::YEAR_OF_MAKE, self.year_of_make.as_deref());
        insert_opt(&mut map, keys::CHASSIS_NO, self.chassis_no.as_deref());
        insert_opt(&mut map, keys::ENGINE_NO, self.engine_no.as_deref());
        insert_opt(&mut map, keys::REG_NO, self.reg_no.as_deref());
        insert_opt(&mut map, keys::DRIVER_NAME, self.driver_name.as_deref());
        insert_date(&mut map, keys::DRIVER_DOB, self.driver_dob);
        insert_opt(&mut map, keys::LICENSE_NO, self.license_no.as_deref());
        insert_decimal(&mut map, keys::SUM_INSURED, self.sum_insured);
        insert_decimal(&mut map, keys::PREMIUM, self.premium);
        insert_decimal(&mut map, keys::PREMIUM2, self.premium2);
        insert_date(&mut map, keys::POL_EFF_DATE, self.pol_eff_date);
        insert_date(&mut map, keys::POL_EXPIRY_DATE, self.pol_expiry_date);
        insert_date(&mut map, keys::POL_ISSUE_DATE, self.pol_issue_date);
        insert_date(&mut map, keys::CANCELLATION_DATE, self.cancellation_date);
        insert_opt(
            &mut map,
            keys::CANCELLATION_REASON,
            self.cancellation_reason.as_deref(),
        );
        insert_opt(&mut map, keys::TRANSACTION_TYPE, self.transaction_type.as_deref());
        insert_opt(&mut map, keys::BROKER_ID, self.broker_id.as_deref());
        insert_opt(&mut map, keys::FACILITY_ID, self.facility_id.as_deref());
        map.insert(keys::IS_CANCELLED.into(), json!(self.is_cancelled));
        map.insert(keys::IS_LAPSED.into(), json!(self.is_lapsed));
        map
    }

    /// Lapsed means today falls outside the effective-to-expiry window.
    /// Mirrors the set-based sweep in the data layer.
    pub fn lapsed_as_of(&self, today: NaiveDate) -> bool {
        match (self.pol_eff_date, self.pol_expiry_date) {
            (Some(eff), Some(exp)) => today < eff || today > exp,
            _ => false,
        }
    }
}

pub(crate) fn insert_opt(map: &mut FieldMap, key: &str, value: Option<&str>) {
    if let Some(v) = value {
        map.insert(key.to_string(), json!(v));
    }
}

pub(crate) fn insert_date(map: &mut FieldMap, key: &str, value: Option<NaiveDate>) {
    if let Some(d) = value {
        map.insert(key.to_string(), json!(format_portal_date(d)));
    }
}

pub(crate) fn insert_decimal(map: &mut FieldMap, key: &str, value: Option<Decimal>) {
    if let Some(n) = value {
        map.insert(key.to_string(), json!(n.normalize().to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PolicyRecord {
        PolicyRecord {
            policy_no: "POL123".into(),
            customer_name: Some("A Driver".into()),
            customer_email: None,
            customer_phone: None,
            address: None,
            vehicle_make: Some("Volvo".into()),
            vehicle_model: None,
            year_of_make: None,
            chassis_no: Some("CH-9".into()),
            engine_no: None,
            reg_no: None,
            driver_name: None,
            driver_dob: None,
            license_no: None,
            sum_insured: None,
            premium: Some("300".parse().unwrap()),
            premium2: None,
            pol_eff_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            pol_expiry_date: NaiveDate::from_ymd_opt(2025, 12, 31),
            pol_issue_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            cancellation_date: None,
            cancellation_reason: None,
            transaction_type: Some("New Business".into()),
            broker_id: Some("BIB312044".into()),
            facility_id: Some("FAC001".into()),
            is_cancelled: false,
            is_lapsed: false,
            update_date: None,
            created_at: None,
        }
    }

    #[test]
    fn field_map_renders_canonical_strings() {
        let map = sample().to_field_map();
        assert_eq!(map[keys::POLICY_NO], json!("POL123"));
        assert_eq!(map[keys::POL_EFF_DATE], json!("2025-01-01"));
        assert_eq!(map[keys::PREMIUM], json!("300"));
        assert!(!map.contains_key(keys::PREMIUM2));
    }

    #[test]
    fn lapse_window_is_inclusive() {
        let p = sample();
        assert!(!p.lapsed_as_of(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        assert!(!p.lapsed_as_of(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()));
        assert!(p.lapsed_as_of(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
        assert!(p.lapsed_as_of(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
    }
}
