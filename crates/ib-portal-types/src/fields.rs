//! Canonical field-map conventions.
//!
//! Every workflow step, extraction payload and diff operates on a flat map
//! of canonical UPPER_SNAKE field names to JSON values. The map is the
//! in-flight representation of a record; typed rows render into it via
//! `to_field_map()` and the data layer translates it back to columns.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

/// Flat record representation keyed by canonical field names.
pub type FieldMap = BTreeMap<String, Value>;

/// Canonical field names shared across the portal.
pub mod keys {
    // Policy
    pub const POLICY_NO: &str = "POLICY_NO";
    pub const CUSTOMER_NAME: &str = "CUSTOMER_NAME";
    pub const CUSTOMER_EMAIL: &str = "CUSTOMER_EMAIL";
    pub const CUSTOMER_PHONE: &str = "CUSTOMER_PHONE";
    pub const ADDRESS: &str = "ADDRESS";
    pub const VEHICLE_MAKE: &str = "VEHICLE_MAKE";
    pub const VEHICLE_MODEL: &str = "VEHICLE_MODEL";
    pub const YEAR_OF_MAKE: &str = "YEAR_OF_MAKE";
    pub const CHASSIS_NO: &str = "CHASSIS_NO";
    pub const ENGINE_NO: &str = "ENGINE_NO";
    pub const REG_NO: &str = "REG_NO";
    pub const DRIVER_NAME: &str = "DRIVER_NAME";
    pub const DRIVER_DOB: &str = "DRIVER_DOB";
    pub const LICENSE_NO: &str = "LICENSE_NO";
    pub const SUM_INSURED: &str = "SUM_INSURED";
    pub const PREMIUM: &str = "PREMIUM";
    pub const PREMIUM2: &str = "PREMIUM2";
    pub const POL_EFF_DATE: &str = "POL_EFF_DATE";
    pub const POL_EXPIRY_DATE: &str = "POL_EXPIRY_DATE";
    pub const POL_ISSUE_DATE: &str = "POL_ISSUE_DATE";
    pub const CANCELLATION_DATE: &str = "CANCELLATION_DATE";
    pub const CANCELLATION_REASON: &str = "CANCELLATION_REASON";
    pub const TRANSACTION_TYPE: &str = "TRANSACTION_TYPE";
    pub const BROKER_ID: &str = "BROKER_ID";
    pub const FACILITY_ID: &str = "FACILITY_ID";
    pub const IS_CANCELLED: &str = "IS_CANCELLED";
    pub const IS_LAPSED: &str = "IS_LAPSED";
    pub const UPDATE_DATE: &str = "UPDATE_DATE";

    // Claim
    pub const CLAIM_NO: &str = "CLAIM_NO";
    pub const ACCIDENT_DATE: &str = "ACCIDENT_DATE";
    pub const INTIMATION_DATE: &str = "INTIMATION_DATE";
    pub const CLAIM_AMOUNT: &str = "CLAIM_AMOUNT";
    pub const APPROVED_AMOUNT: &str = "APPROVED_AMOUNT";
    pub const CLAIM_STATUS: &str = "CLAIM_STATUS";
    pub const CLAIM_STAGE: &str = "CLAIM_STAGE";
    pub const DESCRIPTION: &str = "DESCRIPTION";
    pub const REMARKS: &str = "REMARKS";

    // Broker / facility onboarding
    pub const BROKER_NAME: &str = "BROKER_NAME";
    pub const FCA_NUMBER: &str = "FCA_NUMBER";
    pub const COMMISSION_PCT: &str = "COMMISSION_PCT";
    pub const ONBOARDING_DATE: &str = "ONBOARDING_DATE";
    pub const LONGEVITY_YEARS: &str = "LONGEVITY_YEARS";
    pub const BROKER_TYPE: &str = "BROKER_TYPE";
    pub const MARKET_ACCESS: &str = "MARKET_ACCESS";
    pub const DELEGATED_AUTHORITY: &str = "DELEGATED_AUTHORITY";
    pub const FACILITY_NAME: &str = "FACILITY_NAME";
    pub const INSURER_NAME: &str = "INSURER_NAME";
    pub const PARTICIPATION_PCT: &str = "PARTICIPATION_PCT";
}

/// Placeholder option shown by pickers; counts as "nothing selected".
pub const SELECT_SENTINEL_PREFIX: &str = "Select ";

/// Date formats accepted anywhere a date travels as a string.
/// ISO first; day-first forms appear in extracted documents.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Parse a date in any accepted textual form.
pub fn parse_portal_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Canonical textual rendering for dates held in field maps.
pub fn format_portal_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Render any field value to the string form used for display and diffing.
pub fn value_to_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A value is considered absent when null, blank, or a picker sentinel.
pub fn is_empty_value(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => {
            let s = s.trim();
            s.is_empty() || s.starts_with(SELECT_SENTINEL_PREFIX)
        }
        Some(_) => false,
    }
}

/// Fetch a field as a trimmed string, `None` when absent.
pub fn get_str(map: &FieldMap, key: &str) -> Option<String> {
    let v = map.get(key)?;
    if is_empty_value(Some(v)) {
        return None;
    }
    Some(value_to_string(v).trim().to_string())
}

/// Fetch a field as a decimal, accepting both JSON numbers and numeric strings.
pub fn get_decimal(map: &FieldMap, key: &str) -> Option<Decimal> {
    match map.get(key)? {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Fetch a field as a date in any accepted textual form.
pub fn get_date(map: &FieldMap, key: &str) -> Option<NaiveDate> {
    match map.get(key)? {
        Value::String(s) => parse_portal_date(s),
        _ => None,
    }
}

/// Semantic equality used by the diff: dates compare after parsing,
/// numerics compare as decimals, everything else compares as trimmed text.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    let (sa, sb) = (value_to_string(a), value_to_string(b));
    let (sa, sb) = (sa.trim(), sb.trim());
    if let (Some(da), Some(db)) = (parse_portal_date(sa), parse_portal_date(sb)) {
        return da == db;
    }
    if let (Ok(na), Ok(nb)) = (sa.parse::<Decimal>(), sb.parse::<Decimal>()) {
        return na == nb;
    }
    sa == sb
}
