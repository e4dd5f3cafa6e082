//! Static field-mapping tables.
//!
//! Per transaction kind: which fields the edit form exposes, which are
//! locked against edits, which are computed prefills, and which must be
//! written on commit even when unchanged. The data layer also leans on
//! [`field_kind`] to bind values with the right column type; dynamic SET
//! lists are built from these tables and nothing else.

use ib_portal_types::keys;

use crate::kind::TransactionKind;

/// Column/value typing for a canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    Numeric,
}

/// Canonical fields carrying dates.
const DATE_FIELDS: &[&str] = &[
    keys::DRIVER_DOB,
    keys::POL_EFF_DATE,
    keys::POL_EXPIRY_DATE,
    keys::POL_ISSUE_DATE,
    keys::CANCELLATION_DATE,
    keys::ACCIDENT_DATE,
    keys::INTIMATION_DATE,
    keys::ONBOARDING_DATE,
];

/// Canonical fields carrying money or counts.
const NUMERIC_FIELDS: &[&str] = &[
    keys::SUM_INSURED,
    keys::PREMIUM,
    keys::PREMIUM2,
    keys::CLAIM_AMOUNT,
    keys::APPROVED_AMOUNT,
    keys::COMMISSION_PCT,
    keys::PARTICIPATION_PCT,
    keys::LONGEVITY_YEARS,
];

pub fn field_kind(key: &str) -> FieldKind {
    if DATE_FIELDS.contains(&key) {
        FieldKind::Date
    } else if NUMERIC_FIELDS.contains(&key) {
        FieldKind::Numeric
    } else {
        FieldKind::Text
    }
}

/// Policy fields open to edit during MTA and Renewal.
const POLICY_ADJUSTABLE: &[&str] = &[
    keys::CUSTOMER_NAME,
    keys::CUSTOMER_EMAIL,
    keys::CUSTOMER_PHONE,
    keys::ADDRESS,
    keys::VEHICLE_MAKE,
    keys::VEHICLE_MODEL,
    keys::YEAR_OF_MAKE,
    keys::ENGINE_NO,
    keys::REG_NO,
    keys::DRIVER_NAME,
    keys::DRIVER_DOB,
    keys::LICENSE_NO,
    keys::SUM_INSURED,
    keys::PREMIUM,
    keys::BROKER_ID,
    keys::FACILITY_ID,
];

/// Full entry form for a new policy.
const NEW_BUSINESS_FIELDS: &[&str] = &[
    keys::POLICY_NO,
    keys::CUSTOMER_NAME,
    keys::CUSTOMER_EMAIL,
    keys::CUSTOMER_PHONE,
    keys::ADDRESS,
    keys::VEHICLE_MAKE,
    keys::VEHICLE_MODEL,
    keys::YEAR_OF_MAKE,
    keys::CHASSIS_NO,
    keys::ENGINE_NO,
    keys::REG_NO,
    keys::DRIVER_NAME,
    keys::DRIVER_DOB,
    keys::LICENSE_NO,
    keys::SUM_INSURED,
    keys::PREMIUM,
    keys::POL_EFF_DATE,
    keys::POL_EXPIRY_DATE,
    keys::POL_ISSUE_DATE,
    keys::BROKER_ID,
    keys::FACILITY_ID,
];

const CANCELLATION_FIELDS: &[&str] = &[
    keys::PREMIUM2,
    keys::CANCELLATION_DATE,
    keys::CANCELLATION_REASON,
];

const CLAIM_UPDATE_FIELDS: &[&str] = &[
    keys::CLAIM_STATUS,
    keys::CLAIM_STAGE,
    keys::APPROVED_AMOUNT,
    keys::DESCRIPTION,
    keys::REMARKS,
];

const NEW_CLAIM_FIELDS: &[&str] = &[
    keys::ACCIDENT_DATE,
    keys::INTIMATION_DATE,
    keys::CLAIM_AMOUNT,
    keys::DESCRIPTION,
    keys::REMARKS,
];

const CLAIM_CLOSE_FIELDS: &[&str] = &[keys::REMARKS];

const BROKER_FIELDS: &[&str] = &[
    keys::BROKER_NAME,
    keys::FCA_NUMBER,
    keys::COMMISSION_PCT,
    keys::ONBOARDING_DATE,
    keys::LONGEVITY_YEARS,
    keys::BROKER_TYPE,
    keys::MARKET_ACCESS,
    keys::DELEGATED_AUTHORITY,
];

const FACILITY_FIELDS: &[&str] = &[keys::FACILITY_NAME, keys::ONBOARDING_DATE];

/// Identity and window fields that never change through MTA or Renewal.
const POLICY_LOCKED: &[&str] = &[
    keys::POLICY_NO,
    keys::CHASSIS_NO,
    keys::POL_EFF_DATE,
    keys::POL_EXPIRY_DATE,
];

const CLAIM_LOCKED: &[&str] = &[
    keys::CLAIM_NO,
    keys::POLICY_NO,
    keys::ACCIDENT_DATE,
    keys::INTIMATION_DATE,
    keys::CLAIM_AMOUNT,
];

/// Renewal rolls the window forward and re-issues; these are prefills the
/// user cannot override.
const RENEWAL_COMPUTED: &[&str] = &[
    keys::POL_EFF_DATE,
    keys::POL_EXPIRY_DATE,
    keys::POL_ISSUE_DATE,
];

pub fn editable_fields(kind: TransactionKind) -> &'static [&'static str] {
    match kind {
        TransactionKind::NewBusiness => NEW_BUSINESS_FIELDS,
        TransactionKind::MidTermAdjustment | TransactionKind::Renewal => POLICY_ADJUSTABLE,
        TransactionKind::Cancellation => CANCELLATION_FIELDS,
        TransactionKind::NewClaim => NEW_CLAIM_FIELDS,
        TransactionKind::ClaimUpdate => CLAIM_UPDATE_FIELDS,
        TransactionKind::ClaimClose => CLAIM_CLOSE_FIELDS,
        TransactionKind::ClaimReopen => &[],
        TransactionKind::BrokerOnboarding => BROKER_FIELDS,
        TransactionKind::FacilityOnboarding => FACILITY_FIELDS,
    }
}

/// Fields stripped from any committed diff for this kind.
pub fn immutable_fields(kind: TransactionKind) -> &'static [&'static str] {
    match kind {
        TransactionKind::MidTermAdjustment | TransactionKind::Renewal => POLICY_LOCKED,
        TransactionKind::ClaimUpdate | TransactionKind::ClaimClose | TransactionKind::ClaimReopen => {
            CLAIM_LOCKED
        }
        _ => &[],
    }
}

/// Prefilled-and-locked fields for this kind.
pub fn computed_fields(kind: TransactionKind) -> &'static [&'static str] {
    match kind {
        TransactionKind::Renewal => RENEWAL_COMPUTED,
        _ => &[],
    }
}

/// Fields written on commit even when the diff finds them unchanged.
pub fn always_included_fields(kind: TransactionKind) -> &'static [&'static str] {
    match kind {
        TransactionKind::Renewal => RENEWAL_COMPUTED,
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renewal_window_is_locked_but_always_written() {
        let immutable = immutable_fields(TransactionKind::Renewal);
        assert!(immutable.contains(&keys::POLICY_NO));
        assert!(immutable.contains(&keys::CHASSIS_NO));
        // The rolled window is a computed prefill, forced into every commit.
        let always = always_included_fields(TransactionKind::Renewal);
        assert!(always.contains(&keys::POL_EFF_DATE));
        assert!(always.contains(&keys::POL_EXPIRY_DATE));
        assert!(always.contains(&keys::POL_ISSUE_DATE));
    }

    #[test]
    fn adjustable_policy_fields_exclude_identity() {
        let editable = editable_fields(TransactionKind::MidTermAdjustment);
        assert!(!editable.contains(&keys::POLICY_NO));
        assert!(!editable.contains(&keys::CHASSIS_NO));
        assert!(editable.contains(&keys::PREMIUM));
    }

    #[test]
    fn field_kinds_cover_dates_and_amounts() {
        assert_eq!(field_kind(keys::POL_EFF_DATE), FieldKind::Date);
        assert_eq!(field_kind(keys::PREMIUM2), FieldKind::Numeric);
        assert_eq!(field_kind(keys::CUSTOMER_NAME), FieldKind::Text);
    }
}
