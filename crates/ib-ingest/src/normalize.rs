//! Field normalization between extraction output and the portal's
//! canonical keys.
//!
//! The extraction service labels fields the way documents do ("Policy
//! Number", "Date of Loss", "Sum Assured"); the portal works in canonical
//! upper-snake keys. Aliases are folded case- and punctuation-insensitively
//! so "Policy Number", "policy_no" and "PolicyNo" all land on POLICY_NO.
//! Unknown labels are dropped. Amount fields are cleaned of currency
//! symbols and separators; a value that still fails to parse is kept
//! verbatim so the user sees what the document said.

use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use ib_portal_types::{keys, value_to_string, FieldMap};
use ib_workflow::{field_kind, FieldKind};

/// Fold a raw label for alias lookup: lowercase, alphanumerics only.
fn fold(label: &str) -> String {
    label
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Map a document label to its canonical key, if the portal knows it.
pub fn canonical_key(label: &str) -> Option<&'static str> {
    let folded = fold(label);
    let key = match folded.as_str() {
        "policyno" | "policynumber" => keys::POLICY_NO,
        "customername" | "insuredname" | "nameofinsured" | "policyholder" => keys::CUSTOMER_NAME,
        "customeremail" | "email" | "emailaddress" => keys::CUSTOMER_EMAIL,
        "customerphone" | "phone" | "phoneno" | "mobileno" | "contactnumber" => {
            keys::CUSTOMER_PHONE
        }
        "address" | "customeraddress" => keys::ADDRESS,
        "vehiclemake" | "make" => keys::VEHICLE_MAKE,
        "vehiclemodel" | "model" => keys::VEHICLE_MODEL,
        "yearofmake" | "yearofmanufacture" | "modelyear" => keys::YEAR_OF_MAKE,
        "chassisno" | "chassisnumber" | "vin" => keys::CHASSIS_NO,
        "engineno" | "enginenumber" => keys::ENGINE_NO,
        "regno" | "registrationno" | "registrationnumber" | "vehicleregistration" => keys::REG_NO,
        "drivername" | "nameofdriver" => keys::DRIVER_NAME,
        "driverdob" | "dateofbirth" | "dob" => keys::DRIVER_DOB,
        "licenseno" | "licencenumber" | "licensenumber" | "drivinglicenseno" => keys::LICENSE_NO,
        "suminsured" | "sumassured" | "insuredvalue" => keys::SUM_INSURED,
        "premium" | "premiumamount" | "grosspremium" | "annualpremium" => keys::PREMIUM,
        "premium2" | "returnpremium" | "refundpremium" | "refundamount" => keys::PREMIUM2,
        "poleffdate" | "effectivedate" | "policystartdate" | "inceptiondate" | "startdate" => {
            keys::POL_EFF_DATE
        }
        "polexpirydate" | "expirydate" | "policyenddate" | "enddate" => keys::POL_EXPIRY_DATE,
        "polissuedate" | "issuedate" | "dateofissue" => keys::POL_ISSUE_DATE,
        "cancellationdate" | "dateofcancellation" => keys::CANCELLATION_DATE,
        "cancellationreason" | "reasonforcancellation" => keys::CANCELLATION_REASON,
        "claimno" | "claimnumber" => keys::CLAIM_NO,
        "accidentdate" | "dateofaccident" | "dateofloss" | "lossdate" | "incidentdate" => {
            keys::ACCIDENT_DATE
        }
        "intimationdate" | "dateofintimation" | "notificationdate" | "reporteddate" => {
            keys::INTIMATION_DATE
        }
        "claimamount" | "claimedamount" | "estimatedloss" | "amountclaimed" => keys::CLAIM_AMOUNT,
        "approvedamount" | "settlementamount" | "amountapproved" => keys::APPROVED_AMOUNT,
        "claimstatus" => keys::CLAIM_STATUS,
        "claimstage" => keys::CLAIM_STAGE,
        "description" | "lossdescription" | "accidentdescription" | "causeofloss" => {
            keys::DESCRIPTION
        }
        "remarks" | "notes" | "comments" => keys::REMARKS,
        "brokername" | "nameofbroker" | "brokingfirm" => keys::BROKER_NAME,
        "brokerid" => keys::BROKER_ID,
        "fcanumber" | "fcaref" | "fcaregistrationnumber" | "fcafirmreference" => keys::FCA_NUMBER,
        "commissionpct" | "commission" | "commissionpercentage" | "commissionrate" => {
            keys::COMMISSION_PCT
        }
        "brokertype" | "typeofbroker" => keys::BROKER_TYPE,
        "marketaccess" => keys::MARKET_ACCESS,
        "delegatedauthority" => keys::DELEGATED_AUTHORITY,
        "longevityyears" | "yearsinbusiness" | "yearstrading" => keys::LONGEVITY_YEARS,
        "onboardingdate" | "dateofonboarding" => keys::ONBOARDING_DATE,
        "facilityname" | "nameoffacility" => keys::FACILITY_NAME,
        "facilityid" => keys::FACILITY_ID,
        "insurername" | "insurer" | "carrier" | "underwriter" => keys::INSURER_NAME,
        "participationpct" | "participation" | "sharepct" | "share" | "lineshare" => {
            keys::PARTICIPATION_PCT
        }
        _ => return None,
    };
    Some(key)
}

/// Strip currency symbols and separators from an amount string.
/// "£1,250.00" becomes "1250.00"; anything that still fails to parse is
/// returned unchanged.
pub fn clean_amount(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.parse::<Decimal>().is_ok() {
        cleaned
    } else {
        raw.to_string()
    }
}

/// Normalize one extraction field map into canonical portal fields.
pub fn normalize_fields(raw: &Map<String, Value>) -> FieldMap {
    let mut out = FieldMap::new();
    for (label, value) in raw {
        let Some(key) = canonical_key(label) else {
            tracing::debug!(label, "dropping unrecognized extraction field");
            continue;
        };
        let text = value_to_string(value);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let rendered = match field_kind(key) {
            FieldKind::Numeric => clean_amount(text),
            _ => text.to_string(),
        };
        out.insert(key.to_string(), json!(rendered));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_labels_fold_onto_canonical_keys() {
        assert_eq!(canonical_key("Policy Number"), Some(keys::POLICY_NO));
        assert_eq!(canonical_key("policy_no"), Some(keys::POLICY_NO));
        assert_eq!(canonical_key("PolicyNo"), Some(keys::POLICY_NO));
        assert_eq!(canonical_key("Date of Loss"), Some(keys::ACCIDENT_DATE));
        assert_eq!(canonical_key("Sum Assured"), Some(keys::SUM_INSURED));
        assert_eq!(canonical_key("Mystery Field"), None);
    }

    #[test]
    fn amounts_are_cleaned_of_currency_noise() {
        assert_eq!(clean_amount("£1,250.00"), "1250.00");
        assert_eq!(clean_amount("$ 980"), "980");
        assert_eq!(clean_amount("TBC"), "TBC");
        assert_eq!(clean_amount("12-14k"), "12-14k");
    }

    #[test]
    fn unparseable_amounts_survive_verbatim() {
        let mut raw = Map::new();
        raw.insert("Premium Amount".into(), json!("TBC"));
        raw.insert("Sum Insured".into(), json!("£15,000"));
        raw.insert("Unknown".into(), json!("x"));

        let fields = normalize_fields(&raw);
        assert_eq!(fields[keys::PREMIUM], json!("TBC"));
        assert_eq!(fields[keys::SUM_INSURED], json!("15000"));
        assert!(!fields.contains_key("Unknown"));
    }

    #[test]
    fn numbers_arriving_as_json_numbers_are_kept() {
        let mut raw = Map::new();
        raw.insert("Premium".into(), json!(1250.5));
        let fields = normalize_fields(&raw);
        assert_eq!(fields[keys::PREMIUM], json!("1250.5"));
    }
}
