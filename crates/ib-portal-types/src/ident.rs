//! Identifier generation.
//!
//! Claim and quotation ids embed a UTC timestamp with millisecond
//! precision; broker ids are derived deterministically so a repeat TOBA
//! submission for the same firm resolves to the same id.

use chrono::{DateTime, Utc};

/// `CLM<timestamp>` claim number.
pub fn claim_number(now: DateTime<Utc>) -> String {
    format!("CLM{}", now.format("%Y%m%d%H%M%S%3f"))
}

/// `TMP<timestamp>` pre-bind quotation id.
pub fn temp_policy_id(now: DateTime<Utc>) -> String {
    format!("TMP{}", now.format("%Y%m%d%H%M%S%3f"))
}

/// Deterministic broker id: uppercase initials of the firm name followed by
/// the digits of the FCA registration number. "Bishopsgate Insurance
/// Brokers" / "312044" becomes `BIB312044`.
pub fn derive_broker_id(broker_name: &str, fca_number: &str) -> String {
    let initials: String = broker_name
        .split_whitespace()
        .filter_map(|word| word.chars().find(|c| c.is_alphanumeric()))
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let digits: String = fca_number.chars().filter(|c| c.is_ascii_digit()).collect();
    let prefix = if initials.is_empty() { "BRK".to_string() } else { initials };
    format!("{prefix}{digits}")
}

/// `FAC###` facility id for the given sequence number.
pub fn facility_id_for_sequence(seq: u32) -> String {
    format!("FAC{seq:03}")
}

/// Parse the sequence number back out of a `FAC###` id.
pub fn facility_sequence(facility_id: &str) -> Option<u32> {
    facility_id.strip_prefix("FAC")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn claim_number_embeds_timestamp() {
        let at = Utc.with_ymd_and_hms(2025, 7, 1, 9, 30, 5).unwrap();
        assert_eq!(claim_number(at), "CLM20250701093005000");
    }

    #[test]
    fn broker_id_is_deterministic() {
        assert_eq!(
            derive_broker_id("Bishopsgate Insurance Brokers", "312044"),
            "BIB312044"
        );
        assert_eq!(derive_broker_id("Bishopsgate Insurance Brokers", "FCA-312044"), "BIB312044");
        assert_eq!(derive_broker_id("", "104"), "BRK104");
    }

    #[test]
    fn facility_ids_roundtrip() {
        assert_eq!(facility_id_for_sequence(7), "FAC007");
        assert_eq!(facility_sequence("FAC007"), Some(7));
        assert_eq!(facility_sequence("FAC112"), Some(112));
        assert_eq!(facility_sequence("XYZ"), None);
    }
}
