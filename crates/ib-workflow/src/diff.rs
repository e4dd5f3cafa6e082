//! Change detection between the fetched snapshot and a prepared submission.
//!
//! Comparison is value-aware: "200.00" against "200" and "01/06/2025"
//! against "2025-06-01" are not changes. Identity fields never appear in
//! the diff, and a renewal always carries its recomputed dates so the
//! confirmation screen shows the new period even when nothing else moved.

use serde_json::Value;

use ib_portal_types::{value_to_string, values_equal, FieldMap};

use crate::kind::TransactionKind;
use crate::mapping::{always_included_fields, immutable_fields};

/// One field's movement, rendered for the confirmation screen.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FieldChange {
    pub field: String,
    pub old: Option<String>,
    pub new: String,
}

/// Diff `prepared` against `snapshot` for this transaction kind.
pub fn compute_changes(
    kind: TransactionKind,
    snapshot: &FieldMap,
    prepared: &FieldMap,
) -> Vec<FieldChange> {
    let locked = immutable_fields(kind);
    let forced = always_included_fields(kind);

    let mut changes = Vec::new();
    for (key, new_value) in prepared {
        // Forced fields are system-written and outrank the user lock.
        let is_forced = forced.contains(&key.as_str());
        if !is_forced && locked.contains(&key.as_str()) {
            continue;
        }
        let old_value = snapshot.get(key);
        let moved = match old_value {
            Some(old) => !values_equal(old, new_value),
            None => !matches!(new_value, Value::Null),
        };
        if moved || is_forced {
            changes.push(FieldChange {
                field: key.clone(),
                old: old_value.map(value_to_string),
                new: value_to_string(new_value),
            });
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use ib_portal_types::keys;
    use serde_json::json;

    fn map(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn equivalent_renderings_are_not_changes() {
        let snapshot = map(&[(keys::PREMIUM, "200.00"), (keys::DRIVER_DOB, "1990-03-15")]);
        let prepared = map(&[(keys::PREMIUM, "200"), (keys::DRIVER_DOB, "15/03/1990")]);
        let changes = compute_changes(TransactionKind::MidTermAdjustment, &snapshot, &prepared);
        assert!(changes.is_empty());
    }

    #[test]
    fn identity_fields_never_surface() {
        let snapshot = map(&[(keys::POLICY_NO, "POL100"), (keys::PREMIUM, "200")]);
        let prepared = map(&[(keys::POLICY_NO, "POL999"), (keys::PREMIUM, "250")]);
        let changes = compute_changes(TransactionKind::MidTermAdjustment, &snapshot, &prepared);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, keys::PREMIUM);
        assert_eq!(changes[0].old.as_deref(), Some("200"));
        assert_eq!(changes[0].new, "250");
    }

    #[test]
    fn renewal_always_lists_the_recomputed_period() {
        let snapshot = map(&[
            (keys::POL_EFF_DATE, "2024-06-01"),
            (keys::POL_EXPIRY_DATE, "2025-06-01"),
        ]);
        let prepared = map(&[
            (keys::POL_EFF_DATE, "2025-06-01"),
            (keys::POL_EXPIRY_DATE, "2026-06-01"),
            (keys::POL_ISSUE_DATE, "2025-05-20"),
        ]);
        let changes = compute_changes(TransactionKind::Renewal, &snapshot, &prepared);
        let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
        assert!(fields.contains(&keys::POL_EFF_DATE));
        assert!(fields.contains(&keys::POL_EXPIRY_DATE));
        assert!(fields.contains(&keys::POL_ISSUE_DATE));
    }

    #[test]
    fn renewal_period_surfaces_even_when_dates_match() {
        // Re-running a renewal against an already rolled policy still shows
        // the period on the confirmation screen.
        let snapshot = map(&[(keys::POL_EFF_DATE, "2025-06-01")]);
        let prepared = map(&[(keys::POL_EFF_DATE, "2025-06-01")]);
        let changes = compute_changes(TransactionKind::Renewal, &snapshot, &prepared);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old, changes[0].new.clone().into());
    }
}
