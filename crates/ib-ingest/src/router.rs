//! Routing from extraction output to a workflow entry point.
//!
//! The classification (or the legacy bare `Type` string) picks the
//! transaction kind; the normalized field map is filtered down to that
//! kind's editable fields so extraction can never write through a field
//! the form itself locks. The best-effort reference number depends on the
//! detected category: policy number, claim number, broker FCA number or
//! facility id.

use serde_json::Value;

use ib_portal_types::{get_str, keys, FieldMap};
use ib_workflow::{editable_fields, TransactionKind};

use crate::error::IngestError;
use crate::extraction::ExtractionResponse;
use crate::normalize::normalize_fields;

/// Where an upload batch should land after extraction.
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    pub kind: TransactionKind,
    /// Lookup key for the fetch step, when the document carried one.
    pub reference: Option<String>,
    /// Normalized fields filtered to the kind's editable set.
    pub prefill: FieldMap,
    /// Insurer participation sub-records from a facility document, each
    /// normalized independently.
    pub insurer_lines: Vec<FieldMap>,
}

pub fn route(response: &ExtractionResponse) -> Result<RoutingDecision, IngestError> {
    let normalized = normalize_fields(&response.extracted_fields);

    let kind = if let Some(class) = &response.classification {
        classify(&class.category, class.subcategory.as_deref()).ok_or_else(|| {
            IngestError::Unroutable(format!(
                "unrecognized classification {}/{}",
                class.category,
                class.subcategory.as_deref().unwrap_or("-")
            ))
        })?
    } else if let Some(legacy) = &response.legacy_type {
        sniff_kind(legacy)
            .ok_or_else(|| IngestError::Unroutable(format!("unrecognized document type {legacy}")))?
    } else {
        return Err(IngestError::Unroutable(
            "extraction returned no classification".into(),
        ));
    };

    let reference = reference_for(kind, &normalized);
    let allowed = editable_fields(kind);
    let prefill: FieldMap = normalized
        .iter()
        .filter(|(k, _)| allowed.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let insurer_lines = if kind == TransactionKind::FacilityOnboarding {
        insurer_sub_records(response)
    } else {
        Vec::new()
    };

    tracing::info!(
        kind = kind.tag(),
        reference = reference.as_deref().unwrap_or("-"),
        prefilled = prefill.len(),
        "routed extraction batch"
    );

    Ok(RoutingDecision {
        kind,
        reference,
        prefill,
        insurer_lines,
    })
}

fn classify(category: &str, subcategory: Option<&str>) -> Option<TransactionKind> {
    let cat = fold(category);
    let sub = subcategory.map(fold).unwrap_or_default();

    if cat.contains("claim") {
        return Some(match sub.as_str() {
            s if s.contains("update") => TransactionKind::ClaimUpdate,
            s if s.contains("close") || s.contains("closure") => TransactionKind::ClaimClose,
            s if s.contains("reopen") => TransactionKind::ClaimReopen,
            _ => TransactionKind::NewClaim,
        });
    }
    if cat.contains("policy") {
        return Some(match sub.as_str() {
            s if s.contains("mta") || s.contains("midterm") || s.contains("endorsement") => {
                TransactionKind::MidTermAdjustment
            }
            s if s.contains("renewal") => TransactionKind::Renewal,
            s if s.contains("cancel") => TransactionKind::Cancellation,
            _ => TransactionKind::NewBusiness,
        });
    }
    if cat.contains("toba") || cat.contains("broker") {
        return Some(TransactionKind::BrokerOnboarding);
    }
    if cat.contains("facility") || cat.contains("insurer") || cat.contains("binder") {
        return Some(TransactionKind::FacilityOnboarding);
    }
    None
}

/// Keyword sniff over a legacy type string or a file name. Claim keywords
/// are checked before policy ones so "claim form for policy POL1" routes
/// as a claim.
pub fn sniff_kind(text: &str) -> Option<TransactionKind> {
    let folded = fold(text);
    if folded.contains("claim") {
        return Some(TransactionKind::NewClaim);
    }
    if folded.contains("renewal") {
        return Some(TransactionKind::Renewal);
    }
    if folded.contains("cancel") {
        return Some(TransactionKind::Cancellation);
    }
    if folded.contains("mta") || folded.contains("endorsement") {
        return Some(TransactionKind::MidTermAdjustment);
    }
    if folded.contains("toba") || folded.contains("broker") {
        return Some(TransactionKind::BrokerOnboarding);
    }
    if folded.contains("facility") || folded.contains("binder") || folded.contains("insurer") {
        return Some(TransactionKind::FacilityOnboarding);
    }
    if folded.contains("policy") || folded.contains("schedule") {
        return Some(TransactionKind::NewBusiness);
    }
    None
}

fn reference_for(kind: TransactionKind, fields: &FieldMap) -> Option<String> {
    match kind {
        TransactionKind::MidTermAdjustment
        | TransactionKind::Renewal
        | TransactionKind::Cancellation => get_str(fields, keys::POLICY_NO),
        // A new claim fetches the policy; the claim form usually names it.
        TransactionKind::NewClaim => {
            get_str(fields, keys::POLICY_NO).or_else(|| get_str(fields, keys::CLAIM_NO))
        }
        TransactionKind::ClaimUpdate | TransactionKind::ClaimClose | TransactionKind::ClaimReopen => {
            get_str(fields, keys::CLAIM_NO).or_else(|| get_str(fields, keys::POLICY_NO))
        }
        TransactionKind::BrokerOnboarding => get_str(fields, keys::FCA_NUMBER),
        TransactionKind::FacilityOnboarding => get_str(fields, keys::FACILITY_ID),
        TransactionKind::NewBusiness => None,
    }
}

/// A facility document may carry several insurer participation records
/// under a list field; each is normalized on its own.
fn insurer_sub_records(response: &ExtractionResponse) -> Vec<FieldMap> {
    for (label, value) in &response.extracted_fields {
        let folded = fold(label);
        if !matches!(folded.as_str(), "insurers" | "participants" | "lines") {
            continue;
        }
        if let Value::Array(items) = value {
            return items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(normalize_fields(map)),
                    _ => None,
                })
                .filter(|fields| !fields.is_empty())
                .collect();
        }
    }
    Vec::new()
}

fn fold(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
