//! Database services.
//!
//! One service struct per aggregate, each owning a clone of the shared
//! pool. Writes driven by a canonical field map go through the typed-bind
//! helpers here: column names come from per-table allow lists and every
//! value is bound as a parameter, never spliced into the SQL text.

pub mod broker_service;
pub mod claim_service;
pub mod commit;
pub mod document_service;
pub mod facility_service;
pub mod policy_service;
pub mod quotation_service;
pub mod warehouse;

pub use broker_service::BrokerService;
pub use claim_service::ClaimService;
pub use commit::{CommitExecutor, CommitReceipt};
pub use document_service::DocumentMetadataService;
pub use facility_service::FacilityService;
pub use policy_service::PolicyService;
pub use quotation_service::QuotationService;
pub use warehouse::WarehouseService;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use ib_portal_types::{parse_portal_date, value_to_string, FieldMap};
use ib_workflow::{field_kind, FieldKind};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};

/// Connect the shared pool.
pub async fn connect_pool(database_url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("Failed to connect to database")
}

/// A canonical field value coerced to its column type.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BindValue {
    Text(String),
    Date(NaiveDate),
    Number(Decimal),
}

/// Coerce one field to the type its column carries. The workflow layer
/// validates formats before anything reaches here, so a miss is a caller
/// bug, not user input.
pub(crate) fn typed_value(key: &str, value: &serde_json::Value) -> Result<BindValue> {
    let raw = value_to_string(value);
    match field_kind(key) {
        FieldKind::Date => match parse_portal_date(&raw) {
            Some(d) => Ok(BindValue::Date(d)),
            None => bail!("unparseable date for {key}: {raw}"),
        },
        FieldKind::Numeric => match raw.replace(',', "").parse::<Decimal>() {
            Ok(n) => Ok(BindValue::Number(n)),
            Err(_) => bail!("unparseable number for {key}: {raw}"),
        },
        FieldKind::Text => Ok(BindValue::Text(raw)),
    }
}

/// Append `, column = $n` assignments for every field the allow list
/// recognizes, skipping `skip` keys. Returns how many assignments landed.
pub(crate) fn push_assignments(
    qb: &mut QueryBuilder<'_, Postgres>,
    fields: &FieldMap,
    column_for: fn(&str) -> Option<&'static str>,
    skip: &[&str],
) -> Result<usize> {
    let mut pushed = 0;
    for (key, value) in fields {
        if skip.contains(&key.as_str()) {
            continue;
        }
        let Some(column) = column_for(key) else {
            continue;
        };
        qb.push(", ");
        qb.push(column);
        qb.push(" = ");
        push_bind_value(qb, typed_value(key, value)?);
        pushed += 1;
    }
    Ok(pushed)
}

pub(crate) fn push_bind_value(qb: &mut QueryBuilder<'_, Postgres>, value: BindValue) {
    match value {
        BindValue::Text(v) => qb.push_bind(v),
        BindValue::Date(v) => qb.push_bind(v),
        BindValue::Number(v) => qb.push_bind(v),
    };
}
