//! Shared data vocabulary for the portal.
//!
//! Canonical field-map conventions, typed store records with their
//! field-map renderings, closed status enums, and identifier generation.
//! Everything here is I/O-free; persistence lives with the services that
//! own the pool.

pub mod claim;
pub mod document;
pub mod fields;
pub mod ident;
pub mod party;
pub mod policy;
pub mod quote;
pub mod status;

pub use claim::{append_reopen_remark, ClaimRecord};
pub use document::UploadDocument;
pub use fields::{
    format_portal_date, get_date, get_decimal, get_str, is_empty_value, keys, parse_portal_date,
    value_to_string, values_equal, FieldMap,
};
pub use ident::{
    claim_number, derive_broker_id, facility_id_for_sequence, facility_sequence, temp_policy_id,
};
pub use party::{BrokerRecord, FacilityRecord, InsurerLine};
pub use policy::PolicyRecord;
pub use quote::QuotationRecord;
pub use status::{
    add_years_clamped, BrokerStatus, ClaimStatus, QuoteStatus, StatusParseError, UploadStatus,
};
