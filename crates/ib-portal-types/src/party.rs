//! Broker, facility and insurer-participation records.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::status::BrokerStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BrokerRecord {
    pub broker_id: String,
    pub broker_name: String,
    pub fca_number: String,
    pub commission_pct: Option<Decimal>,
    pub onboarding_date: Option<NaiveDate>,
    pub longevity_years: Option<i32>,
    pub broker_type: Option<String>,
    pub market_access: Option<String>,
    pub delegated_authority: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl BrokerRecord {
    /// Status is derived, never stored: Active until the onboarding date
    /// plus longevity passes, Completed after.
    pub fn status_as_of(&self, today: NaiveDate) -> BrokerStatus {
        match (self.onboarding_date, self.longevity_years) {
            (Some(onboarded), Some(years)) => BrokerStatus::derive(onboarded, years, today),
            _ => BrokerStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FacilityRecord {
    pub facility_id: String,
    pub facility_name: String,
    pub onboarding_date: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
}

/// One insurer's participation line within a facility.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InsurerLine {
    pub line_id: Uuid,
    pub facility_id: String,
    pub insurer_name: String,
    pub participation_pct: Decimal,
    pub is_lead: bool,
    pub created_at: Option<DateTime<Utc>>,
}
