//! Status enums.
//!
//! Statuses travel as text in the store and on the wire; they are parsed
//! into closed variants at the boundary and compared as variants from then
//! on. Parsing is case-insensitive, rendering uses the display forms the
//! business knows.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} status: {value}")]
pub struct StatusParseError {
    pub kind: &'static str,
    pub value: String,
}

/// Claim lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimStatus {
    New,
    UnderReview,
    Approved,
    Rejected,
    PendingDocumentation,
    Investigation,
    Closed,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New Claim",
            Self::UnderReview => "Under Review",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::PendingDocumentation => "Pending Documentation",
            Self::Investigation => "Investigation",
            Self::Closed => "Closed",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl FromStr for ClaimStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new claim" | "new" => Ok(Self::New),
            "under review" => Ok(Self::UnderReview),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "pending documentation" => Ok(Self::PendingDocumentation),
            "investigation" => Ok(Self::Investigation),
            "closed" => Ok(Self::Closed),
            _ => Err(StatusParseError {
                kind: "claim",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Broker relationship status, derived from onboarding date plus agreed
/// longevity rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrokerStatus {
    Active,
    Completed,
}

impl BrokerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Completed => "Completed",
        }
    }

    /// Active while `today` falls before the onboarding date advanced by
    /// the agreed longevity in years.
    pub fn derive(onboarding_date: NaiveDate, longevity_years: i32, today: NaiveDate) -> Self {
        let end = add_years_clamped(onboarding_date, longevity_years);
        if today <= end {
            Self::Active
        } else {
            Self::Completed
        }
    }
}

impl std::fmt::Display for BrokerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Processing state of an uploaded document's metadata row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    Processing,
    Completed,
    Error,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Error => "Error",
        }
    }
}

impl FromStr for UploadStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            _ => Err(StatusParseError {
                kind: "upload",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Quotation (pre-bind draft) status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteStatus {
    Draft,
    Sent,
    Converted,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Sent => "Sent",
            Self::Converted => "Converted",
        }
    }
}

impl FromStr for QuoteStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "sent" => Ok(Self::Sent),
            "converted" => Ok(Self::Converted),
            _ => Err(StatusParseError {
                kind: "quotation",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Advance a civil date by whole years, clamping Feb 29 to Feb 28 when the
/// target year is not a leap year.
pub fn add_years_clamped(date: NaiveDate, years: i32) -> NaiveDate {
    use chrono::Datelike;
    let year = date.year() + years;
    date.with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), 28))
        .unwrap_or(date)
}
