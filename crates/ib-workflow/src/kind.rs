//! Transaction kinds.

use serde::{Deserialize, Serialize};

/// Every transaction type the portal drives through the step machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    NewBusiness,
    MidTermAdjustment,
    Renewal,
    Cancellation,
    NewClaim,
    ClaimUpdate,
    ClaimClose,
    ClaimReopen,
    BrokerOnboarding,
    FacilityOnboarding,
}

impl TransactionKind {
    /// Business tag stamped into TRANSACTION_TYPE on commit.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NewBusiness => "New Business",
            Self::MidTermAdjustment => "MTA",
            Self::Renewal => "Renewal",
            Self::Cancellation => "Cancellation",
            Self::NewClaim => "New Claim",
            Self::ClaimUpdate => "Claim Update",
            Self::ClaimClose => "Claim Close",
            Self::ClaimReopen => "Claim Reopen",
            Self::BrokerOnboarding => "Broker Onboarding",
            Self::FacilityOnboarding => "Facility Onboarding",
        }
    }

    /// Whether the workflow starts by looking up an existing record.
    /// Creation flows go straight to the edit form.
    pub fn requires_fetch(&self) -> bool {
        !matches!(
            self,
            Self::NewBusiness | Self::BrokerOnboarding | Self::FacilityOnboarding
        )
    }

    /// Kinds whose lookup key is a policy number.
    pub fn is_policy_transaction(&self) -> bool {
        matches!(
            self,
            Self::MidTermAdjustment | Self::Renewal | Self::Cancellation | Self::NewClaim
        )
    }

    /// Kinds whose lookup key is a claim number.
    pub fn is_claim_transaction(&self) -> bool {
        matches!(self, Self::ClaimUpdate | Self::ClaimClose | Self::ClaimReopen)
    }

    /// Cancellation commits only after an explicit second confirmation.
    pub fn needs_double_confirmation(&self) -> bool {
        matches!(self, Self::Cancellation)
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}
