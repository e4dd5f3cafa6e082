//! Applying released workflow commits to the store.
//!
//! The session machine hands over a [`CommitRequest`]; this is the single
//! place that turns one into writes. Onboarding flows commit through
//! their own endpoints and never produce a commit request.

use anyhow::Result;
use chrono::Utc;
use ib_portal_types::{claim_number, get_str, keys};
use ib_workflow::{CommitRequest, FieldChange, TransactionKind};
use serde::Serialize;
use tracing::info;

use crate::error::PortalError;

use super::{ClaimService, PolicyService};

/// What a commit did, for the response body.
#[derive(Debug, Clone, Serialize)]
pub struct CommitReceipt {
    pub kind: TransactionKind,
    /// The record the commit landed on; for new records, the generated id.
    pub reference: String,
    pub changes: Vec<FieldChange>,
}

#[derive(Clone, Debug)]
pub struct CommitExecutor {
    policies: PolicyService,
    claims: ClaimService,
}

impl CommitExecutor {
    pub fn new(policies: PolicyService, claims: ClaimService) -> Self {
        Self { policies, claims }
    }

    pub async fn apply(&self, request: &CommitRequest) -> Result<CommitReceipt, PortalError> {
        let receipt = match request.kind {
            TransactionKind::NewBusiness => {
                let policy_no = get_str(&request.fields, keys::POLICY_NO).ok_or_else(|| {
                    PortalError::validation("a policy number is required")
                })?;
                if self.policies.find_by_policy_no(&policy_no).await?.is_some() {
                    return Err(PortalError::validation(format!(
                        "policy {policy_no} already exists"
                    )));
                }
                let created = self.policies.insert_new_business(&request.fields).await?;
                self.receipt(request, created)
            }
            TransactionKind::MidTermAdjustment | TransactionKind::Renewal => {
                let policy_no = self.target(request)?;
                let applied = self
                    .policies
                    .apply_transaction(&policy_no, request.kind, &request.fields)
                    .await?;
                if !applied {
                    return Err(PortalError::not_found(format!("policy {policy_no}")));
                }
                self.receipt(request, policy_no)
            }
            TransactionKind::Cancellation => {
                let policy_no = self.target(request)?;
                let applied = self
                    .policies
                    .apply_cancellation(&policy_no, &request.fields)
                    .await?;
                if !applied {
                    return Err(PortalError::not_found(format!("policy {policy_no}")));
                }
                self.receipt(request, policy_no)
            }
            TransactionKind::NewClaim => {
                let claim_no = claim_number(Utc::now());
                self.claims.insert_new_claim(&claim_no, &request.fields).await?;
                self.receipt(request, claim_no)
            }
            TransactionKind::ClaimUpdate
            | TransactionKind::ClaimClose
            | TransactionKind::ClaimReopen => {
                let claim_no = self.target(request)?;
                let applied = self.claims.apply_claim(&claim_no, &request.fields).await?;
                if !applied {
                    return Err(PortalError::not_found(format!("claim {claim_no}")));
                }
                self.receipt(request, claim_no)
            }
            TransactionKind::BrokerOnboarding | TransactionKind::FacilityOnboarding => {
                return Err(PortalError::WrongStep(
                    "onboarding commits through the onboarding endpoints".to_string(),
                ));
            }
        };

        info!(
            kind = receipt.kind.tag(),
            reference = %receipt.reference,
            changes = receipt.changes.len(),
            "commit applied"
        );
        Ok(receipt)
    }

    fn target(&self, request: &CommitRequest) -> Result<String, PortalError> {
        request
            .reference
            .clone()
            .ok_or_else(|| PortalError::WrongStep("no record was fetched for this commit".into()))
    }

    fn receipt(&self, request: &CommitRequest, reference: String) -> CommitReceipt {
        CommitReceipt {
            kind: request.kind,
            reference,
            changes: request.changes.clone(),
        }
    }
}
