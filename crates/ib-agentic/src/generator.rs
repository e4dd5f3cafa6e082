use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::llm_client::LlmClient;
use crate::openai_client::OpenAiClient;

/// Turns an analyst's question into a single warehouse SELECT.
///
/// The generator only produces text. Guarding and execution happen in the
/// application crate, so a bad completion can never touch the database
/// from here.
pub struct SqlGenerator {
    client: Arc<dyn LlmClient>,
}

impl SqlGenerator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Build against the default OpenAI-backed client.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(Arc::new(OpenAiClient::from_env()?)))
    }

    pub async fn generate(&self, question: &str) -> Result<String> {
        info!(
            model = self.client.model_name(),
            provider = self.client.provider_name(),
            "generating warehouse SQL"
        );

        let response = self
            .client
            .chat(&build_system_prompt(), question)
            .await?;

        Ok(strip_code_blocks(&response))
    }
}

fn build_system_prompt() -> String {
    r#"You are a SQL analyst for an insurance business portal. Translate the user's question into exactly one PostgreSQL SELECT statement over the warehouse schema below.

Tables:

portal.policies(policy_no, customer_name, customer_email, customer_phone, address, vehicle_make, vehicle_model, year_of_make, chassis_no, engine_no, reg_no, driver_name, driver_dob, license_no, sum_insured, premium, premium2, pol_eff_date, pol_expiry_date, pol_issue_date, cancellation_date, cancellation_reason, transaction_type, broker_id, facility_id, is_cancelled, is_lapsed, update_date, created_at)
portal.claims(claim_no, policy_no, accident_date, intimation_date, claim_amount, approved_amount, claim_status, claim_stage, description, remarks, update_date, created_at)
portal.brokers(broker_id, broker_name, fca_number, commission_pct, onboarding_date, longevity_years, broker_type, market_access, delegated_authority, created_at)
portal.facilities(facility_id, facility_name, onboarding_date, created_at)
portal.facility_lines(line_id, facility_id, insurer_name, participation_pct, is_lead, created_at)
portal.upload_documents(doc_id, file_name, stored_name, content_hash, blob_url, doc_category, doc_subcategory, transaction_type, extracted_json, reference_number, status, error_detail, created_at)
portal.quotations(temp_policy_id, status, fields, created_at, updated_at)

Column notes:
- Dates are DATE columns; compare with ISO literals such as '2026-01-31'.
- A live policy has is_cancelled = false and is_lapsed = false; lapse means the cover window has expired.
- claim_status is one of 'New Claim', 'Under Review', 'Approved', 'Rejected', 'Pending Documentation', 'Investigation', 'Closed'.
- premium2 carries endorsement and return premiums; cancellations store it negative.
- transaction_type records the last transaction: 'New Business', 'MTA', 'Renewal' or 'Cancellation'.
- quotations.fields is a JSONB document holding the draft form; quotations.status is 'Draft', 'Sent' or 'Converted'.
- upload_documents.status is 'Processing', 'Completed' or 'Error'.

Rules:
- Generate ONLY a single SELECT statement. Never modify data.
- Always schema-qualify tables as portal.<table>.
- Use WITH clauses when the question needs intermediate aggregation.
- Prefer explicit column lists over SELECT *.
- If the question cannot be answered from these tables, respond with: SELECT 'not answerable from the warehouse' AS answer
- Return the SQL alone, no commentary."#
        .to_string()
}

/// Models often wrap SQL in a fenced code block. Take the inside if so.
fn strip_code_blocks(response: &str) -> String {
    let trimmed = response.trim();
    if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() > 2 {
            return lines[1..lines.len() - 1].join("\n").trim().to_string();
        }
    }
    trimmed.to_string()
}
