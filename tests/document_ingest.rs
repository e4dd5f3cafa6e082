//! Upload batches carried all the way to a commit, composing the
//! ingestion pipeline with the session machine the same way the upload
//! endpoint does.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use ib_ingest::{
    Classification, ExtractionResponse, FilePayload, InMemoryBlobStore, IngestPipeline,
    MetadataSink, SinkError, StaticExtractor,
};
use ib_portal_types::{keys, PolicyRecord, UploadDocument};
use ib_workflow::{SubmitOptions, SubmitOutcome, TransactionKind, WorkflowSession};
use serde_json::json;
use tokio::sync::Mutex;

#[derive(Default)]
struct MemorySink {
    finals: Mutex<Vec<UploadDocument>>,
}

#[async_trait]
impl MetadataSink for MemorySink {
    async fn record(&self, _doc: &UploadDocument) -> Result<(), SinkError> {
        Ok(())
    }

    async fn finalize(&self, doc: &UploadDocument) -> Result<(), SinkError> {
        self.finals.lock().await.push(doc.clone());
        Ok(())
    }
}

fn stored_policy() -> PolicyRecord {
    PolicyRecord {
        policy_no: "POL999".into(),
        customer_name: Some("A Holder".into()),
        customer_email: None,
        customer_phone: None,
        address: Some("1 Old Road".into()),
        vehicle_make: Some("Volvo".into()),
        vehicle_model: None,
        year_of_make: None,
        chassis_no: Some("CH-42".into()),
        engine_no: None,
        reg_no: None,
        driver_name: None,
        driver_dob: None,
        license_no: None,
        sum_insured: None,
        premium: Some("300".parse().unwrap()),
        premium2: None,
        pol_eff_date: NaiveDate::from_ymd_opt(2025, 6, 1),
        pol_expiry_date: NaiveDate::from_ymd_opt(2026, 6, 1),
        pol_issue_date: NaiveDate::from_ymd_opt(2025, 5, 20),
        cancellation_date: None,
        cancellation_reason: None,
        transaction_type: Some("New Business".into()),
        broker_id: None,
        facility_id: None,
        is_cancelled: false,
        is_lapsed: false,
        update_date: None,
        created_at: None,
    }
}

fn pipeline(sink: Arc<MemorySink>, response: ExtractionResponse) -> IngestPipeline {
    IngestPipeline::new(
        Arc::new(InMemoryBlobStore::new()),
        Arc::new(StaticExtractor::new(response)),
        sink,
    )
}

fn one_pdf(name: &str) -> Vec<FilePayload> {
    vec![FilePayload {
        file_name: name.into(),
        content_type: "application/pdf".into(),
        bytes: format!("%PDF-1.4 {name}").into_bytes(),
    }]
}

#[tokio::test]
async fn renewal_upload_prefills_and_commits_the_rolled_window() {
    let sink = Arc::new(MemorySink::default());
    let response = ExtractionResponse {
        classification: Some(Classification {
            category: "Policy".into(),
            subcategory: Some("Renewal".into()),
        }),
        extracted_fields: json!({
            "Policy Number": "POL999",
            "Premium Amount": "£1,200",
            "Policy Start Date": "01/06/2026",
            "Customer Name": "R. Holder"
        })
        .as_object()
        .cloned()
        .unwrap(),
        ..Default::default()
    };

    let outcome = pipeline(sink.clone(), response)
        .run(one_pdf("renewal_schedule.pdf"))
        .await
        .unwrap();
    assert_eq!(outcome.decision.kind, TransactionKind::Renewal);
    assert_eq!(outcome.decision.reference.as_deref(), Some("POL999"));
    // The renewal window is computed, so the extracted start date and the
    // policy number must never reach the form.
    assert!(!outcome.decision.prefill.contains_key(keys::POL_EFF_DATE));
    assert!(!outcome.decision.prefill.contains_key(keys::POLICY_NO));

    // What the endpoint does with the decision: fetch the referenced
    // policy, attach it, lay the extracted fields on top.
    let today = NaiveDate::from_ymd_opt(2026, 5, 20).unwrap();
    let mut session = WorkflowSession::start(outcome.decision.kind);
    session
        .attach_snapshot(stored_policy().to_field_map(), today)
        .unwrap();
    session.overlay_prefill(&outcome.decision.prefill).unwrap();

    assert_eq!(session.prefill[keys::PREMIUM], json!("1200"));
    assert_eq!(session.prefill[keys::CUSTOMER_NAME], json!("R. Holder"));
    assert_eq!(session.prefill[keys::POL_EFF_DATE], json!("2026-06-01"));
    assert_eq!(session.prefill[keys::POL_EXPIRY_DATE], json!("2027-06-01"));
    assert_eq!(session.prefill[keys::POL_ISSUE_DATE], json!("2026-05-20"));

    // Submitting the form as presented commits the rolled window and the
    // document's premium in one write.
    let form = session.prefill.clone();
    let now = Utc.with_ymd_and_hms(2026, 5, 20, 9, 0, 0).unwrap();
    let outcome = session.submit(&form, SubmitOptions::default(), now).unwrap();
    let SubmitOutcome::Ready(commit) = outcome else {
        panic!("a renewal commits without a confirmation stop");
    };
    assert_eq!(commit.reference.as_deref(), Some("POL999"));
    assert_eq!(commit.fields[keys::PREMIUM], json!("1200"));
    assert_eq!(commit.fields[keys::POL_EFF_DATE], json!("2026-06-01"));
    assert_eq!(commit.fields[keys::POL_EXPIRY_DATE], json!("2027-06-01"));
    assert_eq!(commit.fields[keys::POL_ISSUE_DATE], json!("2026-05-20"));
    let changed: Vec<&str> = commit.changes.iter().map(|c| c.field.as_str()).collect();
    assert!(changed.contains(&keys::PREMIUM));
    assert!(changed.contains(&keys::POL_EXPIRY_DATE));

    let finals = sink.finals.lock().await;
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].reference_number.as_deref(), Some("POL999"));
    assert_eq!(finals[0].status, "Completed");
    assert_eq!(finals[0].transaction_type.as_deref(), Some("Renewal"));
}

#[tokio::test]
async fn claim_form_upload_seeds_a_new_claim_against_the_policy() {
    let sink = Arc::new(MemorySink::default());
    let response = ExtractionResponse {
        classification: Some(Classification {
            category: "Claim".into(),
            subcategory: Some("First Notification".into()),
        }),
        extracted_fields: json!({
            "Policy Number": "POL999",
            "Date of Loss": "02/05/2026",
            "Estimated Loss": "£3,500",
            "Loss Description": "Rear-end collision at low speed"
        })
        .as_object()
        .cloned()
        .unwrap(),
        ..Default::default()
    };

    let outcome = pipeline(sink, response)
        .run(one_pdf("motor_claim_form.pdf"))
        .await
        .unwrap();
    assert_eq!(outcome.decision.kind, TransactionKind::NewClaim);
    // A new claim fetches the policy the document names.
    assert_eq!(outcome.decision.reference.as_deref(), Some("POL999"));
    assert_eq!(outcome.decision.prefill[keys::ACCIDENT_DATE], json!("02/05/2026"));
    assert_eq!(outcome.decision.prefill[keys::CLAIM_AMOUNT], json!("3500"));

    let today = NaiveDate::from_ymd_opt(2026, 5, 4).unwrap();
    let mut session = WorkflowSession::start(outcome.decision.kind);
    session
        .attach_snapshot(stored_policy().to_field_map(), today)
        .unwrap();
    session.overlay_prefill(&outcome.decision.prefill).unwrap();

    let form = session.prefill.clone();
    let now = Utc.with_ymd_and_hms(2026, 5, 4, 14, 30, 0).unwrap();
    let outcome = session.submit(&form, SubmitOptions::default(), now).unwrap();
    let SubmitOutcome::Ready(commit) = outcome else {
        panic!("an accident date was extracted, the claim should be ready");
    };
    assert_eq!(commit.fields[keys::POLICY_NO], json!("POL999"));
    assert_eq!(commit.fields[keys::CLAIM_STATUS], json!("New Claim"));
    assert_eq!(commit.fields[keys::CLAIM_STAGE], json!("Open"));
    assert_eq!(commit.fields[keys::CLAIM_AMOUNT], json!("3500"));
    // Intimation defaults to the day the form was submitted.
    assert_eq!(commit.fields[keys::INTIMATION_DATE], json!("2026-05-04"));
}
