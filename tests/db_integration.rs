//! Store integration tests.
//!
//! These need a running PostgreSQL instance named by DATABASE_URL; they
//! create the portal schema on first use and write real rows, so they are
//! ignored by default.
//!
//! Run with:
//!   DATABASE_URL=postgresql://localhost:5432/ib-portal \
//!     cargo test --test db_integration -- --ignored --test-threads=1

use chrono::Utc;
use ib_ingest::MetadataSink;
use ib_portal::database::{
    BrokerService, ClaimService, CommitExecutor, DocumentMetadataService, FacilityService,
    PolicyService, QuotationService, WarehouseService,
};
use ib_portal::PortalError;
use ib_portal_types::{claim_number, keys, ClaimStatus, FieldMap, UploadDocument};
use ib_workflow::{validate_facility_lines, CommitRequest, InsurerShare, TransactionKind};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

const SCHEMA_DDL: &[&str] = &[
    "CREATE SCHEMA IF NOT EXISTS portal",
    "CREATE TABLE IF NOT EXISTS portal.policies (
        policy_no TEXT PRIMARY KEY,
        customer_name TEXT,
        customer_email TEXT,
        customer_phone TEXT,
        address TEXT,
        vehicle_make TEXT,
        vehicle_model TEXT,
        year_of_make TEXT,
        chassis_no TEXT,
        engine_no TEXT,
        reg_no TEXT,
        driver_name TEXT,
        driver_dob DATE,
        license_no TEXT,
        sum_insured NUMERIC(14,2),
        premium NUMERIC(14,2),
        premium2 NUMERIC(14,2),
        pol_eff_date DATE,
        pol_expiry_date DATE,
        pol_issue_date DATE,
        cancellation_date DATE,
        cancellation_reason TEXT,
        transaction_type TEXT,
        broker_id TEXT,
        facility_id TEXT,
        is_cancelled BOOLEAN NOT NULL DEFAULT FALSE,
        is_lapsed BOOLEAN NOT NULL DEFAULT FALSE,
        update_date TIMESTAMPTZ,
        created_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS portal.claims (
        claim_no TEXT PRIMARY KEY,
        policy_no TEXT NOT NULL,
        accident_date DATE,
        intimation_date DATE,
        claim_amount NUMERIC(14,2),
        approved_amount NUMERIC(14,2),
        claim_status TEXT NOT NULL DEFAULT 'New Claim',
        claim_stage TEXT,
        description TEXT,
        remarks TEXT,
        update_date TIMESTAMPTZ,
        created_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS portal.brokers (
        broker_id TEXT PRIMARY KEY,
        broker_name TEXT NOT NULL,
        fca_number TEXT NOT NULL UNIQUE,
        commission_pct NUMERIC(5,2),
        onboarding_date DATE,
        longevity_years INTEGER,
        broker_type TEXT,
        market_access TEXT,
        delegated_authority BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS portal.facilities (
        facility_id TEXT PRIMARY KEY,
        facility_name TEXT NOT NULL,
        onboarding_date DATE,
        created_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS portal.facility_lines (
        line_id UUID PRIMARY KEY,
        facility_id TEXT NOT NULL,
        insurer_name TEXT NOT NULL,
        participation_pct NUMERIC(5,2) NOT NULL,
        is_lead BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS portal.upload_documents (
        doc_id UUID PRIMARY KEY,
        file_name TEXT NOT NULL,
        stored_name TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        blob_url TEXT NOT NULL,
        doc_category TEXT,
        doc_subcategory TEXT,
        transaction_type TEXT,
        extracted_json JSONB,
        reference_number TEXT,
        status TEXT NOT NULL,
        error_detail TEXT,
        created_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS portal.quotations (
        temp_policy_id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        fields JSONB NOT NULL,
        created_at TIMESTAMPTZ,
        updated_at TIMESTAMPTZ
    )",
];

async fn setup_pool() -> sqlx::PgPool {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    for ddl in SCHEMA_DDL {
        sqlx::query(ddl)
            .execute(&pool)
            .await
            .expect("Failed to create portal schema");
    }
    pool
}

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

fn digits(len: usize) -> String {
    let n = Uuid::new_v4().as_u128();
    format!("{n:039}")[..len].to_string()
}

fn map(pairs: &[(&str, serde_json::Value)]) -> FieldMap {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn new_business_fields(policy_no: &str) -> FieldMap {
    map(&[
        (keys::POLICY_NO, json!(policy_no)),
        (keys::CUSTOMER_NAME, json!("A Holder")),
        (keys::VEHICLE_MAKE, json!("Volvo")),
        (keys::PREMIUM, json!("500")),
        (keys::POL_EFF_DATE, json!("2026-01-01")),
        (keys::POL_EXPIRY_DATE, json!("2026-12-31")),
        (keys::POL_ISSUE_DATE, json!("2026-01-01")),
        (keys::BROKER_ID, json!("BIB312044")),
        (keys::FACILITY_ID, json!("FAC001")),
    ])
}

#[tokio::test]
#[ignore = "Requires database"]
async fn new_business_then_mta_roundtrip() {
    let pool = setup_pool().await;
    let policies = PolicyService::new(pool);
    let policy_no = format!("POL{}", suffix());

    let created = policies
        .insert_new_business(&new_business_fields(&policy_no))
        .await
        .unwrap();
    assert_eq!(created, policy_no);

    let stored = policies.find_by_policy_no(&policy_no).await.unwrap().unwrap();
    assert_eq!(stored.premium, Some("500".parse().unwrap()));
    assert_eq!(stored.transaction_type.as_deref(), Some("New Business"));
    assert!(!stored.is_cancelled);

    let edits = map(&[
        (keys::ADDRESS, json!("2 New Road")),
        (keys::PREMIUM, json!("650")),
    ]);
    let applied = policies
        .apply_transaction(&policy_no, TransactionKind::MidTermAdjustment, &edits)
        .await
        .unwrap();
    assert!(applied);

    let after = policies.find_by_policy_no(&policy_no).await.unwrap().unwrap();
    assert_eq!(after.premium, Some("650".parse().unwrap()));
    assert_eq!(after.address.as_deref(), Some("2 New Road"));
    assert_eq!(after.transaction_type.as_deref(), Some("MTA"));
    // Untouched columns survive a partial update.
    assert_eq!(after.customer_name.as_deref(), Some("A Holder"));
}

#[tokio::test]
#[ignore = "Requires database"]
async fn cancellation_sets_flag_and_negative_return_premium() {
    let pool = setup_pool().await;
    let policies = PolicyService::new(pool);
    let policy_no = format!("POL{}", suffix());
    policies
        .insert_new_business(&new_business_fields(&policy_no))
        .await
        .unwrap();

    // What the session delivers after its confirmation stop: the negated
    // return premium and a dated reason.
    let fields = map(&[
        (keys::PREMIUM2, json!("-200")),
        (keys::CANCELLATION_DATE, json!("2026-06-01")),
        (keys::CANCELLATION_REASON, json!("Vehicle sold")),
    ]);
    let applied = policies.apply_cancellation(&policy_no, &fields).await.unwrap();
    assert!(applied);

    let after = policies.find_by_policy_no(&policy_no).await.unwrap().unwrap();
    assert!(after.is_cancelled);
    assert_eq!(after.premium2, Some("-200".parse().unwrap()));
    assert_eq!(after.transaction_type.as_deref(), Some("Cancellation"));
    assert_eq!(after.cancellation_reason.as_deref(), Some("Vehicle sold"));

    // An update against a number nothing holds reports no rows.
    let missing = policies
        .apply_cancellation("POL-NOT-THERE", &fields)
        .await
        .unwrap();
    assert!(!missing);
}

#[tokio::test]
#[ignore = "Requires database"]
async fn lapse_sweep_flags_expired_windows_once() {
    let pool = setup_pool().await;
    let policies = PolicyService::new(pool);

    let expired_no = format!("POL{}", suffix());
    let mut expired = new_business_fields(&expired_no);
    expired.insert(keys::POL_EFF_DATE.into(), json!("2024-01-01"));
    expired.insert(keys::POL_EXPIRY_DATE.into(), json!("2024-12-31"));
    policies.insert_new_business(&expired).await.unwrap();

    let current_no = format!("POL{}", suffix());
    let mut current = new_business_fields(&current_no);
    let today = Utc::now().date_naive();
    current.insert(keys::POL_EFF_DATE.into(), json!(today.format("%Y-%m-%d").to_string()));
    current.insert(
        keys::POL_EXPIRY_DATE.into(),
        json!((today + chrono::Days::new(364)).format("%Y-%m-%d").to_string()),
    );
    policies.insert_new_business(&current).await.unwrap();

    policies.recompute_lapse_flags().await.unwrap();
    let flagged = policies.find_by_policy_no(&expired_no).await.unwrap().unwrap();
    assert!(flagged.is_lapsed);
    let live = policies.find_by_policy_no(&current_no).await.unwrap().unwrap();
    assert!(!live.is_lapsed);

    // A second sweep straight after finds nothing left to change.
    let changed = policies.recompute_lapse_flags().await.unwrap();
    assert_eq!(changed, 0);
}

#[tokio::test]
#[ignore = "Requires database"]
async fn claim_lifecycle_close_then_reopen() {
    let pool = setup_pool().await;
    let policies = PolicyService::new(pool.clone());
    let claims = ClaimService::new(pool);

    let policy_no = format!("POL{}", suffix());
    policies
        .insert_new_business(&new_business_fields(&policy_no))
        .await
        .unwrap();

    let claim_no = claim_number(Utc::now());
    let fields = map(&[
        (keys::POLICY_NO, json!(policy_no.clone())),
        (keys::ACCIDENT_DATE, json!("2026-05-02")),
        (keys::INTIMATION_DATE, json!("2026-05-04")),
        (keys::CLAIM_AMOUNT, json!("3500")),
        (keys::CLAIM_STATUS, json!("New Claim")),
        (keys::CLAIM_STAGE, json!("Open")),
        (keys::DESCRIPTION, json!("Rear-end collision")),
    ]);
    claims.insert_new_claim(&claim_no, &fields).await.unwrap();

    let stored = claims.find_by_claim_no(&claim_no).await.unwrap().unwrap();
    assert_eq!(stored.policy_no, policy_no);
    assert_eq!(stored.status().unwrap(), ClaimStatus::New);
    assert_eq!(stored.claim_amount, Some("3500".parse().unwrap()));

    let close = map(&[
        (keys::CLAIM_STATUS, json!("Closed")),
        (keys::CLAIM_STAGE, json!("Closed")),
        (keys::REMARKS, json!("Settled in full.")),
    ]);
    assert!(claims.apply_claim(&claim_no, &close).await.unwrap());
    let closed = claims.find_by_claim_no(&claim_no).await.unwrap().unwrap();
    assert!(closed.status().unwrap().is_closed());

    let reopen = map(&[
        (keys::CLAIM_STATUS, json!("Under Review")),
        (keys::CLAIM_STAGE, json!("Reopened")),
        (keys::REMARKS, json!("Settled in full.\n[2026-06-10 09:00 UTC] Reopened: fresh evidence")),
    ]);
    assert!(claims.apply_claim(&claim_no, &reopen).await.unwrap());
    let reopened = claims.find_by_claim_no(&claim_no).await.unwrap().unwrap();
    assert_eq!(reopened.status().unwrap(), ClaimStatus::UnderReview);
    assert!(reopened.remarks.unwrap().contains("Reopened: fresh evidence"));

    let listed = claims.claims_for_policy(&policy_no).await.unwrap();
    assert!(listed.iter().any(|c| c.claim_no == claim_no));
}

#[tokio::test]
#[ignore = "Requires database"]
async fn commit_executor_refuses_duplicate_policy_numbers() {
    let pool = setup_pool().await;
    let executor = CommitExecutor::new(PolicyService::new(pool.clone()), ClaimService::new(pool));
    let policy_no = format!("POL{}", suffix());

    let request = CommitRequest {
        session_id: Uuid::new_v4(),
        kind: TransactionKind::NewBusiness,
        reference: None,
        fields: new_business_fields(&policy_no),
        changes: Vec::new(),
    };
    let receipt = executor.apply(&request).await.unwrap();
    assert_eq!(receipt.reference, policy_no);

    let err = executor.apply(&request).await.unwrap_err();
    assert!(matches!(err, PortalError::Validation(_)));
    assert!(err.to_string().contains("already exists"));
}

#[tokio::test]
#[ignore = "Requires database"]
async fn broker_onboarding_is_idempotent_on_fca_number() {
    let pool = setup_pool().await;
    let brokers = BrokerService::new(pool);
    let fca = digits(6);
    let today = Utc::now().date_naive();

    let fields = map(&[
        (keys::BROKER_NAME, json!("Bishopsgate Insurance Brokers")),
        (keys::FCA_NUMBER, json!(fca.clone())),
        (keys::COMMISSION_PCT, json!("12.5")),
        (keys::LONGEVITY_YEARS, json!("3")),
        (keys::DELEGATED_AUTHORITY, json!("yes")),
    ]);

    let (first, created) = brokers.onboard(&fields, today).await.unwrap();
    assert!(created);
    assert_eq!(first.broker_id, format!("BIB{fca}"));
    assert!(first.delegated_authority);
    assert_eq!(first.commission_pct, Some("12.5".parse().unwrap()));

    // The same TOBA arriving twice resolves to the existing record.
    let (second, created) = brokers.onboard(&fields, today).await.unwrap();
    assert!(!created);
    assert_eq!(second.broker_id, first.broker_id);

    let found = brokers.find_by_fca(&fca).await.unwrap().unwrap();
    assert_eq!(found.broker_name, "Bishopsgate Insurance Brokers");
}

#[tokio::test]
#[ignore = "Requires database"]
async fn facility_onboarding_writes_lines_atomically() {
    let pool = setup_pool().await;
    let facilities = FacilityService::new(pool);
    let today = Utc::now().date_naive();

    let shares = vec![
        InsurerShare {
            insurer_name: "Alpha Re".into(),
            participation_pct: "60".parse().unwrap(),
        },
        InsurerShare {
            insurer_name: "Beta Syndicate".into(),
            participation_pct: "40".parse().unwrap(),
        },
    ];
    let lines = validate_facility_lines(&shares).unwrap();

    let fields = map(&[(keys::FACILITY_NAME, json!("Motor Binder"))]);
    let (facility, inserted) = facilities.onboard(&fields, &lines, today).await.unwrap();
    assert!(facility.facility_id.starts_with("FAC"));
    assert_eq!(inserted.len(), 2);

    let stored = facilities.lines_for(&facility.facility_id).await.unwrap();
    assert_eq!(stored.len(), 2);
    // Largest share first, and it carries the lead flag.
    assert_eq!(stored[0].insurer_name, "Alpha Re");
    assert!(stored[0].is_lead);
    assert!(!stored[1].is_lead);

    // The id sequence moved past the one just issued.
    let next = facilities.next_facility_id().await.unwrap();
    assert_ne!(next, facility.facility_id);
}

#[tokio::test]
#[ignore = "Requires database"]
async fn quotation_drafts_freeze_after_conversion() {
    let pool = setup_pool().await;
    let quotes = QuotationService::new(pool);

    let draft = quotes
        .save_draft(&map(&[
            (keys::CUSTOMER_NAME, json!("A Holder")),
            (keys::PREMIUM, json!("500")),
        ]))
        .await
        .unwrap();
    assert!(draft.temp_policy_id.starts_with("TMP"));

    let updated = quotes
        .update_draft(
            &draft.temp_policy_id,
            &map(&[(keys::PREMIUM, json!("550"))]),
        )
        .await
        .unwrap();
    assert!(updated);

    assert!(quotes.mark_converted(&draft.temp_policy_id).await.unwrap());
    let frozen = quotes
        .update_draft(
            &draft.temp_policy_id,
            &map(&[(keys::PREMIUM, json!("600"))]),
        )
        .await
        .unwrap();
    assert!(!frozen);

    let stored = quotes.find(&draft.temp_policy_id).await.unwrap().unwrap();
    assert_eq!(stored.status, "Converted");
}

#[tokio::test]
#[ignore = "Requires database"]
async fn document_metadata_rows_roundtrip_through_the_sink() {
    let pool = setup_pool().await;
    let documents = DocumentMetadataService::new(pool);
    let reference = format!("POL{}", suffix());

    let mut doc = UploadDocument {
        doc_id: Uuid::new_v4(),
        file_name: "schedule.pdf".into(),
        stored_name: "schedule_abc123_20260522.pdf".into(),
        content_hash: digits(16),
        blob_url: "uploads/2026/05/schedule_abc123_20260522.pdf".into(),
        doc_category: None,
        doc_subcategory: None,
        transaction_type: None,
        extracted_json: None,
        reference_number: None,
        status: "Processing".into(),
        error_detail: None,
        created_at: Some(Utc::now()),
    };
    documents.record(&doc).await.unwrap();

    doc.doc_category = Some("Policy".into());
    doc.doc_subcategory = Some("Renewal".into());
    doc.transaction_type = Some("Renewal".into());
    doc.extracted_json = Some(json!({"Policy Number": reference.clone()}));
    doc.reference_number = Some(reference.clone());
    doc.status = "Completed".into();
    documents.finalize(&doc).await.unwrap();

    let found = documents.find_by_reference(&reference).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].status, "Completed");
    assert_eq!(found[0].doc_subcategory.as_deref(), Some("Renewal"));
}

#[tokio::test]
#[ignore = "Requires database"]
async fn warehouse_returns_rows_as_json_and_refuses_writes() {
    let pool = setup_pool().await;
    let warehouse = WarehouseService::new(pool, 50);

    let rows = warehouse
        .run_readonly("SELECT policy_no, premium FROM portal.policies ORDER BY policy_no")
        .await
        .unwrap();
    assert!(rows.is_array());

    let err = warehouse
        .run_readonly("DELETE FROM portal.policies")
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Validation(_)));
}
