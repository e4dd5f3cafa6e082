//! Broker (TOBA) and facility onboarding endpoints.
//!
//! ## Endpoints
//!
//! - `POST /api/onboarding/brokers` - onboard a broker; repeat FCA numbers return the existing record
//! - `GET /api/onboarding/brokers` - brokers with their derived status
//! - `POST /api/onboarding/facilities` - onboard a facility with insurer participation lines
//! - `GET /api/onboarding/facilities` - all facilities
//! - `GET /api/onboarding/facilities/:id` - one facility with its lines

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use ib_portal_types::{BrokerRecord, FacilityRecord, FieldMap, InsurerLine};
use ib_workflow::{
    validate_facility_lines, validate_submission, InsurerShare, SubmitOptions, TransactionKind,
};
use serde::{Deserialize, Serialize};

use crate::api::{ok, ApiResponse, AppState};
use crate::error::PortalError;

#[derive(Deserialize)]
pub struct BrokerOnboardRequest {
    #[serde(default)]
    pub fields: FieldMap,
}

#[derive(Deserialize)]
pub struct FacilityOnboardRequest {
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub insurers: Vec<InsurerShare>,
}

/// Broker row plus its status, derived from onboarding date and
/// longevity at response time.
#[derive(Serialize)]
pub struct BrokerView {
    #[serde(flatten)]
    pub broker: BrokerRecord,
    pub status: &'static str,
}

impl BrokerView {
    fn of(broker: BrokerRecord) -> Self {
        let status = broker.status_as_of(Utc::now().date_naive()).as_str();
        Self { broker, status }
    }
}

#[derive(Serialize)]
pub struct BrokerOnboardResponse {
    pub broker: BrokerView,
    /// False when the FCA number was already on the books.
    pub created: bool,
}

#[derive(Serialize)]
pub struct FacilityDetail {
    pub facility: FacilityRecord,
    pub lines: Vec<InsurerLine>,
}

pub async fn onboard_broker(
    State(state): State<AppState>,
    Json(req): Json<BrokerOnboardRequest>,
) -> Result<Json<ApiResponse<BrokerOnboardResponse>>, PortalError> {
    let prepared = validate_submission(
        TransactionKind::BrokerOnboarding,
        None,
        &req.fields,
        SubmitOptions::default(),
        Utc::now(),
    )?;

    let (record, created) = state
        .brokers
        .onboard(&prepared.fields, Utc::now().date_naive())
        .await?;

    Ok(ok(BrokerOnboardResponse {
        broker: BrokerView::of(record),
        created,
    }))
}

pub async fn list_brokers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<BrokerView>>>, PortalError> {
    let brokers = state.brokers.list().await?;
    Ok(ok(brokers.into_iter().map(BrokerView::of).collect()))
}

pub async fn onboard_facility(
    State(state): State<AppState>,
    Json(req): Json<FacilityOnboardRequest>,
) -> Result<Json<ApiResponse<FacilityDetail>>, PortalError> {
    let prepared = validate_submission(
        TransactionKind::FacilityOnboarding,
        None,
        &req.fields,
        SubmitOptions::default(),
        Utc::now(),
    )?;
    let lines = validate_facility_lines(&req.insurers)?;

    let (facility, lines) = state
        .facilities
        .onboard(&prepared.fields, &lines, Utc::now().date_naive())
        .await?;

    Ok(ok(FacilityDetail { facility, lines }))
}

pub async fn list_facilities(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<FacilityRecord>>>, PortalError> {
    Ok(ok(state.facilities.list().await?))
}

pub async fn facility_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<FacilityDetail>>, PortalError> {
    let facility = state
        .facilities
        .find_by_id(&id)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("facility {id}")))?;
    let lines = state.facilities.lines_for(&id).await?;
    Ok(ok(FacilityDetail { facility, lines }))
}
