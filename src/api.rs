//! JSON endpoints over the catalog.
//!
//! The catalog is loaded once and shared read-only by every request.
//! Errors, including unreadable request bodies, come back as
//! `{"error": ...}`.
//!
//! - `GET /api/tariffs` lists the catalog (and the rejected entries)
//! - `POST /api/evaluate` bills one period for one tariff
//! - `POST /api/annual` ranks tariffs over twelve months

use crate::annual::{compare_catalog, AnnualComparison, AnnualParams, MonthlyRecord, MONTHS};
use crate::catalog::Catalog;
use crate::engine::evaluate;
use crate::format::round2;
use crate::models::{BillResult, PeriodReadings};
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub struct AppState {
    pub catalog: Arc<Catalog>,
}

/// Errors returned by the handlers as `{"error": ...}` bodies.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("tariff not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        let body = Json(serde_json::json!({"error": self.to_string()}));
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct TariffSummary {
    pub id: String,
    pub name: String,
    pub notes: Option<String>,
    pub energy: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RejectedSummary {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct TariffListing {
    pub tariffs: Vec<TariffSummary>,
    pub rejected: Vec<RejectedSummary>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub tariff_id: String,
    #[serde(default)]
    pub readings: PeriodReadings,
}

/// Totals rounded to cents, for display.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct BillSummary {
    pub taxable_subtotal: f64,
    pub non_taxable_subtotal: f64,
    pub vat_amount: f64,
    pub total: f64,
}

impl From<&BillResult> for BillSummary {
    fn from(bill: &BillResult) -> Self {
        Self {
            taxable_subtotal: round2(bill.taxable_subtotal),
            non_taxable_subtotal: round2(bill.non_taxable_subtotal),
            vat_amount: round2(bill.vat_amount),
            total: round2(bill.total),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub tariff_id: String,
    pub bill: BillResult,
    pub summary: BillSummary,
}

#[derive(Debug, Deserialize)]
pub struct AnnualRequest {
    /// Tariffs to compare; every catalog tariff when empty.
    #[serde(default)]
    pub tariff_ids: Vec<String>,
    pub months: Vec<MonthlyRecord>,
    #[serde(default)]
    pub params: AnnualParams,
    pub baseline_id: String,
}

/// Build the API router over an already loaded catalog.
pub fn router(catalog: Arc<Catalog>) -> Router {
    let state = Arc::new(AppState { catalog });
    Router::new()
        .route("/api/tariffs", get(list_handler))
        .route("/api/evaluate", post(evaluate_handler))
        .route("/api/annual", post(annual_handler))
        .with_state(state)
}

/// Load the catalog from `catalog_path` and build the router.  Returns
/// the router and a handle to the catalog.
pub fn build_router(catalog_path: &Path) -> Result<(Router, Arc<Catalog>)> {
    let catalog = Catalog::load(catalog_path)
        .with_context(|| format!("loading tariff catalog from {}", catalog_path.display()))?;
    let catalog = Arc::new(catalog);
    Ok((router(catalog.clone()), catalog))
}

async fn list_handler(State(state): State<Arc<AppState>>) -> Json<TariffListing> {
    let catalog = &state.catalog;
    Json(TariffListing {
        tariffs: catalog
            .tariffs()
            .iter()
            .map(|t| TariffSummary {
                id: t.id.clone(),
                name: t.name.clone(),
                notes: t.notes.clone(),
                energy: t.energy.kind(),
            })
            .collect(),
        rejected: catalog
            .rejected()
            .iter()
            .map(|err| RejectedSummary {
                id: err.tariff().to_string(),
                reason: err.to_string(),
            })
            .collect(),
    })
}

async fn evaluate_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    let Json(request) = payload?;
    let tariff = state
        .catalog
        .get(&request.tariff_id)
        .ok_or_else(|| ApiError::NotFound(request.tariff_id.clone()))?;
    let bill = evaluate(tariff, &request.readings);
    info!(tariff = %tariff.id, total = bill.total, "bill evaluated");
    Ok(Json(EvaluateResponse {
        tariff_id: tariff.id.clone(),
        summary: BillSummary::from(&bill),
        bill,
    }))
}

async fn annual_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnnualRequest>, JsonRejection>,
) -> Result<Json<AnnualComparison>, ApiError> {
    let Json(request) = payload?;
    let count = request.months.len();
    let months: [MonthlyRecord; MONTHS] = request
        .months
        .try_into()
        .map_err(|_| ApiError::BadRequest(format!("expected {MONTHS} months, got {count}")))?;

    let ids: Vec<String> = if request.tariff_ids.is_empty() {
        state.catalog.tariffs().iter().map(|t| t.id.clone()).collect()
    } else {
        request.tariff_ids
    };
    if ids.is_empty() {
        return Err(ApiError::BadRequest("no tariff selected".into()));
    }

    let comparison = compare_catalog(
        &state.catalog,
        &ids,
        &months,
        &request.params,
        &request.baseline_id,
    );
    if !comparison.excluded.is_empty() {
        warn!(excluded = comparison.excluded.len(), "tariffs excluded from comparison");
    }
    info!(ranked = comparison.ranking.len(), "annual comparison computed");
    Ok(Json(comparison))
}

/// Load the catalog at `catalog_path` and serve it on `addr`.
pub async fn serve(addr: &str, catalog_path: &Path) -> Result<()> {
    let (router, catalog) = build_router(catalog_path)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, tariffs = catalog.tariffs().len(), "server listening");
    axum::serve(listener, router).await?;
    Ok(())
}
