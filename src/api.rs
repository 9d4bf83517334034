//! HTTP API for the Salary Engine.
//!
//! This module exposes the calculators as a small JSON API using the
//! [`axum`](https://crates.io/crates/axum) framework.  Each endpoint
//! validates its input record, then hands it to the matching pure
//! function.  Contract violations become `400 Bad Request`; malformed
//! JSON is rejected by axum before reaching a handler.

use crate::annual::{calculate_annual_compensation, AnnualCompensation};
use crate::config::ServerConfig;
use crate::engine::{calculate_gross_from_net, calculate_net_batch, calculate_net_from_gross};
use crate::enhanced::{calculate_enhanced_annual_compensation, EnhancedAnnualCompensation};
use crate::error::InputError;
use crate::growth::{calculate_salary_growth, SalaryGrowthInput, SalaryGrowthProjection};
use crate::insurance::{calculate_employer_cost, calculate_insurance, EmployerCost};
use crate::models::{
    BonusInput, DeductionBreakdown, EnhancedBonusInput, GrossFromNetResult, InsuranceBreakdown,
    Region, SalaryInput, SalaryResult, TaxBreakdown,
};
use crate::regime::{load_regimes_from_dir, TaxRegimes};
use crate::tax::{calculate_deductions, calculate_tax};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Application state shared across requests.  Regimes are immutable
/// once the server starts, so no lock is needed.
pub struct AppState {
    pub regimes: TaxRegimes,
}

/// A rejected request: the status to answer with and a message for
/// the `error` field of the JSON body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<InputError> for ApiError {
    fn from(err: InputError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        debug!(status = %self.status, message = %self.message, "rejecting request");
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct InsuranceRequest {
    pub gross_salary: i64,
    pub region: Region,
    #[serde(default)]
    pub year: Option<u16>,
}

/// Employee contributions plus what the employer pays on top.
#[derive(Debug, Serialize, Deserialize)]
pub struct InsuranceResponse {
    pub employee: InsuranceBreakdown,
    pub employer: EmployerCost,
}

#[derive(Debug, Deserialize)]
pub struct TaxRequest {
    pub taxable_income: i64,
    #[serde(default)]
    pub dependents: u32,
    #[serde(default)]
    pub year: Option<u16>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaxResponse {
    pub tax: TaxBreakdown,
    pub deductions: DeductionBreakdown,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub inputs: Vec<SalaryInput>,
}

#[derive(Debug, Deserialize)]
pub struct AnnualRequest {
    pub monthly: SalaryInput,
    #[serde(default)]
    pub bonuses: BonusInput,
}

#[derive(Debug, Deserialize)]
pub struct EnhancedAnnualRequest {
    pub monthly: SalaryInput,
    #[serde(default)]
    pub bonuses: EnhancedBonusInput,
}

/// Builds the built-in regimes and applies any overrides found in
/// `regime_dir`.
pub fn load_regimes(regime_dir: Option<&Path>) -> Result<TaxRegimes> {
    let mut regimes = TaxRegimes::builtin();
    if let Some(dir) = regime_dir {
        for regime in load_regimes_from_dir(dir)? {
            let year = regime.effective_from;
            let replaced = regimes
                .insert(regime)
                .with_context(|| format!("invalid regime in {}", dir.display()))?;
            info!(year, replaced = replaced.is_some(), "loaded tax regime");
        }
    }
    Ok(regimes)
}

/// Build the API router around the given regimes.
pub fn build_router(regimes: TaxRegimes) -> Router {
    let state = Arc::new(AppState { regimes });
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/insurance", post(insurance_handler))
        .route("/api/tax", post(tax_handler))
        .route("/api/net", post(net_handler))
        .route("/api/net/batch", post(net_batch_handler))
        .route("/api/gross", post(gross_handler))
        .route("/api/annual", post(annual_handler))
        .route("/api/annual/enhanced", post(enhanced_handler))
        .route("/api/growth", post(growth_handler))
        .with_state(state)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn insurance_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InsuranceRequest>,
) -> ApiResult<InsuranceResponse> {
    if request.gross_salary < 0 {
        return Err(InputError::NegativeSalary(request.gross_salary).into());
    }
    let regime = state.regimes.for_year(request.year);
    Ok(Json(InsuranceResponse {
        employee: calculate_insurance(regime, request.gross_salary, request.region),
        employer: calculate_employer_cost(regime, request.gross_salary, request.region),
    }))
}

async fn tax_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TaxRequest>,
) -> Json<TaxResponse> {
    let regime = state.regimes.for_year(request.year);
    Json(TaxResponse {
        tax: calculate_tax(regime, request.taxable_income),
        deductions: calculate_deductions(regime, request.dependents),
    })
}

async fn net_handler(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SalaryInput>,
) -> ApiResult<SalaryResult> {
    input.validate()?;
    Ok(Json(calculate_net_from_gross(&state.regimes, &input)))
}

async fn net_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> ApiResult<Vec<SalaryResult>> {
    for input in &request.inputs {
        input.validate()?;
    }
    Ok(Json(calculate_net_batch(&state.regimes, &request.inputs)))
}

async fn gross_handler(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SalaryInput>,
) -> ApiResult<GrossFromNetResult> {
    input.validate()?;
    Ok(Json(calculate_gross_from_net(&state.regimes, &input)))
}

async fn annual_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnnualRequest>,
) -> ApiResult<AnnualCompensation> {
    request.monthly.validate()?;
    request.bonuses.validate()?;
    Ok(Json(calculate_annual_compensation(
        &state.regimes,
        &request.monthly,
        &request.bonuses,
    )))
}

async fn enhanced_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EnhancedAnnualRequest>,
) -> ApiResult<EnhancedAnnualCompensation> {
    request.monthly.validate()?;
    request.bonuses.validate()?;
    Ok(Json(calculate_enhanced_annual_compensation(
        &state.regimes,
        &request.monthly,
        &request.bonuses,
    )))
}

async fn growth_handler(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SalaryGrowthInput>,
) -> ApiResult<SalaryGrowthProjection> {
    input.validate()?;
    Ok(Json(calculate_salary_growth(&state.regimes, &input)))
}

/// Launch the API server.  Loads the regimes named by `config`, binds
/// to its address and serves until the process is stopped.
pub async fn serve(config: &ServerConfig) -> Result<()> {
    let regimes = load_regimes(config.regime_dir.as_deref())?;
    let router = build_router(regimes);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "server listening");
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regime::TaxRegime;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        build_router(TaxRegimes::builtin())
    }

    async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn net_endpoint_matches_engine() {
        let (status, body) =
            post_json("/api/net", json!({"salary": 20_000_000, "region": "I"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["net"], 17_460_000);
        assert_eq!(body["insurance"]["total"], 2_100_000);
        assert_eq!(body["tax"]["bracket"], 2);
    }

    #[tokio::test]
    async fn negative_salary_is_a_bad_request() {
        let (status, body) = post_json("/api/net", json!({"salary": -1, "region": "I"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "salary must not be negative, got -1");
    }

    #[tokio::test]
    async fn gross_endpoint_reports_convergence() {
        let (status, body) =
            post_json("/api/gross", json!({"salary": 17_460_000, "region": "I"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["converged"], true);
        let gross = body["result"]["gross"].as_i64().unwrap();
        assert!((gross - 20_000_000).abs() <= 1_000);
    }

    #[tokio::test]
    async fn batch_rejects_any_invalid_entry() {
        let (status, _) = post_json(
            "/api/net/batch",
            json!({"inputs": [
                {"salary": 10_000_000, "region": "II"},
                {"salary": 10_000_000, "region": "II", "exemptions": -1}
            ]}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn annual_endpoint_rejects_negative_bonus() {
        let (status, body) = post_json(
            "/api/annual",
            json!({"monthly": {"salary": 10_000_000, "region": "I"}, "bonuses": {"kpi": -5}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "KPI bonus must not be negative, got -5");
    }

    #[tokio::test]
    async fn enhanced_endpoint_returns_twelve_months() {
        let (status, body) = post_json(
            "/api/annual/enhanced",
            json!({
                "monthly": {"salary": 20_000_000, "region": "I"},
                "bonuses": {"thirteenth_month": 20_000_000, "distribution_strategy": "concentrated"}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["months"].as_array().unwrap().len(), 12);
        assert_eq!(body["strategy"], "concentrated");
        assert!(body["reconciliation"]["difference"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn tax_endpoint_uses_requested_year() {
        let (status, body) = post_json(
            "/api/tax",
            json!({"taxable_income": 30_000_000, "dependents": 1, "year": 2026}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tax"]["tax"], 2_500_000);
        assert_eq!(body["deductions"]["total"], 21_700_000);
    }

    #[tokio::test]
    async fn growth_endpoint_validates_horizon() {
        let (status, _) = post_json(
            "/api/growth",
            json!({"current_salary": 10_000_000, "years_of_experience": 2,
                   "annual_raise": 8.0, "target_years": 0, "region": "III"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn insurance_endpoint_reports_both_payers() {
        let (status, body) = post_json(
            "/api/insurance",
            json!({"gross_salary": 20_000_000, "region": "I"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["employee"]["total"], 2_100_000);
        assert_eq!(body["employer"]["insurance"]["accident_fund"], 100_000);
        assert_eq!(body["employer"]["total_cost"], 24_300_000);
    }

    #[test]
    fn overrides_from_directory_replace_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let mut regime = TaxRegime::reform_2026();
        regime.dependent_deduction = 7_000_000;
        std::fs::write(
            dir.path().join("2026.json"),
            serde_json::to_string(&regime).unwrap(),
        )
        .unwrap();
        let regimes = load_regimes(Some(dir.path())).unwrap();
        assert_eq!(regimes.for_year(Some(2026)).dependent_deduction, 7_000_000);
        assert_eq!(regimes.iter().count(), 2);
    }

    #[test]
    fn invalid_override_fails_startup() {
        let dir = tempfile::tempdir().unwrap();
        let mut regime = TaxRegime::legacy();
        regime.brackets.clear();
        std::fs::write(
            dir.path().join("broken.json"),
            serde_json::to_string(&regime).unwrap(),
        )
        .unwrap();
        assert!(load_regimes(Some(dir.path())).is_err());
    }
}
