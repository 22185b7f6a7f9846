use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::aggregator::{AggregateError, Aggregator, CompositeRating};
use crate::alerts::{check_alerts, Alert, AlertThresholds};
use crate::financials::{FinancialRatios, StatementsSource};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub statements: Option<Arc<dyn StatementsSource>>,
    pub thresholds: AlertThresholds,
}

impl AppState {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        Self {
            aggregator,
            statements: None,
            thresholds: AlertThresholds::default(),
        }
    }

    pub fn with_statements(mut self, src: Arc<dyn StatementsSource>) -> Self {
        self.statements = Some(src);
        self
    }

    pub fn with_thresholds(mut self, th: AlertThresholds) -> Self {
        self.thresholds = th;
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/ratings/{ticker}", get(get_rating))
        .route("/analysis/{ticker}", get(get_analysis))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AggregateError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

async fn get_rating(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<CompositeRating>, AggregateError> {
    let rating = state.aggregator.aggregate(&ticker).await?;
    Ok(Json(rating))
}

#[derive(Serialize)]
struct AnalysisResp {
    rating: CompositeRating,
    percent_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ratios: Option<FinancialRatios>,
    alerts: Vec<Alert>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

async fn get_analysis(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<AnalysisResp>, AggregateError> {
    let rating = state.aggregator.aggregate(&ticker).await?;
    let mut warnings = Vec::new();

    let ratios = match &state.statements {
        Some(src) => match src.fetch_statements(&rating.ticker).await {
            Ok(s) => Some(FinancialRatios::from_statements(&s)),
            Err(e) => {
                tracing::warn!(error = ?e, ticker = %rating.ticker, "statements unavailable");
                warnings.push("financial statements unavailable".to_string());
                None
            }
        },
        None => None,
    };

    if rating.final_score.is_none() {
        warnings.push("no analyst rating available".to_string());
    }

    let alerts = check_alerts(
        &rating.ticker,
        rating.final_score,
        ratios.as_ref(),
        &state.thresholds,
    );

    Ok(Json(AnalysisResp {
        percent_score: rating.percent_score(),
        rating,
        ratios,
        alerts,
        warnings,
    }))
}
