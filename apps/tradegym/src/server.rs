use crate::bootstrap::Deps;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tradegym_application::config::Config;
use tradegym_application::simulation::{predict, PredictQuery};
use tradegym_domain::repositories::market_data::MarketDataRepository;
use tradegym_domain::repositories::policy::PolicyFactory;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub market_data: Arc<dyn MarketDataRepository>,
    pub policies: Arc<dyn PolicyFactory>,
    started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, deps: Deps) -> Self {
        Self {
            config: Arc::new(config),
            market_data: deps.market_data,
            policies: deps.policies,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Raw query string; dates are parsed by hand so malformed values get the
/// same JSON error body as every other client error.
#[derive(Debug, Default, Deserialize)]
pub struct PredictParams {
    pub ticker: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub policy: String,
    pub uptime_secs: u64,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/predict", get(predict_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(cors)
}

/// Binds `bind` and serves until Ctrl-C.
pub async fn serve(state: AppState, bind: &str) -> Result<(), String> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| format!("failed to bind {bind}: {err}"))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("failed to read local addr: {err}"))?;
    tracing::info!(%addr, policy = state.policies.name(), "listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| format!("server error: {err}"))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}

fn parse_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, String> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|err| format!("invalid {field} date {value:?} (expected YYYY-MM-DD): {err}")),
    }
}

fn parse_params(params: &PredictParams) -> Result<PredictQuery, String> {
    Ok(PredictQuery {
        ticker: params.ticker.clone(),
        start: parse_date("start", params.start.as_deref())?,
        end: parse_date("end", params.end.as_deref())?,
    })
}

/// GET /predict?ticker=&start=&end=
async fn predict_handler(
    State(state): State<AppState>,
    Query(params): Query<PredictParams>,
) -> Response {
    let start = Instant::now();
    let response = match parse_params(&params) {
        Err(message) => error_response(StatusCode::BAD_REQUEST, message),
        Ok(query) => {
            let worker = state.clone();
            let joined = tokio::task::spawn_blocking(move || {
                predict(
                    &worker.config,
                    &query,
                    worker.market_data.as_ref(),
                    worker.policies.as_ref(),
                )
            })
            .await;
            match joined {
                Ok(Ok(body)) => (StatusCode::OK, Json(body)).into_response(),
                Ok(Err(err)) => {
                    let status = StatusCode::from_u16(err.status_code())
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                    if status.is_server_error() {
                        tracing::error!(error = %err, "prediction failed");
                    } else {
                        tracing::info!(error = %err, "prediction rejected");
                    }
                    error_response(status, err.to_string())
                }
                Err(err) => {
                    tracing::error!(error = %err, "simulation task failed");
                    error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("simulation task failed: {err}"),
                    )
                }
            }
        }
    };

    let status = response.status().as_u16().to_string();
    metrics::counter!("tradegym.http.requests_total", "route" => "predict", "status" => status.clone())
        .increment(1);
    metrics::histogram!("tradegym.http.request_ms", "route" => "predict", "status" => status)
        .record(start.elapsed().as_millis() as f64);
    response
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        policy: state.policies.name().to_string(),
        uptime_secs: state.uptime_seconds(),
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_params, PredictParams};
    use chrono::NaiveDate;

    #[test]
    fn parse_params_accepts_iso_dates_and_blanks() {
        let query = parse_params(&PredictParams {
            ticker: Some("msft".to_string()),
            start: Some("2021-02-03".to_string()),
            end: Some("  ".to_string()),
        })
        .expect("query");
        assert_eq!(query.ticker.as_deref(), Some("msft"));
        assert_eq!(query.start, NaiveDate::from_ymd_opt(2021, 2, 3));
        assert_eq!(query.end, None);
    }

    #[test]
    fn parse_params_rejects_bad_dates() {
        let err = parse_params(&PredictParams {
            start: Some("03/02/2021".to_string()),
            ..PredictParams::default()
        })
        .expect_err("bad date");
        assert!(err.contains("invalid start date"));
    }
}
