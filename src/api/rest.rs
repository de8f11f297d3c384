// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Two endpoints under `/api/v1/`:
//
//   GET /api/v1/health     — liveness, no upstream traffic.
//   GET /api/v1/technical  — fetch history and compute the indicator bundle
//                            for each requested symbol. `?symbols=A,B` selects
//                            symbols explicitly; omitting it evaluates the
//                            configured watchlist. Batch and single-symbol
//                            requests are the same code path: a list of
//                            length N.
//
// Error mapping: an invalid candle series from the provider is a client-facing
// 422; an unreachable or failing provider is a 502. Indicators that merely
// lack warm-up data are not errors — they come back as empty arrays.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::bundle;
use crate::indicators::{IndicatorError, KeyLevel};
use crate::state::GatewayState;
use crate::upstream;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/technical", get(technical))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Technical bundle
// =============================================================================

#[derive(Deserialize)]
struct TechnicalQuery {
    #[serde(default)]
    symbols: Option<String>,
    #[serde(default)]
    resolution: Option<String>,
}

/// JSON response shape: every field is a per-symbol map so batch responses
/// merge naturally on the client side.
#[derive(Debug, Default, Serialize)]
struct TechnicalResponse {
    rsi: HashMap<String, Vec<f64>>,
    macd: HashMap<String, Vec<f64>>,
    #[serde(rename = "signalLine")]
    signal_line: HashMap<String, Vec<f64>>,
    histogram: HashMap<String, Vec<f64>>,
    ema20: HashMap<String, Vec<f64>>,
    ema50: HashMap<String, Vec<f64>>,
    ema200: HashMap<String, Vec<f64>>,
    #[serde(rename = "keyLevels")]
    key_levels: HashMap<String, Vec<KeyLevel>>,
}

/// Error payload returned for failed requests.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

/// Map a per-symbol evaluation failure onto an HTTP status: a series the
/// engine rejects is the client's problem (bad symbol/window), a transport or
/// provider failure is a gateway problem.
fn map_error(symbol: &str, err: &anyhow::Error) -> ApiError {
    match err.downcast_ref::<IndicatorError>() {
        Some(IndicatorError::InvalidInput(_)) => ApiError {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: format!("invalid price history for {symbol}: {err}"),
        },
        _ => ApiError {
            status: StatusCode::BAD_GATEWAY,
            message: format!("upstream fetch failed for {symbol}: {err}"),
        },
    }
}

async fn technical(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<TechnicalQuery>,
) -> Result<Json<TechnicalResponse>, ApiError> {
    let (watchlist, resolution, key_level_params) = {
        let config = state.config.read();
        (
            config.symbols.clone(),
            config.resolution.clone(),
            config.key_levels.clone(),
        )
    };

    let symbols = resolve_symbols(query.symbols.as_deref(), watchlist);
    let resolution = query.resolution.unwrap_or(resolution);
    let (from, to) = upstream::default_window();

    info!(symbols = ?symbols, resolution = %resolution, "technical bundle requested");

    // One independent task per symbol; the engine itself is a pure function,
    // so no coordination is needed beyond joining the results.
    let mut tasks = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let st = state.clone();
        let res = resolution.clone();
        let params = key_level_params.clone();
        let sym = symbol.clone();
        let handle = tokio::spawn(async move {
            let series = st.history.fetch_history(&sym, &res, from, to).await?;
            Ok::<_, anyhow::Error>(bundle::assemble(&sym, &series, &params))
        });
        tasks.push((symbol, handle));
    }

    let mut response = TechnicalResponse::default();
    for (symbol, handle) in tasks {
        let bundle = match handle.await {
            Ok(Ok(bundle)) => bundle,
            Ok(Err(e)) => {
                error!(symbol = %symbol, error = %e, "symbol evaluation failed");
                return Err(map_error(&symbol, &e));
            }
            Err(e) => {
                error!(symbol = %symbol, error = %e, "symbol evaluation task panicked");
                return Err(ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: format!("evaluation task failed for {symbol}"),
                });
            }
        };

        response.rsi.insert(symbol.clone(), bundle.rsi);
        response.macd.insert(symbol.clone(), bundle.macd);
        response.signal_line.insert(symbol.clone(), bundle.signal_line);
        response.histogram.insert(symbol.clone(), bundle.histogram);
        response.ema20.insert(symbol.clone(), bundle.ema20);
        response.ema50.insert(symbol.clone(), bundle.ema50);
        response.ema200.insert(symbol.clone(), bundle.ema200);
        response.key_levels.insert(symbol, bundle.key_levels);
    }

    Ok(Json(response))
}

/// Split the `symbols` query parameter, falling back to the watchlist when it
/// is absent or empty.
fn resolve_symbols(param: Option<&str>, watchlist: Vec<String>) -> Vec<String> {
    let requested: Vec<String> = param
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();

    if requested.is_empty() {
        watchlist
    } else {
        requested
    }
}

// =============================================================================
// Tests
// =============================================================================
