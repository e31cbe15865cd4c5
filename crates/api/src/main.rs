use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use assetmatch_core::catalog::CatalogSummary;
use assetmatch_core::domain::profile::RawProfile;
use assetmatch_core::domain::recommendation::{RecommendedAsset, ScoredAsset};
use assetmatch_core::{Engine, EngineError, EngineOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = assetmatch_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let engine = match EngineOptions::from_env()
        .and_then(|options| Engine::from_settings(&settings, options))
    {
        Ok(engine) => {
            let missing = engine.undecodable_codes();
            if !missing.is_empty() {
                let err = anyhow::anyhow!(
                    "catalog codes without decoder entries: {missing:?}"
                );
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "reference data out of sync; affected requests will fail");
            }
            Some(Arc::new(engine))
        }
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            let detail = format!("{e:#}");
            tracing::error!(error = %detail, "engine load failed; starting API in degraded mode");
            None
        }
    };

    let app = router(AppState { engine });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/catalog", get(get_catalog_summary))
        .route("/recommend", post(recommend))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    engine: Option<Arc<Engine>>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendParams {
    /// Include similarity scores in the response.
    #[serde(default)]
    scores: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AssetList {
    Plain(Vec<RecommendedAsset>),
    Scored(Vec<ScoredAsset>),
}

#[derive(Debug, Serialize)]
struct RecommendResponse {
    request_id: Uuid,
    generated_at: DateTime<Utc>,
    recommended_assets: AssetList,
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: &'static str,
    detail: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn unavailable() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiError {
            error: "engine_unavailable",
            detail: "recommendation engine is not loaded".to_string(),
        }),
    )
}

fn engine_error_response(err: EngineError) -> (StatusCode, Json<ApiError>) {
    let (status, code) = match &err {
        EngineError::InvalidCategory { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_category"),
        EngineError::InvalidNumber { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_number"),
        EngineError::UnknownIdentifier { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "unknown_identifier")
        }
        EngineError::SchemaMismatch { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "schema_mismatch"),
    };

    if err.is_reference_data_fault() {
        let e = anyhow::Error::new(err.clone());
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(error = %err, "recommendation failed on reference data");
    } else {
        tracing::debug!(error = %err, "rejected profile");
    }

    (
        status,
        Json(ApiError {
            error: code,
            detail: err.to_string(),
        }),
    )
}

async fn recommend(
    State(state): State<AppState>,
    Query(params): Query<RecommendParams>,
    Json(profile): Json<RawProfile>,
) -> ApiResult<RecommendResponse> {
    let Some(engine) = &state.engine else {
        return Err(unavailable());
    };

    let scored = engine
        .recommend_scored(&profile)
        .map_err(engine_error_response)?;

    let recommended_assets = if params.scores {
        AssetList::Scored(scored)
    } else {
        AssetList::Plain(scored.into_iter().map(RecommendedAsset::from).collect())
    };

    Ok(Json(RecommendResponse {
        request_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        recommended_assets,
    }))
}

async fn get_catalog_summary(State(state): State<AppState>) -> ApiResult<CatalogSummary> {
    let Some(engine) = &state.engine else {
        return Err(unavailable());
    };
    Ok(Json(engine.catalog().summary()))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &assetmatch_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
