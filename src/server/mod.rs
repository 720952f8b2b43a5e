// ============================================================================
// Module : server
// ============================================================================
// Backend d'ingestion : reçoit les CSV en multipart, les valide et renvoie
// les données normalisées en JSON.
//
// COUCHES (de l'extérieur vers l'intérieur) :
// - TraceLayer : un span par requête
// - CorsLayer : origines autorisées depuis la configuration
// - DefaultBodyLimit : taille maximale des uploads
// ============================================================================

pub mod error;
pub mod handlers;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;

pub use error::ApiError;
pub use handlers::ROOT_MESSAGE;

/// Construit le routeur complet (utilisé par `serve` et par les tests)
pub fn router(config: &Config) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/upload-ohlcv", post(handlers::upload_ohlcv))
        .route("/api/upload-trades", post(handlers::upload_trades))
        .route("/api/process-chart-data", post(handlers::process_chart_data))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// CORS : "*" autorise toutes les origines (sans credentials)
///
/// Avec une liste explicite, méthodes et headers sont renvoyés en miroir de
/// la requête : tower-http refuse "*" combiné à allow_credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Démarre le serveur sur `config.bind` (bloque jusqu'à l'arrêt)
pub async fn serve(config: &Config) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("unable to bind {}", config.bind))?;

    let addr = listener.local_addr().context("unable to read local address")?;
    info!(addr = %addr, origins = ?config.allowed_origins, "Ingest backend listening");

    axum::serve(listener, router(config))
        .await
        .context("server failed")?;

    Ok(())
}

// ============================================================================
// Tests du routeur
// ============================================================================
// CONCEPT : tower::ServiceExt::oneshot
// - Le routeur est un Service : on lui envoie une requête sans ouvrir de port
// ============================================================================
