// ============================================================================
// Client HTTP : backend d'ingestion
// ============================================================================
// Envoie les deux fichiers CSV au backend (multipart/form-data) et convertit
// la réponse JSON en ChartData.
//
// ERREURS AFFICHÉES À L'UTILISATEUR :
// - Réponse d'erreur avec "detail" → le detail tel quel
// - success == false → "Failed to process data"
// - Backend injoignable → "Failed to upload files. Make sure the backend is running."
// ============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use tracing::{debug, error, info, instrument, warn};

use crate::api::wire::{ChartDataResponse, ErrorResponse, RootResponse};
use crate::models::ChartData;

/// Message quand le backend ne répond pas
pub const BACKEND_UNREACHABLE: &str = "Failed to upload files. Make sure the backend is running.";

/// Message quand le backend répond success: false
pub const PROCESSING_FAILED: &str = "Failed to process data";

/// Client du backend d'ingestion
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
}

impl BackendClient {
    /// Crée un client pour `base_url` (ex: "http://localhost:8000")
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tradechart/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Échec de la création du client HTTP")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Vérifie que le backend répond (GET /)
    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn health(&self) -> Result<String> {
        let response = self
            .http
            .get(self.url("/"))
            .send()
            .await
            .context(BACKEND_UNREACHABLE)?;

        let body: RootResponse = response
            .error_for_status()
            .context("Backend health check failed")?
            .json()
            .await
            .context("Échec du parsing JSON de la réponse du backend")?;

        debug!(message = %body.message, "Backend is up");
        Ok(body.message)
    }

    /// Envoie les deux CSV à /api/process-chart-data
    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn process_chart_data(&self, ohlcv_path: &Path, trades_path: &Path) -> Result<ChartData> {
        let form = Form::new()
            .part("ohlcv_file", csv_part(ohlcv_path).await?)
            .part("trades_file", csv_part(trades_path).await?);

        debug!("Sending CSV files to backend");
        let response = match self
            .http
            .post(self.url("/api/process-chart-data"))
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = ?e, "Backend request failed");
                anyhow::bail!(BACKEND_UNREACHABLE);
            }
        };

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        if !status.is_success() {
            // Le backend renvoie {"detail": "..."} ; sinon message générique
            let detail = response
                .json::<ErrorResponse>()
                .await
                .map(|body| body.detail)
                .unwrap_or_else(|_| BACKEND_UNREACHABLE.to_string());
            warn!(status = %status, detail = %detail, "Backend rejected the files");
            anyhow::bail!(detail);
        }

        let body: ChartDataResponse = response
            .json()
            .await
            .context("Échec du parsing JSON de la réponse du backend")?;

        if !body.success {
            warn!("Backend reported success = false");
            anyhow::bail!(PROCESSING_FAILED);
        }

        info!(
            candles = body.ohlcv.len(),
            trades = body.trades.len(),
            "Chart data received from backend"
        );
        Ok(ChartData::new(body.ohlcv, body.trades))
    }
}

/// Construit une partie multipart text/csv à partir d'un fichier
async fn csv_part(path: &Path) -> Result<Part> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("unable to read {}", path.display()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.csv".to_string());

    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("text/csv")
        .context("invalid MIME type")
}

// ============================================================================
// Tests unitaires
// ============================================================================
// Les tests réseau démarrent le vrai routeur axum sur un port éphémère.
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::io::Write;

    async fn spawn_backend() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = crate::server::router(&Config::default());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn csv_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = BackendClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/api/x"), "http://localhost:8000/api/x");
    }

    #[tokio::test]
    async fn test_health() {
        let url = spawn_backend().await;
        let client = BackendClient::new(&url).unwrap();
        assert_eq!(client.health().await.unwrap(), "Charting Solution API");
    }

    #[tokio::test]
    async fn test_process_chart_data_round_trip() {
        let url = spawn_backend().await;
        let client = BackendClient::new(&url).unwrap();

        let ohlcv = csv_file(
            "DateTime,Open,High,Low,Close,Volume\n\
             2024-01-01 09:31:00,102,106,101,104,1100\n\
             2024-01-01 09:30:00,100,105,95,102,1000\n",
        );
        let trades = csv_file(
            "DateTime,Entry,Exit,TakeProfit,StopLoss,Reason\n\
             2024-01-01 09:31:00,104,101,99,106,Stop Loss\n",
        );

        let data = client.process_chart_data(ohlcv.path(), trades.path()).await.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.trades.len(), 1);
        assert_eq!(data.markers()[0].price, 106.0);
    }

    #[tokio::test]
    async fn test_process_chart_data_shows_backend_detail() {
        let url = spawn_backend().await;
        let client = BackendClient::new(&url).unwrap();

        let ohlcv = csv_file("DateTime,Open\n2024-01-01,1\n");
        let trades = csv_file("DateTime,Entry,Exit,TakeProfit,StopLoss\n");

        let err = client
            .process_chart_data(ohlcv.path(), trades.path())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("OHLCV CSV must contain columns"));
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        // Port 9 (discard) : connexion refusée en local
        let client = BackendClient::new("http://127.0.0.1:9").unwrap();
        let ohlcv = csv_file("DateTime,Open,High,Low,Close,Volume\n");
        let trades = csv_file("DateTime,Entry,Exit,TakeProfit,StopLoss\n");

        let err = client
            .process_chart_data(ohlcv.path(), trades.path())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), BACKEND_UNREACHABLE);
    }
}
