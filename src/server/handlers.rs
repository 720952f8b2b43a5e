// ============================================================================
// Handlers HTTP du backend d'ingestion
// ============================================================================
// GET  /                        → message de présentation
// POST /api/upload-ohlcv        → champ "file"
// POST /api/upload-trades       → champ "file"
// POST /api/process-chart-data  → champs "ohlcv_file" et "trades_file"
// ============================================================================

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::Json;
use tracing::{debug, info, instrument};

use crate::api::wire::{ChartDataResponse, RootResponse, UploadResponse};
use crate::ingest::{list_repr, parse_ohlcv, parse_trades, MissingColumns};
use crate::models::{Trade, OHLC};
use crate::server::error::ApiError;

/// Message renvoyé par GET /
pub const ROOT_MESSAGE: &str = "Charting Solution API";

/// Un fichier reçu dans un formulaire multipart
#[derive(Debug)]
struct UploadedFile {
    file_name: Option<String>,
    bytes: Bytes,
}

impl UploadedFile {
    /// Seuls les fichiers .csv sont acceptés (extension sensible à la casse)
    fn ensure_csv(&self) -> Result<(), ApiError> {
        let is_csv = self
            .file_name
            .as_deref()
            .map(|name| name.ends_with(".csv"))
            .unwrap_or(false);

        if is_csv {
            Ok(())
        } else {
            Err(ApiError::bad_request("File must be a CSV"))
        }
    }
}

/// Message quand la requête dépasse max_upload_bytes
pub const UPLOAD_TOO_LARGE: &str = "Uploaded files exceed the maximum allowed size";

/// Erreur de lecture du corps multipart (413 si la limite de taille est dépassée)
fn multipart_error(err: MultipartError) -> ApiError {
    let status = err.status();
    let detail = if status == StatusCode::PAYLOAD_TOO_LARGE {
        UPLOAD_TOO_LARGE.to_string()
    } else {
        err.body_text()
    };

    ApiError { status, detail }
}

/// Lit tous les champs fichier du formulaire : nom du champ → fichier
async fn read_files(mut multipart: Multipart) -> Result<HashMap<String, UploadedFile>, ApiError> {
    let mut files = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(multipart_error)?;

        debug!(field = %name, file = ?file_name, bytes = bytes.len(), "Received multipart field");
        files.insert(name, UploadedFile { file_name, bytes });
    }

    Ok(files)
}

fn take_field(files: &mut HashMap<String, UploadedFile>, name: &str) -> Result<UploadedFile, ApiError> {
    files.remove(name).ok_or_else(|| ApiError::missing_field(name))
}

/// Erreur d'un upload simple : colonnes manquantes ou contenu illisible
fn single_file_error(err: anyhow::Error) -> ApiError {
    match err.downcast_ref::<MissingColumns>() {
        Some(missing) => ApiError::bad_request(missing.to_string()),
        None => ApiError::bad_request(format!("Error processing file: {:#}", err)),
    }
}

/// Erreur du traitement combiné : le message précise quel fichier est en cause
fn combined_error(kind: &str, err: anyhow::Error) -> ApiError {
    match err.downcast_ref::<MissingColumns>() {
        Some(missing) => ApiError::bad_request(format!(
            "{} CSV must contain columns: {}. Found: {}",
            kind,
            list_repr(missing.required),
            list_repr(&missing.found)
        )),
        None => ApiError::bad_request(format!("Error processing files: {:#}", err)),
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: ROOT_MESSAGE.to_string(),
    })
}

#[instrument(skip_all)]
pub async fn upload_ohlcv(multipart: Multipart) -> Result<Json<UploadResponse<OHLC>>, ApiError> {
    let mut files = read_files(multipart).await?;
    let file = take_field(&mut files, "file")?;
    file.ensure_csv()?;

    let candles = parse_ohlcv(&file.bytes).map_err(single_file_error)?;

    info!(candles = candles.len(), "OHLCV file processed");
    Ok(Json(UploadResponse::new(candles)))
}

#[instrument(skip_all)]
pub async fn upload_trades(multipart: Multipart) -> Result<Json<UploadResponse<Trade>>, ApiError> {
    let mut files = read_files(multipart).await?;
    let file = take_field(&mut files, "file")?;
    file.ensure_csv()?;

    let trades = parse_trades(&file.bytes).map_err(single_file_error)?;

    info!(trades = trades.len(), "Trades file processed");
    Ok(Json(UploadResponse::new(trades)))
}

#[instrument(skip_all)]
pub async fn process_chart_data(multipart: Multipart) -> Result<Json<ChartDataResponse>, ApiError> {
    let mut files = read_files(multipart).await?;
    let ohlcv_file = take_field(&mut files, "ohlcv_file")?;
    let trades_file = take_field(&mut files, "trades_file")?;

    let candles = parse_ohlcv(&ohlcv_file.bytes).map_err(|e| combined_error("OHLCV", e))?;
    let trades = parse_trades(&trades_file.bytes).map_err(|e| combined_error("Trades", e))?;

    info!(candles = candles.len(), trades = trades.len(), "Chart data processed");
    Ok(Json(ChartDataResponse::new(candles, trades)))
}
