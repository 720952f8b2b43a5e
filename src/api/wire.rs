// ============================================================================
// Format JSON échangé entre le backend et le viewer
// ============================================================================
// Partagé par le serveur (Serialize) et le client (Deserialize) : un seul
// endroit décrit le contrat HTTP.
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::models::{Trade, OHLC};

/// Réponse de GET /
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

/// Réponse des routes d'upload d'un seul fichier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub count: usize,
}

impl<T> UploadResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

/// Réponse de POST /api/process-chart-data
///
/// `success: false` sans autre champ est toléré côté client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartDataResponse {
    pub success: bool,
    #[serde(default)]
    pub ohlcv: Vec<OHLC>,
    #[serde(default)]
    pub trades: Vec<Trade>,
    #[serde(default)]
    pub ohlcv_count: usize,
    #[serde(default)]
    pub trades_count: usize,
}

impl ChartDataResponse {
    pub fn new(ohlcv: Vec<OHLC>, trades: Vec<Trade>) -> Self {
        Self {
            success: true,
            ohlcv_count: ohlcv.len(),
            trades_count: trades.len(),
            ohlcv,
            trades,
        }
    }
}

/// Corps des réponses d'erreur : {"detail": "..."}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
