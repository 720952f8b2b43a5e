// ============================================================================
// Parsing des fichiers CSV (OHLCV et trades)
// ============================================================================
// Lit le contenu brut d'un CSV, vérifie les colonnes requises, convertit
// chaque ligne et trie par DateTime.
//
// RÈGLES :
// - Les noms de colonnes sont "trimés", les colonnes en trop sont ignorées
// - Les colonnes requises sont vérifiées AVANT de lire la moindre ligne
// - Reason est optionnelle (colonne absente ou cellule vide → None)
// - Les erreurs donnent le numéro de ligne (1 = première ligne de données)
// ============================================================================

use std::collections::HashMap;
use std::fmt;

use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, instrument};

use crate::models::datetime::parse_datetime;
use crate::models::{Trade, OHLC};

/// Colonnes requises du CSV OHLCV
pub const OHLCV_COLUMNS: &[&str] = &["DateTime", "Open", "High", "Low", "Close", "Volume"];

/// Colonnes requises du CSV de trades (Reason est optionnelle)
pub const TRADE_COLUMNS: &[&str] = &["DateTime", "Entry", "Exit", "TakeProfit", "StopLoss"];

/// Colonne optionnelle du CSV de trades
const REASON_COLUMN: &str = "Reason";

// ============================================================================
// Erreur : colonnes manquantes
// ============================================================================
// CONCEPT : Erreur typée dans un anyhow::Error
// - Le serveur a besoin de distinguer ce cas pour formater le message
// - anyhow::Error::downcast_ref::<MissingColumns>() la retrouve
// ============================================================================

/// Le CSV ne contient pas toutes les colonnes requises
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingColumns {
    pub required: &'static [&'static str],
    pub found: Vec<String>,
}

impl fmt::Display for MissingColumns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CSV must contain columns: {}", list_repr(self.required))
    }
}

impl std::error::Error for MissingColumns {}

/// Représentation d'une liste façon ['a', 'b']
pub fn list_repr<S: AsRef<str>>(items: &[S]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| format!("'{}'", s.as_ref())).collect();
    format!("[{}]", quoted.join(", "))
}

// ============================================================================
// Accès aux colonnes par nom
// ============================================================================

/// Index des colonnes d'un CSV : nom → position
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    /// Vérifie la présence des colonnes requises
    fn require(headers: &StringRecord, required: &'static [&'static str]) -> Result<Self> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();

        if required.iter().any(|name| !index.contains_key(*name)) {
            let found = headers.iter().map(|h| h.trim().to_string()).collect();
            return Err(MissingColumns { required, found }.into());
        }

        Ok(Self { index })
    }

    /// Cellule brute (None si la colonne est absente de ce fichier)
    fn raw<'r>(&self, record: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.index
            .get(name)
            .and_then(|&i| record.get(i))
            .map(str::trim)
    }

    fn text<'r>(&self, record: &'r StringRecord, name: &str) -> &'r str {
        self.raw(record, name).unwrap_or("")
    }

    fn datetime(&self, record: &StringRecord, row: usize) -> Result<chrono::DateTime<chrono::Utc>> {
        let raw = self.text(record, "DateTime");
        parse_datetime(raw).ok_or_else(|| anyhow!("row {}: invalid DateTime '{}'", row, raw))
    }

    fn number(&self, record: &StringRecord, name: &str, row: usize) -> Result<f64> {
        let raw = self.text(record, name);
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| anyhow!("row {}: invalid {} value '{}'", row, name, raw))
    }

    /// Volume : entier, ou nombre positif arrondi (ex: "1000.0")
    fn volume(&self, record: &StringRecord, row: usize) -> Result<u64> {
        let raw = self.text(record, "Volume");
        if let Ok(v) = raw.parse::<u64>() {
            return Ok(v);
        }

        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.round() as u64)
            .ok_or_else(|| anyhow!("row {}: invalid Volume value '{}'", row, raw))
    }
}

fn reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(bytes)
}

// ============================================================================
// Fonctions publiques
// ============================================================================

/// Parse un CSV OHLCV : DateTime, Open, High, Low, Close, Volume
#[instrument(skip(bytes), fields(bytes = bytes.len()))]
pub fn parse_ohlcv(bytes: &[u8]) -> Result<Vec<OHLC>> {
    let mut reader = reader(bytes);
    let headers = reader.headers().context("unable to read CSV header")?.clone();
    let columns = Columns::require(&headers, OHLCV_COLUMNS)?;

    let mut candles = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let row = i + 1;
        let record = record.with_context(|| format!("row {}: malformed CSV record", row))?;

        candles.push(OHLC::new(
            columns.datetime(&record, row)?,
            columns.number(&record, "Open", row)?,
            columns.number(&record, "High", row)?,
            columns.number(&record, "Low", row)?,
            columns.number(&record, "Close", row)?,
            columns.volume(&record, row)?,
        ));
    }

    // Tri stable : les doublons gardent l'ordre du fichier
    candles.sort_by_key(|c| c.timestamp);

    debug!(candles = candles.len(), "Parsed OHLCV CSV");
    Ok(candles)
}

/// Parse un CSV de trades : DateTime, Entry, Exit, TakeProfit, StopLoss[, Reason]
#[instrument(skip(bytes), fields(bytes = bytes.len()))]
pub fn parse_trades(bytes: &[u8]) -> Result<Vec<Trade>> {
    let mut reader = reader(bytes);
    let headers = reader.headers().context("unable to read CSV header")?.clone();
    let columns = Columns::require(&headers, TRADE_COLUMNS)?;

    let mut trades = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let row = i + 1;
        let record = record.with_context(|| format!("row {}: malformed CSV record", row))?;

        let reason = columns
            .raw(&record, REASON_COLUMN)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        trades.push(Trade::new(
            columns.datetime(&record, row)?,
            columns.number(&record, "Entry", row)?,
            columns.number(&record, "Exit", row)?,
            columns.number(&record, "TakeProfit", row)?,
            columns.number(&record, "StopLoss", row)?,
            reason,
        ));
    }

    trades.sort_by_key(|t| t.timestamp);

    debug!(trades = trades.len(), "Parsed trades CSV");
    Ok(trades)
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const OHLCV: &str = "DateTime,Open,High,Low,Close,Volume\n\
        2024-01-01 09:31:00,102.0,106.0,101.0,104.0,1100\n\
        2024-01-01 09:30:00,100.0,105.0,95.0,102.0,1000\n";

    const TRADES: &str = "DateTime,Entry,Exit,TakeProfit,StopLoss,Reason\n\
        2024-01-01 09:30:00,100.0,105.0,110.0,95.0,Take Profit\n\
        2024-01-01 09:31:00,104.0,101.0,99.0,106.0,\n";

    #[test]
    fn test_parse_ohlcv_sorts_by_datetime() {
        let candles = parse_ohlcv(OHLCV.as_bytes()).unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(
            candles[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap()
        );
        assert_eq!(candles[0].open, 100.0);
        assert_eq!(candles[1].volume, 1100);
    }

    #[test]
    fn test_parse_ohlcv_missing_columns() {
        let err = parse_ohlcv(b"DateTime,Open,High\n2024-01-01,1,2\n").unwrap_err();
        let missing = err.downcast_ref::<MissingColumns>().unwrap();

        assert_eq!(missing.found, vec!["DateTime", "Open", "High"]);
        assert_eq!(
            missing.to_string(),
            "CSV must contain columns: ['DateTime', 'Open', 'High', 'Low', 'Close', 'Volume']"
        );
    }

    #[test]
    fn test_parse_ohlcv_extra_columns_and_spaces() {
        let csv = " DateTime , Open,High,Low,Close,Volume,Symbol\n\
            2024-01-01T09:30:00, 100 ,105,95,102,1000.4,AAPL\n";
        let candles = parse_ohlcv(csv.as_bytes()).unwrap();

        assert_eq!(candles[0].open, 100.0);
        assert_eq!(candles[0].volume, 1000);
    }

    #[test]
    fn test_parse_ohlcv_invalid_number_reports_row() {
        let csv = "DateTime,Open,High,Low,Close,Volume\n\
            2024-01-01 09:30:00,100,105,95,102,1000\n\
            2024-01-01 09:31:00,abc,105,95,102,1000\n";
        let err = parse_ohlcv(csv.as_bytes()).unwrap_err();

        assert_eq!(err.to_string(), "row 2: invalid Open value 'abc'");
    }

    #[test]
    fn test_parse_ohlcv_invalid_datetime_and_volume() {
        let bad_date = "DateTime,Open,High,Low,Close,Volume\nyesterday,1,1,1,1,1\n";
        assert!(parse_ohlcv(bad_date.as_bytes())
            .unwrap_err()
            .to_string()
            .contains("invalid DateTime 'yesterday'"));

        let bad_volume = "DateTime,Open,High,Low,Close,Volume\n2024-01-01,1,1,1,1,-5\n";
        assert!(parse_ohlcv(bad_volume.as_bytes())
            .unwrap_err()
            .to_string()
            .contains("invalid Volume value '-5'"));
    }

    #[test]
    fn test_parse_empty_file_is_missing_columns() {
        let err = parse_ohlcv(b"").unwrap_err();
        assert!(err.downcast_ref::<MissingColumns>().is_some());
    }

    #[test]
    fn test_parse_header_only() {
        let candles = parse_ohlcv(b"DateTime,Open,High,Low,Close,Volume\n").unwrap();
        assert!(candles.is_empty());
    }

    #[test]
    fn test_parse_trades_with_optional_reason() {
        let trades = parse_trades(TRADES.as_bytes()).unwrap();

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].reason.as_deref(), Some("Take Profit"));
        assert_eq!(trades[1].reason, None);
        assert_eq!(trades[1].take_profit, 99.0);
    }

    #[test]
    fn test_parse_trades_without_reason_column() {
        let csv = "DateTime,Entry,Exit,TakeProfit,StopLoss\n\
            2024-01-01 09:30:00,100,105,110,95\n";
        let trades = parse_trades(csv.as_bytes()).unwrap();
        assert_eq!(trades[0].reason, None);
    }

    #[test]
    fn test_parse_trades_missing_columns() {
        let err = parse_trades(b"DateTime,Entry,Exit\n").unwrap_err();
        let missing = err.downcast_ref::<MissingColumns>().unwrap();
        assert_eq!(missing.required, TRADE_COLUMNS);
    }

    #[test]
    fn test_list_repr() {
        assert_eq!(list_repr(&["a", "b"]), "['a', 'b']");
        assert_eq!(list_repr::<&str>(&[]), "[]");
    }
}
