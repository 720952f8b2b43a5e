// ============================================================================
// Module : ingest
// ============================================================================
// Lecture et validation des CSV (utilisé par le serveur et par le mode
// --offline du viewer)
// ============================================================================

pub mod parser;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::models::ChartData;

pub use parser::{list_repr, parse_ohlcv, parse_trades, MissingColumns, OHLCV_COLUMNS, TRADE_COLUMNS};

/// Charge les deux fichiers depuis le disque, sans passer par le backend
#[instrument]
pub fn load_chart_data(ohlcv_path: &Path, trades_path: &Path) -> Result<ChartData> {
    let ohlcv_bytes = std::fs::read(ohlcv_path)
        .with_context(|| format!("unable to read {}", ohlcv_path.display()))?;
    let trades_bytes = std::fs::read(trades_path)
        .with_context(|| format!("unable to read {}", trades_path.display()))?;

    let candles = parse_ohlcv(&ohlcv_bytes).context("OHLCV file")?;
    let trades = parse_trades(&trades_bytes).context("Trades file")?;

    info!(candles = candles.len(), trades = trades.len(), "Loaded CSV files locally");
    Ok(ChartData::new(candles, trades))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_chart_data_from_files() {
        let mut ohlcv = tempfile::NamedTempFile::new().unwrap();
        writeln!(ohlcv, "DateTime,Open,High,Low,Close,Volume").unwrap();
        writeln!(ohlcv, "2024-01-01 09:30:00,100,105,95,102,1000").unwrap();

        let mut trades = tempfile::NamedTempFile::new().unwrap();
        writeln!(trades, "DateTime,Entry,Exit,TakeProfit,StopLoss,Reason").unwrap();
        writeln!(trades, "2024-01-01 09:30:00,100,105,110,95,Take Profit").unwrap();

        let data = load_chart_data(ohlcv.path(), trades.path()).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.markers().len(), 1);
    }

    #[test]
    fn test_load_chart_data_reports_which_file() {
        let mut ohlcv = tempfile::NamedTempFile::new().unwrap();
        writeln!(ohlcv, "Foo,Bar").unwrap();
        let trades = tempfile::NamedTempFile::new().unwrap();

        let err = load_chart_data(ohlcv.path(), trades.path()).unwrap_err();
        assert_eq!(err.to_string(), "OHLCV file");
        assert!(err.downcast_ref::<MissingColumns>().is_some());
    }

    #[test]
    fn test_load_chart_data_missing_file() {
        let err = load_chart_data(Path::new("/nonexistent.csv"), Path::new("/x.csv")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent.csv"));
    }
}
