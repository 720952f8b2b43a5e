// ============================================================================
// Générateur de données d'exemple
// ============================================================================
// Produit sample_ohlcv.csv et sample_trades.csv pour essayer le viewer sans
// données réelles.
//
// OHLCV : bougies d'une minute à partir du 2024-01-01 09:30:00, marche
// aléatoire autour de 100.
// Trades : bougie d'entrée aléatoire, 50% long / 50% short, raison
// "Take Profit" 2 fois sur 3.
// ============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{info, instrument};

use crate::models::{Trade, OHLC};

pub const OHLCV_FILE: &str = "sample_ohlcv.csv";
pub const TRADES_FILE: &str = "sample_trades.csv";

/// Les trades ne démarrent pas dans les dernières bougies
const TRADE_TAIL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleOptions {
    pub candles: usize,
    pub trades: usize,
    /// Graine du générateur (None = aléatoire)
    pub seed: Option<u64>,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            candles: 400,
            trades: 30,
            seed: None,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Bougies d'une minute en marche aléatoire
pub fn generate_candles<R: Rng>(rng: &mut R, count: usize) -> Vec<OHLC> {
    // Date fixe, toujours valide en UTC
    let start = Utc
        .with_ymd_and_hms(2024, 1, 1, 9, 30, 0)
        .single()
        .unwrap_or_default();
    let mut price = 100.0_f64;
    let mut candles = Vec::with_capacity(count);

    for i in 0..count {
        price += rng.gen_range(-0.5..=0.5);

        let open = price + rng.gen_range(-0.3..=0.3);
        let close = price + rng.gen_range(-0.3..=0.3);
        let high = (price + rng.gen_range(0.1..=0.8)).max(open).max(close);
        let low = (price - rng.gen_range(0.1..=0.8)).min(open).min(close);
        let volume = rng.gen_range(1000..=5000);

        candles.push(OHLC::new(
            start + Duration::minutes(i as i64),
            round2(open),
            round2(high),
            round2(low),
            round2(close),
            volume,
        ));

        // La marche continue depuis la clôture
        price = close;
    }

    candles
}

/// Trades ouverts sur des bougies aléatoires, triés par DateTime
pub fn generate_trades<R: Rng>(rng: &mut R, candles: &[OHLC], count: usize) -> Vec<Trade> {
    if candles.is_empty() {
        return Vec::new();
    }

    let last_entry = candles.len().saturating_sub(TRADE_TAIL + 1);
    let mut trades = Vec::with_capacity(count);

    for _ in 0..count {
        let candle = &candles[rng.gen_range(0..=last_entry)];
        let is_long = rng.gen_bool(0.5);
        // +1 pour un long, -1 pour un short
        let side = if is_long { 1.0 } else { -1.0 };

        let entry = candle.open + rng.gen_range(-0.2..=0.2);
        let exit = entry + side * rng.gen_range(0.5..=3.0);
        let take_profit = entry + side * rng.gen_range(2.0..=5.0);
        let stop_loss = entry - side * rng.gen_range(1.0..=2.5);
        let reason = if rng.gen_range(0..3) < 2 { "Take Profit" } else { "Stop Loss" };

        trades.push(Trade::new(
            candle.timestamp,
            round2(entry),
            round2(exit),
            round2(take_profit),
            round2(stop_loss),
            Some(reason.to_string()),
        ));
    }

    trades.sort_by_key(|t| t.timestamp);
    trades
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("unable to create {}", path.display()))?;

    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("unable to write {}", path.display()))?;
    }

    writer.flush()?;
    Ok(())
}

/// Écrit les deux fichiers dans `dir` et renvoie leurs chemins
#[instrument]
pub fn write_samples(dir: &Path, options: SampleOptions) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir).with_context(|| format!("unable to create {}", dir.display()))?;

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let candles = generate_candles(&mut rng, options.candles);
    let trades = generate_trades(&mut rng, &candles, options.trades);

    let ohlcv_path = dir.join(OHLCV_FILE);
    let trades_path = dir.join(TRADES_FILE);
    write_csv(&ohlcv_path, &candles)?;
    write_csv(&trades_path, &trades)?;

    info!(candles = candles.len(), trades = trades.len(), "Sample files written");
    Ok((ohlcv_path, trades_path))
}

// ============================================================================
// Tests unitaires
// ============================================================================
