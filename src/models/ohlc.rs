// ============================================================================
// Structure : OHLC (Open, High, Low, Close, Volume)
// ============================================================================
// Représente une chandelle japonaise (candlestick) issue du CSV OHLCV
//
// Noms des colonnes (CSV et JSON) : DateTime, Open, High, Low, Close, Volume
// ============================================================================

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Granularité de l'axe X, déduite de l'espacement entre chandelles
///
/// CONCEPT : Pas d'intervalle fourni par le CSV
/// - On mesure l'écart médian entre deux chandelles consécutives
/// - < 1h : minutes, < 1 jour : heures, < 7 jours : jours, sinon semaines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeUnit {
    #[default]
    Minute,
    Hour,
    Day,
    Week,
}

impl TimeUnit {
    /// Déduit l'unité depuis des chandelles triées par timestamp
    ///
    /// Moins de 2 chandelles : Minute (valeur par défaut).
    pub fn infer(candles: &[OHLC]) -> TimeUnit {
        let mut gaps: Vec<i64> = candles
            .windows(2)
            .map(|pair| (pair[1].timestamp - pair[0].timestamp).num_seconds())
            .filter(|gap| *gap > 0)
            .collect();

        if gaps.is_empty() {
            return TimeUnit::default();
        }

        gaps.sort_unstable();
        let median = Duration::seconds(gaps[gaps.len() / 2]);

        if median < Duration::hours(1) {
            TimeUnit::Minute
        } else if median < Duration::days(1) {
            TimeUnit::Hour
        } else if median < Duration::days(7) {
            TimeUnit::Day
        } else {
            TimeUnit::Week
        }
    }

    /// Format des labels principaux de l'axe X
    pub fn label_format(&self) -> &'static str {
        match self {
            TimeUnit::Minute | TimeUnit::Hour => "%H:%M",
            TimeUnit::Day => "%b %d",
            TimeUnit::Week => "%d/%m/%y",
        }
    }

    /// Largeur estimée d'un label (en caractères)
    pub fn label_width(&self) -> usize {
        match self {
            TimeUnit::Minute | TimeUnit::Hour => 5, // "HH:MM"
            TimeUnit::Day => 6,                     // "Jan 01"
            TimeUnit::Week => 8,                    // "01/01/24"
        }
    }

    /// Retourne true si plusieurs chandelles par jour (ligne de dates en plus)
    pub fn is_intraday(&self) -> bool {
        matches!(self, TimeUnit::Minute | TimeUnit::Hour)
    }
}

/// Une chandelle japonaise (candlestick)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OHLC {
    /// Timestamp de la chandelle (UTC)
    #[serde(rename = "DateTime", with = "crate::models::datetime")]
    pub timestamp: DateTime<Utc>,

    /// Prix d'ouverture (Open)
    pub open: f64,

    /// Prix le plus haut (High)
    pub high: f64,

    /// Prix le plus bas (Low)
    pub low: f64,

    /// Prix de clôture (Close)
    pub close: f64,

    /// Volume échangé
    pub volume: u64,
}

impl OHLC {
    /// Constructeur : crée une nouvelle chandelle OHLC
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Vérifie si la chandelle est haussière (close >= open)
    ///
    /// Une chandelle plate (doji) est dessinée en vert.
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }

    /// Haut du corps : max(open, close)
    pub fn body_top(&self) -> f64 {
        self.open.max(self.close)
    }

    /// Bas du corps : min(open, close)
    pub fn body_bottom(&self) -> f64 {
        self.open.min(self.close)
    }
}

/// Prix min (low) et max (high) sur un ensemble de chandelles
///
/// CONCEPT RUST : fold en un seul passage
/// - None si la slice est vide
pub fn price_range(candles: &[OHLC]) -> Option<(f64, f64)> {
    if candles.is_empty() {
        return None;
    }

    Some(candles.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(min, max), c| (min.min(c.low), max.max(c.high)),
    ))
}

// ============================================================================
// Tests unitaires
// ============================================================================
