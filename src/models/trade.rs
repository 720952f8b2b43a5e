// ============================================================================
// Structure : Trade
// ============================================================================
// Un trade issu du CSV de trades : entrée, sortie, objectifs et raison
//
// Noms des colonnes (CSV et JSON) :
// DateTime, Entry, Exit, TakeProfit, StopLoss, Reason (optionnelle)
// ============================================================================

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sens du trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Long => "Long",
            Direction::Short => "Short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Un trade (entrée en position)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Trade {
    /// Timestamp d'entrée (UTC)
    #[serde(rename = "DateTime", with = "crate::models::datetime")]
    pub timestamp: DateTime<Utc>,

    /// Prix d'entrée
    pub entry: f64,

    /// Prix de sortie
    pub exit: f64,

    /// Objectif de gain
    pub take_profit: f64,

    /// Stop de protection
    pub stop_loss: f64,

    /// Raison de la sortie (ex: "Take Profit")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Trade {
    pub fn new(
        timestamp: DateTime<Utc>,
        entry: f64,
        exit: f64,
        take_profit: f64,
        stop_loss: f64,
        reason: Option<String>,
    ) -> Self {
        Self {
            timestamp,
            entry,
            exit,
            take_profit,
            stop_loss,
            reason,
        }
    }

    /// Long si la sortie est au-dessus de l'entrée, Short sinon
    ///
    /// Un trade plat (exit == entry) est donc Short.
    pub fn direction(&self) -> Direction {
        if self.exit > self.entry {
            Direction::Long
        } else {
            Direction::Short
        }
    }

    /// Texte de sortie : "105" ou "105 (Take Profit)"
    pub fn exit_label(&self) -> String {
        match self.reason.as_deref().map(str::trim) {
            Some(reason) if !reason.is_empty() => format!("{} ({})", self.exit, reason),
            _ => format!("{}", self.exit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn trade(entry: f64, exit: f64, reason: Option<&str>) -> Trade {
        Trade::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap(),
            entry,
            exit,
            110.0,
            95.0,
            reason.map(str::to_string),
        )
    }

    #[test]
    fn test_direction() {
        assert_eq!(trade(100.0, 105.0, None).direction(), Direction::Long);
        assert_eq!(trade(100.0, 95.0, None).direction(), Direction::Short);
        // Trade plat : Short
        assert_eq!(trade(100.0, 100.0, None).direction(), Direction::Short);
    }

    #[test]
    fn test_exit_label() {
        assert_eq!(trade(100.0, 105.0, Some("Take Profit")).exit_label(), "105 (Take Profit)");
        assert_eq!(trade(100.0, 105.5, None).exit_label(), "105.5");
        assert_eq!(trade(100.0, 105.0, Some("  ")).exit_label(), "105");
    }

    #[test]
    fn test_trade_json_without_reason() {
        let json = serde_json::json!({
            "DateTime": "2024-01-01 09:30:00",
            "Entry": 100.0,
            "Exit": 105.0,
            "TakeProfit": 110.0,
            "StopLoss": 95.0
        });
        let parsed: Trade = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, trade(100.0, 105.0, None));

        let out = serde_json::to_value(&parsed).unwrap();
        assert!(out.get("Reason").is_none());
        assert_eq!(out["TakeProfit"], 110.0);
    }
}
