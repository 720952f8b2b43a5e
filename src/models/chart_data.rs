// ============================================================================
// Structure : ChartData
// ============================================================================
// Les deux jeux de données (chandelles + trades) synchronisés par timestamp
//
// ALGORITHME :
// - Chandelles et trades triés par timestamp (tri stable)
// - Index timestamp → position pour retrouver la chandelle d'un trade
// - Chaque trade produit un marqueur :
//   Long  → ancré sur le Low de sa chandelle (dessiné dessous, ▲)
//   Short → ancré sur le High de sa chandelle (dessiné dessus, ▼)
//   Pas de chandelle au même timestamp → ancré sur le prix Entry,
//   placé sur la chandelle la plus proche dans le temps
// ============================================================================

use std::collections::HashMap;

use chrono::{DateTime, Local, Utc};

use crate::models::{price_range, Direction, TimeUnit, Trade, OHLC};

/// Format du titre des tooltips (heure locale)
const TOOLTIP_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Marqueur d'entrée de trade positionné sur le graphique
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeMarker {
    /// Index du trade dans ChartData::trades
    pub trade_index: usize,
    /// Index de la chandelle (colonne) qui porte le marqueur
    pub candle_index: usize,
    /// Prix d'ancrage (Low, High ou Entry)
    pub price: f64,
    /// Sens du trade
    pub direction: Direction,
    /// true si une chandelle partage exactement le timestamp du trade
    pub exact: bool,
}

/// Contenu d'un tooltip : un titre et des lignes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tooltip {
    pub title: String,
    pub lines: Vec<String>,
}

/// Données du graphique, prêtes à être affichées
#[derive(Debug, Clone, Default)]
pub struct ChartData {
    /// Chandelles triées par timestamp croissant
    pub candles: Vec<OHLC>,

    /// Trades triés par timestamp croissant
    pub trades: Vec<Trade>,

    /// Granularité déduite des chandelles
    pub unit: TimeUnit,

    /// timestamp → index de chandelle (le dernier doublon gagne)
    candle_by_time: HashMap<DateTime<Utc>, usize>,

    /// timestamp → index de trade (le dernier doublon gagne)
    trade_by_time: HashMap<DateTime<Utc>, usize>,

    /// Un marqueur par trade (vide s'il n'y a pas de chandelles)
    markers: Vec<TradeMarker>,
}

impl ChartData {
    /// Construit les données du graphique et les index de synchronisation
    pub fn new(mut candles: Vec<OHLC>, mut trades: Vec<Trade>) -> Self {
        // sort_by_key est stable : l'ordre du fichier est conservé pour les doublons
        candles.sort_by_key(|c| c.timestamp);
        trades.sort_by_key(|t| t.timestamp);

        let candle_by_time = candles
            .iter()
            .enumerate()
            .map(|(i, c)| (c.timestamp, i))
            .collect::<HashMap<_, _>>();

        let trade_by_time = trades
            .iter()
            .enumerate()
            .map(|(i, t)| (t.timestamp, i))
            .collect::<HashMap<_, _>>();

        let unit = TimeUnit::infer(&candles);

        let mut data = Self {
            candles,
            trades,
            unit,
            candle_by_time,
            trade_by_time,
            markers: Vec::new(),
        };
        data.markers = data.compute_markers();
        data
    }

    fn compute_markers(&self) -> Vec<TradeMarker> {
        if self.candles.is_empty() {
            return Vec::new();
        }

        self.trades
            .iter()
            .enumerate()
            .filter_map(|(trade_index, trade)| {
                let direction = trade.direction();

                match self.candle_by_time.get(&trade.timestamp) {
                    Some(&candle_index) => {
                        let candle = &self.candles[candle_index];
                        let price = match direction {
                            Direction::Long => candle.low,
                            Direction::Short => candle.high,
                        };
                        Some(TradeMarker {
                            trade_index,
                            candle_index,
                            price,
                            direction,
                            exact: true,
                        })
                    }
                    None => self.nearest_candle_index(trade.timestamp).map(|candle_index| {
                        TradeMarker {
                            trade_index,
                            candle_index,
                            price: trade.entry,
                            direction,
                            exact: false,
                        }
                    }),
                }
            })
            .collect()
    }

    /// Nombre de chandelles
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Trade au timestamp exact
    pub fn trade_at(&self, timestamp: &DateTime<Utc>) -> Option<&Trade> {
        self.trade_by_time.get(timestamp).map(|&i| &self.trades[i])
    }

    /// Index de la chandelle la plus proche dans le temps
    ///
    /// CONCEPT : Recherche dichotomique (partition_point)
    /// - Les chandelles sont triées, O(log n)
    /// - Égalité de distance : la chandelle la plus ancienne gagne
    pub fn nearest_candle_index(&self, timestamp: DateTime<Utc>) -> Option<usize> {
        if self.candles.is_empty() {
            return None;
        }

        let after = self.candles.partition_point(|c| c.timestamp < timestamp);
        if after == 0 {
            return Some(0);
        }
        if after == self.candles.len() {
            return Some(self.candles.len() - 1);
        }

        let before = after - 1;
        let gap_before = timestamp - self.candles[before].timestamp;
        let gap_after = self.candles[after].timestamp - timestamp;

        if gap_after < gap_before {
            Some(after)
        } else {
            Some(before)
        }
    }

    /// Tous les marqueurs de trades
    pub fn markers(&self) -> &[TradeMarker] {
        &self.markers
    }

    /// Marqueurs portés par les chandelles [start, end)
    pub fn markers_in(&self, start: usize, end: usize) -> impl Iterator<Item = &TradeMarker> {
        self.markers
            .iter()
            .filter(move |m| m.candle_index >= start && m.candle_index < end)
    }

    /// Période couverte : (première, dernière chandelle)
    pub fn period(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.candles.first(), self.candles.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        }
    }

    /// Texte "Period" de la barre d'infos
    pub fn period_label(&self) -> String {
        match self.period() {
            Some((first, last)) => format!(
                "{} - {}",
                first.with_timezone(&Local).format("%Y-%m-%d"),
                last.with_timezone(&Local).format("%Y-%m-%d")
            ),
            None => "N/A".to_string(),
        }
    }

    /// Bornes de prix des chandelles [start, end) et de leurs marqueurs
    pub fn price_bounds(&self, start: usize, end: usize) -> Option<(f64, f64)> {
        let end = end.min(self.candles.len());
        if start >= end {
            return None;
        }

        let (min, max) = price_range(&self.candles[start..end])?;
        Some(
            self.markers_in(start, end)
                .fold((min, max), |(min, max), m| (min.min(m.price), max.max(m.price))),
        )
    }

    // ========================================================================
    // Tooltips
    // ========================================================================

    /// Tooltip d'une chandelle (OHLCV + trade au même timestamp s'il existe)
    pub fn candle_tooltip(&self, index: usize) -> Option<Tooltip> {
        let candle = self.candles.get(index)?;

        let mut lines = vec![
            format!("Open: {}", candle.open),
            format!("High: {}", candle.high),
            format!("Low: {}", candle.low),
            format!("Close: {}", candle.close),
            format!("Volume: {}", candle.volume),
        ];

        if let Some(trade) = self.trade_at(&candle.timestamp) {
            lines.push(String::new());
            lines.push(format!("Trade: {}", trade.direction()));
            lines.extend(trade_detail_lines(trade));
        }

        Some(Tooltip {
            title: local_time_label(&candle.timestamp),
            lines,
        })
    }

    /// Tooltip d'un trade (marqueur)
    pub fn trade_tooltip(&self, trade_index: usize) -> Option<Tooltip> {
        let trade = self.trades.get(trade_index)?;

        let mut lines = vec![format!("{} Trade Entry", trade.direction())];
        lines.extend(trade_detail_lines(trade));

        Some(Tooltip {
            title: local_time_label(&trade.timestamp),
            lines,
        })
    }

    /// Tooltip affiché au survol d'une chandelle
    ///
    /// La chandelle prime ; si elle porte un marqueur de trade sans chandelle
    /// exacte, le tooltip du trade est ajouté à la suite.
    pub fn hover_tooltip(&self, index: usize) -> Option<Tooltip> {
        let mut tooltip = self.candle_tooltip(index)?;

        for marker in self
            .markers
            .iter()
            .filter(|m| m.candle_index == index && !m.exact)
        {
            if let Some(extra) = self.trade_tooltip(marker.trade_index) {
                tooltip.lines.push(String::new());
                tooltip.lines.push(extra.title);
                tooltip.lines.extend(extra.lines);
            }
        }

        Some(tooltip)
    }
}

/// Lignes communes : Entry, Exit, Take Profit, Stop Loss
fn trade_detail_lines(trade: &Trade) -> Vec<String> {
    vec![
        format!("Entry: {}", trade.entry),
        format!("Exit: {}", trade.exit_label()),
        format!("Take Profit: {}", trade.take_profit),
        format!("Stop Loss: {}", trade.stop_loss),
    ]
}

fn local_time_label(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format(TOOLTIP_TIME_FORMAT)
        .to_string()
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap() + Duration::minutes(minutes)
    }

    fn candles() -> Vec<OHLC> {
        vec![
            OHLC::new(at(0), 100.0, 105.0, 95.0, 102.0, 1000),
            OHLC::new(at(1), 102.0, 106.0, 101.0, 104.0, 1100),
            OHLC::new(at(2), 104.0, 104.5, 99.0, 100.0, 1200),
        ]
    }

    fn long_trade(minutes: i64) -> Trade {
        Trade::new(at(minutes), 100.0, 105.0, 110.0, 95.0, Some("Take Profit".into()))
    }

    fn short_trade(minutes: i64) -> Trade {
        Trade::new(at(minutes), 104.0, 101.0, 99.0, 106.0, None)
    }

    #[test]
    fn test_sorts_inputs() {
        let mut shuffled = candles();
        shuffled.reverse();
        let data = ChartData::new(shuffled, vec![short_trade(2), long_trade(0)]);

        assert_eq!(data.candles[0].timestamp, at(0));
        assert_eq!(data.candles[2].timestamp, at(2));
        assert_eq!(data.trades[0].timestamp, at(0));
    }

    #[test]
    fn test_long_marker_on_candle_low() {
        let data = ChartData::new(candles(), vec![long_trade(1)]);
        let marker = data.markers()[0];

        assert_eq!(marker.candle_index, 1);
        assert_eq!(marker.price, 101.0);
        assert_eq!(marker.direction, Direction::Long);
        assert!(marker.exact);
    }

    #[test]
    fn test_short_marker_on_candle_high() {
        let data = ChartData::new(candles(), vec![short_trade(2)]);
        let marker = data.markers()[0];

        assert_eq!(marker.candle_index, 2);
        assert_eq!(marker.price, 104.5);
        assert_eq!(marker.direction, Direction::Short);
    }

    #[test]
    fn test_unmatched_trade_uses_entry_and_nearest_candle() {
        let mut trade = long_trade(0);
        trade.timestamp = at(1) + Duration::seconds(40);
        let data = ChartData::new(candles(), vec![trade]);
        let marker = data.markers()[0];

        assert!(!marker.exact);
        assert_eq!(marker.price, 100.0);
        assert_eq!(marker.candle_index, 2);
    }

    #[test]
    fn test_nearest_candle_ties_and_edges() {
        let data = ChartData::new(candles(), vec![]);

        // À égale distance : la chandelle la plus ancienne
        assert_eq!(data.nearest_candle_index(at(0) + Duration::seconds(30)), Some(0));
        assert_eq!(data.nearest_candle_index(at(-10)), Some(0));
        assert_eq!(data.nearest_candle_index(at(50)), Some(2));
        assert_eq!(ChartData::default().nearest_candle_index(at(0)), None);
    }

    #[test]
    fn test_no_markers_without_candles() {
        let data = ChartData::new(vec![], vec![long_trade(0)]);
        assert!(data.markers().is_empty());
        assert_eq!(data.trades.len(), 1);
    }

    #[test]
    fn test_duplicate_trade_timestamp_last_wins() {
        let mut second = short_trade(1);
        second.entry = 200.0;
        let data = ChartData::new(candles(), vec![long_trade(1), second]);

        assert_eq!(data.trade_at(&at(1)).map(|t| t.entry), Some(200.0));
        assert_eq!(data.markers().len(), 2);
    }

    #[test]
    fn test_candle_tooltip_with_trade() {
        let data = ChartData::new(candles(), vec![long_trade(0)]);
        let tooltip = data.candle_tooltip(0).unwrap();

        assert_eq!(
            tooltip.lines,
            vec![
                "Open: 100",
                "High: 105",
                "Low: 95",
                "Close: 102",
                "Volume: 1000",
                "",
                "Trade: Long",
                "Entry: 100",
                "Exit: 105 (Take Profit)",
                "Take Profit: 110",
                "Stop Loss: 95",
            ]
        );
        assert_eq!(
            tooltip.title,
            at(0).with_timezone(&Local).format(TOOLTIP_TIME_FORMAT).to_string()
        );
    }

    #[test]
    fn test_candle_tooltip_without_trade() {
        let data = ChartData::new(candles(), vec![long_trade(0)]);
        let tooltip = data.candle_tooltip(1).unwrap();
        assert_eq!(tooltip.lines.len(), 5);
        assert!(data.candle_tooltip(3).is_none());
    }

    #[test]
    fn test_trade_tooltip() {
        let data = ChartData::new(candles(), vec![short_trade(2)]);
        let tooltip = data.trade_tooltip(0).unwrap();

        assert_eq!(tooltip.lines[0], "Short Trade Entry");
        assert_eq!(tooltip.lines[2], "Exit: 101");
        assert!(data.trade_tooltip(1).is_none());
    }

    #[test]
    fn test_hover_tooltip_includes_unmatched_trade() {
        let mut trade = short_trade(0);
        trade.timestamp = at(2) + Duration::seconds(10);
        let data = ChartData::new(candles(), vec![trade]);

        let tooltip = data.hover_tooltip(2).unwrap();
        assert!(tooltip.lines.iter().any(|l| l == "Short Trade Entry"));
    }

    #[test]
    fn test_period_and_bounds() {
        let data = ChartData::new(candles(), vec![]);
        assert_eq!(data.period(), Some((at(0), at(2))));
        assert_eq!(data.price_bounds(0, 3), Some((95.0, 106.0)));
        assert_eq!(data.price_bounds(1, 2), Some((101.0, 106.0)));
        assert_eq!(data.price_bounds(3, 3), None);

        let empty = ChartData::default();
        assert_eq!(empty.period(), None);
        assert_eq!(empty.period_label(), "N/A");
    }

    #[test]
    fn test_bounds_include_entry_markers() {
        let mut trade = long_trade(0);
        trade.timestamp = at(0) + Duration::seconds(5);
        trade.entry = 90.0;
        trade.exit = 91.0;
        let data = ChartData::new(candles(), vec![trade]);

        assert_eq!(data.price_bounds(0, 3), Some((90.0, 106.0)));
    }
}
