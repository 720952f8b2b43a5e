// ============================================================================
// Candlestick Chart - Rendu texte ligne par ligne
// ============================================================================
// Dessine les chandeliers japonais avec des caractères Unicode box-drawing,
// plus les marqueurs d'entrée de trades et la colonne survolée.
//
// ALGORITHME (inspiré de cli-candlestick-chart) :
// - Rendu vertical : ligne par ligne de haut en bas
// - Pour chaque ligne, on choisit le caractère selon 3 zones :
//   mèche supérieure, corps, mèche inférieure
// - Seuils fractionnaires (0.25, 0.75) pour une précision sub-caractère
//
// LARGEUR : un chandelier occupe 1 à 3 colonnes (80% de l'espace disponible).
// Le corps couvre toute la largeur, la mèche seulement la colonne centrale.
//
// CARACTÈRES UNICODE :
// ┃ Corps plein          │ Mèche pleine
// ╻ Demi-corps (bas)     ╹ Demi-corps (haut)
// ╽ Transition top       ╿ Transition bottom
// ╷ Demi-mèche sup       ╵ Demi-mèche inf
// ============================================================================

use chrono::Local;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
};

use crate::models::{ChartData, Direction, Viewport, OHLC};

// ============================================================================
// Constantes
// ============================================================================

const UNICODE_VOID: char = ' ';
const UNICODE_BODY: char = '┃';
const UNICODE_HALF_BODY_BOTTOM: char = '╻';
const UNICODE_HALF_BODY_TOP: char = '╹';
const UNICODE_WICK: char = '│';
const UNICODE_TOP: char = '╽';
const UNICODE_BOTTOM: char = '╿';
const UNICODE_UPPER_WICK: char = '╷';
const UNICODE_LOWER_WICK: char = '╵';

/// Marqueurs d'entrée de trade
pub const LONG_MARKER: char = '▲';
pub const SHORT_MARKER: char = '▼';

/// Couleurs des chandeliers : #26a69a / #ef5350
pub const BULLISH_COLOR: Color = Color::Rgb(38, 166, 154);
pub const BEARISH_COLOR: Color = Color::Rgb(239, 83, 80);

/// Couleurs des marqueurs : #4CAF50 / #F44336
pub const LONG_COLOR: Color = Color::Rgb(76, 175, 80);
pub const SHORT_COLOR: Color = Color::Rgb(244, 67, 54);

/// Fond de la colonne survolée
const HOVER_BACKGROUND: Color = Color::Rgb(55, 55, 55);

const AXIS_COLOR: Color = Color::Gray;
const DATE_COLOR: Color = Color::Rgb(120, 120, 120);

/// Largeur de l'axe Y (normal / terminal étroit)
const Y_AXIS_WIDTH: u16 = 12;
const NARROW_Y_AXIS_WIDTH: u16 = 8;
const ADAPTIVE_Y_AXIS_THRESHOLD: u16 = 80;

/// En dessous, le graphique n'est pas dessiné
pub const MIN_TERMINAL_WIDTH: u16 = 60;

/// Ticks + labels + dates
pub const X_AXIS_HEIGHT: u16 = 3;

/// Part de l'espace par chandelle occupée par le corps
const CANDLE_FILL: f64 = 0.8;
const MAX_CANDLE_WIDTH: usize = 3;

/// Marge verticale autour de la plage de prix
const PRICE_MARGIN: f64 = 0.02;

/// Espace minimum entre deux labels de l'axe X
const LABEL_GAP: usize = 2;

// ============================================================================
// Géométrie : positions des chandeliers
// ============================================================================
// CONCEPT : Single source of truth for alignment
// - Chandeliers, marqueurs, ticks, labels ET détection du survol utilisent
//   les mêmes positions
// ============================================================================

/// Position d'un chandelier dans la zone graphique
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandlePosition {
    /// Première colonne (0-based depuis le début de la zone graphique)
    pub column: usize,
    /// Nombre de colonnes occupées
    pub width: usize,
}

impl CandlePosition {
    /// Colonne de la mèche
    pub fn centre(&self) -> usize {
        self.column + self.width / 2
    }
}

/// Largeur d'un chandelier : clamp(floor(0.8 * largeur / visibles), 1, 3)
pub fn candle_width(plot_width: usize, visible: usize) -> usize {
    if visible == 0 {
        return 1;
    }
    ((CANDLE_FILL * plot_width as f64 / visible as f64).floor() as usize).clamp(1, MAX_CANDLE_WIDTH)
}

/// Pré-calcule la position de chaque chandelier
///
/// Chaque position = round(index × espacement) : pas d'accumulation d'erreurs
/// d'arrondi. Un chandelier unique est centré.
pub fn compute_candle_positions(plot_width: usize, visible: usize) -> Vec<CandlePosition> {
    if visible == 0 || plot_width == 0 {
        return Vec::new();
    }

    let width = candle_width(plot_width, visible).min(plot_width);
    let last_column = plot_width - width;

    if visible == 1 {
        return vec![CandlePosition {
            column: (plot_width / 2).saturating_sub(width / 2).min(last_column),
            width,
        }];
    }

    let spacing = plot_width as f64 / visible as f64;
    (0..visible)
        .map(|i| CandlePosition {
            column: ((i as f64 * spacing).round() as usize).min(last_column),
            width,
        })
        .collect()
}

/// Chandelle (index relatif à la fenêtre) sous la colonne `offset`
pub fn index_at_column(offset: usize, plot_width: usize, visible: usize) -> Option<usize> {
    if visible == 0 || offset >= plot_width {
        return None;
    }
    if visible == 1 {
        return Some(0);
    }

    let index = offset * visible / plot_width;
    Some(index.min(visible - 1))
}

/// Largeur de l'axe Y selon la largeur disponible
pub fn y_axis_width(area_width: u16) -> u16 {
    if area_width < ADAPTIVE_Y_AXIS_THRESHOLD {
        NARROW_Y_AXIS_WIDTH
    } else {
        Y_AXIS_WIDTH
    }
}

/// Zone des chandeliers dans `area` (sans axe Y ni axe X)
pub fn plot_rect(area: Rect) -> Rect {
    let axis = y_axis_width(area.width).min(area.width);
    Rect {
        x: area.x + axis,
        y: area.y,
        width: area.width - axis,
        height: area.height.saturating_sub(X_AXIS_HEIGHT),
    }
}

// ============================================================================
// Grille de cellules
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Cell {
    ch: char,
    style: Style,
}

impl Cell {
    fn blank() -> Self {
        Self {
            ch: UNICODE_VOID,
            style: Style::default(),
        }
    }
}

/// Regroupe les cellules consécutives de même style en un seul Span
fn cells_to_spans(cells: &[Cell]) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut text = String::new();
    let mut current: Option<Style> = None;

    for cell in cells {
        if current != Some(cell.style) {
            if let Some(style) = current {
                spans.push(Span::styled(std::mem::take(&mut text), style));
            }
            current = Some(cell.style);
        }
        text.push(cell.ch);
    }

    if let Some(style) = current {
        spans.push(Span::styled(text, style));
    }
    spans
}

/// Écrit `text` à partir de `column` dans un buffer de caractères
fn write_at(buffer: &mut [char], column: usize, text: &str) {
    for (i, ch) in text.chars().enumerate() {
        if let Some(slot) = buffer.get_mut(column + i) {
            *slot = ch;
        }
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// Renderer de chandeliers japonais en mode texte
pub struct CandlestickRenderer<'a> {
    data: &'a ChartData,
    start: usize,
    end: usize,
    hovered: Option<usize>,
    min_price: f64,
    max_price: f64,
    height: u16,
    width: u16,
    y_axis_width: u16,
}

impl<'a> CandlestickRenderer<'a> {
    /// Crée un renderer pour la fenêtre `viewport` dans `area`
    pub fn new(data: &'a ChartData, viewport: &Viewport, hovered: Option<usize>, area: Rect) -> Self {
        let start = viewport.start().min(data.len());
        let end = viewport.end().min(data.len());
        let (min_price, max_price) = Self::compute_price_bounds(data, start, end);
        let plot = plot_rect(area);

        Self {
            data,
            start,
            end,
            hovered: hovered.filter(|i| *i >= start && *i < end),
            min_price,
            max_price,
            height: plot.height,
            width: plot.width,
            y_axis_width: area.width - plot.width,
        }
    }

    /// Bornes de prix des chandelles visibles et de leurs marqueurs, marge de 2%
    fn compute_price_bounds(data: &ChartData, start: usize, end: usize) -> (f64, f64) {
        let Some((min_price, max_price)) = data.price_bounds(start, end) else {
            return (0.0, 0.0);
        };

        let margin = (max_price - min_price) * PRICE_MARGIN;
        ((min_price - margin).max(0.0), max_price + margin)
    }

    /// Convertit un prix en coordonnée de hauteur
    fn price_to_height(&self, price: f64) -> f64 {
        if self.max_price == self.min_price {
            return self.height as f64 / 2.0;
        }

        (price - self.min_price) / (self.max_price - self.min_price) * self.height as f64
    }

    /// Ligne (1 = bas, height = haut) contenant un prix
    fn price_row(&self, price: f64) -> i32 {
        (self.price_to_height(price).round() as i32).clamp(1, self.height.max(1) as i32)
    }

    /// Caractère d'un chandelier à la hauteur `y`
    ///
    /// `high`/`low` bornent la mèche, `top`/`bottom` le corps. Pour les colonnes
    /// latérales d'un chandelier large, on passe high = top et low = bottom.
    fn candle_char(&self, high: f64, low: f64, top: f64, bottom: f64, y: u16) -> char {
        let height_unit = y as f64;

        let high_y = self.price_to_height(high);
        let low_y = self.price_to_height(low);
        let max_y = self.price_to_height(top);
        let min_y = self.price_to_height(bottom);

        // ZONE 1 : mèche supérieure (high → max)
        if high_y.ceil() >= height_unit && height_unit >= max_y.floor() {
            if max_y - height_unit > 0.75 {
                UNICODE_BODY
            } else if max_y - height_unit > 0.25 {
                if high_y - height_unit > 0.75 {
                    UNICODE_TOP
                } else {
                    UNICODE_HALF_BODY_BOTTOM
                }
            } else if high_y - height_unit > 0.75 {
                UNICODE_WICK
            } else if high_y - height_unit > 0.25 {
                UNICODE_UPPER_WICK
            } else {
                UNICODE_VOID
            }
        }
        // ZONE 2 : corps (min → max)
        else if max_y.floor() >= height_unit && height_unit >= min_y.ceil() {
            UNICODE_BODY
        }
        // ZONE 3 : mèche inférieure (min → low)
        else if min_y.ceil() >= height_unit && height_unit >= low_y.floor() {
            if min_y - height_unit < 0.25 {
                UNICODE_BODY
            } else if min_y - height_unit < 0.75 {
                if low_y - height_unit < 0.25 {
                    UNICODE_BOTTOM
                } else {
                    UNICODE_HALF_BODY_TOP
                }
            } else if low_y - height_unit < 0.25 {
                UNICODE_WICK
            } else if low_y - height_unit < 0.75 {
                UNICODE_LOWER_WICK
            } else {
                UNICODE_VOID
            }
        } else {
            UNICODE_VOID
        }
    }

    fn candle_color(candle: &OHLC) -> Color {
        if candle.is_bullish() {
            BULLISH_COLOR
        } else {
            BEARISH_COLOR
        }
    }

    /// Label de l'axe Y (tous les 4 lignes)
    fn render_y_axis(&self, y: u16) -> String {
        let label_width = self.y_axis_width.saturating_sub(3) as usize;
        let precision = if self.y_axis_width < Y_AXIS_WIDTH { 0 } else { 2 };

        if y % 4 == 0 {
            let price = self.min_price
                + (y as f64 * (self.max_price - self.min_price) / self.height as f64);
            format!("{:>w$.p$} │ ", price, w = label_width, p = precision)
        } else {
            format!("{:>w$} │ ", "", w = label_width)
        }
    }

    /// Génère toutes les lignes du graphique (chandeliers + axe X)
    pub fn render_lines(&self) -> Vec<Line<'static>> {
        let visible = &self.data.candles[self.start..self.end];
        if visible.is_empty() || self.width == 0 || self.height == 0 {
            return Vec::new();
        }

        let width = self.width as usize;
        let height = self.height as usize;
        let positions = compute_candle_positions(width, visible.len());

        // grid[0] = ligne du haut (y = height)
        let mut grid = vec![vec![Cell::blank(); width]; height];

        // Colonne survolée : fond grisé sur toute la hauteur
        if let Some(hovered) = self.hovered {
            let pos = positions[hovered - self.start];
            for row in grid.iter_mut() {
                for cell in &mut row[pos.column..pos.column + pos.width] {
                    cell.style = cell.style.bg(HOVER_BACKGROUND);
                }
            }
        }

        for (candle, pos) in visible.iter().zip(&positions) {
            let color = Self::candle_color(candle);
            let (top, bottom) = (candle.body_top(), candle.body_bottom());

            for y in 1..=self.height {
                let row = &mut grid[height - y as usize];
                for column in pos.column..pos.column + pos.width {
                    let ch = if column == pos.centre() {
                        self.candle_char(candle.high, candle.low, top, bottom, y)
                    } else {
                        self.candle_char(top, bottom, top, bottom, y)
                    };

                    if ch != UNICODE_VOID {
                        row[column].ch = ch;
                        row[column].style = row[column].style.fg(color);
                    }
                }
            }
        }

        // Marqueurs : ▲ une ligne sous l'ancre (long), ▼ une ligne au-dessus (short)
        for marker in self.data.markers_in(self.start, self.end) {
            let pos = positions[marker.candle_index - self.start];
            let anchor = self.price_row(marker.price);
            let (y, ch, color) = match marker.direction {
                Direction::Long => (anchor - 1, LONG_MARKER, LONG_COLOR),
                Direction::Short => (anchor + 1, SHORT_MARKER, SHORT_COLOR),
            };
            let y = y.clamp(1, self.height as i32) as usize;

            let cell = &mut grid[height - y][pos.centre()];
            cell.ch = ch;
            cell.style = cell.style.fg(color);
        }

        let mut lines: Vec<Line<'static>> = grid
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let y = (height - i) as u16;
                let mut spans = vec![Span::styled(self.render_y_axis(y), Style::default().fg(AXIS_COLOR))];
                spans.extend(cells_to_spans(row));
                Line::from(spans)
            })
            .collect();

        lines.extend(self.render_x_axis(visible, &positions));
        lines
    }

    /// Lignes de l'axe X
    ///
    /// - Ligne 1 : tick marks (│)
    /// - Ligne 2 : labels de temps selon l'unité déduite
    /// - Ligne 3 : dates aux changements de jour (unités intraday)
    fn render_x_axis(&self, visible: &[OHLC], positions: &[CandlePosition]) -> Vec<Line<'static>> {
        let width = self.width as usize;
        let unit = self.data.unit;

        // Nombre de labels qui tiennent sans chevauchement
        let max_labels = (width / (unit.label_width() + LABEL_GAP)).clamp(2, 10);
        let label_interval = if visible.len() <= max_labels {
            1
        } else {
            visible.len() / max_labels
        };

        let mut ticks = vec![' '; width];
        let mut labels = vec![' '; width];
        let mut dates = vec![' '; width];
        let mut next_label_column = 0;
        let mut next_date_column = 0;
        let mut last_day = None;

        for (i, (candle, pos)) in visible.iter().zip(positions).enumerate() {
            let local = candle.timestamp.with_timezone(&Local);

            if i % label_interval == 0 {
                ticks[pos.centre()] = '│';

                let label = local.format(unit.label_format()).to_string();
                let len = label.chars().count();
                if pos.column >= next_label_column && pos.column + len <= width {
                    write_at(&mut labels, pos.column, &label);
                    next_label_column = pos.column + len + LABEL_GAP;
                }
            }

            if unit.is_intraday() {
                let day = local.date_naive();
                if last_day != Some(day) {
                    let label = local.format("%d/%m").to_string();
                    let len = label.chars().count();
                    if pos.column >= next_date_column && pos.column + len <= width {
                        write_at(&mut dates, pos.column, &label);
                        next_date_column = pos.column + len + LABEL_GAP;
                    }
                }
                last_day = Some(day);
            }
        }

        let padding = " ".repeat(self.y_axis_width as usize);
        let line = |buffer: Vec<char>, color: Color| {
            Line::from(vec![
                Span::raw(padding.clone()),
                Span::styled(buffer.into_iter().collect::<String>(), Style::default().fg(color)),
            ])
        };

        vec![
            line(ticks, AXIS_COLOR),
            line(labels, AXIS_COLOR),
            line(dates, DATE_COLOR),
        ]
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Trade;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn candles(count: usize) -> Vec<OHLC> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap();
        (0..count)
            .map(|i| {
                let base = 100.0 + i as f64;
                OHLC::new(start + Duration::minutes(i as i64), base, base + 2.0, base - 2.0, base + 1.0, 1000)
            })
            .collect()
    }

    /// Chandelles espacées de `step` à partir d'une heure locale
    fn candles_from(start: DateTime<Utc>, step: Duration, count: usize) -> Vec<OHLC> {
        (0..count)
            .map(|i| OHLC::new(start + step * i as i32, 100.0, 102.0, 98.0, 101.0, 1000))
            .collect()
    }

    fn local(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(2024, 1, day, hour, minute, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    /// (labels, dates) : les deux dernières lignes de l'axe X
    fn x_axis(data: &ChartData) -> (String, String) {
        let viewport = Viewport::new(data.len());
        let lines =
            CandlestickRenderer::new(data, &viewport, None, Rect::new(0, 0, 100, 30)).render_lines();
        let n = lines.len();
        (text(&lines[n - 2]), text(&lines[n - 1]))
    }

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_candle_width() {
        assert_eq!(candle_width(100, 400), 1);
        assert_eq!(candle_width(100, 50), 1);
        assert_eq!(candle_width(100, 40), 2);
        assert_eq!(candle_width(100, 10), 3);
        assert_eq!(candle_width(100, 0), 1);
    }

    #[test]
    fn test_positions_spread_and_single_centred() {
        let positions = compute_candle_positions(100, 10);
        assert_eq!(positions.len(), 10);
        assert_eq!(positions[0].column, 0);
        assert_eq!(positions[5].column, 50);
        assert!(positions.iter().all(|p| p.width == 3 && p.column + p.width <= 100));

        let single = compute_candle_positions(100, 1);
        assert_eq!(single[0].centre(), 50);

        assert!(compute_candle_positions(0, 5).is_empty());
    }

    #[test]
    fn test_index_at_column() {
        assert_eq!(index_at_column(0, 100, 10), Some(0));
        assert_eq!(index_at_column(55, 100, 10), Some(5));
        assert_eq!(index_at_column(99, 100, 10), Some(9));
        assert_eq!(index_at_column(100, 100, 10), None);
        assert_eq!(index_at_column(10, 100, 1), Some(0));
        assert_eq!(index_at_column(10, 100, 0), None);
    }

    #[test]
    fn test_plot_rect() {
        let plot = plot_rect(Rect::new(2, 3, 100, 30));
        assert_eq!(plot, Rect::new(14, 3, 88, 27));

        // Terminal étroit : axe Y réduit
        let narrow = plot_rect(Rect::new(0, 0, 70, 20));
        assert_eq!(narrow.x, 8);
    }

    #[test]
    fn test_render_lines_dimensions() {
        let data = ChartData::new(candles(20), vec![]);
        let viewport = Viewport::new(data.len());
        let area = Rect::new(0, 0, 100, 30);

        let lines = CandlestickRenderer::new(&data, &viewport, None, area).render_lines();

        assert_eq!(lines.len(), 30);
        // Chaque ligne du graphique fait toute la largeur
        assert!(lines[..27].iter().all(|l| text(l).chars().count() == 100));
        assert!(lines.iter().any(|l| text(l).contains(UNICODE_BODY)));
    }

    #[test]
    fn test_render_markers() {
        let data = ChartData::new(
            candles(20),
            vec![
                // Long sur la 3e chandelle, short sur la 10e
                Trade::new(candles(20)[2].timestamp, 102.0, 104.0, 106.0, 100.0, None),
                Trade::new(candles(20)[9].timestamp, 109.0, 107.0, 105.0, 111.0, None),
            ],
        );
        let viewport = Viewport::new(data.len());
        let lines =
            CandlestickRenderer::new(&data, &viewport, None, Rect::new(0, 0, 100, 30)).render_lines();

        let all: String = lines.iter().map(text).collect();
        assert_eq!(all.matches(LONG_MARKER).count(), 1);
        assert_eq!(all.matches(SHORT_MARKER).count(), 1);
    }

    #[test]
    fn test_markers_outside_window_are_hidden() {
        let data = ChartData::new(
            candles(30),
            vec![Trade::new(candles(30)[0].timestamp, 100.0, 101.0, 103.0, 99.0, None)],
        );
        let mut viewport = Viewport::new(data.len());
        viewport.zoom_in(Some(29));
        viewport.pan(100);

        let lines =
            CandlestickRenderer::new(&data, &viewport, None, Rect::new(0, 0, 100, 30)).render_lines();
        let all: String = lines.iter().map(text).collect();
        assert!(!all.contains(LONG_MARKER));
    }

    #[test]
    fn test_hovered_column_is_highlighted() {
        let data = ChartData::new(candles(10), vec![]);
        let viewport = Viewport::new(data.len());
        let lines =
            CandlestickRenderer::new(&data, &viewport, Some(4), Rect::new(0, 0, 100, 30)).render_lines();

        let highlighted = lines[0]
            .spans
            .iter()
            .filter(|s| s.style.bg == Some(HOVER_BACKGROUND))
            .map(|s| s.content.chars().count())
            .sum::<usize>();
        assert_eq!(highlighted, 3);
    }

    #[test]
    fn test_flat_prices_do_not_panic() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let flat = vec![OHLC::new(start, 10.0, 10.0, 10.0, 10.0, 0)];
        let data = ChartData::new(flat, vec![]);
        let viewport = Viewport::new(1);

        let lines = CandlestickRenderer::new(&data, &viewport, None, Rect::new(0, 0, 80, 20)).render_lines();
        assert_eq!(lines.len(), 20);
    }

    #[test]
    fn test_minute_labels_show_time_of_day() {
        let data = ChartData::new(candles_from(local(2, 9, 30), Duration::minutes(1), 20), vec![]);
        let (labels, dates) = x_axis(&data);

        assert!(labels.contains("09:30"));
        assert!(dates.contains("02/01"));
    }

    #[test]
    fn test_date_line_marks_new_day_after_midnight() {
        let data = ChartData::new(candles_from(local(1, 23, 50), Duration::minutes(1), 20), vec![]);
        let (labels, dates) = x_axis(&data);

        assert!(labels.contains("23:50"));
        assert!(dates.contains("01/01"));
        assert!(dates.contains("02/01"));
        assert!(dates.find("01/01") < dates.find("02/01"));
    }

    #[test]
    fn test_daily_labels_show_month_and_day() {
        let data = ChartData::new(candles_from(local(1, 12, 0), Duration::days(1), 10), vec![]);
        let (labels, dates) = x_axis(&data);

        assert!(labels.contains("Jan 01"));
        // Pas de ligne de dates hors intraday
        assert!(dates.trim().is_empty());
    }
}
