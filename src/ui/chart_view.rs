// ============================================================================
// Écran graphique
// ============================================================================
// Layout :
// ┌ header : titre + légende (ou confirmation de quit) ┐
// │ barre d'infos : Candles / Trades / Period           │
// │ graphique en chandeliers        │ panneau tooltip   │
// │ instructions                                        │
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::ui::candlestick::{
    self, CandlestickRenderer, LONG_COLOR, LONG_MARKER, MIN_TERMINAL_WIDTH, SHORT_COLOR, SHORT_MARKER,
};

/// Largeur du panneau de tooltip
const TOOLTIP_WIDTH: u16 = 30;

/// Zones de l'écran graphique
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChartLayout {
    header: Rect,
    info: Rect,
    chart: Rect,
    tooltip: Rect,
    instructions: Rect,
}

fn chart_layout(area: Rect) -> ChartLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(1), // Infos
            Constraint::Min(0),    // Graphique + tooltip
            Constraint::Length(1), // Instructions
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(TOOLTIP_WIDTH)])
        .split(rows[2]);

    ChartLayout {
        header: rows[0],
        info: rows[1],
        chart: columns[0],
        tooltip: columns[1],
        instructions: rows[3],
    }
}

/// Titre du graphique : fenêtre visible, ou toutes les chandelles hors zoom
fn chart_title(app: &App) -> String {
    if app.viewport.is_full() {
        format!(" 🕯️ All {} candles ", app.viewport.len())
    } else {
        format!(
            " 🕯️ {} candles shown ({}-{}) ",
            app.viewport.len(),
            app.viewport.start() + 1,
            app.viewport.end()
        )
    }
}

fn chart_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
}

/// Zone des chandeliers à l'écran pour une frame de taille `area`
///
/// Utilisé par la boucle d'événements pour convertir une position de souris
/// en index de chandelle. None si le graphique n'est pas dessiné.
pub fn plot_area(area: Rect) -> Option<Rect> {
    if area.width < MIN_TERMINAL_WIDTH {
        return None;
    }

    let layout = chart_layout(area);
    let plot = candlestick::plot_rect(chart_block().inner(layout.chart));
    (plot.width > 0 && plot.height > 0).then_some(plot)
}

/// Index absolu de la chandelle sous la cellule (column, row)
pub fn candle_at(app: &App, area: Rect, column: u16, row: u16) -> Option<usize> {
    let plot = plot_area(area)?;
    if column < plot.x || column >= plot.x + plot.width || row < plot.y || row >= plot.y + plot.height {
        return None;
    }

    let offset = candlestick::index_at_column(
        (column - plot.x) as usize,
        plot.width as usize,
        app.viewport.len(),
    )?;
    Some(app.viewport.start() + offset)
}

// ============================================================================
// Rendu
// ============================================================================

/// Dessine l'écran graphique
pub fn render_chart_screen(frame: &mut Frame, app: &App) {
    let area = frame.size();

    let data = match &app.chart {
        Some(data) if !data.is_empty() => data,
        _ => {
            render_no_data(frame, area);
            return;
        }
    };

    if area.width < MIN_TERMINAL_WIDTH {
        render_too_narrow(frame, area);
        return;
    }

    let layout = chart_layout(area);

    render_header(frame, app, layout.header);
    render_info_bar(frame, app, layout.info);

    let block = chart_block().title(chart_title(app));
    let inner = block.inner(layout.chart);
    let lines = CandlestickRenderer::new(data, &app.viewport, app.hovered, inner).render_lines();
    frame.render_widget(Paragraph::new(lines).block(block), layout.chart);

    render_tooltip(frame, app, layout.tooltip);
    render_instructions(frame, layout.instructions);
}

/// Header : titre, légende ou confirmation de quit
fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" 📈 Trading Chart ");

    let line = if app.is_awaiting_quit_confirmation() {
        Line::from(vec![
            Span::styled(
                "⚠  Press ",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "[q]",
                Style::default()
                    .fg(Color::Red)
                    .add_modifier(Modifier::BOLD)
                    .add_modifier(Modifier::SLOW_BLINK),
            ),
            Span::styled(
                " again to quit, any other key to cancel ⚠",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        ])
    } else {
        legend_line()
    };

    let paragraph = Paragraph::new(vec![line]).block(block).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

/// Légende des marqueurs
fn legend_line() -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{} Long Entry", LONG_MARKER),
            Style::default().fg(LONG_COLOR).add_modifier(Modifier::BOLD),
        ),
        Span::raw("    "),
        Span::styled(
            format!("{} Short Entry", SHORT_MARKER),
            Style::default().fg(SHORT_COLOR).add_modifier(Modifier::BOLD),
        ),
    ])
}

/// Texte de la barre d'infos
pub fn info_text(app: &App) -> String {
    match &app.chart {
        Some(data) => format!(
            "Candles: {}  |  Trades: {}  |  Period: {}",
            data.len(),
            data.trades.len(),
            data.period_label()
        ),
        None => "Candles: 0  |  Trades: 0  |  Period: N/A".to_string(),
    }
}

fn render_info_bar(frame: &mut Frame, app: &App, area: Rect) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        info_text(app),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

/// Panneau latéral : tooltip de la chandelle survolée
fn render_tooltip(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Details ");

    let lines: Vec<Line> = match app.hovered_tooltip() {
        Some(tooltip) => {
            let mut lines = vec![
                Line::from(Span::styled(
                    tooltip.title,
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
            ];
            lines.extend(tooltip.lines.into_iter().map(|l| Line::from(tooltip_span(l))));
            lines
        }
        None => vec![Line::from(Span::styled(
            "Hover a candle to see its details",
            Style::default().fg(Color::Gray),
        ))],
    };

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

/// Colore les lignes de trade selon le sens
fn tooltip_span(line: String) -> Span<'static> {
    let style = if line.starts_with("Trade: Long") || line.starts_with("Long Trade") {
        Style::default().fg(LONG_COLOR).add_modifier(Modifier::BOLD)
    } else if line.starts_with("Trade: Short") || line.starts_with("Short Trade") {
        Style::default().fg(SHORT_COLOR).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };
    Span::styled(line, style)
}

/// Ligne d'instructions
pub fn instructions_line() -> Line<'static> {
    let key = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    Line::from(vec![
        Span::styled("[wheel / + -]", key),
        Span::raw(" Zoom  "),
        Span::styled("[Shift+wheel / Shift+drag / H L]", key),
        Span::raw(" Pan  "),
        Span::styled("[r]", key),
        Span::raw(" Reset zoom  "),
        Span::styled("[u]", key),
        Span::raw(" New upload  "),
        Span::styled("[q q]", key),
        Span::raw(" Quit"),
    ])
}

fn render_instructions(frame: &mut Frame, area: Rect) {
    frame.render_widget(Paragraph::new(instructions_line()).alignment(Alignment::Center), area);
}

/// Aucune chandelle à afficher
fn render_no_data(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" ⚠ Chart ");

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            "No chart data available",
            Style::default().fg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "[u] New upload  [q q] Quit",
            Style::default().fg(Color::Gray),
        )),
    ];

    let paragraph = Paragraph::new(text).block(block).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

/// Terminal trop étroit pour le graphique
fn render_too_narrow(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" ⚠ Terminal too small ");

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Terminal too narrow to display the chart",
            Style::default().fg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("Minimum width: {} columns", MIN_TERMINAL_WIDTH),
            Style::default().fg(Color::Gray),
        )),
    ];

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Tests unitaires
// ============================================================================
// CONCEPT : TestBackend
// - Terminal ratatui en mémoire : on lit le buffer comme du texte
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChartData, Trade, OHLC};
    use chrono::{Duration, TimeZone, Utc};
    use ratatui::{backend::TestBackend, Terminal};

    fn app_with_chart(count: usize) -> App {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap();
        let candles: Vec<OHLC> = (0..count)
            .map(|i| OHLC::new(start + Duration::minutes(i as i64), 100.0, 102.0, 99.0, 101.0, 1000))
            .collect();
        let trades = vec![Trade::new(start, 100.0, 105.0, 110.0, 95.0, Some("Take Profit".to_string()))];

        let mut app = App::new();
        app.load_chart(ChartData::new(candles, trades));
        app
    }

    fn draw(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render_chart_screen(frame, app)).unwrap();

        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_info_text() {
        let app = app_with_chart(12);
        let text = info_text(&app);
        assert!(text.starts_with("Candles: 12  |  Trades: 1  |  Period: "));

        assert_eq!(info_text(&App::new()), "Candles: 0  |  Trades: 0  |  Period: N/A");
    }

    #[test]
    fn test_plot_area_and_candle_at() {
        let app = app_with_chart(40);
        let area = Rect::new(0, 0, 120, 40);
        let plot = plot_area(area).unwrap();

        // Bordure du bloc + axe Y
        assert_eq!(plot.x, 1 + 12);
        assert_eq!(plot.y, 3 + 1 + 1);

        assert_eq!(candle_at(&app, area, plot.x, plot.y), Some(0));
        assert_eq!(candle_at(&app, area, plot.x + plot.width - 1, plot.y), Some(39));
        assert_eq!(candle_at(&app, area, 0, plot.y), None);
        assert_eq!(plot_area(Rect::new(0, 0, 50, 40)), None);
    }

    #[test]
    fn test_render_chart_screen() {
        let mut app = app_with_chart(30);
        app.set_hover(Some(0));
        let screen = draw(&app, 120, 40);

        assert!(screen.contains("Long Entry"));
        assert!(screen.contains("Candles: 30"));
        assert!(screen.contains("Open: 100"));
        assert!(screen.contains("Trade: Long"));
        assert!(screen.contains("Reset zoom"));
    }

    #[test]
    fn test_chart_title_follows_zoom() {
        let mut app = app_with_chart(100);
        assert_eq!(chart_title(&app), " 🕯️ All 100 candles ");

        app.zoom_in();
        assert_eq!(chart_title(&app), " 🕯️ 90 candles shown (6-95) ");
    }

    #[test]
    fn test_render_no_data_and_narrow() {
        let screen = draw(&App::new(), 80, 20);
        assert!(screen.contains("No chart data available"));

        let narrow = draw(&app_with_chart(10), 50, 20);
        assert!(narrow.contains("Terminal too narrow"));
    }

    #[test]
    fn test_quit_confirmation_replaces_legend() {
        let mut app = app_with_chart(10);
        app.request_quit();
        let screen = draw(&app, 120, 30);

        assert!(screen.contains("again to quit"));
        assert!(!screen.contains("Short Entry"));
    }
}
