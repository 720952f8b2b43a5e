// ============================================================================
// Écran d'upload
// ============================================================================
// Formulaire à deux champs : chemin du CSV OHLCV et chemin du CSV de trades
//
// Layout :
// - Header : titre
// - Contenu : deux champs de saisie, colonnes attendues, exemples,
//   message d'erreur ou indicateur de chargement
// - Footer : raccourcis clavier
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, UploadField};

/// Dessine l'écran d'upload
pub fn render_upload_screen(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Formulaire
            Constraint::Length(3), // Footer
        ])
        .split(frame.size());

    render_header(frame, chunks[0]);
    render_form(frame, app, chunks[1]);
    render_footer(frame, chunks[2]);
}

fn render_header(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" tradechart ")
        .title_alignment(Alignment::Center);

    let text = Line::from(Span::styled(
        "📊 Upload OHLCV and Trades CSV files",
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    ));

    frame.render_widget(Paragraph::new(text).block(block).alignment(Alignment::Center), area);
}

fn render_form(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // OHLCV
            Constraint::Length(3), // Trades
            Constraint::Length(7), // Colonnes attendues
            Constraint::Min(0),    // Statut
        ])
        .split(area);

    render_input(
        frame,
        chunks[0],
        " OHLCV file ",
        &app.form.ohlcv_path,
        app.form.focus == UploadField::Ohlcv,
    );
    render_input(
        frame,
        chunks[1],
        " Trades file ",
        &app.form.trades_path,
        app.form.focus == UploadField::Trades,
    );
    render_hints(frame, chunks[2]);
    render_status(frame, app, chunks[3]);
}

/// Champ de saisie ; le champ actif a une bordure jaune et un curseur
fn render_input(frame: &mut Frame, area: Rect, title: &str, value: &str, focused: bool) {
    let border = if focused { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title.to_string());

    let mut spans = vec![Span::styled(value.to_string(), Style::default().fg(Color::White))];
    if focused {
        spans.push(Span::styled(
            "█",
            Style::default().fg(Color::White).add_modifier(Modifier::SLOW_BLINK),
        ));
    } else if value.is_empty() {
        spans.push(Span::styled("path/to/file.csv", Style::default().fg(Color::DarkGray)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

/// Colonnes attendues et lignes d'exemple
fn render_hints(frame: &mut Frame, area: Rect) {
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let example = Style::default().fg(Color::Gray);

    let text = vec![
        Line::from(vec![
            Span::styled("OHLCV columns:  ", label),
            Span::raw("DateTime, Open, High, Low, Close, Volume"),
        ]),
        Line::from(Span::styled("  2024-01-01 09:30:00,100.0,100.5,99.8,100.2,1500", example)),
        Line::from(""),
        Line::from(vec![
            Span::styled("Trades columns: ", label),
            Span::raw("DateTime, Entry, Exit, TakeProfit, StopLoss, Reason"),
        ]),
        Line::from(Span::styled("  2024-01-01 09:35:00,100.1,101.9,103.0,99.0,Take Profit", example)),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Expected format ");

    frame.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: false }), area);
}

/// Erreur, chargement ou invite
fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let line = if app.is_loading_data() {
        let message = app
            .loading_message
            .clone()
            .unwrap_or_else(|| "Loading...".to_string());
        Line::from(vec![
            Span::styled("⏳ ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(message, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        ])
    } else if let Some(error) = &app.error {
        Line::from(Span::styled(
            format!("✖ {}", error),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(Span::styled(
            "Fill in both paths and press Enter",
            Style::default().fg(Color::Gray),
        ))
    };

    let paragraph = Paragraph::new(vec![Line::from(""), line])
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let key = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let spans = vec![
        Span::styled("[Tab / ↑↓]", key),
        Span::raw(" Switch field  "),
        Span::styled("[Enter]", key),
        Span::raw(" Upload & Process  "),
        Span::styled("[Esc]", key),
        Span::raw(" Reset  "),
        Span::styled("[Ctrl+C]", key),
        Span::raw(" Quit"),
    ];

    frame.render_widget(
        Paragraph::new(Line::from(spans)).block(block).alignment(Alignment::Center),
        area,
    );
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{CSV_ONLY, LOADING_MESSAGE};
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render_upload_screen(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_render_form_with_paths() {
        let app = App::with_paths(Some("data/prices.csv".to_string()), Some("data/trades.csv".to_string()));
        let screen = draw(&app);

        assert!(screen.contains("OHLCV file"));
        assert!(screen.contains("data/prices.csv"));
        assert!(screen.contains("data/trades.csv"));
        assert!(screen.contains("DateTime, Entry, Exit, TakeProfit, StopLoss, Reason"));
    }

    #[test]
    fn test_render_error_and_loading() {
        let mut app = App::new();
        app.error = Some(CSV_ONLY.to_string());
        assert!(draw(&app).contains(CSV_ONLY));

        app.start_loading(Some(LOADING_MESSAGE.to_string()));
        let screen = draw(&app);
        assert!(screen.contains(LOADING_MESSAGE));
        assert!(!screen.contains(CSV_ONLY));
    }
}
