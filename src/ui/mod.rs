// ============================================================================
// Module : ui
// ============================================================================
// Interface terminal : événements, écran d'upload, écran graphique
// ============================================================================

pub mod candlestick; // Rendu des chandeliers japonais (Unicode text)
pub mod chart_view;  // Écran graphique : header, infos, tooltip
pub mod events;      // Clavier et souris
pub mod upload;      // Formulaire des deux fichiers CSV

use ratatui::Frame;

use crate::app::{App, Screen};

pub use events::{Event, EventHandler};

/// Dessine l'écran courant
pub fn render(frame: &mut Frame, app: &App) {
    match app.current_screen {
        Screen::Upload => upload::render_upload_screen(frame, app),
        Screen::Chart => chart_view::render_chart_screen(frame, app),
    }
}
