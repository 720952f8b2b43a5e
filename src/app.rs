// ============================================================================
// Structure : App
// ============================================================================
// État global du viewer TUI
//
// PATTERN : "Application State"
// - Le rendu lit App (&App), les événements le modifient (&mut App)
// - Le thread worker ne touche jamais App : ses résultats passent par load_chart / load_failed dans la boucle d'événements
//
// CYCLE DE VIE :
//   Upload ──(Enter, fichiers valides)──▶ chargement ──▶ Chart
//     ▲                                        │
//     └──────────── erreur ◀───────────────────┘
//   Chart ──(u)──▶ Upload (formulaire vidé)
// ============================================================================

use std::path::PathBuf;

use crate::models::{ChartData, Tooltip, Viewport};

/// Message affiché pendant le traitement
pub const LOADING_MESSAGE: &str = "Processing data...";

/// Erreur : un des deux chemins est vide
pub const MISSING_FILES: &str = "Please upload both OHLCV and Trades CSV files";

/// Erreur : un chemin ne se termine pas par .csv
pub const CSV_ONLY: &str = "Only .csv files are accepted";

// ============================================================================
// Enum : Screen
// ============================================================================

/// Écrans de l'application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Formulaire de sélection des deux fichiers CSV
    Upload,

    /// Graphique en chandeliers avec marqueurs de trades
    Chart,
}

// ============================================================================
// Formulaire d'upload
// ============================================================================

/// Champ actif du formulaire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadField {
    #[default]
    Ohlcv,
    Trades,
}

impl UploadField {
    /// Deux champs : suivant == précédent
    pub fn toggle(self) -> Self {
        match self {
            UploadField::Ohlcv => UploadField::Trades,
            UploadField::Trades => UploadField::Ohlcv,
        }
    }
}

/// Chemins saisis par l'utilisateur
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    pub ohlcv_path: String,
    pub trades_path: String,
    pub focus: UploadField,
}

impl UploadForm {
    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            UploadField::Ohlcv => &mut self.ohlcv_path,
            UploadField::Trades => &mut self.trades_path,
        }
    }

    pub fn push_char(&mut self, c: char) {
        self.focused_mut().push(c);
    }

    pub fn backspace(&mut self) {
        self.focused_mut().pop();
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.toggle();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Vérifie le formulaire et renvoie les deux chemins
    pub fn validate(&self) -> Result<(PathBuf, PathBuf), &'static str> {
        let ohlcv = self.ohlcv_path.trim();
        let trades = self.trades_path.trim();

        if ohlcv.is_empty() || trades.is_empty() {
            return Err(MISSING_FILES);
        }
        if !is_csv_path(ohlcv) || !is_csv_path(trades) {
            return Err(CSV_ONLY);
        }

        Ok((PathBuf::from(ohlcv), PathBuf::from(trades)))
    }
}

/// Extension .csv, insensible à la casse
pub fn is_csv_path(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".csv")
}

// ============================================================================
// État principal
// ============================================================================

/// Glisser-déposer en cours (Shift+drag) : colonne et début de fenêtre initiaux
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Drag {
    column: u16,
    start: usize,
}

/// État principal de l'application
pub struct App {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    /// Écran actuellement affiché
    pub current_screen: Screen,

    /// Formulaire d'upload
    pub form: UploadForm,

    /// Dernière erreur à afficher sur l'écran d'upload
    pub error: Option<String>,

    /// Two-step quit : première pression de 'q' → true, seconde → quit
    pub confirm_quit: bool,

    /// Traitement en cours (upload vers le backend)
    pub is_loading: bool,

    pub loading_message: Option<String>,

    /// Données affichées (None tant qu'aucun upload n'a réussi)
    pub chart: Option<ChartData>,

    /// Fenêtre visible du graphique
    pub viewport: Viewport,

    /// Chandelle survolée par la souris (index absolu)
    pub hovered: Option<usize>,

    drag: Option<Drag>,
}

impl App {
    pub fn new() -> Self {
        Self {
            running: true,
            current_screen: Screen::Upload,
            form: UploadForm::default(),
            error: None,
            confirm_quit: false,
            is_loading: false,
            loading_message: None,
            chart: None,
            viewport: Viewport::default(),
            hovered: None,
            drag: None,
        }
    }

    /// App avec le formulaire pré-rempli (options --ohlcv / --trades)
    pub fn with_paths(ohlcv: Option<String>, trades: Option<String>) -> Self {
        let mut app = Self::new();
        app.form.ohlcv_path = ohlcv.unwrap_or_default();
        app.form.trades_path = trades.unwrap_or_default();
        app
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_on_upload(&self) -> bool {
        self.current_screen == Screen::Upload
    }

    pub fn is_on_chart(&self) -> bool {
        self.current_screen == Screen::Chart
    }

    // ========================================================================
    // Quit en deux temps
    // ========================================================================

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    // ========================================================================
    // Chargement
    // ========================================================================

    pub fn start_loading(&mut self, message: Option<String>) {
        self.is_loading = true;
        self.loading_message = message;
    }

    pub fn stop_loading(&mut self) {
        self.is_loading = false;
        self.loading_message = None;
    }

    pub fn is_loading_data(&self) -> bool {
        self.is_loading
    }

    // ========================================================================
    // Écran d'upload
    // ========================================================================

    pub fn input_char(&mut self, c: char) {
        self.form.push_char(c);
    }

    pub fn backspace(&mut self) {
        self.form.backspace();
    }

    pub fn focus_next_field(&mut self) {
        self.form.focus_next();
    }

    /// Esc : vide les deux champs et l'erreur
    pub fn reset_upload(&mut self) {
        self.form.reset();
        self.error = None;
    }

    /// Enter : valide le formulaire
    ///
    /// Retourne les chemins à traiter et passe en chargement, ou None avec
    /// le message d'erreur positionné. Ignoré pendant un chargement.
    pub fn submit_upload(&mut self) -> Option<(PathBuf, PathBuf)> {
        if self.is_loading {
            return None;
        }

        match self.form.validate() {
            Ok(paths) => {
                self.error = None;
                self.start_loading(Some(LOADING_MESSAGE.to_string()));
                Some(paths)
            }
            Err(message) => {
                self.error = Some(message.to_string());
                None
            }
        }
    }

    /// Résultat du worker : données prêtes, on passe au graphique
    pub fn load_chart(&mut self, data: ChartData) {
        self.viewport = Viewport::new(data.len());
        self.chart = Some(data);
        self.hovered = None;
        self.drag = None;
        self.error = None;
        self.stop_loading();
        self.current_screen = Screen::Chart;
    }

    /// Résultat du worker : échec, le message reste sur l'écran d'upload
    pub fn load_failed(&mut self, message: String) {
        self.stop_loading();
        self.error = Some(message);
        self.current_screen = Screen::Upload;
    }

    /// 'u' depuis le graphique : nouveau formulaire vide
    pub fn new_upload(&mut self) {
        self.chart = None;
        self.viewport = Viewport::default();
        self.hovered = None;
        self.drag = None;
        self.reset_upload();
        self.current_screen = Screen::Upload;
    }

    // ========================================================================
    // Graphique : zoom, pan, survol
    // ========================================================================

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in(self.hovered);
        self.clamp_hover();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out(self.hovered);
        self.clamp_hover();
    }

    pub fn reset_zoom(&mut self) {
        self.viewport.reset();
    }

    pub fn pan(&mut self, delta: isize) {
        self.viewport.pan(delta);
        self.clamp_hover();
    }

    pub fn pan_left(&mut self) {
        self.pan(-(self.viewport.pan_step() as isize));
    }

    pub fn pan_right(&mut self) {
        self.pan(self.viewport.pan_step() as isize);
    }

    /// Met à jour la chandelle survolée (None = souris hors du graphique)
    pub fn set_hover(&mut self, index: Option<usize>) {
        self.hovered = index.filter(|i| self.viewport.contains(*i));
    }

    fn clamp_hover(&mut self) {
        if let Some(index) = self.hovered {
            if !self.viewport.contains(index) {
                self.hovered = None;
            }
        }
    }

    /// Tooltip de la chandelle survolée
    pub fn hovered_tooltip(&self) -> Option<Tooltip> {
        let index = self.hovered?;
        self.chart.as_ref()?.hover_tooltip(index)
    }

    /// Shift+clic : début du déplacement
    pub fn begin_drag(&mut self, column: u16) {
        self.drag = Some(Drag {
            column,
            start: self.viewport.start(),
        });
    }

    /// Shift+drag : la fenêtre suit la souris
    ///
    /// Glisser vers la droite montre des chandelles plus anciennes.
    pub fn drag_to(&mut self, column: u16, plot_width: u16) {
        let Some(drag) = self.drag else {
            return;
        };
        if plot_width == 0 {
            return;
        }

        let moved = column as f64 - drag.column as f64;
        let candles = (moved * self.viewport.len() as f64 / plot_width as f64).round() as isize;
        let target = drag.start as isize - candles;

        self.pan(target - self.viewport.start() as isize);
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OHLC;
    use chrono::{Duration, TimeZone, Utc};

    fn chart(count: usize) -> ChartData {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap();
        let candles = (0..count)
            .map(|i| OHLC::new(start + Duration::minutes(i as i64), 100.0, 101.0, 99.0, 100.5, 1000))
            .collect();
        ChartData::new(candles, vec![])
    }

    #[test]
    fn test_app_creation() {
        let app = App::new();
        assert!(app.is_running());
        assert!(app.is_on_upload());
        assert!(app.chart.is_none());
    }

    #[test]
    fn test_app_quit() {
        let mut app = App::new();
        app.request_quit();
        assert!(app.is_awaiting_quit_confirmation());
        app.cancel_quit();
        assert!(!app.is_awaiting_quit_confirmation());

        app.quit();
        assert!(!app.is_running());
    }

    #[test]
    fn test_typing_goes_to_focused_field() {
        let mut app = App::new();
        app.input_char('a');
        app.focus_next_field();
        app.input_char('b');
        app.input_char('c');
        app.backspace();

        assert_eq!(app.form.ohlcv_path, "a");
        assert_eq!(app.form.trades_path, "b");
        assert_eq!(app.form.focus, UploadField::Trades);
    }

    #[test]
    fn test_submit_requires_both_files() {
        let mut app = App::with_paths(Some("prices.csv".to_string()), None);

        assert!(app.submit_upload().is_none());
        assert_eq!(app.error.as_deref(), Some(MISSING_FILES));
        assert!(!app.is_loading_data());
    }

    #[test]
    fn test_submit_rejects_non_csv() {
        let mut app = App::with_paths(Some("prices.csv".to_string()), Some("trades.xlsx".to_string()));

        assert!(app.submit_upload().is_none());
        assert_eq!(app.error.as_deref(), Some(CSV_ONLY));
    }

    #[test]
    fn test_submit_starts_loading() {
        let mut app = App::with_paths(Some(" data/P.CSV ".to_string()), Some("t.csv".to_string()));
        app.error = Some("old".to_string());

        let (ohlcv, trades) = app.submit_upload().unwrap();
        assert_eq!(ohlcv, PathBuf::from("data/P.CSV"));
        assert_eq!(trades, PathBuf::from("t.csv"));
        assert!(app.error.is_none());
        assert_eq!(app.loading_message.as_deref(), Some(LOADING_MESSAGE));

        // Un second Enter pendant le chargement est ignoré
        assert!(app.submit_upload().is_none());
    }

    #[test]
    fn test_reset_upload() {
        let mut app = App::with_paths(Some("a.csv".to_string()), Some("b.csv".to_string()));
        app.error = Some("boom".to_string());
        app.reset_upload();

        assert_eq!(app.form, UploadForm::default());
        assert!(app.error.is_none());
    }

    #[test]
    fn test_load_chart_and_failure() {
        let mut app = App::new();
        app.start_loading(Some(LOADING_MESSAGE.to_string()));
        app.load_failed("Failed to process data".to_string());
        assert!(app.is_on_upload());
        assert!(!app.is_loading_data());
        assert_eq!(app.error.as_deref(), Some("Failed to process data"));

        app.load_chart(chart(50));
        assert!(app.is_on_chart());
        assert!(app.error.is_none());
        assert_eq!(app.viewport.len(), 50);
    }

    #[test]
    fn test_loading_flag_follows_submit_and_result() {
        let mut app = App::with_paths(Some("p.csv".to_string()), Some("t.csv".to_string()));

        assert!(app.submit_upload().is_some());
        assert!(app.is_loading_data());
        app.load_failed(crate::api::BACKEND_UNREACHABLE.to_string());
        assert!(!app.is_loading_data());
        assert!(app.loading_message.is_none());

        // Le formulaire est conservé : on peut relancer
        assert!(app.submit_upload().is_some());
        assert!(app.is_loading_data());
        assert!(app.submit_upload().is_none());

        app.load_chart(chart(10));
        assert!(!app.is_loading_data());
        assert!(app.is_on_chart());
    }

    #[test]
    fn test_new_upload_clears_chart() {
        let mut app = App::with_paths(Some("a.csv".to_string()), Some("b.csv".to_string()));
        app.load_chart(chart(20));
        app.new_upload();

        assert!(app.is_on_upload());
        assert!(app.chart.is_none());
        assert!(app.form.ohlcv_path.is_empty());
        assert!(app.viewport.is_empty());
    }

    #[test]
    fn test_hover_and_tooltip() {
        let mut app = App::new();
        app.load_chart(chart(30));

        app.set_hover(Some(3));
        let tooltip = app.hovered_tooltip().unwrap();
        assert_eq!(tooltip.lines[0], "Open: 100");

        app.set_hover(Some(99));
        assert!(app.hovered.is_none());
        assert!(app.hovered_tooltip().is_none());
    }

    #[test]
    fn test_zoom_and_pan_keep_hover_visible() {
        let mut app = App::new();
        app.load_chart(chart(100));

        app.set_hover(Some(0));
        app.zoom_in();
        assert_eq!(app.viewport.len(), 90);
        assert_eq!(app.viewport.start(), 0);

        app.pan_right();
        assert!(app.viewport.start() > 0);
        assert!(app.hovered.is_none());

        app.reset_zoom();
        assert!(app.viewport.is_full());
    }

    #[test]
    fn test_drag_pans_window() {
        let mut app = App::new();
        app.load_chart(chart(100));
        for _ in 0..10 {
            app.zoom_in();
        }
        let start = app.viewport.start();
        let len = app.viewport.len() as f64;

        // Glisser de 20 colonnes vers la gauche sur 100 colonnes
        app.begin_drag(60);
        app.drag_to(40, 100);
        assert_eq!(app.viewport.start(), start + (20.0 * len / 100.0).round() as usize);

        // Retour au point de départ
        app.drag_to(60, 100);
        assert_eq!(app.viewport.start(), start);

        app.end_drag();
        assert!(!app.is_dragging());
        app.drag_to(0, 100);
        assert_eq!(app.viewport.start(), start);
    }
}
