// ============================================================================
// Gestion des événements
// ============================================================================
// Clavier, souris et ticks du viewer
//
// CONCEPTS :
// 1. Polling avec timeout : la boucle reste réactive aux résultats du worker
// 2. Helpers is_*_event : la boucle principale reste lisible
// 3. MouseAction : traduit les événements souris bruts en intentions
//    (survol, zoom, pan, glisser)
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton,
    MouseEvent, MouseEventKind,
};

/// Délai max d'attente d'un événement avant un Tick
const POLL_TIMEOUT: Duration = Duration::from_millis(250);

/// Événements de l'application
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Événement souris (mouvement, molette, clic)
    Mouse(MouseEvent),

    /// Terminal redimensionné
    Resize,

    /// Tick régulier
    Tick,
}

/// Gestionnaire d'événements
pub struct EventHandler;

impl EventHandler {
    pub fn new() -> Self {
        Self
    }

    /// Lit le prochain événement (bloquant au plus POLL_TIMEOUT)
    pub fn next(&self) -> Result<Event> {
        if !event::poll(POLL_TIMEOUT)? {
            return Ok(Event::Tick);
        }

        let event = match event::read()? {
            // Sur certains OS on reçoit Press ET Release : on ne garde que Press
            CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Event::Key(key),
            CrosstermEvent::Mouse(mouse) => Event::Mouse(mouse),
            CrosstermEvent::Resize(_, _) => Event::Resize,
            _ => Event::Tick,
        };

        Ok(event)
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helpers clavier
// ============================================================================

fn key_matches(event: &Event, predicate: impl Fn(&KeyEvent) -> bool) -> bool {
    match event {
        Event::Key(key) => predicate(key),
        _ => false,
    }
}

/// 'q' : quitter (deux fois)
pub fn is_quit_event(event: &Event) -> bool {
    key_matches(event, |k| matches!(k.code, KeyCode::Char('q') | KeyCode::Char('Q')))
}

/// Ctrl+C : quitter immédiatement, sur tous les écrans
pub fn is_ctrl_c_event(event: &Event) -> bool {
    key_matches(event, |k| {
        k.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
    })
}

pub fn is_escape_event(event: &Event) -> bool {
    key_matches(event, |k| k.code == KeyCode::Esc)
}

pub fn is_enter_event(event: &Event) -> bool {
    key_matches(event, |k| k.code == KeyCode::Enter)
}

pub fn is_backspace_event(event: &Event) -> bool {
    key_matches(event, |k| k.code == KeyCode::Backspace)
}

/// Tab, Shift+Tab, ↑ ou ↓ : change de champ dans le formulaire
///
/// Pas de j/k ici : ces lettres doivent pouvoir être tapées dans un chemin.
pub fn is_switch_field_event(event: &Event) -> bool {
    key_matches(event, |k| {
        matches!(k.code, KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down)
    })
}

/// '+' (ou '=' sans Shift) : zoom avant
pub fn is_zoom_in_event(event: &Event) -> bool {
    key_matches(event, |k| matches!(k.code, KeyCode::Char('+') | KeyCode::Char('=')))
}

/// '-' : zoom arrière
pub fn is_zoom_out_event(event: &Event) -> bool {
    key_matches(event, |k| matches!(k.code, KeyCode::Char('-') | KeyCode::Char('_')))
}

/// 'h' ou ← : déplacement vers les chandelles plus anciennes
pub fn is_pan_left_event(event: &Event) -> bool {
    key_matches(event, |k| {
        matches!(k.code, KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('H'))
    })
}

/// 'l' ou → : déplacement vers les chandelles plus récentes
pub fn is_pan_right_event(event: &Event) -> bool {
    key_matches(event, |k| {
        matches!(k.code, KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('L'))
    })
}

/// 'r' : réinitialise le zoom
pub fn is_reset_zoom_event(event: &Event) -> bool {
    key_matches(event, |k| matches!(k.code, KeyCode::Char('r') | KeyCode::Char('R')))
}

/// 'u' : retour au formulaire d'upload
pub fn is_new_upload_event(event: &Event) -> bool {
    key_matches(event, |k| matches!(k.code, KeyCode::Char('u') | KeyCode::Char('U')))
}

/// Caractère imprimable tapé (sans Ctrl ni Alt)
pub fn get_char_from_event(event: &Event) -> Option<char> {
    match event {
        Event::Key(key)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            match key.code {
                KeyCode::Char(c) if !c.is_control() => Some(c),
                _ => None,
            }
        }
        _ => None,
    }
}

// ============================================================================
// Souris
// ============================================================================
// Molette : zoom (Chart.js : zoom X, vitesse 0.1)
// Shift+molette ou molette horizontale : pan
// Shift+clic gauche maintenu : glisser pour déplacer
// ============================================================================

/// Intention déduite d'un événement souris
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    /// La souris survole la cellule (column, row)
    Hover { column: u16, row: u16 },
    ZoomIn { column: u16, row: u16 },
    ZoomOut { column: u16, row: u16 },
    PanLeft,
    PanRight,
    DragStart { column: u16 },
    Drag { column: u16 },
    DragEnd,
}

/// Traduit un événement souris (None = ignoré)
pub fn mouse_action(mouse: &MouseEvent) -> Option<MouseAction> {
    let shift = mouse.modifiers.contains(KeyModifiers::SHIFT);
    let (column, row) = (mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::Moved => Some(MouseAction::Hover { column, row }),
        MouseEventKind::ScrollUp if shift => Some(MouseAction::PanLeft),
        MouseEventKind::ScrollDown if shift => Some(MouseAction::PanRight),
        MouseEventKind::ScrollUp => Some(MouseAction::ZoomIn { column, row }),
        MouseEventKind::ScrollDown => Some(MouseAction::ZoomOut { column, row }),
        MouseEventKind::ScrollLeft => Some(MouseAction::PanLeft),
        MouseEventKind::ScrollRight => Some(MouseAction::PanRight),
        MouseEventKind::Down(MouseButton::Left) if shift => Some(MouseAction::DragStart { column }),
        MouseEventKind::Drag(MouseButton::Left) => Some(MouseAction::Drag { column }),
        MouseEventKind::Up(MouseButton::Left) => Some(MouseAction::DragEnd),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
