// ============================================================================
// Structure : Viewport (zoom et déplacement horizontal)
// ============================================================================
// Fenêtre visible [start, start + len) sur les index de chandelles
//
// INVARIANTS :
// - start + len <= total (jamais au-delà des données d'origine)
// - min(MIN_VISIBLE, total) <= len <= total
// - Zoom et pan uniquement sur l'axe X
// ============================================================================

/// Nombre minimum de chandelles visibles en zoom maximum
pub const MIN_VISIBLE: usize = 10;

/// Vitesse de zoom : 10% de la fenêtre par cran de molette
pub const ZOOM_SPEED: f64 = 0.1;

/// Fenêtre de chandelles visibles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    total: usize,
    start: usize,
    len: usize,
}

impl Viewport {
    /// Fenêtre couvrant toutes les chandelles
    pub fn new(total: usize) -> Self {
        Self {
            total,
            start: 0,
            len: total,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index de fin (exclu)
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Vérifie si la fenêtre couvre toutes les données
    pub fn is_full(&self) -> bool {
        self.start == 0 && self.len == self.total
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end()
    }

    fn min_len(&self) -> usize {
        MIN_VISIBLE.min(self.total)
    }

    /// Revient à la vue complète
    pub fn reset(&mut self) {
        *self = Self::new(self.total);
    }

    /// Zoom avant, centré sur `anchor` (index absolu de chandelle)
    pub fn zoom_in(&mut self, anchor: Option<usize>) {
        let step = ((self.len as f64 * ZOOM_SPEED).round() as usize).max(1);
        let new_len = self.len.saturating_sub(step).max(self.min_len());
        self.resize(new_len, anchor);
    }

    /// Zoom arrière, centré sur `anchor`
    pub fn zoom_out(&mut self, anchor: Option<usize>) {
        let step = ((self.len as f64 * ZOOM_SPEED).round() as usize).max(1);
        let new_len = (self.len + step).min(self.total);
        self.resize(new_len, anchor);
    }

    /// Change la largeur en gardant l'ancre à la même position relative
    ///
    /// Sans ancre (ou ancre hors fenêtre) : zoom centré.
    fn resize(&mut self, new_len: usize, anchor: Option<usize>) {
        if self.total == 0 || new_len == self.len {
            return;
        }

        let anchor = anchor
            .filter(|a| self.contains(*a))
            .unwrap_or(self.start + self.len / 2);

        let ratio = (anchor - self.start) as f64 / self.len as f64;
        let offset = (ratio * new_len as f64).round() as usize;
        let start = anchor.saturating_sub(offset);

        self.len = new_len;
        self.start = start.min(self.total - new_len);
    }

    /// Déplace la fenêtre de `delta` chandelles (négatif = vers la gauche)
    pub fn pan(&mut self, delta: isize) {
        let max_start = self.total - self.len;
        let start = self.start as isize + delta;
        self.start = start.clamp(0, max_start as isize) as usize;
    }

    /// Pas de déplacement : 10% de la fenêtre, au moins 1 chandelle
    pub fn pan_step(&self) -> usize {
        ((self.len as f64 * ZOOM_SPEED).round() as usize).max(1)
    }
}
