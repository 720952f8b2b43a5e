// ============================================================================
// tradechart - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod api;     // Client HTTP du backend
pub mod app;     // État du viewer
pub mod config;  // Configuration (fichier TOML + variables d'environnement)
pub mod ingest;  // Parsing et validation des CSV
pub mod models;  // Structures de données
pub mod sample;  // Génération de fichiers d'exemple
pub mod server;  // Backend HTTP d'ingestion
pub mod ui;      // Interface utilisateur
