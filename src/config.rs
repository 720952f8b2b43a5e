// ============================================================================
// Configuration
// ============================================================================
// Ordre de priorité (du plus faible au plus fort) :
// 1. Valeurs par défaut
// 2. Fichier TOML (--config, sinon <config_dir>/tradechart/config.toml)
// 3. Variables d'environnement TRADECHART_*
// 4. Options de la ligne de commande (appliquées dans main.rs)
//
// Un fichier partiel est accepté : chaque champ absent garde son défaut.
// ============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Nom du fichier de configuration dans le répertoire de config utilisateur
const CONFIG_FILE: &str = "config.toml";

/// Sous-répertoire de l'application dans dirs::config_dir()
const APP_DIR: &str = "tradechart";

/// 50 MiB
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL du backend utilisée par le viewer
    pub backend_url: String,

    /// Adresse d'écoute du serveur
    pub bind: String,

    /// Origines autorisées par CORS ("*" = toutes)
    pub allowed_origins: Vec<String>,

    /// Taille maximale d'une requête d'upload
    pub max_upload_bytes: usize,

    /// Répertoire des fichiers de logs du viewer
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            bind: "0.0.0.0:8000".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl Config {
    /// Charge la configuration
    ///
    /// Un chemin explicite doit exister ; le fichier par défaut est optionnel.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Lit un fichier TOML
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;

        debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Surcharge par les variables d'environnement
    ///
    /// `lookup` est std::env::var en production, une table en test.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("TRADECHART_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(bind) = lookup("TRADECHART_BIND") {
            self.bind = bind;
        }
        if let Some(dir) = lookup("TRADECHART_LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
    }
}

/// <config_dir>/tradechart/config.toml (None si la plateforme n'en a pas)
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

// ============================================================================
// Tests unitaires
// ============================================================================
