// ============================================================================
// Configuration
// ============================================================================
// Paramètres de l'application : endpoint, devise, cadence de rafraîchissement,
// emplacement du stockage local
//
// Chargée depuis un fichier optionnel `config.json` dans le répertoire de
// données. Sans fichier, les valeurs par défaut s'appliquent.
// ============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

/// Taille maximale d'une page `/coins/markets`
pub const MAX_PAGE_SIZE: u32 = 100;

/// Nom du fichier de configuration dans le répertoire de données
pub const CONFIG_FILE: &str = "config.json";

/// Configuration de l'application
///
/// CONCEPT RUST : #[serde(default)]
/// - Chaque champ absent du JSON reprend la valeur de Config::default()
/// - Un fichier `{"currency": "eur"}` suffit pour changer la devise
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL de base de l'API CoinGecko
    pub api_base_url: String,

    /// Devise de référence (une seule par exécution)
    pub currency: String,

    /// Nombre d'actifs demandés (1..=100)
    pub page_size: u32,

    /// Intervalle minimum entre deux appels, en secondes
    pub min_interval_secs: u64,

    /// Plafond du backoff après échecs consécutifs, en secondes
    pub max_backoff_secs: u64,

    /// Timeout d'une requête HTTP, en secondes
    pub request_timeout_secs: u64,

    /// Répertoire du stockage clé-valeur (sélection, préférences)
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.coingecko.com/api/v3".to_string(),
            currency: "usd".to_string(),
            page_size: MAX_PAGE_SIZE,
            min_interval_secs: 60,
            max_backoff_secs: 600,
            request_timeout_secs: 15,
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    /// Charge la configuration depuis le répertoire de données par défaut
    pub fn load() -> Result<Self> {
        Self::load_from(&default_data_dir().join(CONFIG_FILE))
    }

    /// Charge la configuration depuis un fichier précis
    ///
    /// - Fichier absent : valeurs par défaut
    /// - Fichier invalide : erreur avec contexte (on ne devine pas)
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(?path, "No config file, using defaults");
            return Ok(Self::default().normalized());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Échec de la lecture de {}", path.display()))?;

        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Configuration invalide dans {}", path.display()))?;

        info!(?path, "Configuration loaded");
        Ok(config.normalized())
    }

    /// Ramène les valeurs dans des bornes utilisables
    fn normalized(mut self) -> Self {
        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        self.min_interval_secs = self.min_interval_secs.max(1);
        self.max_backoff_secs = self.max_backoff_secs.max(self.min_interval_secs);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self.currency = self.currency.trim().to_lowercase();
        self
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Répertoire de données cross-platform
///
/// - Linux/WSL : ~/.local/share/coinboard
/// - macOS : ~/Library/Application Support/coinboard
/// - Windows : C:\Users\<user>\AppData\Roaming\coinboard
/// - Sinon : ./.coinboard
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("coinboard"))
        .unwrap_or_else(|| PathBuf::from(".coinboard"))
}

// ============================================================================
// Tests unitaires
// ============================================================================
