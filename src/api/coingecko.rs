// ============================================================================
// API Client : CoinGecko
// ============================================================================
// Récupère les prix des cryptomonnaies depuis l'endpoint `/coins/markets`
//
// CONCEPTS RUST AVANCÉS :
// 1. async/await : programmation asynchrone (non-bloquante)
// 2. Result<T, E> : gestion d'erreurs avec contexte
// 3. Serde : désérialisation JSON automatique
// ============================================================================

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use crate::api::MarketSource;
use crate::config::Config;
use crate::models::AssetRecord;

/// Client HTTP pour CoinGecko
///
/// Le client reqwest est créé une seule fois et réutilisé (pool de connexions).
pub struct CoinGeckoClient {
    client: reqwest::Client,
    url: String,
}

impl CoinGeckoClient {
    /// Crée le client à partir de la configuration
    ///
    /// Le timeout de requête est explicite : une requête bloquée ne doit pas
    /// figer la cadence de rafraîchissement.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("coinboard/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            .build()
            .context("Échec de la création du client HTTP")?;

        Ok(Self {
            client,
            url: build_markets_url(&config.api_base_url, &config.currency, config.page_size),
        })
    }

    /// URL complète appelée à chaque rafraîchissement
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl MarketSource for CoinGeckoClient {
    /// CONCEPT RUST : #[instrument]
    /// - Macro tracing qui ajoute automatiquement un span
    /// - Tous les logs à l'intérieur auront le contexte de l'URL
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_markets(&self) -> Result<Vec<AssetRecord>> {
        debug!("Sending HTTP request to CoinGecko");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Échec de la requête HTTP vers CoinGecko")?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        // Vérifie que la réponse est un succès HTTP (200-299)
        // CoinGecko renvoie 429 quand la limite de débit est dépassée
        if !status.is_success() {
            error!(status = %status, "CoinGecko returned error status");
            anyhow::bail!("CoinGecko a retourné une erreur : HTTP {}", status);
        }

        let records: Vec<AssetRecord> = response
            .json()
            .await
            .context("Échec du parsing JSON de la réponse CoinGecko")?;

        let records = dedup_by_id(records);
        info!(assets = records.len(), "Successfully fetched market data");
        Ok(records)
    }
}

/// Construit l'URL `/coins/markets`
///
/// - order=market_cap_desc : ordre par défaut du tableau
/// - sparkline=false : pas de séries historiques
/// - price_change_percentage=24h : inclut la variation 24h
fn build_markets_url(base_url: &str, currency: &str, page_size: u32) -> String {
    format!(
        "{}/coins/markets?vs_currency={}&order=market_cap_desc&per_page={}&page=1&sparkline=false&price_change_percentage=24h",
        base_url.trim_end_matches('/'),
        currency,
        page_size
    )
}

/// Garde la première occurrence de chaque id
///
/// L'id est la clé de toutes les recherches, un doublon rendrait la
/// réconciliation ambiguë.
fn dedup_by_id(records: Vec<AssetRecord>) -> Vec<AssetRecord> {
    let total = records.len();
    let mut seen = HashSet::with_capacity(total);
    let unique: Vec<AssetRecord> = records
        .into_iter()
        .filter(|record| seen.insert(record.id.clone()))
        .collect();

    if unique.len() != total {
        warn!(
            duplicates = total - unique.len(),
            "Duplicate asset ids in response, kept first occurrence"
        );
    }
    unique
}

// ============================================================================
// Tests unitaires
// ============================================================================
