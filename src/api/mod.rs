// ============================================================================
// Module : api
// ============================================================================
// Ce module contient le client de l'API de marché (CoinGecko) et le trait
// qui permet au scheduler de ne pas dépendre d'une source concrète
// ============================================================================

use anyhow::Result;
use async_trait::async_trait;

use crate::models::AssetRecord;

pub mod coingecko; // Client API CoinGecko

// Re-export du client principal
pub use coingecko::CoinGeckoClient;

/// Source de données de marché
///
/// CONCEPT RUST : async_trait
/// - Les méthodes async dans un trait passent par la macro async_trait
/// - Permet d'injecter une fausse source dans les tests du scheduler
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Récupère une page d'actifs triés par capitalisation décroissante
    ///
    /// Toute erreur (réseau, timeout, statut HTTP, JSON) est un échec uniforme.
    async fn fetch_markets(&self) -> Result<Vec<AssetRecord>>;
}

// ============================================================================
// Source scriptée pour les tests
// ============================================================================
