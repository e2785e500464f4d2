// ============================================================================
// Structure : AssetRecord
// ============================================================================
// Représente une cryptomonnaie telle que renvoyée par l'API de marché
//
// CONCEPTS RUST :
// 1. #[derive(...)] : génère automatiquement l'implémentation de traits
//    - Deserialize : construit la structure depuis le JSON de l'API
//    - Serialize : utile pour les fixtures de test et le debug
//
// 2. Option<f64> pour les champs numériques :
//    - L'API renvoie parfois null (ex: variation 24h d'un actif récent)
//    - None est explicite et type-safe, pas de coercition implicite
// ============================================================================

use serde::{Deserialize, Deserializer, Serialize};

/// Snapshot de marché d'un actif (lecture seule pour l'application)
///
/// Les noms de champs correspondent exactement au JSON de `/coins/markets`,
/// serde peut donc désérialiser sans `rename`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Identifiant stable et unique dans un snapshot (ex: "bitcoin")
    pub id: String,

    /// Nom affiché (ex: "Bitcoin")
    pub name: String,

    /// Symbole (ex: "btc")
    pub symbol: String,

    /// URL de l'icône (null côté API -> chaîne vide)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image: String,

    /// Prix courant dans la devise de référence
    pub current_price: Option<f64>,

    /// Variation sur 24h en pourcentage (signée)
    pub price_change_percentage_24h: Option<f64>,

    /// Capitalisation
    pub market_cap: Option<f64>,

    /// Volume échangé sur 24h
    pub total_volume: Option<f64>,
}

/// Désérialise une chaîne optionnelle, `null` devient ""
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl AssetRecord {
    /// Crée un enregistrement sans données numériques
    ///
    /// Utilisé surtout par les tests ; les vrais enregistrements viennent de l'API.
    pub fn new(id: &str, name: &str, symbol: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            image: String::new(),
            current_price: None,
            price_change_percentage_24h: None,
            market_cap: None,
            total_volume: None,
        }
    }

    /// Builder : fixe le prix
    pub fn with_price(mut self, price: f64) -> Self {
        self.current_price = Some(price);
        self
    }

    /// Builder : fixe la variation 24h
    pub fn with_change(mut self, change: f64) -> Self {
        self.price_change_percentage_24h = Some(change);
        self
    }

    /// Builder : fixe la capitalisation
    pub fn with_market_cap(mut self, market_cap: f64) -> Self {
        self.market_cap = Some(market_cap);
        self
    }

    /// Builder : fixe le volume 24h
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.total_volume = Some(volume);
        self
    }

    /// Vrai si le nom ou le symbole contient `needle` (déjà en minuscules)
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.symbol.to_lowercase().contains(needle)
    }

    /// Retourne true si l'actif est en hausse sur 24h
    pub fn is_positive(&self) -> bool {
        self.price_change_percentage_24h
            .map(|c| c >= 0.0)
            .unwrap_or(false)
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_coingecko_record() {
        let json = r#"{
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "image": "https://assets.coingecko.com/coins/images/1/large/bitcoin.png",
            "current_price": 67123.5,
            "market_cap": 1320000000000,
            "market_cap_rank": 1,
            "total_volume": 25000000000,
            "price_change_percentage_24h": -1.25,
            "ath": 73000
        }"#;

        let record: AssetRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "bitcoin");
        assert_eq!(record.symbol, "btc");
        assert_eq!(record.current_price, Some(67123.5));
        assert_eq!(record.price_change_percentage_24h, Some(-1.25));
        assert!(!record.is_positive());
    }

    #[test]
    fn test_deserialize_null_fields() {
        let json = r#"{
            "id": "newcoin",
            "symbol": "new",
            "name": "New Coin",
            "image": null,
            "current_price": 0.5,
            "market_cap": null,
            "total_volume": null,
            "price_change_percentage_24h": null
        }"#;

        let record: AssetRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.image, "");
        assert_eq!(record.market_cap, None);
        assert_eq!(record.price_change_percentage_24h, None);

        // Champ image totalement absent
        let json = r#"{"id": "x", "symbol": "x", "name": "X", "current_price": null}"#;
        let record: AssetRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.image, "");
        assert_eq!(record.total_volume, None);
    }

    #[test]
    fn test_matches_name_or_symbol() {
        let record = AssetRecord::new("ethereum", "Ethereum", "ETH");
        assert!(record.matches("eth"));
        assert!(record.matches("reum"));
        assert!(!record.matches("btc"));
    }
}
