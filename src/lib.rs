// ============================================================================
// CoinBoard - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod api;       // API CoinGecko
pub mod app;       // Contrôleur : état + commandes
pub mod config;    // Configuration
pub mod dataset;   // Snapshot, recherche, tri, réconciliation
pub mod format;    // Formatage des prix et grandeurs
pub mod models;    // Structures de données
pub mod scheduler; // Cadence des appels API
pub mod storage;   // Persistance clé-valeur
pub mod ui;        // Interface utilisateur
