// ============================================================================
// Module : models
// ============================================================================
// Ce module contient toutes les structures de données de l'application
//
// CONCEPT RUST : Modules et visibilité
// - "pub mod" : déclare un sous-module publique (accessible depuis l'extérieur)
// - Sans "pub", le module serait privé au crate
// ============================================================================

pub mod asset;       // Snapshot de marché d'un actif (fichier asset.rs)
pub mod preferences; // Drapeaux d'affichage persistés
pub mod selection;   // Actifs épinglés pour la comparaison

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use coinboard::models::asset::AssetRecord;
// On peut faire : use coinboard::models::AssetRecord;
pub use asset::AssetRecord;
pub use preferences::{PreferenceFlag, PreferenceSet};
pub use selection::{Selection, SelectionEntry, ToggleOutcome, MAX_SELECTION};
