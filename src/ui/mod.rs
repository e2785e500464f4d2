// ============================================================================
// Module : ui
// ============================================================================
// Gère toute l'interface utilisateur (Terminal User Interface)
// ============================================================================

pub mod dashboard; // Rendu de l'interface principale
pub mod events;    // Gestion des événements clavier
pub mod state;     // Curseurs, focus, saisie, toasts

// Re-exports pour simplifier les imports
pub use dashboard::render;
pub use events::{handle_key, Event, EventHandler};
pub use state::UiState;
