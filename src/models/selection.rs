// ============================================================================
// Structures : SelectionEntry et Selection
// ============================================================================
// La sélection est l'ensemble ordonné des actifs épinglés dans le panneau
// de comparaison (5 au maximum)
//
// CONCEPTS RUST :
// 1. Projection : SelectionEntry ne garde que ce qui est utile hors ligne
// 2. Invariants encapsulés : le Vec est privé, on ne peut le modifier
//    que via toggle()/remove() qui garantissent taille <= 5 et pas de doublon
// 3. Enum de résultat : l'appelant sait exactement ce qui s'est passé
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::AssetRecord;

/// Nombre maximum d'actifs dans le panneau de comparaison
pub const MAX_SELECTION: usize = 5;

/// Projection réduite et persistée d'un actif épinglé
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionEntry {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub image: String,
}

impl From<&AssetRecord> for SelectionEntry {
    fn from(record: &AssetRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            symbol: record.symbol.clone(),
            image: record.image.clone(),
        }
    }
}

/// Résultat d'un toggle sur la sélection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// L'actif a été ajouté en fin de liste
    Added(SelectionEntry),

    /// L'actif était déjà sélectionné, il a été retiré
    Removed(SelectionEntry),

    /// Ajout refusé : la sélection est pleine
    LimitReached,
}

/// Ensemble ordonné des actifs épinglés
///
/// L'ordre d'insertion est l'ordre d'affichage du panneau de comparaison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    entries: Vec<SelectionEntry>,
}

impl Selection {
    /// Crée une sélection vide
    pub fn new() -> Self {
        Self::default()
    }

    /// Construit une sélection depuis des entrées persistées
    ///
    /// Les données sur disque peuvent avoir été éditées à la main :
    /// on garde la première occurrence de chaque id et on tronque à MAX_SELECTION.
    pub fn from_entries(entries: Vec<SelectionEntry>) -> Self {
        let total = entries.len();
        let mut selection = Self::new();

        for entry in entries {
            if selection.contains(&entry.id) || selection.is_full() {
                continue;
            }
            selection.entries.push(entry);
        }

        if selection.len() != total {
            warn!(
                loaded = total,
                kept = selection.len(),
                "Persisted selection repaired (duplicates or over limit)"
            );
        }

        selection
    }

    /// Entrées dans l'ordre d'insertion
    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_SELECTION
    }

    /// Vérifie si un id est épinglé
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Ajoute ou retire un actif
    ///
    /// CONCEPT : Toggle idempotent par paire
    /// - toggle(x) puis toggle(x) ramène exactement à l'état initial
    ///   (l'entrée retirée était en dernière position)
    pub fn toggle(&mut self, record: &AssetRecord) -> ToggleOutcome {
        if let Some(removed) = self.remove(&record.id) {
            return ToggleOutcome::Removed(removed);
        }

        if self.is_full() {
            return ToggleOutcome::LimitReached;
        }

        let entry = SelectionEntry::from(record);
        self.entries.push(entry.clone());
        ToggleOutcome::Added(entry)
    }

    /// Retire un actif par id, None s'il n'était pas sélectionné
    pub fn remove(&mut self, id: &str) -> Option<SelectionEntry> {
        let position = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(position))
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
