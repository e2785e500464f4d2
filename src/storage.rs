// ============================================================================
// Stockage clé-valeur persistant
// ============================================================================
// Persiste la sélection et les préférences entre deux sessions
//
// CONCEPTS RUST :
// 1. Trait comme interface : KeyValueStore cache le support (fichier, mémoire)
// 2. Box<dyn Trait> : l'App ne connaît pas l'implémentation concrète
// 3. Generics + serde : un seul couple load/save pour tous les types
// ============================================================================

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{PreferenceSet, Selection, SelectionEntry};

// ============================================================================
// Trait KeyValueStore
// ============================================================================

/// Stockage clé-valeur de texte
///
/// Chaque écriture remplace la valeur complète de la clé.
pub trait KeyValueStore: Send {
    /// Lit la valeur d'une clé, None si absente
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Écrit (remplace) la valeur d'une clé
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

// ============================================================================
// FileStore : un fichier JSON par clé
// ============================================================================

/// Stockage sur disque : `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let value = std::fs::read_to_string(&path)
            .with_context(|| format!("Échec de la lecture de {}", path.display()))?;
        Ok(Some(value))
    }

    /// Écrit dans un fichier temporaire puis renomme
    ///
    /// CONCEPT : Écriture atomique
    /// - rename() est atomique sur un même système de fichiers
    /// - Un crash pendant l'écriture laisse l'ancienne valeur intacte
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Échec de la création de {}", self.dir.display()))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        std::fs::write(&tmp, value)
            .with_context(|| format!("Échec de l'écriture de {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Échec du renommage vers {}", path.display()))?;

        debug!(key, path = %path.display(), "Value persisted");
        Ok(())
    }
}

// ============================================================================
// MemoryStore : pour les tests et le mode sans disque
// ============================================================================

/// Stockage en mémoire (perdu à la fin du processus)
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// Helpers JSON
// ============================================================================

/// Lit et désérialise une clé
fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => {
            let value = serde_json::from_str(&raw)
                .with_context(|| format!("Valeur invalide pour la clé '{}'", key))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Sérialise et écrit une clé
fn save_json<T: Serialize + ?Sized>(store: &mut dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)
        .with_context(|| format!("Échec de la sérialisation de '{}'", key))?;
    store.set(key, &raw)
}

// ============================================================================
// PreferenceStore et SelectionStore
// ============================================================================
// CONCEPT : Lecture tolérante
// - Clé absente -> valeurs par défaut
// - Valeur corrompue -> warn! et valeurs par défaut (l'app doit démarrer)
// - Écriture : l'erreur remonte, l'appelant décide quoi en faire
// ============================================================================

/// Persistance du PreferenceSet
pub struct PreferenceStore;

impl PreferenceStore {
    pub const KEY: &'static str = "preferences";

    pub fn load(store: &dyn KeyValueStore) -> PreferenceSet {
        match load_json::<PreferenceSet>(store, Self::KEY) {
            Ok(Some(prefs)) => prefs,
            Ok(None) => PreferenceSet::default(),
            Err(e) => {
                warn!(error = ?e, "Failed to load preferences, using defaults");
                PreferenceSet::default()
            }
        }
    }

    pub fn save(store: &mut dyn KeyValueStore, prefs: &PreferenceSet) -> Result<()> {
        save_json(store, Self::KEY, prefs)
    }
}

/// Persistance de la Selection (liste ordonnée de SelectionEntry)
pub struct SelectionStore;

impl SelectionStore {
    pub const KEY: &'static str = "selected_assets";

    pub fn load(store: &dyn KeyValueStore) -> Selection {
        match load_json::<Vec<SelectionEntry>>(store, Self::KEY) {
            Ok(Some(entries)) => Selection::from_entries(entries),
            Ok(None) => Selection::new(),
            Err(e) => {
                warn!(error = ?e, "Failed to load selection, starting empty");
                Selection::new()
            }
        }
    }

    pub fn save(store: &mut dyn KeyValueStore, selection: &Selection) -> Result<()> {
        save_json(store, Self::KEY, selection.entries())
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
