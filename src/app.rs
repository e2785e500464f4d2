// ============================================================================
// Structure : App
// ============================================================================
// Contrôleur de l'application : possède tout l'état du tableau de bord
//
// CONCEPTS RUST :
// 1. State Management : centraliser l'état dans une seule structure
// 2. Mutabilité contrôlée : &mut self pour modifier l'état
// 3. Encapsulation : les champs sont privés, accès via méthodes publiques
//
// PATTERN : Command / Query
// - Le renderer lit l'état via des accesseurs (&self)
// - Il renvoie les actions utilisateur sous forme de Command typées
// - Le scheduler envoie des SchedulerEvent
// - Aucune dépendance au terminal : testable sans UI
// ============================================================================

use chrono::Utc;
use tracing::{debug, error, info};

use crate::dataset::{self, ComparisonRow, DataSet, SortMode};
use crate::models::{AssetRecord, PreferenceFlag, PreferenceSet, Selection, ToggleOutcome, MAX_SELECTION};
use crate::scheduler::{whole_seconds, FetchOutcome, LoadingPhase, SchedulerEvent};
use crate::storage::{KeyValueStore, PreferenceStore, SelectionStore};

// ============================================================================
// Notifications
// ============================================================================

/// Gravité d'une notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// Message destiné à l'utilisateur (toast)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { message: message.into(), severity: Severity::Info }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { message: message.into(), severity: Severity::Success }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { message: message.into(), severity: Severity::Error }
    }
}

// ============================================================================
// Commandes du renderer
// ============================================================================

/// Actions utilisateur envoyées par le renderer
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Clic (Entrée) sur un actif de la liste : épingle / désépingle
    AssetClicked(String),

    /// Recherche validée
    SearchSubmitted(String),

    /// Nouveau mode de tri
    SortSelected(SortMode),

    /// Bascule d'une préférence
    PreferenceToggled(PreferenceFlag),

    /// Retrait depuis le panneau de comparaison
    ComparisonRemoveClicked(String),
}

/// Dernier échec de fetch (pour le message bloquant ou la bannière)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub error: String,
    pub retry_in_secs: u64,

    /// Nombre d'échecs consécutifs
    pub streak: u32,

    /// Backoff au plafond
    pub at_ceiling: bool,
}

// ============================================================================
// App
// ============================================================================

/// État principal de l'application
pub struct App {
    /// Dernier snapshot du marché
    data: DataSet,

    /// Actifs épinglés (ordre d'insertion)
    selection: Selection,

    /// Préférences d'affichage
    preferences: PreferenceSet,

    /// Terme de recherche validé (vide = pas de filtre)
    search_term: String,

    /// Mode de tri courant (non persisté)
    sort_mode: SortMode,

    /// Phase de chargement signalée par le scheduler
    phase: LoadingPhase,

    /// Dernier échec, effacé au prochain succès
    last_failure: Option<FetchFailure>,

    /// File de notifications, vidée par le renderer
    notices: Vec<Notice>,

    /// Stockage clé-valeur (sélection + préférences)
    store: Box<dyn KeyValueStore>,
}

impl App {
    /// Crée l'App en lisant la sélection et les préférences persistées
    ///
    /// Lecture unique au démarrage, avant le premier rendu.
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let preferences = PreferenceStore::load(store.as_ref());
        let selection = SelectionStore::load(store.as_ref());
        info!(pinned = selection.len(), ?preferences, "State loaded from storage");

        Self {
            data: DataSet::new(),
            selection,
            preferences,
            search_term: String::new(),
            sort_mode: SortMode::default(),
            phase: LoadingPhase::Idle,
            last_failure: None,
            notices: Vec::new(),
            store,
        }
    }

    // ========================================================================
    // Lecture de l'état (pour le renderer)
    // ========================================================================

    pub fn data_set(&self) -> &DataSet {
        &self.data
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn preferences(&self) -> &PreferenceSet {
        &self.preferences
    }

    pub fn dark_mode(&self) -> bool {
        self.preferences.dark_mode
    }

    pub fn loading_phase(&self) -> LoadingPhase {
        self.phase
    }

    pub fn last_failure(&self) -> Option<&FetchFailure> {
        self.last_failure.as_ref()
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    /// Liste principale : recherche puis tri sur le snapshot courant
    ///
    /// Le tri s'applique à la vue filtrée, il ne réinitialise pas la recherche.
    pub fn visible_assets(&self) -> Vec<&AssetRecord> {
        let filtered = dataset::search(self.data.records(), &self.search_term);
        dataset::sort(filtered, self.sort_mode)
    }

    /// Lignes du panneau de comparaison, dans l'ordre de la sélection
    pub fn comparison_rows(&self) -> Vec<ComparisonRow<'_>> {
        dataset::reconcile(&self.selection, &self.data)
    }

    /// Vide et retourne les notifications en attente
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // ========================================================================
    // Commandes
    // ========================================================================

    /// Point d'entrée unique des actions utilisateur
    pub fn handle(&mut self, command: Command) {
        debug!(?command, "Handling command");
        match command {
            Command::AssetClicked(id) => self.toggle_selection(&id),
            Command::SearchSubmitted(term) => self.submit_search(&term),
            Command::SortSelected(mode) => self.select_sort(mode),
            Command::PreferenceToggled(flag) => self.toggle_preference(flag),
            Command::ComparisonRemoveClicked(id) => self.remove_from_comparison(&id),
        }
    }

    /// Épingle ou désépingle un actif
    ///
    /// - Déjà épinglé : retiré (même s'il n'est plus dans le snapshot)
    /// - Sélection pleine : refus, aucun changement, notification d'erreur
    /// - Sinon : ajouté en fin de panneau
    pub fn toggle_selection(&mut self, id: &str) {
        let outcome = if let Some(removed) = self.selection.remove(id) {
            ToggleOutcome::Removed(removed)
        } else {
            let record = match self.data.get(id) {
                Some(record) => record,
                None => {
                    debug!(id, "Toggle ignored: asset not in current snapshot");
                    return;
                }
            };
            self.selection.toggle(record)
        };

        match outcome {
            ToggleOutcome::Added(entry) => {
                info!(id = %entry.id, pinned = self.selection.len(), "Asset pinned");
                self.notify(Notice::success(format!("{} added to comparison", entry.name)));
            }
            ToggleOutcome::Removed(entry) => {
                info!(id = %entry.id, pinned = self.selection.len(), "Asset unpinned");
                self.notify(Notice::info(format!("{} removed from comparison", entry.name)));
            }
            ToggleOutcome::LimitReached => {
                info!(id, "Pin rejected: selection full");
                self.notify(Notice::error(format!(
                    "You can compare at most {} assets",
                    MAX_SELECTION
                )));
                return;
            }
        }

        self.persist_selection();
    }

    /// Retire un actif du panneau de comparaison (no-op s'il n'y est pas)
    pub fn remove_from_comparison(&mut self, id: &str) {
        let Some(entry) = self.selection.remove(id) else {
            debug!(id, "Remove ignored: asset not pinned");
            return;
        };

        info!(id = %entry.id, pinned = self.selection.len(), "Asset removed from comparison");
        self.notify(Notice::info(format!("{} removed from comparison", entry.name)));
        self.persist_selection();
    }

    /// Modifie une préférence, persiste l'ensemble, re-rendu complet
    pub fn set_preference(&mut self, flag: PreferenceFlag, value: bool) {
        self.preferences.set(flag, value);
        info!(flag = flag.label(), value, "Preference changed");

        if let Err(e) = PreferenceStore::save(self.store.as_mut(), &self.preferences) {
            error!(error = ?e, "Failed to persist preferences");
            self.notify(Notice::error("Could not save preferences"));
        }
    }

    pub fn toggle_preference(&mut self, flag: PreferenceFlag) {
        let value = !self.preferences.get(flag);
        self.set_preference(flag, value);
    }

    /// Enregistre un nouveau terme de recherche
    pub fn submit_search(&mut self, term: &str) {
        self.search_term = term.trim().to_string();
        debug!(term = %self.search_term, "Search submitted");
    }

    pub fn select_sort(&mut self, mode: SortMode) {
        self.sort_mode = mode;
        debug!(?mode, "Sort selected");
    }

    // ========================================================================
    // Événements du scheduler
    // ========================================================================

    pub fn apply_scheduler_event(&mut self, event: SchedulerEvent) {
        match event {
            SchedulerEvent::FetchStarted(phase) => self.phase = phase,
            SchedulerEvent::Finished(outcome) => self.apply_outcome(outcome),
        }
    }

    /// Applique le résultat d'une invocation du scheduler
    ///
    /// CONCEPT : Pas de données partielles
    /// - Fetched : remplacement complet du snapshot
    /// - Failed : l'ancien snapshot est conservé tel quel
    pub fn apply_outcome(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Deferred { wait } => {
                self.notify(Notice::info(format!(
                    "Rate limit: next update in {}s",
                    whole_seconds(wait)
                )));
            }
            FetchOutcome::Fetched(records) => {
                info!(assets = records.len(), "Data set replaced");
                self.data.replace(records, Utc::now());
                self.last_failure = None;
                self.phase = LoadingPhase::Idle;
            }
            FetchOutcome::Failed {
                error,
                retry_in,
                streak,
                at_ceiling,
            } => {
                let retry_in_secs = whole_seconds(retry_in);
                self.notify(Notice::error(format!(
                    "Failed to fetch market data, retrying in {}s",
                    retry_in_secs
                )));
                self.last_failure = Some(FetchFailure {
                    error,
                    retry_in_secs,
                    streak,
                    at_ceiling,
                });
                self.phase = LoadingPhase::Idle;
            }
        }
    }

    // ========================================================================
    // Helpers privés
    // ========================================================================

    fn notify(&mut self, notice: Notice) {
        debug!(severity = ?notice.severity, message = %notice.message, "Notice");
        self.notices.push(notice);
    }

    fn persist_selection(&mut self) {
        if let Err(e) = SelectionStore::save(self.store.as_mut(), &self.selection) {
            error!(error = ?e, "Failed to persist selection");
            self.notify(Notice::error("Could not save selection"));
        }
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::api::testing::ScriptedSource;
    use crate::scheduler::Scheduler;
    use crate::storage::{FileStore, MemoryStore};

    fn market() -> Vec<AssetRecord> {
        vec![
            AssetRecord::new("bitcoin", "Bitcoin", "btc").with_price(67000.0).with_market_cap(1.3e12).with_change(1.0),
            AssetRecord::new("ethereum", "Ethereum", "eth").with_price(3500.0).with_market_cap(4.2e11).with_change(-3.0),
            AssetRecord::new("tether", "Tether", "usdt").with_price(1.0).with_market_cap(1.1e11),
            AssetRecord::new("solana", "Solana", "sol").with_price(150.0).with_market_cap(7.0e10).with_change(5.0),
            AssetRecord::new("ripple", "XRP", "xrp").with_price(0.52).with_market_cap(2.9e10),
            AssetRecord::new("dogecoin", "Dogecoin", "doge").with_price(0.12).with_market_cap(1.7e10),
        ]
    }

    fn loaded_app() -> App {
        let mut app = App::load(Box::new(MemoryStore::new()));
        app.apply_outcome(FetchOutcome::Fetched(market()));
        app.take_notices();
        app
    }

    /// Stockage dont toutes les écritures échouent
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        fn set(&mut self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("coinboard-app-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_toggle_selection_notifies() {
        let mut app = loaded_app();

        app.handle(Command::AssetClicked("bitcoin".to_string()));
        assert!(app.is_selected("bitcoin"));
        assert_eq!(app.take_notices(), vec![Notice::success("Bitcoin added to comparison")]);

        app.handle(Command::AssetClicked("bitcoin".to_string()));
        assert!(!app.is_selected("bitcoin"));
        assert_eq!(app.take_notices()[0].severity, Severity::Info);
    }

    #[test]
    fn test_sixth_pin_is_rejected() {
        let mut app = loaded_app();
        for id in ["bitcoin", "ethereum", "tether", "solana", "ripple"] {
            app.toggle_selection(id);
        }
        app.take_notices();
        let before = app.selection().clone();

        app.toggle_selection("dogecoin");

        assert_eq!(app.selection(), &before);
        assert_eq!(app.selection().len(), MAX_SELECTION);
        let notices = app.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, Severity::Error);
    }

    #[test]
    fn test_toggle_twice_restores_selection() {
        let mut app = loaded_app();
        app.toggle_selection("ethereum");
        let before = app.selection().clone();

        app.toggle_selection("solana");
        app.toggle_selection("solana");

        assert_eq!(app.selection(), &before);
    }

    #[test]
    fn test_toggle_unknown_asset_is_ignored() {
        let mut app = loaded_app();
        app.toggle_selection("not-a-coin");
        assert!(app.selection().is_empty());
        assert!(app.take_notices().is_empty());
    }

    #[test]
    fn test_remove_from_comparison() {
        let mut app = loaded_app();
        app.toggle_selection("bitcoin");
        app.take_notices();

        app.handle(Command::ComparisonRemoveClicked("bitcoin".to_string()));
        assert!(app.selection().is_empty());
        assert_eq!(app.take_notices(), vec![Notice::info("Bitcoin removed from comparison")]);

        // Deuxième retrait : no-op silencieux
        app.handle(Command::ComparisonRemoveClicked("bitcoin".to_string()));
        assert!(app.take_notices().is_empty());
    }

    #[test]
    fn test_selection_change_stands_when_save_fails() {
        let mut app = App::load(Box::new(ReadOnlyStore));
        app.apply_outcome(FetchOutcome::Fetched(market()));

        app.toggle_selection("bitcoin");

        assert!(app.is_selected("bitcoin"));
        assert_eq!(
            app.take_notices(),
            vec![
                Notice::success("Bitcoin added to comparison"),
                Notice::error("Could not save selection"),
            ]
        );

        app.remove_from_comparison("bitcoin");
        assert!(app.selection().is_empty());
        assert_eq!(app.take_notices()[1], Notice::error("Could not save selection"));
    }

    #[test]
    fn test_preference_change_stands_when_save_fails() {
        let mut app = App::load(Box::new(ReadOnlyStore));

        app.handle(Command::PreferenceToggled(PreferenceFlag::DarkMode));

        assert!(app.dark_mode());
        assert_eq!(app.take_notices(), vec![Notice::error("Could not save preferences")]);
    }

    #[test]
    fn test_failure_streak_comes_from_outcome() {
        let mut app = loaded_app();
        app.apply_outcome(FetchOutcome::Failed {
            error: "HTTP 503".to_string(),
            retry_in: Duration::from_secs(600),
            streak: 5,
            at_ceiling: true,
        });

        let failure = app.last_failure().cloned();
        assert_eq!(
            failure,
            Some(FetchFailure {
                error: "HTTP 503".to_string(),
                retry_in_secs: 600,
                streak: 5,
                at_ceiling: true,
            })
        );
        // Les données précédentes restent affichées
        assert_eq!(app.data_set().len(), market().len());
    }

    #[test]
    fn test_search_then_sort_composes() {
        let mut app = loaded_app();
        app.handle(Command::SearchSubmitted("  E ".to_string()));
        app.handle(Command::SortSelected(SortMode::PriceAsc));

        let ids: Vec<&str> = app.visible_assets().iter().map(|r| r.id.as_str()).collect();
        // Contiennent "e" : Ethereum, Tether, Dogecoin ; triés par prix croissant
        assert_eq!(ids, vec!["dogecoin", "tether", "ethereum"]);
        assert_eq!(app.search_term(), "E");

        app.handle(Command::SearchSubmitted(String::new()));
        assert_eq!(app.visible_assets().len(), market().len());
    }

    #[test]
    fn test_preferences_and_selection_survive_restart() {
        let dir = temp_dir("restart");
        {
            let mut app = App::load(Box::new(FileStore::new(&dir)));
            app.apply_outcome(FetchOutcome::Fetched(market()));
            app.toggle_selection("solana");
            app.toggle_selection("bitcoin");
            app.handle(Command::PreferenceToggled(PreferenceFlag::DarkMode));
            app.set_preference(PreferenceFlag::ShowVolume, true);
        }

        let app = App::load(Box::new(FileStore::new(&dir)));
        assert!(app.dark_mode());
        assert!(app.preferences().show_volume);
        assert!(!app.preferences().show_change);

        // Avant le premier fetch : entrées affichées en attente, dans l'ordre
        let rows = app.comparison_rows();
        let ids: Vec<&str> = rows.iter().map(|r| r.entry().id.as_str()).collect();
        assert_eq!(ids, vec!["solana", "bitcoin"]);
        assert!(rows.iter().all(|r| r.record().is_none()));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_phase_signals() {
        let mut app = App::load(Box::new(MemoryStore::new()));
        app.apply_scheduler_event(SchedulerEvent::FetchStarted(LoadingPhase::InitialBlocking));
        assert_eq!(app.loading_phase(), LoadingPhase::InitialBlocking);

        app.apply_scheduler_event(SchedulerEvent::Finished(FetchOutcome::Fetched(market())));
        assert_eq!(app.loading_phase(), LoadingPhase::Idle);
        assert!(app.data_set().has_loaded());
    }

    // ========================================================================
    // Bout en bout : scheduler + App
    // ========================================================================

    #[tokio::test]
    async fn test_two_failures_keep_previous_data() {
        let source = ScriptedSource::new()
            .then_ok(market())
            .then_err("connection reset")
            .then_err("HTTP 503");
        let mut scheduler = Scheduler::default();
        let mut app = App::load(Box::new(MemoryStore::new()));
        let mut now = Instant::now();

        for _ in 0..3 {
            let invocation = scheduler.invoke(&source, now).await;
            now += invocation.next_delay;
            app.apply_outcome(invocation.outcome);
        }

        assert_eq!(source.calls(), 3);
        assert_eq!(app.data_set().len(), market().len());
        assert!(app.data_set().get("bitcoin").is_some());

        let notices = app.take_notices();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.severity == Severity::Error));
        assert_eq!(app.last_failure().map(|f| f.streak), Some(2));
    }

    #[tokio::test]
    async fn test_two_failures_without_data_stay_empty() {
        let source = ScriptedSource::new().then_err("dns").then_err("dns");
        let mut scheduler = Scheduler::default();
        let mut app = App::load(Box::new(MemoryStore::new()));
        let mut now = Instant::now();

        for _ in 0..2 {
            let invocation = scheduler.invoke(&source, now).await;
            now += invocation.next_delay;
            app.apply_outcome(invocation.outcome);
        }

        assert!(app.data_set().is_empty());
        assert!(!app.data_set().has_loaded());
        assert_eq!(app.take_notices().len(), 2);
    }

    #[tokio::test]
    async fn test_invocations_too_close_emit_one_deferral() {
        let source = ScriptedSource::new().then_ok(market()).then_ok(market());
        let mut scheduler = Scheduler::default();
        let mut app = App::load(Box::new(MemoryStore::new()));
        let start = Instant::now();

        let first = scheduler.invoke(&source, start).await;
        app.apply_outcome(first.outcome);
        let second = scheduler.invoke(&source, start + Duration::from_millis(59_999)).await;
        app.apply_outcome(second.outcome);

        assert_eq!(source.calls(), 1);
        assert_eq!(app.take_notices(), vec![Notice::info("Rate limit: next update in 1s")]);
    }

    #[tokio::test]
    async fn test_success_after_failure_clears_error() {
        let source = ScriptedSource::new().then_err("boom").then_ok(market());
        let mut scheduler = Scheduler::default();
        let mut app = App::load(Box::new(MemoryStore::new()));
        let start = Instant::now();

        let invocation = scheduler.invoke(&source, start).await;
        app.apply_outcome(invocation.outcome);
        assert!(app.last_failure().is_some());

        let invocation = scheduler.invoke(&source, start + Duration::from_secs(60)).await;
        app.apply_outcome(invocation.outcome);
        assert!(app.last_failure().is_none());
        assert_eq!(app.data_set().len(), market().len());
    }
}
