// ============================================================================
// Structure : UiState
// ============================================================================
// État propre au terminal : curseurs, focus, saisie de recherche, toasts
//
// L'état métier (données, sélection, préférences) vit dans App ; ici on ne
// garde que ce qui n'a de sens que pour le rendu TUI.
// ============================================================================

use std::time::{Duration, Instant};

use crate::app::Notice;

/// Durée d'affichage d'un toast
pub const TOAST_TTL: Duration = Duration::from_secs(4);

/// Nombre maximum de toasts affichés en même temps
pub const MAX_TOASTS: usize = 3;

/// Écrans de l'application
///
/// CONCEPT RUST : Enums pour state machines
/// - Un seul écran actif à la fois
/// - Le compilateur force à gérer tous les cas (exhaustivité)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Vue principale : liste + panneau de comparaison
    Dashboard,

    /// Mode saisie de la recherche (Enter valide, ESC annule)
    SearchInput,
}

/// Panneau qui reçoit la navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Comparison,
}

/// Notification affichée temporairement
#[derive(Debug, Clone)]
pub struct Toast {
    pub notice: Notice,
    pub expires_at: Instant,
}

/// État du terminal
pub struct UiState {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    pub screen: Screen,
    pub focus: Focus,

    /// Curseur dans la liste principale
    pub list_index: usize,

    /// Curseur dans le panneau de comparaison
    pub comparison_index: usize,

    /// Buffer de saisie de la recherche
    pub input_buffer: String,

    /// Two-step quit pour éviter les sorties accidentelles
    pub confirm_quit: bool,

    /// Toasts visibles, le plus récent en dernier
    pub toasts: Vec<Toast>,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            running: true,
            screen: Screen::Dashboard,
            focus: Focus::List,
            list_index: 0,
            comparison_index: 0,
            input_buffer: String::new(),
            confirm_quit: false,
            toasts: Vec::new(),
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// CONCEPT RUST : Saturating arithmetic
    /// - saturating_sub() ne descend pas en dessous de 0
    pub fn navigate_up(&mut self) {
        let index = self.focused_index_mut();
        *index = index.saturating_sub(1);
    }

    /// `len` : nombre de lignes du panneau focalisé
    pub fn navigate_down(&mut self, len: usize) {
        let max_index = len.saturating_sub(1);
        let index = self.focused_index_mut();
        *index = (*index + 1).min(max_index);
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::List => Focus::Comparison,
            Focus::Comparison => Focus::List,
        };
    }

    /// Ramène les curseurs dans les bornes après un changement de données
    pub fn clamp(&mut self, list_len: usize, comparison_len: usize) {
        self.list_index = self.list_index.min(list_len.saturating_sub(1));
        self.comparison_index = self.comparison_index.min(comparison_len.saturating_sub(1));
    }

    fn focused_index_mut(&mut self) -> &mut usize {
        match self.focus {
            Focus::List => &mut self.list_index,
            Focus::Comparison => &mut self.comparison_index,
        }
    }

    // ========================================================================
    // Saisie de la recherche
    // ========================================================================

    /// Entre en mode saisie, prérempli avec le terme actif
    pub fn start_search(&mut self, current_term: &str) {
        self.screen = Screen::SearchInput;
        self.input_buffer = current_term.to_string();
    }

    pub fn cancel_search(&mut self) {
        self.screen = Screen::Dashboard;
        self.input_buffer.clear();
    }

    /// Récupère la valeur saisie et retourne au dashboard
    pub fn submit_search(&mut self) -> String {
        self.screen = Screen::Dashboard;
        self.list_index = 0;
        std::mem::take(&mut self.input_buffer)
    }

    pub fn append_char(&mut self, c: char) {
        self.input_buffer.push(c);
    }

    pub fn backspace(&mut self) {
        self.input_buffer.pop();
    }

    pub fn is_in_search_input(&self) -> bool {
        self.screen == Screen::SearchInput
    }

    // ========================================================================
    // Quit
    // ========================================================================

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    // ========================================================================
    // Toasts
    // ========================================================================

    /// Ajoute des notifications ; seules les MAX_TOASTS plus récentes restent
    pub fn push_notices(&mut self, notices: Vec<Notice>, now: Instant) {
        self.toasts.extend(notices.into_iter().map(|notice| Toast {
            notice,
            expires_at: now + TOAST_TTL,
        }));

        if self.toasts.len() > MAX_TOASTS {
            let excess = self.toasts.len() - MAX_TOASTS;
            self.toasts.drain(..excess);
        }
    }

    /// Retire les toasts expirés
    pub fn prune_toasts(&mut self, now: Instant) {
        self.toasts.retain(|toast| toast.expires_at > now);
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
