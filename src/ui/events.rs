// ============================================================================
// Gestion des événements
// ============================================================================
// Lit le clavier et traduit les touches en Command pour l'App
//
// CONCEPTS RUST :
// 1. Enums avec variants : représenter différents types d'événements
// 2. Pattern matching : KeyCode -> action
// 3. Fonction pure : handle_key() ne touche pas au terminal, on peut la tester
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind};

use crate::app::{App, Command};
use crate::models::PreferenceFlag;
use crate::ui::state::{Focus, UiState};

/// Événements de l'application
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Tick régulier (rafraîchissement, expiration des toasts)
    Tick,
}

/// Gestionnaire d'événements
pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    /// Crée un gestionnaire avec un tick de 250ms
    pub fn new() -> Self {
        Self {
            tick_rate: Duration::from_millis(250),
        }
    }

    /// Lit le prochain événement (bloquant avec timeout)
    ///
    /// CONCEPT : Non-blocking I/O avec timeout
    /// - poll(timeout) attend au plus tick_rate
    /// - Si pas d'événement, retourne Ok(Event::Tick)
    pub fn next(&self) -> Result<Event> {
        if event::poll(self.tick_rate)? {
            match event::read()? {
                // Sur certains OS, on reçoit Press ET Release
                CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Ok(Event::Key(key)),
                _ => Ok(Event::Tick),
            }
        } else {
            Ok(Event::Tick)
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helpers : identifier les touches
// ============================================================================

/// Vérifie si la touche est 'q' (quitter)
pub fn is_quit_key(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q'))
}

/// Flèche vers le haut ou 'k' (vim)
pub fn is_up_key(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Up | KeyCode::Char('k'))
}

/// Flèche vers le bas ou 'j' (vim)
pub fn is_down_key(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Down | KeyCode::Char('j'))
}

/// Entrée ou Espace : épingler / retirer
pub fn is_activate_key(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Enter | KeyCode::Char(' '))
}

/// Touche de bascule d'une préférence
pub fn preference_for_key(key: &KeyEvent) -> Option<PreferenceFlag> {
    match key.code {
        KeyCode::Char('1') => Some(PreferenceFlag::ShowChange),
        KeyCode::Char('2') => Some(PreferenceFlag::ShowMarketCap),
        KeyCode::Char('3') => Some(PreferenceFlag::ShowVolume),
        KeyCode::Char('t') | KeyCode::Char('T') => Some(PreferenceFlag::DarkMode),
        _ => None,
    }
}

// ============================================================================
// Traduction touche -> Command
// ============================================================================

/// Applique une touche à l'état UI et retourne la Command éventuelle
///
/// CONCEPT : Séparation UI / métier
/// - Les déplacements de curseur ne concernent que UiState
/// - Tout ce qui change l'état métier devient une Command pour App::handle
pub fn handle_key(key: KeyEvent, ui: &mut UiState, app: &App) -> Option<Command> {
    if ui.is_in_search_input() {
        return handle_search_key(key, ui);
    }

    // Two-step quit : deuxième 'q' quitte, toute autre touche annule
    if ui.is_awaiting_quit_confirmation() {
        if is_quit_key(&key) {
            ui.quit();
        } else {
            ui.cancel_quit();
        }
        return None;
    }

    if is_quit_key(&key) {
        ui.request_quit();
        return None;
    }

    if let Some(flag) = preference_for_key(&key) {
        return Some(Command::PreferenceToggled(flag));
    }

    if is_up_key(&key) {
        ui.navigate_up();
        return None;
    }

    if is_down_key(&key) {
        let len = match ui.focus {
            Focus::List => app.visible_assets().len(),
            Focus::Comparison => app.selection().len(),
        };
        ui.navigate_down(len);
        return None;
    }

    if is_activate_key(&key) {
        return match ui.focus {
            Focus::List => app
                .visible_assets()
                .get(ui.list_index)
                .map(|record| Command::AssetClicked(record.id.clone())),
            Focus::Comparison => comparison_remove(ui, app),
        };
    }

    match key.code {
        KeyCode::Tab | KeyCode::Char('x') => {
            ui.toggle_focus();
            None
        }
        KeyCode::Char('d') | KeyCode::Delete if ui.focus == Focus::Comparison => {
            comparison_remove(ui, app)
        }
        KeyCode::Char('/') => {
            ui.start_search(app.search_term());
            None
        }
        KeyCode::Char('s') => Some(Command::SortSelected(app.sort_mode().next())),
        KeyCode::Char('S') => Some(Command::SortSelected(app.sort_mode().inverse())),
        // ESC sur le dashboard efface un filtre actif
        KeyCode::Esc if !app.search_term().is_empty() => {
            Some(Command::SearchSubmitted(String::new()))
        }
        _ => None,
    }
}

/// Touches du mode saisie : Enter valide, ESC annule
fn handle_search_key(key: KeyEvent, ui: &mut UiState) -> Option<Command> {
    match key.code {
        KeyCode::Enter => Some(Command::SearchSubmitted(ui.submit_search())),
        KeyCode::Esc => {
            ui.cancel_search();
            None
        }
        KeyCode::Backspace => {
            ui.backspace();
            None
        }
        KeyCode::Char(c) => {
            ui.append_char(c);
            None
        }
        _ => None,
    }
}

fn comparison_remove(ui: &UiState, app: &App) -> Option<Command> {
    app.selection()
        .entries()
        .get(ui.comparison_index)
        .map(|entry| Command::ComparisonRemoveClicked(entry.id.clone()))
}

// ============================================================================
// Tests
// ============================================================================
