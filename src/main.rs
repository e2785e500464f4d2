// ============================================================================
// CoinBoard - Tableau de bord crypto dans le terminal
// ============================================================================
// Liste des 100 premières cryptomonnaies (CoinGecko), rafraîchie chaque minute,
// recherche, tri, et panneau de comparaison de 5 actifs épinglés
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop : boucle qui gère événements et rendering
// 3. Worker thread : le scheduler tourne dans son propre runtime tokio
// 4. Channels : le worker envoie des SchedulerEvent, seul le thread UI
//    modifie l'état (pas de Mutex sur l'App)
// ============================================================================

use std::io;
use std::sync::mpsc;
use std::time::Instant;

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, error, info};

use coinboard::api::CoinGeckoClient;
use coinboard::app::App;
use coinboard::config::Config;
use coinboard::scheduler::{Scheduler, SchedulerEvent};
use coinboard::storage::FileStore;
use coinboard::ui::{handle_key, render, Event, EventHandler, UiState};

// ============================================================================
// Initialisation du logging
// ============================================================================
// CONCEPT : Logging dans une app TUI
// - Les println! ne fonctionnent pas une fois le TUI lancé
// - On log vers un fichier à la place, avec rotation quotidienne
// ============================================================================

/// Initialise le système de logging vers fichier
///
/// Les logs sont écrits dans ./logs/coinboard.log.AAAA-MM-JJ
///
/// # Utilisation
/// ```bash
/// # Voir les logs en temps réel
/// tail -f logs/coinboard.log.*
///
/// # Contrôler le niveau de log
/// RUST_LOG=coinboard=trace cargo run
/// ```
fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = std::path::PathBuf::from("./logs");
    std::fs::create_dir_all(&log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "coinboard.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender) // Écrit dans le fichier
                .with_ansi(false) // Pas de codes couleur dans le fichier
                .with_target(true)
                .with_thread_ids(true) // Distingue le worker du thread UI
                .with_line_number(true),
        )
        .with(
            // Par défaut : debug pour coinboard, info pour les dépendances
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coinboard=debug,info".into()),
        )
        .init();

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    init_logging().unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    info!("CoinBoard starting up");

    let config = Config::load()?;
    debug!(?config, "Effective configuration");

    // Lecture unique de la sélection et des préférences, avant le premier rendu
    let mut app = App::load(Box::new(FileStore::new(&config.data_dir)));

    let source = CoinGeckoClient::new(&config)?;
    info!(url = %source.url(), "Market source ready");

    // Runtime construit ici, puis déplacé dans le worker
    let runtime = tokio::runtime::Runtime::new().context("Échec de la création du runtime tokio")?;
    let (event_tx, event_rx) = mpsc::channel::<SchedulerEvent>();
    spawn_scheduler(runtime, Scheduler::from_config(&config), source, event_tx);

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    let events = EventHandler::new();
    let mut ui = UiState::new();

    info!("Starting event loop");
    let result = run(&mut terminal, &mut app, &mut ui, &events, &event_rx);

    // Restaure le terminal (même en cas d'erreur)
    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

// ============================================================================
// Worker : scheduler dans son propre thread
// ============================================================================

/// Lance la boucle du scheduler en arrière-plan
///
/// CONCEPT RUST : Thread + async runtime
/// - std::thread::spawn() : crée un thread OS
/// - runtime.block_on() : exécute la boucle async dans ce thread
/// - La boucle s'arrête d'elle-même quand le thread UI lâche le receiver
fn spawn_scheduler(
    runtime: tokio::runtime::Runtime,
    scheduler: Scheduler,
    source: CoinGeckoClient,
    events: mpsc::Sender<SchedulerEvent>,
) {
    std::thread::spawn(move || {
        runtime.block_on(scheduler.run(&source, events));
    });
}

// ============================================================================
// Event Loop
// ============================================================================

/// Boucle principale : événements du scheduler, rendu, clavier
///
/// Toutes les mutations de l'App se font ici, sur un seul thread.
fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    ui: &mut UiState,
    events: &EventHandler,
    scheduler_rx: &mpsc::Receiver<SchedulerEvent>,
) -> Result<()> {
    let mut worker_alive = true;

    while ui.is_running() {
        // Applique tout ce que le scheduler a produit depuis le dernier tour
        while worker_alive {
            match scheduler_rx.try_recv() {
                Ok(event) => app.apply_scheduler_event(event),
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    error!("Scheduler thread disconnected");
                    worker_alive = false;
                }
            }
        }

        let now = Instant::now();
        ui.push_notices(app.take_notices(), now);
        ui.prune_toasts(now);
        ui.clamp(app.visible_assets().len(), app.selection().len());

        terminal.draw(|frame| render(frame, &*app, &*ui))?;

        match events.next()? {
            Event::Key(key) => {
                if let Some(command) = handle_key(key, ui, app) {
                    app.handle(command);
                }
            }
            Event::Tick => {}
        }
    }

    info!("User confirmed quit");
    Ok(())
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================

/// Configure le terminal en mode TUI
///
/// - Raw mode : les touches arrivent directement, sans Entrée
/// - Alternate screen : le terminal d'origine est restauré à la sortie
fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| e.into())
}

/// Restaure le terminal dans son état normal
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
