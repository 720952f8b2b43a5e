// ============================================================================
// tradechart - Point d'entrée
// ============================================================================
// Trois sous-commandes :
// - serve  : backend HTTP d'ingestion des CSV (axum)
// - view   : viewer TUI (formulaire d'upload puis graphique en chandelles)
// - sample : génère une paire de fichiers CSV d'exemple
//
// Sans sous-commande, on lance le viewer.
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop : boucle qui gère événements et rendering
// 3. Async dans sync : worker thread avec son propre runtime tokio
// 4. Arc<Mutex<App>> : état partagé entre le rendu et la boucle d'événements
// ============================================================================

use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use tracing::{debug, error, info, warn};

use tradechart::{
    api::BackendClient,
    app::App,
    config::Config,
    ingest,
    models::ChartData,
    sample::{self, SampleOptions},
    server,
    ui::{
        chart_view,
        events::{mouse_action, MouseAction},
        render, Event, EventHandler,
    },
};

// ============================================================================
// Ligne de commande
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "tradechart", version, about = "OHLCV candlestick charts with trade markers")]
struct Cli {
    /// Fichier de configuration TOML
    #[arg(long, global = true, env = "TRADECHART_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Lance le backend HTTP d'ingestion
    Serve {
        /// Adresse d'écoute (ex: 0.0.0.0:8000)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Ouvre le viewer dans le terminal
    View {
        /// Chemin du CSV OHLCV (pré-remplit le formulaire)
        #[arg(long)]
        ohlcv: Option<String>,

        /// Chemin du CSV de trades (pré-remplit le formulaire)
        #[arg(long)]
        trades: Option<String>,

        /// URL du backend
        #[arg(long)]
        backend: Option<String>,

        /// Parse les fichiers localement, sans backend
        #[arg(long)]
        offline: bool,
    },

    /// Génère des fichiers CSV d'exemple
    Sample {
        /// Répertoire de sortie
        #[arg(long, default_value = ".")]
        out: PathBuf,

        #[arg(long, default_value_t = 400)]
        candles: usize,

        #[arg(long, default_value_t = 30)]
        trades: usize,

        /// Graine pour un résultat reproductible
        #[arg(long)]
        seed: Option<u64>,
    },
}

// ============================================================================
// Communication avec le worker
// ============================================================================

/// Commandes envoyées au worker thread
#[derive(Debug)]
enum AppCommand {
    /// Traite les deux CSV (backend ou local)
    ProcessFiles { ohlcv: PathBuf, trades: PathBuf },
}

/// Résultats renvoyés par le worker
#[derive(Debug)]
enum AppResult {
    ChartLoaded(ChartData),
    LoadError(String),
}

/// Mode de traitement des fichiers
#[derive(Debug, Clone)]
enum Source {
    Backend(String),
    Offline,
}

// ============================================================================
// Logging
// ============================================================================

/// Initialise le logging fichier du viewer
///
/// Le TUI occupe stdout : les logs vont dans `<log_dir>/tradechart.log`,
/// avec rotation quotidienne.
///
/// ```bash
/// RUST_LOG=tradechart=trace tradechart view
/// ```
fn init_logging(log_dir: &std::path::Path) -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    std::fs::create_dir_all(log_dir).context("Échec de la création du répertoire de logs")?;

    // CONCEPT : Log rotation
    // - Rotation::DAILY : tradechart.log.2024-01-15, etc.
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "tradechart.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false) // Pas de codes couleur dans le fichier
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradechart=debug,info".into()),
        )
        .try_init()
        .context("Échec de l'initialisation du subscriber")?;

    info!(log_dir = %log_dir.display(), "Logging initialisé");
    Ok(())
}

/// Logging console pour le serveur
fn init_server_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradechart=debug,tower_http=debug,info".into()),
        )
        .with_target(true)
        .init();
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::View {
        ohlcv: None,
        trades: None,
        backend: None,
        offline: false,
    }) {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            init_server_logging();

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(&config))
        }

        Command::Sample {
            out,
            candles,
            trades,
            seed,
        } => {
            let options = SampleOptions { candles, trades, seed };
            let (ohlcv_path, trades_path) = sample::write_samples(&out, options)?;
            println!("Generated {} candles -> {}", candles, ohlcv_path.display());
            println!("Generated {} trades  -> {}", trades, trades_path.display());
            Ok(())
        }

        Command::View {
            ohlcv,
            trades,
            backend,
            offline,
        } => {
            if let Some(backend) = backend {
                config.backend_url = backend;
            }

            init_logging(&config.log_dir).unwrap_or_else(|e| {
                eprintln!("⚠️  Warning: Failed to initialize logging: {:#}", e);
                eprintln!("   Continuing without logging...");
            });

            let source = if offline {
                Source::Offline
            } else {
                Source::Backend(config.backend_url.clone())
            };
            run_viewer(App::with_paths(ohlcv, trades), source)
        }
    }
}

// ============================================================================
// Viewer
// ============================================================================

fn run_viewer(app: App, source: Source) -> Result<()> {
    info!(?source, "tradechart viewer starting up");

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    // CONCEPT RUST : Arc<Mutex<>>
    // - la closure de terminal.draw() et la boucle d'événements partagent l'état
    let app = Arc::new(Mutex::new(app));

    let (command_tx, command_rx) = mpsc::channel::<AppCommand>();
    let (result_tx, result_rx) = mpsc::channel::<AppResult>();

    info!("Spawning background worker thread");
    spawn_background_worker(command_rx, result_tx, source);

    // Les deux chemins passés en option : on traite tout de suite
    {
        let mut app_lock = lock_app(&app);
        if !app_lock.form.ohlcv_path.is_empty() && !app_lock.form.trades_path.is_empty() {
            submit(&mut app_lock, &command_tx);
        }
    }

    let events = EventHandler::new();

    info!("Starting event loop");
    let result = run(&mut terminal, app, &events, command_tx, result_rx);

    // Restaure le terminal (même en cas d'erreur)
    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

/// Verrouille l'état ; un mutex empoisonné reste utilisable
fn lock_app(app: &Mutex<App>) -> MutexGuard<'_, App> {
    app.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Background Worker Thread
// ============================================================================
// CONCEPT RUST : Background async worker avec channels
// - Reçoit des AppCommand via command_rx
// - Envoie des AppResult via result_tx
// - L'upload HTTP ne bloque jamais l'UI
// ============================================================================

fn spawn_background_worker(
    command_rx: mpsc::Receiver<AppCommand>,
    result_tx: mpsc::Sender<AppResult>,
    source: Source,
) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = ?e, "Failed to create tokio runtime");
                let _ = result_tx.send(AppResult::LoadError(format!(
                    "Failed to start background worker: {}",
                    e
                )));
                return;
            }
        };

        let client = match &source {
            Source::Backend(url) => match BackendClient::new(url) {
                Ok(client) => Some(client),
                Err(e) => {
                    error!(error = ?e, "Failed to create backend client");
                    None
                }
            },
            Source::Offline => None,
        };

        // Vérification du backend au démarrage : uniquement journalisée
        if let Some(client) = &client {
            match runtime.block_on(client.health()) {
                Ok(message) => info!(url = %client.base_url(), %message, "Backend reachable"),
                Err(e) => warn!(url = %client.base_url(), error = %e, "Backend not reachable yet"),
            }
        }

        while let Ok(command) = command_rx.recv() {
            info!(?command, "Worker received command");

            match command {
                // L'indicateur de chargement appartient à App : submit_upload
                // l'active, load_chart / load_failed le désactivent
                AppCommand::ProcessFiles { ohlcv, trades } => {
                    let result = match (&source, &client) {
                        (Source::Offline, _) => {
                            ingest::load_chart_data(&ohlcv, &trades).map_err(|e| format!("{:#}", e))
                        }
                        (Source::Backend(_), Some(client)) => runtime
                            .block_on(client.process_chart_data(&ohlcv, &trades))
                            .map_err(|e| e.to_string()),
                        (Source::Backend(_), None) => {
                            Err(tradechart::api::BACKEND_UNREACHABLE.to_string())
                        }
                    };

                    let message = match result {
                        Ok(data) => {
                            info!(candles = data.len(), trades = data.trades.len(), "Chart data ready");
                            AppResult::ChartLoaded(data)
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to process files");
                            AppResult::LoadError(e)
                        }
                    };
                    let _ = result_tx.send(message);
                }
            }
        }

        info!("Worker thread exiting (channel closed)");
    });
}

// ============================================================================
// Event Loop Principal
// ============================================================================
// 0. Résultats du worker  1. Render  2. Input
// ============================================================================

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: Arc<Mutex<App>>,
    events: &EventHandler,
    command_tx: mpsc::Sender<AppCommand>,
    result_rx: mpsc::Receiver<AppResult>,
) -> Result<()> {
    loop {
        if !lock_app(&app).is_running() {
            break;
        }

        // ========================================
        // 0. RÉSULTATS : non bloquant
        // ========================================
        match result_rx.try_recv() {
            Ok(AppResult::ChartLoaded(data)) => {
                info!(candles = data.len(), "Showing chart");
                lock_app(&app).load_chart(data);
            }
            Ok(AppResult::LoadError(message)) => {
                lock_app(&app).load_failed(message);
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => {
                error!("Worker thread disconnected!");
            }
        }

        // ========================================
        // 1. RENDER
        // ========================================
        {
            let app_clone = app.clone();
            terminal.draw(|frame| {
                let app_lock = lock_app(&app_clone);
                render(frame, &app_lock);
            })?;
        }

        // ========================================
        // 2. INPUT
        // ========================================
        if let Ok(event) = events.next() {
            let area = terminal.size()?;
            let mut app_lock = lock_app(&app);
            handle_event(&mut app_lock, event, area, &command_tx);
        }
    }

    Ok(())
}

/// Valide le formulaire et envoie les fichiers au worker
fn submit(app: &mut App, command_tx: &mpsc::Sender<AppCommand>) {
    if let Some((ohlcv, trades)) = app.submit_upload() {
        info!(ohlcv = %ohlcv.display(), trades = %trades.display(), "User submitted files");
        if command_tx.send(AppCommand::ProcessFiles { ohlcv, trades }).is_err() {
            error!("Worker channel closed");
            app.load_failed("Background worker is not running".to_string());
        }
    }
}

// ============================================================================
// Gestion des événements
// ============================================================================

fn handle_event(app: &mut App, event: Event, area: Rect, command_tx: &mpsc::Sender<AppCommand>) {
    use tradechart::ui::events::{
        get_char_from_event, is_backspace_event, is_ctrl_c_event, is_enter_event,
        is_escape_event, is_new_upload_event, is_pan_left_event, is_pan_right_event,
        is_quit_event, is_reset_zoom_event, is_switch_field_event, is_zoom_in_event,
        is_zoom_out_event,
    };

    if is_ctrl_c_event(&event) {
        info!("User quit with Ctrl+C");
        app.quit();
        return;
    }

    if let Event::Mouse(mouse) = &event {
        if app.is_on_chart() {
            if let Some(action) = mouse_action(mouse) {
                handle_mouse(app, action, area);
            }
        }
        return;
    }

    // ========================================
    // Écran d'upload
    // ========================================
    if app.is_on_upload() {
        match event {
            Event::Key(_) if is_enter_event(&event) => submit(app, command_tx),
            Event::Key(_) if is_escape_event(&event) => {
                debug!("User reset the upload form");
                app.reset_upload();
            }
            Event::Key(_) if is_switch_field_event(&event) => app.focus_next_field(),
            Event::Key(_) if is_backspace_event(&event) => app.backspace(),
            Event::Key(_) => {
                if let Some(c) = get_char_from_event(&event) {
                    app.input_char(c);
                }
            }
            _ => {}
        }
        return;
    }

    // ========================================
    // Écran du graphique
    // ========================================
    match event {
        Event::Key(_) if is_quit_event(&event) => {
            // CONCEPT : Two-step confirmation
            if app.is_awaiting_quit_confirmation() {
                info!("User confirmed quit");
                app.quit();
            } else {
                info!("User requested quit (awaiting confirmation)");
                app.request_quit();
            }
        }
        Event::Key(_) if is_new_upload_event(&event) => {
            app.cancel_quit();
            info!("User requested a new upload");
            app.new_upload();
        }
        Event::Key(_) if is_reset_zoom_event(&event) => {
            app.cancel_quit();
            app.reset_zoom();
        }
        Event::Key(_) if is_zoom_in_event(&event) => {
            app.cancel_quit();
            app.zoom_in();
        }
        Event::Key(_) if is_zoom_out_event(&event) => {
            app.cancel_quit();
            app.zoom_out();
        }
        Event::Key(_) if is_pan_left_event(&event) => {
            app.cancel_quit();
            app.pan_left();
        }
        Event::Key(_) if is_pan_right_event(&event) => {
            app.cancel_quit();
            app.pan_right();
        }
        Event::Key(_) => app.cancel_quit(),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, action: MouseAction, area: Rect) {
    match action {
        MouseAction::Hover { column, row } => {
            let index = chart_view::candle_at(app, area, column, row);
            app.set_hover(index);
        }
        MouseAction::ZoomIn { column, row } => {
            let index = chart_view::candle_at(app, area, column, row);
            app.set_hover(index);
            app.zoom_in();
        }
        MouseAction::ZoomOut { column, row } => {
            let index = chart_view::candle_at(app, area, column, row);
            app.set_hover(index);
            app.zoom_out();
        }
        MouseAction::PanLeft => app.pan_left(),
        MouseAction::PanRight => app.pan_right(),
        MouseAction::DragStart { column } => app.begin_drag(column),
        MouseAction::Drag { column } => {
            if app.is_dragging() {
                let width = chart_view::plot_area(area).map(|plot| plot.width).unwrap_or(0);
                app.drag_to(column, width);
            }
        }
        MouseAction::DragEnd => app.end_drag(),
    }
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================
// IMPORTANT : Toujours restaurer le terminal avant de quitter !
// ============================================================================

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| e.into())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;

    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    Ok(())
}
