//! Placekeeper - Per-Application Window Position and State Restorer
//!
//! Daemon entry point: wires the settings store, the reconciliation engine
//! and the windowing-system bridge together and runs until a shutdown signal
//! arrives.

use clap::Parser;
use placekeeper::{
    cli::{clear_state, render_rules, render_state, Commands, PlacekeeperCli, StateActions},
    config::{
        ConfigStore, FileSettingsStore, ReconcilerTuning, SettingsStore, StateStore,
        KEY_APP_CONFIGS,
    },
    logging::{init_logging, LogConfig, LogFormat, LogLevel},
    services::{Reconciler, Tracker},
    shell::{SystemWindowSystem, WindowSystem},
    Result,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::{
    signal,
    sync::broadcast,
    time::{sleep, Duration},
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Daemon state: the wired-up engine plus its shutdown plumbing
pub struct PlacekeeperApp {
    store: Arc<FileSettingsStore>,
    tracker: Arc<Tracker>,
    config_subscription: Uuid,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl PlacekeeperApp {
    /// Wire stores, reconciler and tracker together
    #[instrument(skip_all)]
    pub async fn new(config_dir: &Path) -> Result<Self> {
        info!(
            "Placekeeper v{} starting, config dir {}",
            env!("CARGO_PKG_VERSION"),
            config_dir.display()
        );

        let store = Arc::new(FileSettingsStore::open(config_dir)?);
        let config = Arc::new(ConfigStore::new(store.clone() as Arc<dyn SettingsStore>));
        let states = Arc::new(StateStore::new(store.clone() as Arc<dyn SettingsStore>));
        let tuning = ReconcilerTuning::load(config_dir);
        debug!(?tuning, "Reconciler tuning loaded");

        let system: Arc<dyn WindowSystem> = Arc::new(SystemWindowSystem::new());
        let reconciler = Arc::new(Reconciler::new(system.clone(), states.clone(), tuning));
        let tracker = Arc::new(Tracker::new(system, config, states, reconciler));

        // Rule edits from the preferences surface reach the tracker through
        // the store's change notification
        let handle = tokio::runtime::Handle::current();
        let tracker_for_listener = tracker.clone();
        let config_subscription = store.subscribe(
            KEY_APP_CONFIGS,
            Arc::new(move |_key: &str| {
                let tracker = tracker_for_listener.clone();
                handle.spawn(async move {
                    tracker.on_config_changed().await;
                });
            }),
        );

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        Ok(Self {
            store,
            tracker,
            config_subscription,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Run until a shutdown signal arrives
    #[instrument(skip_all)]
    pub async fn run(&mut self) -> Result<()> {
        warn!(
            "No live compositor bridge is available in this build; \
             the daemon idles until one is wired up"
        );

        let shutdown_tx = self.shutdown_tx.clone();
        tokio::spawn(async move {
            if let Err(err) = Self::wait_for_signal(shutdown_tx).await {
                error!("Failed to set up signal handlers: {}", err);
            }
        });

        info!("Placekeeper is ready");
        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = sleep(Duration::from_secs(60)) => {
                    let metrics = self.tracker.metrics().await;
                    debug!(?metrics, "Tracker health");
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(&self) {
        info!("Shutting down Placekeeper...");
        self.tracker.shutdown().await;
        self.store.unsubscribe(self.config_subscription);
        info!("Placekeeper shutdown complete");
    }

    async fn wait_for_signal(shutdown_tx: broadcast::Sender<()>) -> Result<()> {
        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            tokio::select! {
                result = signal::ctrl_c() => {
                    match result {
                        Ok(_) => info!("Received SIGINT (Ctrl+C)"),
                        Err(err) => warn!("Failed to listen for Ctrl+C: {}", err),
                    }
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM");
                }
            }
        }

        #[cfg(not(unix))]
        {
            match signal::ctrl_c().await {
                Ok(_) => info!("Received Ctrl+C"),
                Err(err) => warn!("Failed to listen for Ctrl+C: {}", err),
            }
        }

        if shutdown_tx.send(()).is_err() {
            warn!("Failed to send shutdown signal - no receivers");
        }
        Ok(())
    }
}

fn open_stores(config_dir: &Path) -> Result<(ConfigStore, StateStore)> {
    let store = Arc::new(FileSettingsStore::open(config_dir)?);
    Ok((
        ConfigStore::new(store.clone() as Arc<dyn SettingsStore>),
        StateStore::new(store as Arc<dyn SettingsStore>),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PlacekeeperCli::parse();

    let mut log_config = LogConfig::from_env();
    if cli.verbose {
        log_config.level = LogLevel::Debug;
        log_config.format = LogFormat::Pretty;
    }
    if let Err(err) = init_logging(&log_config) {
        eprintln!("Failed to initialize logging: {}", err);
    }

    let config_dir: PathBuf = cli
        .config_dir
        .clone()
        .unwrap_or_else(FileSettingsStore::default_dir);

    match cli.command {
        Commands::Run => {
            let mut app = PlacekeeperApp::new(&config_dir).await?;
            if let Err(err) = app.run().await {
                error!("Daemon error: {}", err);
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Rules => {
            let (config, _) = open_stores(&config_dir)?;
            println!("{}", render_rules(&config, cli.json)?);
            Ok(())
        }
        Commands::State(state) => {
            let (_, states) = open_stores(&config_dir)?;
            match state.action {
                StateActions::Show { class } => {
                    println!("{}", render_state(&states, class.as_deref(), cli.json)?);
                }
                StateActions::Clear { class } => {
                    println!("{}", clear_state(&states, &class)?);
                }
            }
            Ok(())
        }
    }
}
