//! # tokenjam
//!
//! Server binary: loads settings, starts the shared puzzle session, and
//! serves it over HTTP and `WebSocket` until Ctrl-C.

#![deny(unsafe_code)]

mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokenjam_core::Catalog;
use tokenjam_runtime::{ProcessInterpreter, Session, SessionConfig};
use tokenjam_server::{ServerConfig, ShutdownCoordinator, TokenjamServer};
use tokenjam_settings::Settings;
use tracing::info;

/// tokenjam server.
#[derive(Parser, Debug)]
#[command(name = "tokenjam", about = "Collaborative expression-puzzle server")]
struct Cli {
    /// Settings file (defaults to ~/.tokenjam/settings.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind to.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on.
    #[arg(long)]
    port: Option<u16>,

    /// Puzzle catalog JSON file (built-in puzzles when absent).
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Directory of static frontend assets.
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

impl Cli {
    fn load_settings(&self) -> Result<Settings> {
        let settings = match &self.config {
            Some(path) => tokenjam_settings::load_settings_from_path(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => tokenjam_settings::load_settings().context("Failed to load settings")?,
        };
        Ok(self.apply(settings))
    }

    /// Flags win over file and environment.
    fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(dir) = &self.static_dir {
            settings.server.static_dir = dir.to_string_lossy().into_owned();
        }
        if let Some(catalog) = &self.catalog {
            settings.catalog_path = Some(catalog.to_string_lossy().into_owned());
        }
        settings
    }
}

fn load_catalog(settings: &Settings) -> Result<Catalog> {
    match &settings.catalog_path {
        Some(path) => {
            Catalog::load(Path::new(path)).with_context(|| format!("Failed to load catalog {path}"))
        }
        None => Ok(Catalog::builtin()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.load_settings()?;
    logging::init(&settings.logging);

    let catalog = load_catalog(&settings)?;
    info!(
        puzzles = catalog.len(),
        source = settings.catalog_path.as_deref().unwrap_or("builtin"),
        "catalog loaded"
    );

    let shutdown = Arc::new(ShutdownCoordinator::new(settings.server.shutdown_grace()));
    let interpreter = Arc::new(ProcessInterpreter::from_settings(&settings.evaluator));
    let (session, tasks) = Session::spawn(
        catalog,
        SessionConfig::from_settings(&settings),
        interpreter,
        shutdown.token(),
    );
    for (name, handle) in ["session", "evaluator"].into_iter().zip(tasks) {
        shutdown.track(name, handle);
    }

    let server = TokenjamServer::new(
        ServerConfig::from_settings(&settings.server),
        session,
        Arc::clone(&shutdown),
    );
    let addr = server.listen().await.context("Failed to start server")?;
    info!(%addr, "tokenjam ready");

    let report = shutdown.run_until_ctrl_c().await;
    info!(
        finished = report.finished.len(),
        aborted = report.aborted.len(),
        "shutdown complete"
    );

    Ok(())
}
