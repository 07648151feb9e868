//! projctx - open a project and follow changes under its root.
//!
//! # Usage
//!
//! ```text
//! projctx <project file> [--debug]
//! ```
//!
//! # Execution Flow
//!
//! 1. Load global settings from `<config dir>/projctx/settings.yaml`
//! 2. Initialize logging → `<config dir>/projctx/logs/projctx.<date>`
//! 3. Open the project (early phase): scratch path + project configuration
//! 4. Initialize the project (late phase): encoding, monitor registration queued
//! 5. Fire deferred init, which registers the directory monitor
//! 6. Report file changes until the monitor unregisters (root removed)

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use projctx::services::NotifyMonitor;
use projctx::{
    APP_NAME, ClientEvent, ClientEventQueue, MonitorCallbacks, ProjectEnvironment, ProjectSession,
    SettingsManager, VERSION,
};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Parser)]
#[command(name = "projctx", about = "Open a project and report changes under its root", version)]
struct Cli {
    /// Project file to open
    project_file: Utf8PathBuf,

    /// Log at debug level
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_dir = dirs::config_dir()
        .ok_or_else(|| anyhow!("no configuration directory for this user"))?
        .join(APP_NAME);
    let settings_dir = Utf8PathBuf::try_from(settings_dir).context("configuration directory is not UTF-8")?;

    let settings_manager = SettingsManager::new(&settings_dir)?;
    let _log_guard = projctx::logging::setup_logging(&settings_dir.join("logs"), APP_NAME, cli.debug, true)?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let settings = settings_manager.load()?;

    let queue = ClientEventQueue::default();
    let mut client_events = queue.subscribe();
    let env = ProjectEnvironment::new(settings, Box::new(NotifyMonitor::new()), Arc::new(queue));
    let mut session = ProjectSession::new(env);

    if let Err(e) = session.open(&cli.project_file) {
        let message = e.user_message();
        tracing::error!("{:#}", anyhow::Error::new(e));
        return Err(anyhow!("Unable to open project: {}", message));
    }
    session.initialize();
    report_project(&session);
    drain_client_events(&mut client_events);

    let stopped = Rc::new(Cell::new(false));
    let stop = Rc::clone(&stopped);
    session.context_mut().register_file_monitor_callbacks(
        MonitorCallbacks::new()
            .on_registered(|_, files| println!("watching {} entries", files.entry_count()))
            .on_registration_error(|e| println!("not watching: {}", e))
            .on_unregistered(move |_| stop.set(true)),
    );

    session.complete_deferred_init();

    while !stopped.get() {
        session.context_mut().wait_for_monitor_events(Duration::from_millis(500));
        drain_client_events(&mut client_events);
        if !session.context().has_file_monitor() && !stopped.get() {
            break;
        }
    }

    tracing::info!("Monitoring ended, shutting down");
    Ok(())
}

fn report_project(session: &ProjectSession) {
    let context = session.context();
    let (Some(directory), Some(scratch), Some(prefs)) =
        (context.directory(), context.scratch_path(), context.ui_prefs())
    else {
        return;
    };

    println!("project:  {}", directory);
    println!("scratch:  {}", scratch);
    println!(
        "tabs:     {} x {}",
        if prefs.use_spaces_for_tab { "spaces" } else { "tabs" },
        prefs.num_spaces_for_tab
    );
    println!("encoding: {}", prefs.default_encoding);
}

fn drain_client_events(rx: &mut broadcast::Receiver<ClientEvent>) {
    loop {
        match rx.try_recv() {
            Ok(ClientEvent::ShowWarningBar { message, .. }) => println!("warning: {}", message),
            Ok(ClientEvent::FilesChanged { root, changes }) => {
                for change in changes {
                    let path = change.file.path.strip_prefix(&root).unwrap_or(change.file.path.as_path());
                    println!("{:?}: {}", change.kind, display_path(path));
                }
            }
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!("Dropped {} client events", skipped);
            }
            Err(_) => break,
        }
    }
}

fn display_path(path: &Utf8Path) -> &str {
    if path.as_str().is_empty() { "." } else { path.as_str() }
}
