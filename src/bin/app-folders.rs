use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::runtime::Handle;

use app_folders_lib::config::{AppConfig, StoreBackend};
use app_folders_lib::folders::{FolderWrite, ReconcileOutcome};
use app_folders_lib::monitor::FolderMonitor;
use app_folders_lib::reconciler::FolderReconciler;
use app_folders_lib::refresh::RefreshError;
use app_folders_lib::store::open_store;
use app_folders_lib::watcher::AppDirWatcher;

#[derive(Parser)]
#[command(name = "app-folders")]
#[command(about = "Keep GNOME app-grid folders in sync with a folder table", long_about = None)]
struct Cli {
    /// Config file (defaults to the per-user config.yaml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the settings backend
    #[arg(short, long, global = true, value_enum)]
    backend: Option<StoreBackend>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the writes a reconciliation would make
    Plan {
        #[arg(long)]
        json: bool,
    },
    /// Reconcile once and exit
    Apply,
    /// Remove all folders from the app grid
    Clear,
    /// Reconcile now and again whenever applications are installed or removed
    Watch,
}

fn describe(write: &FolderWrite) -> String {
    match write {
        FolderWrite::Children { current, desired } => {
            format!("folder-children: {current:?} -> {desired:?}")
        }
        FolderWrite::Name {
            folder_id,
            current,
            desired,
        } => format!("{folder_id}/name: {current:?} -> {desired:?}"),
        FolderWrite::Categories {
            folder_id,
            current,
            desired,
        } => format!("{folder_id}/categories: {current:?} -> {desired:?}"),
    }
}

fn log_refresh() -> Result<(), RefreshError> {
    // gnome-shell re-reads app-folders on its own once the settings change.
    tracing::debug!("[refresh] folder settings changed");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::load_default().context("Failed to load default config")?,
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    let reconciler = Arc::new(
        FolderReconciler::builder(open_store(&config), Handle::current())
            .desired(config.desired_state()?)
            .debounce(config.debounce())
            .refresh(Arc::new(log_refresh))
            .build(),
    );

    match cli.command {
        Command::Plan { json } => {
            let plan = reconciler.plan().context("Failed to read folder settings")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else if plan.is_converged() {
                println!("✅ Folders are in sync!");
            } else {
                println!("📝 {} change(s) needed:", plan.len());
                for write in &plan.writes {
                    println!("   {}", describe(write));
                }
            }
        }
        Command::Apply => match reconciler.reconcile_now() {
            ReconcileOutcome::Converged => println!("✅ Folders are in sync!"),
            ReconcileOutcome::Applied { writes, .. } => {
                println!("🔄 Applied {writes} change(s)");
            }
            ReconcileOutcome::Busy => anyhow::bail!("Another reconciliation is running"),
            ReconcileOutcome::Failed { error } => anyhow::bail!("Reconciliation failed: {error}"),
        },
        Command::Clear => {
            if !reconciler.clear_all() {
                anyhow::bail!("Failed to clear folders");
            }
            println!("🧹 Folders cleared");
        }
        Command::Watch => {
            let watcher = AppDirWatcher::new(
                config.application_dirs.clone(),
                Arc::clone(reconciler.log()),
            );
            let monitor = Arc::new(FolderMonitor::new(reconciler, Arc::new(watcher)));
            monitor.enable_after(config.startup_delay(), &Handle::current());

            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            monitor.shutdown();
        }
    }

    Ok(())
}
