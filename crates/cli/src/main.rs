//! Command-line front end for the Roost media pipeline.

mod files;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use roost_core::config::ClientConfig;
use roost_core::{LifecycleState, MediaTag, ResourceId, Slot, SlotGrid};
use roost_pipeline::{
    FileOutcome, TracingNotifier, UploadOrchestrator, UploadReport, WishlistStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "roost")]
#[command(about = "Manage listing photos and wishlists")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct GlobalArgs {
    /// Client config file path
    #[arg(long, global = true, env = "ROOST_CONFIG")]
    config: Option<String>,

    /// API base URL (overrides client config)
    #[arg(long, global = true, env = "ROOST_SERVER")]
    server: Option<String>,

    /// Bearer token (overrides client config)
    #[arg(long, global = true, env = "ROOST_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Args, Clone)]
struct GridArgs {
    /// Listing the photos belong to
    resource: String,

    /// Photo group
    #[arg(long, default_value = "primary")]
    tag: MediaTag,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the photo grid of a listing
    List {
        #[command(flatten)]
        grid: GridArgs,
    },
    /// Upload image files into the first free slots
    Upload {
        #[command(flatten)]
        grid: GridArgs,
        /// Image files to upload
        #[arg(value_name = "FILE", required = true, num_args = 1..)]
        files: Vec<PathBuf>,
    },
    /// Delete the photo in a slot
    Delete {
        #[command(flatten)]
        grid: GridArgs,
        /// Slot index (0-based)
        index: usize,
    },
    /// Move a photo to another position
    Reorder {
        #[command(flatten)]
        grid: GridArgs,
        /// Current slot index
        from: usize,
        /// Target slot index
        to: usize,
    },
    /// Wishlist commands
    Wishlist {
        #[command(subcommand)]
        command: WishlistCommands,
    },
}

#[derive(Subcommand)]
enum WishlistCommands {
    /// List wishlisted listings
    List,
    /// Add or remove a listing
    Toggle {
        /// Listing to toggle
        resource: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Cli { global, command } = Cli::parse();
    let config = resolve_config(&global)?;

    match command {
        Commands::List { grid } => handle_list(&config, &grid).await,
        Commands::Upload { grid, files } => handle_upload(&config, &grid, &files).await,
        Commands::Delete { grid, index } => handle_delete(&config, &grid, index).await,
        Commands::Reorder { grid, from, to } => handle_reorder(&config, &grid, from, to).await,
        Commands::Wishlist { command } => handle_wishlist_command(&config, command).await,
    }
}

fn resolve_config(global: &GlobalArgs) -> Result<ClientConfig> {
    let path = config_path(global.config.as_deref())?;
    tracing::debug!(path = %path.display(), exists = path.exists(), "Loading client configuration");
    let mut config = load_client_config(&path)?;
    apply_overrides(&mut config, global);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid client configuration")?;
    Ok(config)
}

fn config_path(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(PathBuf::from(path));
    }

    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(path) => PathBuf::from(path),
        None => {
            let home = std::env::var_os("HOME")
                .ok_or_else(|| anyhow::anyhow!("HOME not set; pass --config or set ROOST_CONFIG"))?;
            PathBuf::from(home).join(".config")
        }
    };

    Ok(base.join("roost").join("config.toml"))
}

fn load_client_config(path: &Path) -> Result<ClientConfig> {
    let mut figment = Figment::new();

    if path.exists() {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("ROOST_").split("__"));

    match figment.extract() {
        Ok(config) => Ok(config),
        Err(_) if !path.exists() => Ok(ClientConfig::default()),
        Err(err) => Err(anyhow::anyhow!(err).context("failed to load client configuration")),
    }
}

fn apply_overrides(config: &mut ClientConfig, global: &GlobalArgs) {
    if let Some(server) = &global.server {
        config.api.base_url = server.trim_end_matches('/').to_string();
    }
    if let Some(token) = &global.token {
        config.api.token = Some(token.clone());
    }
}

fn parse_resource(raw: &str) -> Result<ResourceId> {
    ResourceId::new(raw).with_context(|| format!("invalid listing id: {raw}"))
}

/// Build an orchestrator for `grid` and load its stored photos.
async fn open_grid(config: &ClientConfig, grid: &GridArgs) -> Result<UploadOrchestrator> {
    let api = roost_api::from_config(&config.api).context("failed to create API client")?;
    tracing::debug!(server = %config.api.base_url, resource = %grid.resource, tag = %grid.tag, "Opening photo grid");
    let orchestrator = UploadOrchestrator::new(
        parse_resource(&grid.resource)?,
        grid.tag,
        api,
        Arc::new(TracingNotifier),
        &config.upload,
    );
    orchestrator
        .reload()
        .await
        .with_context(|| format!("failed to load photos of {}", grid.resource))?;
    Ok(orchestrator)
}

async fn handle_list(config: &ClientConfig, grid: &GridArgs) -> Result<()> {
    let orchestrator = open_grid(config, grid).await?;
    print_grid(&orchestrator.grid());
    Ok(())
}

async fn handle_upload(config: &ClientConfig, grid: &GridArgs, paths: &[PathBuf]) -> Result<()> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        uploads.push(files::read_upload(path).await?);
    }

    let orchestrator = open_grid(config, grid).await?;
    let report = orchestrator.upload_files(uploads).await;
    orchestrator.flush_order_sync().await;

    print_report(&report);
    print_grid(&orchestrator.grid());

    let failed = report.errors().count();
    tracing::info!(
        submitted = report.files.len(),
        uploaded = report.uploaded().len(),
        failed,
        "Upload finished"
    );
    if failed > 0 {
        anyhow::bail!("{failed} of {} files were not uploaded", report.files.len());
    }
    Ok(())
}

async fn handle_delete(config: &ClientConfig, grid: &GridArgs, index: usize) -> Result<()> {
    let orchestrator = open_grid(config, grid).await?;
    let id = orchestrator
        .delete_at(index)
        .await
        .with_context(|| format!("failed to delete slot {index}"))?;
    orchestrator.flush_order_sync().await;

    println!("Deleted photo {id}");
    print_grid(&orchestrator.grid());
    Ok(())
}

async fn handle_reorder(config: &ClientConfig, grid: &GridArgs, from: usize, to: usize) -> Result<()> {
    let orchestrator = open_grid(config, grid).await?;
    orchestrator
        .reorder(from, to)
        .with_context(|| format!("failed to move slot {from} to {to}"))?;
    orchestrator.flush_order_sync().await;

    print_grid(&orchestrator.grid());
    Ok(())
}

async fn handle_wishlist_command(config: &ClientConfig, command: WishlistCommands) -> Result<()> {
    let api = roost_api::from_config(&config.api).context("failed to create API client")?;
    let store = WishlistStore::new(api, Arc::new(TracingNotifier));
    store.hydrate().await.context("failed to load wishlist")?;

    match command {
        WishlistCommands::List => {
            let members = store.members();
            if members.is_empty() {
                println!("Wishlist is empty.");
            }
            for resource in members {
                println!("{resource}");
            }
        }
        WishlistCommands::Toggle { resource } => {
            let resource = parse_resource(&resource)?;
            let outcome = store.toggle(&resource).await?;
            tracing::debug!(resource = %resource, ?outcome, "Wishlist toggled");
            if store.is_member(&resource) {
                println!("Added {resource} to wishlist");
            } else {
                println!("Removed {resource} from wishlist");
            }
        }
    }
    Ok(())
}

fn print_grid(grid: &SlotGrid) {
    for (index, slot) in grid.slots().iter().enumerate() {
        println!("{}", format_slot(index, slot));
    }
}

fn format_slot(index: usize, slot: &Slot) -> String {
    match slot.item() {
        None => format!("[{index}] -"),
        Some(item) => match item.id {
            Some(id) => format!("[{index}] #{id} {}", item.locator),
            None => format!(
                "[{index}] ({}) {}",
                state_label(item.state),
                item.file_name.as_deref().unwrap_or("?")
            ),
        },
    }
}

fn state_label(state: LifecycleState) -> &'static str {
    match state {
        LifecycleState::Previewing => "previewing",
        LifecycleState::Uploading => "uploading",
        LifecycleState::Uploaded => "uploaded",
        LifecycleState::Failed => "failed",
    }
}

fn print_report(report: &UploadReport) {
    for file in &report.files {
        match &file.outcome {
            FileOutcome::Uploaded { id } => println!("uploaded  {} -> #{id}", file.file_name),
            FileOutcome::Rejected(err) => println!("rejected  {err}"),
            FileOutcome::Failed(err) => println!("failed    {err}"),
            FileOutcome::Discarded => println!("discarded {}", file.file_name),
        }
    }
}
