use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use fundus_upload::app::events::{NoticeLevel, UserEvent};
use fundus_upload::app::file_dialog::{DialogService, NativeDialogService};
use fundus_upload::app::helpers::lock_state;
use fundus_upload::app::state::AppState;
use fundus_upload::app::{commands, Services};
use fundus_upload::config::settings;
use fundus_upload::core::{
    EnvSessionStore, FileStatus, HttpInferenceClient, SessionStore, StaticSessionStore,
};

#[derive(Parser, Debug)]
#[command(name = "fundus-upload")]
#[command(about = "Send fundus images to an inference endpoint and collect the overlays")]
struct Cli {
    /// Images to analyze. Opens a file picker when empty.
    files: Vec<PathBuf>,
    /// Inference endpoint, overriding the configured one.
    #[arg(long)]
    endpoint: Option<String>,
    /// Bearer token, overriding the configured environment variable.
    #[arg(long)]
    token: Option<String>,
    /// Where result overlays are written.
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Configuration file to use instead of the platform default.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = settings::load_config(cli.config.as_deref())?;
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint_url = endpoint.clone();
    }
    let output_directory = cli.output_dir.clone().or_else(|| config.output_directory.clone());

    let session: Arc<dyn SessionStore> = match &cli.token {
        Some(token) => Arc::new(StaticSessionStore::new(Some(token.clone()))),
        None => Arc::new(EnvSessionStore::new(config.auth_token_env.clone())),
    };
    let services = Services {
        inference: Arc::new(
            HttpInferenceClient::from_config(&config).context("Failed to build HTTP client")?,
        ),
        session,
        dialog: Arc::new(NativeDialogService),
    };

    let mut app_state = AppState::new(config);
    app_state.config_path = cli.config.clone();
    let state = Arc::new(Mutex::new(app_state));

    let (proxy, mut events) = mpsc::unbounded_channel::<UserEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                UserEvent::ShowNotice { level, message } => match level {
                    NoticeLevel::Info => tracing::info!("{}", message),
                    NoticeLevel::Warning => tracing::warn!("{}", message),
                    NoticeLevel::Error => tracing::error!("{}", message),
                },
                UserEvent::ShowError(message) => tracing::error!("{}", message),
                UserEvent::NavigationChanged(location) => {
                    tracing::info!("Shareable location: {}", location)
                }
                UserEvent::StateUpdate(_) | UserEvent::ConfigExported(_) => {}
            }
        }
    });

    let files = if cli.files.is_empty() {
        let dialog = services.dialog.clone();
        let start = lock_state(&state).config.last_directory.clone();
        tokio::task::spawn_blocking(move || dialog.pick_images(start.as_deref())).await?
    } else {
        cli.files.clone()
    };

    for handle in commands::add_files(files, proxy.clone(), state.clone()) {
        handle.await?;
    }

    let report = commands::analyze(proxy.clone(), state.clone(), services).await;
    drop(proxy);
    printer.await?;

    let report = match report {
        Ok(report) => report,
        Err(e) => bail!("Nothing was analyzed: {}", e),
    };

    let state_guard = lock_state(&state);
    for item in state_guard.registry.items() {
        match item.status() {
            FileStatus::Completed => {
                let labels = item.detected_labels().unwrap_or_default();
                println!("{}: completed [{}]", item.raw().name(), labels.join(", "));
                match (&output_directory, item.result_handle()) {
                    (Some(_), Some(overlay)) if overlay.is_empty() => {
                        println!("  endpoint returned an empty overlay; nothing written")
                    }
                    (Some(dir), Some(overlay)) => {
                        let path = write_overlay(dir, item.raw().name(), overlay.as_bytes())?;
                        println!(
                            "  overlay written to {} ({} bytes)",
                            path.display(),
                            overlay.len()
                        );
                    }
                    _ => {}
                }
            }
            status => println!(
                "{}: {} {}",
                item.raw().name(),
                status,
                item.error().unwrap_or_default()
            ),
        }
    }
    if state_guard.view.has_result() {
        println!("Result available at {}", state_guard.view.location());
    }

    if report.completed() == 0 {
        bail!("No image could be analyzed");
    }
    Ok(())
}

fn write_overlay(directory: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create {}", directory.display()))?;
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let path = directory.join(format!("{}_result.png", stem));
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
