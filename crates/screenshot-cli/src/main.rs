//! screenshot-cli: Command-line front end for screenshot-core
//!
//! Lists displays, captures them to PNG files and diagnoses backend
//! resolution problems without writing any code against the library.

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use screenshot_core::backend::BackendCandidate;
use screenshot_core::capture::ScreenCapture;
use screenshot_core::config::CaptureConfig;
use screenshot_core::error::{CaptureError, CaptureResult};
use screenshot_core::model::{ImageArtifact, PlatformDescriptor};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "screenshot-cli")]
#[command(about = "Capture screenshots through the screenshot_rs native backend")]
struct Cli {
    /// Directory searched for backend artifacts
    #[arg(long, global = true)]
    backend_dir: Option<PathBuf>,

    /// Allow concurrent backend calls
    #[arg(long, global = true)]
    no_serialize: bool,

    /// Abort any single operation after this many milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Enable debug logging for backend resolution
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected displays
    List {
        /// Print the screen list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Capture one display to a PNG file
    Capture {
        /// Screen id from `list` (default: primary display)
        #[arg(long)]
        screen_id: Option<u32>,
        /// Output file path (default: screenshot-<timestamp>.png)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Capture every display to screenshot_by_id_<id>.png
    CaptureAll {
        /// Output directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Show platform, backend candidates and resolution outcome
    Doctor {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json)?;

    let mut config = CaptureConfig::from_env();
    if let Some(dir) = &cli.backend_dir {
        config = config.with_search_root(dir);
    }
    if cli.no_serialize {
        config = config.with_serialize_calls(false);
    }
    tracing::debug!("Using {:?}", config);

    let capture = ScreenCapture::new(config);
    let timeout = cli.timeout_ms.map(Duration::from_millis);

    match cli.command {
        Commands::List { json } => list_screens(&capture, timeout, json).await?,
        Commands::Capture { screen_id, out } => {
            capture_screen(&capture, timeout, screen_id, out).await?
        }
        Commands::CaptureAll { dir } => capture_all(&capture, timeout, &dir).await?,
        Commands::Doctor { json } => doctor(&capture, timeout, json).await?,
    }

    Ok(())
}

fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let core_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("screenshot_cli=info".parse()?)
        .add_directive(format!("screenshot_core={core_level}").parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// Runs `operation`, failing once `timeout` elapses
async fn bounded<T>(
    timeout: Option<Duration>,
    operation: impl Future<Output = CaptureResult<T>>,
) -> Result<T> {
    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, operation)
            .await
            .with_context(|| format!("Operation timed out after {}ms", limit.as_millis()))?,
        None => operation.await,
    };
    outcome.map_err(with_hint)
}

fn with_hint(error: CaptureError) -> anyhow::Error {
    anyhow::anyhow!("{}\n\nHint: {}", error, error.remediation_hint())
}

async fn list_screens(
    capture: &ScreenCapture,
    timeout: Option<Duration>,
    json: bool,
) -> Result<()> {
    let screens = bounded(timeout, capture.list_screens()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&screens)?);
        return Ok(());
    }

    println!("Found {} screens:\n", screens.len());
    for screen in &screens {
        println!("  ID: {}", screen.id);
        println!("  Position: ({}, {})", screen.x, screen.y);
        println!("  Size: {}x{}", screen.width, screen.height);
        println!("  Scale: {}", screen.scale_factor);
        if screen.rotation != 0 {
            println!("  Rotation: {}°", screen.rotation);
        }
        if screen.frequency > 0 {
            println!("  Refresh: {} Hz", screen.frequency);
        }
        if screen.is_primary {
            println!("  Primary: yes");
        }
        println!();
    }

    Ok(())
}

async fn capture_screen(
    capture: &ScreenCapture,
    timeout: Option<Duration>,
    screen_id: Option<u32>,
    out: Option<PathBuf>,
) -> Result<()> {
    let image = match screen_id {
        Some(id) => {
            println!("Capturing screen {}...", id);
            bounded(timeout, capture.capture_by_screen_id(id)).await?
        }
        None => {
            println!("Capturing primary display...");
            bounded(timeout, capture.capture_primary()).await?
        }
    };

    let out = out.unwrap_or_else(default_output_path);
    save_artifact(&image, &out)?;
    println!("✓ Screenshot saved to {} ({} bytes)", out.display(), image.len());
    Ok(())
}

async fn capture_all(
    capture: &ScreenCapture,
    timeout: Option<Duration>,
    dir: &Path,
) -> Result<()> {
    let screens = bounded(timeout, capture.list_screens()).await?;
    if screens.is_empty() {
        anyhow::bail!("No screens found");
    }

    for screen in &screens {
        println!("Capturing {}...", screen);
        let image = bounded(timeout, capture.capture_by_screen_id(screen.id)).await?;
        let out = dir.join(screen_file_name(screen.id));
        save_artifact(&image, &out)?;
        println!("✓ Screenshot saved to {}", out.display());
    }

    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DoctorReport {
    platform:    PlatformDescriptor,
    search_root: PathBuf,
    candidates:  Vec<String>,
    resolved:    bool,
    bound_names: Vec<&'static str>,
    serialized:  bool,
    error:       Option<String>,
    hint:        Option<String>,
}

async fn doctor(capture: &ScreenCapture, timeout: Option<Duration>, json: bool) -> Result<()> {
    let locator = capture.locator();
    let candidates: Vec<String> = locator
        .candidates()
        .map(|list| list.iter().map(BackendCandidate::to_string).collect())
        .unwrap_or_default();

    let resolution = match timeout {
        Some(limit) => tokio::time::timeout(limit, capture.operations())
            .await
            .with_context(|| format!("Resolution timed out after {}ms", limit.as_millis()))?,
        None => capture.operations().await,
    };

    let mut report = DoctorReport {
        platform:    locator.platform(),
        search_root: locator.search_root().to_path_buf(),
        candidates,
        resolved:    false,
        bound_names: Vec::new(),
        serialized:  false,
        error:       None,
        hint:        None,
    };
    match &resolution {
        Ok(operations) => {
            report.resolved = true;
            report.bound_names = operations.bound_names().to_vec();
            report.serialized = operations.is_serialized();
        }
        Err(e) => {
            report.error = Some(e.to_string());
            report.hint = Some(e.remediation_hint().to_string());
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if let Err(e) = resolution {
        return Err(anyhow::Error::new(e).context("Backend resolution failed"));
    }
    Ok(())
}

fn print_report(report: &DoctorReport) {
    println!("Platform: {}", report.platform);
    println!("Search root: {}", report.search_root.display());
    println!("Candidates:");
    if report.candidates.is_empty() {
        println!("  (none)");
    }
    for (index, candidate) in report.candidates.iter().enumerate() {
        println!("  {}. {}", index + 1, candidate);
    }
    println!();

    if report.resolved {
        println!("✓ Backend resolved");
        println!("  Bound: {}", report.bound_names.join(", "));
        println!("  Serialized calls: {}", if report.serialized { "yes" } else { "no" });
    } else {
        println!("✗ Backend unavailable");
        if let Some(error) = &report.error {
            println!("  Error: {}", error);
        }
        if let Some(hint) = &report.hint {
            println!("  Hint: {}", hint);
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from(format!(
        "screenshot-{}.png",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ))
}

fn screen_file_name(screen_id: u32) -> String {
    format!("screenshot_by_id_{screen_id}.png")
}

fn save_artifact(image: &ImageArtifact, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    image
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}
