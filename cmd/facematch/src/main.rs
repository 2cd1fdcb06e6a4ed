//! facematch - enroll faces and match photos against a local gallery.

mod config;
mod remote;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use facematch_service::MatchService;
use facematch_store::{RedbStore, SignatureStore};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use config::CliConfig;
use remote::RemoteEncoder;

/// facematch - 1:N face matching against an enrolled gallery.
///
/// Signatures are produced by an external encoder service (encoder_url)
/// and kept in a local database (store_path).
///
/// Configuration is read from ~/.facematch/config.yaml.
#[derive(Parser)]
#[command(name = "facematch")]
#[command(about = "1:N face matching CLI")]
#[command(version)]
struct Cli {
    /// Config file (default is ~/.facematch/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gallery database, overrides store_path
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll one or more photos under an identity
    Enroll {
        identity: String,
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Remove an identity, or a single signature with --index
    Remove {
        identity: String,
        #[arg(long)]
        index: Option<usize>,
    },
    /// List enrolled identities
    List,
    /// Match a photo against the gallery
    Evaluate {
        image: PathBuf,
        /// Override the configured match threshold
        #[arg(long)]
        threshold: Option<f32>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut cfg = CliConfig::load(cli.config.as_deref())?;
    if let Some(path) = &cli.store {
        cfg.store_path = Some(path.clone());
    }

    match &cli.command {
        Commands::Enroll { identity, images } => enroll(&cli, &cfg, identity, images),
        Commands::Remove { identity, index } => remove(&cli, &cfg, identity, *index),
        Commands::List => list(&cli, &cfg),
        Commands::Evaluate { image, threshold } => evaluate(&cli, &cfg, image, *threshold),
    }
}

fn open_store(cfg: &CliConfig) -> Result<Arc<RedbStore>> {
    let path = cfg.store_path()?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let store = RedbStore::open(&path, cfg.service.store_config())
        .with_context(|| format!("failed to open gallery {}", path.display()))?;
    tracing::debug!("opened gallery {} ({} identities)", path.display(), store.len()?);
    Ok(Arc::new(store))
}

fn open_service(cfg: &CliConfig) -> Result<MatchService> {
    if cfg.encoder_url.is_empty() {
        bail!("encoder_url is not configured");
    }
    let timeout = (cfg.timeout > 0).then(|| Duration::from_secs(cfg.timeout));
    let encoder = RemoteEncoder::new(&cfg.encoder_url, cfg.service.dimension, timeout)?;
    let service = MatchService::new(&cfg.service, Arc::new(encoder), open_store(cfg)?)?;
    Ok(service)
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn enroll(cli: &Cli, cfg: &CliConfig, identity: &str, images: &[PathBuf]) -> Result<()> {
    let service = open_service(cfg)?;
    for path in images {
        let region = service
            .enroll_image(identity, &read_image(path)?)
            .with_context(|| format!("failed to enroll {}", path.display()))?;
        if cli.json {
            println!(
                "{}",
                json!({ "identity": identity, "image": path, "region": region })
            );
        } else {
            println!(
                "enrolled {} from {} (face at {:.0},{:.0} {:.0}x{:.0})",
                identity,
                path.display(),
                region.x,
                region.y,
                region.width,
                region.height
            );
        }
    }
    Ok(())
}

fn remove(cli: &Cli, cfg: &CliConfig, identity: &str, index: Option<usize>) -> Result<()> {
    let store = open_store(cfg)?;
    let removed = match index {
        Some(i) => {
            store.remove_signature(identity, i)?;
            json!({ "identity": identity, "index": i })
        }
        None => {
            let record = store.remove(identity)?;
            json!({ "identity": identity, "signatures": record.signatures().len() })
        }
    };
    if cli.json {
        println!("{removed}");
    } else if let Some(i) = index {
        println!("removed signature {i} of {identity}");
    } else {
        println!("removed {identity}");
    }
    Ok(())
}

fn list(cli: &Cli, cfg: &CliConfig) -> Result<()> {
    let snapshot = open_store(cfg)?.all()?;
    if cli.json {
        let items: Vec<_> = snapshot
            .iter()
            .map(|r| {
                json!({
                    "identity": r.identity(),
                    "signatures": r.signatures().len(),
                    "enrolled_at": r.enrolled_at(),
                    "updated_at": r.updated_at(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if snapshot.is_empty() {
        println!("no identities enrolled");
        return Ok(());
    }
    println!("{:<24} {:>10}  {}", "IDENTITY", "SIGNATURES", "UPDATED");
    for r in &snapshot {
        println!(
            "{:<24} {:>10}  {}",
            r.identity(),
            r.signatures().len(),
            r.updated_at().format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

fn evaluate(cli: &Cli, cfg: &CliConfig, image: &Path, threshold: Option<f32>) -> Result<()> {
    let service = open_service(cfg)?;
    let decision = service.evaluate_with(&read_image(image)?, threshold)?;
    if cli.json {
        println!("{}", serde_json::to_string(&decision)?);
    } else {
        println!("{decision}");
    }
    Ok(())
}
