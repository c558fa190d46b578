//! cloudchunk command line
//!
//! Thin CLI over [`ChunkEngine`]: one object operation per invocation, against
//! a local directory store or a Swift endpoint.
//!
//! ```text
//! cloudchunk --local-root /srv/store put ./disk.img /backups/disk.img
//! cloudchunk --storage-url https://swift/v1/AUTH_x --token $TOKEN get /backups/disk.img ./disk.img
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cloudchunk::config::{AppConfig, RetryConfig, StoreConfig};
use cloudchunk::{adapters, ChunkEngine, CodecKind, ObjectStore};

// =============================================================================
// CLI Arguments
// =============================================================================

/// cloudchunk - store large files as compressed chunks in an object store
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(long, env = "CLOUDCHUNK_CONFIG")]
    config: Option<PathBuf>,

    /// Use a local directory as the object store
    #[arg(long, env = "CLOUDCHUNK_LOCAL_ROOT", conflicts_with = "storage_url")]
    local_root: Option<PathBuf>,

    /// Swift storage URL
    #[arg(long, env = "CLOUDCHUNK_STORAGE_URL", requires = "token")]
    storage_url: Option<String>,

    /// Swift auth token
    #[arg(long, env = "CLOUDCHUNK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Worker threads per transfer
    #[arg(long, env = "CLOUDCHUNK_WORKERS")]
    workers: Option<usize>,

    /// Chunk size in bytes, before compression
    #[arg(long, env = "CLOUDCHUNK_CHUNK_SIZE")]
    chunk_size: Option<usize>,

    /// Chunk codec (zlib, lz4, none)
    #[arg(long, env = "CLOUDCHUNK_CODEC")]
    codec: Option<CodecKind>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Print prometheus metrics to stdout after the command
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a local file as an object
    Put { local: PathBuf, path: String },
    /// Download an object to a local file ("-" for stdout)
    Get { path: String, local: PathBuf },
    /// Delete an object and all of its chunks
    Rm { path: String },
    /// Server-side copy of an object
    Cp { src: String, dst: String },
    /// Create a directory marker
    Mkdir { path: String },
    /// Truncate an object (only to zero bytes)
    Truncate {
        path: String,
        #[arg(long, default_value_t = 0)]
        size: u64,
    },
}

// =============================================================================
// Main
// =============================================================================

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    init_logging(&args);

    let config = resolve_config(&args)?;
    info!(
        chunk_size = config.engine.chunk_size,
        workers = config.engine.workers,
        codec = %config.engine.codec,
        "starting cloudchunk"
    );
    if matches!(config.store, StoreConfig::Memory) {
        warn!("no store configured, using a process-local memory store");
    }

    let store = adapters::from_config(&config.store).context("failed to open object store")?;
    let engine = ChunkEngine::new(store, config.engine).context("invalid engine configuration")?;

    let ok = run(&engine, &args.command)?;

    if args.metrics {
        print!("{}", engine.metrics().encode_text()?);
    }

    if ok {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn run(engine: &ChunkEngine<Arc<dyn ObjectStore>>, command: &Command) -> Result<bool> {
    let ok = match command {
        Command::Put { local, path } => {
            let data = std::fs::read(local)
                .with_context(|| format!("failed to read {}", local.display()))?;
            engine.write_object(path, &data)
        }
        Command::Get { path, local } => {
            if local.as_os_str() == "-" {
                let stdout = std::io::stdout();
                let mut sink = stdout.lock();
                let ok = engine.read_object(path, &mut sink);
                sink.flush()?;
                ok
            } else {
                match engine.read_object_to_vec(path) {
                    Some(data) => {
                        std::fs::write(local, data)
                            .with_context(|| format!("failed to write {}", local.display()))?;
                        true
                    }
                    None => false,
                }
            }
        }
        Command::Rm { path } => engine.delete_object(path),
        Command::Cp { src, dst } => engine.copy_object(src, dst),
        Command::Mkdir { path } => engine.create_directory(path),
        Command::Truncate { path, size } => engine.truncate_object(path, *size),
    };
    Ok(ok)
}

/// Config file (if any) with CLI flags layered on top.
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };

    if let Some(root) = &args.local_root {
        config.store = StoreConfig::Local { root: root.clone() };
    }
    if let (Some(storage_url), Some(token)) = (&args.storage_url, &args.token) {
        let retry = match &config.store {
            StoreConfig::Swift { retry, .. } => retry.clone(),
            _ => RetryConfig::default(),
        };
        config.store = StoreConfig::Swift {
            storage_url: storage_url.clone(),
            token: token.clone(),
            verify_tls: true,
            connect_timeout_secs: 10,
            retry,
        };
    }
    if let Some(workers) = args.workers {
        config.engine.workers = workers;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.engine.chunk_size = chunk_size;
    }
    if let Some(codec) = args.codec {
        config.engine.codec = codec;
    }

    config.validate()?;
    Ok(config)
}

// =============================================================================
// Logging
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Logs go to stderr so `get <path> -` can stream the object on stdout.
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
