use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;

use kodegen_bundler_notarize::config::DEFAULT_POLL_INTERVAL_SECS;
use kodegen_bundler_notarize::submit::{self, Altool};
use kodegen_bundler_notarize::{
    AppleIdCredentials, NotarizationInfo, NotarizeConfig, NotarizeOptions, error, logging,
    parse_notarization_info, success, warn, zip_app,
};

#[derive(Parser)]
#[command(name = "kodegen_notarize")]
#[command(version, about = "Notarize macOS app bundles for kodegen")]
struct Cli {
    /// Verbose diagnostics (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Zip an app bundle for upload
    Zip {
        /// Path to the .app bundle
        app: PathBuf,

        /// Directory to write the archive into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Parse a notarization report and print it as JSON
    Parse {
        /// Report file (reads stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Query the status of a submission once
    Info {
        /// Request UUID returned by the upload
        uuid: String,
    },

    /// Poll a submission until it finishes
    Wait {
        uuid: String,

        /// Seconds between status queries
        #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
        interval: u64,
    },

    /// Staple the notarization ticket to an app bundle
    Staple { app: PathBuf },

    /// Zip, upload, wait and staple in one go
    Notarize {
        /// Path to config file (TOML)
        #[arg(long, short = 'c', conflicts_with_all = ["app", "bundle_id"])]
        config: Option<PathBuf>,

        /// Path to the .app bundle (credentials come from APPLE_ID / APPLE_PASSWORD)
        #[arg(long, requires = "bundle_id")]
        app: Option<PathBuf>,

        /// Primary bundle identifier
        #[arg(long, requires = "app")]
        bundle_id: Option<String>,

        /// Seconds between status queries (overrides the config file)
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli.command).await {
        error!("{e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Zip { app, out } => run_zip(&app, &out).await,
        Command::Parse { file } => run_parse(file.as_deref()).await,
        Command::Info { uuid } => run_info(&uuid).await,
        Command::Wait { uuid, interval } => run_wait(&uuid, interval).await,
        Command::Staple { app } => {
            submit::staple_app(&app).await?;
            success!("Ticket stapled to {}", app.display());
            Ok(())
        }
        Command::Notarize {
            config,
            app,
            bundle_id,
            interval,
        } => run_notarize(config, app, bundle_id, interval).await,
    }
}

async fn run_zip(app: &Path, out: &Path) -> Result<()> {
    tokio::fs::create_dir_all(out).await?;
    let zip_path = zip_app(out, app).await?;
    success!("Archive created: {}", zip_path.display());
    Ok(())
}

async fn run_parse(file: Option<&Path>) -> Result<()> {
    let text = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            text
        }
    };

    let info = parse_notarization_info(&text);
    if info == NotarizationInfo::default() {
        warn!("No notarization report fields found in input");
    }
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

async fn run_info(uuid: &str) -> Result<()> {
    let credentials = AppleIdCredentials::from_env()?;
    let info = submit::notarization_info(uuid, &credentials).await?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

async fn run_wait(uuid: &str, interval: u64) -> Result<()> {
    let altool = Altool::new(AppleIdCredentials::from_env()?);
    let info = submit::wait_for_notarization(&altool, uuid, poll_interval(interval)?).await?;
    success!(
        "Notarization succeeded: {}",
        info.status_message.as_deref().unwrap_or("no status message")
    );
    Ok(())
}

async fn run_notarize(
    config: Option<PathBuf>,
    app: Option<PathBuf>,
    bundle_id: Option<String>,
    interval: Option<u64>,
) -> Result<()> {
    let (options, interval) = match (config, app, bundle_id) {
        (Some(path), _, _) => {
            let config = NotarizeConfig::from_file(&path).await?;
            let interval = resolve_interval(interval, config.poll_interval())?;
            (NotarizeOptions::from(config), interval)
        }
        (None, Some(app_path), Some(bundle_id)) => (
            NotarizeOptions {
                app_path,
                bundle_id,
                credentials: AppleIdCredentials::from_env()?,
            },
            resolve_interval(interval, Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS))?,
        ),
        _ => anyhow::bail!("Pass either --config or --app with --bundle-id"),
    };

    submit::check_dependencies().await?;

    println!("🔐 Notarizing {}", options.app_path.display());
    let info = submit::notarize(&options, interval).await?;

    success!("Notarization succeeded!");
    if let Some(url) = &info.log_file_url {
        println!("   Log: {url}");
    }
    success!("Ticket stapled to app");
    Ok(())
}

fn poll_interval(secs: u64) -> Result<Duration> {
    if secs == 0 {
        anyhow::bail!("--interval must be at least 1 second");
    }
    Ok(Duration::from_secs(secs))
}

/// An explicit `--interval` wins over the configured one.
fn resolve_interval(flag: Option<u64>, configured: Duration) -> Result<Duration> {
    match flag {
        Some(secs) => poll_interval(secs),
        None => Ok(configured),
    }
}
