use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};

use devlink_core::config::DEFAULT_ENV_FILES;
use devlink_core::{EnvSource, MongoStore, ReconcileConfig, normalize_email};
use devlink_reconcile::{IndexOutcome, ReconcileOptions, Reconciler};

const DEFAULT_LOGGING_CONFIG: &str = "warn,devlink_core=info,devlink_reconcile=info";
const VERBOSE_LOGGING_CONFIG: &str = "info,devlink_core=debug,devlink_reconcile=debug";

#[derive(Parser, Debug)]
#[command(
    name = "devlink-reconcile",
    about = "Merge DevLink accounts that share an email address",
    version,
    long_about = None
)]
struct Cli {
    /// Write the merge decisions. Without this flag the run only reports them.
    #[arg(long)]
    apply: bool,

    /// Only reconcile accounts with this email. Skips the unique index step.
    #[arg(long, value_name = "EMAIL")]
    email: Option<String>,

    /// Env file to read settings from. May be repeated; earlier files win.
    /// Defaults to .env.local then .env.
    #[arg(long = "env-file", value_name = "PATH", action = clap::ArgAction::Append)]
    env_files: Vec<PathBuf>,

    /// Increase log verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn env_files(&self) -> Vec<PathBuf> {
        if self.env_files.is_empty() {
            DEFAULT_ENV_FILES.iter().map(PathBuf::from).collect()
        } else {
            self.env_files.clone()
        }
    }

    fn options(&self) -> Result<ReconcileOptions> {
        let email_filter = match &self.email {
            None => None,
            Some(raw) => match normalize_email(raw) {
                Some(email) => Some(email),
                None => bail!("--email must be a non-empty address, got {raw:?}"),
            },
        };
        Ok(ReconcileOptions {
            apply: self.apply,
            email_filter,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    configure_logging(cli.verbose);

    let options = cli.options()?;
    let config = load_config(&cli)?;
    let store = Arc::new(
        MongoStore::connect(&config)
            .await
            .context("Failed to connect to MongoDB")?,
    );

    info!(mode = ?options.mode(), email = ?options.email_filter, "starting reconciliation");
    let reconciler = Reconciler::new(store.clone(), store, options);

    let mut stdout = std::io::stdout().lock();
    let mut summary = reconciler
        .run_groups(|report| {
            if let Err(e) = print_json(&mut stdout, report) {
                error!(error = %e, "failed to write group report");
            }
        })
        .await
        .context("Failed to load duplicate groups")?;

    let index_result = reconciler.ensure_email_index().await;
    summary.index = match &index_result {
        Ok(outcome) => *outcome,
        Err(_) => IndexOutcome::Failed,
    };
    print_json(&mut stdout, &summary)?;

    index_result.context("Failed to ensure unique email index")?;
    Ok(())
}

fn load_config(cli: &Cli) -> Result<ReconcileConfig> {
    let mut env = EnvSource::new().with_process_env();
    for path in cli.env_files() {
        env = env
            .with_file(&path)
            .with_context(|| format!("Failed to read env file {}", path.display()))?;
    }
    Ok(ReconcileConfig::from_env(&env)?)
}

fn print_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn configure_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    // Use configuration from RUST_LOG env var if provided
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => match verbosity {
            0 => EnvFilter::new(DEFAULT_LOGGING_CONFIG),
            _ => EnvFilter::new(VERBOSE_LOGGING_CONFIG),
        },
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .init();
}
