mod error;
mod log;
mod model;
mod plugin;
mod remote;
mod runner;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use log::{Logger, TracingLogger};
use model::config::AppConfig;
use model::credentials::{EnvCredentials, RegistryAccess};
use model::mode::Mode;
use plugin::registry::GitHubRegistry;
use plugin::source::GitFetcher;
use plugin::{DirectorySyncer, PluginClassifier};
use remote::{ConnectionManager, SshConnector};
use runner::{CancellationToken, Orchestrator, RunSettings};

const APP_NAME: &str = "sftp-auto-sync";

/// Audit remote plugin directories over SFTP and re-sync targeted ones
/// from their source repositories.
#[derive(Debug, Parser)]
#[command(name = APP_NAME, version, about)]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Remote plugins directory, overrides the configured one
    #[arg(long)]
    plugins_dir: Option<String>,

    /// Check to run; repeat to enable several. Replaces the configured modes
    #[arg(short, long = "mode", value_name = "MODE")]
    modes: Vec<Mode>,

    /// Plugin eligible for update; repeatable, added to the configured targets
    #[arg(short, long = "target", value_name = "NAME")]
    targets: Vec<String>,
}

impl Args {
    fn apply(self, config: &mut AppConfig) -> error::Result<()> {
        if let Some(dir) = self.plugins_dir {
            config.general.plugins_dir = dir;
        }
        if !self.modes.is_empty() {
            config.general.modes = self.modes;
        }
        config.general.target_plugins.extend(self.targets);
        config.validate()
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Held until exit so buffered file logs are flushed.
    let _guard = match init_tracing() {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("{APP_NAME}: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok(processed) if processed > 0 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{APP_NAME}: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() -> Result<WorkerGuard> {
    let log_dir = directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join(APP_NAME));
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "sftp-auto-sync.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sftp_auto_sync=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(io::stdout),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}

/// Returns the number of plugins processed.
fn run(args: Args) -> Result<usize> {
    let logger: Arc<dyn Logger> = Arc::new(TracingLogger);
    tracing::debug!("{APP_NAME} starting");

    let mut config = AppConfig::load(args.config.as_deref(), logger.as_ref())?;
    args.apply(&mut config)?;

    let access = RegistryAccess::from_env();
    let settings = RunSettings::from_config(&config, &access)?;

    let connections = ConnectionManager::new(
        Box::new(SshConnector),
        Box::new(EnvCredentials::new()),
        &config.sftp,
        logger.clone(),
    );
    let fetcher = GitFetcher::new(
        config.registry.clone_host.clone(),
        access.namespace.clone().unwrap_or_default(),
        access.token().map(str::to_string),
    );
    let registry = GitHubRegistry::new(&config.registry)?;
    let classifier = PluginClassifier::new(
        Box::new(registry),
        access,
        &config.general.authors,
        logger.clone(),
    );
    let syncer = DirectorySyncer::new(Box::new(fetcher), logger.clone());

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("failed to install Ctrl-C handler")?;

    let mut orchestrator = Orchestrator::new(settings, connections, classifier, syncer, logger);
    let report = orchestrator.run(&mut io::stdout().lock(), &cancel)?;

    Ok(report.summary.processed)
}
