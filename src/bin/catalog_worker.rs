//! catalog-worker: reads one request from stdin, runs its jobs against the
//! remote API, writes response envelopes to stdout.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use catalog_worker::client::HttpClient;
use catalog_worker::config::Config;
use catalog_worker::engine::{DefaultApiWorker, Dispatcher};
use catalog_worker::telemetry::{TelemetryConfig, init_telemetry};
use clap::Parser;
use tokio::io::BufReader;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "catalog-worker", about = "Run a batch of REST API jobs and stream the results")]
struct Cli {
    /// Base URL of the remote API
    #[arg(long, env = "CATALOG_WORKER_URL", default_value = "")]
    url: String,
    /// Bearer token for the remote API
    #[arg(long, env = "CATALOG_WORKER_TOKEN", default_value = "", hide_env_values = true)]
    token: String,
    /// Log debug messages
    #[arg(long)]
    debug: bool,
    /// Skip TLS certificate verification
    #[arg(long = "skip_verify_ssl", alias = "skip-verify-ssl")]
    skip_verify_ssl: bool,
    /// Directory for the log file (defaults to the system temp dir)
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// OTLP endpoint for traces, metrics and logs
    #[arg(long, env = "OTEL_ENDPOINT")]
    otel_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::new(&cli.url, cli.token)?
        .debug(cli.debug)
        .skip_verify_ssl(cli.skip_verify_ssl)
        .otel_endpoint(cli.otel_endpoint);
    if let Some(dir) = cli.log_dir {
        config = config.log_dir(dir);
    }

    let log_path = config.log_file_path();
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("error opening log file {}", log_path.display()))?;

    let guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "catalog-worker".to_string(),
        log_file: Some(log_file),
        debug: config.debug,
    })?;
    let log = guard.dispatch().clone();

    let result = run(Arc::new(config), log.clone())
        .with_subscriber(log.clone())
        .await;
    if let Err(ref e) = result {
        tracing::dispatcher::with_default(&log, || error!(error = %e, "catalog worker failed"));
    }
    result
}

async fn run(config: Arc<Config>, log: tracing::Dispatch) -> anyhow::Result<()> {
    let client = HttpClient::new(&config)?;
    let worker = DefaultApiWorker::new(Arc::clone(&config), Arc::new(client));
    let dispatcher = Dispatcher::new(Arc::new(worker), log);

    let mut stdin = BufReader::new(tokio::io::stdin());
    let line = Dispatcher::read_request(&mut stdin)
        .await
        .context("error getting request data")?;

    debug!("parsing incoming request");
    let request = Dispatcher::parse_request(&line).context("error parsing request")?;

    debug!("processing request");
    dispatcher
        .process_request(request, tokio::io::stdout())
        .await?;

    info!("finished catalog worker");
    Ok(())
}
