use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use garak_sdk::{
    ClientConfig, CreateScanRequest, GarakClient, ReportType, ScanStatusResponse, WaitOptions,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "garak",
    author,
    version,
    about = "Command-line client for the Garak LLM vulnerability scanner"
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    /// Service root URL (overrides the config file and GARAK_API_BASE_URL)
    #[arg(long, value_name = "URL", global = true)]
    base_url: Option<String>,

    /// API key (overrides the config file, GARAK_API_KEY and GARAK_SDK_API_KEY)
    #[arg(long, value_name = "KEY", global = true)]
    api_key: Option<String>,

    /// Settings file (TOML, YAML or JSON) with base_url, api_key, timeout_secs, verify_ssl
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    timeout_secs: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check service health
    Health,
    /// Show API version and capabilities
    Info,
    /// Show scan quota for the current key
    Quota,
    /// List available generators
    Generators,
    /// List probe categories, or the probes in one category
    Probes {
        #[arg(value_name = "CATEGORY")]
        category: Option<String>,
    },
    /// Submit a new scan
    Create(CreateArgs),
    /// Show the current status of a scan
    Status {
        #[arg(value_name = "SCAN_ID")]
        scan_id: String,
        /// Include the tail of the scan output log
        #[arg(long)]
        output: bool,
    },
    /// Wait for a scan to finish
    Wait {
        #[arg(value_name = "SCAN_ID")]
        scan_id: String,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Show the results of a finished scan
    Results {
        #[arg(value_name = "SCAN_ID")]
        scan_id: String,
    },
    /// List or download the reports of a scan
    Reports {
        #[arg(value_name = "SCAN_ID")]
        scan_id: String,
        /// Download available reports into this directory instead of listing them
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Restrict downloads to these report types (json, jsonl, html, hits)
        #[arg(long = "type", value_name = "TYPE")]
        types: Vec<ReportType>,
        /// Replace files that already exist
        #[arg(long)]
        overwrite: bool,
    },
    /// Request cancellation of a scan
    Cancel {
        #[arg(value_name = "SCAN_ID")]
        scan_id: String,
    },
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// Generator to scan (openai, anthropic, huggingface, rest, ...)
    #[arg(long)]
    generator: String,
    /// Target model name
    #[arg(long)]
    model: String,
    /// Probe category to run; repeatable
    #[arg(long = "category", value_name = "CATEGORY")]
    categories: Vec<String>,
    /// Individual probe to run; repeatable
    #[arg(long = "probe", value_name = "PROBE")]
    probes: Vec<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// Run on the free tier
    #[arg(long)]
    free_tier: bool,
    /// Block until the scan finishes and print its record
    #[arg(long)]
    wait: bool,
    #[command(flatten)]
    wait_args: WaitArgs,
}

#[derive(Args, Debug, Clone, Copy)]
struct WaitArgs {
    /// Give up waiting after this long (e.g. 30m, 1h)
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration, default_value = "1h")]
    timeout: Duration,
    /// Delay between status polls (e.g. 10s)
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration, default_value = "10s")]
    poll_interval: Duration,
}

impl From<WaitArgs> for WaitOptions {
    fn from(args: WaitArgs) -> Self {
        WaitOptions::new(args.timeout, args.poll_interval)
    }
}

/// Optional settings file; every field falls back to the environment.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    verify_ssl: Option<bool>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let client = build_client(&cli.connection)?;
    let outcome = run(&client, cli.command).await;
    client.close();
    outcome
}

async fn run(client: &GarakClient, command: Commands) -> Result<()> {
    match command {
        Commands::Health => {
            let health = client.health_check().await.context("health check failed")?;
            print_json(&health)?;
            if !health.is_healthy() {
                bail!("service reported status `{}`", health.status);
            }
        }
        Commands::Info => print_json(&client.api_info().await?)?,
        Commands::Quota => print_json(&client.scans().quota().await?)?,
        Commands::Generators => print_json(&client.metadata().list_generators().await?)?,
        Commands::Probes { category: None } => {
            print_json(&client.metadata().list_probe_categories().await?)?
        }
        Commands::Probes {
            category: Some(category),
        } => print_json(&client.metadata().list_probes(&category).await?)?,
        Commands::Create(args) => create(client, args).await?,
        Commands::Status { scan_id, output } => {
            print_json(&client.scans().status(&scan_id, output).await?)?
        }
        Commands::Wait { scan_id, wait } => {
            print_json(&wait_for(client, &scan_id, wait.into()).await?)?
        }
        Commands::Results { scan_id } => print_json(&client.scans().results(&scan_id).await?)?,
        Commands::Reports {
            scan_id,
            out: None,
            ..
        } => print_json(&client.reports().list(&scan_id).await?)?,
        Commands::Reports {
            scan_id,
            out: Some(dir),
            types,
            overwrite,
        } => download_reports(client, &scan_id, &dir, &types, overwrite).await?,
        Commands::Cancel { scan_id } => print_json(&client.scans().cancel(&scan_id).await?)?,
    }
    Ok(())
}

async fn create(client: &GarakClient, args: CreateArgs) -> Result<()> {
    let mut request = CreateScanRequest::new(args.generator, args.model)
        .probe_categories(args.categories)
        .probes(args.probes)
        .use_free_tier(args.free_tier);
    if let Some(name) = args.name {
        request = request.name(name);
    }
    if let Some(description) = args.description {
        request = request.description(description);
    }

    let scan = client
        .scans()
        .create(&request)
        .await
        .context("failed to create scan")?;
    if !args.wait {
        return print_json(&scan);
    }
    eprintln!("scan {} submitted, waiting for completion", scan.id());
    let finished = wait_for(client, scan.id(), args.wait_args.into()).await?;
    print_json(&finished)
}

async fn wait_for(
    client: &GarakClient,
    scan_id: &str,
    options: WaitOptions,
) -> Result<garak_sdk::Scan> {
    let mut report_progress = |status: &ScanStatusResponse| -> garak_sdk::Result<()> {
        eprintln!(
            "{}: {} ({}/{} items, {:.1}%)",
            status.scan_id,
            status.status,
            status.progress.completed_items,
            status.progress.total_items,
            status.progress.progress_percent
        );
        Ok(())
    };
    let scans = client.scans();
    let wait = scans.wait_for_completion(scan_id, options, Some(&mut report_progress));
    tokio::select! {
        finished = wait => finished.with_context(|| format!("waiting for scan {scan_id} failed")),
        _ = tokio::signal::ctrl_c() => {
            warn!(scan_id, "interrupted; the scan keeps running on the service");
            bail!("interrupted while waiting for scan {scan_id}")
        }
    }
}

async fn download_reports(
    client: &GarakClient,
    scan_id: &str,
    dir: &Path,
    types: &[ReportType],
    overwrite: bool,
) -> Result<()> {
    let filter = (!types.is_empty()).then_some(types);
    let written = client
        .reports()
        .download_all(scan_id, dir, filter, overwrite)
        .await
        .with_context(|| format!("failed to download reports into {}", dir.display()))?;
    if written.is_empty() {
        eprintln!("no matching reports available for scan {scan_id}");
    }
    print_json(&written)
}

fn build_client(args: &ConnectionArgs) -> Result<GarakClient> {
    let mut config = ClientConfig::from_env();
    if let Some(path) = &args.config {
        let file = load_settings(path)?;
        if let Some(base_url) = file.base_url {
            config = config.with_base_url(base_url);
        }
        if let Some(api_key) = file.api_key {
            config = config.with_api_key(api_key);
        }
        if let Some(secs) = file.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(verify_ssl) = file.verify_ssl {
            config = config.with_verify_ssl(verify_ssl);
        }
    }
    if let Some(base_url) = &args.base_url {
        config = config.with_base_url(base_url.clone());
    }
    if let Some(api_key) = &args.api_key {
        config = config.with_api_key(api_key.clone());
    }
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if args.insecure {
        warn!("TLS certificate verification disabled");
        config = config.with_verify_ssl(false);
    }
    debug!(base_url = %config.base_url, timeout = ?config.timeout, "connection settings");
    GarakClient::new(config).context("failed to initialise Garak client")
}

fn load_settings(path: &Path) -> Result<FileSettings> {
    config::Config::builder()
        .add_source(config::File::from(path))
        .build()
        .and_then(|settings| settings.try_deserialize())
        .with_context(|| format!("failed to load settings from {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
