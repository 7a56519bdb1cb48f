// Dorks a domain for office documents and mines them for metadata

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use doc_harvester::fetch::HttpFetcher;
use doc_harvester::harvest::DocumentPipeline;
use doc_harvester::search::{discover_documents, providers_from_settings, DEFAULT_EXTENSIONS};
use doc_harvester::settings::{ensure_settings_file_path, UserSettings};
use doc_harvester::{report, HarvesterExecutor, Notifier, DEFAULT_WORKERS};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "doc-harvester")]
#[command(about = "Find a domain's public documents and extract the people, hosts and paths they leak")]
struct Cli {
    /// Suppress progress and per-document notices
    #[arg(long)]
    silent: bool,

    /// Set API keys: "bing=...,googleKey=...,googleId=..."
    #[arg(long, value_name = "PAIRS")]
    config: Option<String>,

    /// Domain to dork, e.g. example.com
    #[arg(long, value_name = "DOMAIN")]
    search: Option<String>,

    /// File extensions to dork for
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect::<Vec<_>>()
    )]
    extensions: Vec<String>,

    /// Documents fetched and analysed concurrently
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    threads: usize,

    /// Also write the results to this JSON file
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.silent { "warn" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if cli.config.is_none() && cli.search.is_none() {
        bail!("nothing to do: pass --config to store API keys and/or --search <domain>");
    }

    let settings_file =
        ensure_settings_file_path().context("Failed to prepare the settings directory")?;

    if let Some(pairs) = &cli.config {
        UserSettings::update(&settings_file, pairs).context("Failed to save settings")?;
        tracing::info!(path = %settings_file.display(), "Settings saved");
    }

    let Some(domain) = cli.search.as_deref() else {
        return Ok(());
    };

    let settings = UserSettings::read(&settings_file).context("Failed to read settings")?;
    let notifier = Notifier::new(cli.silent);

    // Discover
    let client = reqwest::Client::new();
    let providers = providers_from_settings(&settings, &client, notifier);
    let tasks = discover_documents(&providers, domain, &cli.extensions, notifier).await;

    // Harvest
    let pipeline = Arc::new(
        DocumentPipeline::new(HttpFetcher::with_client(client)).with_notifier(notifier),
    );
    let run = HarvesterExecutor::new(cli.threads)
        .execute(pipeline, tasks)
        .await;

    // Report
    let results = report::reduce(&run.results);
    if let Some(path) = &cli.json {
        if let Err(e) = report::write_json(&results, path) {
            notifier.failure(e);
        }
    }

    notifier.progress("Printing results:");
    print!("{}", report::render_text(&results));

    Ok(())
}
