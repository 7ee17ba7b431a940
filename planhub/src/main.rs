//! Planhub - CLI entry point
//!
//! Wires configuration into the aggregator, prompt compiler, and run engine,
//! then serves HTTP or runs one-shot commands.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{Context, Result};
use serde_json::{Map, Value};
use tracing::{info, warn};

use planhub::cli::{Cli, Command, OutputFormat};
use planhub::config::Config;
use planhub::prompts::{ManifestCache, PromptCompiler, RemoteManifestSource};
use planhub::runtime::{AgentRegistry, MemoryRunStore, RunEngine};
use planhub::server::{create_router, AppState};
use planhub::signals::{FetchClient, HttpTransport, SignalAggregator, SignalCacheStore, SignalQuery};
use promptstore::{FsArtifactStore, UrlSigner};

fn setup_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(
        "Planhub loaded config: agents at {}, store at {}",
        config.fetch.base_url,
        config.storage.root.display()
    );

    match cli.command {
        Some(Command::Serve { port }) => cmd_serve(&config, port).await,
        Some(Command::Signals {
            subject_id,
            topic,
            week,
            day,
            force_refresh,
            format,
        }) => cmd_signals(&config, subject_id, topic, week, day, force_refresh, format).await,
        Some(Command::Compile {
            template_id,
            subject_id,
            vars,
        }) => cmd_compile(&config, template_id, subject_id, vars).await,
        None => {
            // Default to serving on the configured port.
            cmd_serve(&config, None).await
        }
    }
}

/// Build the shared application state from configuration
fn build_state(config: &Config) -> Result<AppState> {
    let bearer_token = std::env::var(&config.fetch.bearer_token_env).ok();
    if bearer_token.is_none() {
        warn!(
            "{} is not set; agent requests will be unauthenticated",
            config.fetch.bearer_token_env
        );
    }

    let transport = HttpTransport::new(
        &config.fetch.base_url,
        bearer_token,
        Duration::from_millis(config.fetch.timeout_ms),
    )
    .map_err(|e| eyre::eyre!("failed to build agent transport: {}", e))?;
    let client = FetchClient::new(Arc::new(transport), config.fetch.max_retries);
    let aggregator = Arc::new(SignalAggregator::new(
        client,
        config.agents.freshness_map(),
        Arc::new(SignalCacheStore::new()),
    ));

    let store = FsArtifactStore::open(&config.storage.root).context("Failed to open artifact store")?;
    let secret = std::env::var(&config.storage.signed_url_secret_env).unwrap_or_else(|_| {
        warn!(
            "{} is not set; signed URLs use a development secret",
            config.storage.signed_url_secret_env
        );
        "planhub-dev-secret".to_string()
    });
    let signer =
        UrlSigner::new(&config.storage.signed_url_base, secret).with_ttl_secs(config.storage.signed_url_ttl_secs);
    let manifest = match &config.manifest.url {
        Some(url) => ManifestCache::new(
            Box::new(RemoteManifestSource::new(url)),
            Duration::from_secs(config.manifest.ttl_secs),
        ),
        None => ManifestCache::embedded_only(),
    };
    let compiler = Arc::new(PromptCompiler::new(Arc::new(store), signer, manifest));

    let engine = Arc::new(RunEngine::new(
        AgentRegistry::with_builtins(),
        Arc::new(MemoryRunStore::new()),
    ));

    Ok(AppState::new(aggregator, compiler, engine))
}

async fn cmd_serve(config: &Config, port_override: Option<u16>) -> Result<()> {
    config.validate()?;

    let state = build_state(config)?;
    let router = create_router(state);

    let port = port_override.unwrap_or(config.server.port);
    let addr = format!("{}:{}", config.server.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind {}", addr))?;

    info!("Planhub listening on {}", addr);
    axum::serve(listener, router).await.context("Server error")?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_signals(
    config: &Config,
    subject_id: String,
    topic: String,
    week: Option<u32>,
    day: Option<u32>,
    force_refresh: bool,
    format: OutputFormat,
) -> Result<()> {
    config.validate()?;

    let state = build_state(config)?;
    let query = SignalQuery::new(subject_id, topic).with_window(week, day);
    let result = state.aggregator.get_all_signals(&query, force_refresh).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            println!(
                "hits={} misses={} nulls={} degraded={}",
                result.cache_hits,
                result.cache_misses,
                result.null_count(),
                result.is_degraded()
            );
            for (kind, signal) in &result.signals {
                let status = match signal {
                    Some(_) if !result.freshness[kind].is_stale => "fresh",
                    Some(_) => "stale",
                    None => "null",
                };
                println!("  {}: {}", kind, status);
            }
        }
    }
    Ok(())
}

async fn cmd_compile(config: &Config, template_id: String, subject_id: String, vars: Vec<String>) -> Result<()> {
    let state = build_state(config)?;

    let mut variables = Map::new();
    for pair in &vars {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| eyre::eyre!("variable '{}' is not KEY=VALUE", pair))?;
        // Numbers, booleans, and arrays parse as JSON; everything else is a string.
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        variables.insert(key.to_string(), value);
    }

    let compiled = state
        .compiler
        .compile(&template_id, &subject_id, &variables)
        .await
        .map_err(|e| eyre::eyre!("compile failed: {}", e))?;

    println!("{}", serde_json::to_string_pretty(&compiled)?);
    Ok(())
}
