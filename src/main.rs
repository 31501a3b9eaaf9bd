//! CLI entry point for the series resolver.

use std::collections::HashSet;
use std::io::{self, IsTerminal, Read, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use series_resolver::config::{self, EngineConfig};
use series_resolver::resolver::{BatchStats, KeyOutcome};
use series_resolver::{
    Database, ResolutionRequest, ResolutionStatus, SeriesResolver, SeriesStore,
};
use tracing::{debug, info, warn};

mod cli;
mod input;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Results go to stdout; logs stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = build_config(&args)?;
    debug!(?config, "engine config resolved");

    let input_text = if !args.inputs.is_empty() {
        let mut text = String::new();
        for path in &args.inputs {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read input file '{}'", path.display()))?;
            text.push_str(&content);
            text.push('\n');
        }
        text
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        info!("No input provided. Pipe JSON-line requests via stdin or pass files as arguments.");
        info!(r#"Example: echo '{{"title": "Fourth Wing", "author": "Rebecca Yarros"}}' | series-resolver"#);
        return Ok(());
    };

    let mut parsed = input::parse_requests(&input_text);
    for (line, reason) in &parsed.skipped {
        warn!(line, reason = %reason, "Skipped input line");
    }
    if let Some(limit) = args.limit {
        parsed
            .requests
            .truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    }
    if parsed.requests.is_empty() {
        info!("No valid requests found in input");
        return Ok(());
    }
    info!(
        requests = parsed.requests.len(),
        skipped = parsed.skipped.len(),
        "Parsed input"
    );

    let store = match &args.db {
        Some(path) => {
            let db = Database::new(path)
                .await
                .with_context(|| format!("failed to open database '{}'", path.display()))?;
            Some(SeriesStore::new(db))
        }
        None => None,
    };
    let already_resolved = match &store {
        Some(store) if !args.no_skip => store.existing_keys().await?,
        _ => HashSet::new(),
    };

    let resolver =
        SeriesResolver::wikidata(&config).context("failed to build knowledge-base client")?;

    let outcomes = if args.single {
        resolve_each(&resolver, &parsed.requests, &already_resolved).await
    } else {
        resolver
            .resolve_batch(&parsed.requests, &already_resolved)
            .await?
            .into_iter()
            .collect()
    };

    let mut stdout = io::stdout().lock();
    for outcome in &outcomes {
        serde_json::to_writer(&mut stdout, outcome)?;
        writeln!(stdout)?;
    }
    stdout.flush()?;

    if let Some(store) = &store {
        let mut saved = 0_usize;
        for (request, outcome) in parsed.requests.iter().zip(&outcomes) {
            if let Some(link) = &outcome.link {
                store.save_link(request, link).await?;
                saved += 1;
            }
        }
        info!(saved, stored = store.count().await?, "Links saved");
    }

    let stats = BatchStats::from_outcomes(&outcomes);
    info!(
        total = stats.total,
        resolved = stats.resolved,
        no_match = stats.no_match,
        skipped_existing = stats.skipped_existing,
        skipped_no_key = stats.skipped_no_key,
        cumulative_delay_ms =
            u64::try_from(resolver.dispatcher().throttle().cumulative_delay().as_millis())
                .unwrap_or(u64::MAX),
        "Resolution complete"
    );

    Ok(())
}

/// Layers CLI flags over the config file over the built-in defaults.
fn build_config(args: &Args) -> Result<EngineConfig> {
    let file_config = match &args.config {
        Some(path) => Some(config::load_file_config(path)?),
        None => {
            let loaded = config::load_default_file_config()?;
            if let (Some(path), Some(_)) = (&loaded.path, &loaded.config) {
                debug!(path = %path.display(), "loaded config file");
            }
            loaded.config
        }
    };

    let mut engine_config = EngineConfig::default();
    if let Some(file_config) = &file_config {
        file_config.apply_to(&mut engine_config);
    }
    if let Some(ms) = args.rate_limit {
        engine_config.min_delay = Duration::from_millis(ms);
    }
    if let Some(secs) = args.timeout {
        engine_config.query_timeout = Duration::from_secs(secs);
    }
    if let Some(limit) = args.search_limit {
        engine_config.search_limit = usize::try_from(limit)?;
    }
    if let Some(size) = args.batch_size {
        engine_config.batch_size = usize::try_from(size)?;
    }
    if args.no_fallback {
        engine_config.fallback_after_batch = false;
    }
    engine_config.validate()?;
    Ok(engine_config)
}

/// Runs the full cascade for each request in turn.
async fn resolve_each(
    resolver: &SeriesResolver,
    requests: &[ResolutionRequest],
    already_resolved: &HashSet<String>,
) -> Vec<KeyOutcome> {
    let mut outcomes = Vec::with_capacity(requests.len());
    for request in requests {
        let (status, link) = if already_resolved.contains(&request.key) {
            (ResolutionStatus::SkippedExisting, None)
        } else {
            match resolver.resolve_one(request).await {
                Ok(Some(link)) => (ResolutionStatus::Resolved, Some(link)),
                Ok(None) if request.has_lookup_key() => (ResolutionStatus::NoMatch, None),
                Ok(None) => (ResolutionStatus::SkippedNoKey, None),
                Err(e) => {
                    warn!(key = %request.key, error = %e, "Request rejected");
                    (ResolutionStatus::SkippedNoKey, None)
                }
            }
        };
        outcomes.push(KeyOutcome {
            key: request.key.clone(),
            status,
            link,
        });
    }
    outcomes
}
