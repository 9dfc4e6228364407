use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use civ_meta::aggregate::SamplingAggregator;
use civ_meta::api::state::AppState;
use civ_meta::calculate::duration::{classify, duration_minutes, is_realistic};
use civ_meta::config::AppConfig;
use civ_meta::models::{MatchRecord, ParticipationRecord, CIV_ROSTER};
use civ_meta::resolve::NameIndex;
use civ_meta::snapshot::{self, SnapshotStore};
use civ_meta::storage::{EntityType, JsonlReader, StorageConfig};
use civ_meta::store::{Datastore, JsonlStore};

#[derive(Parser)]
#[command(name = "civ-meta")]
#[command(about = "Civilization win-rate statistics service")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port number (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Rebuild precomputed snapshots with a full exact scan
    Snapshot {
        /// Rebuild only this civilization
        #[arg(long)]
        civ: Option<String>,
    },

    /// Debugging utilities
    Debug {
        #[command(subcommand)]
        action: DebugAction,
    },
}

#[derive(Subcommand)]
enum DebugAction {
    /// Validate storage integrity
    ValidateStorage,

    /// Show duration unit inference over the stored matches
    Durations {
        /// Max matches to inspect
        #[arg(long, default_value = "1000")]
        limit: usize,
    },
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = if cli.config.exists() {
        AppConfig::from_file(&cli.config)?
    } else {
        AppConfig::default()
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

/// Seed the resolver from the fixed roster plus every name observed in
/// the corpus. Names seen only in pre-shadow records stay reachable
/// through the exact and re-capitalization paths.
async fn build_resolver(store: &JsonlStore, config: &AppConfig) -> NameIndex {
    let mut resolver = NameIndex::from_names(CIV_ROSTER.iter().copied());
    match store.distinct_civ_names(config.stats.facet_budget()).await {
        Ok(names) => {
            for name in &names {
                if name.has_shadow {
                    resolver.insert_with_shadow(&name.name);
                } else {
                    resolver.insert_without_shadow(&name.name);
                }
            }
            tracing::info!(observed = names.len(), indexed = resolver.len(), "resolver seeded");
        }
        Err(err) => {
            tracing::warn!(error = %err, "could not scan corpus names, using roster only");
        }
    }
    resolver
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    if cli.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting civ-meta v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    let storage = StorageConfig::new(config.data_dir.clone());

    match cli.command {
        Commands::Serve { host, port } => {
            let store = Arc::new(JsonlStore::new(storage.clone()));
            let resolver = build_resolver(&store, &config).await;

            let state = AppState {
                aggregator: SamplingAggregator::new(store, config.stats.clone()),
                snapshots: Arc::new(SnapshotStore::new(storage)),
                resolver: Arc::new(resolver),
                stats: config.stats.clone(),
            };
            let app = civ_meta::api::build_router(state);

            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Snapshot { civ } => match civ {
            None => {
                let count = snapshot::rebuild_and_store(&storage)?;
                tracing::info!(civs = count, "snapshots rebuilt");
            }
            Some(name) => {
                let resolver = NameIndex::from_names(CIV_ROSTER.iter().copied());
                let canonical = resolver.resolve(&name)?;

                let build = snapshot::build_snapshots(&storage)?;
                let snapshots = SnapshotStore::new(storage);
                let mut found = false;
                for aggregate in build.civ_aggregates {
                    if aggregate.civ.eq_ignore_ascii_case(&canonical) {
                        snapshots.upsert_civ_aggregate(aggregate)?;
                        found = true;
                    }
                }
                for (key, stats) in build.map_stats {
                    if key.eq_ignore_ascii_case(&canonical) {
                        snapshots.upsert_map_stats(&key, stats)?;
                    }
                }
                if found {
                    tracing::info!(civ = %canonical, "snapshot rebuilt");
                } else {
                    tracing::warn!(civ = %canonical, "no games recorded, nothing to snapshot");
                }
            }
        },
        Commands::Debug { action } => match action {
            DebugAction::ValidateStorage => {
                validate_storage(&storage)?;
            }
            DebugAction::Durations { limit } => {
                debug_durations(&storage, limit)?;
            }
        },
    }

    Ok(())
}

fn validate_storage(storage: &StorageConfig) -> Result<()> {
    let mut problems = 0usize;

    let reader = JsonlReader::<MatchRecord>::for_entity(storage, EntityType::Match);
    let (ok, bad) = tally_lines(reader.iter()?);
    println!("matches.jsonl: {} ok, {} unreadable", ok, bad);
    problems += bad;

    let reader = JsonlReader::<ParticipationRecord>::for_entity(storage, EntityType::Participation);
    let mut missing_shadow = 0usize;
    let mut ok = 0usize;
    let mut bad = 0usize;
    for row in reader.iter()? {
        match row {
            Ok(record) => {
                ok += 1;
                if record.civ_lower.is_empty() {
                    missing_shadow += 1;
                }
            }
            Err(_) => bad += 1,
        }
    }
    println!(
        "participations.jsonl: {} ok, {} unreadable, {} without shadow field",
        ok, bad, missing_shadow
    );
    problems += bad;

    if problems > 0 {
        tracing::warn!(unreadable = problems, "storage has unreadable rows");
    }
    Ok(())
}

fn tally_lines<T>(iter: impl Iterator<Item = Result<T, civ_meta::storage::StorageError>>) -> (usize, usize) {
    let mut ok = 0usize;
    let mut bad = 0usize;
    for row in iter {
        match row {
            Ok(_) => ok += 1,
            Err(_) => bad += 1,
        }
    }
    (ok, bad)
}

fn debug_durations(storage: &StorageConfig, limit: usize) -> Result<()> {
    let reader = JsonlReader::<MatchRecord>::for_entity(storage, EntityType::Match);
    let mut by_unit: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    let mut unrealistic = 0usize;
    let mut total = 0usize;

    for row in reader.iter()?.take(limit) {
        let Ok(record) = row else { continue };
        total += 1;
        let unit = classify(record.duration);
        *by_unit.entry(unit.to_string()).or_default() += 1;
        if !is_realistic(duration_minutes(record.duration)) {
            unrealistic += 1;
        }
    }

    println!("inspected {} matches", total);
    let mut units: Vec<_> = by_unit.into_iter().collect();
    units.sort();
    for (unit, count) in units {
        println!("  {}: {}", unit, count);
    }
    println!("  outside the realistic range: {}", unrealistic);
    Ok(())
}
