use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

use ecopix::{clustering, logging, Config, Database, IndexError, Scanner};

/// Number of runs shown by `history`
const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Index,
    Cluster,
    Clusters,
    History,
}

#[derive(Debug)]
struct CliArgs {
    command: Command,
    config_path: Option<PathBuf>,
    root: Option<PathBuf>,
    db_path: Option<PathBuf>,
    /// Re-run `index` every N seconds
    interval: Option<u64>,
    json: bool,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            command: Command::Index,
            config_path: None,
            root: None,
            db_path: None,
            interval: None,
            json: false,
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("ecopix {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                cli.config_path = Some(PathBuf::from(required_value(&args, i, "--config")));
                i += 1;
            }
            "--root" | "-r" => {
                cli.root = Some(PathBuf::from(required_value(&args, i, "--root")));
                i += 1;
            }
            "--db" => {
                cli.db_path = Some(PathBuf::from(required_value(&args, i, "--db")));
                i += 1;
            }
            "--interval" | "-i" => {
                let value = required_value(&args, i, "--interval");
                match value.parse::<u64>() {
                    Ok(secs) if secs > 0 => cli.interval = Some(secs),
                    _ => {
                        eprintln!("Error: --interval expects a positive number of seconds, got {}", value);
                        std::process::exit(1);
                    }
                }
                i += 1;
            }
            "--json" => {
                cli.json = true;
            }
            "index" => cli.command = Command::Index,
            "cluster" => cli.command = Command::Cluster,
            "clusters" => cli.command = Command::Clusters,
            "history" => cli.command = Command::History,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    if cli.interval.is_some() && cli.command != Command::Index {
        eprintln!("Error: --interval only applies to the index command");
        std::process::exit(1);
    }

    cli
}

fn required_value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires an argument", flag);
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!(
        r#"ecopix - photo catalogue indexer

USAGE:
    ecopix [OPTIONS] [COMMAND]

COMMANDS:
    index               Catalogue new photos and rebuild GPS clusters (default)
    cluster             Rebuild GPS clusters only
    clusters            List GPS clusters
    history             Show recent indexing runs

OPTIONS:
    --config, -c PATH   Path to config file
    --root, -r DIR      Photo root (overrides [photos] root)
    --db PATH           Catalogue database (overrides [database] sqlite_path)
    --interval, -i N    Re-run index every N seconds until stopped
    --json              Print results as JSON
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    ECOPIX_CONFIG       Path to config file (overrides default location)
    ECOPIX_LOG          Log filter (falls back to RUST_LOG, default: info)

Config file location: $XDG_CONFIG_HOME/ecopix/config.toml"#
    );
}

fn main() {
    let cli = parse_args();

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: CliArgs) -> Result<()> {
    let mut config = match &cli.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(root) = cli.root.clone() {
        config.photos.root = root;
    }
    if let Some(db_path) = cli.db_path.clone() {
        config.database.sqlite_path = db_path;
    }

    if let Err(e) = logging::init(config.logging.directory.clone()) {
        eprintln!("Warning: {:#}", e);
    }

    let db = Database::open(&config.database.sqlite_path)?;
    db.initialize().context("Failed to initialize catalogue schema")?;

    match cli.command {
        Command::Index => match cli.interval {
            Some(secs) => run_index_loop(&db, config, secs, cli.json),
            None => {
                let report = Scanner::new(config).scan(&db)?;
                print_report(&report, cli.json, |r| {
                    format!(
                        "Indexed {} new photos under {} ({} already indexed, {} failed, {} unreadable directories)\n\
                         {} GPS clusters covering {} photos ({} ms)",
                        r.indexed,
                        r.root.display(),
                        r.already_indexed,
                        r.failed,
                        r.unreadable_directories,
                        r.clusters.clusters_created,
                        r.clusters.photos_clustered,
                        r.elapsed_ms
                    )
                })
            }
        },
        Command::Cluster => {
            let report = clustering::rebuild_clusters(&db)?;
            print_report(&report, cli.json, |r| {
                format!(
                    "{} GPS clusters covering {} photos",
                    r.clusters_created, r.photos_clustered
                )
            })
        }
        Command::Clusters => {
            let clusters = db.get_all_clusters()?;
            print_report(&clusters, cli.json, |clusters| {
                let mut out = format!("{:>6}  {:>10}  {:>10}  {:>6}", "ID", "LAT", "LON", "PHOTOS");
                for c in clusters {
                    out.push_str(&format!(
                        "\n{:>6}  {:>10.2}  {:>10.2}  {:>6}",
                        c.id, c.cluster_latitude, c.cluster_longitude, c.photo_count
                    ));
                }
                out
            })
        }
        Command::History => {
            let runs = db.get_recent_scans(HISTORY_LIMIT)?;
            print_report(&runs, cli.json, |runs| {
                let mut out = String::new();
                for run in runs {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(&format!(
                        "#{} {} {} {}: {} indexed, {} failed, {} clusters",
                        run.id,
                        run.started_at,
                        run.status.as_str(),
                        run.root,
                        run.photos_indexed,
                        run.photos_failed,
                        run.clusters_created
                    ));
                    if let Some(message) = &run.error_message {
                        out.push_str(&format!(" ({})", message));
                    }
                }
                out
            })
        }
    }
}

/// Index forever. A failed run is logged and retried on the next tick.
fn run_index_loop(db: &Database, config: Config, interval: u64, json: bool) -> Result<()> {
    info!("Indexing {} every {} seconds", config.photos.root.display(), interval);
    let scanner = Scanner::new(config);

    loop {
        match scanner.scan(db) {
            Ok(report) if json => println!("{}", serde_json::to_string(&report)?),
            Ok(_) => {}
            Err(IndexError::AlreadyRunning) => info!("Previous indexing run still in progress, skipping"),
            Err(e) => error!("Indexing run failed: {}", e),
        }

        thread::sleep(Duration::from_secs(interval));
    }
}

fn print_report<T: Serialize>(value: &T, json: bool, text: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text(value));
    }
    Ok(())
}
