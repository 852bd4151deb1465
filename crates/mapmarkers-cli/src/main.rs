//! mapmarkers - command-line client for the map marker service.
//!
//! Builds one marker store for the process and runs a single command
//! against it.

use std::io;

use anyhow::{Context, Result};
use mapmarkers_core::{ApiClient, Config, Marker, MarkerData, MarkerStore};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "\
Usage: mapmarkers <command>

Commands:
  list            Print the public marker list
  admin-list      Print every marker, including disabled ones
  add <json>      Create a marker from a JSON object
  edit <json>     Update a marker from a JSON object (must include \"id\")
  delete <id>     Delete a marker

Configuration is read from the config file and MAPMARKERS_* environment
variables (MAPMARKERS_API_URL, MAPMARKERS_TOKEN, ...). A .env file is honored.";

#[derive(Debug, PartialEq)]
enum Command {
    List,
    AdminList,
    Add(String),
    Edit(String),
    Delete(String),
    Help,
}

impl Command {
    fn parse(args: &[String]) -> Result<Self> {
        let name = args.first().map(String::as_str);
        let operand = || {
            args.get(1)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("'{}' needs an argument\n\n{}", args[0], USAGE))
        };

        match name {
            None | Some("help") | Some("--help") | Some("-h") => Ok(Command::Help),
            Some("list") => Ok(Command::List),
            Some("admin-list") => Ok(Command::AdminList),
            Some("add") => Ok(Command::Add(operand()?)),
            Some("edit") => Ok(Command::Edit(operand()?)),
            Some("delete") => Ok(Command::Delete(operand()?)),
            Some(other) => Err(anyhow::anyhow!("Unknown command '{}'\n\n{}", other, USAGE)),
        }
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn parse_marker_data(json: &str) -> Result<MarkerData> {
    serde_json::from_str(json).context("Marker must be a JSON object")
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;
    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::load().context("Failed to load configuration")?;
    let client = ApiClient::from_config(&config)?;
    let store = MarkerStore::with_options(client, config.store_options());
    info!(api = %config.api_base_url, "mapmarkers starting");

    run(&store, command).await
}

async fn run(store: &MarkerStore<ApiClient>, command: Command) -> Result<()> {
    match command {
        Command::List => {
            let markers: Vec<Marker> = store.load().await?;
            print_json(&markers)
        }
        Command::AdminList => {
            let markers = store.load_admin().await?;
            let hidden = markers.iter().filter(|m| !m.is_enabled()).count();
            print_json(&markers)?;
            eprintln!("{} markers, {} hidden from the public list", markers.len(), hidden);
            Ok(())
        }
        Command::Add(json) => {
            let marker = store.add(parse_marker_data(&json)?).await?;
            print_json(&marker)
        }
        Command::Edit(json) => {
            let data = parse_marker_data(&json)?;
            // Only cached markers can be edited
            store.load_admin().await.context("Failed to load markers before editing")?;
            let marker = store.edit(data).await?;
            print_json(&marker)
        }
        Command::Delete(id) => {
            store.load_admin().await.context("Failed to load markers before deleting")?;
            store.delete(&id).await?;
            eprintln!("Deleted marker {} ({} remaining)", id, store.len());
            Ok(())
        }
        Command::Help => Ok(()),
    }
}
