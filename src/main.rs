//! Command-line front end for the calendar client.
//!
//! Issues one call through the full resilience pipeline and prints the JSON
//! response. Warming progress is logged while a sleeping backend wakes up.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use calendar_client::config::ClientConfig;
use calendar_client::observability::init_logging;
use calendar_client::{load_config, ApiClient, ApiResponse, CallDescriptor, Shutdown};

#[derive(Parser)]
#[command(name = "calendar-client")]
#[command(about = "Resilient client for the calendar backend", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured backend base URL
    #[arg(short, long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET a resource
    Get {
        path: String,
        /// Query parameter as key=value, repeatable
        #[arg(short, long = "query", value_parser = parse_key_value)]
        query: Vec<(String, String)>,
    },
    /// POST a JSON body
    Post {
        path: String,
        #[arg(short, long)]
        data: String,
    },
    /// PUT a JSON body
    Put {
        path: String,
        #[arg(short, long)]
        data: String,
    },
    /// PATCH a JSON body
    Patch {
        path: String,
        #[arg(short, long)]
        data: String,
    },
    /// DELETE a resource
    Delete { path: String },
    /// Print client diagnostics
    Stats,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    init_logging(&config.observability.log_level);

    let client = ApiClient::from_config(config)?;
    let shutdown = Shutdown::new();
    let sweeper = client.spawn_cache_sweeper(&shutdown);

    let _warming = client.on_warming_change(|state| {
        if state.is_warming {
            tracing::warn!(
                attempt = state.attempt,
                max_attempts = state.max_attempts,
                "Backend is waking up"
            );
        } else {
            tracing::info!("Backend ready");
        }
    });

    let request = match cli.command {
        Commands::Get { path, query } => Some(
            query
                .into_iter()
                .fold(CallDescriptor::get(path), |r, (k, v)| r.with_query(k, v)),
        ),
        Commands::Post { path, data } => Some(CallDescriptor::post(path, serde_json::from_str(&data)?)),
        Commands::Put { path, data } => Some(CallDescriptor::put(path, serde_json::from_str(&data)?)),
        Commands::Patch { path, data } => Some(CallDescriptor::patch(path, serde_json::from_str(&data)?)),
        Commands::Delete { path } => Some(CallDescriptor::delete(path)),
        Commands::Stats => None,
    };

    let outcome = match request {
        Some(request) => client.request(request).await.map(|response| print_response(&response)),
        None => {
            println!("{}", serde_json::to_string_pretty(&client.stats())?);
            Ok(Ok(()))
        }
    };

    client.close();
    shutdown.trigger();
    sweeper.await?;

    match outcome {
        Ok(printed) => printed?,
        Err(e) => {
            tracing::error!(kind = e.kind_label(), "Request failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_response(response: &ApiResponse) -> Result<(), serde_json::Error> {
    if response.body.is_empty() {
        println!("{}", response.status);
        return Ok(());
    }
    match response.json::<Value>() {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", response.text()),
    }
    Ok(())
}
