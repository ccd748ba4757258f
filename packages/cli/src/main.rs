#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line access to the civic feed upstream services.
//!
//! Fetches messages and sources from any enabled upstream, runs them
//! through validation and mapping, and prints the normalized result as
//! JSON.

use chrono::Utc;
use clap::{Parser, Subcommand};
use civic_feed_message::{MappingContext, SourceIndex, map_message, map_messages};
use civic_feed_message_models::{Language, Source};
use civic_feed_upstream::registry::all_services;
use civic_feed_upstream::{MessageQuery, UpstreamClient};
use civic_feed_viewport::{
    MapBounds, MapRegion, bounds_from_region, estimate_zoom, filter_within_bounds,
};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "civic_feed", about = "Civic update feed tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all configured upstream services
    Services,
    /// Fetch and normalize the message list of a service
    News {
        /// Service id (e.g., "oboapp", "updates")
        #[arg(long, default_value = "oboapp")]
        service: String,
        /// Viewport as `north,south,east,west`
        #[arg(long, value_parser = parse_bounds, allow_hyphen_values = true)]
        bounds: Option<MapBounds>,
        /// Map zoom level
        #[arg(long)]
        zoom: Option<f64>,
        /// Comma-separated category slugs
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,
        /// Display language (`bg` or `en`)
        #[arg(long, default_value = "en")]
        lang: String,
        /// Drop items whose map position is outside `--bounds`
        #[arg(long)]
        clip: bool,
        /// Skip source enrichment
        #[arg(long)]
        no_sources: bool,
    },
    /// Fetch and normalize a single message by id
    Message {
        /// Message id
        id: String,
        /// Service id
        #[arg(long, default_value = "updates")]
        service: String,
        /// Display language (`bg` or `en`)
        #[arg(long, default_value = "en")]
        lang: String,
    },
    /// Fetch the sources list of a service
    Sources {
        /// Service id
        #[arg(long, default_value = "oboapp")]
        service: String,
    },
    /// Convert a map region into bounds and a zoom level
    Viewport {
        /// Center latitude
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,
        /// Center longitude
        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,
        /// Full latitude span in degrees
        #[arg(long)]
        latitude_delta: f64,
        /// Full longitude span in degrees
        #[arg(long)]
        longitude_delta: f64,
    },
}

#[derive(Serialize)]
struct ViewportOutput {
    bounds: MapBounds,
    zoom: f64,
}

/// Parses `north,south,east,west`.
fn parse_bounds(s: &str) -> Result<MapBounds, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid bounds '{s}': {e}"))?;

    match parts.as_slice() {
        [north, south, east, west] => Ok(MapBounds::new(*north, *south, *east, *west)),
        _ => Err(format!(
            "expected 4 comma-separated values (north,south,east,west), got {}",
            parts.len()
        )),
    }
}

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Fetches the sources for enrichment, continuing without them on failure.
async fn source_index(client: &UpstreamClient) -> SourceIndex {
    match client.fetch_sources().await {
        Ok(sources) => SourceIndex::new(sources),
        Err(e) => {
            log::warn!("Continuing without sources: {e}");
            SourceIndex::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Services => {
            println!("{:<12} {:<10} {:<8} BASE URL", "ID", "DIALECT", "ENABLED");
            println!("{}", "-".repeat(60));
            for service in &all_services() {
                println!(
                    "{:<12} {:<10} {:<8} {}",
                    service.id,
                    service.dialect.label(),
                    service.enabled,
                    service.resolved_base_url()
                );
            }
        }
        Commands::News {
            service,
            bounds,
            zoom,
            categories,
            lang,
            clip,
            no_sources,
        } => {
            let client = UpstreamClient::for_service(&service)?;
            let query = MessageQuery {
                bounds,
                zoom,
                categories,
            };

            let messages = client.fetch_messages(&query).await?;
            let sources = if no_sources {
                SourceIndex::default()
            } else {
                source_index(&client).await
            };

            let ctx = MappingContext::new(client.dialect(), Language::from_tag(&lang), Utc::now())
                .with_sources(&sources);
            let mut items = map_messages(&messages, &ctx);

            if clip && let Some(bounds) = &bounds {
                items = filter_within_bounds(items, bounds);
            }

            log::info!("{} news items", items.len());
            print_json(&items)?;
        }
        Commands::Message { id, service, lang } => {
            let client = UpstreamClient::for_service(&service)?;
            let message = client.fetch_message(&id).await?;
            let sources = source_index(&client).await;

            let ctx = MappingContext::new(client.dialect(), Language::from_tag(&lang), Utc::now())
                .with_sources(&sources);
            print_json(&map_message(&message, &ctx))?;
        }
        Commands::Sources { service } => {
            let client = UpstreamClient::for_service(&service)?;
            let sources: Vec<Source> = client.fetch_sources().await?;
            print_json(&sources)?;
        }
        Commands::Viewport {
            latitude,
            longitude,
            latitude_delta,
            longitude_delta,
        } => {
            let region = MapRegion {
                latitude,
                longitude,
                latitude_delta,
                longitude_delta,
            };
            print_json(&ViewportOutput {
                bounds: bounds_from_region(&region),
                zoom: estimate_zoom(&region),
            })?;
        }
    }

    Ok(())
}
