#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web news service for the civic feed.
//!
//! Proxies the enabled upstream services, validates their payloads and
//! serves normalized news items to the map frontend. Sources lists are
//! cached per service, and a message request that failed is refused for
//! a cooldown window instead of being forwarded again.

mod handlers;

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use civic_feed_message::SourceIndex;
use civic_feed_message_models::Source;
use civic_feed_upstream::cache::{Clock, SharedCache, SystemClock};
use civic_feed_upstream::cooldown::RequestCooldown;
use civic_feed_upstream::registry::enabled_services;
use civic_feed_upstream::{UpstreamClient, UpstreamError};

/// Default cooldown after a failed upstream request.
pub const DEFAULT_COOLDOWN_SECS: u64 = 30;

/// Why a sources list could not be returned.
#[derive(Debug)]
pub enum SourcesError {
    /// The sources request failed recently; retry after the duration.
    CoolingDown(Duration),
    /// The fetch failed.
    Upstream(UpstreamError),
}

/// One upstream service and its cached sources list.
#[derive(Debug)]
pub struct ServiceState {
    /// Client for the service.
    pub client: UpstreamClient,
    /// Sources list, refreshed after the service's TTL.
    pub sources: SharedCache<Arc<Vec<Source>>>,
}

impl ServiceState {
    /// Wraps `client` with an empty sources cache.
    #[must_use]
    pub fn new(client: UpstreamClient, clock: Arc<dyn Clock>) -> Self {
        let ttl = client.service().sources_ttl();
        Self {
            client,
            sources: SharedCache::new(ttl, clock),
        }
    }

    /// The service id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.client.service().id
    }

    /// Cooldown signature of the sources request.
    #[must_use]
    pub fn sources_signature(&self) -> String {
        format!("{}/sources", self.id())
    }

    /// Returns the sources list, honoring `cooldown`.
    ///
    /// # Errors
    ///
    /// Returns the remaining wait if the sources request failed recently,
    /// otherwise the upstream error of a failed fetch (which starts a new
    /// cooldown).
    pub async fn sources(
        &self,
        cooldown: &RequestCooldown,
    ) -> Result<Arc<Vec<Source>>, SourcesError> {
        let signature = self.sources_signature();
        if let Some(remaining) = cooldown.remaining(&signature) {
            return Err(SourcesError::CoolingDown(remaining));
        }

        match self.client.cached_sources(&self.sources).await {
            Ok(sources) => {
                cooldown.record_success(&signature);
                Ok(sources)
            }
            Err(e) => {
                cooldown.record_failure(&signature);
                Err(SourcesError::Upstream(e))
            }
        }
    }

    /// Looks up the sources for enrichment. Sources are optional, so a
    /// failure or an active cooldown yields an empty index.
    pub async fn source_index(&self, cooldown: &RequestCooldown) -> SourceIndex {
        match self.sources(cooldown).await {
            Ok(sources) => sources.iter().cloned().collect(),
            Err(SourcesError::CoolingDown(remaining)) => {
                log::debug!(
                    "{}: sources cooling down for {remaining:?}, skipping enrichment",
                    self.client.service().name
                );
                SourceIndex::default()
            }
            Err(SourcesError::Upstream(e)) => {
                log::warn!("{}: sources unavailable: {e}", self.client.service().name);
                SourceIndex::default()
            }
        }
    }
}

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Enabled services in registry order. The first one is the default.
    pub services: Vec<ServiceState>,
    /// Failed request signatures.
    pub cooldown: RequestCooldown,
}

impl AppState {
    /// Builds state around explicit clients.
    #[must_use]
    pub fn new(clients: Vec<UpstreamClient>, cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        let services = clients
            .into_iter()
            .map(|client| ServiceState::new(client, clock.clone()))
            .collect();

        Self {
            services,
            cooldown: RequestCooldown::new(cooldown, clock),
        }
    }

    /// Builds state for every enabled service in the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if any HTTP client cannot be built.
    pub fn from_registry(cooldown: Duration) -> Result<Self, UpstreamError> {
        let clients = enabled_services()
            .into_iter()
            .map(UpstreamClient::new)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(clients, cooldown, Arc::new(SystemClock)))
    }

    /// Finds a service by id (case-insensitive), or the default service
    /// when `id` is `None`.
    #[must_use]
    pub fn service(&self, id: Option<&str>) -> Option<&ServiceState> {
        match id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => self.services.iter().find(|s| s.id().eq_ignore_ascii_case(id)),
            None => self.services.first(),
        }
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/services", web::get().to(handlers::services))
            .route("/news", web::get().to(handlers::news))
            .route("/news/{id}", web::get().to(handlers::news_item))
            .route("/sources", web::get().to(handlers::sources))
            .route("/viewport", web::get().to(handlers::viewport)),
    );
}

/// Starts the civic feed news service.
///
/// Reads `BIND_ADDR`, `PORT` and `CIVIC_FEED_COOLDOWN_SECS` from the
/// environment. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the upstream clients cannot be
/// built, or if the HTTP server fails to bind or encounters a runtime
/// error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cooldown_secs: u64 = std::env::var("CIVIC_FEED_COOLDOWN_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_COOLDOWN_SECS);

    let state = AppState::from_registry(Duration::from_secs(cooldown_secs))
        .map_err(std::io::Error::other)?;

    for svc in &state.services {
        log::info!("Serving {} from {}", svc.id(), svc.client.base_url());
    }

    let state = web::Data::new(state);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
