//! HTTP handler functions for the civic feed API.

use std::time::Duration;

use actix_web::{HttpResponse, web};
use chrono::Utc;
use civic_feed_message::{MappingContext, map_message, map_messages};
use civic_feed_server_models::{
    ApiError, ApiHealth, ApiService, ApiViewport, NewsItemQueryParams, NewsQueryParams,
    SourcesQueryParams,
};
use civic_feed_upstream::{MessageQuery, UpstreamError};
use civic_feed_viewport::{MapRegion, bounds_from_region, estimate_zoom, filter_within_bounds};

use crate::{AppState, SourcesError};

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/services`
pub async fn services(state: web::Data<AppState>) -> HttpResponse {
    let services: Vec<ApiService> = state
        .services
        .iter()
        .map(|svc| {
            let config = svc.client.service();
            ApiService {
                id: config.id.clone(),
                name: config.name.clone(),
                dialect: config.dialect,
                supports_lookup: config.endpoints.message_by_id.is_some(),
            }
        })
        .collect();

    HttpResponse::Ok().json(services)
}

/// `GET /api/news`
///
/// Fetches the messages inside the requested viewport and maps them to
/// news items.
pub async fn news(
    state: web::Data<AppState>,
    params: web::Query<NewsQueryParams>,
) -> HttpResponse {
    let Some(svc) = state.service(params.service.as_deref()) else {
        return unknown_service(params.service.as_deref());
    };

    let query = MessageQuery {
        bounds: params.bounds(),
        zoom: params.zoom,
        categories: params.category_slugs(),
    };
    let signature = query.signature(svc.id());

    if let Some(remaining) = state.cooldown.remaining(&signature) {
        return cooling_down(remaining);
    }

    let messages = match svc.client.fetch_messages(&query).await {
        Ok(messages) => {
            state.cooldown.record_success(&signature);
            messages
        }
        Err(e) => {
            state.cooldown.record_failure(&signature);
            return upstream_error(&e);
        }
    };

    let sources = svc.source_index(&state.cooldown).await;
    let ctx = MappingContext::new(svc.client.dialect(), params.language(), Utc::now())
        .with_sources(&sources);
    let mut items = map_messages(&messages, &ctx);

    if params.clip
        && let Some(bounds) = &query.bounds
    {
        items = filter_within_bounds(items, bounds);
    }

    HttpResponse::Ok().json(items)
}

/// `GET /api/news/{id}`
pub async fn news_item(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<NewsItemQueryParams>,
) -> HttpResponse {
    let Some(svc) = state.service(params.service.as_deref()) else {
        return unknown_service(params.service.as_deref());
    };

    let id = path.into_inner();
    let signature = format!("{}/{id}", svc.id());

    if let Some(remaining) = state.cooldown.remaining(&signature) {
        return cooling_down(remaining);
    }

    let message = match svc.client.fetch_message(&id).await {
        Ok(message) => {
            state.cooldown.record_success(&signature);
            message
        }
        Err(e) => {
            if !matches!(e, UpstreamError::Config { .. }) {
                state.cooldown.record_failure(&signature);
            }
            return upstream_error(&e);
        }
    };

    let sources = svc.source_index(&state.cooldown).await;
    let ctx = MappingContext::new(svc.client.dialect(), params.language(), Utc::now())
        .with_sources(&sources);

    HttpResponse::Ok().json(map_message(&message, &ctx))
}

/// `GET /api/sources`
pub async fn sources(
    state: web::Data<AppState>,
    params: web::Query<SourcesQueryParams>,
) -> HttpResponse {
    let Some(svc) = state.service(params.service.as_deref()) else {
        return unknown_service(params.service.as_deref());
    };

    match svc.sources(&state.cooldown).await {
        Ok(sources) => HttpResponse::Ok().json(sources.as_slice()),
        Err(SourcesError::CoolingDown(remaining)) => cooling_down(remaining),
        Err(SourcesError::Upstream(e)) => upstream_error(&e),
    }
}

/// `GET /api/viewport`
///
/// Converts a map region (center plus spans) into bounds and a zoom level.
pub async fn viewport(region: web::Query<MapRegion>) -> HttpResponse {
    HttpResponse::Ok().json(ApiViewport {
        bounds: bounds_from_region(&region),
        zoom: estimate_zoom(&region),
    })
}

fn unknown_service(id: Option<&str>) -> HttpResponse {
    let message = id.map_or_else(
        || "No upstream service is enabled".to_string(),
        |id| format!("Unknown upstream service '{id}'"),
    );
    HttpResponse::NotFound().json(ApiError::new(message))
}

fn upstream_error(e: &UpstreamError) -> HttpResponse {
    match e {
        UpstreamError::Config { .. } => {
            log::warn!("{e}");
            HttpResponse::NotFound().json(ApiError::new(e.to_string()))
        }
        UpstreamError::Transport { .. } | UpstreamError::Validation(_) => {
            log::error!("{e}");
            HttpResponse::BadGateway().json(ApiError::new(e.to_string()))
        }
    }
}

fn cooling_down(remaining: Duration) -> HttpResponse {
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);

    HttpResponse::ServiceUnavailable()
        .insert_header(("Retry-After", secs.to_string()))
        .json(ApiError {
            error: "Upstream request failed recently, try again later".to_string(),
            retry_after_secs: Some(secs),
        })
}
