// ============================================================================
// HTTP API - actix-web REST layer
// ============================================================================
//
// Structure:
// - orders   - order collection, search and lifecycle commands
// - users    - user CRUD
// - profile  - JSON schema per resource
// - hal      - links, embedded collections, paging
// - error    - ApiError → HTTP status mapping
//
// Versions travel as strong ETags; If-Match is honoured on writes.
//
// ============================================================================

mod error;
mod hal;
mod orders;
mod profile;
mod users;

use actix_web::http::header::{self, EntityTag, ETag};
use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer};
use std::sync::Arc;

use crate::config::{AppConfig, PagingConfig};
use crate::domain::order::OrderCommandHandler;
use crate::metrics::{self, Metrics};
use crate::persistence::{OrderRepository, UserRepository};

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderRepository>,
    pub users: Arc<dyn UserRepository>,
    pub order_handler: OrderCommandHandler,
    pub metrics: Arc<Metrics>,
    pub paging: PagingConfig,
}

impl AppState {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        users: Arc<dyn UserRepository>,
        metrics: Arc<Metrics>,
        paging: PagingConfig,
    ) -> Self {
        Self {
            order_handler: OrderCommandHandler::new(orders.clone(), metrics.clone()),
            orders,
            users,
            metrics,
            paging,
        }
    }
}

/// Registers every route plus JSON/query error handlers.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ApiError::NotFound(err.to_string()).into()),
    )
    .service(web::resource("/").route(web::get().to(root_links)))
    .service(web::resource("/metrics").route(web::get().to(metrics::metrics_handler)))
    .service(web::resource("/health").route(web::get().to(metrics::health_handler)))
    .configure(orders::configure)
    .configure(users::configure)
    .configure(profile::configure);
}

/// Start the HTTP server and run until shutdown
pub async fn run(config: &AppConfig, state: AppState) -> std::io::Result<()> {
    let (host, port) = config.bind_address();
    tracing::info!("🚀 Starting HTTP server on http://{}:{}", host, port);

    let data = web::Data::new(state);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind((host, port))?
    .run()
    .await
}

pub(crate) fn entity_tag(version: i64) -> ETag {
    ETag(EntityTag::new_strong(version.to_string()))
}

/// Version requested through `If-Match`; `None` when absent or `*`.
pub(crate) fn expected_version(req: &HttpRequest) -> Result<Option<i64>, ApiError> {
    let Some(value) = req.headers().get(header::IF_MATCH) else {
        return Ok(None);
    };

    let raw = value
        .to_str()
        .map_err(|_| ApiError::BadRequest("If-Match header is not valid text".to_string()))?
        .trim();
    if raw == "*" {
        return Ok(None);
    }

    raw.trim_start_matches("W/")
        .trim_matches('"')
        .parse()
        .map(Some)
        .map_err(|_| ApiError::BadRequest(format!("Unsupported If-Match value: {raw}")))
}

async fn root_links(req: HttpRequest) -> HttpResponse {
    let links = hal::LinkBuilder::from_request(&req);
    let mut map = hal::Links::new();
    map.insert("orders", links.templated("/orders{?page,size}"));
    map.insert("users", links.templated("/users{?page,size}"));
    map.insert("profile", links.link("/profile"));

    HttpResponse::Ok().json(serde_json::json!({ "_links": map }))
}

// ============================================================================
// Tests - full request/response cycle against in-memory repositories
// ============================================================================
