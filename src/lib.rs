//! Foodcart API Library
//!
//! Backend for a food-ordering client: a meal catalog, star-rated reviews
//! and a per-user shopping cart behind JWT authentication.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use http::HeaderValue;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
};

use crate::{config::AppConfig, errors::ServiceError, services::AppServices};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub services: AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: Arc<AppConfig>, services: AppServices) -> Self {
        Self {
            db,
            config,
            services,
        }
    }
}

/// Builds the CORS layer from the configured origins.
///
/// Falls back to a permissive layer only where the configuration allows it.
pub fn build_cors_layer(cfg: &AppConfig) -> Result<CorsLayer, ServiceError> {
    let origins: Vec<HeaderValue> = cfg
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        return Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    if cfg.should_allow_permissive_cors() {
        ::tracing::info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        return Ok(CorsLayer::permissive());
    }

    Err(ServiceError::InternalError(
        "Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true"
            .to_string(),
    ))
}

/// All API routes, without middleware
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth::auth_routes())
        .merge(handlers::meals::meal_routes())
        .merge(handlers::reviews::review_routes())
        .merge(handlers::cart::cart_routes())
        .merge(handlers::users::user_routes())
        .route("/health", get(health::health_check))
}

/// Assembles the full application: routes, Swagger UI and the middleware stack.
pub fn app_router(state: AppState) -> Result<Router, ServiceError> {
    let cors_layer = build_cors_layer(&state.config)?;

    let router = api_routes()
        .merge(openapi::swagger_ui())
        // Resolve bearer tokens into an AuthUser extension
        .layer(axum::middleware::from_fn_with_state(
            state.services.auth.clone(),
            auth::auth_middleware,
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state);

    Ok(router)
}
