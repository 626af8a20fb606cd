pub mod avatar;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod handlers;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod models;
pub mod routes;
pub mod state;

use std::time::Duration;

use axum::{Json, routing::get};
use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as ScalarServable};

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "School Avatar API",
        version = "1.0.0",
        description = "Avatar storage for student records"
    ),
    paths(
        handlers::avatar::upload_avatar,
        handlers::avatar::preview_avatar,
        handlers::avatar::download_avatar,
        handlers::avatar::list_avatars,
        handlers::info::get_info,
    ),
    components(schemas(
        error::ErrorBody,
        models::avatar::AvatarResponse,
        models::avatar::AvatarListResponse,
        models::shared::Pagination,
        models::info::InfoResponse,
    )),
    tags(
        (name = "Avatars", description = "Student avatar upload, retrieval and listing"),
        (name = "Info", description = "Server information"),
    ),
)]
struct ApiDoc;

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let api = ApiDoc::openapi();
    let cors = cors_layer(&state.config.server.cors);
    let spec = api.clone();

    axum::Router::new()
        .nest("/api", routes::api_routes(&state.config))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { Json(spec) }),
        )
        .with_state(state)
        .merge(Scalar::with_url("/scalar", api))
        .layer(cors)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = if config.allow_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            config
                .allow_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age))
}
