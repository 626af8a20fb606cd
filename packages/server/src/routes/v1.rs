use axum::{
    Router,
    routing::{get, post},
};

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> Router<AppState> {
    Router::new()
        .nest("/students", student_routes(config))
        .route("/avatars", get(handlers::avatar::list_avatars))
        .route("/info", get(handlers::info::get_info))
}

fn student_routes(config: &AppConfig) -> Router<AppState> {
    let upload = post(handlers::avatar::upload_avatar).layer(
        handlers::avatar::avatar_upload_body_limit(config.storage.max_avatar_size),
    );

    Router::new()
        .route(
            "/{id}/avatar",
            get(handlers::avatar::download_avatar).merge(upload),
        )
        .route("/{id}/avatar/preview", get(handlers::avatar::preview_avatar))
}
