use axum::Json;
use axum::extract::State;

use crate::models::info::InfoResponse;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/info",
    tag = "Info",
    operation_id = "getInfo",
    summary = "Application name and configured port",
    responses(
        (status = 200, description = "Server info", body = InfoResponse),
    ),
)]
pub async fn get_info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: state.config.server.name.clone(),
        port: state.config.server.port,
    })
}
