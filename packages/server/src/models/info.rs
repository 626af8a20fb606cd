use serde::Serialize;

#[derive(Serialize, utoipa::ToSchema)]
pub struct InfoResponse {
    /// Configured application name.
    #[schema(example = "school")]
    pub name: String,
    /// Port the server was configured to listen on.
    #[schema(example = 8080)]
    pub port: u16,
}
