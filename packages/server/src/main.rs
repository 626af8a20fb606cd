use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use common::storage::filesystem::FilesystemBlobStore;
use server::avatar::{AvatarService, SeaOrmAvatarRepository, SeaOrmStudentLookup};
use server::config::AppConfig;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let mut config = AppConfig::load().context("Failed to load configuration")?;
    let db = server::database::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;

    tokio::fs::create_dir_all(&config.storage.avatars_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create avatar directory {}",
                config.storage.avatars_dir.display()
            )
        })?;
    config.storage.avatars_dir = tokio::fs::canonicalize(&config.storage.avatars_dir).await?;

    let blobs = FilesystemBlobStore::new(config.storage.avatars_dir.clone()).await?;
    let avatars = AvatarService::new(
        Arc::new(SeaOrmStudentLookup::new(db.clone())),
        Arc::new(SeaOrmAvatarRepository::new(db)),
        Arc::new(blobs),
        config.storage.clone(),
    );
    info!(
        avatars_dir = %config.storage.avatars_dir.display(),
        max_avatar_size = config.storage.max_avatar_size,
        "Avatar storage ready"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        config,
        avatars: Arc::new(avatars),
    };
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
