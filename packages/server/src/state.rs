use std::sync::Arc;

use crate::avatar::AvatarService;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub avatars: Arc<AvatarService>,
}
