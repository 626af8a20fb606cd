use std::path::PathBuf;

use serde::Deserialize;

/// Avatar storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageAppConfig {
    /// Root directory for avatar files. Default: "avatars".
    #[serde(default = "default_avatars_dir")]
    pub avatars_dir: PathBuf,
    /// Upload ceiling in bytes, inclusive. Default: 300 KiB.
    #[serde(default = "default_max_avatar_size")]
    pub max_avatar_size: u64,
}

fn default_avatars_dir() -> PathBuf {
    PathBuf::from("avatars")
}
fn default_max_avatar_size() -> u64 {
    300 * 1024
}

impl Default for StorageAppConfig {
    fn default() -> Self {
        Self {
            avatars_dir: default_avatars_dir(),
            max_avatar_size: default_max_avatar_size(),
        }
    }
}
