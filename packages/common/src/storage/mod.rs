mod error;
mod path;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use path::{AvatarPath, DEFAULT_EXTENSION, resolve_avatar_path};
pub use traits::{BlobStore, BoxReader};
