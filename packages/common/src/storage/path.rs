use std::path::{Path, PathBuf};

/// Extension used when none can be derived from the uploaded file name.
pub const DEFAULT_EXTENSION: &str = "bin";

const MAX_EXTENSION_LEN: usize = 16;

/// On-disk location of a student's avatar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarPath {
    pub path: PathBuf,
    pub extension: String,
}

/// Map a student and the client-supplied file name to the avatar's file path.
///
/// The layout is `{root}/avatar_{student_id}.{extension}`. The same student
/// always lands on the same path for a given extension, so repeated uploads
/// overwrite in place. An upload with a different extension produces a
/// different path; removing the file left behind is the caller's job.
pub fn resolve_avatar_path(
    root: &Path,
    student_id: i32,
    original_file_name: Option<&str>,
) -> AvatarPath {
    let extension = derive_extension(original_file_name);
    let path = root.join(format!("avatar_{student_id}.{extension}"));
    AvatarPath { path, extension }
}

/// Last `.`-delimited segment of the file name, lower-cased.
///
/// Anything that is not a short run of ASCII alphanumerics falls back to
/// [`DEFAULT_EXTENSION`]; the client controls this string.
fn derive_extension(file_name: Option<&str>) -> String {
    let Some(name) = file_name.map(str::trim).filter(|n| !n.is_empty()) else {
        return DEFAULT_EXTENSION.to_string();
    };

    // Browsers on some platforms send the full client path.
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    match base.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => DEFAULT_EXTENSION.to_string(),
    }
}
