use crate::session::SessionId;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

fn disallowed_title_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^\w\s_-]").expect("static pattern"))
}

/// Storage-safe identifier for a display title: anything other than word
/// characters, whitespace, `_` and `-` is removed, then the ends are trimmed.
pub fn sanitize_title(title: &str) -> String {
    disallowed_title_chars()
        .replace_all(title, "")
        .trim()
        .to_string()
}

/// `<title>_<session><.ext>`, unique per session so concurrent sessions
/// fetching the same video never share a path
pub fn session_file_name(title: &str, session_id: SessionId, extension: &str) -> String {
    let stem = sanitize_title(title);
    let stem = if stem.is_empty() { "video" } else { stem.as_str() };
    if extension.is_empty() {
        format!("{}_{}", stem, session_id)
    } else {
        format!("{}_{}.{}", stem, session_id, extension)
    }
}

pub fn session_file_path(
    dir: &Path,
    title: &str,
    session_id: SessionId,
    extension: &str,
) -> PathBuf {
    dir.join(session_file_name(title, session_id, extension))
}

/// Delete every file in `dir` whose name contains the session id.
///
/// Returns how many files were removed; individual failures are logged.
pub async fn purge_session_files(dir: &Path, session_id: SessionId) -> std::io::Result<usize> {
    let needle = session_id.to_string();
    remove_matching(dir, |name| name.contains(&needle)).await
}

/// Remove leftovers from an earlier process, creating `dir` if needed
pub async fn sweep_directory(dir: &Path) -> std::io::Result<usize> {
    tokio::fs::create_dir_all(dir).await?;
    remove_matching(dir, |_| true).await
}

async fn remove_matching(dir: &Path, matches: impl Fn(&str) -> bool) -> std::io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !matches(name.as_str()) {
            continue;
        }

        let path = entry.path();
        let result = match entry.file_type().await {
            Ok(kind) if kind.is_dir() => tokio::fs::remove_dir_all(&path).await,
            _ => tokio::fs::remove_file(&path).await,
        };
        match result {
            Ok(()) => {
                debug!("Deleted {}", path.display());
                removed += 1;
            }
            Err(e) => warn!("Failed to delete {}: {}", path.display(), e),
        }
    }

    Ok(removed)
}
