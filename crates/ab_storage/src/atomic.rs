use std::ffi::OsString;
use std::path::{Path, PathBuf};

use ab_core::Result;
use tokio::fs;

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("index"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replaces `path` with `contents` through a sibling temp file and a rename,
/// so readers see either the old file or the new one.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let staging = staging_path(path);
    fs::write(&staging, contents).await?;
    if let Err(e) = fs::rename(&staging, path).await {
        let _ = fs::remove_file(&staging).await;
        return Err(e.into());
    }
    Ok(())
}
