//! Atomic file materialization.
//!
//! Artifacts fetched from remote stores must never be observable in a
//! partially written state: consumers resolve them by final path only.
//! Writes go through a uniquely named temp file in the destination
//! directory, then chmod + fsync + rename. A failed write leaves the
//! destination untouched and removes the temp file.

use std::future::Future;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Writes a file atomically under `dir`.
///
/// Creates a uniquely named temp file inside `dir`, hands an open handle
/// to `write`, then applies `mode`, fsyncs, and renames onto
/// `final_path`. The callback streams the payload; it never names or
/// opens files itself.
///
/// On any error the temp file is removed and the first error surfaces.
/// `final_path` either does not exist or holds the complete, fsynced
/// payload with the requested mode.
pub async fn write_atomic<F, Fut>(dir: &Path, final_path: &Path, mode: u32, write: F) -> Result<()>
where
    F: FnOnce(tokio::fs::File) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let temp = tempfile::Builder::new()
        .prefix("tmp_credspec_")
        .tempfile_in(dir)
        .map_err(|e| Error::Filesystem {
            path: dir.to_path_buf(),
            reason: format!("unable to create temp file: {e}"),
        })?;

    // A second handle to the same inode; the callback owns it and may
    // drop it without losing the temp file's delete-on-drop guard.
    let sink = tokio::fs::File::from_std(temp.reopen()?);
    write(sink).await?;

    temp.as_file()
        .set_permissions(std::fs::Permissions::from_mode(mode))?;
    temp.as_file().sync_all()?;

    temp.persist(final_path).map_err(|e| Error::Filesystem {
        path: final_path.to_path_buf(),
        reason: format!("unable to rename temp file: {}", e.error),
    })?;

    debug!(path = %final_path.display(), "materialized file");
    Ok(())
}
