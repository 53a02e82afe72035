//! Atomic file replacement.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{MdmendError, Result};

/// Writes `bytes` to `path` so that readers see either the old file or the
/// complete new one.
///
/// Missing parent directories are created. The data goes to a hidden
/// sibling temp file which is then renamed over the target; if anything
/// fails the temp file is removed.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| MdmendError::write(path, e))?;
    }

    let temp = temp_path(path);
    if let Err(e) = fs::write(&temp, bytes) {
        remove_temp(&temp);
        return Err(MdmendError::write(path, e));
    }
    if let Err(e) = fs::rename(&temp, path) {
        remove_temp(&temp);
        return Err(MdmendError::write(path, e));
    }
    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// `dir/.name.<pid>.tmp` next to the target.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mdmend".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

fn remove_temp(temp: &Path) {
    if temp.exists()
        && let Err(e) = fs::remove_file(temp)
    {
        warn!("Failed to remove temp file {}: {}", temp.display(), e);
    }
}
