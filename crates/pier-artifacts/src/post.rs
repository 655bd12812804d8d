//! Platform post-processing
//!
//! Tarball extraction with the top-level directory stripped, executable bits
//! for plugins, and the darwin dylib relink.

use crate::error::{ArtifactError, Result};
use flate2::read::GzDecoder;
use pier_types::TargetOs;
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use tracing::{debug, info};

/// Unpack a `.tar.gz` into `dest`, dropping the first path component of
/// every entry. Returns the number of entries written.
pub fn unpack_strip_one(archive: &Path, dest: &Path) -> Result<usize> {
    let unpack_err = |reason: String| ArtifactError::Unpack {
        archive: archive.to_path_buf(),
        reason,
    };

    let file = File::open(archive).map_err(|e| ArtifactError::io(archive, e))?;
    let mut tar = Archive::new(GzDecoder::new(file));
    let mut written = 0;

    for entry in tar.entries().map_err(|e| unpack_err(e.to_string()))? {
        let mut entry = entry.map_err(|e| unpack_err(e.to_string()))?;
        let path = entry.path().map_err(|e| unpack_err(e.to_string()))?;

        let Some(relative) = strip_first(&path) else {
            continue;
        };
        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArtifactError::io(parent, e))?;
        }
        entry
            .unpack(&target)
            .map_err(|e| unpack_err(format!("{}: {}", relative.display(), e)))?;
        written += 1;
    }

    debug!(archive = %archive.display(), entries = written, "Archive unpacked");
    Ok(written)
}

/// Entry path without its leading directory. `None` for the top-level
/// directory itself and for entries that would escape the destination.
fn strip_first(path: &Path) -> Option<PathBuf> {
    let mut components = path.components();
    components.next()?;
    let rest: PathBuf = components.collect();
    if rest.as_os_str().is_empty() {
        return None;
    }
    let escapes = rest
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return None;
    }
    Some(rest)
}

/// Set the owner/group/other execute bits
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)
        .map_err(|e| ArtifactError::io(path, e))?
        .permissions();
    perms.set_mode(perms.mode() | 0o755);
    std::fs::set_permissions(path, perms).map_err(|e| ArtifactError::io(path, e))
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// OS-specific fixups after the pier tarball is unpacked into `root`
pub async fn finish_binary(os: TargetOs, root: &Path) -> Result<()> {
    match os {
        // pier finds libwasmer through LD_LIBRARY_PATH, exported at spawn time
        TargetOs::Linux => Ok(()),
        TargetOs::Darwin => relink_wasmer(root).await,
    }
}

async fn relink_wasmer(root: &Path) -> Result<()> {
    let binary = root.join("pier");
    let dylib = root.join("libwasmer.dylib");
    info!(binary = %binary.display(), "Rewriting libwasmer load path");

    let output = tokio::process::Command::new("install_name_tool")
        .arg("-change")
        .arg("@rpath/libwasmer.dylib")
        .arg(&dylib)
        .arg(&binary)
        .output()
        .await
        .map_err(|e| ArtifactError::PostProcess {
            path: binary.clone(),
            reason: format!("install_name_tool: {}", e),
        })?;

    if !output.status.success() {
        return Err(ArtifactError::PostProcess {
            path: binary,
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}
