//! Version resolution
//!
//! A requested pier version must be listed in the release manifest and have
//! a config schema in the compatibility table below.

use crate::error::{LifecycleError, Result};
use pier_types::{ReleaseManifest, RepoLayout};
use semver::Version;
use tracing::debug;

/// pier version -> config schema version
pub const COMPATIBILITY: &[(&str, &str)] = &[
    ("v1.6.1", "v1.6.1"),
    ("v1.7.0", "v1.6.1"),
    ("v1.8.0", "v1.8.0"),
    ("v1.9.0", "v1.8.0"),
];

/// First config schema whose relay commands take `--method`
pub const METHOD_SCHEMA: &str = "v1.8.0";

/// Config schema for a pier version, ignoring the manifest
pub fn config_schema(version: &str) -> Option<&'static str> {
    COMPATIBILITY
        .iter()
        .find(|(pier, _)| *pier == version)
        .map(|(_, schema)| *schema)
}

/// Validate `requested` against `supported` and map it to its config schema.
///
/// Pure: performs no I/O.
pub fn resolve(requested: &str, supported: &[String]) -> Result<&'static str> {
    let unsupported = || LifecycleError::UnsupportedVersion {
        version: requested.to_string(),
        supported: supported.to_vec(),
    };

    if !supported.iter().any(|v| v == requested) {
        return Err(unsupported());
    }
    config_schema(requested).ok_or_else(unsupported)
}

/// Whether `schema` is at or above `minimum`; unparseable versions compare low
pub fn schema_at_least(schema: &str, minimum: &str) -> bool {
    match (parse(schema), parse(minimum)) {
        (Some(schema), Some(minimum)) => schema >= minimum,
        _ => false,
    }
}

fn parse(version: &str) -> Option<Version> {
    Version::parse(version.trim_start_matches('v')).ok()
}

/// Read `release.json` from the repo root
pub fn load_manifest(layout: &RepoLayout) -> Result<ReleaseManifest> {
    let path = layout.release_manifest();
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LifecycleError::RepoNotInitialized(layout.root().to_path_buf()))
        }
        Err(e) => return Err(LifecycleError::io(&path, e)),
    };
    let manifest = ReleaseManifest::from_json(&data).map_err(|e| LifecycleError::Manifest {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    debug!(path = %path.display(), pier_versions = manifest.pier.len(), "Loaded release manifest");
    Ok(manifest)
}
