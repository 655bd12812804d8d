//! Instance state file
//!
//! `<instanceRepo>/.pier_state.json` records the last lifecycle transition.
//! Writes go through a temp file and a rename so readers never observe a
//! torn record.

use crate::error::{LifecycleError, Result};
use pier_types::{InstanceRecord, LifecycleState, PierInstance};
use std::path::Path;
use tracing::{debug, warn};

/// Read the record for `instance`, if one was ever written
pub fn load(instance: &PierInstance) -> Result<Option<InstanceRecord>> {
    load_from(&instance.state_file())
}

pub fn load_from(path: &Path) -> Result<Option<InstanceRecord>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(LifecycleError::io(path, e)),
    };
    match serde_json::from_str(&data) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            // Advisory only; a corrupt record must not block commands
            warn!(path = %path.display(), error = %e, "Ignoring unreadable state file");
            Ok(None)
        }
    }
}

/// Persist `record` for `instance`
pub fn save(instance: &PierInstance, record: &InstanceRecord) -> Result<()> {
    let path = instance.state_file();
    std::fs::create_dir_all(&instance.instance_repo)
        .map_err(|e| LifecycleError::io(&instance.instance_repo, e))?;

    let data = serde_json::to_vec_pretty(record)
        .map_err(|e| LifecycleError::io(&path, std::io::Error::other(e)))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, data).map_err(|e| LifecycleError::io(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| LifecycleError::io(&path, e))?;

    debug!(state = %record.state, path = %path.display(), "State recorded");
    Ok(())
}

/// Record `state` for `instance`, carrying over pid and container from any
/// earlier record
pub fn transition(
    instance: &PierInstance,
    state: LifecycleState,
    pid: Option<u32>,
) -> Result<InstanceRecord> {
    let previous = load(instance)?;
    let mut record = match previous {
        Some(previous) => previous.transition(state),
        None => InstanceRecord::new(state, instance.chain_type, instance.mode, &instance.version),
    };
    record.mode = instance.mode;
    record.version = instance.version.clone();
    if instance.container_id.is_some() {
        record.container_id = instance.container_id.clone();
    }
    if pid.is_some() {
        record.pid = pid;
    }
    if let Some(config) = &instance.config_path {
        record.config_path = Some(config.clone());
    }
    save(instance, &record)?;
    Ok(record)
}
