//! Read-only commands: status and versions

use super::Context;
use crate::error::CliResult;
use crate::output;
use pier_lifecycle::{InstanceStatus, VersionInfo};
use serde::Serialize;
use tabled::Tabled;

/// Table row for instance status display
#[derive(Debug, Serialize, Tabled)]
struct StatusRow {
    appchain: String,
    state: String,
    mode: String,
    version: String,
    pid: String,
    container: String,
    updated: String,
}

impl From<InstanceStatus> for StatusRow {
    fn from(s: InstanceStatus) -> Self {
        let dash = || "-".to_string();
        let state = match (&s.record, s.present) {
            (Some(record), _) => record.state.to_string(),
            (None, true) => "unknown".to_string(),
            (None, false) => "absent".to_string(),
        };
        let pid = match (s.record.as_ref().and_then(|r| r.pid), s.alive) {
            (Some(pid), Some(false)) => format!("{} (gone)", pid),
            (Some(pid), _) => pid.to_string(),
            (None, _) => dash(),
        };

        Self {
            appchain: s.chain_type.to_string(),
            state,
            mode: s.record.as_ref().map(|r| r.mode.to_string()).unwrap_or_else(dash),
            version: s.record.as_ref().map(|r| r.version.clone()).unwrap_or_else(dash),
            pid,
            container: s
                .record
                .as_ref()
                .and_then(|r| r.container_id.clone())
                .unwrap_or_else(dash),
            updated: s
                .record
                .as_ref()
                .map(|r| r.updated_at.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(dash),
        }
    }
}

/// Table row for supported versions
#[derive(Debug, Serialize, Tabled)]
struct VersionRow {
    version: String,
    schema: String,
}

impl From<VersionInfo> for VersionRow {
    fn from(v: VersionInfo) -> Self {
        Self {
            version: v.version,
            schema: v.schema.unwrap_or_else(|| "unmapped".to_string()),
        }
    }
}

pub fn status(ctx: &Context) -> CliResult<()> {
    let statuses = pier_lifecycle::orchestrator::status(&ctx.repo_root)?;
    match ctx.format {
        output::OutputFormat::Table => {
            let rows: Vec<StatusRow> = statuses.into_iter().map(StatusRow::from).collect();
            output::print_output(rows, ctx.format)
        }
        format => output::print_single(&statuses, format),
    }
}

pub fn versions(ctx: &Context) -> CliResult<()> {
    let versions = pier_lifecycle::orchestrator::versions(&ctx.repo_root)?;
    let rows: Vec<VersionRow> = versions.into_iter().map(VersionRow::from).collect();
    output::print_output(rows, ctx.format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pier_types::{ChainType, DeploymentMode, InstanceRecord, LifecycleState};
    use std::path::PathBuf;

    #[test]
    fn test_status_row_marks_dead_pid() {
        let mut record = InstanceRecord::new(
            LifecycleState::Started,
            ChainType::Ethereum,
            DeploymentMode::Binary,
            "v1.6.1",
        );
        record.pid = Some(4242);
        let row = StatusRow::from(InstanceStatus {
            chain_type: ChainType::Ethereum,
            instance_repo: PathBuf::from("/r/pier/.pier_ethereum"),
            present: true,
            record: Some(record),
            alive: Some(false),
        });
        assert_eq!(row.state, "started");
        assert_eq!(row.pid, "4242 (gone)");
        assert_eq!(row.container, "-");
    }

    #[test]
    fn test_status_row_absent_instance() {
        let row = StatusRow::from(InstanceStatus {
            chain_type: ChainType::Fabric,
            instance_repo: PathBuf::from("/r/pier/.pier_fabric"),
            present: false,
            record: None,
            alive: None,
        });
        assert_eq!(row.state, "absent");
        assert_eq!(row.version, "-");
    }
}
