//! Lifecycle state persisted alongside an instance
//!
//! The record is advisory: commands may still run out of order, but stop,
//! clean and status read it instead of inspecting processes and containers.

use crate::chain::{ChainType, DeploymentMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Logical lifecycle position of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Unconfigured,
    Configured,
    Started,
    Registered,
    RuleDeployed,
    Stopped,
}

impl LifecycleState {
    /// Whether a local process may still be running
    pub fn may_be_running(&self) -> bool {
        matches!(
            self,
            LifecycleState::Started | LifecycleState::Registered | LifecycleState::RuleDeployed
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Unconfigured => "unconfigured",
            LifecycleState::Configured => "configured",
            LifecycleState::Started => "started",
            LifecycleState::Registered => "registered",
            LifecycleState::RuleDeployed => "rule-deployed",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Contents of the instance state file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub state: LifecycleState,
    pub chain_type: ChainType,
    pub mode: DeploymentMode,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
    pub updated_at: DateTime<Utc>,
}

impl InstanceRecord {
    pub fn new(
        state: LifecycleState,
        chain_type: ChainType,
        mode: DeploymentMode,
        version: impl Into<String>,
    ) -> Self {
        Self {
            state,
            chain_type,
            mode,
            version: version.into(),
            container_id: None,
            pid: None,
            config_path: None,
            updated_at: Utc::now(),
        }
    }

    /// Move to a new state, keeping the rest of the record
    pub fn transition(mut self, state: LifecycleState) -> Self {
        self.state = state;
        self.updated_at = Utc::now();
        self
    }
}
