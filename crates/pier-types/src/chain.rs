//! Chain type, deployment mode and target operating system
//!
//! All three are closed enums: unknown spellings fail at parse time instead
//! of silently flowing through to artifact naming or address resolution.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Appchain family a pier bridges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    /// Ethereum-family chains, addressed over a single websocket port
    #[serde(alias = "ether", alias = "eth")]
    Ethereum,

    /// Fabric-family chains, addressed over orderer and peer ports
    Fabric,
}

impl ChainType {
    pub const ALL: [ChainType; 2] = [ChainType::Ethereum, ChainType::Fabric];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainType::Ethereum => "ethereum",
            ChainType::Fabric => "fabric",
        }
    }

    /// File name of the chain client plugin loaded by pier
    pub fn plugin_name(&self) -> String {
        format!("{}-client", self.as_str())
    }

    /// Number of appchain ports a complete endpoint carries
    pub fn port_count(&self) -> usize {
        match self {
            ChainType::Ethereum => 1,
            ChainType::Fabric => 9,
        }
    }

    /// Ports used when none are given on the command line
    pub fn default_ports(&self) -> Vec<String> {
        let ports: &[&str] = match self {
            ChainType::Ethereum => &["8546"],
            ChainType::Fabric => &[
                "7050", "7051", "7053", "8051", "8053", "9051", "9053", "10051", "10053",
            ],
        };
        ports.iter().map(|p| p.to_string()).collect()
    }

    /// IP used to derive an address when neither ip nor address is given
    pub fn default_ip(&self) -> &'static str {
        match self {
            ChainType::Ethereum => "0.0.0.0",
            ChainType::Fabric => "127.0.0.1",
        }
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ethereum" | "ether" | "eth" => Ok(ChainType::Ethereum),
            "fabric" => Ok(ChainType::Fabric),
            other => Err(ValidationError::UnsupportedChainType(other.to_string())),
        }
    }
}

/// How a pier instance is run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Locally spawned pier process
    #[default]
    Binary,

    /// Externally managed container, addressed by ID
    #[serde(alias = "docker")]
    Container,
}

impl DeploymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentMode::Binary => "binary",
            DeploymentMode::Container => "container",
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" => Ok(DeploymentMode::Binary),
            "container" | "docker" => Ok(DeploymentMode::Container),
            other => Err(ValidationError::UnsupportedDeploymentMode(other.to_string())),
        }
    }
}

/// Operating system an artifact is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOs {
    Linux,
    Darwin,
}

impl TargetOs {
    /// Detect the host operating system
    pub fn host() -> Result<Self, ValidationError> {
        std::env::consts::OS.parse()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetOs::Linux => "linux",
            TargetOs::Darwin => "darwin",
        }
    }

    /// Suffix used by upstream release file names (`eth-client-v1.6.1-Linux`)
    pub fn release_suffix(&self) -> &'static str {
        match self {
            TargetOs::Linux => "Linux",
            TargetOs::Darwin => "Darwin",
        }
    }
}

impl fmt::Display for TargetOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetOs {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(TargetOs::Linux),
            "darwin" | "macos" => Ok(TargetOs::Darwin),
            other => Err(ValidationError::UnsupportedOs(other.to_string())),
        }
    }
}
