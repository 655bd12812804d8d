//! Appchain network addressing
//!
//! `AppchainInput` is what the operator typed; `AppchainEndpoint` is the fully
//! populated triple produced by the address resolver.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ether port sentinel meaning "unspecified, accept any"
pub const ETHER_ANY_PORT: &str = "0000";

/// Partial addressing parameters supplied by the operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppchainInput {
    pub ip: Option<String>,
    pub address: Option<String>,
    pub ports: Option<Vec<String>>,
    /// Crypto material directory, mandatory for Fabric
    pub crypto_path: Option<PathBuf>,
}

impl AppchainInput {
    /// Ports with blanks stripped; `None` when nothing usable was given
    pub fn explicit_ports(&self) -> Option<Vec<String>> {
        let ports: Vec<String> = self
            .ports
            .as_ref()?
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if ports.is_empty() {
            None
        } else {
            Some(ports)
        }
    }

    pub fn ip(&self) -> Option<&str> {
        non_empty(self.ip.as_deref())
    }

    pub fn address(&self) -> Option<&str> {
        non_empty(self.address.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Complete, internally consistent appchain endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppchainEndpoint {
    pub ip: String,
    pub address: String,
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypto_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_ports_are_unspecified() {
        let input = AppchainInput {
            ports: Some(vec![" ".into(), String::new()]),
            ..Default::default()
        };
        assert_eq!(input.explicit_ports(), None);
    }

    #[test]
    fn test_blank_ip_is_unspecified() {
        let input = AppchainInput {
            ip: Some("  ".into()),
            address: Some(" ws://1.2.3.4:8546 ".into()),
            ..Default::default()
        };
        assert_eq!(input.ip(), None);
        assert_eq!(input.address(), Some("ws://1.2.3.4:8546"));
    }
}
