//! Validation error types

use thiserror::Error;

/// Errors raised while validating user-supplied pier parameters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported appchain type: {0} (expected one of: ethereum, fabric)")]
    UnsupportedChainType(String),

    #[error("unsupported deployment mode: {0} (expected one of: binary, container)")]
    UnsupportedDeploymentMode(String),

    #[error("unsupported operating system: {0} (expected one of: linux, darwin)")]
    UnsupportedOs(String),

    #[error("{chain} needs exactly {expected} appchain port(s), got {actual}: {ports:?}")]
    PortCount {
        chain: String,
        expected: usize,
        actual: usize,
        ports: Vec<String>,
    },

    #[error("appchain port {0} is repeated")]
    DuplicatePort(String),

    #[error("appchain address {address} and {field} {value} are inconsistent")]
    InconsistentAddress {
        address: String,
        field: &'static str,
        value: String,
    },

    #[error("appchain address {0} was given without ports; fabric needs all 9 ports specified")]
    MissingPorts(String),

    #[error("starting a {0} pier needs a crypto-config path")]
    MissingCredentialPath(String),
}

/// Result type for validation
pub type Result<T> = std::result::Result<T, ValidationError>;
