//! Pier Types - Core types for the pier lifecycle orchestrator
//!
//! A pier is a relay node bridging one appchain (Ethereum-family or
//! Fabric-family) into the hub network. This crate holds the value objects
//! shared by the artifact store, the lifecycle orchestrator and the CLI.
//!
//! ## Key Concepts
//!
//! - **ChainType**: closed set of supported appchain families
//! - **DeploymentMode**: local binary process or pre-existing container
//! - **PierInstance**: one relay-node deployment, built fresh per invocation
//! - **AppchainEndpoint**: the resolved `{ip, address, ports}` triple
//! - **RepoLayout**: deterministic filesystem layout under the repo root
//! - **InstanceRecord**: persisted lifecycle state next to the instance

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod chain;
pub mod endpoint;
pub mod error;
pub mod instance;
pub mod layout;
pub mod release;
pub mod state;

// Re-export main types
pub use chain::{ChainType, DeploymentMode, TargetOs};
pub use endpoint::{AppchainEndpoint, AppchainInput, ETHER_ANY_PORT};
pub use error::{Result, ValidationError};
pub use instance::PierInstance;
pub use layout::RepoLayout;
pub use release::ReleaseManifest;
pub use state::{InstanceRecord, LifecycleState};
