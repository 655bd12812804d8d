//! Release manifest
//!
//! `release.json` lists the supported versions of every sub-component:
//!
//! ```json
//! { "pier": ["v1.6.1", "v1.7.0"], "bitxhub": ["v1.6.0"] }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Supported versions per sub-component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseManifest {
    #[serde(default)]
    pub pier: Vec<String>,

    /// Every other component, keyed by name
    #[serde(flatten)]
    pub components: BTreeMap<String, Vec<String>>,
}

impl ReleaseManifest {
    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }
}
