//! Download URL templates
//!
//! Every template may contain `{version}`, replaced with the requested pier
//! version (`v1.6.1`). Overrides come from the CLI config file:
//!
//! ```toml
//! [urls.fabric]
//! linux = "https://mirror.example/fabric-client-{version}-Linux"
//! ```

use crate::error::{ArtifactError, Result};
use crate::store::ArtifactKind;
use pier_types::{ChainType, TargetOs};
use serde::{Deserialize, Serialize};

const PIER_RELEASES: &str = "https://github.com/meshplus/pier/releases/download";
const FABRIC_RELEASES: &str = "https://github.com/meshplus/pier-client-fabric/releases/download";
const ETHEREUM_RELEASES: &str =
    "https://github.com/meshplus/pier-client-ethereum/releases/download";

/// Per-OS template pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformUrls {
    pub linux: String,
    pub darwin: String,
}

impl PlatformUrls {
    fn for_os(&self, os: TargetOs) -> &str {
        match os {
            TargetOs::Linux => &self.linux,
            TargetOs::Darwin => &self.darwin,
        }
    }
}

/// URL templates for the pier tarball and each chain client plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactUrls {
    pub pier: PlatformUrls,
    pub ethereum: PlatformUrls,
    pub fabric: PlatformUrls,
}

impl Default for ArtifactUrls {
    fn default() -> Self {
        Self {
            pier: PlatformUrls {
                linux: format!("{PIER_RELEASES}/{{version}}/pier_linux-amd64_{{version}}.tar.gz"),
                darwin: format!(
                    "{PIER_RELEASES}/{{version}}/pier_darwin_x86_64_{{version}}.tar.gz"
                ),
            },
            ethereum: PlatformUrls {
                linux: format!("{ETHEREUM_RELEASES}/{{version}}/eth-client-{{version}}-Linux"),
                darwin: format!("{ETHEREUM_RELEASES}/{{version}}/eth-client-{{version}}-Darwin"),
            },
            fabric: PlatformUrls {
                linux: format!("{FABRIC_RELEASES}/{{version}}/fabric-client-{{version}}-Linux"),
                darwin: format!("{FABRIC_RELEASES}/{{version}}/fabric-client-{{version}}-Darwin"),
            },
        }
    }
}

impl ArtifactUrls {
    /// Render the download URL for one artifact
    pub fn render(&self, kind: ArtifactKind, os: TargetOs, version: &str) -> Result<String> {
        let set = match kind {
            ArtifactKind::Binary => &self.pier,
            ArtifactKind::Plugin(ChainType::Ethereum) => &self.ethereum,
            ArtifactKind::Plugin(ChainType::Fabric) => &self.fabric,
        };
        let template = set.for_os(os).trim();
        if template.is_empty() {
            return Err(ArtifactError::MissingTemplate(format!("{} on {}", kind, os)));
        }
        Ok(template.replace("{version}", version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_templates_render_version_twice() {
        let urls = ArtifactUrls::default();
        assert_eq!(
            urls.render(ArtifactKind::Binary, TargetOs::Linux, "v1.6.1").unwrap(),
            "https://github.com/meshplus/pier/releases/download/v1.6.1/pier_linux-amd64_v1.6.1.tar.gz"
        );
        assert_eq!(
            urls.render(
                ArtifactKind::Plugin(ChainType::Ethereum),
                TargetOs::Darwin,
                "v1.8.0"
            )
            .unwrap(),
            "https://github.com/meshplus/pier-client-ethereum/releases/download/v1.8.0/eth-client-v1.8.0-Darwin"
        );
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let urls: ArtifactUrls = toml::from_str(
            r#"
            [fabric]
            linux = "https://mirror.local/fc-{version}"
            darwin = "https://mirror.local/fc-{version}-mac"
            "#,
        )
        .unwrap();
        assert_eq!(
            urls.render(ArtifactKind::Plugin(ChainType::Fabric), TargetOs::Linux, "v1.9.0")
                .unwrap(),
            "https://mirror.local/fc-v1.9.0"
        );
        assert_eq!(urls.pier, ArtifactUrls::default().pier);
    }

    #[test]
    fn test_blank_template_is_an_error() {
        let mut urls = ArtifactUrls::default();
        urls.pier.darwin = " ".into();
        assert!(matches!(
            urls.render(ArtifactKind::Binary, TargetOs::Darwin, "v1.6.1"),
            Err(ArtifactError::MissingTemplate(_))
        ));
    }
}
