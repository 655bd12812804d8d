//! Pier config rendering
//!
//! The versioned template is a TOML document. Rendering overlays the
//! resolved appchain endpoint and deployment mode, writes `pier.toml` into
//! the instance repo and copies the chain client plugin next to it.

use crate::error::{LifecycleError, Result};
use pier_types::layout::PLUGINS_DIR;
use pier_types::{AppchainEndpoint, PierInstance};
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use tracing::{debug, info};

/// Files produced by a render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedConfig {
    pub config: PathBuf,
    pub plugin: PathBuf,
}

/// Render the instance config from the template for `schema`
pub fn render(
    instance: &PierInstance,
    schema: &str,
    endpoint: &AppchainEndpoint,
    plugin: &Path,
) -> Result<RenderedConfig> {
    let template = instance.config_template(schema);
    let config_err = |reason: String| LifecycleError::Config {
        path: template.clone(),
        reason,
    };

    let source = std::fs::read_to_string(&template)
        .map_err(|e| config_err(format!("cannot read template: {}", e)))?;
    let mut doc: Table = source.parse().map_err(|e: toml::de::Error| config_err(e.to_string()))?;

    overlay(&mut doc, instance, endpoint);

    std::fs::create_dir_all(&instance.instance_repo)
        .map_err(|e| LifecycleError::io(&instance.instance_repo, e))?;

    let plugins_dir = instance.instance_repo.join(PLUGINS_DIR);
    std::fs::create_dir_all(&plugins_dir).map_err(|e| LifecycleError::io(&plugins_dir, e))?;
    let plugin_target = plugins_dir.join(instance.chain_type.plugin_name());
    std::fs::copy(plugin, &plugin_target).map_err(|e| LifecycleError::io(plugin, e))?;
    debug!(plugin = %plugin_target.display(), "Plugin installed");

    let rendered = toml::to_string_pretty(&doc).map_err(|e| config_err(e.to_string()))?;
    let config = instance.rendered_config();
    std::fs::write(&config, rendered).map_err(|e| LifecycleError::io(&config, e))?;
    info!(config = %config.display(), schema, "Pier config rendered");

    Ok(RenderedConfig {
        config,
        plugin: plugin_target,
    })
}

fn overlay(doc: &mut Table, instance: &PierInstance, endpoint: &AppchainEndpoint) {
    let mut appchain = Table::new();
    appchain.insert("type".into(), Value::from(instance.chain_type.as_str()));
    appchain.insert(
        "plugin".into(),
        Value::from(instance.chain_type.plugin_name()),
    );
    appchain.insert("ip".into(), Value::from(endpoint.ip.as_str()));
    appchain.insert("addr".into(), Value::from(endpoint.address.as_str()));
    appchain.insert(
        "ports".into(),
        Value::Array(endpoint.ports.iter().map(|p| Value::from(p.as_str())).collect()),
    );
    if let Some(crypto) = &endpoint.crypto_path {
        appchain.insert(
            "crypto_path".into(),
            Value::from(crypto.display().to_string()),
        );
    }
    merge_table(doc, "appchain", appchain);

    let mut mode = Table::new();
    mode.insert("up_type".into(), Value::from(instance.mode.as_str()));
    mode.insert("version".into(), Value::from(instance.version.as_str()));
    merge_table(doc, "mode", mode);
}

/// Merge `values` into sub-table `key`, replacing any non-table value
fn merge_table(doc: &mut Table, key: &str, values: Table) {
    let mut table = match doc.remove(key) {
        Some(Value::Table(table)) => table,
        _ => Table::new(),
    };
    table.extend(values);
    doc.insert(key.to_string(), Value::Table(table));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pier_types::{ChainType, DeploymentMode};

    const TEMPLATE: &str = r#"
title = "pier"

[port]
http = 44544
pprof = 44555

[appchain]
plugin = "placeholder"
"#;

    fn setup() -> (tempfile::TempDir, PierInstance, PathBuf) {
        let repo = tempfile::tempdir().unwrap();
        let template = repo
            .path()
            .join("pier_config/v1.6.1/pier_modify_config.toml");
        std::fs::create_dir_all(template.parent().unwrap()).unwrap();
        std::fs::write(&template, TEMPLATE).unwrap();

        let plugin = repo.path().join("eth-plugin-bin");
        std::fs::write(&plugin, b"plugin").unwrap();

        let instance = PierInstance::new(
            repo.path(),
            ChainType::Ethereum,
            DeploymentMode::Binary,
            "v1.7.0",
        );
        (repo, instance, plugin)
    }

    fn endpoint() -> AppchainEndpoint {
        AppchainEndpoint {
            ip: "0.0.0.0".into(),
            address: "ws://0.0.0.0:8546".into(),
            ports: vec!["8546".into()],
            crypto_path: None,
        }
    }

    #[test]
    fn test_render_overlays_endpoint() {
        let (_repo, instance, plugin) = setup();
        let rendered = render(&instance, "v1.6.1", &endpoint(), &plugin).unwrap();

        let doc: Table = std::fs::read_to_string(&rendered.config)
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(doc["title"].as_str(), Some("pier"));
        assert_eq!(doc["port"]["http"].as_integer(), Some(44544));
        assert_eq!(doc["appchain"]["plugin"].as_str(), Some("ethereum-client"));
        assert_eq!(doc["appchain"]["addr"].as_str(), Some("ws://0.0.0.0:8546"));
        assert_eq!(doc["mode"]["up_type"].as_str(), Some("binary"));

        assert_eq!(
            rendered.plugin,
            instance.instance_repo.join("plugins/ethereum-client")
        );
        assert!(rendered.plugin.is_file());
    }

    #[test]
    fn test_missing_template() {
        let (_repo, instance, plugin) = setup();
        let err = render(&instance, "v1.8.0", &endpoint(), &plugin).unwrap_err();
        assert!(matches!(err, LifecycleError::Config { .. }));
        assert!(err.to_string().contains("v1.8.0"));
    }

    #[test]
    fn test_config_path_override() {
        let (repo, instance, plugin) = setup();
        let custom = repo.path().join("custom.toml");
        std::fs::write(&custom, "[appchain]\n").unwrap();
        let instance = instance.with_config_path(Some(custom));

        // Schema directory is ignored when an explicit template is given
        let rendered = render(&instance, "v9.9.9", &endpoint(), &plugin).unwrap();
        assert!(rendered.config.is_file());
    }
}
