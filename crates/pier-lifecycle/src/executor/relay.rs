//! pier command lines

use crate::version::{schema_at_least, METHOD_SCHEMA};
use std::ffi::OsString;
use std::path::Path;

/// Relay operation forwarded to pier
#[derive(Debug, Clone, Copy)]
pub enum RelayCommand<'a> {
    Register,
    DeployRule { rule: &'a Path },
}

/// `--repo <repo> start --config <config>`
pub fn start_args(repo: &Path, config: &Path) -> Vec<OsString> {
    vec![
        "--repo".into(),
        repo.into(),
        "start".into(),
        "--config".into(),
        config.into(),
    ]
}

/// Arguments for a relay operation; `--method` is appended from schema
/// v1.8.0 on
pub fn relay_args(repo: &Path, command: RelayCommand<'_>, schema: &str, method: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--repo".into(), repo.into()];
    match command {
        RelayCommand::Register => {
            args.extend(["appchain".into(), "register".into()]);
        }
        RelayCommand::DeployRule { rule } => {
            args.extend(["rule".into(), "deploy".into(), "--path".into(), rule.into()]);
        }
    }
    if schema_at_least(schema, METHOD_SCHEMA) && !method.is_empty() {
        args.extend(["--method".into(), method.into()]);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_register_before_method_schema() {
        let args = relay_args(Path::new("/p"), RelayCommand::Register, "v1.6.1", "appchain");
        assert_eq!(strings(args), ["--repo", "/p", "appchain", "register"]);
    }

    #[test]
    fn test_rule_deploy_with_method() {
        let args = relay_args(
            Path::new("/p"),
            RelayCommand::DeployRule {
                rule: Path::new("/p/ethereum/validating.wasm"),
            },
            "v1.8.0",
            "appchain",
        );
        assert_eq!(
            strings(args),
            [
                "--repo",
                "/p",
                "rule",
                "deploy",
                "--path",
                "/p/ethereum/validating.wasm",
                "--method",
                "appchain"
            ]
        );
    }

    #[test]
    fn test_start_args() {
        let args = start_args(Path::new("/p"), Path::new("/p/pier.toml"));
        assert_eq!(
            strings(args),
            ["--repo", "/p", "start", "--config", "/p/pier.toml"]
        );
    }
}
