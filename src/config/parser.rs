//! Parameter file loading and environment overrides.
//!
//! Parameter files are YAML (JSON is accepted too, being a YAML subset) and
//! name their module with a `module:` key:
//!
//! ```yaml
//! module: lxc
//! name: empty01
//! action: create
//! template: ubuntu
//! template_options: "-r precise"
//! ```

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, ReconcilerError, Result};

use super::spec::{ModuleParams, ToolConfig};

/// Disables sudo for privileged commands when set to a true value.
pub const ENV_NO_SUDO: &str = "RECONCILE_NO_SUDO";

/// Enables per-resource locking in the given directory.
pub const ENV_LOCK_DIR: &str = "RECONCILE_LOCK_DIR";

/// Parser for parameter files and environment settings.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving `.env`.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory searched for `.env`.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads module parameters from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or invalid.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ModuleParams> {
        let path = path.as_ref();
        info!("Loading parameters from: {}", path.display());

        if !path.exists() {
            return Err(ReconcilerError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ReconcilerError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse(&content, Some(path))
    }

    /// Parses module parameters from YAML or JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid parameter document.
    pub fn parse(&self, content: &str, source: Option<&Path>) -> Result<ModuleParams> {
        debug!("Parsing parameter document");

        let params: ModuleParams = serde_yaml::from_str(content).map_err(|e| {
            ReconcilerError::Config(ConfigError::ParseError {
                message: format!("Parameter parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            })
        })?;

        debug!("Parsed parameters for {}", params.resource());
        Ok(params)
    }

    /// Loads the `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the `.env` file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ReconcilerError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Applies `RECONCILE_*` environment overrides to the tool settings.
    pub fn apply_env_overrides(config: &mut ToolConfig) {
        Self::apply_overrides(config, |key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary variable source.
    fn apply_overrides(config: &mut ToolConfig, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(ENV_NO_SUDO)
            && is_truthy(&value)
        {
            debug!("Disabling sudo from environment");
            config.use_sudo = false;
        }

        if config.lock_dir.is_none()
            && let Some(dir) = lookup(ENV_LOCK_DIR).filter(|d| !d.trim().is_empty())
        {
            debug!("Using lock directory from environment: {dir}");
            config.lock_dir = Some(PathBuf::from(dir));
        }
    }
}

/// Returns true for the usual spellings of "yes".
fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    use crate::config::{ContainerParams, WebResourceParams};
    use crate::resource::{ContainerAction, WebResourceType, WebState};

    #[test]
    fn test_parse_container_params() {
        let yaml = r#"
module: lxc
name: empty01
action: create
template: ubuntu
template_options: "-r precise"
"#;
        let params = ConfigParser::new().parse(yaml, None).unwrap();
        let ModuleParams::Lxc(p) = params else {
            panic!("expected container parameters");
        };
        assert_eq!(p.name, "empty01");
        assert_eq!(p.action, ContainerAction::Create);
        assert_eq!(p.template.as_deref(), Some("ubuntu"));
        assert_eq!(p.template_options.as_deref(), Some("-r precise"));
        assert!(p.config_file.is_none());
    }

    #[test]
    fn test_parse_web_params_defaults() {
        let params = ConfigParser::new()
            .parse("module: apache2_resource\nname: wsgi\n", None)
            .unwrap();
        assert_eq!(
            params,
            ModuleParams::Apache2Resource(WebResourceParams::new(
                "wsgi",
                WebState::Present,
                WebResourceType::Module
            ))
        );
    }

    #[test]
    fn test_parse_json_params() {
        let json = r#"{"module": "apache2_resource", "name": "000-default.conf", "state": "absent", "resource_type": "site"}"#;
        let params = ConfigParser::new().parse(json, None).unwrap();
        assert_eq!(
            params,
            ModuleParams::Apache2Resource(WebResourceParams::new(
                "000-default.conf",
                WebState::Absent,
                WebResourceType::Site
            ))
        );
    }

    #[test]
    fn test_parse_rejects_bad_choice_and_unknown_field() {
        let parser = ConfigParser::new();
        let err = parser
            .parse("module: lxc\nname: a\naction: restart\n", None)
            .unwrap_err();
        assert!(err.to_string().contains("restart"));

        assert!(parser
            .parse("module: lxc\nname: a\naction: start\nbogus: 1\n", None)
            .is_err());
        assert!(parser.parse("module: docker\nname: a\n", None).is_err());
    }

    #[test]
    fn test_load_file_roundtrip_and_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("args.yaml");
        std::fs::write(&path, "module: lxc\nname: box\naction: stop\n").unwrap();

        let parser = ConfigParser::new();
        assert_eq!(
            parser.load_file(&path).unwrap(),
            ModuleParams::Lxc(ContainerParams::new("box", ContainerAction::Stop))
        );

        let missing = parser.load_file(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(
            missing,
            ReconcilerError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> =
            HashMap::from([(ENV_NO_SUDO, "yes"), (ENV_LOCK_DIR, "/run/reconcile")]);
        let mut config = ToolConfig::default();
        ConfigParser::apply_overrides(&mut config, |k| vars.get(k).map(ToString::to_string));

        assert!(!config.use_sudo);
        assert_eq!(config.lock_dir, Some(PathBuf::from("/run/reconcile")));
    }

    #[test]
    fn test_cli_lock_dir_wins_over_env() {
        let mut config = ToolConfig {
            lock_dir: Some(PathBuf::from("/tmp/cli")),
            ..ToolConfig::default()
        };
        ConfigParser::apply_overrides(&mut config, |k| {
            (k == ENV_LOCK_DIR).then(|| String::from("/tmp/env"))
        });
        assert_eq!(config.lock_dir, Some(PathBuf::from("/tmp/cli")));
        assert!(config.use_sudo);
    }

    #[test]
    fn test_truthy_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy(" TRUE "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("no"));
    }
}
