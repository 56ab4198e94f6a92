//! Parameter validation.
//!
//! Runs once at the boundary, before any command is executed.

use tracing::{debug, warn};

use crate::error::{ConfigError, ReconcilerError, Result};
use crate::resource::container::split_template_options;

use super::spec::{ContainerParams, ModuleParams, WebResourceParams};

/// Validator for module parameters.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all problems found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates module parameters.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any was found.
    pub fn validate(&self, params: &ModuleParams) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        match params {
            ModuleParams::Lxc(p) => Self::validate_container(p, &mut result),
            ModuleParams::Apache2Resource(p) => Self::validate_web(p, &mut result),
        }

        for warning in &result.warnings {
            warn!("{warning}");
        }

        match result.errors.first() {
            None => {
                debug!("Parameter validation passed");
                Ok(result)
            }
            Some(first) => Err(ReconcilerError::Config(ConfigError::validation(
                first.message.clone(),
                first.field.clone(),
            ))),
        }
    }

    /// Validates a bare resource name, as given to `status`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name could be mistaken for an option
    /// or a path.
    pub fn validate_name(&self, name: &str) -> Result<()> {
        let mut result = ValidationResult::default();
        check_name(name, &mut result);
        match result.errors.into_iter().next() {
            None => Ok(()),
            Some(first) => Err(ReconcilerError::Config(ConfigError::validation(
                first.message,
                first.field,
            ))),
        }
    }

    /// Validates container parameters.
    fn validate_container(params: &ContainerParams, result: &mut ValidationResult) {
        check_name(&params.name, result);

        if params.action.requires_existence() && params.has_create_options() {
            result.warnings.push(format!(
                "config_file, template, backing_store and template_options only apply to create; ignored for {}",
                params.action
            ));
        }

        if let Some(options) = &params.template_options {
            if params.template.is_none() {
                result
                    .warnings
                    .push(String::from("template_options given without a template"));
            }
            if let Err(e) = split_template_options(options) {
                result.errors.push(ValidationError {
                    field: String::from("template_options"),
                    message: e.to_string(),
                });
            }
        }

        if let Some(config_file) = &params.config_file
            && config_file.as_os_str().is_empty()
        {
            result.errors.push(ValidationError {
                field: String::from("config_file"),
                message: String::from("config_file cannot be empty"),
            });
        }

        for (field, value) in [
            ("template", params.template.as_deref()),
            ("backing_store", params.backing_store.as_deref()),
        ] {
            if value.is_some_and(|v| v.trim().is_empty()) {
                result.errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("{field} cannot be empty"),
                });
            }
        }
    }

    /// Validates site/module parameters.
    fn validate_web(params: &WebResourceParams, result: &mut ValidationResult) {
        check_name(&params.name, result);
    }
}

/// Checks that a resource name can be passed as a single positional argument.
fn check_name(name: &str, result: &mut ValidationResult) {
    if name.is_empty() {
        result.errors.push(ValidationError {
            field: String::from("name"),
            message: String::from("Name cannot be empty"),
        });
    } else if !is_valid_name(name) {
        result.errors.push(ValidationError {
            field: String::from("name"),
            message: format!(
                "Name '{name}' is invalid. It must not start with '-' or contain whitespace, '/' or control characters."
            ),
        });
    }
}

/// Checks if a name is usable as a container/site/module name.
fn is_valid_name(name: &str) -> bool {
    !name.starts_with('-')
        && name != "."
        && name != ".."
        && !name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::resource::{ContainerAction, WebResourceType, WebState};

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("empty01"));
        assert!(is_valid_name("000-default.conf"));
        assert!(is_valid_name("proxy_http"));
        assert!(!is_valid_name("-n"));
        assert!(!is_valid_name("a b"));
        assert!(!is_valid_name("../etc"));
        assert!(!is_valid_name(".."));
    }

    #[test]
    fn test_validate_bare_name() {
        let validator = ConfigValidator::new();
        assert!(validator.validate_name("web01").is_ok());
        assert!(validator.validate_name("-x").is_err());
        assert!(validator.validate_name("../x").is_err());
        assert!(validator.validate_name("").is_err());
    }

    #[test]
    fn test_valid_container_params() {
        let params = ModuleParams::Lxc(ContainerParams::new("empty01", ContainerAction::Start));
        let result = ConfigValidator::new().validate(&params).unwrap();
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_empty_name_rejected() {
        let params = ModuleParams::Apache2Resource(WebResourceParams::new(
            "",
            WebState::Present,
            WebResourceType::Site,
        ));
        let err = ConfigValidator::new().validate(&params).unwrap_err();
        assert!(err.to_string().contains("Name cannot be empty"));
    }

    #[test]
    fn test_create_options_on_start_warn() {
        let mut p = ContainerParams::new("empty01", ContainerAction::Start);
        p.template = Some(String::from("ubuntu"));
        let result = ConfigValidator::new()
            .validate(&ModuleParams::Lxc(p))
            .unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("ignored for start"));
    }

    #[test]
    fn test_unbalanced_template_options_rejected() {
        let mut p = ContainerParams::new("empty01", ContainerAction::Create);
        p.template = Some(String::from("ubuntu"));
        p.template_options = Some(String::from("-r \"precise"));
        let err = ConfigValidator::new()
            .validate(&ModuleParams::Lxc(p))
            .unwrap_err();
        assert!(err.to_string().contains("Cannot split template options"));
    }

    #[test]
    fn test_empty_create_options_rejected() {
        let mut p = ContainerParams::new("empty01", ContainerAction::Create);
        p.config_file = Some(PathBuf::new());
        assert!(ConfigValidator::new().validate(&ModuleParams::Lxc(p)).is_err());

        let mut p = ContainerParams::new("empty01", ContainerAction::Create);
        p.backing_store = Some(String::from("  "));
        assert!(ConfigValidator::new().validate(&ModuleParams::Lxc(p)).is_err());
    }
}
