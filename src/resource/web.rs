//! Apache site/module commands and output classification.

use crate::exec::{CommandOutput, CommandSpec};

use super::types::{WebResourceState, WebResourceType, WebState};

/// Query tool for enabled sites and modules.
pub const A2QUERY: &str = "a2query";
/// Site enable tool.
pub const A2ENSITE: &str = "a2ensite";
/// Site disable tool.
pub const A2DISSITE: &str = "a2dissite";
/// Module enable tool.
pub const A2ENMOD: &str = "a2enmod";
/// Module disable tool.
pub const A2DISMOD: &str = "a2dismod";

/// Idempotence marker printed when enabling an enabled resource.
pub const ALREADY_ENABLED: &str = "already enabled";
/// Idempotence marker printed when disabling a disabled resource.
pub const ALREADY_DISABLED: &str = "already disabled";

/// `a2query` marker for an enabled resource, e.g. `wsgi (enabled by site administrator)`.
pub const QUERY_ENABLED_MARKER: &str = "(enabled";
/// `a2query` marker for a disabled resource.
pub const QUERY_DISABLED_MARKER: &str = "(disabled";
/// `a2query` output for an unknown site.
pub const QUERY_NO_SITE: &str = "No site matches";
/// `a2query` output for an unknown module.
pub const QUERY_NO_MODULE: &str = "No module matches";

/// Config file suffixes the Apache tools accept and drop from the name.
const SITE_SUFFIXES: &[&str] = &[".conf"];
const MODULE_SUFFIXES: &[&str] = &[".conf", ".load"];

/// Returns the name as the Apache tools print it, without a config file suffix.
///
/// `a2ensite 000-default.conf` reports on `000-default`, and `a2query` only
/// matches the bare name.
#[must_use]
pub fn canonical_name(name: &str, resource_type: WebResourceType) -> &str {
    let suffixes = match resource_type {
        WebResourceType::Site => SITE_SUFFIXES,
        WebResourceType::Module => MODULE_SUFFIXES,
    };
    suffixes
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix).filter(|base| !base.is_empty()))
        .unwrap_or(name)
}

/// Builds the enable/disable command for a site or module.
#[must_use]
pub fn corrective_command(name: &str, resource_type: WebResourceType, state: WebState) -> CommandSpec {
    let program = match (resource_type, state) {
        (WebResourceType::Site, WebState::Present) => A2ENSITE,
        (WebResourceType::Site, WebState::Absent) => A2DISSITE,
        (WebResourceType::Module, WebState::Present) => A2ENMOD,
        (WebResourceType::Module, WebState::Absent) => A2DISMOD,
    };
    CommandSpec::new(program).arg(name)
}

/// Builds the `a2query` status command.
#[must_use]
pub fn status_command(name: &str, resource_type: WebResourceType) -> CommandSpec {
    let flag = match resource_type {
        WebResourceType::Site => "-s",
        WebResourceType::Module => "-m",
    };
    CommandSpec::new(A2QUERY).args([flag, canonical_name(name, resource_type)])
}

/// Returns the idempotence marker for a desired state.
#[must_use]
pub const fn already_marker(state: WebState) -> &'static str {
    match state {
        WebState::Present => ALREADY_ENABLED,
        WebState::Absent => ALREADY_DISABLED,
    }
}

/// Returns true if the corrective command's stdout says nothing had to change.
///
/// Only stdout is inspected, and the marker must follow the resource name
/// (`Module wsgi already enabled`).
#[must_use]
pub fn reports_already(
    stdout: &str,
    name: &str,
    resource_type: WebResourceType,
    state: WebState,
) -> bool {
    let needle = format!(
        "{} {}",
        canonical_name(name, resource_type),
        already_marker(state)
    );
    stdout.contains(&needle)
}

/// Interprets `a2query` output.
///
/// `a2query` exits non-zero for disabled and unknown resources, so only the
/// text is classified.
///
/// # Errors
///
/// Returns the diagnostic text when no marker matches.
pub fn interpret_status(output: &CommandOutput) -> Result<WebResourceState, String> {
    let text = output.combined();

    if text.contains(QUERY_ENABLED_MARKER) {
        Ok(WebResourceState::Enabled)
    } else if text.contains(QUERY_DISABLED_MARKER) {
        Ok(WebResourceState::Disabled)
    } else if text.contains(QUERY_NO_SITE) || text.contains(QUERY_NO_MODULE) {
        Ok(WebResourceState::Absent)
    } else {
        Err(output.diagnostic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrective_programs() {
        let cases = [
            (WebResourceType::Site, WebState::Present, A2ENSITE),
            (WebResourceType::Site, WebState::Absent, A2DISSITE),
            (WebResourceType::Module, WebState::Present, A2ENMOD),
            (WebResourceType::Module, WebState::Absent, A2DISMOD),
        ];
        for (resource_type, state, program) in cases {
            let spec = corrective_command("wsgi", resource_type, state);
            assert_eq!(spec.program, program);
            assert_eq!(spec.args, vec!["wsgi"]);
            assert!(!spec.privileged);
        }
    }

    #[test]
    fn test_already_enabled_marker() {
        let stdout = "Site 000-default already enabled\n";
        assert!(reports_already(stdout, "000-default", WebResourceType::Site, WebState::Present));
        assert!(!reports_already(stdout, "000-default", WebResourceType::Site, WebState::Absent));
    }

    #[test]
    fn test_already_marker_with_conf_suffix() {
        let stdout = "Site 000-default already enabled\n";
        assert!(reports_already(
            stdout,
            "000-default.conf",
            WebResourceType::Site,
            WebState::Present
        ));

        let stdout = "Module wsgi already disabled\n";
        assert!(reports_already(
            stdout,
            "wsgi.load",
            WebResourceType::Module,
            WebState::Absent
        ));
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("000-default.conf", WebResourceType::Site), "000-default");
        assert_eq!(canonical_name("default-ssl", WebResourceType::Site), "default-ssl");
        assert_eq!(canonical_name("site.load", WebResourceType::Site), "site.load");
        assert_eq!(canonical_name("wsgi.load", WebResourceType::Module), "wsgi");
        assert_eq!(canonical_name("ssl.conf", WebResourceType::Module), "ssl");
        assert_eq!(canonical_name(".conf", WebResourceType::Site), ".conf");
    }

    #[test]
    fn test_already_disabled_marker() {
        let stdout = "Considering dependency setenvif for ssl:\nModule wsgi already disabled\n";
        assert!(reports_already(stdout, "wsgi", WebResourceType::Module, WebState::Absent));
    }

    #[test]
    fn test_marker_must_name_the_resource() {
        let stdout = "Module mime already enabled\nEnabling module wsgi.\n";
        assert!(!reports_already(stdout, "wsgi", WebResourceType::Module, WebState::Present));
    }

    #[test]
    fn test_query_enabled_marker() {
        let out = CommandOutput::ok("wsgi (enabled by site administrator)\n");
        assert_eq!(interpret_status(&out), Ok(WebResourceState::Enabled));
    }

    #[test]
    fn test_query_disabled_marker() {
        let out = CommandOutput::with_status(
            32,
            "",
            "No module matches wsgi (disabled by site administrator)\n",
        );
        assert_eq!(interpret_status(&out), Ok(WebResourceState::Disabled));
    }

    #[test]
    fn test_query_no_match_markers() {
        let site = CommandOutput::with_status(1, "", "No site matches nothing\n");
        assert_eq!(interpret_status(&site), Ok(WebResourceState::Absent));

        let module = CommandOutput::with_status(1, "", "No module matches nothing\n");
        assert_eq!(interpret_status(&module), Ok(WebResourceState::Absent));
    }

    #[test]
    fn test_query_unrecognized_output() {
        let out = CommandOutput::with_status(2, "", "a2query: unknown option\n");
        assert_eq!(
            interpret_status(&out),
            Err(String::from("a2query: unknown option"))
        );
    }

    #[test]
    fn test_status_command_flags() {
        assert_eq!(
            status_command("default-ssl", WebResourceType::Site).args,
            vec!["-s", "default-ssl"]
        );
        assert_eq!(
            status_command("wsgi", WebResourceType::Module).args,
            vec!["-m", "wsgi"]
        );
        assert_eq!(
            status_command("000-default.conf", WebResourceType::Site).args,
            vec!["-s", "000-default"]
        );
    }
}
