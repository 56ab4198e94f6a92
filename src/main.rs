//! Reconcile CLI entrypoint.
//!
//! This is the main entrypoint for the reconcile command-line tool. The
//! result document goes to stdout; logs go to stderr.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use resource_reconciler::cli::{Cli, Commands, LogFormat, OutputFormatter, StatusEntry};
use resource_reconciler::config::{ConfigParser, ConfigValidator, ModuleParams, ToolConfig};
use resource_reconciler::error::{ReconcilerError, Result};
use resource_reconciler::exec::SystemRunner;
use resource_reconciler::lock::LockManager;
use resource_reconciler::reconciler::Reconciler;
use resource_reconciler::resource::{Resource, ResourceKind};

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format);

    // One resource per invocation, strictly sequential.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let formatter = OutputFormatter::new(cli.output);

    match runtime.block_on(run(&cli, &formatter)) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            debug!("Invocation failed: {e:?}");
            println!("{}", formatter.format_failure(&e));
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system on stderr.
fn init_logging(verbose: bool, format: LogFormat) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Main async entry point.
async fn run(cli: &Cli, formatter: &OutputFormatter) -> Result<String> {
    match &cli.command {
        Commands::Apply { params } => {
            let config = tool_config(cli, params.parent())?;
            let module = ConfigParser::new().load_file(params)?;
            cmd_reconcile(&module, &config, formatter).await
        }
        Commands::Validate { params } => cmd_validate(params, formatter),
        Commands::Status { kind, names } => {
            let config = tool_config(cli, None)?;
            cmd_status(*kind, names, &config, formatter).await
        }
        command => {
            let module = command.inline_params().ok_or_else(|| {
                ReconcilerError::internal("Command does not describe a resource")
            })?;
            let config = tool_config(cli, None)?;
            cmd_reconcile(&module, &config, formatter).await
        }
    }
}

/// Builds the tool settings from flags, `.env` and the environment.
fn tool_config(cli: &Cli, base_path: Option<&Path>) -> Result<ToolConfig> {
    let mut parser = ConfigParser::new();
    if let Some(dir) = base_path {
        parser = parser.with_base_path(dir);
    }
    parser.load_dotenv()?;

    let lock_dir = match (&cli.lock_dir, cli.lock) {
        (Some(dir), _) => Some(dir.clone()),
        (None, true) => Some(LockManager::default_dir().ok_or_else(|| {
            ReconcilerError::internal("Cannot determine a default lock directory, use --lock-dir")
        })?),
        (None, false) => None,
    };

    let mut config = ToolConfig {
        use_sudo: !cli.no_sudo,
        check_mode: cli.check,
        lock_dir,
    };
    ConfigParser::apply_env_overrides(&mut config);

    debug!("Tool configuration: {config:?}");
    Ok(config)
}

/// Reconciles one resource and formats the result.
async fn cmd_reconcile(
    params: &ModuleParams,
    config: &ToolConfig,
    formatter: &OutputFormatter,
) -> Result<String> {
    ConfigValidator::new().validate(params)?;

    let runner = SystemRunner::new(config.use_sudo);
    let locks = config.lock_dir.as_ref().map(LockManager::new);
    let reconciler = Reconciler::new(&runner)
        .with_check_mode(config.check_mode)
        .with_locks(locks);

    info!(
        "Reconciling {}{}",
        params.resource(),
        if config.check_mode { " (check mode)" } else { "" }
    );
    let result = reconciler.reconcile(params).await?;
    info!("Reconciliation finished: {result}");

    Ok(formatter.format_result(&result))
}

/// Validates a parameter file without running any command.
fn cmd_validate(path: &Path, formatter: &OutputFormatter) -> Result<String> {
    let params = ConfigParser::new().load_file(path)?;
    let validation = ConfigValidator::new().validate(&params)?;
    Ok(formatter.format_validation(&params, &validation))
}

/// Queries the observed state of each named resource.
async fn cmd_status(
    kind: ResourceKind,
    names: &[String],
    config: &ToolConfig,
    formatter: &OutputFormatter,
) -> Result<String> {
    let validator = ConfigValidator::new();
    for name in names {
        validator.validate_name(name)?;
    }

    let runner = SystemRunner::new(config.use_sudo);
    let reconciler = Reconciler::new(&runner);
    let locks = config.lock_dir.as_ref().map(LockManager::new);

    let mut entries = Vec::with_capacity(names.len());
    for name in names {
        let resource = Resource::new(name.as_str(), kind);

        let (state, available) = match reconciler.query_state(&resource).await {
            Ok(state) => (state.to_string(), true),
            Err(e) => (e.to_string(), false),
        };

        let locked_by = match &locks {
            Some(locks) => locks
                .inspect(&resource)
                .await?
                .filter(|lock| !lock.is_expired())
                .map(|lock| format!("{} ({}s left)", lock.holder, lock.remaining_secs())),
            None => None,
        };

        entries.push(StatusEntry {
            resource,
            state,
            available,
            locked_by,
        });
    }

    Ok(formatter.format_status(&entries))
}
