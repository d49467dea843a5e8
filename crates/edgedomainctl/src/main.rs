// # edgedomainctl - edgedomain command-line front end
//
// This is a THIN integration layer ONLY. DNS, retry and lifecycle logic
// lives in edgedomain-core; this binary:
// 1. Parses the command and configuration (flags with environment fallbacks)
// 2. Initializes logging and the runtime
// 3. Registers backends and builds the one named in the configuration
// 4. Runs exactly one lifecycle intent and flushes backend state
//
// ## Commands
//
// - `create-domain`: Point the domain's A/AAAA aliases at the distribution
// - `remove-domain`: Remove those aliases
// - `create-edge-function`: Create the execution role and edge function
// - `remove-edge-function`: Remove the edge function, then its role
// - `edge-function-version`: Print the newest published version identifier
//
// ## Configuration
//
// - `EDGEDOMAIN_DOMAIN`: Primary domain (e.g. www.example.com)
// - `EDGEDOMAIN_STACK_NAME`: Deployed stack holding the distribution
// - `EDGEDOMAIN_OUTPUT_KEY`: Stack output with the distribution domain name
// - `EDGEDOMAIN_REDIRECT_TO_WWW`: Also alias the domain without "www."
// - `EDGEDOMAIN_SECONDARY_DOMAIN`: Explicit secondary domain
// - `EDGEDOMAIN_REDIRECT_FROM` / `EDGEDOMAIN_REDIRECT_TO`: Edge redirect rule
// - `EDGEDOMAIN_BASIC_AUTH`: Edge basic-auth credentials, "user/pass"
// - `EDGEDOMAIN_BACKEND`: Backend type (memory, file, or a registered name)
// - `EDGEDOMAIN_STATE_FILE`: Snapshot path for the file backend
// - `EDGEDOMAIN_LOG_LEVEL`: trace, debug, info, warn or error
//
// ## Example
//
// ```bash
// export EDGEDOMAIN_DOMAIN=www.example.com
// export EDGEDOMAIN_STACK_NAME=site-prod
// export EDGEDOMAIN_OUTPUT_KEY=CloudFrontDomainName
// export EDGEDOMAIN_BACKEND=file
// export EDGEDOMAIN_STATE_FILE=/var/lib/edgedomain/cloud.json
//
// edgedomainctl create-domain
// ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edgedomain_core::config::{BackendConfig, EdgeConfig, RedirectRule};
use edgedomain_core::{BackendRegistry, DomainOutcome, WebsiteDomain, WebsiteDomainConfig};
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: The intent completed
/// - 1: Configuration error, reported before any provider call
/// - 2: Runtime error (provider failure, conflict, missing resource)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CtlExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<CtlExitCode> for ExitCode {
    fn from(code: CtlExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Parser)]
#[command(name = "edgedomainctl", version, about = "Attach a custom domain and edge handler to a deployed distribution")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Primary domain, e.g. www.example.com
    #[arg(long, env = "EDGEDOMAIN_DOMAIN", global = true)]
    domain: Option<String>,

    /// Name of the deployed stack
    #[arg(long, env = "EDGEDOMAIN_STACK_NAME", global = true)]
    stack_name: Option<String>,

    /// Stack output key holding the distribution domain name
    #[arg(long, env = "EDGEDOMAIN_OUTPUT_KEY", global = true)]
    output_key: Option<String>,

    /// Also alias the domain with its leading "www." removed
    #[arg(long, env = "EDGEDOMAIN_REDIRECT_TO_WWW", global = true)]
    redirect_to_www: bool,

    /// Explicit secondary domain
    #[arg(long, env = "EDGEDOMAIN_SECONDARY_DOMAIN", global = true)]
    secondary_domain: Option<String>,

    /// Host the edge handler redirects from
    #[arg(long, env = "EDGEDOMAIN_REDIRECT_FROM", global = true)]
    redirect_from: Option<String>,

    /// Location the edge handler redirects to
    #[arg(long, env = "EDGEDOMAIN_REDIRECT_TO", global = true)]
    redirect_to: Option<String>,

    /// Basic-auth credentials enforced at the edge, "user/pass"
    #[arg(long, env = "EDGEDOMAIN_BASIC_AUTH", hide_env_values = true, global = true)]
    basic_auth: Option<String>,

    /// Backend type
    #[arg(long, env = "EDGEDOMAIN_BACKEND", default_value = "memory", global = true)]
    backend: String,

    /// Snapshot file for the file backend
    #[arg(long, env = "EDGEDOMAIN_STATE_FILE", global = true)]
    state_file: Option<String>,

    /// Log level
    #[arg(long, env = "EDGEDOMAIN_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Command {
    /// Create the alias records for the domain
    CreateDomain,
    /// Remove the alias records for the domain
    RemoveDomain,
    /// Create the execution role and edge function
    CreateEdgeFunction,
    /// Remove the edge function and its execution role
    RemoveEdgeFunction,
    /// Print the newest published edge function version
    EdgeFunctionVersion,
}

impl Cli {
    /// Build and validate the library configuration
    fn to_config(&self) -> Result<WebsiteDomainConfig> {
        let domain = required(&self.domain, "--domain / EDGEDOMAIN_DOMAIN")?;
        let stack_name = required(&self.stack_name, "--stack-name / EDGEDOMAIN_STACK_NAME")?;
        let output_key = required(&self.output_key, "--output-key / EDGEDOMAIN_OUTPUT_KEY")?;

        let redirect = match (&self.redirect_from, &self.redirect_to) {
            (Some(from), Some(to)) => Some(RedirectRule::new(from.clone(), to.clone())),
            (None, None) => None,
            _ => anyhow::bail!(
                "EDGEDOMAIN_REDIRECT_FROM and EDGEDOMAIN_REDIRECT_TO must be set together"
            ),
        };

        let backend = match self.backend.as_str() {
            "memory" => BackendConfig::Memory,
            "file" => BackendConfig::File {
                path: required(&self.state_file, "--state-file / EDGEDOMAIN_STATE_FILE")?,
            },
            other => BackendConfig::Custom {
                factory: other.to_string(),
                config: Default::default(),
            },
        };

        let mut config = WebsiteDomainConfig::new(domain, stack_name, output_key)
            .with_redirect_to_www(self.redirect_to_www)
            .with_edge(EdgeConfig {
                redirect,
                basic_auth_credentials: self.basic_auth.clone(),
            });
        if let Some(secondary) = &self.secondary_domain {
            config = config.with_secondary_domain(secondary.clone());
        }
        config.backend = backend;

        config.validate()?;
        Ok(config)
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn required(value: &Option<String>, name: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => anyhow::bail!("{} is required", name),
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                CtlExitCode::ConfigError.into()
            } else {
                CtlExitCode::Success.into()
            };
        }
    };

    let config = match cli.to_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return CtlExitCode::ConfigError.into();
        }
    };

    // stdout is reserved for command output
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CtlExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CtlExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run(cli.command, config).await {
            Ok(()) => CtlExitCode::Success,
            Err(e) => {
                error!("{:#}", e);
                exit_code_for(&e)
            }
        }
    })
    .into()
}

fn exit_code_for(err: &anyhow::Error) -> CtlExitCode {
    match err.downcast_ref::<edgedomain_core::Error>() {
        Some(e) if e.is_config() => CtlExitCode::ConfigError,
        _ => CtlExitCode::RuntimeError,
    }
}

fn registry() -> BackendRegistry {
    let registry = BackendRegistry::new();

    #[cfg(feature = "sim")]
    edgedomain_sim::register(&registry);

    registry
}

async fn run(command: Command, config: WebsiteDomainConfig) -> Result<()> {
    info!("edgedomain initialising ({} backend)...", config.backend.type_name());

    let services = registry().create_backend(&config.backend).await?;
    let domain = WebsiteDomain::new(config, services)?;

    let result = execute(command, &domain).await;

    // Partial progress is persisted even when the intent failed
    let flushed = domain
        .flush()
        .await
        .context("Failed to persist backend state");

    result?;
    flushed
}

async fn execute(command: Command, domain: &WebsiteDomain) -> Result<()> {
    match command {
        Command::CreateDomain => match domain.create_domain().await? {
            DomainOutcome::Created => info!("Domain {} created", domain.config().domain),
            DomainOutcome::AlreadyPresent => {
                info!("Domain {} already in place", domain.config().domain)
            }
        },
        Command::RemoveDomain => domain.remove_domain().await?,
        Command::CreateEdgeFunction => {
            let outcome = domain.create_edge_function().await?;
            if let Some(version) = outcome.published_version {
                println!("{}", version.arn);
            }
        }
        Command::RemoveEdgeFunction => {
            let outcome = domain.remove_edge_function().await?;
            if !outcome.role_deleted && outcome.function_deleted {
                info!("Edge function removed; its role was left in place");
            }
        }
        Command::EdgeFunctionVersion => {
            println!("{}", domain.edge_function_version_arn().await?);
        }
    }
    Ok(())
}
