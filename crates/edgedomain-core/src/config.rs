//! Configuration types for the edgedomain system
//!
//! This module defines all configuration structures used throughout the crate.
//! Loading (flags, environment) is the caller's job; everything here is plain
//! serde data plus validation that runs before any provider call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// Main configuration for one website domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteDomainConfig {
    /// Primary domain the distribution answers to (e.g. "www.example.com")
    pub domain: String,

    /// Name of the deployed stack; also prefixes the edge resource names
    pub stack_name: String,

    /// Stack output key holding the distribution's domain name
    pub distribution_output_key: String,

    /// Also alias the bare domain (primary with its leading "www." removed)
    #[serde(default)]
    pub redirect_to_www: bool,

    /// Explicit secondary domain; takes precedence over `redirect_to_www`
    #[serde(default)]
    pub secondary_domain: Option<String>,

    /// Edge function settings
    #[serde(default)]
    pub edge: EdgeConfig,

    /// Backoff and propagation timing
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Which backend provides the cloud services
    #[serde(default)]
    pub backend: BackendConfig,
}

impl WebsiteDomainConfig {
    /// Create a configuration with defaults for every optional field
    pub fn new(
        domain: impl Into<String>,
        stack_name: impl Into<String>,
        distribution_output_key: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            stack_name: stack_name.into(),
            distribution_output_key: distribution_output_key.into(),
            redirect_to_www: false,
            secondary_domain: None,
            edge: EdgeConfig::default(),
            retry: RetryPolicy::default(),
            backend: BackendConfig::default(),
        }
    }

    /// Set an explicit secondary domain
    pub fn with_secondary_domain(mut self, secondary: impl Into<String>) -> Self {
        self.secondary_domain = Some(secondary.into());
        self
    }

    /// Alias the www-stripped domain as well
    pub fn with_redirect_to_www(mut self, enabled: bool) -> Self {
        self.redirect_to_www = enabled;
        self
    }

    /// Replace the edge function settings
    pub fn with_edge(mut self, edge: EdgeConfig) -> Self {
        self.edge = edge;
        self
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(Error::config("domain is required"));
        }
        if self.stack_name.trim().is_empty() {
            return Err(Error::config("stack name is required"));
        }
        if self.distribution_output_key.trim().is_empty() {
            return Err(Error::config("distribution output key is required"));
        }

        if let Some(secondary) = &self.secondary_domain {
            if secondary.trim().is_empty() {
                return Err(Error::config("secondary domain cannot be empty"));
            }
        } else if self.redirect_to_www && !self.domain.starts_with("www.") {
            return Err(Error::config(format!(
                "redirect_to_www requires a domain starting with \"www.\", got \"{}\"",
                self.domain
            )));
        }

        if let Some(secondary) = self.secondary_domain() {
            if secondary.eq_ignore_ascii_case(&self.domain) {
                return Err(Error::config(format!(
                    "secondary domain must differ from the primary domain \"{}\"",
                    self.domain
                )));
            }
        }

        self.edge.validate()?;
        self.retry.validate()?;
        self.backend.validate()?;

        Ok(())
    }

    /// The secondary domain to alias alongside the primary, if any
    pub fn secondary_domain(&self) -> Option<String> {
        if let Some(secondary) = &self.secondary_domain {
            return Some(secondary.clone());
        }
        if self.redirect_to_www {
            return self.domain.strip_prefix("www.").map(str::to_string);
        }
        None
    }

    /// Name shared by the edge function and its execution role
    pub fn edge_function_name(&self) -> String {
        format!("{}-redirect", self.stack_name)
    }
}

/// Edge function settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeConfig {
    /// Host-based redirect performed at the edge
    #[serde(default)]
    pub redirect: Option<RedirectRule>,

    /// Basic-auth credentials as a single "user/pass" string
    #[serde(default)]
    pub basic_auth_credentials: Option<String>,
}

impl EdgeConfig {
    /// Validate the edge settings
    pub fn validate(&self) -> Result<()> {
        if let Some(rule) = &self.redirect {
            rule.validate()?;
        }
        self.basic_auth()?;
        Ok(())
    }

    /// Parsed basic-auth credentials, if configured
    pub fn basic_auth(&self) -> Result<Option<BasicAuthCredentials>> {
        self.basic_auth_credentials
            .as_deref()
            .map(BasicAuthCredentials::parse)
            .transpose()
    }
}

/// Redirect requests for one hostname to a fixed location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectRule {
    /// Hostname to match exactly (e.g. "example.com")
    pub from: String,
    /// Location to redirect to (e.g. "https://www.example.com")
    pub to: String,
}

impl RedirectRule {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.from.trim().is_empty() {
            return Err(Error::config("redirect \"from\" cannot be empty"));
        }
        if self.to.trim().is_empty() {
            return Err(Error::config("redirect \"to\" cannot be empty"));
        }
        Ok(())
    }
}

/// Basic-auth username and password
///
/// The Debug implementation does NOT expose the password.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuthCredentials {
    pub username: String,
    pub password: String,
}

impl BasicAuthCredentials {
    /// Parse a "user/pass" string
    ///
    /// Exactly one `/` separator is required and neither half may be empty.
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split('/').collect();
        if parts.len() != 2 {
            return Err(Error::config(
                "basic auth credentials must be in the form \"username/password\" \
                 with exactly one \"/\"",
            ));
        }
        if parts[0].is_empty() || parts[1].is_empty() {
            return Err(Error::config(
                "basic auth username and password cannot be empty",
            ));
        }
        Ok(Self {
            username: parts[0].to_string(),
            password: parts[1].to_string(),
        })
    }
}

impl fmt::Debug for BasicAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthCredentials")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// Backoff and propagation timing
///
/// Passed explicitly to the retrier and the lifecycle manager so tests can
/// shrink every wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total time a single call may spend waiting between retries
    #[serde(default = "default_time_budget_secs")]
    pub time_budget_secs: u64,

    /// Lower bound of one backoff wait
    #[serde(default = "default_min_wait_secs")]
    pub min_wait_secs: u64,

    /// Upper bound of one backoff wait
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,

    /// Fixed wait after attaching the policy to a freshly created role
    #[serde(default = "default_role_propagation_delay_secs")]
    pub role_propagation_delay_secs: u64,
}

impl RetryPolicy {
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }

    pub fn min_wait(&self) -> Duration {
        Duration::from_secs(self.min_wait_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn role_propagation_delay(&self) -> Duration {
        Duration::from_secs(self.role_propagation_delay_secs)
    }

    /// Validate the policy bounds
    pub fn validate(&self) -> Result<()> {
        if self.min_wait_secs > self.max_wait_secs {
            return Err(Error::config(format!(
                "minimum retry wait ({}s) exceeds maximum retry wait ({}s)",
                self.min_wait_secs, self.max_wait_secs
            )));
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            time_budget_secs: default_time_budget_secs(),
            min_wait_secs: default_min_wait_secs(),
            max_wait_secs: default_max_wait_secs(),
            role_propagation_delay_secs: default_role_propagation_delay_secs(),
        }
    }
}

fn default_time_budget_secs() -> u64 {
    300
}

fn default_min_wait_secs() -> u64 {
    3
}

fn default_max_wait_secs() -> u64 {
    60
}

fn default_role_propagation_delay_secs() -> u64 {
    15
}

/// Backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Simulated cloud held in memory for the lifetime of the process
    #[default]
    Memory,

    /// Simulated cloud persisted to a JSON snapshot file
    File {
        /// Path to the snapshot file
        path: String,
    },

    /// Backend registered by an embedding application
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl BackendConfig {
    /// Validate the backend configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            BackendConfig::Memory => Ok(()),
            BackendConfig::File { path } => {
                if path.is_empty() {
                    return Err(Error::config("file backend path cannot be empty"));
                }
                Ok(())
            }
            BackendConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(Error::config("custom backend factory cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the backend type name
    pub fn type_name(&self) -> &str {
        match self {
            BackendConfig::Memory => "memory",
            BackendConfig::File { .. } => "file",
            BackendConfig::Custom { factory, .. } => factory,
        }
    }
}
