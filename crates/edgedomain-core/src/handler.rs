//! Edge request decision
//!
//! The packaged handler runs in the edge runtime, not in this process. This
//! module holds the same decision in Rust so the settings baked into a
//! package can be checked without deploying it: given the viewer's host and
//! `Authorization` header, decide between a redirect, a basic-auth challenge
//! or passing the request through to the origin.
//!
//! The redirect rule is evaluated first, so a redirected host is never
//! challenged for credentials.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;

use crate::config::EdgeConfig;
use crate::error::Result;

/// Values substituted into the packaged handler
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HandlerSettings {
    pub redirect_enabled: bool,
    pub redirect_from: String,
    pub redirect_to: String,
    pub basic_auth_enabled: bool,
    pub basic_auth_username: String,
    pub basic_auth_password: String,
}

impl HandlerSettings {
    /// Derive handler settings from the edge configuration
    ///
    /// Disabled features keep empty strings so the rendered handler always
    /// has every value defined.
    pub fn from_edge_config(edge: &EdgeConfig) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(rule) = &edge.redirect {
            settings.redirect_enabled = true;
            settings.redirect_from = rule.from.clone();
            settings.redirect_to = rule.to.clone();
        }

        if let Some(creds) = edge.basic_auth()? {
            settings.basic_auth_enabled = true;
            settings.basic_auth_username = creds.username;
            settings.basic_auth_password = creds.password;
        }

        Ok(settings)
    }

    /// The exact `Authorization` header value that unlocks the site
    pub fn expected_authorization(&self) -> Option<String> {
        if !self.basic_auth_enabled {
            return None;
        }
        let token = STANDARD.encode(format!(
            "{}:{}",
            self.basic_auth_username, self.basic_auth_password
        ));
        Some(format!("Basic {}", token))
    }
}

impl fmt::Debug for HandlerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSettings")
            .field("redirect_enabled", &self.redirect_enabled)
            .field("redirect_from", &self.redirect_from)
            .field("redirect_to", &self.redirect_to)
            .field("basic_auth_enabled", &self.basic_auth_enabled)
            .field("basic_auth_username", &self.basic_auth_username)
            .field("basic_auth_password", &"<REDACTED>")
            .finish()
    }
}

/// The parts of a viewer request the handler looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRequest {
    pub host: String,
    pub authorization: Option<String>,
}

impl EdgeRequest {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            authorization: None,
        }
    }

    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }
}

/// Outcome of evaluating a viewer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeDecision {
    /// 302 to `location`
    Redirect { location: String },
    /// 401 with a `WWW-Authenticate: Basic` challenge
    Unauthorized,
    /// Forward the request to the origin unchanged
    PassThrough,
}

impl EdgeDecision {
    /// HTTP status the edge answers with, `None` when the origin answers
    pub fn status(&self) -> Option<u16> {
        match self {
            EdgeDecision::Redirect { .. } => Some(302),
            EdgeDecision::Unauthorized => Some(401),
            EdgeDecision::PassThrough => None,
        }
    }
}

/// Decide what the edge does with `request`
pub fn evaluate(settings: &HandlerSettings, request: &EdgeRequest) -> EdgeDecision {
    if settings.redirect_enabled && request.host == settings.redirect_from {
        return EdgeDecision::Redirect {
            location: settings.redirect_to.clone(),
        };
    }

    if let Some(expected) = settings.expected_authorization() {
        if request.authorization.as_deref() != Some(expected.as_str()) {
            return EdgeDecision::Unauthorized;
        }
    }

    EdgeDecision::PassThrough
}
