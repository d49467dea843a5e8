// # Hosted Zone Service
//
// Narrow capability interface over the provider's DNS service: list the
// hosted zones, list the records in one zone, and submit one atomic change
// batch to a zone.
//
// ## Implementations
//
// - Simulated backend: `edgedomain-sim` crate
// - Test doubles: `tests/common`
//
// Implementations perform exactly one remote operation per call. Retry,
// backoff and not-found absorption are owned by the core.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ProviderError;

/// An authoritative DNS zone as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedZone {
    /// Fully-qualified resource path, e.g. `/hostedzone/Z123ABC`
    pub id: String,
    /// Zone name, usually terminated by a trailing dot
    pub name: String,
}

impl HostedZone {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Address record types this system manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 alias
    A,
    /// IPv6 alias
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Parse a wire name, returning `None` for types this system ignores
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "A" => Some(RecordType::A),
            "AAAA" => Some(RecordType::Aaaa),
            _ => None,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of an alias record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTarget {
    /// DNS name of the aliased resource
    pub dns_name: String,
    /// Hosted zone that owns the aliased resource
    pub hosted_zone_id: String,
    /// Whether the provider should evaluate target health
    pub evaluate_target_health: bool,
}

/// A record currently stored in a zone
///
/// `record_type` is kept as the raw wire string because zones hold many
/// types (NS, SOA, CNAME, ...) that this system never touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Fully-qualified, dot-terminated record name
    pub name: String,
    /// Raw record type
    pub record_type: String,
    /// Alias target, when the record is an alias
    #[serde(default)]
    pub alias_target: Option<AliasTarget>,
}

/// Action applied by a change batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    /// Create the record, or replace it if it exists
    Upsert,
    /// Remove the record
    Delete,
}

impl ChangeAction {
    /// Wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Upsert => "UPSERT",
            ChangeAction::Delete => "DELETE",
        }
    }

    /// Verb used in log lines ("create" / "remove")
    pub fn verb(&self) -> &'static str {
        match self {
            ChangeAction::Upsert => "create",
            ChangeAction::Delete => "remove",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One alias change inside a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordChange {
    pub action: ChangeAction,
    pub name: String,
    pub record_type: RecordType,
    pub alias_target: AliasTarget,
}

/// Changes applied atomically to one zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    /// Free-form comment stored with the change
    pub comment: String,
    /// The changes, applied all-or-nothing
    pub changes: Vec<RecordChange>,
}

/// Trait for the provider's DNS zone service
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait HostedZoneService: Send + Sync {
    /// List every hosted zone visible to the caller
    ///
    /// Implementations must follow pagination and return the full list.
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>, ProviderError>;

    /// Submit a change batch to a zone as a single remote operation
    ///
    /// # Parameters
    ///
    /// - `zone_id`: Bare zone identifier (no `/hostedzone/` prefix)
    /// - `batch`: Changes applied all-or-nothing
    async fn change_record_sets(
        &self,
        zone_id: &str,
        batch: &ChangeBatch,
    ) -> Result<(), ProviderError>;

    /// List every record stored in a zone
    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<ResourceRecord>, ProviderError>;
}
