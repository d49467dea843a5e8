//! Alias record reconciliation
//!
//! A domain is served through A and AAAA alias records pointing at the
//! distribution. When a secondary domain is configured it gets the same
//! pair, so a record set always holds 2 or 4 entries and never one half of
//! a pair.
//!
//! ## Flow
//!
//! 1. [`RecordReconciler::exists`] reports whether every entry is already
//!    present; a partial match counts as absent
//! 2. [`RecordReconciler::reconcile`] submits all entries as one atomic
//!    change batch through the retrier
//! 3. A DELETE that fails because the records are already gone is success

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::retry::BackoffRetrier;
use crate::traits::{
    AliasTarget, ChangeAction, ChangeBatch, HostedZoneService, RecordChange, RecordType,
    ResourceRecord,
};

/// Hosted zone that owns every distribution alias target
pub const DISTRIBUTION_ALIAS_ZONE_ID: &str = "Z2FDTNDATAQYW2";

/// Comment stored with every change batch
const CHANGE_COMMENT: &str = "Record managed by edgedomain";

/// One `(type, name)` entry of a record set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEntry {
    pub record_type: RecordType,
    pub name: String,
}

/// The alias records that make a domain (and its secondary) resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRecordSet {
    domain: String,
    secondary: Option<String>,
    entries: Vec<RecordEntry>,
}

impl DomainRecordSet {
    /// Build the A/AAAA pairs for `domain` and, if given, `secondary`
    pub fn new(domain: impl Into<String>, secondary: Option<String>) -> Self {
        let domain = domain.into();
        let mut entries = Vec::with_capacity(4);
        for name in std::iter::once(&domain).chain(secondary.iter()) {
            for record_type in [RecordType::A, RecordType::Aaaa] {
                entries.push(RecordEntry {
                    record_type,
                    name: name.clone(),
                });
            }
        }
        Self {
            domain,
            secondary,
            entries,
        }
    }

    /// Primary domain
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Secondary domain, if any
    pub fn secondary(&self) -> Option<&str> {
        self.secondary.as_deref()
    }

    /// Entries in submission order
    pub fn entries(&self) -> &[RecordEntry] {
        &self.entries
    }

    /// Number of entries (2 or 4)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `records` contain every entry of this set
    ///
    /// Counts A/AAAA records whose name equals one of this set's names with
    /// a trailing dot appended; only an exact count means the set is in
    /// place.
    pub fn is_present_in(&self, records: &[ResourceRecord]) -> bool {
        let names: Vec<String> = std::iter::once(&self.domain)
            .chain(self.secondary.iter())
            .map(|name| fqdn(name))
            .collect();

        let matches = records
            .iter()
            .filter(|record| RecordType::parse(&record.record_type).is_some())
            .filter(|record| names.iter().any(|name| *name == record.name))
            .count();

        debug!(
            "Found {} of {} alias records for {}",
            matches,
            self.len(),
            self.domain
        );
        matches == self.len()
    }

    /// Map every entry to a change against `alias_dns_name`
    pub fn to_change_batch(&self, action: ChangeAction, alias_dns_name: &str) -> ChangeBatch {
        let alias_target = AliasTarget {
            dns_name: alias_dns_name.to_string(),
            hosted_zone_id: DISTRIBUTION_ALIAS_ZONE_ID.to_string(),
            evaluate_target_health: false,
        };

        ChangeBatch {
            comment: CHANGE_COMMENT.to_string(),
            changes: self
                .entries
                .iter()
                .map(|entry| RecordChange {
                    action,
                    name: entry.name.clone(),
                    record_type: entry.record_type,
                    alias_target: alias_target.clone(),
                })
                .collect(),
        }
    }
}

fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    }
}

/// Inspects and applies alias record sets in one zone
#[derive(Clone)]
pub struct RecordReconciler {
    zones: Arc<dyn HostedZoneService>,
    retrier: BackoffRetrier,
}

impl RecordReconciler {
    pub fn new(zones: Arc<dyn HostedZoneService>, retrier: BackoffRetrier) -> Self {
        Self { zones, retrier }
    }

    /// Whether the whole record set is already present in the zone
    pub async fn exists(&self, zone_id: &str, set: &DomainRecordSet) -> Result<bool> {
        match self
            .retrier
            .execute("list record sets", || self.zones.list_record_sets(zone_id))
            .await
        {
            Ok(records) => Ok(set.is_present_in(&records)),
            Err(e) if e.is_not_found() => {
                debug!("Zone {} reported no records: {}", zone_id, e);
                Ok(false)
            }
            Err(e) => Err(Error::provider("inspect alias records for", set.domain(), e)),
        }
    }

    /// Apply `action` to every entry of the set as one batch
    ///
    /// # Errors
    ///
    /// - DELETE: only errors other than "not found" are returned
    /// - UPSERT: every error is returned, naming the domain
    pub async fn reconcile(
        &self,
        zone_id: &str,
        action: ChangeAction,
        set: &DomainRecordSet,
        alias_dns_name: &str,
    ) -> Result<()> {
        info!(
            "Attempting to {} domain {}...",
            action.verb(),
            set.domain()
        );

        let batch = set.to_change_batch(action, alias_dns_name);
        let result = self
            .retrier
            .execute("change record sets", || {
                self.zones.change_record_sets(zone_id, &batch)
            })
            .await;

        match result {
            Ok(()) => {
                info!("Domain has successfully been {}d.", action.verb());
                Ok(())
            }
            Err(e) if action == ChangeAction::Delete && e.is_not_found() => {
                info!("Domain {} doesn't exist, skipping...", set.domain());
                Ok(())
            }
            Err(e) => Err(Error::provider(
                format!("{} alias records for", action),
                set.domain(),
                e,
            )),
        }
    }
}
