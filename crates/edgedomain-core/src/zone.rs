//! Zone resolution
//!
//! Finds the most specific hosted zone that owns a domain. Names are compared
//! label by label from the top-level label inward, so `example.com` owns
//! `www.example.com` but never `notexample.com`. Among all owning zones the
//! one with the longest name wins; ties keep the first zone encountered.
//!
//! Zones are fetched fresh on every resolution and never cached.

use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::retry::BackoffRetrier;
use crate::traits::{HostedZone, HostedZoneService};

/// Marker preceding the bare identifier in a zone resource path
const ZONE_ID_MARKER: &str = "e/";

/// Resolve the bare identifier of the zone owning `domain`
///
/// # Returns
///
/// - `Ok(String)`: Identifier of the most specific owning zone
/// - `Err(Error::ZoneNotFound)`: No zone owns the domain
pub fn resolve_zone_id(domain: &str, zones: &[HostedZone]) -> Result<String> {
    find_owning_zone(domain, zones)
        .map(|zone| extract_zone_id(&zone.id).to_string())
        .ok_or_else(|| Error::ZoneNotFound {
            domain: domain.to_string(),
        })
}

/// Find the most specific zone owning `domain`
pub fn find_owning_zone<'a>(domain: &str, zones: &'a [HostedZone]) -> Option<&'a HostedZone> {
    let domain_labels = reversed_labels(domain);
    let mut best: Option<&HostedZone> = None;

    for zone in zones {
        if !owns(&reversed_labels(&zone.name), &domain_labels) {
            continue;
        }
        debug!("Zone {} ({}) owns {}", zone.name, zone.id, domain);
        if best.is_none_or(|current| zone.name.len() > current.name.len()) {
            best = Some(zone);
        }
    }

    best
}

/// Bare identifier from a zone resource path
///
/// `/hostedzone/Z123` becomes `Z123`. An id without the marker is assumed to
/// be bare already.
pub fn extract_zone_id(resource_path: &str) -> &str {
    match resource_path.find(ZONE_ID_MARKER) {
        Some(pos) => &resource_path[pos + ZONE_ID_MARKER.len()..],
        None => resource_path,
    }
}

fn reversed_labels(name: &str) -> Vec<&str> {
    let name = name.strip_suffix('.').unwrap_or(name);
    name.split('.').rev().collect()
}

/// Whether the zone's label sequence is a prefix of the domain's
fn owns(zone_labels: &[&str], domain_labels: &[&str]) -> bool {
    zone_labels.len() <= domain_labels.len()
        && zone_labels
            .iter()
            .zip(domain_labels)
            .all(|(zone, domain)| zone.eq_ignore_ascii_case(domain))
}

/// Resolves owning zones against the live zone list
#[derive(Clone)]
pub struct ZoneResolver {
    zones: Arc<dyn HostedZoneService>,
    retrier: BackoffRetrier,
}

impl ZoneResolver {
    pub fn new(zones: Arc<dyn HostedZoneService>, retrier: BackoffRetrier) -> Self {
        Self { zones, retrier }
    }

    /// List the zones and resolve the one owning `domain`
    pub async fn resolve(&self, domain: &str) -> Result<String> {
        let zones = self
            .retrier
            .execute("list hosted zones", || self.zones.list_hosted_zones())
            .await
            .map_err(|e| Error::provider("list hosted zones for", domain, e))?;

        let zone_id = resolve_zone_id(domain, &zones)?;
        debug!("Resolved hosted zone {} for {}", zone_id, domain);
        Ok(zone_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones(names: &[(&str, &str)]) -> Vec<HostedZone> {
        names
            .iter()
            .map(|(id, name)| HostedZone::new(*id, *name))
            .collect()
    }

    #[test]
    fn most_specific_zone_wins() {
        let zones = zones(&[
            ("/hostedzone/ZAPEX", "example.com."),
            ("/hostedzone/ZWWW", "www.example.com."),
        ]);
        assert_eq!(resolve_zone_id("sub.www.example.com", &zones).unwrap(), "ZWWW");
        assert_eq!(resolve_zone_id("api.example.com", &zones).unwrap(), "ZAPEX");
        assert_eq!(resolve_zone_id("example.com", &zones).unwrap(), "ZAPEX");
    }

    #[test]
    fn order_of_zones_does_not_matter() {
        let zones = zones(&[
            ("/hostedzone/ZWWW", "www.example.com."),
            ("/hostedzone/ZAPEX", "example.com."),
        ]);
        assert_eq!(resolve_zone_id("sub.www.example.com", &zones).unwrap(), "ZWWW");
    }

    #[test]
    fn suffix_must_be_label_aligned() {
        let zones = zones(&[("/hostedzone/ZEX", "example.com.")]);
        let err = resolve_zone_id("notexample.com", &zones).unwrap_err();
        assert!(matches!(err, Error::ZoneNotFound { ref domain } if domain == "notexample.com"));
    }

    #[test]
    fn zone_longer_than_domain_never_matches() {
        let zones = zones(&[("/hostedzone/ZWWW", "www.example.com.")]);
        assert!(resolve_zone_id("example.com", &zones).is_err());
    }

    #[test]
    fn trailing_dots_are_optional() {
        let zones = zones(&[("/hostedzone/ZEX", "example.com")]);
        assert_eq!(resolve_zone_id("www.example.com.", &zones).unwrap(), "ZEX");
    }

    #[test]
    fn empty_zone_list_is_not_found() {
        assert!(matches!(
            resolve_zone_id("example.com", &[]),
            Err(Error::ZoneNotFound { .. })
        ));
    }

    #[test]
    fn equal_length_ties_keep_first() {
        let zones = zones(&[
            ("/hostedzone/ZFIRST", "example.com."),
            ("/hostedzone/ZSECOND", "example.com."),
        ]);
        assert_eq!(resolve_zone_id("www.example.com", &zones).unwrap(), "ZFIRST");
    }

    #[test]
    fn zone_id_is_taken_after_marker() {
        assert_eq!(extract_zone_id("/hostedzone/Z08994122JHUO1LNKW3WZ"), "Z08994122JHUO1LNKW3WZ");
        assert_eq!(extract_zone_id("Z123"), "Z123");
    }
}
