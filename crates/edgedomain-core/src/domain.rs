//! Website domain lifecycle
//!
//! [`WebsiteDomain`] is the entry point for the four lifecycle intents plus
//! the version lookup. It wires one [`CloudServices`] bundle and one
//! validated [`WebsiteDomainConfig`] into the zone resolver, the record
//! reconciler and the edge function manager.
//!
//! ## Flow
//!
//! ```text
//! create-domain:        stack output ─> zone ─> exists? ─(no)─> UPSERT batch
//! remove-domain:        stack output ─> zone ─────────────────> DELETE batch
//! create-edge-function: role ─> policy ─> delay ─> function ─> publish
//! remove-edge-function: function ─> role
//! ```
//!
//! The domain intents and the edge intents share no state; each invocation
//! reads everything it needs from the provider again.

use tracing::{debug, info};

use crate::config::WebsiteDomainConfig;
use crate::edge::{CreateOutcome, EdgeFunctionManager, RemoveOutcome};
use crate::error::{Error, Result};
use crate::handler::HandlerSettings;
use crate::package::FunctionPackage;
use crate::records::{DomainRecordSet, RecordReconciler};
use crate::retry::BackoffRetrier;
use crate::traits::{ChangeAction, CloudServices};
use crate::zone::ZoneResolver;

/// Code the stack service answers with when the stack is not deployed
const MISSING_STACK_CODE: &str = "ValidationError";

/// Result of a create-domain run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainOutcome {
    /// The alias records were submitted
    Created,
    /// Every alias record was already present; nothing was submitted
    AlreadyPresent,
}

/// Lifecycle operations for one configured website domain
pub struct WebsiteDomain {
    config: WebsiteDomainConfig,
    services: CloudServices,
    retrier: BackoffRetrier,
    zones: ZoneResolver,
    records: RecordReconciler,
    edge: EdgeFunctionManager,
}

impl WebsiteDomain {
    /// Validate `config` and wire it to `services`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] before any provider call if the
    /// configuration is invalid.
    pub fn new(config: WebsiteDomainConfig, services: CloudServices) -> Result<Self> {
        config.validate()?;

        let retrier = BackoffRetrier::new(config.retry.clone());
        let zones = ZoneResolver::new(services.zones.clone(), retrier.clone());
        let records = RecordReconciler::new(services.zones.clone(), retrier.clone());
        let edge = EdgeFunctionManager::new(
            services.roles.clone(),
            services.functions.clone(),
            retrier.clone(),
            config.edge_function_name(),
        )
        .with_description(format!("Edge request handler for {}", config.domain));

        Ok(Self {
            config,
            services,
            retrier,
            zones,
            records,
            edge,
        })
    }

    pub fn config(&self) -> &WebsiteDomainConfig {
        &self.config
    }

    /// The alias records this domain is served through
    pub fn record_set(&self) -> DomainRecordSet {
        DomainRecordSet::new(self.config.domain.clone(), self.config.secondary_domain())
    }

    /// Domain name of the distribution, read from the deployed stack
    pub async fn distribution_domain_name(&self) -> Result<String> {
        let stack_name = &self.config.stack_name;
        let key = &self.config.distribution_output_key;
        let not_found = || Error::DistributionNotFound {
            stack_name: stack_name.clone(),
            output_key: key.clone(),
        };

        let outputs = match self
            .retrier
            .execute("describe stack outputs", || {
                self.services.stacks.describe_outputs(stack_name)
            })
            .await
        {
            Ok(outputs) => outputs,
            Err(e) if e.is_not_found() || e.code.as_deref() == Some(MISSING_STACK_CODE) => {
                debug!("Stack {} is not deployed: {}", stack_name, e);
                return Err(not_found());
            }
            Err(e) => return Err(Error::provider("describe stack", stack_name, e)),
        };

        outputs
            .into_iter()
            .find(|output| &output.key == key)
            .map(|output| output.value)
            .ok_or_else(not_found)
    }

    /// Point the domain (and its secondary) at the distribution
    ///
    /// Skips the change entirely when every alias record is already present.
    pub async fn create_domain(&self) -> Result<DomainOutcome> {
        let alias_dns_name = self.distribution_domain_name().await?;
        debug!("Distribution domain name is {}", alias_dns_name);

        let zone_id = self.zones.resolve(&self.config.domain).await?;
        let set = self.record_set();

        if self.records.exists(&zone_id, &set).await? {
            info!("Domains already exist, skipping.");
            return Ok(DomainOutcome::AlreadyPresent);
        }

        self.records
            .reconcile(&zone_id, ChangeAction::Upsert, &set, &alias_dns_name)
            .await?;
        Ok(DomainOutcome::Created)
    }

    /// Remove the alias records; absent records are not an error
    pub async fn remove_domain(&self) -> Result<()> {
        let alias_dns_name = self.distribution_domain_name().await?;
        let zone_id = self.zones.resolve(&self.config.domain).await?;
        self.records
            .reconcile(&zone_id, ChangeAction::Delete, &self.record_set(), &alias_dns_name)
            .await
    }

    /// Render the handler package for the configured edge settings
    pub fn function_package(&self) -> Result<FunctionPackage> {
        let settings = HandlerSettings::from_edge_config(&self.config.edge)?;
        Ok(FunctionPackage::render(&settings))
    }

    /// Ensure the execution role and edge function exist
    pub async fn create_edge_function(&self) -> Result<CreateOutcome> {
        let package = self.function_package()?;
        debug!(
            "Packaged {} ({} bytes)",
            package.file_name(),
            package.code().len()
        );
        self.edge.create(&package).await
    }

    /// Remove the edge function, then its execution role
    pub async fn remove_edge_function(&self) -> Result<RemoveOutcome> {
        self.edge.remove().await
    }

    /// Identifier of the newest published edge function version
    pub async fn edge_function_version_arn(&self) -> Result<String> {
        info!("Finding edge function version to attach to the distribution...");
        self.edge.published_version_arn().await
    }

    /// Persist backend state, if the backend keeps any
    pub async fn flush(&self) -> Result<()> {
        self.services.flush().await
    }
}
