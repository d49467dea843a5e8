//! Test doubles and common utilities for lifecycle contract tests
//!
//! [`MockCloud`] implements every capability trait over a small in-memory
//! model, counts calls per operation and can be scripted to fail specific
//! operations. Tests share it through an `Arc` and inspect it afterwards.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use edgedomain_core::config::{RetryPolicy, WebsiteDomainConfig};
use edgedomain_core::edge::EXECUTION_POLICY_ARN;
use edgedomain_core::error::ProviderError;
use edgedomain_core::traits::{
    ChangeAction, ChangeBatch, CloudServices, CreateFunctionRequest, EdgeFunction,
    FunctionService, FunctionVersion, HostedZone, HostedZoneService, ResourceRecord, Role,
    RoleService, StackOutput, StackOutputs, LATEST_VERSION,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

pub const DISTRIBUTION_DOMAIN: &str = "d111111abcdef8.cloudfront.net";
pub const OUTPUT_KEY: &str = "CloudFrontDomainName";
pub const STACK_NAME: &str = "site-prod";
pub const ZONE_ID: &str = "ZEXAMPLE";

#[derive(Default)]
struct MockState {
    zones: Vec<HostedZone>,
    records: HashMap<String, Vec<ResourceRecord>>,
    roles: HashMap<String, Role>,
    attached: HashSet<(String, String)>,
    functions: HashMap<String, EdgeFunction>,
    versions: HashMap<String, u64>,
    replicated: HashSet<String>,
    outputs: Vec<StackOutput>,
    batches: Vec<ChangeBatch>,
}

/// In-memory cloud that records every call
#[derive(Default)]
pub struct MockCloud {
    state: Mutex<MockState>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failures: Mutex<HashMap<&'static str, VecDeque<ProviderError>>>,
    permanent: Mutex<HashMap<&'static str, ProviderError>>,
}

impl MockCloud {
    /// A cloud with one zone for example.com and the distribution output set
    pub fn new() -> Arc<Self> {
        let cloud = Self::default();
        {
            let mut state = cloud.state.lock().unwrap();
            state
                .zones
                .push(HostedZone::new(format!("/hostedzone/{}", ZONE_ID), "example.com."));
            state.records.insert(
                ZONE_ID.to_string(),
                vec![ResourceRecord {
                    name: "example.com.".to_string(),
                    record_type: "NS".to_string(),
                    alias_target: None,
                }],
            );
            state.outputs.push(StackOutput {
                key: OUTPUT_KEY.to_string(),
                value: DISTRIBUTION_DOMAIN.to_string(),
            });
        }
        Arc::new(cloud)
    }

    /// Bundle this cloud as the four capability services
    pub fn services(self: &Arc<Self>) -> CloudServices {
        CloudServices::new(self.clone(), self.clone(), self.clone(), self.clone())
    }

    /// Number of calls made to `operation`
    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().get(operation).copied().unwrap_or(0)
    }

    /// Fail the next call to `operation` with `error`; queues in order
    pub fn fail_next(&self, operation: &'static str, error: ProviderError) {
        self.failures
            .lock()
            .unwrap()
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Fail every call to `operation` with `error`
    pub fn fail_always(&self, operation: &'static str, error: ProviderError) {
        self.permanent.lock().unwrap().insert(operation, error);
    }

    pub fn remove_outputs(&self) {
        self.state.lock().unwrap().outputs.clear();
    }

    pub fn set_zones(&self, zones: Vec<HostedZone>) {
        self.state.lock().unwrap().zones = zones;
    }

    pub fn add_record(&self, name: &str, record_type: &str) {
        self.state
            .lock()
            .unwrap()
            .records
            .entry(ZONE_ID.to_string())
            .or_default()
            .push(ResourceRecord {
                name: name.to_string(),
                record_type: record_type.to_string(),
                alias_target: None,
            });
    }

    /// A/AAAA records currently stored in the zone, as `(name, type)`
    pub fn alias_records(&self) -> Vec<(String, String)> {
        let state = self.state.lock().unwrap();
        let mut out: Vec<_> = state
            .records
            .get(ZONE_ID)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.record_type == "A" || r.record_type == "AAAA")
                    .map(|r| (r.name.clone(), r.record_type.clone()))
                    .collect()
            })
            .unwrap_or_default();
        out.sort();
        out
    }

    /// Every batch accepted or rejected, in submission order
    pub fn batches(&self) -> Vec<ChangeBatch> {
        self.state.lock().unwrap().batches.clone()
    }

    pub fn seed_role(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.roles.insert(name.to_string(), role(name));
        state
            .attached
            .insert((name.to_string(), EXECUTION_POLICY_ARN.to_string()));
    }

    /// A role left behind by a run that failed before attaching the policy
    pub fn seed_bare_role(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .roles
            .insert(name.to_string(), role(name));
    }

    pub fn has_policy(&self, name: &str, policy_arn: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .attached
            .contains(&(name.to_string(), policy_arn.to_string()))
    }

    pub fn seed_function(&self, name: &str, published: u64) {
        let mut state = self.state.lock().unwrap();
        state.functions.insert(
            name.to_string(),
            EdgeFunction {
                name: name.to_string(),
                arn: function_arn(name),
                role_arn: format!("arn:aws:iam::123456789012:role/{}", name),
                runtime: "nodejs20.x".to_string(),
                handler: "handler.main".to_string(),
                description: String::new(),
            },
        );
        state.versions.insert(name.to_string(), published);
    }

    pub fn mark_replicated(&self, name: &str) {
        self.state.lock().unwrap().replicated.insert(name.to_string());
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.state.lock().unwrap().roles.contains_key(name)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.state.lock().unwrap().functions.contains_key(name)
    }

    pub fn last_created_function(&self) -> Option<EdgeFunction> {
        self.state.lock().unwrap().functions.values().next().cloned()
    }

    fn enter(&self, operation: &'static str) -> Result<(), ProviderError> {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;
        if let Some(err) = self
            .failures
            .lock()
            .unwrap()
            .get_mut(operation)
            .and_then(|queue| queue.pop_front())
        {
            return Err(err);
        }
        if let Some(err) = self.permanent.lock().unwrap().get(operation) {
            return Err(err.clone());
        }
        Ok(())
    }
}

fn role(name: &str) -> Role {
    Role {
        name: name.to_string(),
        arn: format!("arn:aws:iam::123456789012:role/{}", name),
        created_at: Utc::now(),
    }
}

fn function_arn(name: &str) -> String {
    format!("arn:aws:lambda:us-east-1:123456789012:function:{}", name)
}

#[async_trait]
impl HostedZoneService for MockCloud {
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>, ProviderError> {
        self.enter("list_hosted_zones")?;
        Ok(self.state.lock().unwrap().zones.clone())
    }

    async fn change_record_sets(
        &self,
        zone_id: &str,
        batch: &ChangeBatch,
    ) -> Result<(), ProviderError> {
        self.enter("change_record_sets")?;
        let mut state = self.state.lock().unwrap();
        state.batches.push(batch.clone());
        let records = state.records.entry(zone_id.to_string()).or_default();

        for change in &batch.changes {
            let name = format!("{}.", change.name);
            let present = records
                .iter()
                .any(|r| r.name == name && r.record_type == change.record_type.as_str());
            if change.action == ChangeAction::Delete && !present {
                return Err(ProviderError::new(
                    "InvalidChangeBatch",
                    format!(
                        "Tried to delete resource record set [name='{}', type='{}'] but it was not found",
                        name, change.record_type
                    ),
                ));
            }
        }

        for change in &batch.changes {
            let name = format!("{}.", change.name);
            let record_type = change.record_type.as_str();
            records.retain(|r| !(r.name == name && r.record_type == record_type));
            if change.action == ChangeAction::Upsert {
                records.push(ResourceRecord {
                    name,
                    record_type: record_type.to_string(),
                    alias_target: Some(change.alias_target.clone()),
                });
            }
        }
        Ok(())
    }

    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<ResourceRecord>, ProviderError> {
        self.enter("list_record_sets")?;
        self.state
            .lock()
            .unwrap()
            .records
            .get(zone_id)
            .cloned()
            .ok_or_else(|| ProviderError::new("NoSuchHostedZone", "No hosted zone found"))
    }
}

#[async_trait]
impl RoleService for MockCloud {
    async fn get_role(&self, name: &str) -> Result<Option<Role>, ProviderError> {
        self.enter("get_role")?;
        Ok(self.state.lock().unwrap().roles.get(name).cloned())
    }

    async fn create_role(
        &self,
        name: &str,
        _trust_policy: &serde_json::Value,
    ) -> Result<Role, ProviderError> {
        self.enter("create_role")?;
        let mut state = self.state.lock().unwrap();
        if state.roles.contains_key(name) {
            return Err(ProviderError::new("EntityAlreadyExists", "Role already exists"));
        }
        let created = role(name);
        state.roles.insert(name.to_string(), created.clone());
        Ok(created)
    }

    async fn list_attached_policies(&self, name: &str) -> Result<Vec<String>, ProviderError> {
        self.enter("list_attached_policies")?;
        let state = self.state.lock().unwrap();
        if !state.roles.contains_key(name) {
            return Err(ProviderError::new("NoSuchEntity", "The role cannot be found"));
        }
        Ok(state
            .attached
            .iter()
            .filter(|(role, _)| role == name)
            .map(|(_, policy)| policy.clone())
            .collect())
    }

    async fn attach_role_policy(&self, name: &str, policy_arn: &str) -> Result<(), ProviderError> {
        self.enter("attach_role_policy")?;
        self.state
            .lock()
            .unwrap()
            .attached
            .insert((name.to_string(), policy_arn.to_string()));
        Ok(())
    }

    async fn detach_role_policy(&self, name: &str, policy_arn: &str) -> Result<(), ProviderError> {
        self.enter("detach_role_policy")?;
        let removed = self
            .state
            .lock()
            .unwrap()
            .attached
            .remove(&(name.to_string(), policy_arn.to_string()));
        if removed {
            Ok(())
        } else {
            Err(ProviderError::new(
                "NoSuchEntity",
                format!("Policy {} was not found.", policy_arn),
            ))
        }
    }

    async fn delete_role(&self, name: &str) -> Result<(), ProviderError> {
        self.enter("delete_role")?;
        let mut state = self.state.lock().unwrap();
        if state.attached.iter().any(|(role, _)| role == name) {
            return Err(ProviderError::new(
                "DeleteConflict",
                "Cannot delete entity, must detach all policies first.",
            ));
        }
        state
            .roles
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ProviderError::new("NoSuchEntity", "The role cannot be found"))
    }
}

#[async_trait]
impl FunctionService for MockCloud {
    async fn get_function(&self, name: &str) -> Result<Option<EdgeFunction>, ProviderError> {
        self.enter("get_function")?;
        Ok(self.state.lock().unwrap().functions.get(name).cloned())
    }

    async fn create_function(
        &self,
        request: &CreateFunctionRequest,
    ) -> Result<EdgeFunction, ProviderError> {
        self.enter("create_function")?;
        let mut state = self.state.lock().unwrap();
        if state.functions.contains_key(&request.name) {
            return Err(ProviderError::new(
                "ResourceConflictException",
                "Function already exist",
            ));
        }
        let function = EdgeFunction {
            name: request.name.clone(),
            arn: function_arn(&request.name),
            role_arn: request.role_arn.clone(),
            runtime: request.runtime.clone(),
            handler: request.handler.clone(),
            description: request.description.clone(),
        };
        state.functions.insert(request.name.clone(), function.clone());
        state.versions.insert(request.name.clone(), 0);
        Ok(function)
    }

    async fn publish_version(&self, name: &str) -> Result<FunctionVersion, ProviderError> {
        self.enter("publish_version")?;
        let mut state = self.state.lock().unwrap();
        let next = state
            .versions
            .get_mut(name)
            .ok_or_else(|| ProviderError::new("ResourceNotFoundException", "Function not found"))?;
        *next += 1;
        Ok(FunctionVersion {
            version: next.to_string(),
            arn: format!("{}:{}", function_arn(name), next),
        })
    }

    async fn list_versions(&self, name: &str) -> Result<Vec<FunctionVersion>, ProviderError> {
        self.enter("list_versions")?;
        let state = self.state.lock().unwrap();
        let published = *state
            .versions
            .get(name)
            .ok_or_else(|| ProviderError::new("ResourceNotFoundException", "Function not found"))?;
        let mut versions = vec![FunctionVersion {
            version: LATEST_VERSION.to_string(),
            arn: format!("{}:{}", function_arn(name), LATEST_VERSION),
        }];
        versions.extend((1..=published).map(|n| FunctionVersion {
            version: n.to_string(),
            arn: format!("{}:{}", function_arn(name), n),
        }));
        Ok(versions)
    }

    async fn delete_function(&self, name: &str) -> Result<(), ProviderError> {
        self.enter("delete_function")?;
        let mut state = self.state.lock().unwrap();
        if state.replicated.contains(name) {
            return Err(ProviderError::new(
                "InvalidParameterValueException",
                format!(
                    "Lambda was unable to delete {}:1 because it is a replicated function. \
                     Please see our documentation for Deleting Lambda@Edge Functions and Replicas.",
                    function_arn(name)
                ),
            ));
        }
        state.versions.remove(name);
        state
            .functions
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ProviderError::new("ResourceNotFoundException", "Function not found"))
    }
}

#[async_trait]
impl StackOutputs for MockCloud {
    async fn describe_outputs(&self, _stack_name: &str) -> Result<Vec<StackOutput>, ProviderError> {
        self.enter("describe_outputs")?;
        Ok(self.state.lock().unwrap().outputs.clone())
    }
}

/// A throttling error as the provider reports it
pub fn throttled() -> ProviderError {
    ProviderError::new("Throttling", "Rate exceeded")
}

/// Config for www.example.com with default timing
pub fn minimal_config() -> WebsiteDomainConfig {
    WebsiteDomainConfig::new("www.example.com", STACK_NAME, OUTPUT_KEY)
}

/// Config with short waits so budget exhaustion stays cheap in paused time
pub fn short_budget_config() -> WebsiteDomainConfig {
    minimal_config().with_retry(RetryPolicy {
        time_budget_secs: 20,
        min_wait_secs: 1,
        max_wait_secs: 5,
        role_propagation_delay_secs: 15,
    })
}
