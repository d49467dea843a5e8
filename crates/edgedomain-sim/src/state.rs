// # Simulated Cloud State
//
// Plain serializable model of the provider resources edgedomain touches.
// Every operation mirrors the provider's observable behavior, including the
// error codes and messages the core classifies:
//
// - DNS: `NoSuchHostedZone`, `InvalidChangeBatch` ("... but it was not found")
// - Roles: `NoSuchEntity`, `EntityAlreadyExists`, `DeleteConflict`
// - Functions: `ResourceNotFoundException`, `ResourceConflictException`,
//   `InvalidParameterValueException` ("... replicated function ...")
// - Stacks: `ValidationError` ("Stack with id ... does not exist")
//
// Change batches are validated in full before any change is applied, so a
// rejected batch leaves the zone untouched.

use chrono::Utc;
use edgedomain_core::error::ProviderError;
use edgedomain_core::traits::{
    ChangeAction, ChangeBatch, CreateFunctionRequest, EdgeFunction, FunctionVersion, HostedZone,
    LATEST_VERSION, ResourceRecord, Role, StackOutput,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Account id embedded in generated identifiers
pub const DEFAULT_ACCOUNT_ID: &str = "123456789012";

/// Region edge functions are created in
const EDGE_REGION: &str = "us-east-1";

/// A hosted zone and its records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimZone {
    /// Bare zone id
    pub id: String,
    /// Dot-terminated zone name
    pub name: String,
    #[serde(default)]
    pub records: Vec<ResourceRecord>,
}

/// A role with its attached managed policies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimRole {
    pub role: Role,
    pub trust_policy: serde_json::Value,
    #[serde(default)]
    pub attached_policies: Vec<String>,
}

/// A function with its publishing state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimFunction {
    pub function: EdgeFunction,
    /// Size of the uploaded code, in bytes
    pub code_size: usize,
    /// Highest published version, 0 when only `$LATEST` exists
    #[serde(default)]
    pub published: u64,
    /// Replicas exist at edge locations; deletion is refused
    #[serde(default)]
    pub replicated: bool,
}

/// Every simulated resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudState {
    #[serde(default = "default_account_id")]
    pub account_id: String,
    #[serde(default)]
    pub zones: Vec<SimZone>,
    #[serde(default)]
    pub roles: BTreeMap<String, SimRole>,
    #[serde(default)]
    pub functions: BTreeMap<String, SimFunction>,
    #[serde(default)]
    pub stacks: BTreeMap<String, Vec<StackOutput>>,
}

fn default_account_id() -> String {
    DEFAULT_ACCOUNT_ID.to_string()
}

impl Default for CloudState {
    fn default() -> Self {
        Self {
            account_id: default_account_id(),
            zones: Vec::new(),
            roles: BTreeMap::new(),
            functions: BTreeMap::new(),
            stacks: BTreeMap::new(),
        }
    }
}

fn fqdn(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with('.') {
        lower
    } else {
        format!("{}.", lower)
    }
}

impl CloudState {
    /// Add a hosted zone (no-op if the id already exists)
    pub fn add_zone(&mut self, id: impl Into<String>, name: &str) {
        let id = id.into();
        if self.zones.iter().any(|z| z.id == id) {
            return;
        }
        self.zones.push(SimZone {
            id,
            name: fqdn(name),
            records: Vec::new(),
        });
    }

    /// Set one output of a stack, creating the stack if needed
    pub fn set_stack_output(&mut self, stack_name: &str, key: &str, value: &str) {
        let outputs = self.stacks.entry(stack_name.to_string()).or_default();
        outputs.retain(|o| o.key != key);
        outputs.push(StackOutput {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    /// Flag a function as replicated (or not) to edge locations
    pub fn set_replicated(&mut self, name: &str, replicated: bool) -> Result<(), ProviderError> {
        let function = self.function_mut(name)?;
        function.replicated = replicated;
        Ok(())
    }

    pub fn list_hosted_zones(&self) -> Vec<HostedZone> {
        self.zones
            .iter()
            .map(|z| HostedZone::new(format!("/hostedzone/{}", z.id), z.name.clone()))
            .collect()
    }

    pub fn list_record_sets(&self, zone_id: &str) -> Result<Vec<ResourceRecord>, ProviderError> {
        Ok(self.zone(zone_id)?.records.clone())
    }

    /// Apply a batch atomically
    pub fn change_record_sets(
        &mut self,
        zone_id: &str,
        batch: &ChangeBatch,
    ) -> Result<(), ProviderError> {
        let zone = self.zone_mut(zone_id)?;

        let mut problems = Vec::new();
        for change in &batch.changes {
            let name = fqdn(&change.name);
            if name != zone.name && !name.ends_with(&format!(".{}", zone.name)) {
                problems.push(format!(
                    "RRSet with DNS name {} is not permitted in zone {}",
                    name, zone.name
                ));
                continue;
            }
            if change.action == ChangeAction::Delete {
                let current = zone
                    .records
                    .iter()
                    .find(|r| r.name == name && r.record_type == change.record_type.as_str());
                match current {
                    None => problems.push(format!(
                        "Tried to delete resource record set [name='{}', type='{}'] but it was not found",
                        name, change.record_type
                    )),
                    Some(record) if record.alias_target.as_ref() != Some(&change.alias_target) => {
                        problems.push(format!(
                            "Tried to delete resource record set [name='{}', type='{}'] but the values provided do not match the current values",
                            name, change.record_type
                        ))
                    }
                    Some(_) => {}
                }
            }
        }
        if !problems.is_empty() {
            return Err(ProviderError::new(
                "InvalidChangeBatch",
                format!("[{}]", problems.join(", ")),
            ));
        }

        for change in &batch.changes {
            let name = fqdn(&change.name);
            let record_type = change.record_type.as_str();
            zone.records
                .retain(|r| !(r.name == name && r.record_type == record_type));
            if change.action == ChangeAction::Upsert {
                zone.records.push(ResourceRecord {
                    name,
                    record_type: record_type.to_string(),
                    alias_target: Some(change.alias_target.clone()),
                });
            }
        }
        Ok(())
    }

    pub fn get_role(&self, name: &str) -> Option<Role> {
        self.roles.get(name).map(|r| r.role.clone())
    }

    pub fn create_role(
        &mut self,
        name: &str,
        trust_policy: &serde_json::Value,
    ) -> Result<Role, ProviderError> {
        if self.roles.contains_key(name) {
            return Err(ProviderError::new(
                "EntityAlreadyExists",
                format!("Role with name {} already exists.", name),
            ));
        }
        if trust_policy.get("Statement").is_none() {
            return Err(ProviderError::new(
                "MalformedPolicyDocument",
                "Policy document must contain a Statement",
            ));
        }

        let role = Role {
            name: name.to_string(),
            arn: format!("arn:aws:iam::{}:role/{}", self.account_id, name),
            created_at: Utc::now(),
        };
        self.roles.insert(
            name.to_string(),
            SimRole {
                role: role.clone(),
                trust_policy: trust_policy.clone(),
                attached_policies: Vec::new(),
            },
        );
        Ok(role)
    }

    pub fn list_attached_policies(&self, name: &str) -> Result<Vec<String>, ProviderError> {
        self.roles
            .get(name)
            .map(|r| r.attached_policies.clone())
            .ok_or_else(|| {
                ProviderError::new(
                    "NoSuchEntity",
                    format!("The role with name {} cannot be found.", name),
                )
            })
    }

    pub fn attach_role_policy(&mut self, name: &str, policy_arn: &str) -> Result<(), ProviderError> {
        let role = self.role_mut(name)?;
        if !role.attached_policies.iter().any(|p| p == policy_arn) {
            role.attached_policies.push(policy_arn.to_string());
        }
        Ok(())
    }

    pub fn detach_role_policy(&mut self, name: &str, policy_arn: &str) -> Result<(), ProviderError> {
        let role = self.role_mut(name)?;
        let before = role.attached_policies.len();
        role.attached_policies.retain(|p| p != policy_arn);
        if role.attached_policies.len() == before {
            return Err(ProviderError::new(
                "NoSuchEntity",
                format!("Policy {} was not found.", policy_arn),
            ));
        }
        Ok(())
    }

    pub fn delete_role(&mut self, name: &str) -> Result<(), ProviderError> {
        let role = self.role_mut(name)?;
        if !role.attached_policies.is_empty() {
            return Err(ProviderError::new(
                "DeleteConflict",
                "Cannot delete entity, must detach all policies first.",
            ));
        }
        self.roles.remove(name);
        Ok(())
    }

    pub fn get_function(&self, name: &str) -> Option<EdgeFunction> {
        self.functions.get(name).map(|f| f.function.clone())
    }

    pub fn create_function(
        &mut self,
        request: &CreateFunctionRequest,
    ) -> Result<EdgeFunction, ProviderError> {
        if self.functions.contains_key(&request.name) {
            return Err(ProviderError::new(
                "ResourceConflictException",
                format!("Function already exist: {}", request.name),
            ));
        }
        if !self.roles.values().any(|r| r.role.arn == request.role_arn) {
            return Err(ProviderError::new(
                "InvalidParameterValueException",
                "The role defined for the function cannot be assumed by Lambda.",
            ));
        }
        if request.code.is_empty() {
            return Err(ProviderError::new(
                "InvalidParameterValueException",
                "Uploaded file must be a non-empty artifact.",
            ));
        }

        let function = EdgeFunction {
            name: request.name.clone(),
            arn: self.function_arn(&request.name),
            role_arn: request.role_arn.clone(),
            runtime: request.runtime.clone(),
            handler: request.handler.clone(),
            description: request.description.clone(),
        };
        self.functions.insert(
            request.name.clone(),
            SimFunction {
                function: function.clone(),
                code_size: request.code.len(),
                published: 0,
                replicated: false,
            },
        );
        Ok(function)
    }

    pub fn publish_version(&mut self, name: &str) -> Result<FunctionVersion, ProviderError> {
        let function = self.function_mut(name)?;
        function.published += 1;
        Ok(FunctionVersion {
            version: function.published.to_string(),
            arn: format!("{}:{}", function.function.arn, function.published),
        })
    }

    pub fn list_versions(&self, name: &str) -> Result<Vec<FunctionVersion>, ProviderError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| self.function_not_found(name))?;
        let arn = &function.function.arn;

        let mut versions = vec![FunctionVersion {
            version: LATEST_VERSION.to_string(),
            arn: format!("{}:{}", arn, LATEST_VERSION),
        }];
        versions.extend((1..=function.published).map(|n| FunctionVersion {
            version: n.to_string(),
            arn: format!("{}:{}", arn, n),
        }));
        Ok(versions)
    }

    pub fn delete_function(&mut self, name: &str) -> Result<(), ProviderError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| self.function_not_found(name))?;
        if function.replicated {
            return Err(ProviderError::new(
                "InvalidParameterValueException",
                format!(
                    "Lambda was unable to delete {}:{} because it is a replicated function. \
                     Please see our documentation for Deleting Lambda@Edge Functions and Replicas.",
                    function.function.arn,
                    function.published.max(1)
                ),
            ));
        }
        self.functions.remove(name);
        Ok(())
    }

    pub fn describe_outputs(&self, stack_name: &str) -> Result<Vec<StackOutput>, ProviderError> {
        self.stacks.get(stack_name).cloned().ok_or_else(|| {
            ProviderError::new(
                "ValidationError",
                format!("Stack with id {} does not exist", stack_name),
            )
        })
    }

    fn zone(&self, zone_id: &str) -> Result<&SimZone, ProviderError> {
        self.zones
            .iter()
            .find(|z| z.id == zone_id)
            .ok_or_else(|| no_such_zone(zone_id))
    }

    fn zone_mut(&mut self, zone_id: &str) -> Result<&mut SimZone, ProviderError> {
        self.zones
            .iter_mut()
            .find(|z| z.id == zone_id)
            .ok_or_else(|| no_such_zone(zone_id))
    }

    fn role_mut(&mut self, name: &str) -> Result<&mut SimRole, ProviderError> {
        self.roles.get_mut(name).ok_or_else(|| {
            ProviderError::new(
                "NoSuchEntity",
                format!("The role with name {} cannot be found.", name),
            )
        })
    }

    fn function_mut(&mut self, name: &str) -> Result<&mut SimFunction, ProviderError> {
        let err = self.function_not_found(name);
        self.functions.get_mut(name).ok_or(err)
    }

    fn function_arn(&self, name: &str) -> String {
        format!(
            "arn:aws:lambda:{}:{}:function:{}",
            EDGE_REGION, self.account_id, name
        )
    }

    fn function_not_found(&self, name: &str) -> ProviderError {
        ProviderError::new(
            "ResourceNotFoundException",
            format!("Function not found: {}", self.function_arn(name)),
        )
    }
}

fn no_such_zone(zone_id: &str) -> ProviderError {
    ProviderError::new(
        "NoSuchHostedZone",
        format!("No hosted zone found with ID: {}", zone_id),
    )
}
