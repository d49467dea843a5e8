//! Contract Test: End-to-End Lifecycle Against the Simulated Cloud
//!
//! Runs every lifecycle intent through `WebsiteDomain` against the file
//! backend, reopening the snapshot between steps the way separate CLI
//! invocations would.
//!
//! Constraints verified:
//! - State written by one invocation is seen by the next
//! - create-domain is a no-op the second time
//! - The published version can be looked up after create-edge-function
//! - A replicated function blocks remove-edge-function until it is detached

use edgedomain_core::config::{BackendConfig, EdgeConfig, RedirectRule, RetryPolicy};
use edgedomain_core::{BackendRegistry, DomainOutcome, Error, WebsiteDomain, WebsiteDomainConfig};
use edgedomain_sim::SimulatedCloud;
use std::path::Path;

const STACK: &str = "site-prod";
const OUTPUT_KEY: &str = "CloudFrontDomainName";

fn config(path: &Path) -> WebsiteDomainConfig {
    let mut config = WebsiteDomainConfig::new("www.example.com", STACK, OUTPUT_KEY)
        .with_redirect_to_www(true)
        .with_edge(EdgeConfig {
            redirect: Some(RedirectRule::new("example.com", "https://www.example.com")),
            basic_auth_credentials: Some("admin/s3cret".to_string()),
        })
        .with_retry(RetryPolicy {
            role_propagation_delay_secs: 0,
            ..RetryPolicy::default()
        });
    config.backend = BackendConfig::File {
        path: path.display().to_string(),
    };
    config
}

async fn invocation(path: &Path) -> WebsiteDomain {
    let registry = BackendRegistry::new();
    edgedomain_sim::register(&registry);
    let config = config(path);
    let services = registry
        .create_backend(&config.backend)
        .await
        .expect("backend opens");
    WebsiteDomain::new(config, services).expect("valid config")
}

async fn seed(path: &Path) {
    let cloud = SimulatedCloud::open(path).await.expect("snapshot opens");
    cloud
        .update(|s| {
            s.add_zone("ZAPEX", "example.com");
            s.add_zone("ZOTHER", "example.org");
            s.set_stack_output(STACK, OUTPUT_KEY, "d111111abcdef8.cloudfront.net");
        })
        .await;
    cloud.services().flush().await.expect("seed is saved");
}

#[tokio::test]
async fn full_lifecycle_across_invocations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cloud.json");
    seed(&path).await;

    let domain = invocation(&path).await;
    assert_eq!(domain.create_domain().await.unwrap(), DomainOutcome::Created);
    domain.flush().await.unwrap();

    let domain = invocation(&path).await;
    assert_eq!(
        domain.create_domain().await.unwrap(),
        DomainOutcome::AlreadyPresent
    );

    let created = domain.create_edge_function().await.unwrap();
    assert!(created.role_created && created.function_created);
    domain.flush().await.unwrap();

    let domain = invocation(&path).await;
    let arn = domain.edge_function_version_arn().await.unwrap();
    assert!(arn.ends_with(":function:site-prod-redirect:1"));

    domain.remove_domain().await.unwrap();
    let removed = domain.remove_edge_function().await.unwrap();
    assert!(removed.function_deleted && removed.role_deleted);
    domain.flush().await.unwrap();

    let state = SimulatedCloud::open(&path).await.unwrap().state().await;
    assert!(state.zones.iter().all(|z| z.records.is_empty()));
    assert!(state.roles.is_empty());
    assert!(state.functions.is_empty());
}

#[tokio::test]
async fn replicated_function_must_be_detached_first() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cloud.json");
    seed(&path).await;

    let domain = invocation(&path).await;
    domain.create_edge_function().await.unwrap();
    domain.flush().await.unwrap();

    let cloud = SimulatedCloud::open(&path).await.unwrap();
    cloud
        .update(|s| s.set_replicated("site-prod-redirect", true))
        .await
        .unwrap();
    cloud.services().flush().await.unwrap();

    let domain = invocation(&path).await;
    let err = domain.remove_edge_function().await.unwrap_err();
    assert!(matches!(err, Error::FunctionStillAttached { .. }));
    domain.flush().await.unwrap();

    let state = SimulatedCloud::open(&path).await.unwrap().state().await;
    assert!(state.roles.contains_key("site-prod-redirect"));
    assert!(state.functions.contains_key("site-prod-redirect"));
}

#[tokio::test]
async fn packaged_handler_is_uploaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cloud.json");
    seed(&path).await;

    let domain = invocation(&path).await;
    let package = domain.function_package().unwrap();
    domain.create_edge_function().await.unwrap();
    domain.flush().await.unwrap();

    let state = SimulatedCloud::open(&path).await.unwrap().state().await;
    let function = &state.functions["site-prod-redirect"];
    assert_eq!(function.code_size, package.code().len());
    assert_eq!(function.function.handler, "handler.main");
    assert!(package.source().contains("'https://www.example.com'"));
}
