//! Integration tests for run-level guarantees: fetch deduplication across
//! concurrent controls, run idempotence, and cyclic cross-resource
//! references terminating as failures.

use cloudcheck_lib::profile::ProfileDoc;
use cloudcheck_lib::resource::{FetchError, InventoryProvider, Provider, ResourceDescriptor, ResourceSnapshot};
use cloudcheck_lib::runner::{Report, RunOptions, Status, run};
use futures::future::BoxFuture;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Provider that counts how often each descriptor is fetched.
struct CountingProvider {
    inner: InventoryProvider,
    fetches: Mutex<HashMap<String, usize>>,
}

impl CountingProvider {
    fn new(inner: InventoryProvider) -> Self {
        Self {
            inner,
            fetches: Mutex::new(HashMap::new()),
        }
    }

    fn fetch_count(&self, key: &str) -> usize {
        self.fetches.lock().unwrap().get(key).copied().unwrap_or(0)
    }
}

impl Provider for CountingProvider {
    fn fetch<'a>(&'a self, descriptor: &'a ResourceDescriptor) -> BoxFuture<'a, Result<ResourceSnapshot, FetchError>> {
        Box::pin(async move {
            *self.fetches.lock().unwrap().entry(descriptor.cache_key()).or_insert(0) += 1;
            self.inner.fetch(descriptor).await
        })
    }

    fn enumerate<'a>(
        &'a self,
        resource_type: &'a str,
        filter: &'a BTreeMap<String, String>,
    ) -> BoxFuture<'a, Result<Vec<ResourceSnapshot>, FetchError>> {
        self.inner.enumerate(resource_type, filter)
    }
}

async fn run_text(text: &str, provider: Arc<dyn Provider>) -> Report {
    let profile = ProfileDoc::parse(text).unwrap().bind(&BTreeMap::new()).unwrap();
    run(&profile, provider, &RunOptions::default()).await
}

const SHARED_DESCRIPTOR_PROFILE: &str = r#"
    version = 1
    name = "shared"

    [[controls]]
    id = "vpc-1"
    impact = 1.0
    title = "VPC is available"

    [[controls.assertions]]
    resource = "aws_vpc"
    selector = { vpc_id = "vpc-1" }

    [[controls.assertions.predicates]]
    kind = "equals"
    path = "state"
    value = "available"

    [[controls]]
    id = "vpc-2"
    impact = 1.0
    title = "VPC uses the expected CIDR"

    [[controls.assertions]]
    resource = "aws_vpc"
    selector = { vpc_id = "vpc-1" }

    [[controls.assertions.predicates]]
    kind = "equals"
    path = "cidr_block"
    value = "10.0.0.0/16"

    [[controls]]
    id = "vpc-3"
    impact = 0.5
    title = "VPC is tagged"

    [[controls.assertions]]
    resource = "aws_vpc"
    selector = { vpc_id = "vpc-1" }

    [[controls.assertions.predicates]]
    kind = "exists"
    path = "tags.Name"
"#;

#[tokio::test]
async fn concurrent_controls_share_one_fetch_per_descriptor() {
    let mut inventory = InventoryProvider::new();
    inventory.insert(
        "aws_vpc",
        json!({"vpc_id": "vpc-1", "state": "available", "cidr_block": "10.0.0.0/16", "tags": {"Name": "main"}}),
    );
    let provider = Arc::new(CountingProvider::new(inventory));

    let report = run_text(SHARED_DESCRIPTOR_PROFILE, Arc::clone(&provider) as Arc<dyn Provider>).await;
    assert!(report.clean());
    assert_eq!(provider.fetch_count("aws_vpc{vpc_id=vpc-1}"), 1);
}

#[tokio::test]
async fn runs_are_idempotent() {
    let mut inventory = InventoryProvider::new();
    inventory.insert("aws_vpc", json!({"vpc_id": "vpc-1", "state": "available", "cidr_block": "10.9.0.0/16"}));
    let provider: Arc<dyn Provider> = Arc::new(inventory);

    let first = run_text(SHARED_DESCRIPTOR_PROFILE, Arc::clone(&provider)).await;
    let second = run_text(SHARED_DESCRIPTOR_PROFILE, Arc::clone(&provider)).await;

    assert_eq!(
        serde_json::to_value(&first.outcomes).unwrap(),
        serde_json::to_value(&second.outcomes).unwrap()
    );
    assert!((first.summary_score - second.summary_score).abs() < f64::EPSILON);
}

#[tokio::test]
async fn cyclic_cross_resource_references_fail_instead_of_looping() {
    let text = r#"
        version = 1
        name = "cycles"

        [[controls]]
        id = "sec-1"
        impact = 1.0
        title = "Peered security groups exist"

        [[controls.assertions]]
        resource = "aws_security_group"
        selector = { group_id = "sg-a" }

        [[controls.assertions.predicates]]
        kind = "cross_resource"
        resource = "aws_security_group"
        selector = { group_id = "peer" }

        [[controls.assertions.predicates.predicates]]
        kind = "cross_resource"
        resource = "aws_security_group"
        selector = { group_id = "peer" }

        [[controls.assertions.predicates.predicates.predicates]]
        kind = "exists"
        path = "group_id"
    "#;

    let mut inventory = InventoryProvider::new();
    inventory.insert("aws_security_group", json!({"group_id": "sg-a", "peer": "sg-b"}));
    inventory.insert("aws_security_group", json!({"group_id": "sg-b", "peer": "sg-a"}));

    let report = run_text(text, Arc::new(inventory)).await;
    assert_eq!(report.outcomes[0].status, Status::Fail);
    assert!(report.outcomes[0].message.as_ref().unwrap().contains("cyclic"));
}
