//! Drives one profile run end to end.

use super::report::{Outcome, Report, Status};
use super::throttler::Throttler;
use crate::eval::{LookupError, Verdict, check};
use crate::profile::{Assertion, AssertionMode, Control, Profile};
use crate::resource::{FetchFailure, Provider, SnapshotCache};
use core::time::Duration;
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::time::Instant;

const LOG_TARGET: &str = "    runner";

/// Knobs for one evaluation run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Maximum controls evaluating at once.
    pub concurrency: usize,

    /// Run-level deadline. Controls still in flight when it elapses end in
    /// `Error`; completed outcomes are preserved.
    pub timeout: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            timeout: None,
        }
    }
}

/// Evaluate every control in `profile` against `provider` and fold the
/// outcomes into a [`Report`].
///
/// Controls run on a bounded worker pool; assertions within a control run
/// sequentially in declared order. One control's failure never aborts its
/// siblings: every control appears in the report with a definite status.
pub async fn run(profile: &Profile, provider: Arc<dyn Provider>, options: &RunOptions) -> Report {
    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
    let cache = Arc::new(SnapshotCache::new(provider, deadline));
    let throttler = Throttler::new(options.concurrency);

    log::info!(
        target: LOG_TARGET,
        "running profile '{}': {} controls, concurrency {}",
        profile.name,
        profile.controls.len(),
        options.concurrency
    );

    let evaluations = profile.controls.iter().map(|control| {
        let cache = Arc::clone(&cache);
        let throttler = Arc::clone(&throttler);
        async move {
            if !control.active {
                log::debug!(target: LOG_TARGET, "skipping '{}', precondition not met", control.id);
                return Outcome {
                    control_id: control.id.clone(),
                    status: Status::Skip,
                    impact: control.impact,
                    failing_assertions: vec![],
                    message: Some("precondition not met".to_string()),
                };
            }

            let _permit = throttler.acquire().await;
            match deadline {
                Some(at) => match tokio::time::timeout_at(at, evaluate_control(control, &cache)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        log::debug!(target: LOG_TARGET, "'{}' hit the run deadline", control.id);
                        Outcome {
                            control_id: control.id.clone(),
                            status: Status::Error,
                            impact: control.impact,
                            failing_assertions: vec![],
                            message: Some("Timeout: run deadline elapsed".to_string()),
                        }
                    }
                },
                None => evaluate_control(control, &cache).await,
            }
        }
    });

    let outcomes = join_all(evaluations).await;
    Report::new(profile.name.clone(), outcomes)
}

enum AssertionVerdict {
    Pass,
    Fail(String),
    Error(String),
}

async fn evaluate_control(control: &Control, cache: &SnapshotCache) -> Outcome {
    let mut failing_assertions = Vec::new();
    let mut message = None;

    for (index, assertion) in control.assertions.iter().enumerate() {
        match evaluate_assertion(assertion, cache).await {
            AssertionVerdict::Pass => {}
            AssertionVerdict::Fail(reason) => {
                log::debug!(target: LOG_TARGET, "'{}' assertion {index} failed: {reason}", control.id);
                failing_assertions.push(index);
                if message.is_none() {
                    message = Some(reason);
                }
            }
            AssertionVerdict::Error(reason) => {
                log::debug!(target: LOG_TARGET, "'{}' assertion {index} errored: {reason}", control.id);
                return Outcome {
                    control_id: control.id.clone(),
                    status: Status::Error,
                    impact: control.impact,
                    failing_assertions,
                    message: Some(reason),
                };
            }
        }
    }

    Outcome {
        control_id: control.id.clone(),
        status: if failing_assertions.is_empty() { Status::Pass } else { Status::Fail },
        impact: control.impact,
        failing_assertions,
        message,
    }
}

async fn evaluate_assertion(assertion: &Assertion, cache: &SnapshotCache) -> AssertionVerdict {
    let descriptor = assertion.descriptor();

    match assertion.mode {
        AssertionMode::Single => match cache.get_or_fetch(&descriptor).await {
            Ok(snapshot) => {
                if assertion.absent {
                    return AssertionVerdict::Fail(format!("expected {descriptor} to be absent"));
                }
                judge(check(&assertion.predicates, &snapshot, cache, &[descriptor.cache_key()]).await)
            }
            Err(FetchFailure::NotFound) if assertion.absent => AssertionVerdict::Pass,
            Err(failure) => AssertionVerdict::Error(format!("{failure} for {descriptor}")),
        },

        AssertionMode::All | AssertionMode::Any => {
            let snapshots = match cache.get_or_enumerate(&assertion.resource_type, &assertion.selector).await {
                Ok(snapshots) => snapshots,
                Err(failure) => return AssertionVerdict::Error(format!("{failure} for {descriptor}")),
            };

            let mut any_held = false;
            for snapshot in snapshots.iter() {
                match check(&assertion.predicates, snapshot, cache, &[]).await {
                    Ok(Verdict { holds: true, .. }) => any_held = true,
                    Ok(verdict) => {
                        if assertion.mode == AssertionMode::All {
                            return AssertionVerdict::Fail(format!(
                                "a {} did not satisfy the assertion: {}",
                                assertion.resource_type,
                                verdict.reason.unwrap_or_default()
                            ));
                        }
                    }
                    Err(error) => return AssertionVerdict::Error(error.to_string()),
                }
            }

            if assertion.mode == AssertionMode::Any && !any_held {
                return AssertionVerdict::Fail(format!("no {} matching {descriptor} satisfied the assertion", assertion.resource_type));
            }
            AssertionVerdict::Pass
        }
    }
}

fn judge(result: Result<Verdict, LookupError>) -> AssertionVerdict {
    match result {
        Ok(Verdict { holds: true, .. }) => AssertionVerdict::Pass,
        Ok(verdict) => AssertionVerdict::Fail(verdict.reason.unwrap_or_else(|| "assertion did not hold".to_string())),
        Err(error) => AssertionVerdict::Error(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileDoc;
    use crate::resource::{FetchError, InventoryProvider, ResourceDescriptor, ResourceSnapshot};
    use futures::future::BoxFuture;
    use serde_json::json;
    use std::collections::BTreeMap;

    const PROFILE: &str = r##"
        version = 1
        name = "prod"

        [inputs.project]
        default = "acme"

        [inputs.environment]
        default = "prod"

        [[controls]]
        id = "db-1"
        impact = 1.0
        title = "RDS instance is multi-AZ in prod"

        [[controls.assertions]]
        resource = "aws_rds_instance"
        selector = { db_instance_identifier = "#{project}-#{environment}-db" }

        [[controls.assertions.predicates]]
        kind = "equals"
        path = "multi_az"
        value = "#{environment == 'prod'}"

        [[controls]]
        id = "vpc-1"
        impact = 0.8
        title = "VPC uses the expected CIDR"

        [[controls.assertions]]
        resource = "aws_vpc"
        selector = { tag_name = "#{project}-#{environment}" }

        [[controls.assertions.predicates]]
        kind = "equals"
        path = "cidr_block"
        value = "10.0.0.0/16"
    "##;

    fn provider() -> InventoryProvider {
        let mut p = InventoryProvider::new();
        p.insert("aws_rds_instance", json!({"db_instance_identifier": "acme-prod-db", "multi_az": false}));
        p.insert("aws_vpc", json!({"tag_name": "acme-prod", "cidr_block": "10.0.0.0/16"}));
        p
    }

    async fn run_profile(text: &str, provider: InventoryProvider) -> Report {
        let profile = ProfileDoc::parse(text).unwrap().bind(&BTreeMap::new()).unwrap();
        run(&profile, Arc::new(provider), &RunOptions::default()).await
    }

    #[tokio::test]
    async fn failing_predicate_is_fail_with_impact() {
        let report = run_profile(PROFILE, provider()).await;

        let db = report.outcomes.iter().find(|o| o.control_id == "db-1").unwrap();
        assert_eq!(db.status, Status::Fail);
        assert!((db.impact - 1.0).abs() < f64::EPSILON);
        assert_eq!(db.failing_assertions, [0]);

        let vpc = report.outcomes.iter().find(|o| o.control_id == "vpc-1").unwrap();
        assert_eq!(vpc.status, Status::Pass);

        assert!((report.summary_score - 0.4444).abs() < f64::EPSILON);
        assert!(!report.clean());
    }

    #[tokio::test]
    async fn missing_resource_is_error_and_does_not_block_siblings() {
        let mut p = InventoryProvider::new();
        p.insert("aws_vpc", json!({"tag_name": "acme-prod", "cidr_block": "10.0.0.0/16"}));
        let report = run_profile(PROFILE, p).await;

        let db = report.outcomes.iter().find(|o| o.control_id == "db-1").unwrap();
        assert_eq!(db.status, Status::Error);
        assert!(db.message.as_ref().unwrap().contains("ResourceNotFound"));

        let vpc = report.outcomes.iter().find(|o| o.control_id == "vpc-1").unwrap();
        assert_eq!(vpc.status, Status::Pass);
    }

    #[tokio::test]
    async fn inactive_controls_skip_without_fetching() {
        let text = PROFILE.replace("title = \"RDS instance is multi-AZ in prod\"", "title = \"RDS instance is multi-AZ in prod\"\n        only_if = \"#{environment == 'dr'}\"");
        let report = run_profile(&text, provider()).await;

        let db = report.outcomes.iter().find(|o| o.control_id == "db-1").unwrap();
        assert_eq!(db.status, Status::Skip);

        // The skipped Fail no longer drags the score down.
        assert!((report.summary_score - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn absent_assertion_passes_on_not_found() {
        let text = r#"
            version = 1
            name = "prod"

            [[controls]]
            id = "sec-9"
            impact = 0.6
            title = "No default security group is exposed"

            [[controls.assertions]]
            resource = "aws_security_group"
            selector = { group_name = "default-open" }
            absent = true
        "#;
        let report = run_profile(text, InventoryProvider::new()).await;
        assert_eq!(report.outcomes[0].status, Status::Pass);

        let mut p = InventoryProvider::new();
        p.insert("aws_security_group", json!({"group_name": "default-open"}));
        let report = run_profile(text, p).await;
        assert_eq!(report.outcomes[0].status, Status::Fail);
    }

    #[tokio::test]
    async fn enumerated_modes_quantify_over_matches() {
        let text = r#"
            version = 1
            name = "prod"

            [[controls]]
            id = "sub-1"
            impact = 0.5
            title = "Every subnet is tagged"

            [[controls.assertions]]
            resource = "aws_subnet"
            selector = { vpc_id = "vpc-1" }
            mode = "all"

            [[controls.assertions.predicates]]
            kind = "exists"
            path = "tags.Type"

            [[controls]]
            id = "sub-2"
            impact = 0.5
            title = "At least one database subnet exists"

            [[controls.assertions]]
            resource = "aws_subnet"
            selector = { vpc_id = "vpc-1" }
            mode = "any"

            [[controls.assertions.predicates]]
            kind = "equals"
            path = "tags.Type"
            value = "Database"
        "#;

        let mut p = InventoryProvider::new();
        p.insert("aws_subnet", json!({"vpc_id": "vpc-1", "tags": {"Type": "Database"}}));
        p.insert("aws_subnet", json!({"vpc_id": "vpc-1", "tags": {"Type": "Public"}}));
        let report = run_profile(text, p).await;
        assert!(report.outcomes.iter().all(|o| o.status == Status::Pass));

        // Any over an empty enumeration fails; all passes vacuously.
        let report = run_profile(text, InventoryProvider::new()).await;
        let all = report.outcomes.iter().find(|o| o.control_id == "sub-1").unwrap();
        assert_eq!(all.status, Status::Pass);
        let any = report.outcomes.iter().find(|o| o.control_id == "sub-2").unwrap();
        assert_eq!(any.status, Status::Fail);
    }

    struct StalledProvider;

    impl Provider for StalledProvider {
        fn fetch<'a>(&'a self, _descriptor: &'a ResourceDescriptor) -> BoxFuture<'a, Result<ResourceSnapshot, FetchError>> {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(300)).await;
                Err(FetchError::NotFound)
            })
        }

        fn enumerate<'a>(
            &'a self,
            _resource_type: &'a str,
            _filter: &'a BTreeMap<String, String>,
        ) -> BoxFuture<'a, Result<Vec<ResourceSnapshot>, FetchError>> {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(300)).await;
                Ok(vec![])
            })
        }
    }

    #[tokio::test]
    async fn deadline_turns_stalled_controls_into_timeout_errors() {
        let profile = ProfileDoc::parse(PROFILE).unwrap().bind(&BTreeMap::new()).unwrap();
        let options = RunOptions {
            concurrency: 4,
            timeout: Some(Duration::from_millis(50)),
        };
        let report = run(&profile, Arc::new(StalledProvider), &options).await;

        assert_eq!(report.outcomes.len(), 2);
        for outcome in &report.outcomes {
            assert_eq!(outcome.status, Status::Error);
            assert!(outcome.message.as_ref().unwrap().contains("Timeout"));
        }
    }

    #[tokio::test]
    async fn report_lists_every_control_exactly_once_sorted() {
        let report = run_profile(PROFILE, provider()).await;
        let ids: Vec<_> = report.outcomes.iter().map(|o| o.control_id.as_str()).collect();
        assert_eq!(ids, ["db-1", "vpc-1"]);
    }
}
