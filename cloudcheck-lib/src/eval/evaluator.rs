//! Walks predicate trees against resource snapshots.

use super::Predicate;
use crate::resource::{FetchFailure, ResourceDescriptor, ResourceSnapshot, SnapshotCache, lookup, scalar_to_string};
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::BTreeMap;

/// The boolean result of evaluating predicates, with the first failure's
/// reason when they do not hold.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub holds: bool,
    pub reason: Option<String>,
}

impl Verdict {
    pub(crate) const fn pass() -> Self {
        Self { holds: true, reason: None }
    }

    pub(crate) fn fail(reason: impl Into<String>) -> Self {
        Self {
            holds: false,
            reason: Some(reason.into()),
        }
    }
}

/// A cross-resource lookup that could not produce a snapshot. Distinct from
/// a failing predicate: the owning control ends in `Error`, not `Fail`.
#[derive(Debug, Clone)]
pub struct LookupError {
    pub descriptor: ResourceDescriptor,
    pub failure: FetchFailure,
}

impl core::fmt::Display for LookupError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} for {}", self.failure, self.descriptor)
    }
}

/// Evaluate a predicate list (implicit AND) against a snapshot.
///
/// `visited` seeds cycle detection with the canonical keys of descriptors
/// already resolved along the current path; callers pass the snapshot's own
/// descriptor key so a resource graph cycling back to its origin is caught
/// on the first hop.
pub async fn check(
    predicates: &[Predicate],
    snapshot: &ResourceSnapshot,
    cache: &SnapshotCache,
    visited: &[String],
) -> Result<Verdict, LookupError> {
    eval_predicates(predicates, snapshot.root(), cache, visited).await
}

fn eval_predicates<'a>(
    predicates: &'a [Predicate],
    scope: &'a Value,
    cache: &'a SnapshotCache,
    visited: &'a [String],
) -> BoxFuture<'a, Result<Verdict, LookupError>> {
    Box::pin(async move {
        for predicate in predicates {
            let verdict = eval_one(predicate, scope, cache, visited).await?;
            if !verdict.holds {
                return Ok(verdict);
            }
        }
        Ok(Verdict::pass())
    })
}

async fn eval_one(
    predicate: &Predicate,
    scope: &Value,
    cache: &SnapshotCache,
    visited: &[String],
) -> Result<Verdict, LookupError> {
    match predicate {
        Predicate::Exists { path } => match lookup(scope, path) {
            Some(value) if !value.is_null() => Ok(Verdict::pass()),
            _ => Ok(Verdict::fail(format!("expected '{path}' to exist"))),
        },

        Predicate::Equals { path, value } => match lookup(scope, path) {
            Some(actual) if json_eq(&actual, value) => Ok(Verdict::pass()),
            Some(actual) => Ok(Verdict::fail(format!("expected '{path}' == {value}, got {actual}"))),
            None => Ok(Verdict::fail(format!("expected '{path}' == {value}, but the attribute is absent"))),
        },

        Predicate::Matches { path, pattern } => {
            let Some(Value::String(actual)) = lookup(scope, path) else {
                return Ok(Verdict::fail(format!("expected '{path}' to be a string matching /{pattern}/")));
            };
            // Patterns were compiled once during profile validation; a
            // recompile failure here means the profile bypassed binding.
            match regex::Regex::new(pattern) {
                Ok(re) if re.is_match(&actual) => Ok(Verdict::pass()),
                Ok(_) => Ok(Verdict::fail(format!("expected '{path}' to match /{pattern}/, got '{actual}'"))),
                Err(e) => Ok(Verdict::fail(format!("invalid pattern /{pattern}/: {e}"))),
            }
        }

        Predicate::Includes { path, value } => match lookup(scope, path) {
            Some(Value::Array(items)) if items.iter().any(|item| json_eq(item, value)) => Ok(Verdict::pass()),
            Some(Value::String(actual))
                if value.as_str().is_some_and(|needle| actual.contains(needle)) =>
            {
                Ok(Verdict::pass())
            }
            _ => Ok(Verdict::fail(format!("expected '{path}' to include {value}"))),
        },

        Predicate::Compare { path, op, value } => {
            let actual = lookup(scope, path);
            match (actual.as_ref().and_then(as_number), as_number(value)) {
                (Some(lhs), Some(rhs)) if op.holds(lhs, rhs) => Ok(Verdict::pass()),
                _ => Ok(Verdict::fail(format!(
                    "expected '{path}' {op} {value}, got {}",
                    actual.unwrap_or(Value::Null)
                ))),
            }
        }

        Predicate::Any { path, predicates } => match lookup(scope, path) {
            Some(Value::Array(items)) => {
                for item in &items {
                    if eval_predicates(predicates, item, cache, visited).await?.holds {
                        return Ok(Verdict::pass());
                    }
                }
                Ok(Verdict::fail(format!("no element of '{path}' satisfied the predicate")))
            }
            _ => Ok(Verdict::fail(format!("expected '{path}' to be a list"))),
        },

        Predicate::All { path, predicates } => match lookup(scope, path) {
            Some(Value::Array(items)) => {
                for item in &items {
                    let verdict = eval_predicates(predicates, item, cache, visited).await?;
                    if !verdict.holds {
                        return Ok(Verdict::fail(format!(
                            "an element of '{path}' failed: {}",
                            verdict.reason.unwrap_or_default()
                        )));
                    }
                }
                Ok(Verdict::pass())
            }
            _ => Ok(Verdict::fail(format!("expected '{path}' to be a list"))),
        },

        Predicate::CrossResource { resource, selector, predicates } => {
            eval_cross_resource(resource, selector, predicates, scope, cache, visited).await
        }
    }
}

async fn eval_cross_resource(
    resource: &str,
    selector: &BTreeMap<String, String>,
    predicates: &[Predicate],
    scope: &Value,
    cache: &SnapshotCache,
    visited: &[String],
) -> Result<Verdict, LookupError> {
    // Resolve each selector value against the current snapshot. At most one
    // path may resolve to a list; that one fans out to a resource per
    // element.
    let mut fixed: BTreeMap<String, String> = BTreeMap::new();
    let mut fan_out: Option<(String, Vec<String>)> = None;

    for (key, path) in selector {
        let Some(value) = lookup(scope, path) else {
            return Ok(Verdict::fail(format!("selector path '{path}' is absent")));
        };
        match value {
            Value::Array(items) => {
                if fan_out.is_some() {
                    return Ok(Verdict::fail("more than one selector path resolved to a list"));
                }
                let mut rendered = Vec::with_capacity(items.len());
                for item in &items {
                    let Some(s) = scalar_to_string(item) else {
                        return Ok(Verdict::fail(format!("selector path '{path}' contains a non-scalar element")));
                    };
                    rendered.push(s);
                }
                fan_out = Some((key.clone(), rendered));
            }
            other => {
                let Some(s) = scalar_to_string(&other) else {
                    return Ok(Verdict::fail(format!("selector path '{path}' is not a scalar")));
                };
                let _ = fixed.insert(key.clone(), s);
            }
        }
    }

    let selectors: Vec<BTreeMap<String, String>> = match fan_out {
        Some((key, values)) => values
            .into_iter()
            .map(|value| {
                let mut s = fixed.clone();
                let _ = s.insert(key.clone(), value);
                s
            })
            .collect(),
        None => vec![fixed],
    };

    // An empty fan-out (the list attribute was empty) passes vacuously,
    // mirroring `All`.
    for selector in selectors {
        let descriptor = ResourceDescriptor::new(resource, selector);
        let key = descriptor.cache_key();

        if visited.contains(&key) {
            return Ok(Verdict::fail(format!("cyclic reference through {descriptor}")));
        }

        let snapshot = match cache.get_or_fetch(&descriptor).await {
            Ok(snapshot) => snapshot,
            Err(failure) => return Err(LookupError { descriptor, failure }),
        };

        let mut inner = visited.to_vec();
        inner.push(key);
        let verdict = eval_predicates(predicates, snapshot.root(), cache, &inner).await?;
        if !verdict.holds {
            return Ok(Verdict::fail(format!(
                "{descriptor} failed: {}",
                verdict.reason.unwrap_or_default()
            )));
        }
    }

    Ok(Verdict::pass())
}

/// The single coercion rule for scalar comparison: numbers compare as f64,
/// numeric strings parse to numbers, and "true"/"false" strings compare
/// against booleans. Anything else falls back to strict JSON equality.
fn json_eq(actual: &Value, expected: &Value) -> bool {
    if let (Some(lhs), Some(rhs)) = (as_number(actual), as_number(expected)) {
        return (lhs - rhs).abs() < f64::EPSILON;
    }

    match (actual, expected) {
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => match s.as_str() {
            "true" => *b,
            "false" => !*b,
            _ => false,
        },
        _ => actual == expected,
    }
}

/// Numeric normalization: numbers as f64, strings via parse. Parse failure
/// is `None`, which makes the enclosing comparison fail rather than error.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
