use crate::Result;
use ohno::app_err;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Comparison operators for [`Predicate::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
}

impl CompareOp {
    pub(crate) fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Eq => (lhs - rhs).abs() < f64::EPSILON,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
        }
    }
}

impl core::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let symbol = match self {
            Self::Eq => "==",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        };
        write!(f, "{symbol}")
    }
}

/// One boolean test over a resource snapshot.
///
/// Lists of predicates compose via implicit AND. `Any` and `All` scope
/// their sub-predicates to each element of a list attribute. `CrossResource`
/// scopes its sub-predicates to a *related* resource whose selector values
/// are attribute paths into the current snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum Predicate {
    /// The attribute path resolves to a non-null value.
    Exists { path: String },

    /// The attribute equals `value`, with lenient scalar coercion.
    Equals { path: String, value: Value },

    /// The string attribute matches `pattern`. Non-string operands fail.
    Matches { path: String, pattern: String },

    /// A list attribute contains an element equal to `value`, or a string
    /// attribute contains `value` as a substring.
    Includes { path: String, value: Value },

    /// Numeric comparison. String operands are parsed as numbers; a failed
    /// parse fails the comparison rather than erroring.
    Compare { path: String, op: CompareOp, value: Value },

    /// At least one element of the list attribute satisfies every
    /// sub-predicate. Empty lists fail.
    Any { path: String, predicates: Vec<Predicate> },

    /// Every element of the list attribute satisfies every sub-predicate.
    /// Empty lists pass vacuously.
    All { path: String, predicates: Vec<Predicate> },

    /// Resolve a related resource and apply the sub-predicates to it.
    ///
    /// Selector values are attribute paths into the current snapshot. A
    /// path resolving to a list fans out: one related resource is resolved
    /// per element and all must satisfy the sub-predicates.
    CrossResource {
        resource: String,
        selector: BTreeMap<String, String>,
        predicates: Vec<Predicate>,
    },
}

impl Predicate {
    /// Structural validation, run after binding and before any fetch:
    /// regex patterns must compile and nested predicate lists must be
    /// non-empty. Fails fast so a malformed profile never starts a run.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Exists { .. } | Self::Equals { .. } | Self::Includes { .. } | Self::Compare { .. } => Ok(()),
            Self::Matches { path, pattern } => {
                let _ = regex::Regex::new(pattern).map_err(|e| app_err!("invalid pattern for '{path}': {e}"))?;
                Ok(())
            }
            Self::Any { path, predicates } | Self::All { path, predicates } => {
                validate_non_empty(predicates, path)
            }
            Self::CrossResource { resource, selector, predicates } => {
                if selector.is_empty() {
                    return Err(app_err!("cross-resource predicate for '{resource}' has an empty selector"));
                }
                validate_non_empty(predicates, resource)
            }
        }
    }
}

fn validate_non_empty(predicates: &[Predicate], context: &str) -> Result<()> {
    if predicates.is_empty() {
        return Err(app_err!("nested predicate list for '{context}' is empty"));
    }
    for predicate in predicates {
        predicate.validate()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialize_tagged_variants() {
        let p: Predicate = serde_json::from_value(json!({"kind": "equals", "path": "state", "value": "available"})).unwrap();
        assert_eq!(
            p,
            Predicate::Equals {
                path: "state".to_string(),
                value: json!("available")
            }
        );

        let p: Predicate = serde_json::from_value(json!({"kind": "compare", "path": "cpu", "op": ">=", "value": 512})).unwrap();
        assert!(matches!(p, Predicate::Compare { op: CompareOp::Ge, .. }));
    }

    #[test]
    fn deserialize_rejects_malformed_predicates() {
        let missing_path: core::result::Result<Predicate, _> = serde_json::from_value(json!({"kind": "exists"}));
        assert!(missing_path.is_err());

        let unknown_kind: core::result::Result<Predicate, _> =
            serde_json::from_value(json!({"kind": "sounds_like", "path": "state"}));
        assert!(unknown_kind.is_err());
    }

    #[test]
    fn serialization_round_trips() {
        let p = Predicate::Any {
            path: "inbound_rules".to_string(),
            predicates: vec![Predicate::Includes {
                path: "ports".to_string(),
                value: json!(443),
            }],
        };
        let text = serde_json::to_string(&p).unwrap();
        let back: Predicate = serde_json::from_str(&text).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn validate_accepts_well_formed_patterns() {
        let p = Predicate::Matches {
            path: "db_instance_class".to_string(),
            pattern: r"(db\.t3\.medium|db\.m5|db\.r5)".to_string(),
        };
        p.validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_patterns() {
        let p = Predicate::Matches {
            path: "name".to_string(),
            pattern: "(unclosed".to_string(),
        };
        let _ = p.validate().unwrap_err();
    }

    #[test]
    fn validate_rejects_empty_nested_lists() {
        let p = Predicate::Any {
            path: "rules".to_string(),
            predicates: vec![],
        };
        let _ = p.validate().unwrap_err();

        let p = Predicate::CrossResource {
            resource: "aws_subnet".to_string(),
            selector: BTreeMap::new(),
            predicates: vec![Predicate::Exists { path: "state".to_string() }],
        };
        let _ = p.validate().unwrap_err();
    }

    #[test]
    fn validate_recurses_into_nested_predicates() {
        let p = Predicate::All {
            path: "rules".to_string(),
            predicates: vec![Predicate::Matches {
                path: "name".to_string(),
                pattern: "(unclosed".to_string(),
            }],
        };
        let _ = p.validate().unwrap_err();
    }

    #[test]
    fn compare_op_display() {
        assert_eq!(CompareOp::Ge.to_string(), ">=");
        assert_eq!(CompareOp::Eq.to_string(), "==");
    }

    #[test]
    fn compare_op_holds() {
        assert!(CompareOp::Ge.holds(14.0, 14.0));
        assert!(CompareOp::Gt.holds(15.0, 14.0));
        assert!(!CompareOp::Lt.holds(15.0, 14.0));
        assert!(CompareOp::Eq.holds(1.0, 1.0));
    }
}
