//! Bind-time resolution of profile documents.
//!
//! Binding turns a [`ProfileDoc`] into a [`Profile`] ready to run: input
//! values resolve (defaults, then command-line overrides), every `#{...}`
//! template substitutes exactly once, `only_if` preconditions collapse to a
//! per-control active flag, and structural invariants (unique ids, impact
//! range, predicate well-formedness) are checked. Binding failures are
//! fatal: a profile that cannot be fully bound is never partially run.

use super::doc::{AssertionDoc, AssertionMode, ControlDoc, ProfileDoc};
use super::template::substitute;
use crate::Result;
use crate::eval::Predicate;
use crate::resource::ResourceDescriptor;
use ohno::app_err;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// A fully bound, validated profile. No templates remain.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub inputs: BTreeMap<String, String>,
    pub controls: Vec<Control>,
}

/// One bound control.
#[derive(Debug, Clone)]
pub struct Control {
    pub id: String,
    pub impact: f64,
    pub title: String,
    pub description: Option<String>,

    /// False when the control's `only_if` precondition did not hold at bind
    /// time; the runner reports such controls as `Skip` without fetching.
    pub active: bool,

    pub assertions: Vec<Assertion>,
}

/// One bound assertion: a concrete descriptor plus its predicates.
#[derive(Debug, Clone)]
pub struct Assertion {
    pub resource_type: String,
    pub selector: BTreeMap<String, String>,
    pub mode: AssertionMode,
    pub absent: bool,
    pub predicates: Vec<Predicate>,
}

impl Assertion {
    #[must_use]
    pub fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor::new(&self.resource_type, self.selector.clone())
    }
}

impl ProfileDoc {
    /// Bind this document against command-line input overrides.
    pub fn bind(&self, overrides: &BTreeMap<String, String>) -> Result<Profile> {
        let inputs = self.resolve_inputs(overrides)?;

        let mut seen = BTreeSet::new();
        let mut controls = Vec::with_capacity(self.controls.len());
        for control in &self.controls {
            if !seen.insert(control.id.clone()) {
                return Err(app_err!("duplicate control id '{}'", control.id));
            }
            controls.push(bind_control(control, &inputs)?);
        }

        Ok(Profile {
            name: self.name.clone(),
            inputs,
            controls,
        })
    }

    fn resolve_inputs(&self, overrides: &BTreeMap<String, String>) -> Result<BTreeMap<String, String>> {
        for name in overrides.keys() {
            if !self.inputs.contains_key(name) {
                return Err(app_err!("input '{name}' is not declared by profile '{}'", self.name));
            }
        }

        let mut resolved = BTreeMap::new();
        for (name, decl) in &self.inputs {
            let value = overrides.get(name).cloned().or_else(|| decl.default.as_ref().map(super::doc::InputValue::render));
            match value {
                Some(value) => {
                    let _ = resolved.insert(name.clone(), value);
                }
                None if decl.required => {
                    return Err(app_err!("required input '{name}' has no value (pass --input {name}=...)"));
                }
                None => {}
            }
        }
        Ok(resolved)
    }
}

fn bind_control(doc: &ControlDoc, inputs: &BTreeMap<String, String>) -> Result<Control> {
    if !(0.0..=1.0).contains(&doc.impact) {
        return Err(app_err!("control '{}' has impact {} outside [0.0, 1.0]", doc.id, doc.impact));
    }
    if doc.assertions.is_empty() {
        return Err(app_err!("control '{}' has no assertions", doc.id));
    }

    let active = match &doc.only_if {
        Some(template) => {
            let rendered = substitute(template, inputs).map_err(|e| app_err!("in only_if of control '{}': {e}", doc.id))?;
            match rendered.as_str() {
                "true" => true,
                "false" => false,
                other => {
                    return Err(app_err!(
                        "only_if of control '{}' must render to \"true\" or \"false\", got '{other}'",
                        doc.id
                    ));
                }
            }
        }
        None => true,
    };

    let assertions = doc
        .assertions
        .iter()
        .map(|assertion| bind_assertion(assertion, inputs).map_err(|e| app_err!("in control '{}': {e}", doc.id)))
        .collect::<Result<Vec<_>>>()?;

    Ok(Control {
        id: doc.id.clone(),
        impact: doc.impact,
        title: doc.title.clone(),
        description: doc.description.clone(),
        active,
        assertions,
    })
}

fn bind_assertion(doc: &AssertionDoc, inputs: &BTreeMap<String, String>) -> Result<Assertion> {
    if doc.absent && !doc.predicates.is_empty() {
        return Err(app_err!("an 'absent' assertion on '{}' cannot carry predicates", doc.resource));
    }
    if doc.absent && doc.mode != AssertionMode::Single {
        return Err(app_err!("an 'absent' assertion on '{}' must use mode 'single'", doc.resource));
    }
    if !doc.absent && doc.predicates.is_empty() {
        return Err(app_err!("assertion on '{}' has no predicates", doc.resource));
    }

    let mut selector = BTreeMap::new();
    for (key, template) in &doc.selector {
        let _ = selector.insert(key.clone(), substitute(template, inputs)?);
    }

    let predicates = doc
        .predicates
        .iter()
        .map(|predicate| bind_predicate(predicate, inputs))
        .collect::<Result<Vec<_>>>()?;
    for predicate in &predicates {
        predicate.validate()?;
    }

    Ok(Assertion {
        resource_type: substitute(&doc.resource, inputs)?,
        selector,
        mode: doc.mode,
        absent: doc.absent,
        predicates,
    })
}

/// Substitute templates in every string-valued operand of a predicate tree.
/// Cross-resource selector values are attribute paths, not templates, and
/// pass through untouched.
fn bind_predicate(predicate: &Predicate, inputs: &BTreeMap<String, String>) -> Result<Predicate> {
    Ok(match predicate {
        Predicate::Exists { path } => Predicate::Exists { path: path.clone() },
        Predicate::Equals { path, value } => Predicate::Equals {
            path: path.clone(),
            value: bind_value(value, inputs)?,
        },
        Predicate::Matches { path, pattern } => Predicate::Matches {
            path: path.clone(),
            pattern: substitute(pattern, inputs)?,
        },
        Predicate::Includes { path, value } => Predicate::Includes {
            path: path.clone(),
            value: bind_value(value, inputs)?,
        },
        Predicate::Compare { path, op, value } => Predicate::Compare {
            path: path.clone(),
            op: *op,
            value: bind_value(value, inputs)?,
        },
        Predicate::Any { path, predicates } => Predicate::Any {
            path: path.clone(),
            predicates: bind_predicates(predicates, inputs)?,
        },
        Predicate::All { path, predicates } => Predicate::All {
            path: path.clone(),
            predicates: bind_predicates(predicates, inputs)?,
        },
        Predicate::CrossResource { resource, selector, predicates } => Predicate::CrossResource {
            resource: substitute(resource, inputs)?,
            selector: selector.clone(),
            predicates: bind_predicates(predicates, inputs)?,
        },
    })
}

fn bind_predicates(predicates: &[Predicate], inputs: &BTreeMap<String, String>) -> Result<Vec<Predicate>> {
    predicates.iter().map(|predicate| bind_predicate(predicate, inputs)).collect()
}

fn bind_value(value: &Value, inputs: &BTreeMap<String, String>) -> Result<Value> {
    match value {
        Value::String(template) => Ok(Value::String(substitute(template, inputs)?)),
        other => Ok(other.clone()),
    }
}
