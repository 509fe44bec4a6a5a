//! Immutable point-in-time views of cloud resources.
//!
//! A snapshot holds one resource's attributes as a JSON document addressed
//! by dot/bracket paths: `tags.Environment`, `inbound_rules[2].ports`,
//! `db_subnet_group.subnets[].subnet_identifier`. The `[]` segment projects
//! over every element of a list, collecting the remaining path's values.

use serde_json::Value;

/// An immutable attribute map for one cloud resource, produced once per run
/// per descriptor and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSnapshot {
    attributes: Value,
}

impl ResourceSnapshot {
    #[must_use]
    pub fn new(attributes: Value) -> Self {
        Self { attributes }
    }

    /// The full attribute document.
    #[must_use]
    pub const fn root(&self) -> &Value {
        &self.attributes
    }

    /// Resolve an attribute path, returning `None` when any segment is
    /// absent. Absence is a normal outcome, not a fault.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        lookup(&self.attributes, path)
    }
}

enum Segment<'a> {
    Field(&'a str),
    Index(usize),
    Each,
}

fn parse_path(path: &str) -> Option<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    for piece in path.split('.') {
        let (name, mut rest) = match piece.find('[') {
            Some(pos) => (&piece[..pos], &piece[pos..]),
            None => (piece, ""),
        };
        if name.is_empty() {
            return None;
        }
        segments.push(Segment::Field(name));
        while let Some(stripped) = rest.strip_prefix('[') {
            let close = stripped.find(']')?;
            let inner = &stripped[..close];
            if inner.is_empty() {
                segments.push(Segment::Each);
            } else {
                segments.push(Segment::Index(inner.parse().ok()?));
            }
            rest = &stripped[close + 1..];
        }
        if !rest.is_empty() {
            return None;
        }
    }
    Some(segments)
}

fn walk(value: &Value, segments: &[Segment<'_>]) -> Option<Value> {
    let Some((segment, rest)) = segments.split_first() else {
        return Some(value.clone());
    };

    match segment {
        Segment::Field(name) => walk(value.as_object()?.get(*name)?, rest),
        Segment::Index(index) => walk(value.as_array()?.get(*index)?, rest),
        Segment::Each => {
            // Project the remaining path over every element; elements that
            // lack the sub-path are dropped rather than poisoning the whole
            // projection (live APIs routinely return partial data).
            let items = value.as_array()?;
            Some(Value::Array(items.iter().filter_map(|item| walk(item, rest)).collect()))
        }
    }
}

/// Resolve a dot/bracket attribute path against a JSON document.
pub(crate) fn lookup(value: &Value, path: &str) -> Option<Value> {
    let segments = parse_path(path)?;
    walk(value, &segments)
}

/// Render a scalar JSON value as the string form used for selector matching.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
