use crate::Result;
use crate::eval::Predicate;
use camino::Utf8Path;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

/// The one supported profile document version.
pub const PROFILE_VERSION: u32 = 1;

/// How an assertion's target descriptor maps to provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionMode {
    /// `fetch` one resource; the selector must identify it uniquely.
    #[default]
    Single,

    /// `enumerate` matching resources; every one must satisfy the
    /// predicates. An empty enumeration passes vacuously.
    All,

    /// `enumerate` matching resources; at least one must satisfy the
    /// predicates. An empty enumeration fails.
    Any,
}

/// A declared input: optional default, optionally required. An input with
/// neither a default nor a CLI-supplied value fails binding when required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputDecl {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub default: Option<InputValue>,
}

/// An input value as written in the profile or on the command line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    String(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
    List(Vec<String>),
}

impl InputValue {
    /// The string form used during template substitution. Lists render
    /// comma-joined so they can feed `includes`-style assertion values.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::List(items) => items.join(","),
        }
    }
}

/// One assertion as written in the profile: a templated descriptor plus the
/// predicates to hold over the resolved snapshot(s).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssertionDoc {
    pub resource: String,

    #[serde(default)]
    pub selector: BTreeMap<String, String>,

    #[serde(default)]
    pub mode: AssertionMode,

    /// Assert that the selector matches nothing. Mutually exclusive with
    /// `predicates`; a `ResourceNotFound` on this assertion is a pass.
    #[serde(default)]
    pub absent: bool,

    #[serde(default)]
    pub predicates: Vec<Predicate>,
}

/// One control as written in the profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlDoc {
    pub id: String,
    pub impact: f64,
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Bind-time precondition template. When it renders to anything other
    /// than "true" the control is reported as `Skip` and never fetches.
    #[serde(default)]
    pub only_if: Option<String>,

    pub assertions: Vec<AssertionDoc>,
}

/// A parsed (but unbound) profile document. Templates still contain
/// `#{...}` placeholders; call [`ProfileDoc::bind`] to resolve them.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileDoc {
    pub version: u32,
    pub name: String,

    #[serde(default)]
    pub inputs: BTreeMap<String, InputDecl>,

    #[serde(default)]
    pub controls: Vec<ControlDoc>,
}

impl ProfileDoc {
    /// Load a profile document from a TOML file.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = fs::read_to_string(path).into_app_err_with(|| format!("unable to read profile '{path}'"))?;
        let doc: Self = toml::from_str(&text).into_app_err_with(|| format!("unable to parse profile '{path}'"))?;
        doc.check_version()
    }

    /// Parse a profile document from TOML text.
    pub fn parse(text: &str) -> Result<Self> {
        let doc: Self = toml::from_str(text).into_app_err("unable to parse profile")?;
        doc.check_version()
    }

    fn check_version(self) -> Result<Self> {
        if self.version == PROFILE_VERSION {
            Ok(self)
        } else {
            Err(ohno::app_err!(
                "unsupported profile version {} (this build supports {PROFILE_VERSION})",
                self.version
            ))
        }
    }
}
