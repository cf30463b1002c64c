//! Alias tables
//!
//! A [`CommandAlias`] names a legacy command and the target command it is
//! forwarded to. Its [`ParameterRule`]s say which supplied parameter becomes
//! which target parameter. Rules that share a target parameter form a
//! precedence group: the first declared rule whose source is present wins
//! and the rest of the group is skipped.

use serde::{Deserialize, Serialize};

use crate::command::InvocationContext;

/// How a supplied value is turned into the forwarded value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ValueTransform {
    /// Forward the raw text unchanged
    #[default]
    Identity,
    /// Forward the given constant when the source is present but empty
    DefaultIfEmpty(String),
    /// Forward the given constant whenever the source is present
    Constant(String),
}

impl ValueTransform {
    /// Apply the transform to a supplied raw value
    pub fn apply(&self, raw: &str) -> String {
        match self {
            Self::Identity => raw.to_string(),
            Self::DefaultIfEmpty(value) if raw.trim().is_empty() => value.clone(),
            Self::DefaultIfEmpty(_) => raw.to_string(),
            Self::Constant(value) => value.clone(),
        }
    }
}

/// Mapping of one legacy parameter onto one target parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRule {
    /// Legacy parameter name, matched case-insensitively
    pub source: String,
    /// Target parameter name
    pub target: String,
    /// Value transform
    #[serde(default)]
    pub transform: ValueTransform,
}

impl ParameterRule {
    /// Rule forwarding `source` as `target` unchanged
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into().to_ascii_uppercase(),
            target: target.into(),
            transform: ValueTransform::Identity,
        }
    }

    /// Rule forwarding `source` under its own name
    pub fn passthrough(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), name)
    }

    /// Replace the value transform
    pub fn with_transform(mut self, transform: ValueTransform) -> Self {
        self.transform = transform;
        self
    }
}

/// A dispatch emitted ahead of the alias' own target command
///
/// Fires only when every parameter in `requires_all` and at least one in
/// `requires_any` (if non-empty) was supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainedDispatch {
    /// Command invoked by the chained dispatch
    pub target: String,
    /// Legacy parameters that must all be present
    #[serde(default)]
    pub requires_all: Vec<String>,
    /// Legacy parameters of which at least one must be present
    #[serde(default)]
    pub requires_any: Vec<String>,
    /// Target parameters copied from the primary dispatch
    #[serde(default)]
    pub carry: Vec<String>,
    /// Parameters always set on this dispatch
    #[serde(default)]
    pub fixed: Vec<(String, String)>,
    /// Rules applied to the supplied parameters for this dispatch
    #[serde(default)]
    pub rules: Vec<ParameterRule>,
}

impl ChainedDispatch {
    /// Create a chained dispatch with no conditions
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            requires_all: Vec::new(),
            requires_any: Vec::new(),
            carry: Vec::new(),
            fixed: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Require a legacy parameter to be present
    pub fn requires(mut self, name: impl Into<String>) -> Self {
        self.requires_all.push(name.into().to_ascii_uppercase());
        self
    }

    /// Require at least one of the given legacy parameters
    pub fn requires_any_of<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires_any
            .extend(names.into_iter().map(|n| n.into().to_ascii_uppercase()));
        self
    }

    /// Copy a resolved target parameter from the primary dispatch
    pub fn carry(mut self, target: impl Into<String>) -> Self {
        self.carry.push(target.into());
        self
    }

    /// Add a parameter rule
    pub fn rule(mut self, rule: ParameterRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Always set a target parameter
    pub fn fixed(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fixed.push((name.into(), value.into()));
        self
    }

    /// Whether the supplied parameters satisfy the firing conditions
    pub fn is_triggered(&self, supplied: &InvocationContext) -> bool {
        let all = self.requires_all.iter().all(|n| supplied.contains(n));
        let any = self.requires_any.is_empty()
            || self.requires_any.iter().any(|n| supplied.contains(n));
        all && any
    }
}

/// Legacy command and the rules that translate it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandAlias {
    /// Legacy command name, e.g. `M106`
    pub name: String,
    /// Target command name
    pub target: String,
    /// Human readable summary shown by listings
    #[serde(default)]
    pub description: String,
    /// Parameters always set on the target dispatch
    #[serde(default)]
    pub fixed: Vec<(String, String)>,
    /// Parameter rules in precedence order
    #[serde(default)]
    pub rules: Vec<ParameterRule>,
    /// Dispatches emitted before the target dispatch
    #[serde(default)]
    pub chained: Vec<ChainedDispatch>,
}

impl CommandAlias {
    /// Create an alias with no rules
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            target: target.into(),
            description: String::new(),
            fixed: Vec::new(),
            rules: Vec::new(),
            chained: Vec::new(),
        }
    }

    /// Add a parameter rule; declaration order is precedence order
    pub fn rule(mut self, rule: ParameterRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Always set a target parameter
    pub fn fixed(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fixed.push((name.into(), value.into()));
        self
    }

    /// Add a chained dispatch
    pub fn chain(mut self, chained: ChainedDispatch) -> Self {
        self.chained.push(chained);
        self
    }

    /// Set the description
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Legacy parameter names this alias reacts to
    pub fn recognized_params(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let sources = self.rules.iter().map(|r| r.source.as_str()).chain(
            self.chained.iter().flat_map(|c| {
                c.rules
                    .iter()
                    .map(|r| r.source.as_str())
                    .chain(c.requires_all.iter().map(String::as_str))
                    .chain(c.requires_any.iter().map(String::as_str))
            }),
        );
        for name in sources {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name);
            }
        }
        names
    }
}
