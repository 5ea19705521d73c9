use std::collections::BTreeMap;

use crate::app::{BridgeError, Result};

/// Declaration of one bridge parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub default: Option<&'static str>,
    /// Allowed `(label, value)` pairs. Empty means free text.
    pub values: &'static [(&'static str, &'static str)],
    pub example: Option<&'static str>,
}

impl ParameterSpec {
    pub const fn text(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            required: false,
            default: None,
            values: &[],
            example: None,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn default_value(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    pub const fn values(mut self, values: &'static [(&'static str, &'static str)]) -> Self {
        self.values = values;
        self
    }

    pub const fn example(mut self, example: &'static str) -> Self {
        self.example = Some(example);
        self
    }

    fn accepts(&self, value: &str) -> bool {
        self.values.is_empty() || self.values.iter().any(|(_, v)| *v == value)
    }
}

/// A named, mutually exclusive parameter group.
#[derive(Debug, Clone, Copy)]
pub struct ContextSpec {
    pub name: &'static str,
    pub parameters: &'static [ParameterSpec],
}

impl ContextSpec {
    fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Caller-supplied parameters. Blank values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters(BTreeMap<String, String>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        let value = value.trim();
        if !value.is_empty() {
            self.0.insert(name.into(), value.to_string());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// The single context selected for a run, with defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContext {
    pub name: &'static str,
    pub values: BTreeMap<String, String>,
}

impl ResolvedContext {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// A value the context declared as required, or a config error.
    pub fn require(&self, bridge: &str, name: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| {
            BridgeError::config(bridge, format!("missing parameter '{}' for {}", name, self.name))
        })
    }
}

/// Pick the one context whose required parameters are all supplied and which
/// declares every supplied parameter. Depends only on `parameters`.
pub fn select_context(
    bridge: &str,
    contexts: &'static [ContextSpec],
    parameters: &Parameters,
) -> Result<ResolvedContext> {
    let supplied: Vec<&str> = parameters.keys().collect();

    let candidates: Vec<&'static ContextSpec> = contexts
        .iter()
        .filter(|ctx| {
            ctx.parameters
                .iter()
                .filter(|p| p.required)
                .all(|p| parameters.get(p.name).is_some())
                && supplied.iter().all(|key| ctx.parameter(key).is_some())
        })
        .collect();

    let context = match candidates.as_slice() {
        [single] => *single,
        [] => {
            let unknown: Vec<&str> = supplied
                .iter()
                .copied()
                .filter(|key| contexts.iter().all(|ctx| ctx.parameter(key).is_none()))
                .collect();
            let message = if unknown.is_empty() {
                format!(
                    "no context matches parameters [{}]; expected one of: {}",
                    supplied.join(", "),
                    describe(contexts)
                )
            } else {
                format!("unknown parameter(s): {}", unknown.join(", "))
            };
            return Err(BridgeError::config(bridge, message));
        }
        several => {
            let names: Vec<&str> = several.iter().map(|c| c.name).collect();
            return Err(BridgeError::config(
                bridge,
                format!("parameters match several contexts: {}", names.join(", ")),
            ));
        }
    };

    let mut values = BTreeMap::new();
    for spec in context.parameters {
        match parameters.get(spec.name) {
            Some(value) if !spec.accepts(value) => {
                return Err(BridgeError::config(
                    bridge,
                    format!("invalid value '{}' for parameter '{}'", value, spec.name),
                ));
            }
            Some(value) => {
                values.insert(spec.name.to_string(), value.to_string());
            }
            None => {
                if let Some(default) = spec.default {
                    values.insert(spec.name.to_string(), default.to_string());
                }
            }
        }
    }

    Ok(ResolvedContext {
        name: context.name,
        values,
    })
}

fn describe(contexts: &[ContextSpec]) -> String {
    contexts
        .iter()
        .map(|ctx| {
            let required: Vec<&str> = ctx
                .parameters
                .iter()
                .filter(|p| p.required)
                .map(|p| p.name)
                .collect();
            format!("{}({})", ctx.name, required.join(", "))
        })
        .collect::<Vec<_>>()
        .join(", ")
}
