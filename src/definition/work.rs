// src/definition/work.rs

//! Work definitions: *what* an activity does.

use std::fmt;

use toml::{Table, Value};

use crate::errors::{EngineError, Result};

/// Kind of the pure composite activity (children are declared).
pub const COMPOSITE: &str = "composite";
/// Kind of the trigger scanner.
pub const TRIGGER_SCAN: &str = "trigger-scan";
/// Kind of the single-resource propagation activity.
pub const PROPAGATION: &str = "propagation";
/// Kind of the semi-composite propagation activity (one child per resource).
pub const MULTI_PROPAGATION: &str = "multi-propagation";

/// Typed, kind-specific part of a [`WorkDefinition`].
#[derive(Debug, Clone, PartialEq)]
pub enum WorkSpec {
    Composite,
    TriggerScan,
    Propagation {
        resource: String,
    },
    /// `None` means the resources are discovered from the repository.
    MultiPropagation {
        resources: Option<Vec<String>>,
    },
    /// Kind handled by an application-registered handler; parameters stay
    /// opaque and are available through [`WorkDefinition::parameters`].
    Custom,
}

/// Immutable description of the work an activity performs.
///
/// Built once through [`WorkDefinition::parse`]; there are no setters.
/// Tailoring that changes parameters produces a new value via
/// [`WorkDefinition::with_parameters`].
#[derive(Debug, Clone, PartialEq)]
pub struct WorkDefinition {
    kind: String,
    spec: WorkSpec,
    parameters: Table,
}

impl WorkDefinition {
    /// Validate `parameters` for `kind` and build the definition.
    ///
    /// Fails with [`EngineError::Configuration`] when a required parameter is
    /// missing, has the wrong type, or a built-in kind receives a parameter it
    /// does not know.
    pub fn parse(kind: &str, parameters: Table) -> Result<Self> {
        let kind = kind.trim();
        if kind.is_empty() {
            return Err(EngineError::configuration(
                "work definition kind must not be empty",
            ));
        }

        let spec = match kind {
            COMPOSITE => {
                reject_unknown(kind, &parameters, &[])?;
                WorkSpec::Composite
            }
            TRIGGER_SCAN => {
                reject_unknown(kind, &parameters, &[])?;
                WorkSpec::TriggerScan
            }
            PROPAGATION => {
                reject_unknown(kind, &parameters, &["resource"])?;
                WorkSpec::Propagation {
                    resource: required_str(kind, &parameters, "resource")?,
                }
            }
            MULTI_PROPAGATION => {
                reject_unknown(kind, &parameters, &["resources"])?;
                WorkSpec::MultiPropagation {
                    resources: optional_str_array(kind, &parameters, "resources")?,
                }
            }
            _ => WorkSpec::Custom,
        };

        Ok(Self {
            kind: kind.to_string(),
            spec,
            parameters,
        })
    }

    pub fn composite() -> Self {
        Self {
            kind: COMPOSITE.to_string(),
            spec: WorkSpec::Composite,
            parameters: Table::new(),
        }
    }

    pub fn trigger_scan() -> Self {
        Self {
            kind: TRIGGER_SCAN.to_string(),
            spec: WorkSpec::TriggerScan,
            parameters: Table::new(),
        }
    }

    pub fn propagation(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        let mut parameters = Table::new();
        parameters.insert("resource".to_string(), Value::String(resource.clone()));
        Self {
            kind: PROPAGATION.to_string(),
            spec: WorkSpec::Propagation { resource },
            parameters,
        }
    }

    pub fn multi_propagation(resources: Option<Vec<String>>) -> Self {
        let mut parameters = Table::new();
        if let Some(ref list) = resources {
            parameters.insert(
                "resources".to_string(),
                Value::Array(list.iter().cloned().map(Value::String).collect()),
            );
        }
        Self {
            kind: MULTI_PROPAGATION.to_string(),
            spec: WorkSpec::MultiPropagation { resources },
            parameters,
        }
    }

    /// Convenience for application kinds.
    pub fn custom(kind: &str, parameters: Table) -> Result<Self> {
        Self::parse(kind, parameters)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn spec(&self) -> &WorkSpec {
        &self.spec
    }

    pub fn parameters(&self) -> &Table {
        &self.parameters
    }

    /// New definition of the same kind with `overrides` merged over the
    /// current parameters. The result is validated like a fresh parse.
    pub fn with_parameters(&self, overrides: &Table) -> Result<Self> {
        let mut merged = self.parameters.clone();
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
        Self::parse(&self.kind, merged)
    }
}

impl fmt::Display for WorkDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)?;
        if self.parameters.is_empty() {
            return Ok(());
        }
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "({})", params.join(", "))
    }
}

fn reject_unknown(kind: &str, parameters: &Table, allowed: &[&str]) -> Result<()> {
    if let Some(key) = parameters.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(EngineError::configuration(format!(
            "work kind '{kind}' does not accept parameter '{key}'"
        )));
    }
    Ok(())
}

fn required_str(kind: &str, parameters: &Table, key: &str) -> Result<String> {
    match parameters.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) => Err(EngineError::configuration(format!(
            "work kind '{kind}': parameter '{key}' must not be empty"
        ))),
        Some(other) => Err(EngineError::configuration(format!(
            "work kind '{kind}': parameter '{key}' must be a string, got {}",
            other.type_str()
        ))),
        None => Err(EngineError::configuration(format!(
            "work kind '{kind}' requires parameter '{key}'"
        ))),
    }
}

fn optional_str_array(kind: &str, parameters: &Table, key: &str) -> Result<Option<Vec<String>>> {
    let Some(value) = parameters.get(key) else {
        return Ok(None);
    };

    let Value::Array(items) = value else {
        return Err(EngineError::configuration(format!(
            "work kind '{kind}': parameter '{key}' must be an array of strings, got {}",
            value.type_str()
        )));
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) if !s.trim().is_empty() => out.push(s.trim().to_string()),
            _ => {
                return Err(EngineError::configuration(format!(
                    "work kind '{kind}': parameter '{key}' must contain non-empty strings only"
                )));
            }
        }
    }
    Ok(Some(out))
}
