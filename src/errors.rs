// src/errors.rs
//
// Domain error taxonomy (spec §7, ERROR HANDLING DESIGN). Configuration-time
// failures are non-fatal to the process (the offending unit is skipped and
// logged); initialization-time failures are fatal to the engine. Both are
// represented the way the teacher represents user-facing DSL errors: a kind
// enum plus a human-readable context chain, not a stringly-typed message.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigErrorKind {
    FileNotOpenable,
    NotValidJson,
    MissingComponentName,
    MissingFields,
    MissingAlgorithm,
}

/// A configuration-time failure. Always recovered at the call site: the
/// offending component or field is skipped and this is logged, never
/// propagated as a hard error (spec §7).
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub context: Vec<String>,
}

impl ConfigError {
    fn new(kind: ConfigErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            context: vec![msg.into()],
        }
    }

    pub fn file_not_openable(path: impl fmt::Display) -> Self {
        Self::new(
            ConfigErrorKind::FileNotOpenable,
            format!("could not open config file {path}"),
        )
    }

    pub fn not_valid_json(path: impl fmt::Display, err: impl fmt::Display) -> Self {
        Self::new(
            ConfigErrorKind::NotValidJson,
            format!("{path} did not parse as JSON: {err}"),
        )
    }

    pub fn missing_component_name(path: impl fmt::Display) -> Self {
        Self::new(
            ConfigErrorKind::MissingComponentName,
            format!("{path} is missing \"component_name\""),
        )
    }

    pub fn missing_fields(path: impl fmt::Display) -> Self {
        Self::new(
            ConfigErrorKind::MissingFields,
            format!("{path} is missing \"fields\""),
        )
    }

    pub fn missing_algorithm(component: &str, field_name: &str) -> Self {
        Self::new(
            ConfigErrorKind::MissingAlgorithm,
            format!("{component}.{field_name} is missing \"algorithm\""),
        )
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context.join("; "))
    }
}

impl std::error::Error for ConfigError {}

/// Initialization-time failure: circular or dangling field dependency.
/// Fatal to the whole engine — the enclosing process should abort startup
/// (spec §7, "Initialization (fatal to the engine)").
#[derive(Debug, Clone)]
pub struct EngineInitError {
    pub message: String,
}

impl EngineInitError {
    pub fn cycle_or_dangling(unresolved: &[String]) -> Self {
        Self {
            message: format!(
                "dependency resolution stalled with {} unresolved field(s): {}",
                unresolved.len(),
                unresolved.join(", ")
            ),
        }
    }
}

impl fmt::Display for EngineInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine initialization failed: {}", self.message)
    }
}

impl std::error::Error for EngineInitError {}
