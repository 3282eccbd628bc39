// src/model.rs
//
// The data model shared by every simulation component: scalar values,
// algorithm tags, fields and the components that own them.
//
// Mirrors the "Newtype + Polymorphic Engine" split the orchestrator used for
// scientific jobs: a typed enum tag drives dispatch (engine.rs), while the
// algorithm-specific numbers stay in a loosely-typed `params` bag so that
// configuration authors can add keys without touching this crate.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// A scalar simulated quantity. Float-only today; the container is
/// open-ended so integer/boolean variants can be added later without
/// touching the wire protocol (spec DATA MODEL, "Value").
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Float(f32),
}

impl Value {
    pub fn as_f32(self) -> f32 {
        match self {
            Value::Float(v) => v,
        }
    }

    /// Wire representation: four bytes, network (big-endian) byte order.
    pub fn to_be_bytes(self) -> [u8; 4] {
        self.as_f32().to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Value::Float(f32::from_be_bytes(bytes))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

/// The algorithm a field advances by. This is a pure dispatch tag —
/// the parameters it reads live in `Field::params`, preserved verbatim from
/// configuration (spec §4.3, "Output").
///
/// `rapid-ramp-decreasing`/`rapid-ramp-increasing` accept the config-file
/// aliases `fast-linear-decrease-at-constant-rate`/
/// `fast-linear-increase-at-constant-rate`: both names describe the same
/// latch-then-constant-rate behavior in different configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmKind {
    PeriodicOscillation,
    LinearRampDecreasing,
    LinearRampIncreasing,
    #[serde(alias = "fast-linear-decrease-at-constant-rate")]
    RapidRampDecreasing,
    #[serde(alias = "fast-linear-increase-at-constant-rate")]
    RapidRampIncreasing,
    DerivedFormula,
    ExternallySourced,
}

impl AlgorithmKind {
    /// True for the rapid variants that share the one-shot current-value
    /// latch (spec §4.5.1, "one-shot latch").
    pub fn uses_latch(self) -> bool {
        matches!(
            self,
            AlgorithmKind::RapidRampDecreasing | AlgorithmKind::RapidRampIncreasing
        )
    }
}

/// The fundamental simulated variable (spec §3, "Field").
#[derive(Debug, Clone)]
pub struct Field {
    pub field_name: String,
    pub component_name: String,

    pub algorithm: AlgorithmKind,
    pub starting_algorithm: AlgorithmKind,

    /// Algorithm-specific parameters, carried through from configuration
    /// verbatim (not re-typed). Also holds any params configured for a
    /// fault-swap algorithm the field is not currently running, e.g. a
    /// periodic-oscillation field still carries `end_value`/
    /// `rapid_duration_seconds` for the rapid-ramp the fault injector may
    /// switch it to.
    pub params: Json,

    pub depends_on: Vec<String>,

    pub start_time: f32,
    pub run_time: f32,
    pub active: bool,

    pub current_value: f32,
    pub previous_value: f32,

    /// One-shot latch for rapid/fast algorithms: the value captured the
    /// instant the algorithm was entered. `None` until first evaluated.
    pub rapid_algo_initialized: Option<f32>,

    /// One-shot latch: true once the field has been seeded with its
    /// algorithm's starting value.
    pub initialized: bool,
}

impl Field {
    pub fn new(
        field_name: String,
        component_name: String,
        algorithm: AlgorithmKind,
        params: Json,
        depends_on: Vec<String>,
    ) -> Self {
        Self {
            field_name,
            component_name,
            algorithm,
            starting_algorithm: algorithm,
            params,
            depends_on,
            start_time: 0.0,
            run_time: 0.0,
            active: true,
            current_value: 0.0,
            previous_value: 0.0,
            rapid_algo_initialized: None,
            initialized: false,
        }
    }

    pub fn param_f32(&self, key: &str, default: f32) -> f32 {
        self.params
            .get(key)
            .and_then(Json::as_f64)
            .map(|v| v as f32)
            .unwrap_or(default)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Json::as_str)
    }
}

/// A named collection of fields with shared start/stop/reset lifecycle
/// (spec §3, "Component").
///
/// Each suit component carries its own `switches`: "eva1" and "eva2" are
/// independent crew members with independent DCU panels, so the gating
/// state cannot be shared engine-wide (a lesson learned reading the DCU
/// write paths in §4.7, which are qualified per-suit: `dcu.eva1.*` vs.
/// `dcu.eva2.*`).
#[derive(Debug, Clone)]
pub struct Component {
    pub component_name: String,
    pub fields: Vec<Field>,
    pub running: bool,
    pub simulation_time: f32,
    pub switches: SwitchState,
}

impl Component {
    pub fn new(component_name: String, fields: Vec<Field>) -> Self {
        Self {
            component_name,
            fields,
            running: false,
            simulation_time: 0.0,
            switches: SwitchState::default(),
        }
    }

    pub fn find_field(&self, field_name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.field_name == field_name)
    }

    pub fn find_field_mut(&mut self, field_name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.field_name == field_name)
    }
}

/// Compact bag of operator-panel switches that governs which of a pair of
/// redundant suit fields is "active" this tick (spec §3, "Operator switch
/// state").
#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchState {
    pub battery_lu: bool,
    pub battery_ps: bool,
    pub o2: bool,
    pub fan: bool,
    pub pump: bool,
    pub co2: bool,
}
