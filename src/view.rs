// src/view.rs
//
// JSON View Layer (spec §4.7, C7). A bidirectional adapter between the
// engine's in-memory fields and the on-disk JSON tree the browser console
// and the visual simulator read/write. The engine is the sole source of
// truth; this module is strictly a projection plus an ingestion funnel
// (spec DATA MODEL, "Ownership").

use std::fs;
use std::io;
use std::path::PathBuf;

use serde_json::{Map, Value as Json};

use crate::engine::{Engine, ExternalView};
use crate::model::AlgorithmKind;

/// The eight JSON files the view layer manages (spec §6, "JSON view files
/// on disk").
pub const VIEW_FILES: &[&str] = &[
    "EVA", "ROVER", "LTV", "UIA", "DCU", "IMU", "COMM", "ERROR",
];

/// Owns the view root directory and caches nothing: every read/write goes
/// to disk, matching the "eventually consistent within one tick" contract
/// (spec DATA MODEL, "JSON view").
pub struct ViewStore {
    root: PathBuf,
}

impl ViewStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    /// `get_json_file(name)`: loads the named file, or an empty object if
    /// it does not yet exist on disk (spec §4.7, "Read").
    pub fn get_json_file(&self, name: &str) -> Json {
        let path = self.path_for(name);
        match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|_| Json::Object(Map::new())),
            Err(_) => Json::Object(Map::new()),
        }
    }

    /// Atomic-enough write: write to a sibling temp file, then rename over
    /// the target, so a concurrent reader sees either the pre- or
    /// post-state (spec §4.7, "Write-field").
    fn write_json_file(&self, name: &str, value: &Json) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(name);
        let tmp = self.root.join(format!(".{name}.json.tmp"));
        fs::write(&tmp, serde_json::to_string_pretty(value).unwrap())?;
        fs::rename(&tmp, &path)
    }

    /// `get_field(name, dotted_path, default)`: numeric leaves return their
    /// number, boolean leaves return 0/1, string leaves parse as a number if
    /// possible else the default (spec §4.7, "Read").
    pub fn get_field(&self, name: &str, dotted_path: &str, default: f32) -> f32 {
        let tree = self.get_json_file(name);
        match walk(&tree, dotted_path) {
            Some(Json::Number(n)) => n.as_f64().map(|v| v as f32).unwrap_or(default),
            Some(Json::Bool(b)) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Some(Json::String(s)) => s.parse::<f32>().unwrap_or(default),
            _ => default,
        }
    }

    /// `update_field(name, section, dotted_sub_path, value_string)` (spec
    /// §4.7, "Write-field"). Coerces `"true"`/`"false"` to booleans,
    /// otherwise tries a float, falling back to a bare string. Creates
    /// missing intermediate nodes; replaces (never merges) the leaf.
    pub fn update_field(&self, name: &str, section: &str, dotted_sub_path: &str, value_string: &str) {
        let mut tree = self.get_json_file(name);
        let full_path = format!("{section}.{dotted_sub_path}");
        let value = coerce(value_string);
        set_leaf(&mut tree, &full_path, value);
        let _ = self.write_json_file(name, &tree);
    }

    /// Writes one raw numeric value at a fully-qualified dotted path,
    /// bypassing string coercion — used by the engine projection and by
    /// reset's `reset_value` write-back.
    fn set_numeric(&self, name: &str, full_path: &str, value: f32) {
        let mut tree = self.get_json_file(name);
        set_leaf(&mut tree, full_path, Json::from(value as f64));
        let _ = self.write_json_file(name, &tree);
    }

    /// Engine → JSON projection, once per tick (spec §4.7, "Engine → JSON
    /// projection"). Writes every running component's fields into their
    /// file, and the two aggregate booleans (`EVA.status.started`,
    /// `ROVER.pr_telemetry.sim_running`).
    pub fn project(&self, engine: &Engine) {
        for (ci, fi) in &engine.update_order {
            let component = &engine.components[*ci];
            let field = &component.fields[*fi];

            if field.algorithm == AlgorithmKind::ExternallySourced {
                continue;
            }

            let (file, path) = match component.component_name.as_str() {
                "eva1" => ("EVA", format!("telemetry.eva1.{}", field.field_name)),
                "eva2" => ("EVA", format!("telemetry.eva2.{}", field.field_name)),
                "rover" => ("ROVER", format!("pr_telemetry.{}", field.field_name)),
                _ => continue,
            };

            self.set_numeric(file, &path, field.current_value);
        }

        let eva_running = engine.is_running("eva1") || engine.is_running("eva2");
        self.write_bool("EVA", "status.started", eva_running);
        let rover_running = engine.is_running("rover");
        self.write_bool("ROVER", "pr_telemetry.sim_running", rover_running);
    }

    fn write_bool(&self, name: &str, full_path: &str, value: bool) {
        let mut tree = self.get_json_file(name);
        set_leaf(&mut tree, full_path, Json::Bool(value));
        let _ = self.write_json_file(name, &tree);
    }

    /// Station timing for the task board ancillary stations (spec §4.7,
    /// "Station timing"). Run once per tick after the engine advances.
    pub fn advance_station_timers(&self, dt: f32) {
        let mut tree = self.get_json_file("EVA");
        for station in ["uia", "dcu", "spec"] {
            let started = walk(&tree, &format!("status.{station}.started"))
                .and_then(Json::as_bool)
                .unwrap_or(false);
            let completed = walk(&tree, &format!("status.{station}.completed"))
                .and_then(Json::as_bool)
                .unwrap_or(false);
            let time = walk(&tree, &format!("status.{station}.time"))
                .and_then(Json::as_f64)
                .unwrap_or(0.0);

            if started {
                set_leaf(
                    &mut tree,
                    &format!("status.{station}.time"),
                    Json::from(time + dt as f64),
                );
            } else if !completed && time > 0.0 {
                set_leaf(
                    &mut tree,
                    &format!("status.{station}.completed"),
                    Json::Bool(true),
                );
            }
        }
        let _ = self.write_json_file("EVA", &tree);
    }

    /// The task board's ("spec" station) completion time, once known — the
    /// value the fault schedule's `error_time` offset is measured from
    /// (spec §4.5.2 step 5, §4.6 "A separate integer..."). `None` until
    /// `advance_station_timers` has observed the station go from started to
    /// stopped; frozen thereafter, since `time` only advances while
    /// `started` is true.
    pub fn task_board_completion_time(&self) -> Option<f32> {
        let tree = self.get_json_file("EVA");
        let completed = walk(&tree, "status.spec.completed")
            .and_then(Json::as_bool)
            .unwrap_or(false);
        if !completed {
            return None;
        }
        walk(&tree, "status.spec.time")
            .and_then(Json::as_f64)
            .map(|v| v as f32)
    }

    /// Zeroes all three station timers; called on an EVA reset.
    pub fn reset_station_timers(&self) {
        let mut tree = self.get_json_file("EVA");
        for station in ["uia", "dcu", "spec"] {
            set_leaf(&mut tree, &format!("status.{station}.started"), Json::Bool(false));
            set_leaf(&mut tree, &format!("status.{station}.time"), Json::from(0.0));
            set_leaf(&mut tree, &format!("status.{station}.completed"), Json::Bool(false));
        }
        let _ = self.write_json_file("EVA", &tree);
    }

    /// Toggles `ROVER.pr_telemetry.dust_connected` (spec §4.8,
    /// "Registration": set on a successful handshake, cleared by the
    /// server loop on any outbound `sendto` failure).
    pub fn write_dust_connected(&self, connected: bool) {
        self.write_bool("ROVER", "pr_telemetry.dust_connected", connected);
    }

    /// Stores the 17-sample LiDAR array at `ROVER.pr_telemetry.lidar`
    /// (spec §4.9, "LiDAR arrays").
    pub fn write_lidar(&self, samples: &[f32]) {
        let mut tree = self.get_json_file("ROVER");
        let array = Json::Array(samples.iter().map(|&v| Json::from(v as f64)).collect());
        set_leaf(&mut tree, "pr_telemetry.lidar", array);
        let _ = self.write_json_file("ROVER", &tree);
    }

    /// Maps a file prefix as seen on the wire/HTTP-form interface
    /// (`eva`/`rover`/`ltv`/...) to the on-disk file name (spec §4.7,
    /// "JSON → Engine ingestion", step 1).
    pub fn resolve_file_name(prefix: &str) -> Option<&'static str> {
        match prefix {
            "eva" => Some("EVA"),
            "rover" => Some("ROVER"),
            "ltv" => Some("LTV"),
            "uia" => Some("UIA"),
            "dcu" => Some("DCU"),
            "imu" => Some("IMU"),
            "comm" => Some("COMM"),
            "error" => Some("ERROR"),
            _ => None,
        }
    }
}

impl ExternalView for ViewStore {
    fn read(&self, file_path: &str, field_path: &str) -> f32 {
        self.get_field(file_path, field_path, 0.0)
    }

    fn write(&mut self, file_path: &str, field_path: &str, value: f32) {
        self.set_numeric(file_path, field_path, value);
    }
}

/// Routes one ingested write (HTTP form POST or UDP POST) to `update_field`,
/// then applies the engine-side side effects for the two sentinel paths
/// (spec §4.7, "JSON → Engine ingestion").
///
/// `full_path` is the dotted path as `file.section.rest...`; `value_string`
/// is the raw value already coerced to text the same way an HTTP form field
/// would carry it. Returns `false` if the path has fewer than two
/// components or an unrecognized file prefix (spec §7, "Operator-write").
pub fn ingest(
    view: &ViewStore,
    engine: &mut Engine,
    full_path: &str,
    value_string: &str,
) -> bool {
    let mut parts = full_path.splitn(3, '.');
    let prefix = match parts.next() {
        Some(p) => p,
        None => return false,
    };
    let section = match parts.next() {
        Some(s) => s,
        None => return false,
    };
    let rest = parts.next().unwrap_or("");

    let file = match ViewStore::resolve_file_name(prefix) {
        Some(f) => f,
        None => return false,
    };

    view.update_field(file, section, rest, value_string);

    let qualified = format!("{section}.{rest}");
    if file == "ROVER" && qualified == "pr_telemetry.sim_running" {
        apply_sentinel(view, engine, "rover", value_string);
    } else if file == "EVA" && qualified == "status.started" {
        apply_sentinel(view, engine, "eva1", value_string);
        apply_sentinel(view, engine, "eva2", value_string);
        if !truthy(value_string) {
            view.reset_station_timers();
        }
    } else if file == "EVA" {
        apply_switch_write(engine, &qualified, value_string);
    }

    true
}

/// DCU panel switches live under `EVA.json : dcu.eva1.<switch_name>` (there
/// is only an eva1 DCU range on the wire) and must additionally update the
/// suit component's gating state (spec §3, "Operator switch state":
/// "re-derived from these switches every tick"). Switch names are the
/// ground-truth `udp_command_mappings[]` spellings — `batt.lu`/`batt.ps`
/// rather than `battery_lu`/`battery_ps`.
fn apply_switch_write(engine: &mut Engine, qualified: &str, value_string: &str) {
    let Some(rest) = qualified.strip_prefix("dcu.") else {
        return;
    };
    let Some(switch_name) = rest.strip_prefix("eva1.") else {
        return;
    };
    let value = truthy(value_string);
    if let Some(c) = engine.find_component_mut("eva1") {
        match switch_name {
            "batt.lu" => c.switches.battery_lu = value,
            "oxy" => c.switches.o2 = value,
            "batt.ps" => c.switches.battery_ps = value,
            "fan" => c.switches.fan = value,
            "pump" => c.switches.pump = value,
            "co2" => c.switches.co2 = value,
            _ => {}
        }
    }
}

fn apply_sentinel(view: &ViewStore, engine: &mut Engine, component: &str, value_string: &str) {
    if truthy(value_string) {
        engine.start(component);
    } else {
        engine.reset(component, &mut ViewStoreMut(view));
    }
}

/// Bridges the `&ViewStore` ingestion holds to the `&mut dyn ExternalView`
/// `Engine::reset` expects, since `ViewStore` never caches state and every
/// method already goes straight to disk.
struct ViewStoreMut<'a>(&'a ViewStore);

impl ExternalView for ViewStoreMut<'_> {
    fn read(&self, file_path: &str, field_path: &str) -> f32 {
        self.0.get_field(file_path, field_path, 0.0)
    }
    fn write(&mut self, file_path: &str, field_path: &str, value: f32) {
        self.0.set_numeric(file_path, field_path, value);
    }
}

fn truthy(value_string: &str) -> bool {
    matches!(value_string, "true" | "1" | "1.0")
}

fn coerce(value_string: &str) -> Json {
    match value_string {
        "true" => Json::Bool(true),
        "false" => Json::Bool(false),
        _ => match value_string.parse::<f64>() {
            Ok(n) => Json::from(n),
            Err(_) => Json::String(value_string.to_string()),
        },
    }
}

fn walk<'a>(tree: &'a Json, dotted_path: &str) -> Option<&'a Json> {
    let mut node = tree;
    for part in dotted_path.split('.') {
        if part.is_empty() {
            continue;
        }
        node = node.get(part)?;
    }
    Some(node)
}

fn set_leaf(tree: &mut Json, dotted_path: &str, value: Json) {
    let parts: Vec<&str> = dotted_path.split('.').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return;
    }
    let mut node = tree;
    for part in &parts[..parts.len() - 1] {
        if !node.is_object() {
            *node = Json::Object(Map::new());
        }
        node = node
            .as_object_mut()
            .unwrap()
            .entry(part.to_string())
            .or_insert_with(|| Json::Object(Map::new()));
    }
    if !node.is_object() {
        *node = Json::Object(Map::new());
    }
    node.as_object_mut()
        .unwrap()
        .insert(parts[parts.len() - 1].to_string(), value);
}

/// Used only so `view.rs` can be exercised with a throwaway directory in
/// tests without depending on `tempfile` for every case.
#[allow(dead_code)]
fn scratch_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("groundstation-view-test-{label}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(label: &str) -> ViewStore {
        let dir = scratch_dir(label);
        let _ = fs::remove_dir_all(&dir);
        ViewStore::new(dir)
    }

    #[test]
    fn round_trip_numeric_field() {
        let s = store("numeric");
        s.update_field("EVA", "telemetry", "eva1.fan_pri_rpm", "3.5");
        assert_eq!(s.get_field("EVA", "telemetry.eva1.fan_pri_rpm", -1.0), 3.5);
    }

    #[test]
    fn round_trip_boolean_field() {
        let s = store("boolean");
        s.update_field("EVA", "dcu", "eva1.fan", "true");
        assert_eq!(s.get_field("EVA", "dcu.eva1.fan", 0.0), 1.0);
    }

    #[test]
    fn missing_path_returns_default() {
        let s = store("missing");
        assert_eq!(s.get_field("EVA", "nowhere.at.all", 7.0), 7.0);
    }

    #[test]
    fn unknown_file_prefix_path_returns_false() {
        let s = store("unknown-prefix");
        let mut components = crate::model::Component::new("eva1".into(), vec![]);
        components.running = false;
        let engine = crate::engine::Engine::initialize(vec![components]);
        let mut engine = engine.unwrap();
        assert!(!ingest(&s, &mut engine, "nope.section.field", "1.0"));
    }

    #[test]
    fn short_path_is_rejected() {
        let s = store("short-path");
        let mut engine = crate::engine::Engine::initialize(vec![]).unwrap();
        assert!(!ingest(&s, &mut engine, "eva", "1.0"));
    }

    #[test]
    fn string_leaf_falls_back_when_unparseable() {
        let s = store("string-fallback");
        s.update_field("COMM", "status", "mode", "idle");
        assert_eq!(s.get_field("COMM", "status.mode", 9.0), 9.0);
    }
}
