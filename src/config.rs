// src/config.rs
//
// Field & Component Registry (spec §4.3, C3). Reads one configuration blob
// per component from disk and turns it into `Component`/`Field` values.
// Every failure mode here is recovered locally: the offending component or
// field is skipped and logged, never propagated as a hard error — only the
// dependency sorter (depsort.rs) can fail the whole engine.

use std::fs;
use std::path::Path;

use serde_json::Value as Json;

use crate::errors::ConfigError;
use crate::model::{AlgorithmKind, Component, Field};

/// The three standard configuration files the engine loads at startup
/// (spec §6, "Configuration files on disk").
pub const STANDARD_COMPONENTS: &[&str] = &["eva1", "eva2", "rover"];

/// Loads `<config_root>/<name>.json` for each of `STANDARD_COMPONENTS`,
/// skipping and logging any that fail to load. Returns the successfully
/// loaded components; a successful registry load requires at least one
/// field to have been contributed across all files (spec §4.3, "A
/// successful load is reported when...").
pub fn load_standard_components(config_root: &Path) -> Vec<Component> {
    let mut components = Vec::new();
    let mut total_fields = 0usize;

    for name in STANDARD_COMPONENTS {
        let path = config_root.join(format!("{name}.json"));
        match load_component_file(&path) {
            Ok(component) => {
                total_fields += component.fields.len();
                components.push(component);
            }
            Err(e) => {
                log::warn!("skipping component config {}: {e}", path.display());
            }
        }
    }

    if total_fields == 0 {
        log::warn!("no fields were loaded from any standard configuration file");
    }

    components
}

/// Parses a single component configuration file.
pub fn load_component_file(path: &Path) -> Result<Component, ConfigError> {
    let text = fs::read_to_string(path).map_err(|_| ConfigError::file_not_openable(path.display()))?;
    parse_component_blob(&text, &path.display().to_string())
}

/// Parses a component configuration blob already read into memory (shared
/// by the file loader and by tests).
pub fn parse_component_blob(text: &str, source_label: &str) -> Result<Component, ConfigError> {
    let blob: Json =
        serde_json::from_str(text).map_err(|e| ConfigError::not_valid_json(source_label, e))?;

    let component_name = blob
        .get("component_name")
        .and_then(Json::as_str)
        .ok_or_else(|| ConfigError::missing_component_name(source_label))?
        .to_string();

    let fields_obj = blob
        .get("fields")
        .and_then(Json::as_object)
        .ok_or_else(|| ConfigError::missing_fields(source_label))?;

    let mut fields = Vec::new();
    for (field_name, record) in fields_obj {
        match parse_field_record(&component_name, field_name, record) {
            Some(field) => fields.push(field),
            None => {
                log::warn!(
                    "skipping field {component_name}.{field_name}: missing \"algorithm\""
                );
            }
        }
    }

    Ok(Component::new(component_name, fields))
}

fn parse_field_record(component_name: &str, field_name: &str, record: &Json) -> Option<Field> {
    let algo_str = record.get("algorithm")?.as_str()?;
    let algorithm: AlgorithmKind = serde_json::from_value(Json::String(algo_str.to_string())).ok()?;

    let depends_on = record
        .get("depends_on")
        .and_then(Json::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Json::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(Field::new(
        field_name.to_string(),
        component_name.to_string(),
        algorithm,
        record.clone(),
        depends_on,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_component() {
        let blob = r#"{
            "component_name": "eva1",
            "fields": {
                "fan_pri_rpm": {
                    "algorithm": "periodic-oscillation",
                    "base_value": 100.0,
                    "amplitude": 5.0
                }
            }
        }"#;
        let c = parse_component_blob(blob, "<test>").unwrap();
        assert_eq!(c.component_name, "eva1");
        assert_eq!(c.fields.len(), 1);
        assert_eq!(c.fields[0].algorithm, AlgorithmKind::PeriodicOscillation);
    }

    #[test]
    fn field_missing_algorithm_is_skipped_not_fatal() {
        let blob = r#"{
            "component_name": "eva1",
            "fields": {
                "bad": { "amplitude": 5.0 },
                "good": { "algorithm": "linear-ramp-increasing" }
            }
        }"#;
        let c = parse_component_blob(blob, "<test>").unwrap();
        assert_eq!(c.fields.len(), 1);
        assert_eq!(c.fields[0].field_name, "good");
    }

    #[test]
    fn missing_component_name_is_an_error() {
        let blob = r#"{ "fields": {} }"#;
        assert!(parse_component_blob(blob, "<test>").is_err());
    }

    #[test]
    fn missing_fields_key_is_an_error() {
        let blob = r#"{ "component_name": "eva1" }"#;
        assert!(parse_component_blob(blob, "<test>").is_err());
    }

    #[test]
    fn zero_fields_loads_with_empty_set() {
        let blob = r#"{ "component_name": "eva1", "fields": {} }"#;
        let c = parse_component_blob(blob, "<test>").unwrap();
        assert_eq!(c.fields.len(), 0);
    }

    #[test]
    fn not_json_is_an_error() {
        assert!(parse_component_blob("not json", "<test>").is_err());
    }
}
