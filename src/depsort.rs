// src/depsort.rs
//
// Dependency Sorter (spec §4.4, C4). Produces `update_order`: a flat list of
// (component index, field index) pairs such that every field's dependencies
// precede it. Indices, not references, into `components[].fields[]` — so the
// order survives later mutation of algorithm tags by the fault injector
// (spec §9, "Pointer/reference lifetimes").

use crate::errors::EngineInitError;
use crate::model::Component;

/// A position in `update_order`: which component, which field within it.
pub type FieldRef = (usize, usize);

/// Resolves the evaluation order across every loaded component.
///
/// Iterative resolution: each pass appends every not-yet-resolved field
/// whose dependencies are already resolved. Runs for up to
/// `2 * total_field_count` passes; a pass with no progress means a cycle or
/// a dangling dependency, which fails the whole engine (spec §4.4).
pub fn resolve_update_order(components: &[Component]) -> Result<Vec<FieldRef>, EngineInitError> {
    let total_fields: usize = components.iter().map(|c| c.fields.len()).sum();
    if total_fields == 0 {
        return Ok(Vec::new());
    }

    let mut resolved: Vec<FieldRef> = Vec::with_capacity(total_fields);
    let mut done = vec![false; total_fields];

    // Flat index of (component_idx, field_idx) in iteration order, used both
    // to walk all fields and to translate a depended-on name to its flat slot.
    let flat: Vec<FieldRef> = components
        .iter()
        .enumerate()
        .flat_map(|(ci, c)| (0..c.fields.len()).map(move |fi| (ci, fi)))
        .collect();

    let max_passes = 2 * total_fields;

    for _ in 0..max_passes {
        if resolved.len() == total_fields {
            break;
        }

        let mut progressed = false;

        for (slot, &(ci, fi)) in flat.iter().enumerate() {
            if done[slot] {
                continue;
            }

            let field = &components[ci].fields[fi];
            let deps_ready = field.depends_on.iter().all(|dep_name| {
                flat.iter().enumerate().any(|(dslot, &(dci, dfi))| {
                    done[dslot] && components[dci].fields[dfi].field_name == *dep_name
                })
            });

            if deps_ready {
                done[slot] = true;
                resolved.push((ci, fi));
                progressed = true;
            }
        }

        if !progressed {
            break;
        }
    }

    if resolved.len() == total_fields {
        return Ok(resolved);
    }

    let unresolved: Vec<String> = flat
        .iter()
        .enumerate()
        .filter(|(slot, _)| !done[*slot])
        .map(|(_, &(ci, fi))| {
            format!(
                "{}.{}",
                components[ci].component_name, components[ci].fields[fi].field_name
            )
        })
        .collect();

    Err(EngineInitError::cycle_or_dangling(&unresolved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlgorithmKind, Field};
    use serde_json::json;

    fn field(name: &str, deps: &[&str]) -> Field {
        Field::new(
            name.to_string(),
            "c".to_string(),
            AlgorithmKind::PeriodicOscillation,
            json!({}),
            deps.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn independent_fields_preserve_discovery_order() {
        let c = Component::new("c".into(), vec![field("a", &[]), field("b", &[])]);
        let order = resolve_update_order(&[c]).unwrap();
        assert_eq!(order, vec![(0, 0), (0, 1)]);
    }

    #[test]
    fn dependency_precedes_dependent() {
        let c = Component::new(
            "c".into(),
            vec![field("derived", &["base"]), field("base", &[])],
        );
        let order = resolve_update_order(&[c]).unwrap();
        let derived_idx = order.iter().position(|&(_, fi)| fi == 0).unwrap();
        let base_idx = order.iter().position(|&(_, fi)| fi == 1).unwrap();
        assert!(base_idx < derived_idx);
    }

    #[test]
    fn cycle_fails_initialization() {
        let c = Component::new(
            "c".into(),
            vec![field("a", &["b"]), field("b", &["a"])],
        );
        assert!(resolve_update_order(&[c]).is_err());
    }

    #[test]
    fn dangling_dependency_fails_initialization() {
        let c = Component::new("c".into(), vec![field("a", &["nonexistent"])]);
        assert!(resolve_update_order(&[c]).is_err());
    }

    #[test]
    fn empty_registry_resolves_to_empty_order() {
        assert_eq!(resolve_update_order(&[]).unwrap(), Vec::<FieldRef>::new());
    }

    #[test]
    fn cross_component_dependency_resolves() {
        let a = Component::new("a".into(), vec![field("base", &[])]);
        let b = Component::new("b".into(), vec![field("derived", &["base"])]);
        let order = resolve_update_order(&[a, b]).unwrap();
        assert_eq!(order, vec![(0, 0), (1, 0)]);
    }
}
