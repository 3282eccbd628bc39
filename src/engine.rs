// src/engine.rs
//
// Simulation Engine (spec §4.5, C5). Owns every component and field,
// advances them one tick at a time, and exposes the start/stop/reset
// lifecycle. This is the hub the rest of the crate is built around: the
// fault injector (fault.rs) mutates algorithm tags on the engine's fields,
// the JSON view layer (view.rs) projects `current_value` out of it and
// feeds `externally-sourced` fields back in, and the command router
// (router.rs) drives start/stop/reset indirectly through the view layer.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::depsort::{self, FieldRef};
use crate::errors::EngineInitError;
use crate::fault::{apply_fault, FaultKind, FaultSchedule};
use crate::formula::{self, FieldLookup};
use crate::model::{AlgorithmKind, Component, SwitchState};

/// Supplies and accepts the one piece of per-tick state the engine does not
/// own itself: the content of `externally-sourced` fields, which live in the
/// JSON view (spec §4.5.1, "externally-sourced"; §4.5.3, reset semantics).
pub trait ExternalView {
    fn read(&self, file_path: &str, field_path: &str) -> f32;
    fn write(&mut self, file_path: &str, field_path: &str, value: f32);
}

/// A view that never has any externally-sourced data; useful for tests and
/// for `validate` runs that never start the JSON view layer.
pub struct NoExternalView;

impl ExternalView for NoExternalView {
    fn read(&self, _file_path: &str, _field_path: &str) -> f32 {
        0.0
    }
    fn write(&mut self, _file_path: &str, _field_path: &str, _value: f32) {}
}

pub struct Engine {
    pub components: Vec<Component>,
    pub update_order: Vec<FieldRef>,

    fault_schedule: FaultSchedule,
    /// The fault currently in effect, if any, until the next "eva1" reset
    /// (spec §8 test 13, "active is true for the rest of the run until a
    /// reset").
    active_fault: Option<FaultKind>,
    /// `f32::INFINITY` until the task board ("spec" station) completes —
    /// the fault then can never fire, since `should_fire` requires an exact
    /// equality against a finite sum. The server loop keeps this synced
    /// from the view's station-timer state every tick
    /// (`ViewStore::task_board_completion_time`); tests set it directly.
    pub time_to_complete_task_board: f32,

    rng: StdRng,
}

impl Engine {
    /// Resolves `update_order`, seeds every field to its starting value, and
    /// draws the first fault schedule. Fails if the dependency graph has a
    /// cycle or a dangling reference (spec §4.4, §4.5 init).
    pub fn initialize(components: Vec<Component>) -> Result<Self, EngineInitError> {
        let update_order = depsort::resolve_update_order(&components)?;
        let mut rng = StdRng::from_entropy();
        let fault_schedule = FaultSchedule::draw(&mut rng);

        let mut engine = Self {
            components,
            update_order,
            fault_schedule,
            active_fault: None,
            time_to_complete_task_board: f32::INFINITY,
            rng,
        };

        for (ci, fi) in engine.update_order.clone() {
            engine.seed_starting_value(ci, fi);
        }

        Ok(engine)
    }

    fn seed_starting_value(&mut self, ci: usize, fi: usize) {
        let value = {
            let field = &self.components[ci].fields[fi];
            match field.algorithm {
                AlgorithmKind::PeriodicOscillation => field.param_f32("base_value", 0.0),
                AlgorithmKind::LinearRampDecreasing => field.param_f32("start_value", 0.0),
                AlgorithmKind::LinearRampIncreasing => field.param_f32("start_value", 0.0),
                _ => 0.0,
            }
        };
        let field = &mut self.components[ci].fields[fi];
        field.current_value = value;
        field.previous_value = value;
        field.initialized = true;
    }

    pub fn find_component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.component_name == name)
    }

    pub fn find_component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.component_name == name)
    }

    /// Linear scan across every component's fields; absent names are the
    /// caller's problem to handle as zero (spec §4.5.4).
    pub fn find_field(&self, name: &str) -> Option<&crate::model::Field> {
        self.components.iter().find_map(|c| c.find_field(name))
    }

    pub fn is_running(&self, component_name: &str) -> bool {
        self.find_component(component_name)
            .map(|c| c.running)
            .unwrap_or(false)
    }

    /// Overrides the fault schedule directly — used by deterministic tests
    /// that need to pin `(error_time, kind)` instead of drawing it.
    pub fn set_fault_schedule(&mut self, schedule: FaultSchedule) {
        self.fault_schedule = schedule;
    }

    // ---- lifecycle ----------------------------------------------------

    pub fn start(&mut self, component_name: &str) {
        if let Some(c) = self.find_component_mut(component_name) {
            c.running = true;
        }
    }

    pub fn stop(&mut self, component_name: &str) {
        if let Some(c) = self.find_component_mut(component_name) {
            c.running = false;
        }
    }

    /// `reset` per spec §4.5.3: zero the clock, restore each field's
    /// starting algorithm and latch state, re-seed `current_value`, and
    /// write any `reset_value` for externally-sourced fields back through
    /// the view before zeroing. Resetting "eva1" also redraws the fault
    /// schedule (spec §4.6, "Reset").
    pub fn reset(&mut self, component_name: &str, view: &mut dyn ExternalView) {
        let indices: Vec<usize> = match self.find_component(component_name) {
            Some(c) => (0..c.fields.len()).collect(),
            None => return,
        };

        {
            let component = self.find_component_mut(component_name).unwrap();
            component.running = false;
            component.simulation_time = 0.0;
        }

        for fi in indices {
            self.reset_field(component_name, fi, view);
        }

        if component_name == "eva1" {
            self.fault_schedule = FaultSchedule::draw(&mut self.rng);
            self.active_fault = None;
        }
    }

    fn reset_field(&mut self, component_name: &str, fi: usize, view: &mut dyn ExternalView) {
        let ci = self
            .components
            .iter()
            .position(|c| c.component_name == component_name)
            .unwrap();

        let (file_path, field_path, reset_value, is_external) = {
            let field = &self.components[ci].fields[fi];
            let is_external = field.starting_algorithm == AlgorithmKind::ExternallySourced;
            (
                field.param_str("file_path").unwrap_or_default().to_string(),
                field.param_str("field_path").unwrap_or_default().to_string(),
                field.params.get("reset_value").and_then(|v| v.as_f64()),
                is_external,
            )
        };

        if is_external {
            if let Some(reset_value) = reset_value {
                view.write(&file_path, &field_path, reset_value as f32);
            }
        }

        let start_value = {
            let field = &self.components[ci].fields[fi];
            match field.starting_algorithm {
                AlgorithmKind::PeriodicOscillation => field.param_f32("base_value", 0.0),
                AlgorithmKind::LinearRampDecreasing | AlgorithmKind::LinearRampIncreasing => {
                    field.param_f32("start_value", 0.0)
                }
                _ => 0.0,
            }
        };

        let field = &mut self.components[ci].fields[fi];
        field.algorithm = field.starting_algorithm;
        field.rapid_algo_initialized = None;
        field.run_time = 0.0;
        field.start_time = 0.0;
        field.current_value = start_value;
        field.previous_value = start_value;
    }

    // ---- gating ---------------------------------------------------------

    fn gated_active(field_name: &str, switches: SwitchState) -> Option<bool> {
        match field_name {
            "primary_battery_level" => Some(!switches.battery_lu && switches.battery_ps),
            "secondary_battery_level" => Some(!switches.battery_lu && !switches.battery_ps),
            "oxy_pri_storage" => Some(!switches.o2),
            "oxy_sec_storage" => Some(switches.o2),
            "fan_pri_rpm" => Some(!switches.fan),
            "fan_sec_rpm" => Some(switches.fan),
            "coolant_liquid_pressure" => Some(!switches.pump),
            "scrubber_a_co2_storage" => Some(!switches.co2),
            "scrubber_b_co2_storage" => Some(switches.co2),
            _ => None,
        }
    }

    // ---- tick -------------------------------------------------------------

    /// Advances the engine by `dt` seconds (spec §4.5.2). `view` supplies
    /// the current contents of any `externally-sourced` fields.
    pub fn tick(&mut self, dt: f32, view: &dyn ExternalView) {
        // 1. component clocks
        for c in self.components.iter_mut() {
            if c.running {
                c.simulation_time += dt;
            }
        }

        // 2 & 3. recompute `active`, with the fault override layered on top.
        // The override only applies within "eva1" — the component the fault
        // schedule is scoped to — so a field of the same name belonging to
        // another component (e.g. eva2's own "fan_pri_rpm") is unaffected.
        let active_fault = self.active_fault;
        for c in self.components.iter_mut() {
            let switches = c.switches;
            let is_eva1 = c.component_name == "eva1";
            for f in c.fields.iter_mut() {
                let gated = Self::gated_active(&f.field_name, switches).unwrap_or(true);
                let forced = is_eva1
                    && active_fault
                        .map(|k| k.forces_active(&f.field_name))
                        .unwrap_or(false);
                f.active = gated || forced;
            }
        }

        // 4. run_time advance for active fields in running components.
        for c in self.components.iter_mut() {
            if !c.running {
                continue;
            }
            for f in c.fields.iter_mut() {
                if f.active {
                    f.run_time += dt;
                }
            }
        }

        // 5. fault trigger check.
        if self.is_running("eva1") {
            let eva1_time = self.find_component("eva1").unwrap().simulation_time;
            if self
                .fault_schedule
                .should_fire(eva1_time, self.time_to_complete_task_board)
            {
                let kind = self.fault_schedule.kind;
                if let Some(eva1) = self.find_component_mut("eva1") {
                    apply_fault(eva1, kind);
                }
                self.active_fault = Some(kind);
                self.fault_schedule.num_task_board_errors += 1;
            }
        }

        // 6. evaluate every field along the dependency order.
        for (ci, fi) in self.update_order.clone() {
            if !self.components[ci].running {
                continue;
            }
            self.evaluate_field(ci, fi, view);
        }
    }

    fn evaluate_field(&mut self, ci: usize, fi: usize, view: &dyn ExternalView) {
        let field_snapshot = self.components[ci].fields[fi].clone();
        let t = field_snapshot.run_time;

        let (new_value, new_latch) = match field_snapshot.algorithm {
            AlgorithmKind::PeriodicOscillation => {
                let base = field_snapshot.param_f32("base_value", 0.0);
                let amp = field_snapshot.param_f32("amplitude", 1.0);
                let freq = field_snapshot.param_f32("frequency", 1.0);
                let phase = field_snapshot.param_f32("phase_offset", 0.0);
                (base + amp * (t * freq + phase).sin(), field_snapshot.rapid_algo_initialized)
            }
            AlgorithmKind::LinearRampDecreasing | AlgorithmKind::LinearRampIncreasing => {
                let start = field_snapshot.param_f32("start_value", 0.0);
                let end = field_snapshot.param_f32("end_value", start);
                let duration = field_snapshot.param_f32("duration_seconds", 1.0);
                (
                    lerp_clamped(start, end, t, duration),
                    field_snapshot.rapid_algo_initialized,
                )
            }
            AlgorithmKind::RapidRampDecreasing | AlgorithmKind::RapidRampIncreasing => {
                let latch = field_snapshot
                    .rapid_algo_initialized
                    .unwrap_or(field_snapshot.current_value);
                let value = if field_snapshot.algorithm == AlgorithmKind::RapidRampDecreasing {
                    let end = field_snapshot.param_f32("end_value", latch);
                    let duration = field_snapshot.param_f32("rapid_duration_seconds", 1.0);
                    lerp_clamped(latch, end, t, duration)
                } else {
                    let rate = field_snapshot.param_f32("rapid_growth_rate", 0.0);
                    let max = field_snapshot.param_f32("max_value", f32::INFINITY);
                    (latch + rate * t).min(max)
                };
                (value, Some(latch))
            }
            AlgorithmKind::DerivedFormula => {
                let formula_str = field_snapshot.param_str("formula").unwrap_or("0").to_string();
                (formula::evaluate(&formula_str, self), field_snapshot.rapid_algo_initialized)
            }
            AlgorithmKind::ExternallySourced => {
                let file_path = field_snapshot.param_str("file_path").unwrap_or_default();
                let field_path = field_snapshot.param_str("field_path").unwrap_or_default();
                (view.read(file_path, field_path), field_snapshot.rapid_algo_initialized)
            }
        };

        let field = &mut self.components[ci].fields[fi];
        field.previous_value = field.current_value;
        field.current_value = new_value;
        field.rapid_algo_initialized = new_latch;
    }
}

impl FieldLookup for Engine {
    fn lookup(&self, name: &str) -> f32 {
        self.find_field(name).map(|f| f.current_value).unwrap_or(0.0)
    }
}

fn lerp_clamped(start: f32, end: f32, t: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        return end;
    }
    let frac = (t / duration).clamp(0.0, 1.0);
    start + (end - start) * frac
}
