// src/fault.rs
//
// Fault Injector (spec §4.6, C6). Drives one pseudo-random off-nominal event
// per EVA1 run by reclassifying an existing field's algorithm — faults are
// arbitrary algorithm swaps, not new algorithm code (confirmed against the
// four `throw_*_error` functions of the system this was distilled from,
// which all do exactly this: look up a field, zero its `start_time`, set it
// active, and overwrite its `algorithm` tag).

use rand::Rng;

use crate::model::{AlgorithmKind, Component};

/// The four fault kinds; the enumeration is closed (spec §4.6, "exactly four
/// members").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    SuitOxyLow,
    SuitOxyHigh,
    FanHigh,
    FanLow,
}

impl FaultKind {
    const ALL: [FaultKind; 4] = [
        FaultKind::SuitOxyLow,
        FaultKind::SuitOxyHigh,
        FaultKind::FanHigh,
        FaultKind::FanLow,
    ];

    fn target_field(self) -> &'static str {
        match self {
            FaultKind::SuitOxyLow | FaultKind::SuitOxyHigh => "suit_pressure_oxy",
            FaultKind::FanHigh | FaultKind::FanLow => "fan_pri_rpm",
        }
    }

    fn target_algorithm(self) -> AlgorithmKind {
        match self {
            FaultKind::SuitOxyLow => AlgorithmKind::RapidRampDecreasing,
            FaultKind::SuitOxyHigh => AlgorithmKind::RapidRampIncreasing,
            FaultKind::FanHigh => AlgorithmKind::RapidRampIncreasing,
            FaultKind::FanLow => AlgorithmKind::RapidRampDecreasing,
        }
    }

    /// The field forced active by step 3's override table, distinct from
    /// `target_field` — for the oxy faults this is the tank-fill field
    /// `oxy_pri_storage`, not the reclassified `suit_pressure_oxy` (spec
    /// §4.5.2 step 3; confirmed distinct fields in
    /// original_source/src/data.c:2369-2417, where `oxy_pri_storage` is read
    /// via `telemetry->oxy_pri_tank_fill` and `suit_pressure_oxy` via
    /// `telemetry->suit_oxy_pressure`).
    fn forced_active_field(self) -> &'static str {
        match self {
            FaultKind::SuitOxyLow | FaultKind::SuitOxyHigh => "oxy_pri_storage",
            FaultKind::FanHigh | FaultKind::FanLow => "fan_pri_rpm",
        }
    }

    /// True when this fault's target field must be forced active regardless
    /// of the operator-switch gating table (spec §4.5.2 step 3).
    pub fn forces_active(self, field_name: &str) -> bool {
        field_name == self.forced_active_field()
    }
}

/// The fault schedule drawn at init and at every "eva1" reset. The source's
/// `NUM_ERRORS`-as-"none"-sentinel is replaced with a plain `kind` field
/// plus the `num_task_board_errors` firing gate — no sentinel value is
/// needed because the gate, not the kind, tracks "already applied" (spec
/// §9, "Error state as an integer sentinel").
#[derive(Debug, Clone, Copy)]
pub struct FaultSchedule {
    pub error_time: f32,
    pub kind: FaultKind,
    pub num_task_board_errors: u32,
}

impl FaultSchedule {
    /// Draws a fresh `(error_time, kind)` pair (spec §4.6, "Schedule").
    pub fn draw(rng: &mut impl Rng) -> Self {
        let error_time = rng.gen_range(1..=10) as f32;
        let kind = FaultKind::ALL[rng.gen_range(0..FaultKind::ALL.len())];
        Self {
            error_time,
            kind,
            num_task_board_errors: 0,
        }
    }

    /// Whether the fault fires this tick, given `eva1`'s simulation time and
    /// the task board's completion time (spec §4.6, "A separate integer...").
    pub fn should_fire(&self, eva1_simulation_time: f32, time_to_complete_task_board: f32) -> bool {
        self.num_task_board_errors == 0
            && eva1_simulation_time == time_to_complete_task_board + self.error_time
    }
}

/// Applies `kind`'s action table entry to `eva1` (spec §4.6, "Action").
pub fn apply_fault(eva1: &mut Component, kind: FaultKind) {
    let target = kind.target_field();
    if let Some(field) = eva1.find_field_mut(target) {
        field.algorithm = kind.target_algorithm();
        field.start_time = 0.0;
        field.active = true;
        field.rapid_algo_initialized = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    use crate::model::Field;

    fn eva1_with(field_name: &str) -> Component {
        Component::new(
            "eva1".into(),
            vec![Field::new(
                field_name.into(),
                "eva1".into(),
                AlgorithmKind::PeriodicOscillation,
                json!({}),
                vec![],
            )],
        )
    }

    #[test]
    fn fan_high_reclassifies_to_rapid_increasing() {
        let mut c = eva1_with("fan_pri_rpm");
        apply_fault(&mut c, FaultKind::FanHigh);
        let f = c.find_field("fan_pri_rpm").unwrap();
        assert_eq!(f.algorithm, AlgorithmKind::RapidRampIncreasing);
        assert!(f.active);
        assert_eq!(f.start_time, 0.0);
    }

    #[test]
    fn suit_oxy_low_reclassifies_to_rapid_decreasing() {
        let mut c = eva1_with("suit_pressure_oxy");
        apply_fault(&mut c, FaultKind::SuitOxyLow);
        assert_eq!(
            c.find_field("suit_pressure_oxy").unwrap().algorithm,
            AlgorithmKind::RapidRampDecreasing
        );
    }

    #[test]
    fn does_not_fire_before_scheduled_time() {
        let schedule = FaultSchedule {
            error_time: 3.0,
            kind: FaultKind::SuitOxyLow,
            num_task_board_errors: 0,
        };
        assert!(!schedule.should_fire(5.0, 10.0));
        assert!(schedule.should_fire(13.0, 10.0));
    }

    #[test]
    fn does_not_refire_once_a_task_board_error_recorded() {
        let schedule = FaultSchedule {
            error_time: 3.0,
            kind: FaultKind::SuitOxyLow,
            num_task_board_errors: 1,
        };
        assert!(!schedule.should_fire(13.0, 10.0));
    }

    #[test]
    fn successive_draws_are_not_all_identical() {
        let mut rng = StdRng::seed_from_u64(42);
        let draws: Vec<FaultSchedule> = (0..50).map(|_| FaultSchedule::draw(&mut rng)).collect();
        let all_same_time = draws.windows(2).all(|w| w[0].error_time == w[1].error_time);
        assert!(!all_same_time);
    }
}
