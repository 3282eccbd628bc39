use suits_groundstation::config::parse_component_blob;
use suits_groundstation::engine::{Engine, NoExternalView};
use suits_groundstation::fault::{FaultKind, FaultSchedule};
use suits_groundstation::model::AlgorithmKind;
use suits_groundstation::router;
use suits_groundstation::view::ViewStore;
use suits_groundstation::wire::{self, Inbound};

const EVA1_BLOB: &str = r#"{
    "component_name": "eva1",
    "fields": {
        "fan_pri_rpm": { "algorithm": "linear-ramp-increasing", "start_value": 0.0, "growth_rate": 1.0 },
        "fan_sec_rpm": { "algorithm": "linear-ramp-increasing", "start_value": 0.0, "growth_rate": 1.0 },
        "suit_pressure_oxy": { "algorithm": "periodic-oscillation", "base_value": 14.7, "amplitude": 0.0 }
    }
}"#;

const EVA2_BLOB: &str = r#"{
    "component_name": "eva2",
    "fields": {
        "fan_pri_rpm": { "algorithm": "linear-ramp-increasing", "start_value": 0.0, "growth_rate": 1.0 }
    }
}"#;

const ROVER_BLOB: &str = r#"{
    "component_name": "rover",
    "fields": {
        "battery_level": { "algorithm": "linear-ramp-decreasing", "start_value": 100.0, "end_value": 0.0, "duration_seconds": 3600.0 }
    }
}"#;

fn load_three_standard_components() -> Vec<suits_groundstation::Component> {
    vec![
        parse_component_blob(EVA1_BLOB, "eva1.json").unwrap(),
        parse_component_blob(EVA2_BLOB, "eva2.json").unwrap(),
        parse_component_blob(ROVER_BLOB, "rover.json").unwrap(),
    ]
}

#[test]
fn scenario_a_cold_boot() {
    let components = load_three_standard_components();
    let total_field_count: usize = components.iter().map(|c| c.fields.len()).sum();
    let engine = Engine::initialize(components).expect("cold boot must succeed");

    assert_eq!(engine.update_order.len(), total_field_count);
    for c in &engine.components {
        assert!(!c.running);
    }
    assert_eq!(
        engine.find_field("suit_pressure_oxy").unwrap().current_value,
        14.7
    );
    assert_eq!(engine.find_field("battery_level").unwrap().current_value, 100.0);
}

#[test]
fn scenario_b_start_then_tick() {
    let components = load_three_standard_components();
    let mut engine = Engine::initialize(components).unwrap();

    engine.start("rover");
    engine.tick(1.0, &NoExternalView);

    let battery = engine.find_field("battery_level").unwrap().current_value;
    assert!((battery - 99.972_222).abs() < 1e-3);

    // eva1/eva2 were never started, so their fields must be untouched.
    assert_eq!(engine.find_field("fan_pri_rpm").unwrap().run_time, 0.0);
}

#[test]
fn scenario_c_operator_dcu_switch() {
    let components = load_three_standard_components();
    let mut engine = Engine::initialize(components).unwrap();

    engine.start("eva1");
    engine.find_component_mut("eva1").unwrap().switches.fan = false;
    engine.tick(1.0, &NoExternalView);

    assert!(engine.find_field("fan_pri_rpm").unwrap().run_time > 0.0);
    assert_eq!(engine.find_field("fan_sec_rpm").unwrap().run_time, 0.0);

    engine.find_component_mut("eva1").unwrap().switches.fan = true;
    let frozen_primary = engine.find_field("fan_pri_rpm").unwrap().current_value;
    engine.tick(1.0, &NoExternalView);

    assert_eq!(engine.find_field("fan_pri_rpm").unwrap().current_value, frozen_primary);
    assert!(engine.find_field("fan_sec_rpm").unwrap().run_time > 0.0);
}

#[test]
fn scenario_d_udp_post_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let view = ViewStore::new(dir.path());
    let components = load_three_standard_components();
    let mut engine = Engine::initialize(components).unwrap();

    let packet = {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&2011u32.to_be_bytes());
        bytes.extend_from_slice(&1.0f32.to_be_bytes());
        bytes
    };

    let decoded = wire::parse_inbound(&packet).unwrap();
    let Inbound::Post { command, value, .. } = decoded else {
        panic!("expected a POST packet");
    };

    let applied = router::dispatch_post(&view, &mut engine, command, value);
    assert!(applied);
    assert_eq!(view.get_field("EVA", "dcu.eva1.batt.lu", 0.0), 1.0);
}

#[test]
fn scenario_e_get_file_dump() {
    let dir = tempfile::tempdir().unwrap();
    let view = ViewStore::new(dir.path());
    view.update_field("EVA", "telemetry", "eva1.fan_pri_rpm", "12.5");

    let payload = router::dispatch_get(&view, router::GET_EVA_DUMP).unwrap();
    let response = wire::encode_get_response(1, router::GET_EVA_DUMP, &payload);

    assert_eq!(&response[0..4], &1u32.to_be_bytes());
    assert_eq!(&response[4..8], &(router::GET_EVA_DUMP as u32).to_be_bytes());
    assert_eq!(*response.last().unwrap(), 0);
    assert!(payload.contains("12.5"));
}

#[test]
fn scenario_f_fault_at_task_completion() {
    let eva1 = parse_component_blob(
        r#"{
            "component_name": "eva1",
            "fields": {
                "suit_pressure_oxy": { "algorithm": "periodic-oscillation", "base_value": 14.7, "amplitude": 0.0, "end_value": 0.0, "rapid_duration_seconds": 5.0 }
            }
        }"#,
        "eva1.json",
    )
    .unwrap();

    let mut engine = Engine::initialize(vec![eva1]).unwrap();
    engine.time_to_complete_task_board = 10.0;
    engine.set_fault_schedule(FaultSchedule {
        error_time: 3.0,
        kind: FaultKind::SuitOxyLow,
        num_task_board_errors: 0,
    });

    engine.start("eva1");
    for _ in 0..13 {
        engine.tick(1.0, &NoExternalView);
    }

    let field = engine.find_field("suit_pressure_oxy").unwrap();
    assert_eq!(field.algorithm, AlgorithmKind::RapidRampDecreasing);

    for _ in 0..5 {
        engine.tick(1.0, &NoExternalView);
    }
    let value = engine.find_field("suit_pressure_oxy").unwrap().current_value;
    assert!((value - 0.0).abs() < 1e-3);
}
