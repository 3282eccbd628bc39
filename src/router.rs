// src/router.rs
//
// Command Router (spec §4.8, C8). A constant table maps each 16-bit command
// code to a dotted view path and a scalar kind; GET codes dump a JSON
// subtree, POST codes synthesize `"<path>=<value>"` and delegate to the
// view layer's ingestion funnel so there is exactly one write-side code
// path regardless of transport (spec §4.8, "POST dispatch").

use crate::engine::Engine;
use crate::view::{self, ViewStore};

/// The wire-level type of a command's value, used only to decide how to
/// stringify the decoded bit pattern before handing it to the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Float,
    FloatArray,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandEntry {
    pub code: u16,
    /// Fully file-qualified dotted path, e.g. `"rover.pr_telemetry.brakes"`.
    pub path: &'static str,
    pub kind: ScalarKind,
}

pub const REGISTER_COMMAND: u16 = 3000;
pub const GET_ROVER_DUMP: u16 = 1;
pub const GET_EVA_DUMP: u16 = 2;

/// The full command table, ported verbatim (codes, paths, gaps included)
/// from `udp_command_mappings[]` (spec §4.8, "Inbound command table").
pub const COMMAND_TABLE: &[CommandEntry] = &[
    // Rover commands, sent from the visual simulator (1103-1132).
    CommandEntry { code: 1103, path: "rover.pr_telemetry.cabin_heating", kind: ScalarKind::Bool },
    CommandEntry { code: 1104, path: "rover.pr_telemetry.cabin_cooling", kind: ScalarKind::Bool },
    CommandEntry { code: 1105, path: "rover.pr_telemetry.co2_scrubber", kind: ScalarKind::Bool },
    CommandEntry { code: 1106, path: "rover.pr_telemetry.lights_on", kind: ScalarKind::Bool },
    CommandEntry { code: 1107, path: "rover.pr_telemetry.brakes", kind: ScalarKind::Bool },
    CommandEntry { code: 1109, path: "rover.pr_telemetry.throttle", kind: ScalarKind::Float },
    CommandEntry { code: 1110, path: "rover.pr_telemetry.steering", kind: ScalarKind::Float },
    CommandEntry { code: 1111, path: "rover.pr_telemetry.rover_pos_x", kind: ScalarKind::Float },
    CommandEntry { code: 1112, path: "rover.pr_telemetry.rover_pos_y", kind: ScalarKind::Float },
    CommandEntry { code: 1113, path: "rover.pr_telemetry.rover_pos_z", kind: ScalarKind::Float },
    CommandEntry { code: 1114, path: "rover.pr_telemetry.heading", kind: ScalarKind::Float },
    CommandEntry { code: 1115, path: "rover.pr_telemetry.pitch", kind: ScalarKind::Float },
    CommandEntry { code: 1116, path: "rover.pr_telemetry.roll", kind: ScalarKind::Float },
    CommandEntry { code: 1117, path: "rover.pr_telemetry.distance_traveled", kind: ScalarKind::Float },
    CommandEntry { code: 1118, path: "rover.pr_telemetry.speed", kind: ScalarKind::Float },
    CommandEntry { code: 1119, path: "rover.pr_telemetry.surface_incline", kind: ScalarKind::Float },
    CommandEntry { code: 1130, path: "rover.pr_telemetry.lidar", kind: ScalarKind::FloatArray },
    CommandEntry { code: 1131, path: "rover.pr_telemetry.sunlight", kind: ScalarKind::Float },
    CommandEntry { code: 1132, path: "ltv.signal.strength", kind: ScalarKind::Float },
    // UIA panel switches, sent from the peripheral device (2001-2010).
    CommandEntry { code: 2001, path: "eva.uia.eva1_power", kind: ScalarKind::Bool },
    CommandEntry { code: 2002, path: "eva.uia.eva1_oxy", kind: ScalarKind::Bool },
    CommandEntry { code: 2003, path: "eva.uia.eva1_water_supply", kind: ScalarKind::Bool },
    CommandEntry { code: 2004, path: "eva.uia.eva1_water_waste", kind: ScalarKind::Bool },
    CommandEntry { code: 2005, path: "eva.uia.eva2_power", kind: ScalarKind::Bool },
    CommandEntry { code: 2006, path: "eva.uia.eva2_oxy", kind: ScalarKind::Bool },
    CommandEntry { code: 2007, path: "eva.uia.eva2_water_supply", kind: ScalarKind::Bool },
    CommandEntry { code: 2008, path: "eva.uia.eva2_water_waste", kind: ScalarKind::Bool },
    CommandEntry { code: 2009, path: "eva.uia.oxy_vent", kind: ScalarKind::Bool },
    CommandEntry { code: 2010, path: "eva.uia.depress", kind: ScalarKind::Bool },
    // DCU panel switches, sent from the peripheral device — eva1's panel
    // only; there is no eva2 DCU range (2011-2016).
    CommandEntry { code: 2011, path: "eva.dcu.eva1.batt.lu", kind: ScalarKind::Bool },
    CommandEntry { code: 2012, path: "eva.dcu.eva1.oxy", kind: ScalarKind::Bool },
    CommandEntry { code: 2013, path: "eva.dcu.eva1.batt.ps", kind: ScalarKind::Bool },
    CommandEntry { code: 2014, path: "eva.dcu.eva1.fan", kind: ScalarKind::Bool },
    CommandEntry { code: 2015, path: "eva.dcu.eva1.pump", kind: ScalarKind::Bool },
    CommandEntry { code: 2016, path: "eva.dcu.eva1.co2", kind: ScalarKind::Bool },
    // IMU position commands from the locator service (2017-2022).
    CommandEntry { code: 2017, path: "eva.imu.eva1.posx", kind: ScalarKind::Float },
    CommandEntry { code: 2018, path: "eva.imu.eva1.posy", kind: ScalarKind::Float },
    CommandEntry { code: 2019, path: "eva.imu.eva1.heading", kind: ScalarKind::Float },
    CommandEntry { code: 2020, path: "eva.imu.eva2.posx", kind: ScalarKind::Float },
    CommandEntry { code: 2021, path: "eva.imu.eva2.posy", kind: ScalarKind::Float },
    CommandEntry { code: 2022, path: "eva.imu.eva2.heading", kind: ScalarKind::Float },
    // LTV commands (2023-2033).
    CommandEntry { code: 2023, path: "ltv.errors.dust_sensor", kind: ScalarKind::Bool },
    CommandEntry { code: 2024, path: "ltv.errors.power_module", kind: ScalarKind::Bool },
    CommandEntry { code: 2025, path: "ltv.errors.comms.nav_reset", kind: ScalarKind::Bool },
    CommandEntry { code: 2026, path: "ltv.errors.comms.lidar_reset", kind: ScalarKind::Bool },
    CommandEntry { code: 2027, path: "ltv.errors.comms.pri_sec", kind: ScalarKind::Bool },
    CommandEntry { code: 2028, path: "ltv.errors.nav_system", kind: ScalarKind::Bool },
    CommandEntry { code: 2029, path: "ltv.errors.lidar_sensor", kind: ScalarKind::Bool },
    CommandEntry { code: 2030, path: "ltv.errors.ultrasonic_sensor", kind: ScalarKind::Bool },
    CommandEntry { code: 2031, path: "ltv.errors.gyroscope_sensor", kind: ScalarKind::Bool },
    CommandEntry { code: 2032, path: "ltv.errors.potentiometer_sensor", kind: ScalarKind::Bool },
    CommandEntry { code: 2033, path: "ltv.errors.electronic_heater", kind: ScalarKind::Bool },
    // Ping LTV command.
    CommandEntry { code: 2050, path: "ltv.signal.ping_requested", kind: ScalarKind::Bool },
];

pub fn lookup(code: u16) -> Option<&'static CommandEntry> {
    COMMAND_TABLE.iter().find(|e| e.code == code)
}

/// GET dispatch: serializes the full named file as text (spec §4.8, "GET
/// dispatch"; §6, "GET file-dump codes").
pub fn dispatch_get(view: &ViewStore, code: u16) -> Option<String> {
    let file = match code {
        GET_ROVER_DUMP => "ROVER",
        GET_EVA_DUMP => "EVA",
        _ => return None,
    };
    let tree = view.get_json_file(file);
    Some(serde_json::to_string(&tree).unwrap_or_else(|_| "{}".to_string()))
}

/// POST dispatch: looks up `code`, stringifies `value` per the command's
/// declared scalar kind, and delegates to the view layer's single
/// ingestion funnel. Returns whether the write was applied (spec §4.8,
/// "POST dispatch"; §7, "Operator-write").
pub fn dispatch_post(view: &ViewStore, engine: &mut Engine, code: u16, value: f32) -> bool {
    let Some(entry) = lookup(code) else {
        log::warn!("unknown command code {code}, dropping");
        return false;
    };

    let value_string = match entry.kind {
        ScalarKind::Bool => {
            if value != 0.0 {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        ScalarKind::Float => value.to_string(),
        ScalarKind::FloatArray => value.to_string(),
    };

    view::ingest(view, engine, entry.path, &value_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_appears_at_most_once() {
        let mut seen = std::collections::HashSet::new();
        for entry in COMMAND_TABLE {
            assert!(seen.insert(entry.code), "duplicate command code {}", entry.code);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(lookup(9999).is_none());
    }

    #[test]
    fn get_dump_codes_resolve_to_expected_files() {
        assert_eq!(GET_ROVER_DUMP, 1);
        assert_eq!(GET_EVA_DUMP, 2);
    }
}
