// src/wire.rs
//
// Wire Framing (spec §4.9, C9). Big-endian (network byte order) binary
// encode/decode for the UDP boundary, independent of host endianness.
// Command codes are logically 16-bit (spec §4.8) but carried as 4-byte
// words on the wire like every other field (spec §4.9, "Inbound packet").

/// A decoded inbound datagram (spec §6, "UDP wire format").
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Get { timestamp: u32, command: u16 },
    Post { timestamp: u32, command: u16, value: f32 },
    LidarPost { timestamp: u32, command: u16, samples: Vec<f32> },
}

/// Number of floats in a LiDAR sample (spec GLOSSARY, "LiDAR").
pub const LIDAR_SAMPLE_COUNT: usize = 17;

/// Parses one inbound datagram. Undersized or malformed packets are
/// dropped (returns `None`); the caller logs and continues (spec §7,
/// "Wire-level").
pub fn parse_inbound(bytes: &[u8]) -> Option<Inbound> {
    if bytes.len() < 8 {
        return None;
    }
    let timestamp = u32::from_be_bytes(bytes[0..4].try_into().ok()?);
    let command_word = u32::from_be_bytes(bytes[4..8].try_into().ok()?);
    let command = command_word as u16;

    let body = &bytes[8..];
    match body.len() {
        0 => Some(Inbound::Get { timestamp, command }),
        4 => {
            let value = f32::from_be_bytes(body.try_into().ok()?);
            Some(Inbound::Post { timestamp, command, value })
        }
        n if n % 4 == 0 && n > 0 => {
            let samples = body
                .chunks_exact(4)
                .map(|c| f32::from_be_bytes(c.try_into().unwrap()))
                .collect();
            Some(Inbound::LidarPost { timestamp, command, samples })
        }
        _ => None,
    }
}

/// Encodes a GET response: `timestamp:4 | command:4 | payload | \0` (spec
/// §4.9, "Outbound GET response").
pub fn encode_get_response(timestamp: u32, command: u16, payload: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len() + 1);
    out.extend_from_slice(&timestamp.to_be_bytes());
    out.extend_from_slice(&(command as u32).to_be_bytes());
    out.extend_from_slice(payload.as_bytes());
    out.push(0);
    out
}

/// Encodes a POST response: a single 4-byte big-endian status, `1` for
/// applied and `0` for rejected (spec §4.9, "Outbound POST response").
pub fn encode_post_response(applied: bool) -> [u8; 4] {
    (if applied { 1u32 } else { 0u32 }).to_be_bytes()
}

/// Encodes an outbound POST to the visual simulator: `timestamp:4 |
/// command:4 | value:4` (spec §4.9, "Outbound tick to visual simulator").
pub fn encode_outbound_post(timestamp: u32, command: u16, value: f32) -> [u8; 12] {
    let mut out = [0u8; 12];
    out[0..4].copy_from_slice(&timestamp.to_be_bytes());
    out[4..8].copy_from_slice(&(command as u32).to_be_bytes());
    out[8..12].copy_from_slice(&value.to_be_bytes());
    out
}

/// Command codes reserved for the outbound tick sequence, in send order
/// (spec §6, "Outbound tick codes"; §5, "Ordering guarantees").
pub mod outbound_codes {
    pub const BRAKES: u16 = 2000;
    pub const LIGHTS: u16 = 2001;
    pub const STEERING: u16 = 2002;
    pub const THROTTLE: u16 = 2003;
    pub const PING: u16 = 2005;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get_packet() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&2u32.to_be_bytes());
        assert_eq!(
            parse_inbound(&bytes),
            Some(Inbound::Get { timestamp: 1, command: 2 })
        );
    }

    #[test]
    fn parses_post_packet_big_endian_regardless_of_host() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&2011u32.to_be_bytes());
        bytes.extend_from_slice(&1.5f32.to_be_bytes());
        match parse_inbound(&bytes).unwrap() {
            Inbound::Post { command, value, .. } => {
                assert_eq!(command, 2011);
                assert_eq!(value, 1.5);
            }
            other => panic!("expected Post, got {other:?}"),
        }
    }

    #[test]
    fn parses_lidar_array() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&1130u32.to_be_bytes());
        for i in 0..LIDAR_SAMPLE_COUNT {
            bytes.extend_from_slice(&(i as f32).to_be_bytes());
        }
        match parse_inbound(&bytes).unwrap() {
            Inbound::LidarPost { samples, .. } => assert_eq!(samples.len(), LIDAR_SAMPLE_COUNT),
            other => panic!("expected LidarPost, got {other:?}"),
        }
    }

    #[test]
    fn undersized_packet_is_dropped() {
        assert_eq!(parse_inbound(&[0, 1, 2]), None);
    }

    #[test]
    fn malformed_body_length_is_dropped() {
        let mut bytes = vec![0u8; 8];
        bytes.extend_from_slice(&[1, 2, 3]); // not a multiple of 4
        assert_eq!(parse_inbound(&bytes), None);
    }

    #[test]
    fn get_response_is_null_terminated() {
        let resp = encode_get_response(7, 2, "{}");
        assert_eq!(&resp[0..4], &7u32.to_be_bytes());
        assert_eq!(&resp[4..8], &2u32.to_be_bytes());
        assert_eq!(&resp[8..10], b"{}");
        assert_eq!(resp[10], 0);
    }

    #[test]
    fn post_response_encodes_status() {
        assert_eq!(encode_post_response(true), 1u32.to_be_bytes());
        assert_eq!(encode_post_response(false), 0u32.to_be_bytes());
    }
}
