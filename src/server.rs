// src/server.rs
//
// UDP event loop (spec §4.10, bounding context for the core). The full
// source server also multiplexes a TCP listener, its connected clients,
// and a browser-facing HTTP surface; all of that is out of scope here
// (spec §1, "Out of scope: ... the existing HTTP static file server, the
// existing raw-socket TCP client parser"). What remains in scope is the
// UDP boundary and the two wall-clock-driven ticks that ride on it.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::time::interval;

use crate::engine::Engine;
use crate::router::{self, REGISTER_COMMAND};
use crate::view::ViewStore;
use crate::wire::{self, outbound_codes, Inbound};

const ENGINE_TICK: Duration = Duration::from_secs(1);
const OUTBOUND_TICK: Duration = Duration::from_millis(200);

/// Runs the UDP server until stdin signals shutdown (spec §4.10, "On stdin
/// readable (ENTER pressed): shut down cleanly").
pub async fn run(mut engine: Engine, view: ViewStore, bind: SocketAddr) -> anyhow::Result<()> {
    let socket = UdpSocket::bind(bind).await?;
    log::info!("listening on {bind}");

    let mut engine_ticker = interval(ENGINE_TICK);
    let mut outbound_ticker = interval(OUTBOUND_TICK);
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut recv_buf = vec![0u8; 2048];

    let mut registered_addr: Option<SocketAddr> = None;

    loop {
        let mut line = String::new();
        tokio::select! {
            result = socket.recv_from(&mut recv_buf) => {
                match result {
                    Ok((len, src)) => {
                        handle_datagram(&socket, &view, &mut engine, &recv_buf[..len], src, &mut registered_addr).await;
                    }
                    Err(e) => log::warn!("udp recv error: {e}"),
                }
            }
            _ = engine_ticker.tick() => {
                engine.time_to_complete_task_board = view
                    .task_board_completion_time()
                    .unwrap_or(f32::INFINITY);
                engine.tick(1.0, &view);
                view.project(&engine);
                view.advance_station_timers(1.0);
            }
            _ = outbound_ticker.tick() => {
                if let Some(addr) = registered_addr {
                    if !send_outbound_tick(&socket, &view, addr).await {
                        registered_addr = None;
                        view.write_dust_connected(false);
                    }
                }
            }
            bytes_read = stdin.read_line(&mut line) => {
                match bytes_read {
                    Ok(0) | Err(_) => {}
                    Ok(_) => {
                        log::info!("shutdown requested via stdin");
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn handle_datagram(
    socket: &UdpSocket,
    view: &ViewStore,
    engine: &mut Engine,
    bytes: &[u8],
    src: SocketAddr,
    registered_addr: &mut Option<SocketAddr>,
) {
    let Some(packet) = wire::parse_inbound(bytes) else {
        log::warn!("dropping undersized or malformed packet from {src}");
        return;
    };

    match packet {
        Inbound::Get { timestamp, command } => {
            if command == REGISTER_COMMAND {
                *registered_addr = Some(src);
                view.write_dust_connected(true);
                return;
            }
            let payload = router::dispatch_get(view, command).unwrap_or_default();
            let response = wire::encode_get_response(timestamp, command, &payload);
            let _ = socket.send_to(&response, src).await;
        }
        Inbound::Post { command, value, .. } => {
            if command == REGISTER_COMMAND {
                *registered_addr = Some(src);
                view.write_dust_connected(true);
                return;
            }
            let applied = router::dispatch_post(view, engine, command, value);
            let response = wire::encode_post_response(applied);
            let _ = socket.send_to(&response, src).await;
        }
        Inbound::LidarPost { samples, .. } => {
            view.write_lidar(&samples);
            let response = wire::encode_post_response(true);
            let _ = socket.send_to(&response, src).await;
        }
    }
}

/// Sends the fixed outbound sequence (brakes, lights, steering, throttle,
/// optional ping) to the registered visual simulator. Returns `false` on
/// any `sendto` failure, which aborts the rest of the sequence for this
/// tick (spec §4.9, "Outbound tick to visual simulator"; §5, "Ordering
/// guarantees").
async fn send_outbound_tick(socket: &UdpSocket, view: &ViewStore, addr: SocketAddr) -> bool {
    let timestamp = 0u32; // the source's outbound frames never depend on wall-clock identity
    let sequence = [
        (outbound_codes::BRAKES, view.get_field("ROVER", "pr_telemetry.brakes", 0.0)),
        (outbound_codes::LIGHTS, view.get_field("ROVER", "pr_telemetry.lights_on", 0.0)),
        (outbound_codes::STEERING, view.get_field("ROVER", "pr_telemetry.steering", 0.0)),
        (outbound_codes::THROTTLE, view.get_field("ROVER", "pr_telemetry.throttle", 0.0)),
    ];

    for (command, value) in sequence {
        let datagram = wire::encode_outbound_post(timestamp, command, value);
        if socket.send_to(&datagram, addr).await.is_err() {
            return false;
        }
    }

    if view.get_field("LTV", "signal.ping_requested", 0.0) != 0.0 {
        let datagram = wire::encode_outbound_post(timestamp, outbound_codes::PING, 1.0);
        if socket.send_to(&datagram, addr).await.is_err() {
            return false;
        }
        view.update_field("LTV", "signal", "ping_requested", "false");
        let pings_left = view.get_field("LTV", "signal.pings_left", 0.0);
        if pings_left > 0.0 {
            view.update_field("LTV", "signal", "pings_left", &(pings_left - 1.0).to_string());
        }
    }

    true
}
