//! Simulated vehicle for the direct UDP path.
//!
//! Answers state and configuration requests, keeps an autopilot route and
//! acknowledges every mutating command.
//!
//! Run with:
//!   cargo run --example vehicle-sim -- 127.0.0.1:8300
//!
//! In another terminal:
//!   cargo run --features cli -- state --udp 127.0.0.1:8300
//!   cargo run --features cli -- route --udp 127.0.0.1:8300 clear

use std::net::UdpSocket;

use carlink::command::{
    decode_packet, encode_packet, Command, Direction, MainConfig, RoutePoint, StateReport,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8300".to_string());
    let socket = UdpSocket::bind(&addr)?;
    eprintln!("Vehicle listening on {addr}");

    let mut state = StateReport {
        fw_major: 1,
        fw_minor: 0,
        vin: 11.8,
        temp_fet: 31.0,
        q: [1.0, 0.0, 0.0, 0.0],
        ..StateReport::default()
    };
    let mut config = MainConfig::default();
    let mut route: Vec<RoutePoint> = Vec::new();
    let mut autopilot = false;

    let mut buf = [0u8; 4096];
    loop {
        let (len, from) = socket.recv_from(&mut buf)?;
        let packet = match decode_packet(&buf[..len], Direction::ToVehicle) {
            Ok(Some(packet)) => packet,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("Bad packet from {from}: {e}");
                continue;
            }
        };

        let ack = packet.command.expects_ack().then(|| packet.command.id());
        let reply = match packet.command {
            Command::GetState => Some(Command::State(Box::new(state.clone()))),
            Command::GetConfig => Some(Command::Config(Box::new(config.clone()))),
            Command::GetDefaultConfig => {
                Some(Command::DefaultConfig(Box::new(MainConfig::default())))
            }
            Command::SetConfig(new) => {
                config = *new;
                None
            }
            Command::AddRoutePoints(points) => {
                route.extend(points);
                None
            }
            Command::RemoveLastRoutePoint => {
                route.pop();
                None
            }
            Command::ClearRoute => {
                route.clear();
                None
            }
            Command::SetAutopilotActive(on) => {
                autopilot = on;
                None
            }
            Command::SetPosition { x, y, angle } => {
                state.px = x;
                state.py = y;
                state.yaw = angle;
                None
            }
            Command::TerminalCmd(cmd) => Some(Command::Print(format!(
                "{cmd}: route has {} points, autopilot {}\n",
                route.len(),
                if autopilot { "on" } else { "off" }
            ))),
            other => {
                eprintln!("Ignoring {}", other.id());
                None
            }
        };

        if let Some(reply) = reply {
            socket.send_to(&encode_packet(packet.id, &reply), from)?;
        }
        if let Some(id) = ack {
            socket.send_to(&encode_packet(packet.id, &Command::Ack(id)), from)?;
        }
    }
}
