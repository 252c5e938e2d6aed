#![cfg(all(unix, feature = "cli"))]

use std::net::UdpSocket;
use std::process::Command;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use carlink::command::{
    decode_packet, encode_packet, Command as Cmd, CommandId, Direction, StateReport,
};

/// Fake vehicle on loopback. Answers state requests and acknowledges
/// mutating commands, skipping the first `drop_acks` of them.
fn spawn_vehicle(drop_acks: usize) -> (u16, JoinHandle<Vec<Vec<u8>>>) {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("vehicle socket should bind");
    socket
        .set_read_timeout(Some(Duration::from_secs(3)))
        .expect("read timeout should apply");
    let port = socket.local_addr().expect("vehicle addr").port();

    let handle = thread::spawn(move || {
        let mut received = Vec::new();
        let mut dropped = 0usize;
        let mut buf = [0u8; 2048];
        while let Ok((len, from)) = socket.recv_from(&mut buf) {
            let payload = buf[..len].to_vec();
            let packet = decode_packet(&payload, Direction::ToVehicle)
                .expect("ground station sends valid payloads")
                .expect("ground station sends known commands");
            received.push(payload);

            let reply = match packet.command {
                Cmd::GetState => Some(Cmd::State(Box::new(StateReport {
                    fw_major: 3,
                    fw_minor: 7,
                    px: 1.25,
                    ..StateReport::default()
                }))),
                command if command.expects_ack() => {
                    if dropped < drop_acks {
                        dropped += 1;
                        None
                    } else {
                        Some(Cmd::Ack(command.id()))
                    }
                }
                _ => None,
            };
            if let Some(reply) = reply {
                socket
                    .send_to(&encode_packet(packet.id, &reply), from)
                    .expect("reply should send");
            }
        }
        received
    });

    (port, handle)
}

fn carlink(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_carlink"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("carlink should run")
}

#[test]
fn state_prints_vehicle_report_as_json() {
    let (port, vehicle) = spawn_vehicle(0);
    let addr = format!("127.0.0.1:{port}");

    let output = carlink(&["state", "--udp", &addr, "--id", "4"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let line = String::from_utf8(output.stdout).expect("utf8 stdout");
    let json: serde_json::Value = serde_json::from_str(line.trim()).expect("json output");
    assert_eq!(json["event"], "state");
    assert_eq!(json["id"], 4);
    assert_eq!(json["state"]["fw_major"], 3);
    assert_eq!(json["state"]["px"], 1.25);

    let received = vehicle.join().expect("vehicle thread");
    assert_eq!(received, vec![vec![4, CommandId::GetState.as_u8()]]);
}

#[test]
fn route_clear_retries_until_acknowledged() {
    let (port, vehicle) = spawn_vehicle(1);
    let addr = format!("127.0.0.1:{port}");

    let output = carlink(&[
        "route",
        "--udp",
        &addr,
        "clear",
        "--retries",
        "3",
        "--timeout",
        "300ms",
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(json["event"], "acknowledged");
    assert_eq!(json["command"], "ap_clear_points");
    assert_eq!(json["attempts"], 2);

    let received = vehicle.join().expect("vehicle thread");
    assert_eq!(received.len(), 2);
    assert_eq!(received[0], received[1]);
}

#[test]
fn unacknowledged_command_exits_with_timeout_code() {
    let (port, vehicle) = spawn_vehicle(usize::MAX);
    let addr = format!("127.0.0.1:{port}");

    let output = carlink(&[
        "autopilot",
        "on",
        "--udp",
        &addr,
        "--retries",
        "2",
        "--timeout",
        "100ms",
    ]);
    assert_eq!(output.status.code(), Some(124));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not acknowledged"));

    let received = vehicle.join().expect("vehicle thread");
    assert_eq!(received.len(), 2);
}

#[test]
fn missing_endpoint_is_a_usage_error() {
    let output = carlink(&["servo", "0.5"]);
    assert_eq!(output.status.code(), Some(2));
}
