//! Simulated vehicle behind a serial-to-TCP bridge, using the tokio codec.
//!
//! Run with:
//!   cargo run --example async-framed-sim --features async -- 127.0.0.1:65102
//!
//! In another terminal:
//!   cargo run --features cli -- state --tcp 127.0.0.1:65102
//!   cargo run --features cli -- autopilot on --tcp 127.0.0.1:65102

use std::time::Duration;

use carlink::command::{decode_packet, encode_packet, Command, Direction, StateReport};
use carlink::frame::PacketCodec;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_util::codec::Framed;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:65102".to_string());
    let listener = TcpListener::bind(&addr).await?;
    eprintln!("Bridge listening on {addr}");

    loop {
        let (stream, peer) = listener.accept().await?;
        eprintln!("Ground station connected: {peer}");

        tokio::spawn(async move {
            let mut framed = Framed::new(stream, PacketCodec::new());
            let mut tick = tokio::time::interval(Duration::from_millis(10));
            let mut state = StateReport {
                fw_major: 1,
                fw_minor: 0,
                ..StateReport::default()
            };

            loop {
                let payload = tokio::select! {
                    frame = framed.next() => match frame {
                        Some(Ok(payload)) => payload,
                        Some(Err(e)) => {
                            eprintln!("Frame error: {e}");
                            break;
                        }
                        None => break,
                    },
                    _ = tick.tick() => {
                        framed.codec_mut().parser_mut().tick();
                        continue;
                    }
                };

                let Ok(Some(packet)) = decode_packet(&payload, Direction::ToVehicle) else {
                    continue;
                };
                let reply = match &packet.command {
                    Command::GetState => Command::State(Box::new(state.clone())),
                    Command::SetPosition { x, y, .. } => {
                        state.px = *x;
                        state.py = *y;
                        continue;
                    }
                    command if command.expects_ack() => Command::Ack(command.id()),
                    _ => continue,
                };
                if let Err(e) = framed.send(encode_packet(packet.id, &reply)).await {
                    eprintln!("Send failed: {e}");
                    break;
                }
            }
            eprintln!("Ground station disconnected: {peer}");
        });
    }
}
