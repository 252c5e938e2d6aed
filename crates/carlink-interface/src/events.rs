use std::sync::mpsc;
use std::sync::Mutex;

use bytes::Bytes;
use carlink_command::{Command, CommandId, MainConfig, Packet, StateReport};

use crate::lock;

/// A decoded message from the vehicle.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Text printed by the vehicle firmware.
    Print { id: u8, text: String },
    State { id: u8, state: Box<StateReport> },
    /// Current configuration, or the firmware defaults when `default` is set.
    Config {
        id: u8,
        config: Box<MainConfig>,
        default: bool,
    },
    VescForward { id: u8, data: Bytes },
    Rtcm { id: u8, data: Bytes },
    Nmea { id: u8, data: Bytes },
    Ack { id: u8, command: CommandId },
    /// Any other downlink message.
    Command(Packet),
}

impl Event {
    /// Source vehicle id.
    pub fn id(&self) -> u8 {
        match self {
            Event::Print { id, .. }
            | Event::State { id, .. }
            | Event::Config { id, .. }
            | Event::VescForward { id, .. }
            | Event::Rtcm { id, .. }
            | Event::Nmea { id, .. }
            | Event::Ack { id, .. } => *id,
            Event::Command(packet) => packet.id,
        }
    }
}

impl From<Packet> for Event {
    fn from(packet: Packet) -> Self {
        let id = packet.id;
        match packet.command {
            Command::Print(text) => Event::Print { id, text },
            Command::State(state) => Event::State { id, state },
            Command::Config(config) => Event::Config {
                id,
                config,
                default: false,
            },
            Command::DefaultConfig(config) => Event::Config {
                id,
                config,
                default: true,
            },
            Command::VescForward(data) => Event::VescForward { id, data },
            Command::Rtcm(data) => Event::Rtcm { id, data },
            Command::Nmea(data) => Event::Nmea { id, data },
            Command::Ack(command) => Event::Ack { id, command },
            command => Event::Command(Packet { id, command }),
        }
    }
}

/// Fan-out of events to any number of subscribers.
///
/// Subscribers that dropped their receiver are pruned on the next publish.
#[derive(Debug, Default)]
pub struct EventHub {
    subscribers: Mutex<Vec<mpsc::Sender<Event>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel();
        lock(&self.subscribers).push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    /// Deliver `event` to every live subscriber.
    pub fn publish(&self, event: Event) {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
