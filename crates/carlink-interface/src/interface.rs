use std::net::SocketAddr;
use std::sync::{mpsc, Arc, Mutex};

use bytes::Bytes;
use carlink_command::{
    decode_packet, encode_packet, Command, Direction, MainConfig, RcMode, RoutePoint,
};
use carlink_frame::{FrameParser, ParserConfig, ParserStats};
use carlink_transport::{ByteSink, UdpEndpoint};
use tracing::{debug, trace};

use crate::ack::{AckEngine, AckOutcome, AckPolicy};
use crate::error::{InterfaceError, Result};
use crate::events::{Event, EventHub};
use crate::lock;
use crate::receiver::UdpReceiver;
use crate::sender::{LinkMode, TransportSender};

/// Ground-station side of the vehicle link.
///
/// Inbound bytes go through [`on_bytes_received`](Self::on_bytes_received)
/// (framed stream) or [`on_datagram_received`](Self::on_datagram_received)
/// (direct UDP). Decoded messages are published as [`Event`]s. The parser's
/// inactivity timeout advances with [`on_tick`](Self::on_tick), normally
/// driven by a [`Ticker`](crate::Ticker).
///
/// In direct mode the interface runs its own receive thread on the UDP
/// socket; [`disconnect_udp`](Self::disconnect_udp) stops it and closes the
/// socket.
///
/// All methods take `&self`; share the interface through an `Arc` between
/// the receive thread, the ticker and callers.
#[derive(Debug)]
pub struct PacketInterface {
    inbound: Arc<Inbound>,
    sender: Mutex<TransportSender>,
    udp_rx: Mutex<Option<UdpReceiver>>,
}

/// Receive-side state, shared with the UDP receive thread.
#[derive(Debug)]
pub(crate) struct Inbound {
    rx: Mutex<FrameParser>,
    ack: AckEngine,
    events: EventHub,
}

impl Inbound {
    fn on_bytes(&self, data: &[u8]) {
        let mut parser = lock(&self.rx);
        parser.feed(data, |payload| self.dispatch(&payload));
    }

    pub(crate) fn on_datagram(&self, datagram: &[u8]) {
        // Serialized with the byte path.
        let _parser = lock(&self.rx);
        self.dispatch(datagram);
    }

    fn dispatch(&self, payload: &[u8]) {
        let packet = match decode_packet(payload, Direction::FromVehicle) {
            Ok(Some(packet)) => packet,
            Ok(None) => return,
            Err(err) => {
                debug!(error = %err, len = payload.len(), "dropping undecodable payload");
                return;
            }
        };
        trace!(id = packet.id, command = %packet.command.id(), "received");

        if let Command::Ack(command) = packet.command {
            self.ack.acknowledge(command);
        }
        self.events.publish(packet.into());
    }
}

impl Default for PacketInterface {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketInterface {
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    pub fn with_config(config: ParserConfig) -> Self {
        let max_payload_len = config.max_payload_len;
        Self {
            inbound: Arc::new(Inbound {
                rx: Mutex::new(FrameParser::with_config(config)),
                ack: AckEngine::new(),
                events: EventHub::new(),
            }),
            sender: Mutex::new(TransportSender::new(max_payload_len)),
            udp_rx: Mutex::new(None),
        }
    }

    // --- inbound ---

    /// Feed bytes from the framed stream, in any chunking.
    pub fn on_bytes_received(&self, data: &[u8]) {
        self.inbound.on_bytes(data);
    }

    /// Handle one unframed datagram, as the direct UDP path does.
    pub fn on_datagram_received(&self, datagram: &[u8]) {
        self.inbound.on_datagram(datagram);
    }

    /// Advance the parser's inactivity timer by one tick.
    ///
    /// Returns `true` when a partial frame was discarded.
    pub fn on_tick(&self) -> bool {
        lock(&self.inbound.rx).tick()
    }

    // --- fire-and-forget ---

    /// Encode and send `command` to vehicle `id` without waiting.
    pub fn send(&self, id: u8, command: &Command) -> Result<()> {
        self.send_payload(&encode_packet(id, command))
    }

    fn send_payload(&self, payload: &[u8]) -> Result<()> {
        lock(&self.sender).send_payload(payload)
    }

    pub fn get_state(&self, id: u8) -> Result<()> {
        self.send(id, &Command::GetState)
    }

    pub fn get_configuration(&self, id: u8) -> Result<()> {
        self.send(id, &Command::GetConfig)
    }

    pub fn get_default_configuration(&self, id: u8) -> Result<()> {
        self.send(id, &Command::GetDefaultConfig)
    }

    pub fn send_terminal_cmd(&self, id: u8, cmd: &str) -> Result<()> {
        self.send(id, &Command::TerminalCmd(cmd.to_owned()))
    }

    /// Forward a raw motor controller packet.
    pub fn forward_vesc(&self, id: u8, data: &[u8]) -> Result<()> {
        self.send(id, &Command::VescForward(Bytes::copy_from_slice(data)))
    }

    pub fn set_rc_control_current(&self, id: u8, current: f64, steering: f64) -> Result<()> {
        self.send(
            id,
            &Command::RcControl {
                mode: RcMode::Current,
                value: current,
                steering,
            },
        )
    }

    pub fn set_rc_control_duty(&self, id: u8, duty: f64, steering: f64) -> Result<()> {
        self.send(
            id,
            &Command::RcControl {
                mode: RcMode::Duty,
                value: duty,
                steering,
            },
        )
    }

    /// Override the vehicle's position estimate.
    pub fn set_pos(&self, id: u8, x: f64, y: f64, angle: f64) -> Result<()> {
        self.send(id, &Command::SetPosition { x, y, angle })
    }

    pub fn set_servo_direct(&self, id: u8, value: f64) -> Result<()> {
        self.send(id, &Command::SetServoDirect(value))
    }

    pub fn send_rtcm_usb(&self, id: u8, data: &[u8]) -> Result<()> {
        self.send(id, &Command::Rtcm(Bytes::copy_from_slice(data)))
    }

    pub fn send_nmea_radio(&self, id: u8, data: &[u8]) -> Result<()> {
        self.send(id, &Command::Nmea(Bytes::copy_from_slice(data)))
    }

    // --- acknowledged ---

    /// Send `command` and block until the vehicle acknowledges it or the
    /// policy's budget is exhausted.
    ///
    /// Every attempt transmits the same encoded bytes. Fails with
    /// [`InterfaceError::Busy`] without sending anything while another
    /// acknowledged request is outstanding.
    pub fn send_with_ack(
        &self,
        id: u8,
        command: &Command,
        policy: AckPolicy,
    ) -> Result<AckOutcome> {
        if !command.expects_ack() {
            return Err(InterfaceError::NotAcknowledged(command.id()));
        }
        let payload = encode_packet(id, command);
        self.inbound
            .ack
            .run(command.id(), policy, || self.send_payload(&payload))
    }

    pub fn set_route_points(
        &self,
        id: u8,
        points: &[RoutePoint],
        policy: AckPolicy,
    ) -> Result<AckOutcome> {
        self.send_with_ack(id, &Command::AddRoutePoints(points.to_vec()), policy)
    }

    pub fn remove_last_route_point(&self, id: u8, policy: AckPolicy) -> Result<AckOutcome> {
        self.send_with_ack(id, &Command::RemoveLastRoutePoint, policy)
    }

    pub fn clear_route(&self, id: u8, policy: AckPolicy) -> Result<AckOutcome> {
        self.send_with_ack(id, &Command::ClearRoute, policy)
    }

    pub fn set_ap_active(&self, id: u8, active: bool, policy: AckPolicy) -> Result<AckOutcome> {
        self.send_with_ack(id, &Command::SetAutopilotActive(active), policy)
    }

    /// Write the main configuration. Use [`AckPolicy::for_config`] unless
    /// the link is known to be fast.
    pub fn set_configuration(
        &self,
        id: u8,
        config: &MainConfig,
        policy: AckPolicy,
    ) -> Result<AckOutcome> {
        self.send_with_ack(id, &Command::SetConfig(Box::new(config.clone())), policy)
    }

    /// Fail the outstanding acknowledged request, if any.
    pub fn abandon(&self) -> bool {
        self.inbound.ack.abandon()
    }

    pub fn is_busy(&self) -> bool {
        self.inbound.ack.is_busy()
    }

    // --- endpoints ---

    /// Register where framed outbound bytes go.
    pub fn set_byte_sink<S: ByteSink + 'static>(&self, sink: S) {
        lock(&self.sender).set_sink(Box::new(sink));
    }

    /// Switch to direct mode towards `remote`, binding local port `port + 1`
    /// and starting the receive thread.
    ///
    /// Any previous endpoint is closed first, so reconnecting to the same
    /// vehicle rebinds the same port. An unspecified address (`0.0.0.0`)
    /// only closes it and returns `None`. Otherwise returns the local
    /// address datagrams are received on.
    pub fn connect_udp(&self, remote: SocketAddr) -> Result<Option<SocketAddr>> {
        let mut slot = lock(&self.udp_rx);
        self.close_udp(&mut slot);
        if remote.ip().is_unspecified() {
            return Ok(None);
        }
        let endpoint = UdpEndpoint::connect(remote)?;
        self.open_udp(&mut slot, endpoint).map(Some)
    }

    /// Switch to direct mode over an already bound endpoint.
    pub fn attach_udp(&self, endpoint: UdpEndpoint) -> Result<SocketAddr> {
        let mut slot = lock(&self.udp_rx);
        self.close_udp(&mut slot);
        self.open_udp(&mut slot, endpoint)
    }

    /// Return to framed mode. Stops the receive thread and closes the socket.
    pub fn disconnect_udp(&self) {
        let mut slot = lock(&self.udp_rx);
        self.close_udp(&mut slot);
    }

    fn open_udp(
        &self,
        slot: &mut Option<UdpReceiver>,
        endpoint: UdpEndpoint,
    ) -> Result<SocketAddr> {
        let local = endpoint.local_addr()?;
        let receiver = UdpReceiver::spawn(endpoint.try_clone()?, Arc::clone(&self.inbound))?;
        *slot = Some(receiver);
        lock(&self.sender).attach_udp(endpoint);
        Ok(local)
    }

    fn close_udp(&self, slot: &mut Option<UdpReceiver>) {
        // Join the receiver before releasing the sending half.
        if let Some(mut receiver) = slot.take() {
            receiver.stop();
        }
        drop(lock(&self.sender).detach_udp());
    }

    pub fn is_udp_connected(&self) -> bool {
        lock(&self.sender).is_udp_connected()
    }

    pub fn link_mode(&self) -> LinkMode {
        lock(&self.sender).mode()
    }

    // --- observation ---

    pub fn subscribe(&self) -> mpsc::Receiver<Event> {
        self.inbound.events.subscribe()
    }

    pub fn parser_stats(&self) -> ParserStats {
        lock(&self.inbound.rx).stats()
    }
}
