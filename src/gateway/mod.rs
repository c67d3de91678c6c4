//! Control channel of a voice session.
//!
//! [`VoiceGateway`] drives the voice gateway WebSocket, the UDP transport
//! and every timer of a session from a single [`Stream`] implementation,
//! so one task owns the whole session and no locking is needed between the
//! control and media paths.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::pin::Pin;
use std::str::FromStr;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use futures::{Sink, Stream};
use phonic_types::OpCode;
use phonic_types::payload::incoming::SessionDescription;
use phonic_types::payload::outgoing::{Identify, SelectProtocol};
use phonic_types::payload::speaking::SpeakingFlags;
use phonic_types::payload::{Event, Speaking, VoiceGatewayEvent, VoiceGatewayEventDeserializer, binary};
use serde::de::DeserializeSeed;
use serde_json::json;
use tokio::time::{Interval, MissedTickBehavior, Sleep};
use tokio_websockets::{CloseCode as WsCloseCode, Error as WsError, Message as WsMessage};
use tracing::{debug, instrument, trace, warn};
use twilight_model::gateway::CloseFrame;
use twilight_model::gateway::event::GatewayEventDeserializer;

mod channel;
mod error;
mod event;
mod group_key;
mod heartbeater;
mod speakers;
mod state;
mod transmit;

pub use self::channel::{ChannelError, ChannelErrorType, VoiceClientSender};
pub use self::error::{VoiceGatewayError, VoiceGatewayErrorType};
pub use self::event::{SessionInfo, VoiceEvent};
pub use self::group_key::{GroupKeyEvent, GroupKeyHandler, GroupKeyReply, Passthrough};
pub use self::heartbeater::HeartbeatInfo;
pub use self::speakers::{RemoteSpeaker, Speakers};
pub use self::state::GatewayState;
pub use self::transmit::{SILENCE_FRAME, SILENCE_FRAMES};

use self::channel::{MessageChannel, VoiceCommand};
use self::heartbeater::Heartbeater;
use self::transmit::Transmitter;

use crate::audio::{VoicePacket, VoiceReceiver};
use crate::client::{VoiceConfig, VoiceSessionParameters};
use crate::crypto::{EncryptMode, TransportSecrets, VoiceGroupCrypto};
use crate::rtp::{self, SequenceClock};
use crate::udp::error::VoiceUdpError;
use crate::udp::{DiscoverIpResult, VoiceUdp};
use crate::util::{ConnectionFuture, WsConnection};

/// Datagrams handled per poll before yielding back to the runtime.
const RECEIVE_BATCH: usize = 64;

/// Large enough for any RTP packet a voice server relays.
const RECEIVE_BUFFER_LEN: usize = 2048;

/// A voice session: control WebSocket, UDP transport and the encryption
/// state tying them together.
///
/// Nothing happens until the stream is polled. The stream yields
/// [`VoiceEvent`]s in arrival order and ends after [`VoiceEvent::Closed`].
/// Errors it yields are not terminal.
pub struct VoiceGateway {
    after_close: Option<AfterClose>,
    channel: MessageChannel,
    config: VoiceConfig,

    /// WebSocket connection to the voice gateway.
    connection: Option<WsConnection>,

    /// Present only between the session description and the next
    /// teardown.
    crypto: Option<VoiceGroupCrypto>,

    /// Whether a session was established at least once, which turns the
    /// next one into a resume.
    established: bool,

    events: VecDeque<Result<VoiceEvent, VoiceGatewayError>>,
    future: Option<ConnectionFuture<WsConnection, WsError>>,
    future_udp: Option<ConnectionFuture<(VoiceUdp, DiscoverIpResult), VoiceUdpError>>,
    group_key: Box<dyn GroupKeyHandler>,
    heartbeater: Option<Heartbeater>,
    keepalive: Option<Interval>,
    outbox: VecDeque<WsMessage>,
    pacing: Option<Interval>,
    params: VoiceSessionParameters,
    receiver: VoiceReceiver,
    receiver_tx: flume::Sender<VoicePacket>,
    receive_buffer: Vec<u8>,
    reconnect: Option<Pin<Box<Sleep>>>,

    /// Cleared when a reconnect is scheduled and set again once a session
    /// description proves the reconnect worked.
    retry_available: bool,

    session: Option<Session>,
    speakers: Speakers,

    /// Speaking state requested by the user, announced again after every
    /// reconnect.
    speaking: Option<SpeakingFlags>,

    state: GatewayState,
    transmitter: Option<Transmitter>,
    udp: Option<VoiceUdp>,
}

/// What the server assigned in Ready.
#[derive(Debug)]
struct Session {
    external: Option<DiscoverIpResult>,
    mode: EncryptMode,
    ssrc: u32,
}

/// What to do once the connection is gone after a local close.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AfterClose {
    Terminal(Option<CloseFrame<'static>>),
    Reconnect(Option<u16>),
    /// Connect again right away with new parameters.
    Migrate,
}

impl VoiceGateway {
    #[must_use]
    pub fn new(params: VoiceSessionParameters, config: VoiceConfig) -> Self {
        Self::with_group_key_handler(params, config, Box::new(Passthrough))
    }

    #[must_use]
    pub fn with_group_key_handler(
        params: VoiceSessionParameters,
        config: VoiceConfig,
        group_key: Box<dyn GroupKeyHandler>,
    ) -> Self {
        let (receiver_tx, receiver) = VoiceReceiver::channel();
        Self {
            after_close: None,
            channel: MessageChannel::new(),
            config,
            connection: None,
            crypto: None,
            established: false,
            events: VecDeque::new(),
            future: None,
            future_udp: None,
            group_key,
            heartbeater: None,
            keepalive: None,
            outbox: VecDeque::new(),
            pacing: None,
            params,
            receiver,
            receiver_tx,
            receive_buffer: vec![0; RECEIVE_BUFFER_LEN],
            reconnect: None,
            retry_available: true,
            session: None,
            speakers: Speakers::default(),
            speaking: None,
            state: GatewayState::Connecting,
            transmitter: None,
            udp: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> GatewayState {
        self.state
    }

    #[must_use]
    pub const fn parameters(&self) -> &VoiceSessionParameters {
        &self.params
    }

    /// Gets a handle to queue commands and audio from other tasks.
    #[must_use]
    pub fn sender(&self) -> VoiceClientSender {
        self.channel.sender()
    }

    /// Gets a handle to the SSRC table of remote speakers.
    #[must_use]
    pub fn speakers(&self) -> Speakers {
        self.speakers.clone()
    }

    /// Gets a receiver of decrypted audio from remote speakers.
    #[must_use]
    pub fn receiver(&self) -> VoiceReceiver {
        self.receiver.clone()
    }

    /// Heartbeat statistics, `None` before Hello was received.
    #[must_use]
    pub fn heartbeat(&self) -> Option<HeartbeatInfo<'_>> {
        self.heartbeater.as_ref().map(Heartbeater::info)
    }

    /// Replaces the session parameters.
    ///
    /// A live session moves to the new voice server right away; otherwise
    /// the parameters are used by the next connection attempt.
    pub fn update_parameters(&mut self, params: VoiceSessionParameters) {
        let moved = params.endpoint != self.params.endpoint || params.token != self.params.token;
        self.params = params;

        if moved && self.connection.is_some() && self.state != GatewayState::Closing {
            debug!(endpoint = %self.params.endpoint, "voice server changed, reconnecting");
            self.begin_close(CloseFrame::RESUME, AfterClose::Migrate);
        }
    }
}

impl std::fmt::Debug for VoiceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceGateway")
            .field("crypto", &self.crypto)
            .field("group_key", &self.group_key)
            .field("heartbeater", &self.heartbeater)
            .field("params", &self.params)
            .field("session", &self.session)
            .field("state", &self.state)
            .field("udp", &self.udp)
            .finish_non_exhaustive()
    }
}

fn json_message<T: serde::Serialize>(op: OpCode, data: &T) -> WsMessage {
    WsMessage::text(json!({ "op": op, "d": data }).to_string())
}

impl VoiceGateway {
    /// Queues a close frame; `after` runs once it was written.
    fn begin_close(&mut self, frame: CloseFrame<'static>, after: AfterClose) {
        if self.connection.is_none() {
            self.apply_after_close(after);
            return;
        }

        // Only one close frame goes out; a local close still wins over a
        // pending reconnect.
        if self.state == GatewayState::Closing {
            if matches!(after, AfterClose::Terminal(_)) {
                self.after_close = Some(after);
            }
            return;
        }

        self.outbox.push_back(WsMessage::close(
            WsCloseCode::try_from(frame.code).ok(),
            &frame.reason,
        ));
        self.state = GatewayState::Closing;
        self.after_close = Some(after);
    }

    fn apply_after_close(&mut self, after: AfterClose) {
        match after {
            AfterClose::Terminal(frame) => self.finish(frame),
            AfterClose::Reconnect(code) => self.schedule_reconnect(code),
            AfterClose::Migrate => {
                self.teardown();
                self.reconnect = None;
                self.state = GatewayState::Resuming;
                self.events.push_back(Ok(VoiceEvent::Reconnecting {
                    code: None,
                    delay: Duration::ZERO,
                }));
            }
        }
    }

    /// Reacts to the connection going away without a local close.
    pub(crate) fn disconnected(&mut self, code: Option<u16>, frame: Option<CloseFrame<'static>>) {
        if let Some(after) = self.after_close.take() {
            self.apply_after_close(after);
            return;
        }

        if GatewayState::is_critical_close(code) {
            warn!(?code, "voice gateway ended the session");
            self.finish(frame);
        } else {
            debug!(?code, "voice connection dropped");
            self.schedule_reconnect(code);
        }
    }

    fn schedule_reconnect(&mut self, code: Option<u16>) {
        self.teardown();

        if !self.retry_available {
            warn!(?code, "reconnect attempt failed, closing voice session");
            self.finish(None);
            return;
        }

        let delay = self.config.reconnect_delay;
        self.retry_available = false;
        self.state = GatewayState::Resuming;
        self.reconnect = Some(Box::pin(tokio::time::sleep(delay)));
        self.events
            .push_back(Ok(VoiceEvent::Reconnecting { code, delay }));
    }

    fn finish(&mut self, frame: Option<CloseFrame<'static>>) {
        self.teardown();
        self.reconnect = None;
        self.state = GatewayState::Closed;
        self.events.push_back(Ok(VoiceEvent::Closed(frame)));
    }

    /// Drops every piece of per-connection state. Secrets never outlive
    /// the connection that negotiated them.
    fn teardown(&mut self) {
        if let Some(mut udp) = self.udp.take() {
            udp.close();
        }

        self.after_close = None;
        self.connection = None;
        self.crypto = None;
        self.future = None;
        self.future_udp = None;
        self.heartbeater = None;
        self.keepalive = None;
        self.outbox.clear();
        self.pacing = None;
        self.session = None;
        self.speakers.clear();
        self.transmitter = None;
    }
}

impl VoiceGateway {
    fn poll_commands(&mut self, cx: &mut Context<'_>) {
        while let Poll::Ready(Some(command)) = self.channel.command_rx.poll_recv(cx) {
            match command {
                VoiceCommand::Close(frame) => {
                    debug!(?frame, "closing voice session on request");
                    self.begin_close(frame.clone(), AfterClose::Terminal(Some(frame)));
                }
                VoiceCommand::Speaking(flags) => {
                    self.speaking = Some(flags);
                    if self.state.is_ready() {
                        self.queue_speaking(flags);
                    }
                }
            }

            if self.state.is_closed() {
                break;
            }
        }
    }

    fn queue_speaking(&mut self, flags: SpeakingFlags) {
        let Some(session) = self.session.as_ref() else {
            return;
        };

        trace!(?flags, "sending speaking state");
        let payload = Speaking {
            speaking: flags,
            ssrc: session.ssrc,
            user_id: None,
            delay: Some(0),
        };
        self.outbox
            .push_back(json_message(OpCode::Speaking, &payload));
    }

    /// Connects to the voice gateway if there is no connection.
    fn poll_gateway_connect(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if self.future.is_none() {
            let url = self.params.url(self.config.tls);
            let tls = self.config.tls;
            debug!(%url, "connecting to the voice gateway");

            self.future = Some(ConnectionFuture::new(async move {
                let connector = if tls {
                    tokio_websockets::Connector::new()?
                } else {
                    tokio_websockets::Connector::Plain
                };

                let (client, _) = tokio_websockets::ClientBuilder::new()
                    .uri(&url)?
                    .limits(tokio_websockets::Limits::unlimited())
                    .connector(&connector)
                    .connect()
                    .await?;

                Ok(client)
            }));
        }

        let Some(future) = self.future.as_mut() else {
            return Poll::Ready(());
        };
        let result = ready!(future.0.as_mut().poll(cx));
        self.future = None;

        match result {
            Ok(connection) => {
                debug!("connected to the voice gateway");
                self.connection = Some(connection);
                self.state = GatewayState::AwaitingHello;
            }
            Err(source) => {
                self.events.push_back(Err(VoiceGatewayError {
                    kind: VoiceGatewayErrorType::Connecting,
                    source: Some(Box::new(source)),
                }));
                self.schedule_reconnect(None);
            }
        }
        Poll::Ready(())
    }

    fn poll_flush_outbox(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        let Some(connection) = self.connection.as_mut() else {
            return Poll::Ready(Ok(()));
        };

        while !self.outbox.is_empty() {
            ready!(Pin::new(&mut *connection).poll_ready(cx))?;
            if let Some(message) = self.outbox.pop_front() {
                Pin::new(&mut *connection).start_send(message)?;
            }
        }
        Pin::new(connection).poll_flush(cx)
    }

    /// Writes queued messages and heartbeats that are due.
    fn poll_send(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        loop {
            ready!(self.poll_flush_outbox(cx))?;
            if self.state == GatewayState::Closing {
                return Poll::Ready(Ok(()));
            }

            let Some(heartbeater) = self.heartbeater.as_mut() else {
                return Poll::Ready(Ok(()));
            };
            if heartbeater.interval.poll_tick(cx).is_pending() {
                return Poll::Ready(Ok(()));
            }

            if heartbeater.has_sent() {
                warn!("heartbeat was not acknowledged, connection is zombied");
                self.begin_close(CloseFrame::RESUME, AfterClose::Reconnect(Some(CloseFrame::RESUME.code)));
                continue;
            }

            let heartbeat = heartbeater.heartbeat();
            trace!(?heartbeat, "sending heartbeat");
            self.outbox
                .push_back(json_message(OpCode::Heartbeat, &heartbeat));
        }
    }

    /// Completes IP discovery and selects the protocol.
    fn poll_udp_connect(&mut self, cx: &mut Context<'_>) {
        let Some(future) = self.future_udp.as_mut() else {
            return;
        };
        let Poll::Ready(result) = future.0.as_mut().poll(cx) else {
            return;
        };
        self.future_udp = None;

        let (udp, external) = match result {
            Ok(result) => result,
            Err(source) => {
                self.transport_failed(source);
                return;
            }
        };

        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.external = Some(external);

        let data = SelectProtocol::builder()
            .address(external.address)
            .port(external.port)
            .mode(session.mode.as_str())
            .build();

        debug!(mode = %session.mode, "selecting protocol");
        self.outbox
            .push_back(json_message(OpCode::SelectProtocol, &data));

        let period = self
            .config
            .udp_keepalive_interval
            .or_else(|| self.heartbeater.as_ref().map(|h| h.interval.period()))
            .filter(|period| !period.is_zero())
            .unwrap_or(Duration::from_secs(5));

        let mut keepalive = tokio::time::interval(period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.keepalive = Some(keepalive);
        self.udp = Some(udp);
    }

    fn transport_failed(&mut self, source: VoiceUdpError) {
        debug!(error = %source, "voice UDP transport failed");
        self.events.push_back(Err(VoiceGatewayError {
            kind: VoiceGatewayErrorType::Transport,
            source: Some(Box::new(source)),
        }));
        self.begin_close(CloseFrame::RESUME, AfterClose::Reconnect(None));
    }

    /// Sends keepalives and paced frames, then drains received datagrams.
    fn poll_media(&mut self, cx: &mut Context<'_>) {
        let mut failure = None;

        if let (Some(keepalive), Some(udp)) = (self.keepalive.as_mut(), self.udp.as_mut()) {
            while keepalive.poll_tick(cx).is_ready() {
                if let Err(source) = udp.send_keepalive() {
                    failure = Some(source);
                    break;
                }
            }
        }

        while failure.is_none() {
            let Some(pacing) = self.pacing.as_mut() else {
                break;
            };
            if pacing.poll_tick(cx).is_pending() {
                break;
            }
            failure = self.send_frame().err();
        }

        if failure.is_none() {
            failure = self.poll_receive(cx).err();
        }

        if let Some(source) = failure {
            self.transport_failed(source);
        }
    }

    fn send_frame(&mut self) -> Result<(), VoiceUdpError> {
        let (Some(transmitter), Some(udp)) = (self.transmitter.as_mut(), self.udp.as_ref()) else {
            return Ok(());
        };

        let queued = self.channel.frame_rx.try_recv().ok();
        let Some(frame) = transmitter.next_frame(queued) else {
            return Ok(());
        };

        let crypto = self
            .crypto
            .as_mut()
            .expect("secrets are populated before the pacing timer starts");

        match transmitter.packet(&frame, crypto) {
            Ok(packet) => udp.send(&packet),
            Err(error) => {
                warn!(%error, "could not seal voice frame");
                Ok(())
            }
        }
    }

    fn poll_receive(&mut self, cx: &mut Context<'_>) -> Result<(), VoiceUdpError> {
        let (Some(udp), Some(crypto)) = (self.udp.as_ref(), self.crypto.as_ref()) else {
            return Ok(());
        };

        for _ in 0..RECEIVE_BATCH {
            let len = match udp.poll_recv(cx, &mut self.receive_buffer) {
                Poll::Ready(result) => result?,
                Poll::Pending => return Ok(()),
            };

            match rtp::decode_packet(&self.receive_buffer[..len], crypto) {
                Ok(packet) => {
                    let packet = VoicePacket {
                        ssrc: packet.ssrc,
                        user_id: self.speakers.user_id(packet.ssrc),
                        sequence: packet.sequence,
                        timestamp: packet.timestamp,
                        opus: packet.payload,
                    };

                    if self.receiver_tx.try_send(packet).is_err() {
                        trace!("audio receiver is full or gone, dropping voice packet");
                    }
                }
                Err(error) => {
                    let level = error.level();
                    if level == tracing::Level::WARN {
                        warn!(%error, len, "dropping voice packet");
                    } else if level == tracing::Level::DEBUG {
                        debug!(%error, len, "dropping voice packet");
                    } else {
                        trace!(%error, len, "dropping voice packet");
                    }
                }
            }
        }

        // More datagrams may be waiting; let other tasks run first.
        cx.waker().wake_by_ref();
        Ok(())
    }
}

impl VoiceGateway {
    fn process_text(&mut self, text: &str) {
        let Some(deserializer) = GatewayEventDeserializer::from_json(text) else {
            self.events.push_back(Err(VoiceGatewayError::deserializing(
                text,
                "missing opcode",
            )));
            return;
        };

        if OpCode::from(deserializer.op()).is_none() {
            debug!(op = deserializer.op(), "ignoring unknown opcode");
            return;
        }

        let mut json = serde_json::Deserializer::from_str(text);
        match VoiceGatewayEventDeserializer::new(deserializer).deserialize(&mut json) {
            Ok(event) => self.process_event(event),
            Err(source) => self
                .events
                .push_back(Err(VoiceGatewayError::deserializing(text, source))),
        }
    }

    fn process_binary(&mut self, payload: &[u8]) {
        match binary::parse(payload) {
            Ok(event) => self.process_event(event),
            Err(error) => debug!(%error, "ignoring binary frame"),
        }
    }

    #[instrument(level = "trace", skip_all, fields(op = ?event.event.opcode(), seq = ?event.seq))]
    fn process_event(&mut self, event: VoiceGatewayEvent) {
        let VoiceGatewayEvent { seq, event } = event;

        match event {
            Event::Hello(hello) => {
                let period = Duration::from_millis(hello.heartbeat_interval);
                if period.is_zero() {
                    self.events.push_back(Err(VoiceGatewayError {
                        kind: VoiceGatewayErrorType::InvalidHeartbeatInterval,
                        source: None,
                    }));
                    self.begin_close(CloseFrame::RESUME, AfterClose::Reconnect(None));
                    return;
                }
                debug!(heartbeat_interval = ?period, "received hello, identifying");

                self.heartbeater = Some(Heartbeater::new(period));
                self.outbox.push_back(json_message(
                    OpCode::Identify,
                    &Identify {
                        guild_id: self.params.guild_id,
                        user_id: self.params.user_id,
                        session_id: self.params.session_id.clone(),
                        token: self.params.token.expose().to_owned(),
                        max_dave_protocol_version: self.group_key.max_protocol_version(),
                    },
                ));
                self.state = GatewayState::Identifying;
            }
            Event::Ready(ready) => {
                let Some(mode) = EncryptMode::negotiate(&ready.modes) else {
                    self.events.push_back(Err(VoiceGatewayError {
                        kind: VoiceGatewayErrorType::UnsupportedMode {
                            offered: ready.modes,
                        },
                        source: None,
                    }));
                    self.begin_close(CloseFrame::NORMAL, AfterClose::Terminal(Some(CloseFrame::NORMAL)));
                    return;
                };

                let (ip, port, ssrc) = (ready.ip, ready.port, ready.ssrc);
                let timeout = self.config.discovery_timeout;
                debug!(ssrc, %mode, "received ready, discovering external address");

                self.future_udp = Some(ConnectionFuture::new(async move {
                    let mut udp = VoiceUdp::connect(ip, port).await?;
                    let external = udp.discover(ssrc, timeout).await?;
                    Ok((udp, external))
                }));
                self.session = Some(Session {
                    external: None,
                    mode,
                    ssrc,
                });
                self.state = GatewayState::AwaitingReady;
            }
            Event::Resumed => debug!("voice gateway resumed the session"),
            Event::SessionDescription(description) => self.session_described(description),
            Event::HeartbeatAck(ack) => {
                let latency = self
                    .heartbeater
                    .as_mut()
                    .and_then(|heartbeater| heartbeater.acknowledged(ack.t));

                if latency.is_none() {
                    debug!("received unexpected heartbeat ack");
                }
                trace!(?latency, "received heartbeat ack");
                self.events
                    .push_back(Ok(VoiceEvent::HeartbeatAck { latency }));
            }
            Event::Speaking(speaking) => {
                self.speakers.update(&speaking);
                self.events.push_back(Ok(VoiceEvent::Speaking(speaking)));
            }
            Event::ClientConnect(event) => {
                self.events.push_back(Ok(VoiceEvent::ClientConnect(event)));
            }
            Event::ClientDisconnect(event) => {
                let ssrc = self.speakers.remove_user(event.user_id);
                self.events
                    .push_back(Ok(VoiceEvent::ClientDisconnect { event, ssrc }));
            }
            Event::PrepareTransition(ref prepare) => {
                self.handle_group_key(GroupKeyEvent::PrepareTransition(prepare));
            }
            Event::ExecuteTransition(ref execute) => {
                self.handle_group_key(GroupKeyEvent::ExecuteTransition(execute));
            }
            Event::PrepareEpoch(ref epoch) => self.handle_group_key(GroupKeyEvent::PrepareEpoch(epoch)),
            Event::MlsExternalSender(ref data) => {
                self.handle_group_key(GroupKeyEvent::ExternalSender(data));
            }
            Event::MlsProposals(ref data) => self.handle_group_key(GroupKeyEvent::Proposals(data)),
            Event::MlsAnnounceCommitTransition(ref message) => {
                self.handle_group_key(GroupKeyEvent::AnnounceCommitTransition(message));
            }
            Event::MlsWelcome(ref message) => self.handle_group_key(GroupKeyEvent::Welcome(message)),
        }

        if let (Some(seq), Some(heartbeater)) = (seq, self.heartbeater.as_mut()) {
            heartbeater.record_seq(seq);
        }
    }

    fn handle_group_key(&mut self, event: GroupKeyEvent<'_>) {
        let replies = self.group_key.handle(event);
        trace!(replies = replies.len(), "handled group key event");
        self.outbox
            .extend(replies.into_iter().map(GroupKeyReply::into_message));
    }

    fn session_described(&mut self, description: SessionDescription) {
        let Some(session) = self.session.as_ref() else {
            warn!("received session description before ready");
            return;
        };
        let Some(external) = session.external else {
            warn!("received session description before protocol selection");
            return;
        };

        let mode = match EncryptMode::from_str(&description.mode) {
            Ok(mode) => mode,
            Err(source) => {
                self.events.push_back(Err(VoiceGatewayError {
                    kind: VoiceGatewayErrorType::UnsupportedMode {
                        offered: vec![description.mode],
                    },
                    source: Some(Box::new(source)),
                }));
                self.begin_close(CloseFrame::NORMAL, AfterClose::Terminal(Some(CloseFrame::NORMAL)));
                return;
            }
        };

        let ssrc = session.ssrc;
        let secrets = TransportSecrets {
            mode,
            secret_key: description.secret_key,
            ssrc,
        };
        debug!(?secrets, "received session description");

        let clock = SequenceClock::random().with_frame_samples(self.config.frame_samples);
        let mut pacing = tokio::time::interval(self.config.frame_duration);
        pacing.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.crypto = Some(VoiceGroupCrypto::new(&secrets));
        self.transmitter = Some(Transmitter::new(ssrc, clock));
        self.pacing = Some(pacing);
        if let Some(udp) = self.udp.as_mut() {
            udp.start_streaming();
        }
        self.group_key
            .session_started(description.dave_protocol_version);

        self.retry_available = true;
        self.state = GatewayState::Ready;

        let info = SessionInfo {
            ssrc,
            mode,
            external,
            dave_protocol_version: description.dave_protocol_version,
        };
        let event = if self.established {
            VoiceEvent::Resumed(info)
        } else {
            VoiceEvent::Ready(info)
        };
        self.established = true;
        self.events.push_back(Ok(event));

        if let Some(flags) = self.speaking.filter(|flags| !flags.is_empty()) {
            self.queue_speaking(flags);
        }
    }
}

impl Stream for VoiceGateway {
    type Item = Result<VoiceEvent, VoiceGatewayError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if let Some(event) = this.events.pop_front() {
                return Poll::Ready(Some(event));
            }
            if this.state.is_closed() {
                return Poll::Ready(None);
            }

            this.poll_commands(cx);
            if !this.events.is_empty() || this.state.is_closed() {
                continue;
            }

            if let Some(timer) = this.reconnect.as_mut() {
                ready!(timer.as_mut().poll(cx));
                this.reconnect = None;
                debug!("reconnect timer elapsed");
            }

            if this.connection.is_none() {
                ready!(this.poll_gateway_connect(cx));
                continue;
            }

            if let Err(source) = ready!(this.poll_send(cx)) {
                debug!(error = %source, "could not write to the voice gateway");
                this.events.push_back(Err(VoiceGatewayError {
                    kind: VoiceGatewayErrorType::Sending,
                    source: Some(Box::new(source)),
                }));
                this.connection = None;
                this.disconnected(None, None);
                continue;
            }

            if this.state == GatewayState::Closing {
                // The close frame is written; the peer's reply is not
                // worth waiting for.
                this.connection = None;
                this.disconnected(None, None);
                continue;
            }

            this.poll_udp_connect(cx);
            this.poll_media(cx);
            if !this.events.is_empty() || !this.outbox.is_empty() {
                continue;
            }

            let Some(connection) = this.connection.as_mut() else {
                continue;
            };

            match ready!(Pin::new(connection).poll_next(cx)) {
                Some(Ok(message)) => {
                    if let Some((code, reason)) = message.as_close() {
                        let frame = (code != WsCloseCode::NO_STATUS_RECEIVED).then(|| CloseFrame {
                            code: code.into(),
                            reason: Cow::Owned(reason.to_owned()),
                        });
                        debug!(?frame, "voice gateway closed the connection");

                        this.connection = None;
                        this.disconnected(frame.as_ref().map(|frame| frame.code), frame);
                    } else if let Some(text) = message.as_text() {
                        this.process_text(text);
                    } else if message.is_binary() {
                        this.process_binary(&message.as_payload()[..]);
                    }
                }
                Some(Err(source)) => {
                    debug!(error = %source, "voice gateway connection failed");
                    this.connection = None;
                    this.disconnected(None, None);
                }
                None => {
                    debug!("voice gateway connection ended");
                    this.connection = None;
                    this.disconnected(None, None);
                }
            }
        }
    }
}
