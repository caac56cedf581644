//! The packet-processing pipeline and request/response plumbing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, trace, warn};

use super::pending::{PendingRequests, Response};
use crate::domain::{
    is_bucket_distance, log_distance, DiscoveryConfig, DiscoveryError, LocalNode, NodeId,
    NodeRecord, RoutingTable, RoutingTableStats, Timestamp,
};
use crate::lookup::RecursiveLookupTask;
use crate::message::{random_request_id, Message, MessageType};
use crate::ports::{
    AddressAccessPolicy, AllowAllPolicy, FindNodes, MessageDispatcher, NoOpDispatcher,
    TimeSource, Transport,
};
use crate::session::{MessageOutcome, SessionManager};
use crate::wire::{
    AuthData, ChallengeAuthData, HandshakeAuthData, Packet, RawPacket, MAX_PACKET_SIZE,
};

/// What happened to one inbound datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOutcome {
    /// A message was decrypted and handled.
    Delivered,
    /// The message could not be opened; a WHOAREYOU went back.
    ChallengeSent,
    /// A WHOAREYOU was answered with a HANDSHAKE.
    HandshakeSent,
    /// Dropped as malformed, undecryptable or unexpected.
    BadPacket,
    /// Dropped by the address policy.
    Filtered,
}

/// Reply to a PING.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PongResponse {
    /// Responder's record seq
    pub enr_seq: u64,
    /// Our address as the responder saw it
    pub observed: SocketAddr,
}

/// Service counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Datagrams received
    pub packets_in: u64,
    /// Datagrams sent
    pub packets_out: u64,
    /// Inbound datagrams dropped as bad
    pub bad_packets: u64,
    /// Outbound packets refused (oversize or denied destination)
    pub dropped_outbound: u64,
    /// Live sessions
    pub sessions: usize,
    /// Requests awaiting a response
    pub pending_requests: usize,
    /// Routing table summary
    pub table: RoutingTableStats,
}

#[derive(Debug, Default)]
struct Counters {
    packets_in: AtomicU64,
    packets_out: AtomicU64,
    bad_packets: AtomicU64,
    dropped_outbound: AtomicU64,
}

/// Discovery node: owns the sessions and request table, shares the routing
/// table with whoever drives maintenance.
///
/// Inbound datagrams are fed to [`handle_inbound`](Self::handle_inbound) by
/// a transport adapter; each call is one self-contained unit of work and
/// any number may run concurrently.
pub struct DiscoveryService {
    local: Arc<LocalNode>,
    table: Arc<RoutingTable>,
    sessions: SessionManager,
    pending: PendingRequests,
    transport: Arc<dyn Transport>,
    dispatcher: Arc<dyn MessageDispatcher>,
    policy: Arc<dyn AddressAccessPolicy>,
    time: Arc<dyn TimeSource>,
    config: DiscoveryConfig,
    counters: Counters,
}

impl DiscoveryService {
    /// Create a service. Fails if `config` is invalid.
    pub fn new(
        local: Arc<LocalNode>,
        table: Arc<RoutingTable>,
        transport: Arc<dyn Transport>,
        config: DiscoveryConfig,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, DiscoveryError> {
        config.validate()?;
        info!(
            "[discv5] Local node {} at {}",
            local.node_id(),
            local.record().udp_socket_addr()
        );
        Ok(Self {
            local,
            table,
            sessions: SessionManager::new(config.session_timeout_secs),
            pending: PendingRequests::default(),
            transport,
            dispatcher: Arc::new(NoOpDispatcher),
            policy: Arc::new(AllowAllPolicy),
            time,
            config,
            counters: Counters::default(),
        })
    }

    /// Receive every decrypted message.
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn MessageDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Restrict which addresses we talk to.
    pub fn with_access_policy(mut self, policy: Arc<dyn AddressAccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Local node.
    pub fn local(&self) -> &Arc<LocalNode> {
        &self.local
    }

    /// Shared routing table.
    pub fn routing_table(&self) -> &Arc<RoutingTable> {
        &self.table
    }

    /// Session table.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Seed the routing table.
    pub fn add_bootstrap_nodes(&self, records: impl IntoIterator<Item = NodeRecord>) {
        for record in records {
            self.table.offer(record);
        }
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Process one inbound datagram from `source`.
    ///
    /// Never fails: anything wrong with the packet ends as
    /// [`PacketOutcome::BadPacket`] and a log line.
    pub async fn handle_inbound(&self, bytes: &[u8], source: SocketAddr) -> PacketOutcome {
        self.counters.packets_in.fetch_add(1, Ordering::Relaxed);
        if !self.policy.allow(&source) {
            trace!("[discv5] Ignoring packet from filtered address {}", source);
            return PacketOutcome::Filtered;
        }
        match self.process(bytes, source).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.counters.bad_packets.fetch_add(1, Ordering::Relaxed);
                debug!("[discv5] Dropped packet from {}: {}", source, err);
                PacketOutcome::BadPacket
            }
        }
    }

    async fn process(
        &self,
        bytes: &[u8],
        source: SocketAddr,
    ) -> Result<PacketOutcome, DiscoveryError> {
        let packet = RawPacket::decode(bytes)?.demask(self.local.node_id())?;
        let now = self.time.now();
        match packet.header().auth_data() {
            AuthData::WhoAreYou(challenge) => self.on_challenge(&packet, challenge, now).await,
            AuthData::Handshake(auth) => self.on_handshake(&packet, auth, source, now).await,
            AuthData::Message(auth) => self.on_message(&packet, auth.src_id, source, now).await,
        }
    }

    async fn on_challenge(
        &self,
        packet: &Packet,
        challenge: &ChallengeAuthData,
        now: Timestamp,
    ) -> Result<PacketOutcome, DiscoveryError> {
        let (node_id, addr, packets) = self
            .sessions
            .with_session_by_nonce(packet.header().nonce(), |session| {
                let node_id = *session.node_id();
                let addr = session.remote_addr();
                session
                    .handle_challenge(&self.local, packet, challenge, now)
                    .map(|packets| (node_id, addr, packets))
            })
            .ok_or(DiscoveryError::UnexpectedChallenge)??;

        for outbound in &packets {
            self.send_packet(outbound, &node_id, addr).await?;
        }
        Ok(PacketOutcome::HandshakeSent)
    }

    async fn on_handshake(
        &self,
        packet: &Packet,
        auth: &HandshakeAuthData,
        source: SocketAddr,
        now: Timestamp,
    ) -> Result<PacketOutcome, DiscoveryError> {
        let node_id = auth.src_id;
        let (plaintext, flushed) = self
            .sessions
            .with_existing_session(&node_id, |session| {
                let plaintext = session.handle_handshake(&self.local, packet, auth, source, now)?;
                let flushed = session.drain_queued(&self.local)?;
                Ok::<_, DiscoveryError>((plaintext, flushed))
            })
            .ok_or_else(|| DiscoveryError::UnknownSession(node_id.to_string()))??;

        if let Some(record) = &auth.record {
            self.table.offer(record.clone());
        }
        for outbound in &flushed {
            self.send_packet(outbound, &node_id, source).await?;
        }
        let message = Message::decode(&plaintext)?;
        self.handle_message(message, node_id, source, now).await?;
        Ok(PacketOutcome::Delivered)
    }

    async fn on_message(
        &self,
        packet: &Packet,
        node_id: NodeId,
        source: SocketAddr,
        now: Timestamp,
    ) -> Result<PacketOutcome, DiscoveryError> {
        let outcome = self
            .sessions
            .with_session(node_id, source, now, |session| {
                session.handle_message(packet, source, now)
            });
        match outcome {
            MessageOutcome::Decrypted(plaintext) => {
                let message = Message::decode(&plaintext)?;
                self.handle_message(message, node_id, source, now).await?;
                Ok(PacketOutcome::Delivered)
            }
            MessageOutcome::Challenge(whoareyou) => {
                trace!("[discv5] Challenging {} at {}", node_id, source);
                self.send_packet(&whoareyou, &node_id, source).await?;
                Ok(PacketOutcome::ChallengeSent)
            }
        }
    }

    async fn handle_message(
        &self,
        message: Message,
        node_id: NodeId,
        source: SocketAddr,
        now: Timestamp,
    ) -> Result<(), DiscoveryError> {
        trace!("[discv5] {:?} from {}", message.message_type(), node_id);
        match &message {
            Message::Ping { request_id, .. } => {
                let pong = Message::Pong {
                    request_id: *request_id,
                    enr_seq: self.local.seq(),
                    observed: source,
                };
                self.reply(node_id, source, pong, now).await?;
            }
            Message::FindNode {
                request_id,
                distances,
            } => {
                let records = self.records_at(distances);
                let per_message = self.config.max_nodes_per_response;
                for nodes in Message::nodes_responses(*request_id, records, per_message) {
                    self.reply(node_id, source, nodes, now).await?;
                }
            }
            Message::Pong { .. } | Message::Nodes { .. } => {
                if !self.pending.on_response(&node_id, &message) {
                    debug!(
                        "[discv5] Unsolicited {:?} from {}",
                        message.message_type(),
                        node_id
                    );
                }
            }
        }
        if let Some(info) = self.sessions.get_session(&node_id) {
            self.dispatcher.dispatch(&message, &info);
        }
        Ok(())
    }

    /// Records answering a FINDNODE, deduplicated across distances.
    fn records_at(&self, distances: &[u16]) -> Vec<NodeRecord> {
        let mut seen = Vec::new();
        let mut records = Vec::new();
        for &distance in distances {
            if seen.contains(&distance) || !(distance == 0 || is_bucket_distance(distance)) {
                continue;
            }
            seen.push(distance);
            records.extend(self.table.get_all_node_records(distance));
        }
        records
    }

    /// Send over an existing session.
    async fn reply(
        &self,
        node_id: NodeId,
        addr: SocketAddr,
        message: Message,
        now: Timestamp,
    ) -> Result<(), DiscoveryError> {
        let packet = self.sessions.with_session(node_id, addr, now, |session| {
            session.prepare_outbound(&self.local, message, now)
        })?;
        if let Some(packet) = packet {
            self.send_packet(&packet, &node_id, addr).await?;
        }
        Ok(())
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Send `message` to `peer`, handshaking first if needed.
    ///
    /// Without a session the message is queued and a random packet goes out
    /// instead; the queue is flushed once the peer's WHOAREYOU is answered.
    pub async fn send_message(
        &self,
        peer: &NodeRecord,
        message: Message,
    ) -> Result<(), DiscoveryError> {
        let now = self.time.now();
        let addr = peer.udp_socket_addr();
        let node_id = *peer.node_id();
        let packet = self.sessions.with_session(node_id, addr, now, |session| {
            session.set_node_record(peer.clone());
            if session.recipient_key().is_none() {
                // Until keys exist the signed record is the only endpoint we trust.
                session.set_remote_addr(addr);
            }
            session.prepare_outbound(&self.local, message, now)
        })?;
        if let Some(packet) = packet {
            self.send_packet(&packet, &node_id, addr).await?;
        }
        Ok(())
    }

    async fn send_packet(
        &self,
        packet: &Packet,
        dest_id: &NodeId,
        addr: SocketAddr,
    ) -> Result<(), DiscoveryError> {
        if !self.policy.allow(&addr) {
            self.counters.dropped_outbound.fetch_add(1, Ordering::Relaxed);
            return Err(DiscoveryError::Transport(format!(
                "destination {addr} denied by policy"
            )));
        }
        let bytes = packet.encode(dest_id);
        if bytes.len() > MAX_PACKET_SIZE {
            self.counters.dropped_outbound.fetch_add(1, Ordering::Relaxed);
            warn!(
                "[discv5] Dropping {} byte packet to {} (limit {})",
                bytes.len(),
                addr,
                MAX_PACKET_SIZE
            );
            return Err(DiscoveryError::Transport(format!(
                "packet of {} bytes exceeds {MAX_PACKET_SIZE}",
                bytes.len()
            )));
        }
        self.transport.send(bytes, addr).await?;
        self.counters.packets_out.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Send a request and wait for its complete response.
    ///
    /// A response marks the peer live in the routing table. Dropping the
    /// future forgets the request.
    async fn request(
        &self,
        peer: &NodeRecord,
        message: Message,
    ) -> Result<Response, DiscoveryError> {
        let request_id = message.request_id();
        let expected = match message.message_type() {
            MessageType::Ping => MessageType::Pong,
            MessageType::FindNode => MessageType::Nodes,
            other => {
                return Err(DiscoveryError::InvalidArgument(format!(
                    "{other:?} is not a request"
                )))
            }
        };
        let (_guard, rx) = self.pending.register(request_id, *peer.node_id(), expected);
        self.send_message(peer, message).await?;

        match tokio::time::timeout(self.request_timeout(), rx).await {
            Ok(Ok(response)) => {
                self.table.on_node_contacted(peer.clone());
                Ok(response)
            }
            Ok(Err(_)) => Err(DiscoveryError::Transport("request abandoned".into())),
            Err(_) => {
                trace!("[discv5] Request {} to {} timed out", request_id, peer.node_id());
                Err(DiscoveryError::Timeout)
            }
        }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.config.request_timeout_millis)
    }

    /// PING `peer`.
    pub async fn ping(&self, peer: &NodeRecord) -> Result<PongResponse, DiscoveryError> {
        let message = Message::Ping {
            request_id: random_request_id(),
            enr_seq: self.local.seq(),
        };
        match self.request(peer, message).await? {
            Response::Pong { enr_seq, observed } => Ok(PongResponse { enr_seq, observed }),
            Response::Nodes(_) => Err(DiscoveryError::Message("NODES in reply to PING".into())),
        }
    }

    /// Run a lookup for `target` with the configured budget and window.
    pub async fn lookup(
        self: &Arc<Self>,
        target: NodeId,
    ) -> Result<Vec<NodeRecord>, DiscoveryError> {
        let finder: Arc<dyn FindNodes> = self.clone();
        let task = RecursiveLookupTask::new(
            Arc::clone(&self.table),
            finder,
            target,
            *self.local.node_id(),
            self.config.lookup_query_budget,
        )?
        .with_max_concurrent(self.config.max_concurrent_queries)?;
        Ok(task.execute().await)
    }

    // =========================================================================
    // Housekeeping
    // =========================================================================

    /// Refresh one bucket and drop idle sessions.
    pub fn perform_maintenance(&self) {
        self.table.perform_maintenance();
        self.sessions.evict_idle(self.time.now());
    }

    /// PING every record the routing table asks about, until the channel
    /// closes. A PONG marks the node live.
    pub async fn run_liveness_checks(self: Arc<Self>, mut checks: UnboundedReceiver<NodeRecord>) {
        while let Some(record) = checks.recv().await {
            let service = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(err) = service.ping(&record).await {
                    debug!(
                        "[discv5] Liveness check of {} failed: {}",
                        record.node_id(),
                        err
                    );
                }
            });
        }
        debug!("[discv5] Liveness channel closed");
    }

    /// Counters and table summary.
    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            packets_in: self.counters.packets_in.load(Ordering::Relaxed),
            packets_out: self.counters.packets_out.load(Ordering::Relaxed),
            bad_packets: self.counters.bad_packets.load(Ordering::Relaxed),
            dropped_outbound: self.counters.dropped_outbound.load(Ordering::Relaxed),
            sessions: self.sessions.len(),
            pending_requests: self.pending.len(),
            table: self.table.stats(),
        }
    }
}

#[async_trait]
impl FindNodes for DiscoveryService {
    async fn find_nodes(
        &self,
        peer: &NodeRecord,
        distance: u16,
    ) -> Result<Vec<NodeRecord>, DiscoveryError> {
        let message = Message::FindNode {
            request_id: random_request_id(),
            distances: vec![distance],
        };
        let records = match self.request(peer, message).await? {
            Response::Nodes(records) => records,
            Response::Pong { .. } => {
                return Err(DiscoveryError::Message("PONG in reply to FINDNODE".into()))
            }
        };

        let total = records.len();
        let valid: Vec<NodeRecord> = records
            .into_iter()
            .filter(|record| log_distance(peer.node_id(), record.node_id()) == distance)
            .collect();
        if valid.len() < total {
            debug!(
                "[discv5] {} returned {} records outside distance {}",
                peer.node_id(),
                total - valid.len(),
                distance
            );
        }
        for record in &valid {
            self.table.offer(record.clone());
        }
        Ok(valid)
    }
}

impl std::fmt::Debug for DiscoveryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryService")
            .field("local", &self.local.node_id())
            .field("sessions", &self.sessions)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
