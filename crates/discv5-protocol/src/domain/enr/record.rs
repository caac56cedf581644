//! Signed node record.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use discv5_crypto::{Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature};

use crate::domain::{DiscoveryError, NodeId};
use crate::wire::reader::ByteReader;

/// Largest encoding: IPv6 endpoint.
pub const MAX_RECORD_SIZE: usize = 8 + 33 + 1 + 16 + 2 + 2 + 64;

/// Self-signed node record.
///
/// Immutable after construction; an endpoint change produces a new record
/// with a higher sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    seq: u64,
    public_key: Secp256k1PublicKey,
    ip: IpAddr,
    udp_port: u16,
    tcp_port: Option<u16>,
    signature: Secp256k1Signature,
    node_id: NodeId,
}

impl NodeRecord {
    /// Build and sign a record for `keypair`.
    pub fn signed(
        keypair: &Secp256k1KeyPair,
        seq: u64,
        udp: SocketAddr,
        tcp_port: Option<u16>,
    ) -> Self {
        let public_key = keypair.public_key();
        let payload = signing_payload(seq, &public_key, &udp.ip(), udp.port(), tcp_port);
        Self {
            seq,
            public_key,
            ip: udp.ip(),
            udp_port: udp.port(),
            tcp_port,
            signature: keypair.sign(&payload),
            node_id: NodeId::new(public_key.to_node_id()),
        }
    }

    /// Decode and verify a record.
    pub fn decode(bytes: &[u8]) -> Result<Self, DiscoveryError> {
        let mut reader = ByteReader::new(bytes);
        let seq = reader.u64("record seq")?;
        let public_key = Secp256k1PublicKey::from_bytes(reader.array("record public key")?)?;
        let ip = match reader.u8("record ip length")? {
            4 => IpAddr::V4(Ipv4Addr::from(reader.array::<4>("record ipv4")?)),
            16 => IpAddr::V6(Ipv6Addr::from(reader.array::<16>("record ipv6")?)),
            other => {
                return Err(DiscoveryError::Message(format!(
                    "record ip length {other} is neither 4 nor 16"
                )))
            }
        };
        let udp_port = reader.u16("record udp port")?;
        let tcp_port = match reader.u16("record tcp port")? {
            0 => None,
            port => Some(port),
        };
        let signature = Secp256k1Signature::from_bytes(reader.array("record signature")?);
        if !reader.is_empty() {
            return Err(DiscoveryError::Message(format!(
                "{} trailing bytes after record",
                reader.remaining()
            )));
        }

        let payload = signing_payload(seq, &public_key, &ip, udp_port, tcp_port);
        public_key.verify(&payload, &signature)?;

        Ok(Self {
            seq,
            public_key,
            ip,
            udp_port,
            tcp_port,
            signature,
            node_id: NodeId::new(public_key.to_node_id()),
        })
    }

    /// Wire encoding: signing payload followed by the signature.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = signing_payload(
            self.seq,
            &self.public_key,
            &self.ip,
            self.udp_port,
            self.tcp_port,
        );
        out.extend_from_slice(self.signature.as_bytes());
        out
    }

    /// Node id (Keccak-256 of the public key).
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Sequence number.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Identity public key.
    pub fn public_key(&self) -> &Secp256k1PublicKey {
        &self.public_key
    }

    /// Discovery (UDP) endpoint.
    pub fn udp_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.udp_port)
    }

    /// Data (TCP) port, if advertised.
    pub fn tcp_port(&self) -> Option<u16> {
        self.tcp_port
    }
}

fn signing_payload(
    seq: u64,
    public_key: &Secp256k1PublicKey,
    ip: &IpAddr,
    udp_port: u16,
    tcp_port: Option<u16>,
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(MAX_RECORD_SIZE);
    payload.extend_from_slice(&seq.to_be_bytes());
    payload.extend_from_slice(public_key.as_bytes());
    match ip {
        IpAddr::V4(v4) => {
            payload.push(4);
            payload.extend_from_slice(&v4.octets());
        }
        IpAddr::V6(v6) => {
            payload.push(16);
            payload.extend_from_slice(&v6.octets());
        }
    }
    payload.extend_from_slice(&udp_port.to_be_bytes());
    payload.extend_from_slice(&tcp_port.unwrap_or(0).to_be_bytes());
    payload
}
