//! Message framing and typed payload bodies

use crate::constants::{MessageType, MAX_PLAYER_NAME_LEN, MAX_SESSION_NAME_LEN};
use crate::error::ProtocolError;
use crate::{HEADER_SIZE, MAGIC, MAX_MESSAGE_SIZE, PROTOCOL_VERSION};
use serde::Serialize;
use std::time::SystemTime;

/// Message header (20 bytes, network byte order)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    /// Magic number "LIBC" (4 bytes)
    pub magic: u32,
    /// Protocol version (2 bytes)
    pub version: u16,
    /// Message type (2 bytes)
    pub message_type: MessageType,
    /// Payload length (4 bytes)
    pub payload_size: u32,
    /// Sender-local sequence number (4 bytes)
    pub sequence: u32,
    /// Sender wall clock in milliseconds, truncated (4 bytes)
    pub timestamp: u32,
}

impl MessageHeader {
    pub const SIZE: usize = HEADER_SIZE;

    pub fn new(message_type: MessageType, payload_size: u32, sequence: u32) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as u32)
            .unwrap_or(0);

        Self {
            magic: MAGIC,
            version: PROTOCOL_VERSION,
            message_type,
            payload_size,
            sequence,
            timestamp,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.magic.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.version.to_be_bytes());
        bytes[6..8].copy_from_slice(&self.message_type.to_u16().to_be_bytes());
        bytes[8..12].copy_from_slice(&self.payload_size.to_be_bytes());
        bytes[12..16].copy_from_slice(&self.sequence.to_be_bytes());
        bytes[16..20].copy_from_slice(&self.timestamp.to_be_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < Self::SIZE {
            return Err(ProtocolError::TooShort {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }

        let magic = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != MAGIC {
            return Err(ProtocolError::InvalidMagic(magic));
        }

        let version = u16::from_be_bytes([bytes[4], bytes[5]]);
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::InvalidVersion(version));
        }

        let raw_type = u16::from_be_bytes([bytes[6], bytes[7]]);
        let message_type =
            MessageType::from_u16(raw_type).ok_or(ProtocolError::UnknownMessageType(raw_type))?;

        let payload_size = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let sequence = u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        let timestamp = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);

        Ok(Self {
            magic,
            version,
            message_type,
            payload_size,
            sequence,
            timestamp,
        })
    }
}

/// A validated inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        self.header.message_type
    }
}

/// Frame `payload` behind a fresh header.
pub fn encode(
    message_type: MessageType,
    payload: &[u8],
    sequence: u32,
) -> Result<Vec<u8>, ProtocolError> {
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge {
            max: MAX_MESSAGE_SIZE,
            actual: payload.len(),
        });
    }

    let header = MessageHeader::new(message_type, payload.len() as u32, sequence);

    let mut datagram = Vec::with_capacity(MessageHeader::SIZE + payload.len());
    datagram.extend_from_slice(&header.to_bytes());
    datagram.extend_from_slice(payload);
    Ok(datagram)
}

/// Validate a received datagram and split it into header and payload.
///
/// The payload region is only copied out once the header has been checked
/// and the declared size agrees with what actually arrived.
pub fn decode(datagram: &[u8]) -> Result<Message, ProtocolError> {
    let header = MessageHeader::from_bytes(datagram)?;

    let declared = header.payload_size as usize;
    if declared > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge {
            max: MAX_MESSAGE_SIZE,
            actual: declared,
        });
    }

    let actual = datagram.len() - MessageHeader::SIZE;
    if declared != actual {
        return Err(ProtocolError::SizeMismatch { declared, actual });
    }

    Ok(Message {
        header,
        payload: datagram[MessageHeader::SIZE..].to_vec(),
    })
}

/// Cut `s` to at most `max_len` bytes without splitting a character.
pub fn truncate_utf8(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Decode a text body, tolerating the NUL terminators older peers append.
pub fn decode_text(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// DISCOVERY_RESPONSE payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionAdvert {
    /// Host-chosen session identity
    pub session_id: u32,
    /// Session name shown in browsers
    pub session_name: String,
    /// Display name of the hosting player
    pub host_name: String,
    /// Port of the host's session socket
    pub host_port: u16,
    pub current_players: u8,
    pub max_players: u8,
}

impl SessionAdvert {
    const FIXED_SIZE: usize = 8;

    pub fn to_bytes(&self) -> Vec<u8> {
        let name = truncate_utf8(&self.session_name, MAX_SESSION_NAME_LEN);
        let host = truncate_utf8(&self.host_name, MAX_PLAYER_NAME_LEN);

        let mut bytes = Vec::with_capacity(Self::FIXED_SIZE + 2 + name.len() + host.len());
        bytes.extend_from_slice(&self.session_id.to_be_bytes());
        bytes.extend_from_slice(&self.host_port.to_be_bytes());
        bytes.push(self.current_players);
        bytes.push(self.max_players);
        bytes.push(name.len() as u8);
        bytes.extend_from_slice(name.as_bytes());
        bytes.push(host.len() as u8);
        bytes.extend_from_slice(host.as_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        const WHAT: &str = "discovery-response";

        if bytes.len() < Self::FIXED_SIZE + 2 {
            return Err(ProtocolError::MalformedPayload(WHAT));
        }
        let session_id = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let host_port = u16::from_be_bytes([bytes[4], bytes[5]]);
        let current_players = bytes[6];
        let max_players = bytes[7];

        let (session_name, rest) = read_short_str(&bytes[Self::FIXED_SIZE..], MAX_SESSION_NAME_LEN)
            .ok_or(ProtocolError::MalformedPayload(WHAT))?;
        let (host_name, rest) =
            read_short_str(rest, MAX_PLAYER_NAME_LEN).ok_or(ProtocolError::MalformedPayload(WHAT))?;
        if !rest.is_empty() {
            return Err(ProtocolError::MalformedPayload(WHAT));
        }

        Ok(Self {
            session_id,
            session_name,
            host_name,
            host_port,
            current_players,
            max_players,
        })
    }
}

/// Read a one-byte length prefixed UTF-8 string, returning the remainder.
fn read_short_str(bytes: &[u8], max_len: usize) -> Option<(String, &[u8])> {
    let (&len, rest) = bytes.split_first()?;
    let len = len as usize;
    if len > max_len || rest.len() < len {
        return None;
    }
    let s = std::str::from_utf8(&rest[..len]).ok()?;
    Some((s.to_string(), &rest[len..]))
}

/// JOIN_REQUEST payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequestPayload {
    /// Requested display name (may be empty)
    pub player_name: String,
}

impl JoinRequestPayload {
    pub fn new(player_name: &str) -> Self {
        Self {
            player_name: truncate_utf8(player_name.trim(), MAX_PLAYER_NAME_LEN).to_string(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        truncate_utf8(&self.player_name, MAX_PLAYER_NAME_LEN)
            .as_bytes()
            .to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(&decode_text(bytes))
    }
}

/// JOIN_RESPONSE payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinResponsePayload {
    /// Peer id the host assigned to the joining client
    pub player_id: u32,
}

impl JoinResponsePayload {
    pub const SIZE: usize = 4;

    pub fn to_bytes(&self) -> Vec<u8> {
        self.player_id.to_be_bytes().to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != Self::SIZE {
            return Err(ProtocolError::MalformedPayload("join-response"));
        }
        let player_id = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if player_id == 0 {
            return Err(ProtocolError::MalformedPayload("join-response"));
        }
        Ok(Self { player_id })
    }
}
