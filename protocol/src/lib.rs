//! LAN lobby protocol library
//!
//! Shared wire definitions for hosts and clients of a LAN session.
//! This includes message types, constants, and the header codec together with
//! the typed payload bodies carried by handshake and discovery messages.

pub mod constants;
pub mod error;
pub mod packets;

pub use constants::*;
pub use error::ProtocolError;
pub use packets::{
    decode, decode_text, encode, truncate_utf8, JoinRequestPayload, JoinResponsePayload, Message,
    MessageHeader, SessionAdvert,
};

/// Protocol version
pub const PROTOCOL_VERSION: u16 = 1;

/// Magic number: "LIBC" (0x4C494243)
pub const MAGIC: u32 = 0x4C49_4243;

/// Maximum payload size carried by a single message (1 KB)
pub const MAX_MESSAGE_SIZE: usize = 1024;

/// Header size: magic(4) + version(2) + type(2) + size(4) + sequence(4) + timestamp(4)
pub const HEADER_SIZE: usize = 20;

/// Largest well-formed datagram
pub const MAX_DATAGRAM_SIZE: usize = HEADER_SIZE + MAX_MESSAGE_SIZE;
