//! PostgreSQL startup-phase message encoding and reply construction.
//!
//! This module covers the messages exchanged before a session is established.
//! Reference: https://www.postgresql.org/docs/current/protocol-message-formats.html

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use super::message::Message;

// ============================================================================
// Protocol Constants
// ============================================================================

/// Length of the untyped header: length (4 bytes) + version/marker (4 bytes).
pub const STARTUP_HEADER_LEN: usize = 8;

/// Marker occupying the version field of an internal peer connection.
pub const INTERNAL_MARKER: &[u8; 4] = b"EP01";

/// PostgreSQL's own limit on the size of a startup packet.
pub const MAX_STARTUP_PACKET_LEN: usize = 10_000;

/// Type tags used by startup-phase messages.
pub mod tag {
    /// Authentication request ('R')
    pub const AUTHENTICATION: u8 = b'R';
    /// Backend key data ('K')
    pub const BACKEND_KEY_DATA: u8 = b'K';
    /// Terminate ('X')
    pub const TERMINATE: u8 = b'X';
    /// TLS accepted, single byte reply ('S')
    pub const TLS_ACCEPTED: u8 = b'S';
    /// TLS refused, single byte reply ('N')
    pub const TLS_REFUSED: u8 = b'N';
}

/// Protocol version carried in the marker field of an untyped message.
///
/// The field is two big-endian 16-bit integers. Besides real versions it also
/// carries the TLS and cancel request codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtocolVersion {
    pub major: u16,
    pub minor: u16,
}

impl ProtocolVersion {
    /// PostgreSQL protocol version 3.0
    pub const V3: Self = Self::new(3, 0);
    /// TLS negotiation request code (1234.5679)
    pub const TLS_REQUEST: Self = Self::new(1234, 5679);
    /// Cancel request code (1234.5678)
    pub const CANCEL_REQUEST: Self = Self::new(1234, 5678);

    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// Split a 32-bit wire code into major (high half) and minor (low half).
    pub const fn from_code(code: u32) -> Self {
        Self::new((code >> 16) as u16, code as u16)
    }

    /// The 32-bit wire code, e.g. 196608 for 3.0.
    pub const fn code(self) -> u32 {
        ((self.major as u32) << 16) | self.minor as u32
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

// ============================================================================
// Frontend (Client -> Server) Messages
// ============================================================================

/// Trait for encoding frontend messages
pub trait FrontendMessage {
    fn encode(&self) -> BytesMut;
}

/// Write the untyped header and patch the length once the body is in place.
fn encode_untyped(version_field: &[u8; 4], body: impl FnOnce(&mut BytesMut)) -> BytesMut {
    let mut buf = BytesMut::new();

    // Placeholder for length (will be filled in at the end)
    buf.put_i32(0);
    buf.put_slice(version_field);

    body(&mut buf);

    // Fill in length (includes length field itself)
    let len = buf.len() as i32;
    buf[0..4].copy_from_slice(&len.to_be_bytes());

    buf
}

/// Startup message sent at connection start
#[derive(Debug, Clone)]
pub struct StartupMessage {
    pub version: ProtocolVersion,
    pub user: String,
    pub database: Option<String>,
    pub options: Vec<(String, String)>,
}

impl StartupMessage {
    /// A protocol 3.0 startup for `user` with no other parameters.
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            version: ProtocolVersion::V3,
            user: user.into(),
            database: None,
            options: Vec::new(),
        }
    }
}

impl FrontendMessage for StartupMessage {
    fn encode(&self) -> BytesMut {
        encode_untyped(&self.version.code().to_be_bytes(), |buf| {
            buf.put_slice(b"user\0");
            buf.put_slice(self.user.as_bytes());
            buf.put_u8(0);

            if let Some(ref db) = self.database {
                buf.put_slice(b"database\0");
                buf.put_slice(db.as_bytes());
                buf.put_u8(0);
            }

            for (key, value) in &self.options {
                buf.put_slice(key.as_bytes());
                buf.put_u8(0);
                buf.put_slice(value.as_bytes());
                buf.put_u8(0);
            }

            // Terminator
            buf.put_u8(0);
        })
    }
}

/// TLS negotiation request (no type byte, 8 bytes)
#[derive(Debug, Clone, Copy)]
pub struct TlsRequestMessage;

impl FrontendMessage for TlsRequestMessage {
    fn encode(&self) -> BytesMut {
        encode_untyped(&ProtocolVersion::TLS_REQUEST.code().to_be_bytes(), |_| {})
    }
}

/// Cancel request, sent on a fresh connection (no type byte, 16 bytes)
#[derive(Debug, Clone, Copy)]
pub struct CancelRequestMessage {
    pub process_id: i32,
    pub secret_key: i32,
}

impl FrontendMessage for CancelRequestMessage {
    fn encode(&self) -> BytesMut {
        encode_untyped(&ProtocolVersion::CANCEL_REQUEST.code().to_be_bytes(), |buf| {
            buf.put_i32(self.process_id);
            buf.put_i32(self.secret_key);
        })
    }
}

/// Opening packet of a peer node connecting for internal communication.
/// Whatever follows it is not PostgreSQL protocol.
#[derive(Debug, Clone, Copy)]
pub struct InternalPeerMessage;

impl FrontendMessage for InternalPeerMessage {
    fn encode(&self) -> BytesMut {
        encode_untyped(INTERNAL_MARKER, |_| {})
    }
}

/// Terminate message ('X') - Close the connection
#[derive(Debug, Clone, Copy)]
pub struct TerminateMessage;

impl FrontendMessage for TerminateMessage {
    fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u8(tag::TERMINATE);
        buf.put_i32(4);
        buf
    }
}

// ============================================================================
// Backend (Server -> Client) Replies
// ============================================================================

static TLS_ACCEPTED: [u8; 1] = [tag::TLS_ACCEPTED];
static TLS_REFUSED: [u8; 1] = [tag::TLS_REFUSED];
static AUTH_OK: [u8; 9] = [tag::AUTHENTICATION, 0, 0, 0, 8, 0, 0, 0, 0];

/// An immutable reply built by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply(Bytes);

impl Reply {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// View the reply through the same accessors used for decoding.
    pub fn as_message(&self) -> Message<'_> {
        Message::new(&self.0)
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Reply {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Single byte answer to a TLS request. On 'S' the client must immediately
/// start the TLS handshake; on 'N' it continues in plaintext.
pub fn tls_response(supported: bool) -> Reply {
    let answer: &'static [u8] = if supported {
        &TLS_ACCEPTED
    } else {
        &TLS_REFUSED
    };
    Reply(Bytes::from_static(answer))
}

/// AuthenticationOk ('R', length 8, code 0).
pub fn auth_ok() -> Reply {
    Reply(Bytes::from_static(&AUTH_OK))
}

/// BackendKeyData ('K', length 12): the process ID and secret a client later
/// presents in a cancel request.
pub fn backend_key_data(process_id: i32, secret_key: i32) -> Reply {
    let mut buf = BytesMut::with_capacity(13);
    buf.put_u8(tag::BACKEND_KEY_DATA);
    buf.put_i32(12);
    buf.put_i32(process_id);
    buf.put_i32(secret_key);
    Reply(buf.freeze())
}
