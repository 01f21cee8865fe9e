//! Read-only view over a single startup-phase message.
//!
//! Two shapes share the same representation and are told apart by the first
//! byte:
//!
//! ```text
//! untyped:  | Length 4B | Version/marker 4B | key\0value\0 ... |
//! typed:    | Tag 1B | Body ... |
//! ```
//!
//! The length prefix of an untyped message starts with a zero byte for any
//! realistic length, so its type reads as 0. None of the accessors here
//! validate the declared length against the buffer; framing belongs to the
//! caller. Fixed-offset reads past the end fail with [`PgError::Truncated`].

use std::collections::hash_map::{self, HashMap};

use super::error::{PgError, PgResult};
use super::protocol::{tag, ProtocolVersion, INTERNAL_MARKER, STARTUP_HEADER_LEN};

/// Borrowed view over the bytes of one already-delimited message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    buf: &'a [u8],
}

impl<'a> From<&'a [u8]> for Message<'a> {
    fn from(buf: &'a [u8]) -> Self {
        Self::new(buf)
    }
}

impl<'a> Message<'a> {
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The type tag, or 0 for an untyped (startup-phase) message.
    pub fn msg_type(&self) -> u8 {
        self.buf.first().copied().unwrap_or(0)
    }

    pub fn is_untyped(&self) -> bool {
        self.msg_type() == 0
    }

    fn ensure_untyped(&self) -> PgResult<()> {
        match self.msg_type() {
            0 => Ok(()),
            observed => Err(PgError::NotUntyped { observed }),
        }
    }

    fn field<const N: usize>(&self, offset: usize) -> PgResult<[u8; N]> {
        self.buf
            .get(offset..offset + N)
            .and_then(|b| b.try_into().ok())
            .ok_or(PgError::Truncated {
                needed: offset + N,
                actual: self.buf.len(),
            })
    }

    fn read_u16(&self, offset: usize) -> PgResult<u16> {
        self.field(offset).map(u16::from_be_bytes)
    }

    fn read_i32(&self, offset: usize) -> PgResult<i32> {
        self.field(offset).map(i32::from_be_bytes)
    }

    /// Length declared in the first four bytes of an untyped message.
    pub fn declared_length(&self) -> PgResult<usize> {
        self.ensure_untyped()?;
        self.field::<4>(0).map(|b| u32::from_be_bytes(b) as usize)
    }

    /// Decode the version/marker field at offsets 4..8.
    ///
    /// Any pair of 16-bit values is accepted, including the TLS and cancel
    /// request codes.
    pub fn startup_version(&self) -> PgResult<ProtocolVersion> {
        self.ensure_untyped()?;
        let major = self.read_u16(4)?;
        let minor = self.read_u16(6)?;
        Ok(ProtocolVersion::new(major, minor))
    }

    /// Parse the NUL-terminated key/value list following the 8-byte header.
    ///
    /// Bytes after the last NUL are ignored, so a missing final terminator is
    /// tolerated. A trailing key without a value is dropped, and a repeated
    /// key keeps its last value.
    pub fn startup_args(&self) -> PgResult<StartupArgs> {
        self.ensure_untyped()?;
        let body = self.buf.get(STARTUP_HEADER_LEN..).ok_or(PgError::Truncated {
            needed: STARTUP_HEADER_LEN,
            actual: self.buf.len(),
        })?;

        let mut args = StartupArgs::default();
        let mut key = None;
        for s in CStrings(body) {
            match key.take() {
                None => key = Some(s),
                Some(k) => args.insert(k, s),
            }
        }

        tracing::trace!(count = args.len(), "parsed startup parameters");
        Ok(args)
    }

    /// True when the marker field carries the TLS negotiation code.
    pub fn is_tls_request(&self) -> bool {
        matches!(self.startup_version(), Ok(ProtocolVersion::TLS_REQUEST))
    }

    /// True when the marker field carries the cancel request code.
    pub fn is_cancel(&self) -> bool {
        matches!(self.startup_version(), Ok(ProtocolVersion::CANCEL_REQUEST))
    }

    /// True when a peer node opens an internal (non-PostgreSQL) connection.
    pub fn is_internal(&self) -> bool {
        self.is_untyped() && self.buf.get(4..8) == Some(&INTERNAL_MARKER[..])
    }

    /// True for a client Terminate ('X').
    pub fn is_terminate(&self) -> bool {
        self.msg_type() == tag::TERMINATE
    }

    /// Backend process ID and secret key carried by a cancel request.
    pub fn cancel_key_data(&self) -> PgResult<(i32, i32)> {
        if !self.is_cancel() {
            return Err(PgError::NotCancel);
        }
        self.read_cancel_fields()
    }

    fn read_cancel_fields(&self) -> PgResult<(i32, i32)> {
        Ok((self.read_i32(8)?, self.read_i32(12)?))
    }

    /// Decode the marker field once and interpret the rest of the message
    /// accordingly.
    pub fn classify(&self) -> PgResult<StartupRequest> {
        self.ensure_untyped()?;

        // "EP01" is not a version; check it before decoding one.
        if self.is_internal() {
            return Ok(StartupRequest::InternalPeer);
        }

        let request = match self.startup_version()? {
            ProtocolVersion::TLS_REQUEST => StartupRequest::TlsRequest,
            ProtocolVersion::CANCEL_REQUEST => {
                let (process_id, secret_key) = self.read_cancel_fields()?;
                StartupRequest::CancelRequest {
                    process_id,
                    secret_key,
                }
            }
            version => StartupRequest::Startup {
                version,
                args: self.startup_args()?,
            },
        };

        tracing::trace!(kind = request.kind(), "classified untyped message");
        Ok(request)
    }
}

/// Iterator over the NUL-terminated strings at the front of a buffer.
struct CStrings<'a>(&'a [u8]);

impl Iterator for CStrings<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let end = self.0.iter().position(|&b| b == 0)?;
        let s = String::from_utf8_lossy(&self.0[..end]).into_owned();
        self.0 = &self.0[end + 1..];
        Some(s)
    }
}

/// What an untyped message asks of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupRequest {
    /// Ordinary startup with the requested version and connection parameters.
    Startup {
        version: ProtocolVersion,
        args: StartupArgs,
    },
    /// The client wants to negotiate TLS before the real startup.
    TlsRequest,
    /// The client wants a running query on another backend cancelled.
    CancelRequest { process_id: i32, secret_key: i32 },
    /// A peer node; the rest of the stream is not PostgreSQL protocol.
    InternalPeer,
}

impl StartupRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            StartupRequest::Startup { .. } => "startup",
            StartupRequest::TlsRequest => "tls_request",
            StartupRequest::CancelRequest { .. } => "cancel_request",
            StartupRequest::InternalPeer => "internal_peer",
        }
    }
}

/// Connection parameters from a startup message (user, database, options...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupArgs {
    params: HashMap<String, String>,
}

impl StartupArgs {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn user(&self) -> Option<&str> {
        self.get("user")
    }

    /// Requested database. PostgreSQL defaults it to the user name when absent.
    pub fn database(&self) -> Option<&str> {
        self.get("database")
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, String> {
        self.params.iter()
    }

    pub fn into_inner(self) -> HashMap<String, String> {
        self.params
    }

    fn insert(&mut self, key: String, value: String) {
        self.params.insert(key, value);
    }
}

impl IntoIterator for StartupArgs {
    type Item = (String, String);
    type IntoIter = hash_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.into_iter()
    }
}

impl<'a> IntoIterator for &'a StartupArgs {
    type Item = (&'a String, &'a String);
    type IntoIter = hash_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}
