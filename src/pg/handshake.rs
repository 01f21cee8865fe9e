//! Server side of the startup phase.
//!
//! [`Handshake::respond`] turns one untyped message into the action the
//! connection handler should take. It never touches a socket: TLS replies are
//! returned as bytes, and everything after the decision (the TLS session
//! itself, cancelling a backend, handing the stream to a peer protocol)
//! belongs to the caller.

use bytes::{BufMut, BytesMut};

use super::config::HandshakeConfig;
use super::error::{PgError, PgResult};
use super::message::{Message, StartupArgs, StartupRequest};
use super::protocol::{
    auth_ok, backend_key_data, tls_response, ProtocolVersion, Reply, STARTUP_HEADER_LEN,
};

/// What the connection handler should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeAction {
    /// Send `reply`; on 'S' start TLS, then expect a new startup message.
    Tls { reply: Reply },
    /// Cancel the query running on the matching backend and close.
    Cancel { process_id: i32, secret_key: i32 },
    /// Hand the stream over to the internal peer protocol.
    InternalPeer,
    /// Authenticate the client with these parameters.
    Startup {
        version: ProtocolVersion,
        args: StartupArgs,
    },
}

/// Answers startup-phase requests according to a [`HandshakeConfig`].
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    config: HandshakeConfig,
}

impl Handshake {
    pub fn new(config: HandshakeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Decide how to answer one untyped message.
    pub fn respond(&self, msg: Message<'_>) -> PgResult<HandshakeAction> {
        let length = msg.declared_length()?;
        if length < STARTUP_HEADER_LEN {
            tracing::warn!(length, "rejecting startup message with invalid length");
            return Err(PgError::StartupTooSmall { length });
        }
        if length > self.config.max_startup_len {
            tracing::warn!(
                length,
                max = self.config.max_startup_len,
                "rejecting oversized startup message"
            );
            return Err(PgError::StartupTooLarge {
                length,
                max: self.config.max_startup_len,
            });
        }

        let request = msg.classify()?;
        tracing::debug!(kind = request.kind(), length, "startup request");

        match request {
            StartupRequest::TlsRequest => Ok(HandshakeAction::Tls {
                reply: tls_response(self.config.tls_supported),
            }),
            StartupRequest::CancelRequest {
                process_id,
                secret_key,
            } => Ok(HandshakeAction::Cancel {
                process_id,
                secret_key,
            }),
            StartupRequest::InternalPeer if self.config.accept_internal => {
                Ok(HandshakeAction::InternalPeer)
            }
            StartupRequest::InternalPeer => {
                tracing::warn!("internal peer connection refused");
                Err(PgError::InternalPeerRejected)
            }
            StartupRequest::Startup { version, .. }
                if version.major != self.config.supported_major =>
            {
                tracing::warn!(%version, "unsupported frontend protocol");
                Err(PgError::UnsupportedVersion {
                    requested: version,
                    supported: self.config.supported_major,
                })
            }
            StartupRequest::Startup { version, args } => {
                tracing::debug!(
                    %version,
                    user = args.user().unwrap_or(""),
                    database = args.database().unwrap_or(""),
                    "startup accepted for authentication"
                );
                Ok(HandshakeAction::Startup { version, args })
            }
        }
    }

    /// Replies for a client that passed authentication: AuthenticationOk
    /// followed by the key data it needs for later cancel requests.
    pub fn accept(&self, process_id: i32, secret_key: i32) -> BytesMut {
        let ok = auth_ok();
        let key = backend_key_data(process_id, secret_key);

        let mut buf = BytesMut::with_capacity(ok.len() + key.len());
        buf.put_slice(ok.as_bytes());
        buf.put_slice(key.as_bytes());
        buf
    }
}
