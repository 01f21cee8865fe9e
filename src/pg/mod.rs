//! PostgreSQL startup-phase protocol implementation.
//!
//! This module covers everything a server sees before authentication starts:
//! - Decoding the untyped startup message and its parameter list
//! - Recognizing TLS, cancel and internal peer requests
//! - Building the TLS answer, AuthenticationOk and BackendKeyData replies
//!
//! Architecture:
//! - `message`: Borrowed message view and decoders
//! - `protocol`: Constants, protocol versions, encoders and reply builders
//! - `handshake`: Server-side decision for one startup request
//! - `config`: Handshake configuration
//! - `error`: Error type shared by all of the above

pub mod config;
pub mod error;
pub mod handshake;
pub mod message;
pub mod protocol;


pub use config::HandshakeConfig;
pub use error::{PgError, PgResult};
pub use handshake::{Handshake, HandshakeAction};
pub use message::{Message, StartupArgs, StartupRequest};
pub use protocol::{
    auth_ok, backend_key_data, tls_response, FrontendMessage, ProtocolVersion, Reply,
};
