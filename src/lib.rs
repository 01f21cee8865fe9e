//! pghandshake - PostgreSQL startup-phase message handling for servers.
//!
//! Decodes the untyped messages a client sends right after connecting
//! (startup, TLS request, cancel request, internal peer marker) and builds the
//! short replies the server answers with. No I/O happens here: callers hand in
//! one framed message at a time and write the returned bytes themselves.
//!
//! ```
//! use pghandshake::{FrontendMessage, Message, StartupRequest};
//! use pghandshake::pg::protocol::StartupMessage;
//!
//! let bytes = StartupMessage::new("alice").encode();
//! let msg = Message::new(&bytes);
//!
//! match msg.classify().unwrap() {
//!     StartupRequest::Startup { version, args } => {
//!         assert_eq!(version.to_string(), "3.0");
//!         assert_eq!(args.user(), Some("alice"));
//!     }
//!     other => panic!("unexpected request: {:?}", other),
//! }
//! ```

pub mod pg;

pub use pg::{
    auth_ok, backend_key_data, tls_response, FrontendMessage, Handshake, HandshakeAction,
    HandshakeConfig, Message, PgError, PgResult, ProtocolVersion, Reply, StartupArgs,
    StartupRequest,
};
