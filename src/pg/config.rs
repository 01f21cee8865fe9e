//! Server-side handshake configuration.

use serde::Deserialize;

use super::error::{PgError, PgResult};
use super::protocol::{MAX_STARTUP_PACKET_LEN, STARTUP_HEADER_LEN};

/// How the server answers startup-phase requests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandshakeConfig {
    /// Answer TLS requests with 'S' (default: false)
    pub tls_supported: bool,
    /// Largest declared startup length accepted (default: 10000)
    pub max_startup_len: usize,
    /// Accept "EP01" internal peer connections (default: true)
    pub accept_internal: bool,
    /// Protocol major version spoken by the server (default: 3)
    pub supported_major: u16,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            tls_supported: false,
            max_startup_len: MAX_STARTUP_PACKET_LEN,
            accept_internal: true,
            supported_major: 3,
        }
    }
}

impl HandshakeConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    ///
    /// Example: `{"tls_supported": true, "max_startup_len": 4096}`
    pub fn from_json(json: &str) -> PgResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PgResult<()> {
        if self.max_startup_len < STARTUP_HEADER_LEN {
            return Err(PgError::Config(format!(
                "max_startup_len must be at least {}, got {}",
                STARTUP_HEADER_LEN, self.max_startup_len
            )));
        }
        Ok(())
    }

    pub fn with_tls(mut self, supported: bool) -> Self {
        self.tls_supported = supported;
        self
    }

    pub fn with_internal_peers(mut self, accept: bool) -> Self {
        self.accept_internal = accept;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HandshakeConfig::default();
        assert!(!config.tls_supported);
        assert_eq!(config.max_startup_len, 10_000);
        assert!(config.accept_internal);
        assert_eq!(config.supported_major, 3);
    }

    #[test]
    fn test_from_json_partial() {
        let config = HandshakeConfig::from_json(r#"{"tls_supported": true}"#).unwrap();
        assert!(config.tls_supported);
        assert_eq!(config.max_startup_len, 10_000);
    }

    #[test]
    fn test_from_json_rejects_tiny_limit() {
        let err = HandshakeConfig::from_json(r#"{"max_startup_len": 4}"#).unwrap_err();
        assert!(matches!(err, PgError::Config(_)));
    }

    #[test]
    fn test_from_json_rejects_unknown_field() {
        let err = HandshakeConfig::from_json(r#"{"tls": true}"#).unwrap_err();
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
