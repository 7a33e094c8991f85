use crate::protocol::packet::ConnectPacket;
use crate::protocol::properties::ConnectProperties;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

fn default_keep_alive_secs() -> u16 {
    60
}

fn default_clean_start() -> bool {
    true
}

fn default_request_problem_info() -> bool {
    true
}

/// Connection options for one MQTT v5 client.
///
/// Loaded from a TOML or JSON file, or built in code. `validate()` must
/// pass before the config is handed to the connect path.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Client identifier sent in CONNECT.
    pub client_id: String,
    /// Keepalive interval in seconds; 0 disables keepalive entirely.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u16,
    #[serde(default = "default_clean_start")]
    pub clean_start: bool,
    /// Session expiry interval property; absent means "expire on disconnect".
    #[serde(default)]
    pub session_expiry_secs: Option<u32>,
    /// Receive maximum property; absent defers to the protocol default.
    #[serde(default)]
    pub receive_maximum: Option<u16>,
    /// Ask the server for response information in CONNACK.
    #[serde(default)]
    pub request_response_info: bool,
    /// Ask the server to include reason strings and user properties on errors.
    #[serde(default = "default_request_problem_info")]
    pub request_problem_info: bool,
}

impl ClientConfig {
    /// Load a config from a `.toml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            Ok(serde_json::from_str(&data)
                .with_context(|| format!("invalid json config {}", path.display()))?)
        } else {
            Ok(toml::from_str(&data)
                .with_context(|| format!("invalid toml config {}", path.display()))?)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            bail!("client_id must be non-empty");
        }
        if self.client_id.len() > 65535 {
            bail!("client_id exceeds 65535 bytes");
        }
        let has_invalid = self
            .client_id
            .chars()
            .any(|c| !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.');
        if has_invalid {
            bail!("client_id contains characters outside [A-Za-z0-9._-]");
        }
        if self.receive_maximum == Some(0) {
            bail!("receive_maximum must be > 0 when set");
        }
        Ok(())
    }

    /// Keepalive interval as a duration; `Duration::ZERO` when disabled.
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(u64::from(self.keep_alive_secs))
    }

    /// Build the CONNECT packet these options describe. Credentials and a
    /// will message, which are runtime rather than configuration concerns,
    /// can be added on the returned packet.
    pub fn connect_packet(&self) -> ConnectPacket {
        ConnectPacket::new(&self.client_id, self.keep_alive_secs)
            .with_clean_start(self.clean_start)
            .with_properties(ConnectProperties {
                session_expiry_interval: self.session_expiry_secs,
                receive_maximum: self.receive_maximum,
                request_response_info: self.request_response_info,
                request_problem_info: self.request_problem_info,
                ..ConnectProperties::default()
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ClientConfig {
        toml::from_str(r#"client_id = "muon-1""#).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cfg = base();
        assert_eq!(cfg.keep_alive_secs, 60);
        assert!(cfg.clean_start);
        assert!(!cfg.request_response_info);
        assert!(cfg.request_problem_info);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_client_ids() {
        let mut cfg = base();
        cfg.client_id = String::new();
        assert!(cfg.validate().is_err());

        cfg.client_id = "has spaces".to_string();
        assert!(cfg.validate().is_err());

        cfg.client_id = "ok-id_0.9".to_string();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_receive_maximum() {
        let mut cfg = base();
        cfg.receive_maximum = Some(0);
        assert!(cfg.validate().is_err());
        cfg.receive_maximum = Some(32);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_connect_packet_carries_options() {
        let cfg: ClientConfig = toml::from_str(
            r#"
            client_id = "muon-1"
            keep_alive_secs = 30
            session_expiry_secs = 120
            request_response_info = true
            "#,
        )
        .unwrap();
        let packet = cfg.connect_packet();
        assert_eq!(packet.keep_alive, 30);
        assert_eq!(packet.properties.session_expiry_interval, Some(120));
        assert!(packet.properties.request_response_info);
        assert!(packet.properties.request_problem_info);
    }
}
