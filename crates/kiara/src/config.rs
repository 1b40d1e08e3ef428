// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! KIARA configuration
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: compile-time constants (collector threshold, key
//!   derivation parameters, protocol defaults)
//! - **Level 2 (Dynamic)**: [`RuntimeConfig`], a cloneable handle shared by a
//!   context and its connections/services (settings + secret key store)
//! - **Level 3 (Files)**: [`ServerConfiguration`], the document a server
//!   publishes to describe its services, protocols and transports
//!
//! # Example
//!
//! ```
//! use kiara::config::{RuntimeConfig, DEFAULT_MAX_POSSIBLE_CYCLE_ROOTS};
//!
//! let config = RuntimeConfig::new();
//! assert_eq!(config.settings().max_possible_cycle_roots, DEFAULT_MAX_POSSIBLE_CYCLE_ROOTS);
//!
//! config.set_secret_key("session", "correct horse battery staple");
//! assert!(config.secret_key("session").is_some());
//! ```

use crate::error::{Error, Result};
use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

// =======================================================================
// Cycle Collector
// =======================================================================

/// Number of possible cycle roots after which a collection runs automatically.
pub const DEFAULT_MAX_POSSIBLE_CYCLE_ROOTS: usize = 10_000;

// =======================================================================
// Marshaling
// =======================================================================

/// Array elements a single received message may announce in total.
pub const DEFAULT_MAX_MESSAGE_ELEMENTS: usize = 1 << 20;

// =======================================================================
// Key Derivation
// =======================================================================

/// Salt mixed into passphrase-derived keys.
///
/// Fixed: the same passphrase yields the same key in every process. Peers
/// rely on this to agree on a key from a shared secret text.
pub const KEY_DERIVATION_SALT: [u8; 8] = [0x51, 0x21, 0x00, 0x23, 0x76, 0xfa, 0xd7, 0xac];

/// PBKDF2 iteration count for passphrase-derived keys.
pub const KEY_DERIVATION_ROUNDS: u32 = 5;

/// Secret key name used by `Encrypted` fields that do not name one.
pub const DEFAULT_SECRET_KEY_NAME: &str = "default";

// =======================================================================
// Protocols
// =======================================================================

/// Protocol used when neither the caller nor a server configuration picks one.
pub const DEFAULT_PROTOCOL: &str = "jsonrpc";

/// Base64 line width (0 = single line).
pub const DEFAULT_BASE64_LINE_SIZE: usize = 0;

/// Cipher used for `Encrypted` values unless settings name another one.
pub const DEFAULT_CIPHER: &str = "aes-256-gcm";

/// Per-context tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Collector threshold, see [`DEFAULT_MAX_POSSIBLE_CYCLE_ROOTS`]
    pub max_possible_cycle_roots: usize,
    /// Element budget per received message, see [`DEFAULT_MAX_MESSAGE_ELEMENTS`]
    pub max_message_elements: usize,
    /// Protocol name looked up in the protocol registry
    pub default_protocol: String,
    /// Line width for base64-encoded binary streams
    pub base64_line_size: usize,
    /// Cipher name for encrypted values (`aes-256-gcm`, `chacha20-poly1305`)
    pub cipher: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_possible_cycle_roots: DEFAULT_MAX_POSSIBLE_CYCLE_ROOTS,
            max_message_elements: DEFAULT_MAX_MESSAGE_ELEMENTS,
            default_protocol: DEFAULT_PROTOCOL.to_string(),
            base64_line_size: DEFAULT_BASE64_LINE_SIZE,
            cipher: DEFAULT_CIPHER.to_string(),
        }
    }
}

/// Runtime configuration handle.
///
/// Clone is cheap (two `Arc` increments); all clones observe the same
/// settings and key store.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Swapped atomically, readers never block
    settings: Arc<ArcSwap<Settings>>,

    /// Secret key texts by name (passphrases, not derived keys)
    secret_keys: Arc<DashMap<Arc<str>, Arc<str>>>,
}

impl RuntimeConfig {
    /// Create a config with default settings and no keys
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    #[must_use]
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: Arc::new(ArcSwap::new(Arc::new(settings))),
            secret_keys: Arc::new(DashMap::new()),
        }
    }

    // ===================================================================
    // Settings
    // ===================================================================

    /// Snapshot of the current settings
    #[must_use]
    pub fn settings(&self) -> Arc<Settings> {
        self.settings.load_full()
    }

    /// Replace all settings at once
    pub fn set_settings(&self, settings: Settings) {
        self.settings.store(Arc::new(settings));
    }

    /// Apply a change to a copy of the current settings and publish it
    pub fn update_settings(&self, f: impl FnOnce(&mut Settings)) {
        let mut next = (*self.settings.load_full()).clone();
        f(&mut next);
        self.settings.store(Arc::new(next));
    }

    // ===================================================================
    // Secret Keys
    // ===================================================================

    /// Register (or replace) the secret text for a key name
    pub fn set_secret_key(&self, name: &str, passphrase: &str) {
        if passphrase.is_empty() {
            log::warn!("[config] Secret key '{}' registered with an empty passphrase", name);
        }
        self.secret_keys.insert(Arc::from(name), Arc::from(passphrase));
    }

    #[must_use]
    pub fn secret_key(&self, name: &str) -> Option<Arc<str>> {
        self.secret_keys.get(name).map(|v| Arc::clone(&v))
    }

    pub fn remove_secret_key(&self, name: &str) -> Option<Arc<str>> {
        self.secret_keys.remove(name).map(|(_, v)| v)
    }

    /// Registered key names (sorted)
    #[must_use]
    pub fn secret_key_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .secret_keys
            .iter()
            .map(|entry| entry.key().to_string())
            .collect();
        names.sort();
        names
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuntimeConfig {
    // Key texts are never printed.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("settings", &*self.settings.load())
            .field("secret_keys", &self.secret_key_names())
            .finish()
    }
}

// =======================================================================
// Server Configuration Document
// =======================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolInfo {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportInfo {
    pub name: String,
    pub url: String,
}

/// One endpoint offered by a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerInfo {
    pub services: Vec<String>,
    pub protocol: ProtocolInfo,
    pub transport: TransportInfo,
}

/// Configuration document published by a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfiguration {
    pub info: String,
    #[serde(rename = "idlURL")]
    pub idl_url: String,
    #[serde(rename = "idlContents")]
    pub idl_contents: String,
    pub servers: Vec<ServerInfo>,
}

impl ServerConfiguration {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid JSON: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    #[cfg(feature = "config-loaders")]
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(format!("invalid YAML: {}", e)))
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&text),
            #[cfg(feature = "config-loaders")]
            Some("yaml" | "yml") => Self::from_yaml(&text),
            other => Err(Error::Config(format!(
                "unsupported configuration format: {:?}",
                other
            ))),
        }
    }

    /// First server entry whose protocol is accepted by `supported`.
    pub fn select_server(&self, supported: impl Fn(&str) -> bool) -> Option<&ServerInfo> {
        self.servers.iter().find(|s| supported(&s.protocol.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "info": "calc server",
        "idlURL": "/idl/calc.kiara",
        "idlContents": "",
        "servers": [
            {
                "services": ["calc.add"],
                "protocol": { "name": "xmlrpc" },
                "transport": { "name": "http", "url": "http://localhost:8080/rpc/xml" }
            },
            {
                "services": ["*"],
                "protocol": { "name": "jsonrpc" },
                "transport": { "name": "http", "url": "http://localhost:8080/rpc/calc" }
            }
        ]
    }"#;

    #[test]
    fn test_settings_default() {
        let config = RuntimeConfig::new();
        let settings = config.settings();
        assert_eq!(settings.max_possible_cycle_roots, 10_000);
        assert_eq!(settings.default_protocol, "jsonrpc");
    }

    #[test]
    fn test_update_settings_visible_to_clones() {
        let config = RuntimeConfig::new();
        let clone = config.clone();
        config.update_settings(|s| s.max_possible_cycle_roots = 3);
        assert_eq!(clone.settings().max_possible_cycle_roots, 3);
    }

    #[test]
    fn test_secret_keys() {
        let config = RuntimeConfig::new();
        config.set_secret_key("b", "two");
        config.set_secret_key("a", "one");
        assert_eq!(config.secret_key("a").as_deref(), Some("one"));
        assert_eq!(config.secret_key_names(), vec!["a", "b"]);
        assert_eq!(config.remove_secret_key("a").as_deref(), Some("one"));
        assert!(config.secret_key("a").is_none());
        assert!(!format!("{:?}", config).contains("two"));
    }

    #[test]
    fn test_server_configuration_json() {
        let cfg = ServerConfiguration::from_json(SAMPLE).unwrap();
        assert_eq!(cfg.info, "calc server");
        assert_eq!(cfg.idl_url, "/idl/calc.kiara");
        assert_eq!(cfg.servers.len(), 2);

        let chosen = cfg.select_server(|p| p == "jsonrpc").unwrap();
        assert_eq!(chosen.transport.url, "http://localhost:8080/rpc/calc");
        assert!(cfg.select_server(|p| p == "tbp").is_none());

        let again = ServerConfiguration::from_json(&cfg.to_json().unwrap()).unwrap();
        assert_eq!(again, cfg);
    }

    #[test]
    fn test_server_configuration_invalid() {
        let err = ServerConfiguration::from_json("{ not json").unwrap_err();
        assert_eq!(err.code(), crate::ResultCode::ConfigError);
    }

    #[cfg(feature = "config-loaders")]
    #[test]
    fn test_server_configuration_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yaml");
        std::fs::write(
            &path,
            concat!(
                "info: yaml server\n",
                "servers:\n",
                "  - services: [\"echo\"]\n",
                "    protocol:\n",
                "      name: tbp\n",
            ),
        )
        .unwrap();

        let cfg = ServerConfiguration::load_file(&path).unwrap();
        assert_eq!(cfg.info, "yaml server");
        assert_eq!(cfg.servers[0].protocol.name, "tbp");
        assert!(cfg.servers[0].transport.url.is_empty());
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.ini");
        std::fs::write(&path, "info=x").unwrap();
        assert!(ServerConfiguration::load_file(&path).is_err());
    }
}
