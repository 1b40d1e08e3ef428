// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message factories and the protocol registry.

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::message::tbp::{self, TbpMessage};
use crate::message::Message;
use dashmap::DashMap;
use std::sync::Arc;

/// Creates and parses the messages of one wire protocol.
pub trait Protocol: Send + Sync {
    /// Registry name, e.g. `"jsonrpc"`
    fn name(&self) -> &'static str;
    fn mime_type(&self) -> &'static str;

    fn new_request(&self, method: &str) -> Result<Box<dyn Message>>;
    fn parse_request(&self, bytes: &[u8]) -> Result<Box<dyn Message>>;
    fn parse_response(&self, bytes: &[u8]) -> Result<Box<dyn Message>>;

    fn new_response(&self, request: &dyn Message) -> Box<dyn Message> {
        request.new_response()
    }
}

// =======================================================================
// TBP
// =======================================================================

#[derive(Debug, Default)]
pub struct TbpProtocol;

impl Protocol for TbpProtocol {
    fn name(&self) -> &'static str {
        tbp::PROTOCOL_NAME
    }

    fn mime_type(&self) -> &'static str {
        tbp::MIME_TYPE
    }

    fn new_request(&self, method: &str) -> Result<Box<dyn Message>> {
        Ok(Box::new(TbpMessage::request(method)?))
    }

    fn parse_request(&self, bytes: &[u8]) -> Result<Box<dyn Message>> {
        Ok(Box::new(TbpMessage::parse_request(bytes)?))
    }

    fn parse_response(&self, bytes: &[u8]) -> Result<Box<dyn Message>> {
        Ok(Box::new(TbpMessage::parse_response(bytes)?))
    }
}

// =======================================================================
// JSON-RPC
// =======================================================================

#[cfg(feature = "jsonrpc")]
pub use json::JsonRpcProtocol;

#[cfg(feature = "jsonrpc")]
mod json {
    use super::Protocol;
    use crate::error::{Error, Result};
    use crate::message::jsonrpc::{self, JsonRpcMessage};
    use crate::message::Message;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// JSON-RPC 2.0 with sequential request ids.
    #[derive(Debug)]
    pub struct JsonRpcProtocol {
        next_id: AtomicI64,
        base64_line_size: usize,
    }

    impl JsonRpcProtocol {
        #[must_use]
        pub fn new(base64_line_size: usize) -> Self {
            Self {
                next_id: AtomicI64::new(1),
                base64_line_size,
            }
        }
    }

    impl Default for JsonRpcProtocol {
        fn default() -> Self {
            Self::new(crate::config::DEFAULT_BASE64_LINE_SIZE)
        }
    }

    impl Protocol for JsonRpcProtocol {
        fn name(&self) -> &'static str {
            jsonrpc::PROTOCOL_NAME
        }

        fn mime_type(&self) -> &'static str {
            jsonrpc::MIME_TYPE
        }

        fn new_request(&self, method: &str) -> Result<Box<dyn Message>> {
            if method.is_empty() {
                return Err(Error::Request("JSON-RPC request without method".into()));
            }
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            Ok(Box::new(
                JsonRpcMessage::request(method, id).with_base64_line_size(self.base64_line_size),
            ))
        }

        fn parse_request(&self, bytes: &[u8]) -> Result<Box<dyn Message>> {
            Ok(Box::new(
                JsonRpcMessage::parse_request(bytes)?.with_base64_line_size(self.base64_line_size),
            ))
        }

        fn parse_response(&self, bytes: &[u8]) -> Result<Box<dyn Message>> {
            Ok(Box::new(JsonRpcMessage::parse_response(bytes)?))
        }
    }
}

// =======================================================================
// Registry
// =======================================================================

/// Protocols available to a context, by name.
///
/// Cloning shares the same table.
#[derive(Clone, Default)]
pub struct ProtocolRegistry {
    protocols: Arc<DashMap<String, Arc<dyn Protocol>>>,
}

impl ProtocolRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every protocol compiled into the crate
    #[must_use]
    pub fn with_defaults(settings: &Settings) -> Self {
        let registry = Self::new();
        registry.register(Arc::new(TbpProtocol));
        #[cfg(feature = "jsonrpc")]
        registry.register(Arc::new(JsonRpcProtocol::new(settings.base64_line_size)));
        #[cfg(not(feature = "jsonrpc"))]
        let _ = settings;
        registry
    }

    /// Add or replace a protocol under its own name
    pub fn register(&self, protocol: Arc<dyn Protocol>) {
        log::debug!("[rpc] Registered protocol '{}' ({})", protocol.name(), protocol.mime_type());
        self.protocols.insert(protocol.name().to_string(), protocol);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.protocols.contains_key(name)
    }

    /// Protocol registered as `name`
    pub fn load_component(&self, name: &str) -> Result<Arc<dyn Protocol>> {
        self.protocols
            .get(name)
            .map(|p| Arc::clone(&p))
            .ok_or_else(|| Error::UnsupportedFeature(format!("unknown protocol '{}'", name)))
    }

    /// Protocol producing messages of `mime_type`
    pub fn by_mime_type(&self, mime_type: &str) -> Option<Arc<dyn Protocol>> {
        // parameters such as "; charset=utf-8" do not select the protocol
        let essence = mime_type.split(';').next().unwrap_or_default().trim();
        self.protocols
            .iter()
            .find(|entry| entry.value().mime_type().eq_ignore_ascii_case(essence))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.protocols.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolRegistry")
            .field("protocols", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    #[test]
    fn test_default_registry() {
        let registry = ProtocolRegistry::with_defaults(&Settings::default());
        assert!(registry.contains("tbp"));
        assert_eq!(
            registry.by_mime_type("application/octet-stream").map(|p| p.name()),
            Some("tbp")
        );
        assert!(registry.load_component("xmlrpc").is_err());

        let tbp = registry.load_component("tbp").unwrap();
        let request = tbp.new_request("ping").unwrap();
        assert_eq!(request.method_name(), Some("ping"));
        let response = tbp.new_response(request.as_ref());
        assert_eq!(response.kind(), MessageKind::Response);
    }

    #[cfg(feature = "jsonrpc")]
    #[test]
    fn test_jsonrpc_ids_increase() {
        let registry = ProtocolRegistry::with_defaults(&Settings::default());
        let json = registry
            .by_mime_type("application/json; charset=utf-8")
            .unwrap();
        let mut a = json.new_request("m").unwrap();
        let mut b = json.new_request("m").unwrap();
        let a: serde_json::Value = serde_json::from_slice(&a.finish().unwrap()).unwrap();
        let b: serde_json::Value = serde_json::from_slice(&b.finish().unwrap()).unwrap();
        assert_eq!(a["id"].as_i64().unwrap() + 1, b["id"].as_i64().unwrap());
        assert!(json.new_request("").is_err());
    }
}
