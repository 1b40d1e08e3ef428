// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request/response byte transports.

use super::Service;
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;

/// Synchronous request/response exchange with a remote endpoint.
///
/// The core never performs I/O itself: a transport receives the encoded
/// request and returns the encoded response (or a connection/network error).
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    fn send_data(&self, uri: &str, request: &[u8], mime_type: &str) -> Result<Vec<u8>>;
}

/// A closure-based transport.
impl<F> Transport for F
where
    F: Fn(&str, &[u8], &str) -> Result<Vec<u8>> + Send + Sync,
{
    fn name(&self) -> &str {
        "fn"
    }

    fn send_data(&self, uri: &str, request: &[u8], mime_type: &str) -> Result<Vec<u8>> {
        self(uri, request, mime_type)
    }
}

/// In-process transport dispatching to services bound by URI.
#[derive(Default)]
pub struct LoopbackTransport {
    services: DashMap<String, Arc<Service>>,
}

impl LoopbackTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `service` at `uri`, replacing any previous binding
    pub fn bind(&self, uri: &str, service: Arc<Service>) {
        log::debug!("[rpc] Loopback bound '{}' to service '{}'", uri, service.name());
        self.services.insert(uri.to_string(), service);
    }

    pub fn unbind(&self, uri: &str) -> bool {
        self.services.remove(uri).is_some()
    }
}

impl Transport for LoopbackTransport {
    fn name(&self) -> &str {
        "loopback"
    }

    fn send_data(&self, uri: &str, request: &[u8], mime_type: &str) -> Result<Vec<u8>> {
        // Clone the handle so the map shard is not held during dispatch.
        let service = self
            .services
            .get(uri)
            .map(|s| Arc::clone(&s))
            .ok_or_else(|| Error::Connection(format!("no service bound at '{}'", uri)))?;
        service.handle_request(request, mime_type)
    }
}
