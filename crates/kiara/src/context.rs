// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-thread owner of a type world, its configuration and protocols.
//!
//! A [`Context`] is not shared between threads; each logical thread of
//! execution creates its own. Connections and services created from it
//! share its [`RuntimeConfig`] (settings and secret keys) and its
//! [`ProtocolRegistry`].

use crate::config::{RuntimeConfig, ServerConfiguration};
use crate::error::{Error, Result};
use crate::rpc::{Connection, Protocol, ProtocolRegistry, Service, Transport};
use crate::types::World;
use parking_lot::Mutex;
use std::sync::Arc;

pub struct Context {
    world: World,
    config: RuntimeConfig,
    protocols: ProtocolRegistry,
    last_error: Mutex<Option<String>>,
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::new())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let protocols = ProtocolRegistry::with_defaults(&config.settings());
        log::debug!("[context] Created with protocols {:?}", protocols.names());
        Self {
            world: World::with_config(&config),
            config,
            protocols,
            last_error: Mutex::new(None),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn protocols(&self) -> &ProtocolRegistry {
        &self.protocols
    }

    /// Message of the most recent failed operation on this context
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    fn record<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            log::debug!("[context] {}", e);
            *self.last_error.lock() = Some(e.to_string());
        }
        result
    }

    /// Look up the protocol named `name`
    pub fn load_component(&self, name: &str) -> Result<Arc<dyn Protocol>> {
        self.record(self.protocols.load_component(name))
    }

    // ===================================================================
    // Clients
    // ===================================================================

    /// Connect to `uri` with the protocol named in the settings.
    pub fn connect(&self, uri: &str, transport: Arc<dyn Transport>) -> Result<Connection> {
        let protocol = self.config.settings().default_protocol.clone();
        self.connect_with_protocol(uri, &protocol, transport)
    }

    pub fn connect_with_protocol(
        &self,
        uri: &str,
        protocol: &str,
        transport: Arc<dyn Transport>,
    ) -> Result<Connection> {
        let protocol = self.load_component(protocol)?;
        Ok(Connection::new(uri, protocol, transport, self.config.clone()))
    }

    /// Connect to the first server entry whose protocol is registered here.
    pub fn connect_configured(
        &self,
        server_config: &ServerConfiguration,
        transport: Arc<dyn Transport>,
    ) -> Result<Connection> {
        let server = server_config
            .select_server(|name| self.protocols.contains(name))
            .ok_or_else(|| {
                Error::Config(format!(
                    "no server entry uses a supported protocol ({:?})",
                    self.protocols.names()
                ))
            });
        let server = self.record(server)?;
        log::debug!(
            "[context] Selected {} / {} at '{}'",
            server.protocol.name,
            server.transport.name,
            server.transport.url
        );
        self.connect_with_protocol(&server.transport.url, &server.protocol.name, transport)
    }

    // ===================================================================
    // Servers
    // ===================================================================

    /// New service sharing this context's configuration and protocols
    pub fn new_service(&self, name: &str) -> Service {
        Service::with_protocols(name, self.config.clone(), self.protocols.clone())
    }

    /// Reclaim unreachable type cycles in the world
    pub fn collect(&mut self) -> usize {
        self.world.collect()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("types", &self.world.len())
            .field("protocols", &self.protocols.names())
            .finish_non_exhaustive()
    }
}
