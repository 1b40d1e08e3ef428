// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # KIARA - RPC middleware core
//!
//! Runtime type descriptions owned by a cycle-collected object graph, and a
//! protocol-agnostic marshaling layer that moves native or dynamically
//! described values through wire messages.
//!
//! ## Quick Start
//!
//! ```rust
//! use kiara::rpc::LoopbackTransport;
//! use kiara::{Context, Kiara, Result};
//! use std::sync::Arc;
//!
//! #[derive(Kiara, Debug, Clone, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! fn main() -> Result<()> {
//!     let ctx = Context::new();
//!
//!     let mut service = ctx.new_service("geometry");
//!     service.register_native("geometry.flip", |(p,): (Point,)| {
//!         Ok(Point { x: p.y, y: p.x })
//!     });
//!     let transport = Arc::new(LoopbackTransport::new());
//!     transport.bind("loopback://geometry", Arc::new(service));
//!
//!     let conn = ctx.connect_with_protocol("loopback://geometry", "tbp", transport)?;
//!     let flipped: Point = conn.call_native("geometry.flip", &(Point { x: 1, y: 2 },))?;
//!     assert_eq!(flipped, Point { x: 2, y: 1 });
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                         Stubs (rpc)                                 |
//! |   Connection::call / call_native  ->  Service::handle_request       |
//! +---------------------------------------------------------------------+
//! |                        Marshaling (marshal)                         |
//! |   Marshal (native) | write_value / read_value (dynamic) | Encrypted |
//! +---------------------------------------------------------------------+
//! |                         Messages (message)                          |
//! |   Message trait | NestingTracker | TBP | JSON-RPC 2.0               |
//! +---------------------------------------------------------------------+
//! |                    Type model (types, gc)                           |
//! |   World | TypeKind | interning | CycleCollector                     |
//! +---------------------------------------------------------------------+
//! |                 Containers (cdt, boxed, security)                   |
//! |   DynBuffer | DynString | TypedBox | CipherContext                  |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Context`] | Per-thread owner of a world, configuration and protocols |
//! | [`World`] | Interned type descriptions, reclaimed by the cycle collector |
//! | [`Value`] | Dynamic value marshaled against a [`TypeRef`] |
//! | [`Marshaler`] | Cursor over a message used by [`Marshal`] impls |
//! | [`Encrypted`] | Field wrapper serialized as ciphertext |
//!
//! ## Features
//!
//! - `jsonrpc` (default): JSON-RPC 2.0 message backend
//! - `security` (default): `Encrypted` values through `ring` AEAD ciphers
//! - `config-loaders` (default): YAML server configuration documents

// Allow the derive macro to work inside this crate's tests
extern crate self as kiara;

/// Scalar tagged union and its typed, string-owning variant.
pub mod boxed;
/// Dynamic buffer, dynamic string and base64 helpers.
pub mod cdt;
/// Constants, runtime settings and server configuration documents.
pub mod config;
/// Context owning a world, its configuration and protocols.
pub mod context;
/// Result codes and the crate error type.
pub mod error;
/// Reference-counted object arena with a cycle collector.
pub mod gc;
/// Native and dynamic marshaling over messages.
pub mod marshal;
/// Message contract and protocol backends (TBP, JSON-RPC).
pub mod message;
/// Connections, services, transports and symbol resolution.
pub mod rpc;
/// Symmetric ciphers used for encrypted values.
#[cfg(feature = "security")]
pub mod security;
/// Runtime type descriptions.
pub mod types;
/// Dynamic value carrier.
pub mod value;

pub use context::Context;
pub use error::{error_name, Error, Result, ResultCode};
pub use kiara_derive::Kiara;
pub use marshal::{Encrypted, Marshal, Marshaler};
pub use types::{TypeRef, World};
pub use value::Value;
