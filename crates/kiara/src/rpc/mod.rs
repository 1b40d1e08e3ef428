// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connections and services
//!
//! # Overview
//!
//! ```text
//!  Connection::call                              Service::handle_request
//!  ----------------                              -----------------------
//!  args --marshal--> request --Transport--> parse --dispatch--> handler
//!  result <--unmarshal-- response <-------- encode <-- result | error
//! ```
//!
//! - [`Protocol`]: message factory for one wire format, looked up in a
//!   [`ProtocolRegistry`]
//! - [`Transport`]: moves request bytes to an endpoint and returns the
//!   response bytes; [`LoopbackTransport`] serves in-process services
//! - [`SymbolResolver`]: binds described functions to native code by name
//!
//! A method that fails answers with a generic error response; the caller
//! sees it as [`Error::Remote`](crate::Error::Remote), distinct from local
//! or transport failures.

mod connection;
mod protocol;
mod resolver;
mod service;
mod transport;

pub use connection::Connection;
#[cfg(feature = "jsonrpc")]
pub use protocol::JsonRpcProtocol;
pub use protocol::{Protocol, ProtocolRegistry, TbpProtocol};
pub use resolver::{NativeFn, StaticSymbolResolver, SymbolResolver};
pub use service::Service;
pub use transport::{LoopbackTransport, Transport};
