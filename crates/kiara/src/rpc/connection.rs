// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client side of a call.

use super::{Protocol, Transport};
use crate::config::RuntimeConfig;
use crate::error::{Error, Result};
use crate::marshal::{read_value, write_value, Marshal, MarshalArgs, Marshaler};
use crate::message::Message;
use crate::types::{TypeKind, TypeRef, World};
use crate::value::Value;
use parking_lot::Mutex;
use std::sync::Arc;

/// A client bound to one endpoint, protocol and transport.
///
/// # Call Flow
///
/// 1. Marshal the arguments into a new request
/// 2. Hand the request bytes to the transport
/// 3. Parse the response; an error response becomes [`Error::Remote`],
///    otherwise the result is unmarshaled
pub struct Connection {
    uri: String,
    protocol: Arc<dyn Protocol>,
    transport: Arc<dyn Transport>,
    config: RuntimeConfig,
    last_error: Mutex<Option<String>>,
}

impl Connection {
    pub fn new(
        uri: &str,
        protocol: Arc<dyn Protocol>,
        transport: Arc<dyn Transport>,
        config: RuntimeConfig,
    ) -> Self {
        log::debug!(
            "[rpc] Connection to '{}' via {} / {}",
            uri,
            protocol.name(),
            transport.name()
        );
        Self {
            uri: uri.to_string(),
            protocol,
            transport,
            config,
            last_error: Mutex::new(None),
        }
    }

    pub fn get_connection_uri(&self) -> &str {
        &self.uri
    }

    pub fn protocol_name(&self) -> &'static str {
        self.protocol.name()
    }

    /// Message of the most recent failed call
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    fn record<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            log::debug!("[rpc] Call on '{}' failed: {}", self.uri, e);
            *self.last_error.lock() = Some(e.to_string());
        }
        result
    }

    /// Call the described function `function` with dynamic arguments.
    pub fn call(&self, world: &World, function: TypeRef, args: &[Value]) -> Result<Value> {
        self.record(self.call_dynamic(world, function, args))
    }

    /// Call `method` with native arguments and result.
    pub fn call_native<A: MarshalArgs, R: Marshal>(&self, method: &str, args: &A) -> Result<R> {
        self.record(self.call_typed(method, args))
    }

    fn call_dynamic(&self, world: &World, function: TypeRef, args: &[Value]) -> Result<Value> {
        let function = world.resolve(function)?;
        let TypeKind::Function {
            name,
            args: params,
            result,
        } = world.kind(function)?
        else {
            return Err(Error::InvalidType(format!(
                "{} is not a function",
                world.type_name(function)
            )));
        };
        if params.len() != args.len() {
            return Err(Error::InvalidArgument(format!(
                "{} takes {} arguments, {} given",
                name,
                params.len(),
                args.len()
            )));
        }

        let mut request = self.protocol.new_request(name)?;
        {
            let mut m = Marshaler::with_keys(&mut *request, &self.config);
            for (param, arg) in params.iter().zip(args) {
                write_value(&mut m, world, param.ty, arg)?;
            }
        }

        let mut response = self.exchange(request.as_mut())?;
        let mut m = Marshaler::with_keys(&mut *response, &self.config);
        read_value(&mut m, world, *result)
    }

    fn call_typed<A: MarshalArgs, R: Marshal>(&self, method: &str, args: &A) -> Result<R> {
        let mut request = self.protocol.new_request(method)?;
        args.write_args(&mut Marshaler::with_keys(&mut *request, &self.config))?;

        let mut response = self.exchange(request.as_mut())?;
        Marshaler::with_keys(&mut *response, &self.config).read()
    }

    /// Send a finished request; error responses are turned into errors.
    fn exchange(&self, request: &mut dyn Message) -> Result<Box<dyn Message>> {
        let bytes = request.finish()?;
        log::trace!(
            "[rpc] -> {} {:?} ({} bytes)",
            self.uri,
            request.method_name(),
            bytes.len()
        );
        let reply = self
            .transport
            .send_data(&self.uri, &bytes, self.protocol.mime_type())?;
        let mut response = self.protocol.parse_response(&reply)?;

        if response.is_error_response() {
            let (code, message) = response.read_generic_error()?;
            return Err(Error::Remote { code, message });
        }
        Ok(response)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("uri", &self.uri)
            .field("protocol", &self.protocol.name())
            .field("transport", &self.transport.name())
            .finish_non_exhaustive()
    }
}
