// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server side of a call.

use super::{NativeFn, ProtocolRegistry, SymbolResolver};
use crate::config::RuntimeConfig;
use crate::error::{Error, Result, ResultCode};
use crate::marshal::{read_value, write_value, Marshal, MarshalArgs, Marshaler};
use crate::message::{Message, RemoteError};
use crate::types::{TypeKind, TypeRef, World};
use crate::value::Value;
use parking_lot::Mutex;
use std::collections::HashMap;

type NativeHandler =
    Box<dyn Fn(&mut Marshaler<'_>, &mut Marshaler<'_>) -> Result<()> + Send + Sync>;

fn native_handler<F>(f: F) -> NativeHandler
where
    F: Fn(&mut Marshaler<'_>, &mut Marshaler<'_>) -> Result<()> + Send + Sync + 'static,
{
    Box::new(f)
}

enum Handler {
    /// Arguments and result described by a function type
    Described { function: TypeRef, f: NativeFn },
    /// Arguments and result marshaled natively
    Native(NativeHandler),
}

/// Named set of methods answering requests.
///
/// A service owns the [`World`] its method types live in. Requests are
/// decoded with the protocol matching their MIME type.
pub struct Service {
    name: String,
    world: World,
    config: RuntimeConfig,
    protocols: ProtocolRegistry,
    methods: HashMap<String, Handler>,
    last_error: Mutex<Option<String>>,
}

impl Service {
    pub fn new(name: &str, config: RuntimeConfig) -> Self {
        let protocols = ProtocolRegistry::with_defaults(&config.settings());
        Self::with_protocols(name, config, protocols)
    }

    pub fn with_protocols(name: &str, config: RuntimeConfig, protocols: ProtocolRegistry) -> Self {
        Self {
            name: name.to_string(),
            world: World::with_config(&config),
            config,
            protocols,
            methods: HashMap::new(),
            last_error: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Types of described methods are declared here
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    fn record<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            log::warn!("[rpc] Service '{}': {}", self.name, e);
            *self.last_error.lock() = Some(e.to_string());
        }
        result
    }

    // ===================================================================
    // Registration
    // ===================================================================

    /// Serve `name` with a handler over dynamic values.
    ///
    /// `function` must describe a function in this service's world.
    pub fn register_method<F>(&mut self, name: &str, function: TypeRef, handler: F) -> Result<()>
    where
        F: Fn(&[Value]) -> std::result::Result<Value, RemoteError> + Send + Sync + 'static,
    {
        self.register_described(name, function, std::sync::Arc::new(handler))
    }

    /// Serve `name` with a natively typed handler
    pub fn register_native<A, R, F>(&mut self, name: &str, handler: F)
    where
        A: MarshalArgs + 'static,
        R: Marshal + 'static,
        F: Fn(A) -> std::result::Result<R, RemoteError> + Send + Sync + 'static,
    {
        let wrapped = native_handler(move |request, response| {
            let args = A::read_args(request)?;
            let result = handler(args).map_err(Error::from)?;
            response.write(&result)
        });
        self.insert(name, Handler::Native(wrapped));
    }

    /// Serve `name` with the native function `symbol` found by `resolver`.
    pub fn register_symbol(
        &mut self,
        name: &str,
        function: TypeRef,
        resolver: &dyn SymbolResolver,
        symbol: &str,
    ) -> Result<()> {
        let f = resolver.request_pointer_to_function(symbol).ok_or_else(|| {
            Error::Init(format!("symbol '{}' not found for method '{}'", symbol, name))
        });
        let f = self.record(f)?;
        self.register_described(name, function, f)
    }

    /// Bind every method of the service type `service` by its own name.
    ///
    /// Methods are served as `<service>.<method>`; returns how many were bound.
    pub fn register_service_type(
        &mut self,
        service: TypeRef,
        resolver: &dyn SymbolResolver,
    ) -> Result<usize> {
        let methods = match self.world.kind(service) {
            Ok(TypeKind::Service { name, methods }) => Ok(methods
                .iter()
                .map(|m| (format!("{}.{}", name, m.name), m.function, m.name.clone()))
                .collect::<Vec<_>>()),
            Ok(other) => Err(Error::InvalidType(format!(
                "{} is not a service type",
                other.kind_name()
            ))),
            Err(e) => Err(e),
        };
        let methods = self.record(methods)?;
        for (full_name, function, symbol) in &methods {
            self.register_symbol(full_name, *function, resolver, symbol)?;
        }
        Ok(methods.len())
    }

    fn register_described(&mut self, name: &str, function: TypeRef, f: NativeFn) -> Result<()> {
        let checked = self.world.resolve(function).and_then(|t| match self.world.kind(t)? {
            TypeKind::Function { .. } => Ok(t),
            other => Err(Error::InvalidType(format!(
                "method '{}' bound to a {} type",
                name,
                other.kind_name()
            ))),
        });
        let function = self.record(checked)?;
        self.insert(name, Handler::Described { function, f });
        Ok(())
    }

    fn insert(&mut self, name: &str, handler: Handler) {
        if self.methods.insert(name.to_string(), handler).is_some() {
            log::debug!("[rpc] Service '{}' replaced method '{}'", self.name, name);
        }
    }

    // ===================================================================
    // Dispatch
    // ===================================================================

    /// Decode one request, run its method and encode the response.
    ///
    /// Failures inside the method (including argument decoding) are answered
    /// with an error response; only undecodable requests fail the call.
    pub fn handle_request(&self, bytes: &[u8], mime_type: &str) -> Result<Vec<u8>> {
        self.record(self.dispatch(bytes, mime_type))
    }

    fn dispatch(&self, bytes: &[u8], mime_type: &str) -> Result<Vec<u8>> {
        let protocol = self
            .protocols
            .by_mime_type(mime_type)
            .ok_or_else(|| Error::Request(format!("no protocol for '{}'", mime_type)))?;
        let mut request = protocol.parse_request(bytes)?;
        let method = request
            .method_name()
            .map(str::to_string)
            .ok_or_else(|| Error::Request("request without method".into()))?;
        let mut response = protocol.new_response(request.as_ref());

        let outcome = match self.methods.get(&method) {
            Some(handler) => self.invoke(handler, request.as_mut(), response.as_mut()),
            None => Err(Error::Remote {
                code: ResultCode::RequestError as i32,
                message: Some(format!("unknown method '{}'", method)),
            }),
        };
        if let Err(e) = outcome {
            log::debug!("[rpc] {}.{} answered with error: {}", self.name, method, e);
            response.write_exception(&e)?;
        }
        response.finish()
    }

    fn invoke(
        &self,
        handler: &Handler,
        request: &mut dyn Message,
        response: &mut dyn Message,
    ) -> Result<()> {
        let mut input = Marshaler::with_keys(request, &self.config);
        let mut output = Marshaler::with_keys(response, &self.config);
        match handler {
            Handler::Native(f) => f(&mut input, &mut output),
            Handler::Described { function, f } => {
                let TypeKind::Function { args, result, .. } = self.world.kind(*function)? else {
                    return Err(Error::InvalidType("method type is not a function".into()));
                };
                let values = args
                    .iter()
                    .map(|arg| read_value(&mut input, &self.world, arg.ty))
                    .collect::<Result<Vec<_>>>()?;
                let value = f(&values).map_err(Error::from)?;
                write_value(&mut output, &self.world, *result, &value)
            }
        }
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("methods", &self.method_names())
            .finish_non_exhaustive()
    }
}
