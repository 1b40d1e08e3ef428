// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Binding described functions to native code by symbol name.

use crate::error::{Error, Result};
use crate::message::RemoteError;
use crate::value::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Native implementation of a described function.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> std::result::Result<Value, RemoteError> + Send + Sync>;

/// Source of native functions (a plugin loader, a code generator, a table).
pub trait SymbolResolver {
    /// Make the symbols of component `name` available
    fn load_component(&mut self, name: &str) -> Result<()>;

    fn request_pointer_to_function(&self, name: &str) -> Option<NativeFn>;
}

/// Resolver over symbols registered up front, grouped into components.
#[derive(Default)]
pub struct StaticSymbolResolver {
    components: HashMap<String, HashMap<String, NativeFn>>,
    loaded: HashSet<String>,
}

impl StaticSymbolResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `symbol` to `component`, replacing an earlier definition
    pub fn define<F>(&mut self, component: &str, symbol: &str, f: F) -> &mut Self
    where
        F: Fn(&[Value]) -> std::result::Result<Value, RemoteError> + Send + Sync + 'static,
    {
        self.components
            .entry(component.to_string())
            .or_default()
            .insert(symbol.to_string(), Arc::new(f));
        self
    }

    pub fn is_loaded(&self, component: &str) -> bool {
        self.loaded.contains(component)
    }
}

impl SymbolResolver for StaticSymbolResolver {
    fn load_component(&mut self, name: &str) -> Result<()> {
        if !self.components.contains_key(name) {
            return Err(Error::Init(format!("component '{}' not found", name)));
        }
        if self.loaded.insert(name.to_string()) {
            log::debug!("[rpc] Loaded component '{}'", name);
        }
        Ok(())
    }

    /// Symbols resolve only from loaded components.
    fn request_pointer_to_function(&self, name: &str) -> Option<NativeFn> {
        self.loaded
            .iter()
            .filter_map(|c| self.components.get(c))
            .find_map(|symbols| symbols.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_need_loaded_component() {
        let mut resolver = StaticSymbolResolver::new();
        resolver.define("math", "neg", |args| {
            Ok(Value::I64(-args[0].as_i64().unwrap_or_default()))
        });
        assert!(resolver.request_pointer_to_function("neg").is_none());
        assert!(resolver.load_component("missing").is_err());

        resolver.load_component("math").unwrap();
        assert!(resolver.is_loaded("math"));
        let neg = resolver.request_pointer_to_function("neg").unwrap();
        assert_eq!(neg(&[Value::I64(5)]).unwrap(), Value::I64(-5));
    }
}
