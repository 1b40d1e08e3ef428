// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Canonical type registry.
//!
//! Every table entry (`named`, `interned`, `native`) owns one reference on
//! the node it maps to. Child references are owned by the parent node and
//! taken when the node is allocated. Structurally equal descriptions map to
//! one node, so handles compare by identity.

use super::kind::{Arg, EnumConstant, Member, Method, PrimitiveKind, TypeKind, TypeRef, UserApi};
use crate::boxed::TypedBox;
use crate::config::RuntimeConfig;
use crate::error::{Error, Result};
use crate::gc::CycleCollector;
use std::collections::{HashMap, HashSet};

/// C-compatible aliases registered next to the builtin primitive names.
const C_ALIASES: &[(&str, PrimitiveKind)] = &[
    ("c_int8_t", PrimitiveKind::I8),
    ("c_uint8_t", PrimitiveKind::U8),
    ("c_int16_t", PrimitiveKind::I16),
    ("c_uint16_t", PrimitiveKind::U16),
    ("c_int32_t", PrimitiveKind::I32),
    ("c_uint32_t", PrimitiveKind::U32),
    ("c_int64_t", PrimitiveKind::I64),
    ("c_uint64_t", PrimitiveKind::U64),
    ("c_float", PrimitiveKind::F32),
    ("c_double", PrimitiveKind::F64),
    ("c_char", PrimitiveKind::I8),
    ("c_bool", PrimitiveKind::Bool),
];

/// Structural identity of a type description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum InternKey {
    Void,
    Any,
    Primitive(PrimitiveKind),
    Value(TypedBox),
    Unresolved(String),
    Typedef(String, TypeRef),
    Pointer(TypeRef),
    Reference(TypeRef),
    Array(TypeRef),
    FixedArray(TypeRef, usize),
    FixedArray2D(TypeRef, usize, usize),
    Encrypted(TypeRef, String),
    Struct(String, Vec<(String, TypeRef, usize)>),
    Function(String, Vec<(String, TypeRef)>, TypeRef),
    Service(String, Vec<(String, TypeRef)>),
    Enum(String, Vec<(String, i64)>),
    Opaque(String, UserApi),
}

impl InternKey {
    pub(crate) fn of(kind: &TypeKind) -> Self {
        match kind {
            TypeKind::Void => Self::Void,
            TypeKind::Any => Self::Any,
            TypeKind::Primitive(p) => Self::Primitive(*p),
            TypeKind::PrimitiveValue(v) => Self::Value(v.clone()),
            TypeKind::Unresolved { name } => Self::Unresolved(name.clone()),
            TypeKind::Typedef { name, target } => Self::Typedef(name.clone(), *target),
            TypeKind::Pointer { element } => Self::Pointer(*element),
            TypeKind::Reference { element } => Self::Reference(*element),
            TypeKind::Array { element } => Self::Array(*element),
            TypeKind::FixedArray { element, size } => Self::FixedArray(*element, *size),
            TypeKind::FixedArray2D {
                element,
                rows,
                cols,
            } => Self::FixedArray2D(*element, *rows, *cols),
            TypeKind::Encrypted { element, key_name } => {
                Self::Encrypted(*element, key_name.clone())
            }
            TypeKind::Struct { name, members } => Self::Struct(
                name.clone(),
                members
                    .iter()
                    .map(|m| (m.name.clone(), m.ty, m.offset))
                    .collect(),
            ),
            TypeKind::Function { name, args, result } => Self::Function(
                name.clone(),
                args.iter().map(|a| (a.name.clone(), a.ty)).collect(),
                *result,
            ),
            TypeKind::Service { name, methods } => Self::Service(
                name.clone(),
                methods.iter().map(|m| (m.name.clone(), m.function)).collect(),
            ),
            TypeKind::Enum { name, constants } => Self::Enum(
                name.clone(),
                constants.iter().map(|c| (c.name.clone(), c.value)).collect(),
            ),
            TypeKind::Opaque { name, api } => Self::Opaque(name.clone(), *api),
        }
    }

    fn mentions(&self, t: TypeRef) -> bool {
        match self {
            Self::Typedef(_, e)
            | Self::Pointer(e)
            | Self::Reference(e)
            | Self::Array(e)
            | Self::FixedArray(e, _)
            | Self::FixedArray2D(e, _, _)
            | Self::Encrypted(e, _) => *e == t,
            Self::Struct(_, members) => members.iter().any(|(_, m, _)| *m == t),
            Self::Function(_, args, result) => *result == t || args.iter().any(|(_, a)| *a == t),
            Self::Service(_, methods) => methods.iter().any(|(_, m)| *m == t),
            _ => false,
        }
    }
}

/// Types every world starts with.
#[derive(Debug, Clone, Copy)]
struct Builtins {
    void: TypeRef,
    any: TypeRef,
    unresolved: TypeRef,
    primitives: [TypeRef; 12],
}

/// Registry of canonical types for one context.
///
/// Not thread-safe: each context owns its own world.
pub struct World {
    pub(crate) gc: CycleCollector<TypeKind>,
    builtins: Builtins,
    named: HashMap<String, TypeRef>,
    interned: HashMap<InternKey, TypeRef>,
    pub(crate) native: HashMap<std::any::TypeId, TypeRef>,
}

impl World {
    #[must_use]
    pub fn new() -> Self {
        Self::with_collector(CycleCollector::new())
    }

    /// World whose collector threshold comes from `config`
    #[must_use]
    pub fn with_config(config: &RuntimeConfig) -> Self {
        let roots = config.settings().max_possible_cycle_roots;
        Self::with_collector(CycleCollector::with_max_possible_roots(roots))
    }

    fn with_collector(mut gc: CycleCollector<TypeKind>) -> Self {
        let mut interned = HashMap::new();
        let mut alloc = |key: InternKey, kind: TypeKind| {
            let t = TypeRef(gc.insert(kind));
            interned.insert(key, t);
            t
        };

        let void = alloc(InternKey::Void, TypeKind::Void);
        let any = alloc(InternKey::Any, TypeKind::Any);
        let unresolved = alloc(
            InternKey::Unresolved(String::new()),
            TypeKind::Unresolved {
                name: String::new(),
            },
        );
        let primitives = PrimitiveKind::ALL
            .map(|kind| alloc(InternKey::Primitive(kind), TypeKind::Primitive(kind)));

        let mut world = Self {
            gc,
            builtins: Builtins {
                void,
                any,
                unresolved,
                primitives,
            },
            named: HashMap::new(),
            interned,
            native: HashMap::new(),
        };

        world.bind_name("void", void);
        world.bind_name("any", any);
        world.bind_name("unresolved_symbol", unresolved);
        for (kind, t) in PrimitiveKind::ALL.iter().zip(primitives) {
            world.bind_name(kind.name(), t);
        }
        for (alias, kind) in C_ALIASES {
            let t = world.primitive(*kind);
            world.bind_name(alias, t);
        }
        world
    }

    // ===================================================================
    // Builtins
    // ===================================================================

    pub fn void(&self) -> TypeRef {
        self.builtins.void
    }

    pub fn any(&self) -> TypeRef {
        self.builtins.any
    }

    pub fn unresolved_symbol(&self) -> TypeRef {
        self.builtins.unresolved
    }

    pub fn primitive(&self, kind: PrimitiveKind) -> TypeRef {
        let index = PrimitiveKind::ALL
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default();
        self.builtins.primitives[index]
    }

    pub fn is_builtin(&self, t: TypeRef) -> bool {
        t == self.builtins.void
            || t == self.builtins.any
            || t == self.builtins.unresolved
            || self.builtins.primitives.contains(&t)
    }

    // ===================================================================
    // Lookup
    // ===================================================================

    /// Type registered under `name`
    pub fn lookup(&self, name: &str) -> Option<TypeRef> {
        self.named.get(name).copied()
    }

    /// Registered type, or an unresolved placeholder for a forward reference
    pub fn resolve_name(&mut self, name: &str) -> TypeRef {
        match self.lookup(name) {
            Some(t) => t,
            None => self.unresolved(name),
        }
    }

    pub fn get(&self, t: TypeRef) -> Option<&TypeKind> {
        self.gc.get(t.id())
    }

    pub fn kind(&self, t: TypeRef) -> Result<&TypeKind> {
        self.get(t)
            .ok_or_else(|| Error::InvalidType(format!("{} is not a live type", t)))
    }

    pub fn contains(&self, t: TypeRef) -> bool {
        self.gc.contains(t.id())
    }

    /// Follow typedefs and late-bound forward references.
    ///
    /// An unresolved name that is still unknown is an `InvalidType` error.
    pub fn resolve(&self, mut t: TypeRef) -> Result<TypeRef> {
        // bounded: typedef chains cannot legitimately be longer than the world
        for _ in 0..=self.gc.len() {
            match self.kind(t)? {
                TypeKind::Typedef { target, .. } => t = *target,
                TypeKind::Unresolved { name } => match self.lookup(name) {
                    Some(found) if found != t => t = found,
                    _ => {
                        return Err(Error::InvalidType(format!(
                            "unresolved symbol '{}'",
                            name
                        )))
                    }
                },
                _ => return Ok(t),
            }
        }
        Err(Error::InvalidType(format!("{} does not resolve", t)))
    }

    /// Number of live type nodes
    pub fn len(&self) -> usize {
        self.gc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gc.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.named.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    // ===================================================================
    // Interned Constructors
    // ===================================================================

    pub fn type_c_ptr(&mut self, element: TypeRef) -> TypeRef {
        self.intern(TypeKind::Pointer { element })
    }

    pub fn type_c_ref(&mut self, element: TypeRef) -> TypeRef {
        self.intern(TypeKind::Reference { element })
    }

    pub fn array_of(&mut self, element: TypeRef) -> TypeRef {
        self.intern(TypeKind::Array { element })
    }

    pub fn fixed_array_of(&mut self, element: TypeRef, size: usize) -> TypeRef {
        self.intern(TypeKind::FixedArray { element, size })
    }

    pub fn fixed_array_2d_of(&mut self, element: TypeRef, rows: usize, cols: usize) -> TypeRef {
        self.intern(TypeKind::FixedArray2D {
            element,
            rows,
            cols,
        })
    }

    /// `element` serialized as ciphertext under the secret key `key_name`
    pub fn encrypted(&mut self, element: TypeRef, key_name: &str) -> TypeRef {
        self.intern(TypeKind::Encrypted {
            element,
            key_name: key_name.to_string(),
        })
    }

    pub fn primitive_value(&mut self, value: TypedBox) -> TypeRef {
        self.intern(TypeKind::PrimitiveValue(value))
    }

    /// Forward reference to `name`
    pub fn unresolved(&mut self, name: &str) -> TypeRef {
        self.intern(TypeKind::Unresolved {
            name: name.to_string(),
        })
    }

    pub fn typedef(&mut self, name: &str, target: TypeRef) -> Result<TypeRef> {
        self.define(TypeKind::Typedef {
            name: name.to_string(),
            target,
        })
    }

    pub fn enum_type(&mut self, name: &str, constants: &[(&str, i64)]) -> Result<TypeRef> {
        self.define(TypeKind::Enum {
            name: name.to_string(),
            constants: constants
                .iter()
                .map(|(n, v)| EnumConstant {
                    name: n.to_string(),
                    value: *v,
                })
                .collect(),
        })
    }

    /// Native type accessed only through the capabilities in `api`
    pub fn opaque(&mut self, name: &str, api: UserApi) -> Result<TypeRef> {
        self.define(TypeKind::Opaque {
            name: name.to_string(),
            api,
        })
    }

    pub(crate) fn define_struct(&mut self, name: &str, members: Vec<Member>) -> Result<TypeRef> {
        self.define(TypeKind::Struct {
            name: name.to_string(),
            members,
        })
    }

    pub(crate) fn define_function(
        &mut self,
        name: &str,
        args: Vec<Arg>,
        result: TypeRef,
    ) -> Result<TypeRef> {
        let kind = TypeKind::Function {
            name: name.to_string(),
            args,
            result,
        };
        if name.is_empty() {
            Ok(self.intern(kind))
        } else {
            self.define(kind)
        }
    }

    pub(crate) fn define_service(&mut self, name: &str, methods: Vec<Method>) -> Result<TypeRef> {
        self.define(TypeKind::Service {
            name: name.to_string(),
            methods,
        })
    }

    /// Intern a named kind and bind its name.
    ///
    /// Re-declaring the same structure returns the existing handle; a
    /// different structure under a taken name is rejected.
    fn define(&mut self, kind: TypeKind) -> Result<TypeRef> {
        let name = kind.declared_name().unwrap_or_default().to_string();
        for t in self.children_of(&kind) {
            if !self.contains(t) {
                return Err(Error::InvalidType(format!(
                    "'{}' refers to dead type {}",
                    name, t
                )));
            }
        }

        let key = InternKey::of(&kind);
        if let Some(existing) = self.lookup(&name) {
            if self.interned.get(&key) == Some(&existing) {
                return Ok(existing);
            }
            return Err(Error::InvalidType(format!(
                "conflicting definition of '{}'",
                name
            )));
        }

        let t = self.intern(kind);
        self.bind_name(&name, t);
        log::debug!("[world] Defined {} '{}' as {}", self.kind(t)?.kind_name(), name, t);
        Ok(t)
    }

    pub(crate) fn intern(&mut self, kind: TypeKind) -> TypeRef {
        let key = InternKey::of(&kind);
        if let Some(t) = self.interned.get(&key) {
            return *t;
        }
        let t = self.alloc(kind);
        self.interned.insert(key, t);
        t
    }

    /// Publish a node built in place (see [`World::declare_struct`]).
    ///
    /// Returns the canonical handle, which is `t` unless an equal structure
    /// was already interned.
    pub(crate) fn publish(&mut self, t: TypeRef) -> Result<TypeRef> {
        let kind = self.kind(t)?;
        let key = InternKey::of(kind);
        let name = kind.declared_name().unwrap_or_default().to_string();

        if let Some(&existing) = self.interned.get(&key) {
            return Ok(existing);
        }
        self.gc.add_ref(t.id());
        self.interned.insert(key, t);
        if !name.is_empty() && self.lookup(&name).is_none() {
            self.bind_name(&name, t);
        }
        Ok(t)
    }

    /// New node (refcount 1, owned by the caller) holding refs on its children
    pub(crate) fn alloc(&mut self, kind: TypeKind) -> TypeRef {
        for child in self.children_of(&kind) {
            self.gc.add_ref(child.id());
        }
        TypeRef(self.gc.insert(kind))
    }

    fn children_of(&self, kind: &TypeKind) -> Vec<TypeRef> {
        let mut children = Vec::new();
        kind.for_each_child(&mut |c| children.push(c));
        children
    }

    fn bind_name(&mut self, name: &str, t: TypeRef) {
        self.gc.add_ref(t.id());
        if let Some(previous) = self.named.insert(name.to_string(), t) {
            self.gc.release(previous.id());
        }
    }

    // ===================================================================
    // Reclamation
    // ===================================================================

    /// Drop the table references of a named type.
    ///
    /// Interned derived types (pointer to it, array of it, ...) go with it.
    /// Recursive types form cycles and are reclaimed by [`World::collect`].
    /// Builtins cannot be unregistered.
    pub fn unregister(&mut self, name: &str) -> bool {
        let Some(t) = self.lookup(name) else {
            return false;
        };
        if self.is_builtin(t) {
            log::warn!("[world] Refusing to unregister builtin '{}'", name);
            return false;
        }

        let mut dropped = Vec::new();
        self.named.retain(|_, v| {
            let hit = *v == t;
            if hit {
                dropped.push(*v);
            }
            !hit
        });
        self.native.retain(|_, v| {
            let hit = *v == t;
            if hit {
                dropped.push(*v);
            }
            !hit
        });
        // surviving named types that mention `t` keep their key
        let anchored: HashSet<TypeRef> = self
            .named
            .values()
            .chain(self.native.values())
            .copied()
            .collect();
        self.interned.retain(|key, v| {
            let hit = *v == t || (key.mentions(t) && !anchored.contains(v));
            if hit {
                dropped.push(*v);
            }
            !hit
        });

        for d in &dropped {
            self.gc.release(d.id());
        }
        log::debug!(
            "[world] Unregistered '{}' ({} table references)",
            name,
            dropped.len()
        );
        true
    }

    /// Reclaim unreachable type cycles, returns the number of nodes freed
    pub fn collect(&mut self) -> usize {
        self.gc.collect_cycles()
    }

    /// DOT graph of every live type and its references
    pub fn dump_mem_graph(&self) -> String {
        self.gc.dump_mem_graph()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for World {
    fn drop(&mut self) {
        let refs: Vec<TypeRef> = self
            .named
            .drain()
            .map(|(_, t)| t)
            .chain(self.interned.drain().map(|(_, t)| t))
            .chain(self.native.drain().map(|(_, t)| t))
            .collect();
        for t in refs {
            self.gc.release(t.id());
        }
        self.gc.collect_cycles();
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("types", &self.gc.len())
            .field("named", &self.named.len())
            .field("interned", &self.interned.len())
            .finish()
    }
}
