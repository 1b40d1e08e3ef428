// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent builders for struct, function and service types.
//!
//! This is the registration path for descriptions that do not come from a
//! Rust type (an IDL front end, tests, dynamic clients). Member types are
//! given either as handles or by name; unknown names become forward
//! references.
//!
//! ```
//! use kiara::types::World;
//!
//! let mut world = World::new();
//! let point = world
//!     .struct_type("Point")
//!     .member("x", "i32")
//!     .member("y", "i32")
//!     .build()
//!     .unwrap();
//! let add = world
//!     .function("add")
//!     .arg("a", point)
//!     .arg("b", point)
//!     .returns(point)
//!     .build()
//!     .unwrap();
//! assert_eq!(world.lookup("add"), Some(add));
//! ```

use super::kind::{Arg, Member, Method, PrimitiveKind, TypeKind, TypeRef};
use super::world::World;
use crate::error::{Error, Result};

/// A member, argument or result type: a handle or a name to resolve.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    Ref(TypeRef),
    Named(String),
}

impl From<TypeRef> for TypeSpec {
    fn from(t: TypeRef) -> Self {
        Self::Ref(t)
    }
}

impl From<&str> for TypeSpec {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for TypeSpec {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl World {
    fn resolve_spec(&mut self, spec: TypeSpec) -> TypeRef {
        match spec {
            TypeSpec::Ref(t) => t,
            TypeSpec::Named(name) => self.resolve_name(&name),
        }
    }

    pub fn struct_type(&mut self, name: &str) -> StructBuilder<'_> {
        StructBuilder {
            world: self,
            name: name.to_string(),
            members: Vec::new(),
        }
    }

    pub fn function(&mut self, name: &str) -> FunctionBuilder<'_> {
        FunctionBuilder {
            world: self,
            name: name.to_string(),
            args: Vec::new(),
            result: None,
        }
    }

    pub fn service(&mut self, name: &str) -> ServiceBuilder<'_> {
        ServiceBuilder {
            world: self,
            name: name.to_string(),
            methods: Vec::new(),
        }
    }

    /// Native `(size, alignment)` of a type, C layout rules.
    ///
    /// Forward references and non-data kinds report `(0, 1)`.
    pub fn layout(&self, t: TypeRef) -> (usize, usize) {
        self.layout_at(t, 0)
    }

    fn layout_at(&self, t: TypeRef, depth: usize) -> (usize, usize) {
        const PTR: (usize, usize) = (
            std::mem::size_of::<usize>(),
            std::mem::align_of::<usize>(),
        );
        if depth > 64 {
            return (0, 1);
        }
        let Some(kind) = self.get(t) else {
            return (0, 1);
        };
        match kind {
            TypeKind::Primitive(p) => (p.size(), p.alignment()),
            TypeKind::PrimitiveValue(_) => (0, 1),
            TypeKind::Pointer { .. } | TypeKind::Reference { .. } | TypeKind::Opaque { .. } => PTR,
            // data pointer + element count
            TypeKind::Array { .. } => (PTR.0 * 2, PTR.1),
            TypeKind::FixedArray { element, size } => {
                let (s, a) = self.layout_at(*element, depth + 1);
                (s * size, a)
            }
            TypeKind::FixedArray2D {
                element,
                rows,
                cols,
            } => {
                let (s, a) = self.layout_at(*element, depth + 1);
                (s * rows * cols, a)
            }
            TypeKind::Enum { .. } => (PrimitiveKind::I32.size(), PrimitiveKind::I32.alignment()),
            TypeKind::Typedef { target: inner, .. }
            | TypeKind::Encrypted { element: inner, .. } => self.layout_at(*inner, depth + 1),
            TypeKind::Struct { members, .. } => {
                let mut size = 0;
                let mut align = 1;
                for m in members {
                    let (s, a) = self.layout_at(m.ty, depth + 1);
                    size = size.max(m.offset + s);
                    align = align.max(a);
                }
                (round_up(size, align), align)
            }
            TypeKind::Void
            | TypeKind::Any
            | TypeKind::Unresolved { .. }
            | TypeKind::Function { .. }
            | TypeKind::Service { .. } => (0, 1),
        }
    }
}

fn round_up(value: usize, align: usize) -> usize {
    match align {
        0 | 1 => value,
        a => value.div_ceil(a) * a,
    }
}

// =======================================================================
// Struct
// =======================================================================

pub struct StructBuilder<'w> {
    world: &'w mut World,
    name: String,
    members: Vec<(String, TypeSpec, Option<usize>, Option<String>)>,
}

impl StructBuilder<'_> {
    /// Member at the next C-layout offset
    pub fn member(mut self, name: &str, ty: impl Into<TypeSpec>) -> Self {
        self.members.push((name.to_string(), ty.into(), None, None));
        self
    }

    /// Member at an explicit byte offset
    pub fn member_at(mut self, name: &str, ty: impl Into<TypeSpec>, offset: usize) -> Self {
        self.members
            .push((name.to_string(), ty.into(), Some(offset), None));
        self
    }

    /// Member annotating another member (e.g. the length of an array)
    pub fn member_of(mut self, name: &str, ty: impl Into<TypeSpec>, main_name: &str) -> Self {
        self.members.push((
            name.to_string(),
            ty.into(),
            None,
            Some(main_name.to_string()),
        ));
        self
    }

    pub fn build(self) -> Result<TypeRef> {
        let StructBuilder {
            world,
            name,
            members,
        } = self;
        if name.is_empty() {
            return Err(Error::InvalidArgument("struct name is empty".into()));
        }

        let mut out: Vec<Member> = Vec::with_capacity(members.len());
        let mut end = 0;
        for (member_name, spec, offset, main_name) in members {
            if out.iter().any(|m| m.name == member_name) {
                return Err(Error::InvalidArgument(format!(
                    "duplicate member '{}' in struct '{}'",
                    member_name, name
                )));
            }
            let ty = world.resolve_spec(spec);
            let (size, align) = world.layout(ty);
            let offset = offset.unwrap_or_else(|| round_up(end, align));
            end = end.max(offset + size);
            out.push(Member {
                name: member_name,
                ty,
                offset,
                main_name,
            });
        }
        world.define_struct(&name, out)
    }
}

// =======================================================================
// Function
// =======================================================================

pub struct FunctionBuilder<'w> {
    world: &'w mut World,
    name: String,
    args: Vec<(String, TypeSpec)>,
    result: Option<TypeSpec>,
}

impl FunctionBuilder<'_> {
    pub fn arg(mut self, name: &str, ty: impl Into<TypeSpec>) -> Self {
        self.args.push((name.to_string(), ty.into()));
        self
    }

    /// Result type (void when never called)
    pub fn returns(mut self, ty: impl Into<TypeSpec>) -> Self {
        self.result = Some(ty.into());
        self
    }

    pub fn build(self) -> Result<TypeRef> {
        let FunctionBuilder {
            world,
            name,
            args,
            result,
        } = self;

        let mut out: Vec<Arg> = Vec::with_capacity(args.len());
        for (arg_name, spec) in args {
            if out.iter().any(|a| a.name == arg_name) {
                return Err(Error::InvalidArgument(format!(
                    "duplicate argument '{}' in function '{}'",
                    arg_name, name
                )));
            }
            let ty = world.resolve_spec(spec);
            out.push(Arg { name: arg_name, ty });
        }
        let result = match result {
            Some(spec) => world.resolve_spec(spec),
            None => world.void(),
        };
        world.define_function(&name, out, result)
    }
}

// =======================================================================
// Service
// =======================================================================

pub struct ServiceBuilder<'w> {
    world: &'w mut World,
    name: String,
    methods: Vec<(String, TypeSpec)>,
}

impl ServiceBuilder<'_> {
    /// Bind `name` to a function type
    pub fn method(mut self, name: &str, function: impl Into<TypeSpec>) -> Self {
        self.methods.push((name.to_string(), function.into()));
        self
    }

    pub fn build(self) -> Result<TypeRef> {
        let ServiceBuilder {
            world,
            name,
            methods,
        } = self;

        let mut out: Vec<Method> = Vec::with_capacity(methods.len());
        for (method_name, spec) in methods {
            let function = world.resolve_spec(spec);
            match world.get(function) {
                Some(TypeKind::Function { .. }) | Some(TypeKind::Unresolved { .. }) => {}
                Some(other) => {
                    return Err(Error::InvalidType(format!(
                        "method '{}' of service '{}' is a {}, not a function",
                        method_name,
                        name,
                        other.kind_name()
                    )))
                }
                None => {
                    return Err(Error::InvalidType(format!(
                        "method '{}' refers to a dead type",
                        method_name
                    )))
                }
            }
            out.push(Method {
                name: method_name,
                function,
            });
        }
        world.define_service(&name, out)
    }
}
