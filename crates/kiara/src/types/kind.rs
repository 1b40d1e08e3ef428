// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type kinds stored as nodes of a [`World`](super::World) collector.

use crate::boxed::TypedBox;
use crate::gc::{GcNode, ObjectId};
use std::fmt;

/// Handle to a canonical type owned by a [`World`](super::World).
///
/// Handles are plain ids: equality is object identity, which is exactly what
/// interning guarantees for structurally equal descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef(pub(crate) ObjectId);

impl TypeRef {
    #[inline]
    pub(crate) fn id(self) -> ObjectId {
        self.0
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type{}", self.0)
    }
}

/// Primitive scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    /// Owned NUL-free text
    String,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 12] = [
        Self::Bool,
        Self::I8,
        Self::U8,
        Self::I16,
        Self::U16,
        Self::I32,
        Self::U32,
        Self::I64,
        Self::U64,
        Self::F32,
        Self::F64,
        Self::String,
    ];

    /// Builtin name registered in every world
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F32 => "float",
            Self::F64 => "double",
            Self::String => "string",
        }
    }

    /// Native size in bytes (strings are a pointer).
    pub fn size(self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
            Self::String => std::mem::size_of::<usize>(),
        }
    }

    pub fn alignment(self) -> usize {
        self.size()
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, Self::Bool | Self::F32 | Self::F64 | Self::String)
    }
}

/// Capabilities an opaque native type supplies to the marshaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UserApi {
    pub set_cstring: bool,
    pub get_cstring: bool,
    pub set_generic_error: bool,
    pub get_generic_error: bool,
    pub allocate_type: bool,
    pub deallocate_type: bool,
}

impl UserApi {
    /// String-like type (read/write through user-string accessors)
    pub const STRING: Self = Self {
        set_cstring: true,
        get_cstring: true,
        set_generic_error: false,
        get_generic_error: false,
        allocate_type: true,
        deallocate_type: true,
    };

    /// Exception type (read/write through generic-error accessors)
    pub const EXCEPTION: Self = Self {
        set_cstring: false,
        get_cstring: false,
        set_generic_error: true,
        get_generic_error: true,
        allocate_type: true,
        deallocate_type: true,
    };

    pub fn is_string_like(&self) -> bool {
        self.set_cstring && self.get_cstring
    }

    pub fn is_exception_like(&self) -> bool {
        self.set_generic_error && self.get_generic_error
    }
}

/// Struct member.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub ty: TypeRef,
    /// Byte offset inside the native layout
    pub offset: usize,
    /// Member this one annotates (e.g. the length of an array member)
    pub main_name: Option<String>,
}

/// Function argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: String,
    pub ty: TypeRef,
}

/// Service method: a name bound to a function type.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub function: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    pub name: String,
    pub value: i64,
}

/// The closed set of type kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Void,
    Any,
    /// Forward reference by name, resolved at marshaling time
    Unresolved {
        name: String,
    },
    Typedef {
        name: String,
        target: TypeRef,
    },
    Pointer {
        element: TypeRef,
    },
    Reference {
        element: TypeRef,
    },
    /// Unbounded array
    Array {
        element: TypeRef,
    },
    FixedArray {
        element: TypeRef,
        size: usize,
    },
    FixedArray2D {
        element: TypeRef,
        rows: usize,
        cols: usize,
    },
    Struct {
        name: String,
        members: Vec<Member>,
    },
    Function {
        name: String,
        args: Vec<Arg>,
        result: TypeRef,
    },
    Service {
        name: String,
        methods: Vec<Method>,
    },
    Primitive(PrimitiveKind),
    /// Literal value
    PrimitiveValue(TypedBox),
    Enum {
        name: String,
        constants: Vec<EnumConstant>,
    },
    Opaque {
        name: String,
        api: UserApi,
    },
    Encrypted {
        element: TypeRef,
        key_name: String,
    },
}

impl TypeKind {
    /// Kind name used by dumps and error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Any => "any",
            Self::Unresolved { .. } => "unresolved_symbol",
            Self::Typedef { .. } => "typedef",
            Self::Pointer { .. } => "pointer",
            Self::Reference { .. } => "reference",
            Self::Array { .. } => "array",
            Self::FixedArray { .. } => "fixed_array",
            Self::FixedArray2D { .. } => "fixed_array_2d",
            Self::Struct { .. } => "struct",
            Self::Function { .. } => "function",
            Self::Service { .. } => "service",
            Self::Primitive(_) => "primitive",
            Self::PrimitiveValue(_) => "primitive_value",
            Self::Enum { .. } => "enum",
            Self::Opaque { .. } => "opaque",
            Self::Encrypted { .. } => "encrypted",
        }
    }

    /// Declared name, if the kind carries one
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            Self::Unresolved { name }
            | Self::Typedef { name, .. }
            | Self::Struct { name, .. }
            | Self::Service { name, .. }
            | Self::Enum { name, .. }
            | Self::Opaque { name, .. } => Some(name),
            Self::Function { name, .. } if !name.is_empty() => Some(name),
            Self::Primitive(kind) => Some(kind.name()),
            _ => None,
        }
    }

    /// Element type of array-like, pointer-like and encrypted kinds
    pub fn element(&self) -> Option<TypeRef> {
        match self {
            Self::Pointer { element }
            | Self::Reference { element }
            | Self::Array { element }
            | Self::FixedArray { element, .. }
            | Self::FixedArray2D { element, .. }
            | Self::Encrypted { element, .. } => Some(*element),
            _ => None,
        }
    }

    /// Visit every type this node references, in declaration order.
    pub fn for_each_child(&self, visit: &mut dyn FnMut(TypeRef)) {
        match self {
            Self::Typedef { target, .. } => visit(*target),
            Self::Struct { members, .. } => members.iter().for_each(|m| visit(m.ty)),
            Self::Function { args, result, .. } => {
                args.iter().for_each(|a| visit(a.ty));
                visit(*result);
            }
            Self::Service { methods, .. } => methods.iter().for_each(|m| visit(m.function)),
            other => {
                if let Some(element) = other.element() {
                    visit(element);
                }
            }
        }
    }
}

// Kinds whose references can be severed. Unlinking replaces them with an
// empty shape; the node is about to be dropped so its contents no longer
// matter.
impl GcNode for TypeKind {
    fn gc_apply_to_children(&self, visit: &mut dyn FnMut(ObjectId)) {
        self.for_each_child(&mut |t| visit(t.id()));
    }

    fn gc_unlink_refs(&mut self, severed: &mut Vec<ObjectId>) {
        self.for_each_child(&mut |t| severed.push(t.id()));
        if !severed.is_empty() {
            *self = TypeKind::Void;
        }
    }

    fn gc_type_name(&self) -> &'static str {
        self.kind_name()
    }

    fn gc_label(&self) -> String {
        self.declared_name().map(str::to_string).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(index: u32) -> TypeRef {
        TypeRef(ObjectId {
            index,
            generation: 0,
        })
    }

    #[test]
    fn test_children_mirror_unlink() {
        let kinds = vec![
            TypeKind::Struct {
                name: "S".into(),
                members: vec![
                    Member {
                        name: "a".into(),
                        ty: t(1),
                        offset: 0,
                        main_name: None,
                    },
                    Member {
                        name: "b".into(),
                        ty: t(2),
                        offset: 4,
                        main_name: None,
                    },
                ],
            },
            TypeKind::Function {
                name: "f".into(),
                args: vec![Arg {
                    name: "x".into(),
                    ty: t(3),
                }],
                result: t(4),
            },
            TypeKind::Encrypted {
                element: t(5),
                key_name: "default".into(),
            },
            TypeKind::Primitive(PrimitiveKind::I32),
        ];

        for mut kind in kinds {
            let mut visited = Vec::new();
            kind.gc_apply_to_children(&mut |id| visited.push(id));

            let mut severed = Vec::new();
            kind.gc_unlink_refs(&mut severed);
            assert_eq!(visited, severed);

            // idempotent
            let mut again = Vec::new();
            kind.gc_unlink_refs(&mut again);
            assert!(again.is_empty());
        }
    }

    #[test]
    fn test_primitive_names() {
        assert_eq!(PrimitiveKind::F32.name(), "float");
        assert_eq!(PrimitiveKind::Bool.name(), "boolean");
        assert!(PrimitiveKind::U64.is_integer());
        assert!(!PrimitiveKind::F64.is_integer());
    }

    #[test]
    fn test_user_api_presets() {
        assert!(UserApi::STRING.is_string_like());
        assert!(!UserApi::STRING.is_exception_like());
        assert!(UserApi::EXCEPTION.is_exception_like());
        assert!(!UserApi::default().is_string_like());
    }
}
