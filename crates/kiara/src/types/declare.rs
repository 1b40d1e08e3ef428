// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native type declarations.
//!
//! [`Declare`] maps a Rust type to its canonical [`TypeRef`]. Structs are
//! normally declared by `#[derive(Kiara)]`, which expands to a call to
//! [`World::declare_struct`].

use super::kind::{Member, PrimitiveKind, TypeKind, TypeRef, UserApi};
use super::world::World;
use crate::cdt::DynString;
use std::any::TypeId;

/// A Rust type with a runtime type description.
pub trait Declare: 'static {
    /// Register (or look up) the description of `Self` in `world`.
    ///
    /// Must be idempotent: repeated calls return the same handle.
    fn declare(world: &mut World) -> TypeRef;
}

impl World {
    /// Canonical type of `T`
    pub fn type_of<T: Declare>(&mut self) -> TypeRef {
        T::declare(self)
    }

    /// Declare the struct `T` once per world.
    ///
    /// A placeholder is registered for `T` before `members` runs, so member
    /// types may refer back to `T` (directly or through other structs).
    pub fn declare_struct<T: 'static>(
        &mut self,
        name: &str,
        members: impl FnOnce(&mut World) -> Vec<Member>,
    ) -> TypeRef {
        let key = TypeId::of::<T>();
        if let Some(t) = self.native.get(&key) {
            return *t;
        }

        // The memo entry owns the placeholder's initial reference.
        let placeholder = self.alloc(TypeKind::Struct {
            name: name.to_string(),
            members: Vec::new(),
        });
        self.native.insert(key, placeholder);

        let members = members(self);
        for m in &members {
            self.gc.add_ref(m.ty.id());
        }
        if let Some(TypeKind::Struct { members: slot, .. }) = self.gc.get_mut(placeholder.id()) {
            *slot = members;
        }

        match self.publish(placeholder) {
            Ok(t) if t == placeholder => {
                log::debug!("[world] Declared native struct '{}' as {}", name, t);
                t
            }
            Ok(existing) => {
                // Same layout was already described through the builder.
                self.gc.add_ref(existing.id());
                self.native.insert(key, existing);
                self.gc.release(placeholder.id());
                existing
            }
            Err(e) => {
                log::error!("[world] Failed to publish '{}': {}", name, e);
                placeholder
            }
        }
    }
}

macro_rules! impl_declare_primitive {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Declare for $ty {
                fn declare(world: &mut World) -> TypeRef {
                    world.primitive(PrimitiveKind::$kind)
                }
            }
        )*
    };
}

impl_declare_primitive! {
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
}

impl Declare for () {
    fn declare(world: &mut World) -> TypeRef {
        world.void()
    }
}

impl<T: Declare> Declare for Vec<T> {
    fn declare(world: &mut World) -> TypeRef {
        let element = world.type_of::<T>();
        world.array_of(element)
    }
}

/// `[[T; C]; R]` is described as one two-dimensional array.
impl<T: Declare, const N: usize> Declare for [T; N] {
    fn declare(world: &mut World) -> TypeRef {
        let element = world.type_of::<T>();
        match world.get(element) {
            Some(TypeKind::FixedArray {
                element: inner,
                size,
            }) => {
                let (inner, cols) = (*inner, *size);
                world.fixed_array_2d_of(inner, N, cols)
            }
            _ => world.fixed_array_of(element, N),
        }
    }
}

/// Nullable owning pointer
impl<T: Declare> Declare for Option<Box<T>> {
    fn declare(world: &mut World) -> TypeRef {
        let element = world.type_of::<T>();
        world.type_c_ptr(element)
    }
}

impl Declare for DynString {
    fn declare(world: &mut World) -> TypeRef {
        match world.lookup("DynString") {
            Some(t) => t,
            None => world
                .opaque("DynString", UserApi::STRING)
                .unwrap_or_else(|_| world.any()),
        }
    }
}
