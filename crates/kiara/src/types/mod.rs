// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime type descriptions.
//!
//! A [`World`] owns every type node in a [`CycleCollector`](crate::gc::CycleCollector)
//! and hands out [`TypeRef`] handles. Descriptions enter the world three ways:
//!
//! - builtins (`void`, `any`, primitives and their C aliases), present from
//!   the start
//! - native Rust types through [`Declare`] (usually `#[derive(Kiara)]`)
//! - the fluent builders ([`World::struct_type`], [`World::function`],
//!   [`World::service`])
//!
//! Structurally equal descriptions are interned into one node, so
//! declaring the same shape twice yields the same handle.
//!
//! # Example
//!
//! ```
//! use kiara::types::{PrimitiveKind, World};
//!
//! let mut world = World::new();
//! let i32_t = world.primitive(PrimitiveKind::I32);
//! let a = world.array_of(i32_t);
//! let b = world.array_of(i32_t);
//! assert_eq!(a, b);
//! assert_eq!(world.type_name(a), "i32[]");
//! ```

mod builder;
mod declare;
mod dump;
mod kind;
mod world;

pub use builder::{FunctionBuilder, ServiceBuilder, StructBuilder, TypeSpec};
pub use declare::Declare;
pub use kind::{
    Arg, EnumConstant, Member, Method, PrimitiveKind, TypeKind, TypeRef, UserApi,
};
pub use world::World;

#[cfg(test)]
mod tests;
