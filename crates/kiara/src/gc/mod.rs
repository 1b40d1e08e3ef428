// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reference-counted object graph with cycle collection.
//!
//! Nodes live in a [`CycleCollector`] arena and refer to each other through
//! [`ObjectId`]s. Each id held by a node is a strong reference counted by the
//! collector. Acyclic garbage is destroyed as soon as its count reaches zero;
//! cycles are reclaimed by [`CycleCollector::collect_cycles`] using trial
//! deletion over the objects whose count was decremented without reaching
//! zero (the *possible cycle roots*).
//!
//! # Example
//!
//! ```
//! use kiara::gc::{CycleCollector, GcNode, ObjectId};
//!
//! #[derive(Default)]
//! struct Pair {
//!     next: Option<ObjectId>,
//! }
//!
//! impl GcNode for Pair {
//!     fn gc_apply_to_children(&self, visit: &mut dyn FnMut(ObjectId)) {
//!         self.next.into_iter().for_each(visit);
//!     }
//!
//!     fn gc_unlink_refs(&mut self, severed: &mut Vec<ObjectId>) {
//!         severed.extend(self.next.take());
//!     }
//! }
//!
//! let mut gc = CycleCollector::new();
//! let a = gc.insert(Pair::default());
//! let b = gc.insert(Pair::default());
//!
//! // a -> b -> a
//! gc.add_ref(b);
//! gc.get_mut(a).unwrap().next = Some(b);
//! gc.add_ref(a);
//! gc.get_mut(b).unwrap().next = Some(a);
//!
//! gc.release(a);
//! gc.release(b);
//! assert_eq!(gc.len(), 2);
//!
//! assert_eq!(gc.collect_cycles(), 2);
//! assert!(gc.is_empty());
//! ```

mod collector;

pub use collector::{CollectorStats, CycleCollector};

use std::fmt;

/// Generational handle to a node in a [`CycleCollector`].
///
/// A stale handle (its node destroyed, slot reused) never aliases the new
/// occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ObjectId {
    pub fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)?;
        if self.generation > 0 {
            write!(f, ".{}", self.generation)?;
        }
        Ok(())
    }
}

/// Per-type graph contract.
///
/// `gc_apply_to_children` must visit exactly the references that
/// `gc_unlink_refs` severs: visiting fewer leaks cycles, visiting more makes
/// the collector reclaim objects that are still referenced.
pub trait GcNode {
    /// Call `visit` once per child reference currently held.
    fn gc_apply_to_children(&self, visit: &mut dyn FnMut(ObjectId));

    /// Drop every child reference, pushing each one onto `severed`.
    ///
    /// Must be idempotent: a second call severs nothing.
    fn gc_unlink_refs(&mut self, severed: &mut Vec<ObjectId>);

    /// Kind name used in graph dumps
    fn gc_type_name(&self) -> &'static str {
        "object"
    }

    /// Extra text for graph dumps
    fn gc_label(&self) -> String {
        String::new()
    }
}
