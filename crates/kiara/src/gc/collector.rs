// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reference-counting arena with a trial-deletion cycle collector.

use super::{GcNode, ObjectId};
use crate::config::DEFAULT_MAX_POSSIBLE_CYCLE_ROOTS;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

/// Collector counters, monotonic over the collector's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorStats {
    /// Objects registered
    pub constructed: u64,
    /// Objects destroyed (refcount reached zero or collected as garbage)
    pub destroyed: u64,
    /// `collect_cycles` runs that examined at least one candidate
    pub collections: u64,
    /// Objects reclaimed by cycle collection
    pub collected: u64,
}

struct Entry<N> {
    node: N,
    refcount: u32,
    possible_root: bool,
}

struct Slot<N> {
    generation: u32,
    entry: Option<Entry<N>>,
}

#[derive(Default, Clone, Copy)]
struct TrialInfo {
    in_edges: u32,
    reachable: bool,
}

/// Owner of every node of one object graph.
///
/// Not thread-safe: a collector belongs to one context and is mutated through
/// `&mut self` only.
pub struct CycleCollector<N: GcNode> {
    slots: Vec<Slot<N>>,
    free: Vec<u32>,
    live: usize,
    possible_roots: Vec<ObjectId>,
    max_possible_roots: usize,
    collecting: bool,
    stats: CollectorStats,
}

impl<N: GcNode> CycleCollector<N> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_possible_roots(DEFAULT_MAX_POSSIBLE_CYCLE_ROOTS)
    }

    /// Collector that runs `collect_cycles` automatically once more than
    /// `max_possible_roots` candidates are pending.
    #[must_use]
    pub fn with_max_possible_roots(max_possible_roots: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            possible_roots: Vec::new(),
            max_possible_roots,
            collecting: false,
            stats: CollectorStats::default(),
        }
    }

    pub fn max_possible_roots(&self) -> usize {
        self.max_possible_roots
    }

    pub fn set_max_possible_roots(&mut self, max: usize) {
        self.max_possible_roots = max;
    }

    /// Live objects
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn stats(&self) -> CollectorStats {
        self.stats
    }

    /// Pending cycle-root candidates (may include stale entries)
    pub fn num_possible_roots(&self) -> usize {
        self.possible_roots.len()
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    // ===================================================================
    // Object Lifecycle
    // ===================================================================

    /// Register a node. The caller owns the returned reference (count 1).
    pub fn insert(&mut self, node: N) -> ObjectId {
        let entry = Entry {
            node,
            refcount: 1,
            possible_root: false,
        };
        self.live += 1;
        self.stats.constructed += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return ObjectId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        ObjectId {
            index,
            generation: 0,
        }
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.entry(id).is_some()
    }

    pub fn get(&self, id: ObjectId) -> Option<&N> {
        self.entry(id).map(|e| &e.node)
    }

    /// Mutable access to a node.
    ///
    /// A node that gains a child must `add_ref` it, one that drops a child
    /// must `release` it.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut N> {
        self.entry_mut(id).map(|e| &mut e.node)
    }

    pub fn refcount(&self, id: ObjectId) -> Option<u32> {
        self.entry(id).map(|e| e.refcount)
    }

    /// Live object ids in slot order
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry.as_ref().map(|_| ObjectId {
                index: index as u32,
                generation: slot.generation,
            })
        })
    }

    /// Increment the count. Clears the possible-root mark.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not alive.
    pub fn add_ref(&mut self, id: ObjectId) -> u32 {
        let entry = self.expect_entry_mut(id, "add_ref");
        entry.refcount += 1;
        entry.possible_root = false;
        entry.refcount
    }

    /// Decrement the count.
    ///
    /// At zero the object is destroyed immediately and its children are
    /// released. A nonzero result marks the object as a possible cycle root.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not alive.
    pub fn release(&mut self, id: ObjectId) -> u32 {
        let entry = self.expect_entry_mut(id, "release");
        assert!(entry.refcount > 0, "[gc] release of object {} with zero count", id);
        entry.refcount -= 1;
        let count = entry.refcount;

        if count == 0 {
            self.destroy(id);
        } else {
            self.mark_possible_root(id);
            if !self.collecting && self.possible_roots.len() > self.max_possible_roots {
                self.collect_cycles();
            }
        }
        count
    }

    fn mark_possible_root(&mut self, id: ObjectId) {
        if let Some(entry) = self.entry_mut(id) {
            if !entry.possible_root {
                entry.possible_root = true;
                self.possible_roots.push(id);
            }
        }
    }

    /// Destroy `id` and every object whose count drops to zero as a result.
    fn destroy(&mut self, id: ObjectId) {
        let mut pending = vec![id];
        let mut severed = Vec::new();

        while let Some(id) = pending.pop() {
            let Some(mut entry) = self.remove(id) else {
                continue;
            };
            entry.node.gc_unlink_refs(&mut severed);

            for child in severed.drain(..) {
                let child_entry = self.expect_entry_mut(child, "destroy");
                assert!(
                    child_entry.refcount > 0,
                    "[gc] child {} released more often than referenced",
                    child
                );
                child_entry.refcount -= 1;
                if child_entry.refcount == 0 {
                    pending.push(child);
                } else {
                    self.mark_possible_root(child);
                }
            }
            self.stats.destroyed += 1;
        }
    }

    // ===================================================================
    // Cycle Collection
    // ===================================================================

    /// Reclaim garbage cycles among the possible roots.
    ///
    /// Returns the number of reclaimed objects. Does nothing while a
    /// collection is already running or when no candidate is pending.
    pub fn collect_cycles(&mut self) -> usize {
        if self.collecting || self.possible_roots.is_empty() {
            return 0;
        }
        self.collecting = true;

        let mut candidates = Vec::new();
        for id in std::mem::take(&mut self.possible_roots) {
            if let Some(entry) = self.entry_mut(id) {
                if entry.possible_root {
                    entry.possible_root = false;
                    candidates.push(id);
                }
            }
        }
        if candidates.is_empty() {
            self.collecting = false;
            return 0;
        }

        let mut graph = self.find_roots(&candidates);
        self.find_reachables(&mut graph);

        let mut garbage: Vec<ObjectId> = graph
            .iter()
            .filter(|(_, info)| !info.reachable)
            .map(|(id, _)| *id)
            .collect();
        garbage.sort_unstable();

        self.unlink_garbage(&garbage);

        self.stats.collections += 1;
        self.stats.collected += garbage.len() as u64;
        log::debug!(
            "[gc] collected {} of {} examined objects ({} candidates, {} still alive)",
            garbage.len(),
            graph.len(),
            candidates.len(),
            self.live
        );

        self.collecting = false;
        garbage.len()
    }

    /// Subgraph reachable from the candidates, with internal in-edge counts.
    fn find_roots(&self, candidates: &[ObjectId]) -> HashMap<ObjectId, TrialInfo> {
        let mut graph: HashMap<ObjectId, TrialInfo> = HashMap::new();
        let mut stack: Vec<ObjectId> = Vec::new();
        let mut children = Vec::new();

        for &id in candidates {
            if graph.insert(id, TrialInfo::default()).is_none() {
                stack.push(id);
            }
        }

        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            node.gc_apply_to_children(&mut |child| children.push(child));

            for child in children.drain(..) {
                let info = graph.entry(child).or_insert_with(|| {
                    stack.push(child);
                    TrialInfo::default()
                });
                info.in_edges += 1;
            }
        }
        graph
    }

    /// Mark everything reachable from an externally referenced node.
    fn find_reachables(&self, graph: &mut HashMap<ObjectId, TrialInfo>) {
        let mut stack: Vec<ObjectId> = Vec::new();

        for (id, info) in graph.iter() {
            let refcount = self.refcount(*id).unwrap_or(0);
            debug_assert!(
                refcount >= info.in_edges,
                "[gc] object {} visits more children than it references",
                id
            );
            if refcount > info.in_edges {
                stack.push(*id);
            }
        }

        let mut children = Vec::new();
        while let Some(id) = stack.pop() {
            match graph.get_mut(&id) {
                Some(info) if !info.reachable => info.reachable = true,
                _ => continue,
            }
            if let Some(node) = self.get(id) {
                node.gc_apply_to_children(&mut |child| children.push(child));
            }
            stack.append(&mut children);
        }
    }

    /// Break all references held by garbage, then drop the garbage.
    fn unlink_garbage(&mut self, garbage: &[ObjectId]) {
        let garbage_set: HashSet<ObjectId> = garbage.iter().copied().collect();
        let mut severed = Vec::new();
        let mut orphans = Vec::new();

        for &id in garbage {
            if let Some(node) = self.get_mut(id) {
                node.gc_unlink_refs(&mut severed);
            }
            for child in severed.drain(..) {
                let child_entry = self.expect_entry_mut(child, "collect");
                assert!(
                    child_entry.refcount > 0,
                    "[gc] child {} released more often than referenced",
                    child
                );
                child_entry.refcount -= 1;
                if !garbage_set.contains(&child) {
                    if child_entry.refcount == 0 {
                        orphans.push(child);
                    } else {
                        self.mark_possible_root(child);
                    }
                }
            }
        }

        for &id in garbage {
            let refcount = self.refcount(id).unwrap_or(0);
            if refcount != 0 {
                log::error!(
                    "[gc] object {} still referenced {} times after unlinking, keeping it",
                    id,
                    refcount
                );
                debug_assert_eq!(refcount, 0, "[gc] premature collection of {}", id);
                continue;
            }
            if self.remove(id).is_some() {
                self.stats.destroyed += 1;
            }
        }

        for id in orphans {
            self.destroy(id);
        }
    }

    // ===================================================================
    // Debugging
    // ===================================================================

    /// Graphviz rendering of the live graph
    pub fn dump_mem_graph(&self) -> String {
        let mut out = String::from("digraph MemGraph {\n");
        let mut children = Vec::new();

        for id in self.ids() {
            let Some(entry) = self.entry(id) else {
                continue;
            };
            let label = entry.node.gc_label();
            let _ = writeln!(
                out,
                "  n{} [label=\"{} {}{}{} rc={}\"];",
                id.index,
                entry.node.gc_type_name(),
                id,
                if label.is_empty() { "" } else { "\\n" },
                label.replace('"', "\\\""),
                entry.refcount
            );
            entry
                .node
                .gc_apply_to_children(&mut |child| children.push(child));
            for child in children.drain(..) {
                let _ = writeln!(out, "  n{} -> n{};", id.index, child.index);
            }
        }
        out.push_str("}\n");
        out
    }

    // ===================================================================
    // Slot Access
    // ===================================================================

    fn entry(&self, id: ObjectId) -> Option<&Entry<N>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn entry_mut(&mut self, id: ObjectId) -> Option<&mut Entry<N>> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    fn expect_entry_mut(&mut self, id: ObjectId, op: &str) -> &mut Entry<N> {
        match self.entry_mut(id) {
            Some(entry) => entry,
            None => panic!("[gc] {} on dead object {}", op, id),
        }
    }

    fn remove(&mut self, id: ObjectId) -> Option<Entry<N>> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(entry)
    }
}

impl<N: GcNode> Default for CycleCollector<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: GcNode> Drop for CycleCollector<N> {
    fn drop(&mut self) {
        if self.live > 0 {
            log::warn!(
                "[gc] {} objects still alive at collector teardown",
                self.live
            );
        }
        let mut severed = Vec::new();
        for slot in &mut self.slots {
            if let Some(entry) = slot.entry.as_mut() {
                entry.node.gc_unlink_refs(&mut severed);
                severed.clear();
            }
        }
    }
}

impl<N: GcNode> std::fmt::Debug for CycleCollector<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleCollector")
            .field("live", &self.live)
            .field("possible_roots", &self.possible_roots.len())
            .field("max_possible_roots", &self.max_possible_roots)
            .field("stats", &self.stats)
            .finish()
    }
}
