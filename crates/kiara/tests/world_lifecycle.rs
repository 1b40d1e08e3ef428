// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::cast_possible_truncation)] // Test parameters
#![allow(clippy::cast_sign_loss)] // Test data conversions
#![allow(clippy::float_cmp)] // Test assertions with constants
#![allow(clippy::unreadable_literal)] // Large test constants
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure
#![allow(clippy::items_after_statements)] // Test helpers
#![allow(clippy::too_many_lines)] // Example/test code
#![allow(clippy::wildcard_imports)] // Test utility imports
#![allow(clippy::similar_names)] // Test variable naming
#![allow(clippy::needless_pass_by_value)] // Test functions

//! Type graph reclamation: derived recursive types are cycles in the
//! world's collector and must be reclaimed once unregistered.

use kiara::{Context, Kiara, World};

#[derive(Kiara)]
#[allow(dead_code)]
struct Ping {
    hits: u32,
    pong: Option<Box<Pong>>,
}

#[derive(Kiara)]
#[allow(dead_code)]
struct Pong {
    misses: u32,
    ping: Option<Box<Ping>>,
}

#[derive(Kiara)]
#[allow(dead_code)]
struct Tree {
    label: String,
    children: Vec<Tree>,
    parent: Option<Box<Tree>>,
}

#[test]
fn test_mutual_recursion_reclaimed() {
    let mut world = World::new();
    let baseline = world.len();

    let ping = world.type_of::<Ping>();
    let pong = world.lookup("Pong").unwrap();
    // Ping, Pong and a pointer to each
    assert_eq!(world.len(), baseline + 4);

    assert!(world.unregister("Ping"));
    assert!(world.contains(ping));
    assert_eq!(world.collect(), 0);

    assert!(world.unregister("Pong"));
    assert!(world.contains(pong));
    assert_eq!(world.collect(), 4);
    assert!(!world.contains(ping));
    assert!(!world.contains(pong));
    assert_eq!(world.len(), baseline);
}

#[test]
fn test_repeated_declarations_do_not_leak() {
    let mut ctx = Context::new();
    let baseline = ctx.world().len();
    let mut previous = None;

    for _ in 0..50 {
        let tree = ctx.world_mut().type_of::<Tree>();
        assert_ne!(Some(tree), previous);
        previous = Some(tree);

        assert!(ctx.world_mut().unregister("Tree"));
        assert!(ctx.collect() > 0);
        assert_eq!(ctx.world().len(), baseline);
    }
}

#[test]
fn test_live_types_survive_collection() {
    let mut world = World::new();
    let tree = world.type_of::<Tree>();
    let ping = world.type_of::<Ping>();

    assert!(world.unregister("Tree"));
    world.collect();
    assert!(!world.contains(tree));
    assert!(world.contains(ping));
    assert_eq!(world.lookup("Ping"), Some(ping));
    assert!(world.dump_mem_graph().contains("Ping"));
}

#[test]
fn test_survivor_redeclared_after_unregister() {
    let mut world = World::new();
    let inner = world
        .struct_type("Inner")
        .member("x", "i32")
        .build()
        .unwrap();
    let outer = world
        .struct_type("Outer")
        .member("inner", inner)
        .member("count", "i32")
        .build()
        .unwrap();

    assert!(world.unregister("Inner"));
    assert_eq!(world.collect(), 0);
    assert!(world.contains(inner));
    assert_eq!(world.lookup("Outer"), Some(outer));

    let again = world
        .struct_type("Outer")
        .member("inner", inner)
        .member("count", "i32")
        .build()
        .unwrap();
    assert_eq!(again, outer);

    assert!(world.unregister("Outer"));
    world.collect();
    assert!(!world.contains(outer));
    assert!(!world.contains(inner));
}
