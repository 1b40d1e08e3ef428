// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type registry tests.

use super::*;
use crate::error::ResultCode;
use std::mem::offset_of;

#[allow(dead_code)]
struct Node {
    value: i32,
    next: Option<Box<Node>>,
}

impl Declare for Node {
    fn declare(world: &mut World) -> TypeRef {
        world.declare_struct::<Self>("Node", |w| {
            vec![
                Member {
                    name: "value".into(),
                    ty: w.type_of::<i32>(),
                    offset: offset_of!(Node, value),
                    main_name: None,
                },
                Member {
                    name: "next".into(),
                    ty: w.type_of::<Option<Box<Node>>>(),
                    offset: offset_of!(Node, next),
                    main_name: None,
                },
            ]
        })
    }
}

#[allow(dead_code)]
struct Ping {
    pong: Option<Box<Pong>>,
}

#[allow(dead_code)]
struct Pong {
    ping: Option<Box<Ping>>,
}

impl Declare for Ping {
    fn declare(world: &mut World) -> TypeRef {
        world.declare_struct::<Self>("Ping", |w| {
            vec![Member {
                name: "pong".into(),
                ty: w.type_of::<Option<Box<Pong>>>(),
                offset: 0,
                main_name: None,
            }]
        })
    }
}

impl Declare for Pong {
    fn declare(world: &mut World) -> TypeRef {
        world.declare_struct::<Self>("Pong", |w| {
            vec![Member {
                name: "ping".into(),
                ty: w.type_of::<Option<Box<Ping>>>(),
                offset: 0,
                main_name: None,
            }]
        })
    }
}

fn members(world: &World, t: TypeRef) -> Vec<Member> {
    match world.get(t) {
        Some(TypeKind::Struct { members, .. }) => members.clone(),
        other => panic!("expected struct, got {:?}", other),
    }
}

#[test]
fn test_builtin_names() {
    let world = World::new();
    let i32_t = world.primitive(PrimitiveKind::I32);
    assert_eq!(world.lookup("i32"), Some(i32_t));
    assert_eq!(world.lookup("c_int32_t"), Some(i32_t));
    assert_eq!(world.lookup("c_char"), world.lookup("i8"));
    assert_eq!(world.lookup("float"), Some(world.primitive(PrimitiveKind::F32)));
    assert_eq!(world.lookup("void"), Some(world.void()));
    assert_eq!(world.lookup("unresolved_symbol"), Some(world.unresolved_symbol()));
    assert!(world.is_builtin(i32_t));
}

#[test]
fn test_interning_identity() {
    let mut world = World::new();
    let f64_t = world.type_of::<f64>();

    assert_eq!(world.array_of(f64_t), world.array_of(f64_t));
    assert_eq!(world.type_c_ptr(f64_t), world.type_c_ptr(f64_t));
    assert_ne!(world.type_c_ptr(f64_t), world.type_c_ref(f64_t));
    assert_eq!(world.fixed_array_of(f64_t, 3), world.fixed_array_of(f64_t, 3));
    assert_ne!(world.fixed_array_of(f64_t, 3), world.fixed_array_of(f64_t, 4));
    assert_eq!(
        world.encrypted(f64_t, "default"),
        world.encrypted(f64_t, "default")
    );
    assert_ne!(world.encrypted(f64_t, "a"), world.encrypted(f64_t, "b"));

    // native declarations from two call sites
    assert_eq!(world.type_of::<Vec<f64>>(), world.array_of(f64_t));
    assert_eq!(world.type_of::<Vec<Vec<u8>>>(), world.type_of::<Vec<Vec<u8>>>());
}

#[test]
fn test_builder_struct_interned() {
    let mut world = World::new();
    let a = world
        .struct_type("Point")
        .member("x", "i32")
        .member("y", "i32")
        .build()
        .unwrap();
    let b = world
        .struct_type("Point")
        .member("x", "i32")
        .member("y", "i32")
        .build()
        .unwrap();
    assert_eq!(a, b);

    let err = world
        .struct_type("Point")
        .member("x", "double")
        .build()
        .unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidType);
}

#[test]
fn test_recursive_native_struct() {
    let mut world = World::new();
    let node = world.type_of::<Node>();
    assert_eq!(world.type_of::<Node>(), node);
    assert_eq!(world.lookup("Node"), Some(node));

    let m = members(&world, node);
    assert_eq!(m.len(), 2);
    assert_eq!(m[0].ty, world.primitive(PrimitiveKind::I32));
    assert_eq!(m[1].offset, offset_of!(Node, next));
    assert_eq!(m[1].ty, world.type_c_ptr(node));
    assert_eq!(world.type_name(m[1].ty), "Node*");
}

#[test]
fn test_mutually_recursive_structs() {
    let mut world = World::new();
    let ping = world.type_of::<Ping>();
    let pong = world.lookup("Pong").unwrap();
    assert_eq!(world.type_of::<Pong>(), pong);

    let ping_member = members(&world, ping)[0].ty;
    let pong_member = members(&world, pong)[0].ty;
    assert_eq!(world.get(ping_member).unwrap().element(), Some(pong));
    assert_eq!(world.get(pong_member).unwrap().element(), Some(ping));
}

#[test]
fn test_native_matches_builder_layout() {
    #[allow(dead_code)]
    #[repr(C)]
    struct Pair {
        a: i32,
        b: i32,
    }

    impl Declare for Pair {
        fn declare(world: &mut World) -> TypeRef {
            world.declare_struct::<Self>("Pair", |w| {
                vec![
                    Member {
                        name: "a".into(),
                        ty: w.type_of::<i32>(),
                        offset: offset_of!(Pair, a),
                        main_name: None,
                    },
                    Member {
                        name: "b".into(),
                        ty: w.type_of::<i32>(),
                        offset: offset_of!(Pair, b),
                        main_name: None,
                    },
                ]
            })
        }
    }

    let mut world = World::new();
    let built = world
        .struct_type("Pair")
        .member("a", "i32")
        .member("b", "i32")
        .build()
        .unwrap();
    let live_before = world.len();
    assert_eq!(world.type_of::<Pair>(), built);
    // the placeholder was released again
    assert_eq!(world.len(), live_before);
}

#[test]
fn test_forward_reference_resolves_late() {
    let mut world = World::new();
    let holder = world
        .struct_type("Holder")
        .member("item", "Later")
        .build()
        .unwrap();
    let item = members(&world, holder)[0].ty;
    assert!(matches!(world.get(item), Some(TypeKind::Unresolved { .. })));

    let err = world.resolve(item).unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidType);

    let later = world.struct_type("Later").member("v", "u8").build().unwrap();
    assert_eq!(world.resolve(item).unwrap(), later);
}

#[test]
fn test_typedef_resolution() {
    let mut world = World::new();
    let u64_t = world.type_of::<u64>();
    let alias = world.typedef("handle_t", u64_t).unwrap();
    assert_ne!(alias, u64_t);
    assert_eq!(world.resolve(alias).unwrap(), u64_t);
    assert_eq!(world.dump(alias), "typedef handle_t = u64");
}

#[test]
fn test_unregister_reclaims_recursive_type() {
    let mut world = World::new();
    let before = world.len();
    let node = world.type_of::<Node>();
    assert_eq!(world.len(), before + 2); // Node and Node*

    assert!(world.unregister("Node"));
    assert!(world.lookup("Node").is_none());
    // the struct and its pointer keep each other alive
    assert!(world.contains(node));
    assert_eq!(world.collect(), 2);
    assert!(!world.contains(node));
    assert_eq!(world.len(), before);

    // declaring again builds a fresh node
    let again = world.type_of::<Node>();
    assert!(world.contains(again));
    assert_ne!(again, node);
}

#[test]
fn test_unregister_rejects_builtins_and_unknown() {
    let mut world = World::new();
    assert!(!world.unregister("i32"));
    assert!(!world.unregister("no_such_type"));
    assert!(world.lookup("i32").is_some());
}

#[test]
fn test_layout_offsets() {
    let mut world = World::new();
    let mixed = world
        .struct_type("Mixed")
        .member("a", "u8")
        .member("b", "i32")
        .member("c", "u8")
        .member("d", "double")
        .build()
        .unwrap();
    let offsets: Vec<usize> = members(&world, mixed).iter().map(|m| m.offset).collect();
    assert_eq!(offsets, vec![0, 4, 8, 16]);
    assert_eq!(world.layout(mixed), (24, 8));
}

#[test]
fn test_two_dimensional_arrays() {
    let mut world = World::new();
    let grid = world.type_of::<[[f64; 4]; 3]>();
    assert!(matches!(
        world.get(grid),
        Some(TypeKind::FixedArray2D { rows: 3, cols: 4, .. })
    ));
    assert_eq!(world.type_name(grid), "double[3][4]");
    assert_eq!(world.layout(grid), (96, 8));
}

#[test]
fn test_dump_formats() {
    let mut world = World::new();
    let point = world
        .struct_type("Point")
        .member("x", "i32")
        .member("y", "i32")
        .build()
        .unwrap();
    assert_eq!(
        world.dump(point),
        "struct Point {\n  x : i32 @0\n  y : i32 @4\n}"
    );

    let add = world
        .function("add")
        .arg("a", point)
        .arg("b", point)
        .returns(point)
        .build()
        .unwrap();
    assert_eq!(world.dump(add), "function add(a: Point, b: Point) -> Point");

    let color = world
        .enum_type("Color", &[("RED", 0), ("GREEN", 1)])
        .unwrap();
    assert_eq!(world.dump(color), "enum Color { RED = 0, GREEN = 1 }");

    let arr = world.array_of(point);
    assert_eq!(world.dump(arr), "array of Point");
    let secret = world.encrypted(point, "session");
    assert_eq!(world.dump(secret), "encrypted of Point (key \"session\")");

    let calc = world.service("calc").method("add", add).build().unwrap();
    assert_eq!(world.dump(calc), "service calc {\n  add = add\n}");

    let text = world.opaque("Text", UserApi::STRING).unwrap();
    assert!(world.dump(text).starts_with("opaque Text [GetCString, SetCString"));
}

#[test]
fn test_service_rejects_non_function() {
    let mut world = World::new();
    let err = world
        .service("broken")
        .method("x", "i32")
        .build()
        .unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidType);
}

#[test]
fn test_duplicate_member_rejected() {
    let mut world = World::new();
    let err = world
        .struct_type("Dup")
        .member("a", "i32")
        .member("a", "u8")
        .build()
        .unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidArgument);
}

#[test]
fn test_dump_mem_graph_lists_edges() {
    let mut world = World::new();
    world.type_of::<Node>();
    let dot = world.dump_mem_graph();
    assert!(dot.starts_with("digraph MemGraph"));
    assert!(dot.contains("Node"));
    assert!(dot.contains("->"));
}
