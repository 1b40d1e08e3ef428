// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use crate::config::RuntimeConfig;
use crate::error::ResultCode;
use crate::message::jsonrpc::JsonRpcMessage;
use crate::message::tbp::TbpMessage;
use crate::types::{Member, PrimitiveKind, TypeRef, World};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
struct Sample {
    id: u64,
    tags: Vec<String>,
    grid: [[i16; 2]; 2],
    next: Option<Box<Sample>>,
}

impl Marshal for Sample {
    fn write_to(&self, m: &mut Marshaler<'_>) -> crate::Result<()> {
        m.message().write_struct_begin("Sample")?;
        m.write_field("id", &self.id)?;
        m.write_field("tags", &self.tags)?;
        m.write_field("grid", &self.grid)?;
        m.write_field("next", &self.next)?;
        m.message().write_struct_end()
    }

    fn read_from(m: &mut Marshaler<'_>) -> crate::Result<Self> {
        m.message().read_struct_begin("Sample")?;
        let value = Self {
            id: m.read_field("id")?,
            tags: m.read_field("tags")?,
            grid: m.read_field("grid")?,
            next: m.read_field("next")?,
        };
        m.message().read_struct_end()?;
        Ok(value)
    }
}

impl crate::types::Declare for Sample {
    fn declare(world: &mut World) -> TypeRef {
        world.declare_struct::<Self>("Sample", |w| {
            vec![
                member(w.type_of::<u64>(), "id", std::mem::offset_of!(Sample, id)),
                member(w.type_of::<Vec<String>>(), "tags", std::mem::offset_of!(Sample, tags)),
                member(w.type_of::<[[i16; 2]; 2]>(), "grid", std::mem::offset_of!(Sample, grid)),
                member(
                    w.type_of::<Option<Box<Sample>>>(),
                    "next",
                    std::mem::offset_of!(Sample, next),
                ),
            ]
        })
    }
}

fn member(ty: TypeRef, name: &str, offset: usize) -> Member {
    Member {
        name: name.to_string(),
        ty,
        offset,
        main_name: None,
    }
}

fn sample() -> Sample {
    Sample {
        id: u64::MAX,
        tags: vec![String::new(), "x".into()],
        grid: [[i16::MIN, 0], [1, i16::MAX]],
        next: Some(Box::new(Sample {
            id: 0,
            tags: Vec::new(),
            grid: [[0; 2]; 2],
            next: None,
        })),
    }
}

fn tbp_round_trip<T: Marshal>(value: &T) -> T {
    let mut msg = TbpMessage::scratch();
    Marshaler::new(&mut msg).write(value).unwrap();
    let bytes = msg.finish().unwrap();
    let mut back = TbpMessage::from_scratch(&bytes).unwrap();
    Marshaler::new(&mut back).read().unwrap()
}

fn json_round_trip<T: Marshal>(value: &T) -> T {
    let mut msg = JsonRpcMessage::response(serde_json::Value::from(1));
    Marshaler::new(&mut msg).write(value).unwrap();
    let bytes = msg.finish().unwrap();
    let mut back = JsonRpcMessage::parse_response(&bytes).unwrap();
    Marshaler::new(&mut back).read().unwrap()
}

#[test]
fn test_struct_round_trip_both_protocols() {
    let value = sample();
    assert_eq!(tbp_round_trip(&value), value);
    assert_eq!(json_round_trip(&value), value);
}

#[test]
fn test_integer_boundaries() {
    let value = Tuple((
        vec![i8::MIN, i8::MAX],
        vec![u8::MAX, 0],
        vec![i32::MIN, -1, i32::MAX],
        vec![i64::MIN, i64::MAX],
        vec![u64::MAX, u64::MIN],
    ));
    assert_eq!(tbp_round_trip(&value), value);
    assert_eq!(json_round_trip(&value), value);
}

/// Adapts positional arguments to a single top-level value for the helpers.
#[derive(Debug, Clone, PartialEq)]
struct Tuple<A>(A);

impl<A: MarshalArgs> Marshal for Tuple<A> {
    fn write_to(&self, m: &mut Marshaler<'_>) -> crate::Result<()> {
        m.message().write_array_begin(A::ARITY)?;
        self.0.write_args(m)?;
        m.message().write_array_end()
    }

    fn read_from(m: &mut Marshaler<'_>) -> crate::Result<Self> {
        m.message().read_array_begin()?;
        let args = A::read_args(m)?;
        m.message().read_array_end()?;
        Ok(Self(args))
    }
}

#[test]
fn test_floats_round_trip() {
    let values = vec![0.0f64, -0.0, f64::MIN, f64::MAX, f64::EPSILON, f64::INFINITY];
    assert_eq!(tbp_round_trip(&values), values);
    assert_eq!(json_round_trip(&values), values);
    assert!(tbp_round_trip(&f32::NAN).is_nan());
    assert!(json_round_trip(&f64::NAN).is_nan());
}

#[test]
fn test_fixed_array_length_checked() {
    let mut msg = TbpMessage::scratch();
    Marshaler::new(&mut msg).write(&vec![1u8, 2, 3]).unwrap();
    let bytes = msg.finish().unwrap();
    let mut back = TbpMessage::from_scratch(&bytes).unwrap();
    let err = Marshaler::new(&mut back).read::<[u8; 2]>().unwrap_err();
    assert_eq!(err.code(), ResultCode::InputError);
}

#[test]
fn test_dynamic_matches_native_wire_form() {
    let mut world = World::new();
    let ty = world.type_of::<Sample>();
    let value = Value::structure([
        ("id", Value::U64(7)),
        ("tags", Value::from(vec!["a", "b"])),
        (
            "grid",
            Value::Array(vec![
                Value::from(vec![1i16, 2]),
                Value::from(vec![3i16, 4]),
            ]),
        ),
        ("next", Value::Pointer(None)),
    ]);

    let mut dynamic = TbpMessage::scratch();
    write_value(&mut Marshaler::new(&mut dynamic), &world, ty, &value).unwrap();

    let native_value = Sample {
        id: 7,
        tags: vec!["a".into(), "b".into()],
        grid: [[1, 2], [3, 4]],
        next: None,
    };
    let mut native = TbpMessage::scratch();
    Marshaler::new(&mut native).write(&native_value).unwrap();

    let bytes = dynamic.finish().unwrap();
    assert_eq!(bytes, native.finish().unwrap());

    let mut back = TbpMessage::from_scratch(&bytes).unwrap();
    assert_eq!(read_value(&mut Marshaler::new(&mut back), &world, ty).unwrap(), value);
}

#[test]
fn test_dynamic_rejects_mismatches() {
    let mut world = World::new();
    let u8_ty = world.primitive(PrimitiveKind::U8);
    let mut msg = TbpMessage::scratch();
    let mut m = Marshaler::new(&mut msg);

    let err = write_value(&mut m, &world, u8_ty, &Value::I32(300)).unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidValue);
    let err = write_value(&mut m, &world, u8_ty, &Value::from("x")).unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidType);

    let later = world.resolve_name("Later");
    let err = write_value(&mut m, &world, later, &Value::Void).unwrap_err();
    assert_eq!(err.code(), ResultCode::InvalidType);

    let any = world.any();
    assert!(write_value(&mut m, &world, any, &Value::Void).is_err());
}

#[test]
fn test_dynamic_enum() {
    let mut world = World::new();
    let color = world.enum_type("Color", &[("RED", 0), ("BLUE", 4)]).unwrap();
    let mut msg = JsonRpcMessage::response(serde_json::Value::Null);
    let mut m = Marshaler::new(&mut msg);
    assert!(write_value(&mut m, &world, color, &Value::Enum(2)).is_err());
    write_value(&mut m, &world, color, &Value::Enum(4)).unwrap();
    let bytes = msg.finish().unwrap();

    let mut back = JsonRpcMessage::parse_response(&bytes).unwrap();
    let got = read_value(&mut Marshaler::new(&mut back), &world, color).unwrap();
    assert_eq!(got, Value::Enum(4));
}

#[test]
fn test_encrypted_needs_key_store() {
    let mut msg = TbpMessage::scratch();
    let err = Marshaler::new(&mut msg)
        .write(&Encrypted(5u32))
        .unwrap_err();
    assert!(matches!(
        err.code(),
        ResultCode::SymmetricKeyInitFailed | ResultCode::UnsupportedFeature
    ));
}

#[cfg(feature = "security")]
#[test]
fn test_encrypted_round_trip() {
    let config = RuntimeConfig::new();
    config.set_secret_key(crate::config::DEFAULT_SECRET_KEY_NAME, "hunter2");

    for secret in [String::new(), "top secret".to_string()] {
        let mut msg = TbpMessage::scratch();
        Marshaler::with_keys(&mut msg, &config)
            .write(&Encrypted(secret.clone()))
            .unwrap();
        let bytes = msg.finish().unwrap();
        assert!(!bytes.windows(3).any(|w| w == b"top"));

        let mut back = TbpMessage::from_scratch(&bytes).unwrap();
        let got: Encrypted<String> = Marshaler::with_keys(&mut back, &config).read().unwrap();
        assert_eq!(got.into_inner(), secret);
    }
}

#[cfg(feature = "security")]
#[test]
fn test_dynamic_encrypted_member() {
    let config = RuntimeConfig::new();
    config.set_secret_key("session", "pw");
    let mut world = World::new();
    let i32_ty = world.primitive(PrimitiveKind::I32);
    let sealed = world.encrypted(i32_ty, "session");
    let ty = world.struct_type("Secret").member("pin", sealed).build().unwrap();
    let value = Value::structure([("pin", Value::I32(1234))]);

    let mut msg = JsonRpcMessage::response(serde_json::Value::Null);
    write_value(&mut Marshaler::with_keys(&mut msg, &config), &world, ty, &value).unwrap();
    let bytes = msg.finish().unwrap();

    let mut back = JsonRpcMessage::parse_response(&bytes).unwrap();
    let got = read_value(&mut Marshaler::with_keys(&mut back, &config), &world, ty).unwrap();
    assert_eq!(got, value);

    config.set_secret_key("session", "other");
    let mut back = JsonRpcMessage::parse_response(&bytes).unwrap();
    let err = read_value(&mut Marshaler::with_keys(&mut back, &config), &world, ty).unwrap_err();
    assert_eq!(err.code(), ResultCode::DecryptionFailed);
}
