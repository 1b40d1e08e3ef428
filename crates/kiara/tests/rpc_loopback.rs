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

//! Client and service stubs talking through in-process transports.

use kiara::config::ServerConfiguration;
use kiara::message::RemoteError;
use kiara::rpc::{Connection, LoopbackTransport, Service, StaticSymbolResolver, SymbolResolver};
use kiara::types::PrimitiveKind;
use kiara::{Context, Error, Kiara, ResultCode, Value};
use std::io::Write;
use std::sync::Arc;

#[derive(Kiara, Debug, Clone, PartialEq)]
#[kiara(name = "calc.Operands")]
struct Operands {
    lhs: i64,
    rhs: i64,
}

#[derive(Kiara, Debug, Clone, PartialEq)]
struct Summary {
    total: i64,
    count: u32,
    names: Vec<String>,
}

const URI: &str = "loopback://calc";

fn calc_service(ctx: &Context) -> Service {
    let mut service = ctx.new_service("calc");
    service.register_native("calc.divide", |(ops,): (Operands,)| {
        if ops.rhs == 0 {
            return Err(RemoteError::new(ResultCode::InvalidArgument as i32, "division by zero"));
        }
        Ok(ops.lhs / ops.rhs)
    });
    service.register_native("calc.summarize", |(values, names): (Vec<i64>, Vec<String>)| {
        Ok(Summary {
            total: values.iter().sum(),
            count: values.len() as u32,
            names,
        })
    });

    let world = service.world_mut();
    let f32_ty = world.primitive(PrimitiveKind::F32);
    let scale = world
        .function("calc.scale")
        .arg("value", f32_ty)
        .arg("factor", f32_ty)
        .returns(f32_ty)
        .build()
        .unwrap();
    service
        .register_method("calc.scale", scale, |args| {
            let value = args[0].as_f64().unwrap_or_default();
            let factor = args[1].as_f64().unwrap_or_default();
            Ok(Value::F32((value * factor) as f32))
        })
        .unwrap();
    service
}

fn serve(ctx: &Context) -> Arc<LoopbackTransport> {
    let transport = Arc::new(LoopbackTransport::new());
    transport.bind(URI, Arc::new(calc_service(ctx)));
    transport
}

fn connections(ctx: &Context) -> Vec<Connection> {
    let transport = serve(ctx);
    ctx.protocols()
        .names()
        .iter()
        .map(|name| ctx.connect_with_protocol(URI, name, transport.clone()).unwrap())
        .collect()
}

#[test]
fn test_native_stubs() {
    let ctx = Context::new();
    for conn in connections(&ctx) {
        let q: i64 = conn
            .call_native("calc.divide", &(Operands { lhs: 84, rhs: 2 },))
            .unwrap();
        assert_eq!(q, 42, "{}", conn.protocol_name());

        let summary: Summary = conn
            .call_native(
                "calc.summarize",
                &(vec![1i64, 2, 3, i64::MIN + 6], vec!["a".to_string()]),
            )
            .unwrap();
        assert_eq!(
            summary,
            Summary {
                total: i64::MIN + 12,
                count: 4,
                names: vec!["a".into()],
            }
        );
    }
}

#[test]
fn test_exception_distinct_from_transport_failure() {
    let ctx = Context::new();
    for conn in connections(&ctx) {
        let err = conn
            .call_native::<_, i64>("calc.divide", &(Operands { lhs: 1, rhs: 0 },))
            .unwrap_err();
        assert!(err.is_remote());
        assert_eq!(err.code(), ResultCode::Exception);
        assert_eq!(
            err,
            Error::Remote {
                code: ResultCode::InvalidArgument as i32,
                message: Some("division by zero".into()),
            }
        );
    }

    let unbound = ctx
        .connect_with_protocol("loopback://elsewhere", "tbp", serve(&ctx))
        .unwrap();
    let err = unbound
        .call_native::<_, i64>("calc.divide", &(Operands { lhs: 1, rhs: 1 },))
        .unwrap_err();
    assert!(!err.is_remote());
    assert_eq!(err.code(), ResultCode::ConnectionError);
    assert!(unbound.last_error().unwrap().contains("elsewhere"));
}

#[test]
fn test_dynamic_client() {
    let mut ctx = Context::new();
    let conns = connections(&ctx);

    let world = ctx.world_mut();
    let f32_ty = world.primitive(PrimitiveKind::F32);
    let scale = world
        .function("calc.scale")
        .arg("value", f32_ty)
        .arg("factor", f32_ty)
        .returns(f32_ty)
        .build()
        .unwrap();

    for conn in &conns {
        let scaled = conn
            .call(ctx.world(), scale, &[Value::F32(1.5), Value::F32(4.0)])
            .unwrap();
        assert_eq!(scaled, Value::F32(6.0));
    }
}

#[test]
fn test_connect_from_configuration_file() {
    let ctx = Context::new();
    let transport = serve(&ctx);

    let yaml_or_json = if cfg!(feature = "config-loaders") {
        (
            "yaml",
            r"info: calc
servers:
  - services: ['*']
    protocol: { name: soap }
    transport: { name: loopback, url: 'loopback://soap' }
  - services: ['*']
    protocol: { name: tbp }
    transport: { name: loopback, url: 'loopback://calc' }
",
        )
    } else {
        (
            "json",
            r#"{"info": "calc", "servers": [
                {"services": ["*"], "protocol": {"name": "soap"},
                 "transport": {"name": "loopback", "url": "loopback://soap"}},
                {"services": ["*"], "protocol": {"name": "tbp"},
                 "transport": {"name": "loopback", "url": "loopback://calc"}}
            ]}"#,
        )
    };
    let (extension, text) = yaml_or_json;
    let mut file = tempfile::Builder::new()
        .suffix(&format!(".{}", extension))
        .tempfile()
        .unwrap();
    file.write_all(text.as_bytes()).unwrap();

    let doc = ServerConfiguration::load_file(file.path()).unwrap();
    assert_eq!(doc.info, "calc");
    let conn = ctx.connect_configured(&doc, transport).unwrap();
    assert_eq!(conn.get_connection_uri(), URI);
    assert_eq!(conn.protocol_name(), "tbp");

    let q: i64 = conn
        .call_native("calc.divide", &(Operands { lhs: 9, rhs: 3 },))
        .unwrap();
    assert_eq!(q, 3);
}

#[test]
fn test_generated_style_service_binding() {
    let mut resolver = StaticSymbolResolver::new();
    resolver
        .define("textlib", "upper", |args| {
            let s = args[0]
                .as_str()
                .ok_or_else(|| RemoteError::new(ResultCode::InvalidValue as i32, "not a string"))?;
            Ok(Value::String(s.to_uppercase()))
        })
        .define("textlib", "length", |args| {
            Ok(Value::U32(args[0].as_str().map_or(0, str::len) as u32))
        });
    resolver.load_component("textlib").unwrap();

    let ctx = Context::new();
    let mut service = ctx.new_service("text");
    let world = service.world_mut();
    let string_ty = world.primitive(PrimitiveKind::String);
    let u32_ty = world.primitive(PrimitiveKind::U32);
    let upper = world
        .function("upper")
        .arg("s", string_ty)
        .returns(string_ty)
        .build()
        .unwrap();
    let length = world
        .function("length")
        .arg("s", string_ty)
        .returns(u32_ty)
        .build()
        .unwrap();
    let text = world
        .service("text")
        .method("upper", upper)
        .method("length", length)
        .build()
        .unwrap();
    assert_eq!(service.register_service_type(text, &resolver).unwrap(), 2);

    let transport = Arc::new(LoopbackTransport::new());
    transport.bind("loopback://text", Arc::new(service));
    let conn = ctx
        .connect_with_protocol("loopback://text", "tbp", transport)
        .unwrap();
    let up: String = conn.call_native("text.upper", &("kiara".to_string(),)).unwrap();
    assert_eq!(up, "KIARA");
    let n: u32 = conn.call_native("text.length", &("kiara".to_string(),)).unwrap();
    assert_eq!(n, 5);
}
