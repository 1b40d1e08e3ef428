// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use kiara::marshal::{read_value, MarshalArgs};
use kiara::message::jsonrpc::JsonRpcMessage;
use kiara::{Kiara, Marshaler, World};
use libfuzzer_sys::fuzz_target;

#[derive(Kiara)]
struct Nested {
    id: i64,
    label: String,
    data: Vec<u8>,
    child: Option<Box<Nested>>,
}

fuzz_target!(|data: &[u8]| {
    if let Ok(mut msg) = JsonRpcMessage::parse_request(data) {
        let mut m = Marshaler::new(&mut msg);
        let _ = <(Nested, String)>::read_args(&mut m);
    }

    if let Ok(mut msg) = JsonRpcMessage::parse_response(data) {
        let mut world = World::new();
        let ty = world.type_of::<Nested>();
        let mut m = Marshaler::new(&mut msg);
        let _ = read_value(&mut m, &world, ty);
    }
});
