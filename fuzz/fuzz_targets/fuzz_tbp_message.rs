// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use kiara::marshal::read_value;
use kiara::message::tbp::TbpMessage;
use kiara::{Kiara, Marshaler, World};
use libfuzzer_sys::fuzz_target;

#[derive(Kiara)]
struct Nested {
    id: u32,
    name: String,
    samples: Vec<f64>,
    next: Option<Box<Nested>>,
}

fuzz_target!(|data: &[u8]| {
    // Native reads over a parsed request
    if let Ok(mut msg) = TbpMessage::parse_request(data) {
        let mut m = Marshaler::new(&mut msg);
        let _ = m.read::<Nested>();
    }

    // Dynamic reads over a parsed response
    if let Ok(mut msg) = TbpMessage::parse_response(data) {
        let mut world = World::new();
        let ty = world.type_of::<Nested>();
        let mut m = Marshaler::new(&mut msg);
        let _ = read_value(&mut m, &world, ty);
    }

    // Header-less nested bodies
    if let Ok(mut msg) = TbpMessage::from_scratch(data) {
        let mut m = Marshaler::new(&mut msg);
        let _ = m.read::<Vec<String>>();
    }
});
