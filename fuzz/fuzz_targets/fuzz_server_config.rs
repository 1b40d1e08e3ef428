// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use kiara::config::ServerConfiguration;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Fuzz JSON documents, then server selection on whatever parsed
    if let Ok(doc) = ServerConfiguration::from_json(text) {
        let _ = doc.select_server(|name| name == "tbp");
    }

    // Fuzz YAML documents
    let _ = ServerConfiguration::from_yaml(text);
});
