// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Base64 (standard alphabet, padded) with optional line wrapping.

use crate::error::{Error, Result};
use ::base64::engine::general_purpose::STANDARD;
use ::base64::Engine;

/// Encode `data`; a nonzero `line_size` inserts `\n` between output lines.
pub fn encode(data: &[u8], line_size: usize) -> String {
    let encoded = STANDARD.encode(data);
    if line_size == 0 || encoded.len() <= line_size {
        return encoded;
    }

    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / line_size);
    for (i, chunk) in encoded.as_bytes().chunks(line_size).enumerate() {
        if i > 0 {
            wrapped.push('\n');
        }
        // Base64 output is ASCII, chunks never split a character
        wrapped.push_str(std::str::from_utf8(chunk).unwrap_or_default());
    }
    wrapped
}

/// Decode, ignoring ASCII whitespace (line breaks from [`encode`]).
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let compact: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact)
        .map_err(|e| Error::Input(format!("invalid base64: {}", e)))
}
