// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Container data types backing the wire layer.

pub mod base64;
mod dbuffer;
mod dstring;

pub use dbuffer::DynBuffer;
pub use dstring::DynString;
