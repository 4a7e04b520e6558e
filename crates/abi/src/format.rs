// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

//! Format codes stored in schema descriptors.
//!
//! The codes follow the Arrow C data interface so that guest modules built
//! against Arrow implementations can interpret them directly. Format strings
//! are written into guest memory NUL-terminated.

/// Root of a batch: a struct whose children are the columns.
pub const STRUCT: &str = "+s";

pub const INT8: &str = "c";
pub const UINT8: &str = "C";
pub const INT16: &str = "s";
pub const UINT16: &str = "S";
pub const INT32: &str = "i";
pub const UINT32: &str = "I";
pub const INT64: &str = "l";
pub const UINT64: &str = "L";
pub const FLOAT32: &str = "f";
pub const FLOAT64: &str = "g";

/// Variable-length UTF-8; three buffers (validity, i32 offsets, data).
pub const UTF8: &str = "u";
