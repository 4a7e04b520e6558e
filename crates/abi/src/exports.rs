// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

//! Names of the exports every guest transformation module must provide.

/// The guest's linear memory.
pub const MEMORY: &str = "memory";

/// `(size: u32) -> u32` — arena allocation, returns 0 on exhaustion.
pub const ALLOCATE_BUFFER: &str = "allocate_buffer";

/// `(offset: u32, size: u32)` — arena release.
pub const DEALLOCATE_BUFFER: &str = "deallocate_buffer";

/// `(base: u64) -> u32` — allocate a transform context, returns its offset.
pub const PREPARE_TRANSFORM: &str = "prepare_transform";

/// `(ctx: u32)` — descriptor-sharing transformation entry point.
pub const TRANSFORM: &str = "transform";

/// `(ctx: u32)` — guest-side context teardown.
pub const FINALIZE_TRANSFORM: &str = "finalize_transform";

/// `(offset: u32, len: u32) -> u32` — serialized-bytes entry point, returns
/// the offset of a result tuple.
pub const TRANSFORM_BYTES: &str = "transform_bytes";

/// `(tuple: u32) -> u32` — address half of a result tuple.
pub const TUPLE_FIRST: &str = "tuple_first";

/// `(tuple: u32) -> u32` — length half of a result tuple.
pub const TUPLE_SECOND: &str = "tuple_second";

/// `(tuple: u32)` — release a result tuple and the bytes it names.
pub const DROP_TUPLE: &str = "drop_tuple";
