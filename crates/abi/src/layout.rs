// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

//! Byte layouts of the records placed in guest memory.
//!
//! The records are not mapped onto Rust structs in place; both sides read
//! and write individual fields at these offsets, which keeps the layout
//! independent of host struct padding rules.

/// Alignment of every arena allocation. Guarantees that fixed-width column
/// buffers can be reinterpreted as typed slices.
pub const ARENA_ALIGN: u32 = 8;

/// Schema descriptor: type structure of one batch or one column.
pub mod schema {
	/// Guest pointer to a NUL-terminated format code.
	pub const FORMAT: usize = 0;
	/// Guest pointer to a NUL-terminated field name (0 for the root).
	pub const NAME: usize = 4;
	/// Reserved, must be 0.
	pub const METADATA: usize = 8;
	/// Bit 0: field is nullable.
	pub const FLAGS: usize = 12;
	pub const N_CHILDREN: usize = 16;
	/// Guest pointer to `u32[n_children]` child descriptor pointers.
	pub const CHILDREN: usize = 20;
	/// Non-zero while the descriptor's resources are live.
	pub const RELEASE: usize = 24;
	/// Reserved for the owning side, opaque to the other.
	pub const PRIVATE: usize = 28;

	pub const SIZE: usize = 32;

	pub const FLAG_NULLABLE: u32 = 1;
}

/// Array descriptor: buffers and counts of one batch or one column.
pub mod array {
	pub const LENGTH: usize = 0;
	pub const NULL_COUNT: usize = 8;
	pub const N_BUFFERS: usize = 16;
	pub const N_CHILDREN: usize = 20;
	/// Guest pointer to `u32[n_buffers]` buffer pointers.
	pub const BUFFERS: usize = 24;
	/// Guest pointer to `u32[n_children]` child descriptor pointers.
	pub const CHILDREN: usize = 28;
	pub const RELEASE: usize = 32;
	pub const PRIVATE: usize = 36;

	pub const SIZE: usize = 40;
}

/// Per-call transform context, allocated by `prepare_transform`.
pub mod context {
	/// Absolute host address of guest offset 0 at prepare time.
	pub const BASE: usize = 0;
	/// Offset of the input schema descriptor the host must populate.
	pub const IN_SCHEMA: usize = 8;
	pub const IN_ARRAY: usize = 12;
	/// Offset of the output schema descriptor, written by `transform`.
	pub const OUT_SCHEMA: usize = 16;
	pub const OUT_ARRAY: usize = 20;

	pub const SIZE: usize = 24;
}

/// Result handle of the serialized-bytes path.
pub mod tuple {
	pub const ADDR: usize = 0;
	pub const LEN: usize = 4;

	pub const SIZE: usize = 8;
}
