// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

//! Typed views of the boundary records plus the little-endian field
//! accessors both sides use to read them out of raw memory.

use crate::layout::{array, context, schema, tuple};

/// Read a `u32` field at `base + field` from a byte buffer.
///
/// Returns `None` when the field does not fit in the buffer.
pub fn read_u32(buf: &[u8], base: usize, field: usize) -> Option<u32> {
	let at = base.checked_add(field)?;
	let bytes = buf.get(at..at.checked_add(4)?)?;
	Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

pub fn read_u64(buf: &[u8], base: usize, field: usize) -> Option<u64> {
	let at = base.checked_add(field)?;
	let bytes = buf.get(at..at.checked_add(8)?)?;
	Some(u64::from_le_bytes(bytes.try_into().ok()?))
}

/// Write a `u32` field at `base + field`. Returns `false` when out of bounds.
#[must_use]
pub fn write_u32(buf: &mut [u8], base: usize, field: usize, value: u32) -> bool {
	let Some(at) = base.checked_add(field) else {
		return false;
	};
	match buf.get_mut(at..at + 4) {
		Some(slot) => {
			slot.copy_from_slice(&value.to_le_bytes());
			true
		}
		None => false,
	}
}

#[must_use]
pub fn write_u64(buf: &mut [u8], base: usize, field: usize, value: u64) -> bool {
	let Some(at) = base.checked_add(field) else {
		return false;
	};
	match buf.get_mut(at..at + 8) {
		Some(slot) => {
			slot.copy_from_slice(&value.to_le_bytes());
			true
		}
		None => false,
	}
}

/// Decoded schema descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaRecord {
	pub format: u32,
	pub name: u32,
	pub metadata: u32,
	pub flags: u32,
	pub n_children: u32,
	pub children: u32,
	pub release: u32,
	pub private: u32,
}

impl SchemaRecord {
	pub const fn empty() -> Self {
		Self {
			format: 0,
			name: 0,
			metadata: 0,
			flags: 0,
			n_children: 0,
			children: 0,
			release: 0,
			private: 0,
		}
	}

	pub fn nullable(&self) -> bool {
		self.flags & schema::FLAG_NULLABLE != 0
	}

	pub fn read_at(buf: &[u8], base: usize) -> Option<Self> {
		Some(Self {
			format: read_u32(buf, base, schema::FORMAT)?,
			name: read_u32(buf, base, schema::NAME)?,
			metadata: read_u32(buf, base, schema::METADATA)?,
			flags: read_u32(buf, base, schema::FLAGS)?,
			n_children: read_u32(buf, base, schema::N_CHILDREN)?,
			children: read_u32(buf, base, schema::CHILDREN)?,
			release: read_u32(buf, base, schema::RELEASE)?,
			private: read_u32(buf, base, schema::PRIVATE)?,
		})
	}

	#[must_use]
	pub fn write_at(&self, buf: &mut [u8], base: usize) -> bool {
		write_u32(buf, base, schema::FORMAT, self.format)
			&& write_u32(buf, base, schema::NAME, self.name)
			&& write_u32(buf, base, schema::METADATA, self.metadata)
			&& write_u32(buf, base, schema::FLAGS, self.flags)
			&& write_u32(buf, base, schema::N_CHILDREN, self.n_children)
			&& write_u32(buf, base, schema::CHILDREN, self.children)
			&& write_u32(buf, base, schema::RELEASE, self.release)
			&& write_u32(buf, base, schema::PRIVATE, self.private)
	}
}

/// Decoded array descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayRecord {
	pub length: u64,
	pub null_count: u64,
	pub n_buffers: u32,
	pub n_children: u32,
	pub buffers: u32,
	pub children: u32,
	pub release: u32,
	pub private: u32,
}

impl ArrayRecord {
	pub const fn empty() -> Self {
		Self {
			length: 0,
			null_count: 0,
			n_buffers: 0,
			n_children: 0,
			buffers: 0,
			children: 0,
			release: 0,
			private: 0,
		}
	}

	pub fn read_at(buf: &[u8], base: usize) -> Option<Self> {
		Some(Self {
			length: read_u64(buf, base, array::LENGTH)?,
			null_count: read_u64(buf, base, array::NULL_COUNT)?,
			n_buffers: read_u32(buf, base, array::N_BUFFERS)?,
			n_children: read_u32(buf, base, array::N_CHILDREN)?,
			buffers: read_u32(buf, base, array::BUFFERS)?,
			children: read_u32(buf, base, array::CHILDREN)?,
			release: read_u32(buf, base, array::RELEASE)?,
			private: read_u32(buf, base, array::PRIVATE)?,
		})
	}

	#[must_use]
	pub fn write_at(&self, buf: &mut [u8], base: usize) -> bool {
		write_u64(buf, base, array::LENGTH, self.length)
			&& write_u64(buf, base, array::NULL_COUNT, self.null_count)
			&& write_u32(buf, base, array::N_BUFFERS, self.n_buffers)
			&& write_u32(buf, base, array::N_CHILDREN, self.n_children)
			&& write_u32(buf, base, array::BUFFERS, self.buffers)
			&& write_u32(buf, base, array::CHILDREN, self.children)
			&& write_u32(buf, base, array::RELEASE, self.release)
			&& write_u32(buf, base, array::PRIVATE, self.private)
	}
}

/// Decoded transform context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextRecord {
	pub base: u64,
	pub in_schema: u32,
	pub in_array: u32,
	pub out_schema: u32,
	pub out_array: u32,
}

impl ContextRecord {
	pub fn read_at(buf: &[u8], base: usize) -> Option<Self> {
		Some(Self {
			base: read_u64(buf, base, context::BASE)?,
			in_schema: read_u32(buf, base, context::IN_SCHEMA)?,
			in_array: read_u32(buf, base, context::IN_ARRAY)?,
			out_schema: read_u32(buf, base, context::OUT_SCHEMA)?,
			out_array: read_u32(buf, base, context::OUT_ARRAY)?,
		})
	}
}

/// Decoded result tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupleRecord {
	pub addr: u32,
	pub len: u32,
}

impl TupleRecord {
	pub fn read_at(buf: &[u8], base: usize) -> Option<Self> {
		Some(Self {
			addr: read_u32(buf, base, tuple::ADDR)?,
			len: read_u32(buf, base, tuple::LEN)?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::layout::{array, schema};

	#[test]
	fn schema_roundtrip() {
		let mut buf = vec![0u8; 64];
		let rec = SchemaRecord {
			format: 16,
			name: 24,
			metadata: 0,
			flags: schema::FLAG_NULLABLE,
			n_children: 4,
			children: 32,
			release: 1,
			private: 0,
		};
		assert!(rec.write_at(&mut buf, 8));
		assert_eq!(SchemaRecord::read_at(&buf, 8), Some(rec));
		assert!(SchemaRecord::read_at(&buf, 8).unwrap().nullable());
	}

	#[test]
	fn array_roundtrip() {
		let mut buf = vec![0u8; array::SIZE];
		let rec = ArrayRecord {
			length: 1024,
			null_count: 3,
			n_buffers: 2,
			n_children: 0,
			buffers: 96,
			children: 0,
			release: 1,
			private: 0,
		};
		assert!(rec.write_at(&mut buf, 0));
		assert_eq!(ArrayRecord::read_at(&buf, 0), Some(rec));
	}

	#[test]
	fn out_of_bounds_write_rejected() {
		let mut buf = vec![0u8; schema::SIZE];
		assert!(!SchemaRecord::empty().write_at(&mut buf, 8));
		assert!(SchemaRecord::read_at(&buf, 8).is_none());
	}

	#[test]
	fn fields_are_little_endian() {
		let mut buf = vec![0u8; 8];

		assert!(write_u32(&mut buf, 0, 0, 0x0102_0304));
		assert_eq!(&buf[..4], &[0x04, 0x03, 0x02, 0x01]);
		assert_eq!(read_u32(&buf, 0, 0), Some(0x0102_0304));
	}
}
