// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

use serde::{Deserialize, Serialize};

/// Bit-packed validity of a column, LSB-first within each byte.
///
/// Bit set means the value at that row is defined. A column without a
/// `Validity` has no nulls at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validity {
	bits: Vec<u8>,
	len: usize,
}

impl Validity {
	/// All rows valid.
	pub fn all_valid(len: usize) -> Self {
		Self {
			bits: vec![0xff; len.div_ceil(8)],
			len,
		}
	}

	/// Build from per-row validity flags.
	pub fn from_flags(flags: impl IntoIterator<Item = bool>) -> Self {
		let mut bits = Vec::new();
		let mut len = 0;
		for valid in flags {
			if len % 8 == 0 {
				bits.push(0);
			}
			if valid {
				*bits.last_mut().unwrap() |= 1 << (len % 8);
			}
			len += 1;
		}
		Self {
			bits,
			len,
		}
	}

	/// Reconstruct from a raw bitmap, e.g. one read out of guest memory.
	pub fn from_bits(bits: &[u8], len: usize) -> Self {
		debug_assert!(bits.len() >= len.div_ceil(8));
		Self {
			bits: bits[..len.div_ceil(8)].to_vec(),
			len,
		}
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn is_valid(&self, row: usize) -> bool {
		debug_assert!(row < self.len);
		self.bits[row / 8] & (1 << (row % 8)) != 0
	}

	pub fn set(&mut self, row: usize, valid: bool) {
		debug_assert!(row < self.len);
		if valid {
			self.bits[row / 8] |= 1 << (row % 8);
		} else {
			self.bits[row / 8] &= !(1 << (row % 8));
		}
	}

	/// Number of rows whose bit is clear.
	pub fn null_count(&self) -> u64 {
		let mut defined: u64 = 0;
		for (i, byte) in self.bits.iter().enumerate() {
			// Mask the trailing partial byte.
			let byte = if (i + 1) * 8 > self.len {
				let keep = self.len - i * 8;
				byte & ((1u16 << keep) - 1) as u8
			} else {
				*byte
			};
			defined += byte.count_ones() as u64;
		}
		self.len as u64 - defined
	}

	/// The packed bitmap, `len.div_ceil(8)` bytes.
	pub fn bits(&self) -> &[u8] {
		&self.bits
	}
}
