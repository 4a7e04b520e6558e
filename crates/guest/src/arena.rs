// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

use std::collections::HashMap;

use crate::{addr::GuestPtr, error::BridgeError};

/// Host-side ledger of arena traffic through the guest allocator.
///
/// The allocator itself lives in the guest; this tracks every allocation
/// the host requested so that double or unknown deallocations are caught
/// before they reach the guest, and so leak checks can compare cumulative
/// totals.
#[derive(Debug, Default)]
pub(crate) struct ArenaAccounts {
	allocated: u64,
	released: u64,
	live: HashMap<GuestPtr, u32>,
}

impl ArenaAccounts {
	pub fn record_alloc(&mut self, ptr: GuestPtr, size: u32) {
		self.allocated += u64::from(size);
		self.live.insert(ptr, size);
	}

	/// Validate a deallocation against the live set before the guest
	/// allocator sees it.
	pub fn record_dealloc(&mut self, ptr: GuestPtr, size: u32) -> Result<(), BridgeError> {
		match self.live.remove(&ptr) {
			Some(recorded) if recorded == size => {
				self.released += u64::from(size);
				Ok(())
			}
			Some(recorded) => {
				self.live.insert(ptr, recorded);
				Err(BridgeError::protocol(format!(
					"deallocation size {size} does not match allocation size {recorded} at offset {:#x}",
					ptr.0
				)))
			}
			None => Err(BridgeError::protocol(format!(
				"deallocation of unknown or already released offset {:#x}",
				ptr.0
			))),
		}
	}

	pub fn allocated(&self) -> u64 {
		self.allocated
	}

	pub fn released(&self) -> u64 {
		self.released
	}

	pub fn live_count(&self) -> usize {
		self.live.len()
	}
}
