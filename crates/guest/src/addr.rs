// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

//! 32-bit guest offsets versus 64-bit host addresses.
//!
//! Guest pointers are offsets into linear memory; the host sees absolute
//! addresses. Translation is anchored at the memory base, which moves
//! whenever linear memory grows, so a base is only valid until the next
//! allocation or entry-point invocation.
//!
//! The host itself never dereferences an absolute address: every read and
//! write indexes the borrowed linear-memory slice by `GuestPtr` offset,
//! and descriptor records carry guest offsets end to end. The two widths
//! meet only at `prepare_transform`, which receives the current base so a
//! guest working in absolute addresses can derive them exactly as `widen`
//! does and hand them back through `narrow`'s inverse mapping.

use crate::error::BridgeError;

/// An offset into guest linear memory. Zero is the null pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuestPtr(pub u32);

/// An absolute address in the host process. Zero is the null address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostAddr(pub u64);

impl GuestPtr {
	pub const NULL: GuestPtr = GuestPtr(0);

	pub fn is_null(self) -> bool {
		self.0 == 0
	}

	/// Translate to an absolute host address against `base`.
	///
	/// Null translates to null regardless of the base.
	pub fn widen(self, base: HostAddr) -> HostAddr {
		if self.is_null() {
			return HostAddr(0);
		}
		HostAddr(base.0.saturating_add(u64::from(self.0)))
	}
}

impl HostAddr {
	pub fn is_null(self) -> bool {
		self.0 == 0
	}

	/// Translate back to a guest offset against `base`.
	///
	/// Fails when the address lies below the base or the offset does not
	/// fit in 32 bits.
	pub fn narrow(self, base: HostAddr) -> Result<GuestPtr, BridgeError> {
		if self.is_null() {
			return Ok(GuestPtr::NULL);
		}
		let offset = self.0.checked_sub(base.0).ok_or_else(|| {
			BridgeError::protocol(format!(
				"host address {:#x} lies below guest base {:#x}",
				self.0, base.0
			))
		})?;
		u32::try_from(offset).map(GuestPtr).map_err(|_| {
			BridgeError::protocol(format!("offset {:#x} exceeds guest address space", offset))
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn widen_adds_base() {
		let base = HostAddr(0x1000);
		assert_eq!(GuestPtr(0x40).widen(base), HostAddr(0x1040));
	}

	#[test]
	fn rebased_offset_resolves_against_new_base() {
		let ptr = GuestPtr(0x40);
		assert_eq!(ptr.widen(HostAddr(0x1000)), HostAddr(0x1040));
		assert_eq!(ptr.widen(HostAddr(0x2000)), HostAddr(0x2040));
	}

	#[test]
	fn narrow_round_trips() {
		let base = HostAddr(0xdead_0000);
		let ptr = GuestPtr(0x1234);
		assert_eq!(ptr.widen(base).narrow(base).unwrap(), ptr);
	}

	#[test]
	fn null_maps_to_null() {
		let base = HostAddr(0x1000);
		assert_eq!(GuestPtr::NULL.widen(base), HostAddr(0));
		assert_eq!(HostAddr(0).narrow(base).unwrap(), GuestPtr::NULL);
	}

	#[test]
	fn narrow_rejects_foreign_addresses() {
		let base = HostAddr(0x1000);
		assert!(HostAddr(0x800).narrow(base).is_err());
		assert!(HostAddr(base.0 + u64::from(u32::MAX) + 1).narrow(base).is_err());
	}
}
