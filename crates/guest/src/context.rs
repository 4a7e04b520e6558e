// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

use sandbatch_abi::{
	layout::{array, schema},
	record::{self, ContextRecord},
};
use tracing::debug;

use crate::{
	addr::GuestPtr,
	error::BridgeError,
	instance::GuestInstance,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextState {
	Created,
	Populated,
	Invoked,
	Finished,
}

/// Host-side handle for one transformation exchange.
///
/// Tracks the guest-allocated context record, the descriptor offsets on
/// both sides, and every arena allocation made on the context's behalf so
/// `finish` can reclaim them. The state machine
/// `Created -> Populated -> Invoked -> Finished` rejects out-of-order use.
#[derive(Debug)]
pub struct TransformContext {
	offset: GuestPtr,
	in_schema: GuestPtr,
	in_array: GuestPtr,
	out_schema: GuestPtr,
	out_array: GuestPtr,
	state: ContextState,
	ledger: Vec<(GuestPtr, u32)>,
}

impl TransformContext {
	pub fn offset(&self) -> GuestPtr {
		self.offset
	}

	/// Guest offset of the input schema descriptor to populate.
	pub fn in_schema(&self) -> GuestPtr {
		self.in_schema
	}

	/// Guest offset of the input array descriptor to populate.
	pub fn in_array(&self) -> GuestPtr {
		self.in_array
	}

	/// Guest offset of the output schema descriptor, present after a
	/// successful transform.
	pub fn out_schema(&self) -> Option<GuestPtr> {
		(self.state == ContextState::Invoked).then_some(self.out_schema)
	}

	pub fn out_array(&self) -> Option<GuestPtr> {
		(self.state == ContextState::Invoked).then_some(self.out_array)
	}

	pub fn is_finished(&self) -> bool {
		self.state == ContextState::Finished
	}

	/// Record an arena allocation to reclaim when this context finishes.
	pub fn record_allocation(&mut self, ptr: GuestPtr, size: u32) {
		self.ledger.push((ptr, size));
	}

	/// Mark the input descriptors as populated. Populating twice is a
	/// protocol violation.
	pub fn mark_populated(&mut self) -> Result<(), BridgeError> {
		if self.state != ContextState::Created {
			return Err(BridgeError::protocol("context input descriptors already populated"));
		}
		self.state = ContextState::Populated;
		Ok(())
	}
}

impl GuestInstance {
	/// Ask the guest to allocate and seed a transform context.
	pub fn prepare(&mut self) -> Result<TransformContext, BridgeError> {
		let base = self.base();
		let offset = self.call_prepare(base.0)?;
		if offset == 0 {
			return Err(BridgeError::transform("guest failed to allocate a transform context"));
		}

		let record = ContextRecord::read_at(self.bytes(), offset as usize).ok_or(
			BridgeError::OutOfBounds {
				offset: u64::from(offset),
				len: sandbatch_abi::layout::context::SIZE as u64,
				size: self.memory_size(),
			},
		)?;
		if record.in_schema == 0 || record.in_array == 0 {
			return Err(BridgeError::transform(
				"guest context is missing input descriptor slots",
			));
		}

		debug!(
			context = offset,
			in_schema = record.in_schema,
			in_array = record.in_array,
			"transform context prepared"
		);
		Ok(TransformContext {
			offset: GuestPtr(offset),
			in_schema: GuestPtr(record.in_schema),
			in_array: GuestPtr(record.in_array),
			out_schema: GuestPtr::NULL,
			out_array: GuestPtr::NULL,
			state: ContextState::Created,
			ledger: Vec::new(),
		})
	}

	/// Run the descriptor-sharing entry point for a populated context.
	///
	/// On success the context carries the guest's output descriptor
	/// offsets. On guest failure the context stays populated and must
	/// still be finished.
	pub fn run_transform(&mut self, ctx: &mut TransformContext) -> Result<(), BridgeError> {
		if ctx.state != ContextState::Populated {
			return Err(BridgeError::protocol(
				"transform invoked on a context without populated input descriptors",
			));
		}
		self.call_transform(ctx.offset.0)?;

		// Memory may have grown during the call; re-read through the
		// fresh base.
		let record = ContextRecord::read_at(self.bytes(), ctx.offset.0 as usize).ok_or(
			BridgeError::OutOfBounds {
				offset: u64::from(ctx.offset.0),
				len: sandbatch_abi::layout::context::SIZE as u64,
				size: self.memory_size(),
			},
		)?;
		if record.out_schema == 0 || record.out_array == 0 {
			return Err(BridgeError::transform("guest produced no output descriptors"));
		}
		ctx.out_schema = GuestPtr(record.out_schema);
		ctx.out_array = GuestPtr(record.out_array);
		ctx.state = ContextState::Invoked;
		Ok(())
	}

	/// Tear a context down: clear release flags, reclaim every recorded
	/// allocation and hand the context back to the guest. Callable exactly
	/// once per context.
	pub fn finish(&mut self, ctx: &mut TransformContext) -> Result<(), BridgeError> {
		if ctx.state == ContextState::Finished {
			return Err(BridgeError::protocol("transform context already finished"));
		}

		let exported = !ctx.ledger.is_empty();
		if exported {
			self.disarm(ctx.in_schema, schema::RELEASE, "input schema")?;
			self.disarm(ctx.in_array, array::RELEASE, "input array")?;
		}
		if ctx.state == ContextState::Invoked {
			if ctx.out_schema != ctx.in_schema {
				self.disarm(ctx.out_schema, schema::RELEASE, "output schema")?;
			}
			if ctx.out_array != ctx.in_array {
				self.disarm(ctx.out_array, array::RELEASE, "output array")?;
			}
		}

		for (ptr, size) in std::mem::take(&mut ctx.ledger) {
			self.dealloc(ptr, size)?;
		}

		ctx.state = ContextState::Finished;
		self.call_finalize(ctx.offset.0)?;
		debug!(context = ctx.offset.0, "transform context finished");
		Ok(())
	}

	/// Clear an armed release flag. Finding it already cleared means both
	/// sides tried to release the same descriptor.
	fn disarm(
		&mut self,
		descriptor: GuestPtr,
		field: usize,
		what: &str,
	) -> Result<(), BridgeError> {
		let base = descriptor.0 as usize;
		let armed = record::read_u32(self.bytes(), base, field).ok_or(BridgeError::OutOfBounds {
			offset: u64::from(descriptor.0),
			len: (field + 4) as u64,
			size: self.memory_size(),
		})?;
		if armed == 0 {
			return Err(BridgeError::protocol(format!(
				"{what} descriptor at {:#x} was already released",
				descriptor.0
			)));
		}
		if !record::write_u32(self.bytes_mut(), base, field, 0) {
			return Err(BridgeError::protocol(format!(
				"{what} descriptor at {:#x} is out of bounds",
				descriptor.0
			)));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing;
	use sandbatch_abi::layout::{array, schema};

	fn arm(guest: &mut GuestInstance, descriptor: GuestPtr, field: usize) {
		let at = GuestPtr(descriptor.0 + field as u32);
		guest.write_bytes(at, &1u32.to_le_bytes()).unwrap();
	}

	#[test]
	fn empty_cycle_prepare_then_finish() {
		let mut guest = GuestInstance::new(&testing::identity_module()).unwrap();
		let before = guest.allocated_size() - guest.released_size();

		let mut ctx = guest.prepare().unwrap();
		assert!(!ctx.in_schema().is_null());
		assert!(ctx.out_schema().is_none());
		guest.finish(&mut ctx).unwrap();

		assert!(ctx.is_finished());
		assert_eq!(guest.allocated_size() - guest.released_size(), before);
	}

	#[test]
	fn double_finish_rejected() {
		let mut guest = GuestInstance::new(&testing::identity_module()).unwrap();
		let mut ctx = guest.prepare().unwrap();
		guest.finish(&mut ctx).unwrap();
		assert!(matches!(
			guest.finish(&mut ctx),
			Err(BridgeError::Protocol { .. })
		));
	}

	#[test]
	fn transform_requires_populated_context() {
		let mut guest = GuestInstance::new(&testing::identity_module()).unwrap();
		let mut ctx = guest.prepare().unwrap();
		assert!(matches!(
			guest.run_transform(&mut ctx),
			Err(BridgeError::Protocol { .. })
		));
		guest.finish(&mut ctx).unwrap();
	}

	#[test]
	fn populate_twice_rejected() {
		let mut guest = GuestInstance::new(&testing::identity_module()).unwrap();
		let mut ctx = guest.prepare().unwrap();
		ctx.mark_populated().unwrap();
		assert!(ctx.mark_populated().is_err());
		guest.finish(&mut ctx).unwrap();
	}

	#[test]
	fn full_cycle_reclaims_ledger_and_clears_flags() {
		let mut guest = GuestInstance::new(&testing::identity_module()).unwrap();
		let baseline = guest.allocated_size() - guest.released_size();

		let mut ctx = guest.prepare().unwrap();
		let staged = guest.alloc(64).unwrap();
		ctx.record_allocation(staged, 64);
		arm(&mut guest, ctx.in_schema(), schema::RELEASE);
		arm(&mut guest, ctx.in_array(), array::RELEASE);
		ctx.mark_populated().unwrap();

		guest.run_transform(&mut ctx).unwrap();
		let out_schema = ctx.out_schema().unwrap();
		assert_ne!(out_schema, ctx.in_schema());

		guest.finish(&mut ctx).unwrap();
		assert_eq!(guest.allocated_size() - guest.released_size(), baseline);
		assert_eq!(
			record::read_u32(guest.read_bytes(out_schema, schema::SIZE as u32).unwrap(), 0, schema::RELEASE),
			Some(0)
		);
	}
}
