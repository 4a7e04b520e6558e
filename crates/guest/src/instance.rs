// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

use sandbatch_abi::exports;
use std::collections::HashSet;
use tracing::{debug, trace, warn};
use wasmtime::{Engine, Instance, Memory, Module, Store, TypedFunc};

use crate::{
	addr::{GuestPtr, HostAddr},
	arena::ArenaAccounts,
	error::BridgeError,
};

/// A loaded guest module with its linear memory and typed entry points.
///
/// Owns the store, so it is single-threaded by construction; callers that
/// need concurrency run one instance per thread.
pub struct GuestInstance {
	store: Store<()>,
	memory: Memory,
	allocate: TypedFunc<u32, u32>,
	deallocate: TypedFunc<(u32, u32), ()>,
	prepare_transform: TypedFunc<u64, u32>,
	transform: TypedFunc<u32, ()>,
	finalize_transform: TypedFunc<u32, ()>,
	transform_bytes: TypedFunc<(u32, u32), u32>,
	tuple_first: TypedFunc<u32, u32>,
	tuple_second: TypedFunc<u32, u32>,
	drop_tuple: TypedFunc<u32, ()>,
	arena: ArenaAccounts,
	live_tuples: HashSet<u32>,
}

/// A result handle returned by the serialized entry point.
#[derive(Debug, Clone, Copy)]
pub struct TupleHandle {
	pub(crate) offset: u32,
	pub addr: GuestPtr,
	pub len: u32,
}

impl GuestInstance {
	/// Compile and instantiate a guest module, verifying every required
	/// export up front.
	pub fn new(module_bytes: &[u8]) -> Result<Self, BridgeError> {
		let engine = Engine::default();
		let module = Module::from_binary(&engine, module_bytes)
			.map_err(|e| BridgeError::load(e.to_string()))?;
		let mut store = Store::new(&engine, ());
		let instance = Instance::new(&mut store, &module, &[])
			.map_err(|e| BridgeError::load(e.to_string()))?;

		let memory =
			instance.get_memory(&mut store, exports::MEMORY).ok_or(BridgeError::MissingExport {
				name: exports::MEMORY,
			})?;

		fn typed<P, R>(
			instance: &Instance,
			store: &mut Store<()>,
			name: &'static str,
		) -> Result<TypedFunc<P, R>, BridgeError>
		where
			P: wasmtime::WasmParams,
			R: wasmtime::WasmResults,
		{
			instance.get_typed_func::<P, R>(store, name).map_err(|_| {
				BridgeError::MissingExport {
					name,
				}
			})
		}

		let loaded = Self {
			allocate: typed(&instance, &mut store, exports::ALLOCATE_BUFFER)?,
			deallocate: typed(&instance, &mut store, exports::DEALLOCATE_BUFFER)?,
			prepare_transform: typed(&instance, &mut store, exports::PREPARE_TRANSFORM)?,
			transform: typed(&instance, &mut store, exports::TRANSFORM)?,
			finalize_transform: typed(&instance, &mut store, exports::FINALIZE_TRANSFORM)?,
			transform_bytes: typed(&instance, &mut store, exports::TRANSFORM_BYTES)?,
			tuple_first: typed(&instance, &mut store, exports::TUPLE_FIRST)?,
			tuple_second: typed(&instance, &mut store, exports::TUPLE_SECOND)?,
			drop_tuple: typed(&instance, &mut store, exports::DROP_TUPLE)?,
			memory,
			store,
			arena: ArenaAccounts::default(),
			live_tuples: HashSet::new(),
		};

		debug!(bytes = module_bytes.len(), "guest module instantiated");
		Ok(loaded)
	}

	/// Absolute host address of guest offset 0.
	///
	/// Invalidated by anything that can grow linear memory; re-fetch after
	/// every allocation or entry-point invocation.
	pub fn base(&self) -> HostAddr {
		HostAddr(self.memory.data_ptr(&self.store) as u64)
	}

	pub fn memory_size(&self) -> u64 {
		self.memory.data_size(&self.store) as u64
	}

	pub(crate) fn bytes(&self) -> &[u8] {
		self.memory.data(&self.store)
	}

	pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
		self.memory.data_mut(&mut self.store)
	}

	/// Borrow `len` bytes of guest memory starting at `ptr`.
	pub fn read_bytes(&self, ptr: GuestPtr, len: u32) -> Result<&[u8], BridgeError> {
		let start = ptr.0 as usize;
		let end = start + len as usize;
		self.bytes().get(start..end).ok_or(BridgeError::OutOfBounds {
			offset: u64::from(ptr.0),
			len: u64::from(len),
			size: self.memory_size(),
		})
	}

	/// Borrow a NUL-terminated utf8 string starting at `ptr`.
	pub fn read_cstr(&self, ptr: GuestPtr) -> Result<&str, BridgeError> {
		let start = ptr.0 as usize;
		let tail = self.bytes().get(start..).ok_or(BridgeError::OutOfBounds {
			offset: u64::from(ptr.0),
			len: 1,
			size: self.memory_size(),
		})?;
		let end = tail.iter().position(|b| *b == 0).ok_or_else(|| {
			BridgeError::transform(format!("unterminated string at guest offset {:#x}", ptr.0))
		})?;
		std::str::from_utf8(&tail[..end]).map_err(|_| {
			BridgeError::transform(format!("non-utf8 string at guest offset {:#x}", ptr.0))
		})
	}

	pub fn write_bytes(&mut self, ptr: GuestPtr, data: &[u8]) -> Result<(), BridgeError> {
		let size = self.memory_size();
		let start = ptr.0 as usize;
		let end = start + data.len();
		let slot = self.bytes_mut().get_mut(start..end).ok_or(BridgeError::OutOfBounds {
			offset: u64::from(ptr.0),
			len: data.len() as u64,
			size,
		})?;
		slot.copy_from_slice(data);
		Ok(())
	}

	/// Allocate `size` bytes in the guest arena.
	pub fn alloc(&mut self, size: u32) -> Result<GuestPtr, BridgeError> {
		let offset = self
			.allocate
			.call(&mut self.store, size)
			.map_err(|e| BridgeError::transform(e.to_string()))?;
		if offset == 0 {
			return Err(BridgeError::OutOfMemory {
				requested: size,
			});
		}
		trace!(offset, size, "arena allocation");
		let ptr = GuestPtr(offset);
		self.arena.record_alloc(ptr, size);
		Ok(ptr)
	}

	/// Release a prior allocation. The offset and size must match an
	/// allocation made through [`Self::alloc`] that is still live.
	pub fn dealloc(&mut self, ptr: GuestPtr, size: u32) -> Result<(), BridgeError> {
		self.arena.record_dealloc(ptr, size)?;
		self.deallocate
			.call(&mut self.store, (ptr.0, size))
			.map_err(|e| BridgeError::transform(e.to_string()))?;
		trace!(offset = ptr.0, size, "arena release");
		Ok(())
	}

	/// Cumulative bytes the host has allocated in the guest arena.
	pub fn allocated_size(&self) -> u64 {
		self.arena.allocated()
	}

	/// Cumulative bytes the host has released back to the guest arena.
	pub fn released_size(&self) -> u64 {
		self.arena.released()
	}

	pub(crate) fn call_prepare(&mut self, base: u64) -> Result<u32, BridgeError> {
		self.prepare_transform
			.call(&mut self.store, base)
			.map_err(|e| BridgeError::transform(e.to_string()))
	}

	pub(crate) fn call_transform(&mut self, ctx: u32) -> Result<(), BridgeError> {
		self.transform
			.call(&mut self.store, ctx)
			.map_err(|e| BridgeError::transform(e.to_string()))
	}

	pub(crate) fn call_finalize(&mut self, ctx: u32) -> Result<(), BridgeError> {
		self.finalize_transform
			.call(&mut self.store, ctx)
			.map_err(|e| BridgeError::transform(e.to_string()))
	}

	/// Invoke the serialized entry point over `len` bytes at `ptr`.
	pub fn call_transform_bytes(
		&mut self,
		ptr: GuestPtr,
		len: u32,
	) -> Result<TupleHandle, BridgeError> {
		let tuple = self
			.transform_bytes
			.call(&mut self.store, (ptr.0, len))
			.map_err(|e| BridgeError::transform(e.to_string()))?;
		if tuple == 0 {
			return Err(BridgeError::transform("guest returned a null result tuple"));
		}
		let addr = self
			.tuple_first
			.call(&mut self.store, tuple)
			.map_err(|e| BridgeError::transform(e.to_string()))?;
		let len = self
			.tuple_second
			.call(&mut self.store, tuple)
			.map_err(|e| BridgeError::transform(e.to_string()))?;
		self.live_tuples.insert(tuple);
		Ok(TupleHandle {
			offset: tuple,
			addr: GuestPtr(addr),
			len,
		})
	}

	/// Release a result handle. Releasing the same handle twice is a
	/// protocol violation.
	pub fn release_tuple(&mut self, handle: TupleHandle) -> Result<(), BridgeError> {
		if !self.live_tuples.remove(&handle.offset) {
			return Err(BridgeError::protocol(format!(
				"result tuple at offset {:#x} was already released",
				handle.offset
			)));
		}
		self.drop_tuple
			.call(&mut self.store, handle.offset)
			.map_err(|e| BridgeError::transform(e.to_string()))
	}
}

impl Drop for GuestInstance {
	fn drop(&mut self) {
		let residual = self.arena.allocated() - self.arena.released();
		if residual != 0 {
			warn!(
				residual,
				live = self.arena.live_count(),
				"guest instance dropped with unreleased arena allocations"
			);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing;

	#[test]
	fn rejects_malformed_module_bytes() {
		assert!(matches!(
			GuestInstance::new(b"not wasm"),
			Err(BridgeError::Load { .. })
		));
	}

	#[test]
	fn rejects_module_without_exports() {
		let bytes = wat::parse_str("(module (memory (export \"memory\") 1))").unwrap();
		assert!(matches!(
			GuestInstance::new(&bytes),
			Err(BridgeError::MissingExport { .. })
		));
	}

	#[test]
	fn alloc_dealloc_accounting() {
		let mut guest = GuestInstance::new(&testing::identity_module()).unwrap();
		let a = guest.alloc(100).unwrap();
		let b = guest.alloc(28).unwrap();
		assert_ne!(a, b);
		assert_eq!(guest.allocated_size(), 128);

		guest.dealloc(a, 100).unwrap();
		guest.dealloc(b, 28).unwrap();
		assert_eq!(guest.allocated_size(), guest.released_size());
	}

	#[test]
	fn dealloc_unknown_offset_is_protocol_error() {
		let mut guest = GuestInstance::new(&testing::identity_module()).unwrap();
		assert!(matches!(
			guest.dealloc(GuestPtr(12345), 8),
			Err(BridgeError::Protocol { .. })
		));
	}

	#[test]
	fn arena_exhaustion_is_out_of_memory() {
		let mut guest = GuestInstance::new(&testing::identity_module()).unwrap();
		let mut last = Err(BridgeError::protocol("unreached"));
		for _ in 0..256 {
			last = guest.alloc(16 * 1024 * 1024);
			if last.is_err() {
				break;
			}
		}
		assert!(matches!(last, Err(BridgeError::OutOfMemory { .. })));
	}

	#[test]
	fn read_write_round_trip() {
		let mut guest = GuestInstance::new(&testing::identity_module()).unwrap();
		let ptr = guest.alloc(16).unwrap();
		guest.write_bytes(ptr, b"sandbatch").unwrap();
		assert_eq!(guest.read_bytes(ptr, 9).unwrap(), b"sandbatch");
	}

	#[test]
	fn out_of_bounds_read_rejected() {
		let guest = GuestInstance::new(&testing::identity_module()).unwrap();
		let size = guest.memory_size() as u32;
		assert!(matches!(
			guest.read_bytes(GuestPtr(size - 4), 8),
			Err(BridgeError::OutOfBounds { .. })
		));
	}

	#[test]
	fn transform_bytes_echoes_payload() {
		let mut guest = GuestInstance::new(&testing::identity_module()).unwrap();
		let payload = b"columnar payload";
		let input = guest.alloc(payload.len() as u32).unwrap();
		guest.write_bytes(input, payload).unwrap();

		let tuple = guest.call_transform_bytes(input, payload.len() as u32).unwrap();
		assert_eq!(tuple.len as usize, payload.len());
		assert_eq!(guest.read_bytes(tuple.addr, tuple.len).unwrap(), payload);

		guest.release_tuple(tuple).unwrap();
		assert!(matches!(
			guest.release_tuple(tuple),
			Err(BridgeError::Protocol { .. })
		));
	}
}
