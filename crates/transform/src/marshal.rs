// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

//! Descriptor marshaling across the guest boundary.
//!
//! `export_batch` writes a batch into arena memory as fixed-layout
//! schema/array descriptor trees and records every allocation in the
//! context's ledger. `import_batch` walks a descriptor tree the guest
//! produced and yields a borrowed view over guest memory without copying
//! any buffer.

use sandbatch_abi::{
	format,
	layout::{array, schema},
	record::{ArrayRecord, SchemaRecord},
};
use sandbatch_core::{Batch, BatchView, ColumnSlice, ColumnView, LogicalType};
use sandbatch_guest::{BridgeError, GuestInstance, GuestPtr, TransformContext};

/// Copy `bytes` into a fresh arena allocation owned by `ctx`.
///
/// Empty buffers stage as the null pointer without allocating.
fn stage(
	guest: &mut GuestInstance,
	ctx: &mut TransformContext,
	bytes: &[u8],
) -> Result<GuestPtr, BridgeError> {
	if bytes.is_empty() {
		return Ok(GuestPtr::NULL);
	}
	let size = u32::try_from(bytes.len())
		.map_err(|_| BridgeError::protocol("buffer exceeds the guest address space"))?;
	let ptr = guest.alloc(size)?;
	guest.write_bytes(ptr, bytes)?;
	ctx.record_allocation(ptr, size);
	Ok(ptr)
}

fn stage_cstr(
	guest: &mut GuestInstance,
	ctx: &mut TransformContext,
	value: &str,
) -> Result<GuestPtr, BridgeError> {
	let mut bytes = Vec::with_capacity(value.len() + 1);
	bytes.extend_from_slice(value.as_bytes());
	bytes.push(0);
	stage(guest, ctx, &bytes)
}

fn stage_u32s(
	guest: &mut GuestInstance,
	ctx: &mut TransformContext,
	values: &[u32],
) -> Result<GuestPtr, BridgeError> {
	let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
	stage(guest, ctx, &bytes)
}

fn schema_record_bytes(rec: &SchemaRecord) -> [u8; schema::SIZE] {
	let mut buf = [0u8; schema::SIZE];
	let ok = rec.write_at(&mut buf, 0);
	debug_assert!(ok);
	buf
}

fn array_record_bytes(rec: &ArrayRecord) -> [u8; array::SIZE] {
	let mut buf = [0u8; array::SIZE];
	let ok = rec.write_at(&mut buf, 0);
	debug_assert!(ok);
	buf
}

/// Write `batch` into guest memory as the context's input descriptor tree.
///
/// The root records land in the slots the guest reserved at prepare time;
/// strings, buffers, child records and pointer tables go into fresh arena
/// allocations, all recorded for reclamation at finish. Release flags on
/// every descriptor are armed.
pub fn export_batch(
	guest: &mut GuestInstance,
	ctx: &mut TransformContext,
	batch: &Batch,
) -> Result<(), BridgeError> {
	let rows = batch.row_count();
	let mut child_schemas = Vec::with_capacity(batch.column_count());
	let mut child_arrays = Vec::with_capacity(batch.column_count());

	for column in batch.columns() {
		let ty = column.data.logical_type();
		let format_ptr = stage_cstr(guest, ctx, ty.format_code())?;
		let name_ptr = stage_cstr(guest, ctx, &column.name)?;
		let validity_ptr = match &column.validity {
			Some(validity) => stage(guest, ctx, validity.bits())?,
			None => GuestPtr::NULL,
		};

		let mut buffers = vec![validity_ptr.0];
		if let Some(offsets) = column.data.offsets() {
			let bytes: Vec<u8> = offsets.iter().flat_map(|o| o.to_le_bytes()).collect();
			buffers.push(stage(guest, ctx, &bytes)?.0);
		}
		buffers.push(stage(guest, ctx, column.data.value_bytes())?.0);
		let buffers_ptr = stage_u32s(guest, ctx, &buffers)?;

		let flags = if column.nullable() {
			schema::FLAG_NULLABLE
		} else {
			0
		};
		let schema_rec = SchemaRecord {
			format: format_ptr.0,
			name: name_ptr.0,
			metadata: 0,
			flags,
			n_children: 0,
			children: 0,
			release: 1,
			private: 0,
		};
		let array_rec = ArrayRecord {
			length: rows as u64,
			null_count: column.null_count(),
			n_buffers: buffers.len() as u32,
			n_children: 0,
			buffers: buffers_ptr.0,
			children: 0,
			release: 1,
			private: 0,
		};
		child_schemas.push(stage(guest, ctx, &schema_record_bytes(&schema_rec))?.0);
		child_arrays.push(stage(guest, ctx, &array_record_bytes(&array_rec))?.0);
	}

	let schema_children = stage_u32s(guest, ctx, &child_schemas)?;
	let array_children = stage_u32s(guest, ctx, &child_arrays)?;
	let root_format = stage_cstr(guest, ctx, format::STRUCT)?;
	let root_name = stage_cstr(guest, ctx, "")?;

	let root_schema = SchemaRecord {
		format: root_format.0,
		name: root_name.0,
		metadata: 0,
		flags: 0,
		n_children: child_schemas.len() as u32,
		children: schema_children.0,
		release: 1,
		private: 0,
	};
	guest.write_bytes(ctx.in_schema(), &schema_record_bytes(&root_schema))?;

	let root_array = ArrayRecord {
		length: rows as u64,
		null_count: 0,
		n_buffers: 0,
		n_children: child_arrays.len() as u32,
		buffers: 0,
		children: array_children.0,
		release: 1,
		private: 0,
	};
	guest.write_bytes(ctx.in_array(), &array_record_bytes(&root_array))?;

	ctx.mark_populated()
}

fn read_schema(guest: &GuestInstance, ptr: GuestPtr) -> Result<SchemaRecord, BridgeError> {
	let buf = guest.read_bytes(ptr, schema::SIZE as u32)?;
	SchemaRecord::read_at(buf, 0)
		.ok_or_else(|| BridgeError::transform("truncated schema descriptor"))
}

fn read_array(guest: &GuestInstance, ptr: GuestPtr) -> Result<ArrayRecord, BridgeError> {
	let buf = guest.read_bytes(ptr, array::SIZE as u32)?;
	ArrayRecord::read_at(buf, 0).ok_or_else(|| BridgeError::transform("truncated array descriptor"))
}

fn read_u32s(guest: &GuestInstance, ptr: GuestPtr, count: u32) -> Result<Vec<u32>, BridgeError> {
	if count == 0 {
		return Ok(Vec::new());
	}
	let len = count.checked_mul(4).ok_or_else(|| {
		BridgeError::transform("descriptor pointer table length overflows")
	})?;
	let bytes = guest.read_bytes(ptr, len)?;
	Ok(bytes.chunks_exact(4).map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect())
}

/// Walk a descriptor tree in guest memory into a borrowed batch view.
///
/// Every offset is bounds-checked; the buffers themselves are not copied.
/// The returned view borrows the instance, which keeps `finish` (and any
/// other mutation) unreachable until the view is dropped.
pub fn import_batch(
	guest: &GuestInstance,
	schema_ptr: GuestPtr,
	array_ptr: GuestPtr,
) -> Result<BatchView<'_>, BridgeError> {
	let root_schema = read_schema(guest, schema_ptr)?;
	let root_array = read_array(guest, array_ptr)?;

	let root_format = guest.read_cstr(GuestPtr(root_schema.format))?;
	if root_format != format::STRUCT {
		return Err(BridgeError::transform(format!(
			"root descriptor has format `{root_format}`, expected `{}`",
			format::STRUCT
		)));
	}
	if root_schema.n_children != root_array.n_children {
		return Err(BridgeError::transform(format!(
			"schema carries {} children but array carries {}",
			root_schema.n_children, root_array.n_children
		)));
	}
	let rows = usize::try_from(root_array.length)
		.map_err(|_| BridgeError::transform("row count exceeds the host address space"))?;

	let schema_ptrs = read_u32s(guest, GuestPtr(root_schema.children), root_schema.n_children)?;
	let array_ptrs = read_u32s(guest, GuestPtr(root_array.children), root_array.n_children)?;

	let mut columns = Vec::with_capacity(schema_ptrs.len());
	for (&schema_at, &array_at) in schema_ptrs.iter().zip(&array_ptrs) {
		let child_schema = read_schema(guest, GuestPtr(schema_at))?;
		let child_array = read_array(guest, GuestPtr(array_at))?;

		let code = guest.read_cstr(GuestPtr(child_schema.format))?;
		let ty = LogicalType::from_format_code(code)
			.map_err(|e| BridgeError::transform(e.to_string()))?;
		let name = guest.read_cstr(GuestPtr(child_schema.name))?;
		if child_array.length != rows as u64 {
			return Err(BridgeError::transform(format!(
				"column `{name}` carries {} rows, batch carries {rows}",
				child_array.length
			)));
		}

		let buffers = read_u32s(guest, GuestPtr(child_array.buffers), child_array.n_buffers)?;
		let data = match ty {
			LogicalType::Utf8 => {
				let &[_, offsets_at, data_at] = buffers.as_slice() else {
					return Err(BridgeError::transform(format!(
						"utf8 column `{name}` carries {} buffers, expected 3",
						buffers.len()
					)));
				};
				let offsets_len = rows
					.checked_add(1)
					.and_then(|n| n.checked_mul(4))
					.and_then(|n| u32::try_from(n).ok())
					.ok_or_else(|| {
						BridgeError::transform(format!(
							"utf8 column `{name}` offsets exceed the guest address space"
						))
					})?;
				let offset_bytes = guest.read_bytes(GuestPtr(offsets_at), offsets_len)?;
				// offsets_len is at least 4, read_bytes returns exactly that many.
				let tail = &offset_bytes[offset_bytes.len() - 4..];
				let data_len = i32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
				if data_len < 0 {
					return Err(BridgeError::transform(format!(
						"utf8 column `{name}` carries a negative data length"
					)));
				}
				let data_bytes = guest.read_bytes(GuestPtr(data_at), data_len as u32)?;
				ColumnSlice::utf8(offset_bytes, data_bytes, rows)
					.map_err(|e| BridgeError::transform(e.to_string()))?
			}
			_ => {
				let &[_, data_at] = buffers.as_slice() else {
					return Err(BridgeError::transform(format!(
						"column `{name}` carries {} buffers, expected 2",
						buffers.len()
					)));
				};
				// Only utf8 lacks a fixed width, handled above.
				let width = ty.fixed_width().unwrap_or(1);
				let data_len = rows
					.checked_mul(width)
					.and_then(|n| u32::try_from(n).ok())
					.ok_or_else(|| {
						BridgeError::transform(format!(
							"column `{name}` data exceeds the guest address space"
						))
					})?;
				let data_bytes = guest.read_bytes(GuestPtr(data_at), data_len)?;
				ColumnSlice::from_fixed(ty, data_bytes)
					.map_err(|e| BridgeError::transform(e.to_string()))?
			}
		};

		let nullable = child_schema.nullable();
		let validity = if nullable && buffers.first().copied().unwrap_or(0) != 0 {
			let validity_len = u32::try_from(rows.div_ceil(8)).map_err(|_| {
				BridgeError::transform(format!(
					"column `{name}` validity bitmap exceeds the guest address space"
				))
			})?;
			Some(guest.read_bytes(GuestPtr(buffers[0]), validity_len)?)
		} else {
			None
		};

		columns.push(ColumnView {
			name,
			nullable,
			null_count: child_array.null_count,
			validity,
			data,
		});
	}

	BatchView::new(rows, columns).map_err(|e| BridgeError::transform(e.to_string()))
}
