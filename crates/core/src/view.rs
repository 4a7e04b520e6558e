// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

use crate::{
	batch::Batch,
	column::{Column, ColumnData},
	error::BatchError,
	types::LogicalType,
	validity::Validity,
};

/// Borrowed, typed column values.
///
/// The backing bytes may live in an owned [`Batch`] or directly in guest
/// linear memory; the lifetime ties consumers to whichever it is.
#[derive(Debug, Clone, Copy)]
pub enum ColumnSlice<'a> {
	Int8(&'a [i8]),
	Int16(&'a [i16]),
	Int32(&'a [i32]),
	Int64(&'a [i64]),
	Uint8(&'a [u8]),
	Uint16(&'a [u16]),
	Uint32(&'a [u32]),
	Uint64(&'a [u64]),
	Float32(&'a [f32]),
	Float64(&'a [f64]),
	Utf8 {
		offsets: &'a [i32],
		data: &'a [u8],
	},
}

// The caller guarantees `bytes` came from a buffer of `T` values; alignment
// and length are still checked because guest modules control the offsets.
fn cast_slice<T: Copy>(bytes: &[u8]) -> Result<&[T], BatchError> {
	let width = std::mem::size_of::<T>();
	if bytes.len() % width != 0 {
		return Err(BatchError::BufferWidthMismatch {
			len: bytes.len(),
			width,
		});
	}
	if bytes.as_ptr() as usize % std::mem::align_of::<T>() != 0 {
		return Err(BatchError::BufferMisaligned {
			width,
		});
	}
	Ok(unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const T, bytes.len() / width) })
}

impl<'a> ColumnSlice<'a> {
	/// Reinterpret a raw buffer as fixed-width values of `ty`.
	pub fn from_fixed(ty: LogicalType, bytes: &'a [u8]) -> Result<Self, BatchError> {
		Ok(match ty {
			LogicalType::Int8 => ColumnSlice::Int8(cast_slice(bytes)?),
			LogicalType::Int16 => ColumnSlice::Int16(cast_slice(bytes)?),
			LogicalType::Int32 => ColumnSlice::Int32(cast_slice(bytes)?),
			LogicalType::Int64 => ColumnSlice::Int64(cast_slice(bytes)?),
			LogicalType::Uint8 => ColumnSlice::Uint8(bytes),
			LogicalType::Uint16 => ColumnSlice::Uint16(cast_slice(bytes)?),
			LogicalType::Uint32 => ColumnSlice::Uint32(cast_slice(bytes)?),
			LogicalType::Uint64 => ColumnSlice::Uint64(cast_slice(bytes)?),
			LogicalType::Float32 => ColumnSlice::Float32(cast_slice(bytes)?),
			LogicalType::Float64 => ColumnSlice::Float64(cast_slice(bytes)?),
			LogicalType::Utf8 => {
				return Err(BatchError::BufferWidthMismatch {
					len: bytes.len(),
					width: 0,
				});
			}
		})
	}

	/// Build a utf8 slice from its offsets and data buffers, validating
	/// that the offsets are monotonic and stay inside the data buffer.
	pub fn utf8(offset_bytes: &'a [u8], data: &'a [u8], rows: usize) -> Result<Self, BatchError> {
		let offsets: &[i32] = cast_slice(offset_bytes)?;
		if offsets.len() != rows + 1 {
			return Err(BatchError::InvalidUtf8Offsets);
		}
		let mut previous = 0i32;
		for &offset in offsets {
			if offset < previous || offset as usize > data.len() {
				return Err(BatchError::InvalidUtf8Offsets);
			}
			previous = offset;
		}
		Ok(ColumnSlice::Utf8 {
			offsets,
			data,
		})
	}

	pub fn len(&self) -> usize {
		match self {
			ColumnSlice::Int8(v) => v.len(),
			ColumnSlice::Int16(v) => v.len(),
			ColumnSlice::Int32(v) => v.len(),
			ColumnSlice::Int64(v) => v.len(),
			ColumnSlice::Uint8(v) => v.len(),
			ColumnSlice::Uint16(v) => v.len(),
			ColumnSlice::Uint32(v) => v.len(),
			ColumnSlice::Uint64(v) => v.len(),
			ColumnSlice::Float32(v) => v.len(),
			ColumnSlice::Float64(v) => v.len(),
			ColumnSlice::Utf8 {
				offsets, ..
			} => offsets.len().saturating_sub(1),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn logical_type(&self) -> LogicalType {
		match self {
			ColumnSlice::Int8(_) => LogicalType::Int8,
			ColumnSlice::Int16(_) => LogicalType::Int16,
			ColumnSlice::Int32(_) => LogicalType::Int32,
			ColumnSlice::Int64(_) => LogicalType::Int64,
			ColumnSlice::Uint8(_) => LogicalType::Uint8,
			ColumnSlice::Uint16(_) => LogicalType::Uint16,
			ColumnSlice::Uint32(_) => LogicalType::Uint32,
			ColumnSlice::Uint64(_) => LogicalType::Uint64,
			ColumnSlice::Float32(_) => LogicalType::Float32,
			ColumnSlice::Float64(_) => LogicalType::Float64,
			ColumnSlice::Utf8 {
				..
			} => LogicalType::Utf8,
		}
	}

	pub fn as_i64(&self) -> Option<&'a [i64]> {
		match self {
			ColumnSlice::Int64(v) => Some(v),
			_ => None,
		}
	}

	pub fn as_i32(&self) -> Option<&'a [i32]> {
		match self {
			ColumnSlice::Int32(v) => Some(v),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<&'a [f64]> {
		match self {
			ColumnSlice::Float64(v) => Some(v),
			_ => None,
		}
	}

	pub fn str_at(&self, row: usize) -> Option<&'a str> {
		match self {
			ColumnSlice::Utf8 {
				offsets,
				data,
			} => {
				let start = *offsets.get(row)? as usize;
				let end = *offsets.get(row + 1)? as usize;
				std::str::from_utf8(data.get(start..end)?).ok()
			}
			_ => None,
		}
	}

	fn to_data(self) -> Result<ColumnData, BatchError> {
		Ok(match self {
			ColumnSlice::Int8(v) => ColumnData::Int8(v.to_vec()),
			ColumnSlice::Int16(v) => ColumnData::Int16(v.to_vec()),
			ColumnSlice::Int32(v) => ColumnData::Int32(v.to_vec()),
			ColumnSlice::Int64(v) => ColumnData::Int64(v.to_vec()),
			ColumnSlice::Uint8(v) => ColumnData::Uint8(v.to_vec()),
			ColumnSlice::Uint16(v) => ColumnData::Uint16(v.to_vec()),
			ColumnSlice::Uint32(v) => ColumnData::Uint32(v.to_vec()),
			ColumnSlice::Uint64(v) => ColumnData::Uint64(v.to_vec()),
			ColumnSlice::Float32(v) => ColumnData::Float32(v.to_vec()),
			ColumnSlice::Float64(v) => ColumnData::Float64(v.to_vec()),
			ColumnSlice::Utf8 {
				offsets,
				data,
			} => {
				// Offsets were validated at construction; reject
				// non-utf8 payloads here.
				std::str::from_utf8(data).map_err(|_| BatchError::InvalidUtf8)?;
				ColumnData::Utf8 {
					offsets: offsets.to_vec(),
					data: data.to_vec(),
				}
			}
		})
	}
}

/// One borrowed column.
#[derive(Debug, Clone, Copy)]
pub struct ColumnView<'a> {
	pub name: &'a str,
	pub nullable: bool,
	pub null_count: u64,
	/// Packed validity bitmap, present only for nullable columns.
	pub validity: Option<&'a [u8]>,
	pub data: ColumnSlice<'a>,
}

impl<'a> ColumnView<'a> {
	pub(crate) fn from_column(column: &'a Column) -> Self {
		let data = match &column.data {
			ColumnData::Int8(v) => ColumnSlice::Int8(v),
			ColumnData::Int16(v) => ColumnSlice::Int16(v),
			ColumnData::Int32(v) => ColumnSlice::Int32(v),
			ColumnData::Int64(v) => ColumnSlice::Int64(v),
			ColumnData::Uint8(v) => ColumnSlice::Uint8(v),
			ColumnData::Uint16(v) => ColumnSlice::Uint16(v),
			ColumnData::Uint32(v) => ColumnSlice::Uint32(v),
			ColumnData::Uint64(v) => ColumnSlice::Uint64(v),
			ColumnData::Float32(v) => ColumnSlice::Float32(v),
			ColumnData::Float64(v) => ColumnSlice::Float64(v),
			ColumnData::Utf8 {
				offsets,
				data,
			} => ColumnSlice::Utf8 {
				offsets,
				data,
			},
		};
		Self {
			name: &column.name,
			nullable: column.validity.is_some(),
			null_count: column.null_count(),
			validity: column.validity.as_ref().map(Validity::bits),
			data,
		}
	}

	pub fn is_valid(&self, row: usize) -> bool {
		match self.validity {
			Some(bits) => bits[row / 8] & (1 << (row % 8)) != 0,
			None => true,
		}
	}

	pub fn to_column(&self) -> Result<Column, BatchError> {
		let rows = self.data.len();
		Ok(Column {
			name: self.name.to_string(),
			data: self.data.to_data()?,
			validity: self.validity.map(|bits| Validity::from_bits(bits, rows)),
		})
	}
}

/// A borrowed batch: what `import` yields and what pipelines hand out.
#[derive(Debug, Clone)]
pub struct BatchView<'a> {
	row_count: usize,
	columns: Vec<ColumnView<'a>>,
}

impl<'a> BatchView<'a> {
	pub(crate) fn from_columns(row_count: usize, columns: Vec<ColumnView<'a>>) -> Self {
		Self {
			row_count,
			columns,
		}
	}

	/// Assemble a view from independently imported columns.
	pub fn new(row_count: usize, columns: Vec<ColumnView<'a>>) -> Result<Self, BatchError> {
		for column in &columns {
			if column.data.len() != row_count {
				return Err(BatchError::ColumnLengthMismatch {
					column: column.name.to_string(),
					expected: row_count,
					actual: column.data.len(),
				});
			}
		}
		Ok(Self {
			row_count,
			columns,
		})
	}

	pub fn row_count(&self) -> usize {
		self.row_count
	}

	pub fn column_count(&self) -> usize {
		self.columns.len()
	}

	pub fn columns(&self) -> &[ColumnView<'a>] {
		&self.columns
	}

	pub fn column(&self, name: &str) -> Option<&ColumnView<'a>> {
		self.columns.iter().find(|c| c.name == name)
	}

	/// Materialize into an owned batch.
	pub fn to_batch(&self) -> Result<Batch, BatchError> {
		let columns = self.columns.iter().map(ColumnView::to_column).collect::<Result<Vec<_>, _>>()?;
		Batch::try_new(columns)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn offset_bytes(offsets: &[i32]) -> &[u8] {
		unsafe {
			std::slice::from_raw_parts(offsets.as_ptr() as *const u8, offsets.len() * 4)
		}
	}

	#[test]
	fn fixed_cast_checks_width() {
		let data = ColumnData::int64([1, 2]);
		assert!(ColumnSlice::from_fixed(LogicalType::Int64, data.value_bytes()).is_ok());
		assert!(matches!(
			ColumnSlice::from_fixed(LogicalType::Int64, &data.value_bytes()[..12]),
			Err(BatchError::BufferWidthMismatch { .. })
		));
	}

	#[test]
	fn utf8_offsets_validated() {
		let data = b"abcdef";
		let slice = ColumnSlice::utf8(offset_bytes(&[0, 2, 6]), data, 2).unwrap();
		assert_eq!(slice.str_at(0), Some("ab"));
		assert_eq!(slice.str_at(1), Some("cdef"));

		assert!(ColumnSlice::utf8(offset_bytes(&[0, 4, 2]), data, 2).is_err());
		assert!(ColumnSlice::utf8(offset_bytes(&[0, 4, 9]), data, 2).is_err());
		assert!(ColumnSlice::utf8(offset_bytes(&[0, 6]), data, 2).is_err());
	}

	#[test]
	fn view_validity() {
		let column = Column::with_validity(
			"a",
			ColumnData::int64([1, 2, 3]),
			Validity::from_flags([true, false, true]),
		);
		let view = ColumnView::from_column(&column);
		assert!(view.is_valid(0));
		assert!(!view.is_valid(1));
		assert_eq!(view.null_count, 1);
		assert_eq!(view.to_column().unwrap(), column);
	}

	#[test]
	fn new_rejects_ragged_columns() {
		let a = [1i64, 2, 3];
		let b = [1i64];
		let columns = vec![
			ColumnView {
				name: "a",
				nullable: false,
				null_count: 0,
				validity: None,
				data: ColumnSlice::Int64(&a),
			},
			ColumnView {
				name: "b",
				nullable: false,
				null_count: 0,
				validity: None,
				data: ColumnSlice::Int64(&b),
			},
		];
		assert!(BatchView::new(3, columns).is_err());
	}
}
