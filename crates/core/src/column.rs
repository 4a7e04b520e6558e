// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

use serde::{Deserialize, Serialize};

use crate::{error::BatchError, types::LogicalType, validity::Validity};

/// Owned, typed column values.
///
/// Variable-length text is stored columnar (offsets + concatenated bytes)
/// so a borrowed view can be produced without materializing anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
	Int8(Vec<i8>),
	Int16(Vec<i16>),
	Int32(Vec<i32>),
	Int64(Vec<i64>),
	Uint8(Vec<u8>),
	Uint16(Vec<u16>),
	Uint32(Vec<u32>),
	Uint64(Vec<u64>),
	Float32(Vec<f32>),
	Float64(Vec<f64>),
	Utf8 {
		/// `row_count + 1` byte positions into `data`.
		offsets: Vec<i32>,
		data: Vec<u8>,
	},
}

impl ColumnData {
	pub fn int8(values: impl IntoIterator<Item = i8>) -> Self {
		Self::Int8(values.into_iter().collect())
	}

	pub fn int16(values: impl IntoIterator<Item = i16>) -> Self {
		Self::Int16(values.into_iter().collect())
	}

	pub fn int32(values: impl IntoIterator<Item = i32>) -> Self {
		Self::Int32(values.into_iter().collect())
	}

	pub fn int64(values: impl IntoIterator<Item = i64>) -> Self {
		Self::Int64(values.into_iter().collect())
	}

	pub fn uint8(values: impl IntoIterator<Item = u8>) -> Self {
		Self::Uint8(values.into_iter().collect())
	}

	pub fn uint16(values: impl IntoIterator<Item = u16>) -> Self {
		Self::Uint16(values.into_iter().collect())
	}

	pub fn uint32(values: impl IntoIterator<Item = u32>) -> Self {
		Self::Uint32(values.into_iter().collect())
	}

	pub fn uint64(values: impl IntoIterator<Item = u64>) -> Self {
		Self::Uint64(values.into_iter().collect())
	}

	pub fn float32(values: impl IntoIterator<Item = f32>) -> Self {
		Self::Float32(values.into_iter().collect())
	}

	pub fn float64(values: impl IntoIterator<Item = f64>) -> Self {
		Self::Float64(values.into_iter().collect())
	}

	pub fn utf8<S: AsRef<str>>(values: impl IntoIterator<Item = S>) -> Self {
		let mut offsets = vec![0i32];
		let mut data = Vec::new();
		for value in values {
			data.extend_from_slice(value.as_ref().as_bytes());
			offsets.push(data.len() as i32);
		}
		Self::Utf8 {
			offsets,
			data,
		}
	}

	pub fn len(&self) -> usize {
		match self {
			ColumnData::Int8(v) => v.len(),
			ColumnData::Int16(v) => v.len(),
			ColumnData::Int32(v) => v.len(),
			ColumnData::Int64(v) => v.len(),
			ColumnData::Uint8(v) => v.len(),
			ColumnData::Uint16(v) => v.len(),
			ColumnData::Uint32(v) => v.len(),
			ColumnData::Uint64(v) => v.len(),
			ColumnData::Float32(v) => v.len(),
			ColumnData::Float64(v) => v.len(),
			ColumnData::Utf8 {
				offsets, ..
			} => offsets.len().saturating_sub(1),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn logical_type(&self) -> LogicalType {
		match self {
			ColumnData::Int8(_) => LogicalType::Int8,
			ColumnData::Int16(_) => LogicalType::Int16,
			ColumnData::Int32(_) => LogicalType::Int32,
			ColumnData::Int64(_) => LogicalType::Int64,
			ColumnData::Uint8(_) => LogicalType::Uint8,
			ColumnData::Uint16(_) => LogicalType::Uint16,
			ColumnData::Uint32(_) => LogicalType::Uint32,
			ColumnData::Uint64(_) => LogicalType::Uint64,
			ColumnData::Float32(_) => LogicalType::Float32,
			ColumnData::Float64(_) => LogicalType::Float64,
			ColumnData::Utf8 {
				..
			} => LogicalType::Utf8,
		}
	}

	/// The raw value buffer: fixed-width values or concatenated utf8 bytes.
	pub fn value_bytes(&self) -> &[u8] {
		match self {
			ColumnData::Int8(v) => as_byte_slice(v),
			ColumnData::Int16(v) => as_byte_slice(v),
			ColumnData::Int32(v) => as_byte_slice(v),
			ColumnData::Int64(v) => as_byte_slice(v),
			ColumnData::Uint8(v) => v,
			ColumnData::Uint16(v) => as_byte_slice(v),
			ColumnData::Uint32(v) => as_byte_slice(v),
			ColumnData::Uint64(v) => as_byte_slice(v),
			ColumnData::Float32(v) => as_byte_slice(v),
			ColumnData::Float64(v) => as_byte_slice(v),
			ColumnData::Utf8 {
				data, ..
			} => data,
		}
	}

	/// Offsets buffer of a variable-length column.
	pub fn offsets(&self) -> Option<&[i32]> {
		match self {
			ColumnData::Utf8 {
				offsets, ..
			} => Some(offsets),
			_ => None,
		}
	}

	/// Text value at `row` of a utf8 column.
	pub fn str_at(&self, row: usize) -> Option<&str> {
		match self {
			ColumnData::Utf8 {
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
}

// Values are plain numbers; reading them as bytes is always defined.
fn as_byte_slice<T: Copy>(values: &[T]) -> &[u8] {
	unsafe { std::slice::from_raw_parts(values.as_ptr() as *const u8, std::mem::size_of_val(values)) }
}

/// A named column with optional validity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
	pub name: String,
	pub data: ColumnData,
	pub validity: Option<Validity>,
}

impl Column {
	pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
		Self {
			name: name.into(),
			data,
			validity: None,
		}
	}

	pub fn with_validity(name: impl Into<String>, data: ColumnData, validity: Validity) -> Self {
		Self {
			name: name.into(),
			data,
			validity: Some(validity),
		}
	}

	pub fn null_count(&self) -> u64 {
		self.validity.as_ref().map_or(0, Validity::null_count)
	}

	pub fn nullable(&self) -> bool {
		self.validity.is_some()
	}

	pub(crate) fn validate(&self, rows: usize) -> Result<(), BatchError> {
		if self.data.len() != rows {
			return Err(BatchError::ColumnLengthMismatch {
				column: self.name.clone(),
				expected: rows,
				actual: self.data.len(),
			});
		}
		if let Some(validity) = &self.validity {
			if validity.len() != rows {
				return Err(BatchError::ValidityLengthMismatch {
					column: self.name.clone(),
					expected: rows,
					actual: validity.len(),
				});
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn utf8_layout() {
		let data = ColumnData::utf8(["hello", "", "columnar"]);
		assert_eq!(data.len(), 3);
		assert_eq!(data.offsets().unwrap(), &[0, 5, 5, 13]);
		assert_eq!(data.str_at(0), Some("hello"));
		assert_eq!(data.str_at(1), Some(""));
		assert_eq!(data.str_at(2), Some("columnar"));
		assert_eq!(data.str_at(3), None);
	}

	#[test]
	fn value_bytes_are_little_endian_values() {
		let data = ColumnData::int32([1, -1]);
		assert_eq!(data.value_bytes(), &[1, 0, 0, 0, 0xff, 0xff, 0xff, 0xff]);
	}

	#[test]
	fn null_count_through_column() {
		let column = Column::with_validity(
			"a",
			ColumnData::int64([1, 2, 3]),
			Validity::from_flags([true, false, true]),
		);
		assert_eq!(column.null_count(), 1);
		assert!(column.nullable());
	}

	#[test]
	fn validate_checks_lengths() {
		let column = Column::new("a", ColumnData::int64([1, 2, 3]));
		assert!(column.validate(3).is_ok());
		assert!(column.validate(4).is_err());

		let column = Column::with_validity("a", ColumnData::int64([1, 2]), Validity::all_valid(3));
		assert!(column.validate(2).is_err());
	}
}
