// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

use serde::{Deserialize, Serialize};

use crate::error::BatchError;

/// Logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalType {
	Int8,
	Int16,
	Int32,
	Int64,
	Uint8,
	Uint16,
	Uint32,
	Uint64,
	Float32,
	Float64,
	Utf8,
}

impl LogicalType {
	/// The boundary format code for this type.
	pub fn format_code(&self) -> &'static str {
		use sandbatch_abi::format;
		match self {
			LogicalType::Int8 => format::INT8,
			LogicalType::Int16 => format::INT16,
			LogicalType::Int32 => format::INT32,
			LogicalType::Int64 => format::INT64,
			LogicalType::Uint8 => format::UINT8,
			LogicalType::Uint16 => format::UINT16,
			LogicalType::Uint32 => format::UINT32,
			LogicalType::Uint64 => format::UINT64,
			LogicalType::Float32 => format::FLOAT32,
			LogicalType::Float64 => format::FLOAT64,
			LogicalType::Utf8 => format::UTF8,
		}
	}

	/// Inverse of [`format_code`](Self::format_code).
	pub fn from_format_code(code: &str) -> Result<Self, BatchError> {
		use sandbatch_abi::format;
		Ok(match code {
			_ if code == format::INT8 => LogicalType::Int8,
			_ if code == format::INT16 => LogicalType::Int16,
			_ if code == format::INT32 => LogicalType::Int32,
			_ if code == format::INT64 => LogicalType::Int64,
			_ if code == format::UINT8 => LogicalType::Uint8,
			_ if code == format::UINT16 => LogicalType::Uint16,
			_ if code == format::UINT32 => LogicalType::Uint32,
			_ if code == format::UINT64 => LogicalType::Uint64,
			_ if code == format::FLOAT32 => LogicalType::Float32,
			_ if code == format::FLOAT64 => LogicalType::Float64,
			_ if code == format::UTF8 => LogicalType::Utf8,
			_ => {
				return Err(BatchError::UnknownFormatCode {
					code: code.to_string(),
				});
			}
		})
	}

	/// Width in bytes of one value, `None` for variable-length types.
	pub fn fixed_width(&self) -> Option<usize> {
		match self {
			LogicalType::Int8 | LogicalType::Uint8 => Some(1),
			LogicalType::Int16 | LogicalType::Uint16 => Some(2),
			LogicalType::Int32 | LogicalType::Uint32 | LogicalType::Float32 => Some(4),
			LogicalType::Int64 | LogicalType::Uint64 | LogicalType::Float64 => Some(8),
			LogicalType::Utf8 => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn format_code_roundtrip() {
		let types = [
			LogicalType::Int8,
			LogicalType::Int16,
			LogicalType::Int32,
			LogicalType::Int64,
			LogicalType::Uint8,
			LogicalType::Uint16,
			LogicalType::Uint32,
			LogicalType::Uint64,
			LogicalType::Float32,
			LogicalType::Float64,
			LogicalType::Utf8,
		];
		for ty in types {
			assert_eq!(LogicalType::from_format_code(ty.format_code()).unwrap(), ty);
		}
	}

	#[test]
	fn unknown_format_code_rejected() {
		assert!(LogicalType::from_format_code("+l").is_err());
		assert!(LogicalType::from_format_code("").is_err());
	}
}
