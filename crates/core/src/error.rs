// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

/// Errors raised by the batch model and wire format.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
	#[error("column '{column}' has {actual} rows, expected {expected}")]
	ColumnLengthMismatch {
		column: String,
		expected: usize,
		actual: usize,
	},

	#[error("duplicate column name '{name}'")]
	DuplicateColumn {
		name: String,
	},

	#[error("validity of column '{column}' covers {actual} rows, expected {expected}")]
	ValidityLengthMismatch {
		column: String,
		expected: usize,
		actual: usize,
	},

	#[error("unknown format code '{code}'")]
	UnknownFormatCode {
		code: String,
	},

	#[error("buffer of {len} bytes is not a whole number of {width}-byte values")]
	BufferWidthMismatch {
		len: usize,
		width: usize,
	},

	#[error("buffer is not aligned for {width}-byte values")]
	BufferMisaligned {
		width: usize,
	},

	#[error("utf8 offsets are not monotonic or exceed the data buffer")]
	InvalidUtf8Offsets,

	#[error("column data is not valid utf8")]
	InvalidUtf8,

	#[error("failed to encode batch: {0}")]
	Encode(#[source] postcard::Error),

	#[error("failed to decode batch: {0}")]
	Decode(#[source] postcard::Error),
}
