// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
	column::Column,
	error::BatchError,
	view::{BatchView, ColumnView},
};

/// An owned columnar batch: equally long named columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
	columns: Vec<Column>,
	row_count: usize,
}

impl Batch {
	/// Build a batch, enforcing column length agreement and name uniqueness.
	pub fn try_new(columns: Vec<Column>) -> Result<Self, BatchError> {
		let row_count = columns.first().map_or(0, |c| c.data.len());
		let mut seen = HashSet::new();
		for column in &columns {
			column.validate(row_count)?;
			if !seen.insert(column.name.as_str()) {
				return Err(BatchError::DuplicateColumn {
					name: column.name.clone(),
				});
			}
		}
		Ok(Self {
			columns,
			row_count,
		})
	}

	pub fn row_count(&self) -> usize {
		self.row_count
	}

	pub fn column_count(&self) -> usize {
		self.columns.len()
	}

	pub fn columns(&self) -> &[Column] {
		&self.columns
	}

	pub fn column(&self, name: &str) -> Option<&Column> {
		self.columns.iter().find(|c| c.name == name)
	}

	/// A borrowed view over this batch's buffers.
	pub fn view(&self) -> BatchView<'_> {
		BatchView::from_columns(
			self.row_count,
			self.columns.iter().map(ColumnView::from_column).collect(),
		)
	}

	/// Re-check the structural invariants, e.g. after decoding.
	pub(crate) fn validate(&self) -> Result<(), BatchError> {
		let mut seen = HashSet::new();
		for column in &self.columns {
			column.validate(self.row_count)?;
			if !seen.insert(column.name.as_str()) {
				return Err(BatchError::DuplicateColumn {
					name: column.name.clone(),
				});
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::column::ColumnData;

	#[test]
	fn try_new_accepts_equal_lengths() {
		let batch = Batch::try_new(vec![
			Column::new("a", ColumnData::int64([1, 2, 3])),
			Column::new("b", ColumnData::utf8(["x", "y", "z"])),
		])
		.unwrap();
		assert_eq!(batch.row_count(), 3);
		assert_eq!(batch.column_count(), 2);
		assert!(batch.column("b").is_some());
		assert!(batch.column("c").is_none());
	}

	#[test]
	fn try_new_rejects_length_mismatch() {
		let err = Batch::try_new(vec![
			Column::new("a", ColumnData::int64([1, 2, 3])),
			Column::new("b", ColumnData::int64([1])),
		])
		.unwrap_err();
		assert!(matches!(err, BatchError::ColumnLengthMismatch { .. }));
	}

	#[test]
	fn try_new_rejects_duplicate_names() {
		let err = Batch::try_new(vec![
			Column::new("a", ColumnData::int64([1])),
			Column::new("a", ColumnData::int64([2])),
		])
		.unwrap_err();
		assert!(matches!(err, BatchError::DuplicateColumn { .. }));
	}

	#[test]
	fn empty_batch() {
		let batch = Batch::try_new(Vec::new()).unwrap();
		assert_eq!(batch.row_count(), 0);
		assert_eq!(batch.column_count(), 0);
	}

	#[test]
	fn view_roundtrip() {
		let batch = Batch::try_new(vec![
			Column::new("a", ColumnData::int32([7, 8])),
			Column::new("s", ColumnData::utf8(["ab", "cd"])),
		])
		.unwrap();
		let rebuilt = batch.view().to_batch().unwrap();
		assert_eq!(rebuilt, batch);
	}
}
