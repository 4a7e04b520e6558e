// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

//! Self-describing byte encoding for whole batches.
//!
//! Used by the serialized transfer strategy, where schema and values cross
//! the guest boundary as one opaque buffer instead of shared descriptors.

use crate::{batch::Batch, error::BatchError};

/// Encode a batch into a self-contained byte buffer.
pub fn encode(batch: &Batch) -> Result<Vec<u8>, BatchError> {
	postcard::to_stdvec(batch).map_err(BatchError::Encode)
}

/// Decode a batch from bytes produced by [`encode`].
///
/// The decoded batch is re-validated: the bytes may come from an untrusted
/// guest module.
pub fn decode(bytes: &[u8]) -> Result<Batch, BatchError> {
	let batch: Batch = postcard::from_bytes(bytes).map_err(BatchError::Decode)?;
	batch.validate()?;
	Ok(batch)
}
