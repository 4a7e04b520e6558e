// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

use thiserror::Error;

/// Errors crossing the host/guest boundary.
///
/// `Load` is fatal for the module bytes. `OutOfMemory` fails the current
/// call but leaves the instance usable. `Transform` means the guest trapped
/// or reported failure; the owning context must still be finished, and the
/// safe recovery is tearing the instance down. `Protocol` marks a misuse of
/// the boundary contract on either side and is never retried.
#[derive(Debug, Error)]
pub enum BridgeError {
	#[error("failed to load guest module: {reason}")]
	Load { reason: String },

	#[error("guest export `{name}` is missing or has the wrong type")]
	MissingExport { name: &'static str },

	#[error("guest arena exhausted while allocating {requested} bytes")]
	OutOfMemory { requested: u32 },

	#[error("guest transform failed: {reason}")]
	Transform { reason: String },

	#[error("boundary protocol violated: {reason}")]
	Protocol { reason: String },

	#[error("guest range {offset}+{len} is outside linear memory of {size} bytes")]
	OutOfBounds { offset: u64, len: u64, size: u64 },
}

impl BridgeError {
	pub(crate) fn load(reason: impl Into<String>) -> Self {
		Self::Load {
			reason: reason.into(),
		}
	}

	pub fn transform(reason: impl Into<String>) -> Self {
		Self::Transform {
			reason: reason.into(),
		}
	}

	pub fn protocol(reason: impl Into<String>) -> Self {
		Self::Protocol {
			reason: reason.into(),
		}
	}
}
