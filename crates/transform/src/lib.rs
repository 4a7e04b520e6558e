// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

//! Batch transformation through a guest sandbox.
//!
//! [`marshal`] moves batches across the boundary as shared descriptor
//! trees; [`pipeline`] wraps the exchange in the transformer contract with
//! a zero-copy, a serialized and a passthrough strategy.

pub mod marshal;
pub mod pipeline;

pub use pipeline::{
	PassthroughTransformer, SerializedTransformer, Transformer, ZeroCopyTransformer,
};
