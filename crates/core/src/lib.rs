// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

//! Host-visible columnar batch model.
//!
//! A [`Batch`] owns its column buffers; a [`BatchView`] borrows them, either
//! from a `Batch` or directly from guest linear memory on the zero-copy
//! import path. The [`wire`] module provides the self-describing byte stream
//! used by the serialized transfer strategy.

mod batch;
mod column;
mod error;
mod types;
mod validity;
mod view;
pub mod wire;

pub use batch::Batch;
pub use column::{Column, ColumnData};
pub use error::BatchError;
pub use types::LogicalType;
pub use validity::Validity;
pub use view::{BatchView, ColumnSlice, ColumnView};
