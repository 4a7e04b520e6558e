// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

//! Stable boundary definitions shared by the host bridge and guest modules.
//!
//! Everything crossing the guest sandbox boundary is described here: the
//! guest export names, the fixed-layout descriptor records (schema, array,
//! transform context, result tuple) with their byte offsets, and the format
//! codes identifying column types. All multi-byte fields are little-endian,
//! matching wasm linear memory. This crate is deliberately dependency-free.

pub mod exports;
pub mod format;
pub mod layout;
pub mod record;
