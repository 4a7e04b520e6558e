// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

//! Guest sandbox lifecycle for columnar batch exchange.
//!
//! Loads WASM guest modules, accounts for arena traffic through the
//! guest's exported allocator, translates between 32-bit guest offsets and
//! 64-bit host addresses, and drives the transform context state machine.

mod addr;
mod arena;
mod context;
mod error;
mod instance;
#[cfg(test)]
pub(crate) mod testing;

pub use addr::{GuestPtr, HostAddr};
pub use context::TransformContext;
pub use error::BridgeError;
pub use instance::{GuestInstance, TupleHandle};
