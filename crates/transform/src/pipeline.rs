// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

use sandbatch_core::{Batch, BatchView, wire};
use sandbatch_guest::{BridgeError, GuestInstance, GuestPtr, TransformContext};
use tracing::warn;

use crate::marshal::{export_batch, import_batch};

/// One transformation stage over a guest module.
///
/// `init` seeds the input exactly once. Each `next` produces one
/// transformed batch, superseding the previous one; `current` borrows the
/// most recent output. `release_resources` reclaims the per-call guest
/// state and must run before the next `next` on the zero-copy path.
/// `close` is terminal and idempotent, safe to call after a failure.
pub trait Transformer {
	fn init(&mut self, batch: Batch) -> Result<(), BridgeError>;
	fn next(&mut self) -> Result<(), BridgeError>;
	fn current(&self) -> Option<BatchView<'_>>;
	fn release_resources(&mut self) -> Result<(), BridgeError>;
	fn close(&mut self) -> Result<(), BridgeError>;
}

fn check_open(closed: bool) -> Result<(), BridgeError> {
	if closed {
		return Err(BridgeError::protocol("transformer pipeline is closed"));
	}
	Ok(())
}

fn store_input(slot: &mut Option<Batch>, batch: Batch) -> Result<(), BridgeError> {
	if slot.is_some() {
		return Err(BridgeError::protocol("transformer pipeline already initialized"));
	}
	*slot = Some(batch);
	Ok(())
}

fn take_input(slot: &Option<Batch>) -> Result<&Batch, BridgeError> {
	slot.as_ref().ok_or_else(|| BridgeError::protocol("transformer pipeline not initialized"))
}

/// Shares descriptor trees with the guest; output buffers are borrowed
/// from guest memory, never copied.
pub struct ZeroCopyTransformer {
	guest: GuestInstance,
	input: Option<Batch>,
	ctx: Option<TransformContext>,
	closed: bool,
}

impl ZeroCopyTransformer {
	pub fn new(module_bytes: &[u8]) -> Result<Self, BridgeError> {
		Ok(Self {
			guest: GuestInstance::new(module_bytes)?,
			input: None,
			ctx: None,
			closed: false,
		})
	}

	pub fn guest(&self) -> &GuestInstance {
		&self.guest
	}

	fn abort(&mut self, mut ctx: TransformContext, err: BridgeError) -> BridgeError {
		if let Err(teardown) = self.guest.finish(&mut ctx) {
			warn!(error = %teardown, "context teardown failed while unwinding");
		}
		err
	}
}

impl Transformer for ZeroCopyTransformer {
	fn init(&mut self, batch: Batch) -> Result<(), BridgeError> {
		check_open(self.closed)?;
		store_input(&mut self.input, batch)
	}

	fn next(&mut self) -> Result<(), BridgeError> {
		check_open(self.closed)?;
		take_input(&self.input)?;

		// A still-live previous output is superseded.
		if let Some(mut previous) = self.ctx.take() {
			self.guest.finish(&mut previous)?;
		}

		let mut ctx = self.guest.prepare()?;

		let exported = match self.input.as_ref() {
			Some(batch) => export_batch(&mut self.guest, &mut ctx, batch),
			None => Err(BridgeError::protocol("transformer pipeline not initialized")),
		};
		if let Err(e) = exported {
			return Err(self.abort(ctx, e));
		}
		if let Err(e) = self.guest.run_transform(&mut ctx) {
			return Err(self.abort(ctx, e));
		}

		// Validate the whole output tree once, before `current` can see it.
		let validated = match (ctx.out_schema(), ctx.out_array()) {
			(Some(schema), Some(array)) => {
				import_batch(&self.guest, schema, array).map(|_| ())
			}
			_ => Err(BridgeError::transform("guest produced no output descriptors")),
		};
		if let Err(e) = validated {
			return Err(self.abort(ctx, e));
		}

		self.ctx = Some(ctx);
		Ok(())
	}

	fn current(&self) -> Option<BatchView<'_>> {
		let ctx = self.ctx.as_ref()?;
		let schema = ctx.out_schema()?;
		let array = ctx.out_array()?;
		import_batch(&self.guest, schema, array).ok()
	}

	fn release_resources(&mut self) -> Result<(), BridgeError> {
		if let Some(mut ctx) = self.ctx.take() {
			self.guest.finish(&mut ctx)?;
		}
		Ok(())
	}

	fn close(&mut self) -> Result<(), BridgeError> {
		if self.closed {
			return Ok(());
		}
		self.release_resources()?;
		self.input = None;
		self.closed = true;
		Ok(())
	}
}

/// Ships batches through the guest as one self-describing byte stream per
/// call, decoding the result into an owned batch.
pub struct SerializedTransformer {
	guest: GuestInstance,
	input: Option<Batch>,
	output: Option<Batch>,
	closed: bool,
}

impl SerializedTransformer {
	pub fn new(module_bytes: &[u8]) -> Result<Self, BridgeError> {
		Ok(Self {
			guest: GuestInstance::new(module_bytes)?,
			input: None,
			output: None,
			closed: false,
		})
	}

	pub fn guest(&self) -> &GuestInstance {
		&self.guest
	}

	fn exchange(&mut self, staged: GuestPtr, bytes: &[u8], len: u32) -> Result<Vec<u8>, BridgeError> {
		self.guest.write_bytes(staged, bytes)?;
		let tuple = self.guest.call_transform_bytes(staged, len)?;
		let payload = self.guest.read_bytes(tuple.addr, tuple.len).map(<[u8]>::to_vec);
		self.guest.release_tuple(tuple)?;
		payload
	}
}

impl Transformer for SerializedTransformer {
	fn init(&mut self, batch: Batch) -> Result<(), BridgeError> {
		check_open(self.closed)?;
		store_input(&mut self.input, batch)
	}

	fn next(&mut self) -> Result<(), BridgeError> {
		check_open(self.closed)?;
		let bytes = wire::encode(take_input(&self.input)?)
			.map_err(|e| BridgeError::protocol(e.to_string()))?;
		let len = u32::try_from(bytes.len())
			.map_err(|_| BridgeError::protocol("encoded batch exceeds the guest address space"))?;

		// The staging block is reclaimed whether or not the exchange succeeds.
		let staged = self.guest.alloc(len)?;
		let exchanged = self.exchange(staged, &bytes, len);
		self.guest.dealloc(staged, len)?;

		let decoded =
			wire::decode(&exchanged?).map_err(|e| BridgeError::transform(e.to_string()))?;
		self.output = Some(decoded);
		Ok(())
	}

	fn current(&self) -> Option<BatchView<'_>> {
		self.output.as_ref().map(Batch::view)
	}

	fn release_resources(&mut self) -> Result<(), BridgeError> {
		self.output = None;
		Ok(())
	}

	fn close(&mut self) -> Result<(), BridgeError> {
		self.release_resources()?;
		self.input = None;
		self.closed = true;
		Ok(())
	}
}

/// Hands the input batch back unchanged. Useful as a pipeline stub and as
/// the contract's reference behavior.
#[derive(Default)]
pub struct PassthroughTransformer {
	input: Option<Batch>,
	output: Option<Batch>,
	closed: bool,
}

impl PassthroughTransformer {
	pub fn new() -> Self {
		Self::default()
	}
}

impl Transformer for PassthroughTransformer {
	fn init(&mut self, batch: Batch) -> Result<(), BridgeError> {
		check_open(self.closed)?;
		store_input(&mut self.input, batch)
	}

	fn next(&mut self) -> Result<(), BridgeError> {
		check_open(self.closed)?;
		self.output = Some(take_input(&self.input)?.clone());
		Ok(())
	}

	fn current(&self) -> Option<BatchView<'_>> {
		self.output.as_ref().map(Batch::view)
	}

	fn release_resources(&mut self) -> Result<(), BridgeError> {
		self.output = None;
		Ok(())
	}

	fn close(&mut self) -> Result<(), BridgeError> {
		self.release_resources()?;
		self.input = None;
		self.closed = true;
		Ok(())
	}
}
