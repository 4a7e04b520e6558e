// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Sandbatch

//! In-crate guest fixture: a bump-allocating module whose transform entry
//! point copies its input descriptors verbatim.

/// WAT source for the identity guest.
///
/// The allocator bumps from offset 1024, aligns to 8 and grows memory on
/// demand up to the declared maximum. `deallocate_buffer` reclaims only the
/// topmost block; `finalize_transform` rewinds the heap to the context,
/// which frees everything allocated for that exchange.
pub const IDENTITY_WAT: &str = r#"
(module
  (memory (export "memory") 4 64)
  (global $heap (mut i32) (i32.const 1024))

  (func $align (param $size i32) (result i32)
    (i32.and (i32.add (local.get $size) (i32.const 7)) (i32.const -8)))

  (func $alloc (param $size i32) (result i32)
    (local $ptr i32)
    (local $end i32)
    (local $need i32)
    (local.set $ptr (global.get $heap))
    (local.set $end (i32.add (local.get $ptr) (call $align (local.get $size))))
    (if (i32.lt_u (local.get $end) (local.get $ptr))
      (then (return (i32.const 0))))
    (if (i32.gt_u (local.get $end) (i32.mul (memory.size) (i32.const 65536)))
      (then
        (local.set $need
          (i32.div_u
            (i32.add
              (i32.sub (local.get $end) (i32.mul (memory.size) (i32.const 65536)))
              (i32.const 65535))
            (i32.const 65536)))
        (if (i32.eq (memory.grow (local.get $need)) (i32.const -1))
          (then (return (i32.const 0))))))
    (global.set $heap (local.get $end))
    (local.get $ptr))
  (export "allocate_buffer" (func $alloc))

  (func (export "deallocate_buffer") (param $ptr i32) (param $size i32)
    (if (i32.eq
          (i32.add (local.get $ptr) (call $align (local.get $size)))
          (global.get $heap))
      (then (global.set $heap (local.get $ptr)))))

  (func (export "prepare_transform") (param $base i64) (result i32)
    (local $ctx i32)
    (local $schema i32)
    (local $array i32)
    (local.set $ctx (call $alloc (i32.const 24)))
    (local.set $schema (call $alloc (i32.const 32)))
    (local.set $array (call $alloc (i32.const 40)))
    (if (i32.eqz (local.get $array))
      (then (return (i32.const 0))))
    (i64.store (local.get $ctx) (local.get $base))
    (i32.store offset=8 (local.get $ctx) (local.get $schema))
    (i32.store offset=12 (local.get $ctx) (local.get $array))
    (i32.store offset=16 (local.get $ctx) (i32.const 0))
    (i32.store offset=20 (local.get $ctx) (i32.const 0))
    (local.get $ctx))

  (func (export "transform") (param $ctx i32)
    (local $os i32)
    (local $oa i32)
    (local.set $os (call $alloc (i32.const 32)))
    (local.set $oa (call $alloc (i32.const 40)))
    (memory.copy (local.get $os) (i32.load offset=8 (local.get $ctx)) (i32.const 32))
    (memory.copy (local.get $oa) (i32.load offset=12 (local.get $ctx)) (i32.const 40))
    (i32.store offset=16 (local.get $ctx) (local.get $os))
    (i32.store offset=20 (local.get $ctx) (local.get $oa)))

  (func (export "finalize_transform") (param $ctx i32)
    (global.set $heap (local.get $ctx)))

  (func (export "transform_bytes") (param $off i32) (param $len i32) (result i32)
    (local $copy i32)
    (local $tuple i32)
    (local.set $copy (call $alloc (local.get $len)))
    (if (i32.eqz (local.get $copy))
      (then (return (i32.const 0))))
    (local.set $tuple (call $alloc (i32.const 8)))
    (if (i32.eqz (local.get $tuple))
      (then (return (i32.const 0))))
    (memory.copy (local.get $copy) (local.get $off) (local.get $len))
    (i32.store (local.get $tuple) (local.get $copy))
    (i32.store offset=4 (local.get $tuple) (local.get $len))
    (local.get $tuple))

  (func (export "tuple_first") (param $tuple i32) (result i32)
    (i32.load (local.get $tuple)))

  (func (export "tuple_second") (param $tuple i32) (result i32)
    (i32.load offset=4 (local.get $tuple)))

  (func (export "drop_tuple") (param $tuple i32)
    (if (i32.eq (i32.add (local.get $tuple) (i32.const 8)) (global.get $heap))
      (then (global.set $heap (i32.load (local.get $tuple)))))))
"#;

pub fn identity_module() -> Vec<u8> {
	wat::parse_str(IDENTITY_WAT).unwrap()
}
