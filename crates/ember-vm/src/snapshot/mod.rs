// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Snapshot serialization: capture the live VM state back into a
//! self-contained bytecode image.
//!
//! The constant prefix of the original image (everything up to and
//! including the ROM section) is copied verbatim; the globals and heap
//! sections are replaced with the VM's current state. The heap is the
//! last section, so the new image size is simply the heap section offset
//! plus the used heap size, and the bucket chain concatenates into the
//! section oldest bucket first — exactly the logical address space the
//! short pointers already use.
//!
//! Restoring the resulting image yields a VM behaviorally
//! indistinguishable from the one that was snapshotted.

#[cfg(test)]
mod snapshot_test;

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use ember_abi::image::{OFF_BYTECODE_SIZE, OFF_CRC, CRC_START, Section};
use ember_abi::type_code;

use crate::error::Error;
use crate::port;
use crate::value::Value;
use crate::vm::Vm;

impl Vm {
    /// Serialize the VM's current globals and heap into a new image.
    ///
    /// The result can be passed to [`Vm::restore`] (on this build or any
    /// compatible engine) to resume from this exact state.
    #[must_use]
    pub fn create_snapshot(&self) -> Box<[u8]> {
        let heap_offset = self.image.section_offset(Section::Heap);
        let heap_size = self.heap.used_size();

        // The heap is the last section, so it is the only one whose size
        // change moves the image size
        let image_size = u32::from(heap_offset) + u32::from(heap_size);
        if image_size > u32::from(u16::MAX) {
            port::fatal_error(Error::SnapshotTooLarge);
        }
        let image_size = image_size as usize;

        let mut out = vec![0u8; image_size];

        // Constant prefix: everything up to the globals section
        let globals_offset = usize::from(self.image.section_offset(Section::Globals));
        out[..globals_offset].copy_from_slice(&self.image.bytes()[..globals_offset]);

        // Current globals
        for (i, g) in self.globals.iter().enumerate() {
            let at = globals_offset + i * 2;
            out[at..at + 2].copy_from_slice(&g.raw().to_le_bytes());
        }

        // Current heap: concatenate the used portion of each bucket,
        // oldest first
        let mut at = usize::from(heap_offset);
        for bucket in 0..self.heap.bucket_count() {
            let start = self.heap.bucket_start(bucket);
            let used = self.heap.bucket_used(bucket);
            out[at..at + used].copy_from_slice(self.heap.bytes(start, used));
            at += used;
        }
        debug_assert_eq!(at, image_size);

        // Update the size field, re-point the serialized pointers, and
        // seal with the CRC
        out[OFF_BYTECODE_SIZE..OFF_BYTECODE_SIZE + 2]
            .copy_from_slice(&(image_size as u16).to_le_bytes());

        serialize_pointers(&out, heap_offset, heap_size);

        let crc = port::crc16_ccitt(&out[CRC_START..]);
        out[OFF_CRC..OFF_CRC + 2].copy_from_slice(&crc.to_le_bytes());

        out.into_boxed_slice()
    }
}

/// Convert the short pointers in the serialized globals and heap to their
/// heap-relative offset form.
///
/// The engine's runtime pointer representation is already the
/// heap-relative offset the image format mandates, so no rewriting is
/// needed; this pass instead re-checks the invariant the restore path
/// depends on: the heap parses into allocations, and every short pointer
/// in globals or a container payload addresses one of their payloads.
fn serialize_pointers(out: &[u8], heap_offset: u16, heap_size: u16) {
    let read_u16 = |at: usize| u16::from_le_bytes([out[at], out[at + 1]]);

    let mut payloads: Vec<u16> = Vec::new();
    let mut at = usize::from(heap_offset);
    let heap_end = usize::from(heap_offset) + usize::from(heap_size);
    while at < heap_end {
        let header = read_u16(at);
        let size = type_code::header_size(header);
        payloads.push((at - usize::from(heap_offset) + 2) as u16);
        at += 2 + usize::from((size + 1) & 0xFFFE);
    }
    debug_assert_eq!(at, heap_end);

    let check = |v: Value| {
        debug_assert!(
            !v.is_short_ptr() || payloads.binary_search(&v.raw()).is_ok(),
            "dangling short pointer {v:?} in snapshot"
        );
    };

    // Globals
    let globals_start = usize::from(read_u16(Section::Globals.header_field_offset()));
    let mut at = globals_start;
    while at < usize::from(heap_offset) {
        check(Value::from_raw(read_u16(at)));
        at += 2;
    }

    // Container payloads in the heap section
    for &payload in &payloads {
        let base = usize::from(heap_offset) + usize::from(payload);
        let header = read_u16(base - 2);
        if !type_code::header_is_container(header) {
            continue;
        }
        let words = usize::from((type_code::header_size(header) + 1) / 2);
        for i in 0..words {
            check(Value::from_raw(read_u16(base + i * 2)));
        }
    }
}
