// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Cheney-style semi-space collection.
//!
//! A collection moves every reachable allocation from the old bucket
//! chain (fromspace) into a fresh chain (tospace), then drops the old
//! chain. Moved allocations leave a tombstone behind: the header word
//! becomes [`TOMBSTONE_HEADER`] and the first payload word becomes the
//! forwarding pointer, so later references to the same allocation resolve
//! to the copy.
//!
//! The tospace is scanned linearly exactly once: moving an allocation
//! appends it behind the scan cursor, so the cursor reaches every moved
//! object and processes the pointers inside it (the classic Cheney
//! queue-in-place).
//!
//! Two types are compacted while they move:
//! - an array's backing is truncated to its logical length (or dropped
//!   entirely at length zero)
//! - a property list's appended groups are merged into its head
//!   allocation
//!
//! A move is staged in the last tospace bucket's spare capacity and only
//! committed once complete; if the bucket overflows mid-merge, the staged
//! bytes are abandoned, a new bucket is added, and the move retries.

use ember_abi::type_code::{self, TypeCode, MAX_ALLOCATION_SIZE, TOMBSTONE_HEADER};

use crate::error::Error;
use crate::heap::Heap;
use crate::port;
use crate::types::ShortPtr;
use crate::value::Value;
use crate::vm::{Vm, FRAME_BOUNDARY_WORDS};

/// Collection state: the two semi-spaces.
struct Gc {
    fromspace: Heap,
    tospace: Heap,
}

/// Run a collection.
///
/// With `squeeze`, if the measured live size differs from the estimate
/// used to size tospace's first bucket, a second collection runs sized
/// exactly to the measurement, leaving no spare capacity. That trades one
/// extra traversal for a minimal idle footprint.
pub(crate) fn collect(vm: &mut Vm, squeeze: bool) {
    debug_assert!(!vm.using_cached_registers());

    let before = vm.heap.used_size();
    vm.heap.note_high_water(before);
    let estimated = vm.heap.used_after_last_gc();
    let high_water = vm.heap.high_water_mark();

    let mut gc = Gc {
        fromspace: core::mem::take(&mut vm.heap),
        tospace: Heap::new(),
    };

    // Size the first tospace bucket by the last collection's result; it
    // grows as needed if the estimate is short
    if estimated > 0 {
        gc.new_bucket(estimated, 0);
    }

    // Roots: globals
    for i in 0..vm.globals.len() {
        let mut v = vm.globals[i];
        gc.process_value(&mut v);
        vm.globals[i] = v;
    }

    // Roots: handles
    for i in 0..vm.handles.len() {
        if let Some(mut v) = vm.handles[i] {
            gc.process_value(&mut v);
            vm.handles[i] = Some(v);
        }
    }

    // Roots: registers and the live portion of every stack frame
    if vm.stack.is_some() {
        let mut scope = vm.regs().scope;
        gc.process_value(&mut scope);
        vm.regs_mut().scope = scope;

        let mut begin = vm.regs().frame_base;
        let mut end = vm.regs().sp;
        loop {
            for i in begin..end {
                let mut v = vm.stack_word(i);
                gc.process_value(&mut v);
                vm.set_stack_word(i, v);
            }
            if begin == 0 {
                break;
            }
            // Step over the frame boundary: of its four saved words only
            // the scope is a value; the frame-size word tells us where
            // the caller's frame begins
            end = begin - FRAME_BOUNDARY_WORDS;
            let mut saved_scope = vm.stack_word(end + 1);
            gc.process_value(&mut saved_scope);
            vm.set_stack_word(end + 1, saved_scope);
            let frame_size_bytes = vm.stack_word(end).raw();
            begin = end - frame_size_bytes / 2;
        }
    }

    gc.trace();

    let Gc { fromspace, mut tospace } = gc;
    drop(fromspace);
    tospace.note_high_water(high_water);
    let live = tospace.used_size();
    tospace.set_used_after_last_gc(live);
    vm.heap = tospace;

    log::trace!("gc: {before} B used -> {live} B live");

    if squeeze && live != estimated {
        collect(vm, false);
    }
}

impl Gc {
    /// Append a tospace bucket. Since fromspace never exceeded the heap
    /// cap, the live data cannot either.
    fn new_bucket(&mut self, bucket_size: u16, min_size: u16) {
        let heap_size = u32::from(self.tospace.used_size());
        let mut bucket_size = bucket_size.max(min_size);
        debug_assert!(heap_size + u32::from(min_size) <= u32::from(port::MAX_HEAP_SIZE));
        if heap_size + u32::from(bucket_size) > u32::from(port::MAX_HEAP_SIZE) {
            bucket_size = port::MAX_HEAP_SIZE - heap_size as u16;
        }
        self.tospace.add_bucket(bucket_size);
    }

    /// Move procedure for one value slot.
    fn process_value(&mut self, slot: &mut Value) {
        // Only short pointers reference GC memory
        if !slot.is_short_ptr() {
            return;
        }
        let src = ShortPtr::from_value(*slot);
        let header = self.fromspace.read_u16(src.header_offset());

        // Already moved: follow the forwarding pointer
        if header == TOMBSTONE_HEADER {
            *slot = Value::from_raw(self.fromspace.read_u16(src.offset()));
            return;
        }
        *slot = self.move_allocation(src, header).to_value();
    }

    /// Copy an allocation into tospace, compacting arrays and property
    /// lists on the way, and leave a forwarding tombstone behind.
    fn move_allocation(&mut self, src: ShortPtr, header: u16) -> ShortPtr {
        let size = type_code::header_size(header);
        let payload_words = (size + 1) / 2;
        let total_bytes = usize::from(2 + ((size + 1) & 0xFFFE));

        loop {
            if self.tospace.bucket_count() == 0 || self.tospace.staging_room() < total_bytes {
                self.new_bucket(port::BUCKET_SIZE, total_bytes as u16);
                continue;
            }

            // Stage the copy in the spare capacity of the last bucket
            let base = self.tospace.staging_base();
            let new_ptr = ShortPtr::new(base + 2);
            let mut write = base;
            self.tospace.write_u16(write, header);
            write += 2;
            for i in 0..payload_words {
                let word = self.fromspace.read_u16(src.offset() + i * 2);
                self.tospace.write_u16(write, word);
                write += 2;
            }

            match type_code::header_type_code(header) {
                TypeCode::Array => self.compact_array(new_ptr),
                TypeCode::PropertyList => {
                    if !self.compact_property_list(new_ptr, base, size, &mut write) {
                        // Bucket overflowed mid-merge; the staged bytes
                        // are uncommitted, so simply retry in a new bucket
                        continue;
                    }
                }
                _ => {}
            }

            // Commit the move and write the forwarding tombstone
            self.tospace.commit(usize::from(write - base));
            self.fromspace.write_u16(src.header_offset(), TOMBSTONE_HEADER);
            self.fromspace.write_u16(src.offset(), new_ptr.offset());
            return new_ptr;
        }
    }

    /// Truncate a moved array's backing (still in fromspace) to the
    /// logical length, or drop it entirely when the length is zero. The
    /// backing is a unique pointer, so it cannot have moved yet.
    fn compact_array(&mut self, new_ptr: ShortPtr) {
        let data = Value::from_raw(self.tospace.read_u16(new_ptr.offset()));
        if data.is_null() {
            return;
        }
        debug_assert!(data.is_short_ptr());
        let backing = ShortPtr::from_value(data);
        let vi_length = Value::from_raw(self.tospace.read_u16(new_ptr.offset() + 2));
        debug_assert!(vi_length.is_int14());
        let length = vi_length.int14_value() as u16;

        let backing_header = self.fromspace.read_u16(backing.header_offset());
        debug_assert_eq!(
            type_code::header_type_code(backing_header),
            TypeCode::FixedLengthArray
        );
        debug_assert!(length * 2 <= type_code::header_size(backing_header));

        if length > 0 {
            self.fromspace
                .rewrite_header(backing, TypeCode::FixedLengthArray, length * 2);
        } else {
            self.tospace.write_u16(new_ptr.offset(), Value::NULL.raw());
        }
    }

    /// Merge a moved property list's appended groups into the staged head
    /// copy. Returns false if the bucket ran out of room (caller retries
    /// with a fresh bucket).
    fn compact_property_list(
        &mut self,
        new_ptr: ShortPtr,
        base: u16,
        size: u16,
        write: &mut u16,
    ) -> bool {
        let mut next = Value::from_raw(self.tospace.read_u16(new_ptr.offset()));
        if next.is_null() {
            return true;
        }

        let mut total_pairs = usize::from((size - 4) / 4);
        while !next.is_null() {
            // Appended groups only ever live in GC memory
            debug_assert!(next.is_short_ptr());
            let child = ShortPtr::from_value(next);
            let child_header = self.fromspace.read_u16(child.header_offset());
            debug_assert_eq!(
                type_code::header_type_code(child_header),
                TypeCode::PropertyList
            );
            let child_size = type_code::header_size(child_header);
            let child_pairs = usize::from((child_size - 4) / 4);
            total_pairs += child_pairs;

            let needed = *write as usize + child_pairs * 4;
            if needed > usize::from(self.tospace.capacity()) {
                let min = 2 + 4 + total_pairs * 4;
                self.new_bucket(port::BUCKET_SIZE, min as u16);
                return false;
            }

            for j in 0..child_pairs * 2 {
                let word = self.fromspace.read_u16(child.offset() + 4 + (j as u16) * 2);
                self.tospace.write_u16(*write, word);
                *write += 2;
            }
            next = Value::from_raw(self.fromspace.read_u16(child.offset()));
        }

        let merged_size = 4 + total_pairs * 4;
        if merged_size > usize::from(MAX_ALLOCATION_SIZE) {
            port::fatal_error(Error::AllocationTooLarge);
        }
        self.tospace
            .write_u16(base, type_code::make_header(TypeCode::PropertyList, merged_size as u16));
        self.tospace.write_u16(new_ptr.offset(), Value::NULL.raw());
        true
    }

    /// The Cheney scan: walk tospace linearly, processing every container
    /// word. Moves performed during the walk append behind the cursor, so
    /// one pass reaches everything.
    fn trace(&mut self) {
        let mut bucket = 0;
        while bucket < self.tospace.bucket_count() {
            let start = self.tospace.bucket_start(bucket);
            let mut at = 0usize;
            loop {
                let used = self.tospace.bucket_used(bucket);
                if at >= used {
                    break;
                }
                let header = self.tospace.read_u16(start + at as u16);
                let size = type_code::header_size(header);
                let words = usize::from((size + 1) / 2);
                at += 2;
                if type_code::header_is_container(header) {
                    for _ in 0..words {
                        let offset = start + at as u16;
                        let mut v = Value::from_raw(self.tospace.read_u16(offset));
                        self.process_value(&mut v);
                        self.tospace.write_u16(offset, v.raw());
                        at += 2;
                    }
                } else {
                    at += words * 2;
                }
            }
            bucket += 1;
        }
    }
}
