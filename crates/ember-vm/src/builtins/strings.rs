// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! String operations: allocation, interning, concatenation, and the
//! string forms of primitive values.
//!
//! Strings are UTF-8 bytes plus a trailing NUL included in the allocation
//! size. A string that has been registered in the interning machinery
//! carries the interned type code, and pointer equality on interned
//! strings implies content equality, which is what makes them usable as
//! property keys.

use ember_abi::image::Builtin;
use ember_abi::type_code::{self, TypeCode};

use crate::error::Error;
use crate::heap;
use crate::port;
use crate::types::ShortPtr;
use crate::value::convert;
use crate::value::Value;
use crate::vm::Vm;

/// Bytes of the canonical `"length"` string.
pub(crate) const LENGTH_STR: &[u8] = b"length";

/// Bytes of the canonical `"__proto__"` string.
pub(crate) const PROTO_STR: &[u8] = b"__proto__";

/// True if the value is any string form.
pub(crate) fn is_string(vm: &Vm, value: Value) -> bool {
    matches!(
        vm.deep_type_of(value),
        TypeCode::String
            | TypeCode::InternedString
            | TypeCode::ValStrLength
            | TypeCode::ValStrProto
    )
}

/// String content in bytes, excluding the trailing NUL. The value must be
/// a string form.
pub(crate) fn string_size(vm: &Vm, value: Value) -> u16 {
    match vm.deep_type_of(value) {
        TypeCode::String | TypeCode::InternedString => {
            let lp = vm
                .decode_ptr(value)
                .unwrap_or_else(|| port::fatal_error(Error::Unexpected));
            type_code::header_size(vm.lp_header(lp)) - 1
        }
        TypeCode::ValStrLength => LENGTH_STR.len() as u16,
        TypeCode::ValStrProto => PROTO_STR.len() as u16,
        _ => port::fatal_error(Error::Unexpected),
    }
}

/// Borrow the bytes of a string value, excluding the trailing NUL. The
/// value must be a string form.
pub(crate) fn string_data<'a>(vm: &'a Vm, value: Value) -> &'a [u8] {
    match vm.deep_type_of(value) {
        TypeCode::String | TypeCode::InternedString => {
            let lp = vm
                .decode_ptr(value)
                .unwrap_or_else(|| port::fatal_error(Error::Unexpected));
            let size = type_code::header_size(vm.lp_header(lp)) - 1;
            vm.lp_bytes(lp, usize::from(size))
        }
        TypeCode::ValStrLength => LENGTH_STR,
        TypeCode::ValStrProto => PROTO_STR,
        _ => port::fatal_error(Error::Unexpected),
    }
}

/// Public accessor: the bytes of a string value, or a type error.
pub(crate) fn string_bytes<'a>(vm: &'a Vm, value: Value) -> Result<&'a [u8], Error> {
    if !is_string(vm, value) {
        return Err(Error::TypeError);
    }
    Ok(string_data(vm, value))
}

/// Allocate an uninitialized string of `size` content bytes (the trailing
/// NUL is added here). Returns the value and payload pointer.
pub(crate) fn alloc_string(vm: &mut Vm, size: u16) -> (Value, ShortPtr) {
    if size > type_code::MAX_ALLOCATION_SIZE - 1 {
        port::fatal_error(Error::AllocationTooLarge);
    }
    let ptr = heap::allocate(vm, size + 1, TypeCode::String);
    // Trailing NUL (allocation padding may add one more byte after it)
    vm.heap.bytes_mut(ptr.offset(), usize::from(size) + 1)[usize::from(size)] = 0;
    (ptr.to_value(), ptr)
}

/// Copy bytes into a fresh heap string.
pub(crate) fn new_string(vm: &mut Vm, bytes: &[u8]) -> Value {
    let (value, ptr) = alloc_string(vm, bytes.len() as u16);
    vm.heap.bytes_mut(ptr.offset(), bytes.len()).copy_from_slice(bytes);
    value
}

/// Format an int32 in base 10. Handles `i32::MIN`, whose magnitude does
/// not negate.
pub(crate) fn int_to_str(vm: &mut Vm, value: i32) -> Value {
    let mut buf = [0u8; 12];
    let mut at = buf.len();
    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    loop {
        at -= 1;
        buf[at] = b'0' + (magnitude % 10) as u8;
        magnitude /= 10;
        if magnitude == 0 {
            break;
        }
    }
    if negative {
        at -= 1;
        buf[at] = b'-';
    }
    new_string(vm, &buf[at..])
}

/// Convert a value to its string form.
///
/// Numbers use the integer fast path; the primitive constants have fixed
/// literals. Objects, arrays, functions, and boxed floats are not
/// convertible in this engine.
pub(crate) fn convert_to_string(vm: &mut Vm, value: Value) -> Result<Value, Error> {
    debug_assert!(!vm.using_cached_registers());
    let tc = vm.deep_type_of(value);
    let literal: &[u8] = match tc {
        TypeCode::ValInt14 | TypeCode::Int32 => {
            let n = convert::read_int32(vm, tc, value);
            return Ok(int_to_str(vm, n));
        }
        TypeCode::String
        | TypeCode::InternedString
        | TypeCode::ValStrLength
        | TypeCode::ValStrProto => return Ok(value),
        TypeCode::ValUndefined => b"undefined",
        TypeCode::ValNull => b"null",
        TypeCode::ValTrue => b"true",
        TypeCode::ValFalse => b"false",
        TypeCode::ValNan => b"NaN",
        TypeCode::ValNegZero => b"0",
        // Deep stringification of floats and reference types is not
        // provided by this engine
        _ => return Err(Error::NotImplemented),
    };
    Ok(new_string(vm, literal))
}

/// Concatenate the strings in two stack slots.
///
/// The operands live on the stack (not in locals) so the collector can
/// move their targets during the result allocation; they are re-read
/// afterwards.
pub(crate) fn concat(vm: &mut Vm, left_slot: u16, right_slot: u16) -> Value {
    debug_assert!(!vm.using_cached_registers());
    let left_size = string_size(vm, vm.stack_word(left_slot));
    let right_size = string_size(vm, vm.stack_word(right_slot));

    let (value, ptr) = alloc_string(vm, left_size + right_size);

    let left: alloc::vec::Vec<u8> = string_data(vm, vm.stack_word(left_slot)).to_vec();
    let right: alloc::vec::Vec<u8> = string_data(vm, vm.stack_word(right_slot)).to_vec();
    let out = vm
        .heap
        .bytes_mut(ptr.offset(), usize::from(left_size + right_size));
    out[..left.len()].copy_from_slice(&left);
    out[left.len()..].copy_from_slice(&right);
    value
}

/// True if a RAM string is a canonical non-negative decimal integer (such
/// keys must be int-valued to be property names).
pub(crate) fn ram_string_is_nonnegative_integer(vm: &Vm, value: Value) -> bool {
    debug_assert_eq!(vm.deep_type_of(value), TypeCode::String);
    let bytes = string_data(vm, value);
    !bytes.is_empty() && bytes.iter().all(u8::is_ascii_digit)
}

/// Intern a plain heap string.
///
/// Search order: the two canonical well-known strings, the sorted ROM
/// string table (binary search by content-then-length order), the RAM
/// interned chain. If nothing matches, the string's own header is
/// rewritten to the interned type code and it is pushed onto the RAM
/// chain.
pub(crate) fn to_interned_string(vm: &mut Vm, value: Value) -> Value {
    debug_assert_eq!(vm.deep_type_of(value), TypeCode::String);
    debug_assert!(!vm.using_cached_registers());

    let size_with_nul = {
        let ptr = ShortPtr::from_value(value);
        vm.heap.size_of(ptr)
    };

    if matches(vm, value, size_with_nul, PROTO_STR) {
        return Value::STR_PROTO;
    }
    if matches(vm, value, size_with_nul, LENGTH_STR) {
        return Value::STR_LENGTH;
    }

    // Binary search the sorted ROM table
    let count = i32::from(vm.image.string_table_count());
    let mut first: i32 = 0;
    let mut last: i32 = count;
    while first <= last {
        let middle = (first + last) / 2;
        if middle >= count {
            break;
        }
        let rom_value = vm.image.string_table_entry(middle as u16);
        let lp = vm
            .decode_ptr(rom_value)
            .unwrap_or_else(|| port::fatal_error(Error::InvalidBytecode));
        let header = vm.lp_header(lp);
        debug_assert_eq!(type_code::header_type_code(header), TypeCode::InternedString);
        let rom_size = type_code::header_size(header);

        let common = usize::from(size_with_nul.min(rom_size));
        let ours = vm.heap.bytes(value.raw(), common);
        let theirs = vm.lp_bytes(lp, common);
        let ordering = ours.cmp(theirs).then(size_with_nul.cmp(&rom_size));
        match ordering {
            core::cmp::Ordering::Equal => return rom_value,
            core::cmp::Ordering::Greater => first = middle + 1,
            core::cmp::Ordering::Less => last = middle - 1,
        }
    }

    // Linear search of the RAM chain: cells of { next, string }
    let chain_head = vm.get_builtin(Builtin::InternedStrings);
    debug_assert!(chain_head.is_null() || chain_head.is_short_ptr());
    let mut cell = chain_head;
    while !cell.is_null() {
        let cell_ptr = ShortPtr::from_value(cell);
        let candidate = Value::from_raw(vm.heap.read_u16(cell_ptr.offset() + 2));
        let candidate_ptr = ShortPtr::from_value(candidate);
        if vm.heap.size_of(candidate_ptr) == size_with_nul {
            let size = usize::from(size_with_nul);
            if vm.heap.bytes(value.raw(), size) == vm.heap.bytes(candidate.raw(), size) {
                return candidate;
            }
        }
        cell = Value::from_raw(vm.heap.read_u16(cell_ptr.offset()));
    }

    // No existing match: upgrade this string in place and chain it. The
    // cell allocation can collect, so the string is rooted through a
    // handle across it.
    vm.heap.rewrite_header(
        ShortPtr::from_value(value),
        TypeCode::InternedString,
        size_with_nul,
    );
    let anchor = vm.create_handle(value);
    let cell_ptr = heap::allocate(vm, 4, TypeCode::FixedLengthArray);
    let value = vm.handle_get(&anchor).unwrap_or(Value::UNDEFINED);
    let _ = vm.release_handle(anchor);
    let chain_head = vm.get_builtin(Builtin::InternedStrings);
    vm.heap.write_u16(cell_ptr.offset(), chain_head.raw());
    vm.heap.write_u16(cell_ptr.offset() + 2, value.raw());
    vm.set_builtin(Builtin::InternedStrings, cell_ptr.to_value());

    value
}

/// Compare a heap string (size including NUL) against a literal.
fn matches(vm: &Vm, value: Value, size_with_nul: u16, literal: &[u8]) -> bool {
    usize::from(size_with_nul) == literal.len() + 1
        && vm.heap.bytes(value.raw(), literal.len()) == literal
}
