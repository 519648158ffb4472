// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Property access on objects and arrays.
//!
//! Objects are property lists: a chain of groups `{ next, prototype,
//! (key, value)* }`. Only the head group's prototype is meaningful.
//! Setting a new property appends a single-pair group; the collector
//! compacts the chain into the head allocation during collection.
//!
//! Arrays are `{ data, length }` over an optional fixed-length backing.
//! `length` writes resize; index writes past the end grow the backing
//! with an exponential policy.
//!
//! The slot-based entry points take stack positions rather than values:
//! property operations can allocate (interning a key, growing an array,
//! appending a group), and an allocation can move every operand. Keeping
//! the operands in stack slots keeps them rooted; they are re-read after
//! every allocation.

use ember_abi::image::Builtin;
use ember_abi::type_code::{self, TypeCode};

use crate::error::Error;
use crate::heap;
use crate::port;
use crate::types::{LongPtr, ShortPtr};
use crate::value::Value;
use crate::vm::Vm;

use super::strings;

/// Byte offset of an array's backing pointer within its payload.
const ARR_DATA: u16 = 0;
/// Byte offset of an array's length field within its payload.
const ARR_LENGTH: u16 = 2;

/// Byte offset of a property group's `next` pointer.
const PROPS_NEXT: u16 = 0;
/// Byte offset of a property group's prototype pointer.
const PROPS_PROTO: u16 = 2;
/// Byte offset of the first key/value pair.
const PROPS_PAIRS: u16 = 4;

/// Normalize a value into a property name: a non-negative int14 or an
/// interned string.
///
/// May allocate (interning a plain heap string); callers keep their other
/// operands rooted on the stack across this call.
pub(crate) fn to_property_name(vm: &mut Vm, value: Value) -> Result<Value, Error> {
    match vm.deep_type_of(value) {
        TypeCode::ValInt14 => {
            if value.int14_value() < 0 {
                return Err(Error::RangeError);
            }
            Ok(value)
        }
        TypeCode::InternedString | TypeCode::ValStrLength | TypeCode::ValStrProto => Ok(value),
        // 32-bit numbers are beyond the supported index range
        TypeCode::Int32 => Err(Error::RangeError),
        TypeCode::String => {
            // A plain string in ROM would only exist because it encodes a
            // number, which is an illegal property name
            if !value.is_short_ptr() {
                return Err(Error::TypeError);
            }
            if strings::ram_string_is_nonnegative_integer(vm, value) {
                return Err(Error::TypeError);
            }
            Ok(strings::to_interned_string(vm, value))
        }
        _ => Err(Error::TypeError),
    }
}

/// Property lookup with a pre-normalized key. Does not allocate.
pub(crate) fn get_property_value(vm: &Vm, object: Value, key: Value) -> Result<Value, Error> {
    match vm.deep_type_of(object) {
        TypeCode::PropertyList => {
            if key == Value::STR_PROTO {
                return Err(Error::NotImplemented);
            }
            let mut group = vm.decode_ptr(object);
            let mut proto = group
                .map(|lp| Value::from_raw(vm.lp_read_u16(lp.add(PROPS_PROTO))))
                .unwrap_or(Value::NULL);

            while let Some(lp) = group {
                let size = type_code::header_size(vm.lp_header(lp));
                let pair_count = (size - PROPS_PAIRS) / 4;
                for i in 0..pair_count {
                    let at = lp.add(PROPS_PAIRS + i * 4);
                    if Value::from_raw(vm.lp_read_u16(at)) == key {
                        return Ok(Value::from_raw(vm.lp_read_u16(at.add(2))));
                    }
                }
                let next = Value::from_raw(vm.lp_read_u16(lp.add(PROPS_NEXT)));
                if !next.is_null() {
                    group = vm.decode_ptr(next);
                } else {
                    // End of this object's chain: continue into the
                    // prototype retained from its head group
                    group = vm.decode_ptr(proto);
                    if let Some(parent) = group {
                        proto = Value::from_raw(vm.lp_read_u16(parent.add(PROPS_PROTO)));
                    }
                }
            }
            Ok(Value::UNDEFINED)
        }

        TypeCode::Array => {
            let lp = vm
                .decode_ptr(object)
                .unwrap_or_else(|| port::fatal_error(Error::Unexpected));
            let vi_length = Value::from_raw(vm.lp_read_u16(lp.add(ARR_LENGTH)));
            debug_assert!(vi_length.is_int14());
            if key == Value::STR_LENGTH {
                return Ok(vi_length);
            }
            if key == Value::STR_PROTO {
                return Ok(vm.get_builtin(Builtin::ArrayProto));
            }
            if key.is_int14() {
                let index = key.int14_value();
                if index < 0 {
                    return Err(Error::InvalidArrayIndex);
                }
                let length = vi_length.int14_value() as u16;
                if index as u16 >= length {
                    return Ok(Value::UNDEFINED);
                }
                let data = Value::from_raw(vm.lp_read_u16(lp.add(ARR_DATA)));
                let lp_data = vm
                    .decode_ptr(data)
                    .unwrap_or_else(|| port::fatal_error(Error::Unexpected));
                let value = Value::from_raw(vm.lp_read_u16(lp_data.add(index as u16 * 2)));
                return Ok(if value.is_deleted() { Value::UNDEFINED } else { value });
            }
            // Delegate other keys to the array prototype, if configured
            let proto = vm.get_builtin(Builtin::ArrayProto);
            if proto.is_null() {
                Ok(Value::UNDEFINED)
            } else {
                get_property_value(vm, proto, key)
            }
        }

        _ => Err(Error::TypeError),
    }
}

/// Property lookup with operands in stack slots (object below key).
pub(crate) fn get_property(vm: &mut Vm, obj_slot: u16, key_slot: u16) -> Result<Value, Error> {
    let key = to_property_name(vm, vm.stack_word(key_slot))?;
    vm.set_stack_word(key_slot, key);
    get_property_value(vm, vm.stack_word(obj_slot), key)
}

/// Property lookup with an instruction-literal key. Literal keys come
/// from the image (an int14 or a ROM interned string), so normalizing
/// them never allocates and the object needs no stack anchoring.
pub(crate) fn get_property_literal(vm: &mut Vm, object: Value, key: Value) -> Result<Value, Error> {
    debug_assert!(!key.is_short_ptr());
    let key = to_property_name(vm, key)?;
    get_property_value(vm, object, key)
}

/// Property store with operands in consecutive stack slots: object at
/// `base_slot`, then key, then value. All three stay on the stack until
/// the operation completes.
pub(crate) fn set_property(vm: &mut Vm, base_slot: u16) -> Result<(), Error> {
    debug_assert!(!vm.using_cached_registers());

    let key = to_property_name(vm, vm.stack_word(base_slot + 1))?;
    vm.set_stack_word(base_slot + 1, key);

    let object = vm.stack_word(base_slot);
    match vm.deep_type_of(object) {
        TypeCode::PropertyList => {
            if key == Value::STR_PROTO {
                return Err(Error::NotImplemented);
            }
            // Writable objects are always in RAM
            let mut group = writable_ptr(vm, object)?;
            loop {
                let size = vm.heap.size_of(group);
                let pair_count = (size - PROPS_PAIRS) / 4;
                for i in 0..pair_count {
                    let at = group.offset() + PROPS_PAIRS + i * 4;
                    if vm.heap.read_u16(at) == key.raw() {
                        let value = vm.stack_word(base_slot + 2);
                        vm.heap.write_u16(at + 2, value.raw());
                        return Ok(());
                    }
                }
                let next = Value::from_raw(vm.heap.read_u16(group.offset() + PROPS_NEXT));
                if next.is_null() {
                    break;
                }
                group = writable_ptr(vm, next)?;
            }

            // New property: append a single-pair group. The allocation may
            // collect and compact the chain, so re-walk from the object
            // afterwards.
            let cell = heap::allocate(vm, 8, TypeCode::PropertyList);
            let key = vm.stack_word(base_slot + 1);
            let value = vm.stack_word(base_slot + 2);
            let mut group = writable_ptr(vm, vm.stack_word(base_slot))?;
            loop {
                let next = Value::from_raw(vm.heap.read_u16(group.offset() + PROPS_NEXT));
                if next.is_null() {
                    break;
                }
                group = writable_ptr(vm, next)?;
            }
            vm.heap.write_u16(cell.offset() + PROPS_NEXT, Value::NULL.raw());
            vm.heap.write_u16(cell.offset() + PROPS_PROTO, Value::NULL.raw());
            vm.heap.write_u16(cell.offset() + PROPS_PAIRS, key.raw());
            vm.heap.write_u16(cell.offset() + PROPS_PAIRS + 2, value.raw());
            vm.heap
                .write_u16(group.offset() + PROPS_NEXT, cell.to_value().raw());
            Ok(())
        }

        TypeCode::Array => {
            let arr = writable_ptr(vm, object)?;
            let vi_length = Value::from_raw(vm.heap.read_u16(arr.offset() + ARR_LENGTH));
            debug_assert!(vi_length.is_int14());
            let old_length = vi_length.int14_value() as u16;
            let data = Value::from_raw(vm.heap.read_u16(arr.offset() + ARR_DATA));
            let old_capacity = if data.is_null() {
                0
            } else {
                vm.heap.size_of(ShortPtr::from_value(data)) / 2
            };

            if key == Value::STR_LENGTH {
                let value = vm.stack_word(base_slot + 2);
                if !value.is_int14() || value.int14_value() < 0 {
                    return Err(Error::TypeError);
                }
                let new_length = value.int14_value() as u16;
                if new_length < old_length {
                    // Wipe the no-longer-reachable slots
                    let data_ptr = ShortPtr::from_value(data);
                    for i in new_length..old_length {
                        vm.heap
                            .write_u16(data_ptr.offset() + i * 2, Value::DELETED.raw());
                    }
                    vm.heap
                        .write_u16(arr.offset() + ARR_LENGTH, Value::int14(new_length as i16).raw());
                } else if new_length == old_length {
                    // Nothing to do
                } else if new_length <= old_capacity {
                    // The uncovered slots already hold the hole marker
                    vm.heap
                        .write_u16(arr.offset() + ARR_LENGTH, Value::int14(new_length as i16).raw());
                } else {
                    // Direct length assignment: grow to exactly the new
                    // length
                    grow_array(vm, base_slot, new_length, new_length);
                }
                Ok(())
            } else if key == Value::STR_PROTO {
                Err(Error::ProtoIsReadonly)
            } else if key.is_int14() {
                let index = key.int14_value();
                if index < 0 {
                    return Err(Error::InvalidArrayIndex);
                }
                let index = index as u16;
                let mut arr = arr;
                if index >= old_length {
                    let new_length = index + 1;
                    if index < old_capacity {
                        vm.heap.write_u16(
                            arr.offset() + ARR_LENGTH,
                            Value::int14(new_length as i16).raw(),
                        );
                    } else {
                        // Exponential growth: this is the push/assign-in-a-
                        // loop path
                        let new_capacity = (old_capacity * 2).max(4).max(new_length);
                        grow_array(vm, base_slot, new_length, new_capacity);
                        arr = writable_ptr(vm, vm.stack_word(base_slot))?;
                    }
                }
                let data = Value::from_raw(vm.heap.read_u16(arr.offset() + ARR_DATA));
                debug_assert!(data.is_short_ptr());
                let data_ptr = ShortPtr::from_value(data);
                let value = vm.stack_word(base_slot + 2);
                vm.heap.write_u16(data_ptr.offset() + index * 2, value.raw());
                Ok(())
            } else {
                Err(Error::InvalidArrayIndex)
            }
        }

        _ => Err(Error::TypeError),
    }
}

/// Grow an array's backing to `new_capacity` slots and set its length.
///
/// The array is identified by a stack slot because the backing allocation
/// can collect and move it.
fn grow_array(vm: &mut Vm, obj_slot: u16, new_length: u16, new_capacity: u16) {
    debug_assert!(!vm.using_cached_registers());
    debug_assert!(new_capacity >= new_length);
    if new_capacity > type_code::MAX_ALLOCATION_SIZE / 2 {
        port::fatal_error(Error::ArrayTooLong);
    }
    debug_assert!(new_capacity != 0);

    let new_data = heap::allocate(vm, new_capacity * 2, TypeCode::FixedLengthArray);

    // The allocation may have moved the array; re-read it
    let arr = match vm.decode_ptr(vm.stack_word(obj_slot)) {
        Some(LongPtr::Heap(p)) => p,
        _ => port::fatal_error(Error::Unexpected),
    };
    let old_data = Value::from_raw(vm.heap.read_u16(arr.offset() + ARR_DATA));
    let mut old_capacity = 0;
    if !old_data.is_null() {
        let old_ptr = ShortPtr::from_value(old_data);
        let old_size = vm.heap.size_of(old_ptr);
        debug_assert!(old_size & 1 == 0);
        old_capacity = old_size / 2;
        for i in 0..old_capacity {
            let word = vm.heap.read_u16(old_ptr.offset() + i * 2);
            vm.heap.write_u16(new_data.offset() + i * 2, word);
        }
    }
    debug_assert!(new_capacity >= old_capacity);
    for i in old_capacity..new_capacity {
        vm.heap
            .write_u16(new_data.offset() + i * 2, Value::DELETED.raw());
    }
    vm.heap
        .write_u16(arr.offset() + ARR_DATA, new_data.to_value().raw());
    vm.heap
        .write_u16(arr.offset() + ARR_LENGTH, Value::int14(new_length as i16).raw());
}

/// Decode a pointer that must land in RAM for a write.
fn writable_ptr(vm: &Vm, value: Value) -> Result<ShortPtr, Error> {
    match vm.decode_ptr(value) {
        Some(LongPtr::Heap(p)) => Ok(p),
        Some(LongPtr::Rom(_)) => Err(Error::AttemptToWriteToRom),
        None => port::fatal_error(Error::Unexpected),
    }
}
