// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Numeric constructors and conversions.
//!
//! Constructors maintain the canonical-encoding invariant: integers in the
//! int14 range are never boxed, int32-representable floats collapse to
//! integer encodings, and NaN/−0 map to their well-known sentinels.
//! Equality depends on this normalization.

use ember_abi::encoding::{MAX_INT14, MIN_INT14};
use ember_abi::type_code::TypeCode;

use crate::error::Error;
use crate::heap;
use crate::port;
use crate::value::Value;
use crate::vm::Vm;

/// Construct an integer value: int14 when it fits, boxed Int32 otherwise.
pub(crate) fn new_int32(vm: &mut Vm, value: i32) -> Value {
    if (MIN_INT14..=MAX_INT14).contains(&value) {
        return Value::int14(value as i16);
    }
    let ptr = heap::allocate(vm, 4, TypeCode::Int32);
    vm.heap.write_u16(ptr.offset(), value as u16);
    vm.heap.write_u16(ptr.offset() + 2, (value >> 16) as u16);
    ptr.to_value()
}

/// Truncate a float64 toward zero into an int32; non-finite values map to
/// zero.
#[cfg(feature = "float")]
#[must_use]
pub(crate) fn float64_to_int32(value: f64) -> i32 {
    if value.is_finite() { value as i32 } else { 0 }
}

/// Construct a number value with canonical normalization.
#[cfg(feature = "float")]
pub(crate) fn new_number(vm: &mut Vm, value: f64) -> Value {
    if value.is_nan() {
        return Value::NAN;
    }
    if value == 0.0 && value.is_sign_negative() {
        return Value::NEG_ZERO;
    }
    // Collapse to an integer encoding whenever the float is exactly an
    // int32
    let as_int = float64_to_int32(value);
    if value == f64::from(as_int) {
        return new_int32(vm, as_int);
    }
    let ptr = heap::allocate(vm, 8, TypeCode::Float64);
    vm.heap
        .bytes_mut(ptr.offset(), 8)
        .copy_from_slice(&value.to_le_bytes());
    ptr.to_value()
}

/// Read a numeric value known to be an int14 or boxed Int32.
pub(crate) fn read_int32(vm: &Vm, tc: TypeCode, value: Value) -> i32 {
    match tc {
        TypeCode::ValInt14 => i32::from(value.int14_value()),
        TypeCode::Int32 => {
            let lp = vm
                .decode_ptr(value)
                .unwrap_or_else(|| port::fatal_error(Error::Unexpected));
            let lo = u32::from(vm.lp_read_u16(lp));
            let hi = u32::from(vm.lp_read_u16(lp.add(2)));
            (lo | (hi << 16)) as i32
        }
        _ => port::fatal_error(Error::Unexpected),
    }
}

/// Read a boxed float64.
#[cfg(feature = "float")]
pub(crate) fn read_float64(vm: &Vm, value: Value) -> f64 {
    debug_assert_eq!(vm.deep_type_of(value), TypeCode::Float64);
    let lp = vm
        .decode_ptr(value)
        .unwrap_or_else(|| port::fatal_error(Error::Unexpected));
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(vm.lp_bytes(lp, 8));
    f64::from_le_bytes(bytes)
}

/// Core int32 conversion.
///
/// `Err(Error::Float64)` signals a boxed float operand (the caller takes
/// the float path); `Err(Error::NanValue)` / `Err(Error::NegZero)` signal
/// the canonical NaN/−0 results. Reserved type codes are fatal.
pub(crate) fn to_int32_internal(vm: &Vm, value: Value) -> Result<i32, Error> {
    let tc = vm.deep_type_of(value);
    match tc {
        TypeCode::ValInt14 | TypeCode::Int32 => Ok(read_int32(vm, tc, value)),
        TypeCode::Float64 => Err(Error::Float64),
        TypeCode::String
        | TypeCode::InternedString
        | TypeCode::ValStrLength
        | TypeCode::ValStrProto => Err(Error::NotImplemented),
        TypeCode::PropertyList
        | TypeCode::Array
        | TypeCode::FixedLengthArray
        | TypeCode::Function
        | TypeCode::HostFunc
        | TypeCode::Closure
        | TypeCode::Class
        | TypeCode::Symbol => Err(Error::NanValue),
        TypeCode::ValUndefined | TypeCode::ValNan | TypeCode::ValDeleted => Err(Error::NanValue),
        TypeCode::ValNegZero => Err(Error::NegZero),
        TypeCode::ValNull | TypeCode::ValFalse => Ok(0),
        TypeCode::ValTrue => Ok(1),
        TypeCode::Tombstone
        | TypeCode::Reserved7
        | TypeCode::Virtual
        | TypeCode::ReservedB => port::fatal_error(Error::Unexpected),
    }
}

/// Convert to int32, truncating floats and mapping NaN/−0 to zero.
pub(crate) fn to_int32(vm: &Vm, value: Value) -> i32 {
    match to_int32_internal(vm, value) {
        Ok(n) => n,
        Err(Error::NanValue | Error::NegZero | Error::NotImplemented) => 0,
        Err(_) => {
            #[cfg(feature = "float")]
            {
                float64_to_int32(read_float64(vm, value))
            }
            #[cfg(not(feature = "float"))]
            {
                0
            }
        }
    }
}

/// Convert to float64.
#[cfg(feature = "float")]
pub(crate) fn to_float64(vm: &Vm, value: Value) -> f64 {
    match to_int32_internal(vm, value) {
        Ok(n) => f64::from(n),
        Err(Error::NanValue | Error::NotImplemented) => f64::NAN,
        Err(Error::NegZero) => -0.0,
        Err(_) => read_float64(vm, value),
    }
}

/// Truthiness of a value.
pub(crate) fn to_bool(vm: &Vm, value: Value) -> bool {
    let tc = vm.deep_type_of(value);
    match tc {
        TypeCode::ValInt14 => value != Value::int14(0),
        // A boxed number is never zero (zero encodes as an int14)
        TypeCode::Int32 | TypeCode::Float64 => false,
        TypeCode::String | TypeCode::InternedString => {
            crate::builtins::strings::string_size(vm, value) != 0
        }
        TypeCode::PropertyList
        | TypeCode::Array
        | TypeCode::FixedLengthArray
        | TypeCode::Function
        | TypeCode::HostFunc
        | TypeCode::Closure
        | TypeCode::Symbol => true,
        TypeCode::ValStrLength | TypeCode::ValStrProto | TypeCode::ValTrue => true,
        TypeCode::ValUndefined
        | TypeCode::ValNull
        | TypeCode::ValFalse
        | TypeCode::ValNan
        | TypeCode::ValNegZero
        | TypeCode::ValDeleted => false,
        TypeCode::Tombstone
        | TypeCode::Reserved7
        | TypeCode::Class
        | TypeCode::Virtual
        | TypeCode::ReservedB => port::fatal_error(Error::Unexpected),
    }
}
