// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! The numeric sub-instruction table.
//!
//! Every operation first attempts an int32 implementation; on overflow or
//! on operands that don't convert to int32, it falls through to the
//! float64 path. Division and exponentiation always take the float path.
//! In an integer-only build the overflow checks are dropped (wrapping
//! semantics) and the float path is the `OperationRequiresFloatSupport`
//! error, matching the build-flag semantics of the image format.
//!
//! Operands are converted to native numbers before the result is
//! allocated, so the collector cannot invalidate them mid-operation.

use ember_abi::opcodes::num_op;

use crate::error::Error;
use crate::value::convert;
use crate::value::Value;
use crate::vm::Vm;

#[cfg(feature = "float")]
use num_traits::Float;

/// Apply a numeric operation. `left` is ignored for unary operations.
pub(crate) fn apply(vm: &mut Vm, op: u8, left: Value, right: Value) -> Result<Value, Error> {
    debug_assert!(!vm.using_cached_registers());
    let unary = op >= num_op::DIVIDER;

    'float64: {
        let left_int = if unary {
            0
        } else {
            match convert::to_int32_internal(vm, left) {
                Ok(n) => n,
                Err(Error::Float64 | Error::NanValue | Error::NegZero) => {
                    if cfg!(feature = "float") {
                        break 'float64;
                    }
                    // Integer-only builds ignore inconvertible operands
                    0
                }
                Err(e) => return Err(e),
            }
        };
        let right_int = match convert::to_int32_internal(vm, right) {
            Ok(n) => n,
            Err(Error::Float64 | Error::NanValue | Error::NegZero) => {
                if cfg!(feature = "float") {
                    break 'float64;
                }
                0
            }
            Err(e) => return Err(e),
        };

        let result = match op {
            num_op::LESS_THAN => return Ok(Value::bool(left_int < right_int)),
            num_op::GREATER_THAN => return Ok(Value::bool(left_int > right_int)),
            num_op::LESS_EQUAL => return Ok(Value::bool(left_int <= right_int)),
            num_op::GREATER_EQUAL => return Ok(Value::bool(left_int >= right_int)),
            num_op::ADD_NUM => match int_add(left_int, right_int) {
                Some(n) => n,
                None => break 'float64,
            },
            num_op::SUBTRACT => match int_sub(left_int, right_int) {
                Some(n) => n,
                None => break 'float64,
            },
            num_op::MULTIPLY => match int_mul(left_int, right_int) {
                Some(n) => n,
                None => break 'float64,
            },
            num_op::DIVIDE | num_op::POWER => {
                // Integer forms are not provided; these always take the
                // float path
                if cfg!(feature = "float") {
                    break 'float64;
                }
                return Err(Error::OperationRequiresFloatSupport);
            }
            num_op::DIVIDE_AND_TRUNC => {
                if right_int == 0 {
                    0
                } else {
                    left_int.wrapping_div(right_int)
                }
            }
            num_op::REMAINDER => {
                if right_int == 0 {
                    return Ok(Value::NAN);
                }
                left_int.wrapping_rem(right_int)
            }
            num_op::NEGATE => {
                // Zero negates to negative zero and i32::MIN overflows;
                // neither is representable as an int32
                if cfg!(feature = "float") && (right_int == 0 || right_int == i32::MIN) {
                    break 'float64;
                }
                right_int.wrapping_neg()
            }
            num_op::UNARY_PLUS => right_int,
            _ => return Err(Error::InvalidBytecode),
        };
        return Ok(convert::new_int32(vm, result));
    }

    apply_float64(vm, op, left, right, unary)
}

#[cfg(feature = "float")]
fn apply_float64(vm: &mut Vm, op: u8, left: Value, right: Value, unary: bool) -> Result<Value, Error> {
    let left_f = if unary {
        0.0
    } else {
        convert::to_float64(vm, left)
    };
    let right_f = convert::to_float64(vm, right);

    let result = match op {
        num_op::LESS_THAN => return Ok(Value::bool(left_f < right_f)),
        num_op::GREATER_THAN => return Ok(Value::bool(left_f > right_f)),
        num_op::LESS_EQUAL => return Ok(Value::bool(left_f <= right_f)),
        num_op::GREATER_EQUAL => return Ok(Value::bool(left_f >= right_f)),
        num_op::ADD_NUM => left_f + right_f,
        num_op::SUBTRACT => left_f - right_f,
        num_op::MULTIPLY => left_f * right_f,
        num_op::DIVIDE => left_f / right_f,
        num_op::DIVIDE_AND_TRUNC => {
            let truncated = convert::float64_to_int32(left_f / right_f);
            return Ok(convert::new_int32(vm, truncated));
        }
        num_op::REMAINDER => {
            if right_f == 0.0 {
                return Ok(Value::NAN);
            }
            left_f % right_f
        }
        num_op::POWER => {
            // ±1 to an infinite power is NaN, which powf does not produce
            // on all targets
            if !right_f.is_finite() && (left_f == 1.0 || left_f == -1.0) {
                return Ok(Value::NAN);
            }
            Float::powf(left_f, right_f)
        }
        num_op::NEGATE => -right_f,
        num_op::UNARY_PLUS => right_f,
        _ => return Err(Error::InvalidBytecode),
    };
    Ok(convert::new_number(vm, result))
}

#[cfg(not(feature = "float"))]
fn apply_float64(
    _vm: &mut Vm,
    _op: u8,
    _left: Value,
    _right: Value,
    _unary: bool,
) -> Result<Value, Error> {
    Err(Error::OperationRequiresFloatSupport)
}

fn int_add(left: i32, right: i32) -> Option<i32> {
    if cfg!(feature = "float") {
        left.checked_add(right)
    } else {
        Some(left.wrapping_add(right))
    }
}

fn int_sub(left: i32, right: i32) -> Option<i32> {
    if cfg!(feature = "float") {
        left.checked_sub(right)
    } else {
        Some(left.wrapping_sub(right))
    }
}

fn int_mul(left: i32, right: i32) -> Option<i32> {
    if cfg!(feature = "float") {
        left.checked_mul(right)
    } else {
        Some(left.wrapping_mul(right))
    }
}
