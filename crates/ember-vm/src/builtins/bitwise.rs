// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! The bitwise sub-instruction table.
//!
//! All operations work on int32 in two's complement; shift amounts are
//! masked to the low 5 bits. The one exception to int32 results is a
//! logical shift right by zero of a negative number, which re-reads the
//! bit pattern as unsigned and must therefore promote to float64.

use ember_abi::opcodes::bit_op;

use crate::error::Error;
use crate::value::convert;
use crate::value::Value;
use crate::vm::Vm;

/// Apply a bitwise operation. `left` is `None` for the unary NOT.
pub(crate) fn apply(vm: &mut Vm, op: u8, left: Option<Value>, right: Value) -> Result<Value, Error> {
    debug_assert!(!vm.using_cached_registers());
    debug_assert_eq!(left.is_none(), op >= bit_op::DIVIDER_2);

    let right_int = convert::to_int32(vm, right);
    let left_int = left.map(|v| convert::to_int32(vm, v)).unwrap_or(0);
    let shift = (right_int & 0x1F) as u32;

    let result = match op {
        bit_op::SHR_ARITHMETIC => left_int >> shift,
        bit_op::SHR_LOGICAL => {
            let logical = ((left_int as u32) >> shift) as i32;
            // A zero-unit shift of a negative number yields a value above
            // i32::MAX, which only a float can carry
            #[cfg(feature = "float")]
            if shift == 0 && logical < 0 {
                return Ok(convert::new_number(vm, f64::from(left_int as u32)));
            }
            logical
        }
        bit_op::SHL => left_int.wrapping_shl(shift),
        bit_op::OR => left_int | right_int,
        bit_op::AND => left_int & right_int,
        bit_op::XOR => left_int ^ right_int,
        bit_op::NOT => !right_int,
        _ => return Err(Error::InvalidBytecode),
    };
    Ok(convert::new_int32(vm, result))
}
