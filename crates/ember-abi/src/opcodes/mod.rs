// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! The instruction set.
//!
//! An instruction starts with one byte holding two nibbles: the primary
//! opcode in the high nibble and a secondary nibble that is either a 4-bit
//! immediate or an index into one of the extended tables.
//!
//! - [`op`]: primary opcodes. From [`op::DIVIDER_1`] onward the dispatcher
//!   pops one operand before the handler runs.
//! - [`op1`]: extended table 1, no immediate. From [`op1::DIVIDER_1`] onward
//!   operations take at least two stack arguments.
//! - [`op2`]: extended table 2, one 8-bit immediate. Below
//!   [`op2::DIVIDER_1`] the dispatcher pops one operand after reading the
//!   immediate.
//! - [`op3`]: extended table 3. From [`op3::DIVIDER_1`] onward the
//!   dispatcher reads a 16-bit immediate; from [`op3::DIVIDER_2`] onward it
//!   also pops one operand.
//! - [`num_op`] / [`bit_op`]: arithmetic and bitwise sub-tables dispatched
//!   by [`op::NUM_OP`] / [`op::BIT_OP`].
//! - [`small_lit`]: the 12-entry small-literal table of
//!   [`op::LOAD_SMALL_LITERAL`].

#[cfg(test)]
mod opcodes_test;

/// Pack a primary opcode and secondary nibble into an instruction byte.
#[inline]
#[must_use]
pub const fn instr(primary: u8, secondary: u8) -> u8 {
    (primary << 4) | (secondary & 0xF)
}

/// Primary opcode (high nibble) of an instruction byte.
#[inline]
#[must_use]
pub const fn primary(byte: u8) -> u8 {
    byte >> 4
}

/// Secondary nibble (low nibble) of an instruction byte.
#[inline]
#[must_use]
pub const fn secondary(byte: u8) -> u8 {
    byte & 0xF
}

/// Primary opcodes.
pub mod op {
    /// Push `small_lit` table entry (index in nibble).
    pub const LOAD_SMALL_LITERAL: u8 = 0x0;
    /// Push stack slot `sp[-n-1]` (4-bit index); `deleted` raises a TDZ
    /// error.
    pub const LOAD_VAR_1: u8 = 0x1;
    /// Push closure-scoped variable (4-bit index).
    pub const LOAD_SCOPED_1: u8 = 0x2;
    /// Push argument (4-bit index), `undefined` past the end.
    pub const LOAD_ARG_1: u8 = 0x3;
    /// Call through the short-call table (4-bit entry index).
    pub const CALL_1: u8 = 0x4;
    /// New fixed-length array (4-bit length), slots `deleted`.
    pub const FIXED_ARRAY_NEW_1: u8 = 0x5;
    /// Dispatch into [`super::op1`].
    pub const EXTENDED_1: u8 = 0x6;
    /// Dispatch into [`super::op2`].
    pub const EXTENDED_2: u8 = 0x7;
    /// Dispatch into [`super::op3`].
    pub const EXTENDED_3: u8 = 0x8;
    /// Call bytecode function at 16-bit offset; arg count in nibble.
    pub const CALL_5: u8 = 0x9;
    /// Store popped value to stack slot `sp[-n-1]`.
    pub const STORE_VAR_1: u8 = 0xA;
    /// Store popped value to closure-scoped variable (must be in RAM).
    pub const STORE_SCOPED_1: u8 = 0xB;
    /// Indexed load from a fixed-length array (4-bit index).
    pub const ARRAY_GET_1: u8 = 0xC;
    /// Indexed store to a fixed-length array (4-bit index; RAM only).
    pub const ARRAY_SET_1: u8 = 0xD;
    /// Dispatch into [`super::num_op`].
    pub const NUM_OP: u8 = 0xE;
    /// Dispatch into [`super::bit_op`].
    pub const BIT_OP: u8 = 0xF;

    /// Opcodes at or above this pop one operand before dispatch.
    pub const DIVIDER_1: u8 = STORE_VAR_1;
}

/// Extended table 1 (no immediate).
pub mod op1 {
    /// Pop and return the result to the caller.
    pub const RETURN: u8 = 0x0;
    /// Pop the thrown value; the call fails with an uncaught exception.
    pub const THROW: u8 = 0x1;
    /// Pop a callable, capture the current scope, push a new closure.
    pub const CLOSURE_NEW: u8 = 0x2;
    /// Reserved for class construction.
    pub const RESERVED_CLASS_NEW: u8 = 0x3;
    /// Reserved for virtual-object construction.
    pub const RESERVED_VIRTUAL_NEW: u8 = 0x4;
    /// Read a count byte, push a new scope of that many slots linked to the
    /// current scope.
    pub const SCOPE_PUSH: u8 = 0x5;
    /// Pop a value, push its type as a small integer.
    pub const TYPE_CODE_OF: u8 = 0x6;
    /// Discard the top of stack.
    pub const POP: u8 = 0x7;
    /// Replace the top of stack with its `typeof` string.
    pub const TYPEOF: u8 = 0x8;
    /// Push a new empty object.
    pub const OBJECT_NEW: u8 = 0x9;
    /// Pop a value, push its boolean negation.
    pub const LOGICAL_NOT: u8 = 0xA;
    /// Pop key and object, push the property value.
    pub const OBJECT_GET_1: u8 = 0xB;
    /// Add top two stack values (number add or string concat).
    pub const ADD: u8 = 0xC;
    /// Pop two values, push equality result.
    pub const EQUAL: u8 = 0xD;
    /// Top two values replaced by their inequality result.
    pub const NOT_EQUAL: u8 = 0xE;
    /// Object/key/value on stack; stores and pops all three.
    pub const OBJECT_SET_1: u8 = 0xF;

    /// Operations at or above this take at least two stack arguments.
    pub const DIVIDER_1: u8 = OBJECT_GET_1;
}

/// Extended table 2 (8-bit immediate in `reg1`).
pub mod op2 {
    /// Branch by signed 8-bit offset if the popped predicate is truthy.
    pub const BRANCH_1: u8 = 0x0;
    /// Store the popped value into argument slot `imm`.
    pub const STORE_ARG: u8 = 0x1;
    /// Store the popped value into scoped variable `imm`.
    pub const STORE_SCOPED_2: u8 = 0x2;
    /// Store the popped value into stack slot `sp[-imm-1]`.
    pub const STORE_VAR_2: u8 = 0x3;
    /// Reserved (struct field load).
    pub const RESERVED_STRUCT_GET_2: u8 = 0x4;
    /// Reserved (struct field store).
    pub const RESERVED_STRUCT_SET_2: u8 = 0x5;
    /// Jump by signed 8-bit offset.
    pub const JUMP_1: u8 = 0x6;
    /// Call a host import: arg count in `imm`, import index in the next
    /// byte.
    pub const CALL_HOST: u8 = 0x7;
    /// Call a dynamic target pushed before the args; arg count in `imm`.
    pub const CALL_3: u8 = 0x8;
    /// Call through the short-call table (8-bit entry index).
    pub const CALL_6: u8 = 0x9;
    /// Push scoped variable `imm`.
    pub const LOAD_SCOPED_2: u8 = 0xA;
    /// Push stack slot `sp[-imm-1]`.
    pub const LOAD_VAR_2: u8 = 0xB;
    /// Push argument `imm`.
    pub const LOAD_ARG_2: u8 = 0xC;
    /// Reserved.
    pub const RESERVED_D: u8 = 0xD;
    /// Push a new dynamic array with capacity `imm`.
    pub const ARRAY_NEW: u8 = 0xE;
    /// New fixed-length array (8-bit length).
    pub const FIXED_ARRAY_NEW_2: u8 = 0xF;

    /// Operations below this pop one operand after the immediate is read.
    pub const DIVIDER_1: u8 = JUMP_1;
}

/// Extended table 3 (16-bit immediate in `reg1` for most operations).
pub mod op3 {
    /// Read a count byte and pop that many values.
    pub const POP_N: u8 = 0x0;
    /// Current scope becomes its parent (slot 0).
    pub const SCOPE_POP: u8 = 0x1;
    /// Clone the current scope and rebind to the copy.
    pub const SCOPE_CLONE: u8 = 0x2;
    /// Reserved (long jump).
    pub const RESERVED_LONG_JMP: u8 = 0x3;
    /// Reserved.
    pub const RESERVED_5: u8 = 0x5;
    /// Reserved (set jump).
    pub const RESERVED_SET_JMP: u8 = 0x6;
    /// Jump by signed 16-bit offset.
    pub const JUMP_2: u8 = 0x7;
    /// Push the 16-bit immediate as a literal value.
    pub const LOAD_LITERAL: u8 = 0x8;
    /// Push global slot `imm`.
    pub const LOAD_GLOBAL_3: u8 = 0x9;
    /// Push scoped variable `imm`.
    pub const LOAD_SCOPED_3: u8 = 0xA;
    /// Branch by signed 16-bit offset if the popped predicate is truthy.
    pub const BRANCH_2: u8 = 0xB;
    /// Store the popped value into global slot `imm`.
    pub const STORE_GLOBAL_3: u8 = 0xC;
    /// Store the popped value into scoped variable `imm`.
    pub const STORE_SCOPED_3: u8 = 0xD;
    /// Pop an object, push property `imm` (a literal key value).
    pub const OBJECT_GET_2: u8 = 0xE;
    /// Pop value and object, store property `imm`.
    pub const OBJECT_SET_2: u8 = 0xF;

    /// Operations at or above this read a 16-bit immediate.
    pub const DIVIDER_1: u8 = 0x4;

    /// Operations at or above this also pop one operand.
    pub const DIVIDER_2: u8 = BRANCH_2;
}

/// Numeric sub-operations of [`op::NUM_OP`].
pub mod num_op {
    /// `a < b`
    pub const LESS_THAN: u8 = 0x0;
    /// `a > b`
    pub const GREATER_THAN: u8 = 0x1;
    /// `a <= b`
    pub const LESS_EQUAL: u8 = 0x2;
    /// `a >= b`
    pub const GREATER_EQUAL: u8 = 0x3;
    /// Numeric addition (int32 fast path, float64 fallback).
    pub const ADD_NUM: u8 = 0x4;
    /// Subtraction.
    pub const SUBTRACT: u8 = 0x5;
    /// Multiplication.
    pub const MULTIPLY: u8 = 0x6;
    /// Division; always the float64 path.
    pub const DIVIDE: u8 = 0x7;
    /// `(a / b) | 0`; integer division by zero yields 0.
    pub const DIVIDE_AND_TRUNC: u8 = 0x8;
    /// Remainder; integer remainder by zero yields NaN.
    pub const REMAINDER: u8 = 0x9;
    /// Exponentiation; always the float64 path.
    pub const POWER: u8 = 0xA;
    /// `-a`
    pub const NEGATE: u8 = 0xB;
    /// `+a`
    pub const UNARY_PLUS: u8 = 0xC;

    /// Operations at or above this are unary.
    pub const DIVIDER: u8 = NEGATE;
}

/// Bitwise sub-operations of [`op::BIT_OP`]. All operate on int32 in two's
/// complement; shift amounts are masked to 5 bits.
pub mod bit_op {
    /// Sign-propagating shift right.
    pub const SHR_ARITHMETIC: u8 = 0x0;
    /// Zero-fill shift right. Shifting a negative number by zero promotes
    /// the result to float64.
    pub const SHR_LOGICAL: u8 = 0x1;
    /// Shift left.
    pub const SHL: u8 = 0x2;
    /// Bitwise OR.
    pub const OR: u8 = 0x3;
    /// Bitwise AND.
    pub const AND: u8 = 0x4;
    /// Bitwise XOR.
    pub const XOR: u8 = 0x5;
    /// Bitwise NOT (unary).
    pub const NOT: u8 = 0x6;

    /// Operations below this are shifts (operand masked to 0..31).
    pub const END_OF_SHIFTS: u8 = SHL + 1;

    /// Operations at or above this are unary.
    pub const DIVIDER_2: u8 = NOT;
}

/// Small-literal table of [`op::LOAD_SMALL_LITERAL`], indexed by the
/// secondary nibble.
pub mod small_lit {
    /// The `deleted` marker.
    pub const DELETED: u8 = 0x0;
    /// `undefined`
    pub const UNDEFINED: u8 = 0x1;
    /// `null`
    pub const NULL: u8 = 0x2;
    /// `false`
    pub const FALSE: u8 = 0x3;
    /// `true`
    pub const TRUE: u8 = 0x4;
    /// Integer −1.
    pub const INT_MINUS_1: u8 = 0x5;
    /// Integer 0.
    pub const INT_0: u8 = 0x6;
    /// Integer 1.
    pub const INT_1: u8 = 0x7;
    /// Integer 2.
    pub const INT_2: u8 = 0x8;
    /// Integer 3.
    pub const INT_3: u8 = 0x9;
    /// Integer 4.
    pub const INT_4: u8 = 0xA;
    /// Integer 5.
    pub const INT_5: u8 = 0xB;

    /// Number of entries.
    pub const COUNT: u8 = 12;
}
