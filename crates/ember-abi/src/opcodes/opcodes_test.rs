// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Tests for instruction packing and table dividers.

use super::*;

#[test]
fn instr_round_trip() {
    for p in 0..=0xFu8 {
        for s in 0..=0xFu8 {
            let byte = instr(p, s);
            assert_eq!(primary(byte), p);
            assert_eq!(secondary(byte), s);
        }
    }
}

#[test]
fn primary_divider_splits_store_ops() {
    // Everything from STORE_VAR_1 on pops an operand at dispatch
    assert!(op::LOAD_VAR_1 < op::DIVIDER_1);
    assert!(op::CALL_5 < op::DIVIDER_1);
    assert!(op::STORE_VAR_1 >= op::DIVIDER_1);
    assert!(op::NUM_OP >= op::DIVIDER_1);
    assert!(op::BIT_OP >= op::DIVIDER_1);
}

#[test]
fn op2_divider_splits_store_ops() {
    assert!(op2::BRANCH_1 < op2::DIVIDER_1);
    assert!(op2::STORE_ARG < op2::DIVIDER_1);
    assert!(op2::JUMP_1 >= op2::DIVIDER_1);
    assert!(op2::ARRAY_NEW >= op2::DIVIDER_1);
}

#[test]
fn op3_dividers() {
    // POP_N and the scope ops have no automatic 16-bit immediate
    assert!(op3::POP_N < op3::DIVIDER_1);
    assert!(op3::SCOPE_CLONE < op3::DIVIDER_1);
    assert!(op3::JUMP_2 >= op3::DIVIDER_1);
    // Stores and branches additionally pop an operand
    assert!(op3::LOAD_GLOBAL_3 < op3::DIVIDER_2);
    assert!(op3::BRANCH_2 >= op3::DIVIDER_2);
    assert!(op3::OBJECT_SET_2 >= op3::DIVIDER_2);
}

#[test]
fn num_op_unary_divider() {
    assert!(num_op::POWER < num_op::DIVIDER);
    assert!(num_op::NEGATE >= num_op::DIVIDER);
    assert!(num_op::UNARY_PLUS >= num_op::DIVIDER);
}

#[test]
fn bit_op_shift_and_unary_ranges() {
    assert!(bit_op::SHR_ARITHMETIC < bit_op::END_OF_SHIFTS);
    assert!(bit_op::SHL < bit_op::END_OF_SHIFTS);
    assert!(bit_op::OR >= bit_op::END_OF_SHIFTS);
    assert!(bit_op::NOT >= bit_op::DIVIDER_2);
    assert!(bit_op::XOR < bit_op::DIVIDER_2);
}

#[test]
fn small_literal_table_has_12_entries() {
    assert_eq!(small_lit::COUNT, 12);
    assert_eq!(small_lit::INT_5, 0xB);
}
