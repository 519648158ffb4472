// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! The instruction interpreter.
//!
//! A single fetch-decode-execute loop over the nibble-pair opcode tables.
//! Execution state lives in a local [`Registers`] copy; the copy is
//! flushed to the VM's register block around every operation that can
//! allocate, collect, or call out (all of which may move heap objects or
//! re-enter the VM), and re-cached afterwards. The `using_cached` flag
//! catches code that touches the shared block while a local copy is live.
//!
//! The call protocol: the caller pushes `this` and the arguments, then a
//! CALL instruction resolves the target (unwrapping closures, which
//! contribute their captured scope), checks the callee's declared stack
//! requirement, and pushes a four-word frame boundary (caller frame size
//! in bytes, scope, argument-count-and-flags, return address). RETURN
//! pops the boundary, the arguments, and the pushed function when the
//! call was dynamic, then either pushes the result or, for frames entered
//! from the host, leaves the loop.
//!
//! Host functions run inside the caller's frame: no boundary is pushed,
//! only the stack pointer is flushed, and the stack must balance exactly
//! when they return. A host function may re-enter [`crate::Vm::call`];
//! the nested activation uses the same stack and restores the register
//! block on its way out.

use alloc::vec::Vec;

use ember_abi::opcodes::{self, bit_op, num_op, op, op1, op2, op3};
use ember_abi::type_code::{self, TypeCode};

use crate::builtins::{arithmetic, bitwise, property, strings};
use crate::error::Error;
use crate::heap;
use crate::port;
use crate::types::ShortPtr;
use crate::value::{convert, equal};
use crate::value::Value;
use crate::vm::{
    Registers, Type, Vm, AF_CALLED_FROM_HOST, AF_PUSHED_FUNCTION, FRAME_BOUNDARY_WORDS,
};

/// The small-literal table of LOAD_SMALL_LITERAL.
const SMALL_LITERALS: [Value; 12] = [
    Value::DELETED,
    Value::UNDEFINED,
    Value::NULL,
    Value::FALSE,
    Value::TRUE,
    Value::int14(-1),
    Value::int14(0),
    Value::int14(1),
    Value::int14(2),
    Value::int14(3),
    Value::int14(4),
    Value::int14(5),
];

/// Control flow out of an instruction.
enum Flow {
    /// Fall through to the next instruction.
    Continue,
    /// A frame entered from the host returned; leave the loop.
    ReturnToHost(Value),
}

/// Entry point for `Vm::call`: push the arguments, perform the call, and
/// run the loop until the frame returns to the host.
pub(crate) fn call_from_host(vm: &mut Vm, target: Value, args: &[Value]) -> Result<Value, Error> {
    if vm.stack.is_none() {
        vm.create_stack();
    }
    let mut regs = cache(vm);

    let result = run_call(vm, &mut regs, target, args);

    match result {
        Ok(value) => {
            if regs.sp == 0 {
                // Control has fully returned to the host; drop the stack
                vm.stack = None;
            } else {
                // A reentrant call: outer frames remain below us
                flush(vm, &regs);
            }
            Ok(value)
        }
        Err(e) => {
            flush(vm, &regs);
            Err(e)
        }
    }
}

fn run_call(vm: &mut Vm, regs: &mut Registers, target: Value, args: &[Value]) -> Result<Value, Error> {
    vm.require_stack_space(regs.sp, args.len() as u16 + 1)?;
    push(vm, regs, Value::UNDEFINED); // the implicit `this`
    for &arg in args {
        push(vm, regs, arg);
    }

    let acaf = (args.len() as u16 + 1) | AF_CALLED_FROM_HOST;
    if let Flow::ReturnToHost(v) = do_call(vm, regs, target, acaf)? {
        return Ok(v);
    }
    run_loop(vm, regs)
}

fn run_loop(vm: &mut Vm, regs: &mut Registers) -> Result<Value, Error> {
    loop {
        let instr = read_pgm_u8(vm, regs);
        let primary = opcodes::primary(instr);
        let n = u16::from(opcodes::secondary(instr));
        // Operations from the divider up consume one stack operand
        let operand = if primary >= op::DIVIDER_1 {
            pop(vm, regs)
        } else {
            Value::UNDEFINED
        };

        if let Flow::ReturnToHost(v) = step(vm, regs, primary, n, operand)? {
            return Ok(v);
        }
    }
}

/// Execute one instruction.
#[expect(clippy::too_many_lines, reason = "single dispatch table")]
fn step(
    vm: &mut Vm,
    regs: &mut Registers,
    primary: u8,
    n: u16,
    operand: Value,
) -> Result<Flow, Error> {
    match primary {
        op::LOAD_SMALL_LITERAL => {
            let Some(&literal) = SMALL_LITERALS.get(usize::from(n)) else {
                return Err(Error::InvalidBytecode);
            };
            push(vm, regs, literal);
        }

        op::LOAD_VAR_1 => load_var(vm, regs, n)?,
        op::LOAD_SCOPED_1 => load_scoped(vm, regs, n),
        op::LOAD_ARG_1 => load_arg(vm, regs, n),
        op::CALL_1 => return short_call(vm, regs, n as u8),

        op::FIXED_ARRAY_NEW_1 => fixed_array_new(vm, regs, n),

        op::EXTENDED_1 => return step_ex1(vm, regs, n as u8),
        op::EXTENDED_2 => return step_ex2(vm, regs, n as u8),
        op::EXTENDED_3 => return step_ex3(vm, regs, n as u8),

        op::CALL_5 => {
            let func_offset = read_pgm_u16(vm, regs);
            call_bytecode(vm, regs, func_offset, Value::UNDEFINED, n)?;
        }

        op::STORE_VAR_1 => store_var(vm, regs, n, operand),
        op::STORE_SCOPED_1 => store_scoped(vm, regs, n, operand)?,

        op::ARRAY_GET_1 => {
            // An optimization for fixed-length arrays only; the index is
            // compiler-generated and in range
            debug_assert_eq!(vm.deep_type_of(operand), TypeCode::FixedLengthArray);
            let lp = vm
                .decode_ptr(operand)
                .unwrap_or_else(|| port::fatal_error(Error::Unexpected));
            debug_assert!(n * 2 < type_code::header_size(vm.lp_header(lp)));
            let value = Value::from_raw(vm.lp_read_u16(lp.add(n * 2)));
            push(vm, regs, value);
        }

        op::ARRAY_SET_1 => {
            let array = pop(vm, regs);
            debug_assert_eq!(vm.deep_type_of(array), TypeCode::FixedLengthArray);
            // Writes require the target in RAM
            if !array.is_short_ptr() {
                return Err(Error::AttemptToWriteToRom);
            }
            let ptr = ShortPtr::from_value(array);
            debug_assert!(n * 2 < vm.heap.size_of(ptr));
            vm.heap.write_u16(ptr.offset() + n * 2, operand.raw());
        }

        op::NUM_OP => {
            let left = if (n as u8) < num_op::DIVIDER {
                pop(vm, regs)
            } else {
                Value::UNDEFINED
            };
            flush(vm, regs);
            let result = arithmetic::apply(vm, n as u8, left, operand);
            *regs = cache(vm);
            push(vm, regs, result?);
        }

        op::BIT_OP => {
            let left = if (n as u8) < bit_op::DIVIDER_2 {
                Some(pop(vm, regs))
            } else {
                None
            };
            flush(vm, regs);
            let result = bitwise::apply(vm, n as u8, left, operand);
            *regs = cache(vm);
            push(vm, regs, result?);
        }

        _ => return Err(Error::InvalidBytecode),
    }
    Ok(Flow::Continue)
}

/// Extended table 1 (no immediate).
fn step_ex1(vm: &mut Vm, regs: &mut Registers, sub: u8) -> Result<Flow, Error> {
    match sub {
        op1::RETURN => {
            let result = pop(vm, regs);
            return do_return(vm, regs, result);
        }

        op1::THROW => {
            // There is no way to write a catch in the core instruction
            // set, so every throw is uncaught
            vm.last_exception = pop(vm, regs);
            return Err(Error::UncaughtException);
        }

        op1::CLOSURE_NEW => {
            flush(vm, regs);
            let closure = heap::allocate(vm, 4, TypeCode::Closure);
            *regs = cache(vm);
            let target = pop(vm, regs);
            vm.heap.write_u16(closure.offset(), regs.scope.raw());
            vm.heap.write_u16(closure.offset() + 2, target.raw());
            push(vm, regs, closure.to_value());
        }

        op1::RESERVED_CLASS_NEW | op1::RESERVED_VIRTUAL_NEW => return Err(Error::NotImplemented),

        op1::SCOPE_PUSH => {
            let count = u16::from(read_pgm_u8(vm, regs));
            flush(vm, regs);
            // One extra slot links to the enclosing scope
            let scope = heap::allocate(vm, (count + 1) * 2, TypeCode::FixedLengthArray);
            *regs = cache(vm);
            vm.heap.write_u16(scope.offset(), regs.scope.raw());
            for i in 0..count {
                vm.heap
                    .write_u16(scope.offset() + 2 + i * 2, Value::UNDEFINED.raw());
            }
            regs.scope = scope.to_value();
        }

        op1::TYPE_CODE_OF => {
            let value = pop(vm, regs);
            let t = vm.type_of(value);
            push(vm, regs, Value::int14(t as i16));
        }

        op1::POP => {
            debug_assert!(regs.sp > 0);
            regs.sp -= 1;
        }

        op1::TYPEOF => {
            let value = vm.stack_word(regs.sp - 1);
            let name = typeof_string(vm.type_of(value));
            flush(vm, regs);
            let s = strings::new_string(vm, name.as_bytes());
            *regs = cache(vm);
            vm.set_stack_word(regs.sp - 1, s);
        }

        op1::OBJECT_NEW => {
            flush(vm, regs);
            let object = heap::allocate(vm, 4, TypeCode::PropertyList);
            *regs = cache(vm);
            vm.heap.write_u16(object.offset(), Value::NULL.raw());
            vm.heap.write_u16(object.offset() + 2, Value::NULL.raw());
            push(vm, regs, object.to_value());
        }

        op1::LOGICAL_NOT => {
            let value = pop(vm, regs);
            let truthy = convert::to_bool(vm, value);
            push(vm, regs, Value::bool(!truthy));
        }

        op1::OBJECT_GET_1 => {
            flush(vm, regs);
            let result = property::get_property(vm, regs.sp - 2, regs.sp - 1);
            *regs = cache(vm);
            let value = result?;
            regs.sp -= 2;
            push(vm, regs, value);
        }

        op1::ADD => {
            let left = vm.stack_word(regs.sp - 2);
            let right = vm.stack_word(regs.sp - 1);

            // Unsigned 12-bit addition cannot overflow an int14 and needs
            // no type dispatch; this is the common loop-counter case
            if left.is_virtual_uint12() && right.is_virtual_uint12() {
                let sum = Value::from_raw(left.raw() + right.raw() - Value::int14(0).raw());
                regs.sp -= 2;
                push(vm, regs, sum);
            } else if strings::is_string(vm, left) || strings::is_string(vm, right) {
                flush(vm, regs);
                let result = add_strings(vm, regs.sp - 2, regs.sp - 1);
                *regs = cache(vm);
                let value = result?;
                regs.sp -= 2;
                push(vm, regs, value);
            } else {
                let right = pop(vm, regs);
                let left = pop(vm, regs);
                flush(vm, regs);
                let result = arithmetic::apply(vm, num_op::ADD_NUM, left, right);
                *regs = cache(vm);
                push(vm, regs, result?);
            }
        }

        op1::EQUAL | op1::NOT_EQUAL => {
            let right = pop(vm, regs);
            let left = pop(vm, regs);
            flush(vm, regs);
            let eq = equal::equal(vm, left, right);
            *regs = cache(vm);
            push(vm, regs, Value::bool(eq == (sub == op1::EQUAL)));
        }

        op1::OBJECT_SET_1 => {
            // Object, key, and value stay on the stack until the store
            // completes so a collection can't orphan them
            flush(vm, regs);
            let result = property::set_property(vm, regs.sp - 3);
            *regs = cache(vm);
            result?;
            regs.sp -= 3;
        }

        _ => return Err(Error::InvalidBytecode),
    }
    Ok(Flow::Continue)
}

/// Extended table 2 (8-bit immediate).
fn step_ex2(vm: &mut Vm, regs: &mut Registers, sub: u8) -> Result<Flow, Error> {
    let imm = u16::from(read_pgm_u8(vm, regs));
    // Operations below the divider consume one stack operand
    let operand = if sub < op2::DIVIDER_1 {
        pop(vm, regs)
    } else {
        Value::UNDEFINED
    };

    match sub {
        op2::BRANCH_1 => branch(vm, regs, imm as u8 as i8 as i16, operand),

        op2::STORE_ARG => {
            if imm >= regs.arg_count_and_flags & 0xFF {
                return Err(Error::InvalidBytecode);
            }
            vm.set_stack_word(regs.args + imm, operand);
        }

        op2::STORE_SCOPED_2 => store_scoped(vm, regs, imm, operand)?,
        op2::STORE_VAR_2 => store_var(vm, regs, imm, operand),

        op2::RESERVED_STRUCT_GET_2 | op2::RESERVED_STRUCT_SET_2 | op2::RESERVED_D => {
            return Err(Error::NotImplemented);
        }

        op2::JUMP_1 => regs.pc = regs.pc.wrapping_add(imm as u8 as i8 as i16 as u16),

        op2::CALL_HOST => {
            // The target comes from the instruction, so no function was
            // pushed and the flags are all clear
            let import_index = u16::from(read_pgm_u8(vm, regs));
            return call_host_common(vm, regs, import_index, imm);
        }

        op2::CALL_3 => {
            let acaf = imm | AF_PUSHED_FUNCTION;
            let target = vm.stack_word(regs.sp - (imm & 0xFF) - 1);
            return do_call(vm, regs, target, acaf);
        }

        op2::CALL_6 => return short_call(vm, regs, imm as u8),

        op2::LOAD_SCOPED_2 => load_scoped(vm, regs, imm),
        op2::LOAD_VAR_2 => load_var(vm, regs, imm)?,
        op2::LOAD_ARG_2 => load_arg(vm, regs, imm),

        op2::ARRAY_NEW => array_new(vm, regs, imm),
        op2::FIXED_ARRAY_NEW_2 => fixed_array_new(vm, regs, imm),

        _ => return Err(Error::InvalidBytecode),
    }
    Ok(Flow::Continue)
}

/// Extended table 3 (16-bit immediate for most operations).
fn step_ex3(vm: &mut Vm, regs: &mut Registers, sub: u8) -> Result<Flow, Error> {
    let imm = if sub >= op3::DIVIDER_1 {
        read_pgm_u16(vm, regs)
    } else {
        0
    };
    let operand = if sub >= op3::DIVIDER_2 {
        pop(vm, regs)
    } else {
        Value::UNDEFINED
    };

    match sub {
        op3::POP_N => {
            let count = u16::from(read_pgm_u8(vm, regs));
            debug_assert!(regs.sp >= count);
            regs.sp -= count;
        }

        op3::SCOPE_POP => {
            let scope = regs.scope;
            debug_assert!(!scope.is_undefined());
            let lp = vm
                .decode_ptr(scope)
                .unwrap_or_else(|| port::fatal_error(Error::Unexpected));
            debug_assert_eq!(
                type_code::header_type_code(vm.lp_header(lp)),
                TypeCode::FixedLengthArray
            );
            // Slot 0 links to the enclosing scope
            regs.scope = Value::from_raw(vm.lp_read_u16(lp));
        }

        op3::SCOPE_CLONE => {
            debug_assert!(!regs.scope.is_undefined());
            flush(vm, regs);
            let cloned = clone_scope(vm);
            *regs = cache(vm);
            regs.scope = cloned;
        }

        op3::JUMP_2 => regs.pc = regs.pc.wrapping_add(imm),

        op3::LOAD_LITERAL => push(vm, regs, Value::from_raw(imm)),

        op3::LOAD_GLOBAL_3 => {
            let Some(&value) = vm.globals.get(usize::from(imm)) else {
                return Err(Error::InvalidBytecode);
            };
            push(vm, regs, value);
        }

        op3::LOAD_SCOPED_3 => load_scoped(vm, regs, imm),

        op3::BRANCH_2 => branch(vm, regs, imm as i16, operand),

        op3::STORE_GLOBAL_3 => {
            let Some(slot) = vm.globals.get_mut(usize::from(imm)) else {
                return Err(Error::InvalidBytecode);
            };
            *slot = operand;
        }

        op3::STORE_SCOPED_3 => store_scoped(vm, regs, imm, operand)?,

        op3::OBJECT_GET_2 => {
            let object = operand;
            let key = Value::from_raw(imm);
            flush(vm, regs);
            let result = property::get_property_literal(vm, object, key);
            *regs = cache(vm);
            push(vm, regs, result?);
        }

        op3::OBJECT_SET_2 => {
            let value = operand;
            let object = pop(vm, regs);
            // Re-stage as [object, key, value] so all three stay rooted
            push(vm, regs, object);
            push(vm, regs, Value::from_raw(imm));
            push(vm, regs, value);
            flush(vm, regs);
            let result = property::set_property(vm, regs.sp - 3);
            *regs = cache(vm);
            result?;
            regs.sp -= 3;
        }

        _ => return Err(Error::NotImplemented),
    }
    Ok(Flow::Continue)
}

// --- Call protocol ---

/// Resolve and perform a dynamic call (closures unwrap to their target,
/// contributing their captured scope).
fn do_call(vm: &mut Vm, regs: &mut Registers, target: Value, acaf: u16) -> Result<Flow, Error> {
    let mut target = target;
    let mut scope = Value::UNDEFINED;
    loop {
        match vm.deep_type_of(target) {
            TypeCode::Function => {
                // Bytecode functions live in ROM; the value is their
                // image offset
                debug_assert!(target.is_bytecode_mapped());
                call_bytecode(vm, regs, target.bytecode_offset(), scope, acaf)?;
                return Ok(Flow::Continue);
            }
            TypeCode::HostFunc => {
                let lp = vm
                    .decode_ptr(target)
                    .unwrap_or_else(|| port::fatal_error(Error::Unexpected));
                let import_index = vm.lp_read_u16(lp);
                return call_host_common(vm, regs, import_index, acaf);
            }
            TypeCode::Closure => {
                let lp = vm
                    .decode_ptr(target)
                    .unwrap_or_else(|| port::fatal_error(Error::Unexpected));
                scope = Value::from_raw(vm.lp_read_u16(lp));
                target = Value::from_raw(vm.lp_read_u16(lp.add(2)));
            }
            _ => return Err(Error::TargetNotCallable),
        }
    }
}

/// Call through the short-call table.
fn short_call(vm: &mut Vm, regs: &mut Registers, index: u8) -> Result<Flow, Error> {
    let (target, arg_count) = vm.image.short_call_entry(index);
    let acaf = u16::from(arg_count);
    // The low bit selects between a host import index and a bytecode
    // offset
    if target & 1 != 0 {
        call_host_common(vm, regs, target >> 1, acaf)
    } else {
        call_bytecode(vm, regs, target, Value::UNDEFINED, acaf)?;
        Ok(Flow::Continue)
    }
}

/// Transfer control to a bytecode function, pushing the frame boundary.
fn call_bytecode(
    vm: &mut Vm,
    regs: &mut Registers,
    func_offset: u16,
    scope: Value,
    acaf: u16,
) -> Result<(), Error> {
    let arg_count = acaf & 0xFF;
    let args_index = regs.sp - arg_count;
    let return_addr = regs.pc;

    regs.pc = func_offset;
    // Byte 0 of a function is its required stack height in words
    let required = u16::from(read_pgm_u8(vm, regs));
    vm.require_stack_space(regs.sp, required + FRAME_BOUNDARY_WORDS)?;

    push(vm, regs, Value::from_raw((regs.sp - regs.frame_base) * 2));
    push(vm, regs, regs.scope);
    push(vm, regs, Value::from_raw(regs.arg_count_and_flags));
    push(vm, regs, Value::from_raw(return_addr));

    regs.frame_base = regs.sp;
    regs.arg_count_and_flags = acaf;
    regs.scope = scope;
    regs.args = args_index;
    Ok(())
}

/// Return from the current frame: restore the caller's registers, pop the
/// arguments, and deliver the result.
fn do_return(vm: &mut Vm, regs: &mut Registers, result: Value) -> Result<Flow, Error> {
    // Discard locals
    regs.sp = regs.frame_base;
    let callee_acaf = regs.arg_count_and_flags;

    // Pop the frame boundary (the inverse of call_bytecode)
    regs.pc = pop(vm, regs).raw();
    regs.arg_count_and_flags = pop(vm, regs).raw();
    regs.scope = pop(vm, regs);
    regs.sp -= 1;
    let frame_size_bytes = vm.stack_word(regs.sp).raw();
    regs.frame_base = regs.sp - frame_size_bytes / 2;
    regs.args = regs
        .frame_base
        .wrapping_sub(FRAME_BOUNDARY_WORDS)
        .wrapping_sub(regs.arg_count_and_flags & 0xFF);

    pop_args(vm, regs, callee_acaf, result)
}

/// Pop a completed call's arguments and deliver its result.
fn pop_args(vm: &mut Vm, regs: &mut Registers, callee_acaf: u16, result: Value) -> Result<Flow, Error> {
    regs.sp -= callee_acaf & 0xFF;
    if callee_acaf & AF_PUSHED_FUNCTION != 0 {
        regs.sp -= 1;
    }
    if callee_acaf & AF_CALLED_FROM_HOST != 0 {
        Ok(Flow::ReturnToHost(result))
    } else {
        push(vm, regs, result);
        Ok(Flow::Continue)
    }
}

/// Call a host function. Runs within the caller's frame; the host sees
/// the arguments after the implicit `this`.
fn call_host_common(
    vm: &mut Vm,
    regs: &mut Registers,
    import_index: u16,
    acaf: u16,
) -> Result<Flow, Error> {
    if usize::from(import_index) >= vm.imports.len() {
        return Err(Error::InvalidBytecode);
    }
    let arg_count = (acaf & 0xFF).saturating_sub(1); // host calls skip `this`
    let pre_sp = regs.sp;
    let args_start = pre_sp - arg_count;

    flush(vm, regs);

    let mut args: Vec<Value> = (0..arg_count)
        .map(|i| vm.stack_word(args_start + i))
        .collect();
    sanitize_args(vm, &mut args);

    let handler = vm.imports[usize::from(import_index)];
    let host_function_id = vm.image.import_host_id(import_index);
    let result = handler(vm, host_function_id, &args);

    *regs = cache(vm);
    // The host is not given stack access, so an imbalance here means a
    // reentrant call went wrong
    debug_assert_eq!(regs.sp, pre_sp, "host call left the stack unbalanced");

    pop_args(vm, regs, acaf, result?)
}

/// Values of reference type are not passed into the host: alias analysis
/// on the host side needs the guarantee that no object pointers escape.
fn sanitize_args(vm: &Vm, args: &mut [Value]) {
    for arg in args {
        debug_assert!(!arg.is_deleted());
        if matches!(
            vm.type_of(*arg),
            Type::Function | Type::Object | Type::Array
        ) {
            *arg = Value::UNDEFINED;
        }
    }
}

// --- Shared operation bodies ---

fn load_var(vm: &mut Vm, regs: &mut Registers, index: u16) -> Result<(), Error> {
    let value = vm.stack_word(regs.sp - index - 1);
    // A deleted slot is a variable read before its declaration
    if value.is_deleted() {
        return Err(Error::TdzError);
    }
    push(vm, regs, value);
    Ok(())
}

fn store_var(vm: &mut Vm, regs: &mut Registers, index: u16, value: Value) {
    // Index 0 is the slot at the top of the stack (the operand was
    // already popped)
    vm.set_stack_word(regs.sp - index - 1, value);
}

fn load_scoped(vm: &mut Vm, regs: &mut Registers, index: u16) {
    let lp = vm.find_scoped_variable(regs.scope, index);
    let value = Value::from_raw(vm.lp_read_u16(lp));
    push(vm, regs, value);
}

fn store_scoped(vm: &mut Vm, regs: &mut Registers, index: u16, value: Value) -> Result<(), Error> {
    let lp = vm.find_scoped_variable(regs.scope, index);
    // Writing to a closure variable in ROM is a bytecode defect
    let Some(ptr) = lp.as_heap() else {
        return Err(Error::AttemptToWriteToRom);
    };
    vm.heap.write_u16(ptr.offset(), value.raw());
    Ok(())
}

fn load_arg(vm: &mut Vm, regs: &mut Registers, index: u16) {
    let value = if index < regs.arg_count_and_flags & 0xFF {
        vm.stack_word(regs.args + index)
    } else {
        Value::UNDEFINED
    };
    push(vm, regs, value);
}

fn branch(vm: &mut Vm, regs: &mut Registers, offset: i16, predicate: Value) {
    if convert::to_bool(vm, predicate) {
        regs.pc = regs.pc.wrapping_add(offset as u16);
    }
}

fn fixed_array_new(vm: &mut Vm, regs: &mut Registers, length: u16) {
    flush(vm, regs);
    // A deleted slot read through LOAD_VAR is the TDZ, so fresh arrays
    // can double as uninitialized variable blocks
    let ptr = heap::allocate_filled(vm, length * 2, TypeCode::FixedLengthArray, Value::DELETED);
    *regs = cache(vm);
    push(vm, regs, ptr.to_value());
}

fn array_new(vm: &mut Vm, regs: &mut Registers, capacity: u16) {
    flush(vm, regs);
    let arr = heap::allocate(vm, 4, TypeCode::Array);
    *regs = cache(vm);
    vm.heap.write_u16(arr.offset(), Value::NULL.raw());
    vm.heap.write_u16(arr.offset() + 2, Value::int14(0).raw());
    // Push before allocating the backing so a collection keeps the array
    // alive (and moves it if it must)
    push(vm, regs, arr.to_value());

    if capacity > 0 {
        flush(vm, regs);
        let data = heap::allocate_filled(vm, capacity * 2, TypeCode::FixedLengthArray, Value::DELETED);
        *regs = cache(vm);
        let arr = ShortPtr::from_value(vm.stack_word(regs.sp - 1));
        vm.heap.write_u16(arr.offset(), data.to_value().raw());
    }
}

/// Clone the current scope (read from the flushed register block, which
/// the collector keeps up to date across the allocation).
fn clone_scope(vm: &mut Vm) -> Value {
    let lp = vm
        .decode_ptr(vm.regs().scope)
        .unwrap_or_else(|| port::fatal_error(Error::Unexpected));
    let header = vm.lp_header(lp);
    debug_assert_eq!(
        type_code::header_type_code(header),
        TypeCode::FixedLengthArray
    );
    let size = type_code::header_size(header);

    let cloned = heap::allocate(vm, size, TypeCode::FixedLengthArray);
    let lp = vm
        .decode_ptr(vm.regs().scope)
        .unwrap_or_else(|| port::fatal_error(Error::Unexpected));
    for i in 0..size / 2 {
        let word = vm.lp_read_u16(lp.add(i * 2));
        vm.heap.write_u16(cloned.offset() + i * 2, word);
    }
    cloned.to_value()
}

/// String concatenation half of ADD: convert both stack operands in
/// place, then concatenate them.
fn add_strings(vm: &mut Vm, left_slot: u16, right_slot: u16) -> Result<Value, Error> {
    let left = strings::convert_to_string(vm, vm.stack_word(left_slot))?;
    vm.set_stack_word(left_slot, left);
    let right = strings::convert_to_string(vm, vm.stack_word(right_slot))?;
    vm.set_stack_word(right_slot, right);
    Ok(strings::concat(vm, left_slot, right_slot))
}

/// The `typeof` string for a host-visible type.
fn typeof_string(t: Type) -> &'static str {
    match t {
        Type::Undefined => "undefined",
        Type::Boolean => "boolean",
        Type::Number => "number",
        Type::String => "string",
        Type::Function | Type::Class => "function",
        Type::Null | Type::Object | Type::Array => "object",
        Type::Symbol => "symbol",
        Type::BigInt => "bigint",
    }
}

// --- Register cache and stack primitives ---

/// Take a local copy of the register block, marking it cached.
fn cache(vm: &mut Vm) -> Registers {
    let block = vm.regs_mut();
    debug_assert!(!block.using_cached);
    block.using_cached = true;
    *block
}

/// Write a local register copy back to the block, clearing the cached
/// flag.
fn flush(vm: &mut Vm, regs: &Registers) {
    let block = vm.regs_mut();
    debug_assert!(block.using_cached);
    *block = *regs;
    block.using_cached = false;
}

fn push(vm: &mut Vm, regs: &mut Registers, value: Value) {
    vm.set_stack_word(regs.sp, value);
    regs.sp += 1;
}

fn pop(vm: &Vm, regs: &mut Registers) -> Value {
    debug_assert!(regs.sp > 0);
    regs.sp -= 1;
    vm.stack_word(regs.sp)
}

fn read_pgm_u8(vm: &Vm, regs: &mut Registers) -> u8 {
    let byte = vm.image.read_u8(usize::from(regs.pc));
    regs.pc += 1;
    byte
}

fn read_pgm_u16(vm: &Vm, regs: &mut Registers) -> u16 {
    let word = vm.image.read_u16(usize::from(regs.pc));
    regs.pc += 2;
    word
}
