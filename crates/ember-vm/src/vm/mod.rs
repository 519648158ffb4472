// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! The virtual machine: owned state, restore, and the host API.
//!
//! A [`Vm`] owns the bytecode image, the RAM copy of the globals, the GC
//! heap, the handle table, and (while the host has a call in flight) the
//! activation stack with its register block. The instruction loop lives in
//! `interp`; property and numeric operations live in `builtins`.
//!
//! # Restore
//!
//! [`Vm::restore`] validates the image (size, CRC, versions, feature
//! flags), runs the port self-test, resolves the import table against the
//! host's resolver, copies the globals section into RAM, and adopts the
//! heap section as the initial GC heap. `load_pointers` then walks globals
//! and heap to establish the invariant that every short pointer addresses
//! a parsable allocation.
//!
//! # Reentrancy
//!
//! A host function called by the interpreter receives `&mut Vm` and may
//! call [`Vm::call`] again; the nested activation pushes frames onto the
//! same stack. The register block carries a `using_cached` flag (checked
//! in debug builds) to catch access through stale register caches.


pub(crate) mod interp;

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use ember_abi::image::{Builtin, Section};
use ember_abi::type_code::{self, TypeCode};

use crate::error::Error;
use crate::heap::{self, Heap};
use crate::image::Image;
use crate::port;
use crate::types::{BytecodeAddr, LongPtr, ShortPtr};
use crate::value::{convert, equal};
use crate::value::Value;

/// Flag bit of `arg_count_and_flags`: the call pushed its function target
/// onto the stack, and RETURN must pop it.
pub(crate) const AF_PUSHED_FUNCTION: u16 = 1 << 9;

/// Flag bit of `arg_count_and_flags`: the frame was entered from the host,
/// and RETURN leaves the interpreter loop.
pub(crate) const AF_CALLED_FROM_HOST: u16 = 1 << 10;

/// Words pushed at a frame boundary: caller frame size, scope,
/// `arg_count_and_flags`, return address.
pub(crate) const FRAME_BOUNDARY_WORDS: u16 = 4;

/// ID of a host function as known to the bytecode's import table.
pub type HostFunctionId = u16;

/// A host function callable from the VM.
///
/// Receives the VM (and may re-enter [`Vm::call`] through it), its own
/// import ID, and the arguments. The implicit `this` is not included;
/// `args[0]` is the first explicit argument.
pub type HostFunction = fn(&mut Vm, HostFunctionId, &[Value]) -> Result<Value, Error>;

/// The interpreter's register block.
///
/// The interpreter works on a local copy of this block and flushes it back
/// before any operation that may allocate, collect, or call out. Stack
/// positions are word indices; the program counter is an image offset.
#[derive(Clone, Copy)]
pub(crate) struct Registers {
    /// Program counter: byte offset into the image.
    pub pc: u16,
    /// Top of stack (word index; grows upward).
    pub sp: u16,
    /// First word of the current frame's locals.
    pub frame_base: u16,
    /// Word index of argument 0 (the implicit `this`).
    pub args: u16,
    /// Low byte: argument count including `this`. High byte: `AF_` flags.
    pub arg_count_and_flags: u16,
    /// Head of the closure scope chain; `undefined` when none.
    pub scope: Value,
    /// True while the interpreter holds a local copy of this block.
    pub using_cached: bool,
}

impl Registers {
    const fn new() -> Self {
        Self {
            pc: 0,
            sp: 0,
            frame_base: 0,
            args: 0,
            arg_count_and_flags: 0,
            scope: Value::UNDEFINED,
            using_cached: false,
        }
    }
}

/// The activation stack, allocated when the VM is first entered from the
/// host and freed when control fully returns.
pub(crate) struct Stack {
    pub words: Box<[Value]>,
    pub regs: Registers,
}

impl Stack {
    fn new() -> Self {
        Self {
            words: vec![Value::UNDEFINED; usize::from(port::STACK_SIZE / 2)].into_boxed_slice(),
            regs: Registers::new(),
        }
    }
}

/// A registered GC root owned by the host.
///
/// The contained value is kept alive and updated when the collector moves
/// its target. Handles are not `Copy`: release one with
/// [`Vm::release_handle`] or duplicate it with [`Vm::clone_handle`].
#[derive(Debug, PartialEq, Eq)]
pub struct Handle(usize);

/// Host-visible classification of a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Type {
    /// `undefined` (also the deleted marker).
    Undefined,
    /// `null`
    Null,
    /// `true` or `false`.
    Boolean,
    /// int14, int32, or float64.
    Number,
    /// Any string form.
    String,
    /// Bytecode function, host function, or closure.
    Function,
    /// Plain object.
    Object,
    /// Dynamic or fixed-length array.
    Array,
    /// Reserved.
    Class,
    /// Reserved.
    Symbol,
    /// Reserved.
    BigInt,
}

/// Memory accounting snapshot returned by [`Vm::memory_stats`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryStats {
    /// Size of the VM bookkeeping structure itself.
    pub core_size: usize,
    /// Size of the resolved import table.
    pub import_table_size: usize,
    /// Size of the RAM globals copy.
    pub globals_size: usize,
    /// Size of the register block (0 when the stack is not allocated).
    pub registers_size: usize,
    /// Current stack height in bytes.
    pub stack_height: usize,
    /// Stack capacity in bytes (0 when not allocated).
    pub stack_allocated_capacity: usize,
    /// Highest stack use observed, in bytes.
    pub stack_high_water_mark: usize,
    /// Used heap bytes, including uncollected garbage.
    pub virtual_heap_used: usize,
    /// Heap capacity across all buckets.
    pub virtual_heap_allocated_capacity: usize,
    /// Highest heap use observed.
    pub virtual_heap_high_water_mark: usize,
    /// Number of separately-allocated memory fragments.
    pub fragment_count: usize,
    /// Sum of all of the above allocations.
    pub total_size: usize,
}

/// A restored virtual machine.
pub struct Vm {
    pub(crate) image: Image,
    pub(crate) imports: Vec<HostFunction>,
    pub(crate) globals: Vec<Value>,
    pub(crate) heap: Heap,
    pub(crate) stack: Option<Box<Stack>>,
    pub(crate) handles: Vec<Option<Value>>,
    pub(crate) last_exception: Value,
    pub(crate) stack_high_water_mark: u16,
}

impl Vm {
    /// Restore a VM from a bytecode image.
    ///
    /// `resolve_import` is called once per import-table entry; returning
    /// `None` fails the restore with [`Error::UnresolvedImport`].
    ///
    /// # Errors
    ///
    /// Returns a bytecode-integrity error if the image is malformed, or
    /// [`Error::UnresolvedImport`] if the resolver comes up short.
    pub fn restore<F>(bytes: Box<[u8]>, mut resolve_import: F) -> Result<Self, Error>
    where
        F: FnMut(HostFunctionId) -> Option<HostFunction>,
    {
        let image = Image::new(bytes);
        image.validate()?;
        port::self_test(&image)?;

        // Link the import table
        let import_count = image.import_count();
        let mut imports = Vec::with_capacity(usize::from(import_count));
        for i in 0..import_count {
            let id = image.import_host_id(i);
            let handler = resolve_import(id).ok_or(Error::UnresolvedImport)?;
            imports.push(handler);
        }

        // RAM copy of the globals section
        let globals_offset = usize::from(image.section_offset(Section::Globals));
        let globals_count = usize::from(image.section_size(Section::Globals) / 2);
        let mut globals = Vec::with_capacity(globals_count);
        for i in 0..globals_count {
            globals.push(Value::from_raw(image.read_u16(globals_offset + i * 2)));
        }

        // Adopt the heap section as the initial GC heap: one bucket sized
        // exactly to the section.
        let mut heap = Heap::new();
        let heap_offset = usize::from(image.section_offset(Section::Heap));
        let heap_size = image.section_size(Section::Heap);
        if heap_size > 0 {
            heap.add_bucket(heap_size);
            heap.commit(usize::from(heap_size));
            heap.bytes_mut(0, usize::from(heap_size))
                .copy_from_slice(&image.bytes()[heap_offset..heap_offset + usize::from(heap_size)]);
        }
        heap.set_used_after_last_gc(heap_size);
        heap.note_high_water(heap_size);

        let vm = Self {
            image,
            imports,
            globals,
            heap,
            stack: None,
            handles: Vec::new(),
            last_exception: Value::UNDEFINED,
            stack_high_water_mark: 0,
        };

        if heap_size > 0 {
            vm.load_pointers()?;
        }

        log::debug!(
            "restored VM: {} imports, {} globals, {} B initial heap",
            vm.imports.len(),
            vm.globals.len(),
            heap_size
        );
        Ok(vm)
    }

    /// Walk globals and heap after restore, checking that the heap parses
    /// into well-formed allocations and that every short pointer addresses
    /// one of their payloads. This establishes the runtime pointer
    /// invariant the collector relies on.
    fn load_pointers(&self) -> Result<(), Error> {
        let heap_size = self.heap.used_size();

        // First pass: parse the allocation structure
        let mut payloads: Vec<u16> = Vec::new();
        let mut at: u32 = 0;
        while at < u32::from(heap_size) {
            if at + 4 > u32::from(heap_size) {
                return Err(Error::InvalidBytecode);
            }
            let header = self.heap.read_u16(at as u16);
            let size = type_code::header_size(header);
            let total = 2 + u32::from((size + 1) & 0xFFFE);
            if at + total > u32::from(heap_size) {
                return Err(Error::InvalidBytecode);
            }
            payloads.push(at as u16 + 2);
            at += total;
        }

        let check = |v: Value| -> Result<(), Error> {
            if v.is_short_ptr() && payloads.binary_search(&v.raw()).is_err() {
                return Err(Error::InvalidBytecode);
            }
            Ok(())
        };

        for &g in &self.globals {
            check(g)?;
        }

        // Second pass: container payloads must hold valid values
        for &payload in &payloads {
            let ptr = ShortPtr::new(payload);
            let header = self.heap.header_of(ptr);
            if !type_code::header_is_container(header) {
                continue;
            }
            let words = (type_code::header_size(header) + 1) / 2;
            for i in 0..words {
                check(Value::from_raw(self.heap.read_u16(payload + i * 2)))?;
            }
        }
        Ok(())
    }

    // --- Pointer decoding ---

    /// Decode a dynamic pointer: a short pointer, the null sentinel, or a
    /// bytecode-mapped pointer (following global-slot indirections).
    ///
    /// Returns `None` for null. Must not be called on non-pointer values.
    pub(crate) fn decode_ptr(&self, value: Value) -> Option<LongPtr> {
        let mut v = value;
        loop {
            if v.is_null() {
                return None;
            }
            if v.is_short_ptr() {
                return Some(LongPtr::Heap(ShortPtr::from_value(v)));
            }
            debug_assert!(v.is_bytecode_mapped(), "not a pointer: {v:?}");
            let offset = v.bytecode_offset();
            match self.global_slot_of_offset(offset) {
                // A handle: the global holds the real pointer
                Some(slot) => v = self.globals[slot],
                None => return Some(LongPtr::Rom(BytecodeAddr::new(offset))),
            }
        }
    }

    /// If an image offset falls inside the globals section, the index of
    /// the global slot it addresses.
    fn global_slot_of_offset(&self, offset: u16) -> Option<usize> {
        let start = self.image.section_offset(Section::Globals);
        let end = self.image.section_end(Section::Globals);
        if offset >= start && offset < end {
            Some(usize::from((offset - start) / 2))
        } else {
            None
        }
    }

    /// Read one byte through a long pointer.
    pub(crate) fn lp_read_u8(&self, lp: LongPtr) -> u8 {
        match lp {
            LongPtr::Heap(p) => self.heap.read_u8(p.offset()),
            LongPtr::Rom(a) => self.image.read_u8(a.offset().into()),
        }
    }

    /// Read a 16-bit word through a long pointer.
    pub(crate) fn lp_read_u16(&self, lp: LongPtr) -> u16 {
        match lp {
            LongPtr::Heap(p) => self.heap.read_u16(p.offset()),
            LongPtr::Rom(a) => self.image.read_u16(a.offset().into()),
        }
    }

    /// Borrow `len` bytes through a long pointer.
    pub(crate) fn lp_bytes(&self, lp: LongPtr, len: usize) -> &[u8] {
        match lp {
            LongPtr::Heap(p) => self.heap.bytes(p.offset(), len),
            LongPtr::Rom(a) => {
                let at = usize::from(a.offset());
                &self.image.bytes()[at..at + len]
            }
        }
    }

    /// Header word of the allocation a long pointer addresses.
    pub(crate) fn lp_header(&self, lp: LongPtr) -> u16 {
        match lp {
            LongPtr::Heap(p) => self.heap.header_of(p),
            LongPtr::Rom(a) => self.image.read_u16(usize::from(a.offset()) - 2),
        }
    }

    /// Deep type of a value: through pointers and boxing.
    pub(crate) fn deep_type_of(&self, value: Value) -> TypeCode {
        if value.is_short_ptr() {
            return self
                .heap
                .type_code_of(ShortPtr::from_value(value));
        }
        if value.is_int14() {
            return TypeCode::ValInt14;
        }
        if value.is_wellknown() {
            return wellknown_type_code(value);
        }
        let lp = self
            .decode_ptr(value)
            .unwrap_or_else(|| port::fatal_error(Error::Unexpected));
        type_code::header_type_code(self.lp_header(lp))
    }

    // --- Builtins ---

    /// Read a builtin slot, looking through a global-slot handle if the
    /// compiler made the slot mutable.
    pub(crate) fn get_builtin(&self, builtin: Builtin) -> Value {
        let slot = self.image.builtin_slot(builtin);
        if slot.is_bytecode_mapped() {
            if let Some(index) = self.global_slot_of_offset(slot.bytecode_offset()) {
                return self.globals[index];
            }
        }
        slot
    }

    /// Write a builtin slot. The slot must be a handle through a global;
    /// anything else would be a write into ROM.
    pub(crate) fn set_builtin(&mut self, builtin: Builtin, value: Value) {
        let slot = self.image.builtin_slot(builtin);
        if slot.is_bytecode_mapped() {
            if let Some(index) = self.global_slot_of_offset(slot.bytecode_offset()) {
                self.globals[index] = value;
                return;
            }
        }
        port::fatal_error(Error::AttemptToWriteToRom);
    }

    // --- Closure scopes ---

    /// Find a closure-scoped variable by index, walking the scope chain
    /// from `scope`.
    ///
    /// Each scope is a fixed-length array whose slot 0 links to its
    /// parent; the compiler numbers variables across the chain including
    /// those link slots, so the index is reduced by each scope's slot
    /// count on the way out. Running off the end of the chain is a
    /// bytecode defect.
    pub(crate) fn find_scoped_variable(&self, scope: Value, index: u16) -> LongPtr {
        let mut offset = index << 1;
        let mut scope = scope;
        loop {
            debug_assert!(!scope.is_undefined(), "scoped index out of range");
            let lp = self
                .decode_ptr(scope)
                .unwrap_or_else(|| port::fatal_error(Error::Unexpected));
            let header = self.lp_header(lp);
            debug_assert_eq!(
                type_code::header_type_code(header),
                TypeCode::FixedLengthArray
            );
            let array_size = type_code::header_size(header);
            debug_assert!(offset != 0);
            if offset < array_size {
                return lp.add(offset);
            }
            offset -= array_size;
            scope = Value::from_raw(self.lp_read_u16(lp));
        }
    }

    // --- Stack and registers ---

    pub(crate) fn regs(&self) -> &Registers {
        &self.stack.as_ref().expect("stack not allocated").regs
    }

    pub(crate) fn regs_mut(&mut self) -> &mut Registers {
        &mut self.stack.as_mut().expect("stack not allocated").regs
    }

    pub(crate) fn using_cached_registers(&self) -> bool {
        self.stack.as_ref().is_some_and(|s| s.regs.using_cached)
    }

    /// Read a stack word.
    pub(crate) fn stack_word(&self, index: u16) -> Value {
        self.stack.as_ref().expect("stack not allocated").words[usize::from(index)]
    }

    /// Write a stack word.
    pub(crate) fn set_stack_word(&mut self, index: u16, value: Value) {
        self.stack.as_mut().expect("stack not allocated").words[usize::from(index)] = value;
    }

    /// Create the activation stack and zeroed register block.
    pub(crate) fn create_stack(&mut self) {
        debug_assert!(self.stack.is_none());
        self.stack = Some(Box::new(Stack::new()));
    }

    /// Check that `words` more words fit on the stack, tracking the stack
    /// high-water mark.
    pub(crate) fn require_stack_space(&mut self, sp: u16, words: u16) -> Result<(), Error> {
        let top = port::STACK_SIZE / 2;
        if sp + words > top {
            return Err(Error::StackOverflow);
        }
        let mark = (sp + words) * 2;
        if mark > self.stack_high_water_mark {
            self.stack_high_water_mark = mark;
        }
        Ok(())
    }

    // --- Host API: calls and exports ---

    /// Call a VM function value with the given arguments.
    ///
    /// At most 254 arguments are supported (one slot is reserved for the
    /// implicit `this`, which is passed as `undefined`).
    ///
    /// # Errors
    ///
    /// Script-level errors (`TypeError`, `RangeError`, ...) leave the VM
    /// usable. An uncaught `throw` returns
    /// [`Error::UncaughtException`] with the thrown value available from
    /// [`Vm::last_exception`].
    pub fn call(&mut self, target: Value, args: &[Value]) -> Result<Value, Error> {
        if args.len() > 254 {
            return Err(Error::TooManyArguments);
        }
        interp::call_from_host(self, target, args)
    }

    /// Look up a single export by ID.
    pub fn resolve_export(&self, export_id: u16) -> Result<Value, Error> {
        self.image
            .find_export(export_id)
            .ok_or(Error::UnresolvedExport)
    }

    /// Look up several exports, collecting their values.
    pub fn resolve_exports(&self, export_ids: &[u16]) -> Result<Vec<Value>, Error> {
        let mut results = Vec::with_capacity(export_ids.len());
        for &id in export_ids {
            results.push(self.resolve_export(id)?);
        }
        Ok(results)
    }

    /// The value most recently thrown by an uncaught `throw`.
    #[must_use]
    pub fn last_exception(&self) -> Value {
        self.last_exception
    }

    // --- Host API: garbage collection and handles ---

    /// Run a collection. With `squeeze`, a second pass may run to shrink
    /// the heap to its exact live size.
    pub fn run_gc(&mut self, squeeze: bool) {
        heap::gc::collect(self, squeeze);
    }

    /// Register a value as a GC root.
    pub fn create_handle(&mut self, value: Value) -> Handle {
        for (i, slot) in self.handles.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(value);
                return Handle(i);
            }
        }
        self.handles.push(Some(value));
        Handle(self.handles.len() - 1)
    }

    /// Read the current value of a handle (updated by the collector when
    /// the target moves).
    pub fn handle_get(&self, handle: &Handle) -> Result<Value, Error> {
        self.handles
            .get(handle.0)
            .copied()
            .flatten()
            .ok_or(Error::InvalidHandle)
    }

    /// Replace the value a handle roots.
    pub fn handle_set(&mut self, handle: &Handle, value: Value) -> Result<(), Error> {
        match self.handles.get_mut(handle.0) {
            Some(slot @ Some(_)) => {
                *slot = Some(value);
                Ok(())
            }
            _ => Err(Error::InvalidHandle),
        }
    }

    /// Duplicate a handle, rooting the same value independently.
    pub fn clone_handle(&mut self, handle: &Handle) -> Result<Handle, Error> {
        let value = self.handle_get(handle)?;
        Ok(self.create_handle(value))
    }

    /// Release a handle, dropping its root.
    pub fn release_handle(&mut self, handle: Handle) -> Result<(), Error> {
        match self.handles.get_mut(handle.0) {
            Some(slot @ Some(_)) => {
                *slot = None;
                Ok(())
            }
            _ => Err(Error::InvalidHandle),
        }
    }

    // --- Host API: value constructors and conversions ---

    /// Construct an integer value (int14 when it fits, boxed otherwise).
    pub fn new_int32(&mut self, value: i32) -> Value {
        convert::new_int32(self, value)
    }

    /// Construct a number value with canonical NaN/−0/int normalization.
    #[cfg(feature = "float")]
    pub fn new_number(&mut self, value: f64) -> Value {
        convert::new_number(self, value)
    }

    /// Construct a boolean value.
    #[must_use]
    pub fn new_boolean(value: bool) -> Value {
        Value::bool(value)
    }

    /// Copy a string into the VM heap.
    pub fn new_string(&mut self, text: &str) -> Value {
        crate::builtins::strings::new_string(self, text.as_bytes())
    }

    /// Convert to int32: truncating floats, mapping non-numbers to 0.
    pub fn to_int32(&self, value: Value) -> i32 {
        convert::to_int32(self, value)
    }

    /// Convert to float64.
    #[cfg(feature = "float")]
    pub fn to_float64(&self, value: Value) -> f64 {
        convert::to_float64(self, value)
    }

    /// Truthiness of a value.
    pub fn to_bool(&self, value: Value) -> bool {
        convert::to_bool(self, value)
    }

    /// Convert a value to its string form (integers format in base 10,
    /// the primitive constants have fixed literals; boxed floats and
    /// reference types are not convertible).
    pub fn to_string(&mut self, value: Value) -> Result<Value, Error> {
        crate::builtins::strings::convert_to_string(self, value)
    }

    /// Borrow the UTF-8 bytes of a string value (without the trailing
    /// NUL). The borrow is only valid until the next allocation or
    /// collection.
    ///
    /// # Errors
    ///
    /// [`Error::TypeError`] if the value is not a string.
    pub fn string_bytes(&self, value: Value) -> Result<&[u8], Error> {
        crate::builtins::strings::string_bytes(self, value)
    }

    /// Structural equality per the engine's equality classes.
    pub fn equal(&self, a: Value, b: Value) -> bool {
        equal::equal(self, a, b)
    }

    /// Host-visible type of a value.
    pub fn type_of(&self, value: Value) -> Type {
        type_of_type_code(self.deep_type_of(value))
    }

    /// Memory accounting across the VM's allocations.
    pub fn memory_stats(&self) -> MemoryStats {
        let mut stats = MemoryStats {
            core_size: core::mem::size_of::<Self>(),
            import_table_size: self.imports.len() * core::mem::size_of::<HostFunction>(),
            globals_size: self.globals.len() * 2,
            virtual_heap_used: usize::from(self.heap.used_size()),
            virtual_heap_allocated_capacity: usize::from(self.heap.capacity()),
            virtual_heap_high_water_mark: usize::from(self.heap.high_water_mark()),
            stack_high_water_mark: usize::from(self.stack_high_water_mark),
            fragment_count: 1 + self.heap.bucket_count(),
            ..MemoryStats::default()
        };
        if let Some(stack) = &self.stack {
            stats.fragment_count += 1;
            stats.registers_size = core::mem::size_of::<Registers>();
            stats.stack_height = usize::from(stack.regs.sp) * 2;
            stats.stack_allocated_capacity = usize::from(port::STACK_SIZE);
        }
        stats.total_size = stats.core_size
            + stats.import_table_size
            + stats.globals_size
            + stats.registers_size
            + stats.stack_allocated_capacity
            + stats.virtual_heap_allocated_capacity;
        stats
    }
}

/// Type code of a well-known value.
fn wellknown_type_code(value: Value) -> TypeCode {
    debug_assert!(value.is_wellknown());
    match value {
        Value::UNDEFINED => TypeCode::ValUndefined,
        Value::NULL => TypeCode::ValNull,
        Value::TRUE => TypeCode::ValTrue,
        Value::FALSE => TypeCode::ValFalse,
        Value::NAN => TypeCode::ValNan,
        Value::NEG_ZERO => TypeCode::ValNegZero,
        Value::DELETED => TypeCode::ValDeleted,
        Value::STR_LENGTH => TypeCode::ValStrLength,
        _ => TypeCode::ValStrProto,
    }
}

/// Host-visible type for a deep type code.
fn type_of_type_code(tc: TypeCode) -> Type {
    match tc {
        TypeCode::Int32 | TypeCode::Float64 => Type::Number,
        TypeCode::String | TypeCode::InternedString => Type::String,
        TypeCode::Function | TypeCode::HostFunc | TypeCode::Closure => Type::Function,
        TypeCode::Symbol => Type::Symbol,
        TypeCode::Class => Type::Class,
        TypeCode::PropertyList => Type::Object,
        TypeCode::Array | TypeCode::FixedLengthArray => Type::Array,
        TypeCode::ValUndefined | TypeCode::ValDeleted => Type::Undefined,
        TypeCode::ValInt14 | TypeCode::ValNan | TypeCode::ValNegZero => Type::Number,
        TypeCode::ValNull => Type::Null,
        TypeCode::ValTrue | TypeCode::ValFalse => Type::Boolean,
        TypeCode::ValStrLength | TypeCode::ValStrProto => Type::String,
        TypeCode::Tombstone
        | TypeCode::Reserved7
        | TypeCode::Virtual
        | TypeCode::ReservedB => {
            debug_assert!(false, "type query on reserved type code {tc:?}");
            Type::Undefined
        }
    }
}
