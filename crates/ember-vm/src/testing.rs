// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Ember VM contributors

//! Test-only bytecode image builder.
//!
//! Tests need well-formed images: correct header, section order, CRC, and
//! cross-section references. This builder lays out all sections, resolves
//! symbolic references to ROM allocations (their offsets aren't known
//! until layout), and seals the image with its checksum.
//!
//! References are symbolic ([`Ref`]) because ROM offsets depend on the
//! sizes of every table before the ROM section. `finish` performs the
//! layout, patches every reference site, and returns the finished image.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use ember_abi::encoding;
use ember_abi::image::{
    Builtin, FEATURE_FLAG_FLOAT_SUPPORT, HEADER_SIZE, OFF_BYTECODE_SIZE, OFF_BYTECODE_VERSION,
    OFF_CRC, OFF_HEADER_SIZE, OFF_REQUIRED_ENGINE_VERSION, OFF_REQUIRED_FEATURE_FLAGS,
    Section, CRC_START,
};
use ember_abi::opcodes::{instr, op, op1, op2, op3};
use ember_abi::type_code::{self, TypeCode};
use ember_abi::{BYTECODE_VERSION, ENGINE_VERSION};

use crate::port;
use crate::value::Value;

/// A symbolic or literal 16-bit slot value.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Ref {
    /// A raw encoded value.
    Raw(u16),
    /// The bytecode-mapped value of a ROM item.
    Rom(usize),
    /// A bytecode-mapped handle through a global slot (what the compiler
    /// emits for mutable builtin slots and ROM-to-RAM references).
    Global(u16),
}

impl Ref {
    pub(crate) fn value(v: Value) -> Self {
        Self::Raw(v.raw())
    }
}

/// How a patched reference is written into code.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Patch {
    /// The encoded value (e.g. a LOAD_LITERAL immediate).
    Value,
    /// The bare image offset (e.g. a CALL_5 target).
    Offset,
}

struct RomItem {
    tc: TypeCode,
    payload: Vec<u8>,
    patches: Vec<(usize, Ref, Patch)>,
}

/// Builder for a complete bytecode image.
#[derive(Default)]
pub(crate) struct ImageBuilder {
    imports: Vec<u16>,
    exports: Vec<(u16, Ref)>,
    short_calls: Vec<(Ref, u8)>,
    builtins: [Option<Ref>; Builtin::COUNT],
    string_items: Vec<usize>,
    rom_items: Vec<RomItem>,
    globals: Vec<Ref>,
    heap: Vec<u8>,
}

impl ImageBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Declare an import; returns its index in the import table.
    pub(crate) fn add_import(&mut self, host_function_id: u16) -> u8 {
        self.imports.push(host_function_id);
        (self.imports.len() - 1) as u8
    }

    /// Export a value under an export ID.
    pub(crate) fn add_export(&mut self, export_id: u16, target: Ref) {
        self.exports.push((export_id, target));
    }

    /// Add a short-call table entry (a bytecode target).
    pub(crate) fn add_short_call(&mut self, target: Ref, arg_count: u8) -> u8 {
        self.short_calls.push((target, arg_count));
        (self.short_calls.len() - 1) as u8
    }

    /// Set a builtin slot.
    pub(crate) fn set_builtin(&mut self, builtin: Builtin, target: Ref) {
        self.builtins[builtin as usize] = Some(target);
    }

    /// Add a global slot; returns its index.
    pub(crate) fn add_global(&mut self, init: Ref) -> u16 {
        self.globals.push(init);
        (self.globals.len() - 1) as u16
    }

    /// Add a bytecode function to ROM. Byte 0 of the payload is the
    /// required stack height in words.
    pub(crate) fn add_function(&mut self, max_stack_words: u8, code: Code) -> Ref {
        let mut payload = vec![max_stack_words];
        let base = payload.len();
        payload.extend_from_slice(&code.bytes);
        let patches = code
            .patches
            .into_iter()
            .map(|(at, r, kind)| (at + base, r, kind))
            .collect();
        self.rom_items.push(RomItem {
            tc: TypeCode::Function,
            payload,
            patches,
        });
        Ref::Rom(self.rom_items.len() - 1)
    }

    /// Add a ROM interned string (content + NUL) and register it in the
    /// sorted string table.
    pub(crate) fn add_interned_string(&mut self, text: &str) -> Ref {
        let mut payload = text.as_bytes().to_vec();
        payload.push(0);
        self.rom_items.push(RomItem {
            tc: TypeCode::InternedString,
            payload,
            patches: Vec::new(),
        });
        let index = self.rom_items.len() - 1;
        self.string_items.push(index);
        Ref::Rom(index)
    }

    /// Add a ROM boxed int32 (for literals outside the int14 range).
    pub(crate) fn add_int32(&mut self, value: i32) -> Ref {
        self.rom_items.push(RomItem {
            tc: TypeCode::Int32,
            payload: value.to_le_bytes().to_vec(),
            patches: Vec::new(),
        });
        Ref::Rom(self.rom_items.len() - 1)
    }

    /// Add a ROM host-function allocation wrapping an import index.
    pub(crate) fn add_host_func(&mut self, import_index: u8) -> Ref {
        self.rom_items.push(RomItem {
            tc: TypeCode::HostFunc,
            payload: u16::from(import_index).to_le_bytes().to_vec(),
            patches: Vec::new(),
        });
        Ref::Rom(self.rom_items.len() - 1)
    }

    /// Append an allocation to the initial heap section; returns its
    /// short-pointer raw value.
    pub(crate) fn heap_alloc(&mut self, tc: TypeCode, payload: &[u8]) -> u16 {
        let header = type_code::make_header(tc, payload.len() as u16);
        self.heap.extend_from_slice(&header.to_le_bytes());
        let ptr = self.heap.len() as u16;
        self.heap.extend_from_slice(payload);
        if self.heap.len() % 2 != 0 {
            self.heap.push(0);
        }
        ptr
    }

    /// Lay out the sections, resolve references, and seal the image.
    pub(crate) fn finish(mut self) -> Box<[u8]> {
        // Sort the string table by content (the NUL makes prefix order
        // equal length order), as binary search expects
        self.string_items
            .sort_by(|&a, &b| self.rom_items[a].payload.cmp(&self.rom_items[b].payload));

        // Section layout
        let import_offset = HEADER_SIZE;
        let export_offset = import_offset + self.imports.len() * 2;
        let short_call_offset = export_offset + self.exports.len() * 4;
        let builtins_offset = short_call_offset + self.short_calls.len() * 3;
        // Keep the section table 16-bit aligned past the odd-sized
        // short-call entries
        let builtins_offset = (builtins_offset + 1) & !1;
        let string_table_offset = builtins_offset + Builtin::COUNT * 2;
        let rom_offset = string_table_offset + self.string_items.len() * 2;

        // ROM item offsets (payload offsets, headers included in layout)
        let mut rom_payload_offsets = Vec::with_capacity(self.rom_items.len());
        let mut at = rom_offset;
        for item in &self.rom_items {
            at += 2; // header
            rom_payload_offsets.push(at as u16);
            at += (item.payload.len() + 1) & !1;
        }
        let globals_offset = at;
        let heap_offset = globals_offset + self.globals.len() * 2;
        let total_size = heap_offset + self.heap.len();
        assert!(total_size <= usize::from(u16::MAX), "test image too large");

        let resolve = |r: Ref| -> u16 {
            match r {
                Ref::Raw(raw) => raw,
                Ref::Rom(index) => encoding::bytecode_mapped_encode(rom_payload_offsets[index]),
                Ref::Global(index) => {
                    encoding::bytecode_mapped_encode((globals_offset + usize::from(index) * 2) as u16)
                }
            }
        };

        let mut out = vec![0u8; total_size];
        let write_u16 = |buf: &mut Vec<u8>, at: usize, v: u16| {
            buf[at..at + 2].copy_from_slice(&v.to_le_bytes());
        };

        // Header
        out[OFF_BYTECODE_VERSION] = BYTECODE_VERSION;
        out[OFF_HEADER_SIZE] = HEADER_SIZE as u8;
        out[OFF_REQUIRED_ENGINE_VERSION] = ENGINE_VERSION;
        write_u16(&mut out, OFF_BYTECODE_SIZE, total_size as u16);
        let feature_flags = if cfg!(feature = "float") {
            FEATURE_FLAG_FLOAT_SUPPORT
        } else {
            0
        };
        out[OFF_REQUIRED_FEATURE_FLAGS..OFF_REQUIRED_FEATURE_FLAGS + 4]
            .copy_from_slice(&feature_flags.to_le_bytes());

        let section_offsets = [
            import_offset,
            export_offset,
            short_call_offset,
            builtins_offset,
            string_table_offset,
            rom_offset,
            globals_offset,
            heap_offset,
        ];
        for (section, offset) in Section::ALL.iter().zip(section_offsets) {
            write_u16(&mut out, section.header_field_offset(), offset as u16);
        }

        // Tables
        for (i, id) in self.imports.iter().enumerate() {
            write_u16(&mut out, import_offset + i * 2, *id);
        }
        for (i, (id, target)) in self.exports.iter().enumerate() {
            write_u16(&mut out, export_offset + i * 4, *id);
            write_u16(&mut out, export_offset + i * 4 + 2, resolve(*target));
        }
        for (i, (target, arg_count)) in self.short_calls.iter().enumerate() {
            let raw = match *target {
                // Bytecode targets are stored as the bare (even) offset
                Ref::Rom(index) => rom_payload_offsets[index],
                Ref::Raw(raw) => raw,
                Ref::Global(_) => unreachable!("short-call targets are functions or imports"),
            };
            let at = short_call_offset + i * 3;
            out[at..at + 2].copy_from_slice(&raw.to_le_bytes());
            out[at + 2] = *arg_count;
        }
        for (i, builtin) in self.builtins.iter().enumerate() {
            let raw = builtin.map_or(Value::NULL.raw(), resolve);
            write_u16(&mut out, builtins_offset + i * 2, raw);
        }
        for (i, &item) in self.string_items.iter().enumerate() {
            write_u16(
                &mut out,
                string_table_offset + i * 2,
                encoding::bytecode_mapped_encode(rom_payload_offsets[item]),
            );
        }

        // ROM allocations
        for (item, &payload_offset) in self.rom_items.iter().zip(&rom_payload_offsets) {
            let header = type_code::make_header(item.tc, item.payload.len() as u16);
            let at = usize::from(payload_offset);
            write_u16(&mut out, at - 2, header);
            out[at..at + item.payload.len()].copy_from_slice(&item.payload);
            for &(pos, r, kind) in &item.patches {
                let raw = match kind {
                    Patch::Value => resolve(r),
                    Patch::Offset => match r {
                        Ref::Rom(index) => rom_payload_offsets[index],
                        Ref::Raw(raw) => raw,
                        Ref::Global(_) => unreachable!("offset patches target ROM items"),
                    },
                };
                write_u16(&mut out, at + pos, raw);
            }
        }

        // Globals and heap
        for (i, g) in self.globals.iter().enumerate() {
            write_u16(&mut out, globals_offset + i * 2, resolve(*g));
        }
        out[heap_offset..heap_offset + self.heap.len()].copy_from_slice(&self.heap);

        // Seal
        let crc = port::crc16_ccitt(&out[CRC_START..]);
        write_u16(&mut out, OFF_CRC, crc);
        out.into_boxed_slice()
    }
}

/// An empty but valid image: header, empty tables, no globals, no heap.
pub(crate) fn minimal_image() -> Box<[u8]> {
    ImageBuilder::new().finish()
}

/// A VM restored from the minimal image.
pub(crate) fn minimal_vm() -> crate::vm::Vm {
    crate::vm::Vm::restore(minimal_image(), |_| None).expect("minimal image restores")
}

/// A VM whose interned-strings builtin is wired through a global slot, as
/// the compiler does for images that intern at runtime.
pub(crate) fn vm_with_intern_chain() -> crate::vm::Vm {
    let mut b = ImageBuilder::new();
    let slot = b.add_global(Ref::Raw(Value::NULL.raw()));
    b.set_builtin(Builtin::InternedStrings, Ref::Global(slot));
    crate::vm::Vm::restore(b.finish(), |_| None).expect("intern-chain image restores")
}

/// A small bytecode assembler for tests.
#[derive(Default)]
pub(crate) struct Code {
    bytes: Vec<u8>,
    patches: Vec<(usize, Ref, Patch)>,
}

impl Code {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn op(mut self, primary: u8, nibble: u8) -> Self {
        self.bytes.push(instr(primary, nibble));
        self
    }

    /// Append a raw byte (inner immediates like SCOPE_PUSH's count).
    pub(crate) fn byte(mut self, b: u8) -> Self {
        self.bytes.push(b);
        self
    }

    pub(crate) fn ex1(self, sub: u8) -> Self {
        self.op(op::EXTENDED_1, sub)
    }

    pub(crate) fn ex2(mut self, sub: u8, imm: u8) -> Self {
        self.bytes.push(instr(op::EXTENDED_2, sub));
        self.bytes.push(imm);
        self
    }

    pub(crate) fn ex3(mut self, sub: u8, imm: u16) -> Self {
        self.bytes.push(instr(op::EXTENDED_3, sub));
        self.bytes.extend_from_slice(&imm.to_le_bytes());
        self
    }

    /// LOAD_LITERAL of a symbolic reference.
    pub(crate) fn load_literal_ref(mut self, r: Ref) -> Self {
        self.bytes.push(instr(op::EXTENDED_3, op3::LOAD_LITERAL));
        self.patches.push((self.bytes.len(), r, Patch::Value));
        self.bytes.extend_from_slice(&[0, 0]);
        self
    }

    /// LOAD_LITERAL of a concrete value.
    pub(crate) fn load_literal(self, v: Value) -> Self {
        self.ex3(op3::LOAD_LITERAL, v.raw())
    }

    /// CALL_5 of a function by symbolic reference.
    pub(crate) fn call_5(mut self, target: Ref, arg_count: u8) -> Self {
        self.bytes.push(instr(op::CALL_5, arg_count));
        self.patches.push((self.bytes.len(), target, Patch::Offset));
        self.bytes.extend_from_slice(&[0, 0]);
        self
    }

    /// CALL_HOST with an import index.
    pub(crate) fn call_host(mut self, arg_count: u8, import_index: u8) -> Self {
        self.bytes.push(instr(op::EXTENDED_2, op2::CALL_HOST));
        self.bytes.push(arg_count);
        self.bytes.push(import_index);
        self
    }

    pub(crate) fn ret(self) -> Self {
        self.ex1(op1::RETURN)
    }
}
