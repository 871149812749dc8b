//! Binary form of class records
//!
//! Big-endian throughout. Strings are a `u32` byte length followed by UTF-8
//! bytes, lists a `u32` count followed by their items, optional values a
//! presence byte.

use super::*;
use grove_parser::ClassKind;
use miette::Diagnostic;
use thiserror::Error;

/// `GROV`
pub const MAGIC: u32 = 0x4752_4F56;
pub const VERSION: u16 = 1;

#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("not a Grove class file (magic {found:#010x})")]
    #[diagnostic(code(grove::bytecode::magic))]
    BadMagic { found: u32 },

    #[error("unsupported class file version {found}")]
    #[diagnostic(code(grove::bytecode::version))]
    UnsupportedVersion { found: u16 },

    #[error("class file truncated at byte {offset}")]
    #[diagnostic(code(grove::bytecode::truncated))]
    Truncated { offset: usize },

    #[error("invalid {what} tag {tag} at byte {offset}")]
    #[diagnostic(code(grove::bytecode::tag))]
    InvalidTag {
        what: &'static str,
        tag: u8,
        offset: usize,
    },

    #[error("invalid UTF-8 string at byte {offset}")]
    #[diagnostic(code(grove::bytecode::utf8))]
    InvalidString { offset: usize },
}

pub fn encode(class: &ClassFile) -> Vec<u8> {
    let mut out = Writer::default();
    out.u32(MAGIC);
    out.u16(VERSION);
    out.string(&class.name);
    out.optional(class.super_name.as_deref(), |out, name| out.string(name));
    out.list(&class.interfaces, |out, name| out.string(name));
    out.u8(kind_tag(class.kind));
    out.u16(class.flags);
    out.optional(class.source_file.as_deref(), |out, name| out.string(name));
    out.list(&class.captured, |out, name| out.string(name));
    out.u32(class.constants.len() as u32);
    for constant in &class.constants {
        out.string(constant);
    }
    out.list(&class.call_sites, |out, site| {
        out.u8(site.kind.tag());
        out.string(&site.name);
    });
    out.list(&class.fields, |out, field| {
        out.string(&field.name);
        out.string(&field.type_name);
        out.u16(field.flags);
    });
    out.list(&class.methods, |out, method| {
        out.string(&method.name);
        out.list(&method.parameter_types, |out, name| out.string(name));
        out.string(&method.return_type);
        out.u16(method.flags);
        out.u16(method.max_locals);
        out.list(&method.instructions, write_instruction);
        out.list(&method.exception_table, |out, entry| {
            out.u32(entry.start);
            out.u32(entry.end);
            out.u32(entry.handler);
            out.optional(entry.catch_type, |out, index| out.u16(index));
        });
    });
    out.bytes
}

pub fn decode(bytes: &[u8]) -> Result<ClassFile, DecodeError> {
    let mut input = Reader { bytes, offset: 0 };
    let magic = input.u32()?;
    if magic != MAGIC {
        return Err(DecodeError::BadMagic { found: magic });
    }
    let version = input.u16()?;
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion { found: version });
    }

    let name = input.string()?;
    let mut class = ClassFile::new(name, ClassKind::Class);
    class.super_name = input.optional(Reader::string)?;
    class.interfaces = input.list(Reader::string)?;
    let offset = input.offset;
    let tag = input.u8()?;
    class.kind = kind_from_tag(tag).ok_or(DecodeError::InvalidTag {
        what: "class kind",
        tag,
        offset,
    })?;
    class.flags = input.u16()?;
    class.source_file = input.optional(Reader::string)?;
    class.captured = input.list(Reader::string)?;
    for constant in input.list(Reader::string)? {
        class.constants.insert(constant);
    }
    class.call_sites = input.list(|input| {
        let offset = input.offset;
        let tag = input.u8()?;
        let kind = CallSiteKind::from_tag(tag).ok_or(DecodeError::InvalidTag {
            what: "call site",
            tag,
            offset,
        })?;
        Ok(CallSiteInfo {
            kind,
            name: input.string()?,
        })
    })?;
    class.fields = input.list(|input| {
        Ok(FieldInfo {
            name: input.string()?,
            type_name: input.string()?,
            flags: input.u16()?,
        })
    })?;
    class.methods = input.list(|input| {
        Ok(MethodInfo {
            name: input.string()?,
            parameter_types: input.list(Reader::string)?,
            return_type: input.string()?,
            flags: input.u16()?,
            max_locals: input.u16()?,
            instructions: input.list(read_instruction)?,
            exception_table: input.list(|input| {
                Ok(ExceptionEntry {
                    start: input.u32()?,
                    end: input.u32()?,
                    handler: input.u32()?,
                    catch_type: input.optional(Reader::u16)?,
                })
            })?,
        })
    })?;
    Ok(class)
}

fn kind_tag(kind: ClassKind) -> u8 {
    match kind {
        ClassKind::Class => 0,
        ClassKind::Interface => 1,
        ClassKind::Enum => 2,
        ClassKind::Script => 3,
        ClassKind::Closure => 4,
    }
}

fn kind_from_tag(tag: u8) -> Option<ClassKind> {
    Some(match tag {
        0 => ClassKind::Class,
        1 => ClassKind::Interface,
        2 => ClassKind::Enum,
        3 => ClassKind::Script,
        4 => ClassKind::Closure,
        _ => return None,
    })
}

fn write_instruction(out: &mut Writer, instruction: &Instruction) {
    use Instruction::*;
    match instruction {
        Nop => out.u8(0),
        PushNull => out.u8(1),
        PushTrue => out.u8(2),
        PushFalse => out.u8(3),
        PushInt(value) => {
            out.u8(4);
            out.i64(*value);
        }
        PushFloat(value) => {
            out.u8(5);
            out.u64(value.to_bits());
        }
        PushConst(index) => out.op16(6, *index),
        PushClass(index) => out.op16(7, *index),
        Pop => out.u8(8),
        Dup => out.u8(9),
        Swap => out.u8(10),
        Load(slot) => out.op16(11, *slot),
        Store(slot) => out.op16(12, *slot),
        NewRef => out.u8(13),
        LoadRef(slot) => out.op16(14, *slot),
        StoreRef(slot) => out.op16(15, *slot),
        GetField(name) => out.op16(16, *name),
        SetField(name) => out.op16(17, *name),
        GetStatic { class, name } => {
            out.op16(18, *class);
            out.u16(*name);
        }
        SetStatic { class, name } => {
            out.op16(19, *class);
            out.u16(*name);
        }
        Call { site, argc } => {
            out.op16(20, *site);
            out.u8(*argc);
        }
        CmpZero(comparison) => {
            out.u8(21);
            out.u8(comparison.tag());
        }
        Eq => out.u8(22),
        Ne => out.u8(23),
        Not => out.u8(24),
        Jump(target) => out.op32(25, *target),
        JumpIfFalse(target) => out.op32(26, *target),
        JumpIfTrue(target) => out.op32(27, *target),
        JumpIfNull(target) => out.op32(28, *target),
        JumpIfNonNull(target) => out.op32(29, *target),
        NewList(count) => out.op16(30, *count),
        NewMap(count) => out.op16(31, *count),
        NewGString { strings, values } => {
            out.u8(32);
            out.list(strings, |out, index| out.u16(*index));
            out.u16(*values);
        }
        MakeClosure { class, captured } => {
            out.op16(33, *class);
            out.u16(*captured);
        }
        Cast(class) => out.op16(34, *class),
        InstanceOf(class) => out.op16(35, *class),
        Throw => out.u8(36),
        MonitorEnter => out.u8(37),
        MonitorExit => out.u8(38),
        GetIterator => out.u8(39),
        IterNext(target) => out.op32(40, *target),
        Return => out.u8(41),
    }
}

fn read_instruction(input: &mut Reader<'_>) -> Result<Instruction, DecodeError> {
    use Instruction::*;
    let offset = input.offset;
    let opcode = input.u8()?;
    Ok(match opcode {
        0 => Nop,
        1 => PushNull,
        2 => PushTrue,
        3 => PushFalse,
        4 => PushInt(input.i64()?),
        5 => PushFloat(f64::from_bits(input.u64()?)),
        6 => PushConst(input.u16()?),
        7 => PushClass(input.u16()?),
        8 => Pop,
        9 => Dup,
        10 => Swap,
        11 => Load(input.u16()?),
        12 => Store(input.u16()?),
        13 => NewRef,
        14 => LoadRef(input.u16()?),
        15 => StoreRef(input.u16()?),
        16 => GetField(input.u16()?),
        17 => SetField(input.u16()?),
        18 => GetStatic {
            class: input.u16()?,
            name: input.u16()?,
        },
        19 => SetStatic {
            class: input.u16()?,
            name: input.u16()?,
        },
        20 => Call {
            site: input.u16()?,
            argc: input.u8()?,
        },
        21 => {
            let offset = input.offset;
            let tag = input.u8()?;
            CmpZero(Comparison::from_tag(tag).ok_or(DecodeError::InvalidTag {
                what: "comparison",
                tag,
                offset,
            })?)
        }
        22 => Eq,
        23 => Ne,
        24 => Not,
        25 => Jump(input.u32()?),
        26 => JumpIfFalse(input.u32()?),
        27 => JumpIfTrue(input.u32()?),
        28 => JumpIfNull(input.u32()?),
        29 => JumpIfNonNull(input.u32()?),
        30 => NewList(input.u16()?),
        31 => NewMap(input.u16()?),
        32 => NewGString {
            strings: input.list(Reader::u16)?,
            values: input.u16()?,
        },
        33 => MakeClosure {
            class: input.u16()?,
            captured: input.u16()?,
        },
        34 => Cast(input.u16()?),
        35 => InstanceOf(input.u16()?),
        36 => Throw,
        37 => MonitorEnter,
        38 => MonitorExit,
        39 => GetIterator,
        40 => IterNext(input.u32()?),
        41 => Return,
        tag => {
            return Err(DecodeError::InvalidTag {
                what: "opcode",
                tag,
                offset,
            })
        }
    })
}

#[derive(Default)]
struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    fn u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    fn u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    fn u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    fn i64(&mut self, value: i64) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    fn op16(&mut self, opcode: u8, operand: u16) {
        self.u8(opcode);
        self.u16(operand);
    }

    fn op32(&mut self, opcode: u8, operand: u32) {
        self.u8(opcode);
        self.u32(operand);
    }

    fn string(&mut self, value: &str) {
        self.u32(value.len() as u32);
        self.bytes.extend_from_slice(value.as_bytes());
    }

    fn list<T>(&mut self, items: &[T], mut write: impl FnMut(&mut Self, &T)) {
        self.u32(items.len() as u32);
        for item in items {
            write(self, item);
        }
    }

    fn optional<T>(&mut self, value: Option<T>, write: impl FnOnce(&mut Self, T)) {
        match value {
            Some(value) => {
                self.u8(1);
                write(self, value);
            }
            None => self.u8(0),
        }
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .offset
            .checked_add(count)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(DecodeError::Truncated {
                offset: self.offset,
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let length = self.u32()? as usize;
        let offset = self.offset;
        let bytes = self.take(length)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidString { offset })
    }

    fn list<T>(
        &mut self,
        mut read: impl FnMut(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Vec<T>, DecodeError> {
        let count = self.u32()? as usize;
        // a corrupt count must not reserve unbounded memory
        let mut items = Vec::with_capacity(count.min(self.bytes.len()));
        for _ in 0..count {
            items.push(read(self)?);
        }
        Ok(items)
    }

    fn optional<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Option<T>, DecodeError> {
        let offset = self.offset;
        match self.u8()? {
            0 => Ok(None),
            1 => read(self).map(Some),
            tag => Err(DecodeError::InvalidTag {
                what: "presence",
                tag,
                offset,
            }),
        }
    }
}
