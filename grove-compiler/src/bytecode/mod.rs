//! Class records produced by class generation
//!
//! A [`ClassFile`] is what the runtime loads: the class header, fields,
//! methods with their stack code, the call-site table and a string constant
//! pool. [`encode`] and [`decode`] convert it to and from its binary form.

mod encode;

pub use encode::{decode, encode, DecodeError, MAGIC, VERSION};

use grove_parser::{ClassKind, Modifiers};
use indexmap::IndexSet;

/// Flag bit on methods and fields generated by the compiler
pub const ACC_SYNTHETIC: u16 = 1 << 8;
/// Flag bit on bridge methods
pub const ACC_BRIDGE: u16 = 1 << 9;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub kind: ClassKind,
    /// Modifier bits, see [`Modifiers::bits`]
    pub flags: u16,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub call_sites: Vec<CallSiteInfo>,
    pub constants: IndexSet<String>,
    pub source_file: Option<String>,
    /// Names of the variables a closure class captures, in slot order
    pub captured: Vec<String>,
}

impl ClassFile {
    pub fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            super_name: None,
            interfaces: Vec::new(),
            kind,
            flags: 0,
            fields: Vec::new(),
            methods: Vec::new(),
            call_sites: Vec::new(),
            constants: IndexSet::new(),
            source_file: None,
            captured: Vec::new(),
        }
    }

    /// Index of `value` in the constant pool, adding it when missing
    pub fn constant(&mut self, value: &str) -> u16 {
        let (index, _) = self.constants.insert_full(value.to_string());
        index as u16
    }

    pub fn constant_at(&self, index: u16) -> Option<&str> {
        self.constants.get_index(index as usize).map(String::as_str)
    }

    /// Adds a call site; every call expression gets its own
    pub fn call_site(&mut self, kind: CallSiteKind, name: &str) -> u16 {
        self.call_sites.push(CallSiteInfo {
            kind,
            name: name.to_string(),
        });
        (self.call_sites.len() - 1) as u16
    }

    pub fn modifiers(&self) -> Modifiers {
        Modifiers::from_bits(self.flags & 0xff)
    }

    pub fn method(&self, name: &str, arity: usize) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.parameter_types.len() == arity)
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub type_name: String,
    pub flags: u16,
}

impl FieldInfo {
    pub fn is_static(&self) -> bool {
        Modifiers::from_bits(self.flags & 0xff).is_static()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub name: String,
    pub parameter_types: Vec<String>,
    pub return_type: String,
    pub flags: u16,
    /// Slots needed by the frame, receiver and parameters included
    pub max_locals: u16,
    pub instructions: Vec<Instruction>,
    pub exception_table: Vec<ExceptionEntry>,
}

impl MethodInfo {
    pub fn modifiers(&self) -> Modifiers {
        Modifiers::from_bits(self.flags & 0xff)
    }

    pub fn is_static(&self) -> bool {
        self.modifiers().is_static()
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers().is_abstract()
    }

    pub fn is_synthetic(&self) -> bool {
        self.flags & ACC_SYNTHETIC != 0
    }

    pub fn is_bridge(&self) -> bool {
        self.flags & ACC_BRIDGE != 0
    }
}

/// A protected range `[start, end)` and where control goes when it throws
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionEntry {
    pub start: u32,
    pub end: u32,
    pub handler: u32,
    /// Constant naming the caught class; `None` catches everything
    pub catch_type: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallSiteKind {
    /// Receiver and arguments on the stack; a class receiver calls statics
    Method,
    /// Like `Method`, but a null receiver yields null
    SafeMethod,
    GetProperty,
    SafeGetProperty,
    /// Receiver and value on the stack; pushes the value back
    SetProperty,
    /// `new Name(args)`, the site name is the class
    Constructor,
    /// `super.name(args)` on the receiver
    SuperMethod,
    /// `super(args)` inside a constructor
    SuperInit,
    /// `this(args)` inside a constructor
    ThisInit,
}

impl CallSiteKind {
    pub const ALL: [CallSiteKind; 9] = [
        CallSiteKind::Method,
        CallSiteKind::SafeMethod,
        CallSiteKind::GetProperty,
        CallSiteKind::SafeGetProperty,
        CallSiteKind::SetProperty,
        CallSiteKind::Constructor,
        CallSiteKind::SuperMethod,
        CallSiteKind::SuperInit,
        CallSiteKind::ThisInit,
    ];

    pub fn tag(self) -> u8 {
        match self {
            CallSiteKind::Method => 0,
            CallSiteKind::SafeMethod => 1,
            CallSiteKind::GetProperty => 2,
            CallSiteKind::SafeGetProperty => 3,
            CallSiteKind::SetProperty => 4,
            CallSiteKind::Constructor => 5,
            CallSiteKind::SuperMethod => 6,
            CallSiteKind::SuperInit => 7,
            CallSiteKind::ThisInit => 8,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    pub fn is_safe(self) -> bool {
        matches!(self, CallSiteKind::SafeMethod | CallSiteKind::SafeGetProperty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSiteInfo {
    pub kind: CallSiteKind,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl Comparison {
    pub fn tag(self) -> u8 {
        match self {
            Comparison::Less => 0,
            Comparison::LessEqual => 1,
            Comparison::Greater => 2,
            Comparison::GreaterEqual => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        [
            Comparison::Less,
            Comparison::LessEqual,
            Comparison::Greater,
            Comparison::GreaterEqual,
        ]
        .into_iter()
        .find(|c| c.tag() == tag)
    }

    /// Applies the comparison to a `compareTo` result
    pub fn holds(self, ordering: i64) -> bool {
        match self {
            Comparison::Less => ordering < 0,
            Comparison::LessEqual => ordering <= 0,
            Comparison::Greater => ordering > 0,
            Comparison::GreaterEqual => ordering >= 0,
        }
    }
}

/// Stack machine instructions
///
/// Jump targets are instruction indexes. Constant operands index the class's
/// constant pool; `Call` operands index its call-site table.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Nop,
    PushNull,
    PushTrue,
    PushFalse,
    PushInt(i64),
    PushFloat(f64),
    /// String constant
    PushConst(u16),
    /// Class named by a constant
    PushClass(u16),
    Pop,
    Dup,
    Swap,
    Load(u16),
    Store(u16),
    /// Wraps the top of the stack in a fresh shared reference cell
    NewRef,
    /// Reads through the reference cell held in a slot
    LoadRef(u16),
    /// Writes through the reference cell held in a slot
    StoreRef(u16),
    /// Object on the stack; field named by a constant
    GetField(u16),
    /// Object and value on the stack; pushes the value back
    SetField(u16),
    GetStatic { class: u16, name: u16 },
    /// Value on the stack; pushes it back
    SetStatic { class: u16, name: u16 },
    Call { site: u16, argc: u8 },
    /// Turns a `compareTo` result into a boolean
    CmpZero(Comparison),
    Eq,
    Ne,
    Not,
    Jump(u32),
    JumpIfFalse(u32),
    JumpIfTrue(u32),
    JumpIfNull(u32),
    JumpIfNonNull(u32),
    NewList(u16),
    /// Pops `2 * n` values, key before value
    NewMap(u16),
    /// Literal parts are constants; pops one value per gap between them
    NewGString { strings: Vec<u16>, values: u16 },
    /// Pops the owner and `captured` reference cells
    MakeClosure { class: u16, captured: u16 },
    Cast(u16),
    InstanceOf(u16),
    Throw,
    MonitorEnter,
    MonitorExit,
    GetIterator,
    /// Pops an iterator; pushes its next value or jumps when it is exhausted
    IterNext(u32),
    Return,
}

impl Instruction {
    /// Ends the straight-line flow of a method
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Instruction::Return | Instruction::Throw | Instruction::Jump(_)
        )
    }
}
