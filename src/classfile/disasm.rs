//! Bytecode disassembly with symbolic constant pool references

use std::fmt;

use super::bytes::ByteReader;
use super::constpool::{Constant, ConstantPool, MemberRef};
use super::error::{ClassFormatError, ClassFormatResult};
use super::opcodes::*;

/// Resolved operand of an `ldc` family instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedConstant {
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    Class(String),
    MethodType(String),
    /// Method handles and dynamic constants, left as pool indices.
    Index(u16),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Int(i32),
    Local(u16),
    Iinc { slot: u16, delta: i16 },
    Constant(LoadedConstant),
    Member(MemberRef),
    InvokeDynamic { bootstrap: u16, name: String, descriptor: String },
    Type(String),
    MultiANewArray { class: String, dimensions: u8 },
    /// Absolute target offset.
    Branch(usize),
    Switch { default: usize, targets: Vec<(i32, usize)> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub offset: usize,
    pub opcode: u8,
    /// Set when the instruction was prefixed by `wide`.
    pub wide: bool,
    pub operand: Operand,
}

impl Instruction {
    pub fn mnemonic(&self) -> &'static str {
        mnemonic(self.opcode).unwrap_or("???")
    }

    pub fn member(&self) -> Option<&MemberRef> {
        match &self.operand {
            Operand::Member(member) => Some(member),
            _ => None,
        }
    }

    pub fn branch_target(&self) -> Option<usize> {
        match self.operand {
            Operand::Branch(target) => Some(target),
            _ => None,
        }
    }

    /// Local variable slot of a load, store, `iinc` or `ret`, including the
    /// `xload_n` shorthands.
    pub fn local(&self) -> Option<u16> {
        match self.operand {
            Operand::Local(slot) | Operand::Iinc { slot, .. } => Some(slot),
            _ => implicit_local(self.opcode),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5}: {}", self.offset, self.mnemonic())?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Int(value) => write!(f, " {}", value),
            Operand::Local(slot) => write!(f, " {}", slot),
            Operand::Iinc { slot, delta } => write!(f, " {}, {}", slot, delta),
            Operand::Constant(constant) => match constant {
                LoadedConstant::Int(v) => write!(f, " {}", v),
                LoadedConstant::Float(v) => write!(f, " {}f", v),
                LoadedConstant::Long(v) => write!(f, " {}L", v),
                LoadedConstant::Double(v) => write!(f, " {}d", v),
                LoadedConstant::String(v) => write!(f, " {:?}", v),
                LoadedConstant::Class(v) => write!(f, " {}.class", v),
                LoadedConstant::MethodType(v) => write!(f, " {}", v),
                LoadedConstant::Index(i) => write!(f, " #{}", i),
            },
            Operand::Member(member) => write!(f, " {}.{}:{}", member.owner, member.name, member.descriptor),
            Operand::InvokeDynamic { bootstrap, name, descriptor } => {
                write!(f, " #{}:{}:{}", bootstrap, name, descriptor)
            }
            Operand::Type(name) => write!(f, " {}", name),
            Operand::MultiANewArray { class, dimensions } => write!(f, " {}, {}", class, dimensions),
            Operand::Branch(target) => write!(f, " {}", target),
            Operand::Switch { default, targets } => {
                write!(f, " {{")?;
                for (key, target) in targets {
                    write!(f, " {}: {};", key, target)?;
                }
                write!(f, " default: {} }}", default)
            }
        }
    }
}

/// Decode a `Code` array.
pub fn disassemble(code: &[u8], pool: &ConstantPool) -> ClassFormatResult<Vec<Instruction>> {
    let mut reader = ByteReader::new(code);
    let mut instructions = Vec::new();
    while !reader.is_empty() {
        let offset = reader.position();
        let mut opcode = reader.u8()?;
        let wide = opcode == WIDE;
        if wide {
            opcode = reader.u8()?;
        }
        let operand = decode_operand(&mut reader, opcode, offset, wide, pool)?;
        instructions.push(Instruction { offset, opcode, wide, operand });
    }
    Ok(instructions)
}

fn decode_operand(
    reader: &mut ByteReader<'_>,
    opcode: u8,
    offset: usize,
    wide: bool,
    pool: &ConstantPool,
) -> ClassFormatResult<Operand> {
    let target = |delta: i64| -> ClassFormatResult<usize> {
        usize::try_from(offset as i64 + delta).map_err(|_| ClassFormatError::malformed("Code", "branch before start"))
    };
    if wide {
        return match opcode {
            IINC => Ok(Operand::Iinc { slot: reader.u16()?, delta: reader.u16()? as i16 }),
            ILOAD..=ALOAD | ISTORE..=ASTORE | RET => Ok(Operand::Local(reader.u16()?)),
            _ => Err(ClassFormatError::UnknownOpcode { opcode, offset }),
        };
    }
    Ok(match opcode {
        BIPUSH | 0xbc => Operand::Int(reader.u8()? as i8 as i32),
        SIPUSH => Operand::Int(reader.u16()? as i16 as i32),
        LDC => Operand::Constant(load_constant(pool, reader.u8()? as u16)?),
        LDC_W | LDC2_W => Operand::Constant(load_constant(pool, reader.u16()?)?),
        ILOAD..=ALOAD | ISTORE..=ASTORE | RET => Operand::Local(reader.u8()? as u16),
        IINC => Operand::Iinc { slot: reader.u8()? as u16, delta: reader.u8()? as i8 as i16 },
        GETSTATIC..=INVOKESTATIC => Operand::Member(pool.get_member_ref(reader.u16()?)?),
        INVOKEINTERFACE => {
            let member = pool.get_member_ref(reader.u16()?)?;
            reader.skip(2)?;
            Operand::Member(member)
        }
        INVOKEDYNAMIC => {
            let index = reader.u16()?;
            reader.skip(2)?;
            match pool.get(index)? {
                Constant::InvokeDynamic(bootstrap, nat) => {
                    let (name, descriptor) = pool.get_name_and_type(*nat)?;
                    Operand::InvokeDynamic {
                        bootstrap: *bootstrap,
                        name: name.to_string(),
                        descriptor: descriptor.to_string(),
                    }
                }
                _ => return Err(ClassFormatError::malformed("Code", format!("invokedynamic at {} without call site", offset))),
            }
        }
        NEW | 0xbd | CHECKCAST | INSTANCEOF => Operand::Type(pool.get_class_name(reader.u16()?)?.to_string()),
        MULTIANEWARRAY => Operand::MultiANewArray {
            class: pool.get_class_name(reader.u16()?)?.to_string(),
            dimensions: reader.u8()?,
        },
        op if is_jump(op) => Operand::Branch(target(reader.u16()? as i16 as i64)?),
        GOTO_W | JSR_W => Operand::Branch(target(reader.i32()? as i64)?),
        TABLESWITCH => {
            reader.align4()?;
            let default = target(reader.i32()? as i64)?;
            let low = reader.i32()?;
            let high = reader.i32()?;
            if high < low {
                return Err(ClassFormatError::malformed("Code", "tableswitch with high < low"));
            }
            let mut targets = Vec::with_capacity((high as i64 - low as i64 + 1) as usize);
            for key in low..=high {
                targets.push((key, target(reader.i32()? as i64)?));
            }
            Operand::Switch { default, targets }
        }
        LOOKUPSWITCH => {
            reader.align4()?;
            let default = target(reader.i32()? as i64)?;
            let pairs = reader.i32()?;
            let mut targets = Vec::with_capacity(pairs.max(0) as usize);
            for _ in 0..pairs {
                let key = reader.i32()?;
                targets.push((key, target(reader.i32()? as i64)?));
            }
            Operand::Switch { default, targets }
        }
        op => match operand_length(op) {
            Some(0) => Operand::None,
            _ => return Err(ClassFormatError::UnknownOpcode { opcode: op, offset }),
        },
    })
}

fn load_constant(pool: &ConstantPool, index: u16) -> ClassFormatResult<LoadedConstant> {
    Ok(match pool.get(index)? {
        Constant::Integer(v) => LoadedConstant::Int(*v),
        Constant::Float(v) => LoadedConstant::Float(*v),
        Constant::Long(v) => LoadedConstant::Long(*v),
        Constant::Double(v) => LoadedConstant::Double(*v),
        Constant::String(i) => LoadedConstant::String(pool.get_utf8(*i)?.to_string()),
        Constant::Class(i) => LoadedConstant::Class(pool.get_utf8(*i)?.to_string()),
        Constant::MethodType(i) => LoadedConstant::MethodType(pool.get_utf8(*i)?.to_string()),
        _ => LoadedConstant::Index(index),
    })
}
