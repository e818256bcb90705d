//! Java bytecode instruction opcodes
//!
//! Values follow the JVM specification, ordered by opcode value. Only the
//! opcodes that `MethodWriter` emits or the disassembler special-cases get a
//! named constant; every assigned opcode has a mnemonic.

pub const NOP: u8 = 0x00;
pub const ACONST_NULL: u8 = 0x01;
pub const ICONST_M1: u8 = 0x02;
pub const ICONST_0: u8 = 0x03;
pub const ICONST_1: u8 = 0x04;
pub const ICONST_2: u8 = 0x05;
pub const ICONST_3: u8 = 0x06;
pub const ICONST_4: u8 = 0x07;
pub const ICONST_5: u8 = 0x08;
pub const BIPUSH: u8 = 0x10;
pub const SIPUSH: u8 = 0x11;
pub const LDC: u8 = 0x12;
pub const LDC_W: u8 = 0x13;
pub const LDC2_W: u8 = 0x14;

pub const ILOAD: u8 = 0x15;
pub const LLOAD: u8 = 0x16;
pub const FLOAD: u8 = 0x17;
pub const DLOAD: u8 = 0x18;
pub const ALOAD: u8 = 0x19;
pub const ILOAD_0: u8 = 0x1a;
pub const ALOAD_0: u8 = 0x2a;
pub const ALOAD_3: u8 = 0x2d;

pub const ISTORE: u8 = 0x36;
pub const LSTORE: u8 = 0x37;
pub const FSTORE: u8 = 0x38;
pub const DSTORE: u8 = 0x39;
pub const ASTORE: u8 = 0x3a;
pub const ISTORE_0: u8 = 0x3b;
pub const ASTORE_3: u8 = 0x4e;

pub const POP: u8 = 0x57;
pub const DUP: u8 = 0x59;
pub const IINC: u8 = 0x84;

pub const IFEQ: u8 = 0x99;
pub const IFNE: u8 = 0x9a;
pub const IFLT: u8 = 0x9b;
pub const IFGE: u8 = 0x9c;
pub const IFGT: u8 = 0x9d;
pub const IFLE: u8 = 0x9e;
pub const IF_ICMPEQ: u8 = 0x9f;
pub const IF_ICMPNE: u8 = 0xa0;
pub const IF_ICMPLT: u8 = 0xa1;
pub const IF_ICMPGE: u8 = 0xa2;
pub const IF_ICMPGT: u8 = 0xa3;
pub const IF_ICMPLE: u8 = 0xa4;
pub const IF_ACMPEQ: u8 = 0xa5;
pub const IF_ACMPNE: u8 = 0xa6;
pub const GOTO: u8 = 0xa7;
pub const JSR: u8 = 0xa8;
pub const RET: u8 = 0xa9;
pub const TABLESWITCH: u8 = 0xaa;
pub const LOOKUPSWITCH: u8 = 0xab;
pub const IRETURN: u8 = 0xac;
pub const LRETURN: u8 = 0xad;
pub const FRETURN: u8 = 0xae;
pub const DRETURN: u8 = 0xaf;
pub const ARETURN: u8 = 0xb0;
pub const RETURN: u8 = 0xb1;

pub const GETSTATIC: u8 = 0xb2;
pub const PUTSTATIC: u8 = 0xb3;
pub const GETFIELD: u8 = 0xb4;
pub const PUTFIELD: u8 = 0xb5;
pub const INVOKEVIRTUAL: u8 = 0xb6;
pub const INVOKESPECIAL: u8 = 0xb7;
pub const INVOKESTATIC: u8 = 0xb8;
pub const INVOKEINTERFACE: u8 = 0xb9;
pub const INVOKEDYNAMIC: u8 = 0xba;
pub const NEW: u8 = 0xbb;
pub const ATHROW: u8 = 0xbf;
pub const CHECKCAST: u8 = 0xc0;
pub const INSTANCEOF: u8 = 0xc1;

pub const WIDE: u8 = 0xc4;
pub const MULTIANEWARRAY: u8 = 0xc5;
pub const IFNULL: u8 = 0xc6;
pub const IFNONNULL: u8 = 0xc7;
pub const GOTO_W: u8 = 0xc8;
pub const JSR_W: u8 = 0xc9;

const MNEMONICS: [&str; 0xca] = [
    "nop", "aconst_null", "iconst_m1", "iconst_0", "iconst_1", "iconst_2", "iconst_3", "iconst_4",
    "iconst_5", "lconst_0", "lconst_1", "fconst_0", "fconst_1", "fconst_2", "dconst_0", "dconst_1",
    "bipush", "sipush", "ldc", "ldc_w", "ldc2_w", "iload", "lload", "fload",
    "dload", "aload", "iload_0", "iload_1", "iload_2", "iload_3", "lload_0", "lload_1",
    "lload_2", "lload_3", "fload_0", "fload_1", "fload_2", "fload_3", "dload_0", "dload_1",
    "dload_2", "dload_3", "aload_0", "aload_1", "aload_2", "aload_3", "iaload", "laload",
    "faload", "daload", "aaload", "baload", "caload", "saload", "istore", "lstore",
    "fstore", "dstore", "astore", "istore_0", "istore_1", "istore_2", "istore_3", "lstore_0",
    "lstore_1", "lstore_2", "lstore_3", "fstore_0", "fstore_1", "fstore_2", "fstore_3", "dstore_0",
    "dstore_1", "dstore_2", "dstore_3", "astore_0", "astore_1", "astore_2", "astore_3", "iastore",
    "lastore", "fastore", "dastore", "aastore", "bastore", "castore", "sastore", "pop",
    "pop2", "dup", "dup_x1", "dup_x2", "dup2", "dup2_x1", "dup2_x2", "swap",
    "iadd", "ladd", "fadd", "dadd", "isub", "lsub", "fsub", "dsub",
    "imul", "lmul", "fmul", "dmul", "idiv", "ldiv", "fdiv", "ddiv",
    "irem", "lrem", "frem", "drem", "ineg", "lneg", "fneg", "dneg",
    "ishl", "lshl", "ishr", "lshr", "iushr", "lushr", "iand", "land",
    "ior", "lor", "ixor", "lxor", "iinc", "i2l", "i2f", "i2d",
    "l2i", "l2f", "l2d", "f2i", "f2l", "f2d", "d2i", "d2l",
    "d2f", "i2b", "i2c", "i2s", "lcmp", "fcmpl", "fcmpg", "dcmpl",
    "dcmpg", "ifeq", "ifne", "iflt", "ifge", "ifgt", "ifle", "if_icmpeq",
    "if_icmpne", "if_icmplt", "if_icmpge", "if_icmpgt", "if_icmple", "if_acmpeq", "if_acmpne", "goto",
    "jsr", "ret", "tableswitch", "lookupswitch", "ireturn", "lreturn", "freturn", "dreturn",
    "areturn", "return", "getstatic", "putstatic", "getfield", "putfield", "invokevirtual", "invokespecial",
    "invokestatic", "invokeinterface", "invokedynamic", "new", "newarray", "anewarray", "arraylength", "athrow",
    "checkcast", "instanceof", "monitorenter", "monitorexit", "wide", "multianewarray", "ifnull", "ifnonnull",
    "goto_w", "jsr_w",
];

/// Mnemonic of an opcode, `None` for unassigned values.
pub fn mnemonic(opcode: u8) -> Option<&'static str> {
    MNEMONICS.get(opcode as usize).copied()
}

/// Number of operand bytes following `opcode`.
///
/// `None` for the variable-length instructions (`tableswitch`, `lookupswitch`,
/// `wide`) and for unassigned opcodes.
pub fn operand_length(opcode: u8) -> Option<usize> {
    match opcode {
        0x00..=0x0f => Some(0),
        BIPUSH => Some(1),
        SIPUSH => Some(2),
        LDC => Some(1),
        LDC_W | LDC2_W => Some(2),
        ILOAD..=ALOAD => Some(1),
        0x1a..=0x35 => Some(0),
        ISTORE..=ASTORE => Some(1),
        0x3b..=0x83 => Some(0),
        IINC => Some(2),
        0x85..=0x98 => Some(0),
        IFEQ..=JSR => Some(2),
        RET => Some(1),
        TABLESWITCH | LOOKUPSWITCH => None,
        IRETURN..=RETURN => Some(0),
        GETSTATIC..=INVOKESTATIC => Some(2),
        INVOKEINTERFACE | INVOKEDYNAMIC => Some(4),
        NEW => Some(2),
        0xbc => Some(1),
        0xbd => Some(2),
        0xbe | ATHROW => Some(0),
        CHECKCAST | INSTANCEOF => Some(2),
        0xc2 | 0xc3 => Some(0),
        WIDE => None,
        MULTIANEWARRAY => Some(3),
        IFNULL | IFNONNULL => Some(2),
        GOTO_W | JSR_W => Some(4),
        _ => None,
    }
}

/// Conditional and unconditional branches with a 16-bit offset.
pub fn is_jump(opcode: u8) -> bool {
    matches!(opcode, IFEQ..=JSR | IFNULL | IFNONNULL)
}

/// Instructions after which control never falls through.
pub fn ends_block(opcode: u8) -> bool {
    matches!(opcode, GOTO | GOTO_W | IRETURN..=RETURN | ATHROW | RET | TABLESWITCH | LOOKUPSWITCH)
}

/// Local slot encoded in a `xload_n` / `xstore_n` shorthand.
pub fn implicit_local(opcode: u8) -> Option<u16> {
    match opcode {
        0x1a..=0x2d => Some(((opcode - 0x1a) % 4) as u16),
        0x3b..=0x4e => Some(((opcode - 0x3b) % 4) as u16),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics_line_up_with_values() {
        assert_eq!(mnemonic(ICONST_1), Some("iconst_1"));
        assert_eq!(mnemonic(IF_ACMPNE), Some("if_acmpne"));
        assert_eq!(mnemonic(INVOKEDYNAMIC), Some("invokedynamic"));
        assert_eq!(mnemonic(ASTORE_3), Some("astore_3"));
        assert_eq!(mnemonic(JSR_W), Some("jsr_w"));
        assert_eq!(mnemonic(0xfe), None);
    }

    #[test]
    fn shorthand_locals() {
        assert_eq!(implicit_local(0x2b), Some(1)); // aload_1
        assert_eq!(implicit_local(0x3d), Some(2)); // istore_2
        assert_eq!(implicit_local(ALOAD), None);
    }
}
