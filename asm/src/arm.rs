use ast::{Arr, Ident};
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Register {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
    R10,
    R11,
    R12,
    Sp,
    Lr,
    Pc,
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::R0 => "r0",
            Self::R1 => "r1",
            Self::R2 => "r2",
            Self::R3 => "r3",
            Self::R4 => "r4",
            Self::R5 => "r5",
            Self::R6 => "r6",
            Self::R7 => "r7",
            Self::R8 => "r8",
            Self::R9 => "r9",
            Self::R10 => "r10",
            Self::R11 => "r11",
            Self::R12 => "r12",
            Self::Sp => "sp",
            Self::Lr => "lr",
            Self::Pc => "pc",
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Cond {
    #[default]
    Al,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Vs,
    Cs,
}

impl Cond {
    pub const fn negate(self) -> Self {
        match self {
            Self::Al => Self::Al,
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Gt => Self::Le,
            Self::Ge => Self::Lt,
            Self::Lt => Self::Ge,
            Self::Le => Self::Gt,
            // no inverse is ever needed for these
            Self::Vs => Self::Vs,
            Self::Cs => Self::Cs,
        }
    }
}

impl Display for Cond {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Al => "",
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Gt => "GT",
            Self::Ge => "GE",
            Self::Lt => "LT",
            Self::Le => "LE",
            Self::Vs => "VS",
            Self::Cs => "CS",
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Opcode {
    Mov,
    Ldr,
    Ldrsb,
    Str,
    Strb,
    Push,
    Pop,
    Add,
    Adds,
    Sub,
    Subs,
    Rsbs,
    Smull,
    Cmp,
    And,
    Orr,
    Eor,
    B,
    Bl,
}

impl Opcode {
    pub const fn load(size: u32) -> Self {
        if size == 1 {
            Self::Ldrsb
        } else {
            Self::Ldr
        }
    }

    pub const fn store(size: u32) -> Self {
        if size == 1 {
            Self::Strb
        } else {
            Self::Str
        }
    }

    pub const fn max_offset(self) -> i32 {
        match self {
            Self::Ldrsb => 255,
            _ => 4095,
        }
    }
}

/// Whether `value` fits a data-processing immediate: eight bits rotated right
/// by an even amount.
pub fn encodable(value: u32) -> bool {
    (0..16).any(|r| value.rotate_left(2 * r) <= 0xFF)
}

impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Mov => "MOV",
            Self::Ldr => "LDR",
            Self::Ldrsb => "LDRSB",
            Self::Str => "STR",
            Self::Strb => "STRB",
            Self::Push => "PUSH",
            Self::Pop => "POP",
            Self::Add => "ADD",
            Self::Adds => "ADDS",
            Self::Sub => "SUB",
            Self::Subs => "SUBS",
            Self::Rsbs => "RSBS",
            Self::Smull => "SMULL",
            Self::Cmp => "CMP",
            Self::And => "AND",
            Self::Orr => "ORR",
            Self::Eor => "EOR",
            Self::B => "B",
            Self::Bl => "BL",
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Shift {
    Lsl(u8),
    Asr(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Reg(Register),
    Imm(i32),
    Literal(i32),
    Address(Ident),
    Mem {
        base: Register,
        offset: i32,
        writeback: bool,
    },
    Indexed(Register, Register),
    Shifted(Register, Shift),
    RegList(Arr<Register>),
    Label(Ident),
}

impl Operand {
    pub const fn mem(base: Register, offset: i32) -> Self {
        Self::Mem {
            base,
            offset,
            writeback: false,
        }
    }

    pub const fn pre_indexed(base: Register, offset: i32) -> Self {
        Self::Mem {
            base,
            offset,
            writeback: true,
        }
    }

    pub fn label(name: impl Into<Ident>) -> Self {
        Self::Label(name.into())
    }
}

impl From<Register> for Operand {
    fn from(reg: Register) -> Self {
        Self::Reg(reg)
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Reg(r) => write!(f, "{r}"),
            Self::Imm(i) => write!(f, "#{i}"),
            Self::Literal(i) => write!(f, "={i}"),
            Self::Address(label) => write!(f, "={label}"),
            Self::Mem {
                base,
                offset: 0,
                writeback: false,
            } => write!(f, "[{base}]"),
            Self::Mem {
                base,
                offset,
                writeback,
            } => write!(f, "[{base}, #{offset}]{}", if *writeback { "!" } else { "" }),
            Self::Indexed(base, index) => write!(f, "[{base}, {index}]"),
            Self::Shifted(r, Shift::Lsl(n)) => write!(f, "{r}, LSL #{n}"),
            Self::Shifted(r, Shift::Asr(n)) => write!(f, "{r}, ASR #{n}"),
            Self::RegList(regs) => {
                f.write_str("{")?;
                for (i, r) in regs.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{r}")?;
                }
                f.write_str("}")
            }
            Self::Label(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instr {
    pub opcode: Opcode,
    pub cond: Cond,
    pub operands: Arr<Operand>,
}

impl Instr {
    pub fn new(opcode: Opcode, operands: impl Into<Arr<Operand>>) -> Self {
        Self {
            opcode,
            cond: Cond::Al,
            operands: operands.into(),
        }
    }

    pub fn when(mut self, cond: Cond) -> Self {
        self.cond = cond;
        self
    }

    pub fn mov(dst: impl Into<Operand>, src: impl Into<Operand>) -> Self {
        let operands: [Operand; 2] = [dst.into(), src.into()];
        Self::new(Opcode::Mov, operands)
    }

    pub fn ldr(dst: Register, src: Operand) -> Self {
        Self::new(Opcode::Ldr, [Operand::Reg(dst), src])
    }

    pub fn load(size: u32, dst: Register, src: Operand) -> Self {
        Self::new(Opcode::load(size), [Operand::Reg(dst), src])
    }

    pub fn store(size: u32, src: Register, dst: Operand) -> Self {
        Self::new(Opcode::store(size), [Operand::Reg(src), dst])
    }

    pub fn push(regs: impl Into<Arr<Register>>) -> Self {
        Self::new(Opcode::Push, [Operand::RegList(regs.into())])
    }

    pub fn pop(regs: impl Into<Arr<Register>>) -> Self {
        Self::new(Opcode::Pop, [Operand::RegList(regs.into())])
    }

    pub fn binary(
        opcode: Opcode,
        dst: Register,
        left: Register,
        right: impl Into<Operand>,
    ) -> Self {
        Self::new(opcode, [Operand::Reg(dst), Operand::Reg(left), right.into()])
    }

    pub fn cmp(left: Register, right: impl Into<Operand>) -> Self {
        Self::new(Opcode::Cmp, [Operand::Reg(left), right.into()])
    }

    pub fn b(label: impl Into<Ident>) -> Self {
        Self::new(Opcode::B, [Operand::label(label)])
    }

    pub fn bl(label: impl Into<Ident>) -> Self {
        Self::new(Opcode::Bl, [Operand::label(label)])
    }

    pub fn target(&self) -> Option<&Ident> {
        match (self.opcode, self.operands.first()) {
            (Opcode::B | Opcode::Bl, Some(Operand::Label(label))) => Some(label),
            _ => None,
        }
    }
}

impl Display for Instr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}{}", self.opcode, self.cond)?;
        for (i, op) in self.operands.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Label(Ident),
    Instr(Instr),
    Ltorg,
}

impl From<Instr> for Line {
    fn from(instr: Instr) -> Self {
        Self::Instr(instr)
    }
}

impl Display for Line {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Label(label) => write!(f, "{label}:"),
            Self::Instr(instr) => write!(f, "\t{instr}"),
            Self::Ltorg => f.write_str("\t.ltorg"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn renders_operands() {
        assert_eq!(
            Instr::store(4, Register::R4, Operand::pre_indexed(Register::Sp, -4)).to_string(),
            "STR r4, [sp, #-4]!"
        );
        assert_eq!(
            Instr::load(1, Register::R5, Operand::mem(Register::Sp, 0)).to_string(),
            "LDRSB r5, [sp]"
        );
        assert_eq!(
            Instr::store(1, Register::R4, Operand::Indexed(Register::Sp, Register::R12))
                .to_string(),
            "STRB r4, [sp, r12]"
        );
        assert_eq!(
            Instr::push([Register::Lr]).to_string(),
            "PUSH {lr}"
        );
        assert_eq!(
            Instr::cmp(Register::R5, Operand::Shifted(Register::R4, Shift::Asr(31)))
                .to_string(),
            "CMP r5, r4, ASR #31"
        );
        assert_eq!(
            Instr::mov(Register::R4, Operand::Imm(1)).when(Cond::Gt).to_string(),
            "MOVGT r4, #1"
        );
        assert_eq!(
            Instr::ldr(Register::R0, Operand::Address("msg_0".into())).to_string(),
            "LDR r0, =msg_0"
        );
    }

    #[test]
    fn immediates() {
        for value in [0, 255, 256, 280, 452, 1024, 0xFF00_0000, 0xF000_000F] {
            assert!(encodable(value), "{value}");
        }
        for value in [257, 511, 4095, 0x101, 0xFFFF] {
            assert!(!encodable(value), "{value}");
        }
        assert_eq!(Opcode::load(1).max_offset(), 255);
        assert_eq!(Opcode::store(1).max_offset(), 4095);
    }

    #[test]
    fn branch_targets() {
        assert_eq!(Instr::bl("exit").target().map(|l| l.as_ref()), Some("exit"));
        assert_eq!(Instr::push([Register::Lr]).target(), None);
    }

    #[test]
    fn negation() {
        assert_eq!(Cond::Gt.negate(), Cond::Le);
        assert_eq!(Cond::Lt.negate().negate(), Cond::Lt);
    }
}
