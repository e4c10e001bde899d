//! Helper routines the generated code branches to.
//!
//! A routine is emitted once, after user code, and only if something asked
//! for it. Requesting a routine also requests everything it branches to.

use asm::{Assembly, Cond, Instr, Opcode, Operand, Register};

pub const OVERFLOW: &str =
    "OverflowError: the result is too small/large to store in a 4-byte signed-integer.\n";
pub const DIVIDE_BY_ZERO: &str = "DivideByZeroError: divide or modulo by zero\n";
pub const NULL_REFERENCE: &str = "NullReferenceError: dereference a null reference\n";
pub const INDEX_NEGATIVE: &str = "ArrayIndexOutOfBoundsError: negative index\n";
pub const INDEX_TOO_LARGE: &str = "ArrayIndexOutOfBoundsError: index too large\n";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Routine {
    PrintInt,
    PrintBool,
    PrintChar,
    PrintString,
    PrintReference,
    PrintLn,
    ReadInt,
    ReadChar,
    CheckDivideByZero,
    CheckNullPointer,
    CheckArrayBounds,
    ThrowOverflowError,
    ThrowRuntimeError,
    FreePair,
    FreeArray,
}

impl Routine {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PrintInt => "p_print_int",
            Self::PrintBool => "p_print_bool",
            Self::PrintChar => "p_print_char",
            Self::PrintString => "p_print_string",
            Self::PrintReference => "p_print_reference",
            Self::PrintLn => "p_print_ln",
            Self::ReadInt => "p_read_int",
            Self::ReadChar => "p_read_char",
            Self::CheckDivideByZero => "p_check_divide_by_zero",
            Self::CheckNullPointer => "p_check_null_pointer",
            Self::CheckArrayBounds => "p_check_array_bounds",
            Self::ThrowOverflowError => "p_throw_overflow_error",
            Self::ThrowRuntimeError => "p_throw_runtime_error",
            Self::FreePair => "p_free_pair",
            Self::FreeArray => "p_free_array",
        }
    }

    const fn dependencies(self) -> &'static [Routine] {
        match self {
            Self::CheckDivideByZero
            | Self::CheckNullPointer
            | Self::CheckArrayBounds
            | Self::ThrowOverflowError
            | Self::FreePair
            | Self::FreeArray => &[Self::ThrowRuntimeError],
            Self::ThrowRuntimeError => &[Self::PrintString],
            _ => &[],
        }
    }

    fn emit(self, asm: &mut Assembly) {
        use Register::*;
        let body = match self {
            Self::PrintInt => {
                let format = asm.intern("%d\0");
                printf([Instr::mov(R1, R0), Instr::ldr(R0, Operand::Address(format))])
            }
            Self::PrintReference => {
                let format = asm.intern("%p\0");
                printf([Instr::mov(R1, R0), Instr::ldr(R0, Operand::Address(format))])
            }
            Self::PrintBool => {
                let yes = asm.intern("true\0");
                let no = asm.intern("false\0");
                printf([
                    Instr::cmp(R0, Operand::Imm(0)),
                    Instr::ldr(R0, Operand::Address(yes)).when(Cond::Ne),
                    Instr::ldr(R0, Operand::Address(no)).when(Cond::Eq),
                ])
            }
            Self::PrintString => {
                let format = asm.intern("%.*s\0");
                printf([
                    Instr::ldr(R1, Operand::mem(R0, 0)),
                    Instr::binary(Opcode::Add, R2, R0, Operand::Imm(4)),
                    Instr::ldr(R0, Operand::Address(format)),
                ])
            }
            Self::PrintLn => {
                let empty = asm.intern("\0");
                vec![
                    Instr::push([Lr]),
                    Instr::ldr(R0, Operand::Address(empty)),
                    Instr::binary(Opcode::Add, R0, R0, Operand::Imm(4)),
                    Instr::bl("puts"),
                    Instr::mov(R0, Operand::Imm(0)),
                    Instr::bl("fflush"),
                    Instr::pop([Pc]),
                ]
            }
            Self::PrintChar => vec![Instr::push([Lr]), Instr::bl("putchar"), Instr::pop([Pc])],
            Self::ReadInt => scanf(asm.intern(" %d\0")),
            Self::ReadChar => scanf(asm.intern(" %c\0")),
            Self::CheckDivideByZero => {
                let message = asm.intern(DIVIDE_BY_ZERO);
                guarded(R1, message)
            }
            Self::CheckNullPointer => {
                let message = asm.intern(NULL_REFERENCE);
                guarded(R0, message)
            }
            Self::CheckArrayBounds => {
                let negative = asm.intern(INDEX_NEGATIVE);
                let too_large = asm.intern(INDEX_TOO_LARGE);
                let throw = Self::ThrowRuntimeError.label();
                vec![
                    Instr::push([Lr]),
                    Instr::cmp(R0, Operand::Imm(0)),
                    Instr::ldr(R0, Operand::Address(negative)).when(Cond::Lt),
                    Instr::bl(throw).when(Cond::Lt),
                    Instr::ldr(R1, Operand::mem(R1, 0)),
                    Instr::cmp(R0, R1),
                    Instr::ldr(R0, Operand::Address(too_large)).when(Cond::Cs),
                    Instr::bl(throw).when(Cond::Cs),
                    Instr::pop([Pc]),
                ]
            }
            Self::ThrowOverflowError => {
                let message = asm.intern(OVERFLOW);
                vec![
                    Instr::ldr(R0, Operand::Address(message)),
                    Instr::bl(Self::ThrowRuntimeError.label()),
                ]
            }
            Self::ThrowRuntimeError => vec![
                Instr::bl(Self::PrintString.label()),
                Instr::mov(R0, Operand::Imm(-1)),
                Instr::bl("exit"),
            ],
            Self::FreePair | Self::FreeArray => {
                let message = asm.intern(NULL_REFERENCE);
                vec![
                    Instr::push([Lr]),
                    Instr::cmp(R0, Operand::Imm(0)),
                    Instr::ldr(R0, Operand::Address(message)).when(Cond::Eq),
                    Instr::b(Self::ThrowRuntimeError.label()).when(Cond::Eq),
                    Instr::bl("free"),
                    Instr::pop([Pc]),
                ]
            }
        };
        asm.text.label(self.label());
        asm.text.extend(body);
    }
}

// `setup` leaves the format string in r0 and its arguments in r1 and r2
fn printf<const N: usize>(setup: [Instr; N]) -> Vec<Instr> {
    let mut body = vec![Instr::push([Register::Lr])];
    body.extend(setup);
    body.extend([
        Instr::binary(Opcode::Add, Register::R0, Register::R0, Operand::Imm(4)),
        Instr::bl("printf"),
        Instr::mov(Register::R0, Operand::Imm(0)),
        Instr::bl("fflush"),
        Instr::pop([Register::Pc]),
    ]);
    body
}

fn scanf(format: ast::Ident) -> Vec<Instr> {
    vec![
        Instr::push([Register::Lr]),
        Instr::mov(Register::R1, Register::R0),
        Instr::ldr(Register::R0, Operand::Address(format)),
        Instr::binary(Opcode::Add, Register::R0, Register::R0, Operand::Imm(4)),
        Instr::bl("scanf"),
        Instr::pop([Register::Pc]),
    ]
}

// throws `message` when `reg` holds zero
fn guarded(reg: Register, message: ast::Ident) -> Vec<Instr> {
    vec![
        Instr::push([Register::Lr]),
        Instr::cmp(reg, Operand::Imm(0)),
        Instr::ldr(Register::R0, Operand::Address(message)).when(Cond::Eq),
        Instr::bl(Routine::ThrowRuntimeError.label()).when(Cond::Eq),
        Instr::pop([Register::Pc]),
    ]
}

#[derive(Debug, Default)]
pub struct Runtime {
    used: Vec<Routine>,
}

impl Runtime {
    pub fn require(&mut self, routine: Routine) {
        if self.used.contains(&routine) {
            return;
        }
        log::trace!("runtime routine {} requested", routine.label());
        self.used.push(routine);
        for dep in routine.dependencies() {
            self.require(*dep);
        }
    }

    pub fn call(&mut self, routine: Routine) -> Instr {
        self.require(routine);
        Instr::bl(routine.label())
    }

    pub fn used(&self) -> &[Routine] {
        &self.used
    }

    pub fn emit(&self, asm: &mut Assembly) {
        for routine in &self.used {
            routine.emit(asm);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use asm::Line;
    use std::collections::HashSet;

    fn labels(asm: &Assembly) -> Vec<String> {
        asm.text
            .iter()
            .filter_map(|line| match line {
                Line::Label(l) => Some(l.to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn dependencies_follow_in_request_order() {
        let mut runtime = Runtime::default();
        runtime.require(Routine::PrintInt);
        runtime.require(Routine::CheckDivideByZero);
        runtime.require(Routine::PrintString);
        runtime.require(Routine::PrintInt);
        assert_eq!(
            runtime.used(),
            [
                Routine::PrintInt,
                Routine::CheckDivideByZero,
                Routine::ThrowRuntimeError,
                Routine::PrintString,
            ]
        );
    }

    #[test]
    fn each_routine_is_emitted_once_and_resolves() {
        let mut runtime = Runtime::default();
        let mut asm = Assembly::new();
        for routine in [
            Routine::FreePair,
            Routine::FreeArray,
            Routine::CheckArrayBounds,
            Routine::ThrowOverflowError,
            Routine::PrintBool,
            Routine::PrintLn,
            Routine::ReadChar,
        ] {
            asm.text.instr(runtime.call(routine));
        }
        runtime.emit(&mut asm);
        let labels = labels(&asm);
        let unique: HashSet<&String> = labels.iter().collect();
        assert_eq!(labels.len(), 9);
        assert_eq!(unique.len(), 9);
        assert!(asm.unresolved().is_empty());
    }

    #[test]
    fn messages_are_shared() {
        let mut runtime = Runtime::default();
        let mut asm = Assembly::new();
        runtime.require(Routine::CheckNullPointer);
        runtime.require(Routine::FreePair);
        runtime.emit(&mut asm);
        // null reference message once, plus the string format
        assert_eq!(asm.data.len(), 2);
        let text = asm.to_string();
        assert!(text.contains("\t.ascii \"%.*s\\000\""));
        assert!(text.contains("\tBLEQ p_throw_runtime_error"));
        assert!(text.contains("\tBEQ p_throw_runtime_error"));
    }

    #[test]
    fn overflow_handler_exits_through_the_runtime_error() {
        let mut runtime = Runtime::default();
        let mut asm = Assembly::new();
        runtime.require(Routine::ThrowOverflowError);
        runtime.emit(&mut asm);
        let text = asm.to_string();
        assert!(text.contains("p_throw_overflow_error:\n\tLDR r0, =msg_0\n\tBL p_throw_runtime_error\n"));
        assert!(text.contains("p_throw_runtime_error:\n\tBL p_print_string\n\tMOV r0, #-1\n\tBL exit\n"));
    }
}
