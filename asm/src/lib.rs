//! ARM instruction records and the assembly file they are written into.
pub mod arm;
pub mod emit;

pub use arm::{encodable, Cond, Instr, Line, Opcode, Operand, Register, Shift};
pub use emit::{Assembly, DataPool, Text};
