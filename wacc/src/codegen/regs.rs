use asm::{Instr, Register};

/// Working registers, in allocation order. `r9` is left alone.
pub const POOL: [Register; 7] = [
    Register::R4,
    Register::R5,
    Register::R6,
    Register::R7,
    Register::R8,
    Register::R10,
    Register::R11,
];

pub const SCRATCH: Register = Register::R12;

/// Nesting depth of the expression being evaluated. The register a value
/// lands in depends on nothing else.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Depth(usize);

impl Depth {
    pub const fn reg(self) -> Register {
        if self.0 < POOL.len() {
            POOL[self.0]
        } else {
            POOL[POOL.len() - 1]
        }
    }

    pub const fn exhausted(self) -> bool {
        self.0 + 1 >= POOL.len()
    }

    pub const fn next(self) -> Self {
        if self.exhausted() {
            self
        } else {
            Self(self.0 + 1)
        }
    }

    pub fn live(self) -> &'static [Register] {
        const ALL: &[Register] = &POOL;
        &ALL[..self.0.min(POOL.len() - 1)]
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Operands {
    pub dst: Register,
    pub lhs: Register,
    pub rhs: Register,
}

impl Operands {
    /// Once the pool is exhausted the left value is pushed, the right one is
    /// evaluated into the same register, and the left comes back in `r12`.
    pub const fn at(depth: Depth) -> Self {
        if depth.exhausted() {
            Self {
                dst: depth.reg(),
                lhs: SCRATCH,
                rhs: depth.reg(),
            }
        } else {
            Self {
                dst: depth.reg(),
                lhs: depth.reg(),
                rhs: depth.next().reg(),
            }
        }
    }

    pub fn settle(&self) -> Option<Instr> {
        (self.lhs != self.dst).then(|| Instr::mov(self.dst, self.lhs))
    }
}
