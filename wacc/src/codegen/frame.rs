use asm::{Instr, Opcode, Operand, Register};
use ast::typed::{Param, Stmnt};

pub const MAX_STEP: u32 = 1024;

/// Where a variable lives, as a depth below the stack pointer at function
/// entry (just after the saved link register). Parameters sit above that
/// point and have negative depths.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Slot {
    pub depth: i32,
    pub size: u32,
}

/// Bytes declared directly in `block`. Nested blocks reserve their own.
pub fn block_size(block: &Stmnt) -> u32 {
    match block {
        Stmnt::Decl { ty, .. } => ty.size(),
        Stmnt::Seq(seq) => seq.iter().map(block_size).sum(),
        _ => 0,
    }
}

pub fn params(params: &[Param]) -> Vec<Slot> {
    let mut above = 4;
    params
        .iter()
        .map(|p| {
            let size = p.ty.size();
            let slot = Slot {
                depth: -above,
                size,
            };
            above += size as i32;
            slot
        })
        .collect()
}

/// `sub`/`add sp, sp, #bytes`, in steps the immediate field can encode.
pub fn adjust(opcode: Opcode, bytes: u32) -> Vec<Instr> {
    let mut steps = Vec::new();
    let mut left = bytes;
    while left > 0 {
        let step = leading_bits(left.min(MAX_STEP));
        steps.push(Instr::binary(
            opcode,
            Register::Sp,
            Register::Sp,
            Operand::Imm(step as i32),
        ));
        left -= step;
    }
    steps
}

// the highest eight bits of a non-zero `value` that sit at an even shift
fn leading_bits(value: u32) -> u32 {
    let top = 31 - value.leading_zeros();
    let shift = (top.saturating_sub(7) + 1) & !1;
    value & (0xFF << shift)
}

#[derive(Debug)]
struct Block {
    start: i32,
    size: u32,
    used: u32,
}

#[derive(Debug, Default)]
pub struct Frame {
    displacement: i32,
    blocks: Vec<Block>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn displacement(&self) -> i32 {
        self.displacement
    }

    pub fn enter(&mut self, size: u32) -> Vec<Instr> {
        self.blocks.push(Block {
            start: self.displacement,
            size,
            used: 0,
        });
        self.displacement += size as i32;
        adjust(Opcode::Sub, size)
    }

    pub fn exit(&mut self) -> Vec<Instr> {
        match self.blocks.pop() {
            Some(block) => {
                self.displacement -= block.size as i32;
                adjust(Opcode::Add, block.size)
            }
            None => Vec::new(),
        }
    }

    /// Hands out the next slot of the innermost block, in declaration order
    /// from the top of the block down.
    pub fn declare(&mut self, size: u32) -> Slot {
        match self.blocks.last_mut() {
            Some(block) => {
                block.used += size;
                Slot {
                    depth: block.start + block.used as i32,
                    size,
                }
            }
            None => Slot {
                depth: self.displacement,
                size,
            },
        }
    }

    pub const fn offset(&self, slot: Slot) -> i32 {
        self.displacement - slot.depth
    }

    pub fn push(&mut self, bytes: u32) {
        self.displacement += bytes as i32;
    }

    pub fn pop(&mut self, bytes: u32) {
        self.displacement -= bytes as i32;
    }

    pub fn unwind(&self) -> Vec<Instr> {
        adjust(Opcode::Add, self.displacement.max(0) as u32)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ast::typed::Expr;
    use ast::typed::ExprKind;
    use ast::Type;

    fn decl(ty: Type) -> Stmnt {
        Stmnt::Decl {
            name: "v".into(),
            ty,
            init: Expr::new(ExprKind::Int(0), Type::Int),
        }
    }

    #[test]
    fn sizes_count_only_the_block_itself() {
        let block = Stmnt::Seq(
            vec![
                decl(Type::Int),
                decl(Type::Bool),
                decl(Type::Char),
                decl(Type::array(Type::Int, 1)),
                Stmnt::Scope(Box::new(decl(Type::Int))),
            ]
            .into(),
        );
        assert_eq!(block_size(&block), 10);
    }

    #[test]
    fn entry_matches_declarations_and_exit_cancels() {
        let types = [Type::Int, Type::Char, Type::Str, Type::Bool];
        let size: u32 = types.iter().map(Type::size).sum();
        let mut frame = Frame::new();
        assert_eq!(
            frame.enter(size),
            vec![Instr::binary(
                Opcode::Sub,
                Register::Sp,
                Register::Sp,
                Operand::Imm(10)
            )]
        );
        let slots: Vec<Slot> = types.iter().map(|t| frame.declare(t.size())).collect();
        let offsets: Vec<i32> = slots.iter().map(|s| frame.offset(*s)).collect();
        assert_eq!(offsets, [6, 5, 1, 0]);
        assert_eq!(slots.iter().map(|s| s.size).sum::<u32>(), size);
        frame.exit();
        assert_eq!(frame.displacement(), 0);
    }

    #[test]
    fn offsets_follow_nested_blocks_and_pushes() {
        let mut frame = Frame::new();
        frame.enter(4);
        let outer = frame.declare(4);
        frame.enter(8);
        let inner = frame.declare(4);
        assert_eq!(frame.offset(outer), 8);
        assert_eq!(frame.offset(inner), 4);
        frame.push(4);
        assert_eq!(frame.offset(outer), 12);
        frame.pop(4);
        assert_eq!(frame.unwind(), adjust(Opcode::Add, 12));
        frame.exit();
        assert_eq!(frame.offset(outer), 0);
    }

    #[test]
    fn params_sit_above_the_link_register() {
        let params = [
            Param {
                name: "a".into(),
                ty: Type::Int,
            },
            Param {
                name: "b".into(),
                ty: Type::Char,
            },
            Param {
                name: "c".into(),
                ty: Type::Int,
            },
        ];
        let slots = super::params(&params);
        let mut frame = Frame::new();
        frame.enter(8);
        let offsets: Vec<i32> = slots.iter().map(|s| frame.offset(*s)).collect();
        assert_eq!(offsets, [12, 16, 17]);
    }

    #[test]
    fn large_adjustments_are_split() {
        let steps = adjust(Opcode::Add, 2500);
        let imms: Vec<String> = steps.iter().map(|i| i.operands[2].to_string()).collect();
        assert_eq!(imms, ["#1024", "#1024", "#452"]);
        assert!(adjust(Opcode::Sub, 0).is_empty());
    }

    #[test]
    fn every_step_is_an_encodable_immediate() {
        let imms: Vec<String> = adjust(Opcode::Sub, 257)
            .iter()
            .map(|i| i.operands[2].to_string())
            .collect();
        assert_eq!(imms, ["#256", "#1"]);
        for bytes in 1..=5000 {
            let mut total = 0;
            for step in adjust(Opcode::Sub, bytes) {
                let Operand::Imm(imm) = step.operands[2] else {
                    panic!("{step}");
                };
                assert!(asm::encodable(imm as u32), "{bytes}: {imm}");
                assert!(imm as u32 <= MAX_STEP);
                total += imm as u32;
            }
            assert_eq!(total, bytes);
        }
    }
}
