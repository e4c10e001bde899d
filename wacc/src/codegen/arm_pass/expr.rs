use super::Generator;
use crate::codegen::frame;
use crate::codegen::regs::{Depth, Operands, SCRATCH};
use crate::codegen::runtime::Routine;
use crate::codegen::Error;
use asm::{Cond, Instr, Opcode, Operand, Register, Shift};
use ast::typed::{Bop, Expr, ExprKind, PairSide, UnOp};
use ast::Ident;

impl Generator {
    /// Evaluates `exp` into the register for `depth`. Registers of shallower
    /// depths are left untouched.
    pub(super) fn expression(&mut self, exp: &Expr, depth: Depth) -> Result<(), Error> {
        let reg = depth.reg();
        match &exp.kind {
            ExprKind::Int(i) => self.instr(Instr::ldr(reg, Operand::Literal(*i))),
            ExprKind::Bool(b) => self.instr(Instr::mov(reg, Operand::Imm(i32::from(*b)))),
            ExprKind::Char(c) => self.instr(Instr::mov(reg, Operand::Imm(i32::from(*c)))),
            ExprKind::Str(s) => {
                let label = self.asm.intern(s);
                self.instr(Instr::ldr(reg, Operand::Address(label)));
            }
            ExprKind::Null => self.instr(Instr::ldr(reg, Operand::Literal(0))),
            ExprKind::Var(name) => {
                let slot = self.slot(name)?;
                let src = self.stack_slot(Opcode::load(slot.size), slot);
                self.instr(Instr::load(slot.size, reg, src));
            }
            ExprKind::ArrayElem { name, indices } => {
                self.element_address(name, indices, exp.ty.size(), depth)?;
                self.instr(Instr::load(exp.ty.size(), reg, Operand::mem(reg, 0)));
            }
            ExprKind::PairElem { side, pair } => {
                self.expression(pair, depth)?;
                self.null_check(reg);
                self.instr(Instr::load(
                    exp.ty.size(),
                    reg,
                    Operand::mem(reg, side.offset()),
                ));
            }
            ExprKind::Unary { op, exp: operand } => {
                self.expression(operand, depth)?;
                self.unary(*op, reg);
            }
            ExprKind::Bin {
                operator,
                left,
                right,
            } => self.binary(*operator, left, right, depth)?,
            ExprKind::Call { label, args } => self.call_function(label, args, depth)?,
            ExprKind::NewPair { fst, snd } => {
                self.allocate(8, reg);
                for (side, elem) in [(PairSide::Fst, fst), (PairSide::Snd, snd)] {
                    let ops = self.operand(elem, depth)?;
                    self.instr(Instr::store(
                        elem.ty.size(),
                        ops.rhs,
                        Operand::mem(ops.lhs, side.offset()),
                    ));
                    self.settle(ops);
                }
            }
            ExprKind::ArrayLit(elems) => {
                let size = elems.first().map_or(4, |e| e.ty.size());
                let count = elems.len() as i32;
                self.allocate(4 + count * size as i32, reg);
                for (i, elem) in elems.iter().enumerate() {
                    let ops = self.operand(elem, depth)?;
                    let offset = 4 + i as i32 * size as i32;
                    let dst = if offset <= Opcode::store(size).max_offset() {
                        Operand::mem(ops.lhs, offset)
                    } else {
                        self.instr(Instr::ldr(Register::R0, Operand::Literal(offset)));
                        Operand::Indexed(ops.lhs, Register::R0)
                    };
                    self.instr(Instr::store(size, ops.rhs, dst));
                    self.settle(ops);
                }
                self.instr(Instr::ldr(Register::R0, Operand::Literal(count)));
                self.instr(Instr::store(4, Register::R0, Operand::mem(reg, 0)));
            }
        }
        Ok(())
    }

    fn unary(&mut self, op: UnOp, reg: Register) {
        match op {
            UnOp::Not => self.instr(Instr::binary(Opcode::Eor, reg, reg, Operand::Imm(1))),
            UnOp::Negate => {
                self.instr(Instr::binary(Opcode::Rsbs, reg, reg, Operand::Imm(0)));
                self.overflow_check(Cond::Vs);
            }
            UnOp::Len => self.instr(Instr::ldr(reg, Operand::mem(reg, 0))),
            // chars and ints share a register representation
            UnOp::Ord | UnOp::Chr => {}
        }
    }

    fn binary(
        &mut self,
        operator: Bop,
        left: &Expr,
        right: &Expr,
        depth: Depth,
    ) -> Result<(), Error> {
        self.expression(left, depth)?;
        let ops = self.operand(right, depth)?;
        let Operands { dst, lhs, rhs } = ops;
        match operator {
            Bop::Add | Bop::Subtract => {
                let opcode = if operator == Bop::Add {
                    Opcode::Adds
                } else {
                    Opcode::Subs
                };
                self.instr(Instr::binary(opcode, dst, lhs, rhs));
                self.overflow_check(Cond::Vs);
            }
            Bop::Multiply => {
                self.instr(Instr::new(
                    Opcode::Smull,
                    [
                        Operand::Reg(lhs),
                        Operand::Reg(rhs),
                        Operand::Reg(lhs),
                        Operand::Reg(rhs),
                    ],
                ));
                self.instr(Instr::cmp(rhs, Operand::Shifted(lhs, Shift::Asr(31))));
                self.overflow_check(Cond::Ne);
                self.settle(ops);
            }
            Bop::Divide | Bop::Remainder => {
                self.instr(Instr::mov(Register::R0, lhs));
                self.instr(Instr::mov(Register::R1, rhs));
                self.call(Routine::CheckDivideByZero);
                if operator == Bop::Divide {
                    self.instr(Instr::bl("__aeabi_idiv"));
                    self.instr(Instr::mov(dst, Register::R0));
                } else {
                    self.instr(Instr::bl("__aeabi_idivmod"));
                    self.instr(Instr::mov(dst, Register::R1));
                }
            }
            Bop::GreaterThan
            | Bop::Geq
            | Bop::LessThan
            | Bop::Leq
            | Bop::EqualTo
            | Bop::NotEqual => {
                let cond = comparison(operator);
                self.instr(Instr::cmp(lhs, rhs));
                self.instr(Instr::mov(dst, Operand::Imm(1)).when(cond));
                self.instr(Instr::mov(dst, Operand::Imm(0)).when(cond.negate()));
            }
            Bop::LogAnd => self.instr(Instr::binary(Opcode::And, dst, lhs, rhs)),
            Bop::LogOr => self.instr(Instr::binary(Opcode::Orr, dst, lhs, rhs)),
        }
        Ok(())
    }

    /// Evaluates the second operand of a value already held at `depth`,
    /// spilling that value when no register is left.
    fn operand(&mut self, exp: &Expr, depth: Depth) -> Result<Operands, Error> {
        if depth.exhausted() {
            self.instr(Instr::push([depth.reg()]));
            self.frame.push(4);
            self.expression(exp, depth)?;
            self.instr(Instr::pop([SCRATCH]));
            self.frame.pop(4);
        } else {
            self.expression(exp, depth.next())?;
        }
        Ok(Operands::at(depth))
    }

    fn settle(&mut self, ops: Operands) {
        if let Some(mov) = ops.settle() {
            self.instr(mov);
        }
    }

    fn overflow_check(&mut self, cond: Cond) {
        let call = self.runtime.call(Routine::ThrowOverflowError).when(cond);
        self.instr(call);
    }

    fn allocate(&mut self, bytes: i32, reg: Register) {
        self.instr(Instr::ldr(Register::R0, Operand::Literal(bytes)));
        self.instr(Instr::bl("malloc"));
        self.instr(Instr::mov(reg, Register::R0));
    }

    pub(super) fn element_address(
        &mut self,
        name: &Ident,
        indices: &[Expr],
        elem_size: u32,
        depth: Depth,
    ) -> Result<(), Error> {
        let reg = depth.reg();
        let slot = self.slot(name)?;
        self.stack_address(reg, slot);
        for (i, index) in indices.iter().enumerate() {
            let ops = self.operand(index, depth)?;
            let Operands { lhs, rhs, .. } = ops;
            self.instr(Instr::ldr(lhs, Operand::mem(lhs, 0)));
            self.instr(Instr::mov(Register::R0, rhs));
            self.instr(Instr::mov(Register::R1, lhs));
            self.call(Routine::CheckArrayBounds);
            self.instr(Instr::binary(Opcode::Add, lhs, lhs, Operand::Imm(4)));
            let scaled = if i + 1 == indices.len() && elem_size == 1 {
                Operand::Reg(rhs)
            } else {
                Operand::Shifted(rhs, Shift::Lsl(2))
            };
            self.instr(Instr::binary(Opcode::Add, lhs, lhs, scaled));
            self.settle(ops);
        }
        Ok(())
    }

    /// Calls a user function. Registers holding enclosing values are saved
    /// around the call and arguments are pushed last to first.
    fn call_function(&mut self, label: &Ident, args: &[Expr], depth: Depth) -> Result<(), Error> {
        let live = depth.live();
        if !live.is_empty() {
            self.instr(Instr::push(live));
            self.frame.push(4 * live.len() as u32);
        }
        let mut pushed = 0;
        for arg in args.iter().rev() {
            self.expression(arg, depth)?;
            let size = arg.ty.size();
            self.instr(Instr::store(
                size,
                depth.reg(),
                Operand::pre_indexed(Register::Sp, -(size as i32)),
            ));
            self.frame.push(size);
            pushed += size;
        }
        self.instr(Instr::bl(label.clone()));
        let release = frame::adjust(Opcode::Add, pushed);
        self.asm.text.extend(release);
        self.frame.pop(pushed);
        self.instr(Instr::mov(depth.reg(), Register::R0));
        if !live.is_empty() {
            self.instr(Instr::pop(live));
            self.frame.pop(4 * live.len() as u32);
        }
        Ok(())
    }
}

const fn comparison(operator: Bop) -> Cond {
    match operator {
        Bop::GreaterThan => Cond::Gt,
        Bop::Geq => Cond::Ge,
        Bop::LessThan => Cond::Lt,
        Bop::Leq => Cond::Le,
        Bop::EqualTo => Cond::Eq,
        _ => Cond::Ne,
    }
}
