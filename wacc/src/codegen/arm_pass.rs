mod expr;

use super::frame::{self, Frame, Slot};
use super::regs::{Depth, SCRATCH};
use super::runtime::{Routine, Runtime};
use super::Error;
use asm::{Assembly, Cond, Instr, Opcode, Operand, Register};
use ast::typed::{Expr, ExprKind, Func, Program, Stmnt};
use ast::{Ident, Type};
use symtab::{ScopeId, SymbolTable};

pub fn emit(program: &Program) -> Result<Assembly, Error> {
    let mut gen = Generator::new();
    for func in program.funcs.iter() {
        gen.function(func)?;
    }
    gen.main(&program.body)?;
    gen.finish()
}

struct Generator {
    asm: Assembly,
    runtime: Runtime,
    frame: Frame,
    slots: SymbolTable<Slot>,
    scope: ScopeId,
}

impl Generator {
    fn new() -> Self {
        let slots = SymbolTable::new();
        let scope = slots.root();
        Self {
            asm: Assembly::new(),
            runtime: Runtime::default(),
            frame: Frame::new(),
            slots,
            scope,
        }
    }

    fn instr(&mut self, instr: Instr) {
        self.asm.text.instr(instr);
    }

    fn call(&mut self, routine: Routine) {
        let instr = self.runtime.call(routine);
        self.instr(instr);
    }

    fn slot(&self, name: &Ident) -> Result<Slot, Error> {
        self.slots
            .lookup_chain(self.scope, name, |_| true)
            .copied()
            .ok_or_else(|| Error::Unbound(name.clone()))
    }

    /// Memory operand for `slot` as accessed by `opcode`. Offsets past the
    /// instruction's reach go through r12.
    fn stack_slot(&mut self, opcode: Opcode, slot: Slot) -> Operand {
        let offset = self.frame.offset(slot);
        if offset <= opcode.max_offset() {
            return Operand::mem(Register::Sp, offset);
        }
        self.instr(Instr::ldr(SCRATCH, Operand::Literal(offset)));
        Operand::Indexed(Register::Sp, SCRATCH)
    }

    fn stack_address(&mut self, dst: Register, slot: Slot) {
        let offset = self.frame.offset(slot);
        let offset = if u32::try_from(offset).is_ok_and(asm::encodable) {
            Operand::Imm(offset)
        } else {
            self.instr(Instr::ldr(SCRATCH, Operand::Literal(offset)));
            Operand::Reg(SCRATCH)
        };
        self.instr(Instr::binary(Opcode::Add, dst, Register::Sp, offset));
    }

    fn function(&mut self, func: &Func) -> Result<(), Error> {
        log::debug!(
            "function {} ({} params, {} local bytes)",
            func.label,
            func.params.len(),
            frame::block_size(&func.body)
        );
        self.frame = Frame::new();
        self.scope = self.slots.child(self.slots.root());
        for (param, slot) in func.params.iter().zip(frame::params(&func.params)) {
            self.slots.bind(self.scope, param.name.clone(), slot);
        }
        self.asm.text.label(func.label.clone());
        self.instr(Instr::push([Register::Lr]));
        self.block(&func.body)?;
        self.instr(Instr::pop([Register::Pc]));
        self.asm.text.ltorg();
        Ok(())
    }

    fn main(&mut self, body: &Stmnt) -> Result<(), Error> {
        log::debug!("main ({} local bytes)", frame::block_size(body));
        self.frame = Frame::new();
        self.scope = self.slots.root();
        self.asm.text.label("main");
        self.instr(Instr::push([Register::Lr]));
        self.block(body)?;
        self.instr(Instr::ldr(Register::R0, Operand::Literal(0)));
        self.instr(Instr::pop([Register::Pc]));
        self.asm.text.ltorg();
        Ok(())
    }

    fn finish(mut self) -> Result<Assembly, Error> {
        self.runtime.emit(&mut self.asm);
        let missing = self.asm.unresolved();
        if !missing.is_empty() {
            return Err(Error::Unresolved(missing.join(", ")));
        }
        Ok(self.asm)
    }

    fn block(&mut self, body: &Stmnt) -> Result<(), Error> {
        let enter = self.frame.enter(frame::block_size(body));
        self.asm.text.extend(enter);
        let outer = self.scope;
        self.scope = self.slots.child(outer);
        self.statement(body)?;
        self.scope = outer;
        let exit = self.frame.exit();
        self.asm.text.extend(exit);
        Ok(())
    }

    fn statement(&mut self, stmnt: &Stmnt) -> Result<(), Error> {
        let top = Depth::default();
        let reg = top.reg();
        match stmnt {
            Stmnt::Skip => {}
            Stmnt::Decl { name, ty, init } => {
                self.expression(init, top)?;
                let slot = self.frame.declare(ty.size());
                self.slots.bind(self.scope, name.clone(), slot);
                let dst = self.stack_slot(Opcode::store(slot.size), slot);
                self.instr(Instr::store(slot.size, reg, dst));
            }
            Stmnt::Assign { dst, src } => {
                self.expression(src, top)?;
                self.assign(dst, top)?;
            }
            Stmnt::Read(target) => {
                let address = self.address(target, top)?;
                self.instr(Instr::mov(Register::R0, address));
                self.call(match target.ty {
                    Type::Char => Routine::ReadChar,
                    _ => Routine::ReadInt,
                });
            }
            Stmnt::Free(exp) => {
                self.expression(exp, top)?;
                self.instr(Instr::mov(Register::R0, reg));
                self.call(if exp.ty.is_pair() {
                    Routine::FreePair
                } else {
                    Routine::FreeArray
                });
            }
            Stmnt::Return(exp) => {
                self.expression(exp, top)?;
                self.instr(Instr::mov(Register::R0, reg));
                let unwind = self.frame.unwind();
                self.asm.text.extend(unwind);
                self.instr(Instr::pop([Register::Pc]));
            }
            Stmnt::Exit(exp) => {
                self.expression(exp, top)?;
                self.instr(Instr::mov(Register::R0, reg));
                self.instr(Instr::bl("exit"));
            }
            Stmnt::Print { exp, newline } => {
                self.expression(exp, top)?;
                self.instr(Instr::mov(Register::R0, reg));
                self.call(print_routine(&exp.ty));
                if *newline {
                    self.call(Routine::PrintLn);
                }
            }
            Stmnt::If {
                condition,
                then,
                r#else,
            } => {
                let else_label = self.asm.fresh_label();
                let end = self.asm.fresh_label();
                self.expression(condition, top)?;
                self.instr(Instr::cmp(reg, Operand::Imm(0)));
                self.instr(Instr::b(else_label.clone()).when(Cond::Eq));
                self.block(then)?;
                self.instr(Instr::b(end.clone()));
                self.asm.text.label(else_label);
                self.block(r#else)?;
                self.asm.text.label(end);
            }
            Stmnt::While { condition, body } => {
                let check = self.asm.fresh_label();
                let start = self.asm.fresh_label();
                self.instr(Instr::b(check.clone()));
                self.asm.text.label(start.clone());
                self.block(body)?;
                self.asm.text.label(check);
                self.expression(condition, top)?;
                self.instr(Instr::cmp(reg, Operand::Imm(1)));
                self.instr(Instr::b(start).when(Cond::Eq));
            }
            Stmnt::Scope(body) => self.block(body)?,
            Stmnt::Seq(seq) => {
                for stmnt in seq.iter() {
                    self.statement(stmnt)?;
                }
            }
        }
        Ok(())
    }

    fn assign(&mut self, dst: &Expr, value: Depth) -> Result<(), Error> {
        let size = dst.ty.size();
        if let ExprKind::Var(name) = &dst.kind {
            let slot = self.slot(name)?;
            let dst = self.stack_slot(Opcode::store(size), slot);
            self.instr(Instr::store(size, value.reg(), dst));
            return Ok(());
        }
        let address = self.address(dst, value.next())?;
        self.instr(Instr::store(size, value.reg(), Operand::mem(address, 0)));
        Ok(())
    }

    fn address(&mut self, lvalue: &Expr, depth: Depth) -> Result<Register, Error> {
        let reg = depth.reg();
        match &lvalue.kind {
            ExprKind::ArrayElem { name, indices } => {
                self.element_address(name, indices, lvalue.ty.size(), depth)?;
            }
            ExprKind::PairElem { side, pair } => {
                self.expression(pair, depth)?;
                self.null_check(reg);
                self.instr(Instr::binary(
                    Opcode::Add,
                    reg,
                    reg,
                    Operand::Imm(side.offset()),
                ));
            }
            ExprKind::Var(name) => {
                let slot = self.slot(name)?;
                self.stack_address(reg, slot);
            }
            _ => self.expression(lvalue, depth)?,
        }
        Ok(reg)
    }

    fn null_check(&mut self, reg: Register) {
        self.instr(Instr::mov(Register::R0, reg));
        self.call(Routine::CheckNullPointer);
    }
}

fn print_routine(ty: &Type) -> Routine {
    match ty {
        Type::Int => Routine::PrintInt,
        Type::Bool => Routine::PrintBool,
        Type::Char => Routine::PrintChar,
        ty if ty.is_string() => Routine::PrintString,
        _ => Routine::PrintReference,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn compile(source: &str) -> String {
        let tokens = crate::lex::tokenize(source.as_bytes()).unwrap();
        let program = crate::parse::parse(tokens).unwrap();
        let typed = crate::semantics::check(&program).unwrap();
        emit(&typed).unwrap().to_string()
    }

    fn stack_adjustments(text: &str, opcode: &str) -> i32 {
        let prefix = format!("\t{opcode} sp, sp, #");
        text.lines()
            .filter_map(|line| line.strip_prefix(prefix.as_str()))
            .map(|imm| imm.parse::<i32>().unwrap())
            .sum()
    }

    #[test]
    fn empty_main() {
        let text = compile("begin skip end");
        assert!(!text.contains(".data"));
        assert!(text.ends_with("main:\n\tPUSH {lr}\n\tLDR r0, =0\n\tPOP {pc}\n\t.ltorg\n"));
    }

    #[test]
    fn locals_are_reserved_and_released() {
        let text = compile("begin int x = 5; println x end");
        assert!(text.contains(
            "\tSUB sp, sp, #4\n\tLDR r4, =5\n\tSTR r4, [sp]\n\tLDR r4, [sp]\n\tMOV r0, r4\n\
             \tBL p_print_int\n\tBL p_print_ln\n\tADD sp, sp, #4\n"
        ));
    }

    #[test]
    fn nested_blocks_balance() {
        let text = compile(
            "begin
               int x = 0;
               while x < 3 do
                 bool b = x == 1;
                 if b then char c = 'c'; print c else int y = 2; x = x + y fi;
                 x = x + 1
               done;
               begin int z = x; println z end
             end",
        );
        assert_eq!(stack_adjustments(&text, "SUB"), 4 + 1 + 1 + 4 + 4);
        assert_eq!(
            stack_adjustments(&text, "SUB"),
            stack_adjustments(&text, "ADD")
        );
        assert!(text.contains("\tMOVLT r4, #1\n\tMOVGE r4, #0\n"));
        assert!(text.contains("\tCMP r4, #1\n\tBEQ L"));
    }

    #[test]
    fn deep_expressions_spill() {
        let text = compile("begin int x = 1 + (2 + (3 + (4 + (5 + (6 + (7 + (8 + 9))))))) end");
        assert!(text.contains("\tPUSH {r11}\n\tLDR r11, =8\n\tPUSH {r11}\n\tLDR r11, =9\n\tPOP {r12}\n\tADDS r11, r12, r11\n"));
        assert!(text.contains("\tPOP {r12}\n\tADDS r11, r12, r11\n\tBLVS p_throw_overflow_error\n"));
        assert!(!text.contains("r9"));
    }

    #[test]
    fn overloads_get_distinct_labels() {
        let text = compile(
            "begin
               int f(int x) is return x end
               int f(bool b) is return 1 end
               int y = call f(true);
               exit y
             end",
        );
        assert!(text.contains("f_f_0:\n\tPUSH {lr}\n"));
        assert!(text.contains("f_f_1:\n\tPUSH {lr}\n"));
        assert!(text.contains("\tMOV r4, #1\n\tSTRB r4, [sp, #-1]!\n\tBL f_f_1\n\tADD sp, sp, #1\n\tMOV r4, r0\n"));
        assert!(text.contains("f_f_0:\n\tPUSH {lr}\n\tLDR r4, [sp, #4]\n\tMOV r0, r4\n\tPOP {pc}\n"));
    }

    #[test]
    fn returns_unwind_the_frame() {
        let text = compile(
            "begin
               int f() is
                 int x = 1;
                 if true then return x else return 2 fi
               end
               int y = call f();
               exit y
             end",
        );
        assert!(text.contains("\tLDR r4, [sp]\n\tMOV r0, r4\n\tADD sp, sp, #4\n\tPOP {pc}\n"));
        assert!(text.contains("\tMOV r0, r4\n\tBL exit\n"));
    }

    #[test]
    fn returns_release_every_enclosing_block() {
        let text = compile(
            "begin
               int f() is
                 int a = 1;
                 begin
                   int b = 2;
                   if true then int c = 3; return c else return b fi
                 end
               end
               int y = call f();
               exit y
             end",
        );
        assert!(text.contains("\tMOV r0, r4\n\tADD sp, sp, #12\n\tPOP {pc}\n"));
        assert!(text.contains("\tMOV r0, r4\n\tADD sp, sp, #8\n\tPOP {pc}\n"));
    }

    fn ints(count: usize) -> String {
        (0..count).map(|i| format!("int v{i} = {i}; ")).collect()
    }

    #[test]
    fn frame_adjustments_stay_encodable() {
        let text = compile(&format!("begin {}bool b = true; println b end", ints(64)));
        assert!(text.contains("\tSUB sp, sp, #256\n\tSUB sp, sp, #1\n"));
        assert!(text.contains("\tADD sp, sp, #256\n\tADD sp, sp, #1\n"));
        for line in text.lines() {
            let imm = line
                .strip_prefix("\tSUB sp, sp, #")
                .or_else(|| line.strip_prefix("\tADD sp, sp, #"));
            if let Some(imm) = imm {
                assert!(asm::encodable(imm.parse().unwrap()), "{line}");
            }
        }
    }

    #[test]
    fn distant_bytes_are_reached_through_r12() {
        let text = compile(&format!("begin char c = 'a'; {}print c; read c end", ints(70)));
        assert!(text.contains("\tSTRB r4, [sp, #280]\n"));
        assert!(text.contains("\tLDR r12, =280\n\tLDRSB r4, [sp, r12]\n"));
        assert!(text.contains("\tADD r4, sp, #280\n"));
        assert!(!text.contains("LDRSB r4, [sp, #280]"));
    }

    #[test]
    fn distant_words_are_reached_through_r12() {
        let text = compile(&format!("begin {}v0 = 7; read v0; println v0 end", ints(1100)));
        assert!(text.contains("\tLDR r4, =7\n\tLDR r12, =4396\n\tSTR r4, [sp, r12]\n"));
        assert!(text.contains("\tLDR r12, =4396\n\tADD r4, sp, r12\n"));
        assert!(text.contains("\tLDR r12, =4396\n\tLDR r4, [sp, r12]\n"));
        assert!(text.contains("\tSUB sp, sp, #304\n"));
    }

    // calls only appear at the top of a right hand side in source programs
    #[test]
    fn live_registers_survive_calls() {
        use ast::typed::{Bop, Param};
        let int = |i| Expr::new(ExprKind::Int(i), Type::Int);
        let func = Func {
            name: "f".into(),
            label: "f_f".into(),
            params: vec![Param {
                name: "x".into(),
                ty: Type::Int,
            }]
            .into(),
            ret: Type::Int,
            body: Stmnt::Return(Expr::new(ExprKind::Var("x".into()), Type::Int)),
        };
        let call = Expr::new(
            ExprKind::Call {
                label: "f_f".into(),
                args: vec![int(2)].into(),
            },
            Type::Int,
        );
        let program = Program {
            funcs: vec![func].into(),
            body: Stmnt::Decl {
                name: "y".into(),
                ty: Type::Int,
                init: Expr::new(
                    ExprKind::Bin {
                        operator: Bop::Add,
                        left: Box::new(int(1)),
                        right: Box::new(call),
                    },
                    Type::Int,
                ),
            },
        };
        let text = emit(&program).unwrap().to_string();
        assert!(text.contains(
            "\tLDR r4, =1\n\tPUSH {r4}\n\tLDR r5, =2\n\tSTR r5, [sp, #-4]!\n\tBL f_f\n\
             \tADD sp, sp, #4\n\tMOV r5, r0\n\tPOP {r4}\n\tADDS r4, r4, r5\n"
        ));
    }

    #[test]
    fn runtime_routines_are_emitted_once() {
        let text = compile("begin int x = 10 / 2; int y = x % 3; println y end");
        assert_eq!(text.matches("p_check_divide_by_zero:").count(), 1);
        assert!(text.contains("\tBL __aeabi_idiv\n\tMOV r4, r0\n"));
        assert!(text.contains("\tBL __aeabi_idivmod\n\tMOV r4, r1\n"));
        assert!(text.contains("p_throw_runtime_error:"));
        assert!(text.contains("p_print_string:"));
    }

    #[test]
    fn array_elements_are_bounds_checked() {
        let text = compile("begin int[] a = [1, 2]; a[1] = 3 end");
        assert!(text.contains(
            "\tLDR r0, =12\n\tBL malloc\n\tMOV r4, r0\n\tLDR r5, =1\n\tSTR r5, [r4, #4]\n"
        ));
        assert!(text.contains("\tLDR r0, =2\n\tSTR r0, [r4]\n"));
        assert!(text.contains(
            "\tLDR r4, =3\n\tADD r5, sp, #0\n\tLDR r6, =1\n\tLDR r5, [r5]\n\tMOV r0, r6\n\tMOV r1, r5\n\
             \tBL p_check_array_bounds\n\tADD r5, r5, #4\n\tADD r5, r5, r6, LSL #2\n\tSTR r4, [r5]\n"
        ));
    }

    #[test]
    fn pairs_are_null_checked() {
        let text = compile(
            "begin pair(int, char) p = newpair(1, 'a'); char c = snd p; free p end",
        );
        assert!(text.contains("\tLDR r0, =8\n\tBL malloc\n\tMOV r4, r0\n"));
        assert!(text.contains("\tMOV r5, #97\n\tSTRB r5, [r4, #4]\n"));
        assert!(text.contains("\tMOV r0, r4\n\tBL p_check_null_pointer\n\tLDRSB r4, [r4, #4]\n"));
        assert!(text.contains("\tBL p_free_pair\n"));
    }

    #[test]
    fn strings_live_in_the_data_pool() {
        let text = compile("begin string s = \"hi\"; println s; print len s end");
        assert!(text.starts_with(".data\n\nmsg_0:\n\t.word 2\n\t.ascii \"hi\"\n"));
        assert!(text.contains("\tLDR r4, =msg_0\n"));
        assert!(text.contains("\tBL p_print_string\n"));
        assert!(text.contains("\tLDR r4, [r4]\n\tMOV r0, r4\n\tBL p_print_int\n"));
        assert!(emit_labels_resolve(&text));
    }

    fn emit_labels_resolve(text: &str) -> bool {
        text.lines()
            .filter_map(|l| l.strip_prefix("\tBL "))
            .all(|target| {
                text.contains(&format!("\n{target}:\n")) || asm::emit::EXTERNAL.contains(&target)
            })
    }
}
