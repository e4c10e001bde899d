use crate::arm::{Instr, Line, Operand};
use ast::Ident;
use derive_more::{Deref, DerefMut};
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

pub const EXTERNAL: [&str; 10] = [
    "printf",
    "scanf",
    "puts",
    "putchar",
    "fflush",
    "exit",
    "malloc",
    "free",
    "__aeabi_idiv",
    "__aeabi_idivmod",
];

/// String constants, each stored once and addressed as `msg_<k>`.
#[derive(Debug, Default)]
pub struct DataPool {
    entries: Vec<(Ident, Box<str>)>,
    lookup: HashMap<Box<str>, Ident>,
}

impl DataPool {
    pub fn intern(&mut self, content: &str) -> Ident {
        if let Some(label) = self.lookup.get(content) {
            return label.clone();
        }
        let label: Ident = format!("msg_{}", self.entries.len()).into();
        log::trace!("interned {label} for {content:?}");
        self.entries.push((label.clone(), content.into()));
        self.lookup.insert(content.into(), label.clone());
        label
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Display for DataPool {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for (label, content) in &self.entries {
            writeln!(f, "{label}:")?;
            writeln!(f, "\t.word {}", content.len())?;
            writeln!(f, "\t.ascii \"{}\"", ascii(content))?;
        }
        Ok(())
    }
}

// the assembler takes a bare quote inside a double-quoted string, and reads
// up to three octal digits after a backslash
fn ascii(content: &str) -> String {
    content
        .bytes()
        .map(|b| match b {
            b'\'' => "'".into(),
            b'\0' => "\\000".into(),
            b => ast::escape(b),
        })
        .collect()
}

#[derive(Debug, Default, Deref, DerefMut)]
pub struct Text(Vec<Line>);

impl Text {
    pub fn instr(&mut self, instr: Instr) {
        self.0.push(Line::Instr(instr));
    }

    pub fn label(&mut self, label: impl Into<Ident>) {
        self.0.push(Line::Label(label.into()));
    }

    pub fn ltorg(&mut self) {
        self.0.push(Line::Ltorg);
    }

    fn defined(&self) -> HashSet<&str> {
        self.iter()
            .filter_map(|line| match line {
                Line::Label(label) => Some(label.as_ref()),
                _ => None,
            })
            .collect()
    }
}

impl Extend<Instr> for Text {
    fn extend<I: IntoIterator<Item = Instr>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Line::Instr))
    }
}

#[derive(Debug, Default)]
pub struct Assembly {
    pub data: DataPool,
    pub text: Text,
    labels: usize,
}

impl Assembly {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_label(&mut self) -> Ident {
        let label = format!("L{}", self.labels);
        self.labels += 1;
        Rc::from(label)
    }

    pub fn intern(&mut self, content: &str) -> Ident {
        self.data.intern(content)
    }

    /// Labels referenced by a branch or an address load that are neither
    /// defined in this file nor provided externally.
    pub fn unresolved(&self) -> Vec<Ident> {
        let defined = self.text.defined();
        let pool: HashSet<&str> = self.data.entries.iter().map(|(l, _)| l.as_ref()).collect();
        let mut missing: Vec<Ident> = Vec::new();
        for line in self.text.iter() {
            let Line::Instr(instr) = line else {
                continue;
            };
            let referenced = instr.target().or(match instr.operands.get(1) {
                Some(Operand::Address(label)) => Some(label),
                _ => None,
            });
            if let Some(label) = referenced {
                let known = defined.contains(label.as_ref())
                    || pool.contains(label.as_ref())
                    || EXTERNAL.contains(&label.as_ref());
                if !known && !missing.contains(label) {
                    missing.push(label.clone());
                }
            }
        }
        missing
    }
}

impl Display for Assembly {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if !self.data.is_empty() {
            writeln!(f, ".data")?;
            writeln!(f)?;
            writeln!(f, "{}", self.data)?;
        }
        writeln!(f, ".text")?;
        writeln!(f)?;
        writeln!(f, ".global main")?;
        for line in self.text.iter() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arm::Register;

    #[test]
    fn interning_reuses_labels() {
        let mut asm = Assembly::new();
        let a = asm.intern("%d\0");
        let b = asm.intern("true");
        let c = asm.intern("%d\0");
        assert_eq!(a.as_ref(), "msg_0");
        assert_eq!(b.as_ref(), "msg_1");
        assert_eq!(a, c);
        assert_eq!(asm.data.len(), 2);
    }

    #[test]
    fn fresh_labels_are_distinct() {
        let mut asm = Assembly::new();
        assert_eq!(asm.fresh_label().as_ref(), "L0");
        assert_eq!(asm.fresh_label().as_ref(), "L1");
    }

    #[test]
    fn layout() {
        let mut asm = Assembly::new();
        let msg = asm.intern("hi\n");
        asm.text.label("main");
        asm.text.instr(Instr::push([Register::Lr]));
        asm.text.instr(Instr::ldr(Register::R0, Operand::Address(msg)));
        asm.text.instr(Instr::pop([Register::Pc]));
        asm.text.ltorg();
        let out = asm.to_string();
        assert!(out.starts_with(".data\n\nmsg_0:\n\t.word 3\n\t.ascii \"hi\\n\"\n"));
        assert!(out.contains(".text\n\n.global main\nmain:\n\tPUSH {lr}\n"));
        assert!(out.ends_with("\tPOP {pc}\n\t.ltorg\n"));
    }

    #[test]
    fn ascii_keeps_the_byte_count() {
        let mut asm = Assembly::new();
        asm.intern("%d\0");
        asm.intern("it's\x07");
        let out = asm.to_string();
        assert!(out.contains("\t.word 3\n\t.ascii \"%d\\000\"\n"));
        assert!(out.contains("\t.word 5\n\t.ascii \"it's\\007\"\n"));
    }

    #[test]
    fn empty_pool_has_no_data_section() {
        let mut asm = Assembly::new();
        asm.text.label("main");
        assert!(!asm.to_string().contains(".data"));
    }

    #[test]
    fn finds_unresolved_labels() {
        let mut asm = Assembly::new();
        asm.text.label("main");
        asm.text.instr(Instr::bl("p_print_int"));
        asm.text.instr(Instr::bl("exit"));
        asm.text.instr(Instr::b("main"));
        assert_eq!(asm.unresolved(), vec![Ident::from("p_print_int")]);
    }
}
