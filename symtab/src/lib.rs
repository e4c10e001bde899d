//! Chained lexical scopes.
//!
//! Scopes live in an arena and are addressed by [`ScopeId`]; each one only
//! knows its parent. Entering a block is `child(current)`, leaving it is just
//! going back to the parent id the caller already holds.
//!
//! A name may carry several bindings in one scope (function overloads); the
//! payload decides which bindings are allowed to coexist through [`Binding`].

use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

pub trait Binding {
    /// Whether `self` and `other` may not be bound to one name in the same
    /// scope.
    fn collides(&self, other: &Self) -> bool;
}

#[derive(Debug, thiserror::Error)]
#[error("\"{0}\" is already defined in this scope")]
pub struct Redeclared(pub Rc<str>);

#[derive(Debug, PartialEq)]
pub enum Resolution<'t, D> {
    Found(&'t D),
    NotFound,
    /// Candidates exist, but none or several accept the request.
    AmbiguousOrArityMismatch,
}

#[derive(Debug)]
struct Scope<D> {
    parent: Option<ScopeId>,
    names: HashMap<Rc<str>, Vec<D>>,
}

#[derive(Debug)]
pub struct SymbolTable<D> {
    scopes: Vec<Scope<D>>,
}

impl<D> Default for SymbolTable<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> SymbolTable<D> {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                parent: None,
                names: HashMap::new(),
            }],
        }
    }

    pub const fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn child(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope {
            parent: Some(parent),
            names: HashMap::new(),
        });
        ScopeId(self.scopes.len() - 1)
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0].parent
    }

    pub fn bind(&mut self, scope: ScopeId, name: Rc<str>, decl: D) {
        self.scopes[scope.0].names.entry(name).or_default().push(decl);
    }

    pub fn lookup_local(
        &self,
        scope: ScopeId,
        name: &str,
        predicate: impl Fn(&D) -> bool,
    ) -> Option<&D> {
        self.scopes[scope.0]
            .names
            .get(name)
            .and_then(|decls| decls.iter().rev().find(|d| predicate(*d)))
    }

    pub fn lookup_chain(
        &self,
        scope: ScopeId,
        name: &str,
        predicate: impl Fn(&D) -> bool,
    ) -> Option<&D> {
        self.chain(scope)
            .find_map(|s| self.lookup_local(s, name, &predicate))
    }

    /// Picks the single binding of `name` that `matches` accepts among those
    /// `candidate` accepts. The nearest scope holding any match decides.
    pub fn resolve(
        &self,
        scope: ScopeId,
        name: &str,
        candidate: impl Fn(&D) -> bool,
        matches: impl Fn(&D) -> bool,
    ) -> Resolution<'_, D> {
        let mut seen_candidate = false;
        for s in self.chain(scope) {
            let Some(decls) = self.scopes[s.0].names.get(name) else {
                continue;
            };
            let mut found = None;
            for decl in decls.iter().filter(|d| candidate(*d)) {
                seen_candidate = true;
                if matches(decl) {
                    if found.is_some() {
                        return Resolution::AmbiguousOrArityMismatch;
                    }
                    found = Some(decl);
                }
            }
            if let Some(decl) = found {
                return Resolution::Found(decl);
            }
        }
        if seen_candidate {
            Resolution::AmbiguousOrArityMismatch
        } else {
            Resolution::NotFound
        }
    }

    fn chain(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), |s| self.parent(*s))
    }
}

impl<D: Binding> SymbolTable<D> {
    pub fn declare_local(
        &mut self,
        scope: ScopeId,
        name: Rc<str>,
        decl: D,
    ) -> Result<(), Redeclared> {
        let decls = self.scopes[scope.0].names.entry(name.clone()).or_default();
        if decls.iter().any(|d| d.collides(&decl)) {
            return Err(Redeclared(name));
        }
        decls.push(decl);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Decl {
        Var(u32),
        Fn(&'static [u8]),
    }

    impl Binding for Decl {
        fn collides(&self, other: &Self) -> bool {
            match (self, other) {
                (Decl::Fn(l), Decl::Fn(r)) => l == r,
                _ => true,
            }
        }
    }

    const fn is_var(d: &Decl) -> bool {
        matches!(d, Decl::Var(_))
    }

    fn is_fn(d: &Decl) -> bool {
        matches!(d, Decl::Fn(_))
    }

    #[test]
    fn nearest_declaration_wins() {
        let mut table = SymbolTable::new();
        let root = table.root();
        table.declare_local(root, "x".into(), Decl::Var(0)).unwrap();
        let middle = table.child(root);
        let inner = table.child(middle);
        assert_eq!(table.lookup_chain(inner, "x", is_var), Some(&Decl::Var(0)));

        table.declare_local(middle, "x".into(), Decl::Var(1)).unwrap();
        assert_eq!(table.lookup_chain(inner, "x", is_var), Some(&Decl::Var(1)));
        assert_eq!(table.lookup_chain(root, "x", is_var), Some(&Decl::Var(0)));
        assert_eq!(table.lookup_chain(inner, "y", is_var), None);
        assert_eq!(table.lookup_local(inner, "x", is_var), None);
    }

    #[test]
    fn siblings_do_not_see_each_other() {
        let mut table = SymbolTable::new();
        let root = table.root();
        let then = table.child(root);
        let r#else = table.child(root);
        table.declare_local(then, "x".into(), Decl::Var(0)).unwrap();
        assert_eq!(table.lookup_chain(r#else, "x", is_var), None);
        assert_eq!(table.parent(r#else), Some(root));
    }

    #[test]
    fn redeclaration_is_local() {
        let mut table = SymbolTable::new();
        let root = table.root();
        table.declare_local(root, "x".into(), Decl::Var(0)).unwrap();
        assert!(table.declare_local(root, "x".into(), Decl::Var(1)).is_err());
        let inner = table.child(root);
        assert!(table.declare_local(inner, "x".into(), Decl::Var(1)).is_ok());
    }

    #[test]
    fn overloads() {
        let mut table = SymbolTable::new();
        let root = table.root();
        table.declare_local(root, "f".into(), Decl::Fn(&[1])).unwrap();
        table.declare_local(root, "f".into(), Decl::Fn(&[1, 2])).unwrap();
        let err = table.declare_local(root, "f".into(), Decl::Fn(&[1])).unwrap_err();
        assert_eq!(err.to_string(), "\"f\" is already defined in this scope");

        let scope = table.child(root);
        let wants = |sig: &'static [u8]| move |d: &Decl| d == &Decl::Fn(sig);
        assert_eq!(
            table.resolve(scope, "f", is_fn, wants(&[1, 2])),
            Resolution::Found(&Decl::Fn(&[1, 2]))
        );
        assert_eq!(
            table.resolve(scope, "f", is_fn, wants(&[2])),
            Resolution::AmbiguousOrArityMismatch
        );
        assert_eq!(
            table.resolve(scope, "g", is_fn, wants(&[2])),
            Resolution::NotFound
        );
        assert_eq!(
            table.resolve(scope, "f", is_fn, is_fn),
            Resolution::AmbiguousOrArityMismatch
        );
    }
}
