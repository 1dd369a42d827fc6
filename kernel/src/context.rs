//! Typing context and hole (metavariable) store.
//!
//! `Context` is the triple of typing assumptions, value environment, and
//! tope constraints from the specification; `HoleStore` is the separate
//! table of metavariables. `Context`'s `local_*` methods are scoped:
//! each pushes a frame, runs a closure, and restores the frame
//! unconditionally afterward, so a scope is popped whether the closure
//! returns `Ok` or an early `Err` — there is nothing for a caller to
//! forget to clean up.

use crate::term::{refresh, Name, Term};
use std::collections::HashMap;

/// Typing context: local typing assumptions, value environment, and tope
/// constraints in scope.
///
/// Unlike the non-dependent `Context` this theory's checker descends from
/// (which only ever tracked one `bindings` map), this one threads three
/// separate ordered pieces of state because evaluation, typing, and tope
/// entailment each need a different slice of it.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Declared type of each free variable in scope.
    types: HashMap<Name, Term>,
    /// Order in which `types` entries were inserted (for deterministic
    /// iteration, e.g. when rendering a context dump).
    types_order: Vec<Name>,
    /// Value definitions, most recently pushed last; `eval` consults this
    /// to unfold a `Var`.
    env: Vec<(Name, Term)>,
    /// Topes currently assumed true.
    topes: Vec<Term>,
    /// Implications contributed by cube-indexed Pi types currently in
    /// scope: each entry `(f, Var t, φ)` means "applying `f` under a
    /// cube-indexed guard asserts `φ[t ↦ x]` for the application's
    /// argument `x`". Populated by `local_typing` whenever the pushed
    /// type is a guarded Pi, and consumed by `tope::unfold`'s `App` case.
    tope_inclusions: Vec<(Name, Term, Term)>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    pub fn lookup_type(&self, x: &str) -> Option<&Term> {
        self.types.get(x)
    }

    pub fn set_type(&mut self, x: Name, a: Term) {
        if !self.types.contains_key(&x) {
            self.types_order.push(x.clone());
        }
        self.types.insert(x, a);
    }

    pub fn unset_type(&mut self, x: &str) {
        self.types.remove(x);
        self.types_order.retain(|n| n != x);
    }

    pub fn lookup_env(&self, x: &str) -> Option<&Term> {
        self.env.iter().rev().find(|(n, _)| n == x).map(|(_, t)| t)
    }

    pub fn topes(&self) -> &[Term] {
        &self.topes
    }

    pub fn tope_inclusions(&self) -> &[(Name, Term, Term)] {
        &self.tope_inclusions
    }

    /// Every variable's declared type, in the order it was introduced
    /// (for a context dump).
    pub fn types(&self) -> Vec<(&Name, &Term)> {
        self.types_order.iter().map(|n| (n, self.types.get(n).expect("types_order entries are always in types"))).collect()
    }

    /// Every value definition currently pushed, most recently bound last
    /// (for a context dump).
    pub fn env(&self) -> &[(Name, Term)] {
        &self.env
    }

    /// Record a tope inclusion `∀x. φ(x) ⇒ ψ(x)` contributed by a
    /// cube-indexed Pi type.
    pub fn add_tope_inclusion(&mut self, x: Name, phi: Term, psi: Term) {
        self.tope_inclusions.push((x, phi, psi));
    }

    /// Names currently bound, local or global, used to pick fresh names.
    pub fn in_use_names(&self) -> std::collections::HashSet<Name> {
        let mut used: std::collections::HashSet<Name> = self.types_order.iter().cloned().collect();
        used.extend(self.env.iter().map(|(n, _)| n.clone()));
        used
    }

    /// Push a typing assumption `x : a`, run `k`, then restore the frame
    /// regardless of how `k` returns. When `a` is a cube-indexed Pi type
    /// `Pi (λ t:I | φ(t). _)`, also pushes the tope inclusion `∀t. App x t
    /// ⇒ φ(t)` it contributes (§3), popped on the same exit paths.
    pub fn local_typing<T>(&mut self, x: &str, a: Option<Term>, k: impl FnOnce(&mut Context) -> T) -> T {
        let mut pushed_inclusion = false;
        let previous = match a {
            Some(a) => {
                if let Some((param, guard)) = guarded_pi_guard(&a) {
                    self.tope_inclusions.push((x.to_string(), param, guard));
                    pushed_inclusion = true;
                }
                let prev = self.types.get(x).cloned();
                self.set_type(x.to_string(), a);
                Some(prev)
            }
            None => None,
        };
        let result = k(self);
        if pushed_inclusion {
            self.tope_inclusions.pop();
        }
        if let Some(prev) = previous {
            match prev {
                Some(prev_ty) => self.set_type(x.to_string(), prev_ty),
                None => self.unset_type(x),
            }
        }
        result
    }

    /// Push a tope assumption, run `k`, then pop it (LIFO) regardless of
    /// how `k` returns.
    pub fn local_constraint<T>(&mut self, phi: Term, k: impl FnOnce(&mut Context) -> T) -> T {
        self.topes.push(phi);
        let result = k(self);
        self.topes.pop();
        result
    }

    /// Push a value binding `x := t` into the evaluation environment, run
    /// `k`, then pop it regardless of how `k` returns.
    pub fn local_var<T>(&mut self, x: &str, t: Term, k: impl FnOnce(&mut Context) -> T) -> T {
        self.env.push((x.to_string(), t));
        let result = k(self);
        self.env.pop();
        result
    }

    /// Permanently record a top-level definition (used by the module
    /// driver, not scoped).
    pub fn add_definition(&mut self, name: Name, ty: Term, body: Term) {
        self.set_type(name.clone(), ty);
        self.env.push((name, body));
    }

    /// Pick a fresh variable name disjoint from everything currently in
    /// scope and from `extra`.
    pub fn fresh_var(&self, base: &str, extra: &std::collections::HashSet<Name>) -> Name {
        let mut used = self.in_use_names();
        used.extend(extra.iter().cloned());
        refresh(base, &used)
    }
}

/// If `a` is a cube-indexed Pi type `Pi (λ t:I | φ(t). _)`, returns
/// `(Var t, φ)` — the pieces needed to record the tope inclusion it
/// contributes. Anything else, including an unguarded `Pi`, yields `None`.
fn guarded_pi_guard(a: &Term) -> Option<(Term, Term)> {
    if let Term::Pi(l) = a {
        if let Term::Lambda { param, guard: Some(phi), .. } = l.as_ref() {
            return Some((Term::Var(param.clone()), (**phi).clone()));
        }
    }
    None
}

/// Metavariable store: solved holes, the set of every hole ever
/// introduced, and a fresh-name counter.
#[derive(Debug, Clone, Default)]
pub struct HoleStore {
    known: HashMap<Name, Term>,
    declared: std::collections::HashSet<Name>,
    counter: u64,
}

impl HoleStore {
    pub fn new() -> Self {
        HoleStore::default()
    }

    /// Allocate a fresh, unsolved hole.
    pub fn fresh_hole(&mut self) -> Name {
        let name = format!("h{}", self.counter);
        self.counter += 1;
        self.declared.insert(name.clone());
        name
    }

    pub fn is_declared(&self, h: &str) -> bool {
        self.declared.contains(h)
    }

    /// One-step lookup of a solved hole (does not transitively chase).
    pub fn lookup(&self, h: &str) -> Option<&Term> {
        self.known.get(h)
    }

    /// Transitively chase a hole through however many solved links are
    /// necessary; stops as soon as it reaches an unsolved hole or a
    /// non-hole term.
    pub fn chase(&self, t: &Term) -> Term {
        let mut current = t.clone();
        loop {
            match &current {
                Term::Hole(h) => match self.known.get(h) {
                    Some(next) => current = next.clone(),
                    None => return current,
                },
                _ => return current,
            }
        }
    }

    /// Solve `h := t` and propagate the solution into every existing
    /// solution's right-hand side, so a future lookup never needs more
    /// than one chase step through an already-solved hole.
    pub fn instantiate(&mut self, h: &str, t: Term) {
        self.known.insert(h.to_string(), t.clone());
        for existing in self.known.values_mut() {
            *existing = existing.substitute(h, &t);
        }
    }

    pub fn known_solutions(&self) -> &HashMap<Name, Term> {
        &self.known
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_typing_restores_on_normal_return() {
        let mut ctx = Context::new();
        ctx.set_type("x".into(), Term::Universe);
        ctx.local_typing("x", Some(Term::Cube), |ctx| {
            assert_eq!(ctx.lookup_type("x"), Some(&Term::Cube));
        });
        assert_eq!(ctx.lookup_type("x"), Some(&Term::Universe));
    }

    #[test]
    fn local_typing_restores_on_early_error() {
        let mut ctx = Context::new();
        let result: Result<(), ()> = ctx.local_typing("y", Some(Term::Universe), |_ctx| Err(()));
        assert!(result.is_err());
        assert_eq!(ctx.lookup_type("y"), None);
    }

    #[test]
    fn local_typing_pushes_and_pops_a_tope_inclusion_for_a_guarded_pi() {
        let mut ctx = Context::new();
        let guarded_ty = Term::Pi(Box::new(Term::Lambda {
            param: "t".into(),
            param_type: Some(Box::new(Term::Cube2)),
            guard: Some(Box::new(Term::TopeEQ(
                Box::new(Term::Var("t".into())),
                Box::new(Term::Cube2_0),
            ))),
            body: Box::new(Term::Cube2),
        }));
        ctx.local_typing("g", Some(guarded_ty), |ctx| {
            assert_eq!(ctx.tope_inclusions().len(), 1);
            assert_eq!(ctx.tope_inclusions()[0].0, "g");
        });
        assert!(ctx.tope_inclusions().is_empty());
    }

    #[test]
    fn local_typing_pushes_no_inclusion_for_an_unguarded_pi() {
        let mut ctx = Context::new();
        let plain_ty = Term::Pi(Box::new(Term::lambda("x", Term::Universe, Term::Universe)));
        ctx.local_typing("g", Some(plain_ty), |ctx| {
            assert!(ctx.tope_inclusions().is_empty());
        });
    }

    #[test]
    fn local_constraint_pops_lifo() {
        let mut ctx = Context::new();
        ctx.local_constraint(Term::TopeTop, |ctx| {
            ctx.local_constraint(Term::TopeBottom, |ctx| {
                assert_eq!(ctx.topes(), &[Term::TopeTop, Term::TopeBottom]);
            });
            assert_eq!(ctx.topes(), &[Term::TopeTop]);
        });
        assert!(ctx.topes().is_empty());
    }

    #[test]
    fn instantiate_propagates_into_existing_solutions() {
        let mut store = HoleStore::new();
        let h0 = store.fresh_hole();
        let h1 = store.fresh_hole();
        store.instantiate(&h1, Term::Hole(h0.clone()));
        store.instantiate(&h0, Term::Universe);
        assert_eq!(store.lookup(&h1), Some(&Term::Universe));
    }
}
