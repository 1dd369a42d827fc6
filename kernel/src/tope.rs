//! Tope entailment: saturation-based decision of `Γ ⊢ φ` for the
//! propositional fragment over the directed interval.
//!
//! The saturation loop below is the same "grow a deduplicated set to a
//! fixed point" shape as the reference kernel's congruence-closure
//! propagation pass, specialized to topes instead of uninterpreted
//! equalities; termination is argued the same way, since every rule here
//! only ever produces topes built from sub-terms already present.

use crate::context::{Context, HoleStore};
use crate::eval::eval;
use crate::term::Term;

/// Expand `p` into its immediate logical consequences, per the "unfold
/// inclusions" step.
fn unfold(ctx: &Context, p: &Term) -> Vec<Term> {
    match p {
        Term::TopeAnd(a, b) => vec![(**a).clone(), (**b).clone()],
        Term::TopeOr(a, b) => {
            let mut out = Vec::new();
            for ai in unfold(ctx, a).into_iter().chain(std::iter::once((**a).clone())) {
                for bj in unfold(ctx, b).into_iter().chain(std::iter::once((**b).clone())) {
                    out.push(Term::TopeOr(Box::new(ai.clone()), Box::new(bj)));
                }
            }
            out
        }
        Term::App(f, x) => {
            let mut out = Vec::new();
            // `f` is syntactically a guarded-Pi lambda term itself (rare —
            // only happens if the tope term embeds an un-abstracted Pi).
            if let Term::Pi(l) = f.as_ref() {
                if let Term::Lambda {
                    param,
                    guard: Some(phi),
                    ..
                } = l.as_ref()
                {
                    out.push(phi.substitute(param, x));
                }
            }
            // The common case: `f` is a variable whose declared type is a
            // guarded Pi, recorded as a tope inclusion when that type was
            // pushed into scope (see `Context::local_typing`).
            if let Term::Var(name) = f.as_ref() {
                for (incl_name, param, guard) in ctx.tope_inclusions() {
                    if incl_name != name {
                        continue;
                    }
                    if let Term::Var(param_name) = param {
                        out.push(guard.substitute(param_name, x));
                    }
                }
            }
            out
        }
        _ => Vec::new(),
    }
}

fn normalized_eq(ctx: &Context, holes: &HoleStore, a: &Term, b: &Term) -> bool {
    match (eval(ctx, holes, a), eval(ctx, holes, b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Saturate the context's assumed topes under the `Cube2` axioms
/// (conjunction elimination, transitivity, antisymmetry, distinct
/// endpoints) until a fixed point, returning the closure as a flat list.
pub fn saturate(ctx: &Context) -> Vec<Term> {
    let mut known: Vec<Term> = Vec::new();
    let mut frontier: Vec<Term> = ctx.topes().to_vec();

    while let Some(p) = frontier.pop() {
        if !push_unique(&mut known, p.clone()) {
            continue;
        }
        for consequence in unfold(ctx, &p) {
            frontier.push(consequence);
        }
    }

    loop {
        let mut changed = false;
        let snapshot = known.clone();

        for p in &snapshot {
            if let Term::TopeAnd(a, b) = p {
                if push_unique(&mut known, (**a).clone()) {
                    changed = true;
                }
                if push_unique(&mut known, (**b).clone()) {
                    changed = true;
                }
            }
        }

        for p in &snapshot {
            for q in &snapshot {
                if let (Term::TopeLEQ(x, y), Term::TopeLEQ(y2, z)) = (p, q) {
                    if y == y2 && x != z && push_unique(&mut known, Term::TopeLEQ(x.clone(), z.clone())) {
                        changed = true;
                    }
                }
                if let (Term::TopeLEQ(x, y), Term::TopeLEQ(y2, x2)) = (p, q) {
                    if x == x2 && y == y2 && push_unique(&mut known, Term::TopeEQ(x.clone(), y.clone())) {
                        changed = true;
                    }
                }
            }
        }

        let has_distinct_endpoints = known.iter().any(|p| {
            matches!(
                p,
                Term::TopeLEQ(a, b) if matches!((a.as_ref(), b.as_ref()), (Term::Cube2_1, Term::Cube2_0))
            )
        });
        if has_distinct_endpoints && push_unique(&mut known, Term::TopeBottom) {
            changed = true;
        }

        if !changed {
            break;
        }
    }

    known
}

fn push_unique(known: &mut Vec<Term>, t: Term) -> bool {
    if known.iter().any(|k| *k == t) {
        false
    } else {
        known.push(t);
        true
    }
}

/// Decide `topes ⊢ φ`.
pub fn entails(ctx: &Context, holes: &HoleStore, phi: &Term) -> bool {
    let phi = eval(ctx, holes, phi).unwrap_or_else(|_| phi.clone());
    if matches!(phi, Term::TopeTop) {
        return true;
    }
    let saturated = saturate(ctx);
    if saturated.iter().any(|k| matches!(k, Term::TopeBottom)) {
        return true;
    }
    if saturated.iter().any(|k| normalized_eq(ctx, holes, k, &phi)) {
        return true;
    }
    match &phi {
        Term::TopeAnd(a, b) => entails(ctx, holes, a) && entails(ctx, holes, b),
        Term::TopeOr(a, b) => entails(ctx, holes, a) || entails(ctx, holes, b),
        Term::TopeEQ(a, b) => normalized_eq(ctx, holes, a, b),
        _ => false,
    }
}

/// `{φ} ⊢ ψ`.
pub fn ensure_sub_tope(ctx: &mut Context, holes: &HoleStore, psi: &Term, phi: &Term) -> bool {
    ctx.local_constraint(phi.clone(), |ctx| entails(ctx, holes, psi))
}

/// Both directions of `ensure_sub_tope`.
pub fn ensure_eq_tope(ctx: &mut Context, holes: &HoleStore, psi: &Term, phi: &Term) -> bool {
    ensure_sub_tope(ctx, holes, psi, phi) && ensure_sub_tope(ctx, holes, phi, psi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leq(a: Term, b: Term) -> Term {
        Term::TopeLEQ(Box::new(a), Box::new(b))
    }

    #[test]
    fn top_is_always_entailed() {
        let ctx = Context::new();
        let holes = HoleStore::new();
        assert!(entails(&ctx, &holes, &Term::TopeTop));
    }

    #[test]
    fn conjunction_elimination() {
        let mut ctx = Context::new();
        let holes = HoleStore::new();
        ctx.local_constraint(
            Term::TopeAnd(
                Box::new(leq(Term::Cube2_0, Term::Var("t".into()))),
                Box::new(leq(Term::Var("t".into()), Term::Cube2_1)),
            ),
            |ctx| {
                assert!(entails(ctx, &holes, &leq(Term::Cube2_0, Term::Var("t".into()))));
                assert!(entails(ctx, &holes, &leq(Term::Var("t".into()), Term::Cube2_1)));
            },
        );
    }

    #[test]
    fn transitivity_of_leq() {
        let mut ctx = Context::new();
        let holes = HoleStore::new();
        ctx.local_constraint(leq(Term::Var("x".into()), Term::Var("y".into())), |ctx| {
            ctx.local_constraint(leq(Term::Var("y".into()), Term::Var("z".into())), |ctx| {
                assert!(entails(ctx, &holes, &leq(Term::Var("x".into()), Term::Var("z".into()))));
            });
        });
    }

    #[test]
    fn distinct_endpoints_entail_bottom() {
        let mut ctx = Context::new();
        let holes = HoleStore::new();
        ctx.local_constraint(leq(Term::Cube2_1, Term::Cube2_0), |ctx| {
            assert!(entails(ctx, &holes, &Term::TopeBottom));
            // bottom entails anything
            assert!(entails(ctx, &holes, &leq(Term::Cube2_0, Term::Cube2_1)));
        });
    }

    #[test]
    fn applying_a_guarded_pi_hypothesis_asserts_its_instantiated_guard() {
        let mut ctx = Context::new();
        let holes = HoleStore::new();
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
            ctx.local_constraint(
                Term::App(Box::new(Term::Var("g".into())), Box::new(Term::Var("x".into()))),
                |ctx| {
                    assert!(entails(
                        ctx,
                        &holes,
                        &Term::TopeEQ(Box::new(Term::Var("x".into())), Box::new(Term::Cube2_0)),
                    ));
                },
            );
        });
    }

    #[test]
    fn tope_monotonicity() {
        // Γ ⊢ φ implies Γ, ψ ⊢ φ for any well-typed ψ.
        let mut ctx = Context::new();
        let holes = HoleStore::new();
        ctx.local_constraint(Term::TopeTop, |ctx| {
            assert!(entails(ctx, &holes, &Term::TopeTop));
            ctx.local_constraint(Term::TopeBottom, |ctx| {
                assert!(entails(ctx, &holes, &Term::TopeTop));
            });
        });
    }
}
