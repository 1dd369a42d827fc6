//! First-order unification with hole instantiation, an occurs check,
//! η-expansion for functions/pairs/extension types, and extension-type
//! aware comparison.
//!
//! Grounded on the reference unifier's occurs-check and transitive-chase
//! structure; the reference's Miller-pattern (higher-order) unification is
//! deliberately not carried over — this unifier is sound but incomplete,
//! as the specification requires.

use crate::context::Context;
use crate::error::KernelError;
use crate::eval::{eval, TypeInferrer};
use crate::term::Term;
use crate::tope;

/// Unify `t1` and `t2`: evaluate both sides, then walk them structurally,
/// solving holes as needed. Returns `()` on success or the mismatch as a
/// `KernelError`.
pub fn unify(inferrer: &mut dyn TypeInferrer, ctx: &mut Context, t1: &Term, t2: &Term) -> Result<(), KernelError> {
    let e1 = eval(ctx, inferrer.holes(), t1).map_err(|e| (t1.clone(), e))?;
    let e2 = eval(ctx, inferrer.holes(), t2).map_err(|e| (t2.clone(), e))?;
    unify_prime(inferrer, ctx, &e1, &e2)
}

fn mismatch(outer1: &Term, outer2: &Term, inner1: &Term, inner2: &Term) -> KernelError {
    KernelError::Unexpected {
        term: outer1.clone(),
        inferred_full: outer1.clone(),
        expected_full: outer2.clone(),
        inferred: inner1.clone(),
        expected: inner2.clone(),
    }
}

fn unify_prime(inferrer: &mut dyn TypeInferrer, ctx: &mut Context, t1: &Term, t2: &Term) -> Result<(), KernelError> {
    match (t1, t2) {
        (Term::Hole(h1), Term::Hole(h2)) if h1 == h2 => Ok(()),

        // Preserved as specified: when the RIGHT side is a hole, unify
        // treats it as an ordinary variable rather than solving it. This
        // looks like it throws away the fact that `x` is a hole, but it
        // is the specified behavior, not an oversight.
        (t, Term::Hole(x)) => unify_prime(inferrer, ctx, t, &Term::Var(x.clone())),

        (Term::Hole(h), t) => {
            if let Some(solved) = inferrer.holes().lookup(h).cloned() {
                return unify_prime(inferrer, ctx, &solved, t);
            }
            check_infinite_type(inferrer.holes(), t, h, t)?;
            inferrer.holes().instantiate(h, t.clone());
            Ok(())
        }

        (Term::Var(x), Term::Var(y)) if x == y => Ok(()),

        (Term::TypedTerm(t, _), other) => unify_prime(inferrer, ctx, t, other),
        (other, Term::TypedTerm(t, _)) => unify_prime(inferrer, ctx, other, t),

        (Term::Universe, Term::Universe)
        | (Term::Cube, Term::Cube)
        | (Term::CubeUnit, Term::CubeUnit)
        | (Term::CubeUnitStar, Term::CubeUnitStar)
        | (Term::Cube2, Term::Cube2)
        | (Term::Cube2_0, Term::Cube2_0)
        | (Term::Cube2_1, Term::Cube2_1)
        | (Term::Tope, Term::Tope)
        | (Term::TopeTop, Term::TopeTop)
        | (Term::TopeBottom, Term::TopeBottom) => Ok(()),

        (Term::RecBottom, other) | (other, Term::RecBottom) => {
            if tope::entails(ctx, inferrer.holes(), &Term::TopeBottom) {
                Ok(())
            } else {
                Err(mismatch(t1, t2, &Term::RecBottom, other))
            }
        }

        (Term::Pi(l1), Term::Pi(l2)) => unify_lambdas(inferrer, ctx, t1, t2, l1, l2),
        (Term::Sigma(l1), Term::Sigma(l2)) => unify_lambdas(inferrer, ctx, t1, t2, l1, l2),

        (Term::Lambda { .. }, Term::Lambda { .. }) => unify_lambdas(inferrer, ctx, t1, t2, t1, t2),

        (Term::App(f1, a1), Term::App(f2, a2)) => {
            let r1 = reduce_extension_app(inferrer, ctx, t1)?;
            let r2 = reduce_extension_app(inferrer, ctx, t2)?;
            if r1.is_some() || r2.is_some() {
                let n1 = r1.unwrap_or_else(|| t1.clone());
                let n2 = r2.unwrap_or_else(|| t2.clone());
                unify(inferrer, ctx, &n1, &n2)
            } else {
                unify_prime(inferrer, ctx, f1, f2)?;
                unify_prime(inferrer, ctx, a1, a2)
            }
        }

        (Term::Pair(a1, b1), Term::Pair(a2, b2)) => {
            unify_prime(inferrer, ctx, a1, a2)?;
            unify_prime(inferrer, ctx, b1, b2)
        }
        (Term::First(p1), Term::First(p2)) => unify_prime(inferrer, ctx, p1, p2),
        (Term::Second(p1), Term::Second(p2)) => unify_prime(inferrer, ctx, p1, p2),

        (Term::IdType(a1, x1, y1), Term::IdType(a2, x2, y2)) => {
            unify_prime(inferrer, ctx, a1, a2)?;
            unify_prime(inferrer, ctx, x1, x2)?;
            unify_prime(inferrer, ctx, y1, y2)
        }
        (Term::Refl(_, x1), Term::Refl(_, x2)) => unify_prime(inferrer, ctx, x1, x2),
        (
            Term::IdJ { a_type: a1, a: aa1, motive: c1, base: d1, x: x1, path: p1 },
            Term::IdJ { a_type: a2, a: aa2, motive: c2, base: d2, x: x2, path: p2 },
        ) => {
            unify_prime(inferrer, ctx, a1, a2)?;
            unify_prime(inferrer, ctx, aa1, aa2)?;
            unify_prime(inferrer, ctx, c1, c2)?;
            unify_prime(inferrer, ctx, d1, d2)?;
            unify_prime(inferrer, ctx, x1, x2)?;
            unify_prime(inferrer, ctx, p1, p2)
        }

        (Term::CubeProd(a1, b1), Term::CubeProd(a2, b2)) => {
            unify_prime(inferrer, ctx, a1, a2)?;
            unify_prime(inferrer, ctx, b1, b2)
        }

        (Term::TopeOr(a1, b1), Term::TopeOr(a2, b2)) => {
            if !tope::ensure_eq_tope(
                ctx,
                inferrer.holes(),
                &Term::TopeOr(a1.clone(), b1.clone()),
                &Term::TopeOr(a2.clone(), b2.clone()),
            ) {
                return Err(mismatch(t1, t2, t1, t2));
            }
            Ok(())
        }
        (Term::TopeAnd(a1, b1), Term::TopeAnd(a2, b2)) => {
            if !tope::ensure_eq_tope(
                ctx,
                inferrer.holes(),
                &Term::TopeAnd(a1.clone(), b1.clone()),
                &Term::TopeAnd(a2.clone(), b2.clone()),
            ) {
                return Err(mismatch(t1, t2, t1, t2));
            }
            Ok(())
        }
        (Term::TopeEQ(a1, b1), Term::TopeEQ(a2, b2)) => {
            unify_prime(inferrer, ctx, a1, a2)?;
            unify_prime(inferrer, ctx, b1, b2)
        }
        (Term::TopeLEQ(a1, b1), Term::TopeLEQ(a2, b2)) => {
            unify_prime(inferrer, ctx, a1, a2)?;
            unify_prime(inferrer, ctx, b1, b2)
        }

        (
            Term::RecOr { left_tope: lt1, right_tope: rt1, left: l1, right: r1 },
            Term::RecOr { left_tope: lt2, right_tope: rt2, left: l2, right: r2 },
        ) => {
            unify_prime(inferrer, ctx, lt1, lt2)?;
            unify_prime(inferrer, ctx, rt1, rt2)?;
            unify_prime(inferrer, ctx, l1, l2)?;
            unify_prime(inferrer, ctx, r1, r2)
        }

        (
            Term::ExtensionType { var: v1, cube: c1, tope: ps1, ty: a1, boundary_tope: bt1, boundary_term: bv1 },
            Term::ExtensionType { var: v2, cube: c2, tope: ps2, ty: a2, boundary_tope: bt2, boundary_term: bv2 },
        ) => {
            unify_prime(inferrer, ctx, c1, c2)?;
            let ps2_renamed = crate::term::rename_var(v2, v1, ps2);
            let a2_renamed = crate::term::rename_var(v2, v1, a2);
            let bt2_renamed = crate::term::rename_var(v2, v1, bt2);
            let bv2_renamed = crate::term::rename_var(v2, v1, bv2);
            ctx.local_typing(v1, Some((**c1).clone()), |ctx| {
                unify_prime(inferrer, ctx, ps1, &ps2_renamed)?;
                ctx.local_constraint((**ps1).clone(), |ctx| unify_prime(inferrer, ctx, a1, &a2_renamed))?;
                ctx.local_constraint((**ps1).clone(), |ctx| unify_prime(inferrer, ctx, bt1, &bt2_renamed))?;
                ctx.local_constraint((**bt1).clone(), |ctx| unify_prime(inferrer, ctx, bv1, &bv2_renamed))
            })
        }

        // η-expansion for functions: one side is a lambda, the other isn't.
        (Term::Lambda { param, param_type, guard, body }, other)
        | (other, Term::Lambda { param, param_type, guard, body })
            if !matches!(other, Term::Lambda { .. }) =>
        {
            let mut used = other.free_vars();
            used.extend(body.free_vars());
            let fresh = ctx.fresh_var(param, &used);
            let applied = Term::App(Box::new(other.clone()), Box::new(Term::Var(fresh.clone())));
            let renamed_body = crate::term::rename_var(param, &fresh, body);
            match guard {
                Some(g) => {
                    let renamed_guard = crate::term::rename_var(param, &fresh, g);
                    ctx.local_typing(&fresh, param_type.as_ref().map(|t| (**t).clone()), |ctx| {
                        ctx.local_constraint(renamed_guard, |ctx| unify(inferrer, ctx, &renamed_body, &applied))
                    })
                }
                None => ctx.local_typing(&fresh, param_type.as_ref().map(|t| (**t).clone()), |ctx| {
                    unify(inferrer, ctx, &renamed_body, &applied)
                }),
            }
        }

        // η-expansion for pairs.
        (Term::Pair(f, s), other) | (other, Term::Pair(f, s)) if !matches!(other, Term::Pair(..)) => {
            unify(inferrer, ctx, f, &Term::First(Box::new(other.clone())))?;
            unify(inferrer, ctx, s, &Term::Second(Box::new(other.clone())))
        }

        _ => {
            // Extension η: if the inferred type of one side is an
            // extension type, η-expand against a fresh point of its cube.
            if let Some(result) = try_extension_eta(inferrer, ctx, t1, t2)? {
                return result;
            }
            Err(mismatch(t1, t2, t1, t2))
        }
    }
}

fn unify_lambdas(
    inferrer: &mut dyn TypeInferrer,
    ctx: &mut Context,
    outer1: &Term,
    outer2: &Term,
    l1: &Term,
    l2: &Term,
) -> Result<(), KernelError> {
    let (
        Term::Lambda { param: x, param_type: a, guard: phi, body: m },
        Term::Lambda { param: y, param_type: b, guard: psi, body: n },
    ) = (l1, l2)
    else {
        return Err(mismatch(outer1, outer2, l1, l2));
    };
    if let (Some(a), Some(b)) = (a, b) {
        unify_prime(inferrer, ctx, a, b)?;
    }
    let combined_type = a.clone().or_else(|| b.clone()).map(|t| (*t).clone());
    if let (Some(phi), Some(psi)) = (phi, psi) {
        let psi_renamed = crate::term::rename_var(y, x, psi);
        if !tope::ensure_eq_tope(ctx, inferrer.holes(), phi, &psi_renamed) {
            return Err(mismatch(outer1, outer2, phi, psi));
        }
    }
    let n_renamed = crate::term::rename_var(y, x, n);
    ctx.local_typing(x, combined_type, |ctx| match phi {
        Some(g) => ctx.local_constraint((**g).clone(), |ctx| unify(inferrer, ctx, m, &n_renamed)),
        None => unify(inferrer, ctx, m, &n_renamed),
    })
}

/// Attempt the extension-type β-reduction on `App f x`; returns `None`
/// when `t` is not such an application or the rule does not fire.
fn reduce_extension_app(inferrer: &mut dyn TypeInferrer, ctx: &mut Context, t: &Term) -> Result<Option<Term>, KernelError> {
    if let Term::App(f, x) = t {
        if let Ok(f_ty) = inferrer.infer(ctx, f) {
            if let Term::ExtensionType { var, boundary_tope, boundary_term, .. } =
                eval(ctx, inferrer.holes(), &f_ty).unwrap_or(f_ty)
            {
                let guard = boundary_tope.substitute(&var, x);
                if tope::entails(ctx, inferrer.holes(), &guard) {
                    return Ok(Some(boundary_term.substitute(&var, x)));
                }
            }
        }
    }
    Ok(None)
}

fn try_extension_eta(
    inferrer: &mut dyn TypeInferrer,
    ctx: &mut Context,
    t1: &Term,
    t2: &Term,
) -> Result<Option<Result<(), KernelError>>, KernelError> {
    for (side, other) in [(t1, t2), (t2, t1)] {
        if let Ok(ty) = inferrer.infer(ctx, side) {
            if let Term::ExtensionType { var, cube, .. } = eval(ctx, inferrer.holes(), &ty).unwrap_or(ty) {
                let mut used = side.free_vars();
                used.extend(other.free_vars());
                let fresh = ctx.fresh_var(&var, &used);
                let lhs = Term::App(Box::new(side.clone()), Box::new(Term::Var(fresh.clone())));
                let rhs = Term::App(Box::new(other.clone()), Box::new(Term::Var(fresh.clone())));
                let result = ctx.local_typing(&fresh, Some(*cube), |ctx| unify(inferrer, ctx, &lhs, &rhs));
                return Ok(Some(result));
            }
        }
    }
    Ok(None)
}

/// Walks `t`, chasing solved holes, and fails with `KernelError::Infinite`
/// iff `h` occurs in `t` and `t` is not simply `h` itself.
///
/// Preserved as specified: the `Sigma` case recurses through a `Pi` shell
/// rather than a `Sigma` shell. This looks like a copy-paste slip, but it
/// is the specified behavior, not a bug to fix.
fn check_infinite_type(holes: &crate::context::HoleStore, whole: &Term, h: &str, t: &Term) -> Result<(), KernelError> {
    let chased = holes.chase(t);
    let inner: Result<(), ()> = match &chased {
        Term::Hole(x) if x == h => Err(()),
        Term::Hole(_) => Ok(()),
        Term::Var(_)
        | Term::Universe
        | Term::Cube
        | Term::CubeUnit
        | Term::CubeUnitStar
        | Term::Cube2
        | Term::Cube2_0
        | Term::Cube2_1
        | Term::Tope
        | Term::TopeTop
        | Term::TopeBottom
        | Term::RecBottom => Ok(()),
        Term::TypedTerm(a, b) => {
            check_infinite_type(holes, whole, h, a).and_then(|_| check_infinite_type(holes, whole, h, b)).map_err(|_| ())
        }
        Term::Pi(l) => check_infinite_type(holes, whole, h, l).map_err(|_| ()),
        Term::Sigma(l) => {
            // See doc comment: preserved Pi-shell quirk.
            check_infinite_type(holes, whole, h, &Term::Pi(l.clone())).map_err(|_| ())
        }
        Term::Lambda { param_type, guard, body, .. } => (|| {
            if let Some(a) = param_type {
                check_infinite_type(holes, whole, h, a)?;
            }
            if let Some(g) = guard {
                check_infinite_type(holes, whole, h, g)?;
            }
            check_infinite_type(holes, whole, h, body)
        })()
        .map_err(|_| ()),
        Term::App(f, a)
        | Term::CubeProd(f, a)
        | Term::TopeOr(f, a)
        | Term::TopeAnd(f, a)
        | Term::TopeEQ(f, a)
        | Term::TopeLEQ(f, a)
        | Term::Pair(f, a) => check_infinite_type(holes, whole, h, f)
            .and_then(|_| check_infinite_type(holes, whole, h, a))
            .map_err(|_| ()),
        Term::First(x) | Term::Second(x) => check_infinite_type(holes, whole, h, x).map_err(|_| ()),
        Term::IdType(a, x, y) => (|| {
            check_infinite_type(holes, whole, h, a)?;
            check_infinite_type(holes, whole, h, x)?;
            check_infinite_type(holes, whole, h, y)
        })()
        .map_err(|_| ()),
        Term::Refl(a, x) => (|| {
            if let Some(a) = a {
                check_infinite_type(holes, whole, h, a)?;
            }
            check_infinite_type(holes, whole, h, x)
        })()
        .map_err(|_| ()),
        Term::IdJ { a_type, a, motive, base, x, path } => (|| {
            for sub in [a_type, a, motive, base, x, path] {
                check_infinite_type(holes, whole, h, sub)?;
            }
            Ok(())
        })()
        .map_err(|_| ()),
        Term::RecOr { left_tope, right_tope, left, right } => (|| {
            for sub in [left_tope, right_tope, left, right] {
                check_infinite_type(holes, whole, h, sub)?;
            }
            Ok(())
        })()
        .map_err(|_| ()),
        Term::ExtensionType { cube, tope, ty, boundary_tope, boundary_term, .. } => (|| {
            for sub in [cube, tope, ty, boundary_tope, boundary_term] {
                check_infinite_type(holes, whole, h, sub)?;
            }
            Ok(())
        })()
        .map_err(|_| ()),
    };
    inner.map_err(|_| KernelError::Infinite(Term::Hole(h.to_string()), whole.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HoleStore;

    struct NullInferrer {
        holes: HoleStore,
    }
    impl TypeInferrer for NullInferrer {
        fn infer(&mut self, _ctx: &mut Context, _t: &Term) -> Result<Term, KernelError> {
            Err(KernelError::Other("no inference in this test harness".into()))
        }
        fn holes(&mut self) -> &mut HoleStore {
            &mut self.holes
        }
    }

    fn harness() -> (NullInferrer, Context) {
        (NullInferrer { holes: HoleStore::new() }, Context::new())
    }

    #[test]
    fn identical_atoms_unify() {
        let (mut inf, mut ctx) = harness();
        assert!(unify(&mut inf, &mut ctx, &Term::Universe, &Term::Universe).is_ok());
    }

    #[test]
    fn hole_is_solved_by_unification() {
        let (mut inf, mut ctx) = harness();
        let h = inf.holes.fresh_hole();
        unify(&mut inf, &mut ctx, &Term::Hole(h.clone()), &Term::Cube).unwrap();
        assert_eq!(inf.holes.lookup(&h), Some(&Term::Cube));
    }

    #[test]
    fn occurs_check_rejects_infinite_solution() {
        let (mut inf, mut ctx) = harness();
        let h = inf.holes.fresh_hole();
        let occurs = Term::App(Box::new(Term::Var("g".into())), Box::new(Term::Hole(h.clone())));
        let result = unify(&mut inf, &mut ctx, &Term::Hole(h.clone()), &occurs);
        assert!(matches!(result, Err(KernelError::Infinite(..))));
        assert_eq!(inf.holes.lookup(&h), None);
    }

    #[test]
    fn eta_for_pairs_needs_no_new_hole() {
        let (mut inf, mut ctx) = harness();
        let p = Term::Var("p".into());
        let expanded = Term::Pair(
            Box::new(Term::First(Box::new(p.clone()))),
            Box::new(Term::Second(Box::new(p.clone()))),
        );
        assert!(unify(&mut inf, &mut ctx, &p, &expanded).is_ok());
        assert!(inf.holes.known_solutions().is_empty());
    }

    #[test]
    fn mismatched_atoms_fail() {
        let (mut inf, mut ctx) = harness();
        assert!(unify(&mut inf, &mut ctx, &Term::Cube, &Term::Tope).is_err());
    }

    #[test]
    fn right_hand_hole_is_treated_as_a_variable() {
        // Pinned open-question behavior: `unify t (Hole x)` recurses as
        // `unify t (Var x)` instead of solving the hole.
        let (mut inf, mut ctx) = harness();
        let h = inf.holes.fresh_hole();
        ctx.set_type(h.clone(), Term::Universe);
        let result = unify(&mut inf, &mut ctx, &Term::Var(h.clone()), &Term::Hole(h.clone()));
        assert!(result.is_ok());
        assert!(inf.holes.lookup(&h).is_none());
    }
}
