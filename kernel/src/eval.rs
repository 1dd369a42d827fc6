//! The normalizer.
//!
//! `eval` is weak normalization: it unfolds known variables, reduces
//! beta-redexes, projects explicit pairs, and reduces `IdJ` on `Refl`, but
//! does not descend into binders. `normalize` drives `eval` to a fixed
//! point under a fuel counter, mirroring the reference kernel's own
//! `normalize()` loop, so a circular definition environment fails closed
//! with an `EvalError` instead of looping forever.
//!
//! `eval_type`/`eval_extension_apps` need the *inferred type* of an
//! application's function to decide whether the extension-beta rule
//! fires (see the module docs in `type_checker.rs`); that capability is
//! threaded in through the [`TypeInferrer`] trait rather than a direct
//! dependency on the checker, to avoid a literal circular module
//! dependency while preserving the semantic one the specification calls
//! for.

use crate::context::{Context, HoleStore};
use crate::error::KernelResult;
use crate::term::Term;
use crate::tope;
use std::fmt;

const NORMALIZE_FUEL: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    UnboundVariable(String),
    StuckProjection(Term),
    FuelExhausted,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UnboundVariable(x) => write!(f, "unbound variable: {}", x),
            EvalError::StuckProjection(t) => write!(f, "projection from non-pair: {}", t),
            EvalError::FuelExhausted => write!(f, "normalization did not reach a fixed point"),
        }
    }
}

/// A capability the evaluator borrows from the bidirectional checker so
/// that `eval_extension_apps` can ask for the inferred type of a
/// sub-term. Implemented by the checker's `Checker` type.
pub trait TypeInferrer {
    fn infer(&mut self, ctx: &mut Context, t: &Term) -> KernelResult<Term>;
    fn holes(&mut self) -> &mut HoleStore;
}

/// One step of call-by-name reduction: unfold a variable or hole, fire a
/// beta-redex, project a pair, or reduce `IdJ` on `Refl`. Returns `None`
/// when `t` is already in weak head normal form.
fn reduce_step(ctx: &Context, holes: &HoleStore, t: &Term) -> Result<Option<Term>, EvalError> {
    match t {
        Term::Var(x) => Ok(ctx.lookup_env(x).cloned()),
        Term::Hole(h) => Ok(holes.lookup(h).cloned()),
        Term::App(f, a) => {
            if let Some(f2) = reduce_step(ctx, holes, f)? {
                return Ok(Some(Term::App(Box::new(f2), a.clone())));
            }
            match f.as_ref() {
                Term::Lambda { param, body, .. } => Ok(Some(body.substitute(param, a))),
                _ => Ok(None),
            }
        }
        Term::First(p) => {
            if let Some(p2) = reduce_step(ctx, holes, p)? {
                return Ok(Some(Term::First(Box::new(p2))));
            }
            match p.as_ref() {
                Term::Pair(a, _) => Ok(Some((**a).clone())),
                Term::Var(_) | Term::App(..) | Term::Hole(_) | Term::First(_) | Term::Second(_) => {
                    Ok(None)
                }
                _ => Err(EvalError::StuckProjection((**p).clone())),
            }
        }
        Term::Second(p) => {
            if let Some(p2) = reduce_step(ctx, holes, p)? {
                return Ok(Some(Term::Second(Box::new(p2))));
            }
            match p.as_ref() {
                Term::Pair(_, b) => Ok(Some((**b).clone())),
                Term::Var(_) | Term::App(..) | Term::Hole(_) | Term::First(_) | Term::Second(_) => {
                    Ok(None)
                }
                _ => Err(EvalError::StuckProjection((**p).clone())),
            }
        }
        Term::IdJ {
            a_type,
            a,
            motive,
            base,
            x,
            path,
        } => {
            if let Some(path2) = reduce_step(ctx, holes, path)? {
                return Ok(Some(Term::IdJ {
                    a_type: a_type.clone(),
                    a: a.clone(),
                    motive: motive.clone(),
                    base: base.clone(),
                    x: x.clone(),
                    path: Box::new(path2),
                }));
            }
            match path.as_ref() {
                Term::Refl(_, _) => Ok(Some((**base).clone())),
                _ => Ok(None),
            }
        }
        Term::TypedTerm(inner, _) => Ok(Some((**inner).clone())),
        _ => Ok(None),
    }
}

/// Weak normal form of `t` under `ctx`'s value environment and `holes`'s
/// solved metavariables, bounded by a fuel counter so a malformed
/// environment fails rather than loops.
pub fn eval(ctx: &Context, holes: &HoleStore, t: &Term) -> Result<Term, EvalError> {
    let mut current = t.clone();
    for _ in 0..NORMALIZE_FUEL {
        match reduce_step(ctx, holes, &current)? {
            Some(next) => current = next,
            None => return Ok(current),
        }
    }
    Err(EvalError::FuelExhausted)
}

/// Public alias matching the specification's naming for the fuel-bounded
/// fixed-point loop.
pub fn normalize(ctx: &Context, holes: &HoleStore, t: &Term) -> Result<Term, EvalError> {
    eval(ctx, holes, t)
}

/// The extension-application pass: rewrites `App f x` whose inferred type
/// is an extension type into its boundary value when the current tope
/// context entails the boundary guard, recursing fix-point style across
/// the whole term.
pub fn eval_extension_apps(
    inferrer: &mut dyn TypeInferrer,
    ctx: &mut Context,
    t: &Term,
) -> KernelResult<Term> {
    match t {
        Term::App(f, x) => {
            let f2 = eval_extension_apps(inferrer, ctx, f)?;
            let x2 = eval_extension_apps(inferrer, ctx, x)?;
            if let Ok(f_ty) = inferrer.infer(ctx, &f2) {
                let f_ty_norm = eval(ctx, inferrer.holes(), &f_ty).unwrap_or(f_ty);
                if let Term::ExtensionType {
                    var,
                    boundary_tope,
                    boundary_term,
                    ..
                } = f_ty_norm
                {
                    let guard = boundary_tope.substitute(&var, &x2);
                    if tope::entails(ctx, inferrer.holes(), &guard) {
                        let value = boundary_term.substitute(&var, &x2);
                        return eval_extension_apps(inferrer, ctx, &value);
                    }
                }
            }
            Ok(Term::App(Box::new(f2), Box::new(x2)))
        }
        Term::Pair(a, b) => Ok(Term::Pair(
            Box::new(eval_extension_apps(inferrer, ctx, a)?),
            Box::new(eval_extension_apps(inferrer, ctx, b)?),
        )),
        Term::First(p) => Ok(Term::First(Box::new(eval_extension_apps(inferrer, ctx, p)?))),
        Term::Second(p) => Ok(Term::Second(Box::new(eval_extension_apps(inferrer, ctx, p)?))),
        Term::TypedTerm(a, b) => Ok(Term::TypedTerm(
            Box::new(eval_extension_apps(inferrer, ctx, a)?),
            Box::new(eval_extension_apps(inferrer, ctx, b)?),
        )),
        _ => Ok(t.clone()),
    }
}

/// `eval ∘ evalExtensionApps ∘ eval`.
pub fn eval_type(inferrer: &mut dyn TypeInferrer, ctx: &mut Context, t: &Term) -> KernelResult<Term> {
    let step1 = eval(ctx, inferrer.holes(), t).map_err(|e| (t.clone(), e))?;
    let step2 = eval_extension_apps(inferrer, ctx, &step1)?;
    let step3 = eval(ctx, inferrer.holes(), &step2).map_err(|e| (step2.clone(), e))?;
    Ok(step3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beta_reduces_applied_lambda() {
        let ctx = Context::new();
        let holes = HoleStore::new();
        let t = Term::App(
            Box::new(Term::lambda("x", Term::Universe, Term::Var("x".into()))),
            Box::new(Term::Cube),
        );
        assert_eq!(eval(&ctx, &holes, &t).unwrap(), Term::Cube);
    }

    #[test]
    fn projects_from_explicit_pair() {
        let ctx = Context::new();
        let holes = HoleStore::new();
        let p = Term::Pair(Box::new(Term::Cube), Box::new(Term::Cube2));
        assert_eq!(eval(&ctx, &holes, &Term::First(Box::new(p.clone()))).unwrap(), Term::Cube);
        assert_eq!(eval(&ctx, &holes, &Term::Second(Box::new(p))).unwrap(), Term::Cube2);
    }

    #[test]
    fn leaves_stuck_application_unchanged() {
        let ctx = Context::new();
        let holes = HoleStore::new();
        let t = Term::App(Box::new(Term::Var("f".into())), Box::new(Term::Var("x".into())));
        assert_eq!(eval(&ctx, &holes, &t).unwrap(), t);
    }

    #[test]
    fn idj_on_refl_reduces_to_base() {
        let ctx = Context::new();
        let holes = HoleStore::new();
        let t = Term::IdJ {
            a_type: Box::new(Term::Universe),
            a: Box::new(Term::Var("a".into())),
            motive: Box::new(Term::Var("motive".into())),
            base: Box::new(Term::Var("d".into())),
            x: Box::new(Term::Var("a".into())),
            path: Box::new(Term::Refl(None, Box::new(Term::Var("a".into())))),
        };
        assert_eq!(eval(&ctx, &holes, &t).unwrap(), Term::Var("d".into()));
    }

    #[test]
    fn unfolds_definitions_from_env() {
        let mut ctx = Context::new();
        let holes = HoleStore::new();
        ctx.add_definition("x".into(), Term::Universe, Term::Cube);
        assert_eq!(eval(&ctx, &holes, &Term::Var("x".into())).unwrap(), Term::Cube);
    }

    #[test]
    fn chases_solved_hole() {
        let ctx = Context::new();
        let mut holes = HoleStore::new();
        let h = holes.fresh_hole();
        holes.instantiate(&h, Term::Cube);
        assert_eq!(eval(&ctx, &holes, &Term::Hole(h)).unwrap(), Term::Cube);
    }

    #[test]
    fn application_at_an_entailed_boundary_reduces_to_the_boundary_value() {
        let mut ctx = Context::new();
        let mut checker = crate::type_checker::Checker::new();
        let ext_ty = Term::ExtensionType {
            var: "t".into(),
            cube: Box::new(Term::Cube2),
            tope: Box::new(Term::TopeTop),
            ty: Box::new(Term::Cube2),
            boundary_tope: Box::new(Term::TopeEQ(
                Box::new(Term::Var("t".into())),
                Box::new(Term::Cube2_0),
            )),
            boundary_term: Box::new(Term::Cube2_1),
        };
        let f = Term::TypedTerm(
            Box::new(Term::lambda("t", Term::Cube2, Term::Var("t".into()))),
            Box::new(ext_ty),
        );
        let app = Term::App(Box::new(f), Box::new(Term::Cube2_0));
        let result = eval_extension_apps(&mut checker, &mut ctx, &app).unwrap();
        assert_eq!(result, Term::Cube2_1);
    }

    #[test]
    fn application_away_from_the_boundary_is_left_stuck() {
        let mut ctx = Context::new();
        let mut checker = crate::type_checker::Checker::new();
        let ext_ty = Term::ExtensionType {
            var: "t".into(),
            cube: Box::new(Term::Cube2),
            tope: Box::new(Term::TopeTop),
            ty: Box::new(Term::Cube2),
            boundary_tope: Box::new(Term::TopeEQ(
                Box::new(Term::Var("t".into())),
                Box::new(Term::Cube2_0),
            )),
            boundary_term: Box::new(Term::Cube2_1),
        };
        let f = Term::TypedTerm(
            Box::new(Term::lambda("t", Term::Cube2, Term::Var("t".into()))),
            Box::new(ext_ty),
        );
        let app = Term::App(Box::new(f), Box::new(Term::Var("fresh".into())));
        let result = eval_extension_apps(&mut checker, &mut ctx, &app).unwrap();
        assert!(matches!(result, Term::App(..)));
    }
}
