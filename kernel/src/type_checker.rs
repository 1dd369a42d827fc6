//! Bidirectional type checker.
//!
//! Two mutually recursive entry points: [`Checker::infer`] synthesizes and
//! returns a term's type; [`Checker::check`] refines holes and raises
//! errors so that a term can be judged to have a given type. Both thread
//! the same [`Context`] and own the [`HoleStore`] the unifier and tope
//! engine consult through the [`TypeInferrer`] trait.

use crate::context::{Context, HoleStore};
use crate::error::{KernelError, KernelResult};
use crate::eval::{eval, eval_type, TypeInferrer};
use crate::term::Term;
use crate::tope;
use crate::unify::unify;

/// Owns the hole store and drives `infer`/`check`; implements
/// [`TypeInferrer`] so the evaluator can ask it for a sub-term's type.
#[derive(Debug, Default)]
pub struct Checker {
    holes: HoleStore,
}

impl Checker {
    pub fn new() -> Self {
        Checker::default()
    }

    pub fn holes(&self) -> &HoleStore {
        &self.holes
    }

    fn eval_type(&mut self, ctx: &mut Context, t: &Term) -> KernelResult<Term> {
        eval_type(self, ctx, t)
    }

    fn unify(&mut self, ctx: &mut Context, a: &Term, b: &Term) -> KernelResult<()> {
        unify(self, ctx, a, b)
    }

    fn ensure_tope_context(&mut self, term: &Term, phi: &Term, ctx: &mut Context) -> KernelResult<()> {
        if tope::entails(ctx, &self.holes, phi) {
            Ok(())
        } else {
            Err(KernelError::TopeContextNotSatisfied {
                term: term.clone(),
                tope: phi.clone(),
                context_topes: ctx.topes().to_vec(),
            })
        }
    }

    /// Synthesize the type of `term`, evaluated before being returned.
    pub fn infer(&mut self, ctx: &mut Context, term: &Term) -> KernelResult<Term> {
        match term {
            Term::Var(x) => match ctx.lookup_type(x).cloned() {
                Some(a) => Ok(a),
                None => {
                    let h = self.holes.fresh_hole();
                    let hole_ty = Term::Hole(h);
                    ctx.set_type(x.clone(), hole_ty.clone());
                    Ok(hole_ty)
                }
            },

            Term::Hole(h) => {
                if let Some(solved) = self.holes.lookup(h).cloned() {
                    self.infer(ctx, &solved)
                } else {
                    let fresh = self.holes.fresh_hole();
                    Ok(Term::Hole(fresh))
                }
            }

            Term::TypedTerm(t, a) => {
                self.check(ctx, t, a)?;
                self.eval_type(ctx, a)
            }

            Term::Pi(l) | Term::Sigma(l) => {
                self.infer_type_family(ctx, l)?;
                Ok(Term::Universe)
            }

            Term::Lambda { .. } => Err(KernelError::CannotInferLambda(term.clone())),

            Term::App(f, a) => {
                let f_ty = self.infer(ctx, f)?;
                let f_ty_norm = eval(ctx, &self.holes, &f_ty).map_err(|e| (term.clone(), e))?;
                match f_ty_norm {
                    Term::Pi(l) => match *l {
                        Term::Lambda { param, param_type: Some(a_ty), guard: None, body } => {
                            self.check(ctx, a, &a_ty)?;
                            self.eval_type(ctx, &body.substitute(&param, a))
                        }
                        Term::Lambda { param, param_type: Some(i_ty), guard: Some(phi), body } => {
                            self.check(ctx, a, &i_ty)?;
                            let guard = phi.substitute(&param, a);
                            self.ensure_tope_context(term, &guard, ctx)?;
                            self.eval_type(ctx, &body.substitute(&param, a))
                        }
                        other => Err(KernelError::NotAFunction {
                            func: (**f).clone(),
                            func_type: Term::Pi(Box::new(other)),
                            arg: (**a).clone(),
                        }),
                    },
                    Term::ExtensionType { var, cube, tope: psi, ty, .. } => {
                        self.check(ctx, a, &cube)?;
                        let guard = psi.substitute(&var, a);
                        self.ensure_tope_context(term, &guard, ctx)?;
                        self.eval_type(ctx, &ty.substitute(&var, a))
                    }
                    other => Err(KernelError::NotAFunction {
                        func: (**f).clone(),
                        func_type: other,
                        arg: (**a).clone(),
                    }),
                }
            }

            Term::Pair(f, s) => {
                let i = self.infer(ctx, f)?;
                let j = self.infer(ctx, s)?;
                let i_ty = self.infer(ctx, &i)?;
                let j_ty = self.infer(ctx, &j)?;
                let i_is_cube = eval(ctx, &self.holes, &i_ty).map(|t| t == Term::Cube).unwrap_or(false);
                let j_is_cube = eval(ctx, &self.holes, &j_ty).map(|t| t == Term::Cube).unwrap_or(false);
                if i_is_cube && j_is_cube {
                    Ok(Term::CubeProd(Box::new(i), Box::new(j)))
                } else {
                    Err(KernelError::CannotInferPair(term.clone()))
                }
            }

            Term::First(p) => {
                let p_ty = self.infer(ctx, p)?;
                match eval(ctx, &self.holes, &p_ty).map_err(|e| (term.clone(), e))? {
                    Term::Sigma(l) => match *l {
                        Term::Lambda { param_type: Some(a), .. } => self.eval_type(ctx, &a),
                        _ => Err(KernelError::InvalidTypeFamily((**p).clone())),
                    },
                    Term::CubeProd(a, _) => self.eval_type(ctx, &a),
                    other => Err(KernelError::NotAPair { term: (**p).clone(), term_type: other, projection: "first" }),
                }
            }

            Term::Second(p) => {
                let p_ty = self.infer(ctx, p)?;
                match eval(ctx, &self.holes, &p_ty).map_err(|e| (term.clone(), e))? {
                    Term::Sigma(l) => match *l {
                        Term::Lambda { param, body, .. } => {
                            self.eval_type(ctx, &body.substitute(&param, &Term::First(p.clone())))
                        }
                        _ => Err(KernelError::InvalidTypeFamily((**p).clone())),
                    },
                    Term::CubeProd(_, b) => self.eval_type(ctx, &b),
                    other => Err(KernelError::NotAPair { term: (**p).clone(), term_type: other, projection: "second" }),
                }
            }

            Term::IdType(a, x, y) => {
                self.check(ctx, a, &Term::Universe)?;
                self.check(ctx, x, a)?;
                self.check(ctx, y, a)?;
                Ok(Term::Universe)
            }

            Term::Refl(a, x) => {
                let a_ty = match a {
                    Some(a) => {
                        self.check(ctx, a, &Term::Universe)?;
                        self.check(ctx, x, a)?;
                        (**a).clone()
                    }
                    None => self.infer(ctx, x)?,
                };
                self.eval_type(ctx, &Term::IdType(Box::new(a_ty), x.clone(), x.clone()))
            }

            Term::IdJ { a_type, a, motive, base, x, path } => {
                self.check(ctx, a_type, &Term::Universe)?;
                self.check(ctx, a, a_type)?;
                self.check(ctx, x, a_type)?;
                self.check(ctx, path, &Term::IdType(a_type.clone(), a.clone(), x.clone()))?;

                let mut fresh_names = motive.free_vars();
                fresh_names.extend(a_type.free_vars());
                let fx = ctx.fresh_var("x", &fresh_names);
                fresh_names.insert(fx.clone());
                let fp = ctx.fresh_var("p", &fresh_names);

                let motive_ty = Term::Pi(Box::new(Term::lambda(
                    &fx,
                    (**a_type).clone(),
                    Term::Pi(Box::new(Term::lambda(
                        &fp,
                        Term::IdType(a_type.clone(), a.clone(), Box::new(Term::Var(fx.clone()))),
                        Term::Universe,
                    ))),
                )));
                self.check(ctx, motive, &motive_ty)?;

                let base_expected = self.eval_type(
                    ctx,
                    &Term::App(
                        Box::new(Term::App(motive.clone(), a.clone())),
                        Box::new(Term::Refl(Some(a_type.clone()), a.clone())),
                    ),
                )?;
                self.check(ctx, base, &base_expected)?;

                self.eval_type(ctx, &Term::App(Box::new(Term::App(motive.clone(), x.clone())), path.clone()))
            }

            Term::Cube | Term::Tope => Ok(Term::Universe),
            Term::CubeUnit | Term::Cube2 => Ok(Term::Cube),
            Term::CubeUnitStar => Ok(Term::CubeUnit),
            Term::Cube2_0 | Term::Cube2_1 => Ok(Term::Cube2),
            Term::TopeTop | Term::TopeBottom => Ok(Term::Tope),

            Term::CubeProd(i, j) => {
                self.check(ctx, i, &Term::Cube)?;
                self.check(ctx, j, &Term::Cube)?;
                Ok(Term::Cube)
            }

            Term::TopeOr(a, b) | Term::TopeAnd(a, b) => {
                self.check(ctx, a, &Term::Tope)?;
                self.check(ctx, b, &Term::Tope)?;
                Ok(Term::Tope)
            }
            Term::TopeEQ(a, b) | Term::TopeLEQ(a, b) => {
                self.check(ctx, a, &Term::Cube2)?;
                self.check(ctx, b, &Term::Cube2)?;
                Ok(Term::Tope)
            }

            Term::RecBottom => {
                self.ensure_tope_context(term, &Term::TopeBottom, ctx)?;
                let h = self.holes.fresh_hole();
                Ok(Term::Hole(h))
            }

            Term::RecOr { left_tope, right_tope, left, right } => {
                self.ensure_tope_context(
                    term,
                    &Term::TopeOr(left_tope.clone(), right_tope.clone()),
                    ctx,
                )?;
                let left_ty = ctx.local_constraint((**left_tope).clone(), |ctx| self.infer(ctx, left))?;
                let right_ty = ctx.local_constraint((**right_tope).clone(), |ctx| self.infer(ctx, right))?;
                ctx.local_constraint(Term::TopeAnd(left_tope.clone(), right_tope.clone()), |ctx| {
                    self.unify(ctx, &left_ty, &right_ty)
                })?;
                Ok(Term::RecOr {
                    left_tope: left_tope.clone(),
                    right_tope: right_tope.clone(),
                    left: Box::new(left_ty),
                    right: Box::new(right_ty),
                })
            }

            Term::ExtensionType { var, cube, tope: psi, ty, boundary_tope, boundary_term } => {
                self.check(ctx, cube, &Term::Cube)?;
                ctx.local_typing(var, Some((**cube).clone()), |ctx| -> KernelResult<()> {
                    self.check(ctx, psi, &Term::Tope)?;
                    ctx.local_constraint((**psi).clone(), |ctx| self.check(ctx, ty, &Term::Universe))?;
                    ctx.local_constraint((**psi).clone(), |ctx| self.check(ctx, boundary_tope, &Term::Tope))?;
                    ctx.local_constraint((**boundary_tope).clone(), |ctx| self.check(ctx, boundary_term, ty))
                })?;
                Ok(Term::Universe)
            }
        }
    }

    /// Check that `term` has type `expected`.
    pub fn check(&mut self, ctx: &mut Context, term: &Term, expected: &Term) -> KernelResult<()> {
        let expected_norm = eval(ctx, &self.holes, expected).map_err(|e| (term.clone(), e))?;
        match (term, &expected_norm) {
            (
                Term::Lambda { param: x, param_type: a, guard: psi_prime, body: m },
                Term::ExtensionType { var: t, cube: i, tope: psi, ty: a_ty, boundary_tope: phi, boundary_term: a_val },
            ) => {
                if let Some(a) = a {
                    self.check(ctx, a, &Term::Cube)?;
                    self.unify(ctx, a, i)?;
                }
                ctx.local_typing(x, Some((**i).clone()), |ctx| -> KernelResult<()> {
                    let psi_renamed = crate::term::rename_var(t, x, psi);
                    match psi_prime {
                        Some(p) => {
                            if !tope::ensure_eq_tope(ctx, &self.holes, p, &psi_renamed) {
                                return Err(KernelError::Unexpected {
                                    term: term.clone(),
                                    inferred_full: (**p).clone(),
                                    expected_full: psi_renamed.clone(),
                                    inferred: (**p).clone(),
                                    expected: psi_renamed.clone(),
                                });
                            }
                        }
                        None => {
                            if !tope::entails(ctx, &self.holes, &psi_renamed) {
                                return Err(KernelError::TopeContextNotSatisfied {
                                    term: term.clone(),
                                    tope: psi_renamed.clone(),
                                    context_topes: ctx.topes().to_vec(),
                                });
                            }
                        }
                    }
                    ctx.local_constraint(psi_renamed.clone(), |ctx| {
                        let a_ty_renamed = crate::term::rename_var(t, x, a_ty);
                        self.check(ctx, m, &a_ty_renamed)
                    })?;
                    let phi_renamed = crate::term::rename_var(t, x, phi);
                    ctx.local_constraint(phi_renamed, |ctx| {
                        let a_val_renamed = crate::term::rename_var(t, x, a_val);
                        let m_val = eval(ctx, &self.holes, m).map_err(|e| (term.clone(), e))?;
                        self.unify(ctx, &m_val, &a_val_renamed)
                    })
                })
            }

            (
                Term::Lambda { param: x, param_type: a, guard: None, body: m },
                Term::Pi(l),
            ) => match l.as_ref() {
                Term::Lambda { param: y, param_type: Some(b), guard: None, body: n } => {
                    if let Some(a) = a {
                        self.unify(ctx, a, b)?;
                    }
                    ctx.local_typing(x, Some((**b).clone()), |ctx| {
                        let n_renamed = crate::term::rename_var(y, x, n);
                        self.check(ctx, m, &n_renamed)
                    })
                }
                other => Err(KernelError::ExpectedFunctionType {
                    term: term.clone(),
                    expected: Term::Pi(Box::new(other.clone())),
                }),
            },

            (
                Term::Lambda { param: x, param_type: a, guard: Some(phi), body: m },
                Term::Pi(l),
            ) => match l.as_ref() {
                Term::Lambda { param: y, param_type: Some(b), guard: Some(psi), body: n } => {
                    if let Some(a) = a {
                        self.unify(ctx, a, b)?;
                    }
                    ctx.local_typing(x, Some((**b).clone()), |ctx| -> KernelResult<()> {
                        let psi_renamed = crate::term::rename_var(y, x, psi);
                        if !tope::ensure_eq_tope(ctx, &self.holes, phi, &psi_renamed) {
                            return Err(KernelError::Unexpected {
                                term: term.clone(),
                                inferred_full: (**phi).clone(),
                                expected_full: psi_renamed.clone(),
                                inferred: (**phi).clone(),
                                expected: psi_renamed,
                            });
                        }
                        let n_renamed = crate::term::rename_var(y, x, n);
                        ctx.local_constraint((**phi).clone(), |ctx| self.check(ctx, m, &n_renamed))
                    })
                }
                other => Err(KernelError::ExpectedFunctionType {
                    term: term.clone(),
                    expected: Term::Pi(Box::new(other.clone())),
                }),
            },

            (Term::Pair(f, s), Term::Sigma(l)) => match l.as_ref() {
                Term::Lambda { param, param_type: Some(a), body: b, .. } => {
                    self.check(ctx, f, a)?;
                    let b_applied = b.substitute(param, f);
                    self.check(ctx, s, &b_applied)
                }
                other => Err(KernelError::ExpectedFunctionType {
                    term: term.clone(),
                    expected: Term::Sigma(Box::new(other.clone())),
                }),
            },

            (Term::Var(x), a) => match ctx.lookup_type(x).cloned() {
                Some(recorded) => self.unify(ctx, &recorded, a),
                None => {
                    ctx.set_type(x.clone(), a.clone());
                    Ok(())
                }
            },

            (Term::Hole(h), a) => {
                if let Some(solved) = self.holes.lookup(h).cloned() {
                    self.unify(ctx, &solved, a)
                } else {
                    self.holes.instantiate(h, a.clone());
                    Ok(())
                }
            }

            _ => {
                let inferred = self.infer(ctx, term)?;
                self.unify(ctx, &inferred, &expected_norm)
            }
        }
    }

    /// Check that `lambda` is a well-formed type family (the body of a
    /// `Pi`/`Sigma`), returning nothing on success.
    fn infer_type_family(&mut self, ctx: &mut Context, lambda: &Term) -> KernelResult<()> {
        match lambda {
            Term::Lambda { param, param_type: Some(a), guard: None, body } => {
                self.check(ctx, a, &Term::Universe)?;
                ctx.local_typing(param, Some((**a).clone()), |ctx| self.check(ctx, body, &Term::Universe))
            }
            Term::Lambda { param, param_type: Some(i), guard: Some(phi), body } => {
                self.check(ctx, i, &Term::Cube)?;
                ctx.local_typing(param, Some((**i).clone()), |ctx| -> KernelResult<()> {
                    self.check(ctx, phi, &Term::Tope)?;
                    ctx.local_constraint((**phi).clone(), |ctx| self.check(ctx, body, &Term::Universe))
                })
            }
            other => Err(KernelError::InvalidTypeFamily(other.clone())),
        }
    }
}

impl TypeInferrer for Checker {
    fn infer(&mut self, ctx: &mut Context, t: &Term) -> KernelResult<Term> {
        Checker::infer(self, ctx, t)
    }

    fn holes(&mut self) -> &mut HoleStore {
        &mut self.holes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_universe_for_cube() {
        let mut checker = Checker::new();
        let mut ctx = Context::new();
        assert_eq!(checker.infer(&mut ctx, &Term::Cube).unwrap(), Term::Universe);
    }

    #[test]
    fn infers_cube_for_cube2() {
        let mut checker = Checker::new();
        let mut ctx = Context::new();
        assert_eq!(checker.infer(&mut ctx, &Term::Cube2).unwrap(), Term::Cube);
    }

    #[test]
    fn checks_identity_lambda_against_pi() {
        let mut checker = Checker::new();
        let mut ctx = Context::new();
        let identity = Term::lambda("x", Term::Cube, Term::Var("x".into()));
        let ty = Term::Pi(Box::new(Term::lambda("x", Term::Cube, Term::Cube)));
        assert!(checker.check(&mut ctx, &identity, &ty).is_ok());
    }

    #[test]
    fn rejects_lambda_against_non_function_type() {
        let mut checker = Checker::new();
        let mut ctx = Context::new();
        let identity = Term::lambda("x", Term::Cube, Term::Var("x".into()));
        assert!(checker.check(&mut ctx, &identity, &Term::Cube).is_err());
    }

    #[test]
    fn infers_application_through_pi() {
        let mut checker = Checker::new();
        let mut ctx = Context::new();
        ctx.set_type("f".into(), Term::Pi(Box::new(Term::lambda("x", Term::Cube, Term::Cube))));
        ctx.set_type("a".into(), Term::Cube);
        let app = Term::App(Box::new(Term::Var("f".into())), Box::new(Term::Var("a".into())));
        assert_eq!(checker.infer(&mut ctx, &app).unwrap(), Term::Cube);
    }

    #[test]
    fn rec_bottom_requires_bottom_in_context() {
        let mut checker = Checker::new();
        let mut ctx = Context::new();
        assert!(checker.infer(&mut ctx, &Term::RecBottom).is_err());
        ctx.local_constraint(Term::TopeBottom, |ctx| {
            assert!(checker.infer(ctx, &Term::RecBottom).is_ok());
        });
    }

    #[test]
    fn unbound_var_allocates_a_hole_as_its_type() {
        let mut checker = Checker::new();
        let mut ctx = Context::new();
        let ty = checker.infer(&mut ctx, &Term::Var("mystery".into())).unwrap();
        assert!(matches!(ty, Term::Hole(_)));
        assert_eq!(ctx.lookup_type("mystery"), Some(&ty));
    }

    fn guarded_pi(param_type: Term, guard: Term, body_type: Term) -> Term {
        Term::Pi(Box::new(Term::Lambda {
            param: "t".into(),
            param_type: Some(Box::new(param_type)),
            guard: Some(Box::new(guard)),
            body: Box::new(body_type),
        }))
    }

    #[test]
    fn checks_a_guarded_lambda_with_a_matching_annotation() {
        let mut checker = Checker::new();
        let mut ctx = Context::new();
        let ty = guarded_pi(Term::Cube2, Term::TopeTop, Term::Cube2);
        let lambda = Term::Lambda {
            param: "t".into(),
            param_type: Some(Box::new(Term::Cube2)),
            guard: Some(Box::new(Term::TopeTop)),
            body: Box::new(Term::Var("t".into())),
        };
        assert!(checker.check(&mut ctx, &lambda, &ty).is_ok());
    }

    #[test]
    fn rejects_a_guarded_lambda_whose_annotation_disagrees_with_the_domain() {
        let mut checker = Checker::new();
        let mut ctx = Context::new();
        let ty = guarded_pi(Term::Cube2, Term::TopeTop, Term::Cube2);
        let lambda = Term::Lambda {
            param: "t".into(),
            param_type: Some(Box::new(Term::CubeUnit)),
            guard: Some(Box::new(Term::TopeTop)),
            body: Box::new(Term::CubeUnitStar),
        };
        assert!(checker.check(&mut ctx, &lambda, &ty).is_err());
    }
}
