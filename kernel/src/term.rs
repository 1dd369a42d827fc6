//! Term representation for a dependent type theory with cubes and topes.
//!
//! There is no distinction between terms, types, and proofs: everything is a
//! [`Term`]. Cubes and topes share the same syntactic category so that a
//! cube-indexed `Pi` and an ordinary one are the same constructor.

use std::collections::HashSet;
use std::fmt;

/// Identifiers for variables and holes share one namespace.
pub type Name = String;

/// Unified term representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// Local variable reference (bound by `Lambda`, `Pi`, `Sigma`, or an
    /// extension-type binder).
    Var(Name),
    /// Metavariable, solved or not, by the hole store.
    Hole(Name),
    /// The type of types.
    Universe,
    /// Explicit ascription `t : A`, used to guide inference upstream.
    TypedTerm(Box<Term>, Box<Term>),
    /// Dependent function former. The child is always a `Lambda` giving the
    /// parameter and (evaluated) body type.
    Pi(Box<Term>),
    /// Dependent pair former, same shape as `Pi`.
    Sigma(Box<Term>),
    /// Abstraction. `param_type` is optional for check-only lambdas;
    /// `guard` is `Some` only for cube-indexed binders, in which case
    /// `param_type` must be present (the cube being bound over).
    Lambda {
        param: Name,
        param_type: Option<Box<Term>>,
        guard: Option<Box<Term>>,
        body: Box<Term>,
    },
    /// Application `f a`.
    App(Box<Term>, Box<Term>),
    /// Pair introduction.
    Pair(Box<Term>, Box<Term>),
    /// First projection.
    First(Box<Term>),
    /// Second projection.
    Second(Box<Term>),
    /// Identity type `IdType A x y`.
    IdType(Box<Term>, Box<Term>, Box<Term>),
    /// Reflexivity. The type witness is optional on the surface but the
    /// elaborator always fills it in before this term is relied upon again.
    Refl(Option<Box<Term>>, Box<Term>),
    /// `J` eliminator for the identity type.
    IdJ {
        a_type: Box<Term>,
        a: Box<Term>,
        motive: Box<Term>,
        base: Box<Term>,
        x: Box<Term>,
        path: Box<Term>,
    },
    /// Universe of cubes.
    Cube,
    /// The unit cube `1`.
    CubeUnit,
    /// The single point of the unit cube.
    CubeUnitStar,
    /// Product of two cubes.
    CubeProd(Box<Term>, Box<Term>),
    /// The directed interval, with endpoints `Cube2_0`/`Cube2_1`.
    Cube2,
    Cube2_0,
    Cube2_1,
    /// Universe of topes (propositions over cube points).
    Tope,
    TopeTop,
    TopeBottom,
    TopeOr(Box<Term>, Box<Term>),
    TopeAnd(Box<Term>, Box<Term>),
    TopeEQ(Box<Term>, Box<Term>),
    TopeLEQ(Box<Term>, Box<Term>),
    /// Recursor out of the empty tope.
    RecBottom,
    /// Recursor over a tope disjunction, one branch per disjunct.
    RecOr {
        left_tope: Box<Term>,
        right_tope: Box<Term>,
        left: Box<Term>,
        right: Box<Term>,
    },
    /// Extension type `⟨{var : cube | tope} → ty [boundary_tope ↦ boundary_term]⟩`.
    ExtensionType {
        var: Name,
        cube: Box<Term>,
        tope: Box<Term>,
        ty: Box<Term>,
        boundary_tope: Box<Term>,
        boundary_term: Box<Term>,
    },
}

impl Term {
    /// Convenience constructor for a non-dependent, unguarded lambda.
    pub fn lambda(param: impl Into<Name>, param_type: Term, body: Term) -> Term {
        Term::Lambda {
            param: param.into(),
            param_type: Some(Box::new(param_type)),
            guard: None,
            body: Box::new(body),
        }
    }

    /// Free variables of `self`. Holes are not variables and are not
    /// included; they are tracked separately by the hole store.
    pub fn free_vars(&self) -> HashSet<Name> {
        let mut out = HashSet::new();
        self.collect_free_vars(&mut out);
        out
    }

    fn collect_free_vars(&self, out: &mut HashSet<Name>) {
        match self {
            Term::Var(x) => {
                out.insert(x.clone());
            }
            Term::Hole(_) | Term::Universe | Term::Cube | Term::CubeUnit | Term::CubeUnitStar
            | Term::Cube2 | Term::Cube2_0 | Term::Cube2_1 | Term::Tope | Term::TopeTop
            | Term::TopeBottom | Term::RecBottom => {}
            Term::TypedTerm(t, a) => {
                t.collect_free_vars(out);
                a.collect_free_vars(out);
            }
            Term::Pi(l) | Term::Sigma(l) => l.collect_free_vars(out),
            Term::Lambda {
                param,
                param_type,
                guard,
                body,
            } => {
                if let Some(a) = param_type {
                    a.collect_free_vars(out);
                }
                if let Some(g) = guard {
                    g.collect_free_vars(out);
                }
                let mut inner = HashSet::new();
                body.collect_free_vars(&mut inner);
                inner.remove(param);
                out.extend(inner);
            }
            Term::App(f, a) | Term::CubeProd(f, a) | Term::TopeOr(f, a) | Term::TopeAnd(f, a)
            | Term::TopeEQ(f, a) | Term::TopeLEQ(f, a) | Term::Pair(f, a) => {
                f.collect_free_vars(out);
                a.collect_free_vars(out);
            }
            Term::First(t) | Term::Second(t) => t.collect_free_vars(out),
            Term::IdType(a, x, y) => {
                a.collect_free_vars(out);
                x.collect_free_vars(out);
                y.collect_free_vars(out);
            }
            Term::Refl(a, x) => {
                if let Some(a) = a {
                    a.collect_free_vars(out);
                }
                x.collect_free_vars(out);
            }
            Term::IdJ {
                a_type,
                a,
                motive,
                base,
                x,
                path,
            } => {
                for t in [a_type, a, motive, base, x, path] {
                    t.collect_free_vars(out);
                }
            }
            Term::RecOr {
                left_tope,
                right_tope,
                left,
                right,
            } => {
                for t in [left_tope, right_tope, left, right] {
                    t.collect_free_vars(out);
                }
            }
            Term::ExtensionType {
                var,
                cube,
                tope,
                ty,
                boundary_tope,
                boundary_term,
            } => {
                cube.collect_free_vars(out);
                let mut inner = HashSet::new();
                tope.collect_free_vars(&mut inner);
                ty.collect_free_vars(&mut inner);
                boundary_tope.collect_free_vars(&mut inner);
                boundary_term.collect_free_vars(&mut inner);
                inner.remove(var);
                out.extend(inner);
            }
        }
    }

    /// Capture-avoiding substitution of `replacement` for free occurrences of
    /// `var` in `self`. Binders that would capture a free variable of
    /// `replacement` are refreshed first.
    pub fn substitute(&self, var: &str, replacement: &Term) -> Term {
        match self {
            Term::Var(x) => {
                if x == var {
                    replacement.clone()
                } else {
                    self.clone()
                }
            }
            Term::Hole(_) => self.clone(),
            Term::Universe
            | Term::Cube
            | Term::CubeUnit
            | Term::CubeUnitStar
            | Term::Cube2
            | Term::Cube2_0
            | Term::Cube2_1
            | Term::Tope
            | Term::TopeTop
            | Term::TopeBottom
            | Term::RecBottom => self.clone(),
            Term::TypedTerm(t, a) => Term::TypedTerm(
                Box::new(t.substitute(var, replacement)),
                Box::new(a.substitute(var, replacement)),
            ),
            Term::Pi(l) => Term::Pi(Box::new(l.substitute(var, replacement))),
            Term::Sigma(l) => Term::Sigma(Box::new(l.substitute(var, replacement))),
            Term::Lambda {
                param,
                param_type,
                guard,
                body,
            } => {
                if param == var {
                    return Term::Lambda {
                        param: param.clone(),
                        param_type: param_type
                            .as_ref()
                            .map(|a| Box::new(a.substitute(var, replacement))),
                        guard: guard
                            .as_ref()
                            .map(|g| Box::new(g.substitute(var, replacement))),
                        body: body.clone(),
                    };
                }
                let free_in_replacement = replacement.free_vars();
                let (param, body) = if free_in_replacement.contains(param) {
                    let fresh = refresh(param, &body.free_vars().union(&free_in_replacement).cloned().collect());
                    (fresh.clone(), Box::new(rename_var(param, &fresh, body)))
                } else {
                    (param.clone(), body.clone())
                };
                Term::Lambda {
                    param,
                    param_type: param_type
                        .as_ref()
                        .map(|a| Box::new(a.substitute(var, replacement))),
                    guard: guard
                        .as_ref()
                        .map(|g| Box::new(g.substitute(var, replacement))),
                    body: Box::new(body.substitute(var, replacement)),
                }
            }
            Term::App(f, a) => Term::App(
                Box::new(f.substitute(var, replacement)),
                Box::new(a.substitute(var, replacement)),
            ),
            Term::Pair(a, b) => Term::Pair(
                Box::new(a.substitute(var, replacement)),
                Box::new(b.substitute(var, replacement)),
            ),
            Term::First(t) => Term::First(Box::new(t.substitute(var, replacement))),
            Term::Second(t) => Term::Second(Box::new(t.substitute(var, replacement))),
            Term::IdType(a, x, y) => Term::IdType(
                Box::new(a.substitute(var, replacement)),
                Box::new(x.substitute(var, replacement)),
                Box::new(y.substitute(var, replacement)),
            ),
            Term::Refl(a, x) => Term::Refl(
                a.as_ref().map(|a| Box::new(a.substitute(var, replacement))),
                Box::new(x.substitute(var, replacement)),
            ),
            Term::IdJ {
                a_type,
                a,
                motive,
                base,
                x,
                path,
            } => Term::IdJ {
                a_type: Box::new(a_type.substitute(var, replacement)),
                a: Box::new(a.substitute(var, replacement)),
                motive: Box::new(motive.substitute(var, replacement)),
                base: Box::new(base.substitute(var, replacement)),
                x: Box::new(x.substitute(var, replacement)),
                path: Box::new(path.substitute(var, replacement)),
            },
            Term::CubeProd(a, b) => Term::CubeProd(
                Box::new(a.substitute(var, replacement)),
                Box::new(b.substitute(var, replacement)),
            ),
            Term::TopeOr(a, b) => Term::TopeOr(
                Box::new(a.substitute(var, replacement)),
                Box::new(b.substitute(var, replacement)),
            ),
            Term::TopeAnd(a, b) => Term::TopeAnd(
                Box::new(a.substitute(var, replacement)),
                Box::new(b.substitute(var, replacement)),
            ),
            Term::TopeEQ(a, b) => Term::TopeEQ(
                Box::new(a.substitute(var, replacement)),
                Box::new(b.substitute(var, replacement)),
            ),
            Term::TopeLEQ(a, b) => Term::TopeLEQ(
                Box::new(a.substitute(var, replacement)),
                Box::new(b.substitute(var, replacement)),
            ),
            Term::RecOr {
                left_tope,
                right_tope,
                left,
                right,
            } => Term::RecOr {
                left_tope: Box::new(left_tope.substitute(var, replacement)),
                right_tope: Box::new(right_tope.substitute(var, replacement)),
                left: Box::new(left.substitute(var, replacement)),
                right: Box::new(right.substitute(var, replacement)),
            },
            Term::ExtensionType {
                var: bound,
                cube,
                tope,
                ty,
                boundary_tope,
                boundary_term,
            } => {
                let cube = Box::new(cube.substitute(var, replacement));
                if bound == var {
                    return Term::ExtensionType {
                        var: bound.clone(),
                        cube,
                        tope: tope.clone(),
                        ty: ty.clone(),
                        boundary_tope: boundary_tope.clone(),
                        boundary_term: boundary_term.clone(),
                    };
                }
                let free_in_replacement = replacement.free_vars();
                let (bound, tope, ty, boundary_tope, boundary_term) =
                    if free_in_replacement.contains(bound) {
                        let mut used = free_in_replacement.clone();
                        used.extend(tope.free_vars());
                        used.extend(ty.free_vars());
                        used.extend(boundary_tope.free_vars());
                        used.extend(boundary_term.free_vars());
                        let fresh = refresh(bound, &used);
                        (
                            fresh.clone(),
                            Box::new(rename_var(bound, &fresh, tope)),
                            Box::new(rename_var(bound, &fresh, ty)),
                            Box::new(rename_var(bound, &fresh, boundary_tope)),
                            Box::new(rename_var(bound, &fresh, boundary_term)),
                        )
                    } else {
                        (
                            bound.clone(),
                            tope.clone(),
                            ty.clone(),
                            boundary_tope.clone(),
                            boundary_term.clone(),
                        )
                    };
                Term::ExtensionType {
                    var: bound,
                    cube,
                    tope: Box::new(tope.substitute(var, replacement)),
                    ty: Box::new(ty.substitute(var, replacement)),
                    boundary_tope: Box::new(boundary_tope.substitute(var, replacement)),
                    boundary_term: Box::new(boundary_term.substitute(var, replacement)),
                }
            }
        }
    }
}

/// Replace free occurrences of `x` by `y` in `t`, refreshing any binder in
/// `t` that would otherwise capture `y`.
pub fn rename_var(x: &str, y: &str, t: &Term) -> Term {
    t.substitute(x, &Term::Var(y.to_string()))
}

/// Produce a name disjoint from `used`, deterministically, by appending
/// primes to `base` until the result is fresh.
pub fn refresh(base: &str, used: &HashSet<Name>) -> Name {
    if !used.contains(base) {
        return base.to_string();
    }
    let mut candidate = format!("{}'", base);
    while used.contains(&candidate) {
        candidate.push('\'');
    }
    candidate
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(x) => write!(f, "{}", x),
            Term::Hole(h) => write!(f, "?{}", h),
            Term::Universe => write!(f, "U"),
            Term::TypedTerm(t, a) => write!(f, "({} : {})", t, a),
            Term::Pi(l) => match l.as_ref() {
                Term::Lambda {
                    param,
                    param_type,
                    guard: None,
                    body,
                } if param == "_" => {
                    write!(f, "{} -> {}", fmt_opt(param_type), body)
                }
                Term::Lambda {
                    param,
                    param_type,
                    guard,
                    body,
                } => {
                    write!(f, "({} : {}", param, fmt_opt(param_type))?;
                    if let Some(g) = guard {
                        write!(f, " | {}", g)?;
                    }
                    write!(f, ") -> {}", body)
                }
                other => write!(f, "Pi {}", other),
            },
            Term::Sigma(l) => match l.as_ref() {
                Term::Lambda {
                    param,
                    param_type,
                    body,
                    ..
                } => write!(f, "Σ({} : {}). {}", param, fmt_opt(param_type), body),
                other => write!(f, "Sigma {}", other),
            },
            Term::Lambda {
                param,
                param_type,
                guard,
                body,
            } => {
                write!(f, "λ{}", param)?;
                if let Some(a) = param_type {
                    write!(f, ":{}", a)?;
                }
                if let Some(g) = guard {
                    write!(f, "|{}", g)?;
                }
                write!(f, ". {}", body)
            }
            Term::App(func, arg) => write!(f, "({} {})", func, arg),
            Term::Pair(a, b) => write!(f, "({}, {})", a, b),
            Term::First(t) => write!(f, "fst {}", t),
            Term::Second(t) => write!(f, "snd {}", t),
            Term::IdType(a, x, y) => write!(f, "{} =_{{{}}} {}", x, a, y),
            Term::Refl(a, x) => match a {
                Some(a) => write!(f, "refl_{{{}}} {}", a, x),
                None => write!(f, "refl {}", x),
            },
            Term::IdJ {
                a_type,
                a,
                motive,
                base,
                x,
                path,
            } => write!(
                f,
                "J({}, {}, {}, {}, {}, {})",
                a_type, a, motive, base, x, path
            ),
            Term::Cube => write!(f, "CUBE"),
            Term::CubeUnit => write!(f, "1"),
            Term::CubeUnitStar => write!(f, "*"),
            Term::CubeProd(a, b) => write!(f, "({} * {})", a, b),
            Term::Cube2 => write!(f, "2"),
            Term::Cube2_0 => write!(f, "0"),
            Term::Cube2_1 => write!(f, "1"),
            Term::Tope => write!(f, "TOPE"),
            Term::TopeTop => write!(f, "⊤"),
            Term::TopeBottom => write!(f, "⊥"),
            Term::TopeOr(a, b) => write!(f, "({} ∨ {})", a, b),
            Term::TopeAnd(a, b) => write!(f, "({} ∧ {})", a, b),
            Term::TopeEQ(a, b) => write!(f, "({} = {})", a, b),
            Term::TopeLEQ(a, b) => write!(f, "({} ≤ {})", a, b),
            Term::RecBottom => write!(f, "recBOT"),
            Term::RecOr {
                left_tope,
                right_tope,
                left,
                right,
            } => write!(
                f,
                "recOR({}, {}, {}, {})",
                left_tope, right_tope, left, right
            ),
            Term::ExtensionType {
                var,
                cube,
                tope,
                ty,
                boundary_tope,
                boundary_term,
            } => write!(
                f,
                "⟨{{{} : {} | {}}} -> {} [{} ↦ {}]⟩",
                var, cube, tope, ty, boundary_tope, boundary_term
            ),
        }
    }
}

fn fmt_opt(t: &Option<Box<Term>>) -> String {
    match t {
        Some(t) => format!("{}", t),
        None => "_".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitute_replaces_free_var() {
        let t = Term::App(Box::new(Term::Var("x".into())), Box::new(Term::Universe));
        let result = t.substitute("x", &Term::Var("y".into()));
        assert_eq!(
            result,
            Term::App(Box::new(Term::Var("y".into())), Box::new(Term::Universe))
        );
    }

    #[test]
    fn substitute_stops_at_shadowing_binder() {
        let body = Term::lambda("x", Term::Universe, Term::Var("x".into()));
        let result = body.substitute("x", &Term::Var("y".into()));
        // the bound `x` is untouched
        assert_eq!(result, body);
    }

    #[test]
    fn substitute_avoids_capture() {
        // (\y. x) [x := y] must not let the free `y` in the replacement be
        // captured by the binder; the binder is refreshed instead.
        let body = Term::lambda("y", Term::Universe, Term::Var("x".into()));
        let result = body.substitute("x", &Term::Var("y".into()));
        match result {
            Term::Lambda { param, body, .. } => {
                assert_ne!(param, "y");
                assert_eq!(*body, Term::Var("y".into()));
            }
            _ => panic!("expected lambda"),
        }
    }

    #[test]
    fn refresh_is_deterministic() {
        let mut used = HashSet::new();
        used.insert("x".to_string());
        assert_eq!(refresh("x", &used), "x'");
        used.insert("x'".to_string());
        assert_eq!(refresh("x", &used), "x''");
    }

    #[test]
    fn free_vars_excludes_bound_name() {
        let t = Term::lambda("x", Term::Universe, Term::Var("x".into()));
        assert!(t.free_vars().is_empty());
    }
}
