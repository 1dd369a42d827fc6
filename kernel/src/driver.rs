//! The module driver: type-checks a sequence of declarations in source
//! order, threading the accumulated context, and supports skipping a
//! file whose declarations are unchanged from a prior run.
//!
//! Logging here (via the `log` facade) is the one place in the kernel
//! that reaches outside pure checking logic: it records which
//! declaration is about to be checked and how many were admitted, for a
//! caller (the CLI) to surface as progress, not as part of the returned
//! result.

use crate::context::Context;
use crate::error::KernelError;
use crate::term::Term;
use crate::type_checker::Checker;
use log::{debug, info};
use std::fmt;

/// One top-level declaration: `name : type := body`.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub ty: Term,
    pub body: Term,
}

/// A type error located at the declaration that produced it.
#[derive(Debug, Clone)]
pub struct DriverError {
    pub declaration: String,
    pub error: KernelError,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in declaration `{}`: {}", self.declaration, self.error)
    }
}

impl std::error::Error for DriverError {}

/// Check every declaration in `decls` against `ctx` in order, recording
/// each one's type and value as it succeeds. Stops and returns the first
/// failure, located at the declaration that produced it.
pub fn check_module(checker: &mut Checker, ctx: &mut Context, decls: &[Declaration]) -> Result<(), DriverError> {
    for decl in decls {
        debug!("checking declaration `{}`", decl.name);
        let evaluated_ty = crate::eval::eval_type(checker, ctx, &decl.ty).map_err(|e| DriverError {
            declaration: decl.name.clone(),
            error: e,
        })?;
        checker
            .check(ctx, &decl.body, &evaluated_ty)
            .map_err(|e| DriverError { declaration: decl.name.clone(), error: e })?;
        ctx.add_definition(decl.name.clone(), evaluated_ty, decl.body.clone());
    }
    info!("Everything is ok! ({} declarations admitted)", decls.len());
    Ok(())
}

/// Per-file incremental re-check cache: a file whose declarations are
/// unchanged from a previous run is skipped rather than rechecked.
///
/// Two cache entries are considered equivalent whenever their
/// declaration lists compare equal by `PartialEq` — this assumes term
/// equality implies the re-derived context effects (hole allocation,
/// tope saturation) would be identical too, which holds as long as
/// declarations never consult anything outside their own syntax (no
/// ambient randomness, no wall-clock). That assumption is not checked
/// here; it is the caller's responsibility not to violate it.
#[derive(Debug, Clone, Default)]
pub struct Cache {
    by_file: std::collections::HashMap<String, Vec<Declaration>>,
}

impl Cache {
    pub fn new() -> Self {
        Cache::default()
    }

    /// Check `decls` for `file`, skipping the work entirely if it
    /// matches what's cached for that path.
    pub fn check_file(
        &mut self,
        checker: &mut Checker,
        ctx: &mut Context,
        file: &str,
        decls: Vec<Declaration>,
    ) -> Result<(), DriverError> {
        if self.by_file.get(file) == Some(&decls) {
            debug!("skipping unchanged file {}", file);
            for decl in &decls {
                ctx.add_definition(decl.name.clone(), decl.ty.clone(), decl.body.clone());
            }
            return Ok(());
        }
        check_module(checker, ctx, &decls)?;
        self.by_file.insert(file.to_string(), decls);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_a_simple_declaration() {
        let mut checker = Checker::new();
        let mut ctx = Context::new();
        let decls = vec![Declaration {
            name: "idCube".into(),
            ty: Term::Pi(Box::new(Term::lambda("x", Term::Cube, Term::Cube))),
            body: Term::lambda("x", Term::Cube, Term::Var("x".into())),
        }];
        assert!(check_module(&mut checker, &mut ctx, &decls).is_ok());
        assert!(ctx.lookup_type("idCube").is_some());
    }

    /// Exercises `check_module` with a real logger installed, so the
    /// `debug!`/`info!` calls above run against an actual implementation
    /// rather than the default no-op one `log` falls back to.
    #[test]
    fn runs_under_an_installed_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut checker = Checker::new();
        let mut ctx = Context::new();
        let decls = vec![Declaration {
            name: "unitPoint".into(),
            ty: Term::CubeUnit,
            body: Term::CubeUnitStar,
        }];
        assert!(check_module(&mut checker, &mut ctx, &decls).is_ok());
    }

    #[test]
    fn reports_the_failing_declaration_by_name() {
        let mut checker = Checker::new();
        let mut ctx = Context::new();
        let decls = vec![Declaration {
            name: "bad".into(),
            ty: Term::Cube,
            body: Term::Tope,
        }];
        let err = check_module(&mut checker, &mut ctx, &decls).unwrap_err();
        assert_eq!(err.declaration, "bad");
    }

    #[test]
    fn cache_skips_unchanged_file() {
        let mut checker = Checker::new();
        let mut ctx = Context::new();
        let mut cache = Cache::new();
        let decls = vec![Declaration {
            name: "unitPoint".into(),
            ty: Term::CubeUnit,
            body: Term::CubeUnitStar,
        }];
        cache.check_file(&mut checker, &mut ctx, "a.rzk", decls.clone()).unwrap();
        let mut ctx2 = Context::new();
        cache.check_file(&mut checker, &mut ctx2, "a.rzk", decls).unwrap();
        assert!(ctx2.lookup_type("unitPoint").is_some());
    }
}
