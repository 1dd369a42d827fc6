//! Error types for the kernel type checker.
//!
//! Every variant carries the term under inspection and whatever sub-terms
//! are needed to render a useful message; nothing is recovered inside the
//! checker (see the module driver in `driver.rs` for where errors are
//! caught and located).

use crate::eval::EvalError;
use crate::term::Term;
use std::fmt;

/// Errors that can occur during type checking.
#[derive(Debug, Clone)]
pub enum KernelError {
    /// Hole `h` would become infinite by solution `t`.
    Infinite(Term, Term),

    /// Unification mismatch: the two outer forms and the two inner
    /// subterms that actually disagreed.
    Unexpected {
        term: Term,
        inferred_full: Term,
        expected_full: Term,
        inferred: Term,
        expected: Term,
    },

    /// The evaluator failed while reducing `term`.
    Eval(Term, EvalError),

    /// Assertion-style failure, or a parser-level failure surfaced inside
    /// checking.
    Other(String),

    /// Inference was demanded of a check-only lambda.
    CannotInferLambda(Term),

    /// Inference was demanded of a check-only pair.
    CannotInferPair(Term),

    /// An eliminator was applied to a term whose type is not a function.
    NotAFunction {
        func: Term,
        func_type: Term,
        arg: Term,
    },

    /// An eliminator was applied to a term whose type is not a pair.
    NotAPair {
        term: Term,
        term_type: Term,
        projection: &'static str,
    },

    /// A lambda was checked against a type that is not `Pi` or an
    /// extension type.
    ExpectedFunctionType { term: Term, expected: Term },

    /// `Pi`/`Sigma` was given a non-lambda body, or a lambda of an
    /// unsupported shape.
    InvalidTypeFamily(Term),

    /// Entailment `topes ⊢ φ` failed.
    TopeContextNotSatisfied {
        term: Term,
        tope: Term,
        context_topes: Vec<Term>,
    },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Infinite(hole, t) => {
                write!(f, "infinite type: {} occurs in {}", hole, t)
            }
            KernelError::Unexpected {
                term,
                inferred_full,
                expected_full,
                inferred,
                expected,
            } => write!(
                f,
                "type mismatch in {}: expected {} (specifically {}), found {} (specifically {})",
                term, expected_full, expected, inferred_full, inferred
            ),
            KernelError::Eval(t, e) => write!(f, "evaluation failed on {}: {}", t, e),
            KernelError::Other(msg) => write!(f, "{}", msg),
            KernelError::CannotInferLambda(t) => {
                write!(f, "cannot infer the type of lambda {} without an expected type", t)
            }
            KernelError::CannotInferPair(t) => {
                write!(f, "cannot infer the type of pair {} without an expected type", t)
            }
            KernelError::NotAFunction { func, func_type, arg } => write!(
                f,
                "cannot apply {} (of type {}) to {}: not a function",
                func, func_type, arg
            ),
            KernelError::NotAPair {
                term,
                term_type,
                projection,
            } => write!(
                f,
                "cannot take {} of {} (of type {}): not a pair",
                projection, term, term_type
            ),
            KernelError::ExpectedFunctionType { term, expected } => write!(
                f,
                "lambda {} checked against non-function type {}",
                term, expected
            ),
            KernelError::InvalidTypeFamily(t) => {
                write!(f, "invalid type family: {}", t)
            }
            KernelError::TopeContextNotSatisfied {
                term,
                tope,
                context_topes,
            } => write!(
                f,
                "tope {} is not entailed by {:?} while checking {}",
                tope, context_topes, term
            ),
        }
    }
}

impl std::error::Error for KernelError {}

impl From<(Term, EvalError)> for KernelError {
    fn from((term, err): (Term, EvalError)) -> Self {
        KernelError::Eval(term, err)
    }
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;
