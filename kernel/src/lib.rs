#![cfg_attr(docsrs, feature(doc_cfg))]

//! The kernel: a dependent type checker with cubes and topes.
//!
//! A type theory extended with an abstract *cube* universe and a *tope*
//! logic over it, used to reason about synthetic ∞-categories. Terms,
//! types, and proofs are all [`Term`]; extension types `⟨{t:I|ψ} → A[φ↦a]⟩`
//! tie the two together by letting a function's definition be partially
//! prescribed on a sub-shape of its domain.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Module driver                          │
//! │           checks a sequence of declarations in order        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Bidirectional checker                      │
//! │                    infer, check                              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┼──────────────┐
//!               ▼               ▼               ▼
//! ┌───────────────────┐ ┌───────────────┐ ┌───────────────────┐
//! │      Unifier       │ │ Tope entailer │ │     Evaluator      │
//! │ unify, occurs-check │ │   entails     │ │  eval, normalize   │
//! └───────────────────┘ └───────────────┘ └───────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │           Typing context & hole store, term model           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Public API
//!
//! - [`Term`] — the unified representation of terms, types, and proofs.
//! - [`Context`], [`HoleStore`] — typing context and metavariable store.
//! - [`KernelError`] — error types for type-checking failures.
//! - [`Checker`] — the bidirectional type checker (`infer`/`check`).
//! - [`unify::unify`] — first-order unification.
//! - [`tope::entails`] — tope entailment.
//! - [`eval::eval`], [`eval::normalize`] — weak normalization.
//! - [`driver::check_module`] — type-check a sequence of declarations.

mod context;
mod driver;
mod error;
mod eval;
mod term;
mod tope;
mod type_checker;
mod unify;

pub use context::{Context, HoleStore};
pub use driver::{check_module, Cache, Declaration, DriverError};
pub use error::{KernelError, KernelResult};
pub use eval::{eval, normalize};
pub use term::Term;
pub use tope::entails;
pub use type_checker::Checker;
