//! triclause decides the satisfiability of propositional formulas and, when
//! satisfiable, returns a witness assignment, via three complementary
//! deciders over one shared formula representation:
//!
//! * [`dpll::dpll`] — complete backtracking search over CNF clauses.
//! * [`sat::sat`] — a linear-time propagator over a shared DAG of
//!   subformulas in negation-and-conjunction form; sound but incomplete.
//! * [`sat3::sat3`] — the linear propagator augmented with one-level
//!   hypothetical reasoning per DAG slot; strictly stronger, still
//!   incomplete in general.
//!
//! Building formulas (encoders for Sudoku, feature models, or anything
//! else), parsing them from a file format, and any command-line interface
//! are all left to the embedding application; this crate only supplies the
//! [`formula::Formula`] algebra and the three deciders built on it. Likewise
//! this crate never installs a logger — see [`trace`] for how to observe one.

pub mod dag;
mod decision;
pub mod dpll;
pub mod error;
pub mod formula;
mod propagate;
pub mod sat;
pub mod sat3;
pub mod trace;

pub use decision::Decision;
pub use formula::{cnf, dnf, fls, implies, nnf, tru, Assignment, Formula};
