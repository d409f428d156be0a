//! Crate-wide error type.

use thiserror::Error;

/// Errors raised while constructing or rewriting a [`crate::formula::Formula`].
///
/// Unsatisfiability and indeterminacy are domain results, not errors — they
/// are encoded in the `Decision` returned by `sat`/`sat3` and the
/// `Option<Assignment>` returned by `dpll`, never in this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormulaError {
    #[error("invalid literal name {0:?}: must match ^[a-z][a-z0-9]*$")]
    InvalidLiteralName(String),
}

pub type Result<T> = std::result::Result<T, FormulaError>;
