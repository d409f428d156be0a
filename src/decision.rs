//! The three-valued outcome shared by [`crate::sat::sat`] and
//! [`crate::sat3::sat3`]. `dpll` has no third outcome (it is complete), so it
//! returns `Option<Assignment>` directly instead of this type.

use crate::formula::Assignment;

/// Result of an incomplete decider: a definite verdict, or "don't know".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Unsat,
    Sat(Assignment),
    Unknown,
}

impl Decision {
    pub fn is_sat(&self) -> bool {
        matches!(self, Decision::Sat(_))
    }

    pub fn is_unsat(&self) -> bool {
        matches!(self, Decision::Unsat)
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            Decision::Sat(a) => Some(a),
            _ => None,
        }
    }
}
