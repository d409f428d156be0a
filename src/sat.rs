//! The linear-time propagator decider. Sets the NCF root to `true` and reads
//! off whatever literals that forces; sound but incomplete — it only ever
//! finds a model when the formula's own structure pins down every variable,
//! never by search.

use crate::dag::{DagStore, Pos};
use crate::decision::Decision;
use crate::formula::Formula;
use crate::propagate::valuate;
use crate::trace::{self, TRACE_ASSIGN, TRACE_CONTRADICTION};

/// Runs the linear propagator on `f`. `trace` is a verbosity level in
/// `0..=5`; see [`crate::trace`].
pub fn sat(f: &Formula, trace: u8) -> Decision {
    let vars = f.vars();
    let ncf = f.ncf();
    let mut store = DagStore::new();
    let root = store.intern(&ncf);
    trace::emit(trace, TRACE_ASSIGN, || "sat: valuating root = true".to_string());
    if !valuate(&mut store, root, Pos::permanent(0), true) {
        trace::emit(trace, TRACE_CONTRADICTION, || "sat: root valuation contradicted".to_string());
        return Decision::Unsat;
    }
    decide_from_store(&store, &vars)
}

/// Reads the permanent literal assignment off `store` and classifies it:
/// `Sat` when every variable in `vars` has been pinned down, `Unknown`
/// otherwise. Shared with `sat3`, which drives the same store further.
pub(crate) fn decide_from_store(
    store: &DagStore,
    vars: &std::collections::BTreeSet<String>,
) -> Decision {
    let assignment = store.literal_assignment();
    if vars.iter().all(|v| assignment.contains_key(v)) {
        Decision::Sat(assignment)
    } else {
        Decision::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::{implies, Formula};

    fn lit(name: &str) -> Formula {
        Formula::lit(name).unwrap()
    }

    #[test]
    fn satisfies_implies() {
        // sat(Implies("a","b")) -> an assignment satisfying it, never unsat.
        let f = implies(lit("a"), lit("b"));
        let decision = sat(&f, 0);
        assert_ne!(decision, Decision::Unsat);
        if let Decision::Sat(assignment) = decision {
            assert!(f.eval(&assignment));
        }
    }

    #[test]
    fn detects_unsat() {
        let f = Formula::and(vec![lit("a"), Formula::not(lit("a"))]);
        assert_eq!(sat(&f, 0), Decision::Unsat);
    }

    #[test]
    fn simple_conjunction_is_fully_determined() {
        let f = Formula::and(vec![lit("a"), Formula::not(lit("b"))]);
        let decision = sat(&f, 0);
        match decision {
            Decision::Sat(assignment) => {
                assert_eq!(assignment.get("a"), Some(&true));
                assert_eq!(assignment.get("b"), Some(&false));
            }
            other => panic!("expected Sat, got {other:?}"),
        }
    }

    #[test]
    fn xor_like_formula_is_unknown_or_sat() {
        // sat(And(Or(a,b), Or(Not(a),Not(b)))) -> unknown is acceptable.
        let f = Formula::and(vec![
            Formula::or(vec![lit("a"), lit("b")]),
            Formula::or(vec![Formula::not(lit("a")), Formula::not(lit("b"))]),
        ]);
        let decision = sat(&f, 0);
        assert_ne!(decision, Decision::Unsat);
        if let Decision::Sat(assignment) = decision {
            assert!(f.eval(&assignment));
        }
    }
}
