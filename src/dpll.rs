//! Complete backtracking search over a CNF clause list: unit propagation,
//! pure-literal elimination, then branching. Unlike [`crate::sat::sat`] and
//! [`crate::sat3::sat3`] this never returns "don't know" — only a witness or
//! unsatisfiability.

use std::rc::Rc;

use crate::formula::{Assignment, Formula};
use crate::trace::{self, TRACE_ASSIGN, TRACE_CONTRADICTION};

type Literal = (Rc<str>, bool);
type Clause = Vec<Literal>;

struct Contradiction;

/// Runs DPLL on `f`. `trace` is a verbosity level in `0..=5`; see
/// [`crate::trace`]. Returns `None` when `f` is unsatisfiable.
pub fn dpll(f: &Formula, trace: u8) -> Option<Assignment> {
    let order = ordered_vars(f);
    let clauses = clauses_of(&f.simplify().cnf().flatten());
    let assignment = dpll_clauses(clauses, &order, trace)?;
    Some(assignment.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

/// First-occurrence order of every variable in `f`, walked depth-first. Used
/// so branching has a deterministic tie-break independent of hash-map
/// iteration order.
fn ordered_vars(f: &Formula) -> Vec<Rc<str>> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    fn walk(f: &Formula, seen: &mut std::collections::HashSet<Rc<str>>, out: &mut Vec<Rc<str>>) {
        match f {
            Formula::Lit(name) => {
                if seen.insert(name.clone()) {
                    out.push(name.clone());
                }
            }
            Formula::Not(inner) => walk(inner, seen, out),
            Formula::And(children) | Formula::Or(children) => {
                for c in children.iter() {
                    walk(c, seen, out);
                }
            }
        }
    }
    walk(f, &mut seen, &mut out);
    out
}

fn literal_of(f: &Formula) -> Literal {
    match f {
        Formula::Lit(name) => (name.clone(), true),
        Formula::Not(inner) => match inner.as_ref() {
            Formula::Lit(name) => (name.clone(), false),
            other => panic!("expected a literal below Not in CNF, got {other}"),
        },
        other => panic!("expected a literal in CNF, got {other}"),
    }
}

/// Reads the clauses out of a formula already in CNF (a conjunction of
/// disjunctions of literals, or a single disjunction/literal).
fn clauses_of(f: &Formula) -> Vec<Clause> {
    let mut clause_of = |c: &Formula| -> Clause {
        match c {
            Formula::Lit(_) | Formula::Not(_) => vec![literal_of(c)],
            Formula::Or(lits) => lits.iter().map(literal_of).collect(),
            Formula::And(_) => panic!("nested And below the top level is not CNF"),
        }
    };
    match f {
        Formula::Lit(_) | Formula::Not(_) | Formula::Or(_) => vec![clause_of(f)],
        Formula::And(conjuncts) => conjuncts.iter().map(|c| clause_of(c)).collect(),
    }
}

fn is_tautological(clause: &Clause) -> bool {
    clause
        .iter()
        .any(|(name, pol)| clause.iter().any(|(n2, p2)| n2 == name && p2 != pol))
}

/// Assigns `name = val` across `clauses`: drops clauses it satisfies, strips
/// the opposite literal from the rest. Fails if any clause becomes empty.
fn assign_literal(clauses: Vec<Clause>, name: &Rc<str>, val: bool) -> Result<Vec<Clause>, Contradiction> {
    let mut out = Vec::with_capacity(clauses.len());
    for clause in clauses {
        if clause.iter().any(|(n, v)| n == name && *v == val) {
            continue;
        }
        let filtered: Clause = clause.into_iter().filter(|(n, v)| !(n == name && *v != val)).collect();
        if filtered.is_empty() {
            return Err(Contradiction);
        }
        out.push(filtered);
    }
    Ok(out)
}

/// Repeatedly applies unit propagation until no unit clauses remain.
fn unit_propagate(
    mut clauses: Vec<Clause>,
    trace: u8,
) -> Result<(Vec<Clause>, Assignment), Contradiction> {
    let mut assignment = Assignment::new();
    loop {
        clauses.retain(|c| !is_tautological(c));
        if clauses.iter().any(|c| c.is_empty()) {
            return Err(Contradiction);
        }
        let Some(unit) = clauses.iter().find(|c| c.len() == 1) else {
            break;
        };
        let (name, val) = unit[0].clone();
        if let Some(&existing) = assignment.get(name.as_ref()) {
            if existing != val {
                return Err(Contradiction);
            }
        } else {
            trace::emit(trace, TRACE_ASSIGN, || format!("dpll: unit propagate {name}={val}"));
            assignment.insert(name.to_string(), val);
        }
        clauses = assign_literal(clauses, &name, val)?;
    }
    Ok((clauses, assignment))
}

/// One pure-literal elimination pass: assigns every variable that occurs
/// with only one polarity across `clauses` its pure polarity.
fn pure_literal_eliminate(clauses: Vec<Clause>, trace: u8) -> (Vec<Clause>, Assignment) {
    let mut positive: std::collections::HashSet<Rc<str>> = std::collections::HashSet::new();
    let mut negative: std::collections::HashSet<Rc<str>> = std::collections::HashSet::new();
    for clause in &clauses {
        for (name, val) in clause {
            if *val {
                positive.insert(name.clone());
            } else {
                negative.insert(name.clone());
            }
        }
    }
    let pure: Vec<(Rc<str>, bool)> = positive
        .iter()
        .filter(|n| !negative.contains(*n))
        .map(|n| (n.clone(), true))
        .chain(negative.iter().filter(|n| !positive.contains(*n)).map(|n| (n.clone(), false)))
        .collect();
    let mut assignment = Assignment::new();
    let mut remaining = clauses;
    for (name, val) in pure {
        trace::emit(trace, TRACE_ASSIGN, || format!("dpll: pure literal {name}={val}"));
        assignment.insert(name.to_string(), val);
        remaining.retain(|c| !c.iter().any(|(n, v)| n == &name && *v == val));
    }
    (remaining, assignment)
}

fn dpll_clauses(mut clauses: Vec<Clause>, order: &[Rc<str>], trace: u8) -> Option<Assignment> {
    let mut acc = Assignment::new();
    loop {
        let (after_units, unit_assignment) = match unit_propagate(clauses, trace) {
            Ok(pair) => pair,
            Err(Contradiction) => {
                trace::emit(trace, TRACE_CONTRADICTION, || "dpll: unit propagation contradiction".to_string());
                return None;
            }
        };
        acc.extend(unit_assignment);
        if after_units.is_empty() {
            return Some(acc);
        }
        let (after_pure, pure_assignment) = pure_literal_eliminate(after_units, trace);
        if pure_assignment.is_empty() {
            clauses = after_pure;
            break;
        }
        acc.extend(pure_assignment);
        if after_pure.is_empty() {
            return Some(acc);
        }
        clauses = after_pure;
    }

    let branch_var = order
        .iter()
        .find(|name| !acc.contains_key(name.as_ref()) && clauses.iter().any(|c| c.iter().any(|(n, _)| n == *name)))?
        .clone();

    for candidate in [true, false] {
        trace::emit(trace, TRACE_ASSIGN, || format!("dpll: branch {branch_var}={candidate}"));
        if let Ok(branched) = assign_literal(clauses.clone(), &branch_var, candidate) {
            if let Some(mut sub) = dpll_clauses(branched, order, trace) {
                sub.insert(branch_var.to_string(), candidate);
                sub.extend(acc);
                return Some(sub);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Formula;

    fn lit(name: &str) -> Formula {
        Formula::lit(name).unwrap()
    }

    #[test]
    fn unit_and_pure_literal_determine_a_and_c() {
        // dpll(And(a, Or(a,b), Not(c))) -> {a:true, c:false}, b unconstrained.
        let f = Formula::and(vec![lit("a"), Formula::or(vec![lit("a"), lit("b")]), Formula::not(lit("c"))]);
        let assignment = dpll(&f, 0).expect("satisfiable");
        assert_eq!(assignment.get("a"), Some(&true));
        assert_eq!(assignment.get("c"), Some(&false));
        assert!(!assignment.contains_key("b"));
    }

    #[test]
    fn contradiction_is_unsat() {
        let f = Formula::and(vec![lit("a"), Formula::not(lit("a"))]);
        assert_eq!(dpll(&f, 0), None);
    }

    #[test]
    fn branches_when_no_unit_or_pure_literal_exists() {
        // a xor b: no unit clauses, no pure literals, forces a branch.
        let f = Formula::and(vec![
            Formula::or(vec![lit("a"), lit("b")]),
            Formula::or(vec![Formula::not(lit("a")), Formula::not(lit("b"))]),
        ]);
        let assignment = dpll(&f, 0).expect("satisfiable");
        assert!(f.eval(&assignment));
    }

    #[test]
    fn every_solution_satisfies_the_formula() {
        let f = Formula::and(vec![
            Formula::or(vec![lit("a"), lit("b"), lit("c")]),
            Formula::or(vec![Formula::not(lit("a")), lit("b")]),
            Formula::or(vec![Formula::not(lit("b")), lit("c")]),
        ]);
        let assignment = dpll(&f, 0).expect("satisfiable");
        assert!(f.eval(&assignment));
    }
}
