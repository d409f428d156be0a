//! The formula algebra: an immutable tree of `Lit`/`Not`/`And`/`Or`, with
//! structural equality, a total order, and the normalization operations
//! (`flatten`, `simplify`, `cnf`, `dnf`, `ncf`, `apply`) that everything else
//! in this crate is built on.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

use crate::error::{FormulaError, Result};

/// A variable-to-Boolean map. Variables absent from the map are unconstrained.
pub type Assignment = HashMap<String, bool>;

fn is_valid_literal_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// An immutable propositional formula. Equality and ordering are structural.
///
/// `Implies(p, q)` is not a variant here: callers get it from the free
/// function [`implies`], which builds the structural alias `Or([Not(p), q])`
/// directly, exactly as the source material treats it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    Lit(Rc<str>),
    Not(Rc<Formula>),
    And(Rc<[Formula]>),
    Or(Rc<[Formula]>),
}

impl Formula {
    /// Builds a literal. Rejects names that don't match `^[a-z][a-z0-9]*$`.
    pub fn lit(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if is_valid_literal_name(&name) {
            Ok(Formula::Lit(Rc::from(name.as_str())))
        } else {
            Err(FormulaError::InvalidLiteralName(name))
        }
    }

    pub fn not(f: Formula) -> Self {
        Formula::Not(Rc::new(f))
    }

    pub fn and(children: impl Into<Vec<Formula>>) -> Self {
        Formula::And(Rc::from(children.into()))
    }

    pub fn or(children: impl Into<Vec<Formula>>) -> Self {
        Formula::Or(Rc::from(children.into()))
    }

    fn rank(&self) -> u8 {
        match self {
            Formula::Lit(_) => 0,
            Formula::Not(_) => 1,
            Formula::And(_) => 2,
            Formula::Or(_) => 3,
        }
    }

    /// Hoists nested same-kind operators, collapses singletons, and
    /// short-circuits `And` containing an empty `Or` (and dually for `Or`).
    pub fn flatten(&self) -> Formula {
        match self {
            Formula::Lit(_) => self.clone(),
            Formula::Not(inner) => Formula::not(inner.flatten()),
            Formula::And(children) => {
                let mut out = Vec::with_capacity(children.len());
                for c in children.iter() {
                    match c.flatten() {
                        Formula::And(sub) => out.extend(sub.iter().cloned()),
                        Formula::Or(ref sub) if sub.is_empty() => return fls(),
                        other => out.push(other),
                    }
                }
                if out.len() == 1 {
                    out.into_iter().next().unwrap()
                } else {
                    Formula::and(out)
                }
            }
            Formula::Or(children) => {
                let mut out = Vec::with_capacity(children.len());
                for c in children.iter() {
                    match c.flatten() {
                        Formula::Or(sub) => out.extend(sub.iter().cloned()),
                        Formula::And(ref sub) if sub.is_empty() => return tru(),
                        other => out.push(other),
                    }
                }
                if out.len() == 1 {
                    out.into_iter().next().unwrap()
                } else {
                    Formula::or(out)
                }
            }
        }
    }

    /// `flatten` + De Morgan + double-negation cancellation + dedup +
    /// absorption + reduction + contradiction/tautology collapse + canonical
    /// sort. Idempotent and equivalence-preserving.
    pub fn simplify(&self) -> Formula {
        match self {
            Formula::Lit(_) => self.clone(),
            Formula::Not(inner) => simplify_not(inner),
            Formula::And(children) => simplify_and(children),
            Formula::Or(children) => simplify_or(children),
        }
    }

    /// Conjunction of disjunctions, by repeated distribution.
    pub fn cnf(&self) -> Formula {
        match self {
            Formula::Lit(_) | Formula::Not(_) => self.clone(),
            Formula::And(children) => {
                let distributed: Vec<Formula> = children.iter().map(|c| c.cnf()).collect();
                Formula::and(distributed).flatten()
            }
            Formula::Or(children) => or_cnf(children).flatten(),
        }
    }

    /// Disjunction of conjunctions; dual of [`Formula::cnf`].
    pub fn dnf(&self) -> Formula {
        match self {
            Formula::Lit(_) | Formula::Not(_) => self.clone(),
            Formula::Or(children) => {
                let distributed: Vec<Formula> = children.iter().map(|c| c.dnf()).collect();
                Formula::or(distributed).flatten()
            }
            Formula::And(children) => and_dnf(children).flatten(),
        }
    }

    /// Negation-and-Conjunction Form: rewrites away every `Or` via De Morgan,
    /// leaving only `Lit`, `Not`, `And`.
    pub fn ncf(&self) -> Formula {
        match self {
            Formula::Lit(_) => self.clone(),
            Formula::Not(inner) => match inner.as_ref() {
                Formula::Not(t) => t.ncf(),
                Formula::Or(children) => {
                    let negated: Vec<Formula> =
                        children.iter().map(|x| Formula::not(x.clone()).ncf()).collect();
                    Formula::and(negated)
                }
                _ => Formula::not(inner.ncf()),
            },
            Formula::And(children) => {
                Formula::and(children.iter().map(|c| c.ncf()).collect::<Vec<_>>())
            }
            Formula::Or(children) => {
                let negated: Vec<Formula> =
                    children.iter().map(|x| Formula::not(x.clone()).ncf()).collect();
                Formula::not(Formula::and(negated))
            }
        }
    }

    /// Substitutes variables per `sigma`, then simplifies.
    pub fn apply(&self, sigma: &Substitution) -> Result<Formula> {
        match self {
            Formula::Lit(name) => match sigma.get(name.as_ref()) {
                Some(Subst::Bool(b)) => Ok(if *b { tru() } else { fls() }),
                Some(Subst::Var(new_name)) => Formula::lit(new_name.clone()),
                Some(Subst::Formula(f)) => Ok(f.simplify()),
                None => Ok(self.clone()),
            },
            Formula::Not(inner) => Ok(Formula::not(inner.apply(sigma)?).simplify()),
            Formula::And(children) => {
                let applied = children
                    .iter()
                    .map(|c| c.apply(sigma))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Formula::and(applied).simplify())
            }
            Formula::Or(children) => {
                let applied = children
                    .iter()
                    .map(|c| c.apply(sigma))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Formula::or(applied).simplify())
            }
        }
    }

    /// Evaluates under a total (or partial, defaulting to `false`) assignment.
    pub fn eval(&self, assignment: &Assignment) -> bool {
        match self {
            Formula::Lit(name) => assignment.get(name.as_ref()).copied().unwrap_or(false),
            Formula::Not(inner) => !inner.eval(assignment),
            Formula::And(children) => children.iter().all(|c| c.eval(assignment)),
            Formula::Or(children) => children.iter().any(|c| c.eval(assignment)),
        }
    }

    /// Every distinct literal name occurring in this formula.
    pub fn vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            Formula::Lit(name) => {
                out.insert(name.to_string());
            }
            Formula::Not(inner) => inner.collect_vars(out),
            Formula::And(children) | Formula::Or(children) => {
                for c in children.iter() {
                    c.collect_vars(out);
                }
            }
        }
    }
}

/// `Implies(p, q)` is stored as `Or([Not(p), q])`, a structural alias rather
/// than a distinct variant.
pub fn implies(p: Formula, q: Formula) -> Formula {
    Formula::or(vec![Formula::not(p), q])
}

/// The empty conjunction: logical truth.
pub fn tru() -> Formula {
    Formula::and(Vec::new())
}

/// The empty disjunction: logical falsehood.
pub fn fls() -> Formula {
    Formula::or(Vec::new())
}

/// Free-function aliases mirroring the external interface's own names
/// (§6): `nnf` is `simplify`; `cnf`/`dnf` flatten before distributing, since
/// distribution assumes its input has already had nested same-kind operators
/// hoisted.
pub fn nnf(f: &Formula) -> Formula {
    f.simplify()
}

pub fn cnf(f: &Formula) -> Formula {
    f.flatten().cnf()
}

pub fn dnf(f: &Formula) -> Formula {
    f.flatten().dnf()
}

fn opposite(f: &Formula) -> Formula {
    match f {
        Formula::Not(t) => (**t).clone(),
        other => Formula::not(other.clone()),
    }
}

fn dedup(items: Vec<Formula>) -> Vec<Formula> {
    let mut out: Vec<Formula> = Vec::with_capacity(items.len());
    for f in items {
        if !out.contains(&f) {
            out.push(f);
        }
    }
    out
}

fn simplify_not(inner: &Formula) -> Formula {
    match inner {
        Formula::Not(t) => t.simplify(),
        Formula::And(children) => {
            let negated: Vec<Formula> = children.iter().map(|x| Formula::not(x.clone())).collect();
            Formula::or(negated).simplify()
        }
        Formula::Or(children) => {
            let negated: Vec<Formula> = children.iter().map(|x| Formula::not(x.clone())).collect();
            Formula::and(negated).simplify()
        }
        Formula::Lit(_) => Formula::not(inner.clone()),
    }
}

/// Shared machinery for `And`/`Or` simplification: flatten same-kind nesting,
/// short-circuit on the absorbing element, dedup, absorb, reduce, detect a
/// contradiction, sort. `is_and` picks which kind is self, which is the dual
/// (the absorbing/reducing partner), and which collapsed constant to return.
fn simplify_commutative(children: &[Formula], is_and: bool) -> Formula {
    let mut flat: Vec<Formula> = Vec::with_capacity(children.len());
    for c in children {
        let sc = c.simplify();
        let is_self_kind = matches!((&sc, is_and), (Formula::And(_), true) | (Formula::Or(_), false));
        let is_absorbing_dual = matches!((&sc, is_and), (Formula::Or(sub), true) if sub.is_empty())
            || matches!((&sc, is_and), (Formula::And(sub), false) if sub.is_empty());
        if is_absorbing_dual {
            return if is_and { fls() } else { tru() };
        }
        if is_self_kind {
            let sub = match &sc {
                Formula::And(sub) if is_and => sub.clone(),
                Formula::Or(sub) if !is_and => sub.clone(),
                _ => unreachable!(),
            };
            flat.extend(sub.iter().cloned());
        } else {
            flat.push(sc);
        }
    }
    if flat.len() == 1 {
        return flat.into_iter().next().unwrap();
    }
    let set = dedup(flat);

    // Absorption: drop a dual-kind child `x` when some sibling `y` is also
    // one of `x`'s own children (`a /\ (a \/ b) = a`, dually).
    let absorbed: Vec<bool> = set
        .iter()
        .map(|x| {
            let dual_children = match (x, is_and) {
                (Formula::Or(xs), true) => Some(xs),
                (Formula::And(xs), false) => Some(xs),
                _ => None,
            };
            match dual_children {
                Some(xs) => xs.iter().any(|y| set.contains(y)),
                None => false,
            }
        })
        .collect();
    let survivors: Vec<Formula> = set
        .iter()
        .zip(absorbed.iter())
        .filter(|(_, rm)| !**rm)
        .map(|(f, _)| f.clone())
        .collect();

    // Reduction: `a /\ (~a \/ b) = a /\ b`, dually — drop from a dual-kind
    // child any of its own children whose opposite is a sibling conjunct.
    let mut reduced: Vec<Formula> = Vec::with_capacity(survivors.len());
    for x in &survivors {
        let dual_children = match (x, is_and) {
            (Formula::Or(xs), true) => Some(xs),
            (Formula::And(xs), false) => Some(xs),
            _ => None,
        };
        match dual_children {
            Some(xs) => {
                let keep: Vec<Formula> = xs
                    .iter()
                    .filter(|y| !survivors.contains(&opposite(y)))
                    .cloned()
                    .collect();
                if keep.len() != xs.len() {
                    let rebuilt = if is_and {
                        Formula::or(keep).simplify()
                    } else {
                        Formula::and(keep).simplify()
                    };
                    reduced.push(rebuilt);
                } else {
                    reduced.push(x.clone());
                }
            }
            None => reduced.push(x.clone()),
        }
    }
    let mut final_set = dedup(reduced);

    // Contradiction: some child and its negation both present.
    let contradiction = final_set
        .iter()
        .any(|x| matches!(x, Formula::Not(t) if final_set.contains(t.as_ref())));
    if contradiction {
        return if is_and { fls() } else { tru() };
    }

    final_set.sort();
    if is_and {
        Formula::and(final_set)
    } else {
        Formula::or(final_set)
    }
}

fn simplify_and(children: &[Formula]) -> Formula {
    simplify_commutative(children, true)
}

fn simplify_or(children: &[Formula]) -> Formula {
    simplify_commutative(children, false)
}

fn or_cnf(children: &[Formula]) -> Formula {
    if children.is_empty() {
        return fls();
    }
    if children.len() == 1 {
        return children[0].cnf();
    }
    let distributed: Vec<Formula> = children.iter().map(|c| c.cnf()).collect();
    if let Formula::And(first) = &distributed[0] {
        let rest = &distributed[1..];
        let clauses: Vec<Formula> = first
            .iter()
            .map(|x| {
                let mut combined = vec![x.clone()];
                combined.extend(rest.iter().cloned());
                Formula::or(combined).cnf()
            })
            .collect();
        return Formula::and(clauses).simplify();
    }
    let rest_cnf = or_cnf(&distributed[1..]);
    if let Formula::And(rest_and) = &rest_cnf {
        let clauses: Vec<Formula> = rest_and
            .iter()
            .map(|x| Formula::or(vec![distributed[0].clone(), x.clone()]).cnf())
            .collect();
        Formula::and(clauses).simplify()
    } else {
        Formula::or(vec![distributed[0].clone(), rest_cnf]).simplify()
    }
}

fn and_dnf(children: &[Formula]) -> Formula {
    if children.is_empty() {
        return tru();
    }
    if children.len() == 1 {
        return children[0].dnf();
    }
    let distributed: Vec<Formula> = children.iter().map(|c| c.dnf()).collect();
    if let Formula::Or(first) = &distributed[0] {
        let rest = &distributed[1..];
        let clauses: Vec<Formula> = first
            .iter()
            .map(|x| {
                let mut combined = vec![x.clone()];
                combined.extend(rest.iter().cloned());
                Formula::and(combined).dnf()
            })
            .collect();
        return Formula::or(clauses).simplify();
    }
    let rest_dnf = and_dnf(&distributed[1..]);
    if let Formula::Or(rest_or) = &rest_dnf {
        let clauses: Vec<Formula> = rest_or
            .iter()
            .map(|x| Formula::and(vec![distributed[0].clone(), x.clone()]).dnf())
            .collect();
        Formula::or(clauses).simplify()
    } else {
        Formula::and(vec![distributed[0].clone(), rest_dnf]).simplify()
    }
}

/// A substitution target for [`Formula::apply`]: a Boolean constant, another
/// variable name, or a whole replacement formula.
#[derive(Debug, Clone)]
pub enum Subst {
    Bool(bool),
    Var(String),
    Formula(Formula),
}

pub type Substitution = HashMap<String, Subst>;

impl PartialOrd for Formula {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Formula {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank()).then_with(|| match (self, other) {
            (Formula::Lit(a), Formula::Lit(b)) => a.cmp(b),
            (Formula::Not(a), Formula::Not(b)) => a.cmp(b),
            (Formula::And(a), Formula::And(b)) => a.as_ref().cmp(b.as_ref()),
            (Formula::Or(a), Formula::Or(b)) => a.as_ref().cmp(b.as_ref()),
            _ => unreachable!("rank ordering already separates variants"),
        })
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Lit(name) => write!(f, "{name}"),
            Formula::Not(inner) => write!(f, "Not({inner})"),
            Formula::And(children) => write!(f, "And({})", join(children)),
            Formula::Or(children) => write!(f, "Or({})", join(children)),
        }
    }
}

fn join(children: &[Formula]) -> String {
    children
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(name: &str) -> Formula {
        Formula::lit(name).unwrap()
    }

    #[test]
    fn rejects_bad_names() {
        assert!(Formula::lit("Foo").is_err());
        assert!(Formula::lit("1abc").is_err());
        assert!(Formula::lit("a_b").is_err());
        assert!(Formula::lit("a1").is_ok());
    }

    #[test]
    fn total_order_ranks_variants() {
        let a = lit("a");
        let not_a = Formula::not(a.clone());
        let and_a = Formula::and(vec![a.clone()]);
        let or_a = Formula::or(vec![a.clone()]);
        assert!(a < not_a);
        assert!(not_a < and_a);
        assert!(and_a < or_a);
    }

    #[test]
    fn simplify_empty_or_inside_and_is_tautology_short_circuit() {
        // simplify(Or("a", And())) -> T
        let f = Formula::or(vec![lit("a"), tru()]);
        assert_eq!(f.simplify().to_string(), "And()");
    }

    #[test]
    fn simplify_double_negation() {
        let f = Formula::not(Formula::not(lit("a")));
        assert_eq!(f.simplify().to_string(), "a");
    }

    #[test]
    fn simplify_contradiction_collapses_to_false() {
        let f = Formula::and(vec![lit("a"), Formula::not(lit("a"))]);
        assert_eq!(f.simplify().to_string(), "Or()");
    }

    #[test]
    fn simplify_absorption() {
        let a = lit("a");
        let b = lit("b");
        let f = Formula::and(vec![a.clone(), Formula::or(vec![a.clone(), b])]);
        assert_eq!(f.simplify(), a.simplify());
    }

    #[test]
    fn ncf_rewrites_or_via_de_morgan() {
        let f = Formula::or(vec![lit("a"), lit("b")]);
        // Not(And(Not(a), Not(b)))
        assert_eq!(f.ncf().to_string(), "Not(And(Not(a), Not(b)))");
    }

    #[test]
    fn cnf_distributes_or_over_and() {
        // cnf(Or(And(a,b), c)) has clauses {a,c} and {b,c}
        let f = Formula::or(vec![Formula::and(vec![lit("a"), lit("b")]), lit("c")]);
        let result = f.simplify().cnf().simplify();
        if let Formula::And(clauses) = &result {
            let rendered: Vec<String> = clauses.iter().map(|c| c.to_string()).collect();
            assert!(rendered.iter().any(|s| s == "Or(a, c)"));
            assert!(rendered.iter().any(|s| s == "Or(b, c)"));
        } else {
            panic!("expected a conjunction of clauses, got {result}");
        }
    }

    #[test]
    fn free_function_aliases_match_their_method_definitions() {
        let f = Formula::not(Formula::not(lit("a")));
        assert_eq!(nnf(&f).to_string(), f.simplify().to_string());
        let g = Formula::or(vec![Formula::and(vec![lit("a"), lit("b")]), lit("c")]);
        assert_eq!(cnf(&g).to_string(), g.flatten().cnf().to_string());
        assert_eq!(dnf(&g).to_string(), g.flatten().dnf().to_string());
    }

    #[test]
    fn apply_substitutes_boolean_constants() {
        let f = Formula::and(vec![lit("a"), lit("b")]);
        let mut sigma = Substitution::new();
        sigma.insert("a".to_string(), Subst::Bool(true));
        assert_eq!(f.apply(&sigma).unwrap().to_string(), "b");
    }
}
