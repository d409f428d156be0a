//! The three-track valuation propagator shared by [`crate::sat::sat`] and
//! [`crate::sat3::sat3`]: assigning a node's slot cascades forward to its
//! parents via [`propagate_up`], and a conjunction's own slots cascade
//! backward among themselves via [`update_and`].

use crate::dag::{DagNode, DagStore, NodeId, Pos};

/// Outcome of trying to set a single `(node, slot)` to `val`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assigned {
    /// The slot was unset and is now `val`.
    Fresh,
    /// The slot already held `val`: no-op, consistent.
    AlreadyConsistent,
    /// The slot already held `!val`: a contradiction was found.
    Conflict,
}

/// Writes `val` into `(id, pos)` if unset, otherwise checks consistency.
/// Does not itself cascade; callers decide whether and how to propagate.
pub fn assign_primitive(
    store: &mut DagStore,
    id: NodeId,
    pos: Pos,
    val: bool,
    src: Option<NodeId>,
    sure: bool,
) -> Assigned {
    match store.get(id, pos) {
        None => {
            store.set(id, pos, val, src, sure);
            Assigned::Fresh
        }
        Some(existing) if existing == val => Assigned::AlreadyConsistent,
        Some(_) => Assigned::Conflict,
    }
}

/// Sets a node's own value and cascades to its parents. Returns `false` on
/// contradiction.
pub fn valuate(store: &mut DagStore, id: NodeId, pos: Pos, val: bool) -> bool {
    match &store.nodes[id] {
        DagNode::Lit(_) => valuate_lit(store, id, pos, val),
        DagNode::Not(child) => valuate_not(store, id, *child, pos, val),
        DagNode::And(children) => {
            let children = children.clone();
            valuate_and(store, id, &children, pos, val)
        }
    }
}

fn valuate_lit(store: &mut DagStore, id: NodeId, pos: Pos, val: bool) -> bool {
    match assign_primitive(store, id, pos, val, None, true) {
        Assigned::Conflict => false,
        Assigned::AlreadyConsistent => true,
        Assigned::Fresh => propagate_up(store, id, pos.hyp),
    }
}

fn valuate_not(store: &mut DagStore, id: NodeId, child: NodeId, pos: Pos, val: bool) -> bool {
    match assign_primitive(store, id, pos, val, Some(child), true) {
        Assigned::Conflict => false,
        Assigned::AlreadyConsistent => true,
        Assigned::Fresh => {
            if !valuate(store, child, pos, !val) {
                return false;
            }
            propagate_up(store, id, pos.hyp)
        }
    }
}

fn valuate_and(store: &mut DagStore, id: NodeId, children: &[NodeId], pos: Pos, val: bool) -> bool {
    if children.is_empty() {
        // The empty conjunction is always true; asking it to be false is a contradiction.
        if !val {
            return false;
        }
        return match assign_primitive(store, id, pos, true, None, true) {
            Assigned::Conflict => false,
            Assigned::AlreadyConsistent => true,
            Assigned::Fresh => propagate_up(store, id, pos.hyp),
        };
    }
    if children.len() == 1 {
        // A single-conjunct And has the same value as its conjunct; forward
        // and let `update_and`'s cascade derive this node's own slot.
        return valuate(store, children[0], pos, val);
    }
    if val {
        valuate_and_all_true(store, id, children, pos)
    } else {
        valuate_and_all_false(store, id, children, pos)
    }
}

/// The conjunction is true: every conjunct is true, and every intermediate
/// slot is true. Intermediate slots get the raw base assignment (they are
/// bookkeeping, not independently meaningful formulas); the boundary slot,
/// which doubles as the node's own value, and each conjunct get a full
/// recursive `valuate`.
fn valuate_and_all_true(store: &mut DagStore, id: NodeId, children: &[NodeId], pos: Pos) -> bool {
    let n_slots = store.num_variants_of(id);
    for i in 0..n_slots {
        let slot_pos = Pos { hyp: pos.hyp, slot: i };
        match assign_primitive(store, id, slot_pos, true, None, true) {
            Assigned::Conflict => return false,
            Assigned::AlreadyConsistent => continue,
            Assigned::Fresh => {}
        }
    }
    for &child in children {
        if !valuate(store, child, pos, true) {
            return false;
        }
    }
    propagate_up(store, id, pos.hyp)
}

/// The conjunction is false: at least one conjunct is false. If none of the
/// conjuncts is known false yet, the only way the conjunction can be false is
/// for its lone remaining unknown conjunct to be false, so that conjunct is
/// forced; with more than one conjunct still unknown nothing can be decided.
fn valuate_and_all_false(store: &mut DagStore, id: NodeId, children: &[NodeId], pos: Pos) -> bool {
    let n_slots = store.num_variants_of(id);
    let last = Pos { slot: n_slots - 1, ..pos };
    match assign_primitive(store, id, last, false, None, false) {
        Assigned::Conflict => false,
        Assigned::AlreadyConsistent => true,
        Assigned::Fresh => {
            if !force_unique_unknown_conjunct_false(store, children, pos) {
                return false;
            }
            propagate_up(store, id, pos.hyp)
        }
    }
}

/// Given a conjunction already known (or being forced) false, forces its one
/// remaining undetermined conjunct false when every other conjunct is
/// already known true. Already consistent with any conjunct known false;
/// a contradiction if every conjunct turns out to be known true instead.
fn force_unique_unknown_conjunct_false(store: &mut DagStore, children: &[NodeId], pos: Pos) -> bool {
    let hyp = pos.hyp;
    let mut unknown = None;
    for &child in children {
        match store.value(child, hyp) {
            Some(false) => return true,
            Some(true) => {}
            None => {
                if unknown.is_some() {
                    return true;
                }
                unknown = Some(child);
            }
        }
    }
    match unknown {
        None => false,
        Some(child) => valuate(store, child, pos, false),
    }
}

/// Walks `origin`'s parent back-edges, re-deriving each parent's own slots.
pub fn propagate_up(store: &mut DagStore, origin: NodeId, hyp: Option<bool>) -> bool {
    let parents = store.parents[origin].clone();
    for (parent, slot) in parents {
        let ok = match &store.nodes[parent] {
            DagNode::Not(child) => {
                let child = *child;
                update_not(store, parent, child, Pos { hyp, slot }, hyp)
            }
            DagNode::And(children) => {
                let children = children.clone();
                update_and(store, parent, &children, hyp)
            }
            DagNode::Lit(_) => true,
        };
        if !ok {
            return false;
        }
    }
    true
}

fn update_not(store: &mut DagStore, id: NodeId, child: NodeId, pos: Pos, hyp: Option<bool>) -> bool {
    let child_val = store.get(child, pos);
    let child_sure = store.get_sure(child, pos);
    let Some(cv) = child_val else { return true };
    match assign_primitive(store, id, pos, !cv, Some(child), child_sure) {
        Assigned::Conflict => false,
        Assigned::AlreadyConsistent => {
            if child_sure && !store.get_sure(id, pos) {
                store.set(id, pos, !cv, Some(child), true);
            }
            propagate_up(store, id, hyp)
        }
        Assigned::Fresh => propagate_up(store, id, hyp),
    }
}

/// Re-derives every slot of an `And` node from its children's current
/// values. With `k` children there are `n = max(1, k-1)` slots: slot `i`
/// (`i < n-1`) holds the running conjunction of children `0..=i`, folding in
/// exactly one new child per slot; the last slot additionally absorbs
/// whatever children remain (one when `k` is even with this folding, two
/// when `k` is odd), since it doubles as the node's own value. A value is
/// "sure" when every input that produced it is sure, or when a lone
/// sure-false input forces it regardless of the rest.
fn update_and(store: &mut DagStore, id: NodeId, children: &[NodeId], hyp: Option<bool>) -> bool {
    let n_slots = store.num_variants_of(id);
    let k = children.len();
    if k == 0 {
        let pos = Pos { hyp, slot: 0 };
        return match assign_primitive(store, id, pos, true, None, true) {
            Assigned::Conflict => false,
            _ => propagate_up(store, id, hyp),
        };
    }
    let mut acc_val = Some(true);
    let mut acc_sure = true;
    for (i, &conj) in children.iter().enumerate() {
        let conj_val = store.value(conj, hyp);
        let conj_sure = store.value_sure(conj, hyp);
        let derived = match (acc_val, conj_val) {
            (Some(false), _) => Some((false, acc_sure)),
            (_, Some(false)) => Some((false, conj_sure)),
            (Some(true), Some(true)) => Some((true, acc_sure && conj_sure)),
            _ => None,
        };
        match derived {
            Some((val, sure)) => {
                acc_val = Some(val);
                acc_sure = sure;
            }
            None => {
                acc_val = None;
                acc_sure = false;
            }
        }

        let is_boundary = i < n_slots - 1 || i == k - 1;
        if !is_boundary {
            continue;
        }
        let Some(val) = acc_val else { continue };
        let slot = i.min(n_slots - 1);
        let pos = Pos { hyp, slot };
        match assign_primitive(store, id, pos, val, Some(conj), acc_sure) {
            Assigned::Conflict => return false,
            Assigned::AlreadyConsistent => {
                if acc_sure && !store.get_sure(id, pos) {
                    store.set(id, pos, val, Some(conj), true);
                }
            }
            Assigned::Fresh => {}
        }
    }
    // A child settling a value can newly leave exactly one conjunct
    // undetermined while the conjunction itself is already known false —
    // whether derived just now or forced earlier by some other path, not
    // only on the pass that first derives it — so this reads the node's
    // recorded value directly rather than this pass's local `acc_val`
    // (§4.3.3's DagAnd false case applies on every re-derivation).
    if store.value(id, hyp) == Some(false) {
        let pos = Pos { hyp, slot: n_slots - 1 };
        if !force_unique_unknown_conjunct_false(store, children, pos) {
            return false;
        }
    }
    propagate_up(store, id, hyp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::DagStore;
    use crate::formula::Formula;

    #[test]
    fn permanent_slot_is_monotone() {
        let f = Formula::and(vec![Formula::lit("a").unwrap(), Formula::lit("b").unwrap()]).ncf();
        let mut store = DagStore::new();
        let root = store.intern(&f);
        assert!(valuate(&mut store, root, Pos::permanent(0), true));
        // root is already true; requesting true again is consistent, false is a contradiction.
        assert!(valuate(&mut store, root, Pos::permanent(0), true));
        assert!(!valuate(&mut store, root, Pos::permanent(0), false));
    }

    #[test]
    fn conjunction_of_literal_and_its_negation_contradicts() {
        let a = Formula::lit("a").unwrap();
        let f = Formula::and(vec![a.clone(), Formula::not(a)]).ncf();
        let mut store = DagStore::new();
        let root = store.intern(&f);
        assert!(!valuate(&mut store, root, Pos::permanent(0), true));
    }

    #[test]
    fn single_conjunct_and_forwards_false_to_its_child() {
        // Not(Or(a)) = Not(Not(And(Not(a)))), a singleton `And` one level in.
        // Forcing that `And` false must force its lone conjunct false too.
        let singleton_and = Formula::and(vec![Formula::not(Formula::lit("a").unwrap())]);
        let mut store = DagStore::new();
        let and_id = store.intern(&singleton_and);
        assert!(valuate(&mut store, and_id, Pos::permanent(0), false));
        let not_a_id = match &store.nodes[and_id] {
            DagNode::And(children) => children[0],
            _ => unreachable!(),
        };
        assert_eq!(store.get(not_a_id, Pos::permanent(0)), Some(false));
    }

    #[test]
    fn empty_conjunction_cannot_be_forced_false() {
        let empty_and = Formula::and(Vec::new());
        let mut store = DagStore::new();
        let id = store.intern(&empty_and);
        assert!(!valuate(&mut store, id, Pos::permanent(0), false));
        assert!(valuate(&mut store, id, Pos::permanent(0), true));
    }

    #[test]
    fn forcing_and_false_with_one_true_conjunct_forces_the_other_false() {
        let a = Formula::lit("a").unwrap();
        let b = Formula::lit("b").unwrap();
        let f = Formula::and(vec![a.clone(), b.clone()]).ncf();
        let mut store = DagStore::new();
        let root = store.intern(&f);
        assert!(valuate(&mut store, root, Pos::permanent(0), false));
        let a_id = store.intern(&a);
        assert!(valuate(&mut store, a_id, Pos::permanent(0), true));
        let b_id = store.intern(&b);
        assert_eq!(store.get(b_id, Pos::permanent(0)), Some(false));
    }

    #[test]
    fn conjunction_forced_false_with_all_conjuncts_true_contradicts() {
        let a = Formula::lit("a").unwrap();
        let b = Formula::lit("b").unwrap();
        let f = Formula::and(vec![a.clone(), b.clone()]).ncf();
        let mut store = DagStore::new();
        let root = store.intern(&f);
        assert!(valuate(&mut store, root, Pos::permanent(0), false));
        let a_id = store.intern(&a);
        assert!(valuate(&mut store, a_id, Pos::permanent(0), true));
        let b_id = store.intern(&b);
        assert!(!valuate(&mut store, b_id, Pos::permanent(0), true));
    }

    #[test]
    fn a_and_not_a_and_b_determines_b_false() {
        // a /\ ~(a /\ b) is fully determined: a = true, b = false.
        let a = Formula::lit("a").unwrap();
        let b = Formula::lit("b").unwrap();
        let f = Formula::and(vec![a.clone(), Formula::not(Formula::and(vec![a.clone(), b.clone()]))])
            .ncf();
        let mut store = DagStore::new();
        let root = store.intern(&f);
        assert!(valuate(&mut store, root, Pos::permanent(0), true));
        let a_id = store.intern(&a);
        let b_id = store.intern(&b);
        assert_eq!(store.get(a_id, Pos::permanent(0)), Some(true));
        assert_eq!(store.get(b_id, Pos::permanent(0)), Some(false));
    }
}
