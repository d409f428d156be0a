//! The shared, interned DAG that the two non-DPLL deciders propagate over,
//! together with the three-track (permanent / tentative-true / tentative-false)
//! valuation slots attached to every conjunction node.
//!
//! Built only from formulas already in [negation-and-conjunction form](crate::formula::Formula::ncf):
//! a node is a literal, a negation, or a conjunction. Disjunction never
//! appears here; `sat`/`sat3` work against the De Morgan-rewritten tree.

use rustc_hash::FxHashMap;
use std::rc::Rc;

use crate::formula::Formula;

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub enum DagNode {
    Lit(Rc<str>),
    Not(NodeId),
    And(Vec<NodeId>),
}

/// One three-track valuation slot. `v`/`vt`/`vf` are the permanent,
/// tentative-true-hypothesis, and tentative-false-hypothesis values; `c`/`ct`/`cf`
/// record which child node most recently produced that value, for
/// diagnostics only; `s`/`st`/`sf` mark whether that value is "sure" (derived
/// from a fact that cannot later be retracted) on each track.
#[derive(Debug, Clone, Default)]
pub struct Slot {
    pub v: Option<bool>,
    pub vt: Option<bool>,
    pub vf: Option<bool>,
    pub c: Option<NodeId>,
    pub ct: Option<NodeId>,
    pub cf: Option<NodeId>,
    pub s: bool,
    pub st: bool,
    pub sf: bool,
}

impl Slot {
    /// Reads `hyp`'s track, falling back to the permanent track when the
    /// tentative cell itself is unset: a hypothesis sees permanent knowledge
    /// plus whatever it has additionally assumed, never permanent knowledge
    /// alone replaced by a blank tentative cell.
    fn track(&self, hyp: Option<bool>) -> Option<bool> {
        match hyp {
            None => self.v,
            Some(true) => self.vt.or(self.v),
            Some(false) => self.vf.or(self.v),
        }
    }

    fn sure(&self, hyp: Option<bool>) -> bool {
        match hyp {
            None => self.s,
            Some(true) => {
                if self.vt.is_some() {
                    self.st
                } else {
                    self.s
                }
            }
            Some(false) => {
                if self.vf.is_some() {
                    self.sf
                } else {
                    self.s
                }
            }
        }
    }

    fn set_track(&mut self, hyp: Option<bool>, val: bool, src: Option<NodeId>, sure: bool) {
        match hyp {
            None => {
                self.v = Some(val);
                self.c = src;
                self.s = sure;
            }
            Some(true) => {
                self.vt = Some(val);
                self.ct = src;
                self.st = sure;
            }
            Some(false) => {
                self.vf = Some(val);
                self.cf = src;
                self.sf = sure;
            }
        }
    }
}

/// A position in the slot array addressed under a hypothesis: `hyp == None`
/// is the permanent track, `Some(true)`/`Some(false)` the tentative tracks
/// opened while `sat3` trials a variable's two possible values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub hyp: Option<bool>,
    pub slot: usize,
}

impl Pos {
    pub fn permanent(slot: usize) -> Self {
        Pos { hyp: None, slot }
    }
}

/// The interned node arena. Nodes are built bottom-up from an NCF formula;
/// structurally identical subformulas share a single `NodeId`.
#[derive(Debug, Default)]
pub struct DagStore {
    pub nodes: Vec<DagNode>,
    /// `slots[node]` has length `num_variants(node)` for `And` nodes, and
    /// length 1 (a single pass-through slot) for `Lit`/`Not` nodes.
    pub slots: Vec<Vec<Slot>>,
    /// Back-edges: `parents[n]` lists every `(parent, slot)` in which `n`
    /// appears as the conjunct feeding that slot.
    pub parents: Vec<Vec<(NodeId, usize)>>,
    interned: FxHashMap<Formula, NodeId>,
}

/// Number of variant slots for a conjunction of `k` conjuncts: slot `i`
/// (`0 <= i < k-1`) holds the running value of conjuncts `0..=i`, and the
/// last slot (`k-2`, or `0` when `k <= 1`) is also the node's own value.
pub fn num_variants(k: usize) -> usize {
    std::cmp::max(1, k.saturating_sub(1))
}

impl DagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `f` (which must be in NCF: only `Lit`/`Not`/`And`) and returns
    /// its `NodeId`, building children first.
    pub fn intern(&mut self, f: &Formula) -> NodeId {
        if let Some(&id) = self.interned.get(f) {
            return id;
        }
        let node = match f {
            Formula::Lit(name) => DagNode::Lit(name.clone()),
            Formula::Not(inner) => {
                debug_assert!(
                    !matches!(inner.as_ref(), Formula::Or(_)),
                    "dag nodes are only built from NCF formulas"
                );
                let child = self.intern(inner);
                DagNode::Not(child)
            }
            Formula::And(children) => {
                let ids: Vec<NodeId> = children.iter().map(|c| self.intern(c)).collect();
                DagNode::And(ids)
            }
            Formula::Or(_) => unreachable!("dag nodes are only built from NCF formulas"),
        };
        let id = self.nodes.len();
        let n_slots = match &node {
            DagNode::And(children) => num_variants(children.len()),
            _ => 1,
        };
        self.nodes.push(node);
        self.slots.push((0..n_slots).map(|_| Slot::default()).collect());
        self.parents.push(Vec::new());
        if let DagNode::And(children) = &self.nodes[id] {
            for (slot, &child) in children.iter().enumerate() {
                let slot = slot.min(n_slots - 1);
                self.parents[child].push((id, slot));
            }
        }
        if let DagNode::Not(child) = &self.nodes[id] {
            self.parents[*child].push((id, 0));
        }
        self.interned.insert(f.clone(), id);
        id
    }

    pub fn num_variants_of(&self, id: NodeId) -> usize {
        self.slots[id].len()
    }

    /// Clears both tentative tracks on every slot, retaining the permanent
    /// track. Called between `sat3`'s per-variable hypothesis trials.
    pub fn clear_temp_all(&mut self) {
        for slots in &mut self.slots {
            for slot in slots {
                slot.vt = None;
                slot.vf = None;
                slot.ct = None;
                slot.cf = None;
                slot.st = false;
                slot.sf = false;
            }
        }
    }

    /// Reads the permanent value at `pos`, following the hypothesis track
    /// when `pos.hyp` is set.
    pub fn get(&self, id: NodeId, pos: Pos) -> Option<bool> {
        self.slots[id][pos.slot].track(pos.hyp)
    }

    pub fn get_sure(&self, id: NodeId, pos: Pos) -> bool {
        self.slots[id][pos.slot].sure(pos.hyp)
    }

    pub fn set(&mut self, id: NodeId, pos: Pos, val: bool, src: Option<NodeId>, sure: bool) {
        self.slots[id][pos.slot].set_track(pos.hyp, val, src, sure);
    }

    /// The node's own value: the last slot for an `And` node (or the lone
    /// slot for `Lit`/`Not`).
    pub fn value(&self, id: NodeId, hyp: Option<bool>) -> Option<bool> {
        let last = self.slots[id].len() - 1;
        self.slots[id][last].track(hyp)
    }

    pub fn value_sure(&self, id: NodeId, hyp: Option<bool>) -> bool {
        let last = self.slots[id].len() - 1;
        self.slots[id][last].sure(hyp)
    }

    /// Promotes, for every `(node, slot)` where both tentative tracks are set
    /// and agree, that shared value to the permanent track. Returns the
    /// number of slots promoted.
    pub fn merge_agreeing_tentative(&mut self) -> usize {
        let mut promoted = 0;
        for slots in &mut self.slots {
            for slot in slots {
                if let (Some(t), Some(fv)) = (slot.vt, slot.vf) {
                    if t == fv && slot.v.is_none() {
                        slot.v = Some(t);
                        slot.c = slot.ct;
                        slot.s = slot.st && slot.sf;
                        promoted += 1;
                    }
                }
            }
        }
        promoted
    }

    /// Collects every `(node, slot)` whose permanent track is still unset,
    /// in arena-insertion order (the order `sat3`'s worklist iterates).
    pub fn unfixed_slots(&self) -> Vec<(NodeId, usize)> {
        let mut out = Vec::new();
        for (id, slots) in self.slots.iter().enumerate() {
            for (slot, s) in slots.iter().enumerate() {
                if s.v.is_none() {
                    out.push((id, slot));
                }
            }
        }
        out
    }

    /// Reads off the permanent assignment to every literal node, as far as
    /// it has been determined.
    pub fn literal_assignment(&self) -> crate::formula::Assignment {
        self.literal_assignment_under(None)
    }

    /// Like [`DagStore::literal_assignment`], but reading a tentative track
    /// instead of the permanent one. Used by `sat3` to check whether a
    /// hypothesis alone already pins down every variable.
    pub fn literal_assignment_under(&self, hyp: Option<bool>) -> crate::formula::Assignment {
        let mut out = crate::formula::Assignment::new();
        for (id, node) in self.nodes.iter().enumerate() {
            if let DagNode::Lit(name) = node {
                if let Some(v) = self.value(id, hyp) {
                    out.insert(name.to_string(), v);
                }
            }
        }
        out
    }

    /// Promotes every slot whose `hyp` track is set and whose permanent
    /// track is still unknown to permanent, keeping that track's source and
    /// sure bit. Used when one hypothesis succeeds and its opposite fails:
    /// the slot is thereby forced to the surviving hypothesis's value.
    pub fn promote_tentative_track(&mut self, hyp: bool) -> usize {
        let mut promoted = 0;
        for slots in &mut self.slots {
            for slot in slots {
                let (val, src, sure) = if hyp {
                    (slot.vt, slot.ct, slot.st)
                } else {
                    (slot.vf, slot.cf, slot.sf)
                };
                if let Some(v) = val {
                    if slot.v.is_none() {
                        slot.v = Some(v);
                        slot.c = src;
                        slot.s = sure;
                        promoted += 1;
                    }
                }
            }
        }
        promoted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Formula;

    #[test]
    fn interning_is_exact_sharing() {
        let a = Formula::lit("a").unwrap();
        let f = Formula::and(vec![a.clone(), a.clone()]).ncf();
        let mut store = DagStore::new();
        let root = store.intern(&f);
        let DagNode::And(children) = &store.nodes[root] else { panic!("expected And") };
        assert_eq!(children[0], children[1], "two equal subformulas must share one node");
        // Re-interning the same formula returns the same id, not a new node.
        let again = store.intern(&f);
        assert_eq!(root, again);
    }

    #[test]
    fn variant_slot_counts_follow_conjunct_count() {
        assert_eq!(num_variants(0), 1);
        assert_eq!(num_variants(1), 1);
        assert_eq!(num_variants(2), 1);
        assert_eq!(num_variants(3), 2);
        assert_eq!(num_variants(5), 4);

        let mut store = DagStore::new();
        let lits: Vec<Formula> = (0..3).map(|i| Formula::lit(format!("v{i}")).unwrap()).collect();
        let f = Formula::and(lits);
        let id = store.intern(&f);
        assert_eq!(store.num_variants_of(id), 2);
    }

    #[test]
    fn tentative_track_reads_through_to_permanent() {
        let mut store = DagStore::new();
        let f = Formula::lit("a").unwrap();
        let id = store.intern(&f);
        store.set(id, Pos::permanent(0), true, None, true);
        // No hypothesis has been recorded for this slot, so a tentative read
        // must still see the permanent fact rather than `None`.
        assert_eq!(store.get(id, Pos { hyp: Some(true), slot: 0 }), Some(true));
        assert_eq!(store.get(id, Pos { hyp: Some(false), slot: 0 }), Some(true));
        assert!(store.get_sure(id, Pos { hyp: Some(true), slot: 0 }));
    }

    #[test]
    fn clear_temp_preserves_permanent_track() {
        let mut store = DagStore::new();
        let f = Formula::lit("a").unwrap();
        let id = store.intern(&f);
        store.set(id, Pos::permanent(0), true, None, true);
        store.set(id, Pos { hyp: Some(true), slot: 0 }, true, None, true);
        store.clear_temp_all();
        assert_eq!(store.get(id, Pos::permanent(0)), Some(true));
        assert_eq!(store.get(id, Pos { hyp: Some(true), slot: 0 }), None);
    }
}
