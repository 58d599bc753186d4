//! Synthesis tree: cached summaries of the slice chain.
//!
//! A balanced binary tree laid out in an arena, one leaf per slice. Each node
//! caches the codomain hull of its span together with the lower/upper
//! primitive sums and their prefix extrema, so that range hulls and primitive
//! ranges resolve in `O(log n)` instead of a slice walk. Codomain writes
//! refresh the path to the root; structural edits rebuild the arena.

use crate::interval::round::{add_hi, add_lo, mul_hi, mul_lo};
use crate::interval::Interval;
use std::sync::atomic::{AtomicBool, Ordering};

static DEFAULT_SYNTHESIS: AtomicBool = AtomicBool::new(false);

/// Whether tubes created from now on start with a synthesis tree.
pub(crate) fn default_enabled() -> bool {
    DEFAULT_SYNTHESIS.load(Ordering::Relaxed)
}

pub(crate) fn set_default_enabled(enable: bool) {
    DEFAULT_SYNTHESIS.store(enable, Ordering::Relaxed);
}

/// Primitive-sum summary of a slice span.
///
/// `total_*` are the span sums of `lb·dt` / `ub·dt`, each kept with both
/// rounding directions; `min/max` are the extrema over all prefix sums of the
/// span, the empty prefix included.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PrimQuery {
    pub(crate) total_lo_dn: f64,
    pub(crate) total_lo_up: f64,
    pub(crate) total_hi_dn: f64,
    pub(crate) total_hi_up: f64,
    pub(crate) min_lo_dn: f64,
    pub(crate) max_lo_up: f64,
    pub(crate) min_hi_dn: f64,
    pub(crate) max_hi_up: f64,
}

impl PrimQuery {
    const IDENTITY: PrimQuery = PrimQuery {
        total_lo_dn: 0.0,
        total_lo_up: 0.0,
        total_hi_dn: 0.0,
        total_hi_up: 0.0,
        min_lo_dn: 0.0,
        max_lo_up: 0.0,
        min_hi_dn: 0.0,
        max_hi_up: 0.0,
    };

    fn leaf(codomain: Interval, dt: f64) -> PrimQuery {
        let total_lo_dn = mul_lo(codomain.lb(), dt);
        let total_lo_up = mul_hi(codomain.lb(), dt);
        let total_hi_dn = mul_lo(codomain.ub(), dt);
        let total_hi_up = mul_hi(codomain.ub(), dt);
        PrimQuery {
            total_lo_dn,
            total_lo_up,
            total_hi_dn,
            total_hi_up,
            min_lo_dn: total_lo_dn.min(0.0),
            max_lo_up: total_lo_up.max(0.0),
            min_hi_dn: total_hi_dn.min(0.0),
            max_hi_up: total_hi_up.max(0.0),
        }
    }

    /// Concatenate two adjacent spans, `self` on the left.
    fn join(&self, right: &PrimQuery) -> PrimQuery {
        PrimQuery {
            total_lo_dn: add_lo(self.total_lo_dn, right.total_lo_dn),
            total_lo_up: add_hi(self.total_lo_up, right.total_lo_up),
            total_hi_dn: add_lo(self.total_hi_dn, right.total_hi_dn),
            total_hi_up: add_hi(self.total_hi_up, right.total_hi_up),
            min_lo_dn: self.min_lo_dn.min(add_lo(self.total_lo_dn, right.min_lo_dn)),
            max_lo_up: self.max_lo_up.max(add_hi(self.total_lo_up, right.max_lo_up)),
            min_hi_dn: self.min_hi_dn.min(add_lo(self.total_hi_dn, right.min_hi_dn)),
            max_hi_up: self.max_hi_up.max(add_hi(self.total_hi_up, right.max_hi_up)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    hull: Interval,
    prim: PrimQuery,
}

const IDENTITY_NODE: Node = Node { hull: Interval::EMPTY, prim: PrimQuery::IDENTITY };

/// Arena segment tree over slice positions.
#[derive(Debug, Clone)]
pub(crate) struct SynthTree {
    /// Number of leaves in use (the slice count).
    n: usize,
    /// Leaf capacity, a power of two; leaves occupy `cap..cap + n`.
    cap: usize,
    nodes: Vec<Node>,
}

impl SynthTree {
    pub(crate) fn build(codomains: &[Interval], widths: &[f64]) -> SynthTree {
        debug_assert_eq!(codomains.len(), widths.len());
        let n = codomains.len();
        let cap = n.next_power_of_two();
        let mut nodes = vec![IDENTITY_NODE; 2 * cap];
        for i in 0..n {
            nodes[cap + i] = Node {
                hull: codomains[i],
                prim: PrimQuery::leaf(codomains[i], widths[i]),
            };
        }
        for k in (1..cap).rev() {
            nodes[k] = Node {
                hull: nodes[2 * k].hull.hull(&nodes[2 * k + 1].hull),
                prim: nodes[2 * k].prim.join(&nodes[2 * k + 1].prim),
            };
        }
        SynthTree { n, cap, nodes }
    }

    /// Refresh leaf `i` after a codomain write and recompute its path.
    pub(crate) fn update_leaf(&mut self, i: usize, codomain: Interval, dt: f64) {
        debug_assert!(i < self.n);
        let mut k = self.cap + i;
        self.nodes[k] = Node { hull: codomain, prim: PrimQuery::leaf(codomain, dt) };
        k /= 2;
        while k >= 1 {
            self.nodes[k] = Node {
                hull: self.nodes[2 * k].hull.hull(&self.nodes[2 * k + 1].hull),
                prim: self.nodes[2 * k].prim.join(&self.nodes[2 * k + 1].prim),
            };
            k /= 2;
        }
    }

    /// Hull of the slice codomains in `a..=b`.
    pub(crate) fn hull(&self, a: usize, b: usize) -> Interval {
        debug_assert!(a <= b && b < self.n);
        self.hull_rec(1, 0, self.cap - 1, a, b)
    }

    fn hull_rec(&self, k: usize, lo: usize, hi: usize, a: usize, b: usize) -> Interval {
        if b < lo || hi < a {
            return Interval::EMPTY;
        }
        if a <= lo && hi <= b {
            return self.nodes[k].hull;
        }
        let mid = (lo + hi) / 2;
        self.hull_rec(2 * k, lo, mid, a, b)
            .hull(&self.hull_rec(2 * k + 1, mid + 1, hi, a, b))
    }

    /// Primitive summary of the slice span `a..=b`.
    pub(crate) fn primitive_extrema(&self, a: usize, b: usize) -> PrimQuery {
        debug_assert!(a <= b && b < self.n);
        self.prim_rec(1, 0, self.cap - 1, a, b)
    }

    fn prim_rec(&self, k: usize, lo: usize, hi: usize, a: usize, b: usize) -> PrimQuery {
        if b < lo || hi < a {
            return PrimQuery::IDENTITY;
        }
        if a <= lo && hi <= b {
            return self.nodes[k].prim;
        }
        let mid = (lo + hi) / 2;
        // in-order fold keeps the prefix offsets correct
        self.prim_rec(2 * k, lo, mid, a, b)
            .join(&self.prim_rec(2 * k + 1, mid + 1, hi, a, b))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tree() -> SynthTree {
        // codomains [1,2], [-3,-1], [0,4] over unit-width slices
        let codomains = [
            Interval::new(1.0, 2.0),
            Interval::new(-3.0, -1.0),
            Interval::new(0.0, 4.0),
        ];
        SynthTree::build(&codomains, &[1.0, 1.0, 1.0])
    }

    #[test]
    fn range_hulls() {
        let t = tree();
        assert_eq!(t.hull(0, 2), Interval::new(-3.0, 4.0));
        assert_eq!(t.hull(0, 0), Interval::new(1.0, 2.0));
        assert_eq!(t.hull(1, 2), Interval::new(-3.0, 4.0));
        assert_eq!(t.hull(0, 1), Interval::new(-3.0, 2.0));
    }

    #[test]
    fn primitive_totals_and_extrema() {
        let t = tree();
        let q = t.primitive_extrema(0, 2);
        // lower sums: 1, then 1-3 = -2, then -2+0 = -2
        assert_eq!(q.total_lo_dn, -2.0);
        assert_eq!(q.min_lo_dn, -2.0);
        assert_eq!(q.max_lo_up, 1.0);
        // upper sums: 2, then 2-1 = 1, then 1+4 = 5
        assert_eq!(q.total_hi_up, 5.0);
        assert_eq!(q.min_hi_dn, 0.0);
        assert_eq!(q.max_hi_up, 5.0);
    }

    #[test]
    fn updates_refresh_the_path() {
        let mut t = tree();
        t.update_leaf(1, Interval::new(0.0, 1.0), 1.0);
        assert_eq!(t.hull(0, 2), Interval::new(0.0, 4.0));
        let q = t.primitive_extrema(0, 2);
        assert_eq!(q.total_lo_dn, 1.0);
        assert_eq!(q.max_hi_up, 7.0);
    }

    #[test]
    fn non_power_of_two_padding_is_neutral() {
        let codomains = [
            Interval::new(1.0, 1.0),
            Interval::new(2.0, 2.0),
            Interval::new(3.0, 3.0),
            Interval::new(4.0, 4.0),
            Interval::new(5.0, 5.0),
        ];
        let t = SynthTree::build(&codomains, &[1.0; 5]);
        assert_eq!(t.hull(0, 4), Interval::new(1.0, 5.0));
        assert_eq!(t.primitive_extrema(0, 4).total_lo_dn, 15.0);
        assert_eq!(t.primitive_extrema(3, 4).total_hi_up, 9.0);
    }
}
