//! Tubes: piecewise-constant interval enclosures of time signals.
//!
//! A [`Tube`] encloses an unknown signal `x(t)` over a closed time domain by
//! a chain of slices. Each slice carries an interval *codomain* over its open
//! time interior; neighbouring slices share a *gate*, an interval enclosure
//! at the boundary instant. Gates are owned once by the tube (one entry per
//! boundary), so the coherence of the two sides of a boundary holds by
//! construction.
//!
//! All mutating enclosure operations are contractions: they intersect the new
//! value with the stored one and can never widen an enclosure, except for the
//! explicit [`Tube::inflate`].

mod arithmetic;
mod error;
mod serialize;
mod synthesis;
mod vector;

pub use error::{IoFailure, TubeFileError, WrongFormat};
pub use vector::TubeVector;

use crate::interval::round::{add_hi, add_lo, mul_hi, mul_lo};
use crate::interval::Interval;
use crate::trajectory::Trajectory;
use crate::utils::strict_upper_bound;
use core::fmt;
use synthesis::SynthTree;
use tracing::warn;

/// A piecewise-constant interval enclosure of a time signal.
#[derive(Debug, Clone)]
pub struct Tube {
    /// Slice boundaries, strictly increasing, `nb_slices() + 1` entries.
    bounds: Vec<f64>,
    /// One codomain per slice.
    codomains: Vec<Interval>,
    /// One gate per boundary; `gates[i]` is the output gate of slice `i-1`
    /// and the input gate of slice `i`.
    gates: Vec<Interval>,
    synthesis: Option<SynthTree>,
}

impl Tube {
    /// Create a tube of unconstrained slices over `tdomain` with slices of
    /// width `timestep` (the last slice absorbs any remainder).
    ///
    /// # Panics
    ///
    /// Panics if `tdomain` is empty, degenerate or unbounded, or if
    /// `timestep` is not strictly positive.
    pub fn new(tdomain: Interval, timestep: f64) -> Self {
        Tube::with_codomain(tdomain, timestep, Interval::ALL_REALS)
    }

    /// Create a tube with every slice and gate set to `codomain`.
    pub fn with_codomain(tdomain: Interval, timestep: f64, codomain: Interval) -> Self {
        let bounds = slice_bounds(tdomain, timestep);
        let n = bounds.len() - 1;
        let mut tube = Tube {
            bounds,
            codomains: vec![codomain; n],
            gates: vec![codomain; n + 1],
            synthesis: None,
        };
        if synthesis::default_enabled() {
            tube.enable_synthesis(true);
        }
        tube
    }

    /// Create a tube from a time function: slice `i` holds the image of its
    /// time domain under `f`, gates hold the image of the boundary instant.
    pub fn from_fn<F>(tdomain: Interval, timestep: f64, f: F) -> Self
    where
        F: Fn(Interval) -> Interval,
    {
        let bounds = slice_bounds(tdomain, timestep);
        let n = bounds.len() - 1;
        let codomains: Vec<Interval> =
            (0..n).map(|i| f(Interval::new(bounds[i], bounds[i + 1]))).collect();
        let gates: Vec<Interval> = (0..=n)
            .map(|k| {
                let mut g = f(Interval::point(bounds[k]));
                if k > 0 {
                    g &= codomains[k - 1];
                }
                if k < n {
                    g &= codomains[k];
                }
                g
            })
            .collect();
        let mut tube = Tube { bounds, codomains, gates, synthesis: None };
        if synthesis::default_enabled() {
            tube.enable_synthesis(true);
        }
        tube
    }

    /// Create a tube enclosing everything between a lower and an upper
    /// trajectory sharing one domain.
    pub fn from_bounds(lo: &Trajectory, hi: &Trajectory, timestep: f64) -> Self {
        assert_eq!(lo.domain(), hi.domain(), "trajectory domains differ");
        Tube::from_fn(lo.domain(), timestep, |t| {
            Interval::new(lo.eval(t).lb(), hi.eval(t).ub())
        })
    }

    /// The time domain `[t0, tf]`.
    pub fn tdomain(&self) -> Interval {
        Interval::new(self.bounds[0], self.bounds[self.bounds.len() - 1])
    }

    pub fn nb_slices(&self) -> usize {
        self.codomains.len()
    }

    /// The slice boundaries.
    pub fn slice_bounds(&self) -> &[f64] {
        &self.bounds
    }

    /// Time domain of slice `i`.
    pub fn slice_tdomain(&self, i: usize) -> Interval {
        Interval::new(self.bounds[i], self.bounds[i + 1])
    }

    /// Index of the slice whose time domain contains `t`; the final instant
    /// maps to the last slice.
    ///
    /// # Panics
    ///
    /// Panics if `t` is outside the time domain.
    pub fn time_to_index(&self, t: f64) -> usize {
        assert!(self.tdomain().contains(t), "time {t} outside the tube domain {}", self.tdomain());
        strict_upper_bound(&self.bounds, t).clamp(1, self.nb_slices()) - 1
    }

    /// True if `t` is one of the slice boundaries.
    pub fn is_gate_time(&self, t: f64) -> bool {
        self.bounds.binary_search_by(|b| b.partial_cmp(&t).unwrap()).is_ok()
    }

    /// Codomain of slice `i`.
    pub fn slice_codomain(&self, i: usize) -> Interval {
        self.codomains[i]
    }

    /// Gate at boundary `k` (there are `nb_slices() + 1` boundaries).
    pub fn gate(&self, k: usize) -> Interval {
        self.gates[k]
    }

    /// Input gate of slice `i`.
    pub fn input_gate(&self, i: usize) -> Interval {
        self.gates[i]
    }

    /// Output gate of slice `i`.
    pub fn output_gate(&self, i: usize) -> Interval {
        self.gates[i + 1]
    }

    /// Contract the codomain of slice `i` with `y`; the bounding gates are
    /// re-intersected so they stay inside the envelope.
    pub fn set_envelope(&mut self, i: usize, y: Interval) {
        self.codomains[i] &= y;
        self.gates[i] &= self.codomains[i];
        self.gates[i + 1] &= self.codomains[i];
        self.refresh_synthesis(i);
    }

    /// Contract the input gate of slice `i` with `y`. The gate is shared
    /// with slice `i-1`, so both sides see the write. `i == nb_slices()`
    /// addresses the final boundary, which only has a slice on its left.
    pub fn set_input_gate(&mut self, i: usize, y: Interval) {
        self.gates[i] &= y;
        if i < self.nb_slices() {
            self.gates[i] &= self.codomains[i];
        }
        if i > 0 {
            self.gates[i] &= self.codomains[i - 1];
        }
    }

    /// Contract the output gate of slice `i` with `y`.
    pub fn set_output_gate(&mut self, i: usize, y: Interval) {
        self.set_input_gate(i + 1, y);
    }

    /// Contract every slice and gate met by the time window with `y`.
    /// Times outside the domain are ignored.
    pub fn set(&mut self, y: Interval, window: Interval) {
        let window = window.meet(&self.tdomain());
        if window.is_empty() {
            return;
        }
        for i in 0..self.nb_slices() {
            let overlap = self.slice_tdomain(i).meet(&window);
            if !overlap.is_empty() && !overlap.is_degenerate() {
                self.codomains[i] &= y;
                self.refresh_synthesis(i);
            }
        }
        for k in 0..self.gates.len() {
            if window.contains(self.bounds[k]) {
                self.gates[k] &= y;
            }
        }
        self.clamp_gates();
    }

    /// Contract the enclosure at the single instant `t` with `y`, sampling a
    /// new gate there if needed. Times outside the domain are ignored.
    pub fn set_gate_at(&mut self, t: f64, y: Interval) {
        if !self.tdomain().contains(t) {
            return;
        }
        self.sample(t);
        let k = self
            .bounds
            .binary_search_by(|b| b.partial_cmp(&t).unwrap())
            .expect("sample guarantees a boundary");
        self.gates[k] &= y;
        self.clamp_gates();
    }

    /// Empty every slice and gate.
    pub fn set_empty(&mut self) {
        for c in &mut self.codomains {
            *c = Interval::EMPTY;
        }
        for g in &mut self.gates {
            *g = Interval::EMPTY;
        }
        self.rebuild_synthesis();
    }

    /// True if some slice codomain is empty. Gates at a codomain
    /// discontinuity may be empty without emptying the tube.
    pub fn is_empty(&self) -> bool {
        self.codomains.iter().any(Interval::is_empty)
    }

    /// Hull of all slice codomains.
    pub fn codomain(&self) -> Interval {
        match &self.synthesis {
            Some(tree) => tree.hull(0, self.nb_slices() - 1),
            None => self.codomains.iter().fold(Interval::EMPTY, |acc, c| acc.hull(c)),
        }
    }

    /// Largest slice codomain diameter.
    pub fn max_diam(&self) -> f64 {
        self.codomains.iter().map(Interval::diam).fold(0.0, f64::max)
    }

    /// Sum of slice codomain diameters weighted by slice length, plus the
    /// gate thicknesses so that a boundary write is visible as a volume
    /// change.
    pub fn volume(&self) -> f64 {
        let slices: f64 = (0..self.nb_slices())
            .map(|i| self.codomains[i].diam() * self.slice_tdomain(i).diam())
            .sum();
        let gates: f64 = self.gates.iter().map(Interval::diam).sum();
        slices + gates
    }

    /// True if both tubes share the same slice boundaries.
    pub fn same_slicing(&self, other: &Tube) -> bool {
        self.bounds == other.bounds
    }

    /// True if every slice and gate of `self` is contained in the
    /// corresponding one of `other`. Slicings must be identical.
    pub fn is_subset(&self, other: &Tube) -> bool {
        assert!(self.same_slicing(other), "tubes with different slicings");
        self.codomains.iter().zip(&other.codomains).all(|(a, b)| a.is_subset(b))
            && self.gates.iter().zip(&other.gates).all(|(a, b)| a.is_subset(b))
    }

    /// Enclosure of `x(t)`: the gate when `t` is a boundary, the slice
    /// codomain otherwise; empty outside the domain.
    pub fn at(&self, t: f64) -> Interval {
        if !self.tdomain().contains(t) {
            return Interval::EMPTY;
        }
        if let Ok(k) = self.bounds.binary_search_by(|b| b.partial_cmp(&t).unwrap()) {
            return self.gates[k];
        }
        self.codomains[self.time_to_index(t)]
    }

    /// Enclosure of `{x(τ) : τ ∈ t}`: the hull of the codomains met by `t`.
    /// Empty if `t` does not meet the time domain.
    pub fn eval(&self, t: Interval) -> Interval {
        let t = t.meet(&self.tdomain());
        if t.is_empty() {
            return Interval::EMPTY;
        }
        if t.is_degenerate() {
            return self.at(t.lb());
        }
        let (i1, i2) = self.slice_span(t);
        match &self.synthesis {
            Some(tree) => tree.hull(i1, i2),
            None => (i1..=i2).fold(Interval::EMPTY, |acc, i| acc.hull(&self.codomains[i])),
        }
    }

    /// Range of slice indices whose interior meets the non-degenerate `t`.
    fn slice_span(&self, t: Interval) -> (usize, usize) {
        let i1 = self.time_to_index(t.lb());
        let mut i2 = self.time_to_index(t.ub());
        if i2 > i1 && self.bounds[i2] == t.ub() {
            i2 -= 1;
        }
        (i1, i2)
    }

    /// Smallest interval of `search` containing every time at which the tube
    /// can take a value in `y`.
    pub fn invert(&self, y: Interval, search: Interval) -> Interval {
        let mut hull = Interval::EMPTY;
        for i in 0..self.nb_slices() {
            let tdom = self.slice_tdomain(i).meet(&search);
            if !tdom.is_empty() && self.codomains[i].intersects(&y) {
                hull |= tdom;
            }
        }
        hull
    }

    /// Every maximal connected pre-image of `y` inside `search`. Two
    /// neighbouring slices are bridged only when their shared gate can take
    /// a value in `y`.
    pub fn invert_components(&self, y: Interval, search: Interval) -> Vec<Interval> {
        let mut out: Vec<Interval> = Vec::new();
        let mut current = Interval::EMPTY;
        let mut prev_hit = false;
        for i in 0..self.nb_slices() {
            let tdom = self.slice_tdomain(i).meet(&search);
            let hit = !tdom.is_empty() && self.codomains[i].intersects(&y);
            if hit {
                let bridged = prev_hit && self.gates[i].intersects(&y);
                if !current.is_empty() && !bridged {
                    out.push(current);
                    current = Interval::EMPTY;
                }
                current |= tdom;
            } else if !current.is_empty() {
                out.push(current);
                current = Interval::EMPTY;
            }
            prev_hit = hit;
        }
        if !current.is_empty() {
            out.push(current);
        }
        out
    }

    /// Insert a slice boundary at `t`; a no-op when one exists already or
    /// when `t` lies outside the domain. The two sub-slices inherit the
    /// parent codomain and the new gate starts at the parent codomain.
    pub fn sample(&mut self, t: f64) {
        if !self.tdomain().contains(t) || self.is_gate_time(t) {
            return;
        }
        let i = self.time_to_index(t);
        let parent = self.codomains[i];
        self.bounds.insert(i + 1, t);
        self.codomains.insert(i + 1, parent);
        self.gates.insert(i + 1, parent);
        self.rebuild_synthesis();
    }

    /// Remove the gate at the interior boundary `t`, merging the two
    /// adjacent slices by hulling their codomains.
    ///
    /// # Panics
    ///
    /// Panics if `t` is not an interior slice boundary.
    pub fn remove_gate(&mut self, t: f64) {
        let k = self
            .bounds
            .binary_search_by(|b| b.partial_cmp(&t).unwrap())
            .unwrap_or_else(|_| panic!("no gate at time {t}"));
        assert!(k > 0 && k < self.bounds.len() - 1, "cannot remove a domain end");
        let merged = self.codomains[k - 1].hull(&self.codomains[k]);
        self.codomains[k - 1] = merged;
        self.codomains.remove(k);
        self.bounds.remove(k);
        self.gates.remove(k);
        self.rebuild_synthesis();
    }

    /// Widen every codomain and gate by `±r`.
    pub fn inflate(&mut self, r: f64) {
        for c in &mut self.codomains {
            *c = c.inflate(r);
        }
        for g in &mut self.gates {
            *g = g.inflate(r);
        }
        self.rebuild_synthesis();
    }

    /// Split the tube at `t` along the bisection of `x(t)`, producing the
    /// lower and upper halves.
    ///
    /// # Panics
    ///
    /// Panics if the enclosure at `t` cannot be bisected.
    pub fn bisect(&self, t: f64, ratio: f64) -> (Tube, Tube) {
        let (left, right) = self.at(t).bisect(ratio);
        let mut lo = self.clone();
        let mut hi = self.clone();
        lo.set_gate_at(t, left);
        hi.set_gate_at(t, right);
        (lo, hi)
    }

    /// Shift the time reference so that `shift_ref` becomes the new origin.
    pub fn shift_tdomain(&mut self, shift_ref: f64) {
        for b in &mut self.bounds {
            *b -= shift_ref;
        }
    }

    /// Enclosure of `∫ x` from `t0` to `t`.
    pub fn integral(&self, t: f64) -> Interval {
        if self.is_empty() || !self.tdomain().contains(t) {
            return Interval::EMPTY;
        }
        let (lo, hi) = self.primitive_at(t);
        Interval::new(lo, hi)
    }

    /// Enclosure of `∫ x` from `t0` to an interval-valued upper limit.
    pub fn integral_over(&self, t: Interval) -> Interval {
        let (lo, hi) = self.partial_integral(t);
        if lo.is_empty() || hi.is_empty() {
            return Interval::EMPTY;
        }
        Interval::new(lo.lb(), hi.ub())
    }

    /// Ranges of the lower and upper primitive over the time window `t`:
    /// the pair `([min p⁻, max p⁻], [min p⁺, max p⁺])`.
    pub fn partial_integral(&self, t: Interval) -> (Interval, Interval) {
        let t = t.meet(&self.tdomain());
        if t.is_empty() || self.is_empty() {
            return (Interval::EMPTY, Interval::EMPTY);
        }
        let (lo1, hi1) = self.primitive_at(t.lb());
        let (lo2, hi2) = self.primitive_at(t.ub());
        let mut min_lo = lo1.min(lo2);
        let mut max_lo = lo1.max(lo2);
        let mut min_hi = hi1.min(hi2);
        let mut max_hi = hi1.max(hi2);
        // interior extrema of the piecewise-linear primitives sit on slice
        // boundaries
        let k1 = self.time_to_index(t.lb());
        let k2 = self.time_to_index(t.ub());
        if k2 > k1 {
            // candidate boundaries are k1+1 ..= k2
            match &self.synthesis {
                Some(tree) => {
                    let base = tree.primitive_extrema(0, k1);
                    if k2 == k1 + 1 {
                        min_lo = min_lo.min(base.total_lo_dn);
                        max_lo = max_lo.max(base.total_lo_up);
                        min_hi = min_hi.min(base.total_hi_dn);
                        max_hi = max_hi.max(base.total_hi_up);
                    } else {
                        let span = tree.primitive_extrema(k1 + 1, k2 - 1);
                        min_lo = min_lo.min(add_lo(base.total_lo_dn, span.min_lo_dn));
                        max_lo = max_lo.max(add_hi(base.total_lo_up, span.max_lo_up));
                        min_hi = min_hi.min(add_lo(base.total_hi_dn, span.min_hi_dn));
                        max_hi = max_hi.max(add_hi(base.total_hi_up, span.max_hi_up));
                    }
                }
                None => {
                    let mut plo_dn = 0.0_f64;
                    let mut plo_up = 0.0_f64;
                    let mut phi_dn = 0.0_f64;
                    let mut phi_up = 0.0_f64;
                    for i in 0..k2 {
                        let dt = self.slice_tdomain(i).diam();
                        plo_dn = add_lo(plo_dn, mul_lo(self.codomains[i].lb(), dt));
                        plo_up = add_hi(plo_up, mul_hi(self.codomains[i].lb(), dt));
                        phi_dn = add_lo(phi_dn, mul_lo(self.codomains[i].ub(), dt));
                        phi_up = add_hi(phi_up, mul_hi(self.codomains[i].ub(), dt));
                        let boundary = i + 1;
                        if boundary > k1 {
                            min_lo = min_lo.min(plo_dn);
                            max_lo = max_lo.max(plo_up);
                            min_hi = min_hi.min(phi_dn);
                            max_hi = max_hi.max(phi_up);
                        }
                    }
                }
            }
        }
        (Interval::new(min_lo, max_lo), Interval::new(min_hi, max_hi))
    }

    /// Values of the lower and upper primitive at `t` (rounded outward).
    fn primitive_at(&self, t: f64) -> (f64, f64) {
        let k = self.time_to_index(t);
        let (mut lo, mut hi) = match &self.synthesis {
            Some(tree) => {
                if k == 0 {
                    (0.0, 0.0)
                } else {
                    let q = tree.primitive_extrema(0, k - 1);
                    (q.total_lo_dn, q.total_hi_up)
                }
            }
            None => {
                let mut lo = 0.0_f64;
                let mut hi = 0.0_f64;
                for i in 0..k {
                    let dt = self.slice_tdomain(i).diam();
                    lo = add_lo(lo, mul_lo(self.codomains[i].lb(), dt));
                    hi = add_hi(hi, mul_hi(self.codomains[i].ub(), dt));
                }
                (lo, hi)
            }
        };
        let rest = t - self.bounds[k];
        if rest > 0.0 {
            lo = add_lo(lo, mul_lo(self.codomains[k].lb(), rest));
            hi = add_hi(hi, mul_hi(self.codomains[k].ub(), rest));
        }
        (lo, hi)
    }

    /// Build or discard the synthesis tree for this tube.
    pub fn enable_synthesis(&mut self, enable: bool) {
        if enable {
            self.rebuild_full_synthesis();
        } else {
            self.synthesis = None;
        }
    }

    pub fn synthesis_enabled(&self) -> bool {
        self.synthesis.is_some()
    }

    /// Set the synthesis default for tubes created afterwards.
    pub fn enable_syntheses(enable: bool) {
        synthesis::set_default_enabled(enable);
    }

    fn refresh_synthesis(&mut self, i: usize) {
        if let Some(tree) = &mut self.synthesis {
            let dt = Interval::new(self.bounds[i], self.bounds[i + 1]).diam();
            tree.update_leaf(i, self.codomains[i], dt);
        }
    }

    fn rebuild_synthesis(&mut self) {
        if self.synthesis.is_some() {
            self.rebuild_full_synthesis();
        }
    }

    fn rebuild_full_synthesis(&mut self) {
        let widths: Vec<f64> = (0..self.nb_slices()).map(|i| self.slice_tdomain(i).diam()).collect();
        self.synthesis = Some(SynthTree::build(&self.codomains, &widths));
    }

    /// Re-intersect every gate with its adjacent codomains.
    fn clamp_gates(&mut self) {
        let n = self.nb_slices();
        for k in 0..=n {
            if k > 0 {
                self.gates[k] &= self.codomains[k - 1];
            }
            if k < n {
                self.gates[k] &= self.codomains[k];
            }
        }
    }
}

impl PartialEq for Tube {
    fn eq(&self, other: &Self) -> bool {
        self.bounds == other.bounds
            && self.codomains == other.codomains
            && self.gates == other.gates
    }
}

impl fmt::Display for Tube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tube {} -> {}, {} slices", self.tdomain(), self.codomain(), self.nb_slices())
    }
}

/// Boundaries of an equidistant slicing of `tdomain` with step `timestep`.
fn slice_bounds(tdomain: Interval, timestep: f64) -> Vec<f64> {
    assert!(
        !tdomain.is_empty() && !tdomain.is_degenerate() && !tdomain.is_unbounded(),
        "tube domain must be a bounded interval with positive diameter, got {tdomain}"
    );
    assert!(timestep > 0.0, "timestep must be strictly positive");
    let q = tdomain.diam() / timestep;
    let n = if (q - q.round()).abs() < 1e-9 { q.round() } else { q.ceil() } as usize;
    let n = n.max(1);
    if (q - q.round()).abs() >= 1e-9 {
        warn!(
            timestep,
            tdomain = %tdomain,
            "timestep does not divide the domain evenly, the last slice is shorter"
        );
    }
    let mut bounds: Vec<f64> = (0..n).map(|i| tdomain.lb() + i as f64 * timestep).collect();
    bounds.push(tdomain.ub());
    bounds
}

#[cfg(test)]
mod test {
    use super::*;

    fn piecewise() -> Tube {
        // [1,2] on [0,1], [3,4] on [1,2], [1,2] on [2,3]
        let mut tube = Tube::new(Interval::new(0.0, 3.0), 1.0);
        tube.set(Interval::new(1.0, 2.0), Interval::new(0.0, 1.0));
        tube.set(Interval::new(3.0, 4.0), Interval::new(1.0, 2.0));
        tube.set(Interval::new(1.0, 2.0), Interval::new(2.0, 3.0));
        tube
    }

    #[test]
    fn slicing() {
        let tube = Tube::with_codomain(Interval::new(0.0, 20.0), 5.0, Interval::new(-10.0, 10.0));
        assert_eq!(tube.nb_slices(), 4);
        assert_eq!(tube.slice_tdomain(0), Interval::new(0.0, 5.0));
        assert_eq!(tube.slice_tdomain(3), Interval::new(15.0, 20.0));
        assert_eq!(tube.time_to_index(0.0), 0);
        assert_eq!(tube.time_to_index(7.5), 1);
        assert_eq!(tube.time_to_index(20.0), 3);
        assert_eq!(tube.codomain(), Interval::new(-10.0, 10.0));
    }

    #[test]
    fn uneven_timestep() {
        let tube = Tube::new(Interval::new(0.0, 1.0), 0.3);
        assert_eq!(tube.nb_slices(), 4);
        assert_eq!(tube.slice_tdomain(3).ub(), 1.0);
        assert!(tube.slice_tdomain(3).diam() < 0.3);
    }

    #[test]
    fn evaluation() {
        let tube = piecewise();
        assert_eq!(tube.at(0.5), Interval::new(1.0, 2.0));
        assert_eq!(tube.at(1.5), Interval::new(3.0, 4.0));
        assert!(tube.at(1.0).is_empty()); // gate between [1,2] and [3,4]
        assert!(tube.at(-1.0).is_empty());
        assert_eq!(tube.eval(Interval::new(0.5, 1.5)), Interval::new(1.0, 4.0));
        assert_eq!(tube.eval(Interval::new(0.2, 0.8)), Interval::new(1.0, 2.0));
        // a window ending exactly on a boundary does not pull in the next slice
        assert_eq!(tube.eval(Interval::new(0.0, 1.0)), Interval::new(1.0, 2.0));
        assert!(tube.eval(Interval::new(5.0, 6.0)).is_empty());
    }

    #[test]
    fn inversion() {
        let tube = piecewise();
        let search = Interval::new(0.0, 3.0);
        assert_eq!(tube.invert(Interval::new(1.5, 3.5), search), Interval::new(0.0, 3.0));
        let components = tube.invert_components(Interval::new(1.5, 3.5), search);
        assert_eq!(
            components,
            vec![Interval::new(0.0, 1.0), Interval::new(1.0, 2.0), Interval::new(2.0, 3.0)]
        );
        assert!(tube.invert(Interval::new(10.0, 11.0), search).is_empty());
        assert_eq!(tube.invert(Interval::new(3.0, 3.5), search), Interval::new(1.0, 2.0));
    }

    #[test]
    fn sampling_is_idempotent() {
        let mut tube = Tube::with_codomain(Interval::new(0.0, 4.0), 1.0, Interval::new(0.0, 1.0));
        tube.sample(2.5);
        let once = tube.clone();
        tube.sample(2.5);
        assert_eq!(tube, once);
        assert_eq!(tube.nb_slices(), 5);
        assert_eq!(tube.at(2.5), Interval::new(0.0, 1.0));
    }

    #[test]
    fn merge_undoes_split() {
        let mut tube = Tube::with_codomain(Interval::new(0.0, 4.0), 1.0, Interval::new(0.0, 1.0));
        let original = tube.clone();
        tube.sample(2.5);
        tube.remove_gate(2.5);
        assert_eq!(tube, original);
    }

    #[test]
    fn integrals() {
        // x = [1,2] over [0,2], [0,1] over [2,4]
        let mut tube = Tube::new(Interval::new(0.0, 4.0), 2.0);
        tube.set(Interval::new(1.0, 2.0), Interval::new(0.0, 2.0));
        tube.set(Interval::new(0.0, 1.0), Interval::new(2.0, 4.0));
        assert_eq!(tube.integral(2.0), Interval::new(2.0, 4.0));
        assert_eq!(tube.integral(4.0), Interval::new(2.0, 6.0));
        assert_eq!(tube.integral(1.0), Interval::new(1.0, 2.0));
        let (plo, phi) = tube.partial_integral(Interval::new(0.0, 4.0));
        assert_eq!(plo, Interval::new(0.0, 2.0));
        assert_eq!(phi, Interval::new(0.0, 6.0));
        assert_eq!(tube.integral_over(Interval::new(2.0, 4.0)), Interval::new(2.0, 6.0));
    }

    #[test]
    fn integrals_with_synthesis_agree() {
        // dyadic codomains keep every rounding step exact, so the slice walk
        // and the tree queries have to agree bit for bit
        let mut plain = Tube::from_fn(Interval::new(0.0, 8.0), 0.5, |t| t - 4.0);
        let mut synth = plain.clone();
        synth.enable_synthesis(true);
        for t in [Interval::new(0.0, 8.0), Interval::new(1.25, 6.75), Interval::new(3.0, 3.25)] {
            assert_eq!(plain.partial_integral(t), synth.partial_integral(t));
            assert_eq!(plain.eval(t), synth.eval(t));
        }
        plain.set(Interval::new(-1.875, -1.625), Interval::new(2.0, 2.5));
        synth.set(Interval::new(-1.875, -1.625), Interval::new(2.0, 2.5));
        assert_eq!(
            plain.partial_integral(Interval::new(0.0, 8.0)),
            synth.partial_integral(Interval::new(0.0, 8.0))
        );
        assert_eq!(plain.codomain(), synth.codomain());
    }

    #[test]
    fn function_construction() {
        let tube = Tube::from_fn(Interval::new(0.0, 4.0), 1.0, |t| t * 2.0);
        assert_eq!(tube.slice_codomain(0), Interval::new(0.0, 2.0));
        assert_eq!(tube.slice_codomain(3), Interval::new(6.0, 8.0));
        assert_eq!(tube.at(2.0), Interval::point(4.0));
        assert_eq!(tube.codomain(), Interval::new(0.0, 8.0));
    }

    #[test]
    fn construction_from_trajectory_bounds() {
        let lo = Trajectory::from_samples(vec![0.0, 4.0], vec![-1.0, -1.0]).unwrap();
        let hi = Trajectory::from_samples(vec![0.0, 2.0, 4.0], vec![1.0, 3.0, 1.0]).unwrap();
        let tube = Tube::from_bounds(&lo, &hi, 2.0);
        assert_eq!(tube.nb_slices(), 2);
        assert_eq!(tube.slice_codomain(0), Interval::new(-1.0, 3.0));
        assert_eq!(tube.at(2.0), Interval::new(-1.0, 3.0));
        assert_eq!(tube.at(4.0), Interval::new(-1.0, 1.0));
    }

    #[test]
    fn synthesis_default_toggle() {
        Tube::enable_syntheses(true);
        let with_tree = Tube::new(Interval::new(0.0, 2.0), 1.0);
        Tube::enable_syntheses(false);
        let without = Tube::new(Interval::new(0.0, 2.0), 1.0);
        assert!(with_tree.synthesis_enabled());
        assert!(!without.synthesis_enabled());
    }

    #[test]
    fn contraction_only_setters() {
        let mut tube = Tube::with_codomain(Interval::new(0.0, 4.0), 1.0, Interval::new(-5.0, 5.0));
        tube.set_envelope(1, Interval::new(0.0, 10.0));
        assert_eq!(tube.slice_codomain(1), Interval::new(0.0, 5.0));
        assert_eq!(tube.input_gate(1), Interval::new(0.0, 5.0));
        assert_eq!(tube.output_gate(1), Interval::new(0.0, 5.0));
        tube.set_input_gate(1, Interval::new(2.0, 20.0));
        assert_eq!(tube.input_gate(1), Interval::new(2.0, 5.0));
        // shared with the previous slice
        assert_eq!(tube.output_gate(0), Interval::new(2.0, 5.0));
        // the final boundary has no slice on its right
        tube.set_output_gate(3, Interval::new(-1.0, 1.0));
        assert_eq!(tube.output_gate(3), Interval::new(-1.0, 1.0));
        assert_eq!(tube.gate(4), Interval::new(-1.0, 1.0));
    }

    #[test]
    fn emptiness_propagates() {
        let mut tube = Tube::with_codomain(Interval::new(0.0, 2.0), 1.0, Interval::new(0.0, 1.0));
        tube.set_envelope(0, Interval::new(5.0, 6.0));
        assert!(tube.is_empty());
        assert!(tube.input_gate(1).is_empty());
    }

    #[test]
    fn bisection() {
        let tube = Tube::with_codomain(Interval::new(0.0, 2.0), 1.0, Interval::new(0.0, 4.0));
        let (lo, hi) = tube.bisect(1.0, 0.5);
        assert_eq!(lo.at(1.0), Interval::new(0.0, 2.0));
        assert_eq!(hi.at(1.0), Interval::new(2.0, 4.0));
        assert_eq!(lo.at(0.5), Interval::new(0.0, 4.0));
    }

    #[test]
    fn gate_setting_at_instant() {
        let mut tube = Tube::with_codomain(Interval::new(0.0, 5.0), 1.0, Interval::ALL_REALS);
        tube.set_gate_at(0.0, Interval::point(0.0));
        assert_eq!(tube.at(0.0), Interval::point(0.0));
        tube.set_gate_at(2.5, Interval::new(-1.0, 1.0));
        assert_eq!(tube.nb_slices(), 6);
        assert_eq!(tube.at(2.5), Interval::new(-1.0, 1.0));
        // outside the domain: ignored
        tube.set_gate_at(9.0, Interval::point(3.0));
        assert_eq!(tube.nb_slices(), 6);
    }
}
