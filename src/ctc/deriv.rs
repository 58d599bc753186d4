//! Differential contractor for `ẋ(t) ∈ v(t)`.

use crate::interval::Interval;
use crate::tube::Tube;

/// Contractor enforcing `∀t, ẋ(t) ∈ v(t)` between two tubes sharing one
/// slicing.
///
/// Works slice by slice in three monotone phases: the gates are tightened
/// from each other through the slice width, then the envelope is tightened
/// from both gates. A left-to-right and a right-to-left sweep reach the
/// fixed point of the derivative constraint alone; an inconsistent pair
/// shows up as empty slices, never as a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct CtcDeriv;

impl CtcDeriv {
    pub fn new() -> Self {
        CtcDeriv
    }

    /// Contract `x` against its derivative enclosure `v`. Returns whether
    /// anything shrank.
    ///
    /// # Panics
    ///
    /// Panics if the tubes do not share their slicing.
    pub fn contract(&self, x: &mut Tube, v: &Tube) -> bool {
        let fwd = self.contract_fwd(x, v);
        let bwd = self.contract_bwd(x, v);
        fwd || bwd
    }

    /// Left-to-right sweep.
    pub fn contract_fwd(&self, x: &mut Tube, v: &Tube) -> bool {
        assert!(x.same_slicing(v), "derivative contraction needs one shared slicing");
        let mut changed = false;
        for i in 0..x.nb_slices() {
            changed |= self.contract_slice(x, v, i);
        }
        changed
    }

    /// Right-to-left sweep.
    pub fn contract_bwd(&self, x: &mut Tube, v: &Tube) -> bool {
        assert!(x.same_slicing(v), "derivative contraction needs one shared slicing");
        let mut changed = false;
        for i in (0..x.nb_slices()).rev() {
            changed |= self.contract_slice(x, v, i);
        }
        changed
    }

    /// Contract one slice pair; gate writes are shared with the neighbour
    /// slices through the tube.
    pub fn contract_slice(&self, x: &mut Tube, v: &Tube, i: usize) -> bool {
        debug_assert!(x.same_slicing(v));
        let delta = x.slice_tdomain(i).diam();
        let vc = v.slice_codomain(i);
        let before = (x.input_gate(i), x.output_gate(i), x.slice_codomain(i));

        // gates first
        x.set_output_gate(i, x.input_gate(i) + delta * vc);
        x.set_input_gate(i, x.output_gate(i) - delta * vc);

        // then the envelope, from both gates
        let span = Interval::new(0.0, delta);
        x.set_envelope(i, x.input_gate(i) + span * vc);
        x.set_envelope(i, x.output_gate(i) - span * vc);

        before != (x.input_gate(i), x.output_gate(i), x.slice_codomain(i))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn consistent_pair_is_untouched() {
        let dom = Interval::new(0.0, 20.0);
        let mut x = Tube::with_codomain(dom, 5.0, Interval::new(-10.0, 10.0));
        let v = Tube::with_codomain(dom, 5.0, Interval::point(0.0));
        let changed = CtcDeriv::new().contract(&mut x, &v);
        assert!(!changed);
        assert_eq!(x.codomain(), Interval::new(-10.0, 10.0));
    }

    #[test]
    fn gate_propagates_through_constant_derivative() {
        let dom = Interval::new(0.0, 20.0);
        let mut x = Tube::with_codomain(dom, 5.0, Interval::new(-10.0, 10.0));
        let v = Tube::with_codomain(dom, 5.0, Interval::point(0.0));
        x.set_gate_at(5.0, Interval::point(2.0));
        let changed = CtcDeriv::new().contract(&mut x, &v);
        assert!(changed);
        assert_eq!(x.codomain(), Interval::point(2.0));
        assert_eq!(x.at(0.0), Interval::point(2.0));
        assert_eq!(x.at(20.0), Interval::point(2.0));
    }

    #[test]
    fn bounded_derivative_cones() {
        // x(0) = 0, |xdot| <= 1: after contraction x(t) within [-t, t]
        let dom = Interval::new(0.0, 4.0);
        let mut x = Tube::new(dom, 1.0);
        let v = Tube::with_codomain(dom, 1.0, Interval::new(-1.0, 1.0));
        x.set_gate_at(0.0, Interval::point(0.0));
        CtcDeriv::new().contract(&mut x, &v);
        assert_eq!(x.at(1.0), Interval::new(-1.0, 1.0));
        assert_eq!(x.at(4.0), Interval::new(-4.0, 4.0));
        assert_eq!(x.slice_codomain(0), Interval::new(-1.0, 1.0));
        assert_eq!(x.slice_codomain(3), Interval::new(-4.0, 4.0));
    }

    #[test]
    fn backward_reach() {
        // terminal condition propagates backwards
        let dom = Interval::new(0.0, 2.0);
        let mut x = Tube::new(dom, 1.0);
        let v = Tube::with_codomain(dom, 1.0, Interval::new(0.0, 1.0));
        x.set_gate_at(2.0, Interval::point(0.0));
        CtcDeriv::new().contract(&mut x, &v);
        // going backwards with xdot in [0,1], x(t) in [-(2-t), 0]
        assert_eq!(x.at(1.0), Interval::new(-1.0, 0.0));
        assert_eq!(x.at(0.0), Interval::new(-2.0, 0.0));
    }

    #[test]
    fn infeasible_system_empties_the_tube() {
        let dom = Interval::new(0.0, 2.0);
        let mut x = Tube::new(dom, 1.0);
        // x(0) = 0 and x(2) = 10 but xdot in [0,1] only allows x(2) <= 2
        x.set_gate_at(0.0, Interval::point(0.0));
        x.set_gate_at(2.0, Interval::point(10.0));
        let v = Tube::with_codomain(dom, 1.0, Interval::new(0.0, 1.0));
        CtcDeriv::new().contract(&mut x, &v);
        assert!(x.is_empty());
    }

    #[test]
    fn empty_inputs_stay_empty() {
        let dom = Interval::new(0.0, 2.0);
        let mut x = Tube::new(dom, 1.0);
        x.set_empty();
        let v = Tube::with_codomain(dom, 1.0, Interval::point(0.0));
        CtcDeriv::new().contract(&mut x, &v);
        assert!(x.is_empty());
    }
}
