//! Evaluation contractor for `y ∈ x(t)` with interval-valued time.

use super::CtcDeriv;
use crate::interval::Interval;
use crate::tube::Tube;

/// Absolute tolerance under which the iteration is considered settled.
const SETTLED: f64 = 1e-12;

/// Contractor enforcing `y ∈ x(t)` together with `ẋ ∈ v`, where both the
/// evaluation time `t` and the value `y` are intervals.
///
/// The time is narrowed through tube inversion, the value through tube
/// evaluation, and the observation is folded back into the tube by a
/// localized derivative-style contraction around `t` followed by a full
/// forward/backward derivative sweep. An infeasible observation empties
/// every bound domain.
#[derive(Debug, Clone, Copy)]
pub struct CtcEval {
    preserve_slicing: bool,
}

impl Default for CtcEval {
    fn default() -> Self {
        CtcEval::new()
    }
}

impl CtcEval {
    pub fn new() -> Self {
        CtcEval { preserve_slicing: false }
    }

    /// When set, the contractor will not insert new slice boundaries at the
    /// endpoints of `t`. The contractor network enables this so that the
    /// slicing-based decomposition stays valid.
    pub fn preserve_slicing(&mut self, preserve: bool) {
        self.preserve_slicing = preserve;
    }

    /// Contract `t`, `y` and `x` under `y ∈ x(t)` and `ẋ ∈ v`. Returns
    /// whether anything shrank.
    pub fn contract(&self, t: &mut Interval, y: &mut Interval, x: &mut Tube, v: &Tube) -> bool {
        let t_start = *t;
        let y_start = *y;
        let volume_start = x.volume();

        let mut v_local = v.clone();
        if !self.preserve_slicing && !t.is_empty() {
            for instant in [t.lb(), t.ub()] {
                x.sample(instant);
                v_local.sample(instant);
            }
        } else {
            // the derivative sweep needs one shared slicing
            assert!(
                x.same_slicing(v),
                "evaluation contraction needs tubes with one shared slicing"
            );
        }

        let deriv = CtcDeriv::new();
        // bounded fallback in case the tolerance is never met exactly
        for _ in 0..16 {
            let t_before = *t;
            let y_before = *y;
            let volume_before = x.volume();

            *t &= x.invert(*y, *t);
            if t.is_empty() {
                *y = Interval::EMPTY;
                x.set_empty();
                return true;
            }
            *y &= x.eval(*t);
            if y.is_empty() {
                *t = Interval::EMPTY;
                x.set_empty();
                return true;
            }

            // fold the observation into every slice met by t: for a slice
            // time σ and the unknown observation time τ ∈ t, the signal
            // moves by (σ - τ) times some derivative value taken between
            // the two, hence the hull below
            let i1 = x.time_to_index(t.lb());
            let mut i2 = x.time_to_index(t.ub());
            if i2 > i1 && x.slice_tdomain(i2).lb() == t.ub() {
                i2 -= 1;
            }
            for i in i1..=i2 {
                let tdom = x.slice_tdomain(i);
                if tdom.meet(t).is_empty() {
                    continue;
                }
                let vv = v_local.eval(tdom.hull(t));
                x.set_envelope(i, *y + (tdom - *t) * vv);
                x.set_input_gate(i, *y + (Interval::point(tdom.lb()) - *t) * vv);
                x.set_output_gate(i, *y + (Interval::point(tdom.ub()) - *t) * vv);
            }

            deriv.contract(x, &v_local);

            let settled = (t_before.diam() - t.diam()).abs() <= SETTLED
                && (y_before.diam() - y.diam()).abs() <= SETTLED
                && (volume_before - x.volume()).abs() <= SETTLED;
            if settled {
                break;
            }
        }

        *t != t_start || *y != y_start || (volume_start - x.volume()).abs() > 0.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pointwise_observation() {
        let dom = Interval::new(0.0, 20.0);
        let mut x = Tube::with_codomain(dom, 5.0, Interval::new(-10.0, 10.0));
        let v = Tube::with_codomain(dom, 5.0, Interval::point(0.0));
        let mut t = Interval::point(5.0);
        let mut y = Interval::point(2.0);
        let changed = CtcEval::new().contract(&mut t, &mut y, &mut x, &v);
        assert!(changed);
        assert_eq!(t, Interval::point(5.0));
        assert_eq!(y, Interval::point(2.0));
        assert_eq!(x.codomain(), Interval::point(2.0));
        assert_eq!(v.codomain(), Interval::point(0.0));
    }

    #[test]
    fn uncertain_time_observation() {
        // x starts at 0 with |xdot| <= 1; observing y = 4 somewhere in [1, 3]
        // is only compatible with the upper part of the reachable cone
        let dom = Interval::new(0.0, 4.0);
        let mut x = Tube::new(dom, 1.0);
        x.set_gate_at(0.0, Interval::point(0.0));
        let v = Tube::with_codomain(dom, 1.0, Interval::new(-1.0, 1.0));
        CtcDeriv::new().contract(&mut x, &v);
        let mut t = Interval::new(1.0, 3.0);
        let mut y = Interval::point(4.0);
        CtcEval::new().contract(&mut t, &mut y, &mut x, &v);
        // |x| <= t under the cone, so x(t) = 4 is impossible before t = 4
        assert!(t.is_empty());
        assert!(y.is_empty());
        assert!(x.is_empty());
    }

    #[test]
    fn time_uncertainty_keeps_envelope_sound() {
        let dom = Interval::new(0.0, 4.0);
        let mut x = Tube::new(dom, 1.0);
        x.set_gate_at(0.0, Interval::point(0.0));
        let v = Tube::with_codomain(dom, 1.0, Interval::new(-1.0, 1.0));
        CtcDeriv::new().contract(&mut x, &v);
        let mut t = Interval::new(1.0, 3.0);
        let mut y = Interval::new(0.5, 1.0);
        CtcEval::new().contract(&mut t, &mut y, &mut x, &v);
        assert_eq!(t, Interval::new(1.0, 3.0));
        // the reference trajectory x(tau) = min(tau, 1) hits y at tau = 1
        // and must survive the contraction
        assert!(x.at(1.0).contains(1.0));
        assert!(x.at(3.0).contains(1.0));
        assert!(!x.is_empty());
    }

    #[test]
    fn narrows_the_time_through_inversion() {
        // piecewise tube: only the middle slice can reach y
        let dom = Interval::new(0.0, 3.0);
        let mut x = Tube::new(dom, 1.0);
        x.set(Interval::new(0.0, 1.0), Interval::new(0.0, 1.0));
        x.set(Interval::new(4.0, 5.0), Interval::new(1.0, 2.0));
        x.set(Interval::new(0.0, 1.0), Interval::new(2.0, 3.0));
        let v = Tube::with_codomain(dom, 1.0, Interval::ALL_REALS);
        let mut t = Interval::new(0.0, 3.0);
        let mut y = Interval::new(4.2, 4.8);
        let mut ctc = CtcEval::new();
        ctc.preserve_slicing(true);
        ctc.contract(&mut t, &mut y, &mut x, &v);
        assert_eq!(t, Interval::new(1.0, 2.0));
        assert_eq!(y, Interval::new(4.2, 4.8));
    }

    #[test]
    fn observation_inside_the_last_slice() {
        let dom = Interval::new(0.0, 4.0);
        let mut x = Tube::with_codomain(dom, 1.0, Interval::new(-10.0, 10.0));
        let v = Tube::with_codomain(dom, 1.0, Interval::point(0.0));
        let mut t = Interval::new(3.2, 3.8);
        let mut y = Interval::new(0.0, 1.0);
        let mut ctc = CtcEval::new();
        ctc.preserve_slicing(true);
        ctc.contract(&mut t, &mut y, &mut x, &v);
        assert_eq!(t, Interval::new(3.2, 3.8));
        assert_eq!(y, Interval::new(0.0, 1.0));
        assert_eq!(x.nb_slices(), 4);
        // the observation reaches the final boundary and, with a zero
        // derivative, the whole tube
        assert_eq!(x.at(4.0), Interval::new(0.0, 1.0));
        assert_eq!(x.codomain(), Interval::new(0.0, 1.0));
    }

    #[test]
    fn sampling_can_be_disabled() {
        let dom = Interval::new(0.0, 4.0);
        let mut x = Tube::with_codomain(dom, 1.0, Interval::new(-10.0, 10.0));
        let v = Tube::with_codomain(dom, 1.0, Interval::point(0.0));
        let mut t = Interval::new(0.5, 1.5);
        let mut y = Interval::new(-1.0, 1.0);

        let mut preserving = CtcEval::new();
        preserving.preserve_slicing(true);
        let mut x2 = x.clone();
        let mut t2 = t;
        let mut y2 = y;
        preserving.contract(&mut t2, &mut y2, &mut x2, &v);
        assert_eq!(x2.nb_slices(), 4);

        CtcEval::new().contract(&mut t, &mut y, &mut x, &v);
        assert_eq!(x.nb_slices(), 6); // sampled at 0.5 and 1.5
    }
}
