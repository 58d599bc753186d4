//! Slice-wise arithmetic on tubes.
//!
//! Operands are broadcast by evaluating the right-hand side over each slice
//! time domain (and at each gate instant), so interval, trajectory and tube
//! operands all go through the same path. Tube operands with a finer slicing
//! first refine `self` by sampling, which keeps the result slicing the
//! common refinement.

use super::Tube;
use crate::interval::Interval;
use crate::trajectory::Trajectory;
use core::ops::{Add, AddAssign, BitAnd, BitAndAssign, BitOr, BitOrAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

impl Tube {
    /// Map every codomain and gate through `f`. The map must be inclusion
    /// monotone so the gate/envelope ordering survives.
    fn apply_pointwise(&mut self, f: impl Fn(Interval) -> Interval) {
        for c in &mut self.codomains {
            *c = f(*c);
        }
        for g in &mut self.gates {
            *g = f(*g);
        }
        self.rebuild_synthesis();
    }

    /// Combine with a tube operand, slice by slice.
    fn zip_tube(&mut self, rhs: &Tube, f: impl Fn(Interval, Interval) -> Interval) {
        assert_eq!(self.tdomain(), rhs.tdomain(), "tube time domains differ");
        for k in 1..rhs.bounds.len() - 1 {
            self.sample(rhs.bounds[k]);
        }
        for i in 0..self.nb_slices() {
            let operand = rhs.eval(self.slice_tdomain(i));
            self.codomains[i] = f(self.codomains[i], operand);
        }
        for k in 0..self.gates.len() {
            let operand = rhs.at(self.bounds[k]);
            self.gates[k] = f(self.gates[k], operand);
        }
        self.rebuild_synthesis();
    }

    /// Combine with a trajectory operand, slice by slice.
    fn zip_traj(&mut self, rhs: &Trajectory, f: impl Fn(Interval, Interval) -> Interval) {
        assert!(
            self.tdomain().is_subset(&rhs.domain()),
            "trajectory domain {} does not cover the tube domain {}",
            rhs.domain(),
            self.tdomain()
        );
        for i in 0..self.nb_slices() {
            let operand = rhs.eval(self.slice_tdomain(i));
            self.codomains[i] = f(self.codomains[i], operand);
        }
        for k in 0..self.gates.len() {
            let operand = rhs.eval(Interval::point(self.bounds[k]));
            self.gates[k] = f(self.gates[k], operand);
        }
        self.rebuild_synthesis();
    }

    /// Image under `cos`, slice by slice.
    pub fn cos(&self) -> Tube {
        let mut out = self.clone();
        out.apply_pointwise(|y| y.cos());
        out
    }

    /// Image under `sin`, slice by slice.
    pub fn sin(&self) -> Tube {
        let mut out = self.clone();
        out.apply_pointwise(|y| y.sin());
        out
    }

    /// Image under the absolute value, slice by slice.
    pub fn abs(&self) -> Tube {
        let mut out = self.clone();
        out.apply_pointwise(|y| y.abs());
        out
    }

    /// Image under `x^2`, slice by slice.
    pub fn sqr(&self) -> Tube {
        let mut out = self.clone();
        out.apply_pointwise(|y| y.sqr());
        out
    }

    /// Image under the square root, slice by slice.
    pub fn sqrt(&self) -> Tube {
        let mut out = self.clone();
        out.apply_pointwise(|y| y.sqrt());
        out
    }

    /// Image under `exp`, slice by slice.
    pub fn exp(&self) -> Tube {
        let mut out = self.clone();
        out.apply_pointwise(|y| y.exp());
        out
    }

    /// Image under the natural logarithm, slice by slice.
    pub fn ln(&self) -> Tube {
        let mut out = self.clone();
        out.apply_pointwise(|y| y.ln());
        out
    }

    /// Image under `x^n`, slice by slice.
    pub fn pow(&self, n: i32) -> Tube {
        let mut out = self.clone();
        out.apply_pointwise(|y| y.pow(n));
        out
    }
}

impl Neg for &Tube {
    type Output = Tube;
    fn neg(self) -> Tube {
        let mut out = self.clone();
        out.apply_pointwise(|y| -y);
        out
    }
}

macro_rules! tube_assign_ops {
    ($($trait:ident :: $method:ident => $op:tt),*) => {$(
        impl $trait<Interval> for Tube {
            fn $method(&mut self, rhs: Interval) {
                self.apply_pointwise(|y| y $op rhs);
            }
        }
        impl $trait<f64> for Tube {
            fn $method(&mut self, rhs: f64) {
                self.apply_pointwise(|y| y $op Interval::point(rhs));
            }
        }
        impl $trait<&Trajectory> for Tube {
            fn $method(&mut self, rhs: &Trajectory) {
                self.zip_traj(rhs, |y, r| y $op r);
            }
        }
        impl $trait<&Tube> for Tube {
            fn $method(&mut self, rhs: &Tube) {
                self.zip_tube(rhs, |y, r| y $op r);
            }
        }
    )*};
}

tube_assign_ops!(
    AddAssign::add_assign => +,
    SubAssign::sub_assign => -,
    MulAssign::mul_assign => *,
    DivAssign::div_assign => /
);

impl BitAndAssign<&Tube> for Tube {
    fn bitand_assign(&mut self, rhs: &Tube) {
        self.zip_tube(rhs, |y, r| y & r);
    }
}

impl BitOrAssign<&Tube> for Tube {
    fn bitor_assign(&mut self, rhs: &Tube) {
        self.zip_tube(rhs, |y, r| y | r);
    }
}

impl BitAndAssign<Interval> for Tube {
    fn bitand_assign(&mut self, rhs: Interval) {
        self.apply_pointwise(|y| y & rhs);
    }
}

impl BitOrAssign<Interval> for Tube {
    fn bitor_assign(&mut self, rhs: Interval) {
        self.apply_pointwise(|y| y | rhs);
    }
}

macro_rules! tube_binary_ops {
    ($($trait:ident :: $method:ident => $assign:ident),*) => {$(
        impl $trait<&Tube> for &Tube {
            type Output = Tube;
            fn $method(self, rhs: &Tube) -> Tube {
                let mut out = self.clone();
                out.$assign(rhs);
                out
            }
        }
        impl $trait<Interval> for &Tube {
            type Output = Tube;
            fn $method(self, rhs: Interval) -> Tube {
                let mut out = self.clone();
                out.$assign(rhs);
                out
            }
        }
        impl $trait<&Trajectory> for &Tube {
            type Output = Tube;
            fn $method(self, rhs: &Trajectory) -> Tube {
                let mut out = self.clone();
                out.$assign(rhs);
                out
            }
        }
    )*};
}

tube_binary_ops!(
    Add::add => add_assign,
    Sub::sub => sub_assign,
    Mul::mul => mul_assign,
    Div::div => div_assign
);

impl BitAnd<&Tube> for &Tube {
    type Output = Tube;
    fn bitand(self, rhs: &Tube) -> Tube {
        let mut out = self.clone();
        out &= rhs;
        out
    }
}

impl BitOr<&Tube> for &Tube {
    type Output = Tube;
    fn bitor(self, rhs: &Tube) -> Tube {
        let mut out = self.clone();
        out |= rhs;
        out
    }
}
