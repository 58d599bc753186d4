//! Interval boxes: fixed-dimension vectors of intervals.

use super::Interval;
use core::fmt;
use core::ops::{Add, Index, IndexMut, Sub};

/// An axis-aligned box, one [`Interval`] per component.
///
/// A box is empty as soon as one component is empty; set operations keep the
/// dimension fixed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct IntervalVector {
    components: Vec<Interval>,
}

impl IntervalVector {
    /// A box of `n` copies of `value`.
    pub fn new(n: usize, value: Interval) -> Self {
        assert!(n > 0, "a box needs at least one component");
        IntervalVector { components: vec![value; n] }
    }

    /// A box of `n` unconstrained components.
    pub fn unbounded(n: usize) -> Self {
        IntervalVector::new(n, Interval::ALL_REALS)
    }

    /// A degenerate box from point coordinates.
    pub fn from_points(values: &[f64]) -> Self {
        assert!(!values.is_empty(), "a box needs at least one component");
        IntervalVector { components: values.iter().map(|&v| Interval::point(v)).collect() }
    }

    /// A box from explicit components.
    pub fn from_intervals(components: Vec<Interval>) -> Self {
        assert!(!components.is_empty(), "a box needs at least one component");
        IntervalVector { components }
    }

    pub fn size(&self) -> usize {
        self.components.len()
    }

    /// True if any component is empty.
    pub fn is_empty(&self) -> bool {
        self.components.iter().any(Interval::is_empty)
    }

    /// Empty every component.
    pub fn set_empty(&mut self) {
        for c in &mut self.components {
            *c = Interval::EMPTY;
        }
    }

    /// Componentwise intersection; dimensions must agree.
    pub fn meet(&self, other: &IntervalVector) -> IntervalVector {
        assert_eq!(self.size(), other.size(), "dimension mismatch");
        IntervalVector {
            components: self
                .components
                .iter()
                .zip(&other.components)
                .map(|(a, b)| a.meet(b))
                .collect(),
        }
    }

    /// Componentwise convex hull; dimensions must agree.
    pub fn hull(&self, other: &IntervalVector) -> IntervalVector {
        assert_eq!(self.size(), other.size(), "dimension mismatch");
        IntervalVector {
            components: self
                .components
                .iter()
                .zip(&other.components)
                .map(|(a, b)| a.hull(b))
                .collect(),
        }
    }

    pub fn is_subset(&self, other: &IntervalVector) -> bool {
        assert_eq!(self.size(), other.size(), "dimension mismatch");
        self.components.iter().zip(&other.components).all(|(a, b)| a.is_subset(b))
    }

    /// Sum of the component diameters; the volume notion used by the
    /// propagation loop.
    pub fn volume(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.components.iter().map(Interval::diam).sum()
    }

    /// The sub-box of components `i..=j`.
    pub fn subvector(&self, i: usize, j: usize) -> IntervalVector {
        assert!(i <= j && j < self.size(), "subvector indices out of range");
        IntervalVector { components: self.components[i..=j].to_vec() }
    }

    /// Write `other` into components starting at `i`.
    pub fn put(&mut self, i: usize, other: &IntervalVector) {
        assert!(i + other.size() <= self.size(), "put overflows the box");
        self.components[i..i + other.size()].copy_from_slice(&other.components);
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Interval> {
        self.components.iter()
    }
}

impl Index<usize> for IntervalVector {
    type Output = Interval;
    fn index(&self, i: usize) -> &Interval {
        &self.components[i]
    }
}

impl IndexMut<usize> for IntervalVector {
    fn index_mut(&mut self, i: usize) -> &mut Interval {
        &mut self.components[i]
    }
}

impl Add for IntervalVector {
    type Output = IntervalVector;
    fn add(self, rhs: IntervalVector) -> IntervalVector {
        assert_eq!(self.size(), rhs.size(), "dimension mismatch");
        IntervalVector {
            components: self.components.iter().zip(&rhs.components).map(|(a, b)| *a + *b).collect(),
        }
    }
}

impl Sub for IntervalVector {
    type Output = IntervalVector;
    fn sub(self, rhs: IntervalVector) -> IntervalVector {
        assert_eq!(self.size(), rhs.size(), "dimension mismatch");
        IntervalVector {
            components: self.components.iter().zip(&rhs.components).map(|(a, b)| *a - *b).collect(),
        }
    }
}

impl fmt::Display for IntervalVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, " ; ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, ")")
    }
}
