//! Point-valued reference signals.
//!
//! A [`Trajectory`] is a single real signal of time, used as ground truth in
//! tests, as a data carrier for measured signals and as a building block for
//! tube construction. It is either *sampled* (sorted time knots with one
//! value each, piecewise-linear in between) or a *time function* evaluated
//! through interval arithmetic.

use crate::interval::Interval;
use crate::utils::{lerp, strict_upper_bound};
use core::fmt;
use core::ops::{Add, Div, Mul, Sub};
use std::error::Error;
use std::rc::Rc;

/// A time function usable both for point and for range evaluation.
pub type TimeFn = Rc<dyn Fn(Interval) -> Interval>;

#[derive(Clone)]
enum TrajData {
    Sampled { knots: Vec<f64>, values: Vec<f64> },
    Func(TimeFn),
}

/// A point-valued signal over a closed time domain.
#[derive(Clone)]
pub struct Trajectory {
    domain: Interval,
    data: TrajData,
}

impl Trajectory {
    /// Create a sampled trajectory from matching knot and value collections.
    /// Knots have to be strictly increasing and there has to be at least one
    /// sample.
    pub fn from_samples<K, V>(knots: K, values: V) -> Result<Self, TrajectoryError>
    where
        K: IntoIterator<Item = f64>,
        V: IntoIterator<Item = f64>,
    {
        let knots: Vec<f64> = knots.into_iter().collect();
        let values: Vec<f64> = values.into_iter().collect();
        if knots.is_empty() {
            return Err(TrajectoryError::EmptyTrajectory(EmptyTrajectory));
        }
        if knots.len() != values.len() {
            return Err(TrajectoryError::SampleCountMismatch(SampleCountMismatch::new(
                knots.len(),
                values.len(),
            )));
        }
        if knots.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TrajectoryError::NotSorted(NotSorted));
        }
        let domain = Interval::new(knots[0], knots[knots.len() - 1]);
        Ok(Trajectory { domain, data: TrajData::Sampled { knots, values } })
    }

    /// Create a trajectory from a time function over the given domain.
    ///
    /// The function receives a time interval and must return an enclosure of
    /// its image; point evaluation goes through a degenerate interval.
    pub fn from_fn<F>(domain: Interval, f: F) -> Self
    where
        F: Fn(Interval) -> Interval + 'static,
    {
        assert!(!domain.is_empty(), "a trajectory needs a non-empty domain");
        Trajectory { domain, data: TrajData::Func(Rc::new(f)) }
    }

    /// The time domain.
    pub fn domain(&self) -> Interval {
        self.domain
    }

    /// Enclosure of all values taken over the whole domain.
    pub fn codomain(&self) -> Interval {
        self.eval(self.domain)
    }

    /// True if the trajectory is backed by samples rather than a function.
    pub fn is_sampled(&self) -> bool {
        matches!(self.data, TrajData::Sampled { .. })
    }

    /// The sampled knots and values, if any.
    pub fn samples(&self) -> Option<(&[f64], &[f64])> {
        match &self.data {
            TrajData::Sampled { knots, values } => Some((knots, values)),
            TrajData::Func(_) => None,
        }
    }

    /// Point evaluation.
    ///
    /// # Panics
    ///
    /// Panics if `t` is outside the domain.
    pub fn at(&self, t: f64) -> f64 {
        assert!(self.domain.contains(t), "time {t} outside the trajectory domain {}", self.domain);
        match &self.data {
            TrajData::Sampled { knots, values } => {
                if knots.len() == 1 {
                    return values[0];
                }
                let hi = strict_upper_bound(knots, t).clamp(1, knots.len() - 1);
                let lo = hi - 1;
                let factor = (t - knots[lo]) / (knots[hi] - knots[lo]);
                lerp(values[lo], values[hi], factor)
            }
            TrajData::Func(f) => f(Interval::point(t)).mid(),
        }
    }

    /// Enclosure of the values taken over `t ∩ domain`; empty if the
    /// restriction is empty.
    pub fn eval(&self, t: Interval) -> Interval {
        let t = t.meet(&self.domain);
        if t.is_empty() {
            return Interval::EMPTY;
        }
        match &self.data {
            TrajData::Sampled { knots, values } => {
                // extremes of a piecewise-linear signal sit on knots or on
                // the evaluation endpoints
                let mut hull = Interval::point(self.at(t.lb()));
                hull |= Interval::point(self.at(t.ub()));
                for (i, &k) in knots.iter().enumerate() {
                    if k > t.lb() && k < t.ub() {
                        hull |= Interval::point(values[i]);
                    }
                }
                hull
            }
            TrajData::Func(f) => f(t),
        }
    }

    /// Add or replace a sample.
    ///
    /// # Panics
    ///
    /// Panics on a function-backed trajectory.
    pub fn set(&mut self, t: f64, y: f64) {
        match &mut self.data {
            TrajData::Sampled { knots, values } => {
                let pos = strict_upper_bound(knots, t);
                if pos > 0 && knots[pos - 1] == t {
                    values[pos - 1] = y;
                } else {
                    knots.insert(pos, t);
                    values.insert(pos, y);
                }
                self.domain = Interval::new(knots[0], knots[knots.len() - 1]);
            }
            TrajData::Func(_) => panic!("cannot add samples to a function-backed trajectory"),
        }
    }

    /// Restrict the domain to `domain ∩ window`, interpolating new boundary
    /// samples where needed.
    pub fn truncate_domain(&mut self, window: Interval) {
        let new_domain = self.domain.meet(&window);
        assert!(!new_domain.is_empty(), "truncation window does not meet the domain");
        if let TrajData::Sampled { .. } = self.data {
            let lb_value = self.at(new_domain.lb());
            let ub_value = self.at(new_domain.ub());
            if let TrajData::Sampled { knots, values } = &mut self.data {
                let mut kept: Vec<(f64, f64)> = knots
                    .iter()
                    .zip(values.iter())
                    .filter(|(k, _)| new_domain.contains(**k))
                    .map(|(k, v)| (*k, *v))
                    .collect();
                if kept.first().map(|(k, _)| *k) != Some(new_domain.lb()) {
                    kept.insert(0, (new_domain.lb(), lb_value));
                }
                if kept.last().map(|(k, _)| *k) != Some(new_domain.ub()) {
                    kept.push((new_domain.ub(), ub_value));
                }
                *knots = kept.iter().map(|(k, _)| *k).collect();
                *values = kept.iter().map(|(_, v)| *v).collect();
            }
        }
        self.domain = new_domain;
    }

    /// Shift the time reference so that `shift_ref` becomes the new origin.
    pub fn shift_domain(&mut self, shift_ref: f64) {
        self.domain = Interval::new(self.domain.lb() - shift_ref, self.domain.ub() - shift_ref);
        match &mut self.data {
            TrajData::Sampled { knots, .. } => {
                for k in knots.iter_mut() {
                    *k -= shift_ref;
                }
            }
            TrajData::Func(f) => {
                let inner = f.clone();
                self.data = TrajData::Func(Rc::new(move |t| inner(t + shift_ref)));
            }
        }
    }
}

impl fmt::Debug for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            TrajData::Sampled { knots, .. } => {
                write!(f, "Trajectory({} samples over {})", knots.len(), self.domain)
            }
            TrajData::Func(_) => write!(f, "Trajectory(fn over {})", self.domain),
        }
    }
}

impl PartialEq for Trajectory {
    fn eq(&self, other: &Self) -> bool {
        if self.domain != other.domain {
            return false;
        }
        match (&self.data, &other.data) {
            (
                TrajData::Sampled { knots: k1, values: v1 },
                TrajData::Sampled { knots: k2, values: v2 },
            ) => k1 == k2 && v1 == v2,
            (TrajData::Func(f1), TrajData::Func(f2)) => Rc::ptr_eq(f1, f2),
            _ => false,
        }
    }
}

/// Merge the knot sets of two sampled trajectories and combine the
/// interpolated values pointwise.
fn zip_samples(a: &Trajectory, b: &Trajectory, f: impl Fn(f64, f64) -> f64) -> Trajectory {
    assert!(
        a.is_sampled() && b.is_sampled(),
        "trajectory arithmetic needs sampled operands"
    );
    assert_eq!(a.domain(), b.domain(), "trajectory domains differ");
    let (ka, _) = a.samples().unwrap();
    let (kb, _) = b.samples().unwrap();
    let mut knots: Vec<f64> = ka.iter().chain(kb.iter()).copied().collect();
    knots.sort_by(|x, y| x.partial_cmp(y).unwrap());
    knots.dedup();
    let values: Vec<f64> = knots.iter().map(|&t| f(a.at(t), b.at(t))).collect();
    Trajectory::from_samples(knots, values).unwrap()
}

macro_rules! traj_ops {
    ($($op:ident :: $method:ident),*) => {$(
        impl $op<&Trajectory> for &Trajectory {
            type Output = Trajectory;
            fn $method(self, rhs: &Trajectory) -> Trajectory {
                zip_samples(self, rhs, |x, y| x.$method(y))
            }
        }
        impl $op<f64> for &Trajectory {
            type Output = Trajectory;
            fn $method(self, rhs: f64) -> Trajectory {
                match &self.data {
                    TrajData::Sampled { knots, values } => Trajectory::from_samples(
                        knots.clone(),
                        values.iter().map(|v| v.$method(rhs)).collect::<Vec<_>>(),
                    )
                    .unwrap(),
                    TrajData::Func(f) => {
                        let inner = f.clone();
                        Trajectory::from_fn(self.domain, move |t| inner(t).$method(rhs))
                    }
                }
            }
        }
    )*};
}

traj_ops!(Add::add, Sub::sub, Mul::mul, Div::div);

/// Errors which can occur when creating a trajectory.
#[derive(Debug, Copy, Clone)]
pub enum TrajectoryError {
    /// Error returned if no sample at all was given.
    EmptyTrajectory(EmptyTrajectory),
    /// Error returned if knots are not strictly increasing.
    NotSorted(NotSorted),
    /// Error returned if the number of knots and values are not equal.
    SampleCountMismatch(SampleCountMismatch),
}

impl fmt::Display for TrajectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrajectoryError::EmptyTrajectory(inner) => inner.fmt(f),
            TrajectoryError::NotSorted(inner) => inner.fmt(f),
            TrajectoryError::SampleCountMismatch(inner) => inner.fmt(f),
        }
    }
}

impl Error for TrajectoryError {}

/// Error returned if a sampled trajectory was created without any sample.
#[derive(Debug, Copy, Clone)]
pub struct EmptyTrajectory;

impl fmt::Display for EmptyTrajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A sampled trajectory needs at least one sample.")
    }
}

impl Error for EmptyTrajectory {}

/// Error returned if trajectory knots are not strictly increasing.
#[derive(Debug, Copy, Clone)]
pub struct NotSorted;

impl fmt::Display for NotSorted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Trajectory knots have to be strictly increasing.")
    }
}

impl Error for NotSorted {}

/// Error returned if the number of values and the number of knots are not
/// matching.
#[derive(Debug, Copy, Clone)]
pub struct SampleCountMismatch {
    knots: usize,
    values: usize,
}

impl fmt::Display for SampleCountMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "There has to be as many values as knots, however we found {} knots and {} values.",
            self.knots, self.values
        )
    }
}

impl SampleCountMismatch {
    /// Create a new error with the number of knots and values found.
    pub fn new(knots: usize, values: usize) -> Self {
        SampleCountMismatch { knots, values }
    }
}

impl Error for SampleCountMismatch {}
