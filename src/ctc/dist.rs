//! Distance contractor over boxes `(ax, ay, bx, by, d)`.

use super::StaticCtc;
use crate::interval::{Interval, IntervalVector};

/// Contractor enforcing `d = dist((ax, ay), (bx, by))` on a 5-component box.
///
/// Forward/backward propagation over the decomposition
/// `d² = (ax - bx)² + (ay - by)²`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CtcDist;

impl CtcDist {
    pub fn new() -> Self {
        CtcDist
    }
}

/// Backward step of `s = q²`: contract `q` knowing `s`.
fn sqr_bwd(q: Interval, s: Interval) -> Interval {
    let root = s.sqrt();
    (q.meet(&root)).hull(&q.meet(&-root))
}

impl StaticCtc for CtcDist {
    fn arity(&self) -> usize {
        5
    }

    fn contract(&self, vars: &mut IntervalVector) {
        assert_eq!(vars.size(), 5, "distance contraction needs (ax, ay, bx, by, d)");
        let (ax, ay, bx, by, d) = (vars[0], vars[1], vars[2], vars[3], vars[4]);

        // forward
        let dx = ax - bx;
        let dy = ay - by;
        let a2 = dx.sqr();
        let b2 = dy.sqr();
        let s = a2 + b2;
        let d = d.meet(&s.sqrt());

        // backward
        let s = s.meet(&d.sqr());
        let a2 = a2.meet(&(s - b2));
        let b2 = b2.meet(&(s - a2));
        let dx = sqr_bwd(dx, a2);
        let dy = sqr_bwd(dy, b2);
        let ax = ax.meet(&(dx + bx));
        let bx = bx.meet(&(ax - dx));
        let ay = ay.meet(&(dy + by));
        let by = by.meet(&(ay - dy));

        vars[0] = ax;
        vars[1] = ay;
        vars[2] = bx;
        vars[3] = by;
        vars[4] = d;
    }
}
