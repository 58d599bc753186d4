#![doc = include_str!("../README.md")]
#![warn(
    anonymous_parameters,
    missing_debug_implementations,
    nonstandard_style,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_qualifications
)]

#[macro_use]
extern crate assert_float_eq;

pub mod cn;
pub mod ctc;
pub mod interval;
pub mod trajectory;
pub mod tube;
pub mod utils;

pub use cn::{Ctc, ContractorNetwork, Domain, Var};
pub use ctc::{CtcDeriv, CtcDist, CtcEval, StaticCtc};
pub use interval::{Interval, IntervalVector};
pub use trajectory::Trajectory;
pub use tube::{Tube, TubeVector};
