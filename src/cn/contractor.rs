//! Contractor records of a network.
//!
//! A record is a tagged sum: the closed set of contractor kinds is small, so
//! dispatch is one match on the tag and the record only carries what its
//! kind needs. Records over tubes and vectors are produced by the network's
//! add-time decomposition; see `cn::ContractorNetwork::add`.

use super::domain::Domain;
use crate::ctc::{CtcDeriv, CtcEval, StaticCtc};
use crate::interval::{Interval, IntervalVector};
use core::fmt;
use std::rc::Rc;

/// A contractor as handed to [`ContractorNetwork::add`](super::ContractorNetwork::add).
#[derive(Clone)]
pub enum Ctc {
    /// An algebraic contractor over interval boxes (user-supplied
    /// functions, distance, ...). Bound to interval, vector and tube
    /// domains; tube domains are decomposed slice-wise.
    Static(Rc<dyn StaticCtc>),
    /// The differential contractor `ẋ ∈ v` on a pair of tubes.
    Deriv,
    /// The evaluation contractor `y ∈ x(t)` on `(t, y, x, v)`.
    Eval,
}

impl fmt::Debug for Ctc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ctc::Static(ctc) => write!(f, "Ctc::Static(arity {})", ctc.arity()),
            Ctc::Deriv => write!(f, "Ctc::Deriv"),
            Ctc::Eval => write!(f, "Ctc::Eval"),
        }
    }
}

/// What a stored record executes.
pub(crate) enum CtcKind {
    Static { ctc: Rc<dyn StaticCtc>, component: Option<usize> },
    DerivSlice,
    Eval(CtcEval),
    Equality,
    Component,
}

pub(crate) struct Contractor {
    pub(crate) kind: CtcKind,
    pub(crate) domains: Vec<Domain>,
}

impl Contractor {
    /// Identity for deduplication: same contractor (per kind; static ones by
    /// address and component) over the same domain set, order ignored.
    pub(crate) fn same_as(&self, other: &Contractor) -> bool {
        let kinds_match = match (&self.kind, &other.kind) {
            (
                CtcKind::Static { ctc: a, component: ka },
                CtcKind::Static { ctc: b, component: kb },
            ) => Rc::ptr_eq(a, b) && ka == kb,
            (CtcKind::DerivSlice, CtcKind::DerivSlice) => true,
            (CtcKind::Eval(_), CtcKind::Eval(_)) => true,
            (CtcKind::Equality, CtcKind::Equality) => true,
            (CtcKind::Component, CtcKind::Component) => true,
            _ => false,
        };
        kinds_match
            && self.domains.len() == other.domains.len()
            && self.domains.iter().all(|d| other.domains.contains(d))
    }

    /// Execute the record on its bound domains.
    pub(crate) fn call(&self) {
        match &self.kind {
            CtcKind::Static { ctc, component } => self.call_static(ctc.as_ref(), *component),
            CtcKind::DerivSlice => self.call_deriv_slice(),
            CtcKind::Eval(eval) => self.call_eval(eval),
            CtcKind::Equality => self.call_equality(),
            CtcKind::Component => {} // symbolic link, no value change of its own
        }
    }

    fn call_static(&self, ctc: &dyn StaticCtc, component: Option<usize>) {
        let has_slice = self.domains.iter().any(|d| matches!(d, Domain::Slice(_, _)));
        // slices expose three subdomains (envelope and both gates), each of
        // which goes through the box contraction once
        let passes = if has_slice { 3 } else { 1 };
        for pass in 0..passes {
            let mut vals: Vec<Interval> = Vec::with_capacity(ctc.arity());
            for d in &self.domains {
                match d {
                    Domain::Interval(v) => vals.push(v.get()),
                    Domain::Component(v, i) => vals.push(v.borrow()[*i]),
                    Domain::Vector(v) => match component {
                        Some(k) => vals.push(v.borrow()[k]),
                        None => vals.extend(v.borrow().iter().copied()),
                    },
                    Domain::Slice(v, i) => {
                        let tube = v.borrow();
                        vals.push(match pass {
                            0 => tube.slice_codomain(*i),
                            1 => tube.input_gate(*i),
                            _ => tube.output_gate(*i),
                        });
                    }
                    Domain::Tube(_) | Domain::TubeVector(_) => {
                        unreachable!("dynamic domains are decomposed before execution")
                    }
                }
            }
            assert_eq!(
                vals.len(),
                ctc.arity(),
                "contractor arity does not match its bound domains"
            );
            let mut vars = IntervalVector::from_intervals(vals);
            ctc.contract(&mut vars);

            let mut idx = 0;
            for d in &self.domains {
                match d {
                    Domain::Interval(v) => {
                        v.update(|x| *x &= vars[idx]);
                        idx += 1;
                    }
                    Domain::Component(v, i) => {
                        let i = *i;
                        v.update(|x| x[i] &= vars[idx]);
                        idx += 1;
                    }
                    Domain::Vector(v) => match component {
                        Some(k) => {
                            v.update(|x| x[k] &= vars[idx]);
                            idx += 1;
                        }
                        None => {
                            let size = v.borrow().size();
                            v.update(|x| {
                                for k in 0..size {
                                    x[k] &= vars[idx + k];
                                }
                            });
                            idx += size;
                        }
                    },
                    Domain::Slice(v, i) => {
                        let i = *i;
                        let y = vars[idx];
                        v.update(|tube| match pass {
                            0 => tube.set_envelope(i, y),
                            1 => tube.set_input_gate(i, y),
                            _ => tube.set_output_gate(i, y),
                        });
                        idx += 1;
                    }
                    Domain::Tube(_) | Domain::TubeVector(_) => unreachable!(),
                }
            }
        }
    }

    fn call_deriv_slice(&self) {
        let (Domain::Slice(x, i), Domain::Slice(v, j)) = (&self.domains[0], &self.domains[1])
        else {
            unreachable!("derivative slice records bind two slices")
        };
        debug_assert_eq!(i, j);
        CtcDeriv::new().contract_slice(&mut x.borrow_mut(), &v.borrow(), *i);
    }

    fn call_eval(&self, eval: &CtcEval) {
        let (Domain::Interval(t), Domain::Interval(y), Domain::Tube(x), Domain::Tube(v)) =
            (&self.domains[0], &self.domains[1], &self.domains[2], &self.domains[3])
        else {
            unreachable!("evaluation records bind (t, y, x, v)")
        };
        eval.contract(&mut t.borrow_mut(), &mut y.borrow_mut(), &mut x.borrow_mut(), &v.borrow());
    }

    fn call_equality(&self) {
        assert_eq!(self.domains.len(), 2, "equality binds exactly two domains");
        let (a, b) = (&self.domains[0], &self.domains[1]);
        if a == b {
            return;
        }
        match (a, b) {
            (
                Domain::Interval(_) | Domain::Component(_, _),
                Domain::Interval(_) | Domain::Component(_, _),
            ) => {
                let meet = read_interval(a).meet(&read_interval(b));
                write_interval(a, meet);
                write_interval(b, meet);
            }
            (Domain::Vector(va), Domain::Vector(vb)) => {
                let meet = va.borrow().meet(&vb.borrow());
                va.set(meet.clone());
                vb.set(meet);
            }
            (Domain::Tube(ta), Domain::Tube(tb)) => {
                let meet = &*ta.borrow() & &*tb.borrow();
                ta.set(meet.clone());
                tb.set(meet);
            }
            (Domain::TubeVector(ta), Domain::TubeVector(tb)) => {
                let meet = ta.borrow().meet(&tb.borrow());
                ta.set(meet.clone());
                tb.set(meet);
            }
            _ => panic!("equality between {} and {} domains", a.kind_name(), b.kind_name()),
        }
    }

    /// Canonical display name; `static_name` is the user-given name of the
    /// wrapped static contractor, if any.
    pub(crate) fn name(&self, static_name: Option<&str>) -> String {
        match &self.kind {
            CtcKind::Component => String::new(),
            CtcKind::Equality => "=".into(),
            CtcKind::Eval(_) => "\\mathcal{C}_{\\textrm{eval}}".into(),
            CtcKind::DerivSlice => "\\mathcal{C}_{\\frac{d}{dt}}".into(),
            CtcKind::Static { .. } => {
                format!("\\mathcal{{C}}_{{{}}}", static_name.unwrap_or(""))
            }
        }
    }
}

fn read_interval(d: &Domain) -> Interval {
    match d {
        Domain::Interval(v) => v.get(),
        Domain::Component(v, i) => v.borrow()[*i],
        _ => unreachable!(),
    }
}

fn write_interval(d: &Domain, value: Interval) {
    match d {
        Domain::Interval(v) => v.set(value),
        Domain::Component(v, i) => {
            let i = *i;
            v.update(|x| x[i] = value);
        }
        _ => unreachable!(),
    }
}
