//! Contractor network: propagation of domain changes to a fixed point.
//!
//! The network is a bipartite graph of [`Domain`]s and contractor records.
//! Adding a contractor registers its domains (decomposing tube arguments
//! slice-wise and vector arguments component-wise) and pushes the new
//! records onto a FIFO propagation queue. [`ContractorNetwork::contract`]
//! pops records, executes them and re-enqueues the neighbours of every
//! domain whose volume shrank by more than the fixed-point ratio, until the
//! queue runs dry.

mod contractor;
mod domain;
mod export;

pub use contractor::Ctc;
pub use domain::{Domain, Var};

use crate::ctc::{CtcEval, StaticCtc};
use crate::interval::{Interval, IntervalVector};
use crate::tube::Tube;
use contractor::{Contractor, CtcKind};
use domain::DomainId;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use tracing::{debug, trace};

/// Default minimal relative shrinkage that re-enqueues downstream work.
const DEFAULT_FIXEDPOINT_RATIO: f64 = 0.005;

struct DomainEntry {
    domain: Domain,
    /// Persistent volume snapshot, updated whenever the domain is checked.
    volume: f64,
}

/// Streaming observation buffer of one tube (see
/// [`ContractorNetwork::add_data`]).
struct DataBuffer {
    /// Samples since the last committed boundary; the first entry is the
    /// value at that boundary once one slice has been completed.
    pending: Vec<(f64, Interval)>,
    last_time: Option<f64>,
    /// Index of the next slice boundary waiting to be crossed.
    next_boundary: usize,
}

/// The variable/contractor graph and its propagation queue.
pub struct ContractorNetwork {
    entries: Vec<DomainEntry>,
    index_of: HashMap<DomainId, usize>,
    contractors: Vec<Contractor>,
    /// Contractor indices registered on each domain, parallel to `entries`.
    dom_ctcs: Vec<Vec<usize>>,
    stack: VecDeque<usize>,
    in_stack: Vec<bool>,
    fixedpoint_ratio: f64,
    dom_names: HashMap<DomainId, String>,
    ctc_names: HashMap<usize, String>,
    buffers: HashMap<DomainId, DataBuffer>,
}

impl Default for ContractorNetwork {
    fn default() -> Self {
        ContractorNetwork::new()
    }
}

impl core::fmt::Debug for ContractorNetwork {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContractorNetwork")
            .field("domains", &self.entries.len())
            .field("contractors", &self.contractors.len())
            .field("in_stack", &self.stack.len())
            .finish()
    }
}

impl ContractorNetwork {
    pub fn new() -> Self {
        ContractorNetwork {
            entries: Vec::new(),
            index_of: HashMap::new(),
            contractors: Vec::new(),
            dom_ctcs: Vec::new(),
            stack: VecDeque::new(),
            in_stack: Vec::new(),
            fixedpoint_ratio: DEFAULT_FIXEDPOINT_RATIO,
            dom_names: HashMap::new(),
            ctc_names: HashMap::new(),
            buffers: HashMap::new(),
        }
    }

    pub fn nb_dom(&self) -> usize {
        self.entries.len()
    }

    pub fn nb_ctc(&self) -> usize {
        self.contractors.len()
    }

    pub fn nb_ctc_in_stack(&self) -> usize {
        self.stack.len()
    }

    /// Re-enqueue threshold in `[0, 1]`; `0` re-enqueues on any shrinkage.
    pub fn set_fixedpoint_ratio(&mut self, ratio: f64) {
        assert!((0.0..=1.0).contains(&ratio), "fixed-point ratio must lie in [0, 1]");
        self.fixedpoint_ratio = ratio;
    }

    /// Register a constant or intermediate interval owned by the network.
    pub fn create_interval(&mut self, value: Interval) -> Var<Interval> {
        let var = Var::new(value);
        self.register_domain(Domain::Interval(var.clone()));
        var
    }

    /// Register a constant or intermediate box owned by the network.
    pub fn create_vector(&mut self, value: IntervalVector) -> Var<IntervalVector> {
        let var = Var::new(value);
        self.register_domain(Domain::Vector(var.clone()));
        var
    }

    /// Name a domain for exports; registers it if needed. Naming a vector
    /// registers its components as well, like any vector registration.
    pub fn set_name(&mut self, domain: impl Into<Domain>, name: &str) {
        let domain = domain.into();
        self.register_domain(domain.clone());
        self.dom_names.insert(domain.id(), name.to_string());
    }

    /// Name a static contractor for exports.
    pub fn set_ctc_name(&mut self, ctc: &Rc<dyn StaticCtc>, name: &str) {
        self.ctc_names.insert(Rc::as_ptr(ctc) as *const () as usize, name.to_string());
    }

    /// Register a contractor over its domains.
    ///
    /// Tube arguments of `Deriv` and `Static` contractors are decomposed
    /// into per-slice records plus the component links keeping tube and
    /// slice volumes coherent; vector arguments of `Static` contractors are
    /// decomposed component-wise. Duplicate records (same contractor, same
    /// domain set by identity) are skipped.
    ///
    /// # Panics
    ///
    /// Panics on arity/kind mismatches and on tube arguments with different
    /// slicings; these are programming errors, not data conditions.
    pub fn add(&mut self, ctc: Ctc, domains: &[Domain]) {
        assert!(!domains.is_empty(), "a contractor needs at least one domain");
        match ctc {
            Ctc::Deriv => self.add_deriv(domains),
            Ctc::Eval => self.add_eval(domains),
            Ctc::Static(rc) => self.add_static(rc, domains),
        }
    }

    fn add_deriv(&mut self, domains: &[Domain]) {
        let [Domain::Tube(x), Domain::Tube(v)] = domains else {
            panic!("the derivative contractor binds two tubes (x, v)");
        };
        assert!(!x.same_storage(v), "derivative contraction of a tube against itself");
        let n = {
            let (tx, tv) = (x.borrow(), v.borrow());
            assert!(tx.same_slicing(&tv), "derivative contraction needs one shared slicing");
            tx.nb_slices()
        };
        self.register_domain(Domain::Tube(x.clone()));
        self.register_domain(Domain::Tube(v.clone()));
        for i in 0..n {
            let sx = Domain::Slice(x.clone(), i);
            let sv = Domain::Slice(v.clone(), i);
            self.add_record(Contractor {
                kind: CtcKind::Component,
                domains: vec![sx.clone(), Domain::Tube(x.clone())],
            });
            self.add_record(Contractor {
                kind: CtcKind::Component,
                domains: vec![sv.clone(), Domain::Tube(v.clone())],
            });
            self.add_record(Contractor { kind: CtcKind::DerivSlice, domains: vec![sx, sv] });
        }
    }

    fn add_eval(&mut self, domains: &[Domain]) {
        let [Domain::Interval(t), Domain::Interval(y), Domain::Tube(x), Domain::Tube(v)] = domains
        else {
            panic!("the evaluation contractor binds (t, y, x, v)");
        };
        assert!(!t.same_storage(y), "evaluation contraction needs distinct t and y variables");
        assert!(!x.same_storage(v), "evaluation contraction of a tube against itself");
        assert!(
            x.borrow().same_slicing(&v.borrow()),
            "evaluation contraction needs one shared slicing"
        );
        let mut eval = CtcEval::new();
        eval.preserve_slicing(true);
        self.add_record(Contractor { kind: CtcKind::Eval(eval), domains: domains.to_vec() });
    }

    fn add_static(&mut self, rc: Rc<dyn StaticCtc>, domains: &[Domain]) {
        let tubes: Vec<&Var<Tube>> = domains
            .iter()
            .filter_map(|d| match d {
                Domain::Tube(t) => Some(t),
                _ => None,
            })
            .collect();
        assert!(
            !domains.iter().any(|d| matches!(d, Domain::TubeVector(_) | Domain::Slice(_, _))),
            "static contractors bind intervals, vectors and tubes"
        );

        if !tubes.is_empty() {
            assert!(
                !domains.iter().any(|d| matches!(d, Domain::Vector(_))),
                "mixing vector and tube arguments in one static contractor"
            );
            let n = {
                let first = tubes[0].borrow();
                assert!(
                    tubes.iter().all(|t| t.borrow().same_slicing(&first)),
                    "static contraction over tubes needs one shared slicing"
                );
                first.nb_slices()
            };
            for t in &tubes {
                self.register_domain(Domain::Tube((*t).clone()));
            }
            for i in 0..n {
                let mut mapped = Vec::with_capacity(domains.len());
                for d in domains {
                    match d {
                        Domain::Tube(t) => {
                            let slice = Domain::Slice(t.clone(), i);
                            self.add_record(Contractor {
                                kind: CtcKind::Component,
                                domains: vec![slice.clone(), Domain::Tube(t.clone())],
                            });
                            mapped.push(slice);
                        }
                        other => mapped.push(other.clone()),
                    }
                }
                self.add_record(Contractor {
                    kind: CtcKind::Static { ctc: rc.clone(), component: None },
                    domains: mapped,
                });
            }
            return;
        }

        let vector_dims: Vec<usize> = domains
            .iter()
            .filter_map(|d| match d {
                Domain::Vector(v) => Some(v.borrow().size()),
                _ => None,
            })
            .collect();
        if !vector_dims.is_empty() {
            let dim = vector_dims[0];
            let broadcast = vector_dims.iter().all(|&d| d == dim) && rc.arity() == domains.len();
            if broadcast {
                // one record per component; records stay bound to the vector
                // domains so a component change re-triggers them through the
                // component links
                for k in 0..dim {
                    self.add_record(Contractor {
                        kind: CtcKind::Static { ctc: rc.clone(), component: Some(k) },
                        domains: domains.to_vec(),
                    });
                }
                return;
            }
            let flat: usize = domains
                .iter()
                .map(|d| match d {
                    Domain::Vector(v) => v.borrow().size(),
                    _ => 1,
                })
                .sum();
            assert_eq!(
                rc.arity(),
                flat,
                "static contractor arity matches neither the domain count nor the flattened size"
            );
            self.add_record(Contractor {
                kind: CtcKind::Static { ctc: rc, component: None },
                domains: domains.to_vec(),
            });
            return;
        }

        assert_eq!(rc.arity(), domains.len(), "static contractor arity mismatch");
        self.add_record(Contractor {
            kind: CtcKind::Static { ctc: rc, component: None },
            domains: domains.to_vec(),
        });
    }

    /// A stable sub-box view of `v`, kept coherent with `v` through
    /// per-component equality links.
    pub fn subvector(
        &mut self,
        v: &Var<IntervalVector>,
        i: usize,
        j: usize,
    ) -> Var<IntervalVector> {
        let sub = Var::new(v.borrow().subvector(i, j));
        self.register_domain(Domain::Vector(v.clone()));
        self.register_domain(Domain::Vector(sub.clone()));
        for k in 0..=(j - i) {
            self.add_record(Contractor {
                kind: CtcKind::Equality,
                domains: vec![
                    Domain::Component(sub.clone(), k),
                    Domain::Component(v.clone(), i + k),
                ],
            });
        }
        sub
    }

    /// Append one observation `y` of `tube` at time `t`. Buffered samples
    /// are committed slice by slice as boundaries are crossed: the completed
    /// slice receives a tight codomain and gates interpolated from the
    /// samples, and its contractors are triggered (together with the next
    /// slice's non-link contractors, whose input gate just changed).
    ///
    /// # Panics
    ///
    /// Panics if samples arrive in decreasing time order.
    pub fn add_data(&mut self, tube: &Var<Tube>, t: f64, y: Interval) {
        self.register_domain(Domain::Tube(tube.clone()));
        let id = Domain::Tube(tube.clone()).id();
        let bounds: Vec<f64> = tube.borrow().slice_bounds().to_vec();

        let mut completed: Vec<usize> = Vec::new();
        {
            let buf = self.buffers.entry(id).or_insert_with(|| DataBuffer {
                pending: Vec::new(),
                last_time: None,
                next_boundary: 1,
            });
            if let Some(t_last) = buf.last_time {
                assert!(t >= t_last, "data samples must arrive in nondecreasing time order");
            }
            while buf.next_boundary < bounds.len() && t >= bounds[buf.next_boundary] {
                let tb = bounds[buf.next_boundary];
                let slice = buf.next_boundary - 1;
                if let Some(prev) = buf.pending.last().copied() {
                    let yb = interp_sample(prev, (t, y), tb);
                    let mut hull = yb;
                    for (_, ys) in &buf.pending {
                        hull |= *ys;
                    }
                    let gate_in = buf
                        .pending
                        .first()
                        .filter(|(ts, _)| *ts == bounds[slice])
                        .map(|(_, ys)| *ys);
                    tube.update(|tu| {
                        tu.set_envelope(slice, hull);
                        if let Some(g) = gate_in {
                            tu.set_input_gate(slice, g);
                        }
                        tu.set_output_gate(slice, yb);
                    });
                    completed.push(slice);
                    buf.pending = vec![(tb, yb)];
                }
                buf.next_boundary += 1;
            }
            buf.pending.push((t, y));
            buf.last_time = Some(t);
        }

        for slice in completed {
            let sid = Domain::Slice(tube.clone(), slice).id();
            if let Some(&di) = self.index_of.get(&sid) {
                for cj in self.dom_ctcs[di].clone() {
                    self.push_ctc(cj);
                }
            }
            let nid = Domain::Slice(tube.clone(), slice + 1).id();
            if let Some(&di) = self.index_of.get(&nid) {
                for cj in self.dom_ctcs[di].clone() {
                    if !matches!(self.contractors[cj].kind, CtcKind::Component) {
                        self.push_ctc(cj);
                    }
                }
            }
        }
    }

    /// Push every contractor back onto the queue.
    pub fn trigger_all_contractors(&mut self) {
        for ci in 0..self.contractors.len() {
            self.push_ctc(ci);
        }
    }

    /// Run the propagation loop until the queue is empty.
    pub fn contract(&mut self) {
        while let Some(ci) = self.stack.pop_front() {
            self.in_stack[ci] = false;
            trace!(ctc = ci, in_stack = self.stack.len(), "contracting");
            self.contractors[ci].call();

            let domains = self.contractors[ci].domains.clone();
            let mut checked: Vec<usize> = Vec::with_capacity(domains.len());
            for d in &domains {
                let di = self.index_of[&d.id()];
                if checked.contains(&di) {
                    continue;
                }
                checked.push(di);
                let v1 = self.entries[di].domain.volume();
                let v0 = self.entries[di].volume;
                self.entries[di].volume = v1;
                let shrank = if v0 == 0.0 {
                    false
                } else if !v0.is_finite() {
                    v1.is_finite()
                } else if v1 < v0 {
                    (v0 - v1) / v0 >= self.fixedpoint_ratio
                } else {
                    false
                };
                if shrank {
                    for cj in self.dom_ctcs[di].clone() {
                        if cj != ci {
                            self.push_ctc(cj);
                        }
                    }
                }
            }
        }
        debug!(domains = self.entries.len(), contractors = self.contractors.len(), "fixed point reached");
    }

    pub(crate) fn domain_entries(&self) -> impl Iterator<Item = (usize, &Domain)> {
        self.entries.iter().enumerate().map(|(i, e)| (i, &e.domain))
    }

    pub(crate) fn contractor_records(&self) -> &[Contractor] {
        &self.contractors
    }

    pub(crate) fn domain_name(&self, d: &Domain) -> Option<&str> {
        self.dom_names.get(&d.id()).map(String::as_str)
    }

    pub(crate) fn contractor_name(&self, c: &Contractor) -> String {
        let static_name = match &c.kind {
            CtcKind::Static { ctc, .. } => self
                .ctc_names
                .get(&(Rc::as_ptr(ctc) as *const () as usize))
                .map(String::as_str),
            _ => None,
        };
        c.name(static_name)
    }

    fn push_ctc(&mut self, ci: usize) {
        if !self.in_stack[ci] {
            self.in_stack[ci] = true;
            self.stack.push_back(ci);
        }
    }

    /// Register a domain (dedup by storage identity) and return its index.
    /// Vector domains pull in their components plus one component-link
    /// record keeping vector and component volumes coherent.
    fn register_domain(&mut self, d: Domain) -> usize {
        if let Some(&i) = self.index_of.get(&d.id()) {
            return i;
        }
        let idx = self.entries.len();
        self.index_of.insert(d.id(), idx);
        let volume = d.volume();
        self.entries.push(DomainEntry { domain: d.clone(), volume });
        self.dom_ctcs.push(Vec::new());
        if let Domain::Vector(v) = &d {
            let size = v.borrow().size();
            let mut link = vec![d.clone()];
            for k in 0..size {
                let comp = Domain::Component(v.clone(), k);
                self.register_domain(comp.clone());
                link.push(comp);
            }
            self.add_record(Contractor { kind: CtcKind::Component, domains: link });
        }
        idx
    }

    /// Store a record unless an identical one exists; wire it to its domains
    /// and push it (initial-push policy).
    fn add_record(&mut self, rec: Contractor) {
        for d in &rec.domains {
            self.register_domain(d.clone());
        }
        if self.contractors.iter().any(|c| c.same_as(&rec)) {
            return;
        }
        let ci = self.contractors.len();
        for d in &rec.domains {
            let di = self.index_of[&d.id()];
            if !self.dom_ctcs[di].contains(&ci) {
                self.dom_ctcs[di].push(ci);
            }
        }
        self.contractors.push(rec);
        self.in_stack.push(false);
        self.push_ctc(ci);
    }
}

/// Piecewise-linear interpolation of a sample pair at `t`, per bound; the
/// exact multiply-then-divide order of the data layer.
fn interp_sample(prev: (f64, Interval), next: (f64, Interval), t: f64) -> Interval {
    if t == next.0 {
        return next.1;
    }
    if t == prev.0 || next.0 == prev.0 {
        return prev.1;
    }
    let lb = prev.1.lb() + (t - prev.0) * (next.1.lb() - prev.1.lb()) / (next.0 - prev.0);
    let ub = prev.1.ub() + (t - prev.0) * (next.1.ub() - prev.1.ub()) / (next.0 - prev.0);
    Interval::new(lb, ub)
}
