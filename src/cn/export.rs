//! Dot export of the variable/contractor graph.
//!
//! Variables render as boxes, contractors as circles, edges carry no
//! labels; LaTeX-style contractor names are written as-is so that external
//! tooling can typeset them.

use super::ContractorNetwork;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

impl ContractorNetwork {
    /// The bipartite graph in dot syntax.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("graph cn {\n");
        out.push_str("  node [fontname=\"Helvetica\"];\n");
        for (i, d) in self.domain_entries() {
            let label = match self.domain_name(d) {
                Some(name) => name.to_string(),
                None => format!("{d}"),
            };
            out.push_str(&format!("  v{i} [shape=box, label=\"{}\"];\n", escape(&label)));
        }
        for (ci, c) in self.contractor_records().iter().enumerate() {
            let label = self.contractor_name(c);
            out.push_str(&format!("  c{ci} [shape=circle, label=\"{}\"];\n", escape(&label)));
        }
        for (ci, c) in self.contractor_records().iter().enumerate() {
            for d in &c.domains {
                let di = self.index_of[&d.id()];
                out.push_str(&format!("  c{ci} -- v{di};\n"));
            }
        }
        out.push_str("}\n");
        out
    }

    /// Write the dot graph to `path`.
    pub fn write_dot_graph<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(self.to_dot().as_bytes())
    }
}

/// Escape dot label text; backslashes of LaTeX names are preserved.
fn escape(label: &str) -> String {
    label.replace('"', "\\\"")
}

#[cfg(test)]
mod test {
    use super::super::{Ctc, ContractorNetwork, Domain, Var};
    use crate::ctc::StaticCtc;
    use crate::interval::{Interval, IntervalVector};
    use crate::tube::Tube;
    use std::rc::Rc;

    struct CtcNoop;
    impl StaticCtc for CtcNoop {
        fn arity(&self) -> usize {
            2
        }
        fn contract(&self, _vars: &mut IntervalVector) {}
    }

    #[test]
    fn bipartite_dot_output() {
        let a = Var::new(Interval::new(0.0, 1.0));
        let b = Var::new(Interval::new(0.0, 1.0));
        let mut cn = ContractorNetwork::new();
        let ctc: Rc<dyn StaticCtc> = Rc::new(CtcNoop);
        cn.add(Ctc::Static(ctc.clone()), &[Domain::from(&a), Domain::from(&b)]);
        cn.set_name(&a, "x_1");
        cn.set_ctc_name(&ctc, "f");
        let dot = cn.to_dot();
        assert!(dot.starts_with("graph cn {"));
        assert!(dot.contains("shape=box, label=\"x_1\""));
        assert!(dot.contains("shape=circle, label=\"\\mathcal{C}_{f}\""));
        assert!(dot.contains("c0 -- v0;"));
        assert!(dot.contains("c0 -- v1;"));
    }

    #[test]
    fn canonical_names() {
        let dom = Interval::new(0.0, 4.0);
        let x = Var::new(Tube::new(dom, 1.0));
        let v = Var::new(Tube::new(dom, 1.0));
        let t = Var::new(Interval::point(1.0));
        let z = Var::new(Interval::point(0.0));
        let mut cn = ContractorNetwork::new();
        cn.add(Ctc::Deriv, &[Domain::from(&x), Domain::from(&v)]);
        cn.add(Ctc::Eval, &[(&t).into(), (&z).into(), (&x).into(), (&v).into()]);
        let dot = cn.to_dot();
        assert!(dot.contains("\\mathcal{C}_{\\frac{d}{dt}}"));
        assert!(dot.contains("\\mathcal{C}_{\\textrm{eval}}"));
        // component links render with an empty label
        assert!(dot.contains("label=\"\""));
    }

    #[test]
    fn file_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cn.dot");
        let cn = ContractorNetwork::new();
        cn.write_dot_graph(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("graph cn"));
    }
}
