//! Binary storage of tubes.
//!
//! Little-endian layout: magic `"TUBE"`, `version:u16`, `n_slices:u32`,
//! `t0:f64`, `tf:f64`, then one `(lb, ub)` pair per slice codomain, one per
//! gate (`n_slices + 1`) and optionally a trailing sampled trajectory
//! (`n_points:u32` then `(t, y)` pairs). Empty intervals are stored as
//! `(+inf, -inf)`. The format carries no interior boundaries, so only
//! equidistant slicings are storable.

use super::error::{IoFailure, TubeFileError, WrongFormat};
use super::Tube;
use crate::interval::Interval;
use crate::trajectory::Trajectory;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"TUBE";
const VERSION: u16 = 1;

impl Tube {
    /// Write the tube to `path`.
    ///
    /// Fails with [`TubeFileError::WrongFormat`] when the slicing is not
    /// equidistant, since the format cannot represent it.
    pub fn serialize<P: AsRef<Path>>(&self, path: P) -> Result<(), TubeFileError> {
        self.write_file(path.as_ref(), None)
    }

    /// Write the tube and an attached sampled trajectory to `path`.
    pub fn serialize_with<P: AsRef<Path>>(
        &self,
        path: P,
        traj: &Trajectory,
    ) -> Result<(), TubeFileError> {
        self.write_file(path.as_ref(), Some(traj))
    }

    /// Read back a tube (and its attached trajectory, if any) from `path`.
    pub fn deserialize<P: AsRef<Path>>(
        path: P,
    ) -> Result<(Tube, Option<Trajectory>), TubeFileError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| IoFailure { path: path.into(), source })?;
        let mut r = Reader { inner: BufReader::new(file), path };

        let mut magic = [0u8; 4];
        r.read_bytes(&mut magic)?;
        if &magic != MAGIC {
            return Err(wrong(path, "bad magic number"));
        }
        let version = r.read_u16()?;
        if version != VERSION {
            return Err(wrong(path, format!("unsupported version {version}")));
        }
        let n = r.read_u32()? as usize;
        if n == 0 {
            return Err(wrong(path, "tube without slices"));
        }
        let t0 = r.read_f64()?;
        let tf = r.read_f64()?;
        let tdomain = Interval::new(t0, tf);
        if tdomain.is_empty() || tdomain.is_degenerate() || tdomain.is_unbounded() {
            return Err(wrong(path, format!("invalid time domain [{t0}, {tf}]")));
        }
        let timestep = (tf - t0) / n as f64;
        let mut tube = Tube::with_codomain(tdomain, timestep, Interval::ALL_REALS);
        if tube.nb_slices() != n {
            return Err(wrong(path, "inconsistent slice count"));
        }
        for i in 0..n {
            tube.codomains[i] = r.read_interval()?;
        }
        for k in 0..=n {
            tube.gates[k] = r.read_interval()?;
        }
        tube.rebuild_synthesis();

        // the trailing trajectory block is optional; a clean end of file
        // right here simply means there is none
        let mut buf = [0u8; 4];
        let traj = match r.inner.read_exact(&mut buf) {
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => None,
            Err(source) => return Err(IoFailure { path: path.into(), source }.into()),
            Ok(()) => {
                let n_points = u32::from_le_bytes(buf);
                let mut knots = Vec::with_capacity(n_points as usize);
                let mut values = Vec::with_capacity(n_points as usize);
                for _ in 0..n_points {
                    knots.push(r.read_f64()?);
                    values.push(r.read_f64()?);
                }
                Some(
                    Trajectory::from_samples(knots, values)
                        .map_err(|e| wrong(path, e.to_string()))?,
                )
            }
        };
        Ok((tube, traj))
    }

    fn write_file(&self, path: &Path, traj: Option<&Trajectory>) -> Result<(), TubeFileError> {
        let n = self.nb_slices();
        let tdomain = self.tdomain();
        let timestep = tdomain.diam() / n as f64;
        let uniform: Vec<f64> = (0..n)
            .map(|i| tdomain.lb() + i as f64 * timestep)
            .chain([tdomain.ub()])
            .collect();
        if self.bounds != uniform {
            return Err(wrong(path, "only equidistant slicings can be serialized"));
        }
        let samples = match traj {
            Some(t) => Some(t.samples().ok_or_else(|| {
                wrong(path, "function-backed trajectories cannot be serialized")
            })?),
            None => None,
        };

        let file = File::create(path).map_err(|source| IoFailure { path: path.into(), source })?;
        let mut w = Writer { inner: BufWriter::new(file), path };
        w.write_bytes(MAGIC)?;
        w.write_u16(VERSION)?;
        w.write_u32(n as u32)?;
        w.write_f64(tdomain.lb())?;
        w.write_f64(tdomain.ub())?;
        for c in &self.codomains {
            w.write_interval(c)?;
        }
        for g in &self.gates {
            w.write_interval(g)?;
        }
        if let Some((knots, values)) = samples {
            w.write_u32(knots.len() as u32)?;
            for (t, y) in knots.iter().zip(values) {
                w.write_f64(*t)?;
                w.write_f64(*y)?;
            }
        }
        w.inner.flush().map_err(|source| IoFailure { path: path.into(), source })?;
        Ok(())
    }
}

fn wrong(path: &Path, detail: impl Into<String>) -> TubeFileError {
    TubeFileError::WrongFormat(WrongFormat { path: path.into(), detail: detail.into() })
}

struct Writer<'a> {
    inner: BufWriter<File>,
    path: &'a Path,
}

impl Writer<'_> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TubeFileError> {
        self.inner
            .write_all(bytes)
            .map_err(|source| IoFailure { path: self.path.into(), source }.into())
    }

    fn write_u16(&mut self, v: u16) -> Result<(), TubeFileError> {
        self.write_bytes(&v.to_le_bytes())
    }

    fn write_u32(&mut self, v: u32) -> Result<(), TubeFileError> {
        self.write_bytes(&v.to_le_bytes())
    }

    fn write_f64(&mut self, v: f64) -> Result<(), TubeFileError> {
        self.write_bytes(&v.to_le_bytes())
    }

    fn write_interval(&mut self, v: &Interval) -> Result<(), TubeFileError> {
        self.write_f64(v.lb())?;
        self.write_f64(v.ub())
    }
}

struct Reader<'a> {
    inner: BufReader<File>,
    path: &'a Path,
}

impl Reader<'_> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), TubeFileError> {
        self.inner
            .read_exact(buf)
            .map_err(|source| IoFailure { path: self.path.into(), source }.into())
    }

    fn read_u16(&mut self) -> Result<u16, TubeFileError> {
        let mut buf = [0u8; 2];
        self.read_bytes(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(&mut self) -> Result<u32, TubeFileError> {
        let mut buf = [0u8; 4];
        self.read_bytes(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_f64(&mut self) -> Result<f64, TubeFileError> {
        let mut buf = [0u8; 8];
        self.read_bytes(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    fn read_interval(&mut self) -> Result<Interval, TubeFileError> {
        let lb = self.read_f64()?;
        let ub = self.read_f64()?;
        Ok(Interval::new(lb, ub))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.tube");
        let mut tube = Tube::with_codomain(Interval::new(0.0, 20.0), 5.0, Interval::new(-10.0, 10.0));
        tube.set_envelope(1, Interval::new(-2.0, 3.0));
        tube.set_input_gate(2, Interval::EMPTY);
        tube.serialize(&path).unwrap();
        let (back, traj) = Tube::deserialize(&path).unwrap();
        assert_eq!(back, tube);
        assert!(traj.is_none());
        assert!(back.input_gate(2).is_empty());
    }

    #[test]
    fn roundtrip_with_trajectory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xt.tube");
        let tube = Tube::with_codomain(Interval::new(0.0, 4.0), 1.0, Interval::new(0.0, 1.0));
        let traj = Trajectory::from_samples(vec![0.0, 2.0, 4.0], vec![0.5, 0.2, 0.9]).unwrap();
        tube.serialize_with(&path, &traj).unwrap();
        let (back, read_traj) = Tube::deserialize(&path).unwrap();
        assert_eq!(back, tube);
        assert_eq!(read_traj.unwrap(), traj);
    }

    #[test]
    fn rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tube");
        std::fs::write(&path, b"NOTATUBE").unwrap();
        match Tube::deserialize(&path) {
            Err(TubeFileError::WrongFormat(e)) => {
                assert!(e.to_string().contains("magic"));
            }
            other => panic!("expected a format error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_uniform_slicing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sampled.tube");
        let mut tube = Tube::with_codomain(Interval::new(0.0, 4.0), 1.0, Interval::new(0.0, 1.0));
        tube.sample(0.5);
        assert!(matches!(tube.serialize(&path), Err(TubeFileError::WrongFormat(_))));
    }

    #[test]
    fn rejects_function_trajectory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fn.tube");
        let tube = Tube::with_codomain(Interval::new(0.0, 4.0), 1.0, Interval::new(0.0, 1.0));
        let traj = Trajectory::from_fn(Interval::new(0.0, 4.0), |t| t);
        assert!(matches!(tube.serialize_with(&path, &traj), Err(TubeFileError::WrongFormat(_))));
    }

    #[test]
    fn missing_file_reports_path() {
        match Tube::deserialize("/nonexistent/dir/x.tube") {
            Err(TubeFileError::Io(e)) => assert!(e.to_string().contains("x.tube")),
            other => panic!("expected an io error, got {other:?}"),
        }
    }
}
