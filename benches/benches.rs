use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tubular::{CtcDeriv, Interval, Tube};

fn wavy_tube(n_slices: usize, synthesis: bool) -> Tube {
    let tdomain = Interval::new(0.0, n_slices as f64);
    let mut tube = Tube::from_fn(tdomain, 1.0, |t| t.sin().inflate(0.1));
    tube.enable_synthesis(synthesis);
    tube
}

fn evaluation(c: &mut Criterion) {
    let plain = wavy_tube(1024, false);
    let synth = wavy_tube(1024, true);
    let window = Interval::new(100.25, 900.75);

    c.bench_function("eval 1024 slices", |b| b.iter(|| black_box(plain.eval(black_box(window)))));
    c.bench_function("eval 1024 slices with synthesis", |b| {
        b.iter(|| black_box(synth.eval(black_box(window))))
    });
}

fn integration(c: &mut Criterion) {
    let plain = wavy_tube(1024, false);
    let synth = wavy_tube(1024, true);
    let window = Interval::new(3.5, 1020.5);

    c.bench_function("partial integral 1024 slices", |b| {
        b.iter(|| black_box(plain.partial_integral(black_box(window))))
    });
    c.bench_function("partial integral 1024 slices with synthesis", |b| {
        b.iter(|| black_box(synth.partial_integral(black_box(window))))
    });
}

fn contraction(c: &mut Criterion) {
    let tdomain = Interval::new(0.0, 64.0);
    let v = Tube::with_codomain(tdomain, 1.0, Interval::new(-1.0, 1.0));
    c.bench_function("derivative contraction 64 slices", |b| {
        b.iter(|| {
            let mut x = Tube::new(tdomain, 1.0);
            x.set_gate_at(0.0, Interval::point(0.0));
            CtcDeriv::new().contract(&mut x, &v);
            black_box(x)
        })
    });
}

criterion_group!(benches, evaluation, integration, contraction);
criterion_main!(benches);
