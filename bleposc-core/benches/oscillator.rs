use bleposc_core::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const BLOCK: usize = 512;

fn process_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_block");
    group.throughput(Throughput::Elements(BLOCK as u64));

    for wave in Waveform::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(wave), &wave, |b, &wave| {
            let mut osc = Oscillator::new(48_000.0);
            osc.set_waveform(wave);
            osc.set_freq(1_234.5);
            osc.set_amp(1.0);
            let mut buf = [0.0_f32; BLOCK];
            b.iter(|| {
                osc.process_block(black_box(&mut buf));
                black_box(buf[BLOCK - 1])
            });
        });
    }
    group.finish();
}

fn single_sample(c: &mut Criterion) {
    let mut osc = Oscillator::new(48_000.0);
    osc.set_waveform(Waveform::PolyBlepSquare);
    osc.set_freq(440.0);
    c.bench_function("process/polyblep-square", |b| b.iter(|| black_box(osc.process())));
}

criterion_group!(benches, process_block, single_sample);
criterion_main!(benches);
