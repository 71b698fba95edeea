use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use pad_core::mocks::default_wiring;
use pad_core::{NoopObserver, SchedulerBuilder, ThresholdConfig, decide};
use pad_traits::clock::test_clock::TestClock;
use pad_traits::{Actuator, ChannelConfig, ChannelId, LoadCellBus, RawSample};

/// Bus that serves a fixed trace round-robin, without any line toggling.
struct TraceBus {
    wiring: Vec<ChannelConfig>,
    trace: Vec<i32>,
    pos: usize,
}

impl LoadCellBus for TraceBus {
    fn channels(&self) -> &[ChannelConfig] {
        &self.wiring
    }

    fn acquire(&mut self, _channel: ChannelId) -> RawSample {
        let v = self.trace[self.pos % self.trace.len()];
        self.pos = self.pos.wrapping_add(1);
        if v == i32::MIN {
            RawSample::Timeout
        } else {
            RawSample::Value(v)
        }
    }
}

struct NullGates;

impl Actuator for NullGates {
    fn set_gate(&mut self, channel: ChannelId, asserted: bool) {
        black_box((channel, asserted));
    }
}

// xorshift trace with the occasional timeout marker
fn synth_trace(n: usize, seed: u32) -> Vec<i32> {
    let mut x = seed.max(1);
    (0..n)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            if x % 17 == 0 {
                i32::MIN
            } else {
                (x % 20_000) as i32 - 10_000
            }
        })
        .collect()
}

pub fn bench_decide(c: &mut Criterion) {
    let trace = synth_trace(4096, 7);
    c.bench_function("decide_trace_4096", |b| {
        b.iter(|| {
            let (mut prev, mut step) = (0, false);
            for &v in &trace {
                let s = if v == i32::MIN {
                    RawSample::Timeout
                } else {
                    RawSample::Value(v)
                };
                let d = decide(prev, step, s, black_box(1000));
                prev = d.previous_weight;
                step = d.step_asserted;
            }
            black_box((prev, step))
        });
    });
}

pub fn bench_tick(c: &mut Criterion) {
    c.bench_function("scheduler_tick_x100", |b| {
        b.iter_batched(
            || {
                let bus = TraceBus {
                    wiring: default_wiring(),
                    trace: synth_trace(1024, 42),
                    pos: 0,
                };
                SchedulerBuilder::new(bus, NullGates)
                    .with_threshold(ThresholdConfig::uniform(1000))
                    .with_observer(NoopObserver)
                    .with_clock(TestClock::new())
                    .build()
                    .expect("build")
            },
            |mut sched| {
                for _ in 0..100 {
                    black_box(sched.tick());
                }
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_decide, bench_tick);
criterion_main!(benches);
