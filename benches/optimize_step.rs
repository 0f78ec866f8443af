//! Cost of replay sampling and of one optimize step on a CartPole-sized network

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dqn_core::config::HyperParams;
use dqn_core::network::NeuralNetwork;
use dqn_core::replay_buffer::{ReplayBuffer, Transition};
use dqn_core::trainer::Trainer;
use ndarray::Array1;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn random_transition(rng: &mut StdRng) -> Transition {
    Transition {
        state: Array1::random_using(4, Uniform::new(-1.0, 1.0), rng),
        action: rng.gen_range(0..2),
        reward: 1.0,
        next_state: Array1::random_using(4, Uniform::new(-1.0, 1.0), rng),
        done: rng.gen_bool(0.05),
    }
}

fn bench_sample(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let mut buffer = ReplayBuffer::new(10_000);
    for _ in 0..buffer.capacity() {
        buffer.push(random_transition(&mut rng));
    }

    let mut group = c.benchmark_group("replay_sample");
    for &batch_size in &[32usize, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &batch_size, |b, &n| {
            b.iter(|| black_box(buffer.sample(n, &mut rng).unwrap().len()))
        });
    }
    group.finish();
}

fn filled_trainer(batch_size: usize, double: bool, rng: &mut StdRng) -> Trainer<NeuralNetwork> {
    let params = HyperParams {
        batch_size,
        double,
        replay_capacity: 10_000,
        ..HyperParams::default()
    };
    let network = NeuralNetwork::new_using(&[4, 128, 128, 2], rng).unwrap();
    let mut trainer = Trainer::new(network, &params);
    for _ in 0..params.replay_capacity {
        trainer.push_transition(random_transition(rng));
    }
    trainer
}

fn bench_optimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimize_step");
    for &batch_size in &[32usize, 128] {
        for double in [false, true] {
            let mut rng = StdRng::seed_from_u64(0);
            let mut trainer = filled_trainer(batch_size, double, &mut rng);
            let label = if double { "double" } else { "standard" };
            group.bench_with_input(BenchmarkId::new(label, batch_size), &batch_size, |b, _| {
                b.iter(|| black_box(trainer.optimize(&mut rng).unwrap()))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_sample, bench_optimize);
criterion_main!(benches);
