use ndarray::array;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{BrokenEnv, FixedEnv};
use crate::checkpoint::{Checkpoint, MemorySink};
use crate::config::{HyperParams, OptimizerKind};
use crate::episode::EpisodeLoop;
use crate::error::DqnError;
use crate::network::NeuralNetwork;

type FixedLoop = EpisodeLoop<FixedEnv, NeuralNetwork, MemorySink<NeuralNetwork>>;

fn params(episodes: usize) -> HyperParams {
    HyperParams {
        episodes,
        batch_size: 2,
        replay_capacity: 100,
        target_update_interval: 5,
        train_interval: 1,
        save_interval: 10,
        lr: 0.01,
        optimizer: OptimizerKind::Sgd,
        hidden_layers: vec![8],
        ..HyperParams::default()
    }
}

fn network(seed: u64) -> NeuralNetwork {
    NeuralNetwork::new_using(&[2, 8, 2], &mut StdRng::seed_from_u64(seed)).unwrap()
}

fn fixed_loop(params: HyperParams, length: usize) -> FixedLoop {
    EpisodeLoop::new(params, FixedEnv::new(length), network(1), MemorySink::new()).unwrap()
}

#[test]
fn test_three_short_episodes() {
    let mut run = fixed_loop(params(3), 4);
    let summary = run.run().unwrap();

    assert_eq!(summary.episodes, 3);
    assert_eq!(summary.global_step, 12);
    // First step has a single transition, below batch_size
    assert_eq!(summary.optimize_steps, 11);
    assert_eq!(summary.target_syncs, 2);
    assert_eq!(run.trainer().target().last_synced_step(), Some(10));
    assert_eq!(run.trainer().replay().len(), 12);
    assert_eq!(run.env().resets, 3);
    assert_eq!(summary.episode_rewards.len(), 3);
    assert!(summary.episode_rewards.iter().all(|&r| (2.0..=4.0).contains(&r)));
    assert_eq!(summary.checkpoints, 0);
}

#[test]
fn test_epsilon_follows_global_step() {
    let mut run = fixed_loop(params(3), 4);
    let summary = run.run().unwrap();
    let expected = run.params().eps.end
        + (run.params().eps.start - run.params().eps.end) * (-12.0_f32 / run.params().eps.decay).exp();
    assert!((summary.final_epsilon - expected).abs() < 1e-6);
    assert_eq!(run.counter().get(), 12);
}

#[test]
fn test_checkpoints_on_save_interval() {
    let mut run = fixed_loop(HyperParams { save_interval: 2, ..params(5) }, 4);
    let summary = run.run().unwrap();

    assert_eq!(summary.checkpoints, 2);
    let saved = &run.sink().checkpoints;
    assert_eq!(saved.len(), 2);
    assert_eq!((saved[0].episode, saved[0].global_step), (2, 8));
    assert_eq!((saved[1].episode, saved[1].global_step), (4, 16));
    assert_eq!(saved[1].trial, 0);
}

#[test]
fn test_train_interval() {
    let mut run = fixed_loop(HyperParams { train_interval: 3, ..params(3) }, 4);
    let summary = run.run().unwrap();
    // Optimize at steps 3, 6, 9, 12
    assert_eq!(summary.optimize_steps, 4);
    assert_eq!(summary.target_syncs, 2);
}

#[test]
fn test_truncated_episodes_store_non_terminal_transitions() {
    let mut run = fixed_loop(HyperParams { max_episode_steps: Some(3), ..params(2) }, 100);

    let first = run.run_episode().unwrap();
    let second = run.run_episode().unwrap();
    assert_eq!((first.episode, first.length, first.truncated), (1, 3, true));
    assert_eq!((second.episode, second.length, second.truncated), (2, 3, true));
    assert!(run.trainer().replay().iter().all(|t| !t.done));
    assert_eq!(run.counter().get(), 6);
}

#[test]
fn test_terminal_transition_is_stored_as_done() {
    let mut run = fixed_loop(params(1), 3);
    let report = run.run_episode().unwrap();
    assert!(!report.truncated);

    let dones: Vec<bool> = run.trainer().replay().iter().map(|t| t.done).collect();
    assert_eq!(dones, vec![false, false, true]);
}

#[test]
fn test_resume_continues_from_checkpoint() {
    let mut run = fixed_loop(params(3), 4);
    let restored = network(99);
    run.resume(Checkpoint {
        trial: 0,
        episode: 2,
        global_step: 8,
        network: restored.clone(),
    })
    .unwrap();
    assert_eq!(run.trainer().target().network(), &restored);

    let summary = run.run().unwrap();
    assert_eq!(summary.episodes, 3);
    assert_eq!(summary.global_step, 12);
    // Step 10 is the only interval boundary left
    assert_eq!(summary.target_syncs, 2);
    assert_eq!(run.trainer().target().last_synced_step(), Some(10));
    assert_eq!(summary.episode_rewards.len(), 1);
}

#[test]
fn test_network_shape_mismatch_is_configuration_error() {
    let wrong = NeuralNetwork::new_using(&[3, 8, 2], &mut StdRng::seed_from_u64(0)).unwrap();
    let result = EpisodeLoop::new(params(1), FixedEnv::new(4), wrong, MemorySink::new());
    assert!(matches!(result, Err(DqnError::Configuration { ref name, .. }) if name == "network"));

    let wrong_actions = NeuralNetwork::new_using(&[2, 8, 3], &mut StdRng::seed_from_u64(0)).unwrap();
    let result = EpisodeLoop::new(params(1), FixedEnv::new(4), wrong_actions, MemorySink::new());
    assert!(matches!(result, Err(DqnError::Configuration { .. })));
}

#[test]
fn test_invalid_params_fail_before_training() {
    let env = FixedEnv::new(4);
    let result = EpisodeLoop::new(params(0), env, network(1), MemorySink::new());
    assert!(matches!(result, Err(DqnError::Configuration { ref name, .. }) if name == "episodes"));
}

#[test]
fn test_malformed_observation_aborts_run() {
    let env = BrokenEnv { fail_at: 3, t: 0 };
    let mut run = EpisodeLoop::new(params(1), env, network(1), MemorySink::new()).unwrap();

    let result = run.run();
    assert!(matches!(result, Err(DqnError::Environment(_))));
    assert_eq!(run.counter().get(), 3);
    assert_eq!(run.episode(), 0);
    // The bad transition never reaches the buffer
    assert_eq!(run.trainer().replay().len(), 2);
}

#[test]
fn test_q_values_and_metrics() {
    let mut run = fixed_loop(params(2), 4);
    run.run().unwrap();

    assert_eq!(run.q_values(&array![0.0, 1.0]).len(), 2);
    assert_eq!(run.metrics().metrics().episode_lengths, vec![4usize, 4]);
    assert_eq!(run.metrics().metrics().losses.len(), 7);
    assert!(run.metrics().mean_loss().is_some());
    assert!(run.metrics().mean_reward(100).is_some());
}
