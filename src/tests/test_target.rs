use ndarray::array;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::network::NeuralNetwork;
use crate::target::{SyncState, TargetNetwork};

fn bits(network: &NeuralNetwork) -> Vec<u32> {
    network
        .layers
        .iter()
        .flat_map(|layer| layer.weights.iter().chain(layer.biases.iter()))
        .map(|v| v.to_bits())
        .collect()
}

#[test]
fn test_target_starts_as_copy() {
    let online = NeuralNetwork::new_using(&[3, 6, 2], &mut StdRng::seed_from_u64(4)).unwrap();
    let target = TargetNetwork::new(&online);

    assert_eq!(target.state(), SyncState::Synced);
    assert_eq!(target.last_synced_step(), None);
    assert_eq!(target.sync_count(), 0);
    assert_eq!(bits(target.network()), bits(&online));
}

#[test]
fn test_sync_copies_parameters_exactly() {
    let mut online = NeuralNetwork::new_using(&[3, 6, 2], &mut StdRng::seed_from_u64(4)).unwrap();
    let mut target = TargetNetwork::new(&online);

    online.layers[0].weights.mapv_inplace(|w| w * 1.37 + 0.001);
    online.layers[1].biases = array![0.1234567, -9.87654];
    target.mark_stale();
    assert_eq!(target.state(), SyncState::Stale);
    assert_ne!(bits(target.network()), bits(&online));

    target.sync(&online, 1000);
    assert_eq!(target.state(), SyncState::Synced);
    assert_eq!(target.last_synced_step(), Some(1000));
    assert_eq!(target.sync_count(), 1);
    assert_eq!(bits(target.network()), bits(&online));
}

#[test]
fn test_snapshot_survives_later_sync() {
    let mut online = NeuralNetwork::new_using(&[2, 4, 2], &mut StdRng::seed_from_u64(8)).unwrap();
    let mut target = TargetNetwork::new(&online);
    let before = target.snapshot();
    let before_bits = bits(&before);

    online.layers[0].weights.fill(0.25);
    target.sync(&online, 5);

    assert_eq!(bits(&before), before_bits);
    assert_eq!(bits(&target.snapshot()), bits(&online));
}

#[test]
fn test_target_ignores_online_updates_until_sync() {
    let mut online = NeuralNetwork::new_using(&[2, 2], &mut StdRng::seed_from_u64(1)).unwrap();
    let mut target = TargetNetwork::new(&online);
    target.sync(&online, 10);
    let synced = bits(target.network());

    for step in 0..5 {
        online.layers[0].biases.mapv_inplace(|b| b + step as f32);
        assert_eq!(bits(target.network()), synced);
    }
    assert_eq!(target.last_synced_step(), Some(10));
}
