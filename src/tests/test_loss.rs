use ndarray::array;

use crate::config::LossKind;
use crate::loss::{HuberLoss, Loss, LossFunction, MeanSquaredError};

#[test]
fn test_mse_loss() {
    let predictions = array![1.0, 2.0];
    let targets = array![0.0, 0.0];

    let loss = MeanSquaredError.compute(predictions.view(), targets.view());
    assert!((loss - 2.5).abs() < 1e-6);

    let gradient = MeanSquaredError.gradient(predictions.view(), targets.view());
    assert_eq!(gradient, array![1.0, 2.0]);
}

#[test]
fn test_mse_zero_at_target() {
    let values = array![0.3, -1.2, 4.0];
    assert_eq!(MeanSquaredError.compute(values.view(), values.view()), 0.0);
    assert!(MeanSquaredError
        .gradient(values.view(), values.view())
        .iter()
        .all(|&g| g == 0.0));
}

#[test]
fn test_huber_loss() {
    let huber = HuberLoss::default();
    let predictions = array![0.5, 3.0];
    let targets = array![0.0, 0.0];

    // 0.5 * 0.5^2 = 0.125 and 1 * 3 - 0.5 = 2.5
    let loss = huber.compute(predictions.view(), targets.view());
    assert!((loss - 1.3125).abs() < 1e-6);

    let gradient = huber.gradient(predictions.view(), targets.view());
    assert!((gradient[0] - 0.25).abs() < 1e-6);
    assert!((gradient[1] - 0.5).abs() < 1e-6);
}

#[test]
fn test_huber_matches_half_mse_inside_delta() {
    let huber = HuberLoss::new(10.0);
    let predictions = array![1.0, -2.0, 0.5];
    let targets = array![0.0, 0.0, 0.0];
    let mse = MeanSquaredError.compute(predictions.view(), targets.view());
    assert!((huber.compute(predictions.view(), targets.view()) - 0.5 * mse).abs() < 1e-6);
}

#[test]
fn test_loss_function_from_kind() {
    let predictions = array![2.0];
    let targets = array![0.0];
    let mse = LossFunction::from(LossKind::Mse);
    let huber = LossFunction::from(LossKind::Huber);
    assert_eq!(mse.compute(predictions.view(), targets.view()), 4.0);
    assert_eq!(huber.compute(predictions.view(), targets.view()), 1.5);
}
