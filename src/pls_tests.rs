use crate::{PlsError, PlsOptions, PLS};
use approx::assert_abs_diff_eq;
use ndarray::{array, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn generate_random_data(n_samples: usize, n_features: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Array2::from_shape_fn((n_samples, n_features), |_| rng.gen_range(-1.0..1.0))
}

/// Single-response data: a fixed linear combination of the features plus a little noise.
fn generate_regression_data(
    n_samples: usize,
    n_features: usize,
    seed: u64,
) -> (Array2<f64>, Array2<f64>) {
    let x = generate_random_data(n_samples, n_features, seed);
    let noise = generate_random_data(n_samples, 1, seed + 1);
    let beta = Array2::from_shape_fn((n_features, 1), |(i, _)| (i as f64 + 1.0) * 0.5);
    let y = x.dot(&beta) + noise * 0.05;
    (x, y)
}

fn logical_and_data() -> (Array2<f64>, Array2<f64>) {
    let x = array![[0.1, 0.02], [0.25, 1.01], [0.95, 0.01], [1.01, 0.96]];
    let y = array![[1.0, 0.0], [1.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
    (x, y)
}

#[test]
fn logical_and_scores_rank_the_right_class() {
    let (x, y) = logical_and_data();
    let mut pls = PLS::new();
    pls.train(x.clone(), y, &PlsOptions::new(2, 1e-5)).unwrap();

    let result = pls.predict(x).unwrap();
    assert_eq!(result.dim(), (4, 2));
    for row in 0..3 {
        assert!(
            result[[row, 0]] > result[[row, 1]],
            "row {} should favour the first column: {:?}",
            row,
            result.row(row)
        );
    }
    assert!(result[[3, 0]] < result[[3, 1]]);
}

#[test]
fn two_separable_samples_are_reproduced() {
    let x = array![[0.323, 34.0, 56.0, 23.0], [2.23, 43.0, 32.0, 83.0]];
    let y = array![[23.0], [15.0]];
    let mut pls = PLS::new();
    pls.train(x.clone(), y.clone(), &PlsOptions::new(3, 1e-5))
        .unwrap();

    let result = pls.predict(x).unwrap();
    assert_abs_diff_eq!(result, y, epsilon = 1e-6);
    // Rank-one data is fully explained by its single component.
    assert_eq!(pls.n_components(), Some(1));
    assert_abs_diff_eq!(pls.explained_variance().unwrap(), 1.0, epsilon = 1e-9);
}

#[test]
fn component_count_and_artifact_shapes_agree() {
    let (x, y) = generate_regression_data(30, 6, 7);
    let latent_vectors = 4;
    let mut pls = PLS::new();
    pls.train(x, y, &PlsOptions::new(latent_vectors, 1e-8))
        .unwrap();

    let k = pls.n_components().unwrap();
    assert!(k >= 1 && k <= latent_vectors);

    assert_eq!(pls.x_scores().unwrap().dim(), (30, k));
    assert_eq!(pls.x_loadings().unwrap().dim(), (6, k));
    assert_eq!(pls.y_scores().unwrap().dim(), (30, k));
    assert_eq!(pls.y_loadings().unwrap().dim(), (1, k));
    assert_eq!(pls.x_weights().unwrap().dim(), (6, k));
    assert_eq!(pls.inner_coefficients().unwrap().dim(), (k, k));
    assert_eq!(pls.coefficients().unwrap().dim(), (6, 1));
    assert_eq!(pls.x_residuals().unwrap().dim(), (30, 6));
    assert_eq!(pls.y_residuals().unwrap().dim(), (30, 1));

    let b = pls.inner_coefficients().unwrap();
    for ((i, j), &v) in b.indexed_iter() {
        if i != j {
            assert_eq!(v, 0.0);
        }
    }
}

#[test]
fn x_loadings_have_unit_norm() {
    let (x, y) = generate_regression_data(25, 5, 11);
    let mut pls = PLS::new();
    pls.train(x, y, &PlsOptions::new(3, 1e-8)).unwrap();

    for column in pls.x_loadings().unwrap().axis_iter(Axis(1)) {
        assert_abs_diff_eq!(column.dot(&column).sqrt(), 1.0, epsilon = 1e-10);
    }
    let r2x = pls.explained_variance().unwrap();
    assert!(r2x > 0.0 && r2x <= 1.0 + 1e-12, "R2X out of range: {}", r2x);
}

#[test]
fn residual_y_norm_never_increases() {
    let (x, y) = generate_regression_data(40, 8, 21);
    let mut pls = PLS::new();
    pls.train(x, y, &PlsOptions::new(5, 1e-6)).unwrap();

    let history = pls.residual_norm_history().unwrap();
    assert_eq!(history.len(), pls.n_components().unwrap() + 1);
    for pair in history.windows(2) {
        assert!(
            pair[1] <= pair[0] + 1e-12,
            "residual norm increased: {:?}",
            history
        );
    }
}

#[test]
fn stops_early_when_x_is_exhausted() {
    // One predictor can support at most one component.
    let x = array![[1.0], [2.0], [3.0], [4.0]];
    let y = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.0, 0.0]];
    let mut pls = PLS::new();
    pls.train(x, y, &PlsOptions::new(3, 1e-5)).unwrap();
    assert_eq!(pls.n_components(), Some(1));
}

#[test]
fn oversized_latent_vector_request_is_capped_by_rank() {
    let (x, y) = logical_and_data();
    let mut pls = PLS::new();
    pls.train(x.clone(), y.clone(), &PlsOptions::new(usize::MAX / 2, 1e-5))
        .unwrap();
    assert_eq!(pls.n_components(), Some(2));

    let mut reference = PLS::new();
    reference.train(x.clone(), y, &PlsOptions::new(2, 1e-5)).unwrap();
    assert_eq!(pls.predict(x.clone()).unwrap(), reference.predict(x).unwrap());
}

#[test]
fn constant_response_is_degenerate() {
    let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 5.0]];
    let y = array![[4.0], [4.0], [4.0]];
    let mut pls = PLS::new();
    let err = pls.train(x, y, &PlsOptions::new(2, 1e-5)).unwrap_err();
    assert!(matches!(err, PlsError::NumericalDegeneracy { .. }));
    assert!(!pls.is_fitted());
}

#[test]
fn inner_iteration_cap_is_reported() {
    let (x, y) = logical_and_data();
    let mut pls = PLS::new();
    let options = PlsOptions::new(2, 1e-5).with_max_iterations(1);
    let err = pls.train(x, y, &options).unwrap_err();
    assert!(matches!(
        err,
        PlsError::NumericalDegeneracy {
            stage: "inner iteration convergence",
            component: 0
        }
    ));
}

#[test]
fn predict_is_idempotent() {
    let (x, y) = generate_regression_data(20, 4, 3);
    let mut pls = PLS::new();
    pls.train(x.clone(), y, &PlsOptions::new(2, 1e-8)).unwrap();

    let first = pls.predict(x.clone()).unwrap();
    let second = pls.predict(x).unwrap();
    assert_eq!(first, second);
}

#[test]
fn export_then_load_predicts_identically() {
    let (x, y) = generate_regression_data(20, 4, 5);
    let mut pls = PLS::new();
    pls.train(x, y, &PlsOptions::new(3, 1e-8)).unwrap();

    let restored = PLS::load(pls.export().unwrap()).unwrap();
    let unseen = generate_random_data(7, 4, 99);
    assert_eq!(
        pls.predict(unseen.clone()).unwrap(),
        restored.predict(unseen).unwrap()
    );
    assert_eq!(pls.export().unwrap(), restored.export().unwrap());
    assert_eq!(restored.explained_variance(), pls.explained_variance());
    assert_eq!(restored.residual_norm_history(), Some(&[][..]));
}

#[test]
fn mismatched_rows_are_rejected() {
    let x = generate_random_data(5, 3, 1);
    let y = generate_random_data(4, 1, 2);
    let mut pls = PLS::new();
    assert!(matches!(
        pls.train(x, y, &PlsOptions::new(2, 1e-5)),
        Err(PlsError::InvalidArgument(_))
    ));
}

#[test]
fn missing_options_are_rejected() {
    let (x, y) = logical_and_data();
    let mut pls = PLS::new();
    let no_latent = PlsOptions {
        tolerance: Some(1e-5),
        ..Default::default()
    };
    assert!(matches!(
        pls.train(x.clone(), y.clone(), &no_latent),
        Err(PlsError::InvalidArgument(_))
    ));
    assert!(matches!(
        pls.train(x, y, &PlsOptions::new(2, f64::NAN)),
        Err(PlsError::InvalidArgument(_))
    ));
}

#[test]
fn failed_retrain_keeps_previous_model() {
    let (x, y) = logical_and_data();
    let mut pls = PLS::new();
    pls.train(x.clone(), y.clone(), &PlsOptions::new(2, 1e-5))
        .unwrap();
    let before = pls.predict(x.clone()).unwrap();

    let short_y = y.slice(ndarray::s![..3, ..]).to_owned();
    assert!(pls.train(x.clone(), short_y, &PlsOptions::new(2, 1e-5)).is_err());
    assert_eq!(pls.predict(x).unwrap(), before);
}

#[test]
fn prediction_column_mismatch_is_reported() {
    let (x, y) = logical_and_data();
    let mut pls = PLS::new();
    pls.train(x, y, &PlsOptions::new(2, 1e-5)).unwrap();

    let err = pls.predict(Array2::zeros((2, 3))).unwrap_err();
    assert!(matches!(
        err,
        PlsError::DimensionMismatch {
            expected: 2,
            found: 3
        }
    ));
}

#[test]
fn untrained_model_cannot_predict() {
    let pls = PLS::new();
    assert!(matches!(
        pls.predict(Array2::zeros((1, 2))),
        Err(PlsError::NotFitted)
    ));
    assert_eq!(pls.explained_variance(), None);
}

#[test]
fn single_row_predicts_training_mean() {
    let (x, y) = logical_and_data();
    let mut pls = PLS::new();
    pls.train(x, y, &PlsOptions::new(2, 1e-5)).unwrap();

    let result = pls.predict(array![[0.5, 0.5]]).unwrap();
    assert_abs_diff_eq!(result, array![[0.75, 0.25]], epsilon = 1e-12);
}

#[test]
fn empty_prediction_input_yields_empty_output() {
    let (x, y) = logical_and_data();
    let mut pls = PLS::new();
    pls.train(x, y, &PlsOptions::new(2, 1e-5)).unwrap();
    assert_eq!(pls.predict(Array2::zeros((0, 2))).unwrap().dim(), (0, 2));
}

#[test]
fn nested_rows_match_array_api() {
    let (x, y) = logical_and_data();
    let x_rows = crate::linalg::matrix_to_rows(&x);
    let y_rows = crate::linalg::matrix_to_rows(&y);

    let mut from_rows = PLS::new();
    from_rows
        .train_rows(&x_rows, &y_rows, &PlsOptions::new(2, 1e-5))
        .unwrap();
    let mut from_arrays = PLS::new();
    from_arrays.train(x.clone(), y, &PlsOptions::new(2, 1e-5)).unwrap();

    let predicted_rows = from_rows.predict_rows(&x_rows).unwrap();
    let predicted = from_arrays.predict(x).unwrap();
    assert_eq!(crate::linalg::matrix_from_rows(&predicted_rows).unwrap(), predicted);
}

#[test]
fn unscaled_model_survives_export_and_load() {
    let (x, y) = generate_regression_data(20, 4, 11);
    let mut pls = PLS::new();
    pls.train(x.clone(), y, &PlsOptions::new(2, 1e-8).with_scale(false))
        .unwrap();

    let record = pls.export().unwrap();
    assert!(!record.scale);
    assert!(record.ystd.iter().all(|&s| s == 1.0));

    let restored = PLS::load(record).unwrap();
    assert!(!restored.export().unwrap().scale);
    assert_eq!(pls.predict(x.clone()).unwrap(), restored.predict(x).unwrap());
}
