//! Behavioral properties of the factorization engine
//!
//! Initial factor values are reproduced by drawing from an identically seeded
//! `StdRng`, in the same order the engine uses (U row-major, then V).

use latent_ratings_engine::{
    mean_absolute_error, ClipRange, FactorizationConfig, MatrixFactorization, RatingPredictor,
    Ratings, UpdateMode,
};
use ndarray::Array2;
use rand::distributions::Uniform;
use rand::rngs::mock::StepRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

fn dot_product(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn config(latent_dim: usize, num_users: usize, num_items: usize) -> FactorizationConfig {
    FactorizationConfig {
        latent_dim,
        lambda: 0.01,
        eta: 0.05,
        decay: 0.9,
        num_iterations: 10,
        num_users,
        num_items,
        verbose: false,
        update_mode: UpdateMode::InPlace,
    }
}

fn ratings() -> Ratings {
    vec![
        ((0, 0), 5.0),
        ((0, 1), 3.0),
        ((0, 3), 1.0),
        ((1, 1), 4.0),
        ((1, 2), 2.0),
        ((3, 0), 1.0),
        ((3, 3), 5.0),
    ]
    .into_iter()
    .collect()
}

/// The tables the engine holds right after initialization for `seed`
fn initial_tables(seed: u64, config: &FactorizationConfig) -> (Array2<f64>, Array2<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let uniform = Uniform::new(0.0, 1.0);

    let mut u = Array2::<f64>::zeros((config.num_users, config.latent_dim));
    let mut v = Array2::<f64>::zeros((config.num_items, config.latent_dim));
    for value in u.iter_mut() {
        *value = rng.sample(&uniform);
    }
    for value in v.iter_mut() {
        *value = rng.sample(&uniform);
    }
    (u, v)
}

#[test]
fn test_fit_is_deterministic_for_a_seed() {
    let mut first = MatrixFactorization::with_seed(ratings(), config(3, 5, 6), 1234).unwrap();
    let mut second = MatrixFactorization::with_seed(ratings(), config(3, 5, 6), 1234).unwrap();

    let first_report = first.fit();
    let second_report = second.fit();

    assert_eq!(first.user_factors(), second.user_factors());
    assert_eq!(first.item_factors(), second.item_factors());
    assert_eq!(first_report, second_report);

    let mut other = MatrixFactorization::with_seed(ratings(), config(3, 5, 6), 4321).unwrap();
    other.fit();
    assert_ne!(first.user_factors(), other.user_factors());
}

#[test]
fn test_factor_table_shapes() {
    let mut mf = MatrixFactorization::with_seed(ratings(), config(7, 5, 6), 3).unwrap();
    assert_eq!(mf.user_factors().dim(), (5, 7));
    assert_eq!(mf.item_factors().dim(), (6, 7));

    mf.fit();
    assert_eq!(mf.user_factors().dim(), (5, 7));
    assert_eq!(mf.item_factors().dim(), (6, 7));
    assert_eq!(mf.user_embedding(4).unwrap().len(), 7);
}

#[test]
fn test_unobserved_rows_keep_initial_values() {
    let config = config(3, 5, 6);
    let (initial_u, initial_v) = initial_tables(77, &config);

    let mut mf = MatrixFactorization::with_seed(ratings(), config, 77).unwrap();
    mf.fit();
    let u = mf.user_factors();
    let v = mf.item_factors();

    // Users 2 and 4 and items 4 and 5 have no ratings
    for user in [2, 4] {
        assert_eq!(u.row(user), initial_u.row(user));
    }
    for item in [4, 5] {
        assert_eq!(v.row(item), initial_v.row(item));
    }

    // Observed rows move
    for user in [0, 1, 3] {
        assert_ne!(u.row(user), initial_u.row(user));
    }
    for item in [0, 1, 2, 3] {
        assert_ne!(v.row(item), initial_v.row(item));
    }
}

#[test]
fn test_learning_rate_decays_every_sweep() {
    let config = FactorizationConfig {
        eta: 0.01,
        decay: 0.5,
        num_iterations: 6,
        ..config(2, 5, 6)
    };
    let mut mf = MatrixFactorization::with_seed(ratings(), config.clone(), 8).unwrap();
    assert_eq!(mf.learning_rate(), 0.01);

    let report = mf.fit();

    for (t, sweep) in report.sweeps.iter().enumerate() {
        let expected = config.learning_rate_at(t);
        assert!(
            (sweep.learning_rate - expected).abs() <= expected * 1e-12,
            "sweep {}: {} != {}",
            t,
            sweep.learning_rate,
            expected
        );
    }
    for pair in report.sweeps.windows(2) {
        assert!(pair[1].learning_rate < pair[0].learning_rate);
    }
    assert_eq!(mf.learning_rate(), report.sweeps[5].learning_rate);
}

#[test]
fn test_predict_does_not_change_the_model() {
    let mut mf = MatrixFactorization::with_seed(ratings(), config(3, 5, 6), 21).unwrap();
    mf.fit();

    let u = mf.user_factors();
    let v = mf.item_factors();

    let first = mf.predict(1, 2).unwrap();
    let second = mf.predict(1, 2).unwrap();
    let _ = mf.predict(4, 5).unwrap();

    assert_eq!(first, second);
    assert_eq!(mf.user_factors(), u);
    assert_eq!(mf.item_factors(), v);
}

#[test]
fn test_regularization_shrinks_factors_toward_zero() {
    let ratings: Ratings = vec![((0, 0), 0.0), ((0, 1), 0.0), ((1, 0), 0.0), ((1, 1), 0.0)]
        .into_iter()
        .collect();
    let config = FactorizationConfig {
        latent_dim: 2,
        lambda: 0.1,
        eta: 0.1,
        decay: 1.0,
        num_iterations: 1,
        num_users: 2,
        num_items: 2,
        verbose: false,
        update_mode: UpdateMode::InPlace,
    };

    // A constant generator makes every initial factor 0.5
    let rng = StepRng::new(1 << 63, 0);
    let mut mf = MatrixFactorization::new(ratings, config, rng).unwrap();
    mf.fit();

    for &value in mf.user_factors().iter().chain(mf.item_factors().iter()) {
        assert!(value.abs() < 0.5, "factor {} did not shrink", value);
        assert!(value > 0.0);
    }
}

#[test]
fn test_single_sweep_one_dimensional_closed_form() {
    let ratings: Ratings = vec![((0, 0), 5.0), ((0, 1), 1.0), ((1, 0), 1.0)]
        .into_iter()
        .collect();
    let config = FactorizationConfig {
        latent_dim: 1,
        lambda: 0.0,
        eta: 0.1,
        decay: 1.0,
        num_iterations: 1,
        num_users: 2,
        num_items: 2,
        verbose: false,
        update_mode: UpdateMode::InPlace,
    };

    // Every initial factor is 0.5
    let mut mf = MatrixFactorization::new(ratings, config, StepRng::new(1 << 63, 0)).unwrap();
    let report = mf.fit();
    assert_eq!(report.sweeps[0].learning_rate, 0.1);

    // User pass:
    //   u0: 0.5 -> 0.975 (item 0, e = -4.75) -> 1.02625 (item 1, e = -0.5125)
    //   u1: 0.5 -> 0.575 (item 0, e = -0.75)
    // Item pass:
    //   v0: 0.5 -> 1.42093109375 (user 0) -> 1.44197202517578125 (user 1)
    //   v1: 0.5 -> 0.59993109375 (user 0)
    let u = mf.user_factors();
    let v = mf.item_factors();
    assert!((u[[0, 0]] - 1.02625).abs() < 1e-12);
    assert!((u[[1, 0]] - 0.575).abs() < 1e-12);
    assert!((v[[0, 0]] - 1.441_972_025_175_781_25).abs() < 1e-12);
    assert!((v[[1, 0]] - 0.599_931_093_75).abs() < 1e-12);

    // 0.575 * 0.59993109375
    assert!((mf.predict(1, 1).unwrap() - 0.344_960_378_906_25).abs() < 1e-12);
}

#[test]
fn test_single_sweep_matches_hand_computed_updates() {
    let ratings: Ratings = vec![((0, 0), 5.0), ((0, 1), 1.0), ((1, 0), 1.0)]
        .into_iter()
        .collect();
    let config = FactorizationConfig {
        latent_dim: 2,
        lambda: 0.0,
        eta: 0.1,
        decay: 1.0,
        num_iterations: 1,
        num_users: 2,
        num_items: 2,
        verbose: false,
        update_mode: UpdateMode::InPlace,
    };

    let (initial_u, initial_v) = initial_tables(99, &config);
    let mut u: Vec<Vec<f64>> = initial_u.rows().into_iter().map(|r| r.to_vec()).collect();
    let mut v: Vec<Vec<f64>> = initial_v.rows().into_iter().map(|r| r.to_vec()).collect();

    let eta = 0.1;

    // User pass: user 0 against items 0 then 1, then user 1 against item 0
    for (user, item, rating) in [(0, 0, 5.0), (0, 1, 1.0), (1, 0, 1.0)] {
        let e = dot_product(&u[user], &v[item]) - rating;
        for k in 0..2 {
            u[user][k] -= eta * (2.0 * e * v[item][k]);
        }
    }
    // Item pass: item 0 against users 0 then 1, then item 1 against user 0
    for (item, user, rating) in [(0, 0, 5.0), (0, 1, 1.0), (1, 0, 1.0)] {
        let e = dot_product(&v[item], &u[user]) - rating;
        for k in 0..2 {
            v[item][k] -= eta * (2.0 * e * u[user][k]);
        }
    }

    let mut mf = MatrixFactorization::with_seed(ratings, config, 99).unwrap();
    mf.fit();
    let fitted_u = mf.user_factors();
    let fitted_v = mf.item_factors();

    for row in 0..2 {
        for k in 0..2 {
            assert!((fitted_u[[row, k]] - u[row][k]).abs() < 1e-12);
            assert!((fitted_v[[row, k]] - v[row][k]).abs() < 1e-12);
        }
    }

    let expected = dot_product(&u[1], &v[1]);
    assert!((mf.predict(1, 1).unwrap() - expected).abs() < 1e-12);
}

#[test]
fn test_clipped_mae_is_mean_of_absolute_errors() {
    let mut mf = MatrixFactorization::with_seed(ratings(), config(3, 5, 6), 5).unwrap();
    mf.fit();

    let pairs = vec![((0, 2), 4.0), ((1, 0), 1.0), ((2, 5), 3.0), ((4, 4), 5.0)];
    let clip = ClipRange::new(1.0, 5.0).unwrap();

    let test: Ratings = pairs.iter().copied().collect();

    // Accumulate the reference in an order unrelated to the set's key order
    let mut shuffled = pairs.clone();
    shuffled.shuffle(&mut StdRng::seed_from_u64(11));
    shuffled.reverse();

    let expected = shuffled
        .iter()
        .map(|&((user, item), rating)| {
            let prediction = mf.predict(user, item).unwrap().clamp(1.0, 5.0);
            (rating - prediction).abs()
        })
        .sum::<f64>()
        / shuffled.len() as f64;

    let mae = mean_absolute_error(&mf, &test, clip).unwrap();
    assert!((mae - expected).abs() < 1e-12);
}

#[test]
fn test_snapshot_mode_is_deterministic_and_distinct() {
    let snapshot_config = FactorizationConfig {
        update_mode: UpdateMode::Snapshot,
        ..config(3, 5, 6)
    };

    let mut first = MatrixFactorization::with_seed(ratings(), snapshot_config.clone(), 13).unwrap();
    let mut second = MatrixFactorization::with_seed(ratings(), snapshot_config, 13).unwrap();
    let mut in_place = MatrixFactorization::with_seed(ratings(), config(3, 5, 6), 13).unwrap();

    first.fit();
    second.fit();
    in_place.fit();

    assert_eq!(first.user_factors(), second.user_factors());
    assert_eq!(first.item_factors(), second.item_factors());
    assert_ne!(first.user_factors(), in_place.user_factors());
}

#[test]
fn test_snapshot_mode_leaves_unobserved_rows_alone() {
    let config = FactorizationConfig {
        update_mode: UpdateMode::Snapshot,
        ..config(3, 5, 6)
    };
    let (initial_u, initial_v) = initial_tables(31, &config);

    let mut mf = MatrixFactorization::with_seed(ratings(), config, 31).unwrap();
    mf.fit();

    assert_eq!(mf.user_factors().row(2), initial_u.row(2));
    assert_eq!(mf.item_factors().row(5), initial_v.row(5));
}

#[test]
fn test_refit_retrains_from_fresh_draws() {
    let mut mf = MatrixFactorization::with_seed(ratings(), config(3, 5, 6), 17).unwrap();

    let first_report = mf.fit();
    let first_u = mf.user_factors();
    let first_rate = mf.learning_rate();

    let second_report = mf.fit();

    assert_ne!(mf.user_factors(), first_u);
    assert_eq!(
        first_report.sweeps[0].learning_rate,
        second_report.sweeps[0].learning_rate
    );
    assert_eq!(mf.learning_rate(), first_rate);
}

#[test]
fn test_empty_training_set_fits_without_updates() {
    let config = config(2, 3, 3);
    let (initial_u, initial_v) = initial_tables(4, &config);

    let mut mf = MatrixFactorization::with_seed(Ratings::new(), config, 4).unwrap();
    let report = mf.fit();

    assert_eq!(report.observations, 0);
    assert_eq!(report.sweeps.len(), 10);
    assert_eq!(mf.user_factors(), initial_u);
    assert_eq!(mf.item_factors(), initial_v);
}

#[test]
fn test_model_usable_as_trait_object() {
    let mut mf = MatrixFactorization::with_seed(ratings(), config(2, 5, 6), 6).unwrap();
    mf.fit();

    let boxed: Box<dyn RatingPredictor> = Box::new(mf);
    assert!(boxed.predict(0, 0).unwrap().is_finite());
    assert!(boxed.predict(5, 0).is_err());
}
