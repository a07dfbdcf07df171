//! End-to-end training run over a small synthetic frame.

use hitsong_core::{Column, Frame};
use hitsong_models::{default_model_specs, ModelTrainer, TrainerConfig};
use tempfile::TempDir;

/// Forty rows, two informative features, separable classes.
fn synthetic_frame() -> Frame {
    let mut energy = Vec::new();
    let mut dance = Vec::new();
    let mut noise = Vec::new();
    let mut target = Vec::new();
    let mut decade = Vec::new();
    for i in 0..20 {
        let jitter = (i as f64) * 0.01;
        energy.push(0.8 + jitter);
        dance.push(0.7 - jitter);
        noise.push((i as f64 * 0.37).sin());
        target.push(1.0);
        decade.push("70s".to_string());

        energy.push(0.2 - jitter);
        dance.push(0.3 + jitter);
        noise.push((i as f64 * 0.53).cos());
        target.push(0.0);
        decade.push("60s".to_string());
    }
    Frame::from_columns(vec![
        ("energy".into(), Column::Numeric(energy)),
        ("danceability".into(), Column::Numeric(dance)),
        ("liveness".into(), Column::Numeric(noise)),
        ("target".into(), Column::Numeric(target)),
        ("decade".into(), Column::Categorical(decade)),
    ])
    .unwrap()
}

fn trainer_in(dir: &TempDir) -> ModelTrainer {
    ModelTrainer::new(TrainerConfig {
        models_dir: dir.path().join("saved_models"),
        ..TrainerConfig::default()
    })
}

#[test]
fn trains_all_six_models() {
    let dir = TempDir::new().unwrap();
    let mut trainer = trainer_in(&dir);
    trainer
        .train_all_models(&synthetic_frame(), &default_model_specs(), None)
        .unwrap();

    let n_test = trainer.test_labels().len();
    let results = trainer.results();
    assert_eq!(results.len(), 6);
    for (name, result) in results {
        assert!(
            result.test_accuracy >= 0.5,
            "{name} accuracy {}",
            result.test_accuracy
        );
        assert_eq!(result.cv_scores.len(), 5);
        assert_eq!(result.predictions.len(), n_test);
        assert_eq!(result.probabilities.len(), n_test);
        for p in &result.probabilities {
            assert!((0.0..=1.0).contains(p));
        }
    }
}

#[test]
fn deterministic_across_runs() {
    let frame = synthetic_frame();
    let specs = default_model_specs();
    let run = || {
        let dir = TempDir::new().unwrap();
        let mut trainer = trainer_in(&dir);
        trainer.train_all_models(&frame, &specs, None).unwrap();
        trainer
            .results()
            .iter()
            .map(|(name, r)| (name.clone(), r.test_accuracy, r.cv_mean))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn best_model_has_maximal_accuracy() {
    let dir = TempDir::new().unwrap();
    let mut trainer = trainer_in(&dir);
    trainer
        .train_all_models(&synthetic_frame(), &default_model_specs(), None)
        .unwrap();

    let (_, best) = trainer.get_best_model().unwrap();
    let max = trainer
        .results()
        .values()
        .map(|r| r.test_accuracy)
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(best.test_accuracy, max);
}

#[test]
fn models_persist_and_reload() {
    let dir = TempDir::new().unwrap();
    let mut trainer = trainer_in(&dir);
    trainer
        .train_all_models(&synthetic_frame(), &default_model_specs(), None)
        .unwrap();

    for name in ["logistic_regression", "random_forest", "xgboost"] {
        assert!(dir.path().join("saved_models").join(format!("{name}.json")).exists());
    }

    let probe = vec![vec![0.9, 0.6, 0.1], vec![0.1, 0.4, -0.2]];
    let reloaded = trainer.load_model("SVM").unwrap();
    let in_memory = &trainer.models()["SVM"];
    assert_eq!(
        reloaded.predict_proba(&probe).unwrap(),
        in_memory.predict_proba(&probe).unwrap()
    );
}

#[test]
fn save_failure_skips_model_and_continues() {
    let dir = TempDir::new().unwrap();
    // A regular file where the models directory should go makes every
    // save fail.
    std::fs::write(dir.path().join("blocker"), b"").unwrap();
    let mut trainer = ModelTrainer::new(TrainerConfig {
        models_dir: dir.path().join("blocker").join("saved_models"),
        ..TrainerConfig::default()
    });

    trainer
        .train_all_models(&synthetic_frame(), &default_model_specs()[..1], None)
        .unwrap();
    assert!(trainer.results().is_empty());
    assert!(trainer.models().is_empty());
}

#[test]
fn out_of_range_split_is_an_error() {
    let dir = TempDir::new().unwrap();
    let mut trainer = trainer_in(&dir);
    let frame = synthetic_frame();

    let train: Vec<usize> = (0..30).collect();
    let test = vec![30, 99];
    let result = trainer.train_all_models(&frame, &default_model_specs()[..1], Some((train, test)));
    assert!(matches!(
        result,
        Err(hitsong_models::ModelError::InvalidParameter { .. })
    ));
}

#[test]
fn missing_model_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let trainer = trainer_in(&dir);
    assert!(trainer.load_model("Random Forest").is_err());
}

#[test]
fn caller_supplied_split_is_respected() {
    let dir = TempDir::new().unwrap();
    let mut trainer = trainer_in(&dir);
    let frame = synthetic_frame();

    let train: Vec<usize> = (0..30).collect();
    let test: Vec<usize> = (30..40).collect();
    let specs = default_model_specs();
    let logistic_only = &specs[..1];
    trainer
        .train_all_models(&frame, logistic_only, Some((train, test.clone())))
        .unwrap();

    assert_eq!(trainer.test_labels().len(), test.len());
    assert_eq!(trainer.results().len(), 1);
}
