//! `hitsong`: the end-to-end hit-song prediction pipeline.
//!
//! Load song data, engineer features, train the classifier registry,
//! evaluate every trained model and render the run's charts and reports.

mod config;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use hitsong_data::DataLoader;
use hitsong_eval::{MetricsReporter, MetricsRow, ModelEvaluator};
use hitsong_features::FeatureEngineer;
use hitsong_models::{default_model_specs, ModelTrainer, TrainerConfig};
use hitsong_plot::{ModelScore, Plotter};

use config::PipelineConfig;

#[derive(Parser, Debug)]
#[command(name = "hitsong", about = "Hit song prediction pipeline", version)]
struct Args {
    /// TOML config file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory with raw per-decade CSV files.
    #[arg(long)]
    raw_dir: Option<PathBuf>,

    /// Directory with pre-processed train/test CSV files.
    #[arg(long)]
    processed_dir: Option<PathBuf>,

    /// Output directory for models and the feature schema.
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Output directory for charts.
    #[arg(long)]
    figures_dir: Option<PathBuf>,

    /// Output directory for metric summaries.
    #[arg(long)]
    reports_dir: Option<PathBuf>,

    /// Synthesize a placeholder label when the data has none.
    #[arg(long)]
    synthesize_target: bool,

    /// Skip chart rendering.
    #[arg(long)]
    skip_plots: bool,

    /// Seed for splits, folds and stochastic models.
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(dir) = self.raw_dir {
            config.raw_dir = dir;
        }
        if let Some(dir) = self.processed_dir {
            config.processed_dir = dir;
        }
        if let Some(dir) = self.models_dir {
            config.models_dir = dir;
        }
        if let Some(dir) = self.figures_dir {
            config.figures_dir = dir;
        }
        if let Some(dir) = self.reports_dir {
            config.reports_dir = dir;
        }
        if self.synthesize_target {
            config.synthesize_target = true;
        }
        if self.skip_plots {
            config.skip_plots = true;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        Ok(config)
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        error!(error = ?err, "pipeline failed");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = args.into_config()?;

    let loader = DataLoader::new(&config.raw_dir, &config.processed_dir)
        .synthesize_target(config.synthesize_target)
        .with_seed(config.seed);
    let data = loader.load().context("loading song data")?;
    info!(
        rows = data.combined.n_rows(),
        columns = data.combined.n_cols(),
        "data loaded"
    );

    let engineer = FeatureEngineer::new();
    let (engineered, schema) = engineer
        .fit_transform(&data.combined)
        .context("engineering features")?;
    schema
        .save(&config.models_dir.join("feature_schema.json"))
        .context("saving feature schema")?;

    let mut trainer = ModelTrainer::new(TrainerConfig {
        test_ratio: config.test_ratio,
        cv_folds: config.cv_folds,
        seed: config.seed,
        models_dir: config.models_dir.join("saved_models"),
    });
    trainer
        .train_all_models(&engineered, &default_model_specs(), None)
        .context("training models")?;
    if trainer.results().is_empty() {
        anyhow::bail!("every model failed to train");
    }

    let evaluator = ModelEvaluator::new(&config.figures_dir);
    let y_true = trainer.test_labels().to_vec();
    let mut rows = Vec::new();
    for (name, result) in trainer.results() {
        let metrics = if config.skip_plots {
            evaluator.calculate_metrics(&y_true, &result.predictions, Some(&result.probabilities))?
        } else {
            let report = evaluator.generate_detailed_report(
                name,
                &y_true,
                &result.predictions,
                Some(&result.probabilities),
            )?;
            println!("\n{name}\n{}", report.classification_report);
            report.metrics
        };
        rows.push(MetricsRow {
            model: name.clone(),
            accuracy: metrics.accuracy,
            precision: metrics.precision,
            recall: metrics.recall,
            f1: metrics.f1,
            roc_auc: metrics.roc_auc,
            cv_mean: result.cv_mean,
            cv_std: result.cv_std,
        });
    }

    MetricsReporter::new(&config.reports_dir)
        .write_all(&rows)
        .context("writing metric summaries")?;

    if !config.skip_plots {
        let scores: Vec<ModelScore> = trainer
            .results()
            .iter()
            .map(|(name, r)| ModelScore {
                name: name.clone(),
                test_accuracy: r.test_accuracy,
                cv_mean: r.cv_mean,
            })
            .collect();
        let importances: Vec<(String, Vec<f64>)> = trainer
            .results()
            .iter()
            .filter_map(|(name, r)| {
                r.feature_importances
                    .as_ref()
                    .map(|imp| (name.clone(), imp.clone()))
            })
            .collect();
        Plotter::new(&config.figures_dir)
            .create_comprehensive_plots(
                &engineered,
                &scores,
                trainer.feature_columns(),
                &importances,
            )
            .context("rendering charts")?;
    }

    let (best_name, best) = trainer.get_best_model()?;
    info!(
        model = best_name,
        test_accuracy = best.test_accuracy,
        cv_mean = best.cv_mean,
        "best model"
    );
    println!(
        "Best model: {best_name} (test accuracy {:.4}, cv {:.4} +/- {:.4})",
        best.test_accuracy, best.cv_mean, best.cv_std
    );
    Ok(())
}
