use std::error::Error;
use std::process::ExitCode;

use dfdetect::config::AppConfig;
use dfdetect::ensemble::{EnsembleAggregator, EnsembleError, EvaluationReport};
use dfdetect::inference::backend_loader;

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Evaluation failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let app = AppConfig::load()?;
    let config = &app.ensemble;

    heading("ENSEMBLE MODEL EVALUATION");

    // Members share the serving device and layout settings but take the ensemble input size.
    let loader = backend_loader(
        app.model.device,
        config.input_size(),
        app.model.channels_first,
    );
    let (aggregator, dataset) = match EnsembleAggregator::prepare(config, loader.as_ref()) {
        Ok(prepared) => prepared,
        Err(EnsembleError::MissingModels { missing }) => {
            println!("\nThe following model files are missing:");
            for (id, path) in &missing {
                println!("  - {} ({})", id, path.display());
            }
            println!("\nTrain every configured model before evaluating the ensemble.");
            return Err(EnsembleError::MissingModels { missing }.into());
        }
        Err(e) => return Err(e.into()),
    };

    println!("\nEnsemble weights:");
    for (id, weight) in aggregator.weights().iter() {
        println!("  {}: {:.3}", id, weight);
    }
    if !config.use_weights {
        println!("  (ignored: combining with the unweighted mean)");
    }

    log::info!(
        "Evaluating {} images from {} in batches of {}",
        dataset.len(),
        dataset.root().display(),
        config.batch_size
    );
    let batches = dataset.batches(
        config.batch_size,
        config.input_size(),
        config.resize_method.filter(),
    )?;
    let report = aggregator.evaluate(batches, config.use_weights)?;

    print_report(&report);

    if let Some(path) = &config.report_path {
        let json = serde_json::to_string_pretty(&report.to_json())?;
        std::fs::write(path, json)?;
        log::info!("Wrote evaluation report to {}", path.display());
    }
    Ok(())
}

fn heading(title: &str) {
    println!("{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));
}

fn print_report(report: &EvaluationReport) {
    println!();
    heading("EVALUATION RESULTS");
    println!("Samples: {}", report.samples);

    println!("\nIndividual Models:");
    println!("{}", "-".repeat(40));
    for (id, metrics) in report.models() {
        println!(
            "{:12} - Accuracy: {:.4} ({:.2}%), Loss: {:.4}",
            id.as_ref().to_uppercase(),
            metrics.accuracy,
            metrics.accuracy * 100.0,
            metrics.loss
        );
    }

    if let Some(metrics) = report.ensemble() {
        println!("\nEnsemble Model:");
        println!("{}", "-".repeat(40));
        println!(
            "{:12} - Accuracy: {:.4} ({:.2}%), Loss: {:.4}",
            "ENSEMBLE",
            metrics.accuracy,
            metrics.accuracy * 100.0,
            metrics.loss
        );
    }

    println!();
    heading("SUMMARY");
    if let Some((id, best)) = report.best_individual() {
        println!(
            "Best individual model: {} ({:.2}%)",
            id.as_ref().to_uppercase(),
            best.accuracy * 100.0
        );
    }
    if let Some(ensemble) = report.ensemble() {
        println!("Ensemble accuracy: {:.2}%", ensemble.accuracy * 100.0);
    }
    match report.improvement() {
        Some(delta) if delta > 0.0 => println!("Ensemble improves by: +{:.2}%", delta * 100.0),
        Some(delta) if delta < 0.0 => println!("Ensemble is worse by: {:.2}%", delta * 100.0),
        Some(_) => println!("Ensemble matches best individual model"),
        None => {}
    }
}
