//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - runs the evaluation pipeline (or the sample generator)
//! - prints reports
//! - writes optional exports and debug bundles

use std::fs::File;

use clap::Parser;

use crate::cli::{Command, EvalArgs, SampleArgs};
use crate::domain::{EvalConfig, SampleConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `rul` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Eval(args) => handle_eval(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn handle_eval(args: EvalArgs) -> Result<(), AppError> {
    let config = eval_config_from_args(&args);
    let output = pipeline::run_eval(&config)?;

    println!("{}", crate::report::format_run_summary(&output.stats, &config));

    if !output.ingest_errors.is_empty() {
        println!(
            "({} record(s) dropped during ingest; see --debug-bundle for details)\n",
            output.ingest_errors.len()
        );
    }

    println!("{}", crate::report::format_bins_table(&output.cv));
    println!("{}", crate::report::format_regression_table(&output.regression));
    println!(
        "{}",
        crate::report::format_hold_out_table(&output.hold_out, config.hold_out_fold)
    );
    println!("{}", crate::report::format_sweep_table(&output.sweeps));
    println!("{}", crate::report::format_ranking(&output.ranking));

    // Optional exports.
    if let Some(path) = &config.export_bins {
        crate::io::export::write_bins_csv(path, &output.cv)?;
    }
    if let Some(path) = &config.export_sweeps {
        crate::io::export::write_sweeps_csv(path, &output.sweeps)?;
    }
    if config.debug_bundle {
        let path = crate::debug::write_debug_bundle(&output, &config)?;
        println!("Debug bundle written to {}", path.display());
    }

    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = sample_config_from_args(&args);
    let results = crate::data::generate_results(&config)?;

    let file = File::create(&config.output).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to create output file '{}': {e}", config.output.display()),
        )
    })?;
    serde_json::to_writer_pretty(file, &results)
        .map_err(|e| AppError::new(2, format!("Failed to write results JSON: {e}")))?;

    println!(
        "Wrote {} model(s) x {} fold(s) to {}",
        config.models,
        config.folds,
        config.output.display()
    );
    Ok(())
}

pub fn eval_config_from_args(args: &EvalArgs) -> EvalConfig {
    EvalConfig {
        input: args.input.clone(),
        format: args.format,
        nbins: args.nbins,
        window_size: args.window,
        horizon_steps: args.horizon_steps,
        q1: args.q1,
        q2: args.q2,
        epsilon: args.epsilon,
        rul_threshold: args.rul_threshold,
        fit_line_not_increasing: args.not_increasing,
        error_threshold: args.error_threshold,
        hold_out_fold: args.hold_out_fold,
        export_bins: args.export_bins.clone(),
        export_sweeps: args.export_sweeps.clone(),
        debug_bundle: args.debug_bundle,
    }
}

pub fn sample_config_from_args(args: &SampleArgs) -> SampleConfig {
    SampleConfig {
        output: args.output.clone(),
        models: args.models,
        folds: args.folds,
        lives_per_fold: args.lives,
        life_len_min: args.life_min,
        life_len_max: args.life_max,
        noise_sigma: args.noise,
        nan_prob: args.nan_prob,
        seed: args.seed,
    }
}
