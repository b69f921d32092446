//! Top-level application orchestration.
//!
//! `src/main.rs` is tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - resolves spectrum and concentration inputs (flags or interactive picker)
//! - runs the analysis pipeline
//! - prints reports and writes optional exports

use clap::Parser;

use crate::cli::{AnalysisArgs, Command, DemoArgs, FitArgs, picker};
use crate::data::{SyntheticSpec, generate_titration};
use crate::domain::{Concentrations, FitConfig};
use crate::error::AppError;
use crate::io::{
    CurvesFile, DirectorySource, FileSource, MemorySource, SpectrumSource, concentrations_from_lists,
    read_concentrations_csv, write_conflicts_csv, write_curves_json, write_results_csv,
};

pub mod pipeline;

/// Entry point for the `csp` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; RUST_LOG may be set there.
    let _ = dotenvy::dotenv();

    let cli = crate::cli::Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args.analysis);

    // `Some(n)` when the picker chose a directory of `n` peak lists.
    let mut picked: Option<usize> = None;
    let source: Box<dyn SpectrumSource> = if !args.files.is_empty() {
        Box::new(FileSource::new(args.files.clone(), config.axes))
    } else {
        let dir = match &args.dir {
            Some(dir) => dir.clone(),
            None => picker::prompt_for_titration_dir(&args.ext)?,
        };
        let source = DirectorySource::new(dir, args.ext.clone(), config.axes);
        if args.dir.is_none() {
            picked = Some(source.files()?.len());
        }
        Box::new(source)
    };

    let conc = resolve_concentrations(&args, picked)?;
    let run = pipeline::run_analysis(source.as_ref(), &conc, &config)?;
    print_report(&run, &config);
    write_exports(&run, &config)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args.analysis);
    let spec = SyntheticSpec {
        residues: args.residues,
        spectra: args.spectra,
        seed: args.seed,
        noise_sd: args.noise,
        missing_prob: args.missing,
        deviant_fraction: args.deviant,
        ..SyntheticSpec::default()
    };
    let titration = generate_titration(&spec)?;
    let source = MemorySource::new(format!("synthetic (seed {})", spec.seed), titration.spectra);

    let run = pipeline::run_analysis(&source, &titration.concentrations, &config)?;
    print_report(&run, &config);

    let deviant: Vec<&str> = titration
        .truth
        .iter()
        .filter(|r| r.deviant)
        .map(|r| r.label.as_str())
        .collect();
    if !deviant.is_empty() {
        println!("Simulated deviant residues: {}", deviant.join(", "));
    }

    write_exports(&run, &config)
}

fn resolve_concentrations(args: &FitArgs, picked: Option<usize>) -> Result<Concentrations, AppError> {
    if let Some(path) = &args.conc {
        return read_concentrations_csv(path);
    }
    if !args.host.is_empty() || !args.guest.is_empty() {
        return concentrations_from_lists(&args.host, &args.guest);
    }
    let Some(n_spectra) = picked else {
        return Err(AppError::input(
            "Missing concentrations: pass --host and --guest, or --conc <file.csv>.",
        ));
    };

    let (host, guest) = picker::prompt_for_concentrations(n_spectra)?;
    concentrations_from_lists(&host, &guest)
}

fn print_report(run: &pipeline::RunOutput, config: &FitConfig) {
    println!("{}", crate::report::format_run_summary(run, config));
    println!("{}", crate::report::format_results(&run.batch.fits));

    if run.assembled.matches.iter().any(|m| !m.outcome.conflicts.is_empty()) {
        println!("{}", crate::report::format_conflicts(&run.assembled.matches));
    }
    if !run.batch.skipped.is_empty() {
        println!("{}", crate::report::format_skipped(&run.batch.skipped));
    }
    if !run.warnings.is_empty() {
        println!("{}", crate::report::format_warnings(&run.warnings));
    }
}

fn write_exports(run: &pipeline::RunOutput, config: &FitConfig) -> Result<(), AppError> {
    if let Some(path) = &config.export_results {
        write_results_csv(path, &run.batch.fits)?;
        log::info!("wrote results to {}", path.display());
    }
    if let Some(path) = &config.export_conflicts {
        write_conflicts_csv(path, &run.assembled.matches)?;
        log::info!("wrote conflicts to {}", path.display());
    }
    if let Some(path) = &config.export_curves {
        let file = CurvesFile::build(&run.source, config.shift_weight, &run.batch.fits, &run.batch.curves);
        write_curves_json(path, &file)?;
        log::info!("wrote curves to {}", path.display());
    }
    Ok(())
}

pub fn fit_config_from_args(args: &AnalysisArgs) -> FitConfig {
    FitConfig {
        axes: args.axes,
        shift_weight: args.weight,
        ka_min: args.ka_min,
        ka_max: args.ka_max,
        ka_starts: args.starts,
        max_iterations: args.max_iter,
        min_points: args.min_points,
        iqr_factor: args.iqr_k,
        curve_points: args.curve_points,
        export_results: args.export.clone(),
        export_conflicts: args.export_conflicts.clone(),
        export_curves: args.export_curves.clone(),
    }
}

