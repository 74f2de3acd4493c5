//! pagefit CLI - batch conversion to PDF, one landscape page per sheet

mod batch;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use pagefit::{ConversionRequest, Converter, ConverterConfig, FitStrategy, DEFAULT_IMAGE_DPI};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::batch::Job;

/// Errors listed individually at the end of a run.
const MAX_REPORTED_ERRORS: usize = 50;

#[derive(Parser)]
#[command(name = "pagefit")]
#[command(
    author,
    version,
    about = "Convert a directory of documents to PDF, printing every spreadsheet sheet on one landscape page"
)]
struct Cli {
    /// Directory scanned recursively for inputs
    #[arg(short, long, env = "PAGEFIT_INPUT", default_value = "input")]
    input: PathBuf,

    /// Directory the PDFs are written to
    #[arg(short, long, env = "PAGEFIT_OUTPUT", default_value = "output")]
    output: PathBuf,

    /// Write every PDF directly into the output directory
    #[arg(long)]
    flatten: bool,

    /// Resolution for raster images
    #[arg(long, default_value_t = DEFAULT_IMAGE_DPI)]
    image_dpi: u32,

    /// How sheets are scaled onto one page: auto or manual
    #[arg(long, default_value = "auto")]
    fit_strategy: FitStrategy,

    /// Path to the soffice executable
    #[arg(long, env = "PAGEFIT_SOFFICE")]
    soffice: Option<PathBuf>,

    /// Convert spreadsheets without page fitting
    #[arg(long)]
    no_fit: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "pagefit=debug,pagefit_libreoffice=debug,libreoffice_urp=debug"
    } else {
        "pagefit=info,pagefit_libreoffice=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    if !cli.input.is_dir() {
        eprintln!("Error: input directory {} does not exist", cli.input.display());
        return Ok(ExitCode::from(2));
    }

    let inputs = batch::collect_inputs(&cli.input, Some(&cli.output))
        .with_context(|| format!("scanning {}", cli.input.display()))?;
    if inputs.is_empty() {
        info!(input = %cli.input.display(), "no supported files");
        return Ok(ExitCode::SUCCESS);
    }
    let jobs = batch::plan(&cli.input, &inputs, &cli.output, cli.flatten);

    let mut config = ConverterConfig {
        fit_strategy: cli.fit_strategy,
        image_dpi: cli.image_dpi,
        spreadsheet_fitting: !cli.no_fit,
        ..ConverterConfig::default()
    };
    if let Some(soffice) = cli.soffice {
        config = config.with_soffice(soffice);
    }
    let mut converter = Converter::new(config);

    info!(files = jobs.len(), output = %cli.output.display(), "converting");
    let mut errors = Vec::new();
    for job in &jobs {
        match convert_one(&mut converter, job).await {
            Ok(path) => println!("{}", path.display()),
            Err(err) => {
                warn!(input = %job.input.display(), error = %format!("{err:#}"), "conversion failed");
                errors.push(format!("{err:#}"));
            }
        }
    }

    if errors.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    eprintln!("{} of {} files failed:", errors.len(), jobs.len());
    for err in errors.iter().take(MAX_REPORTED_ERRORS) {
        eprintln!("  {err}");
    }
    if errors.len() > MAX_REPORTED_ERRORS {
        eprintln!("  … and {} more", errors.len() - MAX_REPORTED_ERRORS);
    }
    Ok(ExitCode::FAILURE)
}

async fn convert_one(converter: &mut Converter, job: &Job) -> Result<PathBuf> {
    let result = converter
        .convert(&ConversionRequest::new(&job.input))
        .await
        .with_context(|| format!("converting {}", job.input.display()))?;
    result
        .persist(&job.output)
        .await
        .with_context(|| format!("writing {}", job.output.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["pagefit"]).unwrap();
        assert_eq!(cli.image_dpi, 200);
        assert_eq!(cli.fit_strategy, FitStrategy::Automatic);
        assert!(!cli.flatten);
        assert!(!cli.no_fit);
    }

    #[test]
    fn test_fit_strategy_flag() {
        let cli = Cli::try_parse_from(["pagefit", "--fit-strategy", "manual", "--no-fit", "-v"])
            .unwrap();
        assert_eq!(cli.fit_strategy, FitStrategy::ComputedManual);
        assert!(cli.no_fit);
        assert!(cli.verbose);
        assert!(Cli::try_parse_from(["pagefit", "--fit-strategy", "sideways"]).is_err());
    }

    #[test]
    fn test_clap_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
