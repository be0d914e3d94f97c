use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use std::fs;
use test_api_usage::analysis::Analyzer;
use test_api_usage::cli;
use test_api_usage::config::AnalyzerConfig;
use test_api_usage::error::IoError;
use test_api_usage::logging::{self, Verbosity};
use test_api_usage::output::OutputFormatter;
use tracing::info;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    logging::init(Verbosity::from_flags(args.verbose, args.quiet));
    args.validate().context("Invalid arguments")?;

    let config = match &args.config {
        Some(path) => AnalyzerConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalyzerConfig::default(),
    };

    let analysis = Analyzer::new(config)
        .with_callgraph(args.callgraph)
        .analyze_path(&args.path)
        .with_context(|| format!("Analysis of {} failed", args.path.display()))?;

    let rendered = OutputFormatter::format(&analysis.report, args.format)?;
    match &args.output_file {
        Some(path) => {
            fs::write(path, rendered).map_err(|e| IoError::write_error(path, e))?;
            info!(path = %path.display(), format = args.format.as_str(), "report written");
        }
        None => println!("{rendered}"),
    }

    Ok(())
}
