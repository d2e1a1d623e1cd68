use anyhow::Result;
use clap::Args;
use pkgtrim_core::index::HttpIndexSource;
use pkgtrim_core::operations::{self, TrimOptions, TrimReport, Trimmer};
use pkgtrim_core::pipelines::PipelineResolver;
use pkgtrim_core::{TrimConfig, console};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Args, Debug)]
pub struct TrimArgs {
    /// Manifests to trim
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Report what would be removed without touching the files
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,

    /// Only remove transitive dependencies, never pipeline-provided packages
    #[arg(long = "no-pipeline-trim")]
    pub no_pipeline_trim: bool,

    /// Index architecture (defaults to the host)
    #[arg(long)]
    pub arch: Option<String>,

    /// Extra directory of pipeline definitions (repeatable)
    #[arg(long = "pipeline-dir", value_name = "DIR")]
    pub pipeline_dirs: Vec<PathBuf>,
}

pub fn run(args: TrimArgs, config: TrimConfig) -> Result<ExitCode> {
    let config = config.with_overrides(args.arch.as_deref(), &args.pipeline_dirs);

    let pipelines = if args.no_pipeline_trim {
        None
    } else {
        Some(PipelineResolver::with_catalog(super::pipeline_catalog(
            &config.pipeline_dirs,
        )?))
    };

    let options = TrimOptions {
        dry_run: args.dry_run,
        pipeline_trim: !args.no_pipeline_trim,
        arch: config.arch.clone(),
        default_repository: config.default_repository.clone(),
    };

    if args.json {
        let reports = operations::trim(&args.files, options, pipelines)?;
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(exit_code(&reports));
    }

    console::header("trim");

    let mut trimmer = Trimmer::new(options, pipelines, Box::new(HttpIndexSource::new()?));
    let mut reports = Vec::with_capacity(args.files.len());

    for path in &args.files {
        console::step(&format!("checking {}", path.display()));
        let report = trimmer.trim_file(path);
        console::clear_line();

        print_report(&report, args.dry_run);
        reports.push(report);
    }

    console::done(reports.len());
    Ok(exit_code(&reports))
}

fn print_report(report: &TrimReport, dry_run: bool) {
    for entry in &report.redundant {
        console::removal(
            &report.file,
            &entry.finding.package,
            &entry.scope,
            entry.finding.reason.as_str(),
            &entry.finding.provided_by,
            dry_run,
        );
    }

    if let Some(error) = &report.error {
        console::file_error(&report.file, error);
    } else if report.redundant.is_empty() {
        console::nothing_to_trim(&report.file);
    } else {
        console::file_summary(&report.file, report.total_removed, dry_run);
    }
}

fn exit_code(reports: &[TrimReport]) -> ExitCode {
    if reports.iter().any(TrimReport::failed) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
