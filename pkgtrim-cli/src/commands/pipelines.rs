use anyhow::{Result, bail};
use clap::Args;
use pkgtrim_core::{TrimConfig, console};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Args, Debug)]
pub struct PipelinesArgs {
    /// Show a single pipeline
    pub name: Option<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,

    /// Extra directory of pipeline definitions (repeatable)
    #[arg(long = "pipeline-dir", value_name = "DIR")]
    pub pipeline_dirs: Vec<PathBuf>,
}

#[derive(Serialize)]
struct PipelineEntry<'a> {
    name: &'a str,
    packages: &'a [String],
}

pub fn run(args: PipelinesArgs, config: TrimConfig) -> Result<ExitCode> {
    let config = config.with_overrides(None, &args.pipeline_dirs);
    let catalog = super::pipeline_catalog(&config.pipeline_dirs)?;

    let entries: Vec<PipelineEntry> = match &args.name {
        Some(name) => {
            if !catalog.contains(name) {
                bail!("no pipeline named {} needs any packages", name);
            }
            vec![PipelineEntry {
                name,
                packages: catalog.packages_needed_by(name),
            }]
        }
        None => catalog
            .iter()
            .map(|(name, packages)| PipelineEntry { name, packages })
            .collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(ExitCode::SUCCESS);
    }

    for entry in &entries {
        console::info(entry.name);
        console::detail("needs", &entry.packages.join(", "));
    }

    Ok(ExitCode::SUCCESS)
}
