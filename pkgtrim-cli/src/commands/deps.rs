use anyhow::Result;
use clap::Args;
use pkgtrim_core::index::{HttpIndexSource, IndexRequest, filter_repositories};
use pkgtrim_core::{TrimConfig, console, operations};
use std::process::ExitCode;

#[derive(Args, Debug)]
pub struct DepsArgs {
    /// Package to look up
    pub package: String,

    /// Repository to load (repeatable; defaults to the configured one)
    #[arg(long = "repository", value_name = "URL")]
    pub repositories: Vec<String>,

    /// Index architecture (defaults to the host)
    #[arg(long)]
    pub arch: Option<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: DepsArgs, config: TrimConfig) -> Result<ExitCode> {
    let config = config.with_overrides(args.arch.as_deref(), &[]);

    let mut repositories = filter_repositories(&args.repositories);
    if repositories.is_empty() {
        repositories.push(config.default_repository.clone());
    }

    if !args.json {
        console::header("deps");
        console::step(&format!("loading {} index", config.arch));
    }

    let request = IndexRequest::new(repositories, &config.arch);
    let source = HttpIndexSource::new()?;
    let result = operations::describe(&args.package, &request, &source);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result?)?);
        return Ok(ExitCode::SUCCESS);
    }

    console::clear_line();
    let report = result?;

    console::info(&format!("{}@{}", report.name, report.version));
    print_list("depends", &report.dependencies);
    print_list("provides", &report.provides);
    print_list("closure", &report.transitive);

    Ok(ExitCode::SUCCESS)
}

fn print_list(label: &str, items: &[String]) {
    if items.is_empty() {
        console::detail(label, "(none)");
    } else {
        console::detail(label, &items.join(", "));
    }
}
