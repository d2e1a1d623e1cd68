use crate::commands;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pkgtrim",
    about = "trim redundant packages from melange manifests",
    version,
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Remove packages already provided by another entry or by a pipeline
    Trim(commands::trim::TrimArgs),
    /// List known pipelines and the packages they need
    Pipelines(commands::pipelines::PipelinesArgs),
    /// Show what a package pulls in from the repository index
    Deps(commands::deps::DepsArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_trim_flags() {
        let cli = Cli::try_parse_from([
            "pkgtrim",
            "-v",
            "trim",
            "-n",
            "--no-pipeline-trim",
            "--arch",
            "arm64",
            "--pipeline-dir",
            "pipelines",
            "a.yaml",
            "b.yaml",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Command::Trim(args) = cli.command else {
            panic!("expected trim");
        };
        assert!(args.dry_run);
        assert!(args.no_pipeline_trim);
        assert!(!args.json);
        assert_eq!(args.arch.as_deref(), Some("arm64"));
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.pipeline_dirs.len(), 1);
    }

    #[test]
    fn trim_requires_a_file() {
        assert!(Cli::try_parse_from(["pkgtrim", "trim"]).is_err());
    }

    #[test]
    fn deps_collects_repositories() {
        let cli = Cli::try_parse_from([
            "pkgtrim",
            "deps",
            "curl",
            "--repository",
            "https://a.test/os",
            "--repository",
            "https://b.test/os",
            "--json",
        ])
        .unwrap();

        let Command::Deps(args) = cli.command else {
            panic!("expected deps");
        };
        assert_eq!(args.package, "curl");
        assert_eq!(args.repositories.len(), 2);
        assert!(args.json);
    }
}
