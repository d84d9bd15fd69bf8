#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

use crate::commands::{
    CatalogArgs, CheckArgs, ExportArgs, GenerateArgs, ImportArgs, run_catalog, run_check,
    run_export, run_generate, run_import,
};
use crate::error::Result;

#[derive(Debug, Parser)]
#[command(
    name = "caseplan",
    about = "Plan, check and exchange retail fish case layouts",
    version
)]
pub struct Cli {
    /// Log filter, e.g. `info` or `caseplan_runtime=debug`.
    #[arg(long, global = true, env = "CASEPLAN_LOG", default_value = "warn")]
    pub log: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the built-in product catalog as JSON.
    Catalog(CatalogArgs),

    /// Auto-generate a case from selected products.
    Generate(GenerateArgs),

    /// Validate a `.fishcase` file and summarize it.
    Check(CheckArgs),

    /// Import a `.fishcase` file into a planner state file.
    Import(ImportArgs),

    /// Export a layout from a planner state file as `.fishcase`.
    Export(ExportArgs),
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    crate::init_tracing(&cli.log);
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Catalog(args) => run_catalog(&args),
        Commands::Generate(args) => run_generate(&args),
        Commands::Check(args) => run_check(&args),
        Commands::Import(args) => run_import(&args),
        Commands::Export(args) => run_export(&args),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::{Cli, Commands, run};
    use crate::commands::CheckArgs;
    use crate::error::CliError;

    #[test]
    fn select_list_splits_on_commas() {
        let cli = Cli::try_parse_from([
            "caseplan", "generate", "--select", "p1,p3:sale", "--select", "p5", "--width", "40",
        ])
        .unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.select, vec!["p1", "p3:sale", "p5"]);
        assert_eq!(args.width, 40);
        assert_eq!(args.name, "Generated case");
    }

    #[test]
    fn generate_requires_a_selection() {
        assert!(Cli::try_parse_from(["caseplan", "generate"]).is_err());
    }

    #[test]
    fn check_command_reports_missing_file() {
        let result = run(Cli {
            log: "warn".into(),
            command: Commands::Check(CheckArgs {
                file: PathBuf::from("/nonexistent/weekend.fishcase"),
            }),
        });
        assert!(matches!(result, Err(CliError::Read { .. })));
    }
}
