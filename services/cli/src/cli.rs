use crate::commands::{
    run_batch, run_calculate, run_evaluate, run_optimize, run_presets, BatchArgs, CalculateArgs,
    EvaluateArgs, OptimizeArgs,
};
use crate::infra::parse_preset;
use crate::server;
use clap::{Args, Parser, Subcommand};
use reimburse::error::AppError;
use reimburse::model::Preset;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "reimburse",
    about = "Score travel reimbursements with the legacy-calculator replica and tune its parameters",
    version,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a single trip and print the amount
    Calculate(CalculateArgs),
    /// Score every row of a JSON or CSV file, one output line per row
    Batch(BatchArgs),
    /// Compare predictions with labeled cases and report the error
    Evaluate(EvaluateArgs),
    /// Search model parameters against labeled cases and save the winner
    Optimize(OptimizeArgs),
    /// List the built-in model presets
    Presets,
    /// Start the HTTP service
    Serve(ServeArgs),
}

/// Selects the scoring model; falls back to REIMBURSE_MODEL_PATH and
/// REIMBURSE_PRESET when neither flag is given.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct ModelArgs {
    /// Built-in preset (base, conservative, enhanced, phase2, edge_case, ensemble)
    #[arg(long, value_parser = parse_preset)]
    pub(crate) preset: Option<Preset>,
    /// Saved model artifact produced by `optimize`; wins over --preset
    #[arg(long)]
    pub(crate) model: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) model: ModelArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Calculate(args) => run_calculate(args),
        Command::Batch(args) => run_batch(args),
        Command::Evaluate(args) => run_evaluate(args),
        Command::Optimize(args) => run_optimize(args),
        Command::Presets => run_presets(),
        Command::Serve(args) => server::run(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_invocation_prints_usage() {
        let err = Cli::try_parse_from(["reimburse"]).expect_err("a command is required");
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn calculate_requires_three_numbers() {
        let err = Cli::try_parse_from(["reimburse", "calculate", "3", "93"])
            .expect_err("receipts missing");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn calculate_accepts_negative_days_for_validation() {
        let cli = Cli::try_parse_from(["reimburse", "calculate", "-2", "100", "50.5"])
            .expect("arguments parse");
        match cli.command {
            Command::Calculate(args) => assert_eq!(args.days, -2),
            other => panic!("expected calculate, got {other:?}"),
        }
    }

    #[test]
    fn model_flags_parse() {
        let cli = Cli::try_parse_from([
            "reimburse",
            "batch",
            "--input",
            "rows.csv",
            "--preset",
            "phase2",
        ])
        .expect("arguments parse");
        match cli.command {
            Command::Batch(args) => assert_eq!(args.model.preset, Some(Preset::Phase2)),
            other => panic!("expected batch, got {other:?}"),
        }
    }
}
