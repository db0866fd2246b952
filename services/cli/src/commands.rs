use crate::cli::ModelArgs;
use crate::infra::{build_scorer, resolve_source};
use clap::{Args, ValueEnum};
use reimburse::config::{ModelSource, TelemetryConfig};
use reimburse::dataset::{self, write_batch};
use reimburse::error::AppError;
use reimburse::model::{ModelArtifact, Preset, TripInput};
use reimburse::optimizer::{
    CoordinateSearch, DatasetEvaluator, EvaluationReport, GeneticSearch, GridSearch, Objective,
    OptimizationOutcome, Optimizer, ParameterSpace, SearchBudget, SearchStrategy,
};
use reimburse::telemetry;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct CalculateArgs {
    /// Trip duration in days
    #[arg(allow_negative_numbers = true)]
    pub(crate) days: i64,
    /// Miles traveled
    #[arg(allow_negative_numbers = true)]
    pub(crate) miles: f64,
    /// Total receipts amount in dollars
    #[arg(allow_negative_numbers = true)]
    pub(crate) receipts: f64,
    /// Print the features and per-stage trace as JSON instead of the amount
    #[arg(long)]
    pub(crate) explain: bool,
    #[command(flatten)]
    pub(crate) model: ModelArgs,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// JSON or CSV file with trip_duration_days, miles_traveled, total_receipts_amount
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Where to write one amount per line (defaults to stdout)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    #[command(flatten)]
    pub(crate) model: ModelArgs,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Labeled cases (JSON or CSV with expected_output)
    #[arg(long)]
    pub(crate) cases: PathBuf,
    /// Number of highest-error cases to list
    #[arg(long, default_value_t = 5)]
    pub(crate) top: usize,
    /// Print the report as JSON
    #[arg(long)]
    pub(crate) json: bool,
    #[command(flatten)]
    pub(crate) model: ModelArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum StrategyArg {
    Grid,
    Coordinate,
    Genetic,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum ObjectiveArg {
    Mae,
    Sse,
}

impl From<ObjectiveArg> for Objective {
    fn from(value: ObjectiveArg) -> Self {
        match value {
            ObjectiveArg::Mae => Objective::MeanAbsoluteError,
            ObjectiveArg::Sse => Objective::SumSquaredError,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct OptimizeArgs {
    /// Labeled cases (JSON or CSV with expected_output)
    #[arg(long)]
    pub(crate) cases: PathBuf,
    #[arg(long, value_enum, default_value_t = StrategyArg::Coordinate)]
    pub(crate) strategy: StrategyArg,
    #[arg(long, value_enum, default_value_t = ObjectiveArg::Mae)]
    pub(crate) objective: ObjectiveArg,
    /// Stop after this many configuration evaluations
    #[arg(long, default_value_t = 10_000)]
    pub(crate) max_evaluations: usize,
    /// Stop after this many seconds
    #[arg(long)]
    pub(crate) time_limit_secs: Option<u64>,
    /// Stop after this many evaluations without improvement
    #[arg(long)]
    pub(crate) patience: Option<usize>,
    /// Seed for the genetic strategy
    #[arg(long, default_value_t = 42)]
    pub(crate) seed: u64,
    #[arg(long)]
    pub(crate) population: Option<usize>,
    #[arg(long)]
    pub(crate) generations: Option<usize>,
    /// Absolute error charged to a case that fails to score
    #[arg(long, default_value_t = reimburse::optimizer::DEFAULT_FAILURE_PENALTY)]
    pub(crate) failure_penalty: f64,
    /// Artifact path for the winning configuration
    #[arg(long, default_value = "model.json")]
    pub(crate) output: PathBuf,
    /// Name recorded in the artifact
    #[arg(long, default_value = "optimized")]
    pub(crate) name: String,
    #[command(flatten)]
    pub(crate) model: ModelArgs,
}

/// Offline commands read only the log level and, when no model flag is
/// given, the model source. Server settings are never consulted.
fn init_telemetry() -> Result<(), AppError> {
    telemetry::init(&TelemetryConfig::from_env())?;
    Ok(())
}

pub(crate) fn run_calculate(args: CalculateArgs) -> Result<(), AppError> {
    init_telemetry()?;
    let source = resolve_source(args.model.preset, args.model.model, ModelSource::from_env)?;
    let scorer = build_scorer(&source)?;
    let input = TripInput::new(args.days, args.miles, args.receipts)?;

    if args.explain {
        let explanation = scorer.explain(&input)?;
        let rendered = serde_json::to_string_pretty(&explanation)
            .map_err(|err| AppError::Io(io::Error::other(err)))?;
        println!("{rendered}");
    } else {
        println!("{:.2}", scorer.amount(&input)?);
    }
    Ok(())
}

pub(crate) fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    init_telemetry()?;
    let source = resolve_source(args.model.preset, args.model.model, ModelSource::from_env)?;
    let scorer = build_scorer(&source)?;

    let rows = dataset::load_batch_rows(&args.input)?;
    let results = dataset::score_batch(&scorer, &rows);
    let summary = match args.output {
        Some(path) => write_batch(BufWriter::new(File::create(&path)?), &results)?,
        None => write_batch(io::stdout().lock(), &results)?,
    };

    info!(
        model = %source.label(),
        rows = summary.rows,
        failed = summary.failed,
        "batch complete"
    );
    Ok(())
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    init_telemetry()?;
    let source = resolve_source(args.model.preset, args.model.model, ModelSource::from_env)?;
    let scorer = build_scorer(&source)?;

    let cases = dataset::load_labeled_cases(&args.cases)?;
    let evaluator = DatasetEvaluator::new(&cases, Objective::MeanAbsoluteError)?;
    let report = evaluator.evaluate(scorer.config());
    let worst = evaluator.worst_cases(scorer.config(), args.top);

    if args.json {
        let body = serde_json::json!({
            "model": source.label(),
            "report": report,
            "worst_cases": worst,
        });
        let rendered = serde_json::to_string_pretty(&body)
            .map_err(|err| AppError::Io(io::Error::other(err)))?;
        println!("{rendered}");
        return Ok(());
    }

    let mut out = io::stdout().lock();
    render_report(&mut out, &source.label(), &report)?;
    if !worst.is_empty() {
        writeln!(out, "\nHighest-error cases:")?;
    }
    for (rank, case) in worst.iter().enumerate() {
        let record = &case.record;
        writeln!(
            out,
            "  {}. Case {}: {} days, {} miles, ${:.2}",
            rank + 1,
            case.index + 1,
            record.trip_duration_days,
            record.miles_traveled,
            record.total_receipts_amount
        )?;
        match case.predicted {
            Some(predicted) => writeln!(
                out,
                "     Expected: ${:.2}, Got: ${:.2}, Error: ${:.2}",
                case.expected, predicted, case.error
            )?,
            None => writeln!(
                out,
                "     Expected: ${:.2}, Got: ERROR, Error: ${:.2}",
                case.expected, case.error
            )?,
        }
        if let (Some(mpd), Some(rpd)) = (case.miles_per_day, case.receipts_per_day) {
            writeln!(out, "     Miles/day: {mpd:.1}, Receipts/day: ${rpd:.2}")?;
        }
    }
    Ok(())
}

fn render_report<W: Write>(out: &mut W, model: &str, report: &EvaluationReport) -> io::Result<()> {
    let percent = |count: usize| 100.0 * count as f64 / report.cases.max(1) as f64;
    writeln!(out, "Evaluation of {model} on {} cases", report.cases)?;
    writeln!(
        out,
        "  Exact matches (±$0.01): {} ({:.1}%)",
        report.exact_matches,
        percent(report.exact_matches)
    )?;
    writeln!(
        out,
        "  Close matches (±$1.00): {} ({:.1}%)",
        report.close_matches,
        percent(report.close_matches)
    )?;
    writeln!(out, "  Average error: ${:.2}", report.mean_absolute_error)?;
    writeln!(out, "  Maximum error: ${:.2}", report.max_error)?;
    if report.failures > 0 {
        writeln!(out, "  Failed cases: {}", report.failures)?;
    }
    Ok(())
}

pub(crate) fn run_optimize(args: OptimizeArgs) -> Result<(), AppError> {
    init_telemetry()?;
    let source = resolve_source(
        args.model.preset,
        args.model.model.clone(),
        ModelSource::from_env,
    )?;
    let initial = source.load()?;

    let cases = dataset::load_labeled_cases(&args.cases)?;
    let evaluator = DatasetEvaluator::new(&cases, args.objective.into())?
        .with_failure_penalty(args.failure_penalty);
    let space = ParameterSpace::for_config(&initial)?;

    let mut budget = SearchBudget::unbounded().with_max_evaluations(args.max_evaluations);
    if let Some(seconds) = args.time_limit_secs {
        budget = budget.with_time_limit(Duration::from_secs(seconds));
    }
    if let Some(patience) = args.patience {
        budget = budget.with_patience(patience);
    }

    let strategy = build_strategy(&args);
    info!(
        model = %source.label(),
        cases = evaluator.len(),
        strategy = strategy.name(),
        "optimizing"
    );

    let outcome = Optimizer::new(&evaluator, space)
        .with_budget(budget)
        .run(initial, &strategy)?;

    let artifact = ModelArtifact::new(args.name.clone(), outcome.best_config.clone())
        .with_score(outcome.objective, outcome.best_score);
    artifact.save(&args.output)?;

    render_outcome(&mut io::stdout().lock(), &outcome, &args.output)?;
    Ok(())
}

fn build_strategy(args: &OptimizeArgs) -> SearchStrategy {
    match args.strategy {
        StrategyArg::Grid => SearchStrategy::Grid(GridSearch::default()),
        StrategyArg::Coordinate => SearchStrategy::Coordinate(CoordinateSearch::default()),
        StrategyArg::Genetic => {
            let defaults = GeneticSearch::default().with_seed(args.seed);
            SearchStrategy::Genetic(GeneticSearch {
                population: args.population.unwrap_or(defaults.population),
                generations: args.generations.unwrap_or(defaults.generations),
                ..defaults
            })
        }
    }
}

fn render_outcome<W: Write>(
    out: &mut W,
    outcome: &OptimizationOutcome,
    artifact: &std::path::Path,
) -> io::Result<()> {
    writeln!(
        out,
        "{} search finished ({}) after {} evaluations",
        outcome.strategy, outcome.termination, outcome.evaluations
    )?;
    writeln!(
        out,
        "  {}: {:.4} -> {:.4} (improvement {:.4})",
        outcome.objective,
        outcome.initial_score,
        outcome.best_score,
        outcome.initial_score - outcome.best_score
    )?;
    writeln!(out, "  Saved model to {}", artifact.display())
}

pub(crate) fn run_presets() -> Result<(), AppError> {
    let mut out = io::stdout().lock();
    for preset in Preset::all() {
        writeln!(out, "{:<14}{}", preset.name(), preset.description())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reimburse::model::TripRecord;
    use reimburse::optimizer::{Termination, DEFAULT_FAILURE_PENALTY};

    fn optimize_args(strategy: StrategyArg) -> OptimizeArgs {
        OptimizeArgs {
            cases: PathBuf::from("cases.json"),
            strategy,
            objective: ObjectiveArg::Mae,
            max_evaluations: 100,
            time_limit_secs: None,
            patience: None,
            seed: 9,
            population: Some(12),
            generations: None,
            failure_penalty: DEFAULT_FAILURE_PENALTY,
            output: PathBuf::from("model.json"),
            name: "test".to_string(),
            model: ModelArgs::default(),
        }
    }

    #[test]
    fn genetic_strategy_takes_overrides() {
        match build_strategy(&optimize_args(StrategyArg::Genetic)) {
            SearchStrategy::Genetic(search) => {
                assert_eq!(search.seed, 9);
                assert_eq!(search.population, 12);
                assert_eq!(search.generations, GeneticSearch::default().generations);
            }
            other => panic!("expected genetic, got {}", other.name()),
        }
    }

    #[test]
    fn report_lists_match_counts() {
        let records = vec![TripRecord::new(3, 93.0, 1.42).labeled(1.0)];
        let evaluator =
            DatasetEvaluator::new(&records, Objective::MeanAbsoluteError).expect("labeled");
        let report = evaluator.evaluate(&Preset::Base.config());

        let mut out = Vec::new();
        render_report(&mut out, "preset:base", &report).expect("write to memory");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Evaluation of preset:base on 1 cases"));
        assert!(text.contains("Exact matches (±$0.01): 0 (0.0%)"));
    }

    #[test]
    fn outcome_summary_names_the_artifact() {
        let outcome = OptimizationOutcome {
            strategy: "grid",
            objective: Objective::MeanAbsoluteError,
            initial_score: 12.5,
            best_score: 10.0,
            best_config: Preset::Base.config(),
            evaluations: 7,
            iterations: 1,
            termination: Termination::Completed,
            history: Vec::new(),
            elapsed: Duration::ZERO,
        };
        let mut out = Vec::new();
        render_outcome(&mut out, &outcome, std::path::Path::new("tuned.json"))
            .expect("write to memory");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("grid search finished (search completed) after 7 evaluations"));
        assert!(text.contains("improvement 2.5000"));
        assert!(text.contains("tuned.json"));
    }
}
