/*!
 * foldeval command line tool.
 *
 * Evaluates a CSV of out-of-fold predictions, or prepares a labeled CSV for
 * cross-validation by adding weight and fold columns.
 */

use anyhow::{bail, Context, Result};
use foldeval::{
    assign_weights, load_csv, print_results, write_csv, CrossValidationEvaluator,
    EvaluationConfig, PrecomputedFit, StratifiedFoldAssigner,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

const USAGE: &str = "\
Usage:
  foldeval <predictions.csv> [--config FILE] [--folds N] [--thresholds] [--json]
  foldeval <predictions.csv> --pooled [--config FILE]
  foldeval <labeled.csv> --assign OUTPUT.csv [--config FILE] [--folds N]

Options:
  --config FILE   Load settings from a .json or .toml file
                  (default: ./foldeval.toml when present)
  --folds N       Number of folds (overrides the configuration)
  --thresholds    Sweep decision thresholds and report the best one per class
  --json          Print the report as JSON
  --pooled        Score all predictions at once, ignoring folds; the matrix is
                  normalized when normalize_confusion_matrix is set
  --assign FILE   Write the input with weight and fold columns to FILE

Environment:
  FOLDEVAL_NUM_FOLDS, FOLDEVAL_APPLY_THRESHOLD_SELECTION, FOLDEVAL_THRESHOLDS,
  FOLDEVAL_PARALLEL_FOLDS, FOLDEVAL_NUM_THREADS, FOLDEVAL_RANDOM_SEED
  RUST_LOG controls log output";

#[derive(Debug, Default)]
struct Args {
    input: PathBuf,
    config: Option<PathBuf>,
    folds: Option<usize>,
    thresholds: bool,
    json: bool,
    pooled: bool,
    assign: Option<PathBuf>,
}

fn parse_args() -> Result<Option<Args>> {
    let mut args = Args::default();
    let mut input = None;
    let mut iter = std::env::args().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--config" => args.config = Some(iter.next().context("--config needs a file")?.into()),
            "--folds" => {
                let value = iter.next().context("--folds needs a number")?;
                args.folds = Some(value.parse().with_context(|| format!("bad --folds '{}'", value))?);
            }
            "--thresholds" => args.thresholds = true,
            "--json" => args.json = true,
            "--pooled" => args.pooled = true,
            "--assign" => args.assign = Some(iter.next().context("--assign needs a file")?.into()),
            other if other.starts_with("--") => bail!("unknown option {}\n\n{}", other, USAGE),
            other => {
                if input.replace(PathBuf::from(other)).is_some() {
                    bail!("only one input file is accepted\n\n{}", USAGE);
                }
            }
        }
    }

    args.input = input.with_context(|| format!("missing input file\n\n{}", USAGE))?;
    Ok(Some(args))
}

fn load_config(args: &Args) -> Result<EvaluationConfig> {
    let mut config = match &args.config {
        Some(path) => EvaluationConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EvaluationConfig::discover(".")?,
    };
    config.apply_environment_overrides()?;
    if let Some(folds) = args.folds {
        config.num_folds = folds;
    }
    if args.thresholds {
        config.apply_threshold_selection = true;
    }
    config.validate()?;
    Ok(config)
}

fn assign(args: &Args, config: &EvaluationConfig, output: &Path) -> Result<()> {
    let dataset = load_csv(&args.input, &config.dataset)?;

    let mut assigner = StratifiedFoldAssigner::new(config.num_folds)?;
    if let Some(seed) = config.shuffle_seed() {
        assigner = assigner.with_shuffle_seed(seed);
    }
    let prepared = assigner.assign(&assign_weights(&dataset)?)?;

    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    write_csv(&prepared, BufWriter::new(file), &config.dataset)?;
    println!(
        "Wrote {} rows in {} folds to {}",
        prepared.len(),
        config.num_folds,
        output.display()
    );
    Ok(())
}

fn evaluate_pooled(args: &Args, config: EvaluationConfig) -> Result<()> {
    let dataset = load_csv(&args.input, &config.dataset)?;
    let report = CrossValidationEvaluator::new(config)?.evaluate_pooled(&dataset)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_results(
            &mut std::io::stdout().lock(),
            report.accuracy,
            report.f1_macro,
            &report.f1_by_label,
            &report.confusion_matrix,
        )?;
    }
    Ok(())
}

fn evaluate(args: &Args, config: EvaluationConfig) -> Result<()> {
    let dataset = load_csv(&args.input, &config.dataset)?;
    let fit = PrecomputedFit::from_predictions(&dataset, config.num_folds)?;
    let report = CrossValidationEvaluator::new(config)?.evaluate(&fit, &dataset)?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.summary());
    }
    Ok(())
}

fn main() -> Result<()> {
    foldeval::init()?;

    let Some(args) = parse_args()? else {
        println!("{}", USAGE);
        return Ok(());
    };
    let config = load_config(&args)?;

    match &args.assign {
        Some(output) => assign(&args, &config, output),
        None if args.pooled => evaluate_pooled(&args, config),
        None => evaluate(&args, config),
    }
}
