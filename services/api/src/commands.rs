use std::io::Read;
use std::path::{Path, PathBuf};

use btcmi::config::AppConfig;
use btcmi::data::{closes, load_ohlcv};
use btcmi::engines::EngineError;
use btcmi::error::AppError;
use btcmi::research::{BacktestRun, FittedFeatures, FractalModel};
use btcmi::schema::{load_json, validate_file, SchemaKind, SchemaRegistry};
use btcmi::{EngineMode, EngineRegistry, RunPayload};
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

/// How a command finished when it did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    /// The report was written but does not satisfy the output schema.
    OutputInvalid,
}

impl CommandOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::OutputInvalid => 2,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Input payload (JSON); `-` reads standard input
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Where to write the report
    #[arg(long)]
    pub(crate) out: PathBuf,
    /// Use this timestamp as `asof` instead of the current time
    #[arg(long)]
    pub(crate) fixed_ts: Option<String>,
    /// Run the layered v2.fractal engine
    #[arg(long)]
    pub(crate) fractal: bool,
    /// Engine to run; overrides --fractal and the payload's mode
    #[arg(long, value_parser = parse_mode)]
    pub(crate) mode: Option<EngineMode>,
}

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// JSON schema file
    #[arg(long)]
    pub(crate) schema: PathBuf,
    /// JSON document to check
    #[arg(long)]
    pub(crate) data: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct BacktestArgs {
    /// Candle file (.csv or .json) with timestamp/open/high/low/close/volume
    #[arg(long)]
    pub(crate) candles: PathBuf,
    /// Rolling window length; omit for an expanding-window backtest
    #[arg(long)]
    pub(crate) window: Option<usize>,
    /// Include detrended fluctuation analysis in the fitted features
    #[arg(long)]
    pub(crate) dfa: bool,
    /// Include multifractal DFA in the fitted features
    #[arg(long)]
    pub(crate) mfdfa: bool,
    /// Include approximate entropy in the fitted features
    #[arg(long)]
    pub(crate) apen: bool,
    /// Capital used to size the latest position
    #[arg(long, default_value_t = 1.0)]
    pub(crate) capital: f64,
}

fn parse_mode(raw: &str) -> Result<EngineMode, String> {
    raw.parse::<EngineMode>().map_err(|err| err.to_string())
}

fn read_input(input: &Path) -> Result<Value, AppError> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(serde_json::from_str(&text)?);
    }
    Ok(load_json(input)?)
}

/// Pick the engine: `--mode`, then `--fractal`, then the payload's `mode`,
/// then the configured default. Disagreement between an explicit flag and
/// the payload is logged, and the flag wins.
pub(crate) fn resolve_mode(
    args: &RunArgs,
    payload: &RunPayload,
    default_mode: EngineMode,
) -> Result<EngineMode, EngineError> {
    let flagged = args
        .mode
        .or_else(|| args.fractal.then_some(EngineMode::Fractal));

    match (flagged, payload.mode.as_deref()) {
        (Some(flag), Some(declared)) => {
            if declared != flag.as_str() {
                warn!(mode = declared, flag = %flag, "mode flag mismatch");
            }
            Ok(flag)
        }
        (Some(flag), None) => Ok(flag),
        (None, Some(declared)) => Ok(declared.parse()?),
        (None, None) => Ok(default_mode),
    }
}

pub(crate) fn run_engine(args: &RunArgs, config: &AppConfig) -> Result<CommandOutcome, AppError> {
    let run_id = Uuid::new_v4();
    let span = info_span!("run", %run_id);
    let _entered = span.enter();

    let document = read_input(&args.input)?;
    let schemas = SchemaRegistry::new(config.engine.schema_dir.clone());
    if let Err(err) = schemas.validate(SchemaKind::Input, &document) {
        warn!(error = %err, "input schema validation failed");
    }

    let payload = RunPayload::from_value(document)?;
    let mode = resolve_mode(args, &payload, config.engine.default_mode)?;
    let registry = EngineRegistry::standard().with_default_mode(config.engine.default_mode);
    let envelope = registry.run_mode(mode, &payload, args.fixed_ts.as_deref(), Some(&args.out))?;

    if let Err(err) = schemas.validate(SchemaKind::Output, &envelope.to_value()?) {
        error!(error = %err, out = %args.out.display(), "output schema validation failed");
        return Ok(CommandOutcome::OutputInvalid);
    }

    info!(
        out = %args.out.display(),
        %mode,
        overall = envelope.overall_signal(),
        "run_ok"
    );
    Ok(CommandOutcome::Success)
}

pub(crate) fn validate_document(args: &ValidateArgs) -> Result<CommandOutcome, AppError> {
    validate_file(&args.schema, &args.data)?;
    println!("OK");
    Ok(CommandOutcome::Success)
}

#[derive(Debug, Serialize)]
pub(crate) struct BacktestSummary {
    pub(crate) candles: usize,
    pub(crate) strategy: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) window: Option<usize>,
    pub(crate) features: Option<FittedFeatures>,
    pub(crate) steps: usize,
    pub(crate) total_pnl: f64,
    pub(crate) hit_rate: f64,
    pub(crate) latest_signal: f64,
    pub(crate) latest_position: f64,
}

pub(crate) fn backtest_summary(
    series: &[f64],
    args: &BacktestArgs,
) -> Result<BacktestSummary, AppError> {
    let mut model = FractalModel::new(args.dfa, args.mfdfa, args.apen);
    let run: BacktestRun = match args.window {
        Some(window) => model.walk_forward(series, window)?,
        None => model.backtest(series)?,
    };

    let (features, latest_signal) = if series.is_empty() {
        (None, 0.0)
    } else {
        let features = model.fit(series)?.clone();
        (Some(features), model.predict(series)?)
    };

    Ok(BacktestSummary {
        candles: series.len(),
        strategy: if args.window.is_some() {
            "walk_forward"
        } else {
            "expanding"
        },
        window: args.window,
        features,
        steps: run.predictions.len(),
        total_pnl: run.total_pnl(),
        hit_rate: run.hit_rate(),
        latest_signal,
        latest_position: model.size_positions(latest_signal, args.capital),
    })
}

pub(crate) fn run_backtest(args: &BacktestArgs) -> Result<CommandOutcome, AppError> {
    let candles = load_ohlcv(&args.candles)?;
    let summary = backtest_summary(&closes(&candles), args)?;
    info!(
        candles = summary.candles,
        steps = summary.steps,
        total_pnl = summary.total_pnl,
        "backtest complete"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(CommandOutcome::Success)
}
