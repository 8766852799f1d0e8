use log::{debug, info, warn};

use kemeny_ranking::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::kemrank::config_reader::*;
use crate::kemrank::tournament_reader::*;

#[derive(Debug, Snafu)]
pub enum KemrankError {
    #[snafu(display("Error opening data file {path}"))]
    OpeningData {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Malformed tournament data at line {lineno}: {message}"))]
    DataFormat { lineno: usize, message: String },
    #[snafu(display(""))]
    OpeningJson { source: std::io::Error },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("The search configuration was rejected"))]
    Search { source: RankingErrors },
    #[snafu(display("Error writing report to {path}"))]
    WritingReport {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing CSV to {path}"))]
    WritingCsv { source: csv::Error, path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

type KemrankResult<T> = Result<T, KemrankError>;

pub mod config_reader {
    use crate::kemrank::*;

    /// The JSON configuration surface of the annealing schedule. Every key
    /// is optional and defaults to [`AnnealingParams::DEFAULT_PARAMS`].
    #[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct ParamsConfig {
        #[serde(rename = "initialTemperature")]
        pub initial_temperature: Option<f64>,
        #[serde(rename = "temperatureLength")]
        pub temperature_length: Option<u32>,
        #[serde(rename = "coolingRate")]
        pub cooling_rate: Option<f64>,
        #[serde(rename = "maxNonImprove")]
        pub max_non_improve: Option<u32>,
        #[serde(rename = "moveKind")]
        pub move_kind: Option<String>,
    }

    pub fn read_params(path: String) -> KemrankResult<AnnealingParams> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
        let cfg: ParamsConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
        debug!("read_params: {:?}", cfg);
        validate_params(&cfg)
    }

    pub fn validate_params(cfg: &ParamsConfig) -> KemrankResult<AnnealingParams> {
        let defaults = AnnealingParams::DEFAULT_PARAMS;
        let res = AnnealingParams {
            initial_temperature: cfg
                .initial_temperature
                .unwrap_or(defaults.initial_temperature),
            stage_length: cfg.temperature_length.unwrap_or(defaults.stage_length),
            cooling_rate: cfg.cooling_rate.unwrap_or(defaults.cooling_rate),
            non_improvement_limit: cfg
                .max_non_improve
                .unwrap_or(defaults.non_improvement_limit),
            move_kind: match cfg.move_kind.as_deref() {
                None => defaults.move_kind,
                Some("adjacent") => MoveKind::AdjacentSwap,
                Some("arbitrary") => MoveKind::ArbitrarySwap,
                Some(x) => {
                    whatever!("Cannot use move kind {:?} (expected 'adjacent' or 'arbitrary')", x)
                }
            },
        };
        Ok(res)
    }

    pub fn move_kind_label(move_kind: MoveKind) -> &'static str {
        match move_kind {
            MoveKind::AdjacentSwap => "adjacent",
            MoveKind::ArbitrarySwap => "arbitrary",
        }
    }
}

pub mod tournament_reader {
    use crate::kemrank::*;
    use kemeny_ranking::builder::TournamentBuilder;

    pub fn read_tournament_file(path: String) -> KemrankResult<Tournament> {
        info!("Attempting to read tournament file {:?}", path);
        let contents = fs::read_to_string(path.clone()).context(OpeningDataSnafu { path })?;
        parse_tournament(&contents)
    }

    /// Parses the tournament format: a participant count line, `n` lines of
    /// `id,name`, one skipped metadata line, then `weight,winner,loser`
    /// result lines until the end of the input.
    pub fn parse_tournament(contents: &str) -> KemrankResult<Tournament> {
        let mut lines = contents.lines().enumerate();

        let (_, first) = lines.next().context(DataFormatSnafu {
            lineno: 1usize,
            message: "empty input",
        })?;
        let count_token = first.split_whitespace().next().context(DataFormatSnafu {
            lineno: 1usize,
            message: "missing participant count",
        })?;
        let n: usize = count_token
            .parse()
            .ok()
            .context(DataFormatSnafu {
                lineno: 1usize,
                message: format!("invalid participant count {:?}", count_token),
            })?;

        let mut parts: Vec<(String, String)> = Vec::with_capacity(n);
        for _ in 0..n {
            let (idx, line) = lines.next().context(DataFormatSnafu {
                lineno: parts.len() + 2,
                message: "missing participant line",
            })?;
            let lineno = idx + 1;
            let (id, name) = line.split_once(',').context(DataFormatSnafu {
                lineno,
                message: format!("expected 'id,name', got {:?}", line),
            })?;
            parts.push((id.to_string(), name.to_string()));
        }
        let part_refs: Vec<(&str, &str)> = parts
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str()))
            .collect();
        let mut builder = match TournamentBuilder::new().participants(&part_refs) {
            Ok(b) => b,
            Err(e) => whatever!("Could not register participants: {}", e),
        };

        // One line of free-form metadata about how the tournament was
        // generated. Skipped.
        let _ = lines.next();

        for (idx, line) in lines {
            let lineno = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            ensure!(
                fields.len() == 3,
                DataFormatSnafu {
                    lineno,
                    message: format!("expected 'weight,winner,loser', got {:?}", line),
                }
            );
            let weight: u64 = parse_field(fields[0], "weight", lineno)?;
            let winner: u32 = parse_field(fields[1], "winner", lineno)?;
            let loser: u32 = parse_field(fields[2], "loser", lineno)?;
            if let Err(e) = builder.add_result(weight, winner, loser) {
                return DataFormatSnafu {
                    lineno,
                    message: format!("{}", e),
                }
                .fail();
            }
        }

        let tournament = match builder.build() {
            Ok(t) => t,
            Err(e) => whatever!("Could not build the tournament: {}", e),
        };
        info!(
            "parse_tournament: {} participants",
            tournament.num_participants()
        );
        Ok(tournament)
    }

    // Parsing directly at the target width keeps indices that overflow u32
    // from silently wrapping into the valid range.
    fn parse_field<T: std::str::FromStr>(
        token: &str,
        what: &str,
        lineno: usize,
    ) -> KemrankResult<T> {
        token.trim().parse::<T>().ok().context(DataFormatSnafu {
            lineno,
            message: format!("invalid {} {:?}", what, token),
        })
    }
}

fn params_to_json(params: &AnnealingParams) -> JSValue {
    json!({
        "initialTemperature": params.initial_temperature,
        "temperatureLength": params.stage_length,
        "coolingRate": params.cooling_rate,
        "maxNonImprove": params.non_improvement_limit,
        "moveKind": move_kind_label(params.move_kind),
    })
}

// The summary deliberately omits the wall clock so that two runs with the
// same seed produce byte-identical summaries (see the --reference flag).
// The runtime is logged instead.
fn build_summary_js(tournament: &Tournament, params: &AnnealingParams, outcome: &SearchOutcome) -> JSValue {
    let ranking: Vec<JSValue> = outcome
        .best_order
        .iter()
        .enumerate()
        .map(|(pos, &pid)| {
            let p = tournament.participant(pid).unwrap();
            json!({"rank": pos + 1, "id": p.id, "name": p.name})
        })
        .collect();
    json!({
        "config": params_to_json(params),
        "result": {
            "cost": outcome.best_cost,
            "order": outcome.best_order,
            "iterations": outcome.iterations,
            "uphillMoves": outcome.uphill_moves,
        },
        "ranking": ranking,
    })
}

fn compare_reference(path: String, pretty_js_stats: &str) -> KemrankResult<()> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
    let js: JSValue = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    let pretty_js_ref = serde_json::to_string_pretty(&js).context(ParsingJsonSnafu {})?;
    if pretty_js_ref != pretty_js_stats {
        warn!("Found differences with the reference string");
        print_diff(pretty_js_ref.as_str(), pretty_js_stats, "\n");
        whatever!("Difference detected between calculated summary and reference summary")
    }
    Ok(())
}

fn write_trace(
    path: String,
    params: &AnnealingParams,
    trace: &[u64],
    outcome: &SearchOutcome,
) -> KemrankResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path.clone())
        .context(WritingCsvSnafu { path: path.clone() })?;
    let param_rows: Vec<(String, String)> = vec![
        ("initialTemperature".to_string(), params.initial_temperature.to_string()),
        ("temperatureLength".to_string(), params.stage_length.to_string()),
        ("coolingRate".to_string(), params.cooling_rate.to_string()),
        ("maxNonImprove".to_string(), params.non_improvement_limit.to_string()),
        ("moveKind".to_string(), move_kind_label(params.move_kind).to_string()),
        ("bestCost".to_string(), outcome.best_cost.to_string()),
    ];
    for (key, value) in param_rows {
        wtr.write_record([key, value])
            .context(WritingCsvSnafu { path: path.clone() })?;
    }
    wtr.write_record(["iteration", "cost"])
        .context(WritingCsvSnafu { path: path.clone() })?;
    for (idx, cost) in trace.iter().enumerate() {
        wtr.write_record([(idx + 1).to_string(), cost.to_string()])
            .context(WritingCsvSnafu { path: path.clone() })?;
    }
    wtr.flush().context(WritingReportSnafu { path })?;
    Ok(())
}

// **** Repeated-run aggregation ****

struct RunRow {
    cost: u64,
    runtime_ms: u128,
    iterations: u64,
    uphill_moves: u64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

// Sample standard deviation (n - 1 denominator).
fn stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

fn run_batch(
    tournament: &Tournament,
    params: &AnnealingParams,
    runs: u32,
    base_seed: u64,
    out_path: String,
) -> KemrankResult<()> {
    let n = tournament.num_participants();
    let initial: Vec<u32> = (1..=n as u32).collect();
    let mut rows: Vec<RunRow> = Vec::with_capacity(runs as usize);
    for run_idx in 0..runs {
        let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(run_idx as u64));
        let start = Instant::now();
        let outcome =
            run_annealing_search(tournament, &initial, params, &mut rng).context(SearchSnafu)?;
        let runtime_ms = start.elapsed().as_millis();
        debug!(
            "run_batch: run {} of {}: cost {}, {} iterations, {} ms",
            run_idx + 1,
            runs,
            outcome.best_cost,
            outcome.iterations,
            runtime_ms
        );
        rows.push(RunRow {
            cost: outcome.best_cost,
            runtime_ms,
            iterations: outcome.iterations,
            uphill_moves: outcome.uphill_moves,
        });
    }

    let costs: Vec<f64> = rows.iter().map(|r| r.cost as f64).collect();
    let runtimes: Vec<f64> = rows.iter().map(|r| r.runtime_ms as f64).collect();
    let iterations: Vec<f64> = rows.iter().map(|r| r.iterations as f64).collect();
    let uphills: Vec<f64> = rows.iter().map(|r| r.uphill_moves as f64).collect();
    info!(
        "run_batch: {} runs, cost mean {:.2} (stddev {:.2}), runtime mean {:.1} ms",
        runs,
        mean(&costs),
        stddev(&costs),
        mean(&runtimes)
    );

    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(out_path.clone())
        .context(WritingCsvSnafu {
            path: out_path.clone(),
        })?;
    let mut write = |record: &[String]| -> KemrankResult<()> {
        wtr.write_record(record).context(WritingCsvSnafu {
            path: out_path.clone(),
        })
    };
    write(&["initialTemperature".to_string(), params.initial_temperature.to_string()])?;
    write(&["temperatureLength".to_string(), params.stage_length.to_string()])?;
    write(&["coolingRate".to_string(), params.cooling_rate.to_string()])?;
    write(&["maxNonImprove".to_string(), params.non_improvement_limit.to_string()])?;
    write(&["moveKind".to_string(), move_kind_label(params.move_kind).to_string()])?;
    write(&["runs".to_string(), runs.to_string()])?;
    write(&[
        "costMean".to_string(),
        mean(&costs).to_string(),
        "costStddev".to_string(),
        stddev(&costs).to_string(),
    ])?;
    write(&[
        "runtimeMsMean".to_string(),
        mean(&runtimes).to_string(),
        "runtimeMsStddev".to_string(),
        stddev(&runtimes).to_string(),
    ])?;
    write(&[
        "iterationsMean".to_string(),
        mean(&iterations).to_string(),
        "uphillMovesMean".to_string(),
        mean(&uphills).to_string(),
    ])?;
    write(&[
        "cost".to_string(),
        "runtimeMs".to_string(),
        "iterations".to_string(),
        "uphillMoves".to_string(),
    ])?;
    for row in rows.iter() {
        write(&[
            row.cost.to_string(),
            row.runtime_ms.to_string(),
            row.iterations.to_string(),
            row.uphill_moves.to_string(),
        ])?;
    }
    drop(write);
    wtr.flush().context(WritingReportSnafu { path: out_path })?;
    Ok(())
}

pub fn run(args: &Args) -> KemrankResult<()> {
    if args.runs == Some(0) {
        whatever!("--runs must be at least 1");
    }
    let tournament = read_tournament_file(args.input.clone())?;
    let params = match &args.config {
        Some(path) => read_params(path.clone())?,
        None => AnnealingParams::DEFAULT_PARAMS,
    };
    info!("run: params: {:?}", params);

    let base_seed = match args.seed {
        Some(s) => s,
        None => rand::thread_rng().gen(),
    };
    info!("run: base seed {}", base_seed);

    let runs = args.runs.unwrap_or(1);
    if runs > 1 {
        let out_path = match args.out.clone() {
            Some(p) => p,
            None => whatever!("--runs requires --out to locate the batch CSV"),
        };
        return run_batch(&tournament, &params, runs, base_seed, out_path);
    }

    // Single run. The initial solution is the identity permutation: the
    // participants in input-file order.
    let n = tournament.num_participants();
    let initial: Vec<u32> = (1..=n as u32).collect();
    let mut rng = StdRng::seed_from_u64(base_seed);
    let start = Instant::now();
    let (outcome, trace) = if args.trace.is_some() {
        let (outcome, trace) =
            run_annealing_search_traced(&tournament, &initial, &params, &mut rng)
                .context(SearchSnafu)?;
        (outcome, Some(trace))
    } else {
        let outcome =
            run_annealing_search(&tournament, &initial, &params, &mut rng).context(SearchSnafu)?;
        (outcome, None)
    };
    let runtime_ms = start.elapsed().as_millis();

    info!("Best ranking found (Kemeny score {}):", outcome.best_cost);
    for (pos, &pid) in outcome.best_order.iter().enumerate() {
        let p = tournament.participant(pid).unwrap();
        info!("{:>5}: {} ({})", pos + 1, p.name, p.id);
    }
    info!(
        "{} iterations, {} uphill moves, runtime {} ms",
        outcome.iterations, outcome.uphill_moves, runtime_ms
    );

    if let (Some(trace_path), Some(tr)) = (&args.trace, &trace) {
        write_trace(trace_path.clone(), &params, tr, &outcome)?;
    }

    let summary = build_summary_js(&tournament, &params, &outcome);
    let pretty_js_stats = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;
    match args.out.as_deref() {
        None | Some("stdout") => println!("summary:{}", pretty_js_stats),
        Some(path) => {
            fs::write(path, &pretty_js_stats).context(WritingReportSnafu {
                path: path.to_string(),
            })?;
        }
    }

    if let Some(reference) = &args.reference {
        compare_reference(reference.clone(), &pretty_js_stats)?;
    }
    Ok(())
}
