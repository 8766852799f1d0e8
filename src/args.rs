use clap::Parser;

/// Approximates the minimum-disagreement (Kemeny) ranking of a weighted
/// tournament with a simulated-annealing search.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The tournament data file: participant count, `id,name`
    /// lines, one skipped metadata line, then `weight,winner,loser` results.
    /// See the library manual for the full description of the format.
    #[clap(short, long, value_parser)]
    pub input: String,

    /// (file path, optional) A JSON file with the annealing parameters
    /// (initialTemperature, temperatureLength, coolingRate, maxNonImprove,
    /// moveKind). Missing keys take the built-in defaults.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path or 'stdout') If specified, the run summary will be written
    /// in JSON format to the given location. With --runs, the location of the
    /// batch CSV instead.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path, optional) A reference JSON summary. If provided, kemrank
    /// checks that the produced summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, optional) If specified, writes a CSV with the cost of the
    /// current solution at every iteration of a single run.
    #[clap(long, value_parser)]
    pub trace: Option<String>,

    /// (default 1, must be at least 1) Number of repeated runs. Values above
    /// 1 aggregate the run statistics into a CSV written to --out.
    #[clap(long, value_parser)]
    pub runs: Option<u32>,

    /// (optional) Seed of the pseudorandom generator. The same seed on the
    /// same input reproduces a run exactly. Seeded from the system entropy
    /// when absent.
    #[clap(long, value_parser)]
    pub seed: Option<u64>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
