// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// A competitor in the tournament.
///
/// Participants are referenced everywhere else by their 1-based position in
/// the participant list, matching the numbering of the input data.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Participant {
    /// The identifier carried by the input data (not interpreted).
    pub id: String,
    pub name: String,
}

// ******** Output data structures *********

/// The outcome of one annealing run.
///
/// This is plain data: the caller is responsible for any reporting or
/// formatting, and for measuring the wall clock if it wants a runtime.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SearchOutcome {
    /// The best permutation found, most preferred participant first.
    /// Participant indices are 1-based.
    pub best_order: Vec<u32>,
    /// The Kemeny score of `best_order`: the total contest weight the
    /// ranking disagrees with.
    pub best_cost: u64,
    /// Total number of neighbors considered.
    pub iterations: u64,
    /// Number of accepted moves to a strictly worse solution.
    pub uphill_moves: u64,
}

/// Errors that prevent the search from starting.
///
/// Once the search is running there is no failure state, only convergence.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RankingErrors {
    /// Fewer than 2 participants: no swap move exists.
    NotEnoughParticipants,
    /// The initial order is not a permutation of 1..=n.
    NotAPermutation,
    /// A pairwise result references a participant outside 1..=n.
    ParticipantOutOfRange,
    /// The initial temperature is not a finite positive number.
    InvalidTemperature,
    /// The cooling rate is outside the open interval (0, 1).
    InvalidCoolingRate,
    /// The temperature stage length is zero.
    InvalidStageLength,
}

impl Error for RankingErrors {}

impl Display for RankingErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RankingError in kemeny_ranking: {:?}", self)
    }
}

// ********* Configuration **********

/// The family of neighbor moves explored by the search.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum MoveKind {
    /// Exchange a uniformly random pair of adjacent positions. The cost
    /// update is constant work. This is the default.
    AdjacentSwap,
    /// Exchange two uniformly random distinct positions. The cost update
    /// is proportional to the distance between the two positions.
    ArbitrarySwap,
}

/// The parameters of the annealing schedule.
///
/// The defaults are a reasonable starting point for tournaments of a few
/// dozen participants; larger instances usually want a longer stage and a
/// higher non-improvement limit.
#[derive(PartialEq, Debug, Clone)]
pub struct AnnealingParams {
    /// Starting temperature. Must be finite and > 0.
    pub initial_temperature: f64,
    /// Number of iterations spent at each temperature level.
    pub stage_length: u32,
    /// Multiplier applied to the temperature after each stage. Must be in
    /// the open interval (0, 1).
    pub cooling_rate: f64,
    /// The search stops once this many consecutive iterations have passed
    /// without the best-found cost strictly decreasing.
    pub non_improvement_limit: u32,
    pub move_kind: MoveKind,
}

impl AnnealingParams {
    pub const DEFAULT_PARAMS: AnnealingParams = AnnealingParams {
        initial_temperature: 20.0,
        stage_length: 75,
        cooling_rate: 0.99,
        non_improvement_limit: 700,
        move_kind: MoveKind::AdjacentSwap,
    };
}
