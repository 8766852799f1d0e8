mod config;
pub mod builder;
pub mod manual;

use log::{debug, info};
use rand::Rng;

pub use crate::config::*;

// **** Private structures ****

// 1-based participant index, as used by the input data.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct ParticipantId(u32);

/// A weighted tournament: the full set of pairwise contest weights between
/// every pair of participants.
///
/// The matrix is immutable after construction. Use
/// [`builder::TournamentBuilder`] to assemble one from individual results.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Tournament {
    participants: Vec<Participant>,
    // Row-major n*n matrix. Entry (a-1, b-1) is the total weight by which
    // participant a defeated participant b. Entries (a-1, b-1) and
    // (b-1, a-1) are independent.
    matrix: Vec<u64>,
}

impl Tournament {
    pub(crate) fn from_parts(participants: Vec<Participant>, matrix: Vec<u64>) -> Tournament {
        debug_assert_eq!(matrix.len(), participants.len() * participants.len());
        Tournament {
            participants,
            matrix,
        }
    }

    pub fn num_participants(&self) -> usize {
        self.participants.len()
    }

    /// The participant with the given 1-based index.
    pub fn participant(&self, idx: u32) -> Option<&Participant> {
        self.participants.get((idx as usize).wrapping_sub(1))
    }

    /// The total contest weight that participant `a` earned over participant
    /// `b`. Indices are 1-based and trusted: they must come from a validated
    /// permutation or from the builder.
    pub fn weight_of(&self, a: u32, b: u32) -> u64 {
        let n = self.participants.len();
        self.matrix[(a as usize - 1) * n + (b as usize - 1)]
    }
}

// A ranking is a permutation of the participants together with its Kemeny
// score. It is an immutable value: a neighbor is always a new Ranking, so
// the cached cost can never go stale.
#[derive(Eq, PartialEq, Debug, Clone)]
struct Ranking {
    // order[pos] = participant at that position, most preferred first.
    order: Vec<ParticipantId>,
    // position[pid - 1] = index of pid within order. Kept explicitly so
    // that position lookups during delta computations are O(1).
    position: Vec<u32>,
    cost: u64,
}

impl Ranking {
    /// Full O(n^2) scan: sums the weight of every edge the ranking
    /// disagrees with. Every unordered pair is visited exactly once and
    /// contributes only when its delta is positive.
    fn from_order(tournament: &Tournament, order: Vec<ParticipantId>) -> Ranking {
        let position = invert_order(&order);
        let n = order.len() as u32;
        let mut cost: u64 = 0;
        for a in 1..=n {
            for b in (a + 1)..=n {
                let delta = edge_delta(tournament, &position, ParticipantId(a), ParticipantId(b));
                if delta > 0 {
                    cost += delta as u64;
                }
            }
        }
        Ranking {
            order,
            position,
            cost,
        }
    }

    // Trusted fast path: the cost has already been derived incrementally.
    // Only neighbor generation may call this.
    fn with_known_cost(order: Vec<ParticipantId>, position: Vec<u32>, cost: u64) -> Ranking {
        Ranking {
            order,
            position,
            cost,
        }
    }
}

fn invert_order(order: &[ParticipantId]) -> Vec<u32> {
    let mut position: Vec<u32> = vec![0; order.len()];
    for (pos, pid) in order.iter().enumerate() {
        position[(pid.0 - 1) as usize] = pos as u32;
    }
    position
}

/// The signed cost correction for the pair `{a, b}` under the given
/// placement. This single primitive backs both the full scan and every
/// incremental update:
///
/// - positive: the placement puts the pair's dominant participant below its
///   opponent, so the edge weight counts against the ranking;
/// - negative: the placement agrees with the dominant participant (the
///   weight that flipping this pair would add);
/// - zero: the contest is tied. A tied pair is still modeled as "lower
///   index wins, with weight 0", which contributes nothing either way.
fn edge_delta(
    tournament: &Tournament,
    position: &[u32],
    a: ParticipantId,
    b: ParticipantId,
) -> i64 {
    let w_ab = tournament.weight_of(a.0, b.0);
    let w_ba = tournament.weight_of(b.0, a.0);
    let pos_a = position[(a.0 - 1) as usize];
    let pos_b = position[(b.0 - 1) as usize];
    if w_ab > w_ba {
        // a dominates, so a should come before b.
        if pos_a > pos_b {
            w_ab as i64
        } else {
            -(w_ab as i64)
        }
    } else if w_ba > w_ab {
        // b dominates, so b should come before a.
        if pos_a < pos_b {
            w_ba as i64
        } else {
            -(w_ba as i64)
        }
    } else {
        0
    }
}

// **** Neighbor moves ****

// Exchanges the occupants of positions s1 < s2 and derives the new cost
// incrementally. The only pairs whose relative order changes are the
// swapped pair itself and, for each position strictly between s1 and s2,
// that occupant against each of the two swapped participants. Each such
// flipped pair contributes its signed delta, evaluated against the new
// placement. The adjacent case is the empty-middle special case.
fn swap_neighbor(current: &Ranking, tournament: &Tournament, s1: usize, s2: usize) -> Ranking {
    debug_assert!(s1 < s2);
    let mut order = current.order.clone();
    order.swap(s1, s2);
    let mut position = current.position.clone();
    position[(order[s1].0 - 1) as usize] = s1 as u32;
    position[(order[s2].0 - 1) as usize] = s2 as u32;

    let mut cost = current.cost as i64;
    cost += edge_delta(tournament, &position, order[s1], order[s2]);
    for i in (s1 + 1)..s2 {
        cost += edge_delta(tournament, &position, order[s1], order[i]);
        cost += edge_delta(tournament, &position, order[i], order[s2]);
    }
    debug_assert!(cost >= 0, "negative cost after swap ({}, {})", s1, s2);
    Ranking::with_known_cost(order, position, cost as u64)
}

// Uniformly random adjacent pair of positions: all n-1 pairs equally likely.
fn adjacent_neighbor<R: Rng>(current: &Ranking, tournament: &Tournament, rng: &mut R) -> Ranking {
    let n = current.order.len();
    let s1 = rng.gen_range(0..n - 1);
    swap_neighbor(current, tournament, s1, s1 + 1)
}

// Uniformly random unordered pair of distinct positions: all C(n, 2) pairs
// equally likely.
fn arbitrary_neighbor<R: Rng>(current: &Ranking, tournament: &Tournament, rng: &mut R) -> Ranking {
    let n = current.order.len();
    let s1 = rng.gen_range(0..n);
    let mut s2 = rng.gen_range(0..n - 1);
    // The second draw has one less slot available; shifting it past s1
    // keeps the distribution uniform over distinct pairs.
    if s1 <= s2 {
        s2 += 1;
    }
    swap_neighbor(current, tournament, s1.min(s2), s1.max(s2))
}

// **** Public entry points ****

/// Computes the Kemeny score of the given permutation by a full scan.
///
/// `order` lists 1-based participant indices, most preferred first, and
/// must be a permutation of `1..=n`.
pub fn kemeny_cost(tournament: &Tournament, order: &[u32]) -> Result<u64, RankingErrors> {
    let order = check_permutation(order, tournament.num_participants())?;
    Ok(Ranking::from_order(tournament, order).cost)
}

/// Runs the annealing search and returns the best ranking found.
///
/// The generator is an explicit argument so that runs are reproducible:
/// pass a seeded [`rand::rngs::StdRng`] to replay a run exactly.
pub fn run_annealing_search<R: Rng>(
    tournament: &Tournament,
    initial_order: &[u32],
    params: &AnnealingParams,
    rng: &mut R,
) -> Result<SearchOutcome, RankingErrors> {
    run_search(tournament, initial_order, params, rng, None)
}

/// Same as [`run_annealing_search`], additionally returning the cost of the
/// current solution after every iteration, in order. Intended for offline
/// analysis of a single run; the trace grows by one entry per iteration.
pub fn run_annealing_search_traced<R: Rng>(
    tournament: &Tournament,
    initial_order: &[u32],
    params: &AnnealingParams,
    rng: &mut R,
) -> Result<(SearchOutcome, Vec<u64>), RankingErrors> {
    let mut trace: Vec<u64> = Vec::new();
    let outcome = run_search(tournament, initial_order, params, rng, Some(&mut trace))?;
    Ok((outcome, trace))
}

fn check_params(params: &AnnealingParams) -> Result<(), RankingErrors> {
    if !(params.initial_temperature.is_finite() && params.initial_temperature > 0.0) {
        return Err(RankingErrors::InvalidTemperature);
    }
    if !(params.cooling_rate > 0.0 && params.cooling_rate < 1.0) {
        return Err(RankingErrors::InvalidCoolingRate);
    }
    if params.stage_length == 0 {
        return Err(RankingErrors::InvalidStageLength);
    }
    Ok(())
}

fn check_permutation(order: &[u32], n: usize) -> Result<Vec<ParticipantId>, RankingErrors> {
    if order.len() != n {
        return Err(RankingErrors::NotAPermutation);
    }
    let mut seen = vec![false; n];
    for &idx in order {
        if idx < 1 || idx as usize > n || seen[(idx - 1) as usize] {
            return Err(RankingErrors::NotAPermutation);
        }
        seen[(idx - 1) as usize] = true;
    }
    Ok(order.iter().map(|&idx| ParticipantId(idx)).collect())
}

fn run_search<R: Rng>(
    tournament: &Tournament,
    initial_order: &[u32],
    params: &AnnealingParams,
    rng: &mut R,
    mut trace: Option<&mut Vec<u64>>,
) -> Result<SearchOutcome, RankingErrors> {
    check_params(params)?;
    let n = tournament.num_participants();
    if n < 2 {
        return Err(RankingErrors::NotEnoughParticipants);
    }
    let order = check_permutation(initial_order, n)?;
    let mut current = Ranking::from_order(tournament, order);
    let mut best = current.clone();
    info!(
        "run_annealing_search: {} participants, initial cost {}, params: {:?}",
        n, current.cost, params
    );

    let mut temperature = params.initial_temperature;
    let mut non_improve: u32 = 0;
    let mut uphill_moves: u64 = 0;
    let mut iterations: u64 = 0;

    // Outer loop over temperature stages, checked before each stage.
    while non_improve <= params.non_improvement_limit {
        // Inner loop: a fixed number of neighbors at this temperature.
        for _ in 0..params.stage_length {
            iterations += 1;
            let candidate = match params.move_kind {
                MoveKind::AdjacentSwap => adjacent_neighbor(&current, tournament, rng),
                MoveKind::ArbitrarySwap => arbitrary_neighbor(&current, tournament, rng),
            };
            let delta = candidate.cost as i64 - current.cost as i64;

            let accepted = if delta <= 0 {
                // Downhill or flat move: always accept.
                true
            } else {
                // Uphill move: accept with probability exp(-delta / T).
                // As the temperature collapses toward zero the exponent
                // goes to -inf and the probability underflows cleanly to
                // 0.0, so no uphill move can be accepted there.
                let prob = (-(delta as f64) / temperature).exp();
                let q: f64 = rng.gen();
                q < prob
            };
            if accepted {
                if delta > 0 {
                    uphill_moves += 1;
                }
                current = candidate;
            }

            if accepted && current.cost < best.cost {
                best = current.clone();
                non_improve = 0;
            } else {
                non_improve += 1;
            }

            if let Some(tr) = trace.as_mut() {
                tr.push(current.cost);
            }

            if non_improve > params.non_improvement_limit {
                break;
            }
        }
        temperature *= params.cooling_rate;
        debug!(
            "run_annealing_search: stage done, temperature {:.6}, current cost {}, best cost {}, non-improving streak {}",
            temperature, current.cost, best.cost, non_improve
        );
    }

    info!(
        "run_annealing_search: done after {} iterations, best cost {}, uphill moves {}",
        iterations, best.cost, uphill_moves
    );
    Ok(SearchOutcome {
        best_order: best.order.iter().map(|pid| pid.0).collect(),
        best_cost: best.cost,
        iterations,
        uphill_moves,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TournamentBuilder;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // The 3-cycle: 1 beats 2 by 5, 2 beats 3 by 3, 3 beats 1 by 1.
    fn cycle_tournament() -> Tournament {
        let mut builder = TournamentBuilder::new()
            .participants(&[("p1", "Anna"), ("p2", "Bob"), ("p3", "Clara")])
            .unwrap();
        builder.add_result(5, 1, 2).unwrap();
        builder.add_result(3, 2, 3).unwrap();
        builder.add_result(1, 3, 1).unwrap();
        builder.build().unwrap()
    }

    fn random_tournament(n: usize, rng: &mut StdRng) -> Tournament {
        let named: Vec<(String, String)> = (1..=n)
            .map(|i| (format!("id{}", i), format!("participant {}", i)))
            .collect();
        let parts: Vec<(&str, &str)> = named
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str()))
            .collect();
        let mut builder = TournamentBuilder::new().participants(&parts).unwrap();
        for a in 1..=n as u32 {
            for b in 1..=n as u32 {
                if a != b {
                    let w = rng.gen_range(0..10u64);
                    if w > 0 {
                        builder.add_result(w, a, b).unwrap();
                    }
                }
            }
        }
        builder.build().unwrap()
    }

    #[test]
    fn full_scan_matches_known_values() {
        let t = cycle_tournament();
        // [1,2,3] only disagrees with the (3,1) edge of weight 1.
        assert_eq!(kemeny_cost(&t, &[1, 2, 3]).unwrap(), 1);
        // [3,1,2] disagrees with the (2,3) edge of weight 3.
        assert_eq!(kemeny_cost(&t, &[3, 1, 2]).unwrap(), 3);
        // [2,3,1] disagrees with the (1,2) edge of weight 5.
        assert_eq!(kemeny_cost(&t, &[2, 3, 1]).unwrap(), 5);
    }

    #[test]
    fn all_tied_contests_cost_nothing() {
        let mut builder = TournamentBuilder::new()
            .participants(&[("a", "A"), ("b", "B"), ("c", "C")])
            .unwrap();
        for a in 1..=3 {
            for b in 1..=3 {
                if a != b {
                    builder.add_result(4, a, b).unwrap();
                }
            }
        }
        let t = builder.build().unwrap();
        for order in [
            [1, 2, 3],
            [1, 3, 2],
            [2, 1, 3],
            [2, 3, 1],
            [3, 1, 2],
            [3, 2, 1],
        ] {
            assert_eq!(kemeny_cost(&t, &order).unwrap(), 0);
        }
    }

    #[test]
    fn kemeny_cost_rejects_non_permutations() {
        let t = cycle_tournament();
        assert_eq!(
            kemeny_cost(&t, &[1, 2]),
            Err(RankingErrors::NotAPermutation)
        );
        assert_eq!(
            kemeny_cost(&t, &[1, 2, 2]),
            Err(RankingErrors::NotAPermutation)
        );
        assert_eq!(
            kemeny_cost(&t, &[0, 1, 2]),
            Err(RankingErrors::NotAPermutation)
        );
        assert_eq!(
            kemeny_cost(&t, &[1, 2, 4]),
            Err(RankingErrors::NotAPermutation)
        );
    }

    // The central correctness invariant: the incrementally derived cost of
    // a neighbor always equals the cost of a full recomputation from its
    // sequence, across long randomized move chains.
    #[test]
    fn incremental_cost_matches_full_scan_for_adjacent_swaps() {
        let mut rng = StdRng::seed_from_u64(7);
        let t = random_tournament(9, &mut rng);
        let order: Vec<ParticipantId> = (1..=9).map(ParticipantId).collect();
        let mut current = Ranking::from_order(&t, order);
        for _ in 0..500 {
            let candidate = adjacent_neighbor(&current, &t, &mut rng);
            let rescanned = Ranking::from_order(&t, candidate.order.clone());
            assert_eq!(candidate.cost, rescanned.cost);
            assert_eq!(candidate.position, rescanned.position);
            current = candidate;
        }
    }

    #[test]
    fn incremental_cost_matches_full_scan_for_arbitrary_swaps() {
        let mut rng = StdRng::seed_from_u64(11);
        let t = random_tournament(10, &mut rng);
        let order: Vec<ParticipantId> = (1..=10).map(ParticipantId).collect();
        let mut current = Ranking::from_order(&t, order);
        for _ in 0..500 {
            let candidate = arbitrary_neighbor(&current, &t, &mut rng);
            // The two drawn positions are always distinct.
            assert_ne!(candidate.order, current.order);
            let rescanned = Ranking::from_order(&t, candidate.order.clone());
            assert_eq!(candidate.cost, rescanned.cost);
            current = candidate;
        }
    }

    #[test]
    fn search_best_is_consistent_and_no_worse_than_initial() {
        let mut rng = StdRng::seed_from_u64(21);
        let t = random_tournament(12, &mut rng);
        let initial: Vec<u32> = (1..=12).collect();
        let initial_cost = kemeny_cost(&t, &initial).unwrap();

        let params = AnnealingParams {
            non_improvement_limit: 200,
            ..AnnealingParams::DEFAULT_PARAMS
        };
        let outcome = run_annealing_search(&t, &initial, &params, &mut rng).unwrap();
        assert!(outcome.best_cost <= initial_cost);
        // The reported cost is exactly the full-scan cost of the reported order.
        assert_eq!(
            kemeny_cost(&t, &outcome.best_order).unwrap(),
            outcome.best_cost
        );
        assert!(outcome.iterations > 0);
    }

    #[test]
    fn search_works_with_arbitrary_swaps() {
        let mut rng = StdRng::seed_from_u64(22);
        let t = random_tournament(8, &mut rng);
        let initial: Vec<u32> = (1..=8).collect();
        let params = AnnealingParams {
            move_kind: MoveKind::ArbitrarySwap,
            non_improvement_limit: 150,
            ..AnnealingParams::DEFAULT_PARAMS
        };
        let outcome = run_annealing_search(&t, &initial, &params, &mut rng).unwrap();
        assert_eq!(
            kemeny_cost(&t, &outcome.best_order).unwrap(),
            outcome.best_cost
        );
    }

    #[test]
    fn traced_search_reports_one_cost_per_iteration() {
        let mut rng = StdRng::seed_from_u64(31);
        let t = random_tournament(6, &mut rng);
        let initial: Vec<u32> = (1..=6).collect();
        let params = AnnealingParams {
            non_improvement_limit: 50,
            ..AnnealingParams::DEFAULT_PARAMS
        };
        let (outcome, trace) =
            run_annealing_search_traced(&t, &initial, &params, &mut rng).unwrap();
        assert_eq!(trace.len(), outcome.iterations as usize);
        // The best cost is the running minimum of the trace, and it never
        // regresses below what the trace can justify.
        let observed_min = *trace.iter().min().unwrap();
        assert_eq!(outcome.best_cost, observed_min.min(kemeny_cost(&t, &initial).unwrap()));
    }

    #[test]
    fn vanishing_temperature_accepts_no_uphill_moves() {
        let mut rng = StdRng::seed_from_u64(41);
        let t = random_tournament(10, &mut rng);
        let initial: Vec<u32> = (1..=10).collect();
        let params = AnnealingParams {
            initial_temperature: 1e-300,
            cooling_rate: 0.5,
            non_improvement_limit: 300,
            ..AnnealingParams::DEFAULT_PARAMS
        };
        let outcome = run_annealing_search(&t, &initial, &params, &mut rng).unwrap();
        assert_eq!(outcome.uphill_moves, 0);
    }

    #[test]
    fn search_rejects_degenerate_tournaments() {
        let mut builder = TournamentBuilder::new()
            .participants(&[("solo", "Solo")])
            .unwrap();
        builder.add_result(0, 1, 1).unwrap();
        let t = builder.build().unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            run_annealing_search(&t, &[1], &AnnealingParams::DEFAULT_PARAMS, &mut rng),
            Err(RankingErrors::NotEnoughParticipants)
        );
    }

    #[test]
    fn search_rejects_invalid_parameters() {
        let t = cycle_tournament();
        let mut rng = StdRng::seed_from_u64(0);
        let initial = [1, 2, 3];

        let bad_temp = AnnealingParams {
            initial_temperature: 0.0,
            ..AnnealingParams::DEFAULT_PARAMS
        };
        assert_eq!(
            run_annealing_search(&t, &initial, &bad_temp, &mut rng),
            Err(RankingErrors::InvalidTemperature)
        );

        let bad_cooling = AnnealingParams {
            cooling_rate: 1.0,
            ..AnnealingParams::DEFAULT_PARAMS
        };
        assert_eq!(
            run_annealing_search(&t, &initial, &bad_cooling, &mut rng),
            Err(RankingErrors::InvalidCoolingRate)
        );

        let bad_stage = AnnealingParams {
            stage_length: 0,
            ..AnnealingParams::DEFAULT_PARAMS
        };
        assert_eq!(
            run_annealing_search(&t, &initial, &bad_stage, &mut rng),
            Err(RankingErrors::InvalidStageLength)
        );
    }

    #[test]
    fn search_accepts_any_valid_initial_permutation() {
        let t = cycle_tournament();
        let mut rng = StdRng::seed_from_u64(5);
        let params = AnnealingParams {
            non_improvement_limit: 50,
            ..AnnealingParams::DEFAULT_PARAMS
        };
        let outcome = run_annealing_search(&t, &[2, 3, 1], &params, &mut rng).unwrap();
        // The optimum of the 3-cycle is [1,2,3] with cost 1.
        assert_eq!(outcome.best_cost, 1);
    }
}
