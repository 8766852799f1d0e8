pub use crate::config::*;
use crate::Tournament;

/// A builder for assembling a tournament from pairwise results.
///
/// Participants must be declared before any result that references them.
///
/// ```
/// pub use kemeny_ranking::builder::TournamentBuilder;
/// # use kemeny_ranking::RankingErrors;
///
/// let mut builder = TournamentBuilder::new()
///     .participants(&[("a1", "Anna"), ("b2", "Bob")])?;
///
/// // Anna beat Bob by a margin of 3.
/// builder.add_result(3, 1, 2)?;
///
/// let tournament = builder.build()?;
/// assert_eq!(tournament.weight_of(1, 2), 3);
///
/// # Ok::<(), RankingErrors>(())
/// ```
pub struct TournamentBuilder {
    _participants: Vec<Participant>,
    _results: Vec<(u64, u32, u32)>,
}

impl Default for TournamentBuilder {
    fn default() -> Self {
        TournamentBuilder::new()
    }
}

impl TournamentBuilder {
    pub fn new() -> TournamentBuilder {
        TournamentBuilder {
            _participants: Vec::new(),
            _results: Vec::new(),
        }
    }

    /// Declares the participants, in input order. The first entry becomes
    /// participant 1, the second participant 2, and so on.
    ///
    /// Any results added so far are discarded: they were validated against
    /// the previous participant list and may not reference this one.
    pub fn participants(self, parts: &[(&str, &str)]) -> Result<TournamentBuilder, RankingErrors> {
        Ok(TournamentBuilder {
            _participants: parts
                .iter()
                .map(|(id, name)| Participant {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .collect(),
            _results: Vec::new(),
        })
    }

    /// Records one contest result: `winner` beat `loser` by `weight`.
    ///
    /// Results for the same ordered pair accumulate, so the matrix entry is
    /// the total weight earned by `winner` over `loser`.
    pub fn add_result(&mut self, weight: u64, winner: u32, loser: u32) -> Result<(), RankingErrors> {
        let n = self._participants.len() as u32;
        if winner < 1 || winner > n || loser < 1 || loser > n {
            return Err(RankingErrors::ParticipantOutOfRange);
        }
        self._results.push((weight, winner, loser));
        Ok(())
    }

    pub fn build(self) -> Result<Tournament, RankingErrors> {
        let n = self._participants.len();
        let mut matrix: Vec<u64> = vec![0; n * n];
        for (weight, winner, loser) in self._results {
            // Indices were checked when the result was added.
            matrix[(winner as usize - 1) * n + (loser as usize - 1)] += weight;
        }
        Ok(Tournament::from_parts(self._participants, matrix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_results_outside_the_participant_range() {
        let mut builder = TournamentBuilder::new()
            .participants(&[("a", "Anna"), ("b", "Bob")])
            .unwrap();
        assert_eq!(
            builder.add_result(1, 0, 2),
            Err(RankingErrors::ParticipantOutOfRange)
        );
        assert_eq!(
            builder.add_result(1, 1, 3),
            Err(RankingErrors::ParticipantOutOfRange)
        );
        assert!(builder.add_result(1, 2, 1).is_ok());
    }

    #[test]
    fn redeclaring_participants_discards_earlier_results() {
        let mut builder = TournamentBuilder::new()
            .participants(&[("a", "A"), ("b", "B"), ("c", "C")])
            .unwrap();
        builder.add_result(2, 3, 1).unwrap();
        // The earlier result references participant 3, which no longer
        // exists after the redeclaration. It must not leak into the build.
        let builder = builder.participants(&[("solo", "Solo")]).unwrap();
        let t = builder.build().unwrap();
        assert_eq!(t.num_participants(), 1);
    }

    #[test]
    fn accumulates_repeated_results() {
        let mut builder = TournamentBuilder::new()
            .participants(&[("a", "Anna"), ("b", "Bob")])
            .unwrap();
        builder.add_result(2, 1, 2).unwrap();
        builder.add_result(5, 1, 2).unwrap();
        let t = builder.build().unwrap();
        assert_eq!(t.weight_of(1, 2), 7);
        assert_eq!(t.weight_of(2, 1), 0);
    }
}
