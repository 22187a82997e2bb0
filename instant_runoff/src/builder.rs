use std::collections::HashSet;

use log::{debug, warn};

pub use crate::config::*;

/// A builder for collecting and checking the ballots of a poll.
///
/// The tally itself trusts its input. The builder is the place where the ballots
/// are checked against the options of the poll, following the given rules.
///
/// ```
/// use instant_runoff::builder::Builder;
/// use instant_runoff::{BallotRules, PollOption};
/// # use instant_runoff::BallotErrors;
///
/// let mut builder = Builder::new(&BallotRules::DEFAULT_RULES)?
///     .options(&[PollOption::new("1", "Pizza"), PollOption::new("2", "Sushi")])?;
///
/// builder.add_ballot_simple("ballot-1", &["2", "1"])?;
/// builder.add_ballot_simple("ballot-2", &["2"])?;
///
/// let result = builder.tally();
/// assert_eq!(result.winner.map(|w| w.text), Some("Sushi".to_string()));
/// # Ok::<(), BallotErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: BallotRules,
    pub(crate) _options: Vec<PollOption>,
    pub(crate) _ballots: Vec<Ballot>,
}

impl Builder {
    pub fn new(rules: &BallotRules) -> Result<Builder, BallotErrors> {
        Ok(Builder {
            _rules: rules.clone(),
            _options: Vec::new(),
            _ballots: Vec::new(),
        })
    }

    /// Sets the options of the poll. The order is kept for the tally.
    ///
    /// Any ballot added before is dropped.
    pub fn options(self, opts: &[PollOption]) -> Result<Builder, BallotErrors> {
        let mut seen: HashSet<&str> = HashSet::new();
        for o in opts.iter() {
            if !seen.insert(o.id.as_str()) {
                return Err(BallotErrors::DuplicateOptionId(o.id.clone()));
            }
            if o.text.trim().is_empty() {
                return Err(BallotErrors::EmptyOptionText(o.id.clone()));
            }
        }
        Ok(Builder {
            _rules: self._rules,
            _options: opts.to_vec(),
            _ballots: Vec::new(),
        })
    }

    /// Adds a ballot from a list of option ids, the most preferred first.
    pub fn add_ballot_simple(&mut self, id: &str, option_ids: &[&str]) -> Result<(), BallotErrors> {
        let rankings: Vec<Ranking> = option_ids
            .iter()
            .enumerate()
            .map(|(idx, oid)| Ranking {
                option_id: oid.to_string(),
                rank: (idx + 1) as u32,
            })
            .collect();
        self.add_ballot(&Ballot {
            id: id.to_string(),
            rankings,
        })
    }

    /// Adds a ballot after checking it.
    ///
    /// The rankings may come in any order. Under the lenient rules, the ballot may be
    /// stored with fewer rankings than given.
    pub fn add_ballot(&mut self, ballot: &Ballot) -> Result<(), BallotErrors> {
        let option_ids: HashSet<&str> = self._options.iter().map(|o| o.id.as_str()).collect();
        let mut used_ranks: HashSet<u32> = HashSet::new();
        let mut rankings: Vec<Ranking> = Vec::new();

        for r in ballot.rankings.iter() {
            if r.rank == 0 {
                return Err(BallotErrors::InvalidRank {
                    ballot: ballot.id.clone(),
                    rank: r.rank,
                });
            }
            if !option_ids.contains(r.option_id.as_str()) {
                match self._rules.unknown_option_rule {
                    UnknownOptionRule::Reject => {
                        return Err(BallotErrors::UnknownOption {
                            ballot: ballot.id.clone(),
                            option: r.option_id.clone(),
                        });
                    }
                    UnknownOptionRule::Ignore => {
                        warn!(
                            "add_ballot: ballot {}: option {} is not part of the poll, ignoring it",
                            ballot.id, r.option_id
                        );
                    }
                }
            }
            if !used_ranks.insert(r.rank) {
                match self._rules.duplicate_rank_rule {
                    DuplicateRankRule::Reject => {
                        return Err(BallotErrors::DuplicateRank {
                            ballot: ballot.id.clone(),
                            rank: r.rank,
                        });
                    }
                    DuplicateRankRule::KeepFirst => {
                        warn!(
                            "add_ballot: ballot {}: rank {} is used again, skipping {}",
                            ballot.id, r.rank, r.option_id
                        );
                        continue;
                    }
                }
            }
            rankings.push(r.clone());
        }

        if rankings.is_empty() && self._rules.empty_ballot_rule == EmptyBallotRule::Reject {
            return Err(BallotErrors::EmptyBallot(ballot.id.clone()));
        }

        debug!("add_ballot: ballot {}: {:?}", ballot.id, rankings);
        self._ballots.push(Ballot {
            id: ballot.id.clone(),
            rankings,
        });
        Ok(())
    }

    /// The number of ballots accepted so far.
    pub fn total_ballots(&self) -> usize {
        self._ballots.len()
    }

    pub fn tally(&self) -> TallyResult {
        crate::compute_winner(&self._options, &self._ballots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lunch(rules: &BallotRules) -> Builder {
        Builder::new(rules)
            .unwrap()
            .options(&[
                PollOption::new("p", "Pizza"),
                PollOption::new("s", "Sushi"),
                PollOption::new("t", "Tacos"),
            ])
            .unwrap()
    }

    fn ranking(option_id: &str, rank: u32) -> Ranking {
        Ranking {
            option_id: option_id.to_string(),
            rank,
        }
    }

    #[test]
    fn rejects_duplicate_option_ids() {
        let res = Builder::new(&BallotRules::DEFAULT_RULES)
            .unwrap()
            .options(&[PollOption::new("p", "Pizza"), PollOption::new("p", "Pasta")]);
        assert_eq!(
            res.err(),
            Some(BallotErrors::DuplicateOptionId("p".to_string()))
        );
    }

    #[test]
    fn rejects_empty_option_text() {
        let res = Builder::new(&BallotRules::DEFAULT_RULES)
            .unwrap()
            .options(&[PollOption::new("p", " ")]);
        assert_eq!(res.err(), Some(BallotErrors::EmptyOptionText("p".to_string())));
    }

    #[test]
    fn default_rules_reject_bad_ballots() {
        let mut b = lunch(&BallotRules::DEFAULT_RULES);
        assert_eq!(
            b.add_ballot_simple("b1", &["p", "x"]),
            Err(BallotErrors::UnknownOption {
                ballot: "b1".to_string(),
                option: "x".to_string()
            })
        );
        assert_eq!(
            b.add_ballot(&Ballot {
                id: "b2".to_string(),
                rankings: vec![ranking("p", 1), ranking("s", 1)],
            }),
            Err(BallotErrors::DuplicateRank {
                ballot: "b2".to_string(),
                rank: 1
            })
        );
        assert_eq!(
            b.add_ballot_simple("b3", &[]),
            Err(BallotErrors::EmptyBallot("b3".to_string()))
        );
        assert_eq!(
            b.add_ballot(&Ballot {
                id: "b4".to_string(),
                rankings: vec![ranking("p", 0)],
            }),
            Err(BallotErrors::InvalidRank {
                ballot: "b4".to_string(),
                rank: 0
            })
        );
        assert_eq!(b.total_ballots(), 0);
    }

    #[test]
    fn lenient_rules_keep_ballots() {
        let rules = BallotRules {
            unknown_option_rule: UnknownOptionRule::Ignore,
            duplicate_rank_rule: DuplicateRankRule::KeepFirst,
            empty_ballot_rule: EmptyBallotRule::Exhausted,
        };
        let mut b = lunch(&rules);
        b.add_ballot_simple("b1", &["x", "t"]).unwrap();
        b.add_ballot(&Ballot {
            id: "b2".to_string(),
            rankings: vec![ranking("t", 2), ranking("s", 2), ranking("p", 5)],
        })
        .unwrap();
        b.add_ballot_simple("b3", &[]).unwrap();
        assert_eq!(b.total_ballots(), 3);
        assert_eq!(b._ballots[1].rankings, vec![ranking("t", 2), ranking("p", 5)]);

        let res = b.tally();
        assert_eq!(res.round_stats[0].tally[2], ("Tacos".to_string(), 2));
        assert_eq!(res.winner.map(|w| w.text), Some("Tacos".to_string()));
    }

    #[test]
    fn setting_options_resets_ballots() {
        let mut b = lunch(&BallotRules::DEFAULT_RULES);
        b.add_ballot_simple("b1", &["p"]).unwrap();
        let b = b.options(&[PollOption::new("p", "Pizza")]).unwrap();
        assert_eq!(b.total_ballots(), 0);
    }
}
