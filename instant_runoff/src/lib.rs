pub mod builder;
mod config;
pub mod manual;
use log::{debug, info, warn};

use std::{collections::HashMap, ops::AddAssign};

pub use crate::config::*;

// **** Private structures ****

type RoundId = u32;

// Position of an option in the poll, as handed over by the caller.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct OptionIdx(usize);

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
    const ONE: VoteCount = VoteCount(1);
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

// A ranking whose option was found in the poll.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
struct RankedChoice {
    rank: u32,
    option: OptionIdx,
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct BallotInternal {
    // Kept in the order of the caller. Rankings on unknown options are dropped.
    choices: Vec<RankedChoice>,
}

impl BallotInternal {
    /// The preferred option among the ones still running.
    ///
    /// The choices are scanned once without being sorted: the lowest rank wins,
    /// and for equal ranks the first one in the ballot.
    fn first_active(&self, running: &[bool]) -> Option<OptionIdx> {
        self.choices
            .iter()
            .filter(|c| running[c.option.0])
            .min_by_key(|c| c.rank)
            .map(|c| c.option)
    }
}

/// The votes of the running options, in poll order.
#[derive(Eq, PartialEq, Debug, Clone)]
struct Tally {
    entries: Vec<(OptionIdx, VoteCount)>,
}

impl Tally {
    fn total(&self) -> VoteCount {
        self.entries.iter().map(|(_, vc)| *vc).sum()
    }

    fn get(&self, oid: OptionIdx) -> Option<VoteCount> {
        self.entries
            .iter()
            .find(|(oid2, _)| *oid2 == oid)
            .map(|(_, vc)| *vc)
    }

    fn min_count(&self) -> Option<VoteCount> {
        self.entries.iter().map(|(_, vc)| *vc).min()
    }

    /// The option holding strictly more than half of the votes, if any.
    /// At most one option can satisfy this.
    fn majority(&self) -> Option<(OptionIdx, VoteCount)> {
        let total = self.total();
        self.entries
            .iter()
            .find(|(_, vc)| vc.0 * 2 > total.0)
            .cloned()
    }
}

// The options removed at the end of a round.
#[derive(Eq, PartialEq, Debug, Clone)]
struct Elimination {
    eliminated: Vec<OptionIdx>,
    // Set when all the running options were tied and the first one was kept.
    spared: Option<OptionIdx>,
}

/// Runs an instant-runoff tally over the ballots of a closed poll.
///
/// Arguments:
/// * `options` the options of the poll. Their order is the order used to break full ties.
/// * `ballots` the ballots cast. They are expected to be validated already, see
/// [`builder::Builder`]. Rankings that refer to an option outside of `options` never
/// receive a vote.
///
/// The function never fails: every input, including empty ones, produces a result.
pub fn compute_winner(options: &[PollOption], ballots: &[Ballot]) -> TallyResult {
    info!(
        "Processing {:?} ballots, {:?} options",
        ballots.len(),
        options.len()
    );

    match options {
        [] => {
            info!("No option in the poll, no winner");
            return TallyResult {
                winner: None,
                round_stats: Vec::new(),
                eliminated: Vec::new(),
            };
        }
        [single] => {
            let count = count_top_choices(single, ballots);
            info!(
                "Only one option, directly winning: {} ({} votes)",
                single.text, count.0
            );
            return TallyResult {
                winner: Some(Winner {
                    id: single.id.clone(),
                    text: single.text.clone(),
                    final_vote_count: count.0,
                }),
                round_stats: Vec::new(),
                eliminated: Vec::new(),
            };
        }
        _ => {}
    }

    for (idx, o) in options.iter().enumerate() {
        info!("Option: {}: {}", idx + 1, o.text);
    }
    let checked_ballots = checks(options, ballots);

    // The options that are still running, in the order defined by the caller.
    let mut active: Vec<OptionIdx> = (0..options.len()).map(OptionIdx).collect();
    let mut running: Vec<bool> = vec![true; options.len()];
    let mut round_stats: Vec<RoundStats> = Vec::new();
    let mut last_tally: Option<Tally> = None;

    while active.len() > 1 {
        let round_id = (round_stats.len() + 1) as RoundId;
        let tally = compute_tally(&checked_ballots, &active, &running);
        debug!("Round id: {:?} tally: {:?}", round_id, tally);
        let total = tally.total();
        info!(
            "Round {} ({} votes, majority above {})",
            round_id,
            total.0,
            total.0 / 2
        );

        if let Some((oid, count)) = tally.majority() {
            log_round(&tally, options, &[oid], "elected");
            round_stats.push(round_result_to_stat(
                round_id,
                &tally,
                options,
                Some((oid, count)),
                &[],
            ));
            let option = &options[oid.0];
            return TallyResult {
                winner: Some(Winner {
                    id: option.id.clone(),
                    text: option.text.clone(),
                    final_vote_count: count.0,
                }),
                eliminated: flatten_eliminated(&round_stats),
                round_stats,
            };
        }

        let elimination = find_eliminated_options(&tally);
        if let Some(spared) = elimination.spared {
            info!(
                "Round {}: all the options are tied, keeping {}",
                round_id, options[spared.0].text
            );
        }
        log_round(&tally, options, &elimination.eliminated, "eliminated");

        for oid in elimination.eliminated.iter() {
            running[oid.0] = false;
        }
        round_stats.push(round_result_to_stat(
            round_id,
            &tally,
            options,
            None,
            &elimination.eliminated,
        ));

        let before = active.len();
        active.retain(|oid| running[oid.0]);
        debug!(
            "Round id: {:?} running options: {:?} -> {:?}",
            round_id,
            before,
            active.len()
        );
        last_tally = Some(tally);
    }

    let winner = active.first().map(|oid| {
        let option = &options[oid.0];
        let count = match last_tally.as_ref().and_then(|t| t.get(*oid)) {
            Some(vc) => vc,
            None => count_top_choices(option, ballots),
        };
        info!("Last option standing: {} ({} votes)", option.text, count.0);
        Winner {
            id: option.id.clone(),
            text: option.text.clone(),
            final_vote_count: count.0,
        }
    });
    if winner.is_none() {
        info!("All the options were eliminated, no winner");
    }

    TallyResult {
        winner,
        eliminated: flatten_eliminated(&round_stats),
        round_stats,
    }
}

// Resolves the rankings against the options of the poll.
fn checks(options: &[PollOption], ballots: &[Ballot]) -> Vec<BallotInternal> {
    let mut option_ids: HashMap<&str, OptionIdx> = HashMap::new();
    for (idx, o) in options.iter().enumerate() {
        option_ids.entry(o.id.as_str()).or_insert(OptionIdx(idx));
    }

    let mut unknown_rankings: usize = 0;
    let res: Vec<BallotInternal> = ballots
        .iter()
        .map(|b| {
            let choices: Vec<RankedChoice> = b
                .rankings
                .iter()
                .filter_map(|r| match option_ids.get(r.option_id.as_str()) {
                    Some(oid) => Some(RankedChoice {
                        rank: r.rank,
                        option: *oid,
                    }),
                    None => {
                        unknown_rankings += 1;
                        None
                    }
                })
                .collect();
            BallotInternal { choices }
        })
        .collect();

    if unknown_rankings > 0 {
        warn!(
            "checks: {} rankings refer to options outside of the poll, they will not count",
            unknown_rankings
        );
    }
    res
}

// The number of ballots whose top ranking goes to this option.
fn count_top_choices(option: &PollOption, ballots: &[Ballot]) -> VoteCount {
    ballots
        .iter()
        .filter(|b| {
            b.rankings
                .iter()
                .min_by_key(|r| r.rank)
                .map_or(false, |r| r.option_id == option.id)
        })
        .map(|_| VoteCount::ONE)
        .sum()
}

fn compute_tally(ballots: &[BallotInternal], active: &[OptionIdx], running: &[bool]) -> Tally {
    let mut counts: Vec<VoteCount> = vec![VoteCount::EMPTY; running.len()];
    for b in ballots.iter() {
        if let Some(oid) = b.first_active(running) {
            counts[oid.0] += VoteCount::ONE;
        }
    }
    Tally {
        entries: active.iter().map(|oid| (*oid, counts[oid.0])).collect(),
    }
}

// All the options at the lowest count go away at once, unless that would remove
// every running option. In that case the first one in poll order stays.
fn find_eliminated_options(tally: &Tally) -> Elimination {
    let min_count = match tally.min_count() {
        Some(vc) => vc,
        None => {
            return Elimination {
                eliminated: Vec::new(),
                spared: None,
            }
        }
    };

    let lowest: Vec<OptionIdx> = tally
        .entries
        .iter()
        .filter(|(_, vc)| *vc == min_count)
        .map(|(oid, _)| *oid)
        .collect();
    debug!(
        "find_eliminated_options: min count {:?}, lowest: {:?}",
        min_count, lowest
    );

    if lowest.len() == tally.entries.len() {
        if let Some((first, rest)) = lowest.split_first() {
            return Elimination {
                eliminated: rest.to_vec(),
                spared: Some(*first),
            };
        }
    }
    Elimination {
        eliminated: lowest,
        spared: None,
    }
}

fn round_result_to_stat(
    round_id: RoundId,
    tally: &Tally,
    options: &[PollOption],
    elected: Option<(OptionIdx, VoteCount)>,
    eliminated: &[OptionIdx],
) -> RoundStats {
    RoundStats {
        round: round_id,
        tally: tally
            .entries
            .iter()
            .map(|(oid, vc)| (options[oid.0].text.clone(), vc.0))
            .collect(),
        elected: elected.map(|(oid, _)| options[oid.0].text.clone()),
        final_vote_count: elected.map(|(_, vc)| vc.0),
        eliminated: eliminated
            .iter()
            .map(|oid| options[oid.0].text.clone())
            .collect(),
    }
}

fn flatten_eliminated(stats: &[RoundStats]) -> Vec<String> {
    stats.iter().flat_map(|rs| rs.eliminated.clone()).collect()
}

fn log_round(tally: &Tally, options: &[PollOption], marked: &[OptionIdx], label: &str) {
    for (oid, vc) in tally.entries.iter() {
        if marked.contains(oid) {
            info!("{:>8} {} -> {}", vc.0, options[oid.0].text, label);
        } else {
            info!("{:>8} {}", vc.0, options[oid.0].text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn options(names: &[&str]) -> Vec<PollOption> {
        names
            .iter()
            .map(|n| PollOption::new(&n.to_lowercase(), n))
            .collect()
    }

    // Ranks 1, 2, 3... in the order of the preferences.
    fn ballot(id: &str, prefs: &[&str]) -> Ballot {
        Ballot {
            id: id.to_string(),
            rankings: prefs
                .iter()
                .enumerate()
                .map(|(idx, p)| Ranking {
                    option_id: p.to_lowercase(),
                    rank: (idx + 1) as u32,
                })
                .collect(),
        }
    }

    fn ballots(groups: &[(usize, &[&str])]) -> Vec<Ballot> {
        let mut res = Vec::new();
        for (count, prefs) in groups.iter() {
            for _ in 0..*count {
                res.push(ballot(&format!("b{}", res.len()), prefs));
            }
        }
        res
    }

    fn tally_of(rs: &RoundStats) -> Vec<(&str, u64)> {
        rs.tally.iter().map(|(n, c)| (n.as_str(), *c)).collect()
    }

    #[test]
    fn zero_options() {
        init_logs();
        let res = compute_winner(&[], &ballots(&[(2, &["A"])]));
        assert_eq!(res.winner, None);
        assert!(res.round_stats.is_empty());
        assert!(res.eliminated.is_empty());
    }

    #[test]
    fn single_option() {
        init_logs();
        let res = compute_winner(&options(&["A"]), &ballots(&[(2, &["A"])]));
        assert_eq!(
            res.winner,
            Some(Winner {
                id: "a".to_string(),
                text: "A".to_string(),
                final_vote_count: 2
            })
        );
        assert!(res.round_stats.is_empty());
    }

    #[test]
    fn single_option_only_counts_top_choices() {
        init_logs();
        let mut bs = ballots(&[(1, &["A"]), (1, &["X", "A"]), (1, &[])]);
        // Top choice on an option that is not part of the poll.
        bs.push(ballot("unknown", &["Z"]));
        let res = compute_winner(&options(&["A"]), &bs);
        assert_eq!(res.winner.map(|w| w.final_vote_count), Some(1));
    }

    #[test]
    fn immediate_majority() {
        init_logs();
        let res = compute_winner(
            &options(&["A", "B"]),
            &ballots(&[(3, &["A"]), (1, &["B"])]),
        );
        assert_eq!(res.round_stats.len(), 1);
        let r1 = &res.round_stats[0];
        assert_eq!(r1.round, 1);
        assert_eq!(tally_of(r1), vec![("A", 3), ("B", 1)]);
        assert_eq!(r1.elected, Some("A".to_string()));
        assert_eq!(r1.final_vote_count, Some(3));
        assert!(r1.eliminated.is_empty());
        let w = res.winner.unwrap();
        assert_eq!(w.text, "A");
        assert_eq!(w.final_vote_count, 3);
        assert!(res.eliminated.is_empty());
    }

    #[test]
    fn clear_majority_with_full_tie() {
        init_logs();
        let res = compute_winner(
            &options(&["A", "B", "C"]),
            &ballots(&[
                (3, &["A", "B", "C"]),
                (2, &["B", "A", "C"]),
                (1, &["C", "B", "A"]),
            ]),
        );
        assert_eq!(res.round_stats.len(), 2);
        let r1 = &res.round_stats[0];
        assert_eq!(tally_of(r1), vec![("A", 3), ("B", 2), ("C", 1)]);
        assert_eq!(r1.eliminated, vec!["C".to_string()]);
        assert_eq!(r1.elected, None);
        let r2 = &res.round_stats[1];
        assert_eq!(r2.round, 2);
        assert_eq!(tally_of(r2), vec![("A", 3), ("B", 3)]);
        assert_eq!(r2.eliminated, vec!["B".to_string()]);
        let w = res.winner.unwrap();
        assert_eq!(w.id, "a");
        assert_eq!(w.final_vote_count, 3);
        assert_eq!(res.eliminated, vec!["C".to_string(), "B".to_string()]);
    }

    #[test]
    fn transfers_produce_a_majority() {
        init_logs();
        let res = compute_winner(
            &options(&["A", "B", "C"]),
            &ballots(&[(4, &["A"]), (3, &["B"]), (2, &["C", "B"])]),
        );
        assert_eq!(res.round_stats.len(), 2);
        assert_eq!(
            tally_of(&res.round_stats[0]),
            vec![("A", 4), ("B", 3), ("C", 2)]
        );
        assert_eq!(tally_of(&res.round_stats[1]), vec![("A", 4), ("B", 5)]);
        assert_eq!(res.round_stats[1].elected, Some("B".to_string()));
        assert_eq!(res.winner.map(|w| w.final_vote_count), Some(5));
        assert_eq!(res.eliminated, vec!["C".to_string()]);
    }

    #[test]
    fn simultaneous_eliminations() {
        init_logs();
        let res = compute_winner(
            &options(&["A", "B", "C", "D"]),
            &ballots(&[(3, &["A"]), (1, &["B"]), (1, &["C", "D"]), (2, &["D"])]),
        );
        let r1 = &res.round_stats[0];
        assert_eq!(r1.eliminated, vec!["B".to_string(), "C".to_string()]);
        let r2 = &res.round_stats[1];
        // The ballot for B is exhausted, the one for C goes to D.
        assert_eq!(tally_of(r2), vec![("A", 3), ("D", 3)]);
        // Full tie on the last two: A comes first.
        assert_eq!(r2.eliminated, vec!["D".to_string()]);
        assert_eq!(res.winner.map(|w| w.text), Some("A".to_string()));
    }

    #[test]
    fn three_way_tie_keeps_the_first_option() {
        init_logs();
        let res = compute_winner(
            &options(&["A", "B", "C"]),
            &ballots(&[(1, &["C"]), (1, &["B"]), (1, &["A"])]),
        );
        assert_eq!(res.round_stats.len(), 1);
        assert_eq!(
            res.round_stats[0].eliminated,
            vec!["B".to_string(), "C".to_string()]
        );
        let w = res.winner.unwrap();
        assert_eq!(w.text, "A");
        assert_eq!(w.final_vote_count, 1);
    }

    #[test]
    fn no_ballots() {
        init_logs();
        let res = compute_winner(&options(&["A", "B"]), &[]);
        assert_eq!(res.round_stats.len(), 1);
        assert_eq!(tally_of(&res.round_stats[0]), vec![("A", 0), ("B", 0)]);
        assert_eq!(res.winner.map(|w| (w.text, w.final_vote_count)), Some(("A".to_string(), 0)));
    }

    #[test]
    fn exhausted_ballot() {
        init_logs();
        let bs = ballots(&[(2, &["A"]), (1, &[]), (1, &["B"]), (1, &["C"])]);
        let res = compute_winner(&options(&["A", "B", "C"]), &bs);
        for rs in res.round_stats.iter() {
            let total: u64 = rs.tally.iter().map(|(_, c)| c).sum();
            assert!(total <= 4);
        }
        assert_eq!(
            tally_of(&res.round_stats[0]),
            vec![("A", 2), ("B", 1), ("C", 1)]
        );
        // B and C go away together, A is left alone.
        assert_eq!(res.round_stats.len(), 1);
        assert_eq!(res.winner.map(|w| w.final_vote_count), Some(2));
    }

    #[test]
    fn unknown_options_never_count() {
        init_logs();
        let res = compute_winner(
            &options(&["A", "B"]),
            &ballots(&[(2, &["Z", "A"]), (1, &["B"]), (1, &["Z"])]),
        );
        assert_eq!(tally_of(&res.round_stats[0]), vec![("A", 2), ("B", 1)]);
        assert_eq!(res.winner.map(|w| w.text), Some("A".to_string()));
    }

    #[test]
    fn ranks_are_only_compared() {
        init_logs();
        let b = Ballot {
            id: "sparse".to_string(),
            rankings: vec![
                Ranking {
                    option_id: "c".to_string(),
                    rank: 10,
                },
                Ranking {
                    option_id: "b".to_string(),
                    rank: 3,
                },
                Ranking {
                    option_id: "a".to_string(),
                    rank: 7,
                },
            ],
        };
        let mut bs = ballots(&[(2, &["A"]), (2, &["C"]), (1, &["D"])]);
        bs.push(b);
        let res = compute_winner(&options(&["A", "B", "C", "D"]), &bs);
        assert_eq!(
            tally_of(&res.round_stats[0]),
            vec![("A", 2), ("B", 1), ("C", 2), ("D", 1)]
        );
        // B is gone, the sparse ballot moves to its rank 7: A.
        assert_eq!(tally_of(&res.round_stats[1]), vec![("A", 3), ("C", 2)]);
    }

    #[test]
    fn round_one_conserves_ballots() {
        init_logs();
        let bs = ballots(&[
            (5, &["A", "B"]),
            (4, &["B"]),
            (3, &["C", "A"]),
            (2, &[]),
            (1, &["Z"]),
        ]);
        let res = compute_winner(&options(&["A", "B", "C"]), &bs);
        let total: u64 = res.round_stats[0].tally.iter().map(|(_, c)| c).sum();
        assert_eq!(total, 12);
    }

    #[test]
    fn rounds_are_contiguous_and_shrinking() {
        init_logs();
        let bs = ballots(&[
            (6, &["A", "B"]),
            (5, &["B", "C"]),
            (4, &["C", "D"]),
            (3, &["D", "E"]),
            (2, &["E", "A"]),
        ]);
        let res = compute_winner(&options(&["A", "B", "C", "D", "E"]), &bs);
        let mut previous = usize::MAX;
        for (idx, rs) in res.round_stats.iter().enumerate() {
            assert_eq!(rs.round as usize, idx + 1);
            assert!(rs.tally.len() < previous);
            previous = rs.tally.len();
        }
        let mut seen = res.eliminated.clone();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), res.eliminated.len());
    }

    #[test]
    fn majority_is_sound() {
        init_logs();
        let bs = ballots(&[(5, &["A", "B"]), (4, &["B"]), (3, &["C", "A"])]);
        let res = compute_winner(&options(&["A", "B", "C"]), &bs);
        let last = res.round_stats.last().unwrap();
        let total: u64 = last.tally.iter().map(|(_, c)| c).sum();
        let w = res.winner.unwrap();
        assert_eq!(last.elected, Some(w.text.clone()));
        assert!(w.final_vote_count * 2 > total);
    }

    #[test]
    fn tally_is_deterministic() {
        init_logs();
        let opts = options(&["A", "B", "C", "D"]);
        let bs = ballots(&[
            (2, &["A", "D"]),
            (2, &["B", "C"]),
            (2, &["C", "B"]),
            (2, &["D", "A"]),
        ]);
        let r1 = compute_winner(&opts, &bs);
        let r2 = compute_winner(&opts, &bs);
        assert_eq!(r1, r2);
    }

    #[test]
    fn tie_break_is_pure() {
        let tally = Tally {
            entries: vec![
                (OptionIdx(2), VoteCount(1)),
                (OptionIdx(0), VoteCount(1)),
                (OptionIdx(1), VoteCount(1)),
            ],
        };
        let e = find_eliminated_options(&tally);
        assert_eq!(e.spared, Some(OptionIdx(2)));
        assert_eq!(e.eliminated, vec![OptionIdx(0), OptionIdx(1)]);

        let tally = Tally {
            entries: vec![
                (OptionIdx(0), VoteCount(1)),
                (OptionIdx(1), VoteCount(4)),
                (OptionIdx(2), VoteCount(1)),
            ],
        };
        let e = find_eliminated_options(&tally);
        assert_eq!(e.spared, None);
        assert_eq!(e.eliminated, vec![OptionIdx(0), OptionIdx(2)]);
    }
}
