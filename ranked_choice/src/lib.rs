mod colours;
mod config;
mod sankey;

pub mod builder;
pub mod manual;

use log::{debug, info};

use std::{
    collections::{HashMap, HashSet},
    ops::AddAssign,
};

pub use crate::colours::{assign_colours, hsl_to_rgb};
pub use crate::config::*;
use crate::sankey::FlowGraphBuilder;

// **** Private structures ****

type RoundId = u32;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct CandidateId(u32);

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

// Invariant: there is at least one candidate in a ranked choice.
// Exhausted ballots are dropped from the round state instead.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
struct RankedChoice {
    first_valid: CandidateId,
    rest: Vec<CandidateId>,
}

impl RankedChoice {
    fn new(ranks: &[CandidateId]) -> Option<RankedChoice> {
        ranks.split_first().map(|(first, rest)| RankedChoice {
            first_valid: *first,
            rest: rest.to_vec(),
        })
    }

    fn candidates(&self) -> impl Iterator<Item = CandidateId> + '_ {
        std::iter::once(self.first_valid).chain(self.rest.iter().cloned())
    }

    /// Removes all the eliminated candidates, wherever they are ranked.
    /// The order of the remaining candidates is kept.
    /// Returns None if nothing is left in the ballot.
    fn filtered_candidate(&self, eliminated: &HashSet<CandidateId>) -> Option<RankedChoice> {
        let remaining: Vec<CandidateId> = self
            .candidates()
            .filter(|cid| !eliminated.contains(cid))
            .collect();
        RankedChoice::new(&remaining)
    }
}

/// Maps the external identifiers of the candidates to compact internal ids.
///
/// The roster comes first, in order. Identifiers only found in the ballots are
/// registered after it and have no label.
struct CandidateRegistry {
    names: Vec<String>,
    roster: Vec<ResultCandidate>,
    ids: HashMap<String, CandidateId>,
}

impl CandidateRegistry {
    fn new(roster: &[ResultCandidate]) -> Result<CandidateRegistry, VotingErrors> {
        let mut registry = CandidateRegistry {
            names: Vec::new(),
            roster: roster.to_vec(),
            ids: HashMap::new(),
        };
        for c in roster.iter() {
            if registry.ids.contains_key(&c.id) {
                return Err(VotingErrors::DuplicateCandidate(c.id.clone()));
            }
            registry.intern(&c.id);
        }
        Ok(registry)
    }

    fn intern(&mut self, name: &str) -> CandidateId {
        if let Some(cid) = self.ids.get(name) {
            return *cid;
        }
        let cid = CandidateId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), cid);
        cid
    }

    fn name(&self, cid: CandidateId) -> &str {
        self.names[cid.0 as usize].as_str()
    }

    fn enrich(&self, cid: CandidateId) -> Result<ResultCandidate, VotingErrors> {
        self.roster
            .get(cid.0 as usize)
            .cloned()
            .ok_or_else(|| VotingErrors::UnknownCandidate(self.name(cid).to_string()))
    }

    fn label(&self, cid: CandidateId) -> Result<&str, VotingErrors> {
        self.roster
            .get(cid.0 as usize)
            .map(|c| c.label.as_str())
            .ok_or_else(|| VotingErrors::UnknownCandidate(self.name(cid).to_string()))
    }
}

/// The first preferences of a round, in the order the candidates were first seen
/// in the ballots.
type Tally = Vec<(CandidateId, VoteCount)>;

// Every candidate still present in a ballot is part of the tally, even when it is
// nobody's first choice this round. Such a candidate starts at zero and is a loser.
fn compute_tally(votes: &[RankedChoice]) -> Tally {
    let mut tally: Tally = Vec::new();
    let mut positions: HashMap<CandidateId, usize> = HashMap::new();
    for v in votes.iter() {
        for cid in v.candidates() {
            positions.entry(cid).or_insert_with(|| {
                tally.push((cid, VoteCount::EMPTY));
                tally.len() - 1
            });
        }
    }
    for v in votes.iter() {
        if let Some(idx) = positions.get(&v.first_valid) {
            tally[*idx].1 += VoteCount::ONE;
        }
    }
    tally
}

fn candidates_with_count(tally: &Tally, count: VoteCount) -> Vec<CandidateId> {
    tally
        .iter()
        .filter_map(|(cid, vc)| if *vc == count { Some(*cid) } else { None })
        .collect()
}

// Strict majority: more than half of the ballots, with an integer division.
fn has_majority(tally: &Tally, max_votes: VoteCount) -> bool {
    let total_votes: VoteCount = tally.iter().map(|(_, vc)| *vc).sum();
    max_votes.0 > total_votes.0 / 2
}

/// All the candidates tied for the lowest count. They are eliminated together.
fn find_losers(tally: &Tally) -> Vec<CandidateId> {
    match tally.iter().map(|(_, vc)| *vc).min() {
        Some(min_votes) => candidates_with_count(tally, min_votes),
        None => Vec::new(),
    }
}

fn enrich_all(
    cids: &[CandidateId],
    registry: &CandidateRegistry,
) -> Result<Vec<ResultCandidate>, VotingErrors> {
    cids.iter().map(|cid| registry.enrich(*cid)).collect()
}

fn display_tally(tally: &Tally, registry: &CandidateRegistry) -> Vec<(String, u64)> {
    tally
        .iter()
        .map(|(cid, vc)| (registry.name(*cid).to_string(), vc.0))
        .collect()
}

/// Runs the instant-runoff count for the given ballots.
///
/// Arguments:
/// * `ballots` the preferences of each voter, most preferred first. Empty ballots
/// are ignored.
/// * `candidates` the roster of the poll. It provides the labels and the colours.
/// * `rules` the rules that govern this count.
///
/// All the candidates tied for the last place are eliminated together in every
/// round. The count stops when a candidate holds a strict majority of the ballots
/// still in play, when all the ballots are exhausted (the last eliminated
/// candidates are tied), or after `rules.max_rounds` rounds (the leading
/// candidates of the last round are tied).
pub fn run_ranked_choice(
    ballots: &[Ballot],
    candidates: &[Candidate],
    rules: &TabulationRules,
) -> Result<Outcome, VotingErrors> {
    rules.validate()?;
    info!(
        "Processing {:?} ballots, candidates: {:?}, rules: {:?}",
        ballots.len(),
        candidates,
        rules
    );

    let colours = assign_colours(candidates, rules.colour_saturation, rules.colour_lightness);
    let mut registry = CandidateRegistry::new(&colours)?;

    let mut cur_votes: Vec<RankedChoice> = ballots
        .iter()
        .filter_map(|b| {
            let ranks: Vec<CandidateId> = b.iter().map(|name| registry.intern(name)).collect();
            RankedChoice::new(&ranks)
        })
        .collect();
    debug!(
        "run_ranked_choice: {:?} ballots with at least one choice",
        cur_votes.len()
    );
    if cur_votes.is_empty() {
        return Err(VotingErrors::EmptyElection);
    }

    let mut flows = FlowGraphBuilder::new();
    let mut round_activity: Vec<RoundRecord> = Vec::new();
    let mut potential_winners: Vec<CandidateId> = Vec::new();
    let mut round_id: RoundId = 0;

    while round_id < rules.max_rounds {
        round_id += 1;

        let tally = compute_tally(&cur_votes);
        debug!(
            "run_ranked_choice: round {:?} tally: {:?}",
            round_id,
            display_tally(&tally, &registry)
        );

        let max_votes = tally
            .iter()
            .map(|(_, vc)| *vc)
            .max()
            .ok_or(VotingErrors::EmptyElection)?;
        potential_winners = candidates_with_count(&tally, max_votes);

        if has_majority(&tally, max_votes) {
            let winner_cid = *potential_winners
                .first()
                .ok_or(VotingErrors::EmptyElection)?;
            let winner = registry.enrich(winner_cid)?;
            info!(
                "Round {}: {} {} -> elected",
                round_id, max_votes.0, winner.label
            );
            round_activity.push(RoundRecord {
                round: round_id,
                majority: Some(winner.clone()),
                eliminated: None,
            });
            return Ok(Outcome {
                tied: false,
                tied_candidates: None,
                winner: true,
                winning_candidate: Some(winner),
                round_activity,
                sankey_data: flows.into_sankey_data(colours),
            });
        }

        let losers = find_losers(&tally);
        debug!(
            "run_ranked_choice: round {:?} losers: {:?}",
            round_id, losers
        );
        let eliminated: HashSet<CandidateId> = losers.iter().cloned().collect();

        // The flows are computed with the ballots as they were before the elimination.
        flows.record_round(round_id, &cur_votes, &eliminated, &registry)?;

        cur_votes = cur_votes
            .iter()
            .filter_map(|v| v.filtered_candidate(&eliminated))
            .collect();

        let eliminated_candidates = enrich_all(&losers, &registry)?;
        for c in eliminated_candidates.iter() {
            info!("Round {}: {} -> eliminated", round_id, c.label);
        }
        round_activity.push(RoundRecord {
            round: round_id,
            majority: None,
            eliminated: Some(eliminated_candidates.clone()),
        });

        if cur_votes.is_empty() {
            info!(
                "Round {}: all the ballots are exhausted, tie between the last eliminated candidates",
                round_id
            );
            return Ok(Outcome {
                tied: true,
                tied_candidates: Some(eliminated_candidates),
                winner: false,
                winning_candidate: None,
                round_activity,
                sankey_data: flows.into_sankey_data(colours),
            });
        }
    }

    info!(
        "No majority after {} rounds, tie between the leading candidates",
        round_id
    );
    let tied_candidates = enrich_all(&potential_winners, &registry)?;
    Ok(Outcome {
        tied: true,
        tied_candidates: Some(tied_candidates),
        winner: false,
        winning_candidate: None,
        round_activity,
        sankey_data: flows.into_sankey_data(colours),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn roster(ids: &[&str]) -> Vec<Candidate> {
        ids.iter()
            .map(|id| Candidate {
                id: id.to_string(),
                label: format!("Candidate {}", id.to_uppercase()),
            })
            .collect()
    }

    fn ballots(groups: &[(usize, &[&str])]) -> Vec<Ballot> {
        let mut res: Vec<Ballot> = Vec::new();
        for (count, choices) in groups.iter() {
            for _ in 0..*count {
                res.push(choices.iter().map(|s| s.to_string()).collect());
            }
        }
        res
    }

    fn ids(cands: &Option<Vec<ResultCandidate>>) -> Vec<String> {
        cands
            .clone()
            .unwrap_or_default()
            .iter()
            .map(|c| c.id.clone())
            .collect()
    }

    fn edges(outcome: &Outcome) -> Vec<(String, String, u64)> {
        outcome
            .sankey_data
            .nodes
            .iter()
            .map(|e| (e.from.clone(), e.to.clone(), e.flow))
            .collect()
    }

    fn edge(from: &str, to: &str, flow: u64) -> (String, String, u64) {
        (from.to_string(), to.to_string(), flow)
    }

    fn run(groups: &[(usize, &[&str])], cands: &[&str]) -> Outcome {
        init();
        run_ranked_choice(&ballots(groups), &roster(cands), &TabulationRules::DEFAULT_RULES)
            .unwrap()
    }

    #[test]
    fn majority_in_first_round() {
        let outcome = run(&[(3, &["a"]), (2, &["b"])], &["a", "b"]);
        assert!(outcome.winner);
        assert!(!outcome.tied);
        assert_eq!(outcome.tied_candidates, None);
        assert_eq!(outcome.winning_candidate.as_ref().unwrap().id, "a");
        assert_eq!(
            outcome.winning_candidate.as_ref().unwrap().label,
            "Candidate A"
        );
        assert_eq!(outcome.round_activity.len(), 1);
        assert_eq!(outcome.round_activity[0].round, 1);
        assert_eq!(outcome.round_activity[0].eliminated, None);
        assert!(outcome.sankey_data.nodes.is_empty());
        assert!(outcome.sankey_data.labels.is_empty());
    }

    #[test]
    fn transfer_to_next_preference() {
        let outcome = run(&[(2, &["a"]), (2, &["b"]), (1, &["c", "a"])], &["a", "b", "c"]);
        assert!(outcome.winner);
        assert_eq!(outcome.winning_candidate.as_ref().unwrap().id, "a");
        assert_eq!(outcome.round_activity.len(), 2);
        assert_eq!(ids(&outcome.round_activity[0].eliminated), vec!["c"]);
        assert_eq!(outcome.round_activity[0].majority, None);
        assert_eq!(
            outcome.round_activity[1].majority.as_ref().unwrap().id,
            "a"
        );
        assert_eq!(
            edges(&outcome),
            vec![
                edge("a_1", "a_2", 2),
                edge("b_1", "b_2", 2),
                edge("c_1", "a_2", 1)
            ]
        );
        let labels: Vec<(&str, &str)> = outcome.sankey_data.labels.iter().collect();
        assert_eq!(
            labels,
            vec![
                ("a_1", "Candidate A"),
                ("a_2", "Candidate A"),
                ("b_1", "Candidate B"),
                ("b_2", "Candidate B"),
                ("c_1", "Candidate C"),
            ]
        );
        assert_eq!(outcome.sankey_data.colours.len(), 3);
    }

    #[test]
    fn even_split_exhausts_all_ballots() {
        let outcome = run(&[(2, &["a"]), (2, &["b"])], &["a", "b"]);
        assert!(outcome.tied);
        assert!(!outcome.winner);
        assert_eq!(outcome.winning_candidate, None);
        assert_eq!(ids(&outcome.tied_candidates), vec!["a", "b"]);
        assert_eq!(outcome.round_activity.len(), 1);
        assert_eq!(ids(&outcome.round_activity[0].eliminated), vec!["a", "b"]);
        // Exhausted ballots do not produce any flow.
        assert!(outcome.sankey_data.nodes.is_empty());
    }

    #[test]
    fn round_cap_reports_leading_candidates() {
        init();
        let rules = TabulationRules {
            max_rounds: 1,
            ..TabulationRules::DEFAULT_RULES
        };
        let outcome = run_ranked_choice(
            &ballots(&[(2, &["a", "b"]), (2, &["b", "a"]), (1, &["c", "a"])]),
            &roster(&["a", "b", "c"]),
            &rules,
        )
        .unwrap();
        assert!(outcome.tied);
        assert!(!outcome.winner);
        assert_eq!(ids(&outcome.tied_candidates), vec!["a", "b"]);
        assert_eq!(outcome.round_activity.len(), 1);
        assert_eq!(ids(&outcome.round_activity[0].eliminated), vec!["c"]);
    }

    #[test]
    fn default_round_cap_stops_after_fifty_rounds() {
        init();
        // Candidate k holds k + 1 single choice ballots, and the last two share the
        // highest count. One candidate goes per round and nobody reaches the majority.
        let names: Vec<String> = (0..53).map(|k| format!("c{}", k)).collect();
        let mut all_ballots: Vec<Ballot> = Vec::new();
        for (k, name) in names.iter().enumerate() {
            for _ in 0..(k + 1).min(52) {
                all_ballots.push(vec![name.clone()]);
            }
        }
        let name_refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        let outcome = run_ranked_choice(
            &all_ballots,
            &roster(&name_refs),
            &TabulationRules::DEFAULT_RULES,
        )
        .unwrap();
        assert!(outcome.tied);
        assert!(!outcome.winner);
        assert_eq!(outcome.round_activity.len(), 50);
        assert_eq!(outcome.round_activity[49].round, 50);
        assert_eq!(ids(&outcome.round_activity[49].eliminated), vec!["c49"]);
        assert_eq!(ids(&outcome.tied_candidates), vec!["c51", "c52"]);
    }

    #[test]
    fn candidate_without_first_preference_is_eliminated() {
        // b is nobody's first choice but is still ranked, so it is a loser at zero.
        let outcome = run(
            &[(2, &["a", "b"]), (2, &["c", "b"]), (1, &["d", "a"])],
            &["a", "b", "c", "d"],
        );
        assert_eq!(ids(&outcome.round_activity[0].eliminated), vec!["b"]);
        // Round 2: a:2, c:2, d:1 -> d is eliminated and transfers to a.
        assert_eq!(ids(&outcome.round_activity[1].eliminated), vec!["d"]);
        assert!(outcome.winner);
        assert_eq!(outcome.winning_candidate.unwrap().id, "a");
        assert_eq!(outcome.round_activity.len(), 3);
    }

    #[test]
    fn losers_are_removed_from_every_position() {
        let outcome = run(
            &[(3, &["a", "c", "b"]), (3, &["b", "c", "a"]), (1, &["c", "b"])],
            &["a", "b", "c"],
        );
        // c is eliminated in round 1, b wins 4 to 3 in round 2.
        assert_eq!(ids(&outcome.round_activity[0].eliminated), vec!["c"]);
        assert_eq!(outcome.winning_candidate.as_ref().unwrap().id, "b");
        assert_eq!(
            edges(&outcome),
            vec![
                edge("a_1", "a_2", 3),
                edge("b_1", "b_2", 3),
                edge("c_1", "b_2", 1)
            ]
        );
    }

    #[test]
    fn flows_from_one_node_to_several_nodes_are_kept() {
        let outcome = run(
            &[
                (4, &["a"]),
                (4, &["b"]),
                (1, &["c", "a"]),
                (1, &["c", "b"]),
                (1, &["c"]),
            ],
            &["a", "b", "c"],
        );
        assert_eq!(
            edges(&outcome),
            vec![
                edge("a_1", "a_2", 4),
                edge("b_1", "b_2", 4),
                edge("c_1", "a_2", 1),
                edge("c_1", "b_2", 1),
            ]
        );
        // Round 2: a:5, b:5 out of 10, both eliminated, everything exhausted.
        assert!(outcome.tied);
        assert_eq!(ids(&outcome.tied_candidates), vec!["a", "b"]);
    }

    #[test]
    fn tally_follows_first_seen_order() {
        let outcome = run(&[(2, &["b", "a"]), (2, &["a", "b"])], &["a", "b"]);
        // b is seen first, so it is reported first among the tied candidates.
        assert_eq!(ids(&outcome.tied_candidates), vec!["b", "a"]);
    }

    #[test]
    fn empty_ballots_are_ignored() {
        let outcome = run(&[(3, &[]), (2, &["a"]), (1, &["b", "a"])], &["a", "b"]);
        assert!(outcome.winner);
        assert_eq!(outcome.winning_candidate.unwrap().id, "a");
        assert_eq!(outcome.round_activity.len(), 1);
    }

    #[test]
    fn no_ballots() {
        init();
        let res = run_ranked_choice(
            &ballots(&[(2, &[])]),
            &roster(&["a"]),
            &TabulationRules::DEFAULT_RULES,
        );
        assert_eq!(res, Err(VotingErrors::EmptyElection));
    }

    #[test]
    fn unknown_candidate() {
        init();
        let res = run_ranked_choice(
            &ballots(&[(2, &["a"]), (2, &["b"]), (1, &["x", "a"])]),
            &roster(&["a", "b"]),
            &TabulationRules::DEFAULT_RULES,
        );
        assert_eq!(res, Err(VotingErrors::UnknownCandidate("x".to_string())));
    }

    #[test]
    fn unknown_winner() {
        init();
        let res = run_ranked_choice(
            &ballots(&[(1, &["x"])]),
            &roster(&["a"]),
            &TabulationRules::DEFAULT_RULES,
        );
        assert_eq!(res, Err(VotingErrors::UnknownCandidate("x".to_string())));
    }

    #[test]
    fn duplicate_candidate() {
        init();
        let res = run_ranked_choice(
            &ballots(&[(1, &["a"])]),
            &roster(&["a", "a"]),
            &TabulationRules::DEFAULT_RULES,
        );
        assert_eq!(res, Err(VotingErrors::DuplicateCandidate("a".to_string())));
    }

    #[test]
    fn rerun_is_identical() {
        let groups: &[(usize, &[&str])] = &[
            (3, &["a", "b", "c"]),
            (2, &["b", "c"]),
            (2, &["c", "b", "a"]),
            (1, &["d", "c"]),
        ];
        let first = run(groups, &["a", "b", "c", "d"]);
        let second = run(groups, &["a", "b", "c", "d"]);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn tally_counts_every_ballot_in_play() {
        let votes: Vec<RankedChoice> = vec![
            RankedChoice::new(&[CandidateId(0), CandidateId(1)]).unwrap(),
            RankedChoice::new(&[CandidateId(2)]).unwrap(),
            RankedChoice::new(&[CandidateId(0)]).unwrap(),
        ];
        let tally = compute_tally(&votes);
        assert_eq!(
            tally,
            vec![
                (CandidateId(0), VoteCount(2)),
                (CandidateId(1), VoteCount(0)),
                (CandidateId(2), VoteCount(1)),
            ]
        );
        let total: VoteCount = tally.iter().map(|(_, vc)| *vc).sum();
        assert_eq!(total, VoteCount(votes.len() as u64));
        assert_eq!(find_losers(&tally), vec![CandidateId(1)]);
        assert!(has_majority(&tally, VoteCount(2)));
        let even: Tally = vec![
            (CandidateId(0), VoteCount(2)),
            (CandidateId(1), VoteCount(2)),
        ];
        assert!(!has_majority(&even, VoteCount(2)));
    }

    #[test]
    fn elimination_is_idempotent() {
        let v = RankedChoice::new(&[CandidateId(2), CandidateId(0), CandidateId(1)]).unwrap();
        let eliminated: HashSet<CandidateId> = [CandidateId(0)].into_iter().collect();
        let once = v.filtered_candidate(&eliminated).unwrap();
        let twice = once.filtered_candidate(&eliminated).unwrap();
        assert_eq!(once, twice);
        assert_eq!(
            once.candidates().collect::<Vec<_>>(),
            vec![CandidateId(2), CandidateId(1)]
        );
        let all: HashSet<CandidateId> = [CandidateId(1), CandidateId(2)].into_iter().collect();
        assert_eq!(once.filtered_candidate(&all), None);
    }

    #[test]
    fn serialized_field_names() {
        let outcome = run(&[(3, &["a"]), (2, &["b"])], &["a", "b"]);
        let js = serde_json::to_value(&outcome).unwrap();
        assert_eq!(js["winner"], serde_json::json!(true));
        assert_eq!(js["tied"], serde_json::json!(false));
        assert!(js["tiedCandidates"].is_null());
        assert_eq!(js["winningCandidate"]["id"], serde_json::json!("a"));
        assert_eq!(js["winningCandidate"]["color"], serde_json::json!("#D92626"));
        assert_eq!(js["roundActivity"][0]["round"], serde_json::json!(1));
        assert!(js["roundActivity"][0]["eliminated"].is_null());
        assert_eq!(
            js["sankeyData"]["colours"][1]["color"],
            serde_json::json!("#26D9D9")
        );
    }
}
