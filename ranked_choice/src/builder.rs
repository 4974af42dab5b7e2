pub use crate::config::*;

use log::debug;
use std::collections::{HashMap, HashSet};

/// A builder for assembling ballots out of stored votes.
///
/// Polls usually store one row per voter and per ranked candidate. The builder
/// groups these rows per voter, drops the unranked ones and orders the rest.
///
/// ```
/// pub use ranked_choice::builder::Builder;
/// pub use ranked_choice::{Candidate, TabulationRules};
/// # use ranked_choice::VotingErrors;
///
/// let mut builder = Builder::new(&TabulationRules::DEFAULT_RULES)?.candidates(&[
///     Candidate { id: "a".to_string(), label: "Anna".to_string() },
///     Candidate { id: "b".to_string(), label: "Bob".to_string() },
/// ])?;
///
/// builder.add_ranking("voter 1", "b", 2);
/// builder.add_ranking("voter 1", "a", 1);
/// builder.add_ballot(&["b".to_string()]);
/// builder.add_ballot(&["a".to_string()]);
///
/// let outcome = builder.run()?;
/// assert!(outcome.winner);
/// assert_eq!(outcome.winning_candidate.unwrap().label, "Anna");
///
/// # Ok::<(), VotingErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: TabulationRules,
    pub(crate) _candidates: Option<Vec<Candidate>>,
    pub(crate) _voters: Vec<VoterRanking>,
    pub(crate) _voter_index: HashMap<String, usize>,
}

/// The stored votes of one voter. Anonymous voters come from complete ballots.
#[derive(Eq, PartialEq, Debug, Clone)]
pub(crate) struct VoterRanking {
    voter: Option<String>,
    ranks: Vec<(i64, String)>,
}

/// The identifier of a candidate that is only known by its label.
///
/// This is the hex SHA-256 digest of the label.
pub fn candidate_digest(label: &str) -> String {
    sha256::digest(label.to_string())
}

impl Builder {
    pub fn new(rules: &TabulationRules) -> Result<Builder, VotingErrors> {
        rules.validate()?;
        Ok(Builder {
            _rules: rules.clone(),
            _candidates: None,
            _voters: Vec::new(),
            _voter_index: HashMap::new(),
        })
    }

    /// Registers the roster. Without a roster, the candidates are inferred from
    /// the ballots and labelled with their identifiers.
    pub fn candidates(self, cands: &[Candidate]) -> Result<Builder, VotingErrors> {
        let mut seen: HashSet<&str> = HashSet::new();
        for c in cands.iter() {
            if !seen.insert(c.id.as_str()) {
                return Err(VotingErrors::DuplicateCandidate(c.id.clone()));
            }
        }
        Ok(Builder {
            _candidates: Some(cands.to_vec()),
            ..self
        })
    }

    /// Registers a roster from labels only. The identifiers are the digests of
    /// the labels.
    pub fn candidate_labels(self, labels: &[String]) -> Result<Builder, VotingErrors> {
        let cands: Vec<Candidate> = labels
            .iter()
            .map(|label| Candidate {
                id: candidate_digest(label),
                label: label.clone(),
            })
            .collect();
        self.candidates(&cands)
    }

    /// Adds one stored vote: the voter ranked this candidate at this rank.
    ///
    /// Ranks start at 1. A rank of zero or below means that the candidate was not
    /// ranked, and the row is ignored when the ballots are assembled.
    pub fn add_ranking(&mut self, voter: &str, candidate: &str, rank: i64) {
        let idx = match self._voter_index.get(voter) {
            Some(idx) => *idx,
            None => {
                self._voters.push(VoterRanking {
                    voter: Some(voter.to_string()),
                    ranks: Vec::new(),
                });
                self._voter_index
                    .insert(voter.to_string(), self._voters.len() - 1);
                self._voters.len() - 1
            }
        };
        self._voters[idx].ranks.push((rank, candidate.to_string()));
    }

    /// Adds a complete ballot, most preferred candidate first.
    pub fn add_ballot(&mut self, candidates: &[String]) {
        self._voters.push(VoterRanking {
            voter: None,
            ranks: candidates
                .iter()
                .enumerate()
                .map(|(idx, c)| ((idx + 1) as i64, c.clone()))
                .collect(),
        });
    }

    /// The number of voters added so far.
    pub fn num_voters(&self) -> usize {
        self._voters.len()
    }

    /// The voters sorted by identifier: numerically when all the identifiers are
    /// integers, as text otherwise. Complete ballots come last, in the order they
    /// were added.
    fn sorted_voters(&self) -> Vec<&VoterRanking> {
        let (mut named, anonymous): (Vec<&VoterRanking>, Vec<&VoterRanking>) =
            self._voters.iter().partition(|v| v.voter.is_some());
        let numeric: Option<Vec<i64>> = named
            .iter()
            .map(|v| v.voter.as_deref().and_then(|s| s.trim().parse::<i64>().ok()))
            .collect();
        match numeric {
            Some(keys) => {
                let mut keyed: Vec<(i64, &VoterRanking)> = keys.into_iter().zip(named).collect();
                keyed.sort_by_key(|(key, _)| *key);
                named = keyed.into_iter().map(|(_, v)| v).collect();
            }
            None => named.sort_by(|a, b| a.voter.cmp(&b.voter)),
        }
        named.extend(anonymous);
        named
    }

    /// One ballot per voter, with the voters sorted by identifier.
    ///
    /// A voter without any ranked candidate gets an empty ballot.
    pub fn ballots(&self) -> Vec<Ballot> {
        self.sorted_voters()
            .into_iter()
            .map(|v| {
                let mut ranks: Vec<&(i64, String)> =
                    v.ranks.iter().filter(|(rank, _)| *rank > 0).collect();
                // Stable: equal ranks keep the order in which they were added.
                ranks.sort_by_key(|(rank, _)| *rank);
                let ballot: Ballot = ranks.iter().map(|(_, c)| c.clone()).collect();
                if ballot.len() < v.ranks.len() {
                    debug!(
                        "ballots: voter {:?}: dropped {} unranked choices",
                        v.voter,
                        v.ranks.len() - ballot.len()
                    );
                }
                ballot
            })
            .collect()
    }

    /// The roster, or the candidates found in the ballots if no roster was given.
    pub fn roster(&self) -> Vec<Candidate> {
        if let Some(cands) = self._candidates.as_ref() {
            return cands.clone();
        }
        let mut seen: HashSet<String> = HashSet::new();
        let mut res: Vec<Candidate> = Vec::new();
        for ballot in self.ballots() {
            for c in ballot {
                if seen.insert(c.clone()) {
                    res.push(Candidate {
                        id: c.clone(),
                        label: c,
                    });
                }
            }
        }
        res
    }

    /// Runs the count on the assembled ballots.
    pub fn run(&self) -> Result<Outcome, VotingErrors> {
        let ballots = self.ballots();
        if ballots.iter().all(|b| b.is_empty()) {
            return Err(VotingErrors::EmptyElection);
        }
        crate::run_ranked_choice(&ballots, &self.roster(), &self._rules)
    }
}
