use log::debug;
use std::collections::{HashMap, HashSet};

use crate::config::{FlowEdge, ResultCandidate, SankeyData, SankeyLabels, VotingErrors};
use crate::{CandidateId, CandidateRegistry, RankedChoice, RoundId, VoteCount};

/// A candidate standing at a given round.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
struct NodeKey {
    cid: CandidateId,
    round: RoundId,
}

impl NodeKey {
    fn render(&self, registry: &CandidateRegistry) -> String {
        format!("{}_{}", registry.name(self.cid), self.round)
    }
}

/// Collects the edges of the flow diagram, round after round.
pub(crate) struct FlowGraphBuilder {
    nodes: Vec<FlowEdge>,
    labels: SankeyLabels,
}

impl FlowGraphBuilder {
    pub(crate) fn new() -> FlowGraphBuilder {
        FlowGraphBuilder {
            nodes: Vec::new(),
            labels: SankeyLabels::default(),
        }
    }

    /// Records where each ballot goes from this round to the next one.
    ///
    /// `votes` is the state of the ballots before the elimination of this round.
    /// A ballot whose top candidate survives stays on that candidate. A ballot
    /// whose top candidate is eliminated moves to its next surviving choice, or
    /// leaves the diagram when nothing is left in it.
    ///
    /// All the edges leaving a node are kept, one per destination.
    pub(crate) fn record_round(
        &mut self,
        round: RoundId,
        votes: &[RankedChoice],
        eliminated: &HashSet<CandidateId>,
        registry: &CandidateRegistry,
    ) -> Result<(), VotingErrors> {
        // Grouped by source node, then by destination, both in first-seen order.
        let mut round_flows: Vec<(NodeKey, Vec<(NodeKey, VoteCount)>)> = Vec::new();
        let mut sources: HashMap<NodeKey, usize> = HashMap::new();

        for v in votes.iter() {
            let old_first = v.first_valid;
            let new_first = if eliminated.contains(&old_first) {
                match v.filtered_candidate(eliminated) {
                    Some(rc) => rc.first_valid,
                    // Exhausted
                    None => continue,
                }
            } else {
                old_first
            };
            let from = NodeKey {
                cid: old_first,
                round,
            };
            let to = NodeKey {
                cid: new_first,
                round: round + 1,
            };
            let idx = *sources.entry(from).or_insert_with(|| {
                round_flows.push((from, Vec::new()));
                round_flows.len() - 1
            });
            let destinations = &mut round_flows[idx].1;
            match destinations.iter().position(|(dest, _)| *dest == to) {
                Some(pos) => destinations[pos].1 += VoteCount::ONE,
                None => destinations.push((to, VoteCount::ONE)),
            }
        }

        let edges = round_flows.into_iter().flat_map(|(from, destinations)| {
            destinations
                .into_iter()
                .map(move |(to, count)| (from, to, count))
        });

        for (from, to, count) in edges {
            let from_key = from.render(registry);
            let to_key = to.render(registry);
            self.labels
                .insert_if_absent(from_key.clone(), registry.label(from.cid)?);
            self.labels
                .insert_if_absent(to_key.clone(), registry.label(to.cid)?);
            debug!(
                "record_round: round {:?}: {} -> {}: {:?}",
                round, from_key, to_key, count.0
            );
            self.nodes.push(FlowEdge {
                from: from_key,
                to: to_key,
                flow: count.0,
            });
        }
        Ok(())
    }

    pub(crate) fn into_sankey_data(self, colours: Vec<ResultCandidate>) -> SankeyData {
        SankeyData {
            nodes: self.nodes,
            labels: self.labels,
            colours,
        }
    }
}
