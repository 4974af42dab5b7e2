// ********* Input data structures ***********

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::error::Error;
use std::fmt::Display;

/// A candidate of the poll, as provided by the roster.
///
/// The identifier is opaque to the tabulation. The label is the text displayed to
/// the voters.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub label: String,
}

/// The preferences of one voter, most preferred candidate first.
///
/// Unranked choices are not part of a ballot.
pub type Ballot = Vec<String>;

// ******** Output data structures *********

/// A candidate of the roster with the colour used to draw it.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Serialize)]
pub struct ResultCandidate {
    pub id: String,
    pub label: String,
    pub color: String,
}

/// What happened in one round: either a candidate reached the majority, or a
/// group of candidates was eliminated.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct RoundRecord {
    pub round: u32,
    pub majority: Option<ResultCandidate>,
    pub eliminated: Option<Vec<ResultCandidate>>,
}

/// An edge of the flow diagram.
///
/// The nodes are rendered as `<candidate id>_<round>`.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Serialize)]
pub struct FlowEdge {
    pub from: String,
    pub to: String,
    pub flow: u64,
}

/// The display labels of the nodes, in the order they were first seen.
///
/// Serialized as a JSON object.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SankeyLabels(Vec<(String, String)>);

impl SankeyLabels {
    pub fn get(&self, node: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == node)
            .map(|(_, label)| label.as_str())
    }

    pub fn contains_key(&self, node: &str) -> bool {
        self.get(node).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Records the label of a node. An existing label is never overwritten.
    pub(crate) fn insert_if_absent(&mut self, node: String, label: &str) -> bool {
        if self.contains_key(&node) {
            false
        } else {
            self.0.push((node, label.to_string()));
            true
        }
    }
}

impl Serialize for SankeyLabels {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (node, label) in self.0.iter() {
            map.serialize_entry(node, label)?;
        }
        map.end()
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct SankeyData {
    pub nodes: Vec<FlowEdge>,
    pub labels: SankeyLabels,
    /// The full roster, in roster order.
    pub colours: Vec<ResultCandidate>,
}

/// The result of a tabulation.
///
/// Exactly one of `tied` and `winner` is set.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct Outcome {
    pub tied: bool,
    #[serde(rename = "tiedCandidates")]
    pub tied_candidates: Option<Vec<ResultCandidate>>,
    pub winner: bool,
    #[serde(rename = "winningCandidate")]
    pub winning_candidate: Option<ResultCandidate>,
    #[serde(rename = "roundActivity")]
    pub round_activity: Vec<RoundRecord>,
    #[serde(rename = "sankeyData")]
    pub sankey_data: SankeyData,
}

/// Errors that prevent the algorithm from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum VotingErrors {
    /// No ballot contains a ranked candidate.
    EmptyElection,
    /// A ballot refers to a candidate that is not in the roster.
    UnknownCandidate(String),
    /// The roster contains the same identifier more than once.
    DuplicateCandidate(String),
    InvalidRules(String),
}

impl Error for VotingErrors {}

impl Display for VotingErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VotingErrors::EmptyElection => write!(f, "no ballot to tabulate"),
            VotingErrors::UnknownCandidate(id) => write!(f, "unknown candidate {:?}", id),
            VotingErrors::DuplicateCandidate(id) => {
                write!(f, "candidate {:?} is registered more than once", id)
            }
            VotingErrors::InvalidRules(msg) => write!(f, "invalid rules: {}", msg),
        }
    }
}

// ********* Configuration **********

#[derive(PartialEq, Debug, Clone)]
pub struct TabulationRules {
    /// Upper bound on the number of rounds. Reaching it ends the count with a tie.
    pub max_rounds: u32,
    /// Saturation of the candidate colours, in percent.
    pub colour_saturation: f64,
    /// Lightness of the candidate colours, in percent.
    pub colour_lightness: f64,
}

impl TabulationRules {
    pub const DEFAULT_RULES: TabulationRules = TabulationRules {
        max_rounds: 50,
        colour_saturation: 70.0,
        colour_lightness: 50.0,
    };

    pub fn validate(&self) -> Result<(), VotingErrors> {
        if self.max_rounds == 0 {
            return Err(VotingErrors::InvalidRules(
                "at least one round is required".to_string(),
            ));
        }
        for (name, value) in [
            ("saturation", self.colour_saturation),
            ("lightness", self.colour_lightness),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(VotingErrors::InvalidRules(format!(
                    "colour {} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for TabulationRules {
    fn default() -> Self {
        TabulationRules::DEFAULT_RULES
    }
}
