use crate::rcv::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
    #[serde(rename = "outputFile")]
    pub output_file: Option<String>,
}

impl OutputSettings {
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            contest: self.contest_name.clone(),
            date: self.contest_date.clone(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RcvCandidate {
    pub id: Option<String>,
    pub label: String,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RcvRules {
    #[serde(rename = "maxRounds")]
    pub max_rounds: Option<u32>,
    #[serde(rename = "colourSaturation")]
    pub colour_saturation: Option<f64>,
    #[serde(rename = "colourLightness")]
    pub colour_lightness: Option<f64>,
}

impl RcvRules {
    pub fn tabulation_rules(&self) -> RcvResult<TabulationRules> {
        let defaults = TabulationRules::DEFAULT_RULES;
        let rules = TabulationRules {
            max_rounds: self.max_rounds.unwrap_or(defaults.max_rounds),
            colour_saturation: self.colour_saturation.unwrap_or(defaults.colour_saturation),
            colour_lightness: self.colour_lightness.unwrap_or(defaults.colour_lightness),
        };
        if let Err(e) = rules.validate() {
            whatever!("Invalid rules {:?}: {}", self, e)
        }
        Ok(rules)
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RcvConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "voteFileSources")]
    pub vote_file_sources: Vec<FileSource>,
    pub candidates: Vec<RcvCandidate>,
    #[serde(default)]
    pub rules: RcvRules,
}

pub fn read_config(path: String) -> RcvResult<RcvConfig> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(&contents).context(ParsingJsonSnafu {})
}

pub fn read_summary(path: String) -> RcvResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}
