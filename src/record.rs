use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Parallelism/replica dimensions of a run, rendered as `"XpYd"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    pub parallel: u32,
    pub data: u32,
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p{}d", self.parallel, self.data)
    }
}

#[derive(Debug, Error)]
#[error("invalid topology descriptor: {0:?}")]
pub struct TopologyParseError(String);

impl FromStr for Topology {
    type Err = TopologyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TopologyParseError(s.to_string());
        let rest = s.strip_suffix('d').ok_or_else(invalid)?;
        let (parallel, data) = rest.split_once('p').ok_or_else(invalid)?;
        Ok(Self {
            parallel: parallel.parse().map_err(|_| invalid())?,
            data: data.parse().map_err(|_| invalid())?,
        })
    }
}

impl Serialize for Topology {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Topology {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// One parsed run segment of a benchmark log.
///
/// Every dataset count and metric is optional: absence means the field was
/// not present in the segment, never zero. Serde renames pin the CSV column
/// names, in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "xP_yD")]
    pub topology: Topology,
    #[serde(rename = "ISL")]
    pub isl: u32,
    #[serde(rename = "OSL")]
    pub osl: u32,
    #[serde(rename = "Concurrency")]
    pub concurrency: u32,
    #[serde(rename = "Prompts_Group")]
    pub prompts_per_group: Option<u64>,
    #[serde(rename = "Total_Prompts")]
    pub total_prompts: Option<u64>,
    #[serde(rename = "Total_Input_Tokens")]
    pub total_input_tokens: Option<u64>,
    #[serde(rename = "Total_Output_Tokens")]
    pub total_output_tokens: Option<u64>,
    #[serde(rename = "Request_Throughput_req_s")]
    pub request_throughput: Option<f64>,
    #[serde(rename = "Input_Token_Throughput_tok_s")]
    pub input_token_throughput: Option<f64>,
    #[serde(rename = "Output_Token_Throughput_tok_s")]
    pub output_token_throughput: Option<f64>,
    #[serde(rename = "Total_Token_Throughput_tok_s")]
    pub total_token_throughput: Option<f64>,
    #[serde(rename = "Mean_E2E_Latency_ms")]
    pub mean_e2e_latency_ms: Option<f64>,
    #[serde(rename = "Mean_TTFT_ms")]
    pub mean_ttft_ms: Option<f64>,
    #[serde(rename = "Mean_ITL_ms")]
    pub mean_itl_ms: Option<f64>,
}

impl BenchmarkRun {
    /// A run with only the header fields filled in; counts and metrics start
    /// absent and are populated by the extraction passes.
    pub fn new(model: impl Into<String>, topology: Topology, isl: u32, osl: u32, concurrency: u32) -> Self {
        Self {
            model: model.into(),
            topology,
            isl,
            osl,
            concurrency,
            prompts_per_group: None,
            total_prompts: None,
            total_input_tokens: None,
            total_output_tokens: None,
            request_throughput: None,
            input_token_throughput: None,
            output_token_throughput: None,
            total_token_throughput: None,
            mean_e2e_latency_ms: None,
            mean_ttft_ms: None,
            mean_itl_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topology_renders_as_xpyd() {
        let topology = Topology { parallel: 4, data: 2 };
        assert_eq!(topology.to_string(), "4p2d");
    }

    #[test]
    fn topology_round_trips_through_from_str() {
        let topology: Topology = "8p1d".parse().expect("parse topology");
        assert_eq!(topology, Topology { parallel: 8, data: 1 });
    }

    #[test]
    fn topology_rejects_malformed_descriptors() {
        assert!("4x2d".parse::<Topology>().is_err());
        assert!("4p2".parse::<Topology>().is_err());
        assert!("pd".parse::<Topology>().is_err());
    }

    #[test]
    fn new_run_starts_with_absent_metrics() {
        let run = BenchmarkRun::new("llama", Topology { parallel: 1, data: 1 }, 128, 256, 8);
        assert_eq!(run.total_input_tokens, None);
        assert_eq!(run.request_throughput, None);
        assert_eq!(run.mean_itl_ms, None);
    }
}
