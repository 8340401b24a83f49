use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::record::{BenchmarkRun, Topology};

/// Literal marker opening each run segment.
pub const RUN_MARKER: &str = "[RUNNING]";
/// Literal line gating metric extraction within a segment.
pub const RESULT_BLOCK_MARKER: &str = "============ Serving Benchmark Result ============";

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"prompts\s+isl\s+(\d+)\s+osl\s+(\d+)\s+con\s+(\d+)\s+model\s+(\S+)\s+xP=(\d+)\s+yD=(\d+)")
        .expect("header pattern")
});

type CountSlot = fn(&mut BenchmarkRun, u64);
type MetricSlot = fn(&mut BenchmarkRun, f64);

fn labeled_value(label: &str) -> Regex {
    Regex::new(&format!(r"{}:\s+([\d,.]+)", regex::escape(label))).expect("field pattern")
}

/// Dataset statistics searched independently of the result block.
static DATASET_FIELDS: Lazy<Vec<(Regex, CountSlot)>> = Lazy::new(|| {
    vec![
        (labeled_value("Prompts per group"), (|run, value| run.prompts_per_group = Some(value)) as CountSlot),
        (labeled_value("Total prompts"), |run, value| run.total_prompts = Some(value)),
        (labeled_value("Total input tokens"), |run, value| run.total_input_tokens = Some(value)),
        (labeled_value("Total output tokens"), |run, value| run.total_output_tokens = Some(value)),
    ]
});

/// Metrics extracted only when the result block is present.
static METRIC_FIELDS: Lazy<Vec<(Regex, MetricSlot)>> = Lazy::new(|| {
    vec![
        (labeled_value("Request throughput (req/s)"), (|run, value| run.request_throughput = Some(value)) as MetricSlot),
        (labeled_value("Input token throughput (tok/s)"), |run, value| run.input_token_throughput = Some(value)),
        (labeled_value("Output token throughput (tok/s)"), |run, value| run.output_token_throughput = Some(value)),
        (labeled_value("Total token throughput (tok/s)"), |run, value| run.total_token_throughput = Some(value)),
        (labeled_value("Mean E2E Latency (ms)"), |run, value| run.mean_e2e_latency_ms = Some(value)),
        (labeled_value("Mean TTFT (ms)"), |run, value| run.mean_ttft_ms = Some(value)),
        (labeled_value("Mean ITL (ms)"), |run, value| run.mean_itl_ms = Some(value)),
    ]
});

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("log file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no benchmark results found in the log file")]
    NoResults,
}

/// Outcome of the two-stage segment filter.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentOutcome {
    /// Header pattern absent; the segment contributes nothing.
    Skipped,
    /// Header matched but the segment has no result block; the partial run
    /// carries header fields and whatever dataset statistics were present.
    HeaderOnly(BenchmarkRun),
    /// Header and result block both present.
    Complete(BenchmarkRun),
}

fn strip_separators(text: &str) -> String {
    text.replace(',', "")
}

/// Classify one run segment. Dataset statistics and metrics are each an
/// independent optional search; an unparseable or absent field stays `None`.
pub fn parse_segment(segment: &str) -> SegmentOutcome {
    let Some(caps) = HEADER_RE.captures(segment) else {
        return SegmentOutcome::Skipped;
    };
    let (Ok(isl), Ok(osl), Ok(concurrency), Ok(parallel), Ok(data)) = (
        caps[1].parse::<u32>(),
        caps[2].parse::<u32>(),
        caps[3].parse::<u32>(),
        caps[5].parse::<u32>(),
        caps[6].parse::<u32>(),
    ) else {
        return SegmentOutcome::Skipped;
    };

    let mut run = BenchmarkRun::new(
        &caps[4],
        Topology { parallel, data },
        isl,
        osl,
        concurrency,
    );

    for (pattern, slot) in DATASET_FIELDS.iter() {
        if let Some(caps) = pattern.captures(segment) {
            if let Ok(value) = strip_separators(&caps[1]).parse() {
                slot(&mut run, value);
            }
        }
    }

    if !segment.contains(RESULT_BLOCK_MARKER) {
        return SegmentOutcome::HeaderOnly(run);
    }

    for (pattern, slot) in METRIC_FIELDS.iter() {
        if let Some(caps) = pattern.captures(segment) {
            if let Ok(value) = strip_separators(&caps[1]).parse() {
                slot(&mut run, value);
            }
        }
    }

    SegmentOutcome::Complete(run)
}

/// Extract every complete run from a raw log blob, in log order. Text before
/// the first run marker is discarded; segments without a matching header or
/// without a result block contribute nothing.
pub fn parse_log(content: &str) -> Vec<BenchmarkRun> {
    let mut runs = Vec::new();
    let mut segments = content.split(RUN_MARKER);
    segments.next();

    for (index, segment) in segments.enumerate() {
        match parse_segment(segment) {
            SegmentOutcome::Complete(run) => runs.push(run),
            SegmentOutcome::HeaderOnly(run) => {
                debug!(segment = index, model = %run.model, "segment has no result block");
            }
            SegmentOutcome::Skipped => {
                debug!(segment = index, "segment header did not match");
            }
        }
    }

    runs
}

/// Read a log file and extract its runs. A missing file, an unreadable file,
/// and a log with zero complete runs are distinct failures.
pub fn parse_log_file(path: impl AsRef<Path>) -> Result<Vec<BenchmarkRun>, ParseError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ParseError::FileNotFound(path.to_path_buf()),
        _ => ParseError::Read {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let runs = parse_log(&content);
    if runs.is_empty() {
        return Err(ParseError::NoResults);
    }
    Ok(runs)
}
