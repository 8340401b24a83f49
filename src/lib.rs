mod parser;
mod portwait;
mod record;
mod render;

pub use comfy_table::Table;
pub use parser::{
    parse_log, parse_log_file, parse_segment, ParseError, SegmentOutcome, RESULT_BLOCK_MARKER,
    RUN_MARKER,
};
pub use portwait::{is_port_open, wait_while_open, POLL_INTERVAL, PROBE_TIMEOUT};
pub use record::{BenchmarkRun, Topology, TopologyParseError};
pub use render::{render_table, write_csv, RenderError};
