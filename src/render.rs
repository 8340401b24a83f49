use std::path::{Path, PathBuf};

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use thiserror::Error;

use crate::record::BenchmarkRun;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

struct Column {
    header: &'static str,
    compact: bool,
    cell: fn(&BenchmarkRun) -> Option<String>,
}

fn fmt_metric(value: Option<f64>) -> Option<String> {
    value.map(|v| format!("{v:.2}"))
}

fn fmt_count(value: Option<u64>) -> Option<String> {
    value.map(|v| v.to_string())
}

fn fmt_tokens(value: Option<u64>) -> Option<String> {
    value.map(group_digits)
}

/// Display columns in CSV schema order. `compact` marks the columns kept by
/// the compact projection.
#[rustfmt::skip]
const COLUMNS: &[Column] = &[
    Column { header: "Model", compact: true, cell: |run| Some(run.model.clone()) },
    Column { header: "xP/yD", compact: true, cell: |run| Some(run.topology.to_string()) },
    Column { header: "ISL", compact: true, cell: |run| Some(run.isl.to_string()) },
    Column { header: "OSL", compact: true, cell: |run| Some(run.osl.to_string()) },
    Column { header: "Concurrency", compact: true, cell: |run| Some(run.concurrency.to_string()) },
    Column { header: "Prompts/Group", compact: false, cell: |run| fmt_count(run.prompts_per_group) },
    Column { header: "Total Prompts", compact: false, cell: |run| fmt_count(run.total_prompts) },
    Column { header: "Total Input Tokens", compact: false, cell: |run| fmt_tokens(run.total_input_tokens) },
    Column { header: "Total Output Tokens", compact: false, cell: |run| fmt_tokens(run.total_output_tokens) },
    Column { header: "Request Throughput (req/s)", compact: true, cell: |run| fmt_metric(run.request_throughput) },
    Column { header: "Input Token Throughput (tok/s)", compact: false, cell: |run| fmt_metric(run.input_token_throughput) },
    Column { header: "Output Token Throughput (tok/s)", compact: false, cell: |run| fmt_metric(run.output_token_throughput) },
    Column { header: "Total Token Throughput (tok/s)", compact: true, cell: |run| fmt_metric(run.total_token_throughput) },
    Column { header: "Mean E2E Latency (ms)", compact: true, cell: |run| fmt_metric(run.mean_e2e_latency_ms) },
    Column { header: "Mean TTFT (ms)", compact: true, cell: |run| fmt_metric(run.mean_ttft_ms) },
    Column { header: "Mean ITL (ms)", compact: true, cell: |run| fmt_metric(run.mean_itl_ms) },
];

fn columns(compact: bool) -> impl Iterator<Item = &'static Column> {
    COLUMNS.iter().filter(move |column| !compact || column.compact)
}

fn display_headers(compact: bool) -> Vec<&'static str> {
    columns(compact).map(|column| column.header).collect()
}

/// Formatted display cells for every run: metrics with two decimals, token
/// counts digit-grouped, absent values as blanks. A pure view; the records
/// themselves are never touched.
fn display_rows(runs: &[BenchmarkRun], compact: bool) -> Vec<Vec<String>> {
    runs.iter()
        .map(|run| {
            columns(compact)
                .map(|column| (column.cell)(run).unwrap_or_default())
                .collect()
        })
        .collect()
}

/// Build the screen table for the given runs, full or compact.
pub fn render_table(runs: &[BenchmarkRun], compact: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(display_headers(compact));
    for row in display_rows(runs, compact) {
        table.add_row(row);
    }
    table
}

/// Persist the full, unformatted dataset; display-only projection and
/// formatting never apply here.
pub fn write_csv(runs: &[BenchmarkRun], path: impl AsRef<Path>) -> Result<(), RenderError> {
    let path = path.as_ref();
    let csv_err = |source: csv::Error| RenderError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for run in runs {
        writer.serialize(run).map_err(csv_err)?;
    }
    writer.flush().map_err(|err| csv_err(csv::Error::from(err)))?;
    Ok(())
}

fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;
    use crate::record::Topology;

    fn sample_run() -> BenchmarkRun {
        let mut run = BenchmarkRun::new("llama-70b", Topology { parallel: 4, data: 2 }, 1024, 256, 8);
        run.prompts_per_group = Some(10);
        run.total_prompts = Some(80);
        run.total_input_tokens = Some(1_024_000);
        run.total_output_tokens = Some(204_800);
        run.request_throughput = Some(0.86);
        run.input_token_throughput = Some(11000.43);
        run.output_token_throughput = Some(2199.57);
        run.total_token_throughput = Some(13200.0);
        run.mean_e2e_latency_ms = Some(9270.42);
        run.mean_ttft_ms = Some(355.1);
        run.mean_itl_ms = Some(34.88);
        run
    }

    #[test]
    fn group_digits_inserts_thousands_separators() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1_000), "1,000");
        assert_eq!(group_digits(1_024_000), "1,024,000");
    }

    #[test]
    fn metrics_render_with_two_decimals_and_tokens_are_grouped() {
        let rows = display_rows(&[sample_run()], false);
        let row = &rows[0];
        assert_eq!(row[0], "llama-70b");
        assert_eq!(row[1], "4p2d");
        assert_eq!(row[7], "1,024,000");
        assert_eq!(row[8], "204,800");
        assert_eq!(row[9], "0.86");
        assert_eq!(row[12], "13200.00");
        assert_eq!(row[14], "355.10");
    }

    #[test]
    fn absent_values_render_blank_never_zero() {
        let run = BenchmarkRun::new("tiny", Topology { parallel: 1, data: 1 }, 128, 64, 4);
        let rows = display_rows(&[run], false);
        for cell in &rows[0][5..] {
            assert_eq!(cell, "");
        }
    }

    #[test]
    fn compact_is_a_strict_projection_of_the_full_view() {
        let runs = [sample_run()];
        let full_headers = display_headers(false);
        let compact_headers = display_headers(true);
        let full_rows = display_rows(&runs, false);
        let compact_rows = display_rows(&runs, true);

        for (header, value) in compact_headers.iter().zip(&compact_rows[0]) {
            let position = full_headers
                .iter()
                .position(|h| h == header)
                .expect("compact column present in full view");
            assert_eq!(value, &full_rows[0][position]);
        }
    }

    #[test]
    fn compact_view_keeps_the_headline_columns() {
        assert_eq!(
            display_headers(true),
            vec![
                "Model",
                "xP/yD",
                "ISL",
                "OSL",
                "Concurrency",
                "Request Throughput (req/s)",
                "Total Token Throughput (tok/s)",
                "Mean E2E Latency (ms)",
                "Mean TTFT (ms)",
                "Mean ITL (ms)",
            ]
        );
    }

    #[test]
    fn csv_schema_has_the_fixed_column_order() {
        let file = NamedTempFile::new().expect("temp file");
        write_csv(&[sample_run()], file.path()).expect("write csv");

        let content = std::fs::read_to_string(file.path()).expect("read csv");
        let header = content.lines().next().expect("header line");
        assert_eq!(
            header,
            "Model,xP_yD,ISL,OSL,Concurrency,Prompts_Group,Total_Prompts,\
             Total_Input_Tokens,Total_Output_Tokens,Request_Throughput_req_s,\
             Input_Token_Throughput_tok_s,Output_Token_Throughput_tok_s,\
             Total_Token_Throughput_tok_s,Mean_E2E_Latency_ms,Mean_TTFT_ms,Mean_ITL_ms"
        );
    }

    #[test]
    fn csv_round_trips_the_unformatted_dataset() {
        let mut partial = sample_run();
        partial.mean_itl_ms = None;
        partial.prompts_per_group = None;
        let runs = vec![sample_run(), partial];

        let file = NamedTempFile::new().expect("temp file");
        write_csv(&runs, file.path()).expect("write csv");

        let mut reader = csv::Reader::from_path(file.path()).expect("open csv");
        let read_back: Vec<BenchmarkRun> = reader
            .deserialize()
            .collect::<Result<_, _>>()
            .expect("deserialize rows");

        assert_eq!(read_back, runs);
    }

    #[test]
    fn csv_ignores_the_compact_projection() {
        let runs = [sample_run()];
        let file = NamedTempFile::new().expect("temp file");
        write_csv(&runs, file.path()).expect("write csv");

        let content = std::fs::read_to_string(file.path()).expect("read csv");
        // Full schema and raw values, even though the screen view may be
        // compact and formatted.
        assert!(content.contains("Input_Token_Throughput_tok_s"));
        assert!(content.contains("1024000"));
    }

    #[test]
    fn csv_write_failure_reports_the_path() {
        let err = write_csv(&[sample_run()], "no/such/dir/out.csv").expect_err("must fail");
        let RenderError::Csv { path, .. } = err;
        assert_eq!(path, PathBuf::from("no/such/dir/out.csv"));
    }
}
