
use std::io::Write;

use crate::data_types::run_statistics::RunStatistics;

/// Serializes the run counters as newline-delimited `key<TAB>value` pairs, exactly once,
/// in the fixed order defined by `RunStatistics::report_pairs`.
/// # Arguments
/// * `stats` - the accumulated counters for one completed run
/// * `writer` - the destination, typically standard output
pub fn write_run_statistics<W: Write>(stats: &RunStatistics, writer: W) -> csv::Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);

    for (key, value) in stats.report_pairs() {
        csv_writer.write_record([key, value.to_string().as_str()])?;
    }

    // save everything
    csv_writer.flush()?;
    Ok(())
}
