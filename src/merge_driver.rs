/*!
# Merge Driver
Walks the unphased and phased record streams in lockstep, pairing records by `(chromosome, position)`
with a one-record lookahead on the phased side. Exactly one output record is emitted per unphased
record, in input order; phased records with no unphased counterpart are dropped silently.

## Example usage
```rust
use std::io::Cursor;

use phasegraft::inject_solver::InjectConfig;
use phasegraft::merge_driver::inject_streams;
use phasegraft::parsing::variant_reader::VariantReader;
use phasegraft::writers::variant_writer::VariantWriter;

let unphased = "chr1\t100\t.\tA\tT\t50\tPASS\t.\tGT\t0/1\nchr1\t200\t.\tC\tG\t50\tPASS\t.\tGT\t1/1\n";
let phased = "chr1\t100\t.\tA\tT\t.\t.\t.\tGT\t1|0\n";

let mut unphased_reader = VariantReader::from_reader("unphased", Cursor::new(unphased)).unwrap();
let mut phased_reader = VariantReader::from_reader("phased", Cursor::new(phased)).unwrap();
let mut writer = VariantWriter::new(Vec::new());

let stats = inject_streams(&mut unphased_reader, &mut phased_reader, &mut writer, InjectConfig::default()).unwrap();
assert_eq!(stats.read_lines(), 2);
assert_eq!(stats.replaced_genotypes(), 1);
assert_eq!(stats.kept_genotypes(), 1);

let merged = String::from_utf8(writer.into_inner()).unwrap();
assert!(merged.contains("1|0"));
```
*/
use anyhow::Context;
use log::{debug, trace};
use rustc_hash::FxHashSet;
use std::io::{BufRead, Write};

use crate::data_types::run_statistics::RunStatistics;
use crate::data_types::variant_record::VariantRecord;
use crate::inject_solver::{resolve_match, InjectConfig};
use crate::parsing::variant_reader::VariantReader;
use crate::writers::variant_writer::VariantWriter;

/// Core merge loop: consumes both streams, writes one merged record per unphased record,
/// and returns the accumulated counters.
/// # Arguments
/// * `unphased` - the primary stream; defines the output coordinate grid and record count
/// * `phased` - the secondary stream; a sparse subset of the unphased coordinates
/// * `writer` - receives the merged records, in unphased input order
/// * `config` - optional validation controls passed through to the solver
/// # Errors
/// * if either stream yields a malformed or out-of-order record
/// * if the solver rejects a genotype under strict checking
/// * if writing the output fails
pub fn inject_streams<U: BufRead, P: BufRead, W: Write>(
    unphased: &mut VariantReader<U>,
    phased: &mut VariantReader<P>,
    writer: &mut VariantWriter<W>,
    config: InjectConfig
) -> anyhow::Result<RunStatistics> {
    let mut stats = RunStatistics::default();
    let mut lookahead: Option<VariantRecord> = None;
    let mut current_chrom: Option<String> = None;
    let mut finished_chroms: FxHashSet<String> = Default::default();

    while let Some(result) = unphased.next() {
        let mut record = result?;
        stats.record_read_line();

        if current_chrom.as_deref() != Some(record.chromosome()) {
            if let Some(previous) = current_chrom.take() {
                finished_chroms.insert(previous);
            }
            current_chrom = Some(record.chromosome().to_string());
            debug!("Processing chromosome {}...", record.chromosome());
        }

        advance_phased(phased, &mut lookahead, &record, &finished_chroms)?;

        // the lookahead is consumed only on an exact coordinate match
        let is_match = lookahead.as_ref()
            .map(|p| p.chromosome() == record.chromosome() && p.position() == record.position())
            .unwrap_or(false);
        let candidate = if is_match {
            lookahead.take()
        } else {
            None
        };

        let outcome = resolve_match(&record, candidate.as_ref(), config)
            .with_context(|| format!("Error while resolving match at {}:{}:", record.chromosome(), record.position()))?;
        stats.record_outcome(&outcome);

        if outcome.replaced() {
            record.set_genotype(outcome.output_genotype());
        }
        writer.write_record(&record)?;
    }

    Ok(stats)
}

/// Advances the phased lookahead until it is at or beyond the current unphased coordinate.
/// Phased records that can never match are dropped without touching any counter.
/// # Arguments
/// * `phased` - the phased stream
/// * `lookahead` - the single-record buffer for the phased stream
/// * `unphased_record` - the unphased record currently being resolved
/// * `finished_chroms` - chromosomes the unphased stream has already completed
fn advance_phased<P: BufRead>(
    phased: &mut VariantReader<P>,
    lookahead: &mut Option<VariantRecord>,
    unphased_record: &VariantRecord,
    finished_chroms: &FxHashSet<String>
) -> anyhow::Result<()> {
    loop {
        if lookahead.is_none() {
            *lookahead = match phased.next() {
                Some(result) => Some(result?),
                None => return Ok(()) // phased stream exhausted
            };
        }

        let candidate = lookahead.as_ref().unwrap();
        let droppable = if candidate.chromosome() == unphased_record.chromosome() {
            candidate.position() < unphased_record.position()
        } else {
            // a candidate on a chromosome the unphased stream already completed can never match;
            // one on a not-yet-seen chromosome must wait
            finished_chroms.contains(candidate.chromosome())
        };

        if droppable {
            trace!("Dropping phased record at {}:{} with no unphased counterpart", candidate.chromosome(), candidate.position());
            *lookahead = None;
        } else {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::variant_reader::VariantStreamError;
    use std::io::Cursor;

    /// Helper that builds a reader over an in-memory file body
    fn build_reader(text: &str) -> VariantReader<Cursor<Vec<u8>>> {
        VariantReader::from_reader("test_data", Cursor::new(text.as_bytes().to_vec())).unwrap()
    }

    /// Helper that runs a full merge over in-memory inputs and returns the output text plus counters
    fn run_merge(unphased: &str, phased: &str) -> (String, RunStatistics) {
        let mut unphased_reader = build_reader(unphased);
        let mut phased_reader = build_reader(phased);
        let mut writer = VariantWriter::new(Vec::new());

        let stats = inject_streams(&mut unphased_reader, &mut phased_reader, &mut writer, InjectConfig::default()).unwrap();
        (String::from_utf8(writer.into_inner()).unwrap(), stats)
    }

    /// Helper that builds a data line at the given coordinate
    fn data_line(chrom: &str, position: u64, reference: &str, alternate: &str, genotype: &str) -> String {
        format!("{chrom}\t{position}\t.\t{reference}\t{alternate}\t50\tPASS\tAC=1\tGT:DP\t{genotype}:17")
    }

    #[test]
    fn test_sparse_phased_subset() {
        // three unphased positions, phasing available only for the middle one
        let unphased = [
            data_line("chr1", 100, "A", "T", "0/1"),
            data_line("chr1", 200, "A", "T", "0/1"),
            data_line("chr1", 300, "A", "T", "0/1")
        ].join("\n") + "\n";
        let phased = data_line("chr1", 200, "A", "T", "0|1") + "\n";

        let (output, stats) = run_merge(&unphased, &phased);
        let output_lines: Vec<&str> = output.lines().collect();

        assert_eq!(output_lines.len(), 3);
        assert_eq!(output_lines[0], data_line("chr1", 100, "A", "T", "0/1"));
        assert_eq!(output_lines[1], data_line("chr1", 200, "A", "T", "0|1"));
        assert_eq!(output_lines[2], data_line("chr1", 300, "A", "T", "0/1"));

        assert_eq!(stats.read_lines(), 3);
        assert_eq!(stats.replaced_genotypes(), 1);
        assert_eq!(stats.inconsistent_ref_alt_genotypes(), 0);
        assert_eq!(stats.inconsistent_ref_alt_alleles(), 0);
        assert_eq!(stats.kept_genotypes(), 2);
    }

    #[test]
    fn test_hard_allele_mismatch_keeps_unphased() {
        let unphased = data_line("chr1", 150, "A", "T", "0/1") + "\n";
        let phased = data_line("chr1", 150, "A", "G", "0|1") + "\n";

        let (output, stats) = run_merge(&unphased, &phased);

        assert_eq!(output, data_line("chr1", 150, "A", "T", "0/1") + "\n");
        assert_eq!(stats.read_lines(), 1);
        assert_eq!(stats.replaced_genotypes(), 0);
        assert_eq!(stats.inconsistent_ref_alt_genotypes(), 1);
        assert_eq!(stats.inconsistent_ref_alt_alleles(), 0);
    }

    #[test]
    fn test_soft_allele_mismatch_keeps_unphased() {
        let unphased = data_line("chr1", 150, "A", "T,G", "1/2") + "\n";
        let phased = data_line("chr1", 150, "A", "G,T", "1|2") + "\n";

        let (output, stats) = run_merge(&unphased, &phased);

        assert_eq!(output, data_line("chr1", 150, "A", "T,G", "1/2") + "\n");
        assert_eq!(stats.inconsistent_ref_alt_alleles(), 1);
        assert_eq!(stats.inconsistent_ref_alt_genotypes(), 0);
        assert_eq!(stats.replaced_genotypes(), 0);
    }

    #[test]
    fn test_phased_only_positions_are_ignored() {
        // phased records before, between, and after the unphased grid
        let unphased = data_line("chr1", 200, "A", "T", "0/1") + "\n";
        let phased = [
            data_line("chr1", 50, "C", "G", "0|1"),
            data_line("chr1", 150, "C", "G", "0|1"),
            data_line("chr1", 200, "A", "T", "0|1"),
            data_line("chr1", 400, "C", "G", "0|1")
        ].join("\n") + "\n";

        let (output, stats) = run_merge(&unphased, &phased);

        assert_eq!(output, data_line("chr1", 200, "A", "T", "0|1") + "\n");
        assert_eq!(stats.read_lines(), 1);
        assert_eq!(stats.replaced_genotypes(), 1);
        assert_eq!(stats.inconsistent_ref_alt_genotypes(), 0);
        assert_eq!(stats.inconsistent_ref_alt_alleles(), 0);
        assert_eq!(stats.kept_genotypes(), 0);
    }

    #[test]
    fn test_out_of_order_unphased_fails() {
        let unphased = [
            data_line("chr1", 50, "A", "T", "0/1"),
            data_line("chr1", 40, "A", "T", "0/1")
        ].join("\n") + "\n";
        let phased = data_line("chr1", 50, "A", "T", "0|1") + "\n";

        let mut unphased_reader = build_reader(&unphased);
        let mut phased_reader = build_reader(&phased);
        let mut writer = VariantWriter::new(Vec::new());

        let error = inject_streams(&mut unphased_reader, &mut phased_reader, &mut writer, InjectConfig::default()).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<VariantStreamError>(),
            Some(VariantStreamError::OutOfOrderInput { .. })
        ));
    }

    #[test]
    fn test_phased_exhausted_early() {
        let unphased = [
            data_line("chr1", 100, "A", "T", "0/1"),
            data_line("chr1", 200, "A", "T", "0/1"),
            data_line("chr1", 300, "A", "T", "0/1")
        ].join("\n") + "\n";
        let phased = data_line("chr1", 100, "A", "T", "1|0") + "\n";

        let (output, stats) = run_merge(&unphased, &phased);

        assert_eq!(output.lines().count(), 3);
        assert_eq!(stats.replaced_genotypes(), 1);
        assert_eq!(stats.kept_genotypes(), 2);
    }

    #[test]
    fn test_chromosome_transition() {
        let unphased = [
            data_line("chr1", 100, "A", "T", "0/1"),
            data_line("chr1", 900, "A", "T", "0/1"),
            data_line("chr2", 100, "C", "G", "0/1")
        ].join("\n") + "\n";
        // the chr1 tail record has no counterpart and must be drained, not mispaired with chr2:100
        let phased = [
            data_line("chr1", 900, "A", "T", "0|1"),
            data_line("chr1", 950, "A", "T", "0|1"),
            data_line("chr2", 100, "C", "G", "1|0")
        ].join("\n") + "\n";

        let (output, stats) = run_merge(&unphased, &phased);
        let output_lines: Vec<&str> = output.lines().collect();

        assert_eq!(output_lines[1], data_line("chr1", 900, "A", "T", "0|1"));
        assert_eq!(output_lines[2], data_line("chr2", 100, "C", "G", "1|0"));
        assert_eq!(stats.replaced_genotypes(), 2);
        assert_eq!(stats.kept_genotypes(), 1);
    }

    #[test]
    fn test_phased_on_unseen_chromosome_blocks() {
        // the phased stream leads with a chromosome the unphased stream never visits;
        // nothing should match, and nothing should be mispaired
        let unphased = [
            data_line("chr2", 100, "A", "T", "0/1"),
            data_line("chr2", 200, "A", "T", "0/1")
        ].join("\n") + "\n";
        let phased = [
            data_line("chrX", 100, "A", "T", "0|1"),
            data_line("chrX", 200, "A", "T", "0|1")
        ].join("\n") + "\n";

        let (output, stats) = run_merge(&unphased, &phased);

        assert_eq!(output.lines().count(), 2);
        assert_eq!(stats.replaced_genotypes(), 0);
        assert_eq!(stats.kept_genotypes(), 2);
    }

    #[test]
    fn test_remainder_accounting() {
        let unphased = [
            data_line("chr1", 100, "A", "T", "0/1"),
            data_line("chr1", 200, "A", "T", "0/1"),
            data_line("chr1", 300, "C", "G", "0/1"),
            data_line("chr1", 400, "A", "T", "0/1")
        ].join("\n") + "\n";
        let phased = [
            data_line("chr1", 100, "A", "T", "0|1"),
            data_line("chr1", 300, "C", "T", "0|1")
        ].join("\n") + "\n";

        let (_output, stats) = run_merge(&unphased, &phased);

        let classified = stats.replaced_genotypes()
            + stats.inconsistent_ref_alt_genotypes()
            + stats.inconsistent_ref_alt_alleles();
        assert!(classified <= stats.read_lines());
        assert_eq!(stats.read_lines() - classified, stats.kept_genotypes());
        assert_eq!(stats.kept_genotypes(), 2);
    }

    #[test]
    fn test_idempotent_remerge() {
        let unphased = [
            data_line("chr1", 100, "A", "T", "0/1"),
            data_line("chr1", 200, "A", "T", "0/1"),
            data_line("chr1", 300, "A", "T", "0/1")
        ].join("\n") + "\n";
        let phased = [
            data_line("chr1", 100, "A", "T", "1|0"),
            data_line("chr1", 300, "A", "T", "0|1")
        ].join("\n") + "\n";

        let (first_output, first_stats) = run_merge(&unphased, &phased);
        assert_eq!(first_stats.replaced_genotypes(), 2);

        // merging the produced output against the same phased input changes nothing
        let (second_output, second_stats) = run_merge(&first_output, &phased);
        assert_eq!(second_output, first_output);
        assert_eq!(second_stats.replaced_genotypes(), 0);
        assert_eq!(second_stats.inconsistent_ref_alt_genotypes(), 0);
        assert_eq!(second_stats.inconsistent_ref_alt_alleles(), 0);
        assert_eq!(second_stats.read_lines(), 3);
    }

    #[test]
    fn test_untouched_fields_byte_identical() {
        // odd-but-legal content in the pass-through columns must survive unchanged
        let unphased = "chr1\t100\trs99;x\tA\tT\t.\tq10;s50\tAC=1;AF=0.5;RAW= spaced \tGT:PL:DP\t0/1:10,0,99:31\n";
        let phased = data_line("chr1", 100, "A", "T", "0|1") + "\n";

        let (output, _stats) = run_merge(unphased, &phased);
        assert_eq!(output, "chr1\t100\trs99;x\tA\tT\t.\tq10;s50\tAC=1;AF=0.5;RAW= spaced \tGT:PL:DP\t0|1:10,0,99:31\n");
    }
}
