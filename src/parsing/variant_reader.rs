
use anyhow::Context;
use flate2::read::MultiGzDecoder;
use log::debug;
use rustc_hash::FxHashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::data_types::variant_record::{VariantRecord, VariantRecordError};

#[derive(thiserror::Error, Debug)]
pub enum VariantStreamError {
    /// A data line that cannot be decoded aborts the whole run; there is no row-level recovery
    #[error("{path}:{line_number}: malformed record: {source} (line: {line:?})")]
    MalformedRecord {
        path: String,
        line_number: u64,
        line: String,
        source: VariantRecordError
    },
    /// Coordinates must strictly ascend within a chromosome, and a completed chromosome must not reappear
    #[error("{path}:{line_number}: out-of-order input: {current} follows {previous}")]
    OutOfOrderInput {
        path: String,
        line_number: u64,
        previous: String,
        current: String
    }
}

/// Lazy, forward-only reader over the data lines of a variant file.
/// The leading header block is captured verbatim during construction; after
/// that, records are decoded one line at a time with no further buffering.
pub struct VariantReader<R: BufRead> {
    /// Label used in error messages, usually the file path
    path: String,
    /// The underlying line source
    reader: R,
    /// Header lines captured from the top of the file, verbatim
    header: Vec<String>,
    /// The first data record, decoded while scanning past the header
    pending: Option<VariantRecord>,
    /// 1-based number of the last line read
    line_number: u64,
    /// Coordinate of the last record decoded, for the ordering check
    last_coordinate: Option<(String, u64)>,
    /// Chromosomes this stream has already moved past
    finished_chroms: FxHashSet<String>
}

impl VariantReader<BufReader<Box<dyn std::io::Read>>> {
    /// Opens a variant file, handling both gzip compressed and uncompressed inputs.
    /// # Arguments
    /// * `filename` - path to the .vcf(.gz) file to open
    /// # Errors
    /// * if the file does not open
    /// * if the header block or first data line cannot be decoded
    pub fn from_path(filename: &Path) -> anyhow::Result<Self> {
        let is_compressed = match filename.extension() {
            Some(extension) => extension == "gz",
            None => false
        };

        let raw_reader: Box<dyn std::io::Read> = if is_compressed {
            // MultiGzDecoder also accepts bgzip inputs, which are multi-member gzip
            let file = File::open(filename)
                .with_context(|| format!("Error while opening {filename:?}:"))?;
            Box::new(MultiGzDecoder::new(file))
        } else {
            let file = File::open(filename)
                .with_context(|| format!("Error while opening {filename:?}:"))?;
            Box::new(file)
        };

        Self::from_reader(&filename.to_string_lossy(), BufReader::new(raw_reader))
    }
}

impl<R: BufRead> VariantReader<R> {
    /// Creates a reader from an open line source, capturing the leading header block.
    /// # Arguments
    /// * `path` - label used in error messages
    /// * `reader` - the line source
    /// # Errors
    /// * if reading fails, or the first data line is malformed
    pub fn from_reader(path: &str, reader: R) -> anyhow::Result<Self> {
        let mut result = Self {
            path: path.to_string(),
            reader,
            header: vec![],
            pending: None,
            line_number: 0,
            last_coordinate: None,
            finished_chroms: Default::default()
        };

        // scan the header block; the first data line is decoded and held for iteration
        while let Some(line) = result.read_line()? {
            if line.starts_with('#') {
                result.header.push(line);
            } else {
                result.pending = Some(result.decode(line)?);
                break;
            }
        }
        debug!("Captured {} header lines from {}.", result.header.len(), result.path);

        Ok(result)
    }

    /// Reads the next line, stripping the line terminator; `None` at end of input
    fn read_line(&mut self) -> anyhow::Result<Option<String>> {
        let mut buffer = String::new();
        let num_read = self.reader.read_line(&mut buffer)
            .with_context(|| format!("Error while reading {}:", self.path))?;
        if num_read == 0 {
            return Ok(None);
        }

        self.line_number += 1;
        while buffer.ends_with('\n') || buffer.ends_with('\r') {
            buffer.pop();
        }
        Ok(Some(buffer))
    }

    /// Decodes one data line into a record and runs the ordering check
    fn decode(&mut self, line: String) -> anyhow::Result<VariantRecord> {
        let record = match VariantRecord::from_line(&line, self.line_number) {
            Ok(r) => r,
            Err(source) => {
                return Err(VariantStreamError::MalformedRecord {
                    path: self.path.clone(),
                    line_number: self.line_number,
                    line,
                    source
                }.into());
            }
        };
        self.check_order(&record)?;
        Ok(record)
    }

    /// Enforces the coordinate invariant the downstream two-pointer merge relies on:
    /// strictly ascending positions within a chromosome, no chromosome revisits.
    fn check_order(&mut self, record: &VariantRecord) -> anyhow::Result<()> {
        if let Some((prev_chrom, prev_pos)) = self.last_coordinate.as_ref() {
            let out_of_order = if prev_chrom == record.chromosome() {
                record.position() <= *prev_pos
            } else {
                self.finished_chroms.insert(prev_chrom.clone());
                self.finished_chroms.contains(record.chromosome())
            };

            if out_of_order {
                return Err(VariantStreamError::OutOfOrderInput {
                    path: self.path.clone(),
                    line_number: self.line_number,
                    previous: format!("{prev_chrom}:{prev_pos}"),
                    current: format!("{}:{}", record.chromosome(), record.position())
                }.into());
            }
        }

        self.last_coordinate = Some((record.chromosome().to_string(), record.position()));
        Ok(())
    }

    // getters
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The header lines captured from the top of the file, verbatim
    pub fn header(&self) -> &[String] {
        &self.header
    }
}

impl<R: BufRead> Iterator for VariantReader<R> {
    type Item = anyhow::Result<VariantRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(record) = self.pending.take() {
            return Some(Ok(record));
        }

        match self.read_line() {
            Ok(Some(line)) => Some(self.decode(line)),
            Ok(None) => None, // clean end of input
            Err(e) => Some(Err(e))
        }
    }
}
