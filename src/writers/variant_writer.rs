
use anyhow::Context;
use log::debug;
use noodles::bgzf;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::cli::inject::OutputCompression;
use crate::data_types::variant_record::VariantRecord;

/// The final header line that introduces the data columns
const COLUMN_HEADER_PREFIX: &str = "#CHROM";

/// Streaming, append-only encoder for merged variant records.
/// Untouched columns keep their original bytes; previously emitted lines are never rewritten.
pub struct VariantWriter<W: Write> {
    /// The underlying byte sink
    inner: W,
    /// Number of data records emitted so far
    records_written: u64
}

impl<W: Write> VariantWriter<W> {
    /// Constructor
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            records_written: 0
        }
    }

    /// Replays a captured header block, inserting the provided metadata lines
    /// immediately ahead of the column header.
    /// # Arguments
    /// * `header` - the header lines captured from the primary input, verbatim
    /// * `metadata` - provenance lines to add, e.g. the tool version and command
    pub fn write_header(&mut self, header: &[String], metadata: &[String]) -> anyhow::Result<()> {
        let split = header.iter()
            .position(|line| line.starts_with(COLUMN_HEADER_PREFIX))
            .unwrap_or(header.len());

        for line in header[..split].iter().chain(metadata.iter()).chain(header[split..].iter()) {
            self.inner.write_all(line.as_bytes())?;
            self.inner.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Encodes one merged record as a data line
    pub fn write_record(&mut self, record: &VariantRecord) -> anyhow::Result<()> {
        self.inner.write_all(record.to_line().as_bytes())?;
        self.inner.write_all(b"\n")?;
        self.records_written += 1;
        Ok(())
    }

    /// Flushes the underlying sink
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }

    /// Consumes the writer and returns the sink, mostly for tests
    pub fn into_inner(self) -> W {
        self.inner
    }

    // getters
    pub fn records_written(&self) -> u64 {
        self.records_written
    }
}

/// Path-based output wrapper that streams to a temporary sibling file and renames it
/// into place on completion, so an aborted run never leaves a valid-looking output behind.
pub struct OutputVcf {
    /// The record writer over the temporary file
    writer: VariantWriter<Box<dyn Write>>,
    /// The in-progress file that receives all writes
    tmp_filename: PathBuf,
    /// The final path, created only by `finalize`
    out_filename: PathBuf
}

impl OutputVcf {
    /// Creates the temporary output file for the given target path.
    /// # Arguments
    /// * `out_filename` - the final output path
    /// * `compression` - output compression mode; `Auto` keys off the `.gz` extension
    /// * `threads` - number of compression workers when the output is compressed
    /// # Errors
    /// * if the temporary file cannot be created
    pub fn create(out_filename: &Path, compression: OutputCompression, threads: usize) -> anyhow::Result<Self> {
        let mut tmp_os = out_filename.as_os_str().to_owned();
        tmp_os.push(".tmp");
        let tmp_filename = PathBuf::from(tmp_os);

        debug!("Opening {tmp_filename:?} for writing...");
        let file = File::create(&tmp_filename)
            .with_context(|| format!("Error while creating {tmp_filename:?}:"))?;

        let is_compressed = match compression {
            OutputCompression::Auto => {
                match out_filename.extension() {
                    Some(extension) => extension == "gz",
                    None => false
                }
            },
            OutputCompression::Bgzf => true,
            OutputCompression::Plain => false
        };

        let inner: Box<dyn Write> = if is_compressed {
            let w_threads = NonZeroUsize::new(threads.clamp(1, 4)).unwrap();
            Box::new(bgzf::io::MultithreadedWriter::with_worker_count(w_threads, file))
        } else {
            Box::new(BufWriter::new(file))
        };

        Ok(Self {
            writer: VariantWriter::new(inner),
            tmp_filename,
            out_filename: out_filename.to_path_buf()
        })
    }

    /// The record writer over the temporary file
    pub fn writer_mut(&mut self) -> &mut VariantWriter<Box<dyn Write>> {
        &mut self.writer
    }

    /// Finalizes the stream and moves the temporary file into place.
    /// # Errors
    /// * if flushing the stream or renaming the file fails
    pub fn finalize(self) -> anyhow::Result<()> {
        let Self { mut writer, tmp_filename, out_filename } = self;
        let records_written = writer.records_written();

        writer.flush()
            .with_context(|| format!("Error while flushing {tmp_filename:?}:"))?;
        // dropping the writer finishes the compressed stream
        std::mem::drop(writer);

        std::fs::rename(&tmp_filename, &out_filename)
            .with_context(|| format!("Error while renaming {tmp_filename:?} to {out_filename:?}:"))?;
        debug!("Finalized {out_filename:?} with {records_written} records.");
        Ok(())
    }
}
