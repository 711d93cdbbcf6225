
use indexmap::IndexMap;

/// Minimum number of tab-delimited columns: CHROM through FORMAT plus one sample
pub const MIN_COLUMNS: usize = 10;
/// FORMAT key that carries the genotype
pub const GENOTYPE_KEY: &str = "GT";

/// Column index of the POS field
const POSITION_COLUMN: usize = 1;
/// Column index of the REF field
const REFERENCE_COLUMN: usize = 3;
/// Column index of the ALT field
const ALTERNATE_COLUMN: usize = 4;
/// Column index of the FORMAT field
const FORMAT_COLUMN: usize = 8;
/// Column index of the first (and only parsed) sample field
const SAMPLE_COLUMN: usize = 9;

#[derive(thiserror::Error, Debug)]
pub enum VariantRecordError {
    #[error("expected at least {MIN_COLUMNS} tab-delimited columns, found {found}")]
    MissingColumns { found: usize },
    #[error("POS must be a positive integer, found {raw:?}")]
    InvalidPosition { raw: String },
    #[error("FORMAT column is missing the {GENOTYPE_KEY} key")]
    MissingGenotypeKey,
    #[error("sample column has no value for the {GENOTYPE_KEY} key")]
    MissingGenotypeValue
}

/// One data line of a variant file for a single sample.
/// Parsed fields index into the retained column set, so re-encoding a record
/// reproduces every untouched column byte-for-byte.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariantRecord {
    /// All tab-delimited columns of the original line, in input order
    columns: Vec<String>,
    /// The coordinate parsed from the POS column, 1-based
    position: u64,
    /// The ALT column split into individual alleles, order preserved
    alternate_alleles: Vec<String>,
    /// The FORMAT column split into keys, order preserved
    format_keys: Vec<String>,
    /// Sample entries keyed by FORMAT key, order preserved
    sample_values: IndexMap<String, String>,
    /// 1-based line number this record was decoded from
    line_number: u64
}

impl VariantRecord {
    /// Decodes one tab-delimited data line into a record.
    /// # Arguments
    /// * `line` - the raw data line, without the trailing newline
    /// * `line_number` - 1-based source line number, carried for error reporting
    /// # Errors
    /// * if the line has fewer than the minimum required columns
    /// * if POS is not a positive integer
    /// * if the FORMAT or sample column lacks a genotype entry
    pub fn from_line(line: &str, line_number: u64) -> Result<Self, VariantRecordError> {
        let columns: Vec<String> = line.split('\t').map(|c| c.to_string()).collect();
        if columns.len() < MIN_COLUMNS {
            return Err(VariantRecordError::MissingColumns { found: columns.len() });
        }

        let position: u64 = match columns[POSITION_COLUMN].parse() {
            Ok(p) if p >= 1 => p,
            _ => return Err(VariantRecordError::InvalidPosition { raw: columns[POSITION_COLUMN].clone() })
        };

        let alternate_alleles: Vec<String> = columns[ALTERNATE_COLUMN].split(',')
            .map(|a| a.to_string())
            .collect();
        let format_keys: Vec<String> = columns[FORMAT_COLUMN].split(':')
            .map(|k| k.to_string())
            .collect();
        if !format_keys.iter().any(|k| k == GENOTYPE_KEY) {
            return Err(VariantRecordError::MissingGenotypeKey);
        }

        // the sample column may legally carry fewer entries than FORMAT has keys,
        // but the genotype entry itself must be present
        let sample_values: IndexMap<String, String> = format_keys.iter().cloned()
            .zip(columns[SAMPLE_COLUMN].split(':').map(|v| v.to_string()))
            .collect();
        if !sample_values.contains_key(GENOTYPE_KEY) {
            return Err(VariantRecordError::MissingGenotypeValue);
        }

        Ok(Self {
            columns,
            position,
            alternate_alleles,
            format_keys,
            sample_values,
            line_number
        })
    }

    /// Replaces the genotype value, rebuilding the sample column in place.
    /// All sibling subfields keep their original bytes and separators.
    pub fn set_genotype(&mut self, genotype: &str) {
        // the constructor guarantees the key exists in both FORMAT and the sample column
        let gt_index = self.format_keys.iter().position(|k| k == GENOTYPE_KEY).unwrap();
        let mut parts: Vec<&str> = self.columns[SAMPLE_COLUMN].split(':').collect();
        parts[gt_index] = genotype;
        self.columns[SAMPLE_COLUMN] = parts.join(":");
        self.sample_values.insert(GENOTYPE_KEY.to_string(), genotype.to_string());
    }

    /// Encodes the record back into its line format, untouched columns verbatim
    pub fn to_line(&self) -> String {
        self.columns.join("\t")
    }

    // getters
    pub fn chromosome(&self) -> &str {
        &self.columns[0]
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn reference_allele(&self) -> &str {
        &self.columns[REFERENCE_COLUMN]
    }

    pub fn alternate_alleles(&self) -> &[String] {
        &self.alternate_alleles
    }

    pub fn format_keys(&self) -> &[String] {
        &self.format_keys
    }

    pub fn sample_values(&self) -> &IndexMap<String, String> {
        &self.sample_values
    }

    /// The genotype value from the sample column; presence is a construction invariant
    pub fn genotype(&self) -> &str {
        self.sample_values.get(GENOTYPE_KEY).unwrap()
    }

    pub fn line_number(&self) -> u64 {
        self.line_number
    }
}
