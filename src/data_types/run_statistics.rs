
use std::ops::AddAssign;

use crate::data_types::match_outcome::{MatchOutcome, MatchStatus};

/// Event counters accumulated over a single merge run.
/// The struct is owned by the merge pass and returned by value, so independent
/// runs in one process never share state.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunStatistics {
    /// Number of unphased records processed
    read_lines: u64,
    /// Number of records whose genotype was substituted with the phased call
    replaced_genotypes: u64,
    /// Number of matched pairs whose allele sets disagree
    inconsistent_ref_alt_genotypes: u64,
    /// Number of matched pairs whose allele sets agree but differ in order or representation
    inconsistent_ref_alt_alleles: u64,
    /// Number of records with no phased counterpart; reported in the run log only
    kept_genotypes: u64
}

impl AddAssign for RunStatistics {
    // Enables += with stats
    fn add_assign(&mut self, rhs: Self) {
        self.read_lines += rhs.read_lines;
        self.replaced_genotypes += rhs.replaced_genotypes;
        self.inconsistent_ref_alt_genotypes += rhs.inconsistent_ref_alt_genotypes;
        self.inconsistent_ref_alt_alleles += rhs.inconsistent_ref_alt_alleles;
        self.kept_genotypes += rhs.kept_genotypes;
    }
}

impl RunStatistics {
    /// Counts one unphased record pulled from the stream
    pub fn record_read_line(&mut self) {
        self.read_lines += 1;
    }

    /// Applies the counter deltas for one resolved pairing
    pub fn record_outcome(&mut self, outcome: &MatchOutcome) {
        match outcome.status() {
            MatchStatus::NoPhaseAvailable => {
                self.kept_genotypes += 1;
            },
            MatchStatus::Consistent => {
                // an injection that reproduces the existing value is not a replacement,
                // which keeps repeated merges of the same inputs stable
                if outcome.replaced() {
                    self.replaced_genotypes += 1;
                }
            },
            MatchStatus::SoftAlleleMismatch => {
                self.inconsistent_ref_alt_alleles += 1;
            },
            MatchStatus::HardAlleleMismatch => {
                self.inconsistent_ref_alt_genotypes += 1;
            }
        }
    }

    /// The reported counters as `(key, value)` pairs in their fixed output order.
    /// Downstream aggregation parses these keys by name, so the spelling and
    /// ordering here must not change.
    pub fn report_pairs(&self) -> [(&'static str, u64); 4] {
        [
            ("read_lines", self.read_lines),
            ("replaced_genotypes", self.replaced_genotypes),
            ("inconsistent_ref_alt_genotypes", self.inconsistent_ref_alt_genotypes),
            ("inconsistent_ref_alt_alleles", self.inconsistent_ref_alt_alleles)
        ]
    }

    // getters
    pub fn read_lines(&self) -> u64 {
        self.read_lines
    }

    pub fn replaced_genotypes(&self) -> u64 {
        self.replaced_genotypes
    }

    pub fn inconsistent_ref_alt_genotypes(&self) -> u64 {
        self.inconsistent_ref_alt_genotypes
    }

    pub fn inconsistent_ref_alt_alleles(&self) -> u64 {
        self.inconsistent_ref_alt_alleles
    }

    pub fn kept_genotypes(&self) -> u64 {
        self.kept_genotypes
    }
}
