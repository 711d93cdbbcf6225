
use strum_macros::Display;

/// Classification of pairing one unphased record with zero-or-one phased record
/// at the same coordinate
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum MatchStatus {
    /// No phased record exists at the unphased record's coordinate
    #[strum(serialize = "no_phase_available")]
    NoPhaseAvailable,
    /// The phased record's allele content matches exactly
    #[strum(serialize = "consistent")]
    Consistent,
    /// The allele sets agree, but order or representation differs
    #[strum(serialize = "soft_allele_mismatch")]
    SoftAlleleMismatch,
    /// The allele sets disagree
    #[strum(serialize = "hard_allele_mismatch")]
    HardAlleleMismatch
}

/// Ephemeral result of resolving one coordinate pairing.
/// Carries the genotype chosen for the output record and whether that choice
/// actually changed the unphased value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchOutcome {
    /// How the pairing was classified
    status: MatchStatus,
    /// The genotype string that goes into the output record
    output_genotype: String,
    /// True only if `output_genotype` differs from the unphased input's genotype
    replaced: bool
}

impl MatchOutcome {
    /// Constructor
    pub fn new(status: MatchStatus, output_genotype: String, replaced: bool) -> Self {
        Self {
            status,
            output_genotype,
            replaced
        }
    }

    // getters
    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn output_genotype(&self) -> &str {
        &self.output_genotype
    }

    pub fn replaced(&self) -> bool {
        self.replaced
    }
}
