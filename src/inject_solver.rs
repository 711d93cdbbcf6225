/*!
# Inject Solver
Contains the logic for deciding whether the phased genotype at a matched coordinate can replace the unphased call.
The policy fails safe: any disagreement about the allele content at a position keeps the unphased genotype,
so a coordinate collision between two different variant descriptions never corrupts the output calls.

## Example usage
```rust
use phasegraft::data_types::match_outcome::MatchStatus;
use phasegraft::data_types::variant_record::VariantRecord;
use phasegraft::inject_solver::{resolve_match, InjectConfig};

// an unphased call and a phased call describing the same variant
let unphased = VariantRecord::from_line("chr1\t200\t.\tA\tT\t50\tPASS\t.\tGT:DP\t0/1:30", 1).unwrap();
let phased = VariantRecord::from_line("chr1\t200\t.\tA\tT\t.\t.\t.\tGT\t0|1", 1).unwrap();

let outcome = resolve_match(&unphased, Some(&phased), InjectConfig::default()).unwrap();
assert_eq!(outcome.status(), MatchStatus::Consistent);
assert_eq!(outcome.output_genotype(), "0|1");
assert!(outcome.replaced());

// a phased call with a different ALT allele is rejected, keeping the unphased genotype
let conflicting = VariantRecord::from_line("chr1\t200\t.\tA\tG\t.\t.\t.\tGT\t0|1", 1).unwrap();
let outcome = resolve_match(&unphased, Some(&conflicting), InjectConfig::default()).unwrap();
assert_eq!(outcome.status(), MatchStatus::HardAlleleMismatch);
assert_eq!(outcome.output_genotype(), "0/1");
```
*/
use derive_builder::Builder;
use itertools::Itertools;
use log::trace;

use crate::data_types::match_outcome::{MatchOutcome, MatchStatus};
use crate::data_types::variant_record::VariantRecord;

/// Unphased genotypes accepted at matched coordinates when strict checking is enabled
const ALLOWED_UNPHASED: [&str; 4] = ["0/0", "0/1", "1/0", "1/1"];
/// Phased genotypes accepted at matched coordinates when strict checking is enabled
const ALLOWED_PHASED: [&str; 4] = ["0|0", "0|1", "1|0", "1|1"];

#[derive(thiserror::Error, Debug)]
pub enum InjectError {
    #[error("unphased genotype {genotype:?} at {chromosome}:{position} is not a supported biallelic diploid genotype")]
    UnsupportedUnphasedGenotype {
        chromosome: String,
        position: u64,
        genotype: String
    },
    #[error("phased genotype {genotype:?} at {chromosome}:{position} is not a supported biallelic diploid genotype")]
    UnsupportedPhasedGenotype {
        chromosome: String,
        position: u64,
        genotype: String
    }
}

/// Controls the optional validation applied while resolving a match
#[derive(Builder, Clone, Copy, Default)]
#[builder(default)]
pub struct InjectConfig {
    /// if true, genotypes at matched coordinates must come from the biallelic diploid set
    strict_genotypes: bool
}

impl InjectConfig {
    // mostly getters
    pub fn strict_genotypes(&self) -> bool {
        self.strict_genotypes
    }
}

/// Entry point for resolving one coordinate pairing.
/// # Arguments
/// * `unphased` - the record whose genotype may get replaced
/// * `phased` - the candidate phased record at the same coordinate, if one exists
/// * `config` - optional validation controls
/// # Errors
/// * if strict checking is enabled and a genotype at a matched coordinate is outside the supported set
pub fn resolve_match(unphased: &VariantRecord, phased: Option<&VariantRecord>, config: InjectConfig) -> anyhow::Result<MatchOutcome> {
    let phased = match phased {
        Some(p) => p,
        None => {
            // nothing to inject, the unphased call passes through unchanged
            return Ok(MatchOutcome::new(MatchStatus::NoPhaseAvailable, unphased.genotype().to_string(), false));
        }
    };

    if config.strict_genotypes() {
        // the unphased side also accepts phased separators so that re-running on merged output still works
        let unphased_gt = unphased.genotype();
        if !ALLOWED_UNPHASED.contains(&unphased_gt) && !ALLOWED_PHASED.contains(&unphased_gt) {
            return Err(InjectError::UnsupportedUnphasedGenotype {
                chromosome: unphased.chromosome().to_string(),
                position: unphased.position(),
                genotype: unphased_gt.to_string()
            }.into());
        }

        let phased_gt = phased.genotype();
        if !ALLOWED_PHASED.contains(&phased_gt) {
            return Err(InjectError::UnsupportedPhasedGenotype {
                chromosome: phased.chromosome().to_string(),
                position: phased.position(),
                genotype: phased_gt.to_string()
            }.into());
        }
    }

    let exact_match = unphased.reference_allele() == phased.reference_allele()
        && unphased.alternate_alleles() == phased.alternate_alleles();
    if exact_match {
        let output_genotype = phased.genotype().to_string();
        let replaced = output_genotype != unphased.genotype();
        trace!("Injecting {output_genotype:?} at {}:{}", unphased.chromosome(), unphased.position());
        return Ok(MatchOutcome::new(MatchStatus::Consistent, output_genotype, replaced));
    }

    // allele content disagrees; verbatim index substitution would be unsafe either way,
    // but sets that agree after normalization are the softer mismatch class
    let status = if allele_sets_equivalent(unphased, phased) {
        MatchStatus::SoftAlleleMismatch
    } else {
        MatchStatus::HardAlleleMismatch
    };
    trace!("{} at {}:{}", status, unphased.chromosome(), unphased.position());

    Ok(MatchOutcome::new(status, unphased.genotype().to_string(), false))
}

/// Compares the allele sets of two records ignoring ALT order and base case.
/// # Arguments
/// * `unphased` - the unphased record
/// * `phased` - the phased candidate at the same coordinate
fn allele_sets_equivalent(unphased: &VariantRecord, phased: &VariantRecord) -> bool {
    if !unphased.reference_allele().eq_ignore_ascii_case(phased.reference_allele()) {
        return false;
    }

    let normalized = |alleles: &[String]| -> Vec<String> {
        alleles.iter()
            .map(|a| a.to_ascii_uppercase())
            .sorted()
            .collect()
    };
    normalized(unphased.alternate_alleles()) == normalized(phased.alternate_alleles())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper that builds a record at the given coordinate with the provided REF, ALT, and GT
    fn build_record(position: u64, reference: &str, alternate: &str, genotype: &str) -> VariantRecord {
        let line = format!("chr1\t{position}\t.\t{reference}\t{alternate}\t50\tPASS\t.\tGT:DP\t{genotype}:22");
        VariantRecord::from_line(&line, 1).unwrap()
    }

    #[test]
    fn test_no_phase_available() {
        let unphased = build_record(100, "A", "T", "0/1");
        let outcome = resolve_match(&unphased, None, InjectConfig::default()).unwrap();

        assert_eq!(outcome.status(), MatchStatus::NoPhaseAvailable);
        assert_eq!(outcome.output_genotype(), "0/1");
        assert!(!outcome.replaced());
    }

    #[test]
    fn test_consistent_injection() {
        let unphased = build_record(100, "A", "T", "0/1");
        let phased = build_record(100, "A", "T", "1|0");
        let outcome = resolve_match(&unphased, Some(&phased), InjectConfig::default()).unwrap();

        assert_eq!(outcome.status(), MatchStatus::Consistent);
        assert_eq!(outcome.output_genotype(), "1|0");
        assert!(outcome.replaced());
    }

    #[test]
    fn test_consistent_already_phased() {
        // merging produced output a second time must not count a replacement
        let unphased = build_record(100, "A", "T", "0|1");
        let phased = build_record(100, "A", "T", "0|1");
        let outcome = resolve_match(&unphased, Some(&phased), InjectConfig::default()).unwrap();

        assert_eq!(outcome.status(), MatchStatus::Consistent);
        assert_eq!(outcome.output_genotype(), "0|1");
        assert!(!outcome.replaced());
    }

    #[test]
    fn test_soft_mismatch_reordered_alts() {
        let unphased = build_record(100, "A", "T,G", "1/2");
        let phased = build_record(100, "A", "G,T", "1|2");
        let outcome = resolve_match(&unphased, Some(&phased), InjectConfig::default()).unwrap();

        // the allele indices mean different bases in the two files, so no injection
        assert_eq!(outcome.status(), MatchStatus::SoftAlleleMismatch);
        assert_eq!(outcome.output_genotype(), "1/2");
        assert!(!outcome.replaced());
    }

    #[test]
    fn test_soft_mismatch_case_difference() {
        let unphased = build_record(100, "A", "T", "0/1");
        let phased = build_record(100, "a", "t", "0|1");
        let outcome = resolve_match(&unphased, Some(&phased), InjectConfig::default()).unwrap();

        assert_eq!(outcome.status(), MatchStatus::SoftAlleleMismatch);
        assert_eq!(outcome.output_genotype(), "0/1");
    }

    #[test]
    fn test_hard_mismatch() {
        let unphased = build_record(150, "A", "T", "0/1");
        let phased = build_record(150, "A", "G", "0|1");
        let outcome = resolve_match(&unphased, Some(&phased), InjectConfig::default()).unwrap();

        assert_eq!(outcome.status(), MatchStatus::HardAlleleMismatch);
        assert_eq!(outcome.output_genotype(), "0/1");
        assert!(!outcome.replaced());

        // differing REF is also a hard mismatch
        let phased = build_record(150, "C", "T", "0|1");
        let outcome = resolve_match(&unphased, Some(&phased), InjectConfig::default()).unwrap();
        assert_eq!(outcome.status(), MatchStatus::HardAlleleMismatch);
    }

    #[test]
    fn test_strict_genotypes() {
        let config = InjectConfigBuilder::default()
            .strict_genotypes(true)
            .build().unwrap();

        // multi-allelic unphased genotype gets rejected
        let unphased = build_record(100, "A", "T,G", "1/2");
        let phased = build_record(100, "A", "T,G", "1|2");
        let result = resolve_match(&unphased, Some(&phased), config);
        assert!(matches!(
            result.unwrap_err().downcast_ref::<InjectError>(),
            Some(InjectError::UnsupportedUnphasedGenotype { .. })
        ));

        // unphased separator on the phased side gets rejected
        let unphased = build_record(100, "A", "T", "0/1");
        let phased = build_record(100, "A", "T", "0/1");
        let result = resolve_match(&unphased, Some(&phased), config);
        assert!(matches!(
            result.unwrap_err().downcast_ref::<InjectError>(),
            Some(InjectError::UnsupportedPhasedGenotype { .. })
        ));

        // supported pairs still resolve, including already-phased unphased input
        let unphased = build_record(100, "A", "T", "0|1");
        let phased = build_record(100, "A", "T", "0|1");
        let outcome = resolve_match(&unphased, Some(&phased), config).unwrap();
        assert_eq!(outcome.status(), MatchStatus::Consistent);

        // strict checking only applies at matched coordinates
        let unphased = build_record(100, "A", "T,G", "1/2");
        let outcome = resolve_match(&unphased, None, config).unwrap();
        assert_eq!(outcome.status(), MatchStatus::NoPhaseAvailable);
    }
}
