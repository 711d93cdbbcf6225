
/// Contains the ephemeral result of pairing an unphased record with a phased candidate
pub mod match_outcome;
/// Contains the run-wide event counters and their fixed reporting order
pub mod run_statistics;
/// Contains the variant record definition and line-level decoding checks
pub mod variant_record;
