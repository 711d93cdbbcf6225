
/// Command line interface functionality
pub mod cli;
/// Contains various shared data types
pub mod data_types;
/// Decides whether a phased genotype can safely replace an unphased call
pub mod inject_solver;
/// Contains the streaming merge loop that pairs the two input streams by coordinate
pub mod merge_driver;
/// Tooling for parsing input files into meaningful structs / data
pub mod parsing;
/// Various utility functions that tend to be very generic
pub mod util;
/// All output writers
pub mod writers;
