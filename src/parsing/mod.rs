/*!
# Parsing module
Contains the logic for parsing input files into meaningful structs / data.
*/
/// Streaming reader that decodes a variant file into records, one line at a time
pub mod variant_reader;
