/*!
# Writers module
Contains the logic for writing the merged VCF and the run statistics log.
*/
/// Serializes the run counters as a key/value log
pub mod stats_writer;
/// Generates the merged variant file
pub mod variant_writer;
