/*!
# CLI module
Command line interface functionality that is specific to Phasegraft.
*/

/// The main CLI module that contains the top-level CLI parser and help text
pub mod core;
/// The inject CLI subcommand
pub mod inject;
