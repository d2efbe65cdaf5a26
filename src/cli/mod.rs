/*!
# CLI module
Command line interface functionality that is specific to tadsift.
*/

/// The annotate CLI subcommand
pub mod annotate;
/// The main CLI module that contains the top-level CLI parser and help text
pub mod core;
