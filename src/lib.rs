
/// Core logic for annotating CNVs and classifying TDBD candidates
pub mod annotate_cnvs;
/// Command line interface functionality
pub mod cli;
/// Contains various shared data types
pub mod data_types;
/// Tooling for parsing input files into meaningful structs / data
pub mod parsing;
/// Phenotype ontology and semantic similarity
pub mod phenotype;
/// Various utility functions that tend to be very generic
pub mod util;
/// All output writers
pub mod writers;
