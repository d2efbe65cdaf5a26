/*!
# Parsing module
Contains the logic for parsing input files into meaningful structs / data.
*/
/// Loader for the JSON ontology and the combined phenotype data
pub mod ontology_json;
/// Loaders for the tab-delimited element, gene, CNV, and annotation files
pub mod tab_file;
