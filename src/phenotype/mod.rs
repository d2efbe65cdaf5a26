/*!
# Phenotype module
Phenotype ontology handling and the information-content based similarity used to score genes against patient phenotypes.
*/

/// The term DAG with alternate accessions and precomputed ancestor closures
pub mod ontology;
/// Gene annotations, information content, and phenogram scoring
pub mod phenotype_data;
/// Best-match term pairs that explain a phenogram score
pub mod term_pair;
