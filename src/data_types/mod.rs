
/// Copy-number variants and their annotation lifecycle
pub mod cnv;
/// Genes with phenotype annotations
pub mod gene;
/// Half-open genomic intervals with identity
pub mod genomic_element;
/// Name-keyed collections of genomic features with interval lookups
pub mod genomic_set;
