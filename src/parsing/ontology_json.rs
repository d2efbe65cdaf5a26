
use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::parsing::tab_file::load_gene_annotations;
use crate::phenotype::ontology::{Ontology, TermDefinition};
use crate::phenotype::phenotype_data::PhenotypeData;
use crate::util::json_io::load_json;

/// On-disk layout of an ontology: a flat table of terms with their parent accessions
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct OntologyFile {
    pub terms: Vec<TermDefinition>,
}

/// Loads and validates an ontology from JSON (optionally gzipped).
/// # Errors
/// * if the file cannot be read or deserialized
/// * if the terms do not form a valid DAG
pub fn load_ontology(filename: &Path) -> anyhow::Result<Ontology> {
    let ontology_file: OntologyFile = load_json(filename)?;
    let ontology = Ontology::new(ontology_file.terms)
        .with_context(|| format!("Error while building ontology from {filename:?}:"))?;
    info!("Loaded {} ontology terms ({} roots) from {filename:?}", ontology.num_terms(), ontology.roots().len());
    Ok(ontology)
}

/// Loads an ontology and a gene annotation table, and computes the information content of every term.
/// # Errors
/// * if either file fails to load
/// * if an annotation references an unknown accession
pub fn load_phenotype_data(ontology_filename: &Path, annotation_filename: &Path) -> anyhow::Result<PhenotypeData> {
    let ontology = load_ontology(ontology_filename)?;
    let pairs = load_gene_annotations(annotation_filename)?;
    let phenotype_data = PhenotypeData::from_annotation_pairs(ontology, pairs)
        .with_context(|| format!("Error while loading annotations from {annotation_filename:?}:"))?;
    info!("Loaded annotations for {} genes from {annotation_filename:?}", phenotype_data.all_gene_ids().len());
    Ok(phenotype_data)
}
