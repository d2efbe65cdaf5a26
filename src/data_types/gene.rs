
use std::collections::BTreeSet;

use crate::data_types::genomic_element::{GenomicElement, GenomicFeature};
use crate::phenotype::ontology::TermIndex;

/// A gene locus with its phenotype annotations.
/// `phenotype_term_ids` holds the raw accessions from the input, `phenotype_terms` holds them after ontology lookup.
#[derive(Clone, Debug)]
pub struct Gene {
    /// The gene body
    element: GenomicElement,
    /// Optional gene symbol, mostly for reporting
    symbol: Option<String>,
    /// Raw phenotype accessions as provided by the input
    phenotype_term_ids: Vec<String>,
    /// Resolved ontology terms; empty until resolved
    phenotype_terms: BTreeSet<TermIndex>,
}

impl Gene {
    /// Constructor
    /// # Arguments
    /// * `element` - the gene coordinates; the element name is the gene identifier
    /// * `phenotype_term_ids` - raw phenotype accessions, resolved later against an ontology
    pub fn new(element: GenomicElement, phenotype_term_ids: Vec<String>) -> Self {
        Self {
            element,
            symbol: None,
            phenotype_term_ids,
            phenotype_terms: Default::default()
        }
    }

    /// Builder-style symbol assignment
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Replaces any previously resolved terms
    pub fn set_phenotype_terms(&mut self, terms: BTreeSet<TermIndex>) {
        self.phenotype_terms = terms;
    }

    pub fn add_phenotype_term(&mut self, term: TermIndex) {
        self.phenotype_terms.insert(term);
    }

    // getters
    pub fn name(&self) -> &str {
        self.element.name()
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn phenotype_term_ids(&self) -> &[String] {
        &self.phenotype_term_ids
    }

    pub fn phenotype_terms(&self) -> &BTreeSet<TermIndex> {
        &self.phenotype_terms
    }
}

impl GenomicFeature for Gene {
    fn element(&self) -> &GenomicElement {
        &self.element
    }
}
