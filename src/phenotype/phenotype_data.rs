
use indexmap::IndexMap;
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};

use crate::data_types::gene::Gene;
use crate::data_types::genomic_set::GenomicSet;
use crate::phenotype::ontology::{Ontology, OntologyError, TermIndex};
use crate::phenotype::term_pair::TermPair;

/// An ontology together with the gene -> term annotations that give every term its information content (IC).
/// All derived tables are filled at construction, so a `PhenotypeData` can be shared across threads as-is.
#[derive(Clone, Debug)]
pub struct PhenotypeData {
    /// The term DAG
    ontology: Ontology,
    /// Lookup from gene identifier to its directly annotated terms
    gene_terms: IndexMap<String, BTreeSet<TermIndex>>,
    /// For each term, offsets (into `gene_terms`) of the genes annotated to it or any descendant
    term_genes: Vec<BTreeSet<usize>>,
    /// For each term, -ln(frequency)
    information_content: Vec<f64>,
}

impl PhenotypeData {
    /// Constructor that also computes term frequencies and information content.
    /// A gene annotated to a term counts toward that term and every one of its ancestors.
    /// Terms with no annotated genes get the IC of a single-gene term, `ln(#genes)`, which keeps IC finite and monotone.
    /// # Arguments
    /// * `ontology` - the term DAG
    /// * `gene_terms` - gene identifier to the set of directly annotated terms
    pub fn new(ontology: Ontology, gene_terms: IndexMap<String, BTreeSet<TermIndex>>) -> Self {
        let mut term_genes: Vec<BTreeSet<usize>> = vec![Default::default(); ontology.num_terms()];
        for (gene_offset, terms) in gene_terms.values().enumerate() {
            for &term in terms.iter() {
                for ancestor in ontology.ancestors(term).iter() {
                    term_genes[ancestor.index()].insert(gene_offset);
                }
            }
        }

        let total_genes = gene_terms.len();
        let information_content: Vec<f64> = term_genes.iter()
            .map(|genes| {
                if total_genes == 0 {
                    0.0
                } else if genes.is_empty() {
                    (total_genes as f64).ln()
                } else {
                    -(genes.len() as f64 / total_genes as f64).ln()
                }
            })
            .collect();

        let unused_terms = term_genes.iter().filter(|g| g.is_empty()).count();
        debug!("Computed information content for {} terms from {total_genes} annotated genes ({unused_terms} terms without genes)", ontology.num_terms());
        if total_genes == 0 {
            warn!("No gene annotations provided, all information content values are 0");
        }

        Self {
            ontology, gene_terms, term_genes, information_content
        }
    }

    /// Constructor from raw (gene identifier, term accession) pairs.
    /// # Errors
    /// * if any accession is not in the ontology, including alternates
    pub fn from_annotation_pairs<I, G, T>(ontology: Ontology, pairs: I) -> Result<Self, OntologyError>
    where
        I: IntoIterator<Item = (G, T)>,
        G: Into<String>,
        T: AsRef<str>
    {
        let mut gene_terms: IndexMap<String, BTreeSet<TermIndex>> = Default::default();
        for (gene_id, term_id) in pairs {
            let term = ontology.term_including_alternatives(term_id.as_ref())?;
            gene_terms.entry(gene_id.into()).or_default().insert(term);
        }
        Ok(Self::new(ontology, gene_terms))
    }

    /// Information content of a term, `-ln(frequency)`
    pub fn information_content(&self, term: TermIndex) -> f64 {
        self.information_content[term.index()]
    }

    /// Returns true if `candidate_ancestor` equals `term` or is reachable from it via "is-a" edges.
    pub fn is_ancestor_or_equal(&self, candidate_ancestor: TermIndex, term: TermIndex) -> bool {
        self.ontology.is_ancestor_or_equal(candidate_ancestor, term)
    }

    /// Among the ancestors shared by any term in `set_a` and any term in `set_b`, returns the one with the highest IC.
    /// Ties on IC go to the deeper term: a tied term is dropped when another tied term descends from it.
    /// Any remaining tie goes to the smallest accession.
    /// Returns None if the sets share no ancestor.
    pub fn most_informative_common_ancestor(&self, set_a: &BTreeSet<TermIndex>, set_b: &BTreeSet<TermIndex>) -> Option<TermIndex> {
        let ancestors_a: BTreeSet<TermIndex> = set_a.iter()
            .flat_map(|&t| self.ontology.ancestors(t).iter().copied())
            .collect();
        let ancestors_b: BTreeSet<TermIndex> = set_b.iter()
            .flat_map(|&t| self.ontology.ancestors(t).iter().copied())
            .collect();
        let shared: Vec<TermIndex> = ancestors_a.intersection(&ancestors_b).copied().collect();
        let best_ic = shared.iter()
            .map(|&t| self.information_content(t))
            .reduce(f64::max)?;

        let tied: Vec<TermIndex> = shared.into_iter()
            .filter(|&t| self.information_content(t) == best_ic)
            .collect();
        tied.iter()
            .copied()
            .filter(|&t| !tied.iter().any(|&other| other != t && self.ontology.is_ancestor_or_equal(t, other)))
            .min_by(|&x, &y| self.ontology.term(x).id().cmp(self.ontology.term(y).id()))
    }

    /// IC of the most informative common ancestor of two single terms (Resnik similarity); 0.0 if unrelated.
    pub fn term_similarity(&self, term_a: TermIndex, term_b: TermIndex) -> f64 {
        let ancestors_b = self.ontology.ancestors(term_b);
        self.ontology.ancestors(term_a).iter()
            .filter(|t| ancestors_b.binary_search(t).is_ok())
            .map(|&t| self.information_content(t))
            .fold(0.0, f64::max)
    }

    /// Sum-of-best-matches similarity between a patient and a gene.
    /// For every phenotype term of the gene, we take the best similarity to any patient term, and sum those.
    /// A gene without phenotype terms (or a patient without terms) scores 0.0.
    /// # Arguments
    /// * `patient_terms` - the observed patient phenotypes
    /// * `gene` - the gene with resolved phenotype terms
    pub fn pheno_match_score(&self, patient_terms: &BTreeSet<TermIndex>, gene: &Gene) -> f64 {
        if patient_terms.is_empty() {
            return 0.0;
        }
        gene.phenotype_terms().iter()
            .map(|&gene_term| {
                patient_terms.iter()
                    .map(|&patient_term| self.term_similarity(patient_term, gene_term))
                    .fold(0.0, f64::max)
            })
            .sum()
    }

    /// The matches behind `pheno_match_score`: for every gene term, the patient term it matched best.
    /// Gene terms with no informative match (score 0.0) are left out; ties keep the first patient term.
    pub fn pheno_match_pairs(&self, patient_terms: &BTreeSet<TermIndex>, gene: &Gene) -> Vec<TermPair> {
        gene.phenotype_terms().iter()
            .filter_map(|&gene_term| {
                let (patient_term, score) = patient_terms.iter()
                    .map(|&patient_term| (patient_term, self.term_similarity(patient_term, gene_term)))
                    .fold(None, |best: Option<(TermIndex, f64)>, (term, score)| match best {
                        Some((_, best_score)) if best_score >= score => best,
                        _ => Some((term, score))
                    })?;
                (score > 0.0).then(|| {
                    TermPair::new(self.ontology.term(patient_term).id(), self.ontology.term(gene_term).id(), score)
                })
            })
            .collect()
    }

    /// The gene with the highest `pheno_match_score` and that score.
    /// Ties keep the first gene; None if there are no genes or every gene scores 0.0.
    pub fn best_pheno_match<'a, I>(&self, patient_terms: &BTreeSet<TermIndex>, genes: I) -> Option<(&'a Gene, f64)>
    where
        I: IntoIterator<Item = &'a Gene>
    {
        genes.into_iter()
            .map(|gene| (gene, self.pheno_match_score(patient_terms, gene)))
            .filter(|(_gene, score)| *score > 0.0)
            .fold(None, |best, (gene, score)| match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((gene, score))
            })
    }

    /// Best single-gene explanation in a region: the maximum `pheno_match_score` over the genes, 0.0 if there are none.
    pub fn pheno_gram_score<'a, I>(&self, patient_terms: &BTreeSet<TermIndex>, genes: I) -> f64
    where
        I: IntoIterator<Item = &'a Gene>
    {
        self.best_pheno_match(patient_terms, genes)
            .map(|(_gene, score)| score)
            .unwrap_or(0.0)
    }

    /// For each target term, the identifiers of all genes annotated to it or to one of its descendants.
    pub fn map_target_term_to_genes(&self, target_terms: &BTreeSet<TermIndex>) -> BTreeMap<TermIndex, BTreeSet<String>> {
        target_terms.iter()
            .map(|&term| {
                let genes: BTreeSet<String> = self.term_genes[term.index()].iter()
                    .filter_map(|&offset| self.gene_terms.get_index(offset))
                    .map(|(gene_id, _terms)| gene_id.clone())
                    .collect();
                (term, genes)
            })
            .collect()
    }

    /// Resolves the phenotype terms of every gene.
    /// Raw accessions on the gene take priority; genes without any fall back to the annotation table entry for their name.
    /// # Errors
    /// * if a raw accession is not in the ontology
    pub fn annotate_gene_terms(&self, genes: &mut GenomicSet<Gene>) -> Result<(), OntologyError> {
        let mut from_table = 0;
        for gene in genes.values_mut() {
            let terms = if gene.phenotype_term_ids().is_empty() {
                let terms = self.gene_terms.get(gene.name()).cloned().unwrap_or_default();
                if !terms.is_empty() {
                    from_table += 1;
                }
                terms
            } else {
                self.ontology.resolve_terms(gene.phenotype_term_ids())?
            };
            gene.set_phenotype_terms(terms);
        }
        debug!("Resolved phenotype terms for {} genes ({from_table} from the annotation table)", genes.len());
        Ok(())
    }

    /// Resolves a single accession, following alternate IDs.
    /// # Errors
    /// * if the accession is not in the ontology
    pub fn term_including_alternatives(&self, id: &str) -> Result<TermIndex, OntologyError> {
        self.ontology.term_including_alternatives(id)
    }

    /// Resolves a batch of accessions.
    /// # Errors
    /// * if any accession is not in the ontology
    pub fn resolve_terms<S: AsRef<str>>(&self, ids: &[S]) -> Result<BTreeSet<TermIndex>, OntologyError> {
        self.ontology.resolve_terms(ids)
    }

    /// Display name of a term
    pub fn term_name(&self, term: TermIndex) -> &str {
        self.ontology.term(term).name()
    }

    pub fn num_terms(&self) -> usize {
        self.ontology.num_terms()
    }

    /// All gene identifiers with at least one annotation
    pub fn all_gene_ids(&self) -> BTreeSet<String> {
        self.gene_terms.keys().cloned().collect()
    }

    pub fn ontology(&self) -> &Ontology {
        &self.ontology
    }
}
