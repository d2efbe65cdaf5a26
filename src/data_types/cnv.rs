
use serde::Serialize;
use std::collections::BTreeSet;
use strum_macros::EnumString;

use crate::data_types::gene::Gene;
use crate::data_types::genomic_element::{GenomicElement, GenomicFeature};
use crate::data_types::genomic_set::GenomicSet;
use crate::phenotype::ontology::TermIndex;
use crate::phenotype::term_pair::TermPair;

/// Copy-number direction of the variant
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, strum_macros::Display, EnumString, Serialize)]
pub enum CnvType {
    /// Deletion, copy number below two
    #[strum(ascii_case_insensitive, to_string = "loss", serialize = "del", serialize = "deletion")]
    Loss,
    /// Duplication, copy number above two
    #[strum(ascii_case_insensitive, to_string = "gain", serialize = "dup", serialize = "duplication")]
    Gain,
    /// Anything we could not classify
    #[default]
    #[strum(ascii_case_insensitive, to_string = "unknown", serialize = ".")]
    Unknown,
}

/// Each annotation step that can be applied to a CNV
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, strum_macros::Display)]
pub enum AnnotationStep {
    PhenotypeResolution,
    BoundaryOverlap,
    GeneOverlap,
    AdjacentRegions,
    AdjacentPhenogram,
    Tdbd,
}

impl AnnotationStep {
    /// Steps whose results this step reads; missing ones are treated as empty
    pub fn prerequisites(&self) -> &'static [AnnotationStep] {
        match self {
            AnnotationStep::PhenotypeResolution |
            AnnotationStep::BoundaryOverlap |
            AnnotationStep::AdjacentRegions => &[],
            AnnotationStep::GeneOverlap => &[AnnotationStep::PhenotypeResolution],
            AnnotationStep::AdjacentPhenogram => &[AnnotationStep::PhenotypeResolution, AnnotationStep::AdjacentRegions],
            AnnotationStep::Tdbd => &[AnnotationStep::BoundaryOverlap, AnnotationStep::GeneOverlap, AnnotationStep::AdjacentPhenogram],
        }
    }
}

/// Linear annotation lifecycle derived from the completed steps
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, strum_macros::Display)]
pub enum AnnotationStage {
    Raw,
    OverlapAnnotated,
    AdjacencyDefined,
    PhenotypeScored,
    Classified,
}

/// A copy-number variant and everything the annotation stages attach to it.
/// Every annotation field starts empty, zero, or absent.
#[derive(Clone, Debug)]
pub struct Cnv {
    /// The CNV coordinates; the element name is the CNV identifier
    element: GenomicElement,
    /// Loss, gain, or unknown
    cnv_type: CnvType,
    /// Raw patient phenotype accessions for the carrier of this CNV
    phenotype_term_ids: Vec<String>,
    /// Optional target term accession, e.g. the broad category of the patient phenotype
    target_term_id: Option<String>,
    /// Resolved patient phenotype terms
    phenotype_terms: BTreeSet<TermIndex>,
    /// Resolved target term
    target_term: Option<TermIndex>,

    // overlap stage
    /// Boundaries overlapped by the CNV
    boundary_overlap: Vec<GenomicElement>,
    /// Genes overlapped by the CNV
    genes: GenomicSet<Gene>,
    /// Phenogram score of the overlapped genes
    overlap_phenogram_score: f64,
    /// Overlapped gene that produced the phenogram score
    overlap_best_gene: Option<String>,
    /// Term matches behind the phenogram score
    overlap_term_pairs: Vec<TermPair>,
    /// Overlapped genes that are annotated to the target term or one of its descendants
    target_genes: Vec<String>,

    // adjacency stage
    /// Rest of the left flanking domain, if any
    left_adjacent_region: Option<GenomicElement>,
    /// Rest of the right flanking domain, if any
    right_adjacent_region: Option<GenomicElement>,

    // adjacent phenotype stage
    /// Names of the genes overlapping the left adjacent region
    left_adjacent_genes: Vec<String>,
    /// Names of the genes overlapping the right adjacent region
    right_adjacent_genes: Vec<String>,
    /// Phenogram score of the left adjacent genes
    left_adjacent_phenogram_score: f64,
    /// Phenogram score of the right adjacent genes
    right_adjacent_phenogram_score: f64,

    // classification stage
    /// Enhancers directly overlapped by the CNV
    enhancer_overlap: Vec<GenomicElement>,
    /// Number of enhancers in the left adjacent region
    left_adjacent_enhancers: usize,
    /// Number of enhancers in the right adjacent region
    right_adjacent_enhancers: usize,
    /// Final classification
    is_tdbd: bool,

    /// Steps that have run on this CNV
    completed_steps: BTreeSet<AnnotationStep>,
}

impl Cnv {
    /// Constructor for an un-annotated CNV
    /// # Arguments
    /// * `element` - the CNV coordinates and identifier
    /// * `cnv_type` - loss, gain, or unknown
    pub fn new(element: GenomicElement, cnv_type: CnvType) -> Self {
        Self {
            element,
            cnv_type,
            phenotype_term_ids: vec![],
            target_term_id: None,
            phenotype_terms: Default::default(),
            target_term: None,
            boundary_overlap: vec![],
            genes: GenomicSet::new(),
            overlap_phenogram_score: 0.0,
            overlap_best_gene: None,
            overlap_term_pairs: vec![],
            target_genes: vec![],
            left_adjacent_region: None,
            right_adjacent_region: None,
            left_adjacent_genes: vec![],
            right_adjacent_genes: vec![],
            left_adjacent_phenogram_score: 0.0,
            right_adjacent_phenogram_score: 0.0,
            enhancer_overlap: vec![],
            left_adjacent_enhancers: 0,
            right_adjacent_enhancers: 0,
            is_tdbd: false,
            completed_steps: Default::default()
        }
    }

    /// Builder-style assignment of the patient phenotype accessions
    pub fn with_phenotypes(mut self, phenotype_term_ids: Vec<String>, target_term_id: Option<String>) -> Self {
        self.phenotype_term_ids = phenotype_term_ids;
        self.target_term_id = target_term_id;
        self
    }

    /// The furthest stage reached, requiring all earlier stages to be complete
    pub fn stage(&self) -> AnnotationStage {
        let done = |step: AnnotationStep| self.completed_steps.contains(&step);
        let ladder = [
            (AnnotationStage::OverlapAnnotated, done(AnnotationStep::BoundaryOverlap) && done(AnnotationStep::GeneOverlap)),
            (AnnotationStage::AdjacencyDefined, done(AnnotationStep::AdjacentRegions)),
            (AnnotationStage::PhenotypeScored, done(AnnotationStep::AdjacentPhenogram)),
            (AnnotationStage::Classified, done(AnnotationStep::Tdbd)),
        ];
        let mut stage = AnnotationStage::Raw;
        for (next_stage, complete) in ladder {
            if !complete {
                break;
            }
            stage = next_stage;
        }
        stage
    }

    /// Returns true if the given step has been applied at least once
    pub fn has_completed(&self, step: AnnotationStep) -> bool {
        self.completed_steps.contains(&step)
    }

    // engine-side setters; each stage overwrites whatever a previous run left behind
    pub(crate) fn mark_completed(&mut self, step: AnnotationStep) {
        self.completed_steps.insert(step);
    }

    pub(crate) fn set_phenotype_terms(&mut self, terms: BTreeSet<TermIndex>) {
        self.phenotype_terms = terms;
    }

    pub(crate) fn set_target_term(&mut self, term: Option<TermIndex>) {
        self.target_term = term;
    }

    pub(crate) fn set_target_genes(&mut self, genes: Vec<String>) {
        self.target_genes = genes;
    }

    pub(crate) fn set_boundary_overlap(&mut self, boundaries: Vec<GenomicElement>) {
        self.boundary_overlap = boundaries;
    }

    pub(crate) fn set_genes(&mut self, genes: GenomicSet<Gene>) {
        self.genes = genes;
    }

    pub(crate) fn set_overlap_phenogram(&mut self, score: f64, best_gene: Option<String>, term_pairs: Vec<TermPair>) {
        self.overlap_phenogram_score = score;
        self.overlap_best_gene = best_gene;
        self.overlap_term_pairs = term_pairs;
    }

    pub(crate) fn set_adjacent_regions(&mut self, left: Option<GenomicElement>, right: Option<GenomicElement>) {
        self.left_adjacent_region = left;
        self.right_adjacent_region = right;
    }

    pub(crate) fn set_left_adjacent(&mut self, genes: Vec<String>, score: f64) {
        self.left_adjacent_genes = genes;
        self.left_adjacent_phenogram_score = score;
    }

    pub(crate) fn set_right_adjacent(&mut self, genes: Vec<String>, score: f64) {
        self.right_adjacent_genes = genes;
        self.right_adjacent_phenogram_score = score;
    }

    pub(crate) fn set_enhancer_evidence(&mut self, direct: Vec<GenomicElement>, left: usize, right: usize) {
        self.enhancer_overlap = direct;
        self.left_adjacent_enhancers = left;
        self.right_adjacent_enhancers = right;
    }

    pub(crate) fn set_tdbd(&mut self, is_tdbd: bool) {
        self.is_tdbd = is_tdbd;
    }

    // getters
    pub fn name(&self) -> &str {
        self.element.name()
    }

    pub fn cnv_type(&self) -> CnvType {
        self.cnv_type
    }

    pub fn phenotype_term_ids(&self) -> &[String] {
        &self.phenotype_term_ids
    }

    pub fn target_term_id(&self) -> Option<&str> {
        self.target_term_id.as_deref()
    }

    pub fn phenotype_terms(&self) -> &BTreeSet<TermIndex> {
        &self.phenotype_terms
    }

    pub fn target_term(&self) -> Option<TermIndex> {
        self.target_term
    }

    pub fn target_genes(&self) -> &[String] {
        &self.target_genes
    }

    pub fn boundary_overlap(&self) -> &[GenomicElement] {
        &self.boundary_overlap
    }

    pub fn genes(&self) -> &GenomicSet<Gene> {
        &self.genes
    }

    pub fn overlap_phenogram_score(&self) -> f64 {
        self.overlap_phenogram_score
    }

    pub fn overlap_best_gene(&self) -> Option<&str> {
        self.overlap_best_gene.as_deref()
    }

    pub fn overlap_term_pairs(&self) -> &[TermPair] {
        &self.overlap_term_pairs
    }

    pub fn left_adjacent_region(&self) -> Option<&GenomicElement> {
        self.left_adjacent_region.as_ref()
    }

    pub fn right_adjacent_region(&self) -> Option<&GenomicElement> {
        self.right_adjacent_region.as_ref()
    }

    pub fn left_adjacent_genes(&self) -> &[String] {
        &self.left_adjacent_genes
    }

    pub fn right_adjacent_genes(&self) -> &[String] {
        &self.right_adjacent_genes
    }

    pub fn left_adjacent_phenogram_score(&self) -> f64 {
        self.left_adjacent_phenogram_score
    }

    pub fn right_adjacent_phenogram_score(&self) -> f64 {
        self.right_adjacent_phenogram_score
    }

    pub fn enhancer_overlap(&self) -> &[GenomicElement] {
        &self.enhancer_overlap
    }

    pub fn left_adjacent_enhancers(&self) -> usize {
        self.left_adjacent_enhancers
    }

    pub fn right_adjacent_enhancers(&self) -> usize {
        self.right_adjacent_enhancers
    }

    pub fn is_tdbd(&self) -> bool {
        self.is_tdbd
    }
}

impl GenomicFeature for Cnv {
    fn element(&self) -> &GenomicElement {
        &self.element
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_cnv_type_parsing() {
        assert_eq!(CnvType::from_str("loss").unwrap(), CnvType::Loss);
        assert_eq!(CnvType::from_str("DEL").unwrap(), CnvType::Loss);
        assert_eq!(CnvType::from_str("Gain").unwrap(), CnvType::Gain);
        assert_eq!(CnvType::from_str("duplication").unwrap(), CnvType::Gain);
        assert_eq!(CnvType::from_str(".").unwrap(), CnvType::Unknown);
        assert!(CnvType::from_str("inversion").is_err());
        assert_eq!(CnvType::Loss.to_string(), "loss");
    }

    #[test]
    fn test_stage_ladder() {
        let element = GenomicElement::new("chr1", 9, 19, "cnv1").unwrap();
        let mut cnv = Cnv::new(element, CnvType::Loss);
        assert_eq!(cnv.stage(), AnnotationStage::Raw);

        // out of order steps do not advance the stage
        cnv.mark_completed(AnnotationStep::AdjacentRegions);
        assert_eq!(cnv.stage(), AnnotationStage::Raw);

        cnv.mark_completed(AnnotationStep::BoundaryOverlap);
        assert_eq!(cnv.stage(), AnnotationStage::Raw);
        cnv.mark_completed(AnnotationStep::GeneOverlap);
        assert_eq!(cnv.stage(), AnnotationStage::AdjacencyDefined);

        cnv.mark_completed(AnnotationStep::AdjacentPhenogram);
        cnv.mark_completed(AnnotationStep::Tdbd);
        assert_eq!(cnv.stage(), AnnotationStage::Classified);
        assert!(cnv.has_completed(AnnotationStep::Tdbd));
    }

    #[test]
    fn test_prerequisites() {
        assert!(AnnotationStep::BoundaryOverlap.prerequisites().is_empty());
        // adjacency only reads the CNV coordinates
        assert!(AnnotationStep::AdjacentRegions.prerequisites().is_empty());
        // scoring reads the resolved patient terms
        assert_eq!(AnnotationStep::GeneOverlap.prerequisites(), &[AnnotationStep::PhenotypeResolution]);
        assert_eq!(
            AnnotationStep::AdjacentPhenogram.prerequisites(),
            &[AnnotationStep::PhenotypeResolution, AnnotationStep::AdjacentRegions]
        );
        assert!(AnnotationStep::Tdbd.prerequisites().contains(&AnnotationStep::BoundaryOverlap));
    }
}
