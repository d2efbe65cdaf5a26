
use derive_builder::Builder;
use indicatif::ParallelProgressIterator;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::BTreeSet;

use crate::data_types::cnv::{AnnotationStep, Cnv};
use crate::data_types::gene::Gene;
use crate::data_types::genomic_element::{GenomicElement, GenomicFeature};
use crate::data_types::genomic_set::GenomicSet;
use crate::phenotype::ontology::{OntologyError, TermIndex};
use crate::phenotype::phenotype_data::PhenotypeData;
use crate::util::progress_bar::stage_progress_bar;

/// Name given to the remainder of the left flanking domain
pub const LEFT_ADJACENT_REGION: &str = "leftAdjacentRegion";
/// Name given to the remainder of the right flanking domain
pub const RIGHT_ADJACENT_REGION: &str = "rightAdjacentRegion";

/// Controls the annotation stages
#[derive(Builder, Clone, Copy, Debug, Default)]
#[builder(default)]
pub struct AnnotationConfig {
    /// An adjacent phenogram score must exceed the overlap score by more than this to count as dominant
    score_margin: f64,
    /// if True, renders a progress bar for each parallel stage
    show_progress: bool,
}

impl AnnotationConfig {
    // getters
    pub fn score_margin(&self) -> f64 {
        self.score_margin
    }

    pub fn show_progress(&self) -> bool {
        self.show_progress
    }
}

/// The shared, read-only reference annotations that CNVs are compared against
#[derive(Debug, Default)]
pub struct ReferenceData {
    /// Genes with resolved phenotype terms
    genes: GenomicSet<Gene>,
    /// Topological domains
    domains: GenomicSet<GenomicElement>,
    /// Domain boundaries
    boundaries: GenomicSet<GenomicElement>,
    /// Enhancers
    enhancers: GenomicSet<GenomicElement>,
}

impl ReferenceData {
    pub fn new(
        genes: GenomicSet<Gene>, domains: GenomicSet<GenomicElement>,
        boundaries: GenomicSet<GenomicElement>, enhancers: GenomicSet<GenomicElement>
    ) -> Self {
        Self {
            genes, domains, boundaries, enhancers
        }
    }

    // getters
    pub fn genes(&self) -> &GenomicSet<Gene> {
        &self.genes
    }

    pub fn domains(&self) -> &GenomicSet<GenomicElement> {
        &self.domains
    }

    pub fn boundaries(&self) -> &GenomicSet<GenomicElement> {
        &self.boundaries
    }

    pub fn enhancers(&self) -> &GenomicSet<GenomicElement> {
        &self.enhancers
    }
}

/// Resolves the patient phenotype terms and the target term of each CNV.
/// CNVs without their own phenotype accessions receive `default_terms`.
/// # Arguments
/// * `cnvs` - the CNVs to update
/// * `phenotype_data` - ontology used for lookup, alternate accessions included
/// * `default_terms` - run-wide patient terms
/// # Errors
/// * if any accession is not in the ontology
pub fn resolve_cnv_phenotypes(
    cnvs: &mut GenomicSet<Cnv>, phenotype_data: &PhenotypeData, default_terms: &BTreeSet<TermIndex>
) -> Result<(), OntologyError> {
    let mut defaulted = 0;
    for cnv in cnvs.values_mut() {
        let terms = if cnv.phenotype_term_ids().is_empty() {
            defaulted += 1;
            default_terms.clone()
        } else {
            phenotype_data.resolve_terms(cnv.phenotype_term_ids())?
        };
        let target = cnv.target_term_id()
            .map(|id| phenotype_data.term_including_alternatives(id))
            .transpose()?;
        cnv.set_phenotype_terms(terms);
        cnv.set_target_term(target);
        cnv.mark_completed(AnnotationStep::PhenotypeResolution);
    }
    debug!("Resolved phenotypes for {} CNVs ({defaulted} using the default patient terms)", cnvs.len());
    Ok(())
}

/// Records the boundaries each CNV overlaps.
pub fn boundary_overlap(cnvs: &mut GenomicSet<Cnv>, boundaries: &GenomicSet<GenomicElement>, config: AnnotationConfig) {
    run_stage(cnvs, AnnotationStep::BoundaryOverlap, config, |cnv| {
        let hits: Vec<GenomicElement> = boundaries.overlapping(cnv.element()).into_iter()
            .cloned()
            .collect();
        cnv.set_boundary_overlap(hits);
    });
}

/// Records the genes each CNV overlaps and scores them against the patient phenotype.
pub fn gene_overlap(cnvs: &mut GenomicSet<Cnv>, genes: &GenomicSet<Gene>, phenotype_data: &PhenotypeData, config: AnnotationConfig) {
    run_stage(cnvs, AnnotationStep::GeneOverlap, config, |cnv| {
        cnv.set_genes(genes.overlapping_set(cnv.element()));
        score_overlap_genes(cnv, phenotype_data);
    });
}

/// Recomputes the overlap phenogram score from the genes already attached to each CNV.
pub fn phenogram_score(cnvs: &mut GenomicSet<Cnv>, phenotype_data: &PhenotypeData) {
    warn_missing_prerequisites(cnvs, "phenogram score", &[AnnotationStep::PhenotypeResolution, AnnotationStep::GeneOverlap]);
    let targets: Vec<&mut Cnv> = cnvs.values_mut().collect();
    targets.into_par_iter().for_each(|cnv| score_overlap_genes(cnv, phenotype_data));
}

/// Lists the overlapped genes that are annotated to each CNV's target term (or a descendant of it).
/// CNVs without a target term get an empty list.
pub fn target_term_genes(cnvs: &mut GenomicSet<Cnv>, phenotype_data: &PhenotypeData) {
    warn_missing_prerequisites(cnvs, "target term genes", &[AnnotationStep::GeneOverlap]);
    let targets: BTreeSet<TermIndex> = cnvs.values()
        .filter_map(|cnv| cnv.target_term())
        .collect();
    let term_to_genes = phenotype_data.map_target_term_to_genes(&targets);
    for cnv in cnvs.values_mut() {
        let genes: Vec<String> = match cnv.target_term().and_then(|t| term_to_genes.get(&t)) {
            Some(associated) => cnv.genes().keys()
                .filter(|gene_id| associated.contains(*gene_id))
                .cloned()
                .collect(),
            None => vec![]
        };
        cnv.set_target_genes(genes);
    }
}

/// Derives the adjacent regions of each CNV from the topological domains it starts and ends in.
/// The left flanking domain contains the CNV start (smallest start wins), the right one contains the last CNV base (largest end wins).
/// Both must exist; the regions are the parts of those domains outside the CNV, and an empty part is left unset.
pub fn define_adjacent_regions_by_domains(cnvs: &mut GenomicSet<Cnv>, domains: &GenomicSet<GenomicElement>, config: AnnotationConfig) {
    run_stage(cnvs, AnnotationStep::AdjacentRegions, config, |cnv| {
        let (left, right) = adjacent_regions(cnv.element(), domains);
        cnv.set_adjacent_regions(left, right);
    });
}

/// Scores the genes in each adjacent region; a missing region scores 0.0.
pub fn phenogram_score_adjacent_genes(
    cnvs: &mut GenomicSet<Cnv>, genes: &GenomicSet<Gene>, phenotype_data: &PhenotypeData, config: AnnotationConfig
) {
    run_stage(cnvs, AnnotationStep::AdjacentPhenogram, config, |cnv| {
        let (left_genes, left_score) = score_region(cnv.left_adjacent_region(), cnv.phenotype_terms(), genes, phenotype_data);
        let (right_genes, right_score) = score_region(cnv.right_adjacent_region(), cnv.phenotype_terms(), genes, phenotype_data);
        cnv.set_left_adjacent(left_genes, left_score);
        cnv.set_right_adjacent(right_genes, right_score);
    });
}

/// Classifies each CNV as a topological domain boundary disruption (TDBD).
/// A CNV is a TDBD when it overlaps a boundary and an enhancer in one adjacent region could be brought next to
/// genes on the opposite side whose phenogram score beats the overlap score by more than the configured margin.
pub fn annotate_tdbd(cnvs: &mut GenomicSet<Cnv>, enhancers: &GenomicSet<GenomicElement>, config: AnnotationConfig) {
    let margin = config.score_margin();
    run_stage(cnvs, AnnotationStep::Tdbd, config, |cnv| {
        let direct: Vec<GenomicElement> = enhancers.overlapping(cnv.element()).into_iter()
            .cloned()
            .collect();
        let left_enhancers = cnv.left_adjacent_region()
            .map(|region| enhancers.overlapping(region).len())
            .unwrap_or(0);
        let right_enhancers = cnv.right_adjacent_region()
            .map(|region| enhancers.overlapping(region).len())
            .unwrap_or(0);

        let overlap_score = cnv.overlap_phenogram_score();
        let left_adoption = left_enhancers > 0 && cnv.right_adjacent_phenogram_score() > overlap_score + margin;
        let right_adoption = right_enhancers > 0 && cnv.left_adjacent_phenogram_score() > overlap_score + margin;
        let is_tdbd = !cnv.boundary_overlap().is_empty() && (left_adoption || right_adoption);

        cnv.set_enhancer_evidence(direct, left_enhancers, right_enhancers);
        cnv.set_tdbd(is_tdbd);
    });
}

/// Runs every stage in order.
/// # Arguments
/// * `cnvs` - the CNVs to annotate
/// * `reference` - genes, domains, boundaries, and enhancers
/// * `phenotype_data` - ontology and gene annotations
/// * `default_terms` - patient terms for CNVs that do not carry their own
/// * `config` - stage parameters
/// # Errors
/// * if a CNV references an accession that is not in the ontology
pub fn annotate_all(
    cnvs: &mut GenomicSet<Cnv>, reference: &ReferenceData, phenotype_data: &PhenotypeData,
    default_terms: &BTreeSet<TermIndex>, config: AnnotationConfig
) -> Result<(), OntologyError> {
    resolve_cnv_phenotypes(cnvs, phenotype_data, default_terms)?;

    info!("Annotating boundary overlaps...");
    boundary_overlap(cnvs, reference.boundaries(), config);
    info!("Annotating gene overlaps...");
    gene_overlap(cnvs, reference.genes(), phenotype_data, config);
    target_term_genes(cnvs, phenotype_data);
    info!("Defining adjacent regions...");
    define_adjacent_regions_by_domains(cnvs, reference.domains(), config);
    info!("Scoring adjacent genes...");
    phenogram_score_adjacent_genes(cnvs, reference.genes(), phenotype_data, config);
    info!("Classifying TDBD candidates...");
    annotate_tdbd(cnvs, reference.enhancers(), config);

    let num_tdbd = cnvs.values().filter(|cnv| cnv.is_tdbd()).count();
    info!("Annotation complete: {num_tdbd} / {} CNVs classified as TDBD", cnvs.len());
    Ok(())
}

/// Finds the adjacent regions for a single CNV
fn adjacent_regions(cnv: &GenomicElement, domains: &GenomicSet<GenomicElement>) -> (Option<GenomicElement>, Option<GenomicElement>) {
    let hits = domains.overlapping(cnv);
    let left_domain = hits.iter()
        .filter(|d| d.contains_position(cnv.chrom(), cnv.start()))
        .min_by_key(|d| d.start());
    let right_domain = hits.iter()
        .filter(|d| d.contains_position(cnv.chrom(), cnv.end() - 1))
        .max_by_key(|d| d.end());

    match (left_domain, right_domain) {
        (Some(left), Some(right)) => {
            // an empty remainder fails the range check and is simply not a region
            let left_region = GenomicElement::new(cnv.chrom(), left.start(), cnv.start(), LEFT_ADJACENT_REGION).ok();
            let right_region = GenomicElement::new(cnv.chrom(), cnv.end(), right.end(), RIGHT_ADJACENT_REGION).ok();
            (left_region, right_region)
        },
        _ => (None, None)
    }
}

/// Scores the genes attached to a CNV and keeps the best gene with its term matches
fn score_overlap_genes(cnv: &mut Cnv, phenotype_data: &PhenotypeData) {
    let best = phenotype_data.best_pheno_match(cnv.phenotype_terms(), cnv.genes().values())
        .map(|(gene, score)| {
            let pairs = phenotype_data.pheno_match_pairs(cnv.phenotype_terms(), gene);
            (gene.name().to_string(), score, pairs)
        });
    match best {
        Some((gene, score, pairs)) => cnv.set_overlap_phenogram(score, Some(gene), pairs),
        None => cnv.set_overlap_phenogram(0.0, None, vec![])
    }
}

/// Returns the names of the genes in the region and their phenogram score
fn score_region(
    region: Option<&GenomicElement>, patient_terms: &BTreeSet<TermIndex>,
    genes: &GenomicSet<Gene>, phenotype_data: &PhenotypeData
) -> (Vec<String>, f64) {
    match region {
        Some(r) => {
            let hits = genes.overlapping(r);
            let score = phenotype_data.pheno_gram_score(patient_terms, hits.iter().copied());
            let names = hits.iter().map(|g| g.name().to_string()).collect();
            (names, score)
        },
        None => (vec![], 0.0)
    }
}

/// Counts the CNVs missing at least one of the given steps
fn count_missing_prerequisites(cnvs: &GenomicSet<Cnv>, prerequisites: &[AnnotationStep]) -> usize {
    cnvs.values()
        .filter(|cnv| prerequisites.iter().any(|&step| !cnv.has_completed(step)))
        .count()
}

/// Logs how many CNVs are missing results from earlier steps
fn warn_missing_prerequisites(cnvs: &GenomicSet<Cnv>, label: &str, prerequisites: &[AnnotationStep]) {
    let missing = count_missing_prerequisites(cnvs, prerequisites);
    if missing > 0 {
        warn!("Running {label} with {missing} CNVs missing one of {prerequisites:?}, missing values default to empty or 0.0");
    }
}

/// Shared stage driver: checks prerequisites, applies `op` to every CNV in parallel, and records the step.
fn run_stage<F>(cnvs: &mut GenomicSet<Cnv>, step: AnnotationStep, config: AnnotationConfig, op: F)
where
    F: Fn(&mut Cnv) + Sync + Send
{
    warn_missing_prerequisites(cnvs, &step.to_string(), step.prerequisites());
    let progress = stage_progress_bar(cnvs.len(), &step.to_string(), config.show_progress());

    let targets: Vec<&mut Cnv> = cnvs.values_mut().collect();
    targets.into_par_iter()
        .progress_with(progress)
        .for_each(|cnv| {
            op(cnv);
            cnv.mark_completed(step);
        });
    debug!("{step} applied to {} CNVs", cnvs.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    use std::path::PathBuf;

    use crate::data_types::cnv::{AnnotationStage, CnvType};
    use crate::parsing::ontology_json::load_phenotype_data;
    use crate::parsing::tab_file::{load_cnvs, load_elements, load_genes};
    use crate::phenotype::ontology::{Ontology, TermDefinition};

    fn ge(start: i32, end: i32, name: &str) -> GenomicElement {
        GenomicElement::new("chr1", start, end, name).unwrap()
    }

    fn toy_phenotype_data() -> PhenotypeData {
        let def = |id: &str, parents: &[&str]| TermDefinition {
            id: id.to_string(),
            name: String::new(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            alt_ids: vec![]
        };
        let ontology = Ontology::new(vec![
            def("EP:00", &[]),
            def("EP:01", &["EP:00"]),
            def("EP:02", &["EP:00"]),
            def("EP:03", &["EP:01"]),
            def("EP:04", &["EP:02"]),
            def("EP:05", &["EP:02"]),
            def("EP:06", &["EP:04", "EP:05"]),
            def("EP:07", &["EP:05"]),
        ]).unwrap();
        let pairs = vec![
            ("geneA", "EP:04"),
            ("geneA", "EP:05"),
            ("geneB", "EP:07"),
            ("geneC", "EP:03"),
            ("geneD", "EP:05"),
        ];
        PhenotypeData::from_annotation_pairs(ontology, pairs).unwrap()
    }

    fn toy_reference(phenotype_data: &PhenotypeData) -> ReferenceData {
        let mut genes = GenomicSet::from_elements(vec![
            Gene::new(ge(26, 32, "geneA"), vec![]),
            Gene::new(ge(10, 14, "geneB"), vec![]),
            Gene::new(ge(2, 5, "geneC"), vec![]),
            Gene::new(ge(18, 20, "geneD"), vec![]),
        ]).unwrap();
        phenotype_data.annotate_gene_terms(&mut genes).unwrap();

        let domains = GenomicSet::from_elements(vec![ge(0, 12, "domain1"), ge(15, 37, "domain2")]).unwrap();
        let boundaries = GenomicSet::from_elements(vec![ge(12, 15, "boundary1")]).unwrap();
        let enhancers = GenomicSet::from_elements(vec![ge(2, 4, "enhancer1"), ge(26, 28, "enhancer2")]).unwrap();
        ReferenceData::new(genes, domains, boundaries, enhancers)
    }

    fn toy_cnvs() -> GenomicSet<Cnv> {
        GenomicSet::from_elements(vec![
            Cnv::new(ge(9, 19, "cnv1"), CnvType::Loss),
            Cnv::new(ge(8, 33, "cnv2"), CnvType::Loss),
            Cnv::new(ge(12, 19, "cnv3"), CnvType::Gain),
            Cnv::new(ge(14, 16, "cnv4"), CnvType::Gain),
        ]).unwrap()
    }

    fn patient_terms(phenotype_data: &PhenotypeData) -> BTreeSet<TermIndex> {
        phenotype_data.resolve_terms(&["EP:06"]).unwrap()
    }

    fn fully_annotated() -> GenomicSet<Cnv> {
        let phenotype_data = toy_phenotype_data();
        let reference = toy_reference(&phenotype_data);
        let mut cnvs = toy_cnvs();
        annotate_all(&mut cnvs, &reference, &phenotype_data, &patient_terms(&phenotype_data), AnnotationConfig::default()).unwrap();
        cnvs
    }

    #[test]
    fn test_boundary_overlap() {
        let phenotype_data = toy_phenotype_data();
        let reference = toy_reference(&phenotype_data);
        let mut cnvs = toy_cnvs();
        boundary_overlap(&mut cnvs, reference.boundaries(), AnnotationConfig::default());

        let counts: Vec<usize> = cnvs.values().map(|c| c.boundary_overlap().len()).collect();
        assert_eq!(counts, vec![1, 1, 1, 1]);
        assert_eq!(cnvs.get("cnv1").unwrap().boundary_overlap()[0].name(), "boundary1");
        assert!(cnvs.values().all(|c| c.has_completed(AnnotationStep::BoundaryOverlap)));
    }

    #[test]
    fn test_gene_overlap() {
        let phenotype_data = toy_phenotype_data();
        let reference = toy_reference(&phenotype_data);
        let mut cnvs = toy_cnvs();
        resolve_cnv_phenotypes(&mut cnvs, &phenotype_data, &patient_terms(&phenotype_data)).unwrap();
        gene_overlap(&mut cnvs, reference.genes(), &phenotype_data, AnnotationConfig::default());

        let cnv1 = cnvs.get("cnv1").unwrap();
        assert_eq!(cnv1.genes().keys().cloned().collect::<Vec<String>>(), vec!["geneB", "geneD"]);
        assert!((cnv1.overlap_phenogram_score() - 0.29).abs() < 0.01);

        assert_eq!(cnv1.overlap_best_gene(), Some("geneB"));

        let cnv2 = cnvs.get("cnv2").unwrap();
        assert_eq!(cnv2.genes().len(), 3);
        assert!((cnv2.overlap_phenogram_score() - 1.68).abs() < 0.01);
        assert_eq!(cnv2.overlap_best_gene(), Some("geneA"));
        let pairs: Vec<String> = cnv2.overlap_term_pairs().iter().map(|p| p.to_string()).collect();
        assert_eq!(pairs, vec!["EP:06>EP:04=1.386", "EP:06>EP:05=0.288"]);

        let cnv4 = cnvs.get("cnv4").unwrap();
        assert!(cnv4.genes().is_empty());
        assert_eq!(cnv4.overlap_phenogram_score(), 0.0);
        assert_eq!(cnv4.overlap_best_gene(), None);
        assert!(cnv4.overlap_term_pairs().is_empty());
    }

    #[test]
    fn test_unresolved_phenotypes_are_flagged() {
        let phenotype_data = toy_phenotype_data();
        let mut cnvs = toy_cnvs();
        let scoring = AnnotationStep::GeneOverlap.prerequisites();
        assert_eq!(count_missing_prerequisites(&cnvs, scoring), 4);

        resolve_cnv_phenotypes(&mut cnvs, &phenotype_data, &patient_terms(&phenotype_data)).unwrap();
        assert!(cnvs.values().all(|c| c.has_completed(AnnotationStep::PhenotypeResolution)));
        assert_eq!(count_missing_prerequisites(&cnvs, scoring), 0);

        // adjacency alone needs nothing before it
        let reference = toy_reference(&phenotype_data);
        let mut fresh = toy_cnvs();
        assert_eq!(count_missing_prerequisites(&fresh, AnnotationStep::AdjacentRegions.prerequisites()), 0);
        define_adjacent_regions_by_domains(&mut fresh, reference.domains(), AnnotationConfig::default());
        assert!(fresh.get("cnv1").unwrap().left_adjacent_region().is_some());
    }

    #[test]
    fn test_define_adjacent_regions() {
        let phenotype_data = toy_phenotype_data();
        let reference = toy_reference(&phenotype_data);
        let mut cnvs = toy_cnvs();
        define_adjacent_regions_by_domains(&mut cnvs, reference.domains(), AnnotationConfig::default());

        let cnv1 = cnvs.get("cnv1").unwrap();
        let left = cnv1.left_adjacent_region().unwrap();
        assert_eq!((left.start(), left.end(), left.name()), (0, 9, LEFT_ADJACENT_REGION));
        let right = cnv1.right_adjacent_region().unwrap();
        assert_eq!((right.start(), right.end(), right.name()), (19, 37, RIGHT_ADJACENT_REGION));

        let cnv2 = cnvs.get("cnv2").unwrap();
        assert_eq!(cnv2.left_adjacent_region().unwrap().end(), 8);
        assert_eq!(cnv2.right_adjacent_region().unwrap().start(), 33);

        // starts in the boundary gap, so there is no left flanking domain
        for name in ["cnv3", "cnv4"] {
            let cnv = cnvs.get(name).unwrap();
            assert!(cnv.left_adjacent_region().is_none());
            assert!(cnv.right_adjacent_region().is_none());
        }
    }

    #[test]
    fn test_adjacent_region_empty_remainder() {
        let domains = GenomicSet::from_elements(vec![ge(0, 12, "domain1"), ge(15, 37, "domain2")]).unwrap();

        // CNV starts exactly at the domain start, the left remainder is empty
        let (left, right) = adjacent_regions(&ge(0, 20, "cnv"), &domains);
        assert!(left.is_none());
        assert_eq!(right.unwrap().start(), 20);

        // CNV ends exactly at the domain end
        let (left, right) = adjacent_regions(&ge(5, 37, "cnv"), &domains);
        assert_eq!(left.unwrap().end(), 5);
        assert!(right.is_none());

        // nested domains: the outermost flanks win
        let nested = GenomicSet::from_elements(vec![ge(5, 30, "inner"), ge(0, 40, "outer")]).unwrap();
        let (left, right) = adjacent_regions(&ge(10, 20, "cnv"), &nested);
        assert_eq!(left.unwrap().start(), 0);
        assert_eq!(right.unwrap().end(), 40);
    }

    #[test]
    fn test_phenogram_score_adjacent_genes() {
        let cnvs = fully_annotated();
        let cnv1 = cnvs.get("cnv1").unwrap();
        assert_eq!(cnv1.left_adjacent_genes(), &["geneC".to_string()]);
        assert_eq!(cnv1.left_adjacent_phenogram_score(), 0.0);
        assert_eq!(cnv1.right_adjacent_genes(), &["geneA".to_string(), "geneD".to_string()]);
        assert!((cnv1.right_adjacent_phenogram_score() - 1.68).abs() < 0.01);

        let cnv4 = cnvs.get("cnv4").unwrap();
        assert_eq!(cnv4.left_adjacent_phenogram_score(), 0.0);
        assert_eq!(cnv4.right_adjacent_phenogram_score(), 0.0);
    }

    #[test]
    fn test_annotate_all_toy() {
        let cnvs = fully_annotated();
        let tdbd: Vec<bool> = cnvs.values().map(|c| c.is_tdbd()).collect();
        assert_eq!(tdbd, vec![true, false, false, false]);

        let cnv1 = cnvs.get("cnv1").unwrap();
        assert_eq!(cnv1.left_adjacent_enhancers(), 1);
        assert_eq!(cnv1.right_adjacent_enhancers(), 1);
        assert!(cnv1.enhancer_overlap().is_empty());
        assert_eq!(cnv1.stage(), AnnotationStage::Classified);

        let cnv2 = cnvs.get("cnv2").unwrap();
        assert_eq!(cnv2.enhancer_overlap().len(), 1);
        assert!((cnv2.overlap_phenogram_score() - 1.68).abs() < 0.01);
        assert!(cnvs.values().all(|c| c.stage() == AnnotationStage::Classified));
    }

    #[test]
    fn test_score_margin() {
        let phenotype_data = toy_phenotype_data();
        let reference = toy_reference(&phenotype_data);
        let config = AnnotationConfigBuilder::default()
            .score_margin(2.0)
            .build().unwrap();
        let mut cnvs = toy_cnvs();
        annotate_all(&mut cnvs, &reference, &phenotype_data, &patient_terms(&phenotype_data), config).unwrap();

        // 1.68 does not beat 0.29 by more than 2.0
        assert!(cnvs.values().all(|c| !c.is_tdbd()));
    }

    #[test]
    fn test_stages_idempotent() {
        let phenotype_data = toy_phenotype_data();
        let reference = toy_reference(&phenotype_data);
        let mut cnvs = fully_annotated();
        let config = AnnotationConfig::default();

        boundary_overlap(&mut cnvs, reference.boundaries(), config);
        gene_overlap(&mut cnvs, reference.genes(), &phenotype_data, config);
        phenogram_score(&mut cnvs, &phenotype_data);
        define_adjacent_regions_by_domains(&mut cnvs, reference.domains(), config);
        phenogram_score_adjacent_genes(&mut cnvs, reference.genes(), &phenotype_data, config);
        annotate_tdbd(&mut cnvs, reference.enhancers(), config);

        let cnv1 = cnvs.get("cnv1").unwrap();
        assert_eq!(cnv1.boundary_overlap().len(), 1);
        assert_eq!(cnv1.genes().len(), 2);
        assert_eq!(cnv1.right_adjacent_genes().len(), 2);
        assert_eq!(cnv1.left_adjacent_enhancers(), 1);
        assert!((cnv1.overlap_phenogram_score() - 0.29).abs() < 0.01);
        assert!(cnv1.is_tdbd());
    }

    #[test]
    fn test_out_of_order_scores_zero() {
        let phenotype_data = toy_phenotype_data();
        let reference = toy_reference(&phenotype_data);
        let mut cnvs = toy_cnvs();
        resolve_cnv_phenotypes(&mut cnvs, &phenotype_data, &patient_terms(&phenotype_data)).unwrap();
        let config = AnnotationConfig::default();

        // no adjacent regions yet, so nothing to score
        phenogram_score_adjacent_genes(&mut cnvs, reference.genes(), &phenotype_data, config);
        annotate_tdbd(&mut cnvs, reference.enhancers(), config);
        for cnv in cnvs.values() {
            assert_eq!(cnv.left_adjacent_phenogram_score(), 0.0);
            assert_eq!(cnv.right_adjacent_phenogram_score(), 0.0);
            assert!(!cnv.is_tdbd());
            assert_eq!(cnv.stage(), AnnotationStage::Raw);
        }

        // no genes attached yet
        phenogram_score(&mut cnvs, &phenotype_data);
        assert!(cnvs.values().all(|c| c.overlap_phenogram_score() == 0.0));
    }

    #[test]
    fn test_resolve_cnv_phenotypes() {
        let phenotype_data = toy_phenotype_data();
        let mut cnvs = GenomicSet::from_elements(vec![
            Cnv::new(ge(9, 19, "own"), CnvType::Loss)
                .with_phenotypes(vec!["EP:03".to_string()], Some("EP:05".to_string())),
            Cnv::new(ge(8, 33, "default"), CnvType::Loss),
        ]).unwrap();
        let defaults = patient_terms(&phenotype_data);
        resolve_cnv_phenotypes(&mut cnvs, &phenotype_data, &defaults).unwrap();

        let own = cnvs.get("own").unwrap();
        assert_eq!(own.phenotype_terms(), &phenotype_data.resolve_terms(&["EP:03"]).unwrap());
        assert_eq!(own.target_term(), Some(phenotype_data.term_including_alternatives("EP:05").unwrap()));
        assert_eq!(cnvs.get("default").unwrap().phenotype_terms(), &defaults);

        let mut bad = GenomicSet::from_elements(vec![
            Cnv::new(ge(9, 19, "bad"), CnvType::Loss).with_phenotypes(vec![], Some("EP:99".to_string())),
        ]).unwrap();
        assert!(resolve_cnv_phenotypes(&mut bad, &phenotype_data, &defaults).is_err());
    }

    #[test]
    fn test_chr22_boundary_overlap_count() {
        let boundaries = load_elements(&PathBuf::from("test_data/chr22/boundaries.bed")).unwrap();
        let mut cnvs = load_cnvs(&PathBuf::from("test_data/chr22/cnvs.tsv")).unwrap();
        assert_eq!(boundaries.len(), 30);
        assert_eq!(cnvs.len(), 62);

        boundary_overlap(&mut cnvs, &boundaries, AnnotationConfig::default());
        let overlapping = cnvs.values().filter(|c| !c.boundary_overlap().is_empty()).count();
        assert_eq!(overlapping, 34);
    }

    #[test]
    fn test_annotate_all_from_files() {
        let phenotype_data = load_phenotype_data(
            &PathBuf::from("test_data/toy/ontology.json"),
            &PathBuf::from("test_data/toy/annotations.tsv")
        ).unwrap();
        let mut genes = load_genes(&PathBuf::from("test_data/toy/genes.tsv")).unwrap();
        phenotype_data.annotate_gene_terms(&mut genes).unwrap();
        let reference = ReferenceData::new(
            genes,
            load_elements(&PathBuf::from("test_data/toy/domains.bed")).unwrap(),
            load_elements(&PathBuf::from("test_data/toy/boundaries.bed")).unwrap(),
            load_elements(&PathBuf::from("test_data/toy/enhancers.bed.gz")).unwrap()
        );
        let mut cnvs = load_cnvs(&PathBuf::from("test_data/toy/cnvs.tsv")).unwrap();

        // CNVs without their own terms take the alternate accession of EP:06
        let defaults = phenotype_data.resolve_terms(&["EP:16"]).unwrap();
        annotate_all(&mut cnvs, &reference, &phenotype_data, &defaults, AnnotationConfig::default()).unwrap();

        let tdbd: Vec<(&str, bool)> = cnvs.values().map(|c| (c.name(), c.is_tdbd())).collect();
        assert_eq!(tdbd, vec![("cnv1", true), ("cnv2", false), ("cnv3", false), ("cnv4", false)]);
        assert!((cnvs.get("cnv1").unwrap().overlap_phenogram_score() - 0.29).abs() < 0.01);
        assert!((cnvs.get("cnv2").unwrap().overlap_phenogram_score() - 1.68).abs() < 0.01);
        assert_eq!(cnvs.get("cnv1").unwrap().target_genes(), &["geneB".to_string(), "geneD".to_string()]);
    }

    #[test]
    fn test_target_term_genes() {
        let phenotype_data = toy_phenotype_data();
        let reference = toy_reference(&phenotype_data);
        let mut cnvs = GenomicSet::from_elements(vec![
            Cnv::new(ge(8, 33, "cnv2"), CnvType::Loss).with_phenotypes(vec![], Some("EP:05".to_string())),
            Cnv::new(ge(9, 19, "cnv1"), CnvType::Loss),
        ]).unwrap();
        annotate_all(&mut cnvs, &reference, &phenotype_data, &patient_terms(&phenotype_data), AnnotationConfig::default()).unwrap();

        // geneA, geneB, and geneD all reach EP:05; listed in gene insertion order
        assert_eq!(cnvs.get("cnv2").unwrap().target_genes(), &["geneA".to_string(), "geneB".to_string(), "geneD".to_string()]);
        assert!(cnvs.get("cnv1").unwrap().target_genes().is_empty());
        assert_approx_eq!(cnvs.get("cnv2").unwrap().overlap_phenogram_score(),
            phenotype_data.pheno_match_score(&patient_terms(&phenotype_data), reference.genes().get("geneA").unwrap()));
    }
}
