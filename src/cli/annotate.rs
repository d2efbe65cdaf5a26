
use anyhow::bail;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{check_output_filename, check_required_filename, AFTER_HELP, FULL_VERSION};
use crate::parsing::tab_file::split_term_ids;

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct AnnotateSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    tadsift_version: String,

    /// CNVs to annotate (TSV: chrom, start, end, name, [type, [terms, [target term]]])
    #[clap(required = true)]
    #[clap(short = 'c')]
    #[clap(long = "cnvs")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub cnv_filename: PathBuf,

    /// Genes with optional phenotype terms (TSV: chrom, start, end, name, [terms, [symbol]])
    #[clap(required = true)]
    #[clap(short = 'g')]
    #[clap(long = "genes")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub gene_filename: PathBuf,

    /// Topological domains (BED)
    #[clap(required = true)]
    #[clap(short = 'd')]
    #[clap(long = "domains")]
    #[clap(value_name = "BED")]
    #[clap(help_heading = Some("Input/Output"))]
    pub domain_filename: PathBuf,

    /// Topological domain boundaries (BED)
    #[clap(required = true)]
    #[clap(short = 'b')]
    #[clap(long = "boundaries")]
    #[clap(value_name = "BED")]
    #[clap(help_heading = Some("Input/Output"))]
    pub boundary_filename: PathBuf,

    /// Enhancers (BED)
    #[clap(required = true)]
    #[clap(short = 'e')]
    #[clap(long = "enhancers")]
    #[clap(value_name = "BED")]
    #[clap(help_heading = Some("Input/Output"))]
    pub enhancer_filename: PathBuf,

    /// Phenotype ontology term table
    #[clap(required = true)]
    #[clap(short = 't')]
    #[clap(long = "ontology")]
    #[clap(value_name = "JSON")]
    #[clap(help_heading = Some("Input/Output"))]
    pub ontology_filename: PathBuf,

    /// Gene to phenotype term annotations (TSV: gene, term)
    #[clap(required = true)]
    #[clap(short = 'a')]
    #[clap(long = "annotations")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub annotation_filename: PathBuf,

    /// Output annotated CNV table (.tsv or .csv)
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_filename: PathBuf,

    /// Optional JSON copy of the annotated CNV table (.json or .json.gz)
    #[clap(long = "output-json")]
    #[clap(value_name = "JSON")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_json: Option<PathBuf>,

    /// Patient phenotype terms for CNVs without their own, comma separated
    #[clap(long = "phenotypes")]
    #[clap(value_name = "TERMS")]
    #[clap(help_heading = Some("Scoring parameters"))]
    #[clap(default_value = "")]
    pub phenotypes: String,

    /// Minimum amount an adjacent phenogram score must beat the overlap score by
    #[clap(long = "score-margin")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Scoring parameters"))]
    #[clap(default_value = "0.0")]
    pub score_margin: f64,

    /// Number of threads to use in the annotation steps
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: usize,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl AnnotateSettings {
    /// The parsed `--phenotypes` list
    pub fn patient_term_ids(&self) -> Vec<String> {
        split_term_ids(&self.phenotypes)
    }
}

pub fn check_annotate_settings(mut settings: AnnotateSettings) -> anyhow::Result<AnnotateSettings> {
    // hard code the version in
    settings.tadsift_version = FULL_VERSION.clone();
    info!("tadsift version: {:?}", &settings.tadsift_version);
    info!("Sub-command: annotate");
    info!("Inputs:");

    // check for all the required input files
    check_required_filename(&settings.cnv_filename, "CNV file")?;
    check_required_filename(&settings.gene_filename, "Gene file")?;
    check_required_filename(&settings.domain_filename, "Domain file")?;
    check_required_filename(&settings.boundary_filename, "Boundary file")?;
    check_required_filename(&settings.enhancer_filename, "Enhancer file")?;
    check_required_filename(&settings.ontology_filename, "Ontology file")?;
    check_required_filename(&settings.annotation_filename, "Annotation file")?;

    // dump stuff to the logger
    info!("\tCNVs: {:?}", &settings.cnv_filename);
    info!("\tGenes: {:?}", &settings.gene_filename);
    info!("\tDomains: {:?}", &settings.domain_filename);
    info!("\tBoundaries: {:?}", &settings.boundary_filename);
    info!("\tEnhancers: {:?}", &settings.enhancer_filename);
    info!("\tOntology: {:?}", &settings.ontology_filename);
    info!("\tAnnotations: {:?}", &settings.annotation_filename);

    // outputs
    check_output_filename(&settings.output_filename, "Output")?;
    info!("Outputs:");
    info!("\tAnnotated CNVs: {:?}", &settings.output_filename);
    if let Some(json_fn) = settings.output_json.as_deref() {
        check_output_filename(json_fn, "JSON output")?;
        info!("\tAnnotated CNVs (JSON): {json_fn:?}");
    }

    // scoring parameters
    info!("Scoring parameters:");
    let patient_terms = settings.patient_term_ids();
    if patient_terms.is_empty() {
        info!("\tDefault patient phenotypes: None");
    } else {
        info!("\tDefault patient phenotypes: {patient_terms:?}");
    }
    if !settings.score_margin.is_finite() || settings.score_margin < 0.0 {
        bail!("--score-margin must be a finite value >=0.0");
    }
    info!("\tScore margin: {}", settings.score_margin);

    if settings.threads == 0 {
        settings.threads = 1;
    }
    info!("Processing threads: {}", settings.threads);

    Ok(settings)
}
