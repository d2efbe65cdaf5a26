
use log::{LevelFilter, error, info};
use std::path::Path;
use std::time::Instant;

use tadsift::annotate_cnvs::{AnnotationConfigBuilder, ReferenceData, annotate_all};
use tadsift::cli::annotate::{AnnotateSettings, check_annotate_settings};
use tadsift::cli::core::{Commands, get_cli};
use tadsift::data_types::genomic_element::GenomicElement;
use tadsift::data_types::genomic_set::GenomicSet;
use tadsift::parsing::ontology_json::load_phenotype_data;
use tadsift::parsing::tab_file::{load_cnvs, load_elements, load_genes};
use tadsift::writers::cnv_summary::{write_cnv_json, write_cnv_summary};

/// Loads a BED-like element file, exiting on failure
fn load_elements_or_exit(filename: &Path, label: &str) -> GenomicSet<GenomicElement> {
    match load_elements(filename) {
        Ok(elements) => {
            info!("\tLoaded {} {label}", elements.len());
            elements
        },
        Err(e) => {
            error!("Error while loading {label}: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    }
}

fn run_annotate(settings: AnnotateSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    let settings = match check_annotate_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    // set up the number of threads for rayon
    match rayon::ThreadPoolBuilder::new().num_threads(settings.threads).build_global() {
        Ok(()) => {},
        Err(e) => {
            error!("Error while building thread pool: {e}");
            std::process::exit(exitcode::OSERR);
        }
    };

    // load the ontology and annotation table first, genes need it
    info!("Loading phenotype ontology and gene annotations...");
    let phenotype_data = match load_phenotype_data(&settings.ontology_filename, &settings.annotation_filename) {
        Ok(pd) => pd,
        Err(e) => {
            error!("Error while loading phenotype data: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };

    let default_terms = match phenotype_data.resolve_terms(&settings.patient_term_ids()) {
        Ok(terms) => terms,
        Err(e) => {
            error!("Error while resolving --phenotypes: {e}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    info!("Loading genes...");
    let mut genes = match load_genes(&settings.gene_filename) {
        Ok(g) => g,
        Err(e) => {
            error!("Error while loading genes: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    if let Err(e) = phenotype_data.annotate_gene_terms(&mut genes) {
        error!("Error while resolving gene phenotypes: {e}");
        std::process::exit(exitcode::DATAERR);
    }

    info!("Loading domains, boundaries, and enhancers...");
    let domains = load_elements_or_exit(&settings.domain_filename, "domains");
    let boundaries = load_elements_or_exit(&settings.boundary_filename, "boundaries");
    let enhancers = load_elements_or_exit(&settings.enhancer_filename, "enhancers");
    let reference = ReferenceData::new(genes, domains, boundaries, enhancers);

    info!("Loading CNVs...");
    let mut cnvs = match load_cnvs(&settings.cnv_filename) {
        Ok(c) => c,
        Err(e) => {
            error!("Error while loading CNVs: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    info!("\tLoaded {} CNVs", cnvs.len());

    // build our configuration
    let annotation_config = match AnnotationConfigBuilder::default()
        .score_margin(settings.score_margin)
        .show_progress(true)
        .build() {
        Ok(ac) => ac,
        Err(e) => {
            error!("Error while building annotation config: {e:?}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    if let Err(e) = annotate_all(&mut cnvs, &reference, &phenotype_data, &default_terms, annotation_config) {
        error!("Error while annotating CNVs: {e}");
        std::process::exit(exitcode::DATAERR);
    }

    // now write things
    info!("Saving annotated CNVs to {:?}...", settings.output_filename);
    if let Err(e) = write_cnv_summary(&cnvs, &settings.output_filename) {
        error!("Error while saving annotated CNVs: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    if let Some(json_fn) = settings.output_json.as_deref() {
        info!("Saving annotated CNVs to {json_fn:?}...");
        if let Err(e) = write_cnv_json(&cnvs, json_fn) {
            error!("Error while saving annotated CNV JSON: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    }

    info!("Annotation completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Annotate(settings) => {
            run_annotate(*settings);
        }
    }

    info!("Process finished successfully.");
}
