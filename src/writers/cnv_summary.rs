
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

use crate::data_types::cnv::Cnv;
use crate::data_types::genomic_element::{GenomicElement, GenomicFeature};
use crate::data_types::genomic_set::GenomicSet;
use crate::util::json_io::save_json;

/// Placeholder for empty list and region columns
const EMPTY_FIELD: &str = ".";

/// Contains all the data written to each row of the annotated CNV file
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CnvSummaryRow {
    /// The CNV identifier
    pub cnv_id: String,
    /// CNV coordinates, zero-based half-open
    pub chrom: String,
    pub start: i32,
    pub end: i32,
    /// loss, gain, or unknown
    pub cnv_type: String,
    /// Number of domain boundaries overlapped
    pub boundary_count: usize,
    /// Number of enhancers directly overlapped
    pub enhancer_count: usize,
    /// Overlapped genes, `;` separated
    pub genes: String,
    /// Target term accession, if any
    pub target_term: String,
    /// Overlapped genes that map to the target term
    pub target_genes: String,
    /// Left adjacent region as `chrom:start-end`
    pub left_adjacent_region: String,
    /// Right adjacent region as `chrom:start-end`
    pub right_adjacent_region: String,
    pub left_adjacent_genes: String,
    pub right_adjacent_genes: String,
    pub left_adjacent_enhancers: usize,
    pub right_adjacent_enhancers: usize,
    pub overlap_phenogram_score: f64,
    /// Overlapped gene behind the phenogram score
    pub overlap_best_gene: String,
    /// Best term matches of that gene as `patient>gene=score`, `;` separated
    pub overlap_term_pairs: String,
    pub left_adjacent_phenogram_score: f64,
    pub right_adjacent_phenogram_score: f64,
    /// Final classification
    pub is_tdbd: bool,
    /// Furthest completed annotation stage
    pub annotation_stage: String,
}

impl CnvSummaryRow {
    /// Creates a new row from an annotated CNV
    pub fn new(cnv: &Cnv) -> Self {
        let element = cnv.element();
        Self {
            cnv_id: cnv.name().to_string(),
            chrom: element.chrom().to_string(),
            start: element.start(),
            end: element.end(),
            cnv_type: cnv.cnv_type().to_string(),
            boundary_count: cnv.boundary_overlap().len(),
            enhancer_count: cnv.enhancer_overlap().len(),
            genes: join_names(cnv.genes().keys()),
            target_term: cnv.target_term_id().unwrap_or(EMPTY_FIELD).to_string(),
            target_genes: join_names(cnv.target_genes()),
            left_adjacent_region: format_region(cnv.left_adjacent_region()),
            right_adjacent_region: format_region(cnv.right_adjacent_region()),
            left_adjacent_genes: join_names(cnv.left_adjacent_genes()),
            right_adjacent_genes: join_names(cnv.right_adjacent_genes()),
            left_adjacent_enhancers: cnv.left_adjacent_enhancers(),
            right_adjacent_enhancers: cnv.right_adjacent_enhancers(),
            overlap_phenogram_score: cnv.overlap_phenogram_score(),
            overlap_best_gene: cnv.overlap_best_gene().unwrap_or(EMPTY_FIELD).to_string(),
            overlap_term_pairs: join_names(cnv.overlap_term_pairs().iter().map(|p| p.to_string())),
            left_adjacent_phenogram_score: cnv.left_adjacent_phenogram_score(),
            right_adjacent_phenogram_score: cnv.right_adjacent_phenogram_score(),
            is_tdbd: cnv.is_tdbd(),
            annotation_stage: cnv.stage().to_string()
        }
    }
}

/// Converts every CNV into an output row, in the input order
pub fn summary_rows(cnvs: &GenomicSet<Cnv>) -> Vec<CnvSummaryRow> {
    cnvs.values().map(CnvSummaryRow::new).collect()
}

/// Will write one row per CNV out to the given file path
/// # Arguments
/// * `cnvs` - the annotated CNVs
/// * `filename` - the filename for the output (tsv/csv)
/// # Errors
/// * if the file cannot be created or written
pub fn write_cnv_summary(cnvs: &GenomicSet<Cnv>, filename: &Path) -> csv::Result<()> {
    // modify the delimiter to "," if it ends with .csv
    let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
    let delimiter: u8 = if is_csv { b',' } else { b'\t' };
    let mut csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(filename)?;

    for row in summary_rows(cnvs).iter() {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Saves the same rows as a JSON array (gzipped if the filename ends with .gz)
/// # Errors
/// * if the file cannot be created or serialized
pub fn write_cnv_json(cnvs: &GenomicSet<Cnv>, filename: &Path) -> anyhow::Result<()> {
    save_json(&summary_rows(cnvs), filename)
}

fn join_names<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> String {
    let joined = names.into_iter()
        .map(|n| n.as_ref().to_string())
        .join(";");
    if joined.is_empty() {
        EMPTY_FIELD.to_string()
    } else {
        joined
    }
}

fn format_region(region: Option<&GenomicElement>) -> String {
    region.map(|r| r.coordinates())
        .unwrap_or_else(|| EMPTY_FIELD.to_string())
}
