
use anyhow::{anyhow, Context};
use csv::StringRecord;
use log::debug;
use std::path::Path;
use std::str::FromStr;

use crate::data_types::cnv::{Cnv, CnvType};
use crate::data_types::gene::Gene;
use crate::data_types::genomic_element::GenomicElement;
use crate::data_types::genomic_set::GenomicSet;
use crate::util::json_io::open_input;

/// Opens a headerless, tab-delimited file with `#` comments; `.gz` files are decompressed on the fly.
/// Rows may have different numbers of columns.
/// # Errors
/// * if the file does not open
pub fn open_tab_reader(filename: &Path) -> anyhow::Result<csv::Reader<Box<dyn std::io::Read>>> {
    let fp = open_input(filename)?;
    let reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false) // no headers in the file, disable so we do not skip first row
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(fp);
    Ok(reader)
}

/// Loads a BED-like file of plain elements: `chrom start end [name]`.
/// Unnamed rows are named after their coordinates.
/// # Errors
/// * if the file cannot be read or a row is malformed
/// * if two rows share a name
pub fn load_elements(filename: &Path) -> anyhow::Result<GenomicSet<GenomicElement>> {
    let mut reader = open_tab_reader(filename)?;
    let mut elements: GenomicSet<GenomicElement> = GenomicSet::new();
    for result in reader.records() {
        let row = result.with_context(|| format!("Error while reading {filename:?}"))?;
        let element = parse_element(&row, false)
            .with_context(|| format!("Error while parsing {filename:?} line {}", line_number(&row)))?;
        let key = element.name().to_string();
        elements.put(key, element)
            .with_context(|| format!("Error while loading {filename:?} line {}", line_number(&row)))?;
    }
    debug!("Loaded {} elements from {filename:?}", elements.len());
    Ok(elements)
}

/// Loads genes: `chrom start end name [term_ids [symbol]]`.
/// Term accessions are separated by `;` or `,`, and `.` marks an empty column.
/// # Errors
/// * if the file cannot be read or a row is malformed
/// * if two genes share a name
pub fn load_genes(filename: &Path) -> anyhow::Result<GenomicSet<Gene>> {
    let mut reader = open_tab_reader(filename)?;
    let mut genes: GenomicSet<Gene> = GenomicSet::new();
    for result in reader.records() {
        let row = result.with_context(|| format!("Error while reading {filename:?}"))?;
        let element = parse_element(&row, true)
            .with_context(|| format!("Error while parsing {filename:?} line {}", line_number(&row)))?;
        let term_ids = row.get(4).map(split_term_ids).unwrap_or_default();
        let mut gene = Gene::new(element, term_ids);
        if let Some(symbol) = optional_column(&row, 5) {
            gene = gene.with_symbol(symbol);
        }
        let key = gene.name().to_string();
        genes.put(key, gene)
            .with_context(|| format!("Error while loading {filename:?} line {}", line_number(&row)))?;
    }
    debug!("Loaded {} genes from {filename:?}", genes.len());
    Ok(genes)
}

/// Loads CNVs: `chrom start end name [type [term_ids [target_term]]]`.
/// # Errors
/// * if the file cannot be read or a row is malformed
/// * if the type is not recognized
/// * if two CNVs share a name
pub fn load_cnvs(filename: &Path) -> anyhow::Result<GenomicSet<Cnv>> {
    let mut reader = open_tab_reader(filename)?;
    let mut cnvs: GenomicSet<Cnv> = GenomicSet::new();
    for result in reader.records() {
        let row = result.with_context(|| format!("Error while reading {filename:?}"))?;
        let cnv = parse_cnv(&row)
            .with_context(|| format!("Error while parsing {filename:?} line {}", line_number(&row)))?;
        let key = cnv.name().to_string();
        cnvs.put(key, cnv)
            .with_context(|| format!("Error while loading {filename:?} line {}", line_number(&row)))?;
    }
    debug!("Loaded {} CNVs from {filename:?}", cnvs.len());
    Ok(cnvs)
}

/// Loads the gene annotation table: `gene_id term_id`, extra columns are ignored.
/// # Errors
/// * if the file cannot be read or a row has fewer than two columns
pub fn load_gene_annotations(filename: &Path) -> anyhow::Result<Vec<(String, String)>> {
    let mut reader = open_tab_reader(filename)?;
    let mut pairs = vec![];
    for result in reader.records() {
        let row = result.with_context(|| format!("Error while reading {filename:?}"))?;
        let gene_id = required_column(&row, 0, "gene_id")?;
        let term_id = required_column(&row, 1, "term_id")
            .with_context(|| format!("Error while parsing {filename:?} line {}", line_number(&row)))?;
        pairs.push((gene_id.to_string(), term_id.to_string()));
    }
    debug!("Loaded {} gene annotations from {filename:?}", pairs.len());
    Ok(pairs)
}

/// Splits a list of term accessions on `;` or `,`, dropping blanks and `.`
pub fn split_term_ids(raw: &str) -> Vec<String> {
    raw.split([';', ','])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && *s != ".")
        .map(|s| s.to_string())
        .collect()
}

/// Parses the coordinate columns and the name, if `require_name` is false a missing name becomes `chrom:start-end`
fn parse_element(row: &StringRecord, require_name: bool) -> anyhow::Result<GenomicElement> {
    let chrom = required_column(row, 0, "chrom")?;
    let start = parse_column::<i32>(row, 1, "start")?;
    let end = parse_column::<i32>(row, 2, "end")?;
    let name = match optional_column(row, 3) {
        Some(n) => n.to_string(),
        None if require_name => return Err(anyhow!("Missing name column on row: {row:?}")),
        None => format!("{chrom}:{start}-{end}")
    };
    Ok(GenomicElement::new(chrom, start, end, name)?)
}

fn parse_cnv(row: &StringRecord) -> anyhow::Result<Cnv> {
    let element = parse_element(row, true)?;
    let cnv_type = match optional_column(row, 4) {
        Some(raw) => CnvType::from_str(raw)
            .map_err(|_e| anyhow!("Unrecognized CNV type: {raw:?}"))?,
        None => CnvType::Unknown
    };
    let term_ids = row.get(5).map(split_term_ids).unwrap_or_default();
    let target = optional_column(row, 6).map(|t| t.to_string());
    Ok(Cnv::new(element, cnv_type).with_phenotypes(term_ids, target))
}

/// Returns the trimmed column, treating missing, blank, and `.` as absent
fn optional_column(row: &StringRecord, index: usize) -> Option<&str> {
    row.get(index)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && *s != ".")
}

fn required_column<'a>(row: &'a StringRecord, index: usize, label: &str) -> anyhow::Result<&'a str> {
    optional_column(row, index)
        .ok_or_else(|| anyhow!("Missing {label} column on row: {row:?}"))
}

fn parse_column<T>(row: &StringRecord, index: usize, label: &str) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static
{
    let raw = required_column(row, index, label)?;
    raw.parse::<T>()
        .with_context(|| format!("Error while parsing {label} value {raw:?}"))
}

fn line_number(row: &StringRecord) -> u64 {
    row.position().map(|p| p.line()).unwrap_or_default()
}
