
use coitrees::{COITree, Interval, IntervalTree};
use indexmap::IndexMap;
use log::trace;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::data_types::genomic_element::{GenomicElement, GenomicFeature};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GenomicSetError {
    #[error("duplicate key in genomic set: {key:?}")]
    DuplicateKey { key: String },
    #[error("key not found in genomic set: {key:?}")]
    NotFound { key: String },
}

/// An insertion-ordered, name-keyed collection of genomic features.
/// Interval queries go through a per-chromosome index that is built on first use.
/// The index is a read-only snapshot; inserting a new element discards it.
#[derive(Clone)]
pub struct GenomicSet<T> {
    /// Lookup from unique key to the element, in insertion order
    elements: IndexMap<String, T>,
    /// Lazily built lookup from chromosome to the interval index for that chromosome
    index: OnceLock<BTreeMap<String, ChromIndex>>,
}

impl<T> Default for GenomicSet<T> {
    fn default() -> Self {
        Self {
            elements: Default::default(),
            index: OnceLock::new()
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for GenomicSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // COITree does not have Debug, so we only report whether the index exists
        f.debug_struct("GenomicSet")
            .field("elements", &self.elements)
            .field("indexed", &self.index.get().is_some())
            .finish()
    }
}

/// Index for a single chromosome; all stored values are offsets into the `IndexMap`.
#[derive(Clone)]
struct ChromIndex {
    /// Overlap tree with 0-based inclusive ranges
    tree: COITree<usize, usize>,
    /// (start, end, offset) sorted by start, used for downstream lookups
    by_start: Vec<(i32, i32, usize)>,
    /// (end, start, offset) sorted by end, used for upstream lookups
    by_end: Vec<(i32, i32, usize)>,
}

impl ChromIndex {
    fn new(entries: &[(i32, i32, usize)]) -> Self {
        let coi_intervals: Vec<Interval<usize>> = entries.iter()
            .map(|&(start, end, offset)| Interval::new(start, end - 1, offset))
            .collect();
        let tree = COITree::new(&coi_intervals);

        let mut by_start = entries.to_vec();
        by_start.sort_unstable();
        let mut by_end: Vec<(i32, i32, usize)> = entries.iter()
            .map(|&(start, end, offset)| (end, start, offset))
            .collect();
        by_end.sort_unstable();

        Self { tree, by_start, by_end }
    }
}

impl<T: GenomicFeature> GenomicSet<T> {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set keyed by each element's name.
    /// # Errors
    /// * if two elements share a name
    pub fn from_elements<I: IntoIterator<Item = T>>(elements: I) -> Result<Self, GenomicSetError> {
        let mut set = Self::new();
        for element in elements {
            let key = element.element().name().to_string();
            set.put(key, element)?;
        }
        Ok(set)
    }

    /// Adds an element under a new key, preserving insertion order.
    /// # Errors
    /// * if the key is already present
    pub fn put(&mut self, key: impl Into<String>, element: T) -> Result<(), GenomicSetError> {
        let key = key.into();
        if self.elements.contains_key(&key) {
            return Err(GenomicSetError::DuplicateKey { key });
        }
        self.elements.insert(key, element);
        // the old snapshot no longer reflects the contents
        self.index = OnceLock::new();
        Ok(())
    }

    /// Retrieves an element by key.
    /// # Errors
    /// * if the key is absent
    pub fn get(&self, key: &str) -> Result<&T, GenomicSetError> {
        self.elements.get(key)
            .ok_or_else(|| GenomicSetError::NotFound { key: key.to_string() })
    }

    /// Mutable access by key; coordinates are immutable so this cannot invalidate the index.
    /// # Errors
    /// * if the key is absent
    pub fn get_mut(&mut self, key: &str) -> Result<&mut T, GenomicSetError> {
        self.elements.get_mut(key)
            .ok_or_else(|| GenomicSetError::NotFound { key: key.to_string() })
    }

    /// Returns all elements on the query chromosome that overlap the query, in insertion order.
    pub fn overlapping(&self, query: &GenomicElement) -> Vec<&T> {
        self.overlapping_offsets(query).into_iter()
            .map(|offset| &self.elements[offset])
            .collect()
    }

    /// Same as `overlapping(...)`, but clones the hits into a new set with the same keys.
    pub fn overlapping_set(&self, query: &GenomicElement) -> GenomicSet<T> where T: Clone {
        let elements: IndexMap<String, T> = self.overlapping_offsets(query).into_iter()
            .filter_map(|offset| self.elements.get_index(offset))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        GenomicSet {
            elements,
            index: OnceLock::new()
        }
    }

    /// Returns true if at least one element overlaps the query.
    pub fn any_overlap(&self, query: &GenomicElement) -> bool {
        let (first, last) = query.inclusive_bounds();
        match self.chrom_index().get(query.chrom()) {
            Some(ci) => ci.tree.query_count(first, last) > 0,
            None => false
        }
    }

    /// Returns the nearest element that lies entirely to the left of the query (`end <= query.start`).
    /// Ties go to the larger start, then to the later insertion.
    pub fn closest_upstream(&self, query: &GenomicElement) -> Option<&T> {
        let ci = self.chrom_index().get(query.chrom())?;
        let cutoff = ci.by_end.partition_point(|&(end, _start, _offset)| end <= query.start());
        if cutoff == 0 {
            None
        } else {
            let (_end, _start, offset) = ci.by_end[cutoff - 1];
            Some(&self.elements[offset])
        }
    }

    /// Returns the nearest element that lies entirely to the right of the query (`start >= query.end`).
    /// Ties go to the smaller end, then to the earlier insertion.
    pub fn closest_downstream(&self, query: &GenomicElement) -> Option<&T> {
        let ci = self.chrom_index().get(query.chrom())?;
        let cutoff = ci.by_start.partition_point(|&(start, _end, _offset)| start < query.end());
        ci.by_start.get(cutoff)
            .map(|&(_start, _end, offset)| &self.elements[offset])
    }

    /// Offsets of all overlapping elements, sorted to match insertion order
    fn overlapping_offsets(&self, query: &GenomicElement) -> Vec<usize> {
        let (first, last) = query.inclusive_bounds();
        let mut offsets: Vec<usize> = vec![];
        if let Some(ci) = self.chrom_index().get(query.chrom()) {
            ci.tree.query(first, last, |node| {
                offsets.push(node.metadata.to_owned());
            });
        }
        offsets.sort_unstable();
        offsets
    }

    /// Builds the per-chromosome index the first time it is needed
    fn chrom_index(&self) -> &BTreeMap<String, ChromIndex> {
        self.index.get_or_init(|| {
            let mut grouped: BTreeMap<String, Vec<(i32, i32, usize)>> = Default::default();
            for (offset, value) in self.elements.values().enumerate() {
                let element = value.element();
                grouped.entry(element.chrom().to_string()).or_default()
                    .push((element.start(), element.end(), offset));
            }
            trace!("Building interval index for {} elements on {} chromosomes", self.elements.len(), grouped.len());
            grouped.into_iter()
                .map(|(chrom, entries)| (chrom, ChromIndex::new(&entries)))
                .collect()
        })
    }
}

impl<T> GenomicSet<T> {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.elements.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.elements.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.elements.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.elements.values_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.elements.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ge(chrom: &str, start: i32, end: i32, name: &str) -> GenomicElement {
        GenomicElement::new(chrom, start, end, name).unwrap()
    }

    fn toy_genes() -> GenomicSet<GenomicElement> {
        GenomicSet::from_elements(vec![
            ge("chr1", 2, 5, "geneC"),
            ge("chr1", 10, 14, "geneB"),
            ge("chr1", 18, 20, "geneD"),
            ge("chr1", 26, 32, "geneA"),
            ge("chr2", 0, 100, "geneZ"),
        ]).unwrap()
    }

    fn names<'a>(hits: impl IntoIterator<Item = &'a GenomicElement>) -> Vec<&'a str> {
        hits.into_iter().map(|e| e.name()).collect()
    }

    #[test]
    fn test_put_get() {
        let mut set = toy_genes();
        assert_eq!(set.len(), 5);
        assert_eq!(set.get("geneB").unwrap().start(), 10);
        assert_eq!(set.get("geneQ").unwrap_err(), GenomicSetError::NotFound { key: "geneQ".to_string() });
        assert_eq!(
            set.put("geneA", ge("chr1", 0, 1, "geneA")).unwrap_err(),
            GenomicSetError::DuplicateKey { key: "geneA".to_string() }
        );
        // insertion order is preserved
        assert_eq!(set.keys().cloned().collect::<Vec<String>>(), vec!["geneC", "geneB", "geneD", "geneA", "geneZ"]);
    }

    #[test]
    fn test_overlapping() {
        let set = toy_genes();
        assert_eq!(names(set.overlapping(&ge("chr1", 9, 19, "cnv1"))), vec!["geneB", "geneD"]);
        assert_eq!(names(set.overlapping(&ge("chr1", 8, 33, "cnv2"))), vec!["geneB", "geneD", "geneA"]);
        assert!(set.overlapping(&ge("chr1", 14, 16, "cnv4")).is_empty());
        assert!(set.overlapping(&ge("chr3", 0, 1000, "none")).is_empty());

        // half-open edges
        assert!(set.overlapping(&ge("chr1", 5, 10, "gap")).is_empty());
        assert_eq!(names(set.overlapping(&ge("chr1", 4, 11, "edges"))), vec!["geneC", "geneB"]);
        assert!(set.any_overlap(&ge("chr2", 99, 150, "q")));
        assert!(!set.any_overlap(&ge("chr2", 100, 150, "q")));
    }

    #[test]
    fn test_overlapping_set_keeps_keys() {
        let set = toy_genes();
        let sub = set.overlapping_set(&ge("chr1", 8, 33, "cnv2"));
        assert_eq!(sub.len(), 3);
        assert!(sub.contains_key("geneA"));
        assert!(!sub.contains_key("geneC"));
        assert_eq!(names(sub.overlapping(&ge("chr1", 0, 15, "q"))), vec!["geneB"]);
    }

    #[test]
    fn test_index_reset_on_put() {
        let mut set = toy_genes();
        assert!(set.overlapping(&ge("chr1", 40, 50, "q")).is_empty());
        set.put("geneE", ge("chr1", 45, 60, "geneE")).unwrap();
        assert_eq!(names(set.overlapping(&ge("chr1", 40, 50, "q"))), vec!["geneE"]);
    }

    #[test]
    fn test_from_elements_duplicate_name() {
        let result = GenomicSet::from_elements(vec![
            ge("chr1", 0, 10, "x"),
            ge("chr1", 20, 30, "x"),
        ]);
        assert_eq!(result.unwrap_err(), GenomicSetError::DuplicateKey { key: "x".to_string() });

        let set = GenomicSet::from_elements(vec![ge("chr1", 0, 10, "x"), ge("chr1", 20, 30, "y")]).unwrap();
        assert_eq!(names(set.overlapping(&ge("chr1", 5, 25, "q"))), vec!["x", "y"]);
    }

    #[test]
    fn test_closest() {
        let set = toy_genes();
        let query = ge("chr1", 15, 17, "q");
        assert_eq!(set.closest_upstream(&query).unwrap().name(), "geneB");
        assert_eq!(set.closest_downstream(&query).unwrap().name(), "geneD");

        // touching elements are adjacent, not overlapping
        let touching = ge("chr1", 14, 18, "q");
        assert_eq!(set.closest_upstream(&touching).unwrap().name(), "geneB");
        assert_eq!(set.closest_downstream(&touching).unwrap().name(), "geneD");

        // overlapping elements are skipped
        let wide = ge("chr1", 11, 27, "q");
        assert_eq!(set.closest_upstream(&wide).unwrap().name(), "geneC");
        assert!(set.closest_downstream(&wide).is_none());

        // chromosome ends and missing chromosomes
        assert!(set.closest_upstream(&ge("chr1", 0, 2, "q")).is_none());
        assert!(set.closest_downstream(&ge("chr1", 40, 41, "q")).is_none());
        assert!(set.closest_upstream(&ge("chrX", 40, 41, "q")).is_none());
    }
}
