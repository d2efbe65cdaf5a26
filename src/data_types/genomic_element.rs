
use serde::Serialize;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GenomicElementError {
    #[error("invalid range for {name:?} on {chrom}: start={start} end={end}; coordinates must be >= 0 and start < end")]
    InvalidRange { chrom: String, start: i32, end: i32, name: String },
}

/// A genomic interval in zero-based, half-open (BED-like) coordinates: `[start, end)`.
/// Coordinates are fixed at construction; only the name may change afterwards.
/// Equality, hashing, and ordering are all based on the string form `name:chrom:[start,end)`.
#[derive(Clone, Debug, Serialize)]
pub struct GenomicElement {
    /// Chromosome identifier
    chrom: String,
    /// The first included base, 0-based
    start: i32,
    /// The first excluded base, 0-based
    end: i32,
    /// A label for the element, typically also the key in a `GenomicSet`
    name: String,
}

impl GenomicElement {
    /// Constructor with range checks
    /// # Arguments
    /// * `chrom` - the chromosome identifier
    /// * `start` - zero-based start coordinate
    /// * `end` - zero-based, exclusive end coordinate
    /// * `name` - label for this element
    /// # Errors
    /// * if either coordinate is negative
    /// * if `start >= end`
    pub fn new(chrom: impl Into<String>, start: i32, end: i32, name: impl Into<String>) -> Result<Self, GenomicElementError> {
        let chrom = chrom.into();
        let name = name.into();
        if start < 0 || end < 0 || start >= end {
            return Err(GenomicElementError::InvalidRange { chrom, start, end, name });
        }
        Ok(Self { chrom, start, end, name })
    }

    /// Returns true if the two elements share at least one base on the same chromosome.
    /// Since these are half-open, `[a, b)` and `[b, c)` do not overlap.
    pub fn overlaps(&self, other: &GenomicElement) -> bool {
        self.chrom == other.chrom && self.start < other.end && other.start < self.end
    }

    /// Returns true if `other` is fully contained within this element.
    pub fn contains(&self, other: &GenomicElement) -> bool {
        self.chrom == other.chrom && self.start <= other.start && other.end <= self.end
    }

    /// Returns true if the 0-based position falls inside this element.
    pub fn contains_position(&self, chrom: &str, position: i32) -> bool {
        self.chrom == chrom && self.start <= position && position < self.end
    }

    /// The 1-based, closed-interval form `[start+1, end]` used by external interval tooling.
    pub fn interval_representation(&self) -> (i32, i32) {
        (self.start + 1, self.end)
    }

    /// The 0-based inclusive form `[start, end-1]`, which is what the COITree lookups expect.
    pub fn inclusive_bounds(&self) -> (i32, i32) {
        (self.start, self.end - 1)
    }

    /// Genomic ordering by (chromosome, start, end); unlike `Ord`, this ignores the name.
    pub fn cmp_coordinates(&self, other: &GenomicElement) -> Ordering {
        self.chrom.cmp(&other.chrom)
            .then(self.start.cmp(&other.start))
            .then(self.end.cmp(&other.end))
    }

    /// Number of bases covered
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Always false, construction forbids zero-length elements
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Coordinates without the name, e.g. `chr1:9-19`
    pub fn coordinates(&self) -> String {
        format!("{}:{}-{}", self.chrom, self.start, self.end)
    }

    // getters
    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl std::fmt::Display for GenomicElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:[{},{})", self.name, self.chrom, self.start, self.end)
    }
}

impl PartialEq for GenomicElement {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for GenomicElement {}

impl Hash for GenomicElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl PartialOrd for GenomicElement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GenomicElement {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

/// Anything that is anchored to a single genomic interval.
/// This is what lets `GenomicSet` index genes, CNVs, and plain elements the same way.
pub trait GenomicFeature {
    fn element(&self) -> &GenomicElement;
}

impl GenomicFeature for GenomicElement {
    fn element(&self) -> &GenomicElement {
        self
    }
}
