
use serde::{Deserialize, Serialize};

/// A patient term, the gene term it matched best, and the similarity of that match
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TermPair {
    /// Patient phenotype accession
    patient_term: String,
    /// Gene phenotype accession
    gene_term: String,
    /// IC of the most informative common ancestor of the two terms
    score: f64,
}

impl TermPair {
    pub fn new(patient_term: impl Into<String>, gene_term: impl Into<String>, score: f64) -> Self {
        Self {
            patient_term: patient_term.into(),
            gene_term: gene_term.into(),
            score
        }
    }

    // getters
    pub fn patient_term(&self) -> &str {
        &self.patient_term
    }

    pub fn gene_term(&self) -> &str {
        &self.gene_term
    }

    pub fn score(&self) -> f64 {
        self.score
    }
}

impl std::fmt::Display for TermPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}>{}={:.3}", self.patient_term, self.gene_term, self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let pair = TermPair::new("EP:06", "EP:04", 4.0_f64.ln());
        assert_eq!(pair.to_string(), "EP:06>EP:04=1.386");
        assert_eq!(pair.patient_term(), "EP:06");
        assert_eq!(pair.gene_term(), "EP:04");
    }
}
