
use log::debug;
use rustc_hash::FxHashMap as HashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Compact handle for a term inside a single `Ontology`.
/// Handles are only meaningful for the ontology that produced them.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TermIndex(usize);

impl TermIndex {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OntologyError {
    #[error("unknown term identifier: {id:?}")]
    UnknownTerm { id: String },
    #[error("term {term:?} references unknown parent {parent:?}")]
    UnknownParent { term: String, parent: String },
    #[error("duplicate term identifier: {id:?}")]
    DuplicateTerm { id: String },
    #[error("ontology contains a cycle, unresolved at term {term:?}")]
    CyclicOntology { term: String },
}

/// Raw description of a single term, as it comes out of a loader.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TermDefinition {
    /// Primary accession, e.g. "HP:0000118"
    pub id: String,
    /// Human readable label
    #[serde(default)]
    pub name: String,
    /// Accessions of the direct "is-a" parents
    #[serde(default)]
    pub parents: Vec<String>,
    /// Deprecated or secondary accessions that resolve to this term
    #[serde(default)]
    pub alt_ids: Vec<String>,
}

/// A resolved term with its direct parents
#[derive(Clone, Debug)]
pub struct Term {
    id: String,
    name: String,
    alt_ids: Vec<String>,
    parents: Vec<TermIndex>,
}

impl Term {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alt_ids(&self) -> &[String] {
        &self.alt_ids
    }

    pub fn parents(&self) -> &[TermIndex] {
        &self.parents
    }
}

/// A phenotype ontology: a directed acyclic graph of terms with "is-a" edges from child to parent.
/// Multiple parents and multiple roots are allowed.
#[derive(Clone, Debug)]
pub struct Ontology {
    /// All terms, addressed by `TermIndex`
    terms: Vec<Term>,
    /// Lookup from primary and alternate accessions to the term
    id_lookup: HashMap<String, TermIndex>,
    /// For each term, the sorted set of the term itself plus every ancestor
    ancestors: Vec<Vec<TermIndex>>,
}

impl Ontology {
    /// Builds the DAG and pre-computes the ancestor closure of every term.
    /// # Arguments
    /// * `definitions` - all the terms in the ontology, in any order
    /// # Errors
    /// * if a primary or alternate accession is used twice
    /// * if a parent accession does not exist
    /// * if the "is-a" edges contain a cycle
    pub fn new(definitions: Vec<TermDefinition>) -> Result<Self, OntologyError> {
        // first pass assigns indices to the primary IDs
        let mut id_lookup: HashMap<String, TermIndex> = Default::default();
        for (i, definition) in definitions.iter().enumerate() {
            if id_lookup.insert(definition.id.clone(), TermIndex(i)).is_some() {
                return Err(OntologyError::DuplicateTerm { id: definition.id.clone() });
            }
        }

        // alternates can only be added once all the primaries are known
        for (i, definition) in definitions.iter().enumerate() {
            for alt_id in definition.alt_ids.iter() {
                if id_lookup.insert(alt_id.clone(), TermIndex(i)).is_some() {
                    return Err(OntologyError::DuplicateTerm { id: alt_id.clone() });
                }
            }
        }

        let terms: Vec<Term> = definitions.into_iter()
            .map(|definition| {
                let parents = definition.parents.iter()
                    .map(|parent| {
                        id_lookup.get(parent).copied()
                            .ok_or_else(|| OntologyError::UnknownParent { term: definition.id.clone(), parent: parent.clone() })
                    })
                    .collect::<Result<Vec<TermIndex>, OntologyError>>()?;
                Ok(Term {
                    id: definition.id,
                    name: definition.name,
                    alt_ids: definition.alt_ids,
                    parents
                })
            })
            .collect::<Result<_, OntologyError>>()?;

        check_acyclic(&terms)?;

        // with no cycles, a plain BFS over the parent edges terminates for every term
        let ancestors: Vec<Vec<TermIndex>> = (0..terms.len())
            .map(|i| ancestor_closure(&terms, TermIndex(i)))
            .collect();

        let num_roots = terms.iter().filter(|t| t.parents.is_empty()).count();
        debug!("Built ontology with {} terms and {num_roots} root(s)", terms.len());

        Ok(Self {
            terms, id_lookup, ancestors
        })
    }

    /// Resolves an accession to a term, following alternate IDs.
    /// # Errors
    /// * if neither a primary nor an alternate accession matches
    pub fn term_including_alternatives(&self, id: &str) -> Result<TermIndex, OntologyError> {
        self.id_lookup.get(id).copied()
            .ok_or_else(|| OntologyError::UnknownTerm { id: id.to_string() })
    }

    /// Resolves a batch of accessions, failing on the first miss.
    pub fn resolve_terms<S: AsRef<str>>(&self, ids: &[S]) -> Result<BTreeSet<TermIndex>, OntologyError> {
        ids.iter()
            .map(|id| self.term_including_alternatives(id.as_ref()))
            .collect()
    }

    /// Returns true if `candidate_ancestor` is `term` itself or is reachable from `term` by following "is-a" edges upward.
    pub fn is_ancestor_or_equal(&self, candidate_ancestor: TermIndex, term: TermIndex) -> bool {
        self.ancestors[term.0].binary_search(&candidate_ancestor).is_ok()
    }

    /// The term itself plus every ancestor, sorted by index
    pub fn ancestors(&self, term: TermIndex) -> &[TermIndex] {
        &self.ancestors[term.0]
    }

    /// All terms without parents
    pub fn roots(&self) -> Vec<TermIndex> {
        self.terms.iter().enumerate()
            .filter(|(_i, t)| t.parents.is_empty())
            .map(|(i, _t)| TermIndex(i))
            .collect()
    }

    pub fn term(&self, term: TermIndex) -> &Term {
        &self.terms[term.0]
    }

    pub fn term_indices(&self) -> impl Iterator<Item = TermIndex> {
        (0..self.terms.len()).map(TermIndex)
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }
}

/// Kahn's algorithm over child -> parent edges; anything left unvisited is on or above a cycle.
fn check_acyclic(terms: &[Term]) -> Result<(), OntologyError> {
    let mut num_children: Vec<usize> = vec![0; terms.len()];
    for term in terms.iter() {
        for parent in term.parents.iter() {
            num_children[parent.0] += 1;
        }
    }

    // leaves first, then peel upward
    let mut queue: VecDeque<usize> = (0..terms.len())
        .filter(|&i| num_children[i] == 0)
        .collect();
    let mut visited = 0;
    while let Some(i) = queue.pop_front() {
        visited += 1;
        for parent in terms[i].parents.iter() {
            num_children[parent.0] -= 1;
            if num_children[parent.0] == 0 {
                queue.push_back(parent.0);
            }
        }
    }

    if visited < terms.len() {
        let cycle_term = num_children.iter()
            .position(|&c| c > 0)
            .map(|i| terms[i].id.clone())
            .unwrap_or_default();
        return Err(OntologyError::CyclicOntology { term: cycle_term });
    }
    Ok(())
}

/// BFS over every parent edge from `start`, returning the sorted closure including `start`
fn ancestor_closure(terms: &[Term], start: TermIndex) -> Vec<TermIndex> {
    let mut seen: BTreeSet<TermIndex> = BTreeSet::new();
    let mut queue: VecDeque<TermIndex> = VecDeque::new();
    seen.insert(start);
    queue.push_back(start);
    while let Some(current) = queue.pop_front() {
        for &parent in terms[current.0].parents.iter() {
            if seen.insert(parent) {
                queue.push_back(parent);
            }
        }
    }
    seen.into_iter().collect()
}
