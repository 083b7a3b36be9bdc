use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use crate::genes::table::find_column;
use crate::genes::{Error, Result};

const ALIGNMENT_TABLE: &str = "alignment hits";

const QUERY_COLUMN: &str = "query_accession";
const TARGET_COLUMN: &str = "target_accession";
const IDENTITY_COLUMN: &str = "sequence_identity";

/*
    Diamond / BLAST tabular (outfmt 6) column order:

    query_accession target_accession sequence_identity length mismatches gap_openings
    query_start query_end target_start target_end e_value bit_score
 */

#[derive(Clone, Debug, PartialEq)]
pub struct AlignmentHit {
    target: String,
    identity: f64,
}

impl AlignmentHit {
    pub fn get_target(&self) -> &str {
        &self.target
    }

    pub fn get_identity(&self) -> f64 {
        self.identity
    }
}

/// Best alignment hit per query protein, chosen by maximal sequence identity.
/// Ties keep the hit listed first.
pub struct AlignmentHits {
    best_hits: HashMap<String, AlignmentHit>,
}

impl AlignmentHits {
    pub fn new() -> AlignmentHits {
        AlignmentHits {
            best_hits: HashMap::new(),
        }
    }

    pub fn consider_hit(&mut self, query: &str, target: &str, identity: f64) {
        match self.best_hits.get_mut(query) {
            Some(best) if best.identity >= identity => {}
            Some(best) => {
                best.target = target.to_string();
                best.identity = identity;
            }
            None => {
                self.best_hits.insert(
                    query.to_string(),
                    AlignmentHit {
                        target: target.to_string(),
                        identity,
                    },
                );
            }
        }
    }

    pub fn get_best_hit(&self, query: &str) -> Option<&AlignmentHit> {
        self.best_hits.get(query)
    }

    pub fn get_target(&self, query: &str) -> Option<&str> {
        self.best_hits.get(query).map(|hit| hit.get_target())
    }

    /// Removes a `<taxid>.` prefix from every target, matching STRING link identifiers.
    pub fn strip_target_prefix(&mut self, taxid: &str) {
        let prefix = format!("{}.", taxid);

        for hit in self.best_hits.values_mut() {
            if let Some(stripped) = hit.target.strip_prefix(&prefix) {
                hit.target = stripped.to_string();
            }
        }
    }

    /// Distinct best-hit targets, used to restrict which protein links are loaded.
    pub fn get_targets(&self) -> HashSet<String> {
        self.best_hits.values().map(|hit| hit.target.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.best_hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best_hits.is_empty()
    }
}

/// Accepts raw headerless tabular output, or an already filtered table with a
/// header naming query_accession, target_accession and sequence_identity.
pub fn read_alignment_hits<R: Read>(reader: R) -> Result<AlignmentHits> {
    let mut tsv = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut hits = AlignmentHits::new();
    let mut columns = (0, 1, 2);

    for (row_idx, row) in tsv.records().enumerate() {
        let row = row?;

        if row_idx == 0 && row.iter().any(|field| field.trim() == QUERY_COLUMN) {
            columns = (
                find_column(&row, ALIGNMENT_TABLE, QUERY_COLUMN)?,
                find_column(&row, ALIGNMENT_TABLE, TARGET_COLUMN)?,
                find_column(&row, ALIGNMENT_TABLE, IDENTITY_COLUMN)?,
            );
            continue;
        }

        let (query_idx, target_idx, identity_idx) = columns;
        let (query, target, identity) =
            match (row.get(query_idx), row.get(target_idx), row.get(identity_idx)) {
                (Some(q), Some(t), Some(i)) => (q.trim(), t.trim(), i.trim()),
                _ => {
                    return Err(Error::InvalidValue(format!(
                        "Alignment row {} has too few columns",
                        row_idx + 1
                    )))
                }
            };

        let identity = identity.parse::<f64>().map_err(|_| {
            Error::InvalidValue(format!("Alignment identity '{}' is not numeric", identity))
        })?;

        hits.consider_hit(query, target, identity);
    }

    Ok(hits)
}

pub fn read_alignment_hits_file(path: &Path) -> Result<AlignmentHits> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::MissingArtifact(format!("alignment hits {}: {}", path.display(), e)))?;
    read_alignment_hits(file)
}
