use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use crate::genes::table::find_column;
use crate::genes::{Error, Result};

const LINKS_TABLE: &str = "protein links";

const PROTEIN1_COLUMN: &str = "protein1";
const PROTEIN2_COLUMN: &str = "protein2";
const SCORE_COLUMN: &str = "combined_score";

pub const MAX_LINK_SCORE: u32 = 1000;

/// Pairwise interaction confidence, stored as given (protein1 -> protein2).
pub struct ProteinLinks {
    links: HashMap<String, HashMap<String, u32>>,
    link_count: usize,
}

impl ProteinLinks {
    pub fn new() -> ProteinLinks {
        ProteinLinks {
            links: HashMap::new(),
            link_count: 0,
        }
    }

    pub fn insert(&mut self, protein1: &str, protein2: &str, score: u32) {
        let previous = self
            .links
            .entry(protein1.to_string())
            .or_insert_with(HashMap::new)
            .insert(protein2.to_string(), score);

        if previous.is_none() {
            self.link_count += 1;
        }
    }

    pub fn get_score(&self, protein1: &str, protein2: &str) -> Option<u32> {
        self.links
            .get(protein1)
            .and_then(|partners| partners.get(protein2))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.link_count
    }

    pub fn is_empty(&self) -> bool {
        self.link_count == 0
    }
}

fn strip_taxid<'a>(protein: &'a str, prefix: Option<&str>) -> &'a str {
    match prefix {
        Some(prefix) => protein.strip_prefix(prefix).unwrap_or(protein),
        None => protein,
    }
}

/// Reads a space separated STRING links table (protein1 protein2 combined_score).
///
/// With a taxid, the `<taxid>.` prefix is removed from both protein columns.
/// With a wanted set, only links whose proteins are both in the set are kept.
pub fn read_protein_links<R: Read>(
    reader: R,
    taxid: Option<&str>,
    wanted: Option<&HashSet<String>>,
) -> Result<ProteinLinks> {
    let mut table = ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = table.headers()?.clone();
    let protein1_idx = find_column(&headers, LINKS_TABLE, PROTEIN1_COLUMN)?;
    let protein2_idx = find_column(&headers, LINKS_TABLE, PROTEIN2_COLUMN)?;
    let score_idx = find_column(&headers, LINKS_TABLE, SCORE_COLUMN)?;

    let prefix = taxid.map(|id| format!("{}.", id));
    let prefix = prefix.as_deref();

    let mut links = ProteinLinks::new();

    for (row_idx, row) in table.records().enumerate() {
        let row = row?;

        let (protein1, protein2, score) =
            match (row.get(protein1_idx), row.get(protein2_idx), row.get(score_idx)) {
                (Some(p1), Some(p2), Some(s)) => (strip_taxid(p1, prefix), strip_taxid(p2, prefix), s),
                _ => {
                    return Err(Error::InvalidValue(format!(
                        "Protein links row {} has too few columns",
                        row_idx + 1
                    )))
                }
            };

        if let Some(wanted) = wanted {
            if !wanted.contains(protein1) || !wanted.contains(protein2) {
                continue;
            }
        }

        let score = score
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|s| *s <= MAX_LINK_SCORE)
            .ok_or_else(|| Error::InvalidValue(format!("Link score '{}' outside 0..=1000", score)))?;

        links.insert(protein1, protein2, score);
    }

    Ok(links)
}

pub fn read_protein_links_file(
    path: &Path,
    taxid: Option<&str>,
    wanted: Option<&HashSet<String>>,
) -> Result<ProteinLinks> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::MissingArtifact(format!("protein links {}: {}", path.display(), e)))?;
    read_protein_links(file, taxid, wanted)
}
