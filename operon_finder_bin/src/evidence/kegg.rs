use std::collections::{BTreeSet, HashMap};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::genes::{Error, Result};

/// KO identifier -> metabolic pathway identifiers, as a JSON object of string arrays.
pub struct KoMap {
    pathways: HashMap<String, Vec<String>>,
}

impl KoMap {
    pub fn new(pathways: HashMap<String, Vec<String>>) -> KoMap {
        KoMap { pathways }
    }

    pub fn get_pathways(&self, ko: &str) -> &[String] {
        self.pathways.get(ko).map(|p| p.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.pathways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pathways.is_empty()
    }
}

pub fn read_ko_map<R: Read>(reader: R) -> Result<KoMap> {
    let pathways: HashMap<String, Vec<String>> = serde_json::from_reader(BufReader::new(reader))?;
    Ok(KoMap::new(pathways))
}

pub fn read_ko_map_file(path: &Path) -> Result<KoMap> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::MissingArtifact(format!("KO map {}: {}", path.display(), e)))?;
    read_ko_map(file)
}

/// KO identifier -> textual definition.
pub struct KoDescriptions {
    descriptions: HashMap<String, String>,
}

impl KoDescriptions {
    pub fn new() -> KoDescriptions {
        KoDescriptions {
            descriptions: HashMap::new(),
        }
    }

    pub fn insert(&mut self, ko: &str, description: &str) {
        self.descriptions.insert(ko.to_string(), description.to_string());
    }

    pub fn get_description(&self, ko: &str) -> Option<&str> {
        self.descriptions.get(ko).map(|d| d.as_str())
    }

    /// Definitions of the given KOs, in order, joined with ';'. Unknown KOs are skipped.
    pub fn describe(&self, kos: &[String]) -> String {
        kos.iter()
            .filter_map(|ko| self.get_description(ko))
            .collect::<Vec<_>>()
            .join(";")
    }
}

const KO_LIST_KO_COLUMN: &str = "knum";
const KO_LIST_DEFINITION_COLUMN: &str = "definition";

/// Reads either a KofamScan `ko_list` (header with knum / definition) or a
/// headerless two column `ko<TAB>description` table.
pub fn read_ko_descriptions<R: Read>(reader: R) -> Result<KoDescriptions> {
    let mut descriptions = KoDescriptions::new();
    let mut columns = (0, 1);

    for (line_idx, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();

        if line_idx == 0 && fields.iter().any(|f| f.trim() == KO_LIST_KO_COLUMN) {
            let find = |column: &str| {
                fields.iter().position(|f| f.trim() == column).ok_or_else(|| {
                    Error::SchemaMismatch("KO descriptions".to_string(), column.to_string())
                })
            };
            columns = (find(KO_LIST_KO_COLUMN)?, find(KO_LIST_DEFINITION_COLUMN)?);
            continue;
        }

        let (ko_idx, definition_idx) = columns;
        if let (Some(ko), Some(definition)) = (fields.get(ko_idx), fields.get(definition_idx)) {
            descriptions.insert(ko.trim(), definition.trim());
        }
    }

    Ok(descriptions)
}

pub fn read_ko_descriptions_file(path: &Path) -> Result<KoDescriptions> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::MissingArtifact(format!("KO descriptions {}: {}", path.display(), e)))?;
    read_ko_descriptions(file)
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeggAnnotation {
    kos: Vec<String>,
    pathways: BTreeSet<String>,
}

impl KeggAnnotation {
    pub fn new(kos: Vec<String>, ko_map: &KoMap) -> KeggAnnotation {
        let pathways = kos
            .iter()
            .flat_map(|ko| ko_map.get_pathways(ko).iter().cloned())
            .collect();

        KeggAnnotation { kos, pathways }
    }

    pub fn get_kos(&self) -> &[String] {
        &self.kos
    }

    pub fn get_pathways(&self) -> &BTreeSet<String> {
        &self.pathways
    }
}

/// Per protein KO assignments and derived pathway sets.
pub struct KeggAnnotations {
    annotations: HashMap<String, KeggAnnotation>,
}

impl KeggAnnotations {
    pub fn new(assignments: Vec<(String, Vec<String>)>, ko_map: &KoMap) -> KeggAnnotations {
        let annotations = assignments
            .into_iter()
            .map(|(protein, kos)| (protein, KeggAnnotation::new(kos, ko_map)))
            .collect();

        KeggAnnotations { annotations }
    }

    pub fn get_annotation(&self, protein: &str) -> Option<&KeggAnnotation> {
        self.annotations.get(protein)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

/// Reads KofamScan mapper output: `protein<TAB>KO<TAB>KO...`, one line per protein,
/// proteins without assignment listed alone. Repeated proteins accumulate KOs.
pub fn read_kofam_assignments<R: Read>(reader: R) -> Result<Vec<(String, Vec<String>)>> {
    let mut assignments: Vec<(String, Vec<String>)> = Vec::new();
    let mut protein_idx: HashMap<String, usize> = HashMap::new();

    for line in BufReader::new(reader).lines() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split('\t').map(|f| f.trim());
        let protein = match fields.next() {
            Some(p) if !p.is_empty() => p,
            _ => return Err(Error::from("KofamScan line without protein identifier")),
        };
        let kos = fields.filter(|ko| !ko.is_empty()).map(|ko| ko.to_string());

        match protein_idx.get(protein) {
            Some(idx) => assignments[*idx].1.extend(kos),
            None => {
                protein_idx.insert(protein.to_string(), assignments.len());
                assignments.push((protein.to_string(), kos.collect()));
            }
        }
    }

    Ok(assignments)
}

pub fn read_kofam_assignments_file(path: &Path) -> Result<Vec<(String, Vec<String>)>> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::MissingArtifact(format!("KofamScan result {}: {}", path.display(), e)))?;
    read_kofam_assignments(file)
}
