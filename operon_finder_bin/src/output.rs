use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::analysis::segment::OperonAssignment;
use crate::evidence::kegg::{KeggAnnotations, KoDescriptions};
use crate::genes::{Error, GeneTable, Result};

const OPERON_TABLE_COLUMNS: [&str; 9] = [
    "operon_number",
    "contig",
    "start",
    "end",
    "gene_name",
    "locus_name",
    "kegg_orthology",
    "metabolic_pathway_kegg",
    "description_kegg",
];

// Field order must follow OPERON_TABLE_COLUMNS
#[derive(Serialize)]
struct OperonRow<'a> {
    operon_number: String,
    contig: &'a str,
    start: u64,
    end: u64,
    gene_name: &'a str,
    locus_name: &'a str,
    kegg_orthology: String,
    metabolic_pathway_kegg: String,
    description_kegg: String,
}

/// Writes one tab separated row per gene, in gene table order.
pub fn write_operon_table<W: Write>(
    writer: W,
    genes: &GeneTable,
    assignments: &[OperonAssignment],
    kegg: &KeggAnnotations,
    descriptions: Option<&KoDescriptions>,
) -> Result<()> {
    if assignments.len() != genes.len() {
        return Err(Error::MismatchedDataSize(assignments.len(), genes.len()));
    }

    let mut tsv = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);
    tsv.write_record(&OPERON_TABLE_COLUMNS)?;

    for (gene, assignment) in genes.get_all_genes().iter().zip(assignments.iter()) {
        let annotation = kegg.get_annotation(gene.get_locus_tag());

        let (kos, pathways, description) = match annotation {
            Some(annotation) => (
                annotation.get_kos().join(","),
                annotation.get_pathways().iter().cloned().collect::<Vec<_>>().join(","),
                descriptions.map_or_else(String::new, |d| d.describe(annotation.get_kos())),
            ),
            None => (String::new(), String::new(), String::new()),
        };

        tsv.serialize(OperonRow {
            operon_number: assignment.to_string(),
            contig: gene.get_contig(),
            start: gene.get_start(),
            end: gene.get_end(),
            gene_name: gene.get_gene_name(),
            locus_name: gene.get_locus_tag(),
            kegg_orthology: kos,
            metabolic_pathway_kegg: pathways,
            description_kegg: description,
        })?;
    }

    tsv.flush()?;
    Ok(())
}

/// An output written to a temporary file beside its destination and only
/// moved into place by `commit`. Dropping it uncommitted removes the file.
pub struct StagedOutput {
    file: NamedTempFile,
    path: PathBuf,
}

impl StagedOutput {
    pub fn new(path: &Path) -> Result<StagedOutput> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let file = NamedTempFile::new_in(dir).map_err(|e| {
            Error::MissingArtifact(format!("output directory {}: {}", dir.display(), e))
        })?;

        Ok(StagedOutput {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn writer(&self) -> &File {
        self.file.as_file()
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    pub fn commit(self) -> Result<()> {
        self.file.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

/// Locus tag -> operon name, as used for the GFF merge.
pub fn operon_names(genes: &GeneTable, assignments: &[OperonAssignment]) -> HashMap<String, String> {
    genes
        .get_all_genes()
        .iter()
        .zip(assignments.iter())
        .map(|(gene, assignment)| (gene.get_locus_tag().to_string(), assignment.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::kegg::{read_ko_descriptions, read_ko_map, read_kofam_assignments};
    use crate::genes::tests::gene;
    use crate::genes::Strand;

    fn genes() -> GeneTable {
        GeneTable::new(vec![
            gene("c1", 100, 400, Strand::Forward, "LT_1"),
            gene("c1", 410, 900, Strand::Forward, "LT_2"),
            gene("c1", 1500, 1900, Strand::Reverse, "LT_3"),
        ])
        .unwrap()
    }

    fn kegg() -> KeggAnnotations {
        let ko_map = read_ko_map(
            r#"{"K00001": ["map00010", "map01100"], "K00002": ["map00020"]}"#.as_bytes(),
        )
        .unwrap();
        let assignments = read_kofam_assignments("LT_1\tK00001\tK00002\n".as_bytes()).unwrap();
        KeggAnnotations::new(assignments, &ko_map)
    }

    #[test]
    fn test_write_operon_table() {
        let descriptions =
            read_ko_descriptions("K00001\talcohol dehydrogenase\nK00002\taldehyde reductase\n".as_bytes()).unwrap();
        let assignments = vec![
            OperonAssignment::Operon(1),
            OperonAssignment::Operon(1),
            OperonAssignment::NonOperon,
        ];

        let mut out = Vec::new();
        write_operon_table(&mut out, &genes(), &assignments, &kegg(), Some(&descriptions)).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "operon_number\tcontig\tstart\tend\tgene_name\tlocus_name\tkegg_orthology\tmetabolic_pathway_kegg\tdescription_kegg"
        );
        assert_eq!(
            lines[1],
            "operon_1\tc1\t100\t400\t\tLT_1\tK00001,K00002\tmap00010,map00020,map01100\talcohol dehydrogenase;aldehyde reductase"
        );
        assert_eq!(lines[2], "operon_1\tc1\t410\t900\t\tLT_2\t\t\t");
        assert_eq!(lines[3], "non_operon\tc1\t1500\t1900\t\tLT_3\t\t\t");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_write_operon_table_without_descriptions() {
        let assignments = vec![OperonAssignment::NonOperon; 3];

        let mut out = Vec::new();
        write_operon_table(&mut out, &genes(), &assignments, &kegg(), None).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.lines().nth(1).unwrap().ends_with("K00001,K00002\tmap00010,map00020,map01100\t"));
    }

    #[test]
    fn test_write_operon_table_empty_has_header() {
        let genes = GeneTable::new(Vec::new()).unwrap();

        let mut out = Vec::new();
        write_operon_table(&mut out, &genes, &[], &kegg(), None).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("operon_number\tcontig\t"));
    }

    #[test]
    fn test_write_operon_table_length_mismatch() {
        let mut out = Vec::new();
        let result = write_operon_table(&mut out, &genes(), &[OperonAssignment::NonOperon], &kegg(), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_staged_output_only_appears_on_commit() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("operons.tsv");
        let assignments = vec![OperonAssignment::NonOperon; 3];

        let staged = StagedOutput::new(&path).unwrap();
        write_operon_table(staged.writer(), &genes(), &assignments, &kegg(), None).unwrap();
        assert!(!path.exists());
        assert_eq!(staged.get_path(), path.as_path());

        staged.commit().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_staged_output_dropped_leaves_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("operons.tsv");

        let staged = StagedOutput::new(&path).unwrap();
        write_operon_table(staged.writer(), &genes(), &[], &kegg(), None).unwrap_err();
        drop(staged);

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_staged_output_missing_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing").join("operons.tsv");

        assert!(matches!(StagedOutput::new(&path), Err(Error::MissingArtifact(_))));
    }

    #[test]
    fn test_operon_names() {
        let assignments = vec![
            OperonAssignment::Operon(2),
            OperonAssignment::NonOperon,
            OperonAssignment::Operon(3),
        ];

        let names = operon_names(&genes(), &assignments);
        assert_eq!(names["LT_1"], "operon_2");
        assert_eq!(names["LT_2"], "non_operon");
        assert_eq!(names["LT_3"], "operon_3");
    }
}
