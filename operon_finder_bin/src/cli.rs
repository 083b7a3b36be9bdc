use std::path::{Path, PathBuf};

use clap::Parser;

use crate::analysis::ScoringScope;
use crate::genes::{Error, Result};

#[derive(Parser, Debug)]
#[command(name = "OperonFinder", version, about = "Predicts operons in annotated bacterial genomes", long_about = None)]
pub struct Args {
    #[arg(
        long = "gff",
        value_name = "PATH",
        conflicts_with = "genes",
        required_unless_present = "genes",
        help = "GFF3 annotation; CDS features with a locus_tag become genes"
    )]
    pub gff: Option<PathBuf>,

    #[arg(
        long = "genes",
        value_name = "PATH",
        help = "Gene table TSV (contig, start, end, strand, gene_name, locus_name)"
    )]
    pub genes: Option<PathBuf>,

    #[arg(
        long = "emission-matrix",
        value_name = "PATH",
        help = "Intergenic distance HMM emission matrix (.npy, or .h5 with the hdf5 feature)"
    )]
    pub emission_matrix: PathBuf,

    #[arg(
        long = "diamond",
        value_name = "PATH",
        help = "Alignment hits of gene products against STRING proteins (BLAST tabular)"
    )]
    pub diamond: PathBuf,

    #[arg(long = "protein-links", value_name = "PATH", help = "STRING protein links file")]
    pub protein_links: PathBuf,

    #[arg(
        long = "taxid",
        value_name = "ID",
        help = "NCBI taxon id prefix to strip from STRING protein identifiers"
    )]
    pub taxid: Option<String>,

    #[arg(long = "kofam", value_name = "PATH", help = "KofamScan mapper output")]
    pub kofam: PathBuf,

    #[arg(long = "ko-map", value_name = "PATH", help = "JSON map of KO to KEGG pathway ids")]
    pub ko_map: PathBuf,

    #[arg(
        long = "ko-descriptions",
        value_name = "PATH",
        help = "KofamScan ko_list or two column KO description table"
    )]
    pub ko_descriptions: Option<PathBuf>,

    #[arg(long = "model", value_name = "PATH", help = "Trained classifier (JSON)")]
    pub model: PathBuf,

    #[arg(short = 'o', long = "output", value_name = "PATH", help = "Operon table TSV to write")]
    pub output: PathBuf,

    #[arg(
        long = "output-gff",
        value_name = "PATH",
        requires = "gff",
        help = "Copy of the input GFF3 with operon= qualifiers on CDS features"
    )]
    pub output_gff: Option<PathBuf>,

    #[arg(
        long = "reset-at-contig",
        help = "Close the running operon at every contig start"
    )]
    pub reset_at_contig: bool,

    #[arg(
        long = "table-scoring",
        help = "Decode the distance HMM and walk pathway neighbours over the whole gene table instead of per contig"
    )]
    pub table_scoring: bool,

    #[arg(
        short = 't',
        long = "threads",
        value_name = "THREADS",
        default_value_t = 0,
        help = "Number of threads, 0 uses all cores"
    )]
    pub threads: usize,

    #[arg(short = 'v', long = "verbose", help = "Log debug messages")]
    pub verbose: bool,
}

fn validate(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        return Err(Error::MissingArtifact(format!("{} {} does not exist", what, path.display())));
    }
    if !path.is_file() {
        return Err(Error::MissingArtifact(format!("{} {} is not a file", what, path.display())));
    }

    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn validate_output(path: &Path, what: &str) -> Result<()> {
    let dir = parent_dir(path);
    if !dir.is_dir() {
        return Err(Error::MissingArtifact(format!(
            "{} directory {} does not exist",
            what,
            dir.display()
        )));
    }
    if path.is_dir() {
        return Err(Error::InvalidValue(format!("{} {} is a directory", what, path.display())));
    }

    Ok(())
}

// Canonical form of a path that may not exist yet
fn resolve(path: &Path) -> Option<PathBuf> {
    if let Ok(canonical) = path.canonicalize() {
        return Some(canonical);
    }

    let dir = parent_dir(path).canonicalize().ok()?;
    Some(dir.join(path.file_name()?))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (resolve(a), resolve(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

impl Args {
    pub fn scoring_scope(&self) -> ScoringScope {
        if self.table_scoring {
            ScoringScope::Table
        } else {
            ScoringScope::Contig
        }
    }

    fn inputs(&self) -> Vec<&Path> {
        let mut inputs: Vec<&Path> = vec![
            self.emission_matrix.as_path(),
            self.diamond.as_path(),
            self.protein_links.as_path(),
            self.kofam.as_path(),
            self.ko_map.as_path(),
            self.model.as_path(),
        ];
        inputs.extend(self.gff.as_deref());
        inputs.extend(self.genes.as_deref());
        inputs.extend(self.ko_descriptions.as_deref());
        inputs
    }

    fn outputs(&self) -> Vec<&Path> {
        let mut outputs: Vec<&Path> = vec![self.output.as_path()];
        outputs.extend(self.output_gff.as_deref());
        outputs
    }

    /// Every input and output location is checked before any work starts.
    pub fn check(&self) -> Result<()> {
        match (&self.gff, &self.genes) {
            (Some(gff), None) => validate(gff, "GFF")?,
            (None, Some(genes)) => validate(genes, "gene table")?,
            _ => {
                return Err(Error::InvalidValue(
                    "Exactly one of --gff or --genes is required".to_string(),
                ))
            }
        }

        if self.output_gff.is_some() && self.gff.is_none() {
            return Err(Error::InvalidValue("--output-gff requires --gff".to_string()));
        }

        validate(&self.emission_matrix, "emission matrix")?;
        validate(&self.diamond, "alignment hits")?;
        validate(&self.protein_links, "protein links")?;
        validate(&self.kofam, "KofamScan output")?;
        validate(&self.ko_map, "KO map")?;
        validate(&self.model, "classifier model")?;

        if let Some(descriptions) = &self.ko_descriptions {
            validate(descriptions, "KO descriptions")?;
        }

        validate_output(&self.output, "output")?;
        if let Some(output_gff) = &self.output_gff {
            validate_output(output_gff, "output GFF")?;
        }

        let outputs = self.outputs();
        for (idx, output) in outputs.iter().enumerate() {
            if let Some(input) = self.inputs().into_iter().find(|input| same_file(input, output)) {
                return Err(Error::InvalidValue(format!(
                    "Output {} would overwrite input {}",
                    output.display(),
                    input.display()
                )));
            }
            if outputs[idx + 1..].iter().any(|other| same_file(other, output)) {
                return Err(Error::InvalidValue(format!(
                    "Output {} is given twice",
                    output.display()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args_in(dir: &TempDir, gene_source: &[&str]) -> Vec<String> {
        let path = |name: &str| dir.path().join(name).to_string_lossy().into_owned();

        let mut args = vec!["OperonFinder".to_string()];
        args.extend(gene_source.iter().map(|s| s.to_string()));
        for (flag, file) in [
            ("--emission-matrix", "emission.npy"),
            ("--diamond", "hits.tsv"),
            ("--protein-links", "links.txt"),
            ("--kofam", "kofam.txt"),
            ("--ko-map", "ko_map.json"),
            ("--model", "model.json"),
            ("--output", "operons.tsv"),
        ] {
            args.push(flag.to_string());
            args.push(path(file));
        }
        args
    }

    fn touch_inputs(dir: &TempDir) {
        for file in ["emission.npy", "hits.tsv", "links.txt", "kofam.txt", "ko_map.json", "model.json", "genes.tsv"] {
            std::fs::write(dir.path().join(file), "").unwrap();
        }
    }

    #[test]
    fn test_check_accepts_existing_inputs() {
        let dir = TempDir::new().unwrap();
        touch_inputs(&dir);
        let genes = dir.path().join("genes.tsv").to_string_lossy().into_owned();

        let args = Args::try_parse_from(args_in(&dir, &["--genes", &genes])).unwrap();
        assert!(args.check().is_ok());
        assert!(!args.reset_at_contig);
        assert_eq!(args.threads, 0);
    }

    #[test]
    fn test_check_reports_missing_input() {
        let dir = TempDir::new().unwrap();
        touch_inputs(&dir);
        std::fs::remove_file(dir.path().join("links.txt")).unwrap();
        let genes = dir.path().join("genes.tsv").to_string_lossy().into_owned();

        let args = Args::try_parse_from(args_in(&dir, &["--genes", &genes])).unwrap();
        match args.check() {
            Err(Error::MissingArtifact(msg)) => assert!(msg.contains("links.txt")),
            other => panic!("Unexpected check result {:?}", other),
        }
    }

    #[test]
    fn test_check_rejects_output_gff_over_input() {
        let dir = TempDir::new().unwrap();
        touch_inputs(&dir);
        std::fs::write(dir.path().join("genome.gff"), "").unwrap();
        let gff = dir.path().join("genome.gff").to_string_lossy().into_owned();
        let same_gff = dir.path().join(".").join("genome.gff").to_string_lossy().into_owned();

        let args = Args::try_parse_from(args_in(&dir, &["--gff", &gff, "--output-gff", &same_gff])).unwrap();
        assert!(matches!(args.check(), Err(Error::InvalidValue(_))));

        let other = dir.path().join("annotated.gff").to_string_lossy().into_owned();
        let args = Args::try_parse_from(args_in(&dir, &["--gff", &gff, "--output-gff", &other])).unwrap();
        assert!(args.check().is_ok());
    }

    #[test]
    fn test_check_rejects_missing_output_directory() {
        let dir = TempDir::new().unwrap();
        touch_inputs(&dir);
        std::fs::write(dir.path().join("genome.gff"), "").unwrap();
        let gff = dir.path().join("genome.gff").to_string_lossy().into_owned();
        let missing = dir.path().join("missing").join("out.gff").to_string_lossy().into_owned();

        let args = Args::try_parse_from(args_in(&dir, &["--gff", &gff, "--output-gff", &missing])).unwrap();
        match args.check() {
            Err(Error::MissingArtifact(msg)) => assert!(msg.contains("missing")),
            other => panic!("Unexpected check result {:?}", other),
        }
    }

    #[test]
    fn test_scoring_scope_flag() {
        let dir = TempDir::new().unwrap();

        let args = Args::try_parse_from(args_in(&dir, &["--genes", "b.tsv"])).unwrap();
        assert_eq!(args.scoring_scope(), ScoringScope::Contig);

        let args = Args::try_parse_from(args_in(&dir, &["--genes", "b.tsv", "--table-scoring"])).unwrap();
        assert_eq!(args.scoring_scope(), ScoringScope::Table);
    }

    #[test]
    fn test_gene_source_is_exclusive() {
        let dir = TempDir::new().unwrap();

        assert!(Args::try_parse_from(args_in(&dir, &[])).is_err());
        assert!(Args::try_parse_from(args_in(&dir, &["--gff", "a.gff", "--genes", "b.tsv"])).is_err());
        assert!(Args::try_parse_from(args_in(&dir, &["--genes", "b.tsv", "--output-gff", "c.gff"])).is_err());
        assert!(Args::try_parse_from(args_in(&dir, &["--gff", "a.gff", "--output-gff", "c.gff"])).is_ok());
    }
}
