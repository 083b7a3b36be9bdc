use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::genes::{Error, GeneRecord, GeneTable, Result, Strand};

const FASTA_DIRECTIVE: &str = "##FASTA";
const LOCUS_TAG_ATTRIBUTE: &str = "locus_tag";
const GENE_ATTRIBUTE: &str = "gene";
pub const OPERON_ATTRIBUTE: &str = "operon";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GffFeature {
    Gene,
    CDS,
    Other(String),
}

impl GffFeature {
    pub fn parse(value: &str) -> GffFeature {
        match value {
            "gene" => GffFeature::Gene,
            "CDS" => GffFeature::CDS,
            other => GffFeature::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GffFeature::Gene => "gene",
            GffFeature::CDS => "CDS",
            GffFeature::Other(name) => name,
        }
    }
}

impl Display for GffFeature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_optional(value: &str) -> Option<&str> {
    if value == "." {
        None
    } else {
        Some(value)
    }
}

/*

Columns: sequence, source, feature, start, end, score, strand, phase, attributes.
Start and end are 1-based and inclusive. "." marks an empty score, strand or phase.
Attributes are ';' separated key=value pairs, with reserved characters percent-encoded.

 */

#[derive(Clone, Debug, PartialEq)]
pub struct GffRecord {
    sequence: String,
    source: String,
    feature: GffFeature,
    start: u64,
    end: u64,
    score: Option<String>,
    strand: Option<Strand>,
    phase: Option<String>,
    attributes: String,
}

impl GffRecord {
    pub fn parse(line: &str) -> Result<GffRecord> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 9 {
            return Err(Error::InvalidValue(format!(
                "GFF line has {} columns, expected 9: {}",
                fields.len(),
                line
            )));
        }

        let coordinate = |value: &str| {
            value
                .parse::<u64>()
                .map_err(|_| Error::InvalidValue(format!("Invalid GFF coordinate '{}'", value)))
        };

        let strand = match parse_optional(fields[6]) {
            Some("?") | None => None,
            Some(value) => Some(Strand::parse(value)?),
        };

        Ok(GffRecord {
            sequence: fields[0].to_string(),
            source: fields[1].to_string(),
            feature: GffFeature::parse(fields[2]),
            start: coordinate(fields[3])?,
            end: coordinate(fields[4])?,
            score: parse_optional(fields[5]).map(str::to_string),
            strand,
            phase: parse_optional(fields[7]).map(str::to_string),
            attributes: fields[8].to_string(),
        })
    }

    pub fn get_feature(&self) -> &GffFeature {
        &self.feature
    }

    pub fn get_start(&self) -> u64 {
        self.start
    }

    pub fn get_end(&self) -> u64 {
        self.end
    }

    pub fn get_strand(&self) -> Option<Strand> {
        self.strand
    }

    pub fn get_attributes(&self) -> &String {
        &self.attributes
    }

    /// Decoded value of the first attribute with the given key.
    pub fn get_attribute(&self, key: &str) -> Option<String> {
        self.attributes
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| k.trim() == key)
            .map(|(_, v)| percent_decode(v.trim()))
    }

    pub fn push_attribute(&mut self, key: &str, value: &str) {
        let trimmed = self.attributes.trim_end_matches(';');
        self.attributes = if trimmed.is_empty() || trimmed == "." {
            format!("{}={}", key, value)
        } else {
            format!("{};{}={}", trimmed, key, value)
        };
    }

    fn to_gene(&self) -> Result<GeneRecord> {
        let locus_tag = self.get_attribute(LOCUS_TAG_ATTRIBUTE).ok_or_else(|| {
            Error::InvalidValue(format!(
                "CDS at {}:{}-{} has no {}",
                self.sequence, self.start, self.end, LOCUS_TAG_ATTRIBUTE
            ))
        })?;
        let strand = self.strand.ok_or_else(|| {
            Error::InvalidValue(format!("CDS {} has no strand", locus_tag))
        })?;

        Ok(GeneRecord::new(
            self.sequence.clone(),
            self.start,
            self.end,
            strand,
            self.get_attribute(GENE_ATTRIBUTE).unwrap_or_default(),
            locus_tag,
        ))
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Decodes %XX escapes, leaving malformed escapes as they are.
pub fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut idx = 0;

    while idx < bytes.len() {
        if bytes[idx] == b'%' && idx + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[idx + 1]), hex_value(bytes[idx + 2])) {
                decoded.push(hi * 16 + lo);
                idx += 3;
                continue;
            }
        }
        decoded.push(bytes[idx]);
        idx += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

pub enum GffLine {
    Record(GffRecord),
    Other(String), // Comments, directives, blank lines and the FASTA section
}

/// Line-by-line GFF3 reader. Everything from `##FASTA` onwards is passed through as `Other`.
pub struct GffReader<R: Read> {
    reader: BufReader<R>,
    in_fasta: bool,
}

impl<R: Read> GffReader<R> {
    pub fn new(reader: R) -> GffReader<R> {
        GffReader {
            reader: BufReader::new(reader),
            in_fasta: false,
        }
    }

    pub fn in_fasta(&self) -> bool {
        self.in_fasta
    }
}

impl<R: Read> Iterator for GffReader<R> {
    type Item = Result<GffLine>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => return None,
            Ok(_) => {}
            Err(e) => return Some(Err(e.into())),
        }

        let line = line.trim_end_matches(&['\n', '\r'][..]).to_string();

        if self.in_fasta || line.is_empty() || line.starts_with('#') {
            if line.starts_with(FASTA_DIRECTIVE) {
                self.in_fasta = true;
            }
            return Some(Ok(GffLine::Other(line)));
        }

        // A bare FASTA header without the directive also ends the feature section
        if line.starts_with('>') {
            self.in_fasta = true;
            return Some(Ok(GffLine::Other(line)));
        }

        Some(GffRecord::parse(&line).map(GffLine::Record))
    }
}

/// Collects CDS features as genes. Repeated locus tags (split CDS) are merged
/// into a single gene spanning all their segments.
pub fn read_gff_genes<R: Read>(reader: R) -> Result<GeneTable> {
    let mut records: Vec<GeneRecord> = Vec::new();
    let mut by_locus_tag: HashMap<String, usize> = HashMap::new();
    let mut gff = GffReader::new(reader);

    while let Some(line) = gff.next() {
        let rec = match line? {
            GffLine::Record(rec) => rec,
            GffLine::Other(_) if gff.in_fasta() => break,
            GffLine::Other(_) => continue,
        };

        if rec.feature != GffFeature::CDS {
            continue;
        }

        let gene = rec.to_gene()?;

        match by_locus_tag.get(gene.get_locus_tag()) {
            Some(idx) => {
                let existing = &records[*idx];
                if existing.get_contig() != gene.get_contig() {
                    return Err(Error::DuplicateValue(format!(
                        "CDS locus_tag {} appears on contigs {} and {}",
                        gene.get_locus_tag(),
                        existing.get_contig(),
                        gene.get_contig()
                    )));
                }
                records[*idx] = GeneRecord::new(
                    existing.get_contig().to_string(),
                    existing.get_start().min(gene.get_start()),
                    existing.get_end().max(gene.get_end()),
                    existing.get_strand(),
                    existing.get_gene_name().to_string(),
                    existing.get_locus_tag().to_string(),
                );
            }
            None => {
                by_locus_tag.insert(gene.get_locus_tag().to_string(), records.len());
                records.push(gene);
            }
        }
    }

    GeneTable::new(records)
}

pub fn read_gff_genes_file(path: &Path) -> Result<GeneTable> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::MissingArtifact(format!("GFF {}: {}", path.display(), e)))?;
    read_gff_genes(file)
}

pub struct GffWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> GffWriter<W> {
    pub fn new(writer: BufWriter<W>) -> GffWriter<W> {
        GffWriter { writer }
    }

    pub fn write_record(&mut self, rec: &GffRecord) -> std::io::Result<()> {
        let score = rec.score.as_deref().unwrap_or(".");
        let strand = rec.strand.map_or(".", |v| v.as_str());
        let phase = rec.phase.as_deref().unwrap_or(".");

        write!(
            self.writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            rec.sequence,
            rec.source,
            rec.feature,
            rec.start,
            rec.end,
            score,
            strand,
            phase,
            rec.attributes
        )
    }

    pub fn write_line(&mut self, line: &GffLine) -> std::io::Result<()> {
        match line {
            GffLine::Record(rec) => self.write_record(rec),
            GffLine::Other(text) => write!(self.writer, "{}\n", text),
        }
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// Copies a GFF3 annotation, appending `operon=<name>` to every CDS whose
/// locus tag has an operon name. Returns the number of annotated CDS lines.
pub fn merge_operons<R: Read, W: Write>(
    reader: R,
    writer: W,
    operons: &HashMap<String, String>,
) -> Result<usize> {
    let mut gff_writer = GffWriter::new(BufWriter::new(writer));
    let mut annotated = 0;

    for line in GffReader::new(reader) {
        let mut line = line?;

        if let GffLine::Record(rec) = &mut line {
            if rec.feature == GffFeature::CDS {
                let operon = rec
                    .get_attribute(LOCUS_TAG_ATTRIBUTE)
                    .and_then(|locus_tag| operons.get(&locus_tag));

                if let Some(operon) = operon {
                    rec.push_attribute(OPERON_ATTRIBUTE, operon);
                    annotated += 1;
                }
            }
        }

        gff_writer.write_line(&line)?;
    }

    gff_writer.flush()?;
    Ok(annotated)
}
