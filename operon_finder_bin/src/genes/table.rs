use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use super::{Error, Result};
use super::{GeneRecord, GeneTable, Strand};

const GENE_TABLE: &str = "gene table";

const CONTIG_COLUMN: &str = "contig";
const START_COLUMN: &str = "start";
const END_COLUMN: &str = "end";
const STRAND_COLUMN: &str = "strand";
const GENE_NAME_COLUMN: &str = "gene_name";
const LOCUS_NAME_COLUMN: &str = "locus_name";

/// Locate a named column in a header row, failing with a schema error naming the table.
pub fn find_column(headers: &StringRecord, table: &str, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| Error::SchemaMismatch(table.to_string(), column.to_string()))
}

pub fn parse_u64(value: &str, what: &str) -> Result<u64> {
    let value = value.trim();

    // Tables written by dataframe tools can carry integral floats such as "123.0"
    value
        .parse::<u64>()
        .or_else(|_| match value.parse::<f64>() {
            Ok(v) if v >= 0.0 && v.fract() == 0.0 => Ok(v as u64),
            _ => Err(()),
        })
        .map_err(|_| Error::InvalidValue(format!("{} '{}' is not a coordinate", what, value)))
}

/// Reads the tab separated gene table: contig, start, end, strand, gene_name, locus_name.
///
/// Extra columns (such as an unnamed leading row index) are ignored.
pub fn read_gene_table<R: Read>(reader: R) -> Result<GeneTable> {
    let mut tsv = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = tsv.headers()?.clone();
    let contig_idx = find_column(&headers, GENE_TABLE, CONTIG_COLUMN)?;
    let start_idx = find_column(&headers, GENE_TABLE, START_COLUMN)?;
    let end_idx = find_column(&headers, GENE_TABLE, END_COLUMN)?;
    let strand_idx = find_column(&headers, GENE_TABLE, STRAND_COLUMN)?;
    let gene_name_idx = find_column(&headers, GENE_TABLE, GENE_NAME_COLUMN)?;
    let locus_name_idx = find_column(&headers, GENE_TABLE, LOCUS_NAME_COLUMN)?;

    let mut records = Vec::new();

    for row in tsv.records() {
        let row = row?;
        let field = |idx: usize| row.get(idx).unwrap_or("");

        let locus_tag = field(locus_name_idx).trim();
        if locus_tag.is_empty() {
            return Err(Error::InvalidValue(format!(
                "Gene table row {} has no locus_name",
                records.len() + 1
            )));
        }

        records.push(GeneRecord::new(
            field(contig_idx).trim().to_string(),
            parse_u64(field(start_idx), START_COLUMN)?,
            parse_u64(field(end_idx), END_COLUMN)?,
            Strand::parse(field(strand_idx))?,
            field(gene_name_idx).trim().to_string(),
            locus_tag.to_string(),
        ));
    }

    GeneTable::new(records)
}

pub fn read_gene_table_file(path: &Path) -> Result<GeneTable> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::MissingArtifact(format!("gene table {}: {}", path.display(), e)))?;
    read_gene_table(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_gene_table_with_index_column() {
        let data = "\tcontig\tstart\tend\tstrand\tgene_name\tlocus_name\n\
                    0\tc1\t100\t400\t1\tthrA\tLT_1\n\
                    1\tc1\t410\t900\t0\t\tLT_2\n";

        let table = read_gene_table(data.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);

        let first = &table.get_all_genes()[0];
        assert_eq!(first.get_contig(), "c1");
        assert_eq!(first.get_start(), 100);
        assert_eq!(first.get_end(), 400);
        assert_eq!(first.get_strand(), Strand::Forward);
        assert_eq!(first.get_gene_name(), "thrA");

        let second = &table.get_all_genes()[1];
        assert_eq!(second.get_strand(), Strand::Reverse);
        assert_eq!(second.get_gene_name(), "");
        assert_eq!(second.get_locus_tag(), "LT_2");
    }

    #[test]
    fn test_read_gene_table_missing_column() {
        let data = "contig\tstart\tend\tstrand\tgene_name\n\
                    c1\t100\t400\t+\tthrA\n";

        match read_gene_table(data.as_bytes()) {
            Err(Error::SchemaMismatch(_, column)) => assert_eq!(column, "locus_name"),
            _ => panic!("Expected schema mismatch"),
        }
    }

    #[test]
    fn test_read_gene_table_empty() {
        let data = "contig\tstart\tend\tstrand\tgene_name\tlocus_name\n";
        let table = read_gene_table(data.as_bytes()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_parse_u64_accepts_integral_float() {
        assert_eq!(parse_u64("123.0", "start").unwrap(), 123);
        assert!(parse_u64("12.5", "start").is_err());
        assert!(parse_u64("abc", "start").is_err());
    }
}
