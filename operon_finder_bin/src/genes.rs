use std::collections::HashMap;
use std::ops::Range;

pub mod error;
pub mod index;
pub mod table;

pub use crate::genes::error::Error;
pub type Result<T> = std::result::Result<T, Error>;

use self::index::ContigIndex;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn as_str(self) -> &'static str {
        match self {
            Strand::Forward => "+",
            Strand::Reverse => "-",
        }
    }

    // Encoding used by the trained classifier
    pub fn as_feature(self) -> f64 {
        match self {
            Strand::Forward => 1.0,
            Strand::Reverse => 0.0,
        }
    }

    pub fn parse(value: &str) -> Result<Strand> {
        match value.trim() {
            "+" | "1" => Ok(Strand::Forward),
            "-" | "0" | "-1" => Ok(Strand::Reverse),
            other => Err(Error::InvalidValue(format!("Unknown strand '{}'", other))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeneRecord {
    contig: String,
    start: u64,
    end: u64,
    strand: Strand,
    gene_name: String,
    locus_tag: String,
}

impl GeneRecord {
    pub fn new(
        contig: String,
        start: u64,
        end: u64,
        strand: Strand,
        gene_name: String,
        locus_tag: String,
    ) -> GeneRecord {
        GeneRecord {
            contig,
            start,
            end,
            strand,
            gene_name,
            locus_tag,
        }
    }

    pub fn get_contig(&self) -> &str {
        &self.contig
    }

    pub fn get_start(&self) -> u64 {
        self.start
    }

    pub fn get_end(&self) -> u64 {
        self.end
    }

    pub fn get_strand(&self) -> Strand {
        self.strand
    }

    pub fn get_gene_name(&self) -> &str {
        &self.gene_name
    }

    pub fn get_locus_tag(&self) -> &str {
        &self.locus_tag
    }
}

/// Genes of a genome, grouped by contig and ordered by start within each contig.
///
/// Gene position in the table (`GeneID`) is the basis for all neighbour relations.
pub struct GeneTable {
    genes: Vec<GeneRecord>,
    index: ContigIndex,
}

impl GeneTable {
    /// Contigs keep their order of first appearance, genes within a contig are
    /// stably sorted by start coordinate.
    pub fn new(records: Vec<GeneRecord>) -> Result<GeneTable> {
        let mut contig_order: Vec<String> = Vec::new();
        let mut contig_genes: HashMap<String, Vec<GeneRecord>> = HashMap::new();

        for rec in records {
            if !contig_genes.contains_key(&rec.contig) {
                contig_order.push(rec.contig.clone());
            }
            contig_genes
                .entry(rec.contig.clone())
                .or_insert_with(Vec::new)
                .push(rec);
        }

        let mut genes = Vec::new();
        for contig in contig_order.iter() {
            if let Some(mut contig_recs) = contig_genes.remove(contig) {
                contig_recs.sort_by_key(|rec| rec.start);
                genes.extend(contig_recs);
            }
        }

        let index = ContigIndex::new(&genes)?;

        Ok(GeneTable { genes, index })
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn get_all_genes(&self) -> &[GeneRecord] {
        &self.genes
    }

    pub fn get_gene_by_id(&self, id: GeneID) -> &GeneRecord {
        &self.genes[id.inner()]
    }

    pub fn get_gene_by_locus_tag(&self, locus_tag: &str) -> Option<&GeneRecord> {
        self.index
            .get_gene_id_by_locus_tag(locus_tag)
            .map(|id| self.get_gene_by_id(id))
    }

    pub fn gene_ids(&self) -> impl Iterator<Item = GeneID> {
        (0..self.genes.len()).map(GeneID::new)
    }

    // Delegate contig lookups and neighbour relations to the Index

    pub fn get_all_contigs(&self) -> &[Contig] {
        self.index.get_all_contigs()
    }

    pub fn get_contig_by_id(&self, id: ContigID) -> &Contig {
        self.index.get_contig_by_id(id)
    }

    pub fn get_contig_by_name(&self, name: &str) -> Option<&Contig> {
        self.index.get_contig_by_name(name)
    }

    pub fn get_genes_for_contig(&self, id: ContigID) -> &[GeneRecord] {
        &self.genes[self.index.get_contig_by_id(id).get_gene_range()]
    }

    pub fn get_contig_id_for_gene(&self, id: GeneID) -> ContigID {
        self.index.get_contig_id_for_gene(id)
    }

    pub fn get_ring_prev(&self, id: GeneID) -> GeneID {
        self.index.get_ring_prev(id)
    }

    pub fn get_ring_next(&self, id: GeneID) -> GeneID {
        self.index.get_ring_next(id)
    }

    pub fn is_contig_start(&self, id: GeneID) -> bool {
        self.index.is_contig_start(id)
    }
}

// Newtype for Contig ID

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ContigID(usize);

impl ContigID {
    fn new(id: usize) -> ContigID {
        ContigID(id)
    }

    pub fn inner(&self) -> usize {
        self.0
    }
}

pub struct Contig {
    name: String,
    id: ContigID,
    genes: Range<usize>,
}

impl Contig {
    fn new(name: String, id: ContigID, genes: Range<usize>) -> Contig {
        Contig { name, id, genes }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_id(&self) -> ContigID {
        self.id
    }

    pub fn get_gene_range(&self) -> Range<usize> {
        self.genes.clone()
    }
}

// Newtype for Gene ID, the position of the gene in the table

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct GeneID(usize);

impl GeneID {
    pub fn new(id: usize) -> GeneID {
        GeneID(id)
    }

    pub fn inner(&self) -> usize {
        self.0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn gene(contig: &str, start: u64, end: u64, strand: Strand, locus_tag: &str) -> GeneRecord {
        GeneRecord::new(
            contig.to_string(),
            start,
            end,
            strand,
            String::new(),
            locus_tag.to_string(),
        )
    }

    #[test]
    fn test_table_groups_and_sorts_contigs() {
        let table = GeneTable::new(vec![
            gene("c2", 500, 900, Strand::Forward, "B2"),
            gene("c1", 300, 400, Strand::Forward, "A2"),
            gene("c2", 100, 200, Strand::Reverse, "B1"),
            gene("c1", 10, 200, Strand::Forward, "A1"),
        ])
        .unwrap();

        let tags: Vec<&str> = table.get_all_genes().iter().map(|g| g.get_locus_tag()).collect();
        assert_eq!(tags, vec!["B1", "B2", "A1", "A2"]);

        assert_eq!(table.get_all_contigs().len(), 2);
        assert_eq!(table.get_all_contigs()[0].get_name(), "c2");
        assert_eq!(table.get_contig_by_name("c1").unwrap().get_gene_range(), 2..4);
        assert_eq!(table.get_genes_for_contig(ContigID::new(1))[0].get_locus_tag(), "A1");
    }

    #[test]
    fn test_table_rejects_duplicate_locus_tag() {
        let result = GeneTable::new(vec![
            gene("c1", 10, 20, Strand::Forward, "A1"),
            gene("c1", 30, 40, Strand::Forward, "A1"),
        ]);

        assert!(matches!(result, Err(Error::DuplicateValue(_))));
    }

    #[test]
    fn test_strand_parse() {
        assert_eq!(Strand::parse("+").unwrap(), Strand::Forward);
        assert_eq!(Strand::parse("1").unwrap(), Strand::Forward);
        assert_eq!(Strand::parse("-").unwrap(), Strand::Reverse);
        assert_eq!(Strand::parse("0").unwrap(), Strand::Reverse);
        assert!(Strand::parse(".").is_err());
    }
}
