use std::collections::HashMap;

use super::{Contig, ContigID, GeneID, GeneRecord};
use super::{Error, Result};

/// Contig boundaries and locus tag lookup over a contig-grouped gene list.
///
/// Each contig is a ring: the gene after the last is the first, and the gene
/// before the first is the last. Rings never cross contig boundaries.
pub struct ContigIndex {
    contigs: Vec<Contig>,
    contig_name_idx: HashMap<String, ContigID>,

    gene_contigs: Vec<ContigID>, // Gene ID -> Contig ID
    locus_tag_idx: HashMap<String, GeneID>,
}

impl ContigIndex {
    pub fn new(genes: &[GeneRecord]) -> Result<ContigIndex> {
        let mut contigs: Vec<Contig> = Vec::new();
        let mut contig_name_idx = HashMap::new();

        let mut gene_contigs = Vec::with_capacity(genes.len());
        let mut locus_tag_idx = HashMap::with_capacity(genes.len());

        let mut maybe_last_contig_name: Option<&str> = None;
        let mut contig_start = 0;
        let mut contig_id = ContigID::new(usize::max_value());

        for (idx, gene) in genes.iter().enumerate() {
            if maybe_last_contig_name != Some(gene.get_contig())
            // New contig
            {
                if let Some(last_name) = maybe_last_contig_name {
                    contigs.push(Contig::new(last_name.to_string(), contig_id, contig_start..idx));
                }

                if contig_name_idx.contains_key(gene.get_contig()) {
                    return Err(Error::InvalidValue(format!(
                        "Genes of contig {} are not contiguous",
                        gene.get_contig()
                    )));
                }

                contig_id = ContigID::new(contigs.len());
                contig_name_idx.insert(gene.get_contig().to_string(), contig_id);
                contig_start = idx;

                maybe_last_contig_name = Some(gene.get_contig());
            }

            gene_contigs.push(contig_id);

            if locus_tag_idx
                .insert(gene.get_locus_tag().to_string(), GeneID::new(idx))
                .is_some()
            {
                return Err(Error::DuplicateValue(format!(
                    "Locus tag {} appears more than once",
                    gene.get_locus_tag()
                )));
            }
        }

        if let Some(last_name) = maybe_last_contig_name {
            contigs.push(Contig::new(last_name.to_string(), contig_id, contig_start..genes.len()));
        }

        Ok(ContigIndex {
            contigs,
            contig_name_idx,
            gene_contigs,
            locus_tag_idx,
        })
    }

    pub fn get_all_contigs(&self) -> &[Contig] {
        &self.contigs
    }

    pub fn get_contig_by_id(&self, id: ContigID) -> &Contig {
        &self.contigs[id.inner()]
    }

    pub fn get_contig_by_name(&self, name: &str) -> Option<&Contig> {
        self.contig_name_idx
            .get(name)
            .map(|id| self.get_contig_by_id(*id))
    }

    pub fn get_gene_id_by_locus_tag(&self, locus_tag: &str) -> Option<GeneID> {
        self.locus_tag_idx.get(locus_tag).copied()
    }

    pub fn get_contig_id_for_gene(&self, id: GeneID) -> ContigID {
        self.gene_contigs[id.inner()]
    }

    pub fn is_contig_start(&self, id: GeneID) -> bool {
        self.get_contig_for_gene(id).genes.start == id.inner()
    }

    pub fn get_ring_prev(&self, id: GeneID) -> GeneID {
        let range = &self.get_contig_for_gene(id).genes;

        if id.inner() == range.start {
            GeneID::new(range.end - 1)
        } else {
            GeneID::new(id.inner() - 1)
        }
    }

    pub fn get_ring_next(&self, id: GeneID) -> GeneID {
        let range = &self.get_contig_for_gene(id).genes;

        if id.inner() + 1 == range.end {
            GeneID::new(range.start)
        } else {
            GeneID::new(id.inner() + 1)
        }
    }

    fn get_contig_for_gene(&self, id: GeneID) -> &Contig {
        self.get_contig_by_id(self.get_contig_id_for_gene(id))
    }
}
