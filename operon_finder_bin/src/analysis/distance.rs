use rayon::prelude::*;

use crate::analysis::hmm::CategoricalHmm;
use crate::analysis::ScoringScope;
use crate::genes::{Contig, GeneRecord, GeneTable, Result};

// Bins are right closed intervals (-1, 14], (14, 29], ... (779, 794], plus one overflow bin
pub const DISTANCE_BIN_WIDTH: u64 = 15;
pub const DISTANCE_BINS: usize = 54;
const LAST_BIN_EDGE: u64 = 794;

// Synthetic gap at a contig edge, where there is no neighbouring gene in that direction
pub const BOUNDARY_DISTANCE: u64 = 1;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IntergenicGap {
    next: u64,
    prev: u64,
}

impl IntergenicGap {
    pub fn get_next(&self) -> u64 {
        self.next
    }

    pub fn get_prev(&self) -> u64 {
        self.prev
    }

    pub fn get_bin(&self) -> usize {
        distance_bin(self.next)
    }
}

pub fn distance_bin(distance: u64) -> usize {
    if distance > LAST_BIN_EDGE {
        DISTANCE_BINS - 1
    } else {
        (distance / DISTANCE_BIN_WIDTH) as usize
    }
}

fn clamped_distance(upstream: &GeneRecord, downstream: &GeneRecord) -> u64 {
    // Overlapping annotations give negative distances
    downstream.get_start().saturating_sub(upstream.get_end())
}

/// Gaps for the genes of one contig, in order. No wrap around: the contig edges get the boundary distance.
pub fn contig_gaps(genes: &[GeneRecord]) -> Vec<IntergenicGap> {
    let nexts: Vec<u64> = (0..genes.len())
        .map(|i| match genes.get(i + 1) {
            Some(next_gene) => clamped_distance(&genes[i], next_gene),
            None => BOUNDARY_DISTANCE,
        })
        .collect();

    (0..genes.len())
        .map(|i| IntergenicGap {
            next: nexts[i],
            prev: if i == 0 { BOUNDARY_DISTANCE } else { nexts[i - 1] },
        })
        .collect()
}

/// Scores each gene with the posterior probability of the operon state of the
/// intergenic distance HMM. Gaps never span contigs; the scope decides whether each
/// contig is decoded as its own observation sequence or the whole table as one.
pub struct DistanceScorer<'a> {
    genes: &'a GeneTable,
    hmm: &'a CategoricalHmm<'a>,
    scope: ScoringScope,
}

impl<'a> DistanceScorer<'a> {
    pub fn new(genes: &'a GeneTable, hmm: &'a CategoricalHmm<'a>, scope: ScoringScope) -> DistanceScorer<'a> {
        DistanceScorer { genes, hmm, scope }
    }

    pub fn gaps(&self) -> Vec<IntergenicGap> {
        self.genes
            .get_all_contigs()
            .iter()
            .flat_map(|contig| contig_gaps(self.genes.get_genes_for_contig(contig.get_id())))
            .collect()
    }

    fn contig_bins(&self, contig: &Contig) -> Vec<usize> {
        contig_gaps(self.genes.get_genes_for_contig(contig.get_id()))
            .iter()
            .map(|gap| gap.get_bin())
            .collect()
    }

    pub fn score_all(&self) -> Result<Vec<f64>> {
        match self.scope {
            ScoringScope::Contig => {
                let per_contig: Vec<Vec<f64>> = self
                    .genes
                    .get_all_contigs()
                    .par_iter()
                    .map(|contig| self.hmm.operon_probabilities(&self.contig_bins(contig)))
                    .collect::<Result<Vec<_>>>()?;

                Ok(per_contig.into_iter().flatten().collect())
            }
            ScoringScope::Table => {
                let bins: Vec<usize> = self.gaps().iter().map(|gap| gap.get_bin()).collect();
                self.hmm.operon_probabilities(&bins)
            }
        }
    }
}
