use rayon::prelude::*;

use crate::evidence::alignment::AlignmentHits;
use crate::evidence::links::ProteinLinks;
use crate::genes::{GeneID, GeneTable};

// Neutral prior for genes without a STRING identifier or without a recorded link
pub const UNKNOWN_LINK_SCORE: u32 = 500;

// Link confidence at or above which neighbours are never split on evidence grounds
pub const STRONG_LINK_THRESHOLD: u32 = 810;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LinkScore {
    prev: u32,
    next: u32,
}

impl LinkScore {
    pub fn new(prev: u32, next: u32) -> LinkScore {
        LinkScore { prev, next }
    }

    pub fn unknown() -> LinkScore {
        Self::new(UNKNOWN_LINK_SCORE, UNKNOWN_LINK_SCORE)
    }

    pub fn get_prev(&self) -> u32 {
        self.prev
    }

    pub fn get_next(&self) -> u32 {
        self.next
    }

    /// Linkage with either ring neighbour counts.
    pub fn get_final(&self) -> u32 {
        self.prev.max(self.next)
    }
}

/// Scores each gene by STRING interaction confidence with its ring neighbours.
pub struct LinkScorer<'a> {
    genes: &'a GeneTable,
    links: &'a ProteinLinks,
    targets: Vec<Option<&'a str>>, // Gene ID -> STRING protein
}

impl<'a> LinkScorer<'a> {
    pub fn new(genes: &'a GeneTable, hits: &'a AlignmentHits, links: &'a ProteinLinks) -> LinkScorer<'a> {
        let targets = genes
            .get_all_genes()
            .iter()
            .map(|gene| hits.get_target(gene.get_locus_tag()))
            .collect();

        LinkScorer { genes, links, targets }
    }

    pub fn get_target(&self, id: GeneID) -> Option<&'a str> {
        self.targets[id.inner()]
    }

    pub fn get_resolved_count(&self) -> usize {
        self.targets.iter().filter(|t| t.is_some()).count()
    }

    /// Score of the link current -> neighbour, or the unknown score if either is unresolved.
    pub fn pair_score(&self, current: GeneID, neighbour: GeneID) -> u32 {
        match (self.get_target(current), self.get_target(neighbour)) {
            (Some(current), Some(neighbour)) => self
                .links
                .get_score(current, neighbour)
                .unwrap_or(UNKNOWN_LINK_SCORE),
            _ => UNKNOWN_LINK_SCORE,
        }
    }

    pub fn score_gene(&self, id: GeneID) -> LinkScore {
        if self.get_target(id).is_none() {
            return LinkScore::unknown();
        }

        LinkScore::new(
            self.pair_score(id, self.genes.get_ring_prev(id)),
            self.pair_score(id, self.genes.get_ring_next(id)),
        )
    }

    pub fn score_all(&self) -> Vec<LinkScore> {
        (0..self.genes.len())
            .into_par_iter()
            .map(|idx| self.score_gene(GeneID::new(idx)))
            .collect()
    }
}
