use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::analysis::ScoringScope;
use crate::evidence::kegg::{KeggAnnotation, KeggAnnotations};
use crate::genes::{GeneID, GeneTable};

pub fn pathway_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> usize {
    a.intersection(b).count()
}

/// Scores each gene by the number of KEGG pathways shared with its neighbours.
///
/// Only genes with a non-empty pathway set take part: each is compared with
/// the previous and next such gene, and the larger shared count is kept.
/// With contig scope the walk stops at contig edges, with table scope it runs
/// over the whole table. The ends compare against an empty set, and genes
/// without pathways score 0.
pub struct PathwayScorer<'a> {
    genes: &'a GeneTable,
    scope: ScoringScope,
    annotations: Vec<Option<&'a KeggAnnotation>>, // Gene ID -> annotation
    empty: BTreeSet<String>,
}

impl<'a> PathwayScorer<'a> {
    pub fn new(genes: &'a GeneTable, kegg: &'a KeggAnnotations, scope: ScoringScope) -> PathwayScorer<'a> {
        let annotations = genes
            .get_all_genes()
            .iter()
            .map(|gene| kegg.get_annotation(gene.get_locus_tag()))
            .collect();

        PathwayScorer {
            genes,
            scope,
            annotations,
            empty: BTreeSet::new(),
        }
    }

    pub fn get_annotation(&self, id: GeneID) -> Option<&'a KeggAnnotation> {
        self.annotations[id.inner()]
    }

    pub fn get_annotated_count(&self) -> usize {
        self.annotations.iter().filter(|a| a.is_some()).count()
    }

    pub fn get_pathways(&self, id: GeneID) -> &BTreeSet<String> {
        match self.get_annotation(id) {
            Some(annotation) => annotation.get_pathways(),
            None => &self.empty,
        }
    }

    fn score_range(&self, gene_range: std::ops::Range<usize>) -> Vec<usize> {
        let mut counts = vec![0; gene_range.len()];

        let mapped: Vec<usize> = gene_range
            .clone()
            .filter(|idx| !self.get_pathways(GeneID::new(*idx)).is_empty())
            .collect();

        for (pos, idx) in mapped.iter().enumerate() {
            let pathways = self.get_pathways(GeneID::new(*idx));

            let prev_overlap = match pos.checked_sub(1) {
                Some(prev_pos) => pathway_overlap(pathways, self.get_pathways(GeneID::new(mapped[prev_pos]))),
                None => 0,
            };
            let next_overlap = match mapped.get(pos + 1) {
                Some(next_idx) => pathway_overlap(pathways, self.get_pathways(GeneID::new(*next_idx))),
                None => 0,
            };

            counts[idx - gene_range.start] = prev_overlap.max(next_overlap);
        }

        counts
    }

    pub fn score_all(&self) -> Vec<usize> {
        if self.scope == ScoringScope::Table {
            return self.score_range(0..self.genes.len());
        }

        let per_contig: Vec<Vec<usize>> = self
            .genes
            .get_all_contigs()
            .par_iter()
            .map(|contig| self.score_range(contig.get_gene_range()))
            .collect();

        per_contig.into_iter().flatten().collect()
    }
}
