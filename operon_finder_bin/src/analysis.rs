use log::{debug, info};

use crate::analysis::classifier::{Classifier, FeatureVector, OperonLabel};
use crate::analysis::distance::DistanceScorer;
use crate::analysis::hmm::CategoricalHmm;
use crate::analysis::link::{LinkScore, LinkScorer, UNKNOWN_LINK_SCORE};
use crate::analysis::pathway::PathwayScorer;
use crate::analysis::segment::{OperonAssignment, OperonSegmenter, SegmentEvidence, SegmentationSummary};
use crate::evidence::alignment::AlignmentHits;
use crate::evidence::emission::EmissionMatrix;
use crate::evidence::kegg::KeggAnnotations;
use crate::evidence::links::ProteinLinks;
use crate::genes::{GeneID, GeneTable, Result};

pub mod classifier;
pub mod distance;
pub mod hmm;
pub mod link;
pub mod pathway;
pub mod segment;

/// Extent of the gene sequence that the distance HMM and pathway neighbour walk see.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScoringScope {
    Contig, // Each contig on its own
    Table,  // The whole gene table as one sequence
}

/// Everything computed for a genome, indexed by gene position in the table.
pub struct AnalysisResult {
    hmm_probabilities: Vec<f64>,
    link_scores: Vec<LinkScore>,
    pathway_overlaps: Vec<usize>,
    features: Vec<FeatureVector>,
    labels: Vec<OperonLabel>,
    assignments: Vec<OperonAssignment>,
    summary: SegmentationSummary,
}

impl AnalysisResult {
    pub fn get_hmm_probabilities(&self) -> &[f64] {
        &self.hmm_probabilities
    }

    pub fn get_link_scores(&self) -> &[LinkScore] {
        &self.link_scores
    }

    pub fn get_pathway_overlaps(&self) -> &[usize] {
        &self.pathway_overlaps
    }

    pub fn get_features(&self) -> &[FeatureVector] {
        &self.features
    }

    pub fn get_labels(&self) -> &[OperonLabel] {
        &self.labels
    }

    pub fn get_assignments(&self) -> &[OperonAssignment] {
        &self.assignments
    }

    pub fn get_summary(&self) -> &SegmentationSummary {
        &self.summary
    }
}

pub struct OperonAnalyzer<'a> {
    genes: &'a GeneTable,
    hmm: CategoricalHmm<'a>,
    hits: &'a AlignmentHits,
    links: &'a ProteinLinks,
    kegg: &'a KeggAnnotations,
    scope: ScoringScope,
    segmenter: OperonSegmenter,
}

impl<'a> OperonAnalyzer<'a> {
    pub fn new(
        genes: &'a GeneTable,
        emission: &'a EmissionMatrix,
        hits: &'a AlignmentHits,
        links: &'a ProteinLinks,
        kegg: &'a KeggAnnotations,
        scope: ScoringScope,
        reset_at_contig: bool,
    ) -> OperonAnalyzer<'a> {
        OperonAnalyzer {
            genes,
            hmm: CategoricalHmm::with_operon_parameters(emission),
            hits,
            links,
            kegg,
            scope,
            segmenter: OperonSegmenter::new(reset_at_contig),
        }
    }

    pub fn analyze<C: Classifier>(&self, classifier: &C) -> Result<AnalysisResult> {
        let distance_scorer = DistanceScorer::new(self.genes, &self.hmm, self.scope);
        let link_scorer = LinkScorer::new(self.genes, self.hits, self.links);
        let pathway_scorer = PathwayScorer::new(self.genes, self.kegg, self.scope);

        info!(
            "Scoring {} genes on {} contigs, scope {:?}",
            self.genes.len(),
            self.genes.get_all_contigs().len(),
            self.scope
        );
        info!(
            "  {} genes resolved to STRING proteins, {} genes with KEGG pathways",
            link_scorer.get_resolved_count(),
            pathway_scorer.get_annotated_count()
        );

        let (hmm_probabilities, (link_scores, pathway_overlaps)) = rayon::join(
            || distance_scorer.score_all(),
            || rayon::join(|| link_scorer.score_all(), || pathway_scorer.score_all()),
        );
        let hmm_probabilities = hmm_probabilities?;

        let unknown_links = link_scores
            .iter()
            .filter(|score| score.get_final() == UNKNOWN_LINK_SCORE)
            .count();
        debug!("  {} genes scored with the unknown link score", unknown_links);

        let features: Vec<FeatureVector> = self
            .genes
            .get_all_genes()
            .iter()
            .enumerate()
            .map(|(idx, gene)| {
                FeatureVector::new(
                    gene.get_strand().as_feature(),
                    hmm_probabilities[idx],
                    link_scores[idx].get_final() as f64,
                    pathway_overlaps[idx] as f64,
                )
            })
            .collect();

        let labels = classifier.predict(&features)?;
        info!(
            "Classified {} of {} genes as operon members",
            labels.iter().filter(|l| l.is_operon()).count(),
            labels.len()
        );

        let evidence: Vec<SegmentEvidence> = self
            .genes
            .gene_ids()
            .map(|id| {
                let next_idx = id.inner() + 1;
                let continuity = if next_idx < self.genes.len() {
                    link_scorer.pair_score(id, GeneID::new(next_idx))
                } else {
                    UNKNOWN_LINK_SCORE
                };

                SegmentEvidence::new(
                    labels[id.inner()],
                    pathway_scorer.get_pathways(id),
                    continuity,
                    self.genes.is_contig_start(id),
                )
            })
            .collect();

        let assignments = self.segmenter.segment(&evidence);
        let summary = SegmentationSummary::new(&assignments);

        info!(
            "Found {} operons covering {} genes, largest has {} genes",
            summary.get_operons(),
            summary.get_genes_in_operons(),
            summary.get_largest_operon()
        );

        Ok(AnalysisResult {
            hmm_probabilities,
            link_scores,
            pathway_overlaps,
            features,
            labels,
            assignments,
            summary,
        })
    }
}
