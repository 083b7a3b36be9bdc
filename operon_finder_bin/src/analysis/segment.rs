use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use crate::analysis::classifier::OperonLabel;
use crate::analysis::link::STRONG_LINK_THRESHOLD;
use crate::analysis::pathway::pathway_overlap;

/// What the segmenter needs to know about one gene, in table order.
#[derive(Clone, Copy, Debug)]
pub struct SegmentEvidence<'a> {
    label: OperonLabel,
    pathways: &'a BTreeSet<String>,
    continuity: u32, // Link score from this gene to the next one in table order
    contig_start: bool,
}

impl<'a> SegmentEvidence<'a> {
    pub fn new(label: OperonLabel, pathways: &'a BTreeSet<String>, continuity: u32, contig_start: bool) -> SegmentEvidence<'a> {
        SegmentEvidence {
            label,
            pathways,
            continuity,
            contig_start,
        }
    }

    pub fn get_label(&self) -> OperonLabel {
        self.label
    }

    pub fn is_contig_start(&self) -> bool {
        self.contig_start
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperonAssignment {
    NonOperon,
    Operon(usize),
}

impl OperonAssignment {
    pub fn get_operon(self) -> Option<usize> {
        match self {
            OperonAssignment::NonOperon => None,
            OperonAssignment::Operon(id) => Some(id),
        }
    }
}

impl Display for OperonAssignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OperonAssignment::NonOperon => f.write_str("non_operon"),
            OperonAssignment::Operon(id) => write!(f, "operon_{}", id),
        }
    }
}

// Running operon id and the members of each operon opened so far (operon k at index k-1)
struct SegmentationState {
    current_operon: usize,
    groups: Vec<Vec<usize>>,
}

impl SegmentationState {
    fn new() -> SegmentationState {
        SegmentationState {
            current_operon: 1,
            groups: vec![Vec::new()],
        }
    }

    fn assign(&mut self, gene_idx: usize) {
        self.groups[self.current_operon - 1].push(gene_idx);
    }

    fn close_operon(&mut self) {
        self.current_operon += 1;
        self.groups.push(Vec::new());
    }

    // Empty groups are never written
    fn into_assignments(self, len: usize) -> Vec<OperonAssignment> {
        let mut assignments = vec![OperonAssignment::NonOperon; len];

        for (group_idx, members) in self.groups.iter().enumerate() {
            for gene_idx in members {
                assignments[*gene_idx] = OperonAssignment::Operon(group_idx + 1);
            }
        }

        assignments
    }
}

/// Partitions classified genes into numbered operons with a single left to right pass.
///
/// Each operon-labelled gene joins the running operon, which is then closed when
/// the next gene is labelled non-operon, or when the link to the next gene is weak:
/// continuity below the strong link threshold and no shared pathway. The last gene
/// only joins through the lookahead of its predecessor.
pub struct OperonSegmenter {
    reset_at_contig: bool,
}

impl OperonSegmenter {
    pub fn new(reset_at_contig: bool) -> OperonSegmenter {
        OperonSegmenter { reset_at_contig }
    }

    pub fn is_weak_link(current: &SegmentEvidence, next: &SegmentEvidence) -> bool {
        current.continuity < STRONG_LINK_THRESHOLD && pathway_overlap(current.pathways, next.pathways) == 0
    }

    fn is_break(&self, current: &SegmentEvidence, next: &SegmentEvidence) -> bool {
        Self::is_weak_link(current, next)
            || !next.label.is_operon()
            || (self.reset_at_contig && next.contig_start)
    }

    pub fn segment(&self, evidence: &[SegmentEvidence]) -> Vec<OperonAssignment> {
        let mut state = SegmentationState::new();

        for idx in 0..evidence.len().saturating_sub(1) {
            let current = &evidence[idx];
            let next = &evidence[idx + 1];

            if current.label.is_operon() {
                state.assign(idx);

                if self.is_break(current, next) {
                    state.close_operon();
                }
            }
        }

        if evidence.len() >= 2 {
            let last_idx = evidence.len() - 1;
            let before_last = &evidence[last_idx - 1];

            if before_last.label.is_operon() && !self.is_break(before_last, &evidence[last_idx]) {
                state.assign(last_idx);
            }
        }

        state.into_assignments(evidence.len())
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SegmentationSummary {
    operons: usize,
    genes_in_operons: usize,
    largest_operon: usize,
}

impl SegmentationSummary {
    pub fn new(assignments: &[OperonAssignment]) -> SegmentationSummary {
        let mut sizes: Vec<usize> = Vec::new();

        for operon in assignments.iter().filter_map(|a| a.get_operon()) {
            if sizes.len() < operon {
                sizes.resize(operon, 0);
            }
            sizes[operon - 1] += 1;
        }

        SegmentationSummary {
            operons: sizes.iter().filter(|s| **s > 0).count(),
            genes_in_operons: sizes.iter().sum(),
            largest_operon: sizes.iter().copied().max().unwrap_or(0),
        }
    }

    pub fn get_operons(&self) -> usize {
        self.operons
    }

    pub fn get_genes_in_operons(&self) -> usize {
        self.genes_in_operons
    }

    pub fn get_largest_operon(&self) -> usize {
        self.largest_operon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const STRONG: u32 = 900;
    const WEAK: u32 = 300;

    fn labels(bits: &[u8]) -> Vec<OperonLabel> {
        bits.iter().map(|b| OperonLabel::from_bool(*b == 1)).collect()
    }

    fn evidence<'a>(labels: &[OperonLabel], continuity: &[u32], pathways: &'a [BTreeSet<String>]) -> Vec<SegmentEvidence<'a>> {
        labels
            .iter()
            .enumerate()
            .map(|(idx, label)| SegmentEvidence::new(*label, &pathways[idx], continuity[idx], idx == 0))
            .collect()
    }

    fn no_pathways(len: usize) -> Vec<BTreeSet<String>> {
        vec![BTreeSet::new(); len]
    }

    fn pathway_set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn names(assignments: &[OperonAssignment]) -> Vec<String> {
        assignments.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_non_operon_neighbour_splits() {
        let labels = labels(&[1, 1, 1, 0, 1, 1]);
        let continuity = [STRONG, STRONG, WEAK, STRONG, STRONG, STRONG];
        let pathways = no_pathways(6);

        let assignments = OperonSegmenter::new(false).segment(&evidence(&labels, &continuity, &pathways));

        assert_eq!(
            names(&assignments),
            vec!["operon_1", "operon_1", "operon_1", "non_operon", "operon_2", "operon_2"]
        );
    }

    #[test]
    fn test_weak_link_splits() {
        let labels = labels(&[1, 1, 1]);
        let continuity = [WEAK, STRONG, STRONG];
        let pathways = no_pathways(3);

        let assignments = OperonSegmenter::new(false).segment(&evidence(&labels, &continuity, &pathways));

        assert_eq!(names(&assignments), vec!["operon_1", "operon_2", "operon_2"]);
    }

    #[test]
    fn test_shared_pathway_prevents_weak_link_split() {
        let labels = labels(&[1, 1, 1]);
        let continuity = [WEAK, WEAK, WEAK];
        let pathways = vec![
            pathway_set(&["map00010"]),
            pathway_set(&["map00010", "map00020"]),
            pathway_set(&["map00020"]),
        ];

        let assignments = OperonSegmenter::new(false).segment(&evidence(&labels, &continuity, &pathways));

        assert_eq!(names(&assignments), vec!["operon_1", "operon_1", "operon_1"]);
    }

    #[test]
    fn test_threshold_is_inclusive_for_strong() {
        let labels = labels(&[1, 1, 1]);
        let continuity = [STRONG_LINK_THRESHOLD, STRONG_LINK_THRESHOLD - 1, STRONG];
        let pathways = no_pathways(3);

        let assignments = OperonSegmenter::new(false).segment(&evidence(&labels, &continuity, &pathways));

        assert_eq!(names(&assignments), vec!["operon_1", "operon_1", "non_operon"]);
    }

    #[test]
    fn test_shared_pathway_does_not_override_non_operon() {
        let labels = labels(&[1, 0, 1, 1]);
        let continuity = [STRONG; 4];
        let shared = pathway_set(&["map00010"]);
        let pathways = vec![shared.clone(), shared.clone(), shared.clone(), shared];

        let assignments = OperonSegmenter::new(false).segment(&evidence(&labels, &continuity, &pathways));

        assert_eq!(names(&assignments), vec!["operon_1", "non_operon", "operon_2", "operon_2"]);
    }

    #[test]
    fn test_single_gene_is_non_operon() {
        let labels = labels(&[1]);
        let pathways = no_pathways(1);

        let assignments = OperonSegmenter::new(false).segment(&evidence(&labels, &[STRONG], &pathways));

        assert_eq!(assignments, vec![OperonAssignment::NonOperon]);
    }

    #[test]
    fn test_empty_input() {
        assert!(OperonSegmenter::new(false).segment(&[]).is_empty());
        assert_eq!(SegmentationSummary::new(&[]), SegmentationSummary::default());
    }

    #[test]
    fn test_last_gene_after_break_stays_non_operon() {
        let labels = labels(&[1, 1, 1]);
        let continuity = [STRONG, WEAK, STRONG];
        let pathways = no_pathways(3);

        let assignments = OperonSegmenter::new(false).segment(&evidence(&labels, &continuity, &pathways));

        assert_eq!(names(&assignments), vec!["operon_1", "operon_1", "non_operon"]);
    }

    #[test]
    fn test_reset_at_contig() {
        let labels = labels(&[1, 1, 1, 1]);
        let continuity = [STRONG; 4];
        let pathways = no_pathways(4);
        let mut genes = evidence(&labels, &continuity, &pathways);
        genes[2].contig_start = true;

        let linear = OperonSegmenter::new(false).segment(&genes);
        assert_eq!(names(&linear), vec!["operon_1"; 4]);

        let reset = OperonSegmenter::new(true).segment(&genes);
        assert_eq!(names(&reset), vec!["operon_1", "operon_1", "operon_2", "operon_2"]);
    }

    #[test]
    fn test_segmentation_is_repeatable() {
        let labels = labels(&[1, 1, 0, 1, 1, 1, 0, 0, 1, 1]);
        let continuity = [STRONG, WEAK, STRONG, STRONG, WEAK, STRONG, WEAK, STRONG, STRONG, WEAK];
        let pathways = no_pathways(10);
        let genes = evidence(&labels, &continuity, &pathways);

        let segmenter = OperonSegmenter::new(false);
        assert_eq!(segmenter.segment(&genes), segmenter.segment(&genes));
    }

    #[test]
    fn test_summary() {
        let assignments = [
            OperonAssignment::Operon(1),
            OperonAssignment::Operon(1),
            OperonAssignment::NonOperon,
            OperonAssignment::Operon(2),
            OperonAssignment::Operon(2),
            OperonAssignment::Operon(2),
        ];

        let summary = SegmentationSummary::new(&assignments);
        assert_eq!(summary.get_operons(), 2);
        assert_eq!(summary.get_genes_in_operons(), 5);
        assert_eq!(summary.get_largest_operon(), 3);
    }

    proptest! {
        #[test]
        fn test_operon_numbering_is_contiguous(
            genes in prop::collection::vec((any::<bool>(), 0u32..1000, any::<bool>()), 0..60)
        ) {
            let labels: Vec<OperonLabel> = genes.iter().map(|(l, _, _)| OperonLabel::from_bool(*l)).collect();
            let continuity: Vec<u32> = genes.iter().map(|(_, c, _)| *c).collect();
            let shared = pathway_set(&["map00010"]);
            let pathways: Vec<BTreeSet<String>> = genes
                .iter()
                .map(|(_, _, p)| if *p { shared.clone() } else { BTreeSet::new() })
                .collect();
            let evidence = evidence(&labels, &continuity, &pathways);

            let assignments = OperonSegmenter::new(false).segment(&evidence);
            prop_assert_eq!(assignments.len(), genes.len());

            // Non-operon labels are never assigned, ids appear in order starting at 1
            let mut last_seen = 0;
            for (idx, assignment) in assignments.iter().enumerate() {
                if let Some(operon) = assignment.get_operon() {
                    prop_assert!(labels[idx].is_operon());
                    prop_assert!(operon == last_seen || operon == last_seen + 1);
                    last_seen = operon;
                }
            }

            // Members of one operon are consecutive genes
            for idx in 1..assignments.len() {
                if let (Some(a), Some(b)) = (assignments[idx - 1].get_operon(), assignments[idx].get_operon()) {
                    if a == b {
                        prop_assert!(!OperonSegmenter::is_weak_link(&evidence[idx - 1], &evidence[idx]));
                    }
                }
            }
            for idx in 2..assignments.len() {
                if let (Some(a), Some(c)) = (assignments[idx - 2].get_operon(), assignments[idx].get_operon()) {
                    if a == c {
                        prop_assert_eq!(assignments[idx - 1].get_operon(), Some(a));
                    }
                }
            }
        }
    }
}
