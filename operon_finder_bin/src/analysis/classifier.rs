use std::fmt::{Display, Formatter};
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;

use crate::genes::{Error, Result};

pub const FEATURE_COUNT: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureVector {
    strand: f64,
    hmm_probability: f64,
    link_score: f64,
    pathway_overlap: f64,
}

impl FeatureVector {
    pub fn new(strand: f64, hmm_probability: f64, link_score: f64, pathway_overlap: f64) -> FeatureVector {
        FeatureVector {
            strand,
            hmm_probability,
            link_score,
            pathway_overlap,
        }
    }

    // Ordering is strand, hmm probability, link score, pathway overlap
    pub fn as_array(&self) -> [f64; FEATURE_COUNT] {
        [self.strand, self.hmm_probability, self.link_score, self.pathway_overlap]
    }

    pub fn is_complete(&self) -> bool {
        self.as_array().iter().all(|v| v.is_finite())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperonLabel {
    Operon,
    NonOperon,
}

impl OperonLabel {
    pub fn from_bool(operon: bool) -> OperonLabel {
        if operon {
            OperonLabel::Operon
        } else {
            OperonLabel::NonOperon
        }
    }

    pub fn is_operon(self) -> bool {
        self == OperonLabel::Operon
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperonLabel::Operon => "1",
            OperonLabel::NonOperon => "0",
        }
    }
}

impl Display for OperonLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trained binary decision function over per-gene feature vectors.
pub trait Classifier: Sync {
    fn predict_one(&self, features: &FeatureVector) -> OperonLabel;

    /// One label per row, in order. Rows with missing (non-finite) values are rejected.
    fn predict(&self, features: &[FeatureVector]) -> Result<Vec<OperonLabel>> {
        if let Some(row) = features.iter().position(|fv| !fv.is_complete()) {
            return Err(Error::MissingFeature(row));
        }

        Ok(features.iter().map(|fv| self.predict_one(fv)).collect())
    }
}

fn default_threshold() -> f64 {
    0.5
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Clone, Debug, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn validate(&self, tree_idx: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::InvalidModel(format!("Tree {} has no nodes", tree_idx)));
        }

        for (node_idx, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Leaf { value } = node {
                if !value.is_finite() {
                    return Err(Error::InvalidModel(format!(
                        "Tree {} leaf {} has a non-finite value",
                        tree_idx, node_idx
                    )));
                }
            }

            if let TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } = node
            {
                // Children must come later, which also rules out cycles
                if *feature >= FEATURE_COUNT
                    || !threshold.is_finite()
                    || *left <= node_idx
                    || *right <= node_idx
                    || *left >= self.nodes.len()
                    || *right >= self.nodes.len()
                {
                    return Err(Error::InvalidModel(format!(
                        "Tree {} node {} has an invalid split",
                        tree_idx, node_idx
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn evaluate(&self, features: &[f64; FEATURE_COUNT]) -> f64 {
        let mut node_idx = 0;

        loop {
            match &self.nodes[node_idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node_idx = if features[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Trained model artifact, loaded from JSON and tagged by `kind`.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierModel {
    Linear {
        weights: [f64; FEATURE_COUNT],
        bias: f64,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    Forest {
        trees: Vec<DecisionTree>,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
}

impl ClassifierModel {
    pub fn validate(&self) -> Result<()> {
        match self {
            ClassifierModel::Linear {
                weights,
                bias,
                threshold,
            } => {
                if weights.iter().chain([*bias, *threshold].iter()).any(|v| !v.is_finite()) {
                    return Err(Error::InvalidModel("Linear model has non-finite parameters".to_string()));
                }
            }
            ClassifierModel::Forest { trees, threshold } => {
                if trees.is_empty() {
                    return Err(Error::InvalidModel("Forest has no trees".to_string()));
                }
                if !threshold.is_finite() {
                    return Err(Error::InvalidModel("Forest threshold is not finite".to_string()));
                }
                for (tree_idx, tree) in trees.iter().enumerate() {
                    tree.validate(tree_idx)?;
                }
            }
        }

        Ok(())
    }

    /// Probability of the operon class.
    pub fn operon_probability(&self, features: &FeatureVector) -> f64 {
        let x = features.as_array();

        match self {
            ClassifierModel::Linear { weights, bias, .. } => {
                let z = weights.iter().zip(x.iter()).map(|(w, v)| w * v).sum::<f64>() + bias;
                1.0 / (1.0 + (-z).exp())
            }
            ClassifierModel::Forest { trees, .. } => {
                trees.iter().map(|tree| tree.evaluate(&x)).sum::<f64>() / trees.len() as f64
            }
        }
    }

    pub fn get_threshold(&self) -> f64 {
        match self {
            ClassifierModel::Linear { threshold, .. } => *threshold,
            ClassifierModel::Forest { threshold, .. } => *threshold,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ClassifierModel::Linear { weights, bias, threshold } => format!(
                "linear, weights {:?}, bias {}, threshold {}",
                weights, bias, threshold
            ),
            ClassifierModel::Forest { trees, threshold } => {
                format!("forest, {} trees, threshold {}", trees.len(), threshold)
            }
        }
    }
}

// A probability equal to the threshold is a non-operon call, as with an argmax over [non-operon, operon]
impl Classifier for ClassifierModel {
    fn predict_one(&self, features: &FeatureVector) -> OperonLabel {
        OperonLabel::from_bool(self.operon_probability(features) > self.get_threshold())
    }
}

pub fn read_classifier<R: Read>(reader: R) -> Result<ClassifierModel> {
    let model: ClassifierModel = serde_json::from_reader(BufReader::new(reader))
        .map_err(|e| Error::InvalidModel(e.to_string()))?;
    model.validate()?;

    Ok(model)
}

pub fn read_classifier_file(path: &Path) -> Result<ClassifierModel> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::MissingArtifact(format!("classifier model {}: {}", path.display(), e)))?;
    read_classifier(file)
}
