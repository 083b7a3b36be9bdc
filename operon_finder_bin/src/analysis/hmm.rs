use ndarray::Array2;

use crate::evidence::emission::EmissionMatrix;
use crate::genes::{Error, Result};

pub const HMM_STATES: usize = 2;

// State 0 is 'operon continuation', state 1 is 'operon boundary'
pub const OPERON_STATE: usize = 0;

const START_PROB: [f64; HMM_STATES] = [0.5, 0.5];
const TRANSITION_PROB: [[f64; HMM_STATES]; HMM_STATES] = [
    [0.721_436_34, 0.278_563_66],
    [0.192_843_69, 0.807_156_31],
];

const EMISSION_PROB_FLOOR: f64 = 1e-300; // Prevent all-zero forward columns

pub fn show_config() {
    log::info!("Intergenic distance HMM Config");
    log::info!("  States: {}, Operon State: {}", HMM_STATES, OPERON_STATE);
    log::info!("  Start: {:?}", START_PROB);
    log::info!("  Transitions: {:?} {:?}", TRANSITION_PROB[0], TRANSITION_PROB[1]);
}

/// Two state HMM over categorical observations, decoded by scaled forward-backward.
pub struct CategoricalHmm<'a> {
    start: [f64; HMM_STATES],
    transition: [[f64; HMM_STATES]; HMM_STATES],
    emission: &'a EmissionMatrix,
}

impl<'a> CategoricalHmm<'a> {
    pub fn new(
        start: [f64; HMM_STATES],
        transition: [[f64; HMM_STATES]; HMM_STATES],
        emission: &'a EmissionMatrix,
    ) -> CategoricalHmm<'a> {
        CategoricalHmm {
            start,
            transition,
            emission,
        }
    }

    pub fn with_operon_parameters(emission: &'a EmissionMatrix) -> CategoricalHmm<'a> {
        Self::new(START_PROB, TRANSITION_PROB, emission)
    }

    fn emit(&self, symbol: usize, state: usize) -> f64 {
        let p = self.emission.get(symbol, state);
        if p > EMISSION_PROB_FLOOR {
            p
        } else {
            EMISSION_PROB_FLOOR
        }
    }

    fn check_symbols(&self, observations: &[usize]) -> Result<()> {
        let symbols = self.emission.get_array().nrows();

        match observations.iter().find(|o| **o >= symbols) {
            Some(o) => Err(Error::InvalidValue(format!(
                "Observation {} outside the {} emission symbols",
                o, symbols
            ))),
            None => Ok(()),
        }
    }

    /// Posterior state probabilities, [position][state].
    pub fn posterior(&self, observations: &[usize]) -> Result<Array2<f64>> {
        self.check_symbols(observations)?;

        let len = observations.len();
        let mut alpha = Array2::<f64>::zeros((len, HMM_STATES));
        let mut beta = Array2::<f64>::zeros((len, HMM_STATES));
        let mut scale = vec![0.0; len];

        if len == 0 {
            return Ok(alpha);
        }

        // Forward
        for s in 0..HMM_STATES {
            alpha[[0, s]] = self.start[s] * self.emit(observations[0], s);
        }
        scale[0] = normalize_row(&mut alpha, 0);

        for t in 1..len {
            for s in 0..HMM_STATES {
                let mut total = 0.0;
                for r in 0..HMM_STATES {
                    total += alpha[[t - 1, r]] * self.transition[r][s];
                }
                alpha[[t, s]] = total * self.emit(observations[t], s);
            }
            scale[t] = normalize_row(&mut alpha, t);
        }

        // Backward, sharing the forward scale factors
        for s in 0..HMM_STATES {
            beta[[len - 1, s]] = 1.0;
        }

        for t in (0..len - 1).rev() {
            for r in 0..HMM_STATES {
                let mut total = 0.0;
                for s in 0..HMM_STATES {
                    total += self.transition[r][s] * self.emit(observations[t + 1], s) * beta[[t + 1, s]];
                }
                beta[[t, r]] = total / scale[t + 1];
            }
        }

        let mut gamma = alpha * beta;
        for t in 0..len {
            normalize_row(&mut gamma, t);
        }

        Ok(gamma)
    }

    /// Probability of the operon state at each position.
    pub fn operon_probabilities(&self, observations: &[usize]) -> Result<Vec<f64>> {
        let posterior = self.posterior(observations)?;
        Ok(posterior.column(OPERON_STATE).to_vec())
    }
}

fn normalize_row(matrix: &mut Array2<f64>, row: usize) -> f64 {
    let mut row = matrix.row_mut(row);
    let total = row.sum();

    if total > 0.0 {
        row /= total;
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::distance::DISTANCE_BINS;
    use crate::evidence::emission::tests::test_emission;

    #[test]
    fn test_empty_sequence() {
        let emission = test_emission();
        let hmm = CategoricalHmm::with_operon_parameters(&emission);

        assert!(hmm.operon_probabilities(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_posterior_rows_sum_to_one() {
        let emission = test_emission();
        let hmm = CategoricalHmm::with_operon_parameters(&emission);

        let posterior = hmm.posterior(&[0, 5, 53, 1, 0, 20, 2]).unwrap();
        for row in posterior.outer_iter() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_tight_spacing_is_operonic() {
        let emission = test_emission();
        let hmm = CategoricalHmm::with_operon_parameters(&emission);

        let probabilities = hmm.operon_probabilities(&[0usize; 25]).unwrap();
        assert_eq!(probabilities.len(), 25);
        assert!(probabilities.iter().all(|p| *p > 0.95));
    }

    #[test]
    fn test_wide_spacing_is_not_operonic() {
        let emission = test_emission();
        let hmm = CategoricalHmm::with_operon_parameters(&emission);

        let probabilities = hmm.operon_probabilities(&vec![DISTANCE_BINS - 1; 25]).unwrap();
        assert!(probabilities.iter().all(|p| *p < 0.2));
    }

    #[test]
    fn test_single_observation_matches_bayes() {
        let emission = test_emission();
        let hmm = CategoricalHmm::with_operon_parameters(&emission);

        // 0.5 * 0.3 / (0.5 * 0.3 + 0.5 * 0.01)
        let probabilities = hmm.operon_probabilities(&[0]).unwrap();
        assert!((probabilities[0] - 0.3 / 0.31).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_unknown_symbol() {
        let emission = test_emission();
        let hmm = CategoricalHmm::with_operon_parameters(&emission);

        assert!(hmm.posterior(&[0, DISTANCE_BINS]).is_err());
    }
}
