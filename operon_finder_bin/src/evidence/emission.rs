use std::path::Path;

use ndarray::Array2;
use ndarray_npy::{read_npy, ReadNpyError};

use crate::analysis::distance::DISTANCE_BINS;
use crate::analysis::hmm::HMM_STATES;
use crate::genes::{Error, Result};

#[cfg(feature = "hdf5")]
const EMISSION_DATASET: &str = "emission";

/// Pre-trained emission probabilities, indexed [distance bin][hidden state].
pub struct EmissionMatrix {
    emission: Array2<f64>,
}

impl EmissionMatrix {
    /// Accepts [bins][states] or the transposed [states][bins] layout.
    pub fn new(array: Array2<f64>) -> Result<EmissionMatrix> {
        let (rows, cols) = array.dim();

        let emission = if rows == DISTANCE_BINS && cols == HMM_STATES {
            array
        } else if rows == HMM_STATES && cols == DISTANCE_BINS {
            array.reversed_axes()
        } else if rows == HMM_STATES || cols == HMM_STATES {
            return Err(Error::MismatchedDataSize(rows.max(cols), DISTANCE_BINS));
        } else {
            return Err(Error::MismatchedDataSize(rows.min(cols), HMM_STATES));
        };

        if emission.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(Error::InvalidValue(
                "Emission matrix contains negative or non-finite probabilities".to_string(),
            ));
        }

        for state in 0..HMM_STATES {
            if emission.column(state).sum() <= 0.0 {
                return Err(Error::InvalidValue(format!(
                    "Emission matrix has no probability mass for state {}",
                    state
                )));
            }
        }

        Ok(EmissionMatrix { emission })
    }

    pub fn get(&self, bin: usize, state: usize) -> f64 {
        self.emission[[bin, state]]
    }

    pub fn get_array(&self) -> &Array2<f64> {
        &self.emission
    }
}

fn read_npy_matrix(path: &Path) -> Result<Array2<f64>> {
    match read_npy::<_, Array2<f64>>(path) {
        Ok(array) => Ok(array),
        Err(ReadNpyError::WrongDescriptor(_)) => {
            let array = read_npy::<_, Array2<f32>>(path)?;
            Ok(array.mapv(|v| v as f64))
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(feature = "hdf5")]
fn read_hdf5_matrix(path: &Path) -> Result<Array2<f64>> {
    let file = hdf5::File::open(path)?;
    let dataset = file.dataset(EMISSION_DATASET)?;

    let shape = dataset.shape();
    if shape.len() != 2 {
        return Err(Error::MismatchedDimensions(shape.len(), 2));
    }

    Ok(dataset.read_2d::<f64>()?)
}

#[cfg(not(feature = "hdf5"))]
fn read_hdf5_matrix(path: &Path) -> Result<Array2<f64>> {
    Err(Error::MissingArtifact(format!(
        "emission matrix {}: HDF5 support not enabled in this build",
        path.display()
    )))
}

/// Loads the emission matrix from NumPy `.npy`, or from the `emission` dataset of an HDF5 file.
pub fn read_emission_matrix(path: &Path) -> Result<EmissionMatrix> {
    if !path.is_file() {
        return Err(Error::MissingArtifact(format!(
            "emission matrix {} not found",
            path.display()
        )));
    }

    let is_hdf5 = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext == "h5" || ext == "hdf5");

    let array = if is_hdf5 {
        read_hdf5_matrix(path)?
    } else {
        read_npy_matrix(path)?
    };

    EmissionMatrix::new(array)
}
