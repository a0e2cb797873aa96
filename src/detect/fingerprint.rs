use serde::Serialize;

use crate::spectrum::{bin_spectrum, Spectrum, SpectrumError};

/// Fixed m/z grid that spectra are projected onto before comparison
///
/// Bin `i` covers `[mz_min + i * bin_size, mz_min + (i + 1) * bin_size)`.
/// Peaks outside `[mz_min, mz_max)` are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FingerprintGrid {
    mz_min: f64,
    mz_max: f64,
    bin_size: f64,
}

impl Default for FingerprintGrid {
    /// 50 to 1200 m/z in 1 Da bins
    fn default() -> Self {
        Self {
            mz_min: 50.0,
            mz_max: 1200.0,
            bin_size: 1.0,
        }
    }
}

impl FingerprintGrid {
    /// Grid over `[mz_min, mz_max)` with `bin_size` wide bins
    pub fn new(mz_min: f64, mz_max: f64, bin_size: f64) -> Result<Self, SpectrumError> {
        if !(bin_size > 0.0 && bin_size.is_finite()) {
            return Err(SpectrumError::InvalidParameter(format!(
                "fingerprint bin size must be positive, got {}",
                bin_size
            )));
        }
        if !(mz_min.is_finite() && mz_max.is_finite() && mz_max > mz_min) {
            return Err(SpectrumError::InvalidParameter(format!(
                "fingerprint range must be increasing, got {}..{}",
                mz_min, mz_max
            )));
        }
        Ok(Self {
            mz_min,
            mz_max,
            bin_size,
        })
    }

    /// Number of bins
    pub fn len(&self) -> usize {
        ((self.mz_max - self.mz_min) / self.bin_size).ceil() as usize
    }

    /// Always false; a valid grid has at least one bin
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Binned intensity vector scaled so its largest bin is 1
    ///
    /// Peaks are first collapsed with [`bin_spectrum`], then each bin lands
    /// in the grid slot holding its mean m/z. An all-zero vector is returned
    /// as is.
    pub fn fingerprint(&self, spectrum: &Spectrum) -> Result<Vec<f64>, SpectrumError> {
        let binned = bin_spectrum(spectrum, self.bin_size)?;
        let mut vector: Vec<f64> = vec![0.0; self.len()];
        for peak in &binned.peaks {
            if !(peak.mz >= self.mz_min && peak.mz < self.mz_max && peak.intensity.is_finite()) {
                continue;
            }
            let index = ((peak.mz - self.mz_min) / self.bin_size).floor() as usize;
            if let Some(slot) = vector.get_mut(index) {
                *slot = slot.max(peak.intensity);
            }
        }

        let max = vector.iter().copied().fold(0.0, f64::max);
        if max > 0.0 {
            for value in &mut vector {
                *value /= max;
            }
        }
        Ok(vector)
    }
}

/// Cosine of the angle between two fingerprints
///
/// Vectors of different length are compared over their common prefix. An
/// empty or all-zero vector has similarity 0 with everything.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|y| y * y).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a * norm_b);
    if similarity.is_finite() {
        similarity
    } else {
        0.0
    }
}
