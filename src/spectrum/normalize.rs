use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::types::{Peak, Spectrum};

/// How intensities are rescaled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMethod {
    /// Divide by the most intense peak (base peak = 1)
    Max,
    /// Divide by the total intensity (intensities sum to 1)
    Sum,
    /// Divide by the mean intensity
    Mean,
}

impl NormalizationMethod {
    /// All methods, in menu order
    pub const ALL: [NormalizationMethod; 3] = [Self::Max, Self::Sum, Self::Mean];

    /// Lowercase identifier used in URLs and config
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::Sum => "sum",
            Self::Mean => "mean",
        }
    }

    /// Value every intensity gets divided by
    pub fn divisor(&self, intensities: &[f64]) -> f64 {
        match self {
            Self::Max => intensities.iter().copied().fold(f64::NAN, f64::max),
            Self::Sum => intensities.iter().sum(),
            Self::Mean => {
                if intensities.is_empty() {
                    0.0
                } else {
                    intensities.iter().sum::<f64>() / intensities.len() as f64
                }
            }
        }
    }
}

impl fmt::Display for NormalizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NormalizationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "max" => Ok(Self::Max),
            "sum" => Ok(Self::Sum),
            "mean" => Ok(Self::Mean),
            other => Err(format!(
                "unknown normalization method '{}' (expected max, sum or mean)",
                other
            )),
        }
    }
}

/// Rescale every intensity by the method's divisor
///
/// When the divisor is zero or not finite (an empty spectrum, or one whose
/// intensities are all zero) the spectrum is returned unchanged.
pub fn normalize(spectrum: &Spectrum, method: NormalizationMethod) -> Spectrum {
    let divisor = method.divisor(&spectrum.intensities());
    if divisor == 0.0 || !divisor.is_finite() {
        return spectrum.clone();
    }
    let peaks = spectrum
        .peaks
        .iter()
        .map(|p| Peak::new(p.mz, p.intensity / divisor))
        .collect();
    Spectrum::new(spectrum.peak_id, peaks)
}
