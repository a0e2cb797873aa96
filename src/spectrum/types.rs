use serde::Serialize;

use super::SpectrumError;

/// A single (m/z, intensity) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Peak {
    /// Mass-to-charge ratio
    pub mz: f64,
    /// Signal intensity (raw or normalized)
    pub intensity: f64,
}

impl Peak {
    /// Create a new peak
    pub fn new(mz: f64, intensity: f64) -> Self {
        Self { mz, intensity }
    }
}

/// Mass spectrum measured for one peak
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrum {
    /// Peak id the spectrum belongs to
    pub peak_id: i64,
    /// Peaks in stored order
    pub peaks: Vec<Peak>,
}

impl Spectrum {
    /// Create a spectrum from peaks
    pub fn new(peak_id: i64, peaks: Vec<Peak>) -> Self {
        Self { peak_id, peaks }
    }

    /// Pair up parallel m/z and intensity arrays
    pub fn from_arrays(peak_id: i64, mz: &[f64], intensity: &[f64]) -> Result<Self, SpectrumError> {
        if mz.len() != intensity.len() {
            return Err(SpectrumError::Malformed {
                peak_id,
                reason: format!(
                    "{} m/z values but {} intensities",
                    mz.len(),
                    intensity.len()
                ),
            });
        }
        let peaks = mz
            .iter()
            .zip(intensity)
            .map(|(&mz, &intensity)| Peak::new(mz, intensity))
            .collect();
        Ok(Self::new(peak_id, peaks))
    }

    /// Number of peaks
    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    /// Returns true if the spectrum has no peaks
    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// m/z values in stored order
    pub fn mz_values(&self) -> Vec<f64> {
        self.peaks.iter().map(|p| p.mz).collect()
    }

    /// Intensities in stored order
    pub fn intensities(&self) -> Vec<f64> {
        self.peaks.iter().map(|p| p.intensity).collect()
    }

    /// Peak count, intensity range and total intensity
    pub fn summary(&self) -> SpectrumSummary {
        let mut summary = SpectrumSummary {
            count: self.peaks.len(),
            min_intensity: None,
            max_intensity: None,
            total_intensity: 0.0,
        };
        for peak in &self.peaks {
            summary.total_intensity += peak.intensity;
            summary.min_intensity = Some(
                summary
                    .min_intensity
                    .map_or(peak.intensity, |m: f64| m.min(peak.intensity)),
            );
            summary.max_intensity = Some(
                summary
                    .max_intensity
                    .map_or(peak.intensity, |m: f64| m.max(peak.intensity)),
            );
        }
        summary
    }
}

/// Derived statistics of a spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectrumSummary {
    /// Number of peaks
    pub count: usize,
    /// Lowest intensity (`None` when empty)
    pub min_intensity: Option<f64>,
    /// Highest intensity (`None` when empty)
    pub max_intensity: Option<f64>,
    /// Sum of all intensities
    pub total_intensity: f64,
}

/// A spectrum with a display label, for plotting overlays
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSpectrum {
    /// Legend label
    pub label: String,
    /// The spectrum
    pub spectrum: Spectrum,
}

impl LabeledSpectrum {
    /// Label a spectrum
    pub fn new(label: impl Into<String>, spectrum: Spectrum) -> Self {
        Self {
            label: label.into(),
            spectrum,
        }
    }
}
