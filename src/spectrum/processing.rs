use std::collections::BTreeMap;

use serde::Serialize;

use super::types::{Peak, Spectrum};
use super::SpectrumError;

/// Descriptive statistics over a set of intensities
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntensityStatistics {
    /// Number of values
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Median (50th percentile)
    pub median: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// 25th percentile
    pub q25: f64,
    /// 75th percentile
    pub q75: f64,
}

impl IntensityStatistics {
    /// Compute statistics; `None` for an empty slice
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            count: sorted.len(),
            mean,
            median: quantile(&sorted, 0.5),
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            q25: quantile(&sorted, 0.25),
            q75: quantile(&sorted, 0.75),
        })
    }

    /// Statistics over a spectrum's intensities
    pub fn of_spectrum(spectrum: &Spectrum) -> Option<Self> {
        Self::from_values(&spectrum.intensities())
    }
}

/// Linearly interpolated quantile of an ascending, non-empty slice
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Keep peaks whose intensity is at least `threshold`
pub fn filter_by_intensity(spectrum: &Spectrum, threshold: f64) -> Spectrum {
    let peaks = spectrum
        .peaks
        .iter()
        .filter(|p| p.intensity >= threshold)
        .copied()
        .collect();
    Spectrum::new(spectrum.peak_id, peaks)
}

/// Collapse peaks into fixed-width m/z bins
///
/// A peak falls into bin `trunc(mz / bin_size)`. Each bin yields one peak at
/// the mean m/z of its members with their highest intensity. Bins come out
/// in ascending m/z order.
pub fn bin_spectrum(spectrum: &Spectrum, bin_size: f64) -> Result<Spectrum, SpectrumError> {
    if !(bin_size > 0.0 && bin_size.is_finite()) {
        return Err(SpectrumError::InvalidParameter(format!(
            "bin size must be positive, got {}",
            bin_size
        )));
    }

    // bin key -> (sum of m/z, member count, max intensity)
    let mut bins: BTreeMap<i64, (f64, usize, f64)> = BTreeMap::new();
    for peak in &spectrum.peaks {
        let key = (peak.mz / bin_size).trunc() as i64;
        let entry = bins.entry(key).or_insert((0.0, 0, f64::NEG_INFINITY));
        entry.0 += peak.mz;
        entry.1 += 1;
        entry.2 = entry.2.max(peak.intensity);
    }

    let peaks = bins
        .into_values()
        .map(|(mz_sum, count, max_intensity)| Peak::new(mz_sum / count as f64, max_intensity))
        .collect();
    Ok(Spectrum::new(spectrum.peak_id, peaks))
}

/// Unit for mass accuracy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MassUnit {
    /// Parts per million relative to the theoretical mass
    Ppm,
    /// Absolute difference in daltons
    Dalton,
}

/// Signed mass error of a measurement against its theoretical value
pub fn mass_error(measured_mz: f64, theoretical_mz: f64, unit: MassUnit) -> f64 {
    match unit {
        MassUnit::Ppm => (measured_mz - theoretical_mz) / theoretical_mz * 1e6,
        MassUnit::Dalton => measured_mz - theoretical_mz,
    }
}

/// A query peak that lies within tolerance of a reference peak
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakMatch {
    /// Index into the query m/z list
    pub query_index: usize,
    /// Index into the reference m/z list
    pub reference_index: usize,
    /// Absolute error in ppm
    pub error_ppm: f64,
}

/// Every (query, reference) pair within `tolerance_ppm`
///
/// Pairs are reported in query order, then reference order.
pub fn find_peak_matches(query: &[f64], reference: &[f64], tolerance_ppm: f64) -> Vec<PeakMatch> {
    let mut matches = Vec::new();
    for (query_index, &q) in query.iter().enumerate() {
        for (reference_index, &r) in reference.iter().enumerate() {
            let error_ppm = mass_error(q, r, MassUnit::Ppm).abs();
            if error_ppm <= tolerance_ppm {
                matches.push(PeakMatch {
                    query_index,
                    reference_index,
                    error_ppm,
                });
            }
        }
    }
    matches
}
