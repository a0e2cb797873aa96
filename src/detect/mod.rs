//! # PFAS Detector
//!
//! Matches an observed feature (precursor m/z, optional retention time and
//! optional MS1 spectrum) against the compounds in the database.
//!
//! The pipeline runs in four steps:
//!
//! 1. Keep library compounds within `tolerance_ppm` of the precursor m/z
//!    and, when both sides have a retention time, within `rt_margin`
//!    minutes. Compounds without a retention time are always kept.
//! 2. With a spectrum, score every candidate by the cosine similarity of
//!    binned fingerprints ([`FingerprintGrid`]) and rank by similarity, then
//!    mass error. Without one, rank by mass error alone.
//! 3. Vote on the structural family among the top candidates, weighted by
//!    similarity when a spectrum was given.
//! 4. Label the result. A spectrum whose best similarity stays below
//!    [`SIMILARITY_THRESHOLD`] is an unknown structure.
//!
//! ```rust,no_run
//! use dimspec::database::Database;
//! use dimspec::detect::{analyze_peak, DetectionQuery, FingerprintGrid, Library};
//! use dimspec::spectrum::SpectrumSource;
//!
//! let db = Database::connect(&["data/dimspec_sample.sqlite"])?;
//! let library = Library::load(&db, &SpectrumSource::default(), FingerprintGrid::default())?;
//! let detection = analyze_peak(&library, &DetectionQuery::new(412.966).rt(7.5))?;
//! println!("{} ({})", detection.status, detection.family);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod fingerprint;
mod library;

#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use log::debug;
use serde::Serialize;

use crate::spectrum::{find_peak_matches, Peak, Spectrum};

pub use error::DetectError;
pub use fingerprint::{cosine_similarity, FingerprintGrid};
pub use library::{infer_family, Library, LibraryEntry, OTHER_FAMILY};

/// Default precursor tolerance in ppm
pub const DEFAULT_TOLERANCE_PPM: f64 = 5.0;
/// Default retention time margin in minutes
pub const DEFAULT_RT_MARGIN: f64 = 0.5;
/// Best similarity needed to call a spectrum a confirmed match
pub const SIMILARITY_THRESHOLD: f64 = 0.8;
/// Below this best similarity the family vote is discarded
pub const FAMILY_SIMILARITY_FLOOR: f64 = 0.5;
/// Candidates kept for ranking and voting
pub const MAX_CANDIDATES: usize = 10;
/// Family reported when nothing supports a vote
pub const UNKNOWN_FAMILY: &str = "Unknown";

/// An observed feature to identify
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionQuery {
    /// Observed precursor m/z
    pub mz: f64,
    /// Observed retention time in minutes
    pub rt: Option<f64>,
    /// Precursor tolerance in ppm
    pub tolerance_ppm: f64,
    /// Retention time margin in minutes
    pub rt_margin: f64,
    /// Observed MS1 spectrum
    pub spectrum: Option<Spectrum>,
}

impl DetectionQuery {
    /// Query for `mz` with default tolerances and no spectrum
    pub fn new(mz: f64) -> Self {
        Self {
            mz,
            rt: None,
            tolerance_ppm: DEFAULT_TOLERANCE_PPM,
            rt_margin: DEFAULT_RT_MARGIN,
            spectrum: None,
        }
    }

    /// Set the retention time; zero or negative means unknown
    pub fn rt(mut self, rt: f64) -> Self {
        self.rt = Some(rt).filter(|t| t.is_finite() && *t > 0.0);
        self
    }

    /// Set the precursor tolerance
    pub fn tolerance_ppm(mut self, ppm: f64) -> Self {
        self.tolerance_ppm = ppm;
        self
    }

    /// Set the retention time margin
    pub fn rt_margin(mut self, minutes: f64) -> Self {
        self.rt_margin = minutes;
        self
    }

    /// Attach a spectrum; an empty one is ignored
    pub fn spectrum(mut self, spectrum: Spectrum) -> Self {
        self.spectrum = Some(spectrum).filter(|s| !s.is_empty());
        self
    }

    fn validate(&self) -> Result<(), DetectError> {
        if !(self.mz.is_finite() && self.mz > 0.0) {
            return Err(DetectError::InvalidParameter(format!(
                "precursor m/z must be positive, got {}",
                self.mz
            )));
        }
        if !(self.tolerance_ppm.is_finite() && self.tolerance_ppm > 0.0) {
            return Err(DetectError::InvalidParameter(format!(
                "tolerance must be positive, got {} ppm",
                self.tolerance_ppm
            )));
        }
        if !(self.rt_margin.is_finite() && self.rt_margin >= 0.0) {
            return Err(DetectError::InvalidParameter(format!(
                "retention time margin must not be negative, got {}",
                self.rt_margin
            )));
        }
        Ok(())
    }
}

/// A library compound that passed the precursor filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Compound id
    pub compound_id: Option<i64>,
    /// Display name
    pub name: String,
    /// Structural family
    pub family: String,
    /// Reference precursor m/z
    pub precursor_mz: f64,
    /// Reference retention time
    pub rt: Option<f64>,
    /// Absolute precursor error in ppm
    pub error_ppm: f64,
    /// Fingerprint similarity; absent without a query spectrum
    pub similarity: Option<f64>,
}

/// Outcome label of a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    /// The best spectrum similarity reached the threshold
    ConfirmedMatch,
    /// A spectrum was given but nothing in the library resembles it
    UnknownStructure,
    /// Precursor (and retention time) match without a spectrum
    PutativeMassMatch,
    /// Nothing in the library within tolerance
    NoMassMatch,
}

impl DetectionStatus {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            DetectionStatus::ConfirmedMatch => "Confirmed Match",
            DetectionStatus::UnknownStructure => "Unknown Structure",
            DetectionStatus::PutativeMassMatch => "Putative Mass Match",
            DetectionStatus::NoMassMatch => "No Mass Match",
        }
    }

    /// Returns true when the feature could not be identified
    pub fn is_unknown(&self) -> bool {
        matches!(
            self,
            DetectionStatus::UnknownStructure | DetectionStatus::NoMassMatch
        )
    }
}

impl fmt::Display for DetectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of [`analyze_peak`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    /// Outcome label
    pub status: DetectionStatus,
    /// Same as `status.is_unknown()`
    pub is_unknown: bool,
    /// Predicted family
    pub family: String,
    /// Share of the vote won by `family`, in `[0, 1]`
    pub confidence: f64,
    /// Similarity of the top candidate, in spectrum mode
    pub best_similarity: Option<f64>,
    /// Top candidates, best first
    pub candidates: Vec<Candidate>,
}

/// Library entries within tolerance of `mz`, with their ppm error
///
/// The retention time window applies only when both the query and the
/// entry carry a retention time.
pub fn filter_candidates<'a>(
    library: &'a Library,
    mz: f64,
    rt: Option<f64>,
    tolerance_ppm: f64,
    rt_margin: f64,
) -> Vec<(&'a LibraryEntry, f64)> {
    let reference: Vec<f64> = library.entries.iter().map(|e| e.precursor_mz).collect();
    find_peak_matches(&[mz], &reference, tolerance_ppm)
        .into_iter()
        .filter_map(|m| {
            let entry = library.entries.get(m.reference_index)?;
            let in_window = match (rt, entry.rt) {
                (Some(observed), Some(reference)) => (observed - reference).abs() <= rt_margin,
                _ => true,
            };
            in_window.then_some((entry, m.error_ppm))
        })
        .collect()
}

/// Majority family among `candidates` and its share of the vote
///
/// With `weighted` every candidate votes with its similarity, otherwise
/// each counts once. Ties go to the alphabetically first family. No
/// candidates, or a zero total weight, yields [`UNKNOWN_FAMILY`] at 0.
pub fn predict_family(candidates: &[Candidate], weighted: bool) -> (String, f64) {
    let mut votes: BTreeMap<&str, f64> = BTreeMap::new();
    for candidate in candidates {
        let weight = if weighted {
            candidate.similarity.unwrap_or(0.0).max(0.0)
        } else {
            1.0
        };
        *votes.entry(candidate.family.as_str()).or_insert(0.0) += weight;
    }

    let total: f64 = votes.values().sum();
    if total <= 0.0 {
        return (UNKNOWN_FAMILY.to_string(), 0.0);
    }
    let mut best: Option<(&str, f64)> = None;
    for (family, weight) in votes {
        if best.map_or(true, |(_, w)| weight > w) {
            best = Some((family, weight));
        }
    }
    match best {
        Some((family, weight)) => (family.to_string(), weight / total),
        None => (UNKNOWN_FAMILY.to_string(), 0.0),
    }
}

/// Filter, rank, vote and label one feature
pub fn analyze_peak(library: &Library, query: &DetectionQuery) -> Result<Detection, DetectError> {
    query.validate()?;
    let query_fingerprint = match &query.spectrum {
        Some(spectrum) => Some(library.grid.fingerprint(spectrum)?),
        None => None,
    };

    let mut candidates: Vec<Candidate> = filter_candidates(
        library,
        query.mz,
        query.rt,
        query.tolerance_ppm,
        query.rt_margin,
    )
    .into_iter()
    .map(|(entry, error_ppm)| Candidate {
        compound_id: entry.compound_id,
        name: entry.name.clone(),
        family: entry.family.clone(),
        precursor_mz: entry.precursor_mz,
        rt: entry.rt,
        error_ppm,
        similarity: query_fingerprint.as_ref().map(|fp| {
            entry
                .fingerprint
                .as_ref()
                .map_or(0.0, |reference| cosine_similarity(fp, reference))
        }),
    })
    .collect();

    candidates.sort_by(rank);
    candidates.truncate(MAX_CANDIDATES);
    debug!(
        "m/z {} matched {} candidates (spectrum: {})",
        query.mz,
        candidates.len(),
        query_fingerprint.is_some()
    );

    let spectrum_mode = query_fingerprint.is_some();
    let (mut family, confidence) = predict_family(&candidates, spectrum_mode);
    let best_similarity = if spectrum_mode {
        Some(candidates.first().and_then(|c| c.similarity).unwrap_or(0.0))
    } else {
        None
    };

    let status = match best_similarity {
        Some(best) if best >= SIMILARITY_THRESHOLD => DetectionStatus::ConfirmedMatch,
        Some(best) => {
            if best < FAMILY_SIMILARITY_FLOOR {
                family = UNKNOWN_FAMILY.to_string();
            }
            DetectionStatus::UnknownStructure
        }
        None if candidates.is_empty() => DetectionStatus::NoMassMatch,
        None => DetectionStatus::PutativeMassMatch,
    };

    Ok(Detection {
        status,
        is_unknown: status.is_unknown(),
        family,
        confidence,
        best_similarity,
        candidates,
    })
}

/// Similarity descending, then mass error ascending, then name
fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    let by_similarity = match (a.similarity, b.similarity) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        _ => Ordering::Equal,
    };
    by_similarity
        .then_with(|| a.error_ppm.total_cmp(&b.error_ppm))
        .then_with(|| a.name.cmp(&b.name))
}

/// Parse pasted `m/z intensity` lines into a spectrum
///
/// Fields may be separated by whitespace, commas or semicolons. Lines that
/// do not start with two numbers are skipped, so headers and comments can
/// stay in the paste.
pub fn parse_spectrum_text(text: &str) -> Spectrum {
    let peaks = text
        .lines()
        .filter_map(|line| {
            let mut fields = line
                .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
                .filter(|f| !f.is_empty());
            let mz: f64 = fields.next()?.parse().ok()?;
            let intensity: f64 = fields.next()?.parse().ok()?;
            (mz.is_finite() && intensity.is_finite()).then_some(Peak::new(mz, intensity))
        })
        .collect();
    Spectrum::new(0, peaks)
}
