use std::collections::HashMap;

use log::{debug, info};
use serde::Serialize;

use super::{DetectError, FingerprintGrid};
use crate::database::{quote_ident, Database, TableDescriptor, Value};
use crate::search::{
    first_present, COMPOUNDS_TABLE, COMPOUND_SUMMARY_TABLE, MASS_COLUMNS, PEAKS_TABLE, RT_COLUMNS,
};
use crate::spectrum::{unpack, Spectrum, SpectrumSource};

const ID_COLUMNS: &[&str] = &["compound_id", "pfas_id", "id"];

/// Family assigned by name when the library carries none
pub const OTHER_FAMILY: &str = "Other";

/// One reference compound
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryEntry {
    /// Compound id, when the table has one
    pub compound_id: Option<i64>,
    /// Display name
    pub name: String,
    /// Structural family
    pub family: String,
    /// Reference precursor m/z
    pub precursor_mz: f64,
    /// Reference retention time in minutes
    pub rt: Option<f64>,
    /// Fingerprint of the first stored spectrum of this compound
    #[serde(skip)]
    pub fingerprint: Option<Vec<f64>>,
}

/// Reference compounds with their fingerprints, loaded once per database
#[derive(Debug, Clone, Serialize)]
pub struct Library {
    /// Table the entries were read from
    pub table: String,
    /// Grid the fingerprints were built on
    pub grid: FingerprintGrid,
    /// Entries in table order
    pub entries: Vec<LibraryEntry>,
}

impl Library {
    /// Read every compound with a usable precursor mass
    ///
    /// Uses `pfas_summary` when present and `compounds` otherwise. Spectra
    /// are attached through `peaks.compound_id`; a compound without a
    /// decodable spectrum simply has no fingerprint.
    pub fn load(
        db: &Database,
        source: &SpectrumSource,
        grid: FingerprintGrid,
    ) -> Result<Self, DetectError> {
        let table = if db.has_table(COMPOUND_SUMMARY_TABLE) {
            COMPOUND_SUMMARY_TABLE
        } else if db.has_table(COMPOUNDS_TABLE) {
            COMPOUNDS_TABLE
        } else {
            return Err(DetectError::NoLibrary(format!(
                "neither {} nor {} exists",
                COMPOUND_SUMMARY_TABLE, COMPOUNDS_TABLE
            )));
        };
        let descriptor = db.describe(table)?;
        let mut entries = read_entries(db, descriptor)?;

        let fingerprints = load_fingerprints(db, source, grid)?;
        for entry in &mut entries {
            if let Some(id) = entry.compound_id {
                entry.fingerprint = fingerprints.get(&id).cloned();
            }
        }

        let library = Self {
            table: table.to_string(),
            grid,
            entries,
        };
        info!(
            "loaded {} library compounds from {} ({} with spectra)",
            library.len(),
            library.table,
            library.fingerprinted()
        );
        Ok(library)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no compound had a usable mass
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries carrying a fingerprint
    pub fn fingerprinted(&self) -> usize {
        self.entries.iter().filter(|e| e.fingerprint.is_some()).count()
    }
}

fn column_or_null(column: Option<&str>) -> String {
    column.map_or_else(|| "NULL".to_string(), quote_ident)
}

fn read_entries(db: &Database, descriptor: &TableDescriptor) -> Result<Vec<LibraryEntry>, DetectError> {
    let columns = descriptor.column_names();
    let mass = first_present(columns.clone(), MASS_COLUMNS).ok_or_else(|| {
        DetectError::NoLibrary(format!("{} has no precursor mass column", descriptor.name))
    })?;
    let id = first_present(columns.clone(), ID_COLUMNS);
    let rt = first_present(columns.clone(), RT_COLUMNS);
    let name = columns.iter().find(|c| *c == &"name").map(|c| c.to_string());
    let family = columns
        .iter()
        .find(|c| c.eq_ignore_ascii_case("family"))
        .map(|c| c.to_string());

    let sql = format!(
        "SELECT {}, {}, {}, {}, {} FROM {} WHERE {} IS NOT NULL",
        column_or_null(id.as_deref()),
        column_or_null(name.as_deref()),
        quote_ident(&mass),
        column_or_null(rt.as_deref()),
        column_or_null(family.as_deref()),
        quote_ident(&descriptor.name),
        quote_ident(&mass),
    );
    debug!("library query: {}", sql);
    let rows = db.fetch(&sql, &[])?;

    let mut entries = Vec::with_capacity(rows.len());
    for record in &rows.rows {
        let [id, name, mass, rt, family] = record.as_slice() else {
            continue;
        };
        let Some(precursor_mz) = mass.as_f64().filter(|m| m.is_finite() && *m > 0.0) else {
            continue;
        };
        let compound_id = id.as_i64();
        let name = match name {
            Value::Null => compound_id.map(|i| format!("Compound {}", i)).unwrap_or_default(),
            other => other.to_string(),
        };
        let family = family
            .as_text()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(String::from)
            .unwrap_or_else(|| infer_family(&name).to_string());
        entries.push(LibraryEntry {
            compound_id,
            name,
            family,
            precursor_mz,
            rt: rt.as_f64().filter(|t| t.is_finite()),
            fingerprint: None,
        });
    }
    Ok(entries)
}

/// Fingerprint of the first decodable spectrum per compound id
fn load_fingerprints(
    db: &Database,
    source: &SpectrumSource,
    grid: FingerprintGrid,
) -> Result<HashMap<i64, Vec<f64>>, DetectError> {
    let mut fingerprints = HashMap::new();
    let linked = db
        .describe(PEAKS_TABLE)
        .map(|peaks| peaks.has_column("id") && peaks.has_column("compound_id"))
        .unwrap_or(false);
    let spectra = match source.resolve(db) {
        Ok(descriptor) if linked => descriptor,
        _ => {
            debug!("no peak-to-spectrum link; library has no fingerprints");
            return Ok(fingerprints);
        }
    };

    let sql = format!(
        "SELECT p.\"compound_id\", p.\"id\", m.{}, m.{} FROM {} p JOIN {} m ON m.{} = p.\"id\" \
         WHERE p.\"compound_id\" IS NOT NULL ORDER BY p.\"compound_id\", p.\"id\"",
        quote_ident(&source.mz_column),
        quote_ident(&source.intensity_column),
        quote_ident(PEAKS_TABLE),
        quote_ident(&spectra.name),
        quote_ident(&source.peak_column),
    );
    debug!("fingerprint query: {}", sql);
    let rows = db.fetch(&sql, &[])?;

    for record in &rows.rows {
        let [compound, peak, mz, intensity] = record.as_slice() else {
            continue;
        };
        let (Some(compound_id), Some(peak_id)) = (compound.as_i64(), peak.as_i64()) else {
            continue;
        };
        if fingerprints.contains_key(&compound_id) {
            continue;
        }
        let decoded = unpack(peak_id, "m/z", mz).and_then(|mz| {
            let intensity = unpack(peak_id, "intensity", intensity)?;
            Spectrum::from_arrays(peak_id, &mz, &intensity)
        });
        match decoded.and_then(|spectrum| grid.fingerprint(&spectrum)) {
            Ok(vector) if vector.iter().any(|v| *v > 0.0) => {
                fingerprints.insert(compound_id, vector);
            }
            Ok(_) => debug!("peak {} has no intensity on the fingerprint grid", peak_id),
            Err(e) => debug!("skipping spectrum of peak {}: {}", peak_id, e),
        }
    }
    Ok(fingerprints)
}

/// Structural family guessed from a compound name or abbreviation
///
/// Checked in order: ethers (GenX, ADONA, "oxa"), fluorotelomers ("6:2",
/// FTS, FTOH), sulfonamides (FOSA, FOSE), sulfonic acids, carboxylic acids.
/// Anything else is [`OTHER_FAMILY`].
pub fn infer_family(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && *t != "pfas")
        .collect();
    let has = |needle: &str| tokens.iter().any(|t| t.contains(needle));
    let abbreviation = |suffix: char| {
        tokens.iter().any(|t| {
            t.len() <= 6 && t.starts_with("pf") && t.ends_with(suffix) && t.is_ascii()
        })
    };

    if has("genx") || has("hfpo") || has("adona") || has("ether") || has("oxa") {
        "Ether"
    } else if has_telomer_ratio(&lower) || has("fts") || has("ftoh") || has("telomer") {
        "Fluorotelomer"
    } else if has("fosa") || has("fose") || has("sulfonamid") {
        "Sulfonamide"
    } else if has("sulfon") || abbreviation('s') {
        "PFSA"
    } else if has("anoic") || has("anoate") || has("carboxyl") || abbreviation('a') {
        "PFCA"
    } else {
        OTHER_FAMILY
    }
}

/// `n:m` chain notation, as in 6:2 FTS
fn has_telomer_ratio(name: &str) -> bool {
    let chars: Vec<char> = name.chars().collect();
    chars
        .windows(3)
        .any(|w| w[0].is_ascii_digit() && w[1] == ':' && w[2].is_ascii_digit())
}
