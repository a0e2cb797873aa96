use serde::Serialize;

use super::types::TableDescriptor;

/// Known DIMSpec tables grouped the way the explorer presents them
pub const TABLE_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Core Data",
        &[
            "compounds",
            "samples",
            "peaks",
            "ms_data",
            "qc_data",
            "compound_fragments",
            "annotated_fragments",
            "ms_spectra",
        ],
    ),
    (
        "Reference / Metadata",
        &[
            "chromatography_descriptions",
            "ms_descriptions",
            "ms_methods",
            "mobile_phases",
            "qc_methods",
            "instrument_properties",
            "contributors",
            "affiliations",
            "carrier_mixes",
            "carrier_additives",
            "elements",
            "isotopes",
        ],
    ),
    (
        "Normalization",
        &[
            "norm_chromatography_types",
            "norm_column_chemistries",
            "norm_sample_classes",
            "norm_carriers",
            "norm_additives",
            "norm_ionization",
            "norm_polarity_types",
            "norm_ms_types",
            "norm_fragmentation_types",
            "norm_peak_confidence",
        ],
    ),
    (
        "Relationship / Alias",
        &[
            "compound_aliases",
            "fragment_aliases",
            "sample_aliases",
            "carrier_aliases",
            "additive_aliases",
        ],
    ),
    (
        "Views",
        &[
            "view_compounds",
            "view_peaks",
            "view_samples",
            "view_fragment_mz_stats",
            "view_logs",
            "view_qc_methods",
            "view_separation_types",
            "view_method",
            "view_chromatography_types",
            "view_mass_analyzers",
            "view_mobile_phases",
            "view_compound_fragments",
            "view_ms_methods",
        ],
    ),
];

/// Name of the catch-all category for tables not listed above
pub const OTHER_CATEGORY: &str = "Other";

/// A named group of tables present in the open database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCategory {
    /// Display name
    pub name: String,
    /// Table and view names, in category order
    pub tables: Vec<String>,
}

/// Group the available tables into categories
///
/// Categories with no table present are dropped. Tables that no category
/// claims end up in [`OTHER_CATEGORY`], sorted by name.
pub fn categorize(tables: &[TableDescriptor]) -> Vec<TableCategory> {
    let available: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    let mut categories: Vec<TableCategory> = TABLE_CATEGORIES
        .iter()
        .map(|(name, members)| TableCategory {
            name: name.to_string(),
            tables: members
                .iter()
                .filter(|m| available.contains(*m))
                .map(|m| m.to_string())
                .collect(),
        })
        .filter(|c| !c.tables.is_empty())
        .collect();

    let mut other: Vec<String> = available
        .iter()
        .filter(|t| !TABLE_CATEGORIES.iter().any(|(_, members)| members.contains(*t)))
        .map(|t| t.to_string())
        .collect();
    if !other.is_empty() {
        other.sort();
        categories.push(TableCategory {
            name: OTHER_CATEGORY.to_string(),
            tables: other,
        });
    }
    categories
}
