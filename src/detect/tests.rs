use super::*;
use crate::spectrum::SpectrumSource;
use crate::test_support::Fixture;

const LIBRARY_SQL: &str = "
    CREATE TABLE pfas_summary (
        pfas_id INTEGER,
        name TEXT,
        Family TEXT,
        precursor_mz REAL,
        rt REAL
    );
    INSERT INTO pfas_summary VALUES
        (1, 'PFOA', 'PFCA', 412.9664, 7.5),
        (2, 'PFOA isomer', 'PFCA', 412.9670, NULL),
        (3, 'Lookalike', 'PFSA', 412.9660, 12.0),
        (4, 'PFOS', 'PFSA', 498.9302, 9.1),
        (5, 'No family', NULL, 329.975, NULL);

    CREATE TABLE peaks (id INTEGER PRIMARY KEY, compound_id INTEGER);
    INSERT INTO peaks VALUES (100, 1), (101, 1), (200, 2), (400, 4);

    CREATE TABLE ms_data (peak_id INTEGER, measured_mz TEXT, measured_intensity TEXT);
    INSERT INTO ms_data VALUES
        (100, '412.966 368.977 168.989', '1000 250 50'),
        (101, '600.0', '10'),
        (200, '412.966 218.986', '100 900'),
        (400, '498.930 79.957', '800 400');
";

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn library() -> Library {
    let db = Fixture::with_sql(LIBRARY_SQL).open();
    Library::load(&db, &SpectrumSource::default(), FingerprintGrid::default()).unwrap()
}

fn spectrum(pairs: &[(f64, f64)]) -> Spectrum {
    Spectrum::new(0, pairs.iter().map(|&(mz, i)| Peak::new(mz, i)).collect())
}

fn candidate(name: &str, family: &str, similarity: Option<f64>) -> Candidate {
    Candidate {
        compound_id: None,
        name: name.to_string(),
        family: family.to_string(),
        precursor_mz: 400.0,
        rt: None,
        error_ppm: 1.0,
        similarity,
    }
}

fn names(detection: &Detection) -> Vec<&str> {
    detection.candidates.iter().map(|c| c.name.as_str()).collect()
}

#[test]
fn test_grid_rejects_bad_parameters() {
    assert!(FingerprintGrid::new(50.0, 1200.0, 0.0).is_err());
    assert!(FingerprintGrid::new(50.0, 1200.0, f64::NAN).is_err());
    assert!(FingerprintGrid::new(1200.0, 50.0, 1.0).is_err());
    assert_eq!(FingerprintGrid::default().len(), 1150);
    assert_eq!(FingerprintGrid::new(0.0, 10.0, 3.0).unwrap().len(), 4);
}

#[test]
fn test_fingerprint_bins_and_scales() {
    let grid = FingerprintGrid::default();
    let s = spectrum(&[(100.2, 50.0), (100.7, 200.0), (120.5, 100.0), (49.0, 1000.0), (1300.0, 5.0)]);
    let fp = grid.fingerprint(&s).unwrap();

    assert_eq!(fp.len(), 1150);
    assert!(approx(fp[50], 1.0));
    assert!(approx(fp[70], 0.5));
    assert!(approx(fp.iter().sum::<f64>(), 1.5));
}

#[test]
fn test_fingerprint_of_silent_spectrum_is_zero() {
    let fp = FingerprintGrid::default()
        .fingerprint(&spectrum(&[(100.0, 0.0), (2000.0, 10.0)]))
        .unwrap();
    assert!(fp.iter().all(|v| *v == 0.0));
}

#[test]
fn test_cosine_similarity() {
    assert!(approx(cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]), 1.0));
    assert!(approx(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0));
    assert_eq!(cosine_similarity(&[], &[1.0]), 0.0);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    // Longer vector is cut to the shorter one
    assert!(approx(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 5.0]), 1.0));
}

#[test]
fn test_infer_family() {
    assert_eq!(infer_family("PFOA"), "PFCA");
    assert_eq!(infer_family("Perfluorooctanoic acid"), "PFCA");
    assert_eq!(infer_family("PFOS"), "PFSA");
    assert_eq!(infer_family("PFHxS"), "PFSA");
    assert_eq!(infer_family("Perfluorooctanesulfonic acid"), "PFSA");
    assert_eq!(infer_family("PFOSA"), "Sulfonamide");
    assert_eq!(infer_family("N-EtFOSE"), "Sulfonamide");
    assert_eq!(infer_family("6:2 FTS"), "Fluorotelomer");
    assert_eq!(infer_family("8:2 FTOH"), "Fluorotelomer");
    assert_eq!(infer_family("GenX"), "Ether");
    assert_eq!(infer_family("HFPO-DA"), "Ether");
    assert_eq!(infer_family("β-Hexachlorocyclohexane"), OTHER_FAMILY);
    assert_eq!(infer_family("PFAS"), OTHER_FAMILY);
    assert_eq!(infer_family(""), OTHER_FAMILY);
}

#[test]
fn test_library_from_summary_table() {
    let lib = library();
    assert_eq!(lib.table, "pfas_summary");
    assert_eq!(lib.len(), 5);
    assert_eq!(lib.fingerprinted(), 3);

    let pfoa = &lib.entries[0];
    assert_eq!(pfoa.compound_id, Some(1));
    assert_eq!(pfoa.family, "PFCA");
    assert_eq!(pfoa.rt, Some(7.5));
    // First spectrum wins; peak 101 is ignored
    let fp = pfoa.fingerprint.as_ref().unwrap();
    assert!(approx(fp[362], 1.0));
    assert_eq!(fp[550], 0.0);

    let unnamed = &lib.entries[4];
    assert_eq!(unnamed.family, OTHER_FAMILY);
    assert_eq!(unnamed.rt, None);
    assert!(unnamed.fingerprint.is_none());
}

#[test]
fn test_library_falls_back_to_compounds() {
    let db = Fixture::new().open();
    let lib = Library::load(&db, &SpectrumSource::default(), FingerprintGrid::default()).unwrap();

    assert_eq!(lib.table, "compounds");
    let families: Vec<&str> = lib.entries.iter().map(|e| e.family.as_str()).collect();
    assert_eq!(families, vec!["PFCA", "PFSA", "Ether"]);
    assert!(lib.entries.iter().all(|e| e.rt.is_none()));
    // GenX only has a malformed spectrum
    assert_eq!(lib.fingerprinted(), 2);
    assert!(lib.entries[2].fingerprint.is_none());
}

#[test]
fn test_library_without_compound_table() {
    let db = Fixture::with_sql("CREATE TABLE other (x INTEGER);").open();
    let err = Library::load(&db, &SpectrumSource::default(), FingerprintGrid::default()).unwrap_err();
    assert!(matches!(err, DetectError::NoLibrary(_)));
}

#[test]
fn test_filter_candidates_keeps_missing_rt() {
    let lib = library();

    let hits = filter_candidates(&lib, 412.9664, Some(7.5), 5.0, 0.5);
    let names: Vec<&str> = hits.iter().map(|(e, _)| e.name.as_str()).collect();
    assert_eq!(names, vec!["PFOA", "PFOA isomer"]);
    assert!(approx(hits[0].1, 0.0));

    // Window edge is inclusive
    assert_eq!(filter_candidates(&lib, 412.9664, Some(7.0), 5.0, 0.5).len(), 2);
    assert_eq!(filter_candidates(&lib, 412.9664, Some(6.9), 5.0, 0.5).len(), 1);

    // Without a retention time only mass counts
    assert_eq!(filter_candidates(&lib, 412.9664, None, 5.0, 0.5).len(), 3);
    assert_eq!(filter_candidates(&lib, 412.9664, None, 1.0, 0.5).len(), 2);
}

#[test]
fn test_predict_family_weighted_and_counted() {
    let candidates = vec![
        candidate("a", "Ether", Some(0.9)),
        candidate("b", "PFSA", Some(0.3)),
        candidate("c", "PFSA", Some(0.3)),
    ];

    let (family, confidence) = predict_family(&candidates, true);
    assert_eq!(family, "Ether");
    assert!(approx(confidence, 0.6));

    let (family, confidence) = predict_family(&candidates, false);
    assert_eq!(family, "PFSA");
    assert!(approx(confidence, 2.0 / 3.0));
}

#[test]
fn test_predict_family_edge_cases() {
    assert_eq!(predict_family(&[], false), (UNKNOWN_FAMILY.to_string(), 0.0));

    let silent = vec![candidate("a", "PFCA", Some(0.0))];
    assert_eq!(predict_family(&silent, true), (UNKNOWN_FAMILY.to_string(), 0.0));

    let tied = vec![candidate("a", "PFSA", None), candidate("b", "Ether", None)];
    let (family, confidence) = predict_family(&tied, false);
    assert_eq!(family, "Ether");
    assert!(approx(confidence, 0.5));
}

#[test]
fn test_identical_spectrum_is_confirmed() {
    let lib = library();
    let query = DetectionQuery::new(412.9664)
        .rt(7.5)
        .spectrum(spectrum(&[(412.966, 1000.0), (368.977, 250.0), (168.989, 50.0)]));
    let detection = analyze_peak(&lib, &query).unwrap();

    assert_eq!(detection.status, DetectionStatus::ConfirmedMatch);
    assert!(!detection.is_unknown);
    assert_eq!(names(&detection), vec!["PFOA", "PFOA isomer"]);
    assert!(approx(detection.best_similarity.unwrap(), 1.0));
    assert!(detection.candidates[1].similarity.unwrap() < 0.2);
    assert_eq!(detection.family, "PFCA");
    assert!(approx(detection.confidence, 1.0));
}

#[test]
fn test_similarity_outranks_mass_error() {
    let lib = library();
    // Resembles the isomer, which is 1.45 ppm off
    let query = DetectionQuery::new(412.9664)
        .spectrum(spectrum(&[(412.966, 100.0), (218.986, 900.0)]));
    let detection = analyze_peak(&lib, &query).unwrap();

    assert_eq!(names(&detection), vec!["PFOA isomer", "PFOA", "Lookalike"]);
    assert_eq!(detection.status, DetectionStatus::ConfirmedMatch);
    // Lookalike has no spectrum
    assert_eq!(detection.candidates[2].similarity, Some(0.0));
}

#[test]
fn test_weak_similarity_is_unknown_structure() {
    let lib = library();

    // Partial overlap keeps the family
    let partial = DetectionQuery::new(412.9664)
        .rt(7.5)
        .spectrum(spectrum(&[(412.966, 1000.0), (168.989, 1000.0)]));
    let detection = analyze_peak(&lib, &partial).unwrap();
    let best = detection.best_similarity.unwrap();
    assert!(best > FAMILY_SIMILARITY_FLOOR && best < SIMILARITY_THRESHOLD);
    assert_eq!(detection.status, DetectionStatus::UnknownStructure);
    assert!(detection.is_unknown);
    assert_eq!(detection.family, "PFCA");

    // No overlap drops it
    let unrelated = DetectionQuery::new(412.9664).spectrum(spectrum(&[(900.0, 10.0)]));
    let detection = analyze_peak(&lib, &unrelated).unwrap();
    assert_eq!(detection.status, DetectionStatus::UnknownStructure);
    assert_eq!(detection.best_similarity, Some(0.0));
    assert_eq!(detection.family, UNKNOWN_FAMILY);
    assert_eq!(detection.confidence, 0.0);
}

#[test]
fn test_single_peak_mode() {
    let lib = library();

    let detection = analyze_peak(&lib, &DetectionQuery::new(412.9664)).unwrap();
    assert_eq!(detection.status, DetectionStatus::PutativeMassMatch);
    assert!(!detection.is_unknown);
    assert_eq!(names(&detection), vec!["PFOA", "Lookalike", "PFOA isomer"]);
    assert!(detection.candidates.iter().all(|c| c.similarity.is_none()));
    assert_eq!(detection.best_similarity, None);
    assert_eq!(detection.family, "PFCA");
    assert!(approx(detection.confidence, 2.0 / 3.0));

    let miss = analyze_peak(&lib, &DetectionQuery::new(700.0)).unwrap();
    assert_eq!(miss.status, DetectionStatus::NoMassMatch);
    assert!(miss.is_unknown);
    assert!(miss.candidates.is_empty());
    assert_eq!(miss.family, UNKNOWN_FAMILY);
}

#[test]
fn test_spectrum_without_candidates_is_unknown_structure() {
    let lib = library();
    let query = DetectionQuery::new(700.0).spectrum(spectrum(&[(700.0, 1.0)]));
    let detection = analyze_peak(&lib, &query).unwrap();
    assert_eq!(detection.status, DetectionStatus::UnknownStructure);
    assert_eq!(detection.best_similarity, Some(0.0));
}

#[test]
fn test_candidates_are_capped() {
    let mut sql = String::from("CREATE TABLE compounds (id INTEGER, name TEXT, fixedmass REAL);");
    for i in 0..15 {
        sql.push_str(&format!(
            "INSERT INTO compounds VALUES ({i}, 'C{i:02}', {});",
            500.0 + i as f64 * 1e-4
        ));
    }
    let db = Fixture::with_sql(&sql).open();
    let lib = Library::load(&db, &SpectrumSource::default(), FingerprintGrid::default()).unwrap();

    let detection = analyze_peak(&lib, &DetectionQuery::new(500.0).tolerance_ppm(10.0)).unwrap();
    assert_eq!(detection.candidates.len(), MAX_CANDIDATES);
    assert_eq!(detection.candidates[0].name, "C00");
    assert_eq!(detection.candidates[9].name, "C09");
}

#[test]
fn test_query_validation() {
    let lib = library();
    for query in [
        DetectionQuery::new(0.0),
        DetectionQuery::new(f64::NAN),
        DetectionQuery::new(400.0).tolerance_ppm(0.0),
        DetectionQuery::new(400.0).rt_margin(-1.0),
    ] {
        let err = analyze_peak(&lib, &query).unwrap_err();
        assert!(matches!(err, DetectError::InvalidParameter(_)));
    }
}

#[test]
fn test_query_builder_normalizes_inputs() {
    assert_eq!(DetectionQuery::new(400.0).rt(0.0).rt, None);
    assert_eq!(DetectionQuery::new(400.0).rt(-2.0).rt, None);
    assert_eq!(DetectionQuery::new(400.0).rt(3.5).rt, Some(3.5));
    assert!(DetectionQuery::new(400.0).spectrum(spectrum(&[])).spectrum.is_none());
}

#[test]
fn test_status_labels() {
    assert_eq!(DetectionStatus::ConfirmedMatch.to_string(), "Confirmed Match");
    assert_eq!(DetectionStatus::NoMassMatch.label(), "No Mass Match");
    assert_eq!(
        serde_json::to_value(DetectionStatus::UnknownStructure).unwrap(),
        serde_json::json!("unknown_structure")
    );
}

#[test]
fn test_parse_spectrum_text() {
    let s = parse_spectrum_text("m/z intensity\n100.5 10\n200,20\n\n# note\n300;30 extra\nnan 5\n400\n");
    assert_eq!(s.mz_values(), vec![100.5, 200.0, 300.0]);
    assert_eq!(s.intensities(), vec![10.0, 20.0, 30.0]);
    assert!(parse_spectrum_text("").is_empty());
}
