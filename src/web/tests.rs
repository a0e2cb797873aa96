use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use super::*;
use crate::test_support::Fixture;

struct TestApp {
    _fixture: Fixture,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(Config::default())
    }

    fn with_config(config: Config) -> Self {
        let fixture = Fixture::new();
        let router = build_router(AppState::new(fixture.open(), config));
        Self {
            _fixture: fixture,
            router,
        }
    }

    async fn get(&self, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    async fn get_text(&self, uri: &str) -> (StatusCode, String) {
        let (status, _, body) = self.get(uri).await;
        (status, String::from_utf8(body).unwrap())
    }

    async fn get_json(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, _, body) = self.get(uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }
}

#[tokio::test]
async fn test_healthz() {
    let app = TestApp::new();
    let (status, body) = app.get_text("/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_landing_page() {
    let app = TestApp::new();
    let (status, body) = app.get_text("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("dimspec_sample.sqlite"));
    assert!(body.contains("4 tables and views"));
    assert!(body.contains("href=\"/tables\""));
}

#[tokio::test]
async fn test_tables_api_lists_catalog() {
    let app = TestApp::new();
    let (status, json) = app.get_json("/api/tables").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["compounds", "ms_data", "peaks", "view_compounds"]);
    assert_eq!(json[0]["kind"], "table");
}

#[tokio::test]
async fn test_table_search_api() {
    let app = TestApp::new();
    let (status, json) = app.get_json("/api/tables/compounds?q=pf").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_matches"], 2);
    assert_eq!(json["page"], 1);
    assert_eq!(json["page_size"], 50);
    assert_eq!(json["rows"]["rows"][0][1], "PFOA");
    assert_eq!(json["rows"]["rows"][1][1], "PFOS");
}

#[tokio::test]
async fn test_table_search_api_errors() {
    let app = TestApp::new();

    let (status, json) = app.get_json("/api/tables/nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "invalid_request");
    assert!(json["error"]["message"].as_str().unwrap().contains("nope"));

    let (status, _) = app.get_json("/api/tables/compounds?page=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get_json("/api/tables/compounds?page_size=7").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get_json("/api/tables/compounds?page=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tables_page_renders_rows_and_downloads() {
    let app = TestApp::new();
    let (status, body) = app.get_text("/tables?table=compounds&q=PFOS").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<td>PFOS</td>"));
    assert!(!body.contains("<td>PFOA</td>"));
    assert!(body.contains("/export/compounds/csv?q=PFOS"));
    assert!(body.contains("/export/compounds/xlsx?q=PFOS"));
    assert!(body.contains("Core Data"));
}

#[tokio::test]
async fn test_tables_page_defaults_to_first_table() {
    let app = TestApp::new();
    let (status, body) = app.get_text("/tables").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<h2>compounds</h2>"));
    assert!(body.contains("<td>GenX</td>"));
}

#[tokio::test]
async fn test_tables_page_shows_banner_for_bad_input() {
    let app = TestApp::new();
    let (status, body) = app.get_text("/tables?table=missing").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("class=\"error\""));
    assert!(body.contains("missing"));

    let (status, body) = app.get_text("/tables?table=compounds&page=0").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("class=\"error\""));
}

#[tokio::test]
async fn test_tables_page_paginates() {
    let mut config = Config::default();
    config.explorer.page_sizes = vec![2, 50];
    let app = TestApp::with_config(config);

    let (_, body) = app.get_text("/tables?table=compounds").await;
    assert!(body.contains("Rows 1 to 2 of 3"));
    assert!(body.contains("page=2"));

    let (_, body) = app.get_text("/tables?table=compounds&page=2").await;
    assert!(body.contains("Rows 3 to 3 of 3"));
    assert!(body.contains("<td>GenX</td>"));
}

#[tokio::test]
async fn test_export_csv() {
    let app = TestApp::new();
    let (status, headers, body) = app.get("/export/compounds/csv?q=PF").await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"compounds_search_PF.csv\""
    );
    assert_eq!(headers[EXPORT_TRUNCATED_HEADER], "false");
    let text = String::from_utf8(body).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("id,name,formula"));
}

#[tokio::test]
async fn test_export_xlsx_and_limit() {
    let mut config = Config::default();
    config.explorer.export_row_limit = 1;
    let app = TestApp::with_config(config);

    let (status, headers, body) = app.get("/export/compounds/xlsx").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"compounds.xlsx\""
    );
    assert!(body.starts_with(b"PK"));
    assert_eq!(headers[EXPORT_TRUNCATED_HEADER], "true");

    let (_, headers, body) = app.get("/export/compounds/csv").await;
    assert_eq!(String::from_utf8(body).unwrap().lines().count(), 2);
    assert_eq!(headers[EXPORT_TRUNCATED_HEADER], "true");

    // A single match fits under the limit
    let (_, headers, _) = app.get("/export/compounds/csv?q=GenX").await;
    assert_eq!(headers[EXPORT_TRUNCATED_HEADER], "false");
}

#[tokio::test]
async fn test_export_exactly_at_limit_is_complete() {
    let mut config = Config::default();
    config.explorer.export_row_limit = 3;
    let app = TestApp::with_config(config);

    let (status, headers, body) = app.get("/export/compounds/csv").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[EXPORT_TRUNCATED_HEADER], "false");
    assert_eq!(String::from_utf8(body).unwrap().lines().count(), 4);
}

#[tokio::test]
async fn test_table_search_keeps_trailing_space() {
    let app = TestApp::new();
    let (_, json) = app.get_json("/api/tables/compounds?q=acid").await;
    assert_eq!(json["total_matches"], 2);

    let (status, json) = app.get_json("/api/tables/compounds?q=acid%20").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_matches"], 0);
    assert_eq!(json["term"], "acid ");

    let (_, json) = app.get_json("/api/tables/compounds?q=%20%20").await;
    assert_eq!(json["total_matches"], 3);
}

#[tokio::test]
async fn test_export_rejects_unknown_format_and_table() {
    let app = TestApp::new();
    let (status, json) = app.get_json("/export/compounds/pdf").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "invalid_request");

    let (status, _) = app.get_json("/export/missing/csv").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_compounds_api() {
    let app = TestApp::new();
    let (status, json) = app.get_json("/api/compounds?name=pfo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["table"], "compounds");
    assert_eq!(json["rows"]["rows"].as_array().unwrap().len(), 2);

    let (_, json) = app.get_json("/api/compounds?mz=413.97&tolerance=0.01").await;
    assert_eq!(json["mass_column"], "fixedmass");
    let rows = json["rows"]["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][1], "PFOA");

    let (status, _) = app.get_json("/api/compounds?mz=heavy").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_compound_details_api() {
    let app = TestApp::new();
    let (status, json) = app.get_json("/api/compounds/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], 1);
    assert_eq!(json["peak_ids"], serde_json::json!([10, 11]));

    let (status, json) = app.get_json("/api/compounds/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_compounds_page() {
    let app = TestApp::new();
    let (status, body) = app.get_text("/compounds").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Compound Search"));
    assert!(!body.contains("<table class=\"rows\">"));

    let (_, body) = app.get_text("/compounds?name=GenX").await;
    assert!(body.contains("<td>GenX</td>"));

    let (status, body) = app.get_text("/compounds?limit=-1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("class=\"error\""));
}

#[tokio::test]
async fn test_spectrum_api() {
    let app = TestApp::new();
    let (status, json) = app.get_json("/api/spectra/10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["peak_id"], 10);
    assert_eq!(json["normalization"], serde_json::Value::Null);
    assert_eq!(json["peaks"][0]["intensity"], 1000.0);
    assert_eq!(json["summary"]["count"], 3);

    let (_, json) = app.get_json("/api/spectra/10?norm=max").await;
    assert_eq!(json["normalization"], "max");
    assert_eq!(json["peaks"][0]["intensity"], 1.0);
    assert_eq!(json["peaks"][1]["intensity"], 0.25);
}

#[tokio::test]
async fn test_spectrum_api_errors() {
    let app = TestApp::new();
    let (status, json) = app.get_json("/api/spectra/99999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");

    let (status, _) = app.get_json("/api/spectra/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get_json("/api/spectra/10?norm=median").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get_json("/api/spectra/30").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_spectrum_plot() {
    let app = TestApp::new();
    let (status, headers, body) = app.get("/spectra/20/plot.svg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/svg+xml");
    let svg = String::from_utf8(body).unwrap();
    assert!(svg.starts_with("<svg"));
    assert_eq!(svg.matches("class=\"peak\"").count(), 3);
}

#[tokio::test]
async fn test_spectra_page_overlays_and_warns() {
    let app = TestApp::new();
    let (status, body) = app.get_text("/spectra?peaks=10,20,99999&norm=sum").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<svg"));
    assert!(body.contains("Peak 10"));
    assert!(body.contains("Peak 20"));
    assert!(body.contains("99999"));
    assert!(body.contains("class=\"error\""));
    assert_eq!(body.matches("class=\"peak\"").count(), 6);
    assert!(body.contains("<option value=\"sum\" selected>"));
}

#[tokio::test]
async fn test_spectra_page_lists_available_peaks() {
    let app = TestApp::new();
    let (status, body) = app.get_text("/spectra").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("<svg"));
    for id in [10, 11, 20, 30] {
        assert!(body.contains(&format!("/spectra?peaks={}", id)));
    }
}

#[tokio::test]
async fn test_detect_api_mass_only() {
    let app = TestApp::new();
    let (status, json) = app.get_json("/api/detect?mz=413.9659").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "putative_mass_match");
    assert_eq!(json["is_unknown"], false);
    assert_eq!(json["family"], "PFCA");
    assert_eq!(json["library_table"], "compounds");
    assert_eq!(json["library_size"], 3);
    assert_eq!(json["spectrum_peaks"], 0);
    assert_eq!(json["tolerance_ppm"], 5.0);
    assert!(json["best_similarity"].is_null());
    let candidates = json["candidates"].as_array().unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0]["name"], "PFOA");
    assert!(candidates[0]["similarity"].is_null());
}

#[tokio::test]
async fn test_detect_api_with_spectrum() {
    let app = TestApp::new();
    let (status, json) = app
        .get_json("/api/detect?mz=413.9659&rt=7.5&spectrum=412.966%201000%0A368.977%20250%0A168.989%2050")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "confirmed_match");
    assert_eq!(json["spectrum_peaks"], 3);
    assert_eq!(json["rt"], 7.5);
    assert!((json["best_similarity"].as_f64().unwrap() - 1.0).abs() < 1e-9);

    // Same precursor, unrelated spectrum
    let (_, json) = app.get_json("/api/detect?mz=413.9659&spectrum=900%2010").await;
    assert_eq!(json["status"], "unknown_structure");
    assert_eq!(json["is_unknown"], true);
    assert_eq!(json["family"], "Unknown");
}

#[tokio::test]
async fn test_detect_api_no_match_and_bad_input() {
    let app = TestApp::new();
    let (status, json) = app.get_json("/api/detect?mz=700").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "no_mass_match");
    assert_eq!(json["is_unknown"], true);

    for uri in [
        "/api/detect",
        "/api/detect?mz=abc",
        "/api/detect?mz=413.9659&tolerance_ppm=0",
        "/api/detect?mz=413.9659&rt_margin=-1",
    ] {
        let (status, json) = app.get_json(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(json["error"]["code"], "invalid_request");
    }
}

#[tokio::test]
async fn test_detect_page() {
    let app = TestApp::new();

    let (status, body) = app.get_text("/detect").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("PFAS Detector"));
    assert!(body.contains("name=\"spectrum\""));
    assert!(!body.contains("<h2>"));

    let (status, body) = app.get_text("/detect?mz=413.9659&rt=0").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<h2>Putative Mass Match</h2>"));
    assert!(body.contains("<b>PFCA</b>"));
    assert!(body.contains("<td>PFOA</td>"));
    assert!(body.contains("href=\"/api/compounds/1\""));

    let (status, body) = app.get_text("/detect?mz=413.9659&tolerance_ppm=-1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("class=\"error\""));
    assert!(body.contains("value=\"-1\""));
}

#[tokio::test]
async fn test_nav_links_detector() {
    let app = TestApp::new();
    let (_, body) = app.get_text("/").await;
    assert!(body.contains("href=\"/detect\""));
}
