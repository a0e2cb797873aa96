use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::http::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::database::{categorize, TableDescriptor};
use crate::detect::{
    analyze_peak, parse_spectrum_text, Detection, DetectionQuery, DEFAULT_RT_MARGIN,
    DEFAULT_TOLERANCE_PPM,
};
use crate::export::{export_filename, ExportFormat};
use crate::plot::{render_spectra_svg, PlotOptions};
use crate::search::{
    compound_details, matching_rows, search, search_compounds, CompoundDetails, CompoundMatches,
    CompoundQuery, SearchPage,
};
use crate::spectrum::{
    get_spectrum, list_peak_ids, normalize, IntensityStatistics, LabeledSpectrum,
    NormalizationMethod, Peak, Spectrum, SpectrumError, SpectrumSummary,
};

use super::pages::{self, DetectView, SpectraView, TablesView, TraceStats};
use super::{AppError, AppState};

/// Default half-width of the target m/z window, in daltons
pub(crate) const DEFAULT_MZ_TOLERANCE: f64 = 0.01;

/// Set to `true` on a download cut short by `export_row_limit`
pub const EXPORT_TRUNCATED_HEADER: &str = "x-export-truncated";

/// A search term as typed; only an all-whitespace term means "no filter"
fn search_term(raw: Option<&str>) -> String {
    match raw {
        Some(q) if !q.trim().is_empty() => q.to_string(),
        _ => String::new(),
    }
}

/// Parse an optional query parameter; empty strings count as absent
fn parse_param<T: FromStr>(name: &str, raw: Option<&str>) -> Result<Option<T>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("invalid value for '{}': '{}'", name, s))),
    }
}

/// `none` disables normalization; absent means `default`
fn parse_norm(
    raw: Option<&str>,
    default: Option<NormalizationMethod>,
) -> Result<Option<NormalizationMethod>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(s) if s.eq_ignore_ascii_case("none") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(AppError::BadRequest),
    }
}

fn parse_peak_id(raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid peak id '{}'", raw)))
}

fn html_response(result: Result<String, AppError>) -> Response {
    match result {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            warn!("page failed: {}", e);
            (e.status(), Html(pages::error_page(&e.to_string()))).into_response()
        }
    }
}

pub(crate) async fn landing_handler(State(state): State<AppState>) -> Html<String> {
    let db_file = state
        .db
        .path()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tables = state.db.list_tables();
    Html(pages::landing_page(&db_file, tables.len(), &categorize(tables)))
}

pub(crate) async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TableParams {
    table: Option<String>,
    q: Option<String>,
    page: Option<String>,
    page_size: Option<String>,
}

impl TableParams {
    fn term(&self) -> String {
        search_term(self.q.as_deref())
    }

    /// Page number and page size, validated against the configured choices
    fn paging(&self, state: &AppState) -> Result<(u64, u64), AppError> {
        let explorer = &state.config.explorer;
        let page: u64 = parse_param("page", self.page.as_deref())?.unwrap_or(1);
        let page_size: u64 = parse_param("page_size", self.page_size.as_deref())?
            .unwrap_or_else(|| explorer.default_page_size());
        if !explorer.page_sizes.contains(&page_size) {
            return Err(AppError::BadRequest(format!(
                "page size must be one of {:?}, got {}",
                explorer.page_sizes, page_size
            )));
        }
        Ok((page, page_size))
    }
}

async fn run_search(
    state: &AppState,
    table: String,
    term: String,
    page_size: u64,
    page: u64,
) -> Result<SearchPage, AppError> {
    state
        .with_db(move |db| Ok(search(db, &table, &term, page_size, page)?))
        .await
}

pub(crate) async fn tables_page_handler(
    State(state): State<AppState>,
    Query(params): Query<TableParams>,
) -> Response {
    let categories = categorize(state.db.list_tables());
    let selected = params
        .table
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .or_else(|| categories.first().and_then(|c| c.tables.first().cloned()));
    let term = params.term();
    let explorer = &state.config.explorer;

    let (page_size, outcome) = match params.paging(&state) {
        Err(e) => (explorer.default_page_size(), Err(e)),
        Ok((page, page_size)) => match &selected {
            Some(table) => (
                page_size,
                run_search(&state, table.clone(), term.clone(), page_size, page)
                    .await
                    .map(Some),
            ),
            None => (page_size, Ok(None)),
        },
    };

    let (result, error) = match outcome {
        Ok(result) => (result, None),
        Err(e) if e.is_client_error() => (None, Some(e.to_string())),
        Err(e) => return html_response(Err(e)),
    };

    html_response(Ok(pages::tables_page(&TablesView {
        categories: &categories,
        selected: selected.as_deref(),
        term: &term,
        page_sizes: &explorer.page_sizes,
        page_size,
        result: result.as_ref(),
        error: error.as_deref(),
    })))
}

pub(crate) async fn tables_api_handler(State(state): State<AppState>) -> Json<Vec<TableDescriptor>> {
    Json(state.db.list_tables().to_vec())
}

pub(crate) async fn table_search_api_handler(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<TableParams>,
) -> Result<Json<SearchPage>, AppError> {
    let (page, page_size) = params.paging(&state)?;
    let page = run_search(&state, table, params.term(), page_size, page).await?;
    Ok(Json(page))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExportParams {
    q: Option<String>,
}

pub(crate) async fn export_handler(
    State(state): State<AppState>,
    Path((table, format)): Path<(String, String)>,
    Query(params): Query<ExportParams>,
) -> Result<Response, AppError> {
    let format: ExportFormat = format.parse().map_err(AppError::BadRequest)?;
    let term = search_term(params.q.as_deref());
    let limit = state.config.explorer.export_row_limit;
    let filename = export_filename(&table, Some(&term), format);

    let (bytes, truncated) = state
        .with_db(move |db| {
            // One extra row tells a full export apart from a truncated one
            let mut rows = matching_rows(db, &table, &term, limit.saturating_add(1))?;
            let truncated = rows.len() as u64 > limit;
            if truncated {
                rows.rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
                warn!(
                    "export of {} (q={:?}) truncated to {} rows",
                    table, term, limit
                );
            }
            debug!("exporting {} rows of {} as {}", rows.len(), table, format);
            Ok((format.render(&rows)?, truncated))
        })
        .await?;

    Ok((
        [
            (CONTENT_TYPE, format.mime_type().to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
            (
                HeaderName::from_static(EXPORT_TRUNCATED_HEADER),
                truncated.to_string(),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Raw compound search form fields
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CompoundParams {
    pub(crate) name: Option<String>,
    pub(crate) mz: Option<String>,
    pub(crate) tolerance: Option<String>,
    pub(crate) mz_min: Option<String>,
    pub(crate) mz_max: Option<String>,
    pub(crate) rt_min: Option<String>,
    pub(crate) rt_max: Option<String>,
    pub(crate) limit: Option<String>,
}

impl CompoundParams {
    /// Returns true when no field carries a value
    fn is_blank(&self) -> bool {
        [
            &self.name,
            &self.mz,
            &self.tolerance,
            &self.mz_min,
            &self.mz_max,
            &self.rt_min,
            &self.rt_max,
            &self.limit,
        ]
        .iter()
        .all(|v| v.as_deref().map_or(true, |s| s.trim().is_empty()))
    }

    /// Build the query; a target m/z takes precedence over an explicit window
    fn to_query(&self) -> Result<CompoundQuery, AppError> {
        let mut query = CompoundQuery::new();
        if let Some(name) = &self.name {
            query = query.name(name.as_str());
        }

        let mz: Option<f64> = parse_param("mz", self.mz.as_deref())?;
        let tolerance: Option<f64> = parse_param("tolerance", self.tolerance.as_deref())?;
        let mz_min: Option<f64> = parse_param("mz_min", self.mz_min.as_deref())?;
        let mz_max: Option<f64> = parse_param("mz_max", self.mz_max.as_deref())?;
        if let Some(target) = mz {
            query = query.target_mass(target, tolerance.unwrap_or(DEFAULT_MZ_TOLERANCE));
        } else if mz_min.is_some() || mz_max.is_some() {
            query = query.mass_range(mz_min.unwrap_or(f64::MIN), mz_max.unwrap_or(f64::MAX));
        }

        let rt_min: Option<f64> = parse_param("rt_min", self.rt_min.as_deref())?;
        let rt_max: Option<f64> = parse_param("rt_max", self.rt_max.as_deref())?;
        if rt_min.is_some() || rt_max.is_some() {
            query = query.rt_range(rt_min.unwrap_or(f64::MIN), rt_max.unwrap_or(f64::MAX));
        }

        if let Some(limit) = parse_param::<u64>("limit", self.limit.as_deref())? {
            if limit == 0 {
                return Err(AppError::BadRequest("limit must be at least 1".to_string()));
            }
            query = query.limit(limit);
        }
        Ok(query)
    }
}

async fn run_compound_search(
    state: &AppState,
    query: CompoundQuery,
) -> Result<CompoundMatches, AppError> {
    state
        .with_db(move |db| Ok(search_compounds(db, &query)?))
        .await
}

pub(crate) async fn compounds_page_handler(
    State(state): State<AppState>,
    Query(params): Query<CompoundParams>,
) -> Response {
    if params.is_blank() {
        return html_response(Ok(pages::compounds_page(&params, None, None)));
    }
    let outcome = match params.to_query() {
        Ok(query) => run_compound_search(&state, query).await,
        Err(e) => Err(e),
    };
    match outcome {
        Ok(matches) => html_response(Ok(pages::compounds_page(&params, Some(&matches), None))),
        Err(e) if e.is_client_error() => html_response(Ok(pages::compounds_page(
            &params,
            None,
            Some(&e.to_string()),
        ))),
        Err(e) => html_response(Err(e)),
    }
}

pub(crate) async fn compounds_api_handler(
    State(state): State<AppState>,
    Query(params): Query<CompoundParams>,
) -> Result<Json<CompoundMatches>, AppError> {
    let query = params.to_query()?;
    Ok(Json(run_compound_search(&state, query).await?))
}

pub(crate) async fn compound_details_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CompoundDetails>, AppError> {
    let id: i64 = id
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid compound id '{}'", id)))?;
    let details = state
        .with_db(move |db| Ok(compound_details(db, id)?))
        .await?;
    details
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Compound {} not found", id)))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SpectraParams {
    peaks: Option<String>,
    norm: Option<String>,
}

/// Peak ids from a comma or whitespace separated list, duplicates dropped
fn parse_peak_list(raw: &str) -> Result<Vec<i64>, AppError> {
    let mut ids = Vec::new();
    for token in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        let id = parse_peak_id(token)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

pub(crate) async fn spectra_page_handler(
    State(state): State<AppState>,
    Query(params): Query<SpectraParams>,
) -> Response {
    let requested = params.peaks.clone().unwrap_or_default();
    let mut warnings = Vec::new();

    let norm = match parse_norm(params.norm.as_deref(), Some(NormalizationMethod::Max)) {
        Ok(norm) => norm,
        Err(e) => {
            warnings.push(e.to_string());
            Some(NormalizationMethod::Max)
        }
    };
    let peak_ids = match parse_peak_list(&requested) {
        Ok(ids) => ids,
        Err(e) => {
            warnings.push(e.to_string());
            Vec::new()
        }
    };

    let source = state.config.spectra.clone();
    let list_limit = state.config.explorer.peak_list_limit;
    let wanted = peak_ids.clone();
    let loaded = state
        .with_db(move |db| {
            let available = match list_peak_ids(db, &source, list_limit) {
                Ok(ids) => ids,
                Err(SpectrumError::Database(e)) if e.is_invalid_request() => Vec::new(),
                Err(e) => return Err(e.into()),
            };
            let spectra: Vec<(i64, Result<Spectrum, SpectrumError>)> = wanted
                .iter()
                .map(|&id| (id, get_spectrum(db, &source, id)))
                .collect();
            Ok((available, spectra))
        })
        .await;
    let (available, spectra) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => return html_response(Err(e)),
    };

    let mut traces = Vec::new();
    let mut stats = Vec::new();
    for (peak_id, result) in spectra {
        match result {
            Ok(spectrum) => {
                let shown = match norm {
                    Some(method) => normalize(&spectrum, method),
                    None => spectrum,
                };
                let label = format!("Peak {}", peak_id);
                stats.push(TraceStats {
                    label: label.clone(),
                    peak_id,
                    summary: shown.summary(),
                    statistics: IntensityStatistics::of_spectrum(&shown),
                });
                traces.push(LabeledSpectrum::new(label, shown));
            }
            Err(SpectrumError::Database(e)) if !e.is_invalid_request() => {
                return html_response(Err(e.into()));
            }
            Err(e) => warnings.push(e.to_string()),
        }
    }

    let plot = if peak_ids.is_empty() {
        None
    } else {
        Some(render_spectra_svg(&traces, &plot_options(&peak_ids, norm)))
    };

    html_response(Ok(pages::spectra_page(&SpectraView {
        available: &available,
        requested: &requested,
        norm,
        plot: plot.as_deref(),
        stats: &stats,
        warnings: &warnings,
    })))
}

fn plot_options(peak_ids: &[i64], norm: Option<NormalizationMethod>) -> PlotOptions {
    let ids: Vec<String> = peak_ids.iter().map(i64::to_string).collect();
    let title = match norm {
        Some(method) => format!("MS1 Spectra: peaks {} ({} normalized)", ids.join(", "), method),
        None => format!("MS1 Spectra: peaks {}", ids.join(", ")),
    };
    PlotOptions::with_title(title)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NormParams {
    norm: Option<String>,
}

/// JSON body of `/api/spectra/:peak_id`
#[derive(Debug, Serialize)]
pub(crate) struct SpectrumResponse {
    peak_id: i64,
    normalization: Option<NormalizationMethod>,
    peaks: Vec<Peak>,
    summary: SpectrumSummary,
    statistics: Option<IntensityStatistics>,
}

async fn load_spectrum(
    state: &AppState,
    raw_id: &str,
    norm: Option<NormalizationMethod>,
) -> Result<Spectrum, AppError> {
    let peak_id = parse_peak_id(raw_id)?;
    let source = state.config.spectra.clone();
    let spectrum = state
        .with_db(move |db| Ok(get_spectrum(db, &source, peak_id)?))
        .await?;
    Ok(match norm {
        Some(method) => normalize(&spectrum, method),
        None => spectrum,
    })
}

pub(crate) async fn spectrum_api_handler(
    State(state): State<AppState>,
    Path(peak_id): Path<String>,
    Query(params): Query<NormParams>,
) -> Result<Json<SpectrumResponse>, AppError> {
    let norm = parse_norm(params.norm.as_deref(), None)?;
    let spectrum = load_spectrum(&state, &peak_id, norm).await?;
    Ok(Json(SpectrumResponse {
        peak_id: spectrum.peak_id,
        normalization: norm,
        summary: spectrum.summary(),
        statistics: IntensityStatistics::of_spectrum(&spectrum),
        peaks: spectrum.peaks,
    }))
}

pub(crate) async fn spectrum_plot_handler(
    State(state): State<AppState>,
    Path(peak_id): Path<String>,
    Query(params): Query<NormParams>,
) -> Result<Response, AppError> {
    let norm = parse_norm(params.norm.as_deref(), Some(NormalizationMethod::Max))?;
    let spectrum = load_spectrum(&state, &peak_id, norm).await?;
    let options = plot_options(&[spectrum.peak_id], norm);
    let label = format!("Peak {}", spectrum.peak_id);
    let svg = render_spectra_svg(&[LabeledSpectrum::new(label, spectrum)], &options);
    Ok(([(CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

/// Raw detector form fields
#[derive(Debug, Default, Deserialize)]
pub(crate) struct DetectParams {
    pub(crate) mz: Option<String>,
    pub(crate) rt: Option<String>,
    pub(crate) tolerance_ppm: Option<String>,
    pub(crate) rt_margin: Option<String>,
    pub(crate) spectrum: Option<String>,
}

impl DetectParams {
    /// Build the query; `None` when no precursor m/z was given
    fn to_query(&self) -> Result<Option<DetectionQuery>, AppError> {
        let Some(mz) = parse_param::<f64>("mz", self.mz.as_deref())? else {
            return Ok(None);
        };
        let mut query = DetectionQuery::new(mz)
            .tolerance_ppm(
                parse_param::<f64>("tolerance_ppm", self.tolerance_ppm.as_deref())?
                    .unwrap_or(DEFAULT_TOLERANCE_PPM),
            )
            .rt_margin(
                parse_param::<f64>("rt_margin", self.rt_margin.as_deref())?.unwrap_or(DEFAULT_RT_MARGIN),
            );
        if let Some(rt) = parse_param::<f64>("rt", self.rt.as_deref())? {
            query = query.rt(rt);
        }
        if let Some(text) = &self.spectrum {
            query = query.spectrum(parse_spectrum_text(text));
        }
        Ok(Some(query))
    }
}

/// JSON body of `/api/detect`
#[derive(Debug, Serialize)]
pub(crate) struct DetectResponse {
    pub(crate) mz: f64,
    pub(crate) rt: Option<f64>,
    pub(crate) tolerance_ppm: f64,
    pub(crate) rt_margin: f64,
    pub(crate) spectrum_peaks: usize,
    pub(crate) library_table: String,
    pub(crate) library_size: usize,
    #[serde(flatten)]
    pub(crate) detection: Detection,
}

async fn run_detection(state: &AppState, query: DetectionQuery) -> Result<DetectResponse, AppError> {
    state
        .with_library(move |library| {
            let detection = analyze_peak(library, &query)?;
            debug!(
                "detection at m/z {}: {} ({} candidates)",
                query.mz,
                detection.status,
                detection.candidates.len()
            );
            Ok(DetectResponse {
                mz: query.mz,
                rt: query.rt,
                tolerance_ppm: query.tolerance_ppm,
                rt_margin: query.rt_margin,
                spectrum_peaks: query.spectrum.as_ref().map_or(0, Spectrum::len),
                library_table: library.table.clone(),
                library_size: library.len(),
                detection,
            })
        })
        .await
}

pub(crate) async fn detect_page_handler(
    State(state): State<AppState>,
    Query(params): Query<DetectParams>,
) -> Response {
    let outcome = match params.to_query() {
        Ok(Some(query)) => run_detection(&state, query).await.map(Some),
        Ok(None) => Ok(None),
        Err(e) => Err(e),
    };
    let (result, error) = match outcome {
        Ok(result) => (result, None),
        Err(e) if e.is_client_error() => (None, Some(e.to_string())),
        Err(e) => return html_response(Err(e)),
    };
    html_response(Ok(pages::detect_page(&DetectView {
        params: &params,
        result: result.as_ref(),
        error: error.as_deref(),
    })))
}

pub(crate) async fn detect_api_handler(
    State(state): State<AppState>,
    Query(params): Query<DetectParams>,
) -> Result<Json<DetectResponse>, AppError> {
    let query = params
        .to_query()?
        .ok_or_else(|| AppError::BadRequest("missing required parameter 'mz'".to_string()))?;
    Ok(Json(run_detection(&state, query).await?))
}
