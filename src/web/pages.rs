//! HTML rendering for the explorer pages.

use std::fmt::Write;

use crate::database::{RowSet, TableCategory};
use crate::search::{CompoundMatches, SearchPage};
use crate::spectrum::{IntensityStatistics, NormalizationMethod, SpectrumSummary};

use super::handlers::{CompoundParams, DetectParams, DetectResponse};

const STYLE: &str = "body{font-family:Helvetica,Arial,sans-serif;margin:0;color:#202020}\
nav{background:#1f3a5f;padding:10px 20px}nav a{color:#fff;margin-right:18px;text-decoration:none}\
main{padding:16px 24px}.sidebar{float:left;width:230px;margin-right:24px}\
.content{overflow:auto}table.rows{border-collapse:collapse;font-size:13px}\
table.rows th,table.rows td{border:1px solid #d0d0d0;padding:3px 6px;text-align:left}\
table.rows th{background:#f0f0f0}.error{background:#fde8e8;border:1px solid #e0a0a0;\
padding:8px 12px;margin:8px 0}.muted{color:#707070}form{margin:8px 0}";

/// Escape text for HTML element content and quoted attributes
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `application/x-www-form-urlencoded` query string, without the `?`
pub(crate) fn query_string(pairs: &[(&str, &str)]) -> String {
    serde_urlencoded::to_string(pairs).unwrap_or_default()
}

/// Percent-encode one URL path segment
pub(crate) fn path_segment(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => {
                let _ = write!(out, "%{:02X}", byte);
            }
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{} - DIMSpec Explorer</title>\
<style>{}</style></head><body>\
<nav><a href=\"/\">DIMSpec Explorer</a><a href=\"/tables\">Tables</a>\
<a href=\"/compounds\">Compounds</a><a href=\"/spectra\">Spectra</a>\
<a href=\"/detect\">Detector</a></nav>\
<main>{}</main></body></html>",
        escape(title),
        STYLE,
        body
    )
}

/// Inline error message
pub(crate) fn banner(message: &str) -> String {
    format!("<div class=\"error\">{}</div>", escape(message))
}

/// Render a row set as an HTML table
pub(crate) fn rows_table(rows: &RowSet) -> String {
    let mut html = String::from("<table class=\"rows\"><thead><tr>");
    for column in &rows.columns {
        let _ = write!(html, "<th>{}</th>", escape(column));
    }
    html.push_str("</tr></thead><tbody>");
    for row in &rows.rows {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", escape(&cell.to_string()));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

pub(crate) fn landing_page(db_file: &str, table_count: usize, categories: &[TableCategory]) -> String {
    let mut list = String::new();
    for category in categories {
        let _ = write!(
            list,
            "<li>{} <span class=\"muted\">({} tables)</span></li>",
            escape(&category.name),
            category.tables.len()
        );
    }
    let body = format!(
        "<h1>DIMSpec Database Explorer</h1>\
<p>Database: <code>{}</code>, {} tables and views.</p>\
<ul>{}</ul>\
<h2>Tools</h2><ul>\
<li><a href=\"/tables\">Table explorer</a>: browse, search and download any table</li>\
<li><a href=\"/compounds\">Compound search</a>: by name, m/z window or retention time</li>\
<li><a href=\"/spectra\">Spectrum viewer</a>: overlay and normalize MS1 spectra</li>\
<li><a href=\"/detect\">PFAS detector</a>: match a feature against the compound library</li>\
<li><a href=\"/api/tables\">/api/tables</a>: JSON catalog</li>\
</ul>",
        escape(db_file),
        table_count,
        list
    );
    layout("Home", &body)
}

/// Everything the table explorer page shows
pub(crate) struct TablesView<'a> {
    pub categories: &'a [TableCategory],
    pub selected: Option<&'a str>,
    pub term: &'a str,
    pub page_sizes: &'a [u64],
    pub page_size: u64,
    pub result: Option<&'a SearchPage>,
    pub error: Option<&'a str>,
}

pub(crate) fn tables_page(view: &TablesView<'_>) -> String {
    let mut sidebar = String::from("<div class=\"sidebar\">");
    for category in view.categories {
        let _ = write!(sidebar, "<h3>{}</h3><ul>", escape(&category.name));
        for table in &category.tables {
            let marker = if view.selected == Some(table.as_str()) {
                " &#9664;"
            } else {
                ""
            };
            let _ = write!(
                sidebar,
                "<li><a href=\"/tables?{}\">{}</a>{}</li>",
                escape(&query_string(&[("table", table.as_str())])),
                escape(table),
                marker
            );
        }
        sidebar.push_str("</ul>");
    }
    sidebar.push_str("</div>");

    let mut content = String::from("<div class=\"content\">");
    if let Some(error) = view.error {
        content.push_str(&banner(error));
    }

    if let Some(table) = view.selected {
        let mut sizes = String::new();
        for size in view.page_sizes {
            let selected = if *size == view.page_size { " selected" } else { "" };
            let _ = write!(sizes, "<option value=\"{size}\"{selected}>{size}</option>");
        }
        let _ = write!(
            content,
            "<h2>{}</h2>\
<form method=\"get\" action=\"/tables\">\
<input type=\"hidden\" name=\"table\" value=\"{}\">\
<input type=\"text\" name=\"q\" value=\"{}\" placeholder=\"Search text columns\">\
<select name=\"page_size\">{}</select> <button type=\"submit\">Search</button></form>",
            escape(table),
            escape(table),
            escape(view.term),
            sizes
        );

        if let Some(page) = view.result {
            content.push_str(&pagination(table, page));
            let downloads = if view.term.is_empty() {
                String::new()
            } else {
                format!("?{}", query_string(&[("q", view.term)]))
            };
            let encoded = escape(&path_segment(table));
            let _ = write!(
                content,
                "<p>Download: <a href=\"/export/{encoded}/csv{q}\">CSV</a> \
| <a href=\"/export/{encoded}/xlsx{q}\">Excel</a></p>",
                q = escape(&downloads)
            );
            if page.rows.is_empty() {
                content.push_str("<p class=\"muted\">No matching rows.</p>");
            } else {
                content.push_str(&rows_table(&page.rows));
            }
        }
    } else if view.error.is_none() {
        content.push_str("<p class=\"muted\">Pick a table on the left.</p>");
    }
    content.push_str("</div>");

    layout("Tables", &format!("{}{}", sidebar, content))
}

fn pagination(table: &str, page: &SearchPage) -> String {
    let first = if page.rows.is_empty() {
        0
    } else {
        page.page_size * (page.page - 1) + 1
    };
    let last = if page.rows.is_empty() {
        0
    } else {
        first + page.rows.len() as u64 - 1
    };
    let mut html = format!(
        "<p>Rows {} to {} of {} (page {} of {})",
        first,
        last,
        page.total_matches,
        page.page,
        page.page_count().max(1)
    );
    let link = |target: u64, text: &str| {
        let page_number = target.to_string();
        let page_size = page.page_size.to_string();
        format!(
            " <a href=\"/tables?{}\">{}</a>",
            escape(&query_string(&[
                ("table", table),
                ("q", page.term.as_str()),
                ("page", page_number.as_str()),
                ("page_size", page_size.as_str()),
            ])),
            text
        )
    };
    if page.has_previous() {
        html.push_str(&link(page.page - 1, "&laquo; Previous"));
    }
    if page.has_next() {
        html.push_str(&link(page.page + 1, "Next &raquo;"));
    }
    html.push_str("</p>");
    html
}

pub(crate) fn compounds_page(
    params: &CompoundParams,
    result: Option<&CompoundMatches>,
    error: Option<&str>,
) -> String {
    let field = |name: &str, label: &str, value: &Option<String>| {
        format!(
            "<label>{} <input type=\"text\" name=\"{}\" value=\"{}\" size=\"10\"></label> ",
            label,
            name,
            escape(value.as_deref().unwrap_or(""))
        )
    };
    let mut body = String::from("<h1>Compound Search</h1><form method=\"get\" action=\"/compounds\">");
    body.push_str(&field("name", "Name", &params.name));
    body.push_str(&field("mz", "Target m/z", &params.mz));
    body.push_str(&field("tolerance", "&plusmn;", &params.tolerance));
    body.push_str("<br>");
    body.push_str(&field("mz_min", "m/z from", &params.mz_min));
    body.push_str(&field("mz_max", "to", &params.mz_max));
    body.push_str(&field("rt_min", "RT from", &params.rt_min));
    body.push_str(&field("rt_max", "to", &params.rt_max));
    body.push_str(&field("limit", "Limit", &params.limit));
    body.push_str("<button type=\"submit\">Search</button></form>");

    if let Some(error) = error {
        body.push_str(&banner(error));
    }
    if let Some(matches) = result {
        let mut applied = vec![format!("table <code>{}</code>", escape(&matches.table))];
        if let Some(column) = &matches.mass_column {
            applied.push(format!("mass on <code>{}</code>", escape(column)));
        }
        if let Some(column) = &matches.rt_column {
            applied.push(format!("retention time on <code>{}</code>", escape(column)));
        }
        let _ = write!(
            body,
            "<p>{} compounds ({})</p>",
            matches.rows.len(),
            applied.join(", ")
        );
        if matches.rows.is_empty() {
            body.push_str("<p class=\"muted\">No compounds match these criteria.</p>");
        } else {
            body.push_str(&rows_table(&matches.rows));
        }
    }
    layout("Compounds", &body)
}

/// Statistics shown under the spectrum plot, one entry per trace
pub(crate) struct TraceStats {
    pub label: String,
    pub peak_id: i64,
    pub summary: SpectrumSummary,
    pub statistics: Option<IntensityStatistics>,
}

/// Everything the spectrum viewer page shows
pub(crate) struct SpectraView<'a> {
    pub available: &'a [i64],
    pub requested: &'a str,
    pub norm: Option<NormalizationMethod>,
    pub plot: Option<&'a str>,
    pub stats: &'a [TraceStats],
    pub warnings: &'a [String],
}

pub(crate) fn spectra_page(view: &SpectraView<'_>) -> String {
    let mut options = String::new();
    let current = view.norm.map_or("none", |m| m.as_str());
    for choice in NormalizationMethod::ALL
        .iter()
        .map(|m| m.as_str())
        .chain(std::iter::once("none"))
    {
        let selected = if choice == current { " selected" } else { "" };
        let _ = write!(options, "<option value=\"{choice}\"{selected}>{choice}</option>");
    }

    let mut body = format!(
        "<h1>Spectrum Viewer</h1>\
<form method=\"get\" action=\"/spectra\">\
<label>Peak ids <input type=\"text\" name=\"peaks\" value=\"{}\" placeholder=\"e.g. 1,2,3\"></label> \
<label>Normalization <select name=\"norm\">{}</select></label> \
<button type=\"submit\">Plot</button></form>",
        escape(view.requested),
        options
    );

    for warning in view.warnings {
        body.push_str(&banner(warning));
    }

    if let Some(svg) = view.plot {
        body.push_str("<div class=\"plot\">");
        body.push_str(svg);
        body.push_str("</div>");
    }

    if !view.stats.is_empty() {
        body.push_str(
            "<h2>Statistics</h2><table class=\"rows\"><thead><tr><th>Trace</th><th>Peaks</th>\
<th>Total</th><th>Mean</th><th>Median</th><th>Std</th><th>Min</th><th>Q25</th><th>Q75</th>\
<th>Max</th><th></th></tr></thead><tbody>",
        );
        for trace in view.stats {
            let _ = write!(
                body,
                "<tr><td>{}</td><td>{}</td><td>{}</td>",
                escape(&trace.label),
                trace.summary.count,
                number(trace.summary.total_intensity)
            );
            match &trace.statistics {
                Some(s) => {
                    for value in [s.mean, s.median, s.std_dev, s.min, s.q25, s.q75, s.max] {
                        let _ = write!(body, "<td>{}</td>", number(value));
                    }
                }
                None => body.push_str(&"<td></td>".repeat(7)),
            }
            let norm = view
                .norm
                .map(|m| format!("?{}", query_string(&[("norm", m.as_str())])))
                .unwrap_or_default();
            let _ = write!(
                body,
                "<td><a href=\"/spectra/{id}/plot.svg{norm}\">SVG</a> \
<a href=\"/api/spectra/{id}{norm}\">JSON</a></td></tr>",
                id = trace.peak_id,
                norm = escape(&norm)
            );
        }
        body.push_str("</tbody></table>");
    }

    body.push_str("<h2>Peaks with spectra</h2>");
    if view.available.is_empty() {
        body.push_str("<p class=\"muted\">No spectra stored.</p>");
    } else {
        body.push_str("<p>");
        for id in view.available {
            let _ = write!(body, "<a href=\"/spectra?peaks={id}\">{id}</a> ");
        }
        body.push_str("</p>");
    }

    layout("Spectra", &body)
}

/// Everything the detector page shows
pub(crate) struct DetectView<'a> {
    pub params: &'a DetectParams,
    pub result: Option<&'a DetectResponse>,
    pub error: Option<&'a str>,
}

pub(crate) fn detect_page(view: &DetectView<'_>) -> String {
    let params = view.params;
    let field = |name: &str, label: &str, value: &Option<String>, placeholder: &str| {
        format!(
            "<label>{} <input type=\"text\" name=\"{}\" value=\"{}\" placeholder=\"{}\" size=\"10\"></label> ",
            label,
            name,
            escape(value.as_deref().unwrap_or("")),
            placeholder
        )
    };
    let mut body = String::from("<h1>PFAS Detector</h1><form method=\"get\" action=\"/detect\">");
    body.push_str(&field("mz", "Precursor m/z", &params.mz, ""));
    body.push_str(&field("rt", "RT (min)", &params.rt, "optional"));
    body.push_str(&field("tolerance_ppm", "Tolerance (ppm)", &params.tolerance_ppm, "5"));
    body.push_str(&field("rt_margin", "RT margin (min)", &params.rt_margin, "0.5"));
    let _ = write!(
        body,
        "<br><label>MS1 spectrum, one <code>m/z intensity</code> pair per line<br>\
<textarea name=\"spectrum\" rows=\"6\" cols=\"40\">{}</textarea></label><br>\
<button type=\"submit\">Analyze</button></form>",
        escape(params.spectrum.as_deref().unwrap_or(""))
    );

    if let Some(error) = view.error {
        body.push_str(&banner(error));
    }
    let Some(result) = view.result else {
        return layout("Detector", &body);
    };

    let detection = &result.detection;
    let _ = write!(
        body,
        "<h2>{}</h2><p>Predicted family: <b>{}</b> (confidence {:.0}%)",
        escape(detection.status.label()),
        escape(&detection.family),
        detection.confidence * 100.0
    );
    if let Some(best) = detection.best_similarity {
        let _ = write!(body, ", best similarity {:.3}", best);
    }
    let _ = write!(
        body,
        "</p><p class=\"muted\">Library: {} compounds from <code>{}</code>; {} spectrum peaks given.</p>",
        result.library_size,
        escape(&result.library_table),
        result.spectrum_peaks
    );

    if detection.candidates.is_empty() {
        body.push_str("<p class=\"muted\">No library compound within tolerance.</p>");
        return layout("Detector", &body);
    }
    body.push_str(
        "<table class=\"rows\"><thead><tr><th>Id</th><th>Name</th><th>Family</th>\
<th>Precursor m/z</th><th>RT</th><th>Error (ppm)</th><th>Similarity</th></tr></thead><tbody>",
    );
    for candidate in &detection.candidates {
        let id = candidate
            .compound_id
            .map(|id| format!("<a href=\"/api/compounds/{id}\">{id}</a>"))
            .unwrap_or_default();
        let rt = candidate.rt.map(|rt| format!("{:.2}", rt)).unwrap_or_default();
        let similarity = candidate
            .similarity
            .map(|s| format!("{:.3}", s))
            .unwrap_or_default();
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.4}</td><td>{}</td><td>{:.2}</td><td>{}</td></tr>",
            id,
            escape(&candidate.name),
            escape(&candidate.family),
            candidate.precursor_mz,
            rt,
            candidate.error_ppm,
            similarity
        );
    }
    body.push_str("</tbody></table>");
    layout("Detector", &body)
}

fn number(value: f64) -> String {
    if value.abs() >= 1000.0 || value == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{:.4}", value)
    }
}

pub(crate) fn error_page(message: &str) -> String {
    layout("Error", &format!("<h1>Something went wrong</h1>{}", banner(message)))
}
