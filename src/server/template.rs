//! HTML pages. The layout and the upload form are static templates with
//! `{{ placeholder }}` markers; the result page body is assembled here.

use axum::response::Html;
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::INSTALL_HINT;
use crate::output::{ConversionReport, ConversionResult, FailureKind};
use crate::preview::TablePreview;
use crate::server::markdown::render_markdown;
use crate::upload::SUPPORTED_EXTENSIONS;

const LAYOUT_HTML: &str = include_str!("../../templates/layout.html");
const INDEX_HTML: &str = include_str!("../../templates/index.html");

/// Wrap `body` in the page layout. `body` is inserted last so user content is
/// never scanned for placeholders.
fn layout(title: &str, converter: &str, body: &str) -> Html<String> {
    let html = LAYOUT_HTML
        .replace("{{ title }}", &html_escape(title))
        .replace("{{ converter }}", &html_escape(converter))
        .replace("{{ install_hint }}", &html_escape(INSTALL_HINT))
        .replace("{{ body }}", body);
    Html(html)
}

/// Render the upload page.
pub fn render_index(converter: &str, max_upload_bytes: usize) -> Html<String> {
    let accept = SUPPORTED_EXTENSIONS
        .iter()
        .map(|e| format!(".{e}"))
        .collect::<Vec<_>>()
        .join(",");
    let body = INDEX_HTML
        .replace("{{ accept }}", &accept)
        .replace("{{ converter }}", &html_escape(converter))
        .replace("{{ max_upload }}", &format_size(max_upload_bytes));
    layout("Convert", converter, &body)
}

/// Render the page shown after a conversion.
pub fn render_result(converter: &str, report: &ConversionReport) -> Html<String> {
    let mut body = String::with_capacity(4096);
    body.push_str("    <h1>Conversion result</h1>\n");

    body.push_str("    <h3>File Details</h3>\n    <ul>\n");
    body.push_str(&format!(
        "      <li>Filename: {}</li>\n      <li>File size: {}</li>\n      <li>File type: {}</li>\n",
        html_escape(&report.file.name),
        html_escape(&report.file.size_display),
        html_escape(&report.file.mime_type),
    ));
    body.push_str("    </ul>\n");

    if let Some(ref cmd) = report.command {
        body.push_str(&format!(
            "    <p class=\"muted\">Running command: <code>{}</code></p>\n",
            html_escape(cmd)
        ));
    }

    if let ConversionResult::Failure(f) = &report.result {
        let heading = match f.kind {
            FailureKind::ExternalToolMissing => "Converter not installed",
            FailureKind::ConversionFailed => "Conversion failed",
            FailureKind::InvalidInput => "Invalid request",
            FailureKind::UnexpectedError => "Error during conversion",
        };
        body.push_str(&format!(
            "    <div class=\"error\"><strong>{}</strong><pre>{}</pre>",
            heading,
            html_escape(&f.message)
        ));
        if !f.diagnostic_output.is_empty() {
            body.push_str(&format!("<pre>{}</pre>", html_escape(&f.diagnostic_output)));
        }
        body.push_str("</div>\n");
        if f.kind == FailureKind::UnexpectedError {
            body.push_str(
                "    <div class=\"warning\">Make sure the file format is supported and the file is not corrupted.</div>\n",
            );
        }
    }

    for w in &report.warnings {
        body.push_str(&format!(
            "    <div class=\"warning\">{}</div>\n",
            html_escape(w)
        ));
    }

    if let Some(ref md) = report.markdown {
        body.push_str("    <h2>Markdown Output</h2>\n");
        body.push_str(&render_output_tabs(md));
        // Base64 so the browser's form encoding cannot rewrite line breaks.
        body.push_str(&format!(
            "    <form action=\"/download\" method=\"post\">\n      \
             <input type=\"hidden\" name=\"filename\" value=\"{}\">\n      \
             <input type=\"hidden\" name=\"content\" value=\"{}\">\n      \
             <button type=\"submit\">Download Markdown</button>\n    </form>\n",
            html_escape(&report.download_name),
            STANDARD.encode(md.as_bytes()),
        ));
    }

    if let Some(ref preview) = report.preview {
        body.push_str("    <h2>Data Preview</h2>\n");
        body.push_str(&render_table(preview));
    }

    body.push_str(&format!(
        "    <p class=\"muted\">Finished in {} ms. <a href=\"/\">Convert another file</a></p>\n",
        report.duration_ms
    ));

    layout("Result", converter, &body)
}

/// "Rendered" and "Raw Markdown" views, switched with radio-button tabs.
fn render_output_tabs(md: &str) -> String {
    format!(
        "    <div class=\"tabs\">\n      \
         <input type=\"radio\" name=\"view\" id=\"tab-rendered\" checked>\n      \
         <label for=\"tab-rendered\">Rendered</label>\n      \
         <input type=\"radio\" name=\"view\" id=\"tab-raw\">\n      \
         <label for=\"tab-raw\">Raw Markdown</label>\n      \
         <div class=\"tab rendered\">\n{}      </div>\n      \
         <div class=\"tab raw\"><pre><code class=\"language-markdown\">{}</code></pre></div>\n    \
         </div>\n",
        render_markdown(md),
        html_escape(md),
    )
}

/// Render a request-level error (bad multipart body, missing file).
pub fn render_error(converter: &str, message: &str) -> Html<String> {
    let body = format!(
        "    <h1>Upload error</h1>\n    <div class=\"error\">{}</div>\n    <p><a href=\"/\">Back</a></p>\n",
        html_escape(message)
    );
    layout("Error", converter, &body)
}

fn render_table(t: &TablePreview) -> String {
    let mut out = String::from("    <table>\n      <tr>");
    for h in &t.headers {
        out.push_str(&format!("<th>{}</th>", html_escape(h)));
    }
    out.push_str("</tr>\n");
    for row in &t.rows {
        out.push_str("      <tr>");
        for cell in row {
            out.push_str(&format!("<td>{}</td>", html_escape(cell)));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("    </table>\n");
    if t.truncated {
        out.push_str(&format!(
            "    <p class=\"muted\">Showing the first {} rows.</p>\n",
            t.rows.len()
        ));
    }
    out
}

fn format_size(bytes: usize) -> String {
    format!("{} MB", bytes / (1024 * 1024))
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
